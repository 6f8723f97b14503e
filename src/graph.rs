use std::collections::{HashMap, HashSet};

use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::*;

/// Graph queries the reaction code needs on top of petgraph.
pub trait MoleculeGraphExt {
    /// Atom map of every node, in node order.
    fn atom_maps(&self) -> Vec<u32>;

    /// The largest atom map in the graph, `0` for an empty or unmapped graph.
    fn max_atom_map(&self) -> u32;

    /// Map from atom map to node. Unmapped atoms are left out.
    fn atom_map_index(&self) -> HashMap<u32, NodeIndex>;

    /// Number of bonds incident to `node`.
    fn degree(&self, node: NodeIndex) -> usize;

    /// Every bond as `(edge, head, tail)` with `head < tail`, in edge order.
    fn canonical_edges(&self) -> Vec<(EdgeIndex, NodeIndex, NodeIndex)>;

    /// Total hydrogen count of `node`: the bracket count if one was written,
    /// otherwise the implicit hydrogens left over by the default valence.
    fn total_hydrogens(&self, node: NodeIndex) -> u32;

    /// Connected components, each sorted by node index, ordered by their
    /// smallest node.
    fn connected_components(&self) -> Vec<Vec<NodeIndex>>;

    /// A copy of the graph restricted to `component`. Nodes keep their
    /// relative order.
    fn subgraph(&self, component: &[NodeIndex]) -> MoleculeGraph;

    /// One graph per connected component.
    fn fragments(&self) -> Vec<MoleculeGraph>;

    /// A copy of the graph with every bond between `a` and `b` removed.
    fn without_bond(&self, a: NodeIndex, b: NodeIndex) -> MoleculeGraph;
}

impl MoleculeGraphExt for MoleculeGraph {
    fn atom_maps(&self) -> Vec<u32> {
        self.node_indices().map(|node| self[node].atom_map).collect()
    }

    fn max_atom_map(&self) -> u32 {
        self.node_weights()
            .map(|atom| atom.atom_map)
            .max()
            .unwrap_or(0)
    }

    fn atom_map_index(&self) -> HashMap<u32, NodeIndex> {
        self.node_indices()
            .filter(|&node| self[node].atom_map != 0)
            .map(|node| (self[node].atom_map, node))
            .collect()
    }

    fn degree(&self, node: NodeIndex) -> usize {
        self.edges(node).count()
    }

    fn canonical_edges(&self) -> Vec<(EdgeIndex, NodeIndex, NodeIndex)> {
        self.edge_references()
            .map(|edge| {
                let (a, b) = (edge.source(), edge.target());
                (edge.id(), a.min(b), a.max(b))
            })
            .collect()
    }

    fn total_hydrogens(&self, node: NodeIndex) -> u32 {
        let bond_order_sum: u32 = self.edges(node).map(|edge| edge.weight().valence()).sum();
        self[node].hydrogen_count(bond_order_sum)
    }

    fn connected_components(&self) -> Vec<Vec<NodeIndex>> {
        // On an undirected graph the strongly connected components are the
        // connected components.
        let mut components = petgraph::algo::kosaraju_scc(self);
        for component in &mut components {
            component.sort();
        }
        components.sort_by_key(|component| component[0]);
        components
    }

    fn subgraph(&self, component: &[NodeIndex]) -> MoleculeGraph {
        let keep: HashSet<NodeIndex> = component.iter().copied().collect();
        // Bonds to dropped atoms go with them.
        self.filter_map(
            |node, atom| keep.contains(&node).then_some(*atom),
            |_, bond| Some(*bond),
        )
    }

    fn fragments(&self) -> Vec<MoleculeGraph> {
        self.connected_components()
            .iter()
            .map(|component| self.subgraph(component))
            .collect()
    }

    fn without_bond(&self, a: NodeIndex, b: NodeIndex) -> MoleculeGraph {
        let mut graph = self.clone();
        while let Some(edge) = graph.find_edge(a, b) {
            graph.remove_edge(edge);
        }
        graph
    }
}
