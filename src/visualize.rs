use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use tracing::*;

use crate::{Atom, Bond, Element, MoleculeGraph, ReactionCenter};

const HIGHLIGHT_COLOR: &str = "orange";

/// Nodes and bonds of `graph` that belong to `center`: every atom carrying one
/// of its maps, and for a bond center the bond between them.
pub fn reaction_center_highlights(
    graph: &MoleculeGraph,
    center: &ReactionCenter,
) -> (Vec<NodeIndex>, Vec<EdgeIndex>) {
    let maps: HashSet<u32> = center.atom_maps().collect();
    let nodes: Vec<NodeIndex> = graph
        .node_indices()
        .filter(|&node| maps.contains(&graph[node].atom_map))
        .collect();
    let edges = match nodes.as_slice() {
        [a, b] if center.is_bond() => graph.find_edge(*a, *b).into_iter().collect(),
        _ => Vec::new(),
    };
    (nodes, edges)
}

/// Render a molecule graph in Graphviz DOT, drawing the given nodes and bonds
/// in the highlight color.
///
/// Nodes are labeled `Symbol:map` (just `Symbol` when unmapped), double and
/// triple bonds are drawn as parallel edges, aromatic bonds dashed.
pub fn sample_to_dot(
    graph: &MoleculeGraph,
    highlight_nodes: &[NodeIndex],
    highlight_edges: &[EdgeIndex],
) -> String {
    let highlight_nodes: HashSet<NodeIndex> = highlight_nodes.iter().copied().collect();
    let highlight_edges: HashSet<EdgeIndex> = highlight_edges.iter().copied().collect();

    let mut dot = String::from("graph Molecule {\n");
    dot.push_str("    layout=neato; rankdir=LR;\n");
    dot.push_str("    multiedge=true;\n");

    for node in graph.node_indices() {
        let atom = &graph[node];
        let outline = if highlight_nodes.contains(&node) {
            format!(", penwidth=4, color={HIGHLIGHT_COLOR}")
        } else {
            String::new()
        };
        dot.push_str(&format!(
            "    {} [label=\"{}\", fontcolor=white, shape=circle, style=filled, fillcolor={}{}];\n",
            node.index(),
            atom_label(atom),
            element_to_color(atom.element),
            outline
        ));
    }

    for edge in graph.edge_references() {
        let (style, extra) = bond_to_style(edge.weight());
        let color = if highlight_edges.contains(&edge.id()) {
            format!(", color={HIGHLIGHT_COLOR}")
        } else {
            extra.to_string()
        };
        let count = match edge.weight() {
            Bond::Double => 2,
            Bond::Triple => 3,
            _ => 1,
        };
        for _ in 0..count {
            dot.push_str(&format!(
                "    {} -- {} [style={}, penwidth=2{}];\n",
                edge.source().index(),
                edge.target().index(),
                style,
                color
            ));
        }
    }

    dot.push_str("}\n");
    dot
}

pub fn write_dot(path: impl AsRef<Path>, dot: &str) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, dot).with_context(|| format!("Failed to write DOT file {}", path.display()))?;
    info!("DOT file saved to {}", path.display());
    Ok(())
}

fn atom_label(atom: &Atom) -> String {
    let symbol = atom.element.symbol();
    if atom.atom_map == 0 {
        symbol.to_string()
    } else {
        format!("{symbol}:{}", atom.atom_map)
    }
}

fn element_to_color(element: Element) -> &'static str {
    use Element::*;
    match element {
        C => "black",
        H => "gray",
        O => "red",
        N => "blue",
        F => "pink",
        Cl => "darkgreen",
        Br => "brown",
        I => "purple4",
        S => "gold3",
        P => "darkorange3",
        B => "salmon",
        Si => "goldenrod4",
        Li | Na | K | Cs => "violet",
        Mg | Ca => "darkgreen",
        _ => "slategray",
    }
}

/// Graphviz style and extra attributes of a bond.
fn bond_to_style(bond: &Bond) -> (&'static str, &'static str) {
    match bond {
        Bond::Single | Bond::Double | Bond::Triple => ("solid", ""),
        Bond::Aromatic => ("dashed", ", color=purple"),
    }
}
