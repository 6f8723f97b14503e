use std::collections::{BTreeMap, BTreeSet, HashSet};

use anyhow::{Context, Result};
use petgraph::graph::NodeIndex;
use thiserror::Error;
use tracing::*;

use crate::{Atom, Bond, Bond::*, Element, MoleculeGraph, MoleculeGraphExt};
use super::parse_bracket_atom;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SmilesError {
    #[error("Branch start '(' at position {0} (followed by {1}) without a current atom")]
    BranchNoCurrentAtom(usize, String),
    #[error("Branch end ')' at position {0} (followed by {1}) without a matching '('")]
    BranchEndNoStart(usize, String),
    #[error("Unclosed branch '(' opened before the end of the string")]
    UnclosedBranch,
    #[error("Ring closure {0} at position {1} without a current atom")]
    RingClosureNoCurrentAtom(u8, usize),
    #[error("Ring closure {0} at position {1} bonds an atom to itself or to an existing neighbor")]
    InvalidRingClosure(u8, usize),
    #[error("Ring closures {0:?} are never closed")]
    UnclosedRing(Vec<u8>),
    #[error("Incomplete ring closure after '%' at position {0}")]
    IncompleteRingClosure(usize),
    #[error("Unclosed bracket '[' at position {0}")]
    UnclosedBracket(usize),
    #[error("Invalid bracket atom '[{0}]': {1}")]
    InvalidBracketAtom(String, String),
    #[error("Unknown element symbol '{0}' at position {1}")]
    UnknownSymbol(String, usize),
    #[error("Bond symbol at position {0} is not followed by an atom or ring closure")]
    DanglingBond(usize),
    #[error("Unexpected character '{0}' at position {1}")]
    UnexpectedCharacter(char, usize),
}

/// Parses a SMILES string into a MoleculeGraph.
///
/// Supports the organic subset, bracket atoms with isotopes, hydrogen counts,
/// charges and atom maps, explicit bonds, branches, ring closures (including
/// `%nn`) and dot-separated fragments. Stereo marks are accepted and dropped.
pub fn parse_smiles(smiles: &str) -> Result<MoleculeGraph> {
    parse_smiles_helper(smiles).context(format!("Failed to parse SMILES string {smiles}"))
}

/// Bond between two atoms when the SMILES string doesn't spell one out.
fn implicit_bond(a: &Atom, b: &Atom) -> Bond {
    if a.is_aromatic() && b.is_aromatic() {
        Aromatic
    } else {
        Single
    }
}

/// Organic subset symbol (outside brackets) starting at `i`, with its length.
fn organic_symbol(chars: &[char], i: usize) -> Option<(Atom, usize)> {
    let two: String = chars[i..chars.len().min(i + 2)].iter().collect();
    if two == "Cl" || two == "Br" {
        let element = Element::from_symbol(&two)?;
        return Some((Atom::new(element), 2));
    }
    let one = chars[i].to_string();
    match Element::from_smiles(&one) {
        Ok((element, aromatic)) if element.is_organic_subset() => {
            let atom = if aromatic {
                Atom::aromatic(element)
            } else {
                Atom::new(element)
            };
            Some((atom, 1))
        }
        _ => None,
    }
}

struct SmilesReader {
    graph: MoleculeGraph,
    current_atom: Option<NodeIndex>,
    pending_bond: Option<(Bond, usize)>,
    branch_stack: Vec<NodeIndex>,
    ring_map: BTreeMap<u8, (NodeIndex, Option<Bond>)>,
}

impl SmilesReader {
    fn new() -> Self {
        SmilesReader {
            graph: MoleculeGraph::new_undirected(),
            current_atom: None,
            pending_bond: None,
            branch_stack: Vec::new(),
            ring_map: BTreeMap::new(),
        }
    }

    fn add_atom(&mut self, atom: Atom) {
        let new_atom = self.graph.add_node(atom);
        if let Some(prev_atom) = self.current_atom {
            let bond = match self.pending_bond.take() {
                Some((bond, _)) => bond,
                None => implicit_bond(&self.graph[prev_atom], &atom),
            };
            self.graph.add_edge(prev_atom, new_atom, bond);
        }
        self.pending_bond = None;
        self.current_atom = Some(new_atom);
    }

    fn ring_closure(&mut self, ring_number: u8, position: usize) -> Result<(), SmilesError> {
        let current = self
            .current_atom
            .ok_or(SmilesError::RingClosureNoCurrentAtom(ring_number, position))?;
        let bond = self.pending_bond.take().map(|(bond, _)| bond);

        match self.ring_map.remove(&ring_number) {
            Some((start_atom, opening_bond)) => {
                if start_atom == current || self.graph.find_edge(start_atom, current).is_some() {
                    return Err(SmilesError::InvalidRingClosure(ring_number, position));
                }
                let bond = bond
                    .or(opening_bond)
                    .unwrap_or_else(|| implicit_bond(&self.graph[start_atom], &self.graph[current]));
                self.graph.add_edge(start_atom, current, bond);
            }
            None => {
                self.ring_map.insert(ring_number, (current, bond));
            }
        }
        Ok(())
    }
}

fn parse_smiles_helper(smiles: &str) -> Result<MoleculeGraph, SmilesError> {
    let mut reader = SmilesReader::new();
    let chars: Vec<char> = smiles.trim().chars().collect();
    let rest = |i: usize| chars[i..].iter().collect::<String>();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '(' => {
                match reader.current_atom {
                    Some(atom) => reader.branch_stack.push(atom),
                    None => return Err(SmilesError::BranchNoCurrentAtom(i, rest(i))),
                }
                i += 1;
            }
            ')' => {
                if let Some((_, position)) = reader.pending_bond {
                    return Err(SmilesError::DanglingBond(position));
                }
                reader.current_atom = reader.branch_stack.pop();
                if reader.current_atom.is_none() {
                    return Err(SmilesError::BranchEndNoStart(i, rest(i)));
                }
                i += 1;
            }
            '-' | '=' | '#' | ':' => {
                let bond = match c {
                    '-' => Single,
                    '=' => Double,
                    '#' => Triple,
                    _ => Aromatic,
                };
                reader.pending_bond = Some((bond, i));
                i += 1;
            }
            '%' => {
                if i + 2 >= chars.len()
                    || !chars[i + 1].is_ascii_digit()
                    || !chars[i + 2].is_ascii_digit()
                {
                    return Err(SmilesError::IncompleteRingClosure(i));
                }
                let ring_number = (chars[i + 1] as u8 - b'0') * 10 + (chars[i + 2] as u8 - b'0');
                reader.ring_closure(ring_number, i)?;
                i += 3;
            }
            '0'..='9' => {
                reader.ring_closure(c as u8 - b'0', i)?;
                i += 1;
            }
            '[' => {
                let end = chars[i..]
                    .iter()
                    .position(|&x| x == ']')
                    .map(|end_relative| i + end_relative)
                    .ok_or(SmilesError::UnclosedBracket(i))?;
                let content: String = chars[i + 1..end].iter().collect();
                let atom = parse_bracket_atom(&content)
                    .map_err(|e| SmilesError::InvalidBracketAtom(content.clone(), e))?;
                reader.add_atom(atom);
                i = end + 1;
            }
            '/' | '\\' | '@' => {
                // Ignore stereochemistry markers.
                i += 1;
            }
            '.' => {
                if let Some((_, position)) = reader.pending_bond {
                    return Err(SmilesError::DanglingBond(position));
                }
                reader.current_atom = None;
                i += 1;
            }
            c if c.is_ascii_alphabetic() => {
                let (atom, len) = organic_symbol(&chars, i)
                    .ok_or_else(|| SmilesError::UnknownSymbol(c.to_string(), i))?;
                reader.add_atom(atom);
                i += len;
            }
            _ => return Err(SmilesError::UnexpectedCharacter(c, i)),
        }
    }

    if let Some((_, position)) = reader.pending_bond {
        return Err(SmilesError::DanglingBond(position));
    }
    if !reader.branch_stack.is_empty() {
        return Err(SmilesError::UnclosedBranch);
    }
    if !reader.ring_map.is_empty() {
        return Err(SmilesError::UnclosedRing(reader.ring_map.keys().copied().collect()));
    }

    let graph = fold_explicit_hydrogens(reader.graph);
    debug!(
        "Parsed {smiles} into {} atoms and {} bonds",
        graph.node_count(),
        graph.edge_count()
    );
    Ok(graph)
}

/// Fold plain `[H]` atoms into the hydrogen count of the heavy atom they hang
/// off. Mapped, charged or isotopic hydrogens and `[H][H]` stay atoms.
fn fold_explicit_hydrogens(mut graph: MoleculeGraph) -> MoleculeGraph {
    let foldable: Vec<(NodeIndex, NodeIndex)> = graph
        .node_indices()
        .filter_map(|node| {
            let atom = &graph[node];
            if !atom.is_hydrogen() || atom.atom_map != 0 || atom.charge != 0 || atom.isotope != 0 {
                return None;
            }
            let mut neighbors = graph.neighbors(node);
            match (neighbors.next(), neighbors.next()) {
                (Some(heavy), None) if !graph[heavy].is_hydrogen() => Some((node, heavy)),
                _ => None,
            }
        })
        .collect();
    if foldable.is_empty() {
        return graph;
    }

    let mut folded = HashSet::new();
    for (hydrogen, heavy) in foldable {
        // Counted while the bond to the hydrogen is still in place, so implicit
        // hydrogens are not counted twice.
        let hydrogens = u8::try_from(graph.total_hydrogens(heavy))
            .unwrap_or(u8::MAX)
            .saturating_add(1);
        let atom = graph[heavy].with_hydrogens(hydrogens);
        graph[heavy] = atom;
        folded.insert(hydrogen);
    }
    graph.filter_map(
        |node, atom| (!folded.contains(&node)).then_some(*atom),
        |_, bond| Some(*bond),
    )
}

/// A helper structure to record a ring closure edge.
#[derive(Debug, Clone)]
struct RingClosure {
    opening: NodeIndex, // the ancestor where the ring is opened
    closing: NodeIndex, // the descendant where the ring is closed
}

/// First pass: compute a DFS spanning tree of the component containing
/// `start` and record ring closures. Returns the children of every visited
/// node, in ascending order, and one ring closure per back edge.
fn compute_spanning_tree_and_ring_closures(
    graph: &MoleculeGraph,
    start: NodeIndex,
) -> (BTreeMap<NodeIndex, Vec<NodeIndex>>, Vec<RingClosure>) {
    let mut children: BTreeMap<NodeIndex, Vec<NodeIndex>> = BTreeMap::new();
    let mut ring_closures: Vec<RingClosure> = Vec::new();
    let mut visited: BTreeSet<NodeIndex> = BTreeSet::new();
    let mut path: Vec<NodeIndex> = Vec::new();

    fn dfs(
        graph: &MoleculeGraph,
        current: NodeIndex,
        parent: Option<NodeIndex>,
        children: &mut BTreeMap<NodeIndex, Vec<NodeIndex>>,
        ring_closures: &mut Vec<RingClosure>,
        visited: &mut BTreeSet<NodeIndex>,
        path: &mut Vec<NodeIndex>,
    ) {
        visited.insert(current);
        path.push(current);
        let mut nbrs: Vec<NodeIndex> = graph.neighbors(current).collect();
        nbrs.sort();
        nbrs.dedup();
        for nbr in nbrs {
            if Some(nbr) == parent {
                continue;
            }
            if !visited.contains(&nbr) {
                children.entry(current).or_default().push(nbr);
                dfs(graph, nbr, Some(current), children, ring_closures, visited, path);
            } else if path.contains(&nbr) {
                // Back edge to an ancestor; each one is seen once from the descendant.
                ring_closures.push(RingClosure {
                    opening: nbr,
                    closing: current,
                });
            }
        }
        path.pop();
    }

    dfs(
        graph,
        start,
        None,
        &mut children,
        &mut ring_closures,
        &mut visited,
        &mut path,
    );
    (children, ring_closures)
}

/// Returns the bond symbol for the edge between nodes `a` and `b`.
fn bond_str(graph: &MoleculeGraph, a: NodeIndex, b: NodeIndex) -> &'static str {
    let both_aromatic = graph[a].is_aromatic() && graph[b].is_aromatic();
    match graph.find_edge(a, b).map(|edge| graph[edge]) {
        Some(Single) if both_aromatic => "-",
        Some(Aromatic) if !both_aromatic => ":",
        Some(Double) => "=",
        Some(Triple) => "#",
        _ => "",
    }
}

/// Formats a ring closure digit according to SMILES rules.
fn format_ring(digit: usize) -> String {
    if digit < 10 {
        digit.to_string()
    } else {
        format!("%{}", digit)
    }
}

/// The atom as written in SMILES. Bracket atoms spell out their total
/// hydrogen count so that implicit hydrogens survive the round trip.
fn atom_str(graph: &MoleculeGraph, node: NodeIndex) -> String {
    let atom = &graph[node];
    if !atom.needs_brackets() {
        return atom.smiles_symbol();
    }
    let mut s = String::from("[");
    if atom.isotope != 0 {
        s.push_str(&atom.isotope.to_string());
    }
    s.push_str(&atom.smiles_symbol());
    match graph.total_hydrogens(node) {
        0 => {}
        1 => s.push('H'),
        n => s.push_str(&format!("H{}", n)),
    }
    match atom.charge {
        0 => {}
        1 => s.push('+'),
        -1 => s.push('-'),
        c if c > 0 => s.push_str(&format!("+{}", c)),
        c => s.push_str(&format!("-{}", -c)),
    }
    if atom.atom_map != 0 {
        s.push_str(&format!(":{}", atom.atom_map));
    }
    s.push(']');
    s
}

/// Second pass: write atoms in DFS order. Ring closure digits are handed out
/// when the ring opens and released when it closes, lowest free digit first.
fn generate_smiles_from_tree(
    graph: &MoleculeGraph,
    root: NodeIndex,
    children: &BTreeMap<NodeIndex, Vec<NodeIndex>>,
    ring_closures: &[RingClosure],
) -> String {
    let mut open_map: BTreeMap<NodeIndex, Vec<usize>> = BTreeMap::new();
    let mut close_map: BTreeMap<NodeIndex, Vec<usize>> = BTreeMap::new();
    for (id, rc) in ring_closures.iter().enumerate() {
        open_map.entry(rc.opening).or_default().push(id);
        close_map.entry(rc.closing).or_default().push(id);
    }

    struct Emitter<'a> {
        graph: &'a MoleculeGraph,
        children: &'a BTreeMap<NodeIndex, Vec<NodeIndex>>,
        ring_closures: &'a [RingClosure],
        open_map: BTreeMap<NodeIndex, Vec<usize>>,
        close_map: BTreeMap<NodeIndex, Vec<usize>>,
        digits: BTreeMap<usize, usize>,
        in_use: BTreeSet<usize>,
        out: String,
    }

    impl Emitter<'_> {
        fn emit(&mut self, current: NodeIndex) {
            self.out.push_str(&atom_str(self.graph, current));

            for id in self.close_map.get(&current).cloned().unwrap_or_default() {
                if let Some(digit) = self.digits.remove(&id) {
                    self.out.push_str(&format_ring(digit));
                    self.in_use.remove(&digit);
                }
            }
            for id in self.open_map.get(&current).cloned().unwrap_or_default() {
                let digit = (1..).find(|d| !self.in_use.contains(d)).unwrap_or(1);
                self.in_use.insert(digit);
                self.digits.insert(id, digit);
                let rc = &self.ring_closures[id];
                self.out.push_str(bond_str(self.graph, rc.opening, rc.closing));
                self.out.push_str(&format_ring(digit));
            }

            let child_nodes = self.children.get(&current).cloned().unwrap_or_default();
            let last = child_nodes.len().saturating_sub(1);
            for (i, child) in child_nodes.into_iter().enumerate() {
                let bond = bond_str(self.graph, current, child);
                if i < last {
                    self.out.push('(');
                    self.out.push_str(bond);
                    self.emit(child);
                    self.out.push(')');
                } else {
                    self.out.push_str(bond);
                    self.emit(child);
                }
            }
        }
    }

    let mut emitter = Emitter {
        graph,
        children,
        ring_closures,
        open_map,
        close_map,
        digits: BTreeMap::new(),
        in_use: BTreeSet::new(),
        out: String::new(),
    };
    emitter.emit(root);
    emitter.out
}

/// Convert a MoleculeGraph into a SMILES string, one dot-separated fragment
/// per connected component. Node order is preserved: every fragment starts at
/// its lowest-indexed atom and branches follow ascending node indices.
pub fn molecule_to_smiles(graph: &MoleculeGraph) -> String {
    graph
        .connected_components()
        .iter()
        .map(|component| {
            let root = component[0];
            let (children, ring_closures) = compute_spanning_tree_and_ring_closures(graph, root);
            generate_smiles_from_tree(graph, root, &children, &ring_closures)
        })
        .collect::<Vec<_>>()
        .join(".")
}
