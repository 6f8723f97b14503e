use petgraph::graph::{EdgeIndex, NodeIndex};
use tracing::*;

use super::{ReactionCenter, ReactionError};
use crate::{MoleculeGraph, MoleculeGraphExt};

/// Product node to reactant node, matched through atom maps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correspondence(Vec<NodeIndex>);

impl Correspondence {
    /// Index reactant atoms by atom map and look up every product atom.
    ///
    /// Fails when a product atom is unmapped or carries a map no reactant atom
    /// has.
    pub fn new(reactant: &MoleculeGraph, product: &MoleculeGraph) -> Result<Self, ReactionError> {
        let index = reactant.atom_map_index();
        product
            .node_indices()
            .map(|node| {
                let atom_map = product[node].atom_map;
                index
                    .get(&atom_map)
                    .copied()
                    .ok_or(ReactionError::UnmappedProductAtom {
                        node: node.index(),
                        atom_map,
                    })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Correspondence)
    }

    pub fn reactant_node(&self, product_node: NodeIndex) -> NodeIndex {
        self.0[product_node.index()]
    }
}

/// A product bond in canonical orientation (`head < tail`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProductBond {
    pub edge: EdgeIndex,
    pub head: NodeIndex,
    pub tail: NodeIndex,
}

/// Where a reaction changed the product, when the change is a single one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// A bond present in the product but not between the mapped reactant atoms.
    BondFormed(ProductBond),
    /// The terminal end of the only bond whose type changed.
    BondChanged(NodeIndex),
    /// The only atom whose hydrogen count changed.
    HydrogenChanged(NodeIndex),
}

impl Location {
    /// The reaction center in atom-map ids of `product`.
    pub fn reaction_center(&self, product: &MoleculeGraph) -> ReactionCenter {
        match *self {
            Location::BondFormed(bond) => {
                ReactionCenter::bond(product[bond.head].atom_map, product[bond.tail].atom_map)
            }
            Location::BondChanged(node) | Location::HydrogenChanged(node) => {
                ReactionCenter::atom(product[node].atom_map)
            }
        }
    }
}

/// Product bonds that were formed (`added`) or changed type (`modified`)
/// relative to the reactant.
#[derive(Debug, Clone)]
pub struct Difference {
    pub added: Vec<ProductBond>,
    pub modified: Vec<ProductBond>,
    pub correspondence: Correspondence,
}

impl Difference {
    pub fn compute(reactant: &MoleculeGraph, product: &MoleculeGraph) -> Result<Self, ReactionError> {
        let correspondence = Correspondence::new(reactant, product)?;
        let mut added = Vec::new();
        let mut modified = Vec::new();

        for (edge, head, tail) in product.canonical_edges() {
            let bond = ProductBond { edge, head, tail };
            let reactant_head = correspondence.reactant_node(head);
            let reactant_tail = correspondence.reactant_node(tail);
            match reactant.find_edge(reactant_head, reactant_tail) {
                None => added.push(bond),
                Some(reactant_edge) if reactant[reactant_edge] != product[edge] => modified.push(bond),
                Some(_) => {}
            }
        }

        debug!(
            "{} bonds formed, {} bonds changed type",
            added.len(),
            modified.len()
        );
        Ok(Difference {
            added,
            modified,
            correspondence,
        })
    }

    /// Product atoms whose total hydrogen count differs from their reactant
    /// counterpart.
    pub fn hydrogen_changes(&self, reactant: &MoleculeGraph, product: &MoleculeGraph) -> Vec<NodeIndex> {
        product
            .node_indices()
            .filter(|&node| {
                let reactant_node = self.correspondence.reactant_node(node);
                product.total_hydrogens(node) != reactant.total_hydrogens(reactant_node)
            })
            .collect()
    }

    /// Reduce the difference to a single change, checked in order: one formed
    /// bond, one bond whose type changed, one atom whose hydrogen count
    /// changed. Several formed bonds never fall through to the later rules.
    pub fn locate(&self, reactant: &MoleculeGraph, product: &MoleculeGraph) -> Option<Location> {
        if !self.added.is_empty() {
            return match self.added.as_slice() {
                [bond] => Some(Location::BondFormed(*bond)),
                _ => None,
            };
        }
        if let [bond] = self.modified.as_slice() {
            let node = if product.degree(bond.head) == 1 {
                bond.head
            } else if product.degree(bond.tail) == 1 {
                bond.tail
            } else {
                // Neither end is terminal; settle on the head.
                bond.head
            };
            return Some(Location::BondChanged(node));
        }
        match self.hydrogen_changes(reactant, product).as_slice() {
            [node] => Some(Location::HydrogenChanged(*node)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_smiles;

    #[test]
    fn test_correspondence_follows_atom_maps() {
        let reactant = parse_smiles("[CH3:3][CH2:1][OH:2]").unwrap();
        let product = parse_smiles("[OH:2][CH2:1][CH3:3]").unwrap();
        let correspondence = Correspondence::new(&reactant, &product).unwrap();
        assert_eq!(correspondence.reactant_node(NodeIndex::new(0)), NodeIndex::new(2));
        assert_eq!(correspondence.reactant_node(NodeIndex::new(1)), NodeIndex::new(1));
        assert_eq!(correspondence.reactant_node(NodeIndex::new(2)), NodeIndex::new(0));

        let diff = Difference::compute(&reactant, &product).unwrap();
        assert!(diff.added.is_empty());
        assert!(diff.modified.is_empty());
    }

    #[test]
    fn test_unmapped_product_atom() {
        let reactant = parse_smiles("[CH3:1][OH:2]").unwrap();
        let product = parse_smiles("[CH3:1][O:2]C").unwrap();
        assert_eq!(
            Correspondence::new(&reactant, &product),
            Err(ReactionError::UnmappedProductAtom { node: 2, atom_map: 0 })
        );
    }

    #[test]
    fn test_added_and_modified_bonds() {
        let reactant = parse_smiles("[CH3:1][CH2:2][CH3:3].[O:4]=[CH2:5]").unwrap();
        let product = parse_smiles("[CH3:1][CH:2]([CH3:3])[CH2:5][OH:4]").unwrap();
        let diff = Difference::compute(&reactant, &product).unwrap();
        assert_eq!(diff.added.len(), 1);
        assert_eq!(diff.modified.len(), 1);

        let formed = diff.added[0];
        assert_eq!(product[formed.head].atom_map, 2);
        assert_eq!(product[formed.tail].atom_map, 5);

        let changed = diff.modified[0];
        assert_eq!(product[changed.head].atom_map, 5);
        assert_eq!(product[changed.tail].atom_map, 4);

        // A formed bond takes precedence over changed ones.
        let location = diff.locate(&reactant, &product).unwrap();
        assert_eq!(location, Location::BondFormed(formed));
        assert_eq!(location.reaction_center(&product), ReactionCenter::bond(2, 5));
    }

    #[test]
    fn test_two_formed_bonds_are_not_located() {
        let reactant = parse_smiles("[CH3:1][CH3:2].[CH3:3][CH3:4]").unwrap();
        let product = parse_smiles("[CH2:1]1[CH2:2][CH2:3][CH2:4]1").unwrap();
        let diff = Difference::compute(&reactant, &product).unwrap();
        assert_eq!(diff.added.len(), 2);
        assert_eq!(diff.locate(&reactant, &product), None);
    }

    #[test]
    fn test_changed_bond_prefers_terminal_atom() {
        // The tail is terminal, the head is not.
        let reactant = parse_smiles("[CH3:1][CH2:2][OH:3]").unwrap();
        let product = parse_smiles("[CH3:1][CH:2]=[O:3]").unwrap();
        let diff = Difference::compute(&reactant, &product).unwrap();
        assert_eq!(diff.modified.len(), 1);
        let location = diff.locate(&reactant, &product).unwrap();
        assert_eq!(location, Location::BondChanged(NodeIndex::new(2)));
        assert_eq!(location.reaction_center(&product), ReactionCenter::atom(3));
    }

    #[test]
    fn test_changed_bond_with_two_terminal_atoms_uses_head() {
        let reactant = parse_smiles("[CH3:1][OH:2]").unwrap();
        let product = parse_smiles("[CH2:1]=[O:2]").unwrap();
        let diff = Difference::compute(&reactant, &product).unwrap();
        assert_eq!(diff.modified.len(), 1);
        let location = diff.locate(&reactant, &product).unwrap();
        assert_eq!(location, Location::BondChanged(NodeIndex::new(0)));
        assert_eq!(location.reaction_center(&product), ReactionCenter::atom(1));
    }

    #[test]
    fn test_changed_bond_without_terminal_atom_uses_head() {
        let reactant = parse_smiles("[CH3:1][CH2:2][CH2:3][CH3:4]").unwrap();
        let product = parse_smiles("[CH3:1][CH:2]=[CH:3][CH3:4]").unwrap();
        let diff = Difference::compute(&reactant, &product).unwrap();
        let location = diff.locate(&reactant, &product).unwrap();
        assert_eq!(location.reaction_center(&product), ReactionCenter::atom(2));
    }

    #[test]
    fn test_hydrogen_change() {
        let reactant = parse_smiles("[CH3:1][C:2](=[O:3])[OH:4]").unwrap();
        let product = parse_smiles("[CH3:1][C:2](=[O:3])[O-:4]").unwrap();
        let diff = Difference::compute(&reactant, &product).unwrap();
        assert!(diff.added.is_empty() && diff.modified.is_empty());
        assert_eq!(diff.hydrogen_changes(&reactant, &product), vec![NodeIndex::new(3)]);
        let location = diff.locate(&reactant, &product).unwrap();
        assert_eq!(location, Location::HydrogenChanged(NodeIndex::new(3)));
        assert_eq!(location.reaction_center(&product), ReactionCenter::atom(4));
    }

    #[test]
    fn test_nothing_changed() {
        let reactant = parse_smiles("[CH3:1][OH:2]").unwrap();
        let product = parse_smiles("[CH3:1][OH:2]").unwrap();
        let diff = Difference::compute(&reactant, &product).unwrap();
        assert_eq!(diff.locate(&reactant, &product), None);
    }
}
