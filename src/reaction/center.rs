use tracing::*;

use super::{Difference, Location, ReactionCenter, ReactionError};
use crate::MoleculeGraph;

/// A reactant/product pair labeled with the location of its reaction center.
///
/// `edge_label` has one slot per product bond (in edge order) and
/// `node_label` one slot per product atom. Exactly one slot across both is
/// set. The reaction center belongs to the reactant and the product alike.
#[derive(Debug, Clone)]
pub struct ReactionCenterSample {
    pub reactant: MoleculeGraph,
    pub product: MoleculeGraph,
    pub edge_label: Vec<bool>,
    pub node_label: Vec<bool>,
    pub reaction_center: ReactionCenter,
}

/// Locate the reaction center of a reaction and label the product with it.
///
/// Returns `Ok(None)` when the change between reactant and product doesn't
/// reduce to one formed bond, one changed bond or one hydrogen change; such a
/// sample carries no usable label.
pub fn reaction_center(
    reactant: MoleculeGraph,
    product: MoleculeGraph,
) -> Result<Option<ReactionCenterSample>, ReactionError> {
    let diff = Difference::compute(&reactant, &product)?;
    let location = match diff.locate(&reactant, &product) {
        Some(location) => location,
        None => {
            debug!(
                "No single reaction center: {} formed, {} changed",
                diff.added.len(),
                diff.modified.len()
            );
            return Ok(None);
        }
    };

    let mut edge_label = vec![false; product.edge_count()];
    let mut node_label = vec![false; product.node_count()];
    match location {
        Location::BondFormed(bond) => edge_label[bond.edge.index()] = true,
        Location::BondChanged(node) | Location::HydrogenChanged(node) => {
            node_label[node.index()] = true
        }
    }
    let reaction_center = location.reaction_center(&product);
    trace!("Reaction center {reaction_center} from {location:?}");

    Ok(Some(ReactionCenterSample {
        reactant,
        product,
        edge_label,
        node_label,
        reaction_center,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_smiles, Reaction};
    use petgraph::graph::NodeIndex;

    fn positives(labels: &[bool]) -> Vec<usize> {
        labels
            .iter()
            .enumerate()
            .filter(|(_, label)| **label)
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn test_ring_closure_center() {
        let reactant = parse_smiles("[CH3:1][CH2:2][CH3:3]").unwrap();
        let product = parse_smiles("[CH2:1]1[CH2:2][CH2:3]1").unwrap();
        let sample = reaction_center(reactant, product).unwrap().unwrap();

        assert_eq!(sample.reaction_center, ReactionCenter::bond(1, 3));
        assert_eq!(sample.edge_label.len(), 3);
        let labeled = positives(&sample.edge_label);
        assert_eq!(labeled.len(), 1);
        let (head, tail) = sample
            .product
            .edge_endpoints(petgraph::graph::EdgeIndex::new(labeled[0]))
            .unwrap();
        let mut maps = [sample.product[head].atom_map, sample.product[tail].atom_map];
        maps.sort();
        assert_eq!(maps, [1, 3]);
        assert!(positives(&sample.node_label).is_empty());
    }

    #[test]
    fn test_amide_coupling_center() {
        let reaction = Reaction::parse(
            "[CH3:1][C:2](=[O:3])[Cl:4].[NH2:5][CH3:6]>>[CH3:1][C:2](=[O:3])[NH:5][CH3:6]",
        )
        .unwrap();
        let sample = reaction_center(reaction.reactant, reaction.product)
            .unwrap()
            .unwrap();
        assert_eq!(sample.reaction_center, ReactionCenter::bond(2, 5));
        assert_eq!(positives(&sample.edge_label).len(), 1);
        assert_eq!(sample.node_label, vec![false; 5]);
    }

    #[test]
    fn test_terminal_bond_change_center() {
        let reactant = parse_smiles("[CH3:1][CH2:2][OH:3]").unwrap();
        let product = parse_smiles("[CH3:1][CH:2]=[O:3]").unwrap();
        let sample = reaction_center(reactant, product).unwrap().unwrap();
        assert_eq!(sample.reaction_center, ReactionCenter::atom(3));
        assert_eq!(positives(&sample.node_label), vec![2]);
        assert!(positives(&sample.edge_label).is_empty());
    }

    #[test]
    fn test_both_ends_terminal_bond_change_center() {
        let reactant = parse_smiles("[CH3:1][OH:2]").unwrap();
        let product = parse_smiles("[CH2:1]=[O:2]").unwrap();
        let sample = reaction_center(reactant, product).unwrap().unwrap();
        assert_eq!(sample.reaction_center, ReactionCenter::atom(1));
        assert_eq!(sample.reaction_center.to_string(), "1:0");
        assert_eq!(positives(&sample.node_label), vec![0]);
        assert!(positives(&sample.edge_label).is_empty());
    }

    #[test]
    fn test_hydrogen_change_center() {
        let reactant = parse_smiles("[CH3:7][NH2:8]").unwrap();
        let product = parse_smiles("[CH3:7][NH3+:8]").unwrap();
        let sample = reaction_center(reactant, product).unwrap().unwrap();
        assert_eq!(sample.reaction_center, ReactionCenter::atom(8));
        assert_eq!(positives(&sample.node_label), vec![1]);
        assert_eq!(sample.product[NodeIndex::new(1)].atom_map, 8);
    }

    #[test]
    fn test_explicit_product_hydrogen_counts_as_hydrogen_change() {
        let reactant = parse_smiles("[CH3:1][O-:2]").unwrap();
        let product = parse_smiles("[CH3:1][O:2][H]").unwrap();
        let sample = reaction_center(reactant, product).unwrap().unwrap();
        assert_eq!(sample.reaction_center, ReactionCenter::atom(2));
        assert_eq!(sample.node_label, vec![false, true]);
    }

    #[test]
    fn test_discarded_when_unlocalizable() {
        let reactant = parse_smiles("[CH3:1][CH3:2].[CH3:3][CH3:4]").unwrap();
        let product = parse_smiles("[CH2:1]1[CH2:2][CH2:3][CH2:4]1").unwrap();
        assert!(reaction_center(reactant, product).unwrap().is_none());

        // Two hydrogen changes.
        let reactant = parse_smiles("[OH:1][CH2:2][NH2:3]").unwrap();
        let product = parse_smiles("[O-:1][CH2:2][NH3+:3]").unwrap();
        assert!(reaction_center(reactant, product).unwrap().is_none());
    }

    #[test]
    fn test_unmapped_product_is_an_error() {
        let reactant = parse_smiles("[CH3:1][OH:2]").unwrap();
        let product = parse_smiles("[CH3:1][OH:9]").unwrap();
        let err = reaction_center(reactant, product).unwrap_err();
        assert!(!err.is_fatal());
    }
}
