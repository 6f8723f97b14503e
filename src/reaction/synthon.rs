use tracing::*;

use super::{Difference, Location, ReactionCenter, ReactionError};
use crate::{MoleculeGraph, MoleculeGraphExt};

/// A reactant fragment and the synthon it becomes in the product, sharing the
/// reaction center.
#[derive(Debug, Clone)]
pub struct SynthonPair {
    pub reactant: MoleculeGraph,
    pub synthon: MoleculeGraph,
    pub reaction_center: ReactionCenter,
}

/// Decompose a reaction into (reactant, synthon) pairs.
///
/// With a single formed bond, the product is cut at that bond and every
/// reactant fragment is paired with the synthon holding the same largest atom
/// map. With a single changed bond or hydrogen change nothing is cut and the
/// whole reactant is paired with the whole product. An empty result means the
/// change couldn't be localized.
///
/// Fails with a fatal error when cutting yields fewer synthons than there are
/// reactant fragments, or when no bond was formed but the reactant is
/// disconnected.
pub fn synthons(
    reactant: MoleculeGraph,
    product: MoleculeGraph,
) -> Result<Vec<SynthonPair>, ReactionError> {
    let diff = Difference::compute(&reactant, &product)?;

    if !diff.added.is_empty() {
        return match diff.locate(&reactant, &product) {
            Some(location @ Location::BondFormed(bond)) => {
                let reaction_center = location.reaction_center(&product);
                let cut = product.without_bond(bond.head, bond.tail);
                split_at_bond(&reactant, &cut, reaction_center)
            }
            _ => {
                debug!("{} bonds formed, no synthons", diff.added.len());
                Ok(Vec::new())
            }
        };
    }

    let num_components = reactant.connected_components().len();
    if num_components != 1 {
        return Err(ReactionError::DisconnectedReactant(num_components));
    }

    match diff.locate(&reactant, &product) {
        Some(location) => {
            let reaction_center = location.reaction_center(&product);
            Ok(vec![SynthonPair {
                reactant,
                synthon: product,
                reaction_center,
            }])
        }
        None => Ok(Vec::new()),
    }
}

fn split_at_bond(
    reactant: &MoleculeGraph,
    cut_product: &MoleculeGraph,
    reaction_center: ReactionCenter,
) -> Result<Vec<SynthonPair>, ReactionError> {
    let reactants = reactant.fragments();
    let synthons = cut_product.fragments();
    if synthons.len() < reactants.len() {
        return Err(ReactionError::FragmentCount {
            synthons: synthons.len(),
            reactants: reactants.len(),
        });
    }

    // Atom maps are unique per reaction, so a fragment is identified by its
    // largest one.
    let synthon_ids: Vec<u32> = synthons.iter().map(|s| s.max_atom_map()).collect();
    let pairs = reactants
        .into_iter()
        .map(|fragment| {
            let id = fragment.max_atom_map();
            let index = synthon_ids.iter().position(|&s| s == id).unwrap_or_else(|| {
                warn!("No synthon carries atom map {id}, pairing with the first synthon");
                0
            });
            SynthonPair {
                reactant: fragment,
                synthon: synthons[index].clone(),
                reaction_center,
            }
        })
        .collect::<Vec<_>>();

    debug!(
        "Cut product into {} synthons for {} reactant fragments",
        synthons.len(),
        pairs.len()
    );
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{molecule_to_smiles, parse_smiles, Reaction};

    #[test]
    fn test_amide_coupling_synthons() {
        let reaction = Reaction::parse(
            "[CH3:1][C:2](=[O:3])[Cl:4].[NH2:5][CH3:6]>>[CH3:1][C:2](=[O:3])[NH:5][CH3:6]",
        )
        .unwrap();
        let pairs = synthons(reaction.reactant, reaction.product).unwrap();
        assert_eq!(pairs.len(), 2);

        // The acyl chloride (largest map 4) has no synthon with map 4, the
        // amine fragment (largest map 6) pairs with the amine synthon.
        assert_eq!(pairs[1].reactant.max_atom_map(), 6);
        assert_eq!(pairs[1].synthon.max_atom_map(), 6);
        assert_eq!(molecule_to_smiles(&pairs[1].synthon), "[NH:5][CH3:6]");
        for pair in &pairs {
            assert_eq!(pair.reaction_center, ReactionCenter::bond(2, 5));
        }
    }

    #[test]
    fn test_fragments_pair_by_largest_atom_map() {
        let reaction = Reaction::parse(
            "[CH3:6][Br:7].[OH:1][c:2]1[cH:3][cH:4][cH:5][cH:8][cH:9]1>>[CH3:6][O:1][c:2]1[cH:3][cH:4][cH:5][cH:8][cH:9]1",
        )
        .unwrap();
        let pairs = synthons(reaction.reactant, reaction.product).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].reactant.max_atom_map(), 7);
        assert_eq!(pairs[1].reactant.max_atom_map(), 9);
        assert_eq!(pairs[1].synthon.max_atom_map(), 9);
        assert_eq!(pairs[1].synthon.node_count(), 7);
        assert_eq!(pairs[0].reaction_center, ReactionCenter::bond(6, 1));
    }

    #[test]
    fn test_ring_formation_keeps_one_synthon() {
        let reactant = parse_smiles("[CH3:1][CH2:2][CH3:3]").unwrap();
        let product = parse_smiles("[CH2:1]1[CH2:2][CH2:3]1").unwrap();
        let pairs = synthons(reactant, product).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].synthon.edge_count(), 2);
        assert_eq!(pairs[0].reaction_center, ReactionCenter::bond(1, 3));
    }

    #[test]
    fn test_fewer_synthons_than_reactants_is_fatal() {
        // The counter-ion never reaches the product, so the cut leaves two
        // synthons for three reactant fragments.
        let reactant = parse_smiles("[CH3:1][CH3:2].[CH3:3][CH3:4].[Na+:5]").unwrap();
        let product = parse_smiles("[CH3:1][CH2:2][CH2:3][CH3:4]").unwrap();
        let err = synthons(reactant, product).unwrap_err();
        assert_eq!(err, ReactionError::FragmentCount { synthons: 2, reactants: 3 });
        assert!(err.is_fatal());
    }

    #[test]
    fn test_bond_change_emits_whole_pair() {
        let reactant = parse_smiles("[CH3:1][CH2:2][OH:3]").unwrap();
        let product = parse_smiles("[CH3:1][CH:2]=[O:3]").unwrap();
        let pairs = synthons(reactant, product).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].reaction_center, ReactionCenter::atom(3));
        assert_eq!(pairs[0].synthon.edge_count(), 2);
        assert_eq!(pairs[0].reactant.node_count(), 3);
    }

    #[test]
    fn test_hydrogen_change_emits_whole_pair() {
        let reactant = parse_smiles("[CH3:7][NH2:8]").unwrap();
        let product = parse_smiles("[CH3:7][NH3+:8]").unwrap();
        let pairs = synthons(reactant, product).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].reaction_center, ReactionCenter::atom(8));
    }

    #[test]
    fn test_disconnected_reactant_without_formed_bond_is_fatal() {
        let reactant = parse_smiles("[CH3:1][CH2:2][OH:3].[Na+:4]").unwrap();
        let product = parse_smiles("[CH3:1][CH:2]=[O:3]").unwrap();
        assert_eq!(
            synthons(reactant, product).unwrap_err(),
            ReactionError::DisconnectedReactant(2)
        );
    }

    #[test]
    fn test_unlocalizable_gives_no_pairs() {
        let reactant = parse_smiles("[CH3:1][CH3:2].[CH3:3][CH3:4]").unwrap();
        let product = parse_smiles("[CH2:1]1[CH2:2][CH2:3][CH2:4]1").unwrap();
        assert!(synthons(reactant, product).unwrap().is_empty());
    }
}
