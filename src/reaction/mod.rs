//! Reaction-center and synthon extraction for atom-mapped reactions.
//!
//! A reactant graph and a product graph share one atom-map space. The
//! [`Difference`] between them lists the product bonds that were formed or
//! changed; [`reaction_center`] turns a difference that reduces to a single
//! change into supervision labels, and [`synthons`] cuts the product at the
//! formed bond and pairs every synthon with its reactant fragment.

use std::fmt::{Display, Formatter, Result as FmtResult};

use anyhow::{Context, Result};
use thiserror::Error;

use crate::{parse_smiles, MoleculeGraph};

mod diff;
pub use diff::*;

mod center;
pub use center::*;

mod synthon;
pub use synthon::*;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReactionError {
    #[error("Product atom {node} has atom map {atom_map}, which no reactant atom carries")]
    UnmappedProductAtom { node: usize, atom_map: u32 },
    #[error("Cutting the product left {synthons} synthons for {reactants} reactant fragments")]
    FragmentCount { synthons: usize, reactants: usize },
    #[error("Reactant has {0} connected components but no bond was formed")]
    DisconnectedReactant(usize),
}

impl ReactionError {
    /// Fatal errors mean the input breaks an invariant of the extraction and
    /// processing must stop. Everything else only disqualifies one sample.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ReactionError::FragmentCount { .. } | ReactionError::DisconnectedReactant(_)
        )
    }
}

/// One or two atom-map ids locating the change of a reaction. Atom-level
/// centers leave the second slot `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReactionCenter(pub [u32; 2]);

impl ReactionCenter {
    pub fn bond(head: u32, tail: u32) -> Self {
        ReactionCenter([head, tail])
    }

    pub fn atom(atom_map: u32) -> Self {
        ReactionCenter([atom_map, 0])
    }

    pub fn is_bond(&self) -> bool {
        self.0[1] != 0
    }

    pub fn atom_maps(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied().filter(|&atom_map| atom_map != 0)
    }
}

impl Display for ReactionCenter {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}:{}", self.0[0], self.0[1])
    }
}

/// A reaction as a reactant graph and a product graph. Reagents are dropped.
#[derive(Debug, Clone)]
pub struct Reaction {
    pub reactant: MoleculeGraph,
    pub product: MoleculeGraph,
}

impl Reaction {
    /// Parse `reactants>reagents>products` reaction SMILES. Every side may hold
    /// several dot-separated molecules; each side becomes one graph.
    pub fn parse(rxn_smiles: &str) -> Result<Self> {
        let parts: Vec<&str> = rxn_smiles.trim().split('>').collect();
        if parts.len() != 3 {
            anyhow::bail!(
                "Reaction SMILES {rxn_smiles} has {} '>'-separated parts, expected 3",
                parts.len()
            );
        }
        let reactant = parse_smiles(parts[0]).context("While parsing the reactant side")?;
        let product = parse_smiles(parts[2]).context("While parsing the product side")?;
        Ok(Reaction { reactant, product })
    }
}
