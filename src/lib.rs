use petgraph::graph::UnGraph;

mod atom;
pub use atom::*;

mod graph;
pub use graph::*;

mod parse;
pub use parse::*;

pub mod reaction;
pub use reaction::{
    reaction_center, synthons, Correspondence, Difference, ReactionCenter,
    Reaction, ReactionCenterSample, ReactionError, SynthonPair,
};

pub mod dataset;
pub use dataset::{Uspto50k, Uspto50kConfig};

mod visualize;
pub use visualize::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bond {
    Single,
    Double,
    Triple,
    Aromatic,
}

impl Bond {
    /// Bond order used for valence bookkeeping. Aromatic bonds count as one,
    /// the shared pi electron is accounted for per atom.
    pub fn valence(&self) -> u32 {
        match self {
            Bond::Single | Bond::Aromatic => 1,
            Bond::Double => 2,
            Bond::Triple => 3,
        }
    }
}

pub type MoleculeGraph = UnGraph<Atom, Bond>;

/// Install a `tracing` subscriber printing events at `level` and above.
///
/// Unknown levels fall back to `info`. Calling this more than once is harmless,
/// later calls leave the first subscriber in place.
pub fn init_logging(level: &str) {
    let level = level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init();
}
