//! The USPTO-50k retrosynthesis dataset: atom-mapped reactions in ten reaction
//! classes, processed into reaction-center samples or synthon samples.

use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, Writer};
use tracing::*;

use crate::{
    molecule_to_smiles, reaction::Reaction, reaction_center, synthons, MoleculeGraph,
    ReactionCenter,
};

mod split;
pub use split::*;

pub const REACTION_NAMES: [&str; 10] = [
    "Heteroatom alkylation and arylation",
    "Acylation and related processes",
    "C-C bond formation",
    "Heterocycle formation",
    "Protections",
    "Deprotections",
    "Reductions",
    "Oxidations",
    "Functional group interconversion (FGI)",
    "Functional group addition (FGA)",
];

pub const DATA_FILE: &str = "data_processed.csv";
pub const SMILES_COLUMN: &str = "rxn_smiles";
pub const CLASS_COLUMN: &str = "class";

const PROGRESS_INTERVAL: usize = 1000;

/// Name of a zero-based reaction type.
pub fn reaction_name(reaction: usize) -> Option<&'static str> {
    REACTION_NAMES.get(reaction).copied()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Uspto50kConfig {
    /// Emit (reactant, synthon) pairs instead of labeled reactant/product pairs.
    pub as_synthon: bool,
    /// Log progress while processing.
    pub verbose: bool,
}

impl Default for Uspto50kConfig {
    fn default() -> Self {
        Uspto50kConfig {
            as_synthon: false,
            verbose: true,
        }
    }
}

/// One raw row of the source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionRecord {
    pub rxn_smiles: String,
    /// One-based reaction class.
    pub class: usize,
}

/// Edge and node labels of a reaction-center sample, over the product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CenterLabels {
    pub edge_label: Vec<bool>,
    pub node_label: Vec<bool>,
}

/// A processed sample. In synthon mode `product` holds the synthon and
/// `labels` is empty.
#[derive(Debug, Clone)]
pub struct Sample {
    pub reactant: MoleculeGraph,
    pub product: MoleculeGraph,
    pub reaction_center: ReactionCenter,
    pub labels: Option<CenterLabels>,
    /// Zero-based reaction type.
    pub reaction: usize,
    /// Index of the source record. Samples expanded from one record share it.
    pub sample_id: usize,
}

#[derive(Debug, Clone)]
pub struct Uspto50k {
    samples: Vec<Sample>,
    num_records: usize,
    num_invalid: usize,
}

impl Uspto50k {
    /// Read the header-addressed `rxn_smiles` and `class` columns of `path` and
    /// process every row.
    pub fn load_csv(path: impl AsRef<Path>, config: &Uspto50kConfig) -> Result<Self> {
        let path = path.as_ref();
        let records = read_records(path)
            .with_context(|| format!("While reading reactions from {}", path.display()))?;
        info!("Loaded {} reactions from {}", records.len(), path.display());
        Self::from_records(records, config)
    }

    /// Process raw records. Records whose change can't be localized, or that
    /// don't parse, are counted as invalid and skipped; a record that breaks
    /// an extraction invariant aborts processing.
    pub fn from_records(
        records: impl IntoIterator<Item = ReactionRecord>,
        config: &Uspto50kConfig,
    ) -> Result<Self> {
        let records: Vec<ReactionRecord> = records.into_iter().collect();
        let message = if config.as_synthon {
            "Computing synthons"
        } else {
            "Computing reaction centers"
        };

        let mut dataset = Uspto50k {
            samples: Vec::new(),
            num_records: records.len(),
            num_invalid: 0,
        };
        for (sample_id, record) in records.iter().enumerate() {
            if config.verbose && sample_id % PROGRESS_INTERVAL == 0 {
                info!("{message}: {sample_id}/{}", records.len());
            }
            let added = dataset
                .process(sample_id, record, config)
                .with_context(|| format!("While processing reaction {sample_id}"))?;
            if added == 0 {
                dataset.num_invalid += 1;
            }
        }

        if config.verbose {
            info!(
                "{message}: kept {} samples from {} reactions, valid rate {:.4}",
                dataset.samples.len(),
                dataset.num_records,
                dataset.valid_rate()
            );
        }
        Ok(dataset)
    }

    /// Push the samples of one record and return how many there were.
    fn process(&mut self, sample_id: usize, record: &ReactionRecord, config: &Uspto50kConfig) -> Result<usize> {
        let reaction = match record.class.checked_sub(1).filter(|r| *r < REACTION_NAMES.len()) {
            Some(reaction) => reaction,
            None => {
                warn!("Reaction {sample_id} has unknown class {}", record.class);
                return Ok(0);
            }
        };
        let Reaction { reactant, product } = match Reaction::parse(&record.rxn_smiles) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Skipping reaction {sample_id}: {e:#}");
                return Ok(0);
            }
        };

        if config.as_synthon {
            let pairs = match synthons(reactant, product) {
                Ok(pairs) => pairs,
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    warn!("Skipping reaction {sample_id}: {e}");
                    return Ok(0);
                }
            };
            let count = pairs.len();
            self.samples.extend(pairs.into_iter().map(|pair| Sample {
                reactant: pair.reactant,
                product: pair.synthon,
                reaction_center: pair.reaction_center,
                labels: None,
                reaction,
                sample_id,
            }));
            Ok(count)
        } else {
            match reaction_center(reactant, product) {
                Ok(Some(sample)) => {
                    self.samples.push(Sample {
                        reactant: sample.reactant,
                        product: sample.product,
                        reaction_center: sample.reaction_center,
                        labels: Some(CenterLabels {
                            edge_label: sample.edge_label,
                            node_label: sample.node_label,
                        }),
                        reaction,
                        sample_id,
                    });
                    Ok(1)
                }
                Ok(None) => Ok(0),
                Err(e) if e.is_fatal() => Err(e.into()),
                Err(e) => {
                    warn!("Skipping reaction {sample_id}: {e}");
                    Ok(0)
                }
            }
        }
    }

    /// Fraction of source reactions that produced at least one sample.
    pub fn valid_rate(&self) -> f64 {
        if self.num_records == 0 {
            return 1.0;
        }
        1.0 - self.num_invalid as f64 / self.num_records as f64
    }

    pub fn num_records(&self) -> usize {
        self.num_records
    }

    pub fn num_invalid(&self) -> usize {
        self.num_invalid
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Sample> {
        self.samples.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    /// Distinct zero-based reaction types present, ascending.
    pub fn reaction_types(&self) -> Vec<usize> {
        let mut types: Vec<usize> = self.samples.iter().map(|s| s.reaction).collect();
        types.sort_unstable();
        types.dedup();
        types
    }

    pub fn num_reaction_type(&self) -> usize {
        self.reaction_types().len()
    }

    pub fn reaction_name(&self, reaction: usize) -> Option<&'static str> {
        reaction_name(reaction)
    }

    /// Split sample indices into buckets, stratified by reaction type and
    /// keeping every sample id in one bucket.
    pub fn split(&self, config: &SplitConfig) -> Result<Vec<Vec<usize>>, SplitError> {
        let reactions: Vec<usize> = self.samples.iter().map(|s| s.reaction).collect();
        let sample_ids: Vec<usize> = self.samples.iter().map(|s| s.sample_id).collect();
        stratified_split(&reactions, &sample_ids, config)
    }

    /// Write the samples at `indices` as
    /// `reactant,product,reaction_center,reaction,sample_id` rows.
    pub fn write_csv(&self, path: impl AsRef<Path>, indices: &[usize]) -> Result<()> {
        let path = path.as_ref();
        let mut writer = Writer::from_path(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        writer.write_record(["reactant", "product", "reaction_center", "reaction", "sample_id"])?;
        for &index in indices {
            let sample = self
                .get(index)
                .with_context(|| format!("Sample {index} out of range for {} samples", self.len()))?;
            writer.write_record([
                molecule_to_smiles(&sample.reactant),
                molecule_to_smiles(&sample.product),
                sample.reaction_center.to_string(),
                sample.reaction.to_string(),
                sample.sample_id.to_string(),
            ])?;
        }
        writer.flush()?;
        debug!("Wrote {} samples to {}", indices.len(), path.display());
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Uspto50k {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn read_records(path: &Path) -> Result<Vec<ReactionRecord>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|header| header.trim() == name)
            .with_context(|| format!("Missing column {name}"))
    };
    let smiles_column = column(SMILES_COLUMN)?;
    let class_column = column(CLASS_COLUMN)?;

    let mut records = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let rxn_smiles = record.get(smiles_column).unwrap_or("").trim().to_string();
        let class = record.get(class_column).unwrap_or("").trim();
        let class = class
            .parse::<usize>()
            .with_context(|| format!("Row {row} has non-integer class {class:?}"))?;
        records.push(ReactionRecord { rxn_smiles, class });
    }
    Ok(records)
}
