use std::collections::{BTreeMap, BTreeSet, HashMap};

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use thiserror::Error;
use tracing::*;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SplitError {
    #[error("At least one split ratio is required")]
    NoRatios,
    #[error("Split ratio {0} is not a finite non-negative number")]
    InvalidRatio(f64),
}

/// Bucket ratios and the seed of the permutation that assigns samples to
/// buckets.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitConfig {
    pub ratios: Vec<f64>,
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        SplitConfig {
            ratios: vec![0.8, 0.1, 0.1],
            seed: 0,
        }
    }
}

impl SplitConfig {
    pub fn validate(&self) -> Result<(), SplitError> {
        if self.ratios.is_empty() {
            return Err(SplitError::NoRatios);
        }
        if let Some(&ratio) = self.ratios.iter().find(|r| !r.is_finite() || **r < 0.0) {
            return Err(SplitError::InvalidRatio(ratio));
        }
        Ok(())
    }

    /// Number of keys per bucket for `num_keys` keys. Every bucket but the
    /// last gets its share rounded half to even, the last takes what is left.
    pub fn key_lengths(&self, num_keys: usize) -> Vec<usize> {
        let mut lengths = Vec::with_capacity(self.ratios.len());
        let mut assigned = 0;
        for ratio in &self.ratios[..self.ratios.len().saturating_sub(1)] {
            let length = ((num_keys as f64 * ratio).round_ties_even() as usize).min(num_keys - assigned);
            assigned += length;
            lengths.push(length);
        }
        if !self.ratios.is_empty() {
            lengths.push(num_keys - assigned);
        }
        lengths
    }
}

/// Split items into buckets of whole key groups.
///
/// The distinct keys are shuffled and dealt out contiguously, `lengths[i]`
/// keys to bucket `i`; every item follows its key. Returns item positions,
/// ascending within each bucket.
pub fn key_split(keys: &[usize], lengths: &[usize], rng: &mut StdRng) -> Vec<Vec<usize>> {
    let mut unique: Vec<usize> = keys.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
    unique.shuffle(rng);

    let mut bucket_of: HashMap<usize, usize> = HashMap::new();
    let mut offset = 0;
    for (bucket, &length) in lengths.iter().enumerate() {
        for &key in unique.iter().skip(offset).take(length) {
            bucket_of.insert(key, bucket);
        }
        offset += length;
    }

    let mut buckets = vec![Vec::new(); lengths.len()];
    for (position, key) in keys.iter().enumerate() {
        if let Some(&bucket) = bucket_of.get(key) {
            buckets[bucket].push(position);
        }
    }
    buckets
}

/// Split samples per reaction type so that each bucket holds roughly its ratio
/// of every type and all samples of one sample id land in the same bucket.
///
/// `reactions[i]` and `sample_ids[i]` describe sample `i`. Returns sample
/// indices per bucket, ascending.
pub fn stratified_split(
    reactions: &[usize],
    sample_ids: &[usize],
    config: &SplitConfig,
) -> Result<Vec<Vec<usize>>, SplitError> {
    config.validate()?;
    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut by_type: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (index, &reaction) in reactions.iter().enumerate() {
        by_type.entry(reaction).or_default().push(index);
    }

    let mut buckets = vec![Vec::new(); config.ratios.len()];
    for (reaction, indices) in by_type {
        let keys: Vec<usize> = indices.iter().map(|&i| sample_ids[i]).collect();
        let num_keys = keys.iter().collect::<BTreeSet<_>>().len();
        let lengths = config.key_lengths(num_keys);
        debug!("Reaction type {reaction}: {num_keys} reactions into {lengths:?}");

        for (bucket, positions) in key_split(&keys, &lengths, &mut rng).into_iter().enumerate() {
            buckets[bucket].extend(positions.into_iter().map(|p| indices[p]));
        }
    }
    for bucket in &mut buckets {
        bucket.sort_unstable();
    }
    Ok(buckets)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket_ids(bucket: &[usize], sample_ids: &[usize]) -> BTreeSet<usize> {
        bucket.iter().map(|&i| sample_ids[i]).collect()
    }

    #[test]
    fn test_key_lengths() {
        let config = SplitConfig::default();
        assert_eq!(config.key_lengths(10), vec![8, 1, 1]);
        assert_eq!(config.key_lengths(3), vec![2, 0, 1]);
        assert_eq!(config.key_lengths(0), vec![0, 0, 0]);

        // Oversized ratios never hand out more keys than exist.
        let config = SplitConfig { ratios: vec![0.9, 0.9, 0.1], seed: 0 };
        assert_eq!(config.key_lengths(10), vec![9, 1, 0]);

        let config = SplitConfig { ratios: vec![0.5], seed: 0 };
        assert_eq!(config.key_lengths(7), vec![7]);
    }

    #[test]
    fn test_key_lengths_round_half_to_even() {
        let config = SplitConfig::default();
        assert_eq!(config.key_lengths(5), vec![4, 0, 1]);
        assert_eq!(config.key_lengths(15), vec![12, 2, 1]);
        assert_eq!(config.key_lengths(25), vec![20, 2, 3]);
    }

    #[test]
    fn test_invalid_ratios() {
        let config = SplitConfig { ratios: vec![], seed: 0 };
        assert_eq!(config.validate(), Err(SplitError::NoRatios));
        let config = SplitConfig { ratios: vec![0.5, -0.1], seed: 0 };
        assert_eq!(config.validate(), Err(SplitError::InvalidRatio(-0.1)));
        assert!(stratified_split(&[0], &[0], &config).is_err());
    }

    #[test]
    fn test_key_split_keeps_groups_together() {
        let keys = vec![0, 0, 1, 2, 2, 2, 3];
        let mut rng = StdRng::seed_from_u64(7);
        let buckets = key_split(&keys, &[2, 1, 1], &mut rng);
        assert_eq!(buckets.iter().map(Vec::len).sum::<usize>(), keys.len());

        let mut seen = BTreeSet::new();
        for bucket in &buckets {
            let ids = bucket_ids(bucket, &keys);
            assert!(ids.is_disjoint(&seen));
            seen.extend(ids);
        }
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn test_stratified_split_per_type() {
        // Type 0 has 20 reactions, type 3 has 10; some reactions expand into
        // two samples.
        let mut reactions = Vec::new();
        let mut sample_ids = Vec::new();
        for id in 0..30 {
            let reaction = if id < 20 { 0 } else { 3 };
            let copies = if id % 4 == 0 { 2 } else { 1 };
            for _ in 0..copies {
                reactions.push(reaction);
                sample_ids.push(id);
            }
        }

        let buckets = stratified_split(&reactions, &sample_ids, &SplitConfig::default()).unwrap();
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets.iter().map(Vec::len).sum::<usize>(), reactions.len());

        for (reaction, expected) in [(0, [16, 2, 2]), (3, [8, 1, 1])] {
            for (bucket, &count) in buckets.iter().zip(expected.iter()) {
                let ids: BTreeSet<usize> = bucket
                    .iter()
                    .filter(|&&i| reactions[i] == reaction)
                    .map(|&i| sample_ids[i])
                    .collect();
                assert_eq!(ids.len(), count);
            }
        }

        let train = bucket_ids(&buckets[0], &sample_ids);
        let valid = bucket_ids(&buckets[1], &sample_ids);
        let test = bucket_ids(&buckets[2], &sample_ids);
        assert!(train.is_disjoint(&valid));
        assert!(train.is_disjoint(&test));
        assert!(valid.is_disjoint(&test));
    }

    #[test]
    fn test_split_is_reproducible() {
        let reactions: Vec<usize> = (0..50).map(|i| i % 5).collect();
        let sample_ids: Vec<usize> = (0..50).collect();
        let config = SplitConfig { ratios: vec![0.6, 0.4], seed: 42 };
        let first = stratified_split(&reactions, &sample_ids, &config).unwrap();
        let second = stratified_split(&reactions, &sample_ids, &config).unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].len(), 30);
        assert_eq!(first[1].len(), 20);
    }
}
