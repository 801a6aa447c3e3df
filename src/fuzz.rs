//! Randomised testing of the tree: build many trees from random key
//! sequences and run each through the validator.

use std::fmt;

use log::{debug, error, info};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::rbtree::RBTree;
use crate::validate::{self, Violation};

pub type Key = u64;

/// How far past `nodes` the key range reaches by default.
pub const DEFAULT_HEADROOM: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("the number of trees must be at least 1")]
    NoTrials,
    #[error("the number of nodes per tree must be at least 1")]
    NoNodes,
    #[error("the key headroom must be at least 1")]
    NoHeadroom,
    #[error("keys 1..{nodes} + {headroom} don't fit in a usize")]
    KeyRangeOverflow { nodes: usize, headroom: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzConfig {
    /// Number of trees to build.
    pub trials: usize,
    /// Keys per tree.
    pub nodes: usize,
    /// Keys are drawn from `1..nodes + headroom`.
    pub headroom: usize,
    /// Seed for the key generator. A random one is picked (and logged) when unset.
    pub seed: Option<u64>,
}

impl FuzzConfig {
    pub fn new(trials: usize, nodes: usize) -> Result<Self, ConfigError> {
        let config = Self { trials, nodes, headroom: DEFAULT_HEADROOM, seed: None };
        config.validate()?;
        Ok(config)
    }

    pub fn with_seed(self, seed: u64) -> Self {
        Self { seed: Some(seed), ..self }
    }

    pub fn with_headroom(self, headroom: usize) -> Result<Self, ConfigError> {
        let config = Self { headroom, ..self };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trials == 0 {
            return Err(ConfigError::NoTrials);
        }
        if self.nodes == 0 {
            return Err(ConfigError::NoNodes);
        }
        if self.headroom == 0 {
            return Err(ConfigError::NoHeadroom);
        }
        key_range(self.nodes, self.headroom).ok_or(ConfigError::KeyRangeOverflow {
            nodes: self.nodes,
            headroom: self.headroom,
        })?;
        Ok(())
    }
}

/// Number of candidate keys in `1..n + headroom`, or `None` if that range
/// doesn't fit in a `usize`. A `headroom` of zero is treated as one.
fn key_range(n: usize, headroom: usize) -> Option<usize> {
    n.checked_add(headroom.max(1) - 1)
}

/// Samples `n` distinct keys from `1..n + headroom`, in random order.
///
/// A `headroom` of zero is treated as one. A range too wide for a `usize`
/// (which `FuzzConfig::validate` rejects) is clamped to `usize::MAX` keys.
pub fn random_keys<R: Rng + ?Sized>(rng: &mut R, n: usize, headroom: usize) -> Vec<Key> {
    let range = key_range(n, headroom).unwrap_or(usize::MAX);
    index::sample(rng, range, n)
        .into_iter()
        .map(|i| i as Key + 1)
        .collect()
}

/// Inserts `keys` into a fresh tree in the given order. Used to rebuild a
/// tree from a failing trial's key list.
pub fn build_tree<K: Ord>(keys: impl IntoIterator<Item = K>) -> RBTree<K> {
    keys.into_iter().collect()
}

/// A tree that failed validation, with everything needed to rebuild it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialFailure {
    pub trial: usize,
    pub keys: Vec<Key>,
    pub violation: Violation<Key>,
    pub rendering: String,
}

impl fmt::Display for TrialFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "trial {}: {}", self.trial, self.violation)?;
        writeln!(f, "keys: {:?}", self.keys)?;
        f.write_str(&self.rendering)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzReport {
    pub seed: u64,
    pub trials: usize,
    pub failures: Vec<TrialFailure>,
}

impl FuzzReport {
    pub fn passed(&self) -> usize {
        self.trials - self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for FuzzReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} trees passed (seed {})", self.passed(), self.trials, self.seed)
    }
}

/// Builds one random tree and validates it.
pub fn run_trial<R: Rng + ?Sized>(
    rng: &mut R,
    trial: usize,
    nodes: usize,
    headroom: usize,
) -> Option<TrialFailure> {
    let keys = random_keys(rng, nodes, headroom);
    let tree = build_tree(keys.iter().copied());

    match validate::check(&tree) {
        Ok(()) => {
            debug!(
                "trial {trial}: ok (height {}, black height {})",
                tree.height(),
                tree.black_height()
            );
            None
        }
        Err(violation) => {
            error!("trial {trial}: {violation}; keys {keys:?}");
            Some(TrialFailure {
                trial,
                keys,
                violation,
                rendering: tree.to_string(),
            })
        }
    }
}

/// Runs every trial in `config`. Failing trees are collected, not fatal.
pub fn run(config: &FuzzConfig) -> FuzzReport {
    let seed = config.seed.unwrap_or_else(rand::random);
    info!("building {} trees of {} nodes (seed {seed})", config.trials, config.nodes);

    let mut rng = StdRng::seed_from_u64(seed);
    let failures: Vec<_> = (0..config.trials)
        .filter_map(|trial| run_trial(&mut rng, trial, config.nodes, config.headroom))
        .collect();

    let report = FuzzReport { seed, trials: config.trials, failures };
    info!("{report}");
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn keys_are_distinct_and_in_range() {
        let mut rng = StdRng::seed_from_u64(1);
        for n in [1, 2, 70, 500] {
            let keys = random_keys(&mut rng, n, DEFAULT_HEADROOM);
            assert_eq!(keys.len(), n);
            assert_eq!(keys.iter().collect::<HashSet<_>>().len(), n);
            assert!(keys.iter().all(|&k| (1..(n + DEFAULT_HEADROOM) as Key).contains(&k)));
        }
    }

    #[test]
    fn tight_range_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut keys = random_keys(&mut rng, 64, 1);
        keys.sort();
        assert_eq!(keys, (1..=64).collect::<Vec<Key>>());
    }

    #[test]
    fn config_rejects_zero() {
        assert_eq!(FuzzConfig::new(0, 10), Err(ConfigError::NoTrials));
        assert_eq!(FuzzConfig::new(10, 0), Err(ConfigError::NoNodes));
        assert_eq!(
            FuzzConfig::new(1, 1).and_then(|c| c.with_headroom(0)),
            Err(ConfigError::NoHeadroom)
        );
    }

    #[test]
    fn config_rejects_key_range_past_usize() {
        let config = FuzzConfig::new(1, 2).unwrap();
        assert_eq!(
            config.clone().with_headroom(usize::MAX),
            Err(ConfigError::KeyRangeOverflow { nodes: 2, headroom: usize::MAX })
        );
        assert!(config.clone().with_headroom(usize::MAX - 1).is_ok());

        let mut widened = config;
        widened.headroom = usize::MAX;
        assert!(widened.validate().is_err());
    }

    #[test]
    fn oversized_range_does_not_panic() {
        let mut rng = StdRng::seed_from_u64(3);
        let keys = random_keys(&mut rng, 2, usize::MAX);
        assert_eq!(keys.len(), 2);
        assert_ne!(keys[0], keys[1]);
        assert!(keys.iter().all(|&k| k >= 1));
    }

    #[test]
    fn clean_run() {
        let config = FuzzConfig::new(50, 70).unwrap().with_seed(7);
        let report = run(&config);

        assert_eq!(report.seed, 7);
        assert_eq!(report.trials, 50);
        assert_eq!(report.passed(), 50);
        assert!(report.is_clean());
        assert_eq!(report.to_string(), "50/50 trees passed (seed 7)");
    }

    #[test]
    fn seeded_runs_repeat() {
        let draw = |seed| random_keys(&mut StdRng::seed_from_u64(seed), 30, 10);
        assert_eq!(draw(99), draw(99));
    }

    #[test]
    fn failures_are_rebuildable() {
        // a tree holding a duplicate is the one failure the engine can produce
        let tree = build_tree([4, 2, 4]);
        let violation = validate::check(&tree).unwrap_err();
        let failure = TrialFailure {
            trial: 3,
            keys: vec![4, 2, 4],
            violation,
            rendering: tree.to_string(),
        };

        let shown = failure.to_string();
        assert!(shown.starts_with("trial 3: there were duplicate keys (4)\nkeys: [4, 2, 4]\n"));
        assert_eq!(build_tree(failure.keys.iter().copied()).to_string(), failure.rendering);
    }
}
