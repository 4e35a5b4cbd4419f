//! Session configuration.

use serde::{Deserialize, Serialize};

use crate::error::{FuzzError, Result};

/// Configuration for a fuzzing session.
///
/// Every field has a default, so a JSON file only needs the knobs it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzConfig {
    /// Random seed for reproducibility.
    pub seed: u64,
    /// Stop after this many executor invocations.
    pub max_runs: Option<u64>,
    /// Stop after this many sampling iterations, abandoned ones included.
    pub max_iterations: Option<u64>,
    /// Stop after this much wall-clock time.
    pub time_budget_ms: Option<u64>,
    /// Recursive and collection seeds deeper than this produce their empty
    /// form.
    pub recursion_tree_depth: usize,
    /// Upper bound on elements per generated collection.
    pub collection_iterations: usize,
    pub prob_empty_collection: f64,
    /// Fill a collection with copies of one produced element.
    pub prob_collection_duplication: f64,
    /// Nested collections reuse the size of their parent.
    pub prob_rectangle_collection: f64,
    /// Cap on modification calls applied to one object.
    pub max_recursive_modifications: usize,
    pub prob_reuse_value_for_same_type: f64,
    /// Re-run a stored corpus entry instead of generating a new combination.
    pub prob_seed_retrieving: f64,
    /// Mutate a freshly generated combination before running it.
    pub prob_mutation_rate: f64,
    pub prob_constructor_mutation: f64,
    pub prob_shuffle_and_cut_modifications: f64,
    pub prob_collection_shuffle: f64,
    pub max_string_length_when_mutated: usize,
    /// Nested types without seeds fall back to their parent's empty form.
    pub generate_empty_for_missed_types: bool,
    /// Combinations kept per coverage node.
    pub minset_size: usize,
    /// Seeds pulled from a provider stream for one type.
    pub max_seeds_per_type: usize,
    /// Abandoned combinations in a row before the session gives up.
    pub max_consecutive_failures: u64,
    /// Chance to run the attached mutator chain on one materialized value.
    pub prob_post_mutation: f64,
    /// Novel cases kept in the report.
    pub interesting_cases_limit: usize,
}

impl Default for FuzzConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            max_runs: None,
            max_iterations: None,
            time_budget_ms: None,
            recursion_tree_depth: 4,
            collection_iterations: 5,
            prob_empty_collection: 0.2,
            prob_collection_duplication: 0.1,
            prob_rectangle_collection: 0.5,
            max_recursive_modifications: 10,
            prob_reuse_value_for_same_type: 0.1,
            prob_seed_retrieving: 0.7,
            prob_mutation_rate: 0.2,
            prob_constructor_mutation: 0.3,
            prob_shuffle_and_cut_modifications: 0.2,
            prob_collection_shuffle: 0.25,
            max_string_length_when_mutated: 64,
            generate_empty_for_missed_types: true,
            minset_size: 4,
            max_seeds_per_type: 1024,
            max_consecutive_failures: 1000,
            prob_post_mutation: 0.0,
            interesting_cases_limit: 32,
        }
    }
}

impl FuzzConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_runs(mut self, runs: u64) -> Self {
        self.max_runs = Some(runs);
        self
    }

    pub fn with_max_iterations(mut self, iterations: u64) -> Self {
        self.max_iterations = Some(iterations);
        self
    }

    /// Check probabilities and limits.
    pub fn validate(&self) -> Result<()> {
        let probabilities = [
            ("prob_empty_collection", self.prob_empty_collection),
            ("prob_collection_duplication", self.prob_collection_duplication),
            ("prob_rectangle_collection", self.prob_rectangle_collection),
            ("prob_reuse_value_for_same_type", self.prob_reuse_value_for_same_type),
            ("prob_seed_retrieving", self.prob_seed_retrieving),
            ("prob_mutation_rate", self.prob_mutation_rate),
            ("prob_constructor_mutation", self.prob_constructor_mutation),
            (
                "prob_shuffle_and_cut_modifications",
                self.prob_shuffle_and_cut_modifications,
            ),
            ("prob_collection_shuffle", self.prob_collection_shuffle),
            ("prob_post_mutation", self.prob_post_mutation),
        ];
        for (field, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                return Err(FuzzError::InvalidConfig {
                    field,
                    reason: format!("probability must be in [0, 1], got {p}"),
                });
            }
        }
        let limits = [
            ("recursion_tree_depth", self.recursion_tree_depth),
            ("collection_iterations", self.collection_iterations),
            ("minset_size", self.minset_size),
            ("max_seeds_per_type", self.max_seeds_per_type),
        ];
        for (field, limit) in limits {
            if limit == 0 {
                return Err(FuzzError::InvalidConfig {
                    field,
                    reason: "must be at least 1".to_string(),
                });
            }
        }
        if self.max_consecutive_failures == 0 {
            return Err(FuzzError::InvalidConfig {
                field: "max_consecutive_failures",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(FuzzConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: FuzzConfig =
            serde_json::from_str(r#"{"seed": 42, "recursion_tree_depth": 7}"#).unwrap();
        assert_eq!(config.seed, 42);
        assert_eq!(config.recursion_tree_depth, 7);
        assert_eq!(config.minset_size, 4);
        assert_eq!(config.max_runs, None);
    }

    #[test]
    fn test_rejects_bad_probability() {
        let config = FuzzConfig {
            prob_mutation_rate: 1.5,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            FuzzError::InvalidConfig {
                field: "prob_mutation_rate",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_zero_depth() {
        let config = FuzzConfig {
            recursion_tree_depth: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
