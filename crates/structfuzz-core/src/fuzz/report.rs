//! Report types for fuzzing sessions.

use serde::{Deserialize, Serialize};

use crate::error::FuzzError;
use crate::feedback::Control;

/// Complete report from a fuzzing session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuzzReport {
    /// Random seed used.
    pub seed: u64,
    /// Sampling iterations, including abandoned combinations.
    pub iterations: u64,
    /// Executor invocations.
    pub executions: u64,
    /// Combinations dropped because some slot had no value.
    pub abandoned: u64,
    /// Executions whose trace ended at a node no earlier trace ended at.
    pub new_paths: u64,
    pub timeouts: u64,
    pub passes: u64,
    pub stop_reason: StopReason,
    /// Types that yielded no seeds, in the order they were first missed.
    pub missed_types: Vec<String>,
    /// Elapsed time in milliseconds.
    pub elapsed_ms: u64,
    /// Nodes in the coverage trie at session end, root included.
    pub trie_nodes: usize,
    /// Trace length profile across all traced executions.
    pub trace_profile: TraceProfile,
    /// First novel cases, in discovery order.
    pub interesting_cases: Vec<InterestingCase>,
}

/// Why the session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StopReason {
    /// The executor returned [`Control::Stop`].
    ExecutorStop,
    RunBudget,
    IterationBudget,
    TimeBudget,
    Cancelled,
    /// A top-level parameter type has no seeds at all.
    NoProducibleValue { type_name: String },
    /// Nothing to produce; the executor was never called.
    NoParameters,
    /// Too many combinations in a row were abandoned.
    TooManyFailures,
}

impl StopReason {
    /// The error behind a session that could not fuzz its target at all.
    pub fn as_error(&self) -> Option<FuzzError> {
        match self {
            StopReason::NoProducibleValue { type_name } => Some(FuzzError::NoProducibleValue {
                type_name: type_name.clone(),
            }),
            _ => None,
        }
    }
}

/// Trace length statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceProfile {
    pub min: usize,
    pub max: usize,
    pub avg: usize,
    pub p50: usize,
    pub p99: usize,
    /// The inputs that produced the longest trace (human-readable).
    pub max_input: Vec<String>,
}

impl TraceProfile {
    /// Compute the profile from a list of trace lengths.
    pub fn from_values(lengths: &mut [usize], max_input: Vec<String>) -> Self {
        if lengths.is_empty() {
            return Self {
                max_input,
                ..Default::default()
            };
        }

        lengths.sort_unstable();
        let len = lengths.len();
        let sum: usize = lengths.iter().sum();

        Self {
            min: lengths[0],
            max: lengths[len - 1],
            avg: sum / len,
            p50: lengths[len / 2],
            p99: lengths[((len as f64 * 0.99) as usize).min(len - 1)],
            max_input,
        }
    }
}

/// An execution that reached a new coverage path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterestingCase {
    /// Sampling iteration this occurred on.
    pub iteration: u64,
    /// Executor invocation number, starting at 1.
    pub run: u64,
    pub control: Control,
    /// Receiver first, if any, then the parameters.
    pub inputs_human: Vec<String>,
    pub trace_len: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_profile_from_values() {
        let mut values = vec![5, 1, 3, 2, 4];
        let profile = TraceProfile::from_values(&mut values, vec!["x".into()]);
        assert_eq!(profile.min, 1);
        assert_eq!(profile.max, 5);
        assert_eq!(profile.avg, 3);
        assert_eq!(profile.p50, 3);
        assert_eq!(profile.p99, 5);
        assert_eq!(profile.max_input, vec!["x".to_string()]);
    }

    #[test]
    fn test_trace_profile_empty() {
        let profile = TraceProfile::from_values(&mut [], vec![]);
        assert_eq!(profile.min, 0);
        assert_eq!(profile.max, 0);
    }

    #[test]
    fn test_stop_reason_serialization() {
        let reason = StopReason::NoProducibleValue {
            type_name: "Socket".into(),
        };
        let json = serde_json::to_string(&reason).unwrap();
        assert!(json.contains("\"type\":\"NoProducibleValue\""));
        assert!(json.contains("\"type_name\":\"Socket\""));
        assert_eq!(
            reason.as_error(),
            Some(FuzzError::NoProducibleValue {
                type_name: "Socket".into()
            })
        );
        assert_eq!(StopReason::RunBudget.as_error(), None);
    }
}
