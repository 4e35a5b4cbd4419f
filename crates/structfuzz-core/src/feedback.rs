//! What an executor reports back after running one combination.

use serde::{Deserialize, Serialize};

/// How the driver proceeds after an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Control {
    /// Record the result and keep fuzzing.
    Continue,
    /// Keep fuzzing but ignore this result entirely.
    Pass,
    /// End the session.
    Stop,
    /// The execution exceeded its time limit; the combination is not kept.
    Timeout,
}

/// The executor's verdict plus an optional coverage trace.
///
/// The driver inserts the trace into its coverage trie; novelty is decided
/// there, not by the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback<K> {
    pub control: Control,
    pub trace: Option<Vec<K>>,
}

impl<K> Feedback<K> {
    pub fn new(control: Control, trace: Option<Vec<K>>) -> Self {
        Self { control, trace }
    }

    /// Keep fuzzing and record `trace`.
    pub fn traced(trace: Vec<K>) -> Self {
        Self::new(Control::Continue, Some(trace))
    }

    pub fn proceed() -> Self {
        Self::new(Control::Continue, None)
    }

    pub fn pass() -> Self {
        Self::new(Control::Pass, None)
    }

    pub fn stop() -> Self {
        Self::new(Control::Stop, None)
    }

    pub fn timeout() -> Self {
        Self::new(Control::Timeout, None)
    }

    pub fn with_control(self, control: Control) -> Self {
        Self { control, ..self }
    }
}
