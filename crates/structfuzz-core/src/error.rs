//! Error types for the fuzzing engine.

/// Errors surfaced by the engine's fallible entry points.
///
/// Production failures inside a fuzzing session are not errors: a
/// combination that cannot be built is abandoned and counted in the report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FuzzError {
    #[error("no value provider produced a seed for type {type_name}")]
    NoProducibleValue { type_name: String },

    #[error("invalid configuration for `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("unsupported pattern `{pattern}`: {reason}")]
    UnsupportedPattern { pattern: String, reason: String },
}

pub type Result<T, E = FuzzError> = std::result::Result<T, E>;
