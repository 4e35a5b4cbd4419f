//! structfuzz
//!
//! Demo front end for the structural fuzzing engine in `structfuzz-core`:
//! a handful of sample callables, described with the engine's reflective
//! type model, whose simulated bodies report coverage traces.
//!
//! See [`targets`] for the targets and `structfuzz-core` for the engine.

pub mod targets;

pub use structfuzz_core as core;
pub use targets::{find, fuzz, Target, TARGETS};
