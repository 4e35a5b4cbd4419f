//! Structfuzz Core
//!
//! Feedback-directed structural fuzzing engine.
//!
//! Given the parameter types of a callable, the engine produces structurally
//! valid argument values (objects built through constructors and setters,
//! collections, boundary-heavy primitives), hands them to an executor and
//! steers further generation by the coverage traces it reports back.
//!
//! # Core Modules
//!
//! - [`known`]: bit-exact integer, float and string values with presets
//! - [`seed`]: seeds and routines, the recipes providers hand out
//! - [`types`]: resolution of host types into a cyclic type graph
//! - [`provider`]: value providers and the default provider set
//! - [`trie`] and [`feedback`]: coverage trie and executor verdicts
//! - [`fuzz`]: the driver loop, corpus and structural mutation
//! - [`mutators`]: post-hoc value mutators
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use structfuzz_core::fuzz::{FuzzConfig, Fuzzer};
//! use structfuzz_core::model::IdGenerator;
//! use structfuzz_core::provider::default_value_providers;
//!
//! let registry = default_value_providers(Arc::new(IdGenerator::new()));
//! let report = Fuzzer::new(&registry, FuzzConfig::default().with_max_runs(1000))
//!     .run(&description, |_receiver, _description, values| run_target(values))?;
//! ```

#![allow(clippy::type_complexity)]

pub mod description;
pub mod error;
pub mod feedback;
pub mod fuzz;
pub mod known;
pub mod model;
pub mod mutators;
pub mod provider;
pub mod seed;
pub mod trie;
pub mod types;

pub use description::{Comparison, Constant, ConstantContext, ConstantValue, Description, Scope, ScopeProperty};
pub use error::{FuzzError, Result};
pub use feedback::{Control, Feedback};
pub use fuzz::{run_fuzzing, Executor, FuzzConfig, FuzzReport, Fuzzer, StopReason};
pub use model::{FuzzedValue, IdGenerator, MethodCall};
pub use mutators::{default_mutators, Mutator, MutatorChain};
pub use provider::{default_value_providers, ProviderRegistry, SeedIter, ValueProvider, ValueProviderExt};
pub use seed::Seed;
pub use trie::{NodeId, Trie};
pub use types::{FuzzedType, TypeArena, TypeCache};
