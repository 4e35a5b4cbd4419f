//! The fuzzing driver: configuration, value production, corpus, mutation
//! and the session loop.

pub mod config;
pub mod mutation;
pub mod produce;
pub mod report;
pub mod runner;
pub mod statistic;

pub use config::FuzzConfig;
pub use produce::{create_all, ProduceError, Produced, ProducedCall, Producer, SlotFailure};
pub use report::{FuzzReport, InterestingCase, StopReason, TraceProfile};
pub use runner::{run_fuzzing, Executor, Fuzzer};
pub use statistic::Corpus;
