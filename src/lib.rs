#![forbid(unsafe_code)]
//! harrow: a hierarchical test-execution engine for xUnit-style test frameworks
//!
//! Discovery produces an object model (assembly → collection → class → method → case); the runner stack
//! drives it level by level, reports lifecycle messages to a [`MessageBus`], aggregates faults from
//! extension points without aborting the run, and rolls execution summaries up the tree.
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//!
//! - **Extension points**: Panics raised by test subjects, hooks, orderers, resolvers and data sources are
//!   caught and reported as faults of type `harrow::Panic`. They never unwind through a runner.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod cli;
pub mod config;
pub mod extension;
pub mod model;
pub mod report;
pub mod runner;
pub mod script;

pub use harrow_core::{
    CancellationSignal, CollectingBus, ExecutionSummary, Fault, FaultCollector, FlattenedFaults, Message, MessageBus,
    NullBus, StopOnFailBus, UnitKind, UnitRef, capture,
};

pub use config::RunnerConfig;
pub use runner::{RunContext, TestAssemblyRunner};
pub use script::Suite;
