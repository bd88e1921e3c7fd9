//! Provide the primitives shared by every level of the harrow runner stack.
//!
//! This crate is intentionally small. It holds the value types that flow between runner levels and the
//! single capability every level talks to:
//! - [`ExecutionSummary`]: counts and elapsed time, aggregated bottom-up.
//! - [`Fault`] / [`FaultCollector`]: captured failures from fallible extension points, branched by copy.
//! - [`CancellationSignal`]: the one-way flag shared across a run tree.
//! - [`Message`] / [`MessageBus`]: lifecycle events and the sink that can reject them.
//!
//! ## Notes
//!
//! - No runner logic lives here: no ordering, no constructor resolution, no test invocation.
//! - Everything except the recording buses is plain data with value semantics.

pub mod bus;
pub mod cancel;
pub mod collector;
pub mod fault;
pub mod message;
pub mod summary;

pub use bus::{CollectingBus, MessageBus, NullBus, StopOnFailBus};
pub use cancel::CancellationSignal;
pub use collector::{FaultCollector, capture};
pub use fault::{Fault, FlattenedFaults};
pub use message::{Message, UnitKind, UnitRef};
pub use summary::ExecutionSummary;
