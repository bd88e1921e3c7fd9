//! Message-bus implementations that render a run for people and tools.
//!
//! Both reporters accept every message (they never cancel a run). Write errors are logged and
//! otherwise ignored so that a closed pipe cannot abort test execution.

mod console;
mod json;

pub use console::ConsoleReporter;
pub use json::JsonLinesReporter;
