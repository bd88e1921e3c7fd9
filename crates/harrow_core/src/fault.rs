//! Captured failures and their flattened wire form.
//!
//! A [`Fault`] is a tree: a failure plus the inner causes that produced it. Reporters never see the tree;
//! they receive [`FlattenedFaults`], a set of parallel arrays where `parent_indices[i]` points at the fault
//! whose immediate inner cause is fault `i` (or `-1` for the root).

use std::any::Any;
use std::error::Error;

use serde::{Deserialize, Serialize};

/// Fault type name for the collapsed form of several faults.
pub const AGGREGATE: &str = "harrow::AggregateFault";
/// Fault type name for a panic raised by an extension point.
pub const PANIC: &str = "harrow::Panic";
/// Fault type name for a class whose constructor arguments could not be resolved.
pub const CONSTRUCTION_FAILURE: &str = "harrow::ConstructionFailure";
/// Fault type name for a test case that exists only to report a discovery-time error.
pub const EXECUTION_ERROR: &str = "harrow::ExecutionError";
/// Fault type name for a data source that failed to enumerate its rows.
pub const DATA_DISCOVERY_FAILURE: &str = "harrow::DataDiscoveryFailure";
/// Fault type name used for the `source()` chain of a converted [`std::error::Error`].
pub const ERROR_SOURCE: &str = "std::error::Error";
/// Fault type name for a test that skipped itself while running.
pub const DYNAMIC_SKIP: &str = "harrow::DynamicSkip";
/// Prefix of a fault message that turns a failure into a skip; the rest of the message is the reason.
pub const SKIP_TOKEN: &str = "$harrow::skip$";

const AGGREGATE_MESSAGE: &str = "One or more faults occurred.";

/// A captured failure: type name, message, optional stack trace and inner causes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub type_name: String,
    pub message: String,
    pub stack_trace: Option<String>,
    pub inner: Vec<Fault>,
}

impl Fault {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            stack_trace: None,
            inner: Vec::new(),
        }
    }

    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = Some(stack_trace.into());
        self
    }

    pub fn with_inner(mut self, inner: Fault) -> Self {
        self.inner.push(inner);
        self
    }

    /// Collapse several faults into one aggregate whose inner causes are `faults`, in order.
    pub fn aggregate(faults: Vec<Fault>) -> Self {
        Self {
            type_name: AGGREGATE.to_string(),
            message: AGGREGATE_MESSAGE.to_string(),
            stack_trace: None,
            inner: faults,
        }
    }

    /// Convert a Rust error, following its `source()` chain as nested inner causes.
    pub fn from_error<E: Error + 'static>(error: &E) -> Self {
        let mut fault = Fault::new(std::any::type_name::<E>(), error.to_string());
        fault.inner = source_chain(error.source());
        fault
    }

    /// A fault that, when it is the only fault of a test, reports the test as skipped with `reason`.
    pub fn skip(reason: impl AsRef<str>) -> Self {
        Fault::new(DYNAMIC_SKIP, format!("{SKIP_TOKEN}{}", reason.as_ref()))
    }

    /// Convert a panic payload caught by `catch_unwind`.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        Fault::new(PANIC, message)
    }

    /// The skip reason carried by a fault built with [`Fault::skip`], or any fault whose message starts
    /// with [`SKIP_TOKEN`].
    pub fn skip_reason(&self) -> Option<&str> {
        self.message.strip_prefix(SKIP_TOKEN)
    }

    /// Flatten into the wire form: a pre-order walk with parent indices.
    pub fn flatten(&self) -> FlattenedFaults {
        let mut flat = FlattenedFaults::default();
        flatten_into(self, -1, &mut flat);
        flat
    }
}

fn source_chain(mut source: Option<&(dyn Error + 'static)>) -> Vec<Fault> {
    // Each source is the inner cause of the previous one, so the chain nests rather than fans out.
    let mut chain = Vec::new();
    while let Some(err) = source {
        chain.push(Fault::new(ERROR_SOURCE, err.to_string()));
        source = err.source();
    }
    chain.into_iter().rev().fold(Vec::new(), |inner, mut fault| {
        fault.inner = inner;
        vec![fault]
    })
}

fn flatten_into(fault: &Fault, parent: i32, flat: &mut FlattenedFaults) {
    let index = flat.types.len() as i32;
    flat.types.push(fault.type_name.clone());
    flat.messages.push(fault.message.clone());
    flat.stack_traces.push(fault.stack_trace.clone());
    flat.parent_indices.push(parent);

    for inner in &fault.inner {
        flatten_into(inner, index, flat);
    }
}

/// Wire form of a fault tree.
///
/// The four arrays always have the same length. Index 0 is the root and has parent `-1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlattenedFaults {
    #[serde(rename = "faultTypes")]
    pub types: Vec<String>,
    #[serde(rename = "faultMessages")]
    pub messages: Vec<String>,
    #[serde(rename = "faultStackTraces")]
    pub stack_traces: Vec<Option<String>>,
    #[serde(rename = "faultParentIndices")]
    pub parent_indices: Vec<i32>,
}

impl FlattenedFaults {
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Indices of the faults whose immediate parent is `index`, in order.
    pub fn children_of(&self, index: usize) -> Vec<usize> {
        self.parent_indices
            .iter()
            .enumerate()
            .skip(index + 1)
            .filter(|(_, parent)| **parent == index as i32)
            .map(|(i, _)| i)
            .collect()
    }

    /// Render every message of the tree, one per line, inner causes indented with `----`.
    ///
    /// Faults of harrow's own types print only their message; everything else is prefixed with its
    /// type name (`my::Error : message`).
    pub fn combined_messages(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        self.message_at(0, 0)
    }

    fn message_at(&self, index: usize, level: usize) -> String {
        let mut result = String::new();
        if level > 0 {
            result.push_str(&"----".repeat(level));
            result.push(' ');
        }

        let type_name = self.types.get(index).map(String::as_str).unwrap_or_default();
        if !type_name.starts_with("harrow::") {
            result.push_str(type_name);
            result.push_str(" : ");
        }
        result.push_str(self.messages.get(index).map(String::as_str).unwrap_or_default());

        for child in self.children_of(index) {
            result.push('\n');
            result.push_str(&self.message_at(child, level + 1));
        }
        result
    }

    /// Render the stack traces of the tree, separating inner causes with headers.
    pub fn combined_stack_traces(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        self.stack_trace_at(0)
    }

    fn stack_trace_at(&self, index: usize) -> String {
        let mut result = self
            .stack_traces
            .get(index)
            .cloned()
            .flatten()
            .unwrap_or_default();

        let children = self.children_of(index);
        if children.len() > 1 {
            for (n, child) in children.iter().enumerate() {
                result.push_str(&format!(
                    "\n----- Inner Stack Trace #{} ({}) -----\n{}",
                    n + 1,
                    self.types[*child],
                    self.stack_trace_at(*child)
                ));
            }
        } else if let Some(child) = children.first() {
            result.push_str(&format!(
                "\n----- Inner Stack Trace -----\n{}",
                self.stack_trace_at(*child)
            ));
        }
        result
    }
}
