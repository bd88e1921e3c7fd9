//! Lifecycle messages emitted by the runner stack.
//!
//! Every level emits `Starting` / `Finished`; tests additionally emit exactly one of `Skipped`, `Passed`
//! or `Failed`; any level may emit `CleanupFailure` when one of its lifecycle hooks faulted. Messages
//! serialize to JSON with a `type` tag and durations rendered as decimal seconds.

use std::fmt;
use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::fault::{Fault, FlattenedFaults};
use crate::summary::ExecutionSummary;

/// The tier of the test hierarchy a message is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UnitKind {
    Assembly,
    Collection,
    Class,
    Method,
    Case,
    Test,
}

impl UnitKind {
    pub fn as_str(self) -> &'static str {
        match self {
            UnitKind::Assembly => "assembly",
            UnitKind::Collection => "collection",
            UnitKind::Class => "class",
            UnitKind::Method => "method",
            UnitKind::Case => "case",
            UnitKind::Test => "test",
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of the unit a message is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitRef {
    pub kind: UnitKind,
    pub unique_id: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl UnitRef {
    pub fn new(kind: UnitKind, unique_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            kind,
            unique_id: unique_id.into(),
            display_name: display_name.into(),
            parent_id: None,
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }
}

/// A lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Message {
    Starting {
        unit: UnitRef,
    },
    Finished {
        unit: UnitRef,
        #[serde(serialize_with = "as_seconds")]
        time: Duration,
        total: u32,
        failed: u32,
        skipped: u32,
    },
    Skipped {
        unit: UnitRef,
        reason: String,
    },
    Passed {
        unit: UnitRef,
        #[serde(serialize_with = "as_seconds")]
        time: Duration,
        output: String,
    },
    Failed {
        unit: UnitRef,
        #[serde(serialize_with = "as_seconds")]
        time: Duration,
        output: String,
        #[serde(flatten)]
        faults: FlattenedFaults,
    },
    CleanupFailure {
        unit: UnitRef,
        #[serde(flatten)]
        faults: FlattenedFaults,
    },
    /// Out-of-band notice for the diagnostic sink (orderer fallbacks and the like).
    Diagnostic {
        message: String,
    },
}

impl Message {
    pub fn starting(unit: UnitRef) -> Self {
        Message::Starting { unit }
    }

    pub fn finished(unit: UnitRef, summary: &ExecutionSummary) -> Self {
        Message::Finished {
            unit,
            time: summary.time,
            total: summary.total,
            failed: summary.failed,
            skipped: summary.skipped,
        }
    }

    pub fn failed(unit: UnitRef, time: Duration, output: String, fault: &Fault) -> Self {
        Message::Failed {
            unit,
            time,
            output,
            faults: fault.flatten(),
        }
    }

    pub fn cleanup_failure(unit: UnitRef, fault: &Fault) -> Self {
        Message::CleanupFailure {
            unit,
            faults: fault.flatten(),
        }
    }

    pub fn diagnostic(message: impl Into<String>) -> Self {
        Message::Diagnostic {
            message: message.into(),
        }
    }

    /// The unit this message is about, if any.
    pub fn unit(&self) -> Option<&UnitRef> {
        match self {
            Message::Starting { unit }
            | Message::Finished { unit, .. }
            | Message::Skipped { unit, .. }
            | Message::Passed { unit, .. }
            | Message::Failed { unit, .. }
            | Message::CleanupFailure { unit, .. } => Some(unit),
            Message::Diagnostic { .. } => None,
        }
    }

    /// Short name of the message type, as used in the JSON `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Message::Starting { .. } => "starting",
            Message::Finished { .. } => "finished",
            Message::Skipped { .. } => "skipped",
            Message::Passed { .. } => "passed",
            Message::Failed { .. } => "failed",
            Message::CleanupFailure { .. } => "cleanupFailure",
            Message::Diagnostic { .. } => "diagnostic",
        }
    }

    /// Check whether this message is about a unit of `kind`.
    pub fn is_for(&self, kind: UnitKind) -> bool {
        self.unit().is_some_and(|unit| unit.kind == kind)
    }
}

fn as_seconds<S: Serializer>(time: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(time.as_secs_f64())
}
