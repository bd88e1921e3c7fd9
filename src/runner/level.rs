//! The lifecycle shared by every composite level (case, method, class, collection, assembly).

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use harrow_core::{ExecutionSummary, FaultCollector, Message, UnitRef};

use super::context::RunContext;
use crate::extension::LifecycleHook;

/// What a composite level contributes to [`run_level`].
pub(crate) trait Level {
    fn unit(&self) -> UnitRef;

    fn after_starting(&mut self, _ctx: &RunContext, _faults: &mut FaultCollector) {}

    /// Run every child and return the aggregated summary. Children get branches of `faults`.
    fn run_children(&mut self, ctx: &RunContext, faults: &mut FaultCollector) -> ExecutionSummary;

    fn before_finished(&mut self, _ctx: &RunContext, _faults: &mut FaultCollector) {}
}

/// Drive one composite level through its lifecycle.
///
/// ## Notes
///
/// - A rejected `Starting` cancels the run and skips straight to `Finished` with a zero summary.
/// - Faults inherited through `faults` or recorded before the children ran are cleared before
///   `before_finished`, so only faults raised while finishing become a `CleanupFailure`.
/// - `Finished` is sent even if a step panics; the panic resumes afterwards.
pub(crate) fn run_level<L: Level>(ctx: &RunContext, level: &mut L, mut faults: FaultCollector) -> ExecutionSummary {
    let unit = level.unit();
    let mut summary = ExecutionSummary::new();

    let body = panic::catch_unwind(AssertUnwindSafe(|| {
        if !ctx.send(Message::starting(unit.clone())) {
            summary.continue_run = false;
            return;
        }

        level.after_starting(ctx, &mut faults);
        summary.aggregate(&level.run_children(ctx, &mut faults));

        faults.clear();
        level.before_finished(ctx, &mut faults);

        if let Some(fault) = faults.to_fault() {
            tracing::debug!(unit = %unit.unique_id, fault = %fault.type_name, "cleanup failure");
            if !ctx.send(Message::cleanup_failure(unit.clone(), &fault)) {
                summary.continue_run = false;
            }
        }
    }));

    if !ctx.send(Message::finished(unit, &summary)) {
        summary.continue_run = false;
    }
    if let Err(payload) = body {
        panic::resume_unwind(payload);
    }
    summary
}

/// Run children in order, stopping once the run is cancelled.
pub(crate) fn run_children<T>(
    ctx: &RunContext,
    children: impl IntoIterator<Item = T>,
    mut run: impl FnMut(T) -> ExecutionSummary,
) -> ExecutionSummary {
    let mut summary = ExecutionSummary::new();
    for child in children {
        if ctx.is_cancelled() {
            tracing::debug!("run cancelled; not starting further children");
            break;
        }
        summary.aggregate(&run(child));
    }
    summary
}

pub(crate) fn hooks_after_starting(hooks: &[Arc<dyn LifecycleHook>], unit: &UnitRef, faults: &mut FaultCollector) {
    for hook in hooks {
        if faults.run(|| hook.after_starting(unit)).is_none() {
            tracing::debug!(hook = hook.name(), unit = %unit.unique_id, "after_starting hook faulted");
        }
    }
}

/// Runs hooks in reverse declaration order.
pub(crate) fn hooks_before_finished(hooks: &[Arc<dyn LifecycleHook>], unit: &UnitRef, faults: &mut FaultCollector) {
    for hook in hooks.iter().rev() {
        if faults.run(|| hook.before_finished(unit)).is_none() {
            tracing::debug!(hook = hook.name(), unit = %unit.unique_id, "before_finished hook faulted");
        }
    }
}
