use std::sync::Arc;

use harrow_core::{ExecutionSummary, FaultCollector, UnitRef};

use super::collection::TestCollectionRunner;
use super::context::RunContext;
use super::group_by_parent;
use super::level::{Level, hooks_after_starting, hooks_before_finished, run_children, run_level};
use crate::model::{TestAssembly, TestCase, TestCollection};

/// Entry point of a run: drives every collection of one assembly.
///
/// ## Parameters
///
/// - `assembly`: the assembly whose hooks wrap the run.
/// - `cases`: the discovered cases, in discovery order. Cases are grouped by collection, class and method
///   in first-seen order.
///
/// ## Returns
///
/// The aggregated [`ExecutionSummary`] from [`TestAssemblyRunner::run`]. Every lifecycle message has been
/// queued on the context's bus by then.
pub struct TestAssemblyRunner<'a> {
    assembly: &'a TestAssembly,
    cases: Vec<Arc<TestCase>>,
    unit: UnitRef,
}

impl<'a> TestAssemblyRunner<'a> {
    pub fn new(assembly: &'a TestAssembly, cases: Vec<Arc<TestCase>>) -> Self {
        Self {
            assembly,
            cases,
            unit: assembly.unit(),
        }
    }

    #[tracing::instrument(skip_all, fields(assembly = %self.assembly.name, cases = self.cases.len()))]
    pub fn run(mut self, ctx: &RunContext) -> ExecutionSummary {
        run_level(ctx, &mut self, FaultCollector::new())
    }
}

impl Level for TestAssemblyRunner<'_> {
    fn unit(&self) -> UnitRef {
        self.unit.clone()
    }

    fn after_starting(&mut self, _ctx: &RunContext, faults: &mut FaultCollector) {
        hooks_after_starting(&self.assembly.hooks, &self.unit, faults);
    }

    fn run_children(&mut self, ctx: &RunContext, faults: &mut FaultCollector) -> ExecutionSummary {
        let groups = group_by_parent(
            &self.cases,
            |case| case.collection(),
            |collection: &TestCollection| collection.unique_id(),
        );
        run_children(ctx, groups, |(collection, cases)| {
            TestCollectionRunner::new(&collection, cases).run(ctx, faults.branch())
        })
    }

    fn before_finished(&mut self, _ctx: &RunContext, faults: &mut FaultCollector) {
        hooks_before_finished(&self.assembly.hooks, &self.unit, faults);
    }
}
