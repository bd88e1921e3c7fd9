use std::sync::Arc;

use harrow_core::{ExecutionSummary, FaultCollector, UnitRef};

use super::class::TestClassRunner;
use super::context::RunContext;
use super::group_by_parent;
use super::level::{Level, hooks_after_starting, hooks_before_finished, run_children, run_level};
use crate::model::{TestCase, TestClass, TestCollection};

/// Runs the classes of one collection, in first-seen order.
pub struct TestCollectionRunner<'a> {
    collection: &'a TestCollection,
    cases: Vec<Arc<TestCase>>,
    unit: UnitRef,
}

impl<'a> TestCollectionRunner<'a> {
    pub fn new(collection: &'a TestCollection, cases: Vec<Arc<TestCase>>) -> Self {
        Self {
            collection,
            cases,
            unit: collection.unit(),
        }
    }

    #[tracing::instrument(skip_all, fields(collection = %self.collection.name, cases = self.cases.len()))]
    pub fn run(mut self, ctx: &RunContext, faults: FaultCollector) -> ExecutionSummary {
        run_level(ctx, &mut self, faults)
    }
}

impl Level for TestCollectionRunner<'_> {
    fn unit(&self) -> UnitRef {
        self.unit.clone()
    }

    fn after_starting(&mut self, _ctx: &RunContext, faults: &mut FaultCollector) {
        hooks_after_starting(&self.collection.hooks, &self.unit, faults);
    }

    fn run_children(&mut self, ctx: &RunContext, faults: &mut FaultCollector) -> ExecutionSummary {
        let groups = group_by_parent(&self.cases, |case| case.class(), |class: &TestClass| class.unique_id());
        run_children(ctx, groups, |(class, cases)| {
            TestClassRunner::new(&class, cases).run(ctx, faults.branch())
        })
    }

    fn before_finished(&mut self, _ctx: &RunContext, faults: &mut FaultCollector) {
        hooks_before_finished(&self.collection.hooks, &self.unit, faults);
    }
}
