use std::sync::Arc;

use harrow_core::{ExecutionSummary, FaultCollector, UnitRef};

use super::case::TestCaseRunner;
use super::context::RunContext;
use super::level::{Level, hooks_after_starting, hooks_before_finished, run_children, run_level};
use crate::model::{Argument, TestCase, TestMethod};

/// Runs the cases of one method in order, wrapped by the method's hooks.
pub struct TestMethodRunner<'a> {
    method: &'a TestMethod,
    cases: &'a [Arc<TestCase>],
    constructor_arguments: &'a [Argument],
    unit: UnitRef,
}

impl<'a> TestMethodRunner<'a> {
    pub fn new(method: &'a TestMethod, cases: &'a [Arc<TestCase>], constructor_arguments: &'a [Argument]) -> Self {
        Self {
            method,
            cases,
            constructor_arguments,
            unit: method.unit(),
        }
    }

    #[tracing::instrument(skip_all, fields(method = %self.method.name, cases = self.cases.len()))]
    pub fn run(mut self, ctx: &RunContext, faults: FaultCollector) -> ExecutionSummary {
        run_level(ctx, &mut self, faults)
    }
}

impl Level for TestMethodRunner<'_> {
    fn unit(&self) -> UnitRef {
        self.unit.clone()
    }

    fn after_starting(&mut self, _ctx: &RunContext, faults: &mut FaultCollector) {
        hooks_after_starting(&self.method.hooks, &self.unit, faults);
    }

    fn run_children(&mut self, ctx: &RunContext, faults: &mut FaultCollector) -> ExecutionSummary {
        run_children(ctx, self.cases, |case| {
            TestCaseRunner::new(case, self.constructor_arguments).run(ctx, faults.branch())
        })
    }

    fn before_finished(&mut self, _ctx: &RunContext, faults: &mut FaultCollector) {
        hooks_before_finished(&self.method.hooks, &self.unit, faults);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::{FnSubject, LifecycleHook};
    use crate::model::{TestAssembly, TestClass, TestCollection};
    use harrow_core::{CollectingBus, Fault, Message, UnitKind};

    struct FailingSetup;

    impl LifecycleHook for FailingSetup {
        fn after_starting(&self, _unit: &UnitRef) -> Result<(), Fault> {
            Err(Fault::new("setup", "fixture unavailable"))
        }
    }

    fn method(hook: Option<Arc<dyn LifecycleHook>>) -> Arc<TestMethod> {
        let assembly = Arc::new(TestAssembly::new("asm"));
        let collection = Arc::new(TestCollection::new(&assembly, "col"));
        let class = Arc::new(TestClass::new(&collection, "C"));
        let mut method = TestMethod::new(&class, "m", FnSubject::passing());
        if let Some(hook) = hook {
            method = method.with_hook(hook);
        }
        Arc::new(method)
    }

    fn cases(method: &Arc<TestMethod>, n: usize) -> Vec<Arc<TestCase>> {
        (0..n)
            .map(|i| Arc::new(TestCase::plain(method).with_key(i.to_string())))
            .collect()
    }

    #[test]
    fn test_runs_every_case() {
        let bus = Arc::new(CollectingBus::new());
        let ctx = RunContext::new(bus.clone());
        let m = method(None);
        let cases = cases(&m, 3);

        let summary = TestMethodRunner::new(&m, &cases, &[]).run(&ctx, FaultCollector::new());
        assert_eq!(summary.total, 3);
        let finished = bus.messages().into_iter().last().unwrap();
        assert!(finished.is_for(UnitKind::Method));
    }

    #[test]
    fn test_setup_fault_fails_every_test_without_cleanup_failure() {
        let bus = Arc::new(CollectingBus::new());
        let ctx = RunContext::new(bus.clone());
        let m = method(Some(Arc::new(FailingSetup)));
        let cases = cases(&m, 2);

        let summary = TestMethodRunner::new(&m, &cases, &[]).run(&ctx, FaultCollector::new());
        assert_eq!((summary.total, summary.failed), (2, 2));
        assert!(!bus.messages().iter().any(|m| matches!(m, Message::CleanupFailure { .. })));
    }

    #[test]
    fn test_rejected_test_start_stops_later_cases() {
        let bus = Arc::new(CollectingBus::rejecting(|m| {
            matches!(m, Message::Starting { unit } if unit.kind == UnitKind::Test && unit.unique_id.contains("[1]"))
        }));
        let ctx = RunContext::new(bus.clone());
        let m = method(None);
        let cases = cases(&m, 4);

        let summary = TestMethodRunner::new(&m, &cases, &[]).run(&ctx, FaultCollector::new());
        assert_eq!(summary.total, 2, "the rejected test still counts");
        assert!(ctx.is_cancelled());
        let last = bus.messages().into_iter().last().unwrap();
        assert!(matches!(last, Message::Finished { total: 2, .. }));
        assert!(last.is_for(UnitKind::Method));
    }
}
