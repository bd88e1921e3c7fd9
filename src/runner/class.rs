//! Class runner: orders cases, builds the shared constructor arguments, and runs one method runner per
//! method.

use std::sync::Arc;

use harrow_core::fault::CONSTRUCTION_FAILURE;
use harrow_core::{ExecutionSummary, Fault, FaultCollector, UnitRef, capture};

use super::context::RunContext;
use super::group_by_parent;
use super::level::{Level, hooks_after_starting, hooks_before_finished, run_children, run_level};
use super::method::TestMethodRunner;
use crate::extension::CaseOrderer;
use crate::model::{Argument, TestCase, TestClass, TestMethod};

pub struct TestClassRunner<'a> {
    class: &'a TestClass,
    cases: Vec<Arc<TestCase>>,
    unit: UnitRef,
}

impl<'a> TestClassRunner<'a> {
    pub fn new(class: &'a TestClass, cases: Vec<Arc<TestCase>>) -> Self {
        Self {
            class,
            cases,
            unit: class.unit(),
        }
    }

    #[tracing::instrument(skip_all, fields(class = %self.class.name, cases = self.cases.len()))]
    pub fn run(mut self, ctx: &RunContext, faults: FaultCollector) -> ExecutionSummary {
        run_level(ctx, &mut self, faults)
    }

    /// Apply the class orderer (or the run-wide one). A failing orderer leaves discovery order in place and
    /// is reported on the diagnostic sink.
    fn order_cases(&self, ctx: &RunContext) -> Vec<Arc<TestCase>> {
        let orderer: &dyn CaseOrderer = match &self.class.orderer {
            Some(orderer) => orderer.as_ref(),
            None => ctx.orderer().as_ref(),
        };
        match capture(|| orderer.order(&self.cases)) {
            Ok(ordered) => ordered,
            Err(fault) => {
                let mut notice = format!(
                    "Test case orderer '{}' threw '{}' during ordering: {}",
                    orderer.name(),
                    fault.type_name,
                    fault.message
                );
                if let Some(stack_trace) = &fault.stack_trace {
                    notice.push('\n');
                    notice.push_str(stack_trace);
                }
                ctx.diagnostic(notice);
                self.cases.clone()
            }
        }
    }

    /// Resolve the arguments every test of the class is constructed with.
    ///
    /// Per parameter, the first of: the resolver's value, the declared default, the type default (optional
    /// parameters), an empty array (trailing variadic). Anything left over becomes one construction fault.
    fn constructor_arguments(&self, ctx: &RunContext, faults: &mut FaultCollector) -> Vec<Argument> {
        if self.class.shape.is_static {
            return Vec::new();
        }
        let Some(constructor) = faults.run(|| ctx.selector().select(self.class)) else {
            return Vec::new();
        };

        let last = constructor.parameters.len().saturating_sub(1);
        let mut arguments = Vec::with_capacity(constructor.parameters.len());
        let mut unresolved = Vec::new();

        for (index, parameter) in constructor.parameters.iter().enumerate() {
            let supplied = match capture(|| Ok(ctx.resolver().try_resolve(self.class, constructor, index, parameter))) {
                Ok(value) => value,
                Err(fault) => {
                    faults.add(fault);
                    None
                }
            };
            let value = supplied
                .or_else(|| parameter.default_value.clone())
                .or_else(|| parameter.is_optional.then(|| parameter.type_default()))
                .or_else(|| (parameter.is_variadic && index == last).then(|| Argument::Array(Vec::new())));
            match value {
                Some(value) => arguments.push(value),
                None => unresolved.push(parameter.to_string()),
            }
        }

        if !unresolved.is_empty() {
            faults.add(Fault::new(
                CONSTRUCTION_FAILURE,
                format!(
                    "The following constructor parameters did not have matching arguments: {}",
                    unresolved.join(", ")
                ),
            ));
        }
        arguments
    }
}

impl Level for TestClassRunner<'_> {
    fn unit(&self) -> UnitRef {
        self.unit.clone()
    }

    fn after_starting(&mut self, _ctx: &RunContext, faults: &mut FaultCollector) {
        hooks_after_starting(&self.class.hooks, &self.unit, faults);
    }

    fn run_children(&mut self, ctx: &RunContext, faults: &mut FaultCollector) -> ExecutionSummary {
        let ordered = self.order_cases(ctx);
        let constructor_arguments = self.constructor_arguments(ctx, faults);
        let groups = group_by_parent(&ordered, |case| &case.method, |method: &TestMethod| method.unique_id());

        run_children(ctx, &groups, |(method, cases)| {
            TestMethodRunner::new(method, cases, &constructor_arguments).run(ctx, faults.branch())
        })
    }

    fn before_finished(&mut self, _ctx: &RunContext, faults: &mut FaultCollector) {
        hooks_before_finished(&self.class.hooks, &self.unit, faults);
    }
}
