//! Runs one test case: a plain call, a set of data rows, or a forced failure.

use harrow_core::fault::{DATA_DISCOVERY_FAILURE, EXECUTION_ERROR};
use harrow_core::{ExecutionSummary, Fault, FaultCollector, UnitRef, capture};

use super::context::RunContext;
use super::level::{Level, run_children, run_level};
use super::test::TestRunner;
use crate::model::{Argument, CaseData, DataRow, Test, TestCase};

/// A test plus the fault it is forced to fail with, if any.
struct PlannedTest {
    test: Test,
    seed: Option<Fault>,
    /// Whether the method's test hooks wrap this test. Off for the test reporting a failed enumeration.
    hooked: bool,
}

impl PlannedTest {
    fn new(test: Test) -> Self {
        Self {
            test,
            seed: None,
            hooked: true,
        }
    }

    fn failing(test: Test, seed: Fault) -> Self {
        Self {
            seed: Some(seed),
            ..Self::new(test)
        }
    }
}

pub struct TestCaseRunner<'a> {
    case: &'a TestCase,
    constructor_arguments: &'a [Argument],
    tests: Vec<PlannedTest>,
    /// Set once deferred rows were enumerated; their source is cleaned up after the rows run.
    enumerated: bool,
    cleanup: FaultCollector,
}

impl<'a> TestCaseRunner<'a> {
    pub fn new(case: &'a TestCase, constructor_arguments: &'a [Argument]) -> Self {
        let tests = match &case.data {
            CaseData::Arguments(arguments) => {
                let test = single_test(case, 0, arguments.clone(), case.skip_reason.clone());
                vec![PlannedTest::new(test)]
            }
            CaseData::Rows(rows) => plan_rows(case, rows),
            // enumerated in after_starting
            CaseData::Deferred(_) => Vec::new(),
            CaseData::ExecutionError(message) => vec![PlannedTest::failing(
                single_test(case, 0, Vec::new(), None),
                Fault::new(EXECUTION_ERROR, message.clone()),
            )],
        };
        Self {
            case,
            constructor_arguments,
            tests,
            enumerated: false,
            cleanup: FaultCollector::new(),
        }
    }

    #[tracing::instrument(skip_all, fields(case = %self.case.display_name))]
    pub fn run(mut self, ctx: &RunContext, faults: FaultCollector) -> ExecutionSummary {
        run_level(ctx, &mut self, faults)
    }
}

impl Level for TestCaseRunner<'_> {
    fn unit(&self) -> UnitRef {
        self.case.unit()
    }

    fn after_starting(&mut self, _ctx: &RunContext, _faults: &mut FaultCollector) {
        let CaseData::Deferred(source) = &self.case.data else {
            return;
        };
        self.tests = match capture(|| source.rows()) {
            Ok(rows) if rows.is_empty() => {
                self.enumerated = true;
                let method = &self.case.method;
                vec![PlannedTest::failing(
                    single_test(self.case, 0, Vec::new(), None),
                    Fault::new(
                        DATA_DISCOVERY_FAILURE,
                        format!("No data found for {}.{}", method.class.name, method.name),
                    ),
                )]
            }
            Ok(rows) => {
                self.enumerated = true;
                plan_rows(self.case, &rows)
            }
            Err(fault) => {
                tracing::debug!(case = %self.case.display_name, "deferred data enumeration failed");
                vec![PlannedTest {
                    hooked: false,
                    ..PlannedTest::failing(single_test(self.case, -1, Vec::new(), None), fault)
                }]
            }
        };
    }

    fn run_children(&mut self, ctx: &RunContext, faults: &mut FaultCollector) -> ExecutionSummary {
        let subject = self.case.subject().as_ref();
        let hooks = self.case.method.test_hooks.as_slice();
        let summary = run_children(ctx, &self.tests, |planned| {
            let mut branch = faults.branch();
            if let Some(seed) = &planned.seed {
                branch.add(seed.clone());
            }
            let hooks: &[_] = if planned.hooked { hooks } else { &[] };
            TestRunner::new(&planned.test, subject, hooks, self.constructor_arguments).run(ctx, branch)
        });

        if let CaseData::Deferred(source) = &self.case.data {
            if self.enumerated {
                self.cleanup.run(|| source.cleanup());
            }
        }
        summary
    }

    fn before_finished(&mut self, _ctx: &RunContext, faults: &mut FaultCollector) {
        faults.aggregate(&self.cleanup);
    }
}

fn single_test(case: &TestCase, index: i32, arguments: Vec<Argument>, skip_reason: Option<String>) -> Test {
    Test {
        case_id: case.unique_id(),
        index,
        display_name: case.display_name.clone(),
        arguments,
        skip_reason,
    }
}

fn plan_rows(case: &TestCase, rows: &[DataRow]) -> Vec<PlannedTest> {
    let case_id = case.unique_id();
    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            PlannedTest::new(Test {
                case_id: case_id.clone(),
                index: i32::try_from(index).unwrap_or(i32::MAX),
                display_name: case.display_with_arguments(&row.arguments),
                arguments: row.arguments.clone(),
                skip_reason: case.skip_reason.clone().or_else(|| row.skip_reason.clone()),
            })
        })
        .collect()
}
