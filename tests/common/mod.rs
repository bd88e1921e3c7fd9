//! Shared builders for the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use harrow::extension::{FnSubject, LifecycleHook, TestSubject};
use harrow::model::{TestAssembly, TestCase, TestClass, TestCollection, TestMethod};
use harrow::{CollectingBus, ExecutionSummary, Fault, Message, RunContext, TestAssemblyRunner, UnitKind, UnitRef};

/// One assembly, one collection, one class.
pub struct Tree {
    pub assembly: Arc<TestAssembly>,
    pub collection: Arc<TestCollection>,
    pub class: Arc<TestClass>,
}

impl Tree {
    pub fn new(class_name: &str) -> Self {
        Self::with_class(class_name, |class| class)
    }

    pub fn with_class(class_name: &str, configure: impl FnOnce(TestClass) -> TestClass) -> Self {
        let assembly = Arc::new(TestAssembly::new("tests"));
        let collection = Arc::new(TestCollection::new(&assembly, "default"));
        let class = Arc::new(configure(TestClass::new(&collection, class_name)));
        Self {
            assembly,
            collection,
            class,
        }
    }

    pub fn method(&self, name: &str, subject: Arc<dyn TestSubject>) -> Arc<TestMethod> {
        Arc::new(TestMethod::new(&self.class, name, subject))
    }

    pub fn plain_case(&self, name: &str, subject: Arc<dyn TestSubject>) -> Arc<TestCase> {
        Arc::new(TestCase::plain(&self.method(name, subject)))
    }

    pub fn run(&self, ctx: &RunContext, cases: Vec<Arc<TestCase>>) -> ExecutionSummary {
        TestAssemblyRunner::new(&self.assembly, cases).run(ctx)
    }
}

pub fn collecting() -> (Arc<CollectingBus>, RunContext) {
    let bus = Arc::new(CollectingBus::new());
    let ctx = RunContext::new(bus.clone());
    (bus, ctx)
}

/// The `Finished` message of the unit of `kind` named `display_name`.
pub fn finished<'m>(messages: &'m [Message], kind: UnitKind, display_name: &str) -> Option<&'m Message> {
    messages.iter().find(|m| {
        matches!(m, Message::Finished { unit, .. } if unit.kind == kind && unit.display_name == display_name)
    })
}

pub fn counts(message: &Message) -> (u32, u32, u32) {
    match message {
        Message::Finished {
            total, failed, skipped, ..
        } => (*total, *failed, *skipped),
        other => panic!("expected a Finished message, got {other:?}"),
    }
}

/// One line per message, without times.
pub fn trace(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|message| match message {
            Message::Starting { unit } => format!("starting {} {}", unit.kind, unit.display_name),
            Message::Finished {
                unit,
                total,
                failed,
                skipped,
                ..
            } => format!(
                "finished {} {} total={} failed={} skipped={}",
                unit.kind, unit.display_name, total, failed, skipped
            ),
            Message::Skipped { unit, reason } => format!("skipped {} ({})", unit.display_name, reason),
            Message::Passed { unit, .. } => format!("passed {}", unit.display_name),
            Message::Failed { unit, faults, .. } => {
                format!("failed {}: {}", unit.display_name, faults.combined_messages().replace('\n', " | "))
            }
            Message::CleanupFailure { unit, faults } => format!(
                "cleanupFailure {} {}: {}",
                unit.kind,
                unit.display_name,
                faults.combined_messages().replace('\n', " | ")
            ),
            Message::Diagnostic { message } => format!("diagnostic {}", message),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn passing() -> Arc<dyn TestSubject> {
    FnSubject::passing()
}

pub fn failing(message: &str) -> Arc<dyn TestSubject> {
    let message = message.to_string();
    FnSubject::shared(move |_, _| Err(Fault::new("test::AssertionFailure", message.clone())))
}

/// A hook that logs its calls and optionally fails.
pub struct RecordingHook {
    pub name: String,
    pub log: Arc<Mutex<Vec<String>>>,
    pub fail_after_starting: bool,
    pub fail_before_finished: bool,
}

impl RecordingHook {
    pub fn new(name: &str, log: &Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.to_string(),
            log: Arc::clone(log),
            fail_after_starting: false,
            fail_before_finished: false,
        }
    }

    pub fn failing_after_starting(mut self) -> Self {
        self.fail_after_starting = true;
        self
    }

    pub fn failing_before_finished(mut self) -> Self {
        self.fail_before_finished = true;
        self
    }
}

impl LifecycleHook for RecordingHook {
    fn name(&self) -> &str {
        &self.name
    }

    fn after_starting(&self, unit: &UnitRef) -> Result<(), Fault> {
        self.log.lock().unwrap().push(format!("{} after_starting {}", self.name, unit.display_name));
        if self.fail_after_starting {
            return Err(Fault::new("test::HookFailure", format!("{} setup failed", self.name)));
        }
        Ok(())
    }

    fn before_finished(&self, unit: &UnitRef) -> Result<(), Fault> {
        self.log.lock().unwrap().push(format!("{} before_finished {}", self.name, unit.display_name));
        if self.fail_before_finished {
            return Err(Fault::new("test::HookFailure", format!("{} teardown failed", self.name)));
        }
        Ok(())
    }
}
