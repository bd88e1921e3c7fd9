//! Integration tests for test-class construction
//!
//! Covers constructor selection policies and the per-parameter resolution chain: resolver, declared
//! default, type default, empty variadic.

mod common;

use std::sync::{Arc, Mutex};

use common::{Tree, collecting, counts, finished};
use harrow::extension::{ConstructorArgumentResolver, FnSubject, SoleConstructor, TestSubject};
use harrow::model::{Argument, ClassShape, ConstructorInfo, ParameterInfo, TestClass};
use harrow::{CollectingBus, Message, RunContext, UnitKind};
use serde_json::json;

/// A subject that records the constructor arguments it was called with.
fn recording() -> (Arc<Mutex<Vec<Vec<Argument>>>>, Arc<dyn TestSubject>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let subject = FnSubject::shared(move |call, _| {
        sink.lock().unwrap().push(call.constructor_arguments.to_vec());
        Ok(())
    });
    (seen, subject)
}

fn sole(ctx: RunContext) -> RunContext {
    ctx.with_selector(Arc::new(SoleConstructor))
}

fn failure_messages(messages: &[Message]) -> Vec<String> {
    messages
        .iter()
        .filter_map(|m| match m {
            Message::Failed { faults, .. } => Some(faults.combined_messages()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_resolution_chain_fills_every_parameter() {
    let tree = Tree::with_class("Chain", |class: TestClass| {
        class
            .with_fixture("Database", json!("db://test"))
            .with_shape(ClassShape::with_constructors(vec![ConstructorInfo::with_parameters(vec![
                ParameterInfo::new("db", "Database"),
                ParameterInfo::new("retries", "int").with_default(json!(3)),
                ParameterInfo::new("verbose", "bool").optional(),
                ParameterInfo::new("tags", "String").variadic(),
            ])]))
    });
    let (seen, subject) = recording();
    let (bus, ctx) = collecting();

    let summary = tree.run(&sole(ctx), vec![tree.plain_case("runs", subject)]);

    assert_eq!(summary.failed, 0, "{:?}", failure_messages(&bus.messages()));
    assert_eq!(
        *seen.lock().unwrap(),
        vec![vec![json!("db://test"), json!(3), json!(false), json!([])]]
    );
}

#[test]
fn test_resolver_wins_over_defaults() {
    struct Fixed;
    impl ConstructorArgumentResolver for Fixed {
        fn try_resolve(&self, _: &TestClass, _: &ConstructorInfo, index: usize, _: &ParameterInfo) -> Option<Argument> {
            Some(json!(index * 10))
        }
    }

    let tree = Tree::with_class("Resolved", |class| {
        class.with_shape(ClassShape::with_constructors(vec![ConstructorInfo::with_parameters(vec![
            ParameterInfo::new("a", "int").with_default(json!(1)),
            ParameterInfo::new("b", "int"),
        ])]))
    });
    let (seen, subject) = recording();
    let (_, ctx) = collecting();

    tree.run(&sole(ctx).with_resolver(Arc::new(Fixed)), vec![tree.plain_case("runs", subject)]);
    assert_eq!(*seen.lock().unwrap(), vec![vec![json!(0), json!(10)]]);
}

#[test]
fn test_variadic_only_defaults_when_last() {
    let tree = Tree::with_class("Variadic", |class| {
        class.with_shape(ClassShape::with_constructors(vec![ConstructorInfo::with_parameters(vec![
            ParameterInfo::new("rest", "String").variadic(),
            ParameterInfo::new("tail", "Tail"),
        ])]))
    });
    let (bus, ctx) = collecting();

    let summary = tree.run(&sole(ctx), vec![tree.plain_case("runs", FnSubject::passing())]);

    assert_eq!(summary.failed, 1);
    assert_eq!(
        failure_messages(&bus.messages()),
        vec!["The following constructor parameters did not have matching arguments: String rest, Tail tail"]
    );
}

#[test]
fn test_parameterless_policy_rejects_parameterized_class() {
    let tree = Tree::with_class("Injected", |class| {
        class.with_shape(ClassShape::with_constructors(vec![ConstructorInfo::with_parameters(vec![
            ParameterInfo::new("db", "Database"),
        ])]))
    });
    let (bus, ctx) = collecting();

    let cases = vec![tree.plain_case("a", FnSubject::passing()), tree.plain_case("b", FnSubject::passing())];
    let summary = tree.run(&ctx, cases);

    assert_eq!((summary.total, summary.failed), (2, 2));
    assert_eq!(
        failure_messages(&bus.messages()),
        vec![
            "A test class must have a parameterless constructor.",
            "A test class must have a parameterless constructor."
        ]
    );
}

#[test]
fn test_sole_policy_rejects_overloads() {
    let tree = Tree::with_class("Overloaded", |class| {
        class.with_shape(ClassShape::with_constructors(vec![
            ConstructorInfo::parameterless(),
            ConstructorInfo::with_parameters(vec![ParameterInfo::new("n", "int")]),
        ]))
    });
    let (bus, ctx) = collecting();

    tree.run(&sole(ctx), vec![tree.plain_case("a", FnSubject::passing())]);
    assert_eq!(
        failure_messages(&bus.messages()),
        vec!["A test class may only define a single public constructor."]
    );
}

#[test]
fn test_static_class_is_never_constructed() {
    let tree = Tree::with_class("Static", |class| class.with_shape(ClassShape::static_class()));
    let (seen, subject) = recording();
    let bus = Arc::new(CollectingBus::new());
    let ctx = RunContext::new(bus.clone());

    tree.run(&ctx, vec![tree.plain_case("runs", subject)]);

    assert_eq!(*seen.lock().unwrap(), vec![Vec::<Argument>::new()]);
    assert_eq!(counts(finished(&bus.messages(), UnitKind::Class, "Static").unwrap()), (1, 0, 0));
}

#[test]
fn test_panicking_resolver_is_a_construction_fault() {
    struct Exploding;
    impl ConstructorArgumentResolver for Exploding {
        fn try_resolve(&self, _: &TestClass, _: &ConstructorInfo, _: usize, _: &ParameterInfo) -> Option<Argument> {
            panic!("resolver bug")
        }
    }

    let tree = Tree::with_class("Fragile", |class| {
        class.with_shape(ClassShape::with_constructors(vec![ConstructorInfo::with_parameters(vec![
            ParameterInfo::new("n", "int").with_default(json!(7)),
        ])]))
    });
    let (bus, ctx) = collecting();

    let ctx = sole(ctx).with_resolver(Arc::new(Exploding));
    let summary = tree.run(&ctx, vec![tree.plain_case("a", FnSubject::passing())]);

    assert_eq!(summary.failed, 1);
    assert_eq!(failure_messages(&bus.messages()), vec!["resolver bug"]);
}
