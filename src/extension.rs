//! Extension points the runners call into.
//!
//! Every call into one of these traits is wrapped in [`harrow_core::capture`], so an implementation may
//! either return a [`Fault`] or panic; both surface the same way. Default implementations for each seam
//! live next to the trait.

use std::sync::Arc;
use std::time::{Duration, Instant};

use harrow_core::fault::CONSTRUCTION_FAILURE;
use harrow_core::{Fault, UnitRef};

use crate::model::{Argument, ConstructorInfo, DataRow, ParameterInfo, Test, TestCase, TestClass};

// ============================================================================
// Test subjects
// ============================================================================

/// Everything a subject needs to run one test.
#[derive(Debug, Clone, Copy)]
pub struct TestCall<'a> {
    pub test: &'a Test,
    /// Shared constructor arguments resolved once for the class.
    pub constructor_arguments: &'a [Argument],
}

impl TestCall<'_> {
    pub fn arguments(&self) -> &[Argument] {
        &self.test.arguments
    }
}

/// Result of a successful invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub time: Duration,
    pub output: String,
}

/// The code under test.
pub trait TestSubject: Send + Sync {
    fn invoke(&self, call: &TestCall<'_>) -> Result<Invocation, Fault>;
}

type Body = dyn Fn(&TestCall<'_>, &mut String) -> Result<(), Fault> + Send + Sync;

/// A subject backed by a closure; elapsed time is measured around the call.
///
/// The closure receives an output buffer standing in for captured stdout.
pub struct FnSubject {
    body: Box<Body>,
}

impl FnSubject {
    pub fn new(body: impl Fn(&TestCall<'_>, &mut String) -> Result<(), Fault> + Send + Sync + 'static) -> Self {
        Self { body: Box::new(body) }
    }

    pub fn shared(
        body: impl Fn(&TestCall<'_>, &mut String) -> Result<(), Fault> + Send + Sync + 'static,
    ) -> Arc<dyn TestSubject> {
        Arc::new(Self::new(body))
    }

    pub fn passing() -> Arc<dyn TestSubject> {
        Self::shared(|_, _| Ok(()))
    }

    pub fn failing(message: impl Into<String>) -> Arc<dyn TestSubject> {
        let message = message.into();
        Self::shared(move |_, _| Err(Fault::new("harrow::AssertionFailure", message.clone())))
    }
}

impl TestSubject for FnSubject {
    fn invoke(&self, call: &TestCall<'_>) -> Result<Invocation, Fault> {
        let mut output = String::new();
        let start = Instant::now();
        (self.body)(call, &mut output)?;
        Ok(Invocation {
            time: start.elapsed(),
            output,
        })
    }
}

// ============================================================================
// Lifecycle hooks
// ============================================================================

/// Code that wraps a unit: runs after the unit's `Starting` and before its `Finished`.
///
/// Several hooks on one unit run `after_starting` in declaration order and `before_finished` in reverse.
pub trait LifecycleHook: Send + Sync {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn after_starting(&self, _unit: &UnitRef) -> Result<(), Fault> {
        Ok(())
    }

    fn before_finished(&self, _unit: &UnitRef) -> Result<(), Fault> {
        Ok(())
    }
}

// ============================================================================
// Case ordering
// ============================================================================

/// Orders the cases of one class. Must return a permutation of its input.
pub trait CaseOrderer: Send + Sync {
    fn name(&self) -> &str;

    fn order(&self, cases: &[Arc<TestCase>]) -> Result<Vec<Arc<TestCase>>, Fault>;
}

/// Keeps discovery order.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscoveryOrder;

impl CaseOrderer for DiscoveryOrder {
    fn name(&self) -> &str {
        "discovery"
    }

    fn order(&self, cases: &[Arc<TestCase>]) -> Result<Vec<Arc<TestCase>>, Fault> {
        Ok(cases.to_vec())
    }
}

/// Sorts by display name; ties keep discovery order.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlphabeticalOrder;

impl CaseOrderer for AlphabeticalOrder {
    fn name(&self) -> &str {
        "alphabetical"
    }

    fn order(&self, cases: &[Arc<TestCase>]) -> Result<Vec<Arc<TestCase>>, Fault> {
        let mut ordered = cases.to_vec();
        ordered.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(ordered)
    }
}

// ============================================================================
// Construction
// ============================================================================

/// Supplies values for constructor parameters.
pub trait ConstructorArgumentResolver: Send + Sync {
    /// Return a value for `parameter` (at position `index` of `constructor`), or `None` to fall through to
    /// declared and type defaults.
    fn try_resolve(
        &self,
        class: &TestClass,
        constructor: &ConstructorInfo,
        index: usize,
        parameter: &ParameterInfo,
    ) -> Option<Argument>;
}

/// Resolves parameters from fixtures by type name, nearest scope first: class, collection, assembly.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureResolver;

impl ConstructorArgumentResolver for FixtureResolver {
    fn try_resolve(
        &self,
        class: &TestClass,
        _constructor: &ConstructorInfo,
        _index: usize,
        parameter: &ParameterInfo,
    ) -> Option<Argument> {
        let collection = &class.collection;
        class
            .fixtures
            .get(&parameter.type_name)
            .or_else(|| collection.fixtures.get(&parameter.type_name))
            .or_else(|| collection.assembly.fixtures.get(&parameter.type_name))
            .cloned()
    }
}

/// Picks the constructor a non-static test class is built with.
pub trait ConstructorSelector: Send + Sync {
    fn select<'c>(&self, class: &'c TestClass) -> Result<&'c ConstructorInfo, Fault>;
}

/// Requires a parameterless constructor.
#[derive(Debug, Default, Clone, Copy)]
pub struct ParameterlessConstructor;

impl ConstructorSelector for ParameterlessConstructor {
    fn select<'c>(&self, class: &'c TestClass) -> Result<&'c ConstructorInfo, Fault> {
        class
            .shape
            .constructors
            .iter()
            .find(|ctor| !ctor.is_static && ctor.is_parameterless())
            .ok_or_else(|| Fault::new(CONSTRUCTION_FAILURE, "A test class must have a parameterless constructor."))
    }
}

/// Requires exactly one non-static constructor, whatever its parameters.
#[derive(Debug, Default, Clone, Copy)]
pub struct SoleConstructor;

impl ConstructorSelector for SoleConstructor {
    fn select<'c>(&self, class: &'c TestClass) -> Result<&'c ConstructorInfo, Fault> {
        let mut candidates = class.shape.constructors.iter().filter(|ctor| !ctor.is_static);
        match (candidates.next(), candidates.next()) {
            (Some(only), None) => Ok(only),
            _ => Err(Fault::new(
                CONSTRUCTION_FAILURE,
                "A test class may only define a single public constructor.",
            )),
        }
    }
}

// ============================================================================
// Deferred data
// ============================================================================

/// Rows for a data-driven case, enumerated when the case starts.
pub trait DataSource: Send + Sync {
    fn rows(&self) -> Result<Vec<DataRow>, Fault>;

    /// Release whatever the enumerated rows hold. Called once after every row has run; a fault here
    /// is reported as a cleanup failure of the case.
    fn cleanup(&self) -> Result<(), Fault> {
        Ok(())
    }
}

impl<F> DataSource for F
where
    F: Fn() -> Result<Vec<DataRow>, Fault> + Send + Sync,
{
    fn rows(&self) -> Result<Vec<DataRow>, Fault> {
        self()
    }
}
