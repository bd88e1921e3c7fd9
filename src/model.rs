//! Test object model consumed by the runners.
//!
//! Discovery (reflection, scripted suites, hand-built trees in tests) produces this model; the runners only
//! read it. Children hold `Arc`s to their parents, so a flat list of [`TestCase`]s is enough to rebuild
//! the assembly → collection → class → method tree by grouping.
//!
//! Unique ids are derived from names: `assembly::collection::Class::method[case]#index`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use harrow_core::{UnitKind, UnitRef};

use crate::config::MethodDisplay;
use crate::extension::{CaseOrderer, DataSource, LifecycleHook, TestSubject};

/// A dynamic argument value (constructor argument, fixture or data-row item).
pub type Argument = serde_json::Value;

/// Shared lifecycle hooks attached to one unit.
pub type Hooks = Vec<Arc<dyn LifecycleHook>>;

/// Fixture values available for constructor injection, keyed by parameter type name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixtureSet {
    by_type: BTreeMap<String, Argument>,
}

impl FixtureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, type_name: impl Into<String>, value: Argument) {
        self.by_type.insert(type_name.into(), value);
    }

    pub fn get(&self, type_name: &str) -> Option<&Argument> {
        self.by_type.get(type_name)
    }

    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

impl FromIterator<(String, Argument)> for FixtureSet {
    fn from_iter<I: IntoIterator<Item = (String, Argument)>>(iter: I) -> Self {
        Self {
            by_type: iter.into_iter().collect(),
        }
    }
}

// ============================================================================
// Assembly / collection
// ============================================================================

pub struct TestAssembly {
    pub name: String,
    pub hooks: Hooks,
    pub fixtures: FixtureSet,
}

impl TestAssembly {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hooks: Vec::new(),
            fixtures: FixtureSet::new(),
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn LifecycleHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn with_fixture(mut self, type_name: impl Into<String>, value: Argument) -> Self {
        self.fixtures.insert(type_name, value);
        self
    }

    pub fn unique_id(&self) -> String {
        self.name.clone()
    }

    pub fn unit(&self) -> UnitRef {
        UnitRef::new(UnitKind::Assembly, self.unique_id(), &self.name)
    }
}

pub struct TestCollection {
    pub name: String,
    pub assembly: Arc<TestAssembly>,
    pub hooks: Hooks,
    pub fixtures: FixtureSet,
}

impl TestCollection {
    pub fn new(assembly: &Arc<TestAssembly>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            assembly: Arc::clone(assembly),
            hooks: Vec::new(),
            fixtures: FixtureSet::new(),
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn LifecycleHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn with_fixture(mut self, type_name: impl Into<String>, value: Argument) -> Self {
        self.fixtures.insert(type_name, value);
        self
    }

    pub fn unique_id(&self) -> String {
        format!("{}::{}", self.assembly.unique_id(), self.name)
    }

    pub fn unit(&self) -> UnitRef {
        UnitRef::new(UnitKind::Collection, self.unique_id(), &self.name).with_parent(self.assembly.unique_id())
    }
}

// ============================================================================
// Class and constructor shape
// ============================================================================

/// One constructor parameter as seen by constructor-argument resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInfo {
    pub name: String,
    pub type_name: String,
    /// Declared default value, if the parameter has one.
    pub default_value: Option<Argument>,
    pub is_optional: bool,
    /// Variadic (`params`-style); only honoured on the last parameter.
    pub is_variadic: bool,
}

impl ParameterInfo {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            default_value: None,
            is_optional: false,
            is_variadic: false,
        }
    }

    pub fn with_default(mut self, value: Argument) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    pub fn variadic(mut self) -> Self {
        self.is_variadic = true;
        self
    }

    /// Default value of the parameter's type: zero for numbers, `false`, `""`, `null` otherwise.
    pub fn type_default(&self) -> Argument {
        match self.type_name.as_str() {
            "bool" => Argument::Bool(false),
            "i8" | "i16" | "i32" | "i64" | "isize" | "u8" | "u16" | "u32" | "u64" | "usize" | "int" => {
                Argument::from(0)
            }
            "f32" | "f64" | "float" => Argument::from(0.0),
            "String" | "str" | "string" => Argument::String(String::new()),
            _ => Argument::Null,
        }
    }
}

impl fmt::Display for ParameterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.type_name, self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstructorInfo {
    pub is_static: bool,
    pub parameters: Vec<ParameterInfo>,
}

impl ConstructorInfo {
    pub fn parameterless() -> Self {
        Self::default()
    }

    pub fn with_parameters(parameters: Vec<ParameterInfo>) -> Self {
        Self {
            is_static: false,
            parameters,
        }
    }

    pub fn is_parameterless(&self) -> bool {
        self.parameters.is_empty()
    }
}

/// How a test class can be instantiated.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassShape {
    /// Static classes (abstract and sealed) are never constructed.
    pub is_static: bool,
    pub constructors: Vec<ConstructorInfo>,
}

impl Default for ClassShape {
    fn default() -> Self {
        Self {
            is_static: false,
            constructors: vec![ConstructorInfo::parameterless()],
        }
    }
}

impl ClassShape {
    pub fn static_class() -> Self {
        Self {
            is_static: true,
            constructors: Vec::new(),
        }
    }

    pub fn with_constructors(constructors: Vec<ConstructorInfo>) -> Self {
        Self {
            is_static: false,
            constructors,
        }
    }
}

pub struct TestClass {
    pub name: String,
    pub collection: Arc<TestCollection>,
    pub shape: ClassShape,
    pub hooks: Hooks,
    pub fixtures: FixtureSet,
    /// Overrides the run-wide case orderer for this class.
    pub orderer: Option<Arc<dyn CaseOrderer>>,
}

impl TestClass {
    pub fn new(collection: &Arc<TestCollection>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collection: Arc::clone(collection),
            shape: ClassShape::default(),
            hooks: Vec::new(),
            fixtures: FixtureSet::new(),
            orderer: None,
        }
    }

    pub fn with_shape(mut self, shape: ClassShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn LifecycleHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn with_fixture(mut self, type_name: impl Into<String>, value: Argument) -> Self {
        self.fixtures.insert(type_name, value);
        self
    }

    pub fn with_orderer(mut self, orderer: Arc<dyn CaseOrderer>) -> Self {
        self.orderer = Some(orderer);
        self
    }

    pub fn unique_id(&self) -> String {
        format!("{}::{}", self.collection.unique_id(), self.name)
    }

    pub fn unit(&self) -> UnitRef {
        UnitRef::new(UnitKind::Class, self.unique_id(), &self.name).with_parent(self.collection.unique_id())
    }
}

// ============================================================================
// Method, case, test
// ============================================================================

pub struct TestMethod {
    pub name: String,
    pub class: Arc<TestClass>,
    pub subject: Arc<dyn TestSubject>,
    /// Parameter names, used to render data-row display names.
    pub parameters: Vec<String>,
    /// Hooks wrapping the method as a whole.
    pub hooks: Hooks,
    /// Hooks wrapping every individual test of the method.
    pub test_hooks: Hooks,
}

impl TestMethod {
    pub fn new(class: &Arc<TestClass>, name: impl Into<String>, subject: Arc<dyn TestSubject>) -> Self {
        Self {
            name: name.into(),
            class: Arc::clone(class),
            subject,
            parameters: Vec::new(),
            hooks: Vec::new(),
            test_hooks: Vec::new(),
        }
    }

    pub fn with_parameters<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.parameters = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn LifecycleHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn with_test_hook(mut self, hook: Arc<dyn LifecycleHook>) -> Self {
        self.test_hooks.push(hook);
        self
    }

    pub fn unique_id(&self) -> String {
        format!("{}::{}", self.class.unique_id(), self.name)
    }

    pub fn unit(&self) -> UnitRef {
        UnitRef::new(UnitKind::Method, self.unique_id(), &self.name).with_parent(self.class.unique_id())
    }

    pub fn display_name(&self, display: MethodDisplay) -> String {
        match display {
            MethodDisplay::ClassAndMethod => format!("{}.{}", self.class.name, self.name),
            MethodDisplay::Method => self.name.clone(),
        }
    }
}

/// One row of data for a data-driven case.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataRow {
    pub arguments: Vec<Argument>,
    pub skip_reason: Option<String>,
}

impl DataRow {
    pub fn new(arguments: Vec<Argument>) -> Self {
        Self {
            arguments,
            skip_reason: None,
        }
    }

    pub fn skipped(mut self, reason: impl Into<String>) -> Self {
        self.skip_reason = Some(reason.into());
        self
    }
}

/// What a case runs.
#[derive(Clone)]
pub enum CaseData {
    /// A single test with fixed arguments (possibly none).
    Arguments(Vec<Argument>),
    /// One test per row, known at discovery time.
    Rows(Vec<DataRow>),
    /// One test per row, enumerated when the case starts.
    Deferred(Arc<dyn DataSource>),
    /// A placeholder for a discovery-time error: one test that fails with this message.
    ExecutionError(String),
}

pub struct TestCase {
    pub method: Arc<TestMethod>,
    pub display_name: String,
    /// Distinguishes cases of the same method in unique ids; defaults to the display name.
    pub key: String,
    pub skip_reason: Option<String>,
    pub data: CaseData,
    /// Overrides the method's subject for this case.
    pub subject: Option<Arc<dyn TestSubject>>,
}

impl TestCase {
    pub fn new(method: &Arc<TestMethod>, data: CaseData) -> Self {
        let display_name = method.display_name(MethodDisplay::default());
        Self {
            method: Arc::clone(method),
            key: display_name.clone(),
            display_name,
            skip_reason: None,
            data,
            subject: None,
        }
    }

    /// A plain case without arguments.
    pub fn plain(method: &Arc<TestMethod>) -> Self {
        Self::new(method, CaseData::Arguments(Vec::new()))
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        let display_name = display_name.into();
        self.key = display_name.clone();
        self.display_name = display_name;
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn skipped(mut self, reason: impl Into<String>) -> Self {
        self.skip_reason = Some(reason.into());
        self
    }

    pub fn with_subject(mut self, subject: Arc<dyn TestSubject>) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn subject(&self) -> &Arc<dyn TestSubject> {
        self.subject.as_ref().unwrap_or(&self.method.subject)
    }

    pub fn class(&self) -> &Arc<TestClass> {
        &self.method.class
    }

    pub fn collection(&self) -> &Arc<TestCollection> {
        &self.method.class.collection
    }

    pub fn unique_id(&self) -> String {
        format!("{}[{}]", self.method.unique_id(), self.key)
    }

    pub fn unit(&self) -> UnitRef {
        UnitRef::new(UnitKind::Case, self.unique_id(), &self.display_name).with_parent(self.method.unique_id())
    }

    /// Display name of a data-row test: `Name(a: 1, b: "x")`.
    pub fn display_with_arguments(&self, arguments: &[Argument]) -> String {
        let rendered: Vec<String> = arguments
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let name = self
                    .method
                    .parameters
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("arg{}", i));
                format!("{}: {}", name, value)
            })
            .collect();
        format!("{}({})", self.display_name, rendered.join(", "))
    }
}

/// One runnable test produced from a case.
#[derive(Debug, Clone, PartialEq)]
pub struct Test {
    pub case_id: String,
    /// Position within the case; `-1` marks the synthetic test of a failed data enumeration.
    pub index: i32,
    pub display_name: String,
    pub arguments: Vec<Argument>,
    pub skip_reason: Option<String>,
}

impl Test {
    pub fn unique_id(&self) -> String {
        format!("{}#{}", self.case_id, self.index)
    }

    pub fn unit(&self) -> UnitRef {
        UnitRef::new(UnitKind::Test, self.unique_id(), &self.display_name).with_parent(&self.case_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::FnSubject;
    use serde_json::json;

    fn method(parameters: &[&str]) -> Arc<TestMethod> {
        let assembly = Arc::new(TestAssembly::new("calc.tests"));
        let collection = Arc::new(TestCollection::new(&assembly, "default"));
        let class = Arc::new(TestClass::new(&collection, "CalculatorTests"));
        Arc::new(
            TestMethod::new(&class, "adds", FnSubject::passing()).with_parameters(parameters.iter().copied()),
        )
    }

    #[test]
    fn test_unique_ids_follow_the_tree() {
        let m = method(&[]);
        let case = TestCase::plain(&m);
        assert_eq!(m.unique_id(), "calc.tests::default::CalculatorTests::adds");
        assert_eq!(case.unique_id(), "calc.tests::default::CalculatorTests::adds[CalculatorTests.adds]");
        assert_eq!(case.unit().parent_id.as_deref(), Some("calc.tests::default::CalculatorTests::adds"));
    }

    #[test]
    fn test_method_display_modes() {
        let m = method(&[]);
        assert_eq!(m.display_name(MethodDisplay::ClassAndMethod), "CalculatorTests.adds");
        assert_eq!(m.display_name(MethodDisplay::Method), "adds");
    }

    #[test]
    fn test_display_with_arguments_uses_parameter_names() {
        let m = method(&["a", "b"]);
        let case = TestCase::plain(&m);
        assert_eq!(
            case.display_with_arguments(&[json!(1), json!("two"), json!(null)]),
            "CalculatorTests.adds(a: 1, b: \"two\", arg2: null)"
        );
    }

    #[test]
    fn test_case_subject_override() {
        let m = method(&[]);
        let plain = TestCase::plain(&m);
        assert!(Arc::ptr_eq(plain.subject(), &m.subject));

        let other = FnSubject::passing();
        let overridden = TestCase::plain(&m).with_subject(Arc::clone(&other));
        assert!(Arc::ptr_eq(overridden.subject(), &other));
    }

    #[test]
    fn test_type_defaults() {
        assert_eq!(ParameterInfo::new("n", "i32").type_default(), json!(0));
        assert_eq!(ParameterInfo::new("b", "bool").type_default(), json!(false));
        assert_eq!(ParameterInfo::new("s", "String").type_default(), json!(""));
        assert_eq!(ParameterInfo::new("d", "Database").type_default(), json!(null));
    }

    #[test]
    fn test_parameter_display() {
        assert_eq!(ParameterInfo::new("db", "Database").to_string(), "Database db");
    }
}
