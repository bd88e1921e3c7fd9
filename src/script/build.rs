//! Turn a parsed [`SuiteScript`] into the object model.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use harrow_core::{Fault, UnitRef};

use super::{
    AssemblyScript, CaseScript, ClassScript, DeferredScript, Failure, HookScript, LoadedAssembly, MethodScript,
    OrderScript, Outcome, RowScript, ScriptError, Suite, SuiteScript,
};
use crate::config::RunnerConfig;
use crate::extension::{
    AlphabeticalOrder, CaseOrderer, DataSource, DiscoveryOrder, Invocation, LifecycleHook, TestCall, TestSubject,
};
use crate::model::{
    Argument, CaseData, ClassShape, ConstructorInfo, DataRow, FixtureSet, Hooks, ParameterInfo, TestAssembly,
    TestCase, TestClass, TestCollection, TestMethod,
};

/// Type name of every fault a script raises on purpose.
pub const SCRIPTED_FAILURE: &str = "script::Failure";

// ============================================================================
// Scripted collaborators
// ============================================================================

/// Plays back scripted outcomes. Row outcomes are looked up by test index.
pub struct ScriptedSubject {
    default: Outcome,
    rows: Vec<Option<Outcome>>,
}

impl ScriptedSubject {
    pub fn new(default: Outcome) -> Self {
        Self {
            default,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(default: Outcome, rows: Vec<Option<Outcome>>) -> Self {
        Self { default, rows }
    }

    fn outcome_for(&self, index: i32) -> &Outcome {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.rows.get(i))
            .and_then(Option::as_ref)
            .unwrap_or(&self.default)
    }
}

impl TestSubject for ScriptedSubject {
    fn invoke(&self, call: &TestCall<'_>) -> Result<Invocation, Fault> {
        match self.outcome_for(call.test.index) {
            Outcome::Pass(pass) => Ok(Invocation {
                time: Duration::from_millis(pass.millis),
                output: pass.output.clone(),
            }),
            Outcome::Fail(message) => Err(Fault::new(SCRIPTED_FAILURE, message.clone())),
            Outcome::Panic(message) => panic!("{}", message),
            Outcome::Skip(reason) => Err(Fault::skip(reason)),
        }
    }
}

impl Failure {
    fn raise(&self) -> Result<(), Fault> {
        match self {
            Failure::Fail(message) => Err(Fault::new(SCRIPTED_FAILURE, message.clone())),
            Failure::Panic(message) => panic!("{}", message),
        }
    }
}

pub struct ScriptedHook {
    script: HookScript,
}

impl ScriptedHook {
    pub fn new(script: HookScript) -> Self {
        Self { script }
    }
}

impl LifecycleHook for ScriptedHook {
    fn name(&self) -> &str {
        &self.script.name
    }

    fn after_starting(&self, _unit: &UnitRef) -> Result<(), Fault> {
        self.script.after_starting.as_ref().map_or(Ok(()), Failure::raise)
    }

    fn before_finished(&self, _unit: &UnitRef) -> Result<(), Fault> {
        self.script.before_finished.as_ref().map_or(Ok(()), Failure::raise)
    }
}

struct FailingOrderer {
    message: String,
}

impl CaseOrderer for FailingOrderer {
    fn name(&self) -> &str {
        "scripted"
    }

    fn order(&self, _cases: &[Arc<TestCase>]) -> Result<Vec<Arc<TestCase>>, Fault> {
        Err(Fault::new(SCRIPTED_FAILURE, self.message.clone()))
    }
}

// ============================================================================
// Building
// ============================================================================

pub(super) fn build_suite(script: &SuiteScript, config: &RunnerConfig) -> Result<Suite, ScriptError> {
    ensure_unique("assembly", "the suite", script.assemblies.iter().map(|a| a.name.as_str()))?;
    let assemblies = script
        .assemblies
        .iter()
        .map(|assembly| build_assembly(assembly, config))
        .collect::<Result<Vec<_>, _>>()?;
    tracing::debug!(assemblies = assemblies.len(), "built scripted suite");
    Ok(Suite { assemblies })
}

fn build_assembly(script: &AssemblyScript, config: &RunnerConfig) -> Result<LoadedAssembly, ScriptError> {
    let assembly = Arc::new(TestAssembly {
        name: script.name.clone(),
        hooks: hooks(&script.hooks),
        fixtures: fixtures(&script.fixtures),
    });
    ensure_unique("collection", &script.name, script.collections.iter().map(|c| c.name.as_str()))?;

    let mut cases = Vec::new();
    for collection_script in &script.collections {
        let collection = Arc::new(TestCollection {
            name: collection_script.name.clone(),
            assembly: Arc::clone(&assembly),
            hooks: hooks(&collection_script.hooks),
            fixtures: fixtures(&collection_script.fixtures),
        });
        ensure_unique("class", &collection_script.name, collection_script.classes.iter().map(|c| c.name.as_str()))?;

        for class_script in &collection_script.classes {
            let class = Arc::new(build_class(&collection, class_script));
            ensure_unique("method", &class_script.name, class_script.methods.iter().map(|m| m.name.as_str()))?;

            for method_script in &class_script.methods {
                let method = Arc::new(TestMethod {
                    name: method_script.name.clone(),
                    class: Arc::clone(&class),
                    subject: Arc::new(ScriptedSubject::new(method_script.outcome.clone())),
                    parameters: method_script.parameters.clone(),
                    hooks: hooks(&method_script.hooks),
                    test_hooks: hooks(&method_script.test_hooks),
                });
                build_cases(&method, method_script, config, &mut cases)?;
            }
        }
    }
    Ok(LoadedAssembly { assembly, cases })
}

fn build_class(collection: &Arc<TestCollection>, script: &ClassScript) -> TestClass {
    let shape = if script.is_static {
        ClassShape::static_class()
    } else {
        match &script.constructors {
            Some(constructors) => ClassShape::with_constructors(
                constructors
                    .iter()
                    .map(|ctor| ConstructorInfo {
                        is_static: ctor.is_static,
                        parameters: ctor
                            .parameters
                            .iter()
                            .map(|p| ParameterInfo {
                                name: p.name.clone(),
                                type_name: p.type_name.clone(),
                                default_value: p.default.clone(),
                                is_optional: p.optional,
                                is_variadic: p.variadic,
                            })
                            .collect(),
                    })
                    .collect(),
            ),
            None => ClassShape::default(),
        }
    };

    let orderer: Option<Arc<dyn CaseOrderer>> = match &script.order {
        None => None,
        Some(OrderScript::Discovery) => Some(Arc::new(DiscoveryOrder)),
        Some(OrderScript::Alphabetical) => Some(Arc::new(AlphabeticalOrder)),
        Some(OrderScript::Fail(message)) => Some(Arc::new(FailingOrderer {
            message: message.clone(),
        })),
    };

    TestClass {
        name: script.name.clone(),
        collection: Arc::clone(collection),
        shape,
        hooks: hooks(&script.hooks),
        fixtures: fixtures(&script.fixtures),
        orderer,
    }
}

fn build_cases(
    method: &Arc<TestMethod>,
    script: &MethodScript,
    config: &RunnerConfig,
    cases: &mut Vec<Arc<TestCase>>,
) -> Result<(), ScriptError> {
    let plain = [CaseScript::default()];
    let scripts = script.cases.as_deref().unwrap_or(&plain);

    for (index, case_script) in scripts.iter().enumerate() {
        let kinds = [
            case_script.arguments.is_some(),
            case_script.rows.is_some(),
            case_script.deferred.is_some(),
            case_script.error.is_some(),
        ];
        if kinds.iter().filter(|given| **given).count() > 1 {
            return Err(ScriptError::Invalid(format!(
                "case {} of {} may only give one of `arguments`, `rows`, `deferred` and `error`",
                index,
                method.unique_id()
            )));
        }

        let (data, row_outcomes) = case_data(case_script);
        let display = case_script
            .display
            .clone()
            .unwrap_or_else(|| method.display_name(config.method_display));
        let mut case = TestCase::new(method, data)
            .with_display_name(display)
            .with_key(index.to_string());
        if let Some(reason) = &case_script.skip {
            case = case.skipped(reason.clone());
        }
        if case_script.outcome.is_some() || row_outcomes.iter().any(Option::is_some) {
            let default = case_script.outcome.clone().unwrap_or_else(|| script.outcome.clone());
            case = case.with_subject(Arc::new(ScriptedSubject::with_rows(default, row_outcomes)));
        }
        cases.push(Arc::new(case));
    }
    Ok(())
}

fn case_data(script: &CaseScript) -> (CaseData, Vec<Option<Outcome>>) {
    if let Some(rows) = &script.rows {
        return (CaseData::Rows(data_rows(rows)), row_outcomes(rows));
    }
    if let Some(deferred) = &script.deferred {
        return match deferred {
            DeferredScript::Rows(rows) => {
                let data = data_rows(rows);
                let source = move || -> Result<Vec<DataRow>, Fault> { Ok(data.clone()) };
                (CaseData::Deferred(Arc::new(source) as Arc<dyn DataSource>), row_outcomes(rows))
            }
            DeferredScript::Error(message) => {
                let message = message.clone();
                let source =
                    move || -> Result<Vec<DataRow>, Fault> { Err(Fault::new(SCRIPTED_FAILURE, message.clone())) };
                (CaseData::Deferred(Arc::new(source) as Arc<dyn DataSource>), Vec::new())
            }
        };
    }
    if let Some(message) = &script.error {
        return (CaseData::ExecutionError(message.clone()), Vec::new());
    }
    (CaseData::Arguments(script.arguments.clone().unwrap_or_default()), Vec::new())
}

fn data_rows(rows: &[RowScript]) -> Vec<DataRow> {
    rows.iter()
        .map(|row| DataRow {
            arguments: row.arguments.clone(),
            skip_reason: row.skip.clone(),
        })
        .collect()
}

fn row_outcomes(rows: &[RowScript]) -> Vec<Option<Outcome>> {
    rows.iter().map(|row| row.outcome.clone()).collect()
}

fn hooks(scripts: &[HookScript]) -> Hooks {
    scripts
        .iter()
        .map(|script| Arc::new(ScriptedHook::new(script.clone())) as Arc<dyn LifecycleHook>)
        .collect()
}

fn fixtures(values: &BTreeMap<String, Argument>) -> FixtureSet {
    values.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

fn ensure_unique<'s>(kind: &str, parent: &str, names: impl Iterator<Item = &'s str>) -> Result<(), ScriptError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(ScriptError::Invalid(format!("duplicate {} '{}' in {}", kind, name, parent)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Test;
    use crate::script::PassScript;
    use serde_json::json;

    fn call_with(subject: &ScriptedSubject, index: i32) -> Result<Invocation, Fault> {
        let test = Test {
            case_id: "c".into(),
            index,
            display_name: "t".into(),
            arguments: Vec::new(),
            skip_reason: None,
        };
        subject.invoke(&TestCall {
            test: &test,
            constructor_arguments: &[],
        })
    }

    #[test]
    fn test_scripted_subject_prefers_row_outcome() {
        let subject = ScriptedSubject::with_rows(
            Outcome::default(),
            vec![None, Some(Outcome::Fail("row 1 fails".into()))],
        );
        assert!(call_with(&subject, 0).is_ok());
        assert_eq!(call_with(&subject, 1).unwrap_err().message, "row 1 fails");
        assert!(call_with(&subject, 7).is_ok());
    }

    #[test]
    fn test_skip_outcome_raises_a_skip_fault() {
        let subject = ScriptedSubject::new(Outcome::Skip("flaky upstream".into()));
        assert_eq!(call_with(&subject, 0).unwrap_err().skip_reason(), Some("flaky upstream"));
    }

    #[test]
    fn test_pass_outcome_reports_scripted_time() {
        let subject = ScriptedSubject::new(Outcome::Pass(PassScript {
            output: "out".into(),
            millis: 40,
        }));
        let invocation = call_with(&subject, 0).unwrap();
        assert_eq!(invocation.time, Duration::from_millis(40));
        assert_eq!(invocation.output, "out");
    }

    #[test]
    fn test_case_data_kinds() {
        let rows = CaseScript {
            rows: Some(vec![RowScript {
                arguments: vec![json!(1)],
                skip: None,
                outcome: None,
            }]),
            ..CaseScript::default()
        };
        assert!(matches!(case_data(&rows).0, CaseData::Rows(ref r) if r.len() == 1));

        let error = CaseScript {
            error: Some("broken".into()),
            ..CaseScript::default()
        };
        assert!(matches!(case_data(&error).0, CaseData::ExecutionError(ref m) if m == "broken"));

        assert!(matches!(case_data(&CaseScript::default()).0, CaseData::Arguments(ref a) if a.is_empty()));
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let err = ensure_unique("method", "Calc", ["adds", "subtracts", "adds"].into_iter()).unwrap_err();
        assert_eq!(err.to_string(), "invalid scripted suite: duplicate method 'adds' in Calc");
    }
}
