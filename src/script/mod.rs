//! Scripted suites: JSON documents that describe a test tree and the outcome of every test.
//!
//! A scripted suite stands in for reflection-based discovery. The CLI loads one, builds the object model
//! from it, and runs it through the ordinary runner stack.
//!
//! ```json
//! {
//!   "assemblies": [{
//!     "name": "calc.tests",
//!     "collections": [{
//!       "name": "default",
//!       "classes": [{
//!         "name": "CalculatorTests",
//!         "methods": [
//!           { "name": "adds" },
//!           { "name": "divides", "outcome": { "fail": "division by zero" } },
//!           { "name": "parses", "parameters": ["text"],
//!             "cases": [{ "rows": [
//!               { "arguments": ["1"] },
//!               { "arguments": ["x"], "outcome": { "fail": "not a number" } }
//!             ] }] }
//!         ]
//!       }]
//!     }]
//!   }]
//! }
//! ```

mod build;
mod error;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use harrow_core::ExecutionSummary;
use serde::Deserialize;

use crate::config::RunnerConfig;
use crate::model::{Argument, TestAssembly, TestCase};
use crate::runner::{RunContext, TestAssemblyRunner};

pub use build::{SCRIPTED_FAILURE, ScriptedHook, ScriptedSubject};
pub use error::ScriptError;

// ============================================================================
// Document
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuiteScript {
    pub assemblies: Vec<AssemblyScript>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssemblyScript {
    pub name: String,
    #[serde(default)]
    pub hooks: Vec<HookScript>,
    #[serde(default)]
    pub fixtures: BTreeMap<String, Argument>,
    #[serde(default)]
    pub collections: Vec<CollectionScript>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionScript {
    pub name: String,
    #[serde(default)]
    pub hooks: Vec<HookScript>,
    #[serde(default)]
    pub fixtures: BTreeMap<String, Argument>,
    #[serde(default)]
    pub classes: Vec<ClassScript>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassScript {
    pub name: String,
    #[serde(default, rename = "static")]
    pub is_static: bool,
    /// Absent means a single parameterless constructor.
    pub constructors: Option<Vec<ConstructorScript>>,
    #[serde(default)]
    pub hooks: Vec<HookScript>,
    #[serde(default)]
    pub fixtures: BTreeMap<String, Argument>,
    pub order: Option<OrderScript>,
    #[serde(default)]
    pub methods: Vec<MethodScript>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConstructorScript {
    #[serde(default, rename = "static")]
    pub is_static: bool,
    #[serde(default)]
    pub parameters: Vec<ParameterScript>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterScript {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub default: Option<Argument>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub variadic: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct MethodScript {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default)]
    pub hooks: Vec<HookScript>,
    #[serde(default)]
    pub test_hooks: Vec<HookScript>,
    /// Outcome of every test of the method unless a case or row overrides it.
    #[serde(default)]
    pub outcome: Outcome,
    /// Absent means one plain case without arguments.
    pub cases: Option<Vec<CaseScript>>,
}

/// One case. At most one of `arguments`, `rows`, `deferred` and `error` may be given.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaseScript {
    pub display: Option<String>,
    pub skip: Option<String>,
    pub arguments: Option<Vec<Argument>>,
    pub rows: Option<Vec<RowScript>>,
    pub deferred: Option<DeferredScript>,
    pub error: Option<String>,
    pub outcome: Option<Outcome>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RowScript {
    #[serde(default)]
    pub arguments: Vec<Argument>,
    pub skip: Option<String>,
    pub outcome: Option<Outcome>,
}

/// Rows produced when the case starts, or the error enumerating them raises.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeferredScript {
    Rows(Vec<RowScript>),
    Error(String),
}

/// What a scripted test does when invoked.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    Pass(PassScript),
    Fail(String),
    Panic(String),
    /// Skip at run time with the given reason.
    Skip(String),
}

impl Default for Outcome {
    fn default() -> Self {
        Outcome::Pass(PassScript::default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PassScript {
    #[serde(default)]
    pub output: String,
    /// Reported elapsed time.
    #[serde(default)]
    pub millis: u64,
}

/// How a scripted hook or orderer misbehaves.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Failure {
    Fail(String),
    Panic(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct HookScript {
    pub name: String,
    pub after_starting: Option<Failure>,
    pub before_finished: Option<Failure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderScript {
    Discovery,
    Alphabetical,
    /// An orderer that fails with the given message.
    Fail(String),
}

// ============================================================================
// Loaded suite
// ============================================================================

/// One assembly with its discovered cases.
pub struct LoadedAssembly {
    pub assembly: Arc<TestAssembly>,
    pub cases: Vec<Arc<TestCase>>,
}

/// A scripted suite turned into the object model.
pub struct Suite {
    pub assemblies: Vec<LoadedAssembly>,
}

impl Suite {
    /// Parse and build a suite. `name` labels the document in diagnostics.
    pub fn parse(source: &str, name: &str, config: &RunnerConfig) -> Result<Self, ScriptError> {
        let script: SuiteScript =
            serde_json::from_str(source).map_err(|err| ScriptError::syntax(name, source, &err))?;
        build::build_suite(&script, config)
    }

    pub fn load(path: &Path, config: &RunnerConfig) -> Result<Self, ScriptError> {
        let source = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&source, &path.display().to_string(), config)
    }

    pub fn case_count(&self) -> usize {
        self.assemblies.iter().map(|a| a.cases.len()).sum()
    }

    /// Unique ids of every case, in discovery order.
    pub fn case_ids(&self) -> Vec<String> {
        self.assemblies
            .iter()
            .flat_map(|a| a.cases.iter().map(|case| case.unique_id()))
            .collect()
    }

    /// Run every assembly in order, stopping once the run is cancelled.
    pub fn run(&self, ctx: &RunContext) -> ExecutionSummary {
        let mut summary = ExecutionSummary::new();
        for loaded in &self.assemblies {
            if ctx.is_cancelled() {
                break;
            }
            summary.aggregate(&TestAssemblyRunner::new(&loaded.assembly, loaded.cases.clone()).run(ctx));
        }
        summary
    }
}
