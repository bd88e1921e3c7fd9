//! Runner configuration
//!
//! Read from `harrow.runner.json` next to a suite, or built in code with the `with_*` methods.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// File name looked up by [`RunnerConfig::discover`].
pub const CONFIG_FILE_NAME: &str = "harrow.runner.json";

/// Runner configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct RunnerConfig {
    /// Show diagnostic notices (orderer fallbacks and the like)
    pub diagnostic_messages: bool,
    /// Cancel the run after the first failed test
    pub stop_on_fail: bool,
    /// How default test display names are built
    pub method_display: MethodDisplay,
    /// Run-wide default case order
    pub case_order: CaseOrder,
    /// How the test class constructor is chosen
    pub constructor_policy: ConstructorPolicy,
}

/// Display name style for tests without an explicit name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MethodDisplay {
    /// `Class.method`
    #[default]
    ClassAndMethod,
    /// `method`
    Method,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CaseOrder {
    #[default]
    Discovery,
    Alphabetical,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConstructorPolicy {
    /// The class must declare a parameterless constructor
    #[default]
    Parameterless,
    /// The class must declare exactly one constructor, whose parameters are resolved from fixtures
    Sole,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid runner configuration in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            diagnostic_messages: false,
            stop_on_fail: false,
            method_display: MethodDisplay::ClassAndMethod,
            case_order: CaseOrder::Discovery,
            constructor_policy: ConstructorPolicy::Parameterless,
        }
    }
}

impl RunnerConfig {
    /// Create a new config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration document
    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }

    /// Load the configuration file at `path`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&source).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `harrow.runner.json` from `dir` if present, defaults otherwise
    pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "loading runner configuration");
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    pub fn with_diagnostic_messages(mut self, enabled: bool) -> Self {
        self.diagnostic_messages = enabled;
        self
    }

    pub fn with_stop_on_fail(mut self, enabled: bool) -> Self {
        self.stop_on_fail = enabled;
        self
    }

    pub fn with_method_display(mut self, display: MethodDisplay) -> Self {
        self.method_display = display;
        self
    }

    pub fn with_case_order(mut self, order: CaseOrder) -> Self {
        self.case_order = order;
        self
    }

    pub fn with_constructor_policy(mut self, policy: ConstructorPolicy) -> Self {
        self.constructor_policy = policy;
        self
    }
}
