//! CLI command implementations

use std::path::{Path, PathBuf};
use std::sync::Arc;

use harrow_core::{ExecutionSummary, MessageBus};

use super::{CliError, CliResult, ExitCode, ReporterKind};
use crate::config::RunnerConfig;
use crate::report::{ConsoleReporter, JsonLinesReporter};
use crate::runner::RunContext;
use crate::script::{ScriptError, Suite};

/// Arguments of `harrow run`.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub suite: PathBuf,
    pub reporter: ReporterKind,
    pub verbose: bool,
    pub stop_on_fail: bool,
    pub config: Option<PathBuf>,
    pub diagnostics: bool,
}

/// Execute a scripted suite.
///
/// Exits with failure when any test failed or the run was cancelled.
#[tracing::instrument(skip_all, fields(suite = %options.suite.display()))]
pub fn run_suite(options: &RunOptions) -> CliResult<ExitCode> {
    let config = load_config(options.config.as_deref(), &options.suite)?;
    let stop_on_fail = config.stop_on_fail || options.stop_on_fail;
    let diagnostics = config.diagnostic_messages || options.diagnostics;
    let config = config
        .with_stop_on_fail(stop_on_fail)
        .with_diagnostic_messages(diagnostics);

    let suite = Suite::load(&options.suite, &config).map_err(render)?;

    let reporter: Arc<dyn MessageBus> = match options.reporter {
        ReporterKind::Console => Arc::new(ConsoleReporter::stderr(options.verbose)),
        ReporterKind::Json => Arc::new(JsonLinesReporter::stdout()),
    };
    let mut ctx = RunContext::from_config(Arc::clone(&reporter), &config);
    if config.diagnostic_messages {
        ctx = ctx.with_diagnostics(reporter);
    }

    let summary = suite.run(&ctx);
    tracing::info!(
        total = summary.total,
        failed = summary.failed,
        skipped = summary.skipped,
        cancelled = ctx.is_cancelled(),
        "run complete"
    );
    Ok(exit_code_for(&summary, ctx.is_cancelled()))
}

/// Print the unique id of every case in a scripted suite.
pub fn list_suite(path: &Path) -> CliResult<ExitCode> {
    let config = load_config(None, path)?;
    let suite = Suite::load(path, &config).map_err(render)?;
    for id in suite.case_ids() {
        println!("{}", id);
    }
    eprintln!("collected {} case(s)", suite.case_count());
    Ok(ExitCode::SUCCESS)
}

/// Explicit `--config` file, else `harrow.runner.json` next to the suite.
fn load_config(explicit: Option<&Path>, suite: &Path) -> CliResult<RunnerConfig> {
    let loaded = match explicit {
        Some(path) => RunnerConfig::load(path),
        None => RunnerConfig::discover(suite.parent().unwrap_or_else(|| Path::new("."))),
    };
    loaded.map_err(|e| CliError::failure(e.to_string()))
}

fn render(err: ScriptError) -> CliError {
    CliError::failure(format!("{:?}", miette::Report::new(err)))
}

pub(crate) fn exit_code_for(summary: &ExecutionSummary, cancelled: bool) -> ExitCode {
    if summary.failed > 0 || cancelled {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
