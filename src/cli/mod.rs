//! CLI module for the harrow test runner
//!
//! ## Commands
//!
//! - `run <suite>` - Execute a scripted suite and report the results
//! - `list <suite>` - Print the unique id of every discovered test case
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Run xUnit-style test suites
#[derive(Parser, Debug)]
#[command(name = "harrow")]
#[command(version = VERSION)]
#[command(about = "Run xUnit-style test suites", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute a scripted suite
    Run {
        /// Scripted suite (JSON)
        #[arg(value_name = "SUITE")]
        suite: PathBuf,
        /// Output format
        #[arg(long, value_enum, default_value_t = ReporterKind::Console)]
        reporter: ReporterKind,
        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
        /// Stop on first failure
        #[arg(short = 'x', long = "stop-on-fail")]
        stop_on_fail: bool,
        /// Runner configuration file (default: harrow.runner.json next to the suite)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Show diagnostic notices
        #[arg(long)]
        diagnostics: bool,
    },

    /// List the test cases of a scripted suite
    List {
        /// Scripted suite (JSON)
        #[arg(value_name = "SUITE")]
        suite: PathBuf,
    },
}

/// Where lifecycle messages go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReporterKind {
    /// pytest-style progress on stderr
    Console,
    /// One JSON object per message on stdout
    Json,
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Command::Run {
            suite,
            reporter,
            verbose,
            stop_on_fail,
            config,
            diagnostics,
        } => commands::run_suite(&commands::RunOptions {
            suite,
            reporter,
            verbose,
            stop_on_fail,
            config,
            diagnostics,
        }),
        Command::List { suite } => commands::list_suite(&suite),
    }
}

// ============================================================================
// Tests
// ============================================================================
