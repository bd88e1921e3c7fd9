//! pytest-style console output.

use std::io::{self, Write};
use std::time::Duration;

use harrow_core::{FlattenedFaults, Message, MessageBus, UnitKind, UnitRef};
use parking_lot::Mutex;

const GREEN: &str = "32";
const RED: &str = "31";
const YELLOW: &str = "33";
const BOLD: &str = "1";
const BOLD_RED: &str = "1;31";
const BOLD_GREEN: &str = "1;32";

/// Progress while the run executes, failure details and a summary line when an assembly finishes.
pub struct ConsoleReporter<W = io::Stderr> {
    verbose: bool,
    color: bool,
    state: Mutex<State<W>>,
}

struct State<W> {
    out: W,
    /// Progress characters written since the last newline.
    progress: bool,
    failures: Vec<Report>,
    cleanup_failures: Vec<Report>,
}

struct Report {
    name: String,
    output: String,
    faults: FlattenedFaults,
}

impl ConsoleReporter<io::Stderr> {
    pub fn stderr(verbose: bool) -> Self {
        Self::new(io::stderr(), verbose)
    }
}

impl<W: Write + Send> ConsoleReporter<W> {
    pub fn new(out: W, verbose: bool) -> Self {
        Self {
            verbose,
            color: true,
            state: Mutex::new(State {
                out,
                progress: false,
                failures: Vec::new(),
                cleanup_failures: Vec::new(),
            }),
        }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn into_inner(self) -> W {
        self.state.into_inner().out
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        } else {
            text.to_string()
        }
    }

    fn render(&self, state: &mut State<W>, message: Message) -> io::Result<()> {
        match message {
            Message::Starting { unit } => match unit.kind {
                UnitKind::Assembly => {
                    let header = format!("=================== {} ===================", unit.display_name);
                    writeln!(state.out, "{}", self.paint(BOLD, &header))?;
                }
                UnitKind::Test if self.verbose => write!(state.out, "{} ... ", unit.display_name)?,
                _ => {}
            },
            Message::Passed { time, .. } => {
                if self.verbose {
                    writeln!(state.out, "{} ({}ms)", self.paint(GREEN, "PASSED"), time.as_millis())?;
                } else {
                    self.progress(state, GREEN, ".")?;
                }
            }
            Message::Failed {
                unit, output, faults, ..
            } => {
                if self.verbose {
                    writeln!(state.out, "{}", self.paint(RED, "FAILED"))?;
                } else {
                    self.progress(state, RED, "F")?;
                }
                state.failures.push(Report {
                    name: unit.display_name,
                    output,
                    faults,
                });
            }
            Message::Skipped { reason, .. } => {
                if self.verbose {
                    writeln!(state.out, "{} ({})", self.paint(YELLOW, "SKIPPED"), reason)?;
                } else {
                    self.progress(state, YELLOW, "s")?;
                }
            }
            Message::CleanupFailure { unit, faults } => {
                state.cleanup_failures.push(Report {
                    name: describe(&unit),
                    output: String::new(),
                    faults,
                });
            }
            Message::Diagnostic { message } => {
                self.end_progress(state)?;
                writeln!(state.out, "{} {}", self.paint(YELLOW, "[diagnostic]"), message)?;
            }
            Message::Finished {
                unit,
                time,
                total,
                failed,
                skipped,
            } if unit.kind == UnitKind::Assembly => {
                self.end_progress(state)?;
                self.finish(state, time, total, failed, skipped)?;
            }
            Message::Finished { .. } => {}
        }
        state.out.flush()
    }

    fn progress(&self, state: &mut State<W>, code: &str, mark: &str) -> io::Result<()> {
        state.progress = true;
        write!(state.out, "{}", self.paint(code, mark))
    }

    fn end_progress(&self, state: &mut State<W>) -> io::Result<()> {
        if std::mem::take(&mut state.progress) {
            writeln!(state.out)?;
        }
        Ok(())
    }

    fn finish(&self, state: &mut State<W>, time: Duration, total: u32, failed: u32, skipped: u32) -> io::Result<()> {
        let failures = std::mem::take(&mut state.failures);
        let cleanup_failures = std::mem::take(&mut state.cleanup_failures);

        if !failures.is_empty() {
            writeln!(state.out)?;
            writeln!(state.out, "{}", self.paint(BOLD_RED, "=================== FAILURES ==================="))?;
            for report in &failures {
                let header = self.paint(BOLD, &format!("___________ {} ___________", report.name));
                write_report(&mut state.out, report, &header)?;
            }
        }
        if !cleanup_failures.is_empty() {
            writeln!(state.out)?;
            writeln!(state.out, "{}", self.paint(BOLD_RED, "=============== CLEANUP FAILURES ==============="))?;
            for report in &cleanup_failures {
                let header = self.paint(BOLD, &format!("___________ {} ___________", report.name));
                write_report(&mut state.out, report, &header)?;
            }
        }

        let passed = total.saturating_sub(failed).saturating_sub(skipped);
        let mut parts = Vec::new();
        if passed > 0 {
            parts.push(format!("{} passed", passed));
        }
        if failed > 0 {
            parts.push(format!("{} failed", failed));
        }
        if skipped > 0 {
            parts.push(format!("{} skipped", skipped));
        }
        if parts.is_empty() {
            parts.push("no tests ran".to_string());
        }

        let line = format!("====== {} in {:.2}s ======", parts.join(", "), time.as_secs_f64());
        let code = if failed > 0 || !cleanup_failures.is_empty() { BOLD_RED } else { BOLD_GREEN };
        writeln!(state.out)?;
        writeln!(state.out, "{}", self.paint(code, &line))
    }
}

fn describe(unit: &UnitRef) -> String {
    format!("{} {}", unit.kind, unit.display_name)
}

fn write_report(out: &mut impl Write, report: &Report, header: &str) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", header)?;
    writeln!(out)?;
    for line in report.faults.combined_messages().lines() {
        writeln!(out, "    {}", line)?;
    }
    if report.faults.stack_traces.iter().any(Option::is_some) {
        writeln!(out)?;
        for line in report.faults.combined_stack_traces().lines() {
            writeln!(out, "    {}", line)?;
        }
    }
    if !report.output.is_empty() {
        writeln!(out)?;
        writeln!(out, "    Output:")?;
        for line in report.output.lines() {
            writeln!(out, "    {}", line)?;
        }
    }
    Ok(())
}

impl<W: Write + Send> MessageBus for ConsoleReporter<W> {
    fn queue_message(&self, message: Message) -> bool {
        let mut state = self.state.lock();
        if let Err(err) = self.render(&mut state, message) {
            tracing::warn!(error = %err, "failed to write console output");
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harrow_core::{ExecutionSummary, Fault};

    fn unit(kind: UnitKind, name: &str) -> UnitRef {
        UnitRef::new(kind, name, name)
    }

    fn output(reporter: ConsoleReporter<Vec<u8>>) -> String {
        String::from_utf8(reporter.into_inner()).unwrap()
    }

    #[test]
    fn test_progress_and_summary() {
        let reporter = ConsoleReporter::new(Vec::new(), false).with_color(false);
        reporter.queue_message(Message::starting(unit(UnitKind::Assembly, "calc")));
        reporter.queue_message(Message::Passed {
            unit: unit(UnitKind::Test, "a"),
            time: Duration::from_millis(3),
            output: String::new(),
        });
        reporter.queue_message(Message::Skipped {
            unit: unit(UnitKind::Test, "b"),
            reason: "later".into(),
        });
        let summary = ExecutionSummary {
            total: 2,
            skipped: 1,
            time: Duration::from_millis(250),
            ..ExecutionSummary::default()
        };
        reporter.queue_message(Message::finished(unit(UnitKind::Assembly, "calc"), &summary));

        assert_eq!(
            output(reporter),
            "=================== calc ===================\n.s\n\n====== 1 passed, 1 skipped in 0.25s ======\n"
        );
    }

    #[test]
    fn test_failure_details() {
        let reporter = ConsoleReporter::new(Vec::new(), true).with_color(false);
        reporter.queue_message(Message::starting(unit(UnitKind::Test, "Calc.adds")));
        let fault = Fault::new("assert", "1 != 2").with_inner(Fault::new("io", "eof"));
        reporter.queue_message(Message::failed(
            unit(UnitKind::Test, "Calc.adds"),
            Duration::ZERO,
            String::new(),
            &fault,
        ));
        let summary = ExecutionSummary {
            total: 1,
            failed: 1,
            ..ExecutionSummary::default()
        };
        reporter.queue_message(Message::finished(unit(UnitKind::Assembly, "calc"), &summary));

        let text = output(reporter);
        assert!(text.starts_with("Calc.adds ... FAILED\n"));
        assert!(text.contains("___________ Calc.adds ___________"));
        assert!(text.contains("    assert : 1 != 2\n    ---- io : eof\n"));
        assert!(text.ends_with("====== 1 failed in 0.00s ======\n"));
    }

    #[test]
    fn test_cleanup_failures_are_listed() {
        let reporter = ConsoleReporter::new(Vec::new(), false).with_color(false);
        reporter.queue_message(Message::cleanup_failure(unit(UnitKind::Class, "Calc"), &Fault::new("hook", "dispose")));
        reporter.queue_message(Message::finished(unit(UnitKind::Assembly, "calc"), &ExecutionSummary::default()));

        let text = output(reporter);
        assert!(text.contains("CLEANUP FAILURES"));
        assert!(text.contains("___________ class Calc ___________"));
        assert!(text.contains("no tests ran"));
    }
}
