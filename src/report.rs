//! Terminal output for sample runs and submissions

use std::io::{self, Write};
use std::time::Duration;

use crate::checker::ComparisonOutcome;
use crate::judger::{SampleReport, TestSummary};
use crate::submit::SubmissionState;

const CHECK: &str = "[✓]";
const CROSS: &str = "[✕]";
const PENDING: &str = "[?]";

#[derive(Debug, Clone, Copy)]
enum Paint {
    Green,
    Yellow,
    Red,
}

#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    color: bool,
    verbose: bool,
}

impl Reporter {
    pub fn new(color: bool, verbose: bool) -> Self {
        Self { color, verbose }
    }

    fn paint(&self, text: &str, paint: Paint) -> String {
        if !self.color {
            return text.to_string();
        }
        let code = match paint {
            Paint::Green => "32",
            Paint::Yellow => "33",
            Paint::Red => "31",
        };
        format!("\x1b[{}m{}\x1b[0m", code, text)
    }

    fn timing(&self, elapsed: Duration) -> String {
        let seconds = elapsed.as_secs_f64();
        let paint = if seconds < 1.0 {
            Paint::Green
        } else if seconds < 3.0 {
            Paint::Yellow
        } else {
            Paint::Red
        };
        self.paint(&format!("{:.3} s", seconds), paint)
    }

    pub fn sample(&self, out: &mut impl Write, report: &SampleReport) -> io::Result<()> {
        let sample = &report.sample;
        let mark = match (&report.result, &report.comparison) {
            (Err(_), _) | (_, Some(ComparisonOutcome::Mismatch { .. })) => self.paint(CROSS, Paint::Red),
            (_, Some(ComparisonOutcome::Match { .. })) => self.paint(CHECK, Paint::Green),
            (_, None) => PENDING.to_string(),
        };
        writeln!(
            out,
            "{} Testing with {} ({}) {}",
            mark,
            sample.name,
            sample.origin,
            self.timing(report.elapsed)
        )?;

        let result = match &report.result {
            Ok(result) => result,
            Err(message) => {
                let line = format!("Could not run the program: {}", message);
                return writeln!(out, "{}", self.paint(&line, Paint::Red));
            }
        };

        match &report.comparison {
            Some(ComparisonOutcome::Mismatch { rendered_diff }) => {
                writeln!(out, "Input:")?;
                writeln!(out, "{}", indented(&sample.input))?;
                writeln!(out, "{}", self.paint("Output:", Paint::Yellow))?;
                writeln!(out, "{}", indented(rendered_diff))?;
            }
            Some(ComparisonOutcome::Match {
                debug_lines_suppressed,
            }) => {
                if *debug_lines_suppressed && self.verbose {
                    writeln!(out, "  (debug lines ignored)")?;
                }
            }
            None => {
                writeln!(out, "{}", self.paint("Input:", Paint::Yellow))?;
                writeln!(out, "{}", indented(&sample.input))?;
                writeln!(out, "{}", self.paint("Got output:", Paint::Yellow))?;
                writeln!(out, "{}", indented(&result.stdout))?;
            }
        }

        if report.exited_nonzero() {
            let mut message = format!(
                "Process exited with a non-zero exit code {}",
                result.exit_code
            );
            if !result.stderr.is_empty() {
                message.push_str(" and the following stderr:");
            }
            writeln!(out, "{}", self.paint(&message, Paint::Red))?;
            if !result.stderr.is_empty() {
                writeln!(out, "{}", indented(&result.stderr))?;
            }
        } else if !result.stderr.is_empty() {
            writeln!(out, "{}", self.paint("Got stderr:", Paint::Yellow))?;
            writeln!(out, "{}", indented(&result.stderr))?;
        }

        Ok(())
    }

    pub fn summary(&self, out: &mut impl Write, summary: &TestSummary) -> io::Result<()> {
        let total = summary.reports.len();
        let passed = total - summary.failed();
        let line = format!("{}/{} samples passed", passed, total);
        let paint = if summary.all_matched() {
            Paint::Green
        } else {
            Paint::Red
        };
        writeln!(out, "{}", self.paint(&line, paint))
    }

    /// One status line per submission state
    pub fn submission(&self, state: &SubmissionState) -> String {
        match state {
            SubmissionState::Preparing { status_message } => {
                format!("Preparing: {}...", status_message)
            }
            SubmissionState::PrepareFailed { message } => {
                format!("Preparing: {}", self.paint(message, Paint::Red))
            }
            SubmissionState::Running {
                total_cases,
                passed_cases,
            } => format!(
                "Running: {}",
                self.progress(*passed_cases, false, total_cases.saturating_sub(*passed_cases))
            ),
            SubmissionState::Accepted { total_cases } => format!(
                "Running: {}\n{}",
                self.progress(*total_cases, false, 0),
                self.paint("Accepted", Paint::Green)
            ),
            SubmissionState::Failed {
                total_cases,
                passed_cases,
                message,
                ..
            } => {
                let rest = total_cases.saturating_sub(passed_cases + 1);
                format!(
                    "Running: {}\nError on test case {}: {}",
                    self.progress(*passed_cases, true, rest),
                    passed_cases + 1,
                    self.paint(message, Paint::Red)
                )
            }
        }
    }

    fn progress(&self, passed: u32, failed: bool, pending: u32) -> String {
        let mut line = self.paint(&CHECK.repeat(passed as usize), Paint::Green);
        if failed {
            line.push_str(&self.paint(CROSS, Paint::Red));
        }
        line.push_str(&PENDING.repeat(pending as usize));
        line
    }
}

/// Indent every line by two spaces
pub fn indented(text: &str) -> String {
    text.trim_end_matches('\n')
        .lines()
        .map(|line| format!("  {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}
