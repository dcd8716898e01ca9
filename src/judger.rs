//! Judger module for testing a solution against samples
//!
//! Runs the prepared program on every sample, times it, and compares the
//! output when an expected answer exists. One failing sample never stops the
//! remaining ones.

use futures_util::stream::{self, StreamExt};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::checker::{Checker, ComparisonOutcome};
use crate::config::Config;
use crate::error::{JudgeError, Result};
use crate::runner::{ExecutionResult, Runnable, RuntimeContext, Session};
use crate::samples::{collect_samples, Sample, SampleSource};

/// Outcome of running one sample
#[derive(Debug, Clone)]
pub struct SampleReport {
    pub sample: Sample,
    /// The error message when the program could not be run at all
    pub result: Result<ExecutionResult, String>,
    pub elapsed: Duration,
    /// `None` when there was nothing to compare against or diffing is off
    pub comparison: Option<ComparisonOutcome>,
}

impl SampleReport {
    /// Output matched, or there was nothing to compare. A run that failed
    /// never matches.
    pub fn matched(&self) -> bool {
        match (&self.result, &self.comparison) {
            (Err(_), _) => false,
            (Ok(_), Some(comparison)) => comparison.is_match(),
            (Ok(_), None) => true,
        }
    }

    /// Reported independently of the comparison
    pub fn exited_nonzero(&self) -> bool {
        matches!(&self.result, Ok(result) if result.exit_code != 0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TestSummary {
    /// In sample order
    pub reports: Vec<SampleReport>,
}

impl TestSummary {
    /// Logical AND of per-sample matches; exit codes do not count here
    pub fn all_matched(&self) -> bool {
        self.reports.iter().all(SampleReport::matched)
    }

    /// Every sample matched and every run exited with 0
    pub fn all_clean(&self) -> bool {
        self.reports
            .iter()
            .all(|report| report.matched() && !report.exited_nonzero())
    }

    pub fn failed(&self) -> usize {
        self.reports.iter().filter(|report| !report.matched()).count()
    }
}

#[derive(Debug, Clone)]
pub struct TestRunner {
    checker: Checker,
    diff: bool,
    jobs: usize,
}

impl TestRunner {
    pub fn new(config: &Config) -> Self {
        Self {
            checker: Checker::new(config.ignore_debug),
            diff: config.diff,
            jobs: config.jobs.max(1),
        }
    }

    /// Run one sample. Failing to run the program is recorded in the report
    /// rather than returned.
    pub async fn run_sample(&self, runnable: &Runnable<'_>, sample: Sample) -> SampleReport {
        debug!("Testing with {}", sample.name);

        let start = Instant::now();
        let result = runnable.run(&sample.input).await;
        let elapsed = start.elapsed();

        let (result, comparison) = match result {
            Ok(result) => {
                let comparison = match (&sample.output, self.diff) {
                    (Some(expected), true) => Some(self.checker.compare(&result.stdout, expected)),
                    _ => None,
                };
                (Ok(result), comparison)
            }
            Err(e) => {
                warn!("Could not run {}: {}", sample.name, e);
                (Err(e.to_string()), None)
            }
        };

        SampleReport {
            sample,
            result,
            elapsed,
            comparison,
        }
    }

    /// Run every sample; reports are delivered to `on_report` in sample
    /// order even when several samples run at once
    pub async fn run_all(
        &self,
        runnable: &Runnable<'_>,
        samples: Vec<Sample>,
        on_report: &mut (dyn FnMut(&SampleReport) + Send),
    ) -> TestSummary {
        let mut reports = Vec::with_capacity(samples.len());
        let mut results = stream::iter(samples)
            .map(|sample| self.run_sample(runnable, sample))
            .buffered(self.jobs);

        while let Some(report) = results.next().await {
            on_report(&report);
            reports.push(report);
        }

        TestSummary { reports }
    }
}

/// Gather samples, prepare the program and run it on every sample
pub async fn test_solution(
    ctx: &RuntimeContext,
    source: &Path,
    problem: &str,
    sources: &[Box<dyn SampleSource>],
    on_report: &mut (dyn FnMut(&SampleReport) + Send),
) -> Result<TestSummary> {
    let mut session = Session::open(ctx, source)?;

    let dir = source.parent().unwrap_or(Path::new("."));
    let samples = collect_samples(sources, problem, dir).await;
    if samples.is_empty() {
        return Err(JudgeError::NoSamples {
            problem: problem.to_string(),
        });
    }
    info!("Found {} sample(s) for {}", samples.len(), problem);

    let summary = {
        let runnable = session.prepare().await?;
        TestRunner::new(&ctx.config)
            .run_all(&runnable, samples, on_report)
            .await
    };

    session.close()?;
    Ok(summary)
}
