//! Submission to the remote judge
//!
//! - `client`: login, upload and status polling over HTTP
//! - `status`: the judge's status codes as a closed enum
//! - `tracker`: folds polled statuses into a `SubmissionState`

pub mod client;
pub mod status;
pub mod tracker;

use std::time::Duration;

use tracing::{debug, info};

use crate::error::Result;

pub use client::{Credentials, HttpJudge, JudgeClient, Submission};
pub use tracker::{SubmissionState, SubmissionTracker};

/// Log in and upload, returning the submission id
pub async fn submit(
    client: &dyn JudgeClient,
    credentials: &Credentials,
    submission: &Submission,
) -> Result<String> {
    client.login(credentials).await?;
    let id = client.submit(submission).await?;
    info!("Submitted {} as submission {}", submission.problem, id);
    Ok(id)
}

/// Poll a submission until it reaches a terminal state, waiting `interval`
/// between polls. Every state is passed to `observer`, the terminal one
/// included.
pub async fn track(
    client: &dyn JudgeClient,
    submission_id: &str,
    interval: Duration,
    observer: &mut (dyn FnMut(&SubmissionState) + Send),
) -> Result<SubmissionState> {
    let mut tracker = SubmissionTracker::new();

    loop {
        let report = client.poll(submission_id).await?;
        debug!(
            "Submission {}: status {} ({}), test case {}",
            submission_id,
            report.status_id,
            report.status(),
            report.testcase_index
        );

        let state = tracker.advance(&report);
        observer(&state);
        if state.is_terminal() {
            return Ok(state);
        }

        tokio::time::sleep(interval).await;
    }
}
