//! Judge transport

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::multipart::{Form, Part};
use tracing::debug;

use super::tracker::StatusReport;
use crate::config::JudgeConfig;
use crate::error::{JudgeError, Result};
use crate::languages::Language;

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub token: String,
}

impl Credentials {
    pub fn from_config(judge: &JudgeConfig) -> Result<Self> {
        let username = judge
            .username
            .clone()
            .filter(|u| !u.is_empty())
            .ok_or(JudgeError::MissingCredentials { field: "username" })?;
        let token = judge
            .token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or(JudgeError::MissingCredentials { field: "token" })?;
        Ok(Self { username, token })
    }
}

/// A solution to upload
#[derive(Debug, Clone)]
pub struct Submission {
    pub problem: String,
    pub language: Language,
    pub file_name: String,
    pub source: String,
}

#[async_trait]
pub trait JudgeClient: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<()>;

    /// Upload a solution, returning the submission id
    async fn submit(&self, submission: &Submission) -> Result<String>;

    async fn poll(&self, submission_id: &str) -> Result<StatusReport>;
}

/// Pull the submission id out of the judge's reply to an upload
pub fn extract_submission_id(body: &str) -> Result<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(r"Submission ID: (\d+)").expect("valid regex"));

    pattern
        .captures(body)
        .map(|captures| captures[1].to_string())
        .ok_or_else(|| JudgeError::SubmissionIdMissing {
            body: body.to_string(),
        })
}

/// Kattis-style judge over HTTP; the login session lives in the cookie store
#[derive(Debug, Clone)]
pub struct HttpJudge {
    client: reqwest::Client,
    base_url: String,
}

impl HttpJudge {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("solcheck/", env!("CARGO_PKG_VERSION")))
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Shared with other requests to the same judge
    pub fn http_client(&self) -> reqwest::Client {
        self.client.clone()
    }

    pub fn submission_url(&self, submission_id: &str) -> String {
        format!("{}/submissions/{}", self.base_url, submission_id)
    }

    /// Body of a successful response; anything else is a transport error
    async fn body(response: reqwest::Response, context: &str) -> Result<String> {
        let status = response.status();
        let body = response.text().await?;
        if status != reqwest::StatusCode::OK {
            return Err(JudgeError::Transport {
                context: context.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl JudgeClient for HttpJudge {
    async fn login(&self, credentials: &Credentials) -> Result<()> {
        debug!("Logging in as {}", credentials.username);
        let response = self
            .client
            .post(format!("{}/login", self.base_url))
            .form(&[
                ("user", credentials.username.as_str()),
                ("token", credentials.token.as_str()),
                ("script", "true"),
            ])
            .send()
            .await?;

        Self::body(response, "Login failed").await?;
        Ok(())
    }

    async fn submit(&self, submission: &Submission) -> Result<String> {
        let file = Part::text(submission.source.clone())
            .file_name(submission.file_name.clone())
            .mime_str("application/octet-stream")?;
        let form = Form::new()
            .text("submit", "true")
            .text("submit_ctr", "2")
            .text("language", submission.language.judge_name())
            .text("problem", submission.problem.clone())
            .text("script", "true")
            .part("sub_file[]", file);

        let response = self
            .client
            .post(format!("{}/submit", self.base_url))
            .multipart(form)
            .send()
            .await?;

        let body = Self::body(response, "Submission failed").await?;
        extract_submission_id(&body)
    }

    async fn poll(&self, submission_id: &str) -> Result<StatusReport> {
        let response = self
            .client
            .get(format!("{}?json", self.submission_url(submission_id)))
            .send()
            .await?;

        let body = Self::body(response, "Error when requesting submission status").await?;
        serde_json::from_str(&body).map_err(|e| JudgeError::Transport {
            context: format!("Unexpected submission status payload ({})", e),
            status: 200,
            body,
        })
    }
}

#[cfg(test)]
pub mod fake {
    //! Judge that replays scripted status reports

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct ScriptedJudge {
        reports: Mutex<VecDeque<StatusReport>>,
        pub polls: AtomicUsize,
        pub submitted: Mutex<Vec<Submission>>,
    }

    impl ScriptedJudge {
        pub fn new(reports: impl IntoIterator<Item = StatusReport>) -> Self {
            Self {
                reports: Mutex::new(reports.into_iter().collect()),
                ..Self::default()
            }
        }

        pub fn polls(&self) -> usize {
            self.polls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl JudgeClient for ScriptedJudge {
        async fn login(&self, _credentials: &Credentials) -> Result<()> {
            Ok(())
        }

        async fn submit(&self, submission: &Submission) -> Result<String> {
            self.submitted.lock().unwrap().push(submission.clone());
            Ok("4242".to_string())
        }

        async fn poll(&self, _submission_id: &str) -> Result<StatusReport> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            self.reports
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| JudgeError::Transport {
                    context: "script exhausted".to_string(),
                    status: 500,
                    body: String::new(),
                })
        }
    }
}
