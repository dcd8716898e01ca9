//! Error taxonomy shared by the language runtime, sample sources and the
//! submission client.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum JudgeError {
    #[error("language for file extension '{extension}' is not implemented")]
    UnsupportedLanguage { extension: String },

    #[error("no toolchain found for {language}, needs one of: {}", searched.join(", "))]
    ToolchainMissing {
        language: String,
        searched: Vec<String>,
    },

    #[error("compilation exited with code {exit_code}")]
    CompileFailed { exit_code: i32, stderr: String },

    #[error("failed to spawn '{program}': {source}")]
    ProcessSpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{source_name}: failed to fetch samples: {reason}")]
    SampleFetchFailed { source_name: String, reason: String },

    #[error("found no inputs to run for problem {problem}")]
    NoSamples { problem: String },

    #[error("corrupt cache entry {}: {reason}", path.display())]
    CacheCorrupt { path: PathBuf, reason: String },

    #[error("{context} ({status}):\n{body}")]
    Transport {
        context: String,
        status: u16,
        body: String,
    },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("couldn't find submission ID in response: {body}")]
    SubmissionIdMissing { body: String },

    #[error("missing judge {field} in configuration (set [judge].{field} in .solcheck.toml)")]
    MissingCredentials { field: &'static str },

    #[error("invalid problem id '{0}'")]
    InvalidProblemId(String),

    #[error("invalid configuration {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = JudgeError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toolchain_missing_lists_searched_names() {
        let err = JudgeError::ToolchainMissing {
            language: "Lua".to_string(),
            searched: vec!["lua".to_string(), "luajit".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "no toolchain found for Lua, needs one of: lua, luajit"
        );
    }

    #[test]
    fn test_transport_error_surfaces_status_and_body() {
        let err = JudgeError::Transport {
            context: "failed to login".to_string(),
            status: 403,
            body: "bad token".to_string(),
        };
        assert_eq!(err.to_string(), "failed to login (403):\nbad token");
    }
}
