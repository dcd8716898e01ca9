//! Configuration
//!
//! Loaded from the nearest `.solcheck.toml` above the solution file, then
//! overridden by environment variables and finally by command line flags.

use std::collections::HashMap;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::{JudgeError, Result};

pub const CONFIG_FILE_NAME: &str = ".solcheck.toml";
pub const DEFAULT_JUDGE_URL: &str = "https://open.kattis.com";
const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

/// Settings for the remote judge
#[derive(Debug, Clone)]
pub struct JudgeConfig {
    pub base_url: String,
    pub username: Option<String>,
    pub token: Option<String>,
    pub poll_interval: Duration,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_JUDGE_URL.to_string(),
            username: None,
            token: None,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

/// Effective configuration for one invocation
#[derive(Debug, Clone)]
pub struct Config {
    /// Ask compilers for colored diagnostics
    pub color: bool,
    /// Diff program output against expected output when available
    pub diff: bool,
    /// Strip debug lines from program output before comparing
    pub ignore_debug: bool,
    pub verbose: bool,
    /// Submit even if sample verification fails
    pub force: bool,
    /// Number of samples run concurrently
    pub jobs: usize,
    /// Extra include directory (and sources) for C++ solutions
    pub cpp_libs_dir: Option<PathBuf>,
    /// Extra flags per language key (`cpp`, `rust`, ...)
    pub extra_flags: HashMap<String, Vec<String>>,
    pub cache_dir: Option<PathBuf>,
    pub use_cache: bool,
    pub judge: JudgeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            color: std::io::stdout().is_terminal(),
            diff: true,
            ignore_debug: true,
            verbose: false,
            force: false,
            jobs: 1,
            cpp_libs_dir: None,
            extra_flags: HashMap::new(),
            cache_dir: dirs::cache_dir().map(|dir| dir.join("solcheck")),
            use_cache: true,
            judge: JudgeConfig::default(),
        }
    }
}

/// Raw TOML configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    color: Option<bool>,
    diff: Option<bool>,
    ignore_debug: Option<bool>,
    verbose: Option<bool>,
    force: Option<bool>,
    jobs: Option<usize>,
    cpp_libs_dir: Option<PathBuf>,
    #[serde(default)]
    extra_flags: HashMap<String, Vec<String>>,
    cache_dir: Option<PathBuf>,
    #[serde(default)]
    judge: RawJudgeConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawJudgeConfig {
    base_url: Option<String>,
    username: Option<String>,
    token: Option<String>,
    poll_interval_ms: Option<u64>,
}

/// Overrides coming from the command line; `None` keeps the configured value
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub diff: Option<bool>,
    pub ignore_debug: Option<bool>,
    pub verbose: Option<bool>,
    pub force: Option<bool>,
    pub jobs: Option<usize>,
    pub no_cache: bool,
}

/// Find the nearest configuration file, starting at `dir` and walking up
pub fn find_config(dir: &Path) -> Option<PathBuf> {
    dir.ancestors()
        .map(|ancestor| ancestor.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

impl Config {
    /// Load the configuration that applies to files in `dir`
    pub fn load(dir: &Path) -> Result<Self> {
        let mut config = match find_config(dir) {
            Some(path) => {
                debug!("Using configuration file {}", path.display());
                let content = std::fs::read_to_string(&path)?;
                Self::from_toml(&content, &path)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse configuration file content; relative paths resolve against the
    /// file's directory
    pub fn from_toml(content: &str, path: &Path) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content).map_err(|e| JudgeError::Config {
            path: path.to_path_buf(),
            reason: e.message().to_string(),
        })?;
        let base = path.parent().unwrap_or(Path::new("."));
        let defaults = Self::default();

        Ok(Self {
            color: raw.color.unwrap_or(defaults.color),
            diff: raw.diff.unwrap_or(defaults.diff),
            ignore_debug: raw.ignore_debug.unwrap_or(defaults.ignore_debug),
            verbose: raw.verbose.unwrap_or(defaults.verbose),
            force: raw.force.unwrap_or(defaults.force),
            jobs: raw.jobs.unwrap_or(defaults.jobs).max(1),
            cpp_libs_dir: raw.cpp_libs_dir.map(|dir| base.join(dir)),
            extra_flags: raw.extra_flags,
            cache_dir: raw.cache_dir.map(|dir| base.join(dir)).or(defaults.cache_dir),
            use_cache: true,
            judge: JudgeConfig {
                base_url: raw.judge.base_url.unwrap_or(defaults.judge.base_url),
                username: raw.judge.username,
                token: raw.judge.token,
                poll_interval: raw
                    .judge
                    .poll_interval_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.judge.poll_interval),
            },
        })
    }

    /// Apply `SOLCHECK_*` environment overrides
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(username) = lookup("SOLCHECK_USERNAME") {
            self.judge.username = Some(username);
        }
        if let Some(token) = lookup("SOLCHECK_TOKEN") {
            self.judge.token = Some(token);
        }
        if let Some(url) = lookup("SOLCHECK_JUDGE_URL") {
            self.judge.base_url = url;
        }
        if let Some(dir) = lookup("SOLCHECK_CACHE_DIR") {
            self.cache_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(diff) = overrides.diff {
            self.diff = diff;
        }
        if let Some(ignore_debug) = overrides.ignore_debug {
            self.ignore_debug = ignore_debug;
        }
        if let Some(verbose) = overrides.verbose {
            self.verbose = verbose;
        }
        if let Some(force) = overrides.force {
            self.force = force;
        }
        if let Some(jobs) = overrides.jobs {
            self.jobs = jobs.max(1);
        }
        if overrides.no_cache {
            self.use_cache = false;
        }
    }

    pub fn extra_flags_for(&self, key: &str) -> &[String] {
        self.extra_flags.get(key).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_full_config() {
        let content = r#"
diff = false
jobs = 4
cpp_libs_dir = "lib"

[extra_flags]
cpp = ["-O2", "-Wall"]

[judge]
base_url = "https://judge.example"
username = "alice"
token = "secret"
poll_interval_ms = 50
"#;
        let config = Config::from_toml(content, Path::new("/work/.solcheck.toml")).unwrap();

        assert!(!config.diff);
        assert!(config.ignore_debug);
        assert_eq!(config.jobs, 4);
        assert_eq!(config.cpp_libs_dir, Some(PathBuf::from("/work/lib")));
        assert_eq!(config.extra_flags_for("cpp"), ["-O2", "-Wall"]);
        assert!(config.extra_flags_for("rust").is_empty());
        assert_eq!(config.judge.base_url, "https://judge.example");
        assert_eq!(config.judge.username.as_deref(), Some("alice"));
        assert_eq!(config.judge.poll_interval, Duration::from_millis(50));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = Config::from_toml("colour = true", Path::new(".solcheck.toml")).unwrap_err();
        assert!(matches!(err, JudgeError::Config { .. }));
    }

    #[test]
    fn test_find_config_walks_up() {
        let root = tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(root.path().join(CONFIG_FILE_NAME), "jobs = 2").unwrap();

        assert_eq!(
            find_config(&nested),
            Some(root.path().join(CONFIG_FILE_NAME))
        );
    }

    #[test]
    fn test_env_and_cli_overrides() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            "SOLCHECK_TOKEN" => Some("from-env".to_string()),
            _ => None,
        });
        config.apply_overrides(&Overrides {
            diff: Some(false),
            jobs: Some(0),
            no_cache: true,
            ..Default::default()
        });

        assert_eq!(config.judge.token.as_deref(), Some("from-env"));
        assert!(!config.diff);
        assert_eq!(config.jobs, 1);
        assert!(!config.use_cache);
    }
}
