//! Sample sources
//!
//! A sample is an input with an optional expected output. Samples come from
//! several sources (files next to the solution, the judge's published
//! archive); each source returns its samples in natural order of their names.

pub mod cache;
pub mod local;
pub mod remote;

use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use async_trait::async_trait;
use futures_util::future::join_all;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::utils::natural_cmp;
use crate::error::{JudgeError, Result};

pub use cache::{CachedSource, DirCache, MemoryCache};
pub use local::LocalSource;
pub use remote::RemoteSource;

/// Where a sample came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Local,
    Remote,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Origin::Local => "local",
            Origin::Remote => "remote",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// File name of the input, e.g. `hello.1.in`
    pub name: String,
    pub origin: Origin,
    pub input: String,
    /// Expected output, when an answer file exists
    pub output: Option<String>,
}

#[async_trait]
pub trait SampleSource: Send + Sync {
    /// Short identifier, also used as the cache namespace
    fn name(&self) -> &str;

    /// Samples for `problem`, searching `dir` where the source is file based
    async fn find(&self, problem: &str, dir: &Path) -> Result<Vec<Sample>>;
}

pub fn sort_samples(samples: &mut [Sample]) {
    samples.sort_by(|a, b| natural_cmp(&a.name, &b.name));
}

/// Query every source concurrently and concatenate the results in source
/// order. A failing source is logged and contributes nothing.
pub async fn collect_samples(
    sources: &[Box<dyn SampleSource>],
    problem: &str,
    dir: &Path,
) -> Vec<Sample> {
    let results = join_all(sources.iter().map(|source| source.find(problem, dir))).await;

    let mut samples = Vec::new();
    for (source, result) in sources.iter().zip(results) {
        match result {
            Ok(mut found) => {
                debug!("{}: {} sample(s)", source.name(), found.len());
                sort_samples(&mut found);
                samples.extend(found);
            }
            Err(e) => warn!("{}", e),
        }
    }
    samples
}

/// Problem ids end up in URLs and cache file names
pub fn validate_problem_id(problem: &str) -> Result<()> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern =
        PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.-]*$").expect("valid regex"));

    if pattern.is_match(problem) {
        Ok(())
    } else {
        Err(JudgeError::InvalidProblemId(problem.to_string()))
    }
}

/// Which `.in` files in a directory are samples
#[derive(Debug, Clone)]
pub enum StemFilter {
    /// Every `*.in` file
    Any,
    /// `<stem>.in` or `<stem>.<N>.in` for any of the stems
    Stems(Vec<String>),
}

impl StemFilter {
    /// Returns the answer file name for a matching input file name
    fn answer_name(&self, file_name: &str) -> Option<String> {
        let base = file_name.strip_suffix(".in")?;
        let matches = match self {
            StemFilter::Any => !base.is_empty(),
            StemFilter::Stems(stems) => stems.iter().any(|stem| matches_stem(base, stem)),
        };
        matches.then(|| format!("{}.ans", base))
    }
}

/// `base` is `stem` or `stem.<digits>`
fn matches_stem(base: &str, stem: &str) -> bool {
    match base.strip_prefix(stem) {
        Some("") => true,
        Some(rest) => rest
            .strip_prefix('.')
            .map(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
            .unwrap_or(false),
        None => false,
    }
}

/// Read every matching sample in `dir` (not recursive), naturally ordered
pub fn scan_dir(dir: &Path, filter: &StemFilter, origin: Origin) -> Result<Vec<Sample>> {
    let mut samples = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        let Some(answer_name) = filter.answer_name(file_name) else {
            continue;
        };

        let input = match read_lossy(&entry.path()) {
            Ok(input) => input,
            Err(e) => {
                warn!("Skipping {}: {}", entry.path().display(), e);
                continue;
            }
        };
        let answer_path = dir.join(&answer_name);
        let output = if answer_path.is_file() {
            match read_lossy(&answer_path) {
                Ok(output) => Some(output),
                Err(e) => {
                    warn!("Skipping {}: {}", entry.path().display(), e);
                    continue;
                }
            }
        } else {
            None
        };

        samples.push(Sample {
            name: file_name.to_string(),
            origin,
            input,
            output,
        });
    }

    sort_samples(&mut samples);
    Ok(samples)
}

/// Sample files are text; invalid UTF-8 is replaced rather than rejected
fn read_lossy(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
