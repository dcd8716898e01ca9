//! Samples stored next to the solution

use async_trait::async_trait;
use std::path::Path;

use super::{scan_dir, Origin, Sample, SampleSource, StemFilter};
use crate::error::{JudgeError, Result};

/// Finds `<stem>.in` / `<stem>.<N>.in` files with optional `.ans` siblings
#[derive(Debug, Default, Clone)]
pub struct LocalSource {
    /// Stems accepted in addition to the problem id (usually the file stem)
    aliases: Vec<String>,
}

impl LocalSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }
}

#[async_trait]
impl SampleSource for LocalSource {
    fn name(&self) -> &str {
        "local"
    }

    async fn find(&self, problem: &str, dir: &Path) -> Result<Vec<Sample>> {
        let mut stems = vec![problem.to_string()];
        stems.extend(self.aliases.iter().filter(|a| *a != problem).cloned());

        let dir = dir.to_path_buf();
        tokio::task::spawn_blocking(move || scan_dir(&dir, &StemFilter::Stems(stems), Origin::Local))
            .await
            .map_err(|e| JudgeError::SampleFetchFailed {
                source_name: "local".to_string(),
                reason: e.to_string(),
            })?
    }
}
