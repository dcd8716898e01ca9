//! Sample caching
//!
//! Remote samples are fetched once per problem and kept on disk. An entry is
//! written once through a temporary file and a rename, so concurrent readers
//! only ever see complete entries.

use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

use super::{validate_problem_id, Sample, SampleSource};
use crate::error::{JudgeError, Result};

#[async_trait]
pub trait SampleCache: Send + Sync {
    async fn load(&self, source: &str, problem: &str) -> Result<Option<Vec<Sample>>>;

    async fn store(&self, source: &str, problem: &str, samples: &[Sample]) -> Result<()>;
}

/// Cache stored as `<root>/samples/<source>/<problem>.json`
#[derive(Debug, Clone)]
pub struct DirCache {
    root: PathBuf,
}

impl DirCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn source_dir(&self, source: &str) -> PathBuf {
        self.root.join("samples").join(source)
    }

    pub fn entry_path(&self, source: &str, problem: &str) -> Result<PathBuf> {
        validate_problem_id(problem)?;
        Ok(self.source_dir(source).join(format!("{}.json", problem)))
    }

    /// Remove cached entries for one problem (or every problem) across all
    /// sources. Returns the number of entries removed.
    pub async fn clear(&self, problem: Option<&str>) -> Result<usize> {
        let samples_dir = self.root.join("samples");
        if !samples_dir.exists() {
            return Ok(0);
        }

        let mut removed = 0;
        let mut sources = tokio::fs::read_dir(&samples_dir).await?;
        while let Some(source) = sources.next_entry().await? {
            if !source.file_type().await?.is_dir() {
                continue;
            }
            match problem {
                Some(problem) => {
                    validate_problem_id(problem)?;
                    let path = source.path().join(format!("{}.json", problem));
                    if path.exists() {
                        tokio::fs::remove_file(&path).await?;
                        removed += 1;
                    }
                }
                None => {
                    let mut entries = tokio::fs::read_dir(source.path()).await?;
                    while let Some(entry) = entries.next_entry().await? {
                        if entry.path().extension().and_then(|e| e.to_str()) == Some("json") {
                            tokio::fs::remove_file(entry.path()).await?;
                            removed += 1;
                        }
                    }
                }
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl SampleCache for DirCache {
    async fn load(&self, source: &str, problem: &str) -> Result<Option<Vec<Sample>>> {
        let path = self.entry_path(source, problem)?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| JudgeError::CacheCorrupt {
                path,
                reason: e.to_string(),
            })
    }

    async fn store(&self, source: &str, problem: &str, samples: &[Sample]) -> Result<()> {
        let path = self.entry_path(source, problem)?;
        let dir = self.source_dir(source);
        let data = serde_json::to_vec_pretty(samples).map_err(std::io::Error::from)?;

        tokio::task::spawn_blocking(move || write_atomic(&dir, &path, &data))
            .await
            .map_err(std::io::Error::other)??;
        Ok(())
    }
}

fn write_atomic(dir: &Path, path: &Path, data: &[u8]) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(data)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    debug!("Cached samples at {}", path.display());
    Ok(())
}

/// In-memory cache, shared across sources
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<(String, String), Vec<Sample>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SampleCache for MemoryCache {
    async fn load(&self, source: &str, problem: &str) -> Result<Option<Vec<Sample>>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| std::io::Error::other("cache lock poisoned"))?;
        Ok(entries.get(&(source.to_string(), problem.to_string())).cloned())
    }

    async fn store(&self, source: &str, problem: &str, samples: &[Sample]) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| std::io::Error::other("cache lock poisoned"))?;
        entries
            .entry((source.to_string(), problem.to_string()))
            .or_insert_with(|| samples.to_vec());
        Ok(())
    }
}

/// Puts a cache in front of another source
pub struct CachedSource<S> {
    inner: S,
    cache: Box<dyn SampleCache>,
}

impl<S: SampleSource> CachedSource<S> {
    pub fn new(inner: S, cache: Box<dyn SampleCache>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl<S: SampleSource> SampleSource for CachedSource<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn find(&self, problem: &str, dir: &Path) -> Result<Vec<Sample>> {
        let source = self.inner.name();

        match self.cache.load(source, problem).await {
            Ok(Some(samples)) => {
                debug!("{}: using cached samples for {}", source, problem);
                return Ok(samples);
            }
            Ok(None) => debug!("{}: no cached samples for {}", source, problem),
            Err(e @ JudgeError::CacheCorrupt { .. }) => warn!("{}, fetching again", e),
            Err(e) => return Err(e),
        }

        let samples = self.inner.find(problem, dir).await?;
        // Nothing published yet is not worth remembering
        if !samples.is_empty() {
            if let Err(e) = self.cache.store(source, problem, &samples).await {
                warn!("{}: failed to cache samples for {}: {}", source, problem, e);
            } else {
                info!("{}: cached {} sample(s) for {}", source, samples.len(), problem);
            }
        }
        Ok(samples)
    }
}
