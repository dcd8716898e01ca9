//! Toolchain discovery on the search path

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{JudgeError, Result};
use crate::languages::Language;

/// Resolves binary names against a search path, memoising hits
#[derive(Debug)]
pub struct Toolchains {
    search_path: Vec<PathBuf>,
    cwd: PathBuf,
    resolved: Mutex<HashMap<String, PathBuf>>,
}

impl Toolchains {
    /// Search the directories listed in `PATH`
    pub fn from_env() -> Self {
        let search_path = std::env::var_os("PATH")
            .map(|paths| std::env::split_paths(&paths).collect())
            .unwrap_or_default();
        Self::with_search_path(search_path)
    }

    pub fn with_search_path(search_path: Vec<PathBuf>) -> Self {
        Self {
            search_path,
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            resolved: Mutex::new(HashMap::new()),
        }
    }

    /// Locate a single binary
    pub fn which(&self, name: &str) -> Option<PathBuf> {
        if let Some(path) = self.cached(name) {
            return Some(path);
        }
        if self.search_path.is_empty() {
            return None;
        }

        let paths = match std::env::join_paths(&self.search_path) {
            Ok(paths) => paths,
            Err(e) => {
                warn!("Unusable search path: {}", e);
                return None;
            }
        };
        let found = which::which_in(name, Some(paths), &self.cwd).ok()?;

        debug!("Resolved {} to {}", name, found.display());
        if let Ok(mut resolved) = self.resolved.lock() {
            resolved.insert(name.to_string(), found.clone());
        }
        Some(found)
    }

    /// First binary from an ordered preference list; reports every name
    /// searched when none is available
    pub fn find_first(&self, language: Language, candidates: &[&str]) -> Result<PathBuf> {
        candidates
            .iter()
            .find_map(|name| self.which(name))
            .ok_or_else(|| JudgeError::ToolchainMissing {
                language: language.to_string(),
                searched: candidates.iter().map(|name| name.to_string()).collect(),
            })
    }

    fn cached(&self, name: &str) -> Option<PathBuf> {
        self.resolved.lock().ok()?.get(name).cloned()
    }
}
