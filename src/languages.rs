//! Language table: extension mapping, judge names and command line builders

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{JudgeError, Result};

/// A supported solution language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Cpp,
    Python,
    Rust,
    Haskell,
    Lua,
    JavaScript,
}

/// How a language gets from source file to running program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toolchain {
    /// Run the source with the first interpreter found
    Interpreted { interpreters: &'static [&'static str] },
    /// Compile with the first compiler found, then run the artifact
    Compiled { compilers: &'static [&'static str] },
}

/// Paths a compile command is built from
#[derive(Debug, Clone)]
pub struct CompilePaths<'a> {
    pub source: &'a Path,
    pub output: &'a Path,
    /// Scratch directory for intermediate build files
    pub build_dir: &'a Path,
}

impl Language {
    /// Detect the language from a source file's extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();

        match extension {
            "cc" | "cpp" | "cxx" | "c++" => Ok(Language::Cpp),
            "py" => Ok(Language::Python),
            "rs" => Ok(Language::Rust),
            "hs" => Ok(Language::Haskell),
            "lua" => Ok(Language::Lua),
            "js" => Ok(Language::JavaScript),
            _ => Err(JudgeError::UnsupportedLanguage {
                extension: format!(".{}", extension),
            }),
        }
    }

    /// Key used for per-language configuration tables
    pub fn key(&self) -> &'static str {
        match self {
            Language::Cpp => "cpp",
            Language::Python => "python",
            Language::Rust => "rust",
            Language::Haskell => "haskell",
            Language::Lua => "lua",
            Language::JavaScript => "javascript",
        }
    }

    /// Language identifier understood by the judge
    pub fn judge_name(&self) -> &'static str {
        match self {
            Language::Cpp => "C++",
            Language::Python => "Python 3",
            Language::Rust => "Rust",
            Language::Haskell => "Haskell",
            Language::Lua => "Lua",
            Language::JavaScript => "Node",
        }
    }

    pub fn toolchain(&self) -> Toolchain {
        match self {
            Language::Cpp => Toolchain::Compiled {
                compilers: &["c++", "g++", "clang++"],
            },
            Language::Rust => Toolchain::Compiled {
                compilers: &["rustc"],
            },
            Language::Haskell => Toolchain::Compiled {
                compilers: &["ghc"],
            },
            // Prefer pypy over CPython
            Language::Python => Toolchain::Interpreted {
                interpreters: &[
                    "pypy311",
                    "pypy3.11",
                    "pypy3",
                    "python311",
                    "python3.11",
                    "python3",
                    "python",
                ],
            },
            Language::Lua => Toolchain::Interpreted {
                interpreters: &["lua", "luajit"],
            },
            Language::JavaScript => Toolchain::Interpreted {
                interpreters: &["node"],
            },
        }
    }

    /// Build the compile command line. `compiler` is the resolved binary.
    pub fn compile_command(
        &self,
        compiler: &Path,
        paths: &CompilePaths<'_>,
        config: &Config,
    ) -> Vec<String> {
        let color = if config.color { "always" } else { "never" };
        let mut command = vec![display(compiler)];

        match self {
            Language::Cpp => {
                command.extend([
                    "--std=c++17".to_string(),
                    display(paths.source),
                    "-o".to_string(),
                    display(paths.output),
                    format!("-fdiagnostics-color={}", color),
                ]);
                if let Some(libs_dir) = &config.cpp_libs_dir {
                    command.push(format!("-I{}", libs_dir.display()));
                    command.extend(cpp_library_sources(libs_dir).iter().map(|p| display(p)));
                }
            }
            Language::Rust => {
                command.extend([
                    "-O".to_string(),
                    "--crate-type".to_string(),
                    "bin".to_string(),
                    "--edition=2021".to_string(),
                    display(paths.source),
                    "--color".to_string(),
                    color.to_string(),
                    "-o".to_string(),
                    display(paths.output),
                ]);
            }
            Language::Haskell => {
                command.extend([
                    "-outputdir".to_string(),
                    display(paths.build_dir),
                    display(paths.source),
                    "-o".to_string(),
                    display(paths.output),
                ]);
                // GHC on Arch only ships dynamic libraries
                if is_arch_linux() {
                    command.push("-dynamic".to_string());
                }
            }
            Language::Python | Language::Lua | Language::JavaScript => {}
        }

        command.extend(config.extra_flags_for(self.key()).iter().cloned());
        command
    }

    /// Build the run command line for an interpreted language
    pub fn interpret_command(&self, interpreter: &Path, source: &Path, config: &Config) -> Vec<String> {
        let mut command = vec![display(interpreter)];
        command.extend(config.extra_flags_for(self.key()).iter().cloned());
        command.push(display(source));
        command
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Language::Cpp => "C++",
            Language::Python => "Python",
            Language::Rust => "Rust",
            Language::Haskell => "Haskell",
            Language::Lua => "Lua",
            Language::JavaScript => "JavaScript",
        };
        write!(f, "{}", s)
    }
}

fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Every C++ translation unit below `dir`, sorted for stable command lines
fn cpp_library_sources(dir: &Path) -> Vec<PathBuf> {
    let mut sources = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&current) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if matches!(
                path.extension().and_then(|ext| ext.to_str()),
                Some("cc" | "cpp" | "cxx")
            ) {
                sources.push(path);
            }
        }
    }

    sources.sort();
    sources
}

fn is_arch_linux() -> bool {
    cfg!(target_os = "linux")
        && std::fs::read_to_string("/etc/os-release")
            .map(|content| os_release_id(&content) == Some("arch"))
            .unwrap_or(false)
}

fn os_release_id(content: &str) -> Option<&str> {
    content
        .lines()
        .find_map(|line| line.strip_prefix("ID="))
        .map(|id| id.trim_matches('"'))
}
