//! Language sessions
//!
//! A `Session` maps a source file to a `Runnable`. Compiled languages build
//! into a private temporary directory owned by the session; the directory is
//! removed by `close()` or, on any other exit path, when the session is
//! dropped. A `Runnable` borrows its session and cannot outlive it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tracing::debug;

use super::{CommandSpec, ExecutionResult, Launcher, Toolchains};
use crate::compiler::{compile, CompileOutcome};
use crate::config::Config;
use crate::error::{JudgeError, Result};
use crate::languages::{CompilePaths, Language, Toolchain};

/// Process-wide state the runtime needs, passed explicitly
pub struct RuntimeContext {
    pub config: Config,
    pub launcher: Arc<dyn Launcher>,
    pub toolchains: Toolchains,
}

impl RuntimeContext {
    pub fn new(config: Config, launcher: Arc<dyn Launcher>, toolchains: Toolchains) -> Self {
        Self {
            config,
            launcher,
            toolchains,
        }
    }
}

/// A prepared program: given input text, produces an `ExecutionResult`
#[derive(Clone)]
pub struct Runnable<'s> {
    launcher: &'s dyn Launcher,
    command: CommandSpec,
}

impl<'s> Runnable<'s> {
    /// Run once, spawning exactly one child process
    pub async fn run(&self, input: &str) -> Result<ExecutionResult> {
        self.launcher.launch(&self.command, Some(input)).await
    }

    pub fn command(&self) -> &CommandSpec {
        &self.command
    }
}

pub struct Session<'c> {
    ctx: &'c RuntimeContext,
    language: Language,
    source: PathBuf,
    /// Temporary build directory of a compiled language
    workspace: Option<TempDir>,
}

impl<'c> Session<'c> {
    /// Open a session for `source`; fails fast on unknown extensions
    pub fn open(ctx: &'c RuntimeContext, source: impl AsRef<Path>) -> Result<Self> {
        let source = source.as_ref();
        let language = Language::from_path(source)?;
        debug!("Opened {} session for {}", language, source.display());

        Ok(Self {
            ctx,
            language,
            source: source.to_path_buf(),
            workspace: None,
        })
    }

    /// Produce a runnable program, compiling first if the language needs it
    pub async fn prepare(&mut self) -> Result<Runnable<'_>> {
        let ctx = self.ctx;

        let command = match self.language.toolchain() {
            Toolchain::Interpreted { interpreters } => {
                let interpreter = ctx.toolchains.find_first(self.language, interpreters)?;
                self.language
                    .interpret_command(&interpreter, &self.source, &ctx.config)
            }
            Toolchain::Compiled { compilers } => {
                let compiler = ctx.toolchains.find_first(self.language, compilers)?;
                let workspace = tempfile::Builder::new().prefix("solcheck-").tempdir()?;
                let output = workspace
                    .path()
                    .join(format!("solution{}", std::env::consts::EXE_SUFFIX));
                let build_dir = workspace.path().join("build");
                tokio::fs::create_dir(&build_dir).await?;

                let compile_command = self.language.compile_command(
                    &compiler,
                    &CompilePaths {
                        source: &self.source,
                        output: &output,
                        build_dir: &build_dir,
                    },
                    &ctx.config,
                );
                // Owned by the session from here on, whatever compile returns
                self.workspace = Some(workspace);

                match compile(ctx.launcher.as_ref(), &compile_command).await? {
                    CompileOutcome::Ok => vec![output.to_string_lossy().into_owned()],
                    CompileOutcome::Failed { exit_code, stderr } => {
                        return Err(JudgeError::CompileFailed { exit_code, stderr });
                    }
                }
            }
        };

        Ok(Runnable {
            launcher: ctx.launcher.as_ref(),
            command: CommandSpec::from_vec(&command),
        })
    }

    /// Release the session, deleting temporary build artifacts
    pub fn close(mut self) -> Result<()> {
        if let Some(workspace) = self.workspace.take() {
            debug!("Removing build directory {}", workspace.path().display());
            workspace.close()?;
        }
        Ok(())
    }
}
