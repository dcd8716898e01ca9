//! Runner module - Execution abstraction layer
//!
//! This module provides a unified interface for running programs:
//! - `Launcher`: spawns one process, feeds it stdin and captures its output
//! - `Session`: turns a source file into a `Runnable`, compiling first when the
//!   language needs it, and owns any temporary build artifacts
//!
//! The runner module does NOT:
//! - Compare outputs or decide whether a sample passed
//! - Limit resources of the spawned programs

pub mod session;
pub mod system;
pub mod toolchain;

use async_trait::async_trait;

use crate::error::Result;

/// Command specification for execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program path or name
    pub program: String,
    /// Arguments to the program
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Create from a command vector (first element is program, rest are args)
    pub fn from_vec(cmd: &[String]) -> Self {
        let mut iter = cmd.iter();
        let program = iter.next().cloned().unwrap_or_default();
        Self {
            program,
            args: iter.cloned().collect(),
        }
    }
}

/// Outcome of running a program once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Exit code (-1 when killed by a signal)
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Process invocation primitive
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Spawn `cmd`, write `stdin` (if any) to it and wait for it to finish,
    /// capturing stdout and stderr in full
    async fn launch(&self, cmd: &CommandSpec, stdin: Option<&str>) -> Result<ExecutionResult>;
}

pub use session::{Runnable, RuntimeContext, Session};
pub use system::SystemLauncher;
pub use toolchain::Toolchains;
