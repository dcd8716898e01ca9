//! Launcher that spawns real child processes

use async_trait::async_trait;
use std::io::ErrorKind;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::{CommandSpec, ExecutionResult, Launcher};
use crate::error::{JudgeError, Result};

/// Runs programs directly on the host, without any sandbox or limits
#[derive(Debug, Default, Clone)]
pub struct SystemLauncher;

impl SystemLauncher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Launcher for SystemLauncher {
    async fn launch(&self, spec: &CommandSpec, stdin: Option<&str>) -> Result<ExecutionResult> {
        debug!("Running program: {:?} with args: {:?}", spec.program, spec.args);

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| JudgeError::ProcessSpawnFailed {
            program: spec.program.clone(),
            source,
        })?;

        // Feed stdin while output is being drained so neither side can block
        // on a full pipe buffer.
        let writer = child.stdin.take();
        let input = stdin.unwrap_or_default().as_bytes();
        let feed = async move {
            if let Some(mut pipe) = writer {
                pipe.write_all(input).await?;
                pipe.shutdown().await?;
            }
            Ok::<_, std::io::Error>(())
        };

        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;

        if let Err(e) = fed {
            // The program may legitimately exit without reading all input.
            if e.kind() != ErrorKind::BrokenPipe {
                return Err(e.into());
            }
            debug!("Program closed stdin early: {}", e);
        }

        Ok(ExecutionResult {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
