//! Compiler module - Source code compilation
//!
//! Runs a compiler command line once and reports whether it produced an
//! artifact. A failed compilation is an outcome, not an error: the caller
//! decides what to do with it. It is never retried.

use tracing::{debug, info};

use crate::error::Result;
use crate::runner::{CommandSpec, Launcher};

/// Result of a compilation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    Ok,
    Failed { exit_code: i32, stderr: String },
}

/// Compile with the given command line. Compiler stdout is discarded, stderr
/// is kept verbatim for the failure report.
pub async fn compile(launcher: &dyn Launcher, command: &[String]) -> Result<CompileOutcome> {
    if command.is_empty() {
        return Ok(CompileOutcome::Ok);
    }

    let spec = CommandSpec::from_vec(command);
    info!("Compiling with {}", spec.program);
    debug!("Compile command: {:?}", command);

    let result = launcher.launch(&spec, None).await?;

    if result.is_success() {
        Ok(CompileOutcome::Ok)
    } else {
        debug!("Compilation failed with exit code {}", result.exit_code);
        Ok(CompileOutcome::Failed {
            exit_code: result.exit_code,
            stderr: result.stderr,
        })
    }
}
