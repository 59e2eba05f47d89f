//! Bounded external-tool invocation.
//!
//! Every subprocess (`gh`, `yt-dlp`) goes through [`run_tool`]: arguments
//! are passed as a vector, never through a shell, and each call has a
//! timeout after which the child is killed.

use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to execute '{program}'. Is it installed and on PATH? ({source})")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{program}' timed out after {secs}s")]
    Timeout { program: String, secs: u64 },
    #[error("'{program}' exited with {code}: {stderr}")]
    Status {
        program: String,
        code: String,
        stderr: String,
    },
    #[error("unexpected output from '{program}': {detail}")]
    Parse { program: String, detail: String },
}

/// Run `program args...`, returning trimmed stdout on success.
pub async fn run_tool(
    program: &str,
    args: &[String],
    timeout: Duration,
) -> Result<String, ToolError> {
    tracing::debug!(program, ?args, "running external tool");

    let child = Command::new(program)
        .args(args)
        .stdin(std::process::Stdio::null())
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(timeout, child).await {
        Ok(result) => result.map_err(|source| ToolError::Spawn {
            program: program.to_string(),
            source,
        })?,
        Err(_) => {
            return Err(ToolError::Timeout {
                program: program.to_string(),
                secs: timeout.as_secs(),
            })
        }
    };

    if !output.status.success() {
        let code = output
            .status
            .code()
            .map(|c| format!("status {}", c))
            .unwrap_or_else(|| "a signal".to_string());
        return Err(ToolError::Status {
            program: program.to_string(),
            code,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
