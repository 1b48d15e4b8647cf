//! Subprocess execution for external tools.

use crate::error::{LxdError, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::{ChildStdin, Command};
use tracing::{debug, trace};

/// Runs one external command to completion.
///
/// `args[0]` is the program. Implementations return stdout on success and
/// [`LxdError::CommandFailed`] on a non-zero exit.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `args`, feeding `stdin` to the process when given.
    async fn run(&self, args: &[String], stdin: Option<&str>) -> Result<String>;
}

async fn feed_stdin(mut pipe: ChildStdin, data: &str) -> std::io::Result<()> {
    pipe.write_all(data.as_bytes()).await?;
    pipe.shutdown().await
}

/// Runs commands as local subprocesses.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, args: &[String], stdin: Option<&str>) -> Result<String> {
        let (program, rest) = args
            .split_first()
            .ok_or_else(|| LxdError::Config("cannot run an empty command".into()))?;

        let command_line = args.join(" ");
        debug!(command = %command_line, "running command");

        let mut child = Command::new(program)
            .args(rest)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| LxdError::Spawn {
                program: program.clone(),
                source,
            })?;

        // A child that exits without reading its input still reports its own
        // exit status below.
        if let (Some(data), Some(pipe)) = (stdin, child.stdin.take()) {
            match feed_stdin(pipe, data).await {
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    debug!(command = %command_line, "stdin closed early by command");
                }
                other => other?,
            }
        }

        let output = child.wait_with_output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let status = output.status.code().unwrap_or(-1);

        debug!(
            exit_code = status,
            stdout_len = stdout.len(),
            stderr_len = stderr.len(),
            "command completed"
        );
        trace!(stdout = %stdout, stderr = %stderr, "command output");

        if !output.status.success() {
            return Err(LxdError::CommandFailed {
                command: command_line,
                status,
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(stdout)
    }
}
