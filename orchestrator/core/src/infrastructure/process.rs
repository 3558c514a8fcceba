// Copyright (c) 2026 Nubo Software
// SPDX-License-Identifier: AGPL-3.0

//! Child process execution backed by `tokio::process`.
//!
//! Output is captured up to a fixed cap per stream. Anything beyond the cap
//! is drained and discarded so the child can finish, and the invocation is
//! then reported as [`ExecutionError::OutputLimitExceeded`]. No timeout is
//! applied; a hung command blocks the caller.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use crate::domain::pipeline::ProvisionError;
use crate::domain::process::{CommandOutput, CommandSpec, ExecutionError, ProcessRunner};

pub const DEFAULT_OUTPUT_LIMIT: usize = 10 * 1024 * 1024;

pub struct SystemProcessRunner {
    output_limit: usize,
}

impl SystemProcessRunner {
    pub fn new(output_limit: usize) -> Self {
        Self { output_limit }
    }

    /// Resolve each binary on `PATH` (or as given when it contains a path
    /// separator). Fails on the first one that cannot be found.
    pub fn verify_binaries<'a>(
        binaries: impl IntoIterator<Item = &'a str>,
    ) -> Result<Vec<PathBuf>, ProvisionError> {
        binaries
            .into_iter()
            .map(|binary| {
                which::which(binary).map_err(|source| ProvisionError::MissingBinary {
                    binary: binary.to_string(),
                    source,
                })
            })
            .collect()
    }
}

impl Default for SystemProcessRunner {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_LIMIT)
    }
}

#[async_trait]
impl ProcessRunner for SystemProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecutionError> {
        let mut cmd = tokio::process::Command::new(&spec.program);
        cmd.args(&spec.args)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }

        debug!(command = %spec.summary(), args = spec.args.len(), "Running external command");

        let spawn_error = |source| ExecutionError::Spawn {
            program: spec.program.clone(),
            source,
        };

        let mut child = cmd.spawn().map_err(spawn_error)?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (stdout, stderr) = tokio::join!(
            read_capped(stdout, self.output_limit),
            read_capped(stderr, self.output_limit)
        );
        let (stdout, stdout_overflow) = stdout.map_err(spawn_error)?;
        let (stderr, stderr_overflow) = stderr.map_err(spawn_error)?;

        let status = child.wait().await.map_err(spawn_error)?;

        if stdout_overflow || stderr_overflow {
            return Err(ExecutionError::OutputLimitExceeded {
                command: spec.summary(),
                limit: self.output_limit,
            });
        }

        let stdout = String::from_utf8_lossy(&stdout).into_owned();
        let stderr = String::from_utf8_lossy(&stderr).into_owned();

        if !status.success() {
            debug!(command = %spec.summary(), status = ?status.code(), "External command failed");
            return Err(ExecutionError::NonZeroExit {
                command: spec.summary(),
                status: status.code(),
                stderr,
            });
        }

        Ok(CommandOutput { stdout, stderr })
    }
}

/// Read at most `limit` bytes, then drain the rest. The flag reports whether
/// anything was dropped.
async fn read_capped<R>(reader: Option<R>, limit: usize) -> std::io::Result<(Vec<u8>, bool)>
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return Ok((Vec::new(), false));
    };

    let mut buf = Vec::new();
    (&mut reader).take(limit as u64).read_to_end(&mut buf).await?;

    let drained = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await?;
    Ok((buf, drained > 0))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_stdout() {
        let runner = SystemProcessRunner::default();
        let spec = CommandSpec::new("sh").args(["-c", "printf hello"]);
        let output = runner.run(&spec).await.unwrap();
        assert_eq!(output.stdout, "hello");
        assert!(output.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_passes_env_and_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let runner = SystemProcessRunner::default();
        let spec = CommandSpec::new("sh")
            .args(["-c", "printf \"$ROOT_DIR:$(pwd -P)\""])
            .current_dir(dir.path())
            .env("ROOT_DIR", "/srv/stack");
        let output = runner.run(&spec).await.unwrap();

        let cwd = dir.path().canonicalize().unwrap();
        assert_eq!(output.stdout, format!("/srv/stack:{}", cwd.display()));
    }

    #[tokio::test]
    async fn test_non_zero_exit_carries_stderr() {
        let runner = SystemProcessRunner::default();
        let spec = CommandSpec::new("sh").args(["-c", "echo boom >&2; exit 3"]);
        match runner.run(&spec).await {
            Err(ExecutionError::NonZeroExit { status, stderr, .. }) => {
                assert_eq!(status, Some(3));
                assert_eq!(stderr.trim(), "boom");
            }
            other => panic!("Expected non-zero exit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let runner = SystemProcessRunner::default();
        let spec = CommandSpec::new("/nonexistent/definitely-not-here");
        assert!(matches!(
            runner.run(&spec).await,
            Err(ExecutionError::Spawn { .. })
        ));
    }

    #[tokio::test]
    async fn test_output_over_limit_fails() {
        let runner = SystemProcessRunner::new(16);
        let spec = CommandSpec::new("sh").args(["-c", "head -c 4096 /dev/zero"]);
        assert!(matches!(
            runner.run(&spec).await,
            Err(ExecutionError::OutputLimitExceeded { limit: 16, .. })
        ));
    }

    #[test]
    fn test_verify_binaries_reports_missing() {
        let err = SystemProcessRunner::verify_binaries(["sh", "no-such-binary-nubo"]).unwrap_err();
        assert!(matches!(err, ProvisionError::MissingBinary { ref binary, .. } if binary == "no-such-binary-nubo"));
    }
}
