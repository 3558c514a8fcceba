// Copyright (c) 2026 Nubo Software
// SPDX-License-Identifier: AGPL-3.0

//! External process contract
//!
//! Every infrastructure mutation goes through a [`ProcessRunner`]. Commands
//! are described as a program plus an argument vector; nothing is ever
//! handed to a shell, so secrets and operator input cannot be reinterpreted.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Added on top of the inherited environment
    pub env: BTreeMap<String, String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Program and first argument, safe to log.
    pub fn summary(&self) -> String {
        match self.args.first() {
            Some(sub) => format!("{} {}", self.program, sub),
            None => self.program.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{command} exited with status {}: {}", display_status(.status), .stderr.trim())]
    NonZeroExit {
        command: String,
        status: Option<i32>,
        stderr: String,
    },
    #[error("{command} produced more than {limit} bytes of output")]
    OutputLimitExceeded { command: String, limit: usize },
}

fn display_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}

#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run to completion; a non-zero exit is an error.
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecutionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_args_and_env() {
        let spec = CommandSpec::new("docker-compose")
            .args(["up", "-d"])
            .arg("nubo-mysql")
            .current_dir("/srv/stack")
            .env("ROOT_DIR", "/srv/stack");

        assert_eq!(spec.args, vec!["up", "-d", "nubo-mysql"]);
        assert_eq!(spec.cwd, Some(PathBuf::from("/srv/stack")));
        assert_eq!(spec.env.get("ROOT_DIR").map(String::as_str), Some("/srv/stack"));
        assert_eq!(spec.summary(), "docker-compose up");
    }

    #[test]
    fn test_non_zero_exit_message() {
        let err = ExecutionError::NonZeroExit {
            command: "docker push".to_string(),
            status: Some(1),
            stderr: "denied\n".to_string(),
        };
        assert_eq!(err.to_string(), "docker push exited with status 1: denied");

        let err = ExecutionError::NonZeroExit {
            command: "docker exec".to_string(),
            status: None,
            stderr: String::new(),
        };
        assert!(err.to_string().contains("signal"));
    }
}
