// Copyright (c) 2026 Nubo Software
// SPDX-License-Identifier: AGPL-3.0

//! Container runtime CLI invocations (image pull/tag/push, cp, exec).

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::process::{CommandOutput, CommandSpec, ExecutionError, ProcessRunner};
use crate::domain::root_path::RootPath;

/// Options for `exec` into a running container.
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    pub workdir: Option<String>,
    /// Variables forwarded into the container by name only (`-e NAME`); the
    /// value travels through the runtime CLI's own environment and never
    /// appears in its argument vector.
    pub forwarded_env: BTreeMap<String, String>,
}

impl ExecOptions {
    pub fn workdir(mut self, dir: impl Into<String>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    pub fn forward_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.forwarded_env.insert(key.into(), value.into());
        self
    }
}

#[derive(Clone)]
pub struct ContainerRuntime {
    runner: Arc<dyn ProcessRunner>,
    binary: String,
    root: RootPath,
}

impl ContainerRuntime {
    pub fn new(runner: Arc<dyn ProcessRunner>, binary: impl Into<String>, root: RootPath) -> Self {
        Self {
            runner,
            binary: binary.into(),
            root,
        }
    }

    fn command(&self) -> CommandSpec {
        CommandSpec::new(&self.binary).current_dir(self.root.as_path())
    }

    pub async fn pull(&self, image: &str) -> Result<CommandOutput, ExecutionError> {
        info!(image = %image, "Pulling image");
        self.runner.run(&self.command().args(["pull", image])).await
    }

    pub async fn tag(&self, source: &str, target: &str) -> Result<CommandOutput, ExecutionError> {
        debug!(source = %source, target = %target, "Tagging image");
        self.runner.run(&self.command().args(["tag", source, target])).await
    }

    pub async fn push(&self, image: &str) -> Result<CommandOutput, ExecutionError> {
        info!(image = %image, "Pushing image");
        self.runner.run(&self.command().args(["push", image])).await
    }

    /// Copy a host path (relative to the root) into a container directory.
    pub async fn copy_into(
        &self,
        source: &Path,
        container: &str,
        destination: &str,
    ) -> Result<CommandOutput, ExecutionError> {
        debug!(source = %source.display(), container = %container, "Copying into container");
        let spec = self.command().args([
            "cp".to_string(),
            source.display().to_string(),
            format!("{}:{}", container, destination),
        ]);
        self.runner.run(&spec).await
    }

    /// Run `argv` inside `container`.
    pub async fn exec<I, S>(
        &self,
        container: &str,
        argv: I,
        options: &ExecOptions,
    ) -> Result<CommandOutput, ExecutionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut spec = self.command().arg("exec");
        for (key, value) in &options.forwarded_env {
            spec = spec.args(["-e", key.as_str()]).env(key.as_str(), value.as_str());
        }
        if let Some(dir) = &options.workdir {
            spec = spec.args(["-w", dir.as_str()]);
        }
        spec = spec.arg(container).args(argv);
        self.runner.run(&spec).await
    }
}
