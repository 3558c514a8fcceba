// Copyright (c) 2026 Nubo Software
// SPDX-License-Identifier: AGPL-3.0

//! Orchestration tool (compose) invocations.
//!
//! Every call runs from the deployment root and exports `ROOT_DIR` so the
//! compose file can mount paths relative to it.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::domain::process::{CommandOutput, CommandSpec, ExecutionError, ProcessRunner};
use crate::domain::root_path::RootPath;

pub const ROOT_DIR_ENV: &str = "ROOT_DIR";

#[derive(Clone)]
pub struct ComposeClient {
    runner: Arc<dyn ProcessRunner>,
    binary: String,
    root: RootPath,
}

impl ComposeClient {
    pub fn new(runner: Arc<dyn ProcessRunner>, binary: impl Into<String>, root: RootPath) -> Self {
        Self {
            runner,
            binary: binary.into(),
            root,
        }
    }

    fn command(&self) -> CommandSpec {
        CommandSpec::new(&self.binary)
            .current_dir(self.root.as_path())
            .env(ROOT_DIR_ENV, self.root.to_string())
    }

    /// Stop and remove every service of the stack.
    pub async fn down(&self) -> Result<CommandOutput, ExecutionError> {
        info!("Bringing down all compose services");
        self.runner.run(&self.command().arg("down")).await
    }

    /// Start one service detached, with extra environment for the compose file.
    pub async fn up_service(
        &self,
        service: &str,
        env: &BTreeMap<String, String>,
    ) -> Result<CommandOutput, ExecutionError> {
        info!(service = %service, "Starting compose service");
        let mut spec = self.command().args(["up", "-d", service]);
        spec.env.extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.runner.run(&spec).await
    }

    /// Start the whole stack detached.
    pub async fn up_all(&self) -> Result<CommandOutput, ExecutionError> {
        info!("Bringing up all compose services");
        self.runner.run(&self.command().args(["up", "-d"])).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingRunner {
        calls: Mutex<Vec<CommandSpec>>,
    }

    #[async_trait]
    impl ProcessRunner for RecordingRunner {
        async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecutionError> {
            self.calls.lock().unwrap().push(spec.clone());
            Ok(CommandOutput::default())
        }
    }

    #[tokio::test]
    async fn test_commands_run_from_root_with_root_dir() {
        let runner = Arc::new(RecordingRunner::default());
        let compose = ComposeClient::new(
            runner.clone(),
            "docker-compose",
            RootPath::new_unchecked("/srv/stack"),
        );

        compose.down().await.unwrap();
        let env = BTreeMap::from([("MYSQL_PASSWORD".to_string(), "pw".to_string())]);
        compose.up_service("nubo-mysql", &env).await.unwrap();
        compose.up_all().await.unwrap();

        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].args, vec!["down"]);
        assert_eq!(calls[1].args, vec!["up", "-d", "nubo-mysql"]);
        assert_eq!(calls[2].args, vec!["up", "-d"]);

        for call in calls.iter() {
            assert_eq!(call.program, "docker-compose");
            assert_eq!(call.cwd.as_deref(), Some(std::path::Path::new("/srv/stack")));
            assert_eq!(call.env.get(ROOT_DIR_ENV).map(String::as_str), Some("/srv/stack"));
        }
        assert_eq!(calls[1].env.get("MYSQL_PASSWORD").map(String::as_str), Some("pw"));
        assert!(!calls[0].env.contains_key("MYSQL_PASSWORD"));
    }
}
