// Copyright (c) 2026 Nubo Software
// SPDX-License-Identifier: AGPL-3.0

//! SQL access to the database container through the runtime CLI.
//!
//! Statements are handed to the `mysql` client with `-e`, authenticating as
//! root with the password forwarded in `MYSQL_PWD`. String values are
//! embedded as escaped single-quoted literals.

use crate::domain::credentials::Secret;
use crate::domain::process::{CommandOutput, ExecutionError};
use crate::infrastructure::container_runtime::{ContainerRuntime, ExecOptions};

/// Application schema created by the seed file.
pub const APP_DATABASE: &str = "nubo";

const PASSWORD_ENV: &str = "MYSQL_PWD";

#[derive(Clone)]
pub struct DatabaseShell {
    runtime: ContainerRuntime,
    container: String,
    password: Secret,
}

impl DatabaseShell {
    pub fn new(runtime: ContainerRuntime, container: impl Into<String>, password: Secret) -> Self {
        Self {
            runtime,
            container: container.into(),
            password,
        }
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    /// Run one statement, optionally against a named database.
    pub async fn execute(
        &self,
        database: Option<&str>,
        sql: &str,
    ) -> Result<CommandOutput, ExecutionError> {
        let mut argv = vec!["mysql".to_string(), "-u".to_string(), "root".to_string()];
        if let Some(database) = database {
            argv.push("-D".to_string());
            argv.push(database.to_string());
        }
        argv.push("-e".to_string());
        argv.push(sql.to_string());

        let options = ExecOptions::default().forward_env(PASSWORD_ENV, self.password.expose());
        self.runtime.exec(&self.container, argv, &options).await
    }

    /// Trivial authenticated read used as the readiness probe.
    pub async fn probe(&self) -> Result<CommandOutput, ExecutionError> {
        self.execute(None, statements::PROBE).await
    }

    /// Execute a SQL file already present inside the container.
    pub async fn source_file(&self, container_path: &str) -> Result<CommandOutput, ExecutionError> {
        self.execute(None, &format!("source {}", container_path)).await
    }
}

pub mod statements {
    pub const PROBE: &str = "select user from mysql.user";

    /// Escaped single-quoted SQL string literal.
    pub fn literal(value: &str) -> String {
        let mut out = String::with_capacity(value.len() + 2);
        out.push('\'');
        for ch in value.chars() {
            match ch {
                '\'' => out.push_str("''"),
                '\\' => out.push_str("\\\\"),
                '\0' => out.push_str("\\0"),
                _ => out.push(ch),
            }
        }
        out.push('\'');
        out
    }

    pub fn insert_frontend_server(dc_name: &str, user: &str, password: &str) -> String {
        format!(
            "insert into allowed_front_end_servers values ({},{},{})",
            literal(dc_name),
            literal(user),
            literal(password)
        )
    }

    pub fn configure_local_storage(storage_path: &str) -> String {
        format!(
            "update nfs_servers set nfsip='local', sship='local', nfspath={}",
            literal(storage_path)
        )
    }

    pub fn insert_default_platform() -> String {
        "insert into static_platforms values (1,'nubo-ps','nubo-ps')".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::statements::*;
    use super::*;
    use crate::domain::process::{CommandSpec, ProcessRunner};
    use crate::domain::root_path::RootPath;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

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

    #[test]
    fn test_literal_escaping() {
        assert_eq!(literal("plain"), "'plain'");
        assert_eq!(literal("it's"), "'it''s'");
        assert_eq!(literal(r"a\b"), r"'a\\b'");
    }

    #[test]
    fn test_statements() {
        assert_eq!(
            insert_frontend_server("dc1", "frontend", "abc123"),
            "insert into allowed_front_end_servers values ('dc1','frontend','abc123')"
        );
        assert_eq!(
            configure_local_storage("/srv/stack/nfs/homes"),
            "update nfs_servers set nfsip='local', sship='local', nfspath='/srv/stack/nfs/homes'"
        );
    }

    #[tokio::test]
    async fn test_password_never_in_argv() {
        let runner = Arc::new(RecordingRunner::default());
        let runtime = ContainerRuntime::new(
            runner.clone(),
            "docker",
            RootPath::new_unchecked("/srv/stack"),
        );
        let db = DatabaseShell::new(runtime, "nubo-mysql", Secret::new("Zx81pw"));

        db.probe().await.unwrap();
        db.execute(Some(APP_DATABASE), &insert_default_platform()).await.unwrap();
        db.source_file("/tmp/nubo_start_db.sql").await.unwrap();

        let calls = runner.calls.lock().unwrap();
        assert_eq!(
            calls[0].args,
            vec!["exec", "-e", "MYSQL_PWD", "nubo-mysql", "mysql", "-u", "root", "-e", PROBE]
        );
        assert_eq!(&calls[1].args[7..9], &["-D".to_string(), "nubo".to_string()]);
        assert_eq!(calls[2].args.last().unwrap(), "source /tmp/nubo_start_db.sql");

        for call in calls.iter() {
            assert!(!call.args.iter().any(|a| a.contains("Zx81pw")));
            assert_eq!(call.env.get("MYSQL_PWD").map(String::as_str), Some("Zx81pw"));
        }
    }
}
