// Copyright (c) 2026 Nubo Software
// SPDX-License-Identifier: AGPL-3.0

//! Provisioning Pipeline
//!
//! Drives [`ProvisioningStep::ALL`] in order against one deployment root.
//! Values produced by earlier steps (host name, secrets, admin identity) live
//! in the pipeline's run state and are threaded into later steps; nothing is
//! carried between runs.
//!
//! # Lifecycle
//!
//! ```text
//! preflight ─▶ TeardownExisting ─▶ … ─▶ WriteEnvironmentFile ─▶ Completed
//!                    │                          │
//!                    └── Exit ─▶ Exited         └── error ─▶ StepFailure
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::application::input_collector::InputCollector;
use crate::application::readiness::{wait_until_ready, ReadinessTimeout, RetryPolicy};
use crate::domain::config::ProvisionerConfig;
use crate::domain::console::OperatorConsole;
use crate::domain::credentials::{generate_secret, AdminIdentity, Secret, SECRET_LENGTH};
use crate::domain::documents::{
    DaemonRegistryConfig, DerivedUrls, FrontendConfig, ManagementSettings, SystemConfig,
    FRONTEND_SERVICE_USER,
};
use crate::domain::pipeline::{
    NoopObserver, PipelineError, PipelineObserver, PipelineOutcome, ProvisionError,
    ProvisioningStep, ProvisioningSummary, StepFailure, StepOutcome,
};
use crate::domain::process::{CommandSpec, ProcessRunner};
use crate::domain::root_path::RootPath;
use crate::infrastructure::compose::ComposeClient;
use crate::infrastructure::config_store::{to_pretty_json, JsonConfigStore};
use crate::infrastructure::container_runtime::{ContainerRuntime, ExecOptions};
use crate::infrastructure::database::{statements, DatabaseShell, APP_DATABASE};
use crate::infrastructure::directories::DataDirectories;

/// Compose variable carrying the database root password.
pub const DATABASE_PASSWORD_ENV: &str = "MYSQL_PASSWORD";

/// Working directory of the admin bootstrap tool inside the management container.
pub const ADMIN_TOOL_DIR: &str = "/opt/nubomanagement";

const WIPE_DATABASE_PROMPT: &str =
    "An existing database found. Would you like to delete it and start with a new database?";

#[derive(Default)]
struct RunState {
    hostname: Option<String>,
    urls: Option<DerivedUrls>,
    database_password: Option<Secret>,
    frontend_password: Option<Secret>,
    admin: Option<AdminIdentity>,
}

pub struct ProvisioningPipeline {
    config: ProvisionerConfig,
    root: RootPath,
    runner: Arc<dyn ProcessRunner>,
    compose: ComposeClient,
    runtime: ContainerRuntime,
    store: JsonConfigStore,
    dirs: DataDirectories,
    input: InputCollector,
    observer: Arc<dyn PipelineObserver>,
    default_hostname: String,
    state: RunState,
}

impl ProvisioningPipeline {
    pub fn new(
        config: ProvisionerConfig,
        root: RootPath,
        runner: Arc<dyn ProcessRunner>,
        console: Box<dyn OperatorConsole>,
    ) -> Self {
        let compose = ComposeClient::new(runner.clone(), &config.binaries.compose, root.clone());
        let runtime = ContainerRuntime::new(runner.clone(), &config.binaries.docker, root.clone());
        let default_hostname = hostname::get()
            .ok()
            .and_then(|name| name.into_string().ok())
            .unwrap_or_default();

        Self {
            store: JsonConfigStore::new(root.clone()),
            dirs: DataDirectories::new(root.clone()),
            input: InputCollector::new(console),
            observer: Arc::new(NoopObserver),
            state: RunState::default(),
            config,
            root,
            runner,
            compose,
            runtime,
            default_hostname,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Host name offered as the default answer in [`ProvisioningStep::CollectHostname`].
    pub fn with_default_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.default_hostname = hostname.into();
        self
    }

    /// Run every step in order, stopping at the first exit or failure.
    pub async fn run(&mut self) -> Result<PipelineOutcome, PipelineError> {
        let dc_name = self.read_dc_name().await.map_err(PipelineError::Preflight)?;
        info!(root = %self.root, dc_name = %dc_name, "Starting provisioning run");

        for step in ProvisioningStep::ALL {
            self.observer.on_step_start(step).await;
            match self.execute(step).await {
                Ok(StepOutcome::Continue) => {
                    self.observer.on_step_complete(step).await;
                }
                Ok(StepOutcome::Exit { reason }) => {
                    self.observer.on_step_complete(step).await;
                    info!(step = %step, reason = %reason, "Provisioning stopped by operator");
                    return Ok(PipelineOutcome::Exited { step, reason });
                }
                Err(error) => {
                    warn!(step = %step, error = %error, "Provisioning step failed");
                    self.observer.on_step_failed(step, &error).await;
                    return Err(StepFailure { step, error }.into());
                }
            }
        }

        let summary = self.finish()?;
        info!(hostname = %summary.hostname, "Provisioning completed");
        Ok(PipelineOutcome::Completed(summary))
    }

    /// Summary of a completed run. Missing state is charged to the last step.
    fn finish(&self) -> Result<ProvisioningSummary, StepFailure> {
        let summary = self.hostname().and_then(|hostname| {
            Ok(ProvisioningSummary::for_host(hostname, &self.urls()?.registry_url))
        });
        summary.map_err(|error| StepFailure {
            step: ProvisioningStep::WriteEnvironmentFile,
            error,
        })
    }

    /// Execute a single step against the current run state.
    pub async fn execute(&mut self, step: ProvisioningStep) -> Result<StepOutcome, ProvisionError> {
        debug!(step = %step, ordinal = step.ordinal(), "Executing step");
        match step {
            ProvisioningStep::TeardownExisting => {
                self.compose.down().await?;
            }
            ProvisioningStep::InspectDatabaseVolume => {
                let data_dir = self.config.paths.database_data_dir.clone();
                if !self.dirs.is_empty(&data_dir).await? {
                    let wipe = self.input.ask_yes_no(WIPE_DATABASE_PROMPT, false).await?;
                    if !wipe {
                        return Ok(StepOutcome::Exit {
                            reason: "Operator kept the existing database".to_string(),
                        });
                    }
                    self.dirs.remove(&data_dir).await?;
                }
            }
            ProvisioningStep::CollectHostname => {
                let default = self.default_hostname.clone();
                let hostname = self.input.ask("Enter host name:", &default).await?;
                let urls = DerivedUrls::for_host(&hostname, self.config.registry_port);
                info!(hostname = %hostname, registry_url = %urls.registry_url, "Host name set");
                self.state.hostname = Some(hostname);
                self.state.urls = Some(urls);
            }
            ProvisioningStep::EnsureInsecureRegistry => {
                self.ensure_insecure_registry().await?;
            }
            ProvisioningStep::StartRegistry => {
                let registry_url = &self.urls()?.registry_url;
                info!(registry_url = %registry_url, "Starting registry");
                self.compose
                    .up_service(&self.config.services.registry, &BTreeMap::new())
                    .await?;
            }
            ProvisioningStep::PersistDerivedSettings => {
                let urls = self.urls()?.clone();
                let path = &self.config.paths.management_settings;
                let mut settings: ManagementSettings = self.store.read(path).await?;
                settings.apply_urls(&urls);
                self.store.write(path, &settings).await?;
            }
            ProvisioningStep::SeedBaseImage => {
                let upstream = self.config.base_image.upstream_reference();
                let local = self
                    .config
                    .base_image
                    .local_reference(&self.urls()?.registry_url);
                self.runtime.pull(&upstream).await?;
                self.runtime.tag(&upstream, &local).await?;
                self.runtime.push(&local).await?;
            }
            ProvisioningStep::ResetVolatileDirectories => {
                for dir in &self.config.paths.volatile_dirs {
                    self.dirs.reset(dir).await?;
                }
            }
            ProvisioningStep::CreateDatabaseDirectory => {
                self.dirs.ensure(&self.config.paths.database_data_dir).await?;
            }
            ProvisioningStep::GenerateDatabaseSecret => {
                self.state.database_password = Some(generate_secret(SECRET_LENGTH));
            }
            ProvisioningStep::StartDatabase => {
                let password = self.database_password()?.clone();
                let env = BTreeMap::from([(
                    DATABASE_PASSWORD_ENV.to_string(),
                    password.expose().to_string(),
                )]);
                self.compose
                    .up_service(&self.config.services.database, &env)
                    .await?;
                self.input
                    .notify(&format!("MySQL Password: {}", password.expose()));
            }
            ProvisioningStep::PersistDatabasePassword => {
                let password = self.database_password()?.expose().to_string();
                let path = &self.config.paths.system_config;
                let mut sysconf: SystemConfig = self.store.read(path).await?;
                sysconf.db_conf.password = password;
                self.store.write(path, &sysconf).await?;
            }
            ProvisioningStep::SeedSchemaFile => {
                self.runtime
                    .copy_into(
                        &self.config.paths.schema_file,
                        &self.config.services.database,
                        &self.config.paths.schema_container_dir,
                    )
                    .await?;
            }
            ProvisioningStep::WaitForDatabaseReady => {
                self.wait_for_database().await?;
            }
            ProvisioningStep::ApplySchema => {
                let schema = self.schema_container_path();
                self.database()?.source_file(&schema).await?;
            }
            ProvisioningStep::GenerateFrontendSecret => {
                self.state.frontend_password = Some(generate_secret(SECRET_LENGTH));
            }
            ProvisioningStep::RegisterFrontendCredential => {
                let dc_name = self.read_dc_name().await?;
                let password = self.frontend_password()?.clone();
                let sql = statements::insert_frontend_server(
                    &dc_name,
                    FRONTEND_SERVICE_USER,
                    password.expose(),
                );
                self.database()?.execute(Some(APP_DATABASE), &sql).await?;
            }
            ProvisioningStep::PersistFrontendCredential => {
                let password = self.frontend_password()?.expose().to_string();
                let path = &self.config.paths.frontend_config;
                let mut frontend: FrontendConfig = self.store.read(path).await?;
                frontend.backend_auth.user = FRONTEND_SERVICE_USER.to_string();
                frontend.backend_auth.password = password;
                self.store.write(path, &frontend).await?;
            }
            ProvisioningStep::ConfigureStorageBackend => {
                let storage = self.root.join(&self.config.paths.storage_dir);
                let sql = statements::configure_local_storage(&storage.display().to_string());
                self.database()?.execute(Some(APP_DATABASE), &sql).await?;
            }
            ProvisioningStep::StartManagementService => {
                self.compose
                    .up_service(&self.config.services.management, &BTreeMap::new())
                    .await?;
            }
            ProvisioningStep::CollectAdminIdentity => {
                let admin = self.input.collect_admin_identity().await?;
                info!(email = %admin.email, domain = %admin.domain, "Admin identity collected");
                self.state.admin = Some(admin);
            }
            ProvisioningStep::CreateAdminAccount => {
                let admin = self
                    .state
                    .admin
                    .as_ref()
                    .ok_or(ProvisionError::MissingState("admin identity"))?;
                let argv = [
                    "node",
                    "dist/createAdmin.js",
                    "-e",
                    admin.email.as_str(),
                    "-p",
                    admin.password.expose(),
                    "-d",
                    admin.domain.as_str(),
                    "-s",
                    "-a",
                ];
                let options = ExecOptions::default().workdir(ADMIN_TOOL_DIR);
                self.runtime
                    .exec(&self.config.services.management, argv, &options)
                    .await?;
            }
            ProvisioningStep::RegisterDefaultPlatform => {
                self.database()?
                    .execute(Some(APP_DATABASE), &statements::insert_default_platform())
                    .await?;
            }
            ProvisioningStep::StartAllServices => {
                self.compose.up_all().await?;
            }
            ProvisioningStep::WriteEnvironmentFile => {
                let content = format!("\n{}=none\nROOT_DIR={}", DATABASE_PASSWORD_ENV, self.root);
                self.dirs
                    .write_text(&self.config.paths.env_file, &content)
                    .await?;
            }
        }
        Ok(StepOutcome::Continue)
    }

    /// Append the registry to the daemon allow-list and reload the daemon.
    /// Any failure carries the desired document for a manual fix; an
    /// unreadable document is left alone and the fix starts from `{}`.
    async fn ensure_insecure_registry(&self) -> Result<(), ProvisionError> {
        let registry_url = self.urls()?.registry_url.clone();
        let path = self.config.paths.daemon_config.clone();
        let mut daemon: DaemonRegistryConfig = match self.store.read_or_default(&path).await {
            Ok(daemon) => daemon,
            Err(source) => {
                let mut fresh = DaemonRegistryConfig::default();
                fresh.ensure_registry(&registry_url);
                return Err(self.registry_config_error(&path, &fresh, source));
            }
        };
        if !daemon.ensure_registry(&registry_url) {
            debug!(registry_url = %registry_url, "Registry already allowed");
            return Ok(());
        }

        info!(
            registry_url = %registry_url,
            path = %self.store.resolve(&path).display(),
            "Adding registry URL to insecure registries"
        );
        let reload = CommandSpec::new(&self.config.binaries.systemctl)
            .args(["reload", self.config.services.runtime_unit.as_str()]);
        let applied = match self.store.write(&path, &daemon).await {
            Ok(()) => self.runner.run(&reload).await.map(|_| ()).map_err(ProvisionError::from),
            Err(e) => Err(e),
        };

        applied.map_err(|source| self.registry_config_error(&path, &daemon, source))
    }

    fn registry_config_error(
        &self,
        path: &std::path::Path,
        desired: &DaemonRegistryConfig,
        source: ProvisionError,
    ) -> ProvisionError {
        let desired = to_pretty_json(desired)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default();
        ProvisionError::RegistryConfig {
            path: self.store.resolve(path),
            desired,
            source: Box::new(source),
        }
    }

    async fn wait_for_database(&self) -> Result<(), ProvisionError> {
        let database = self.database()?;
        let policy = RetryPolicy::from(&self.config.readiness);
        info!(container = %database.container(), max_attempts = policy.max_attempts, "Waiting for database");

        wait_until_ready(policy, |attempt| {
            let database = database.clone();
            async move {
                debug!(attempt, "Probing database");
                database.probe().await
            }
        })
        .await
        .map(|_| ())
        .map_err(|ReadinessTimeout { attempts, last_error }| ProvisionError::Timeout {
            target: database.container().to_string(),
            attempts,
            last_error: Box::new(last_error.into()),
        })
    }

    async fn read_dc_name(&self) -> Result<String, ProvisionError> {
        let path = &self.config.paths.management_settings;
        let settings: ManagementSettings = self.store.read(path).await?;
        settings
            .dc_name
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ProvisionError::MissingField {
                path: self.store.resolve(path),
                field: "dcName",
            })
    }

    fn schema_container_path(&self) -> String {
        let file_name = self
            .config
            .paths
            .schema_file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!(
            "{}/{}",
            self.config.paths.schema_container_dir.trim_end_matches('/'),
            file_name
        )
    }

    fn database(&self) -> Result<DatabaseShell, ProvisionError> {
        Ok(DatabaseShell::new(
            self.runtime.clone(),
            &self.config.services.database,
            self.database_password()?.clone(),
        ))
    }

    fn hostname(&self) -> Result<&str, ProvisionError> {
        self.state
            .hostname
            .as_deref()
            .ok_or(ProvisionError::MissingState("host name"))
    }

    fn urls(&self) -> Result<&DerivedUrls, ProvisionError> {
        self.state
            .urls
            .as_ref()
            .ok_or(ProvisionError::MissingState("derived URLs"))
    }

    fn database_password(&self) -> Result<&Secret, ProvisionError> {
        self.state
            .database_password
            .as_ref()
            .ok_or(ProvisionError::MissingState("database password"))
    }

    fn frontend_password(&self) -> Result<&Secret, ProvisionError> {
        self.state
            .frontend_password
            .as_ref()
            .ok_or(ProvisionError::MissingState("frontend password"))
    }
}
