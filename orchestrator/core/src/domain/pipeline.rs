// Copyright (c) 2026 Nubo Software
// SPDX-License-Identifier: AGPL-3.0
//! # Provisioning State Machine
//!
//! The first-run configuration is an explicit, strictly forward sequence of
//! [`ProvisioningStep`]s. Each step either continues, asks the driver to stop
//! cleanly ([`StepOutcome::Exit`]), or fails with a [`ProvisionError`] that
//! aborts the run.
//!
//! ## Failure Policy
//! | Situation | Result |
//! |-----------|--------|
//! | Operator declines wiping an existing database | clean exit, nothing started |
//! | Registry allow-list cannot be written | abort with manual-edit remediation |
//! | Database never answers the probe | abort after the retry budget |
//! | Any other error | abort immediately |
//!
//! There is no checkpointing; a failed run is re-invoked from the top.

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::domain::process::ExecutionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProvisioningStep {
    TeardownExisting,
    InspectDatabaseVolume,
    CollectHostname,
    EnsureInsecureRegistry,
    StartRegistry,
    PersistDerivedSettings,
    SeedBaseImage,
    ResetVolatileDirectories,
    CreateDatabaseDirectory,
    GenerateDatabaseSecret,
    StartDatabase,
    PersistDatabasePassword,
    SeedSchemaFile,
    WaitForDatabaseReady,
    ApplySchema,
    GenerateFrontendSecret,
    RegisterFrontendCredential,
    PersistFrontendCredential,
    ConfigureStorageBackend,
    StartManagementService,
    CollectAdminIdentity,
    CreateAdminAccount,
    RegisterDefaultPlatform,
    StartAllServices,
    WriteEnvironmentFile,
}

impl ProvisioningStep {
    /// Execution order.
    pub const ALL: [ProvisioningStep; 25] = [
        Self::TeardownExisting,
        Self::InspectDatabaseVolume,
        Self::CollectHostname,
        Self::EnsureInsecureRegistry,
        Self::StartRegistry,
        Self::PersistDerivedSettings,
        Self::SeedBaseImage,
        Self::ResetVolatileDirectories,
        Self::CreateDatabaseDirectory,
        Self::GenerateDatabaseSecret,
        Self::StartDatabase,
        Self::PersistDatabasePassword,
        Self::SeedSchemaFile,
        Self::WaitForDatabaseReady,
        Self::ApplySchema,
        Self::GenerateFrontendSecret,
        Self::RegisterFrontendCredential,
        Self::PersistFrontendCredential,
        Self::ConfigureStorageBackend,
        Self::StartManagementService,
        Self::CollectAdminIdentity,
        Self::CreateAdminAccount,
        Self::RegisterDefaultPlatform,
        Self::StartAllServices,
        Self::WriteEnvironmentFile,
    ];

    /// One-line description shown to the operator.
    pub fn description(&self) -> &'static str {
        match self {
            Self::TeardownExisting => "Bringing down all compose containers",
            Self::InspectDatabaseVolume => "Checking database volume",
            Self::CollectHostname => "Collecting host name",
            Self::EnsureInsecureRegistry => "Registering local registry with the container runtime",
            Self::StartRegistry => "Starting registry",
            Self::PersistDerivedSettings => "Writing management server URLs",
            Self::SeedBaseImage => "Pushing base image to registry",
            Self::ResetVolatileDirectories => "Clearing old service data",
            Self::CreateDatabaseDirectory => "Creating database directory",
            Self::GenerateDatabaseSecret => "Generating database password",
            Self::StartDatabase => "Starting database",
            Self::PersistDatabasePassword => "Writing database password to management config",
            Self::SeedSchemaFile => "Copying schema into database container",
            Self::WaitForDatabaseReady => "Waiting for database",
            Self::ApplySchema => "Creating database schema",
            Self::GenerateFrontendSecret => "Generating frontend password",
            Self::RegisterFrontendCredential => "Registering frontend server",
            Self::PersistFrontendCredential => "Writing frontend credentials",
            Self::ConfigureStorageBackend => "Configuring local storage",
            Self::StartManagementService => "Starting management service",
            Self::CollectAdminIdentity => "Collecting site administrator",
            Self::CreateAdminAccount => "Creating organization and first admin",
            Self::RegisterDefaultPlatform => "Registering default platform",
            Self::StartAllServices => "Bringing up all containers",
            Self::WriteEnvironmentFile => "Writing compose environment file",
        }
    }

    /// 1-based position in [`ProvisioningStep::ALL`].
    pub fn ordinal(&self) -> usize {
        Self::ALL
            .iter()
            .position(|s| s == self)
            .map(|i| i + 1)
            .unwrap_or(0)
    }
}

impl fmt::Display for ProvisioningStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Result of a single step that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    /// Stop the run cleanly; not an error.
    Exit { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningSummary {
    pub hostname: String,
    pub registry_url: String,
    pub admin_panel_url: String,
    pub desktop_url: String,
}

impl ProvisioningSummary {
    pub fn for_host(hostname: &str, registry_url: &str) -> Self {
        Self {
            hostname: hostname.to_string(),
            registry_url: registry_url.to_string(),
            admin_panel_url: format!("http://{}:6080/html/admin", hostname),
            desktop_url: format!("http://{}/html/desktop", hostname),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Completed(ProvisioningSummary),
    Exited {
        step: ProvisioningStep,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Operator input closed while waiting for: {prompt}")]
    InputClosed { prompt: String },

    #[error("Failed to read operator input: {0}")]
    Input(#[source] std::io::Error),

    #[error("Configuration file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("{target} not ready after {attempts} attempts: {last_error}")]
    Timeout {
        target: String,
        attempts: u32,
        last_error: Box<ProvisionError>,
    },

    #[error("Cannot update {}: {source}", .path.display())]
    RegistryConfig {
        path: PathBuf,
        /// Complete document the operator should write by hand
        desired: String,
        #[source]
        source: Box<ProvisionError>,
    },

    #[error("Required tool '{binary}' not found: {source}")]
    MissingBinary {
        binary: String,
        #[source]
        source: which::Error,
    },

    #[error("{} has no '{field}' value", .path.display())]
    MissingField { path: PathBuf, field: &'static str },

    #[error("{0} is not available at this point of the run")]
    MissingState(&'static str),
}

impl ProvisionError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Operator-facing hint for fixing the cause before re-running.
    pub fn remediation(&self) -> Option<String> {
        match self {
            Self::RegistryConfig { path, desired, .. } => Some(format!(
                "You may need to re-run the configurator as root or update {} manually to:\n{}",
                path.display(),
                desired
            )),
            Self::NotFound { .. } => Some(
                "Run the configurator from the deployment directory or point --path at it."
                    .to_string(),
            ),
            Self::Timeout { target, .. } => Some(format!(
                "Inspect the container logs (docker logs {}) and re-run the configurator.",
                target
            )),
            Self::MissingBinary { binary, .. } => Some(format!(
                "Install '{}' or set its location under `binaries:` in the configurator settings.",
                binary
            )),
            _ => None,
        }
    }
}

/// A step that aborted the run.
#[derive(Debug, Error)]
#[error("{step} failed: {error}")]
pub struct StepFailure {
    pub step: ProvisioningStep,
    #[source]
    pub error: ProvisionError,
}

impl StepFailure {
    pub fn remediation(&self) -> Option<String> {
        self.error.remediation()
    }
}

/// Why a run did not complete.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Checks done before any step touched the deployment
    #[error("Preflight check failed: {0}")]
    Preflight(#[source] ProvisionError),

    #[error(transparent)]
    Step(#[from] StepFailure),
}

impl PipelineError {
    pub fn remediation(&self) -> Option<String> {
        match self {
            Self::Preflight(error) => error.remediation(),
            Self::Step(failure) => failure.remediation(),
        }
    }

    /// Step that failed, if the run got that far.
    pub fn step(&self) -> Option<ProvisioningStep> {
        match self {
            Self::Preflight(_) => None,
            Self::Step(failure) => Some(failure.step),
        }
    }
}

/// Progress callbacks emitted by the pipeline driver.
#[async_trait]
pub trait PipelineObserver: Send + Sync {
    async fn on_step_start(&self, step: ProvisioningStep);
    async fn on_step_complete(&self, step: ProvisioningStep);
    async fn on_step_failed(&self, step: ProvisioningStep, error: &ProvisionError);
}

pub struct NoopObserver;

#[async_trait]
impl PipelineObserver for NoopObserver {
    async fn on_step_start(&self, _step: ProvisioningStep) {}
    async fn on_step_complete(&self, _step: ProvisioningStep) {}
    async fn on_step_failed(&self, _step: ProvisioningStep, _error: &ProvisionError) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_order() {
        assert_eq!(ProvisioningStep::ALL[0], ProvisioningStep::TeardownExisting);
        assert_eq!(ProvisioningStep::ALL[24], ProvisioningStep::WriteEnvironmentFile);
        assert_eq!(ProvisioningStep::EnsureInsecureRegistry.ordinal(), 4);
        assert_eq!(ProvisioningStep::WaitForDatabaseReady.ordinal(), 14);
        assert!(
            ProvisioningStep::GenerateFrontendSecret.ordinal()
                < ProvisioningStep::RegisterFrontendCredential.ordinal()
        );
    }

    #[test]
    fn test_summary_urls() {
        let summary = ProvisioningSummary::for_host("myhost", "myhost:5000");
        assert_eq!(summary.admin_panel_url, "http://myhost:6080/html/admin");
        assert_eq!(summary.desktop_url, "http://myhost/html/desktop");
    }

    #[test]
    fn test_registry_remediation_carries_document() {
        let error = ProvisionError::RegistryConfig {
            path: PathBuf::from("/etc/docker/daemon.json"),
            desired: r#"{"insecure-registries":["myhost:5000"]}"#.to_string(),
            source: Box::new(ProvisionError::io(
                "/etc/docker/daemon.json",
                std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            )),
        };
        let hint = error.remediation().unwrap();
        assert!(hint.contains("/etc/docker/daemon.json"));
        assert!(hint.contains("myhost:5000"));

        let failure = StepFailure {
            step: ProvisioningStep::EnsureInsecureRegistry,
            error,
        };
        assert!(failure.to_string().starts_with("EnsureInsecureRegistry failed"));
        assert!(failure.remediation().is_some());
    }
}
