// Copyright (c) 2026 Nubo Software
// SPDX-License-Identifier: AGPL-3.0

// Configurator Settings
//
// Describes the deployment the configurator provisions:
// - External binaries (compose tool, container runtime, service manager)
// - Compose service names and container names
// - Locations of the JSON documents and data directories under the root
// - Base image seeded into the local registry
// - Database readiness policy and process output cap
//
// Defaults reproduce the stock Nubo compose layout, so a configurator run
// without any settings file behaves like the classic installer.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Name of the settings file looked up during discovery.
pub const CONFIG_FILE_NAME: &str = "nubo-conf.yaml";

/// Environment variable pointing at an explicit settings file.
pub const CONFIG_PATH_ENV: &str = "NUBO_CONF_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProvisionerConfig {
    /// External command line tools
    #[serde(default)]
    pub binaries: BinariesConfig,

    /// Compose service / container names
    #[serde(default)]
    pub services: ServicesConfig,

    /// Documents and directories, relative to the root unless absolute
    #[serde(default)]
    pub paths: PathsConfig,

    /// Base image pushed into the freshly started registry
    #[serde(default)]
    pub base_image: BaseImageConfig,

    /// Port the local registry listens on
    #[serde(default = "default_registry_port")]
    pub registry_port: u16,

    /// Database readiness polling
    #[serde(default)]
    pub readiness: ReadinessConfig,

    /// Maximum bytes captured per stream from an external command
    #[serde(default = "default_output_limit")]
    pub output_limit_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BinariesConfig {
    #[serde(default = "default_compose_binary")]
    pub compose: String,

    #[serde(default = "default_docker_binary")]
    pub docker: String,

    #[serde(default = "default_systemctl_binary")]
    pub systemctl: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServicesConfig {
    #[serde(default = "default_registry_service")]
    pub registry: String,

    #[serde(default = "default_database_service")]
    pub database: String,

    #[serde(default = "default_management_service")]
    pub management: String,

    /// systemd unit reloaded after the registry allow-list changes
    #[serde(default = "default_runtime_unit")]
    pub runtime_unit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathsConfig {
    #[serde(default = "default_management_settings")]
    pub management_settings: PathBuf,

    #[serde(default = "default_system_config")]
    pub system_config: PathBuf,

    #[serde(default = "default_frontend_config")]
    pub frontend_config: PathBuf,

    /// Runtime daemon configuration holding `insecure-registries`
    #[serde(default = "default_daemon_config")]
    pub daemon_config: PathBuf,

    #[serde(default = "default_database_data_dir")]
    pub database_data_dir: PathBuf,

    /// Directories emptied on every run
    #[serde(default = "default_volatile_dirs")]
    pub volatile_dirs: Vec<PathBuf>,

    /// Local storage root registered with the management database
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    #[serde(default = "default_schema_file")]
    pub schema_file: PathBuf,

    /// Directory inside the database container the schema is copied to
    #[serde(default = "default_schema_container_dir")]
    pub schema_container_dir: String,

    #[serde(default = "default_env_file")]
    pub env_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BaseImageConfig {
    /// Upstream namespace the image is pulled from
    #[serde(default = "default_image_namespace")]
    pub namespace: String,

    #[serde(default = "default_image_name")]
    pub name: String,

    /// Namespace inside the local registry
    #[serde(default = "default_registry_namespace")]
    pub registry_namespace: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadinessConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before every probe, in milliseconds
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl ReadinessConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl BaseImageConfig {
    /// Image reference pulled from the public registry.
    pub fn upstream_reference(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Image reference inside the local registry.
    pub fn local_reference(&self, registry_url: &str) -> String {
        format!("{}/{}/{}", registry_url, self.registry_namespace, self.name)
    }
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            binaries: BinariesConfig::default(),
            services: ServicesConfig::default(),
            paths: PathsConfig::default(),
            base_image: BaseImageConfig::default(),
            registry_port: default_registry_port(),
            readiness: ReadinessConfig::default(),
            output_limit_bytes: default_output_limit(),
        }
    }
}

impl Default for BinariesConfig {
    fn default() -> Self {
        Self {
            compose: default_compose_binary(),
            docker: default_docker_binary(),
            systemctl: default_systemctl_binary(),
        }
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            registry: default_registry_service(),
            database: default_database_service(),
            management: default_management_service(),
            runtime_unit: default_runtime_unit(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            management_settings: default_management_settings(),
            system_config: default_system_config(),
            frontend_config: default_frontend_config(),
            daemon_config: default_daemon_config(),
            database_data_dir: default_database_data_dir(),
            volatile_dirs: default_volatile_dirs(),
            storage_dir: default_storage_dir(),
            schema_file: default_schema_file(),
            schema_container_dir: default_schema_container_dir(),
            env_file: default_env_file(),
        }
    }
}

impl Default for BaseImageConfig {
    fn default() -> Self {
        Self {
            namespace: default_image_namespace(),
            name: default_image_name(),
            registry_namespace: default_registry_namespace(),
        }
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

impl ProvisionerConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. NUBO_CONF_CONFIG environment variable
    /// 2. ./nubo-conf.yaml (working directory)
    /// 3. ~/.nubo/nubo-conf.yaml (user home)
    /// 4. /etc/nubo/nubo-conf.yaml
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from(".").join(CONFIG_FILE_NAME);
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".nubo").join(CONFIG_FILE_NAME);
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/nubo").join(CONFIG_FILE_NAME);
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::debug!("No configuration file found, using built-in defaults");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("NUBO_COMPOSE_BIN") {
            if !val.trim().is_empty() {
                tracing::info!("Environment override: NUBO_COMPOSE_BIN={}", val);
                self.binaries.compose = val;
            }
        }

        if let Ok(val) = std::env::var("NUBO_DOCKER_BIN") {
            if !val.trim().is_empty() {
                tracing::info!("Environment override: NUBO_DOCKER_BIN={}", val);
                self.binaries.docker = val;
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        let binaries = [
            ("binaries.compose", &self.binaries.compose),
            ("binaries.docker", &self.binaries.docker),
            ("binaries.systemctl", &self.binaries.systemctl),
        ];
        for (field, value) in binaries {
            if value.trim().is_empty() {
                anyhow::bail!("{} cannot be empty", field);
            }
        }

        let services = [
            ("services.registry", &self.services.registry),
            ("services.database", &self.services.database),
            ("services.management", &self.services.management),
            ("services.runtime_unit", &self.services.runtime_unit),
        ];
        for (field, value) in services {
            if value.trim().is_empty() {
                anyhow::bail!("{} cannot be empty", field);
            }
        }

        if self.registry_port == 0 {
            anyhow::bail!("registry_port must be non-zero");
        }

        if self.readiness.max_attempts == 0 {
            anyhow::bail!("readiness.max_attempts must be at least 1");
        }

        if self.base_image.name.is_empty() {
            anyhow::bail!("base_image.name cannot be empty");
        }

        if self.output_limit_bytes == 0 {
            anyhow::bail!("output_limit_bytes must be non-zero");
        }

        Ok(())
    }
}

fn default_compose_binary() -> String {
    "docker-compose".to_string()
}

fn default_docker_binary() -> String {
    "docker".to_string()
}

fn default_systemctl_binary() -> String {
    "systemctl".to_string()
}

fn default_registry_service() -> String {
    "nubo-registry".to_string()
}

fn default_database_service() -> String {
    "nubo-mysql".to_string()
}

fn default_management_service() -> String {
    "nubo-management".to_string()
}

fn default_runtime_unit() -> String {
    "docker".to_string()
}

fn default_management_settings() -> PathBuf {
    PathBuf::from("nubomanagement/conf/Settings.json")
}

fn default_system_config() -> PathBuf {
    PathBuf::from("nubomanagement/conf/sysconf")
}

fn default_frontend_config() -> PathBuf {
    PathBuf::from("frontend/conf/Settings.json")
}

fn default_daemon_config() -> PathBuf {
    PathBuf::from("/etc/docker/daemon.json")
}

fn default_database_data_dir() -> PathBuf {
    PathBuf::from("mysql/data")
}

fn default_volatile_dirs() -> Vec<PathBuf> {
    vec![
        PathBuf::from("redis/data"),
        PathBuf::from("nubomanagement/docker_apps"),
    ]
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("nfs/homes")
}

fn default_schema_file() -> PathBuf {
    PathBuf::from("scripts/nubo_start_db.sql")
}

fn default_schema_container_dir() -> String {
    "/tmp".to_string()
}

fn default_env_file() -> PathBuf {
    PathBuf::from(".env")
}

fn default_image_namespace() -> String {
    "nubosoftware".to_string()
}

fn default_image_name() -> String {
    "nubo-ubuntu:20.04".to_string()
}

fn default_registry_namespace() -> String {
    "nubo".to_string()
}

fn default_registry_port() -> u16 {
    5000
}

fn default_max_attempts() -> u32 {
    10
}

fn default_delay_ms() -> u64 {
    3000
}

fn default_output_limit() -> usize {
    10 * 1024 * 1024
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_stock_layout() {
        let config = ProvisionerConfig::default();
        assert_eq!(config.services.database, "nubo-mysql");
        assert_eq!(config.registry_port, 5000);
        assert_eq!(config.readiness.max_attempts, 10);
        assert_eq!(config.readiness.delay(), Duration::from_secs(3));
        assert_eq!(config.paths.volatile_dirs.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
binaries:
  compose: /usr/local/bin/docker-compose
readiness:
  max_attempts: 20
"#;
        let config = ProvisionerConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.binaries.compose, "/usr/local/bin/docker-compose");
        assert_eq!(config.binaries.docker, "docker");
        assert_eq!(config.readiness.max_attempts, 20);
        assert_eq!(config.readiness.delay_ms, 3000);
        assert_eq!(config.paths.schema_file, PathBuf::from("scripts/nubo_start_db.sql"));
    }

    #[test]
    fn test_base_image_references() {
        let image = BaseImageConfig::default();
        assert_eq!(image.upstream_reference(), "nubosoftware/nubo-ubuntu:20.04");
        assert_eq!(
            image.local_reference("myhost:5000"),
            "myhost:5000/nubo/nubo-ubuntu:20.04"
        );
    }

    #[test]
    fn test_validation() {
        let mut config = ProvisionerConfig::default();

        config.binaries.compose = "".to_string();
        assert!(config.validate().is_err());
        config.binaries.compose = "docker-compose".to_string();

        config.readiness.max_attempts = 0;
        assert!(config.validate().is_err());
        config.readiness.max_attempts = 10;

        config.registry_port = 0;
        assert!(config.validate().is_err());
        config.registry_port = 5000;

        config.services.database = " ".to_string();
        assert!(config.validate().is_err());
    }
}
