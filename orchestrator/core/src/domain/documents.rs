// Copyright (c) 2026 Nubo Software
// SPDX-License-Identifier: AGPL-3.0

//! Persisted JSON documents touched by the configurator
//!
//! Each type models only the fields the pipeline reads or writes. Every
//! other key is carried through `extra` untouched, so a read-modify-write
//! cycle never drops settings owned by the services themselves.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Service identity the frontend uses to authenticate against the backend.
pub const FRONTEND_SERVICE_USER: &str = "frontend";

/// `nubomanagement/conf/Settings.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ManagementSettings {
    /// Data-center identity, owned by the management service
    #[serde(rename = "dcName", default, skip_serializing_if = "Option::is_none")]
    pub dc_name: Option<String>,

    #[serde(rename = "registryURL", default, skip_serializing_if = "Option::is_none")]
    pub registry_url: Option<String>,

    #[serde(rename = "serverurl", default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,

    #[serde(rename = "controlPanelURL", default, skip_serializing_if = "Option::is_none")]
    pub control_panel_url: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// URLs derived from the operator supplied host name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedUrls {
    pub registry_url: String,
    pub server_url: String,
    pub control_panel_url: String,
}

impl DerivedUrls {
    pub fn for_host(hostname: &str, registry_port: u16) -> Self {
        Self {
            registry_url: format!("{}:{}", hostname, registry_port),
            server_url: format!("http://{}/", hostname),
            control_panel_url: format!("http://{}:6080/", hostname),
        }
    }
}

impl ManagementSettings {
    pub fn apply_urls(&mut self, urls: &DerivedUrls) {
        self.registry_url = Some(urls.registry_url.clone());
        self.server_url = Some(urls.server_url.clone());
        self.control_panel_url = Some(urls.control_panel_url.clone());
    }
}

/// `nubomanagement/conf/sysconf`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemConfig {
    #[serde(rename = "dbConf")]
    pub db_conf: DatabaseConnection,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConnection {
    #[serde(default)]
    pub password: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `frontend/conf/Settings.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrontendConfig {
    #[serde(rename = "backendAuth")]
    pub backend_auth: BackendAuth,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BackendAuth {
    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub password: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Runtime daemon configuration (`/etc/docker/daemon.json`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DaemonRegistryConfig {
    #[serde(rename = "insecure-registries", default)]
    pub insecure_registries: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DaemonRegistryConfig {
    pub fn contains(&self, registry_url: &str) -> bool {
        self.insecure_registries.iter().any(|r| r == registry_url)
    }

    /// Append `registry_url` unless present. Returns true when the document
    /// changed. Existing entries are never removed.
    pub fn ensure_registry(&mut self, registry_url: &str) -> bool {
        if self.contains(registry_url) {
            return false;
        }
        self.insecure_registries.push(registry_url.to_string());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_derived_urls() {
        let urls = DerivedUrls::for_host("myhost", 5000);
        assert_eq!(urls.registry_url, "myhost:5000");
        assert_eq!(urls.server_url, "http://myhost/");
        assert_eq!(urls.control_panel_url, "http://myhost:6080/");
    }

    #[test]
    fn test_management_settings_preserves_unknown_fields() {
        let doc = json!({
            "dcName": "dc-east",
            "registryURL": "old:5000",
            "sessionTimeout": 600,
            "nested": { "a": [1, 2] }
        });
        let mut settings: ManagementSettings = serde_json::from_value(doc).unwrap();
        assert_eq!(settings.dc_name.as_deref(), Some("dc-east"));

        settings.apply_urls(&DerivedUrls::for_host("myhost", 5000));
        let out = serde_json::to_value(&settings).unwrap();

        assert_eq!(out["registryURL"], "myhost:5000");
        assert_eq!(out["serverurl"], "http://myhost/");
        assert_eq!(out["controlPanelURL"], "http://myhost:6080/");
        assert_eq!(out["dcName"], "dc-east");
        assert_eq!(out["sessionTimeout"], 600);
        assert_eq!(out["nested"]["a"][1], 2);
    }

    #[test]
    fn test_system_config_requires_db_conf() {
        let err = serde_json::from_value::<SystemConfig>(json!({ "other": true }));
        assert!(err.is_err());

        let mut config: SystemConfig = serde_json::from_value(json!({
            "dbConf": { "host": "nubo-mysql", "password": "old" }
        }))
        .unwrap();
        config.db_conf.password = "new".to_string();
        let out = serde_json::to_value(&config).unwrap();
        assert_eq!(out["dbConf"]["password"], "new");
        assert_eq!(out["dbConf"]["host"], "nubo-mysql");
    }

    #[test]
    fn test_ensure_registry_on_empty_document() {
        let mut daemon: DaemonRegistryConfig = serde_json::from_value(json!({})).unwrap();
        assert!(daemon.ensure_registry("host:5000"));

        let out = serde_json::to_value(&daemon).unwrap();
        assert_eq!(out, json!({ "insecure-registries": ["host:5000"] }));
    }

    #[test]
    fn test_ensure_registry_is_idempotent() {
        let original = json!({
            "insecure-registries": ["other:5000", "host:5000"],
            "log-driver": "journald"
        });
        let mut daemon: DaemonRegistryConfig = serde_json::from_value(original.clone()).unwrap();
        assert!(!daemon.ensure_registry("host:5000"));
        assert_eq!(serde_json::to_value(&daemon).unwrap(), original);
    }
}
