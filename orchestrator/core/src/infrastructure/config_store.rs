// Copyright (c) 2026 Nubo Software
// SPDX-License-Identifier: AGPL-3.0

//! JSON document access relative to the deployment root.
//!
//! Callers read a whole document, change it in memory and write the whole
//! document back. There is no merging and no locking; the pipeline is the
//! only writer while it runs.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::domain::pipeline::ProvisionError;
use crate::domain::root_path::RootPath;

#[derive(Debug, Clone)]
pub struct JsonConfigStore {
    root: RootPath,
}

impl JsonConfigStore {
    pub fn new(root: RootPath) -> Self {
        Self { root }
    }

    /// Absolute paths are used as-is, relative ones resolve against the root.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    pub async fn read<T: DeserializeOwned>(&self, path: impl AsRef<Path>) -> Result<T, ProvisionError> {
        let path = self.resolve(path);
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                ProvisionError::NotFound { path: path.clone() }
            } else {
                ProvisionError::io(&path, e)
            }
        })?;
        serde_json::from_str(&content).map_err(|source| ProvisionError::Parse { path, source })
    }

    /// Like [`read`](Self::read), but an absent file yields the default value.
    pub async fn read_or_default<T: DeserializeOwned + Default>(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<T, ProvisionError> {
        match self.read(path).await {
            Err(ProvisionError::NotFound { path }) => {
                debug!(path = %path.display(), "Document absent, starting from empty");
                Ok(T::default())
            }
            other => other,
        }
    }

    /// Serialise with four-space indentation and replace the file.
    pub async fn write<T: Serialize>(&self, path: impl AsRef<Path>, value: &T) -> Result<(), ProvisionError> {
        let path = self.resolve(path);
        let content = to_pretty_json(value).map_err(|e| ProvisionError::io(&path, std::io::Error::other(e)))?;
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| ProvisionError::io(&path, e))?;
        debug!(path = %path.display(), "Document written");
        Ok(())
    }
}

pub fn to_pretty_json<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::documents::{DaemonRegistryConfig, ManagementSettings};
    use serde_json::{json, Value};

    fn store(dir: &tempfile::TempDir) -> JsonConfigStore {
        JsonConfigStore::new(RootPath::new_unchecked(dir.path()))
    }

    #[tokio::test]
    async fn test_read_modify_write_relative() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("conf")).unwrap();
        std::fs::write(
            dir.path().join("conf/Settings.json"),
            r#"{ "dcName": "dc1", "other": 1 }"#,
        )
        .unwrap();

        let store = store(&dir);
        let mut settings: ManagementSettings = store.read("conf/Settings.json").await.unwrap();
        settings.registry_url = Some("myhost:5000".to_string());
        store.write("conf/Settings.json", &settings).await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join("conf/Settings.json")).unwrap();
        assert!(raw.contains("\n    \""), "expected four-space indentation: {}", raw);
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, json!({ "dcName": "dc1", "registryURL": "myhost:5000", "other": 1 }));
    }

    #[tokio::test]
    async fn test_missing_and_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        let missing = store.read::<Value>("nope.json").await;
        assert!(matches!(missing, Err(ProvisionError::NotFound { .. })));

        std::fs::write(dir.path().join("bad.json"), "{ not json").unwrap();
        let bad = store.read::<Value>("bad.json").await;
        assert!(matches!(bad, Err(ProvisionError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_read_or_default_tolerates_absence_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let absolute = dir.path().join("daemon.json");

        let daemon: DaemonRegistryConfig = store.read_or_default(&absolute).await.unwrap();
        assert!(daemon.insecure_registries.is_empty());

        std::fs::write(&absolute, "[").unwrap();
        let result = store.read_or_default::<DaemonRegistryConfig>(&absolute).await;
        assert!(matches!(result, Err(ProvisionError::Parse { .. })));
    }
}
