// Copyright (c) 2026 Nubo Software
// SPDX-License-Identifier: AGPL-3.0

//! Data directory handling under the deployment root.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::domain::pipeline::ProvisionError;
use crate::domain::root_path::RootPath;

#[derive(Debug, Clone)]
pub struct DataDirectories {
    root: RootPath,
}

impl DataDirectories {
    pub fn new(root: RootPath) -> Self {
        Self { root }
    }

    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    /// A missing directory counts as empty.
    pub async fn is_empty(&self, path: impl AsRef<Path>) -> Result<bool, ProvisionError> {
        let path = self.resolve(path);
        match tokio::fs::read_dir(&path).await {
            Ok(mut entries) => {
                let first = entries
                    .next_entry()
                    .await
                    .map_err(|e| ProvisionError::io(&path, e))?;
                Ok(first.is_none())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(true),
            Err(e) => Err(ProvisionError::io(&path, e)),
        }
    }

    /// Recursively delete, ignoring absence.
    pub async fn remove(&self, path: impl AsRef<Path>) -> Result<(), ProvisionError> {
        let path = self.resolve(path);
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => {
                info!(path = %path.display(), "Removed directory");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ProvisionError::io(&path, e)),
        }
    }

    pub async fn ensure(&self, path: impl AsRef<Path>) -> Result<(), ProvisionError> {
        let path = self.resolve(path);
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|e| ProvisionError::io(&path, e))
    }

    /// Delete then recreate, leaving an empty directory behind.
    pub async fn reset(&self, path: impl AsRef<Path>) -> Result<(), ProvisionError> {
        let path = path.as_ref();
        self.remove(path).await?;
        self.ensure(path).await?;
        debug!(path = %self.resolve(path).display(), "Directory reset");
        Ok(())
    }

    pub async fn write_text(&self, path: impl AsRef<Path>, content: &str) -> Result<(), ProvisionError> {
        let path = self.resolve(path);
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| ProvisionError::io(&path, e))
    }
}
