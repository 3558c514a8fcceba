// Copyright (c) 2026 Nubo Software
// SPDX-License-Identifier: AGPL-3.0

//! Deployment root
//!
//! Every relative path the configurator touches (compose project, JSON
//! documents, data directories) resolves against a single root directory
//! chosen once at startup. The value is immutable and handed to each
//! component that needs it.

use std::fmt;
use std::path::{Path, PathBuf};

/// Absolute root of the compose deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootPath(PathBuf);

impl RootPath {
    /// Resolve `path` into an absolute root.
    ///
    /// Relative inputs are joined onto the current working directory and
    /// canonicalised when the directory exists, so `--path ./` yields the
    /// same root the compose tool sees.
    pub fn resolve(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };
        let canonical = absolute.canonicalize().unwrap_or(absolute);
        Ok(Self(canonical))
    }

    /// Wrap a path that is already known to be absolute.
    pub fn new_unchecked(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Absolute paths are returned unchanged; relative ones join the root.
    pub fn join(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.0.join(path)
        }
    }
}

impl fmt::Display for RootPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl AsRef<Path> for RootPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}
