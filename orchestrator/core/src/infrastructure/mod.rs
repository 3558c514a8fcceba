// Copyright (c) 2026 Nubo Software
// SPDX-License-Identifier: AGPL-3.0

pub mod process;
pub mod compose;
pub mod container_runtime;
pub mod database;
pub mod config_store;
pub mod directories;

pub use compose::ComposeClient;
pub use config_store::JsonConfigStore;
pub use container_runtime::{ContainerRuntime, ExecOptions};
pub use database::DatabaseShell;
pub use directories::DataDirectories;
pub use process::SystemProcessRunner;
