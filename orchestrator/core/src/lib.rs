// Copyright (c) 2026 Nubo Software
// SPDX-License-Identifier: AGPL-3.0
//! Nubo Provisioning Core
//!
//! First-run configuration of a Nubo deployment: collects operator input,
//! generates credentials, rewrites the deployment's configuration documents
//! and drives the container stack into its initial state.
//!
//! # Architecture
//!
//! - **domain:** step model, documents, credentials, errors and trait seams
//! - **infrastructure:** process execution and the clients built on it
//! - **application:** input collection, readiness polling, the pipeline

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use application::{InputCollector, ProvisioningPipeline};
pub use domain::config::ProvisionerConfig;
pub use domain::pipeline::{PipelineError, PipelineOutcome, ProvisioningStep, ProvisioningSummary};
pub use domain::root_path::RootPath;
