// Copyright (c) 2026 Nubo Software
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Types and rules of the provisioning run, free of any process or file I/O.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Step model, documents, credentials and the seams the
//!   infrastructure layer implements

pub mod config;
pub mod console;
pub mod credentials;
pub mod documents;
pub mod pipeline;
pub mod process;
pub mod root_path;
