// Copyright (c) 2026 Nubo Software
// SPDX-License-Identifier: AGPL-3.0

//! Operator console contract
//!
//! The pipeline never reads stdin directly. It talks to an
//! [`OperatorConsole`], which the CLI backs with the terminal and tests back
//! with a scripted line source.

use async_trait::async_trait;
use thiserror::Error;

/// Rejected operator input. Reported back to the operator and re-prompted,
/// never surfaced as a pipeline failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Whether typed input should be echoed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Echo {
    Visible,
    Hidden,
}

#[async_trait]
pub trait OperatorConsole: Send {
    /// Show `prompt` and read one line without its trailing newline.
    /// `Ok(None)` means the input stream is closed.
    async fn read_line(&mut self, prompt: &str, echo: Echo) -> std::io::Result<Option<String>>;

    /// Operator-facing message, e.g. a validation error before re-prompting.
    fn notify(&mut self, message: &str);
}
