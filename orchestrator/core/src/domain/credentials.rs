// Copyright (c) 2026 Nubo Software
// SPDX-License-Identifier: AGPL-3.0

//! Credentials generated or collected during a provisioning run
//!
//! - [`generate_secret`] draws alphanumeric secrets from a CSPRNG.
//! - [`Secret`] wraps sensitive strings so they never leak through `Debug`
//!   or log formatting.
//! - [`AdminIdentity`] holds the first administrator collected from the
//!   operator, with [`is_valid_email`] as its validation predicate.

use rand::distr::Alphanumeric;
use rand::Rng;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Length of the database and frontend secrets.
pub const SECRET_LENGTH: usize = 20;

/// Sensitive string whose formatting is always redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Explicit access to the raw value.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Random secret of exactly `length` characters from `[A-Za-z0-9]`.
///
/// Uses the thread-local generator, a ChaCha-based CSPRNG seeded from the
/// operating system.
pub fn generate_secret(length: usize) -> Secret {
    let value: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect();
    Secret(value)
}

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(([^<>()\[\]\\.,;:\s@"]+(\.[^<>()\[\]\\.,;:\s@"]+)*)|(".+"))@((\[[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\])|(([a-zA-Z\-0-9]+\.)+[a-zA-Z]{2,}))$"#,
    )
    .expect("email pattern is a valid regex")
});

/// Standard email-shape check, applied to the lower-cased value.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(&email.to_lowercase())
}

/// Domain part of an email address, used as the default admin domain.
pub fn email_domain(email: &str) -> Option<&str> {
    email
        .rsplit_once('@')
        .map(|(_, domain)| domain)
        .filter(|domain| !domain.is_empty())
}

/// First site administrator created inside the management container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminIdentity {
    pub email: String,
    pub password: Secret,
    pub domain: String,
}
