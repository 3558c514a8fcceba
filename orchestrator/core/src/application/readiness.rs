// Copyright (c) 2026 Nubo Software
// SPDX-License-Identifier: AGPL-3.0

//! Bounded readiness polling.
//!
//! The probe is attempted at most `max_attempts` times with a fixed sleep
//! before every attempt, including the first, so a freshly started service
//! gets time to initialise before it is asked anything.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::config::ReadinessConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl From<&ReadinessConfig> for RetryPolicy {
    fn from(config: &ReadinessConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            delay: config.delay(),
        }
    }
}

/// The probe never succeeded within the retry budget.
#[derive(Debug)]
pub struct ReadinessTimeout<E> {
    pub attempts: u32,
    pub last_error: E,
}

/// Poll `probe` until it succeeds or the budget is spent. The probe receives
/// the 1-based attempt number.
pub async fn wait_until_ready<T, E, F, Fut>(
    policy: RetryPolicy,
    mut probe: F,
) -> Result<T, ReadinessTimeout<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        tokio::time::sleep(policy.delay).await;
        match probe(attempt).await {
            Ok(value) => {
                debug!(attempt, "Readiness probe succeeded");
                return Ok(value);
            }
            Err(e) if attempt >= max_attempts => {
                warn!(attempts = attempt, error = %e, "Readiness probe budget exhausted");
                return Err(ReadinessTimeout {
                    attempts: attempt,
                    last_error: e,
                });
            }
            Err(e) => {
                debug!(attempt, error = %e, "Readiness probe failed, retrying");
                attempt += 1;
            }
        }
    }
}
