// Copyright (c) 2026 Nubo Software
// SPDX-License-Identifier: AGPL-3.0

//! Coloured step progress for the terminal.

use async_trait::async_trait;
use colored::Colorize;
use tracing::debug;

use nubo_core::domain::pipeline::{PipelineObserver, ProvisionError, ProvisioningStep};

pub struct ProgressReporter {
    total: usize,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            total: ProvisioningStep::ALL.len(),
        }
    }

    fn counter(&self, step: ProvisioningStep) -> String {
        format!("[{:>2}/{}]", step.ordinal(), self.total)
    }
}

#[async_trait]
impl PipelineObserver for ProgressReporter {
    async fn on_step_start(&self, step: ProvisioningStep) {
        println!("{} {}..", self.counter(step).dimmed(), step.description());
    }

    async fn on_step_complete(&self, step: ProvisioningStep) {
        debug!(step = %step, "Step complete");
    }

    async fn on_step_failed(&self, step: ProvisioningStep, error: &ProvisionError) {
        eprintln!(
            "{} {} {}",
            self.counter(step).dimmed(),
            "✗".red(),
            format!("{}: {}", step.description(), error).red()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_is_one_based() {
        let reporter = ProgressReporter::new();
        assert_eq!(reporter.counter(ProvisioningStep::TeardownExisting), "[ 1/25]");
        assert_eq!(reporter.counter(ProvisioningStep::WriteEnvironmentFile), "[25/25]");
    }
}
