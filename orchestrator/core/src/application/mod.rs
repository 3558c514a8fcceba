// Copyright (c) 2026 Nubo Software
// SPDX-License-Identifier: AGPL-3.0

pub mod input_collector;
pub mod readiness;
pub mod pipeline;

pub use input_collector::InputCollector;
pub use pipeline::ProvisioningPipeline;
pub use readiness::{wait_until_ready, ReadinessTimeout, RetryPolicy};
