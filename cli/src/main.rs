// Copyright (c) 2026 Nubo Software
// SPDX-License-Identifier: AGPL-3.0

//! # Nubo Configurator CLI
//!
//! The `nubo-conf` binary performs the first-run configuration of a Nubo
//! deployment directory: it asks the operator for the host name and the first
//! administrator, generates the service credentials, rewrites the
//! configuration documents and brings the container stack up.
//!
//! The run is interactive and strictly sequential. A failed run is re-invoked
//! from the top after fixing the reported cause.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

use nubo_core::domain::pipeline::ProvisioningSummary;
use nubo_core::infrastructure::SystemProcessRunner;
use nubo_core::{PipelineOutcome, ProvisionerConfig, ProvisioningPipeline, RootPath};

mod console;
mod reporter;

use console::TerminalConsole;
use reporter::ProgressReporter;

/// Nubo Configurator - first-run setup of a Nubo deployment
#[derive(Parser)]
#[command(name = "nubo-conf")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Deployment root holding the compose file and service directories
    #[arg(short, long, default_value = "./", value_name = "DIR")]
    path: PathBuf,

    /// Path to configurator settings (overrides discovery)
    #[arg(short, long, env = "NUBO_CONF_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "NUBO_CONF_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    println!("{}", "Nubo configurator. Starting configuration".bold());
    let root = RootPath::resolve(&cli.path)
        .with_context(|| format!("Failed to resolve root path {}", cli.path.display()))?;
    println!("Root path: {}", root);

    let config = ProvisionerConfig::load_or_default(cli.config)
        .context("Failed to load configurator settings")?;
    config
        .validate()
        .context("Invalid configurator settings")?;

    if let Err(e) = SystemProcessRunner::verify_binaries([
        config.binaries.compose.as_str(),
        config.binaries.docker.as_str(),
    ]) {
        report_failure(&e.to_string(), e.remediation());
        return Ok(ExitCode::FAILURE);
    }

    let runner = Arc::new(SystemProcessRunner::new(config.output_limit_bytes));
    let mut pipeline =
        ProvisioningPipeline::new(config, root, runner, Box::new(TerminalConsole::new()))
            .with_observer(Arc::new(ProgressReporter::new()));

    match pipeline.run().await {
        Ok(PipelineOutcome::Completed(summary)) => {
            print_summary(&summary);
            Ok(ExitCode::SUCCESS)
        }
        Ok(PipelineOutcome::Exited { step, reason }) => {
            info!(step = %step, reason = %reason, "Configurator stopped");
            println!("{}", "Quitting configurator".yellow());
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            report_failure(&e.to_string(), e.remediation());
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_summary(summary: &ProvisioningSummary) {
    println!();
    println!("{}", "Done.".bold().green());
    println!("Registry URL: {}", summary.registry_url.cyan());
    println!(
        "Login to the admin control panel at {}",
        summary.admin_panel_url.cyan()
    );
    println!("Login to remote desktop at {}", summary.desktop_url.cyan());
}

fn report_failure(message: &str, remediation: Option<String>) {
    eprintln!("{} {}", "Error:".red().bold(), message);
    if let Some(hint) = remediation {
        eprintln!("{}", hint.yellow());
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    Ok(())
}
