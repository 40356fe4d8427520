//! e2e-runner - parallel e2e suite runner.
//!
//! Discovers the ignored scenario tests of the e2e package, keeps the share
//! that belongs to this CI node and runs them suite by suite, never more
//! suites at once than there are worker VMs.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
mod discover;
mod report;
mod runner;

use config::RunnerConfig;
use runner::CargoExecutor;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run(config: RunnerConfig) -> Result<i32> {
    config.validate()?;

    let suites = match config.suite_names() {
        names if names.is_empty() => discover::default_suites(&config.e2e_dir)?,
        names => names,
    };
    let all = discover::discover_tests(
        &config.cargo,
        &config.package,
        &suites,
        config.filter.as_deref(),
    )
    .await?;

    let assigned = runner::filter_tests_for_node(&all, config.node, config.total_nodes);
    if assigned.is_empty() {
        info!(node = config.node, "no tests assigned to this node");
        return Ok(0);
    }

    let top = std::env::current_dir()?;
    if !config.skip_scripts {
        runner::run_startup(&top).await?;
    }

    let executor = Arc::new(CargoExecutor {
        cargo: config.cargo.clone(),
        package: config.package.clone(),
        reports: config.reports.clone(),
    });
    let results =
        runner::run_suites_with_sliding_window(&assigned, config.worker_total, executor).await;

    if !config.skip_scripts {
        runner::run_cleanup(&top).await;
    }
    if let Err(e) = report::merge_reports(&assigned, &config.reports) {
        warn!(error = %e, "failed to merge reports");
    }

    report::print_summary(&results);
    Ok(runner::overall_exit_code(&results))
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = RunnerConfig::parse();
    init_tracing(config.json_logs());

    let code = run(config).await?;
    std::process::exit(code);
}
