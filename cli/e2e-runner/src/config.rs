//! Runner configuration, from flags with environment fallbacks.

use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("node {node} is outside 1..={total_nodes}")]
    NodeOutOfRange { node: usize, total_nodes: usize },

    #[error("{0} must be at least 1")]
    Zero(&'static str),
}

/// e2e-runner - split the e2e suites across CI nodes and run them on pooled
/// worker VMs.
#[derive(Debug, Clone, Parser)]
#[command(name = "e2e-runner")]
#[command(author, version, about, long_about = None)]
pub struct RunnerConfig {
    /// Directory for per-suite and merged JUnit reports.
    #[arg(long, env = "REPORTS", default_value = "reports")]
    pub reports: PathBuf,

    /// Suites to run (space or comma separated). Defaults to every suite
    /// file under the e2e directory.
    #[arg(long, env = "E2E_SUITES", value_delimiter = ',')]
    pub suites: Vec<String>,

    /// Only run tests whose name contains this string.
    #[arg(long, env = "E2E_FILTER")]
    pub filter: Option<String>,

    /// Number of CI nodes sharing the tests.
    #[arg(long, env = "E2E_TOTAL_NODES", default_value_t = 1)]
    pub total_nodes: usize,

    /// This node, counted from 1.
    #[arg(long, env = "E2E_NODE", default_value_t = 1)]
    pub node: usize,

    /// Suites run at once; each gets its own worker VM.
    #[arg(long, env = "E2E_WORKER_TOTAL", default_value_t = 4)]
    pub worker_total: u32,

    /// Package holding the scenario suites.
    #[arg(long, env = "E2E_PACKAGE", default_value = "fctl-e2e")]
    pub package: String,

    /// Directory whose `*.rs` files are the suites.
    #[arg(long, env = "E2E_DIR", default_value = "test/e2e")]
    pub e2e_dir: PathBuf,

    /// Cargo executable.
    #[arg(long, env = "CARGO", default_value = "cargo")]
    pub cargo: String,

    /// Skip the startup and cleanup scripts.
    #[arg(long, env = "E2E_SKIP_SCRIPTS")]
    pub skip_scripts: bool,

    /// Log as JSON lines.
    #[arg(long, env = "E2E_LOG_FORMAT", value_parser = ["text", "json"], default_value = "text")]
    pub log_format: String,
}

impl RunnerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_nodes == 0 {
            return Err(ConfigError::Zero("total nodes"));
        }
        if self.worker_total == 0 {
            return Err(ConfigError::Zero("worker total"));
        }
        if self.node == 0 || self.node > self.total_nodes {
            return Err(ConfigError::NodeOutOfRange {
                node: self.node,
                total_nodes: self.total_nodes,
            });
        }
        Ok(())
    }

    /// Requested suites, split on whitespace as well as commas.
    pub fn suite_names(&self) -> Vec<String> {
        self.suites
            .iter()
            .flat_map(|s| s.split_whitespace())
            .map(str::to_string)
            .collect()
    }

    pub fn json_logs(&self) -> bool {
        self.log_format == "json"
    }
}
