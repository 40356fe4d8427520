//! Node assignment and the sliding-window suite scheduler.
//!
//! Every suite run holds one worker id for its whole duration. Worker ids
//! map one-to-one onto pooled VMs, so two suites never share a VM.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::discover::SuiteInfo;
use crate::report::{parse_test_result_line, write_suite_report, SuiteResult};

pub const STARTUP_SCRIPT: &str = "test/scripts/e2e_startup.sh";
pub const CLEANUP_SCRIPT: &str = "test/scripts/e2e_cleanup.sh";

/// Tests for `node` (1-based) out of `total_nodes`: test `i` of the sorted
/// list goes to node `i % total_nodes + 1`. Result is grouped by suite and
/// sorted by suite name.
pub fn filter_tests_for_node(
    suites: &BTreeMap<String, SuiteInfo>,
    node: usize,
    total_nodes: usize,
) -> Vec<SuiteInfo> {
    let mut all: Vec<(&str, &str)> = suites
        .values()
        .flat_map(|s| s.tests.iter().map(move |t| (t.as_str(), s.name.as_str())))
        .collect();
    all.sort();

    let mut grouped: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    let total_nodes = total_nodes.max(1);
    for (i, (test, suite)) in all.iter().enumerate() {
        if i % total_nodes == node.wrapping_sub(1) {
            grouped.entry(suite).or_default().push(test.to_string());
        }
    }
    info!(
        all_tests = all.len(),
        node,
        node_tests = grouped.values().map(Vec::len).sum::<usize>(),
        "tests assigned to node"
    );

    grouped
        .into_iter()
        .map(|(name, mut tests)| {
            tests.sort();
            SuiteInfo {
                name: name.to_string(),
                tests,
            }
        })
        .collect()
}

/// Runs one suite on one worker.
#[async_trait]
pub trait SuiteExecutor: Send + Sync {
    async fn run_suite(&self, suite: &SuiteInfo, worker_id: u32) -> SuiteResult;
}

/// Runs suites with `cargo test` and writes a JUnit report per suite.
#[derive(Debug, Clone)]
pub struct CargoExecutor {
    pub cargo: String,
    pub package: String,
    pub reports: PathBuf,
}

impl CargoExecutor {
    pub fn args(&self, suite: &SuiteInfo) -> Vec<String> {
        let mut args: Vec<String> = [
            "test",
            "-p",
            self.package.as_str(),
            "--test",
            suite.name.as_str(),
            "--",
        ]
            .map(String::from)
            .to_vec();
        args.extend(["--ignored", "--exact", "--test-threads", "1"].map(String::from));
        args.extend(suite.tests.iter().cloned());
        args
    }

    async fn run(&self, suite: &SuiteInfo, worker_id: u32) -> Result<SuiteResult> {
        let start = Instant::now();
        let mut child = Command::new(&self.cargo)
            .args(self.args(suite))
            .env("E2E_WORKER_ID", worker_id.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to start {}", self.cargo))?;

        let mut cases = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                println!("[{}:{worker_id}] {line}", suite.name);
                if let Some(case) = parse_test_result_line(&line) {
                    cases.push(case);
                }
            }
        }
        let status = child.wait().await?;

        let result = SuiteResult {
            suite: suite.name.clone(),
            worker_id,
            exit_code: status.code().unwrap_or(1),
            duration: start.elapsed(),
            cases,
        };
        write_suite_report(&self.reports, &result, &suite.tests)?;
        Ok(result)
    }
}

#[async_trait]
impl SuiteExecutor for CargoExecutor {
    async fn run_suite(&self, suite: &SuiteInfo, worker_id: u32) -> SuiteResult {
        match self.run(suite, worker_id).await {
            Ok(result) => result,
            Err(e) => {
                error!(suite = %suite.name, worker_id, error = %e, "suite run failed");
                SuiteResult {
                    suite: suite.name.clone(),
                    worker_id,
                    exit_code: 1,
                    duration: Default::default(),
                    cases: Vec::new(),
                }
            }
        }
    }
}

/// Run every suite, at most `worker_total` at a time. A suite takes a free
/// worker id when it starts and gives it back when it ends. Results come
/// back in suite order.
pub async fn run_suites_with_sliding_window(
    suites: &[SuiteInfo],
    worker_total: u32,
    executor: Arc<dyn SuiteExecutor>,
) -> Vec<SuiteResult> {
    let worker_total = worker_total.max(1);
    info!(max_concurrent = worker_total, "running test suites (sliding window)");

    let semaphore = Arc::new(Semaphore::new(worker_total as usize));
    let (release, pool) = mpsc::channel(worker_total as usize);
    for id in 1..=worker_total {
        // capacity equals worker_total, so this never waits
        let _ = release.try_send(id);
    }
    let pool = Arc::new(Mutex::new(pool));

    let mut tasks = JoinSet::new();
    for (index, suite) in suites.iter().cloned().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let pool = Arc::clone(&pool);
        let release = release.clone();
        let executor = Arc::clone(&executor);

        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            let worker_id = pool.lock().await.recv().await.unwrap_or(1);
            info!(suite = %suite.name, worker_id, tests = suite.tests.len(), "starting suite");

            let result = executor.run_suite(&suite, worker_id).await;

            let _ = release.send(worker_id).await;
            info!(
                suite = %suite.name,
                worker_id,
                exit_code = result.exit_code,
                "suite completed, worker returned to pool"
            );
            (index, result)
        });
    }

    let mut results: Vec<Option<SuiteResult>> = vec![None; suites.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => results[index] = Some(result),
            Err(e) => error!(error = %e, "suite task panicked"),
        }
    }
    results
        .into_iter()
        .zip(suites)
        .map(|(result, suite)| {
            result.unwrap_or_else(|| SuiteResult {
                suite: suite.name.clone(),
                worker_id: 0,
                exit_code: 1,
                duration: Default::default(),
                cases: Vec::new(),
            })
        })
        .collect()
}

/// 1 when any suite failed.
pub fn overall_exit_code(results: &[SuiteResult]) -> i32 {
    i32::from(results.iter().any(|r| !r.succeeded()))
}

async fn run_script(top: &Path, script: &str) -> Result<()> {
    let status = Command::new(top.join(script))
        .current_dir(top)
        .stdin(Stdio::null())
        .status()
        .await
        .with_context(|| format!("failed to start {script}"))?;
    if !status.success() {
        anyhow::bail!("{script} exited with {status}");
    }
    Ok(())
}

pub async fn run_startup(top: &Path) -> Result<()> {
    info!(script = STARTUP_SCRIPT, "running startup");
    run_script(top, STARTUP_SCRIPT).await.context("startup failed")?;
    info!("startup completed");
    Ok(())
}

/// Cleanup failures are logged and otherwise ignored.
pub async fn run_cleanup(top: &Path) {
    info!(script = CLEANUP_SCRIPT, "running cleanup");
    match run_script(top, CLEANUP_SCRIPT).await {
        Ok(()) => info!("cleanup completed"),
        Err(e) => warn!(error = %e, "cleanup failed"),
    }
}
