//! Finding the suites and the tests inside them.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use tokio::process::Command;
use tracing::{debug, info};

/// Tests of one suite, sorted by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteInfo {
    pub name: String,
    pub tests: Vec<String>,
}

/// Every `*.rs` file directly under `dir`, by stem, sorted.
pub fn default_suites(dir: &Path) -> Result<Vec<String>> {
    let mut suites = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "rs") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                suites.push(stem.to_string());
            }
        }
    }
    suites.sort();
    Ok(suites)
}

/// Test names in `--list --format terse` output: `name: test` lines.
/// Benchmarks and summary lines are skipped.
pub fn parse_test_list(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.trim().strip_suffix(": test"))
        .map(str::to_string)
        .collect()
}

/// Arguments listing the ignored tests of `suite`.
pub fn list_args(package: &str, suite: &str) -> Vec<String> {
    [
        "test", "-p", package, "--test", suite, "--", "--list", "--format", "terse", "--ignored",
    ]
    .map(String::from)
    .to_vec()
}

/// List the tests of each suite, keeping those whose name contains
/// `filter`. Suites left without tests are dropped.
pub async fn discover_tests(
    cargo: &str,
    package: &str,
    suites: &[String],
    filter: Option<&str>,
) -> Result<BTreeMap<String, SuiteInfo>> {
    info!(suites = suites.len(), "generating list of all tests");
    let mut found = BTreeMap::new();

    for suite in suites {
        let args = list_args(package, suite);
        debug!(command = %format!("{cargo} {}", args.join(" ")), "listing tests");
        let output = Command::new(cargo)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("failed to run {cargo}"))?;
        if !output.status.success() {
            bail!(
                "listing tests of suite {suite} failed ({}):\n{}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            );
        }

        let mut tests: Vec<String> = parse_test_list(&String::from_utf8_lossy(&output.stdout))
            .into_iter()
            .filter(|t| filter.is_none_or(|f| t.contains(f)))
            .collect();
        if tests.is_empty() {
            continue;
        }
        tests.sort();
        info!(suite = %suite, tests = tests.len(), "suite discovered");
        found.insert(
            suite.clone(),
            SuiteInfo {
                name: suite.clone(),
                tests,
            },
        );
    }

    info!(suites = found.len(), "total suites found");
    Ok(found)
}
