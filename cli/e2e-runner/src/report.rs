//! JUnit reports and the end-of-run summary.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;
use tabled::{Table, Tabled};
use tracing::info;

use crate::discover::SuiteInfo;

pub const MERGED_REPORT: &str = "junit_e2e_test.xml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed,
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub name: String,
    pub outcome: Outcome,
}

/// What one suite run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteResult {
    pub suite: String,
    pub worker_id: u32,
    pub exit_code: i32,
    pub duration: Duration,
    pub cases: Vec<TestCase>,
}

impl SuiteResult {
    pub fn count(&self, outcome: Outcome) -> usize {
        self.cases.iter().filter(|c| c.outcome == outcome).count()
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// A libtest result line: `test <name> ... ok|FAILED|ignored`.
pub fn parse_test_result_line(line: &str) -> Option<TestCase> {
    let rest = line.trim().strip_prefix("test ")?;
    let (name, result) = rest.rsplit_once(" ... ")?;
    let outcome = match result.trim() {
        "ok" => Outcome::Passed,
        "FAILED" => Outcome::Failed,
        r if r.starts_with("ignored") => Outcome::Ignored,
        _ => return None,
    };
    Some(TestCase {
        name: name.to_string(),
        outcome,
    })
}

pub fn suite_report_path(dir: &Path, suite: &str) -> PathBuf {
    dir.join(format!("junit_{suite}.xml"))
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// JUnit document for one suite. Expected tests that produced no result
/// line (for example after a crash) are reported as failures.
pub fn junit_for_suite(result: &SuiteResult, expected: &[String]) -> String {
    let mut cases = result.cases.clone();
    for name in expected {
        if !cases.iter().any(|c| &c.name == name) {
            cases.push(TestCase {
                name: name.clone(),
                outcome: Outcome::Failed,
            });
        }
    }
    let failures = cases.iter().filter(|c| c.outcome == Outcome::Failed).count();
    let skipped = cases.iter().filter(|c| c.outcome == Outcome::Ignored).count();

    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<testsuites>\n");
    xml.push_str(&format!(
        "  <testsuite name=\"{}\" tests=\"{}\" failures=\"{failures}\" skipped=\"{skipped}\" time=\"{:.3}\">\n",
        escape_xml(&result.suite),
        cases.len(),
        result.duration.as_secs_f64()
    ));
    for case in &cases {
        let open = format!(
            "    <testcase classname=\"{}\" name=\"{}\"",
            escape_xml(&result.suite),
            escape_xml(&case.name)
        );
        match case.outcome {
            Outcome::Passed => xml.push_str(&format!("{open}/>\n")),
            Outcome::Failed => xml.push_str(&format!(
                "{open}>\n      <failure message=\"test failed on worker {}\"/>\n    </testcase>\n",
                result.worker_id
            )),
            Outcome::Ignored => xml.push_str(&format!("{open}>\n      <skipped/>\n    </testcase>\n")),
        }
    }
    xml.push_str("  </testsuite>\n</testsuites>\n");
    xml
}

pub fn write_suite_report(dir: &Path, result: &SuiteResult, expected: &[String]) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = suite_report_path(dir, &result.suite);
    fs::write(&path, junit_for_suite(result, expected))
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

/// Concatenate the `<testsuite>` blocks of every suite report into
/// `junit_e2e_test.xml`. Missing suite reports are skipped.
pub fn merge_reports(suites: &[SuiteInfo], dir: &Path) -> Result<PathBuf> {
    info!("merging JUnit reports");
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let merged = dir.join(MERGED_REPORT);
    let mut out = fs::File::create(&merged)
        .with_context(|| format!("failed to create merged report {}", merged.display()))?;

    writeln!(out, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
    writeln!(out, "<testsuites>")?;
    for suite in suites {
        let Ok(report) = fs::read_to_string(suite_report_path(dir, &suite.name)) else {
            continue;
        };
        let mut in_suite = false;
        for line in report.lines() {
            if line.contains("<testsuite") && !line.contains("<testsuites") {
                in_suite = true;
            }
            if in_suite {
                writeln!(out, "{line}")?;
            }
            if line.contains("</testsuite>") {
                in_suite = false;
            }
        }
    }
    writeln!(out, "</testsuites>")?;

    info!(path = %merged.display(), "merged report saved");
    Ok(merged)
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Suite")]
    suite: String,
    #[tabled(rename = "Worker")]
    worker: u32,
    #[tabled(rename = "Passed")]
    passed: usize,
    #[tabled(rename = "Failed")]
    failed: usize,
    #[tabled(rename = "Ignored")]
    ignored: usize,
    #[tabled(rename = "Duration")]
    duration: String,
    #[tabled(rename = "Result")]
    result: String,
}

pub fn summary_table(results: &[SuiteResult]) -> String {
    let rows: Vec<SummaryRow> = results
        .iter()
        .map(|r| SummaryRow {
            suite: r.suite.clone(),
            worker: r.worker_id,
            passed: r.count(Outcome::Passed),
            failed: r.count(Outcome::Failed),
            ignored: r.count(Outcome::Ignored),
            duration: format!("{:.1}s", r.duration.as_secs_f64()),
            result: if r.succeeded() {
                "ok".green().to_string()
            } else {
                format!("exit {}", r.exit_code).red().bold().to_string()
            },
        })
        .collect();
    Table::new(rows).to_string()
}

pub fn print_summary(results: &[SuiteResult]) {
    if results.is_empty() {
        println!("{}", "No suites were run.".dimmed());
        return;
    }
    println!("{}", summary_table(results));
    if results.iter().all(SuiteResult::succeeded) {
        println!("{} all test suites completed successfully", "Success:".green().bold());
    } else {
        println!("{} some test suites failed", "Error:".red().bold());
    }
}
