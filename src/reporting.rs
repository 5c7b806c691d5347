use crate::checker::DocumentOutcome;
use crate::finding::{Finding, Severity};
use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Duration;

/// Formats a message with mdBook-style timestamp and prefix.
fn format_log(level: &str, message: &str) -> String {
    format!(
        "{} [{}] (snippet_check): {}",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        level,
        message
    )
}

/// Aggregated result of one run.
///
/// Findings are sorted by `(path, line, kind, message)` so the output does
/// not depend on the order documents finished in.
#[derive(Debug, Clone, Default)]
pub struct Report {
    findings: Vec<Finding>,
    documents: usize,
    blocks: BTreeMap<String, usize>,
    elapsed: Duration,
    timings: Vec<(String, Duration)>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    findings: &'a [Finding],
    documents: usize,
    blocks: &'a BTreeMap<String, usize>,
    errors: usize,
    warnings: usize,
}

impl Report {
    pub fn new(outcomes: Vec<DocumentOutcome>, elapsed: Duration) -> Self {
        let mut report = Report {
            documents: outcomes.len(),
            elapsed,
            ..Report::default()
        };

        for outcome in outcomes {
            for (language, count) in outcome.checked {
                *report.blocks.entry(language).or_insert(0) += count;
            }
            report
                .timings
                .push((outcome.path.display().to_string(), outcome.duration));
            report.findings.extend(outcome.findings);
        }

        report.findings.sort_by(|a, b| {
            (a.path(), a.line(), a.kind(), a.message()).cmp(&(
                b.path(),
                b.line(),
                b.kind(),
                b.message(),
            ))
        });
        report.timings.sort();
        report
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Number of documents checked
    pub fn documents(&self) -> usize {
        self.documents
    }

    /// Validated blocks per language
    pub fn blocks(&self) -> &BTreeMap<String, usize> {
        &self.blocks
    }

    fn count(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity() == severity)
            .count()
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// `1` when any finding is an error, `0` otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.has_errors() {
            1
        } else {
            0
        }
    }

    /// One `path:line:severity:kind: message` line per finding.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for finding in &self.findings {
            // Writing to a String cannot fail.
            let _ = writeln!(out, "{}", finding);
        }
        out
    }

    pub fn render_json(&self) -> Result<String> {
        let json = JsonReport {
            findings: &self.findings,
            documents: self.documents,
            blocks: &self.blocks,
            errors: self.error_count(),
            warnings: self.warning_count(),
        };
        serde_json::to_string_pretty(&json).context("Failed to serialize report")
    }

    /// Logs every finding to stderr in mdBook's format.
    pub fn print_findings(&self) {
        for finding in &self.findings {
            let level = match finding.severity() {
                Severity::Error => "ERROR",
                Severity::Warning => "WARN",
                Severity::Info => "INFO",
            };
            eprintln!("{}", format_log(level, &finding.to_string()));
        }
    }

    /// Prints run statistics to stderr.
    ///
    /// Shows:
    /// - Total blocks validated with per-language counts
    /// - Total time and average time per document
    /// - Individual document timings (RUST_LOG=debug)
    pub fn print_statistics(&self) {
        let total_blocks: usize = self.blocks.values().sum();

        if total_blocks == 0 {
            eprintln!("{}", format_log("INFO", "No code blocks found to validate"));
        } else {
            // Format: "csharp: 2, json: 1, rust: 3"
            let stats_str = self
                .blocks
                .iter()
                .map(|(lang, count)| format!("{}: {}", lang, count))
                .collect::<Vec<_>>()
                .join(", ");

            eprintln!(
                "{}",
                format_log(
                    "INFO",
                    &format!(
                        "Validated {} code block(s) in {} document(s) ({})",
                        total_blocks, self.documents, stats_str
                    )
                )
            );
        }

        let sum: Duration = self.timings.iter().map(|(_, d)| *d).sum();
        let avg_ms = if self.timings.is_empty() {
            0
        } else {
            sum.as_millis() / self.timings.len() as u128
        };
        eprintln!(
            "{}",
            format_log(
                "INFO",
                &format!(
                    "Found {} error(s), {} warning(s); finished in {}ms (avg {}ms per document)",
                    self.error_count(),
                    self.warning_count(),
                    self.elapsed.as_millis(),
                    avg_ms
                )
            )
        );

        log::debug!("Individual document timings:");
        for (path, duration) in &self.timings {
            log::debug!("[CHECK_TIME] {}: {}ms", path, duration.as_millis());
        }
    }
}
