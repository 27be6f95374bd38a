//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use atlas_core::{AnalysisResult, Severity, UsageClass};
use atlas_runtime::{ProgressEvent, ProgressSink, StepStatus};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that destructors run before the process ends.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; nothing user-facing to print.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Progress sink drawing an indicatif bar on stderr
pub(crate) struct BarSink {
    bar: ProgressBar,
}

impl BarSink {
    pub(crate) fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self { bar }
    }

    pub(crate) fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressSink for BarSink {
    fn emit(&self, event: ProgressEvent) {
        self.bar.set_length(event.total as u64);
        match event.status {
            StepStatus::Running => {
                self.bar.set_position(event.current.saturating_sub(1) as u64);
                self.bar.set_message(event.step);
            }
            StepStatus::Completed => self.bar.set_position(event.current as u64),
            StepStatus::Failed => {
                self.bar.set_position(event.current as u64);
                self.bar.println(format!("  ✗ {} failed", event.step));
            }
        }
    }
}

/// Split a comma-separated list, dropping blanks and duplicates
pub(crate) fn parse_list(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !out.iter().any(|o| o == item) {
            out.push(item.to_string());
        }
    }
    out
}

/// Pretty JSON to stdout, or to `out` when given
pub(crate) fn write_json<T: Serialize>(value: &T, out: Option<&str>) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    match out {
        Some(path) => {
            std::fs::write(Path::new(path), json)
                .with_context(|| format!("Failed to write {}", path))?;
            println!("Wrote {}", path);
        }
        None => println!("{}", json),
    }
    Ok(())
}

/// Human-readable summary of a result, one line per entry
pub(crate) fn summary_lines(result: &AnalysisResult) -> Vec<String> {
    let mut lines = vec![format!(
        "{} {} ({})",
        if result.server_mode { "Server" } else { "Database" },
        result.target,
        result.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    )];

    if result.server_mode {
        lines.push(format!(
            "  Databases: {} analyzed, {} failed",
            result.databases.len(),
            result.failed_databases.len()
        ));
        for failure in &result.failed_databases {
            lines.push(format!("    ✗ {}: {}", failure.database, failure.error));
        }
    }

    if let Some(schema) = &result.schema {
        lines.push(format!(
            "  Schema: {} tables, {} views, {} procedures, {} functions, {} triggers, {} synonyms, {} jobs",
            schema.tables.len(),
            schema.views.len(),
            schema.procedures.len(),
            schema.functions.len(),
            schema.triggers.len(),
            schema.synonyms.len(),
            schema.jobs.len()
        ));
    }
    if let Some(profiles) = &result.profiles {
        let rows: i64 = profiles.iter().filter_map(|p| p.row_count).sum();
        lines.push(format!("  Profiles: {} tables, {} rows", profiles.len(), rows));
    }
    if let Some(graph) = &result.relationships {
        let external = graph
            .nodes
            .iter()
            .filter(|n| n.external_database.is_some())
            .count();
        lines.push(format!(
            "  Relationships: {} declared, {} implicit, {} dependencies, {} objects ({} external)",
            graph.explicit.len(),
            graph.implicit.len(),
            graph.dependencies.len(),
            graph.nodes.len(),
            external
        ));
    }
    if let Some(issues) = &result.quality_issues {
        let count = |sev: Severity| issues.iter().filter(|i| i.severity == sev).count();
        lines.push(format!(
            "  Quality: {} errors, {} warnings, {} info",
            count(Severity::Error),
            count(Severity::Warning),
            count(Severity::Info)
        ));
    }
    if let Some(usage) = &result.usage {
        let count = |class: UsageClass| {
            usage
                .objects
                .iter()
                .filter(|o| o.classification == class)
                .count()
        };
        lines.push(format!(
            "  Usage: {} active, {} low, {} unused, {} unknown",
            count(UsageClass::Active),
            count(UsageClass::Low),
            count(UsageClass::Unused),
            count(UsageClass::Unknown)
        ));
        if !usage.skipped_signals.is_empty() {
            lines.push(format!(
                "    skipped signals: {}",
                usage.skipped_signals.join(", ")
            ));
        }
    }
    if let Some(indexes) = &result.indexes {
        lines.push(format!(
            "  Indexes: {} inventoried, {} recommendations{}",
            indexes.inventory.len(),
            indexes.recommendations.len(),
            if indexes.telemetry_available {
                ""
            } else {
                " (no usage telemetry)"
            }
        ));
    }
    lines
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
