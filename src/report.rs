//! Benchmark results and the sink that collects and prints them.

use chrono::{DateTime, Utc};
use colored::*;
use serde::Serialize;
use std::io::Write;

use crate::engine::{RunStage, VariantFailure};
use crate::error::BenchResult;
use crate::probe::StatementCount;
use crate::variant::ConfigVariant;

/// Everything measured for one variant. Built once, never modified.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkResult {
    pub variant: ConfigVariant,
    pub implementation_label: String,
    pub object_reused: bool,
    pub elapsed_millis: u64,
    pub iterations: u32,
    pub rows_drained: u64,
    pub server_statement_count: StatementCount,
    pub started_at: DateTime<Utc>,
}

/// Report output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// One block per variant, written as soon as the variant finishes
    #[default]
    Text,
    /// A single JSON document written on finalize
    Json,
}

/// A recorded variant failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecord {
    pub variant: ConfigVariant,
    pub stage: RunStage,
    pub kind: &'static str,
    pub error: String,
}

impl From<&VariantFailure> for FailureRecord {
    fn from(f: &VariantFailure) -> Self {
        Self {
            variant: f.variant.clone(),
            stage: f.stage,
            kind: f.error.kind(),
            error: f.error.to_string(),
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    results: &'a [BenchmarkResult],
    failures: &'a [FailureRecord],
}

/// Accumulates results in execution order and formats them.
pub struct ReportSink<W: Write> {
    out: W,
    format: OutputFormat,
    results: Vec<BenchmarkResult>,
    failures: Vec<FailureRecord>,
}

impl<W: Write> ReportSink<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self {
            out,
            format,
            results: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn record(&mut self, result: BenchmarkResult) -> BenchResult<()> {
        if self.format == OutputFormat::Text {
            write_result(&mut self.out, &result)?;
        }
        self.results.push(result);
        Ok(())
    }

    pub fn record_failure(&mut self, failure: &VariantFailure) -> BenchResult<()> {
        let record = FailureRecord::from(failure);
        if self.format == OutputFormat::Text {
            write_failure(&mut self.out, &record)?;
        }
        self.failures.push(record);
        Ok(())
    }

    pub fn results(&self) -> &[BenchmarkResult] {
        &self.results
    }

    pub fn failures(&self) -> &[FailureRecord] {
        &self.failures
    }

    /// Flush any deferred output and hand back the results in run order.
    pub fn finalize(mut self) -> BenchResult<(Vec<BenchmarkResult>, W)> {
        match self.format {
            OutputFormat::Json => {
                let report = JsonReport {
                    results: &self.results,
                    failures: &self.failures,
                };
                let json = serde_json::to_string_pretty(&report)
                    .map_err(|e| std::io::Error::other(e.to_string()))?;
                writeln!(self.out, "{}", json)?;
            }
            OutputFormat::Text => {
                if !self.results.is_empty() {
                    write_summary(&mut self.out, &self.results)?;
                }
            }
        }
        self.out.flush()?;
        Ok((self.results, self.out))
    }
}

fn write_result(out: &mut impl Write, r: &BenchmarkResult) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "═".repeat(52).dimmed())?;
    writeln!(out, "{} {}", "Variant:".cyan().bold(), r.variant.name.white().bold())?;
    writeln!(out, "  {} {}", "Properties:".dimmed(), r.variant.properties().yellow())?;
    writeln!(out, "  {} {}", "Implementation:".dimmed(), r.implementation_label)?;
    let reused = if r.object_reused {
        "true".green()
    } else {
        "false".red()
    };
    writeln!(out, "  {} {}", "Object reused:".dimmed(), reused)?;
    writeln!(
        out,
        "  {} {} iterations in {} ms ({} rows)",
        "Elapsed:".dimmed(),
        r.iterations,
        r.elapsed_millis.to_string().cyan(),
        r.rows_drained
    )?;
    writeln!(
        out,
        "  {} {}",
        "Server prepared statements:".dimmed(),
        r.server_statement_count
    )?;
    Ok(())
}

fn write_failure(out: &mut impl Write, f: &FailureRecord) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "═".repeat(52).dimmed())?;
    writeln!(out, "{} {}", "Variant:".cyan().bold(), f.variant.name.white().bold())?;
    writeln!(out, "  {} {}", "Properties:".dimmed(), f.variant.properties().yellow())?;
    writeln!(
        out,
        "  {} after {:?}: {}",
        "✗ Failed".red().bold(),
        f.stage,
        f.error
    )?;
    Ok(())
}

fn write_summary(out: &mut impl Write, results: &[BenchmarkResult]) -> std::io::Result<()> {
    let width = results
        .iter()
        .map(|r| r.variant.name.len())
        .max()
        .unwrap_or(0)
        .max("Variant".len());

    writeln!(out)?;
    writeln!(
        out,
        "{:width$} │ {:>6} │ {:>10} │ {:>9}",
        "Variant",
        "Reused",
        "Elapsed ms",
        "Server",
        width = width
    )?;
    writeln!(
        out,
        "{}─┼─{}─┼─{}─┼─{}",
        "─".repeat(width),
        "─".repeat(6),
        "─".repeat(10),
        "─".repeat(9)
    )?;
    for r in results {
        writeln!(
            out,
            "{:width$} │ {:>6} │ {:>10} │ {:>9}",
            r.variant.name,
            r.object_reused,
            r.elapsed_millis,
            r.server_statement_count.to_string(),
            width = width
        )?;
    }
    Ok(())
}
