use std::fmt::{self, Write as _};
use std::fs;
use std::path::{Path, PathBuf};
use chrono::{DateTime, Local};
use log::info;
use serde::Serialize;

use crate::error::ProcessError;
use crate::researcher::{FieldOutcome, FieldReport, ResearchReport};

const RULE: &str = "================================================================================";
const THIN_RULE: &str = "--------------------------------------------------------------------------------";

/// What happened to one processed record.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingLogEntry {
    pub line_number: usize,
    pub tool_name: String,
    pub timestamp: DateTime<Local>,
    pub changed: bool,
    pub summary: String,
    pub fields: Vec<FieldReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Research aborted for this record; its original values were kept.
    pub failed: bool,
}

impl ProcessingLogEntry {
    pub fn from_report(line_number: usize, tool_name: &str, report: &ResearchReport) -> Self {
        ProcessingLogEntry {
            line_number,
            tool_name: tool_name.to_string(),
            timestamp: Local::now(),
            changed: report.changed_count() > 0,
            summary: report.summary(),
            fields: report.outcomes.clone(),
            note: report.note.clone(),
            failed: false,
        }
    }

    pub fn failure(line_number: usize, tool_name: &str, message: &str) -> Self {
        ProcessingLogEntry {
            line_number,
            tool_name: tool_name.to_string(),
            timestamp: Local::now(),
            changed: false,
            summary: format!("Research failed: {}", message),
            fields: Vec::new(),
            note: Some(message.to_string()),
            failed: true,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.failed || self.fields.iter().any(|f| f.outcome.is_error())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RunSummary {
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
    pub duration_seconds: f64,
    pub total_processed: usize,
    pub total_changed: usize,
    pub total_unchanged: usize,
    pub total_with_errors: usize,
}

/// Both renderings of the same log.
#[derive(Debug, Clone)]
pub struct LogExport {
    pub structured: String,
    pub narrative: String,
}

#[derive(Serialize)]
struct LogDocument<'a> {
    summary: RunSummary,
    results: &'a [ProcessingLogEntry],
}

/// Append-only collector of per-record entries. The run clock starts when the
/// logger is created.
#[derive(Debug)]
pub struct ResultsLogger {
    started_at: DateTime<Local>,
    entries: Vec<ProcessingLogEntry>,
}

impl Default for ResultsLogger {
    fn default() -> Self {
        ResultsLogger::new()
    }
}

impl ResultsLogger {
    pub fn new() -> Self {
        ResultsLogger {
            started_at: Local::now(),
            entries: Vec::new(),
        }
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn record(&mut self, entry: ProcessingLogEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ProcessingLogEntry] {
        &self.entries
    }

    pub fn summary(&self) -> RunSummary {
        let start_time = self.started_at;
        let end_time = self.entries.last().map_or(start_time, |e| e.timestamp);
        let duration_seconds = (end_time - start_time).num_milliseconds().max(0) as f64 / 1000.0;
        let total_processed = self.entries.len();
        let total_changed = self.entries.iter().filter(|e| e.changed).count();

        RunSummary {
            start_time,
            end_time,
            duration_seconds,
            total_processed,
            total_changed,
            total_unchanged: total_processed - total_changed,
            total_with_errors: self.entries.iter().filter(|e| e.has_errors()).count(),
        }
    }

    pub fn export(&self) -> Result<LogExport, ProcessError> {
        let summary = self.summary();
        let narrative = render_narrative(&summary, &self.entries)?;
        let structured = serde_json::to_string_pretty(&LogDocument {
            summary,
            results: &self.entries,
        })?;
        Ok(LogExport { structured, narrative })
    }

    /// Writes `validation_log_<timestamp>.json` and `.txt` into `dir`.
    pub fn save(&self, dir: &Path) -> Result<(PathBuf, PathBuf), ProcessError> {
        let export = self.export()?;
        fs::create_dir_all(dir)?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let json_path = dir.join(format!("validation_log_{}.json", stamp));
        let txt_path = dir.join(format!("validation_log_{}.txt", stamp));
        fs::write(&json_path, export.structured)?;
        fs::write(&txt_path, export.narrative)?;

        info!("Results log: {:?} / {:?}", json_path, txt_path);
        Ok((json_path, txt_path))
    }
}

fn fmt_time(t: DateTime<Local>) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn render_field(out: &mut String, report: &FieldReport) -> fmt::Result {
    let label = report.field.column();
    match &report.outcome {
        FieldOutcome::Unchanged { check } => {
            writeln!(out, "  * {}: unchanged ({})", label, check.describe())
        }
        FieldOutcome::SkippedEmpty => writeln!(out, "  * {}: skipped (no URL)", label),
        FieldOutcome::Changed { old, new, check } => writeln!(
            out,
            "  * {}: changed ({})\n      Old: {}\n      New: {}",
            label,
            check.describe(),
            old,
            new
        ),
        FieldOutcome::Error { reason, check, replacement } => {
            writeln!(out, "  * {}: error, {} ({}: {})", label, reason, check.url, check.describe())?;
            match replacement {
                Some(r) => writeln!(out, "      Tried: {} ({})", r.url, r.describe()),
                None => Ok(()),
            }
        }
    }
}

fn render_narrative(summary: &RunSummary, entries: &[ProcessingLogEntry]) -> Result<String, fmt::Error> {
    let mut out = String::new();
    writeln!(out, "{}\nLINK VALIDATION LOG\n{}\n", RULE, RULE)?;

    writeln!(out, "SUMMARY\n{}", THIN_RULE)?;
    writeln!(out, "Start Time:        {}", fmt_time(summary.start_time))?;
    writeln!(out, "End Time:          {}", fmt_time(summary.end_time))?;
    writeln!(out, "Duration:          {:.2} seconds", summary.duration_seconds)?;
    writeln!(out, "Total Processed:   {}", summary.total_processed)?;
    writeln!(out, "Total Changed:     {}", summary.total_changed)?;
    writeln!(out, "Total Unchanged:   {}", summary.total_unchanged)?;
    writeln!(out, "With Errors:       {}\n\n", summary.total_with_errors)?;

    writeln!(out, "DETAILED RESULTS\n{}\n", RULE)?;
    for entry in entries {
        writeln!(out, "Line #{}: {}\n{}", entry.line_number, entry.tool_name, THIN_RULE)?;
        writeln!(out, "Changed: {}", if entry.changed { "YES" } else { "NO" })?;
        writeln!(out, "Summary: {}", entry.summary)?;
        writeln!(out, "Timestamp: {}", entry.timestamp.format("%Y-%m-%d %H:%M:%S"))?;
        if let Some(note) = &entry.note {
            writeln!(out, "Note: {}", note)?;
        }
        if !entry.fields.is_empty() {
            writeln!(out, "\nFields:")?;
            for field in &entry.fields {
                render_field(&mut out, field)?;
            }
        }
        out.push('\n');
    }
    Ok(out)
}
