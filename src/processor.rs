use std::any::Any;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use log::{error, info};

use crate::error::ProcessError;
use crate::input_loader::ToolRecord;
use crate::researcher::Research;
use crate::results_logger::{ProcessingLogEntry, ResultsLogger};

/// Maps a 1-indexed inclusive line range onto row indices, clipping to `len`.
/// `end = None` runs to the last row. A start past the data yields an empty range.
pub fn resolve_range(len: usize, start: usize, end: Option<usize>) -> Result<Range<usize>, ProcessError> {
    if let Some(end) = end {
        if start > end {
            return Err(ProcessError::InvalidRange { start, end });
        }
    }
    let start_idx = start.max(1) - 1;
    let end_idx = end.unwrap_or(len).min(len);
    if start_idx >= end_idx {
        return Ok(start_idx.min(len)..start_idx.min(len));
    }
    Ok(start_idx..end_idx)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unexpected failure".to_string()
    }
}

/// Researches every row in the range, in order. Returns the processed rows
/// (with accepted replacements applied) and the log of what happened.
///
/// A record whose research panics keeps its original values and is logged as
/// failed; the batch carries on with the next record.
pub fn run<R: Research>(
    researcher: &mut R,
    rows: &[ToolRecord],
    start_line: usize,
    end_line: Option<usize>,
) -> Result<(Vec<ToolRecord>, ResultsLogger), ProcessError> {
    let range = resolve_range(rows.len(), start_line, end_line)?;
    let mut logger = ResultsLogger::new();
    let mut output = Vec::with_capacity(range.len());

    info!("Total rows in file: {}", rows.len());
    if range.is_empty() {
        info!("Nothing to process in lines {}..{:?}", start_line, end_line);
        return Ok((output, logger));
    }
    info!("Will process rows {} to {}", range.start + 1, range.end);

    for idx in range.clone() {
        let record = &rows[idx];
        let line_number = idx + 1;
        let name = record.display_name(line_number);
        info!("Processing {} / {} : {}", line_number, range.end, name);

        match panic::catch_unwind(AssertUnwindSafe(|| researcher.research(record))) {
            Ok(report) => {
                let entry = ProcessingLogEntry::from_report(line_number, &name, &report);
                info!("Completed #{}: {}", line_number, entry.summary);
                output.push(report.record);
                logger.record(entry);
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!("Research of #{} ({}) failed: {}", line_number, name, message);
                output.push(record.clone());
                logger.record(ProcessingLogEntry::failure(line_number, &name, &message));
            }
        }
    }

    let summary = logger.summary();
    info!(
        "Processed {} rows, changed {}, unchanged {}",
        summary.total_processed, summary.total_changed, summary.total_unchanged
    );
    Ok((output, logger))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input_loader::LinkField;
    use crate::researcher::{FieldOutcome, FieldReport, ResearchReport};
    use crate::validator::{LinkCheckResult, LinkStatus};

    /// Rewrites privacy to `<homepage>/privacy` and panics on records named "explode".
    struct Scripted {
        seen: Vec<String>,
    }

    impl Research for Scripted {
        fn research(&mut self, record: &ToolRecord) -> ResearchReport {
            self.seen.push(record.name.clone());
            if record.name == "explode" {
                panic!("socket went away");
            }
            let mut updated = record.clone();
            let new = format!("{}/privacy", record.homepage);
            updated.privacy = new.clone();
            ResearchReport {
                record: updated,
                outcomes: vec![FieldReport {
                    field: LinkField::Privacy,
                    outcome: FieldOutcome::Changed {
                        old: record.privacy.clone(),
                        check: LinkCheckResult::new(&new, LinkStatus::Valid).with_code(200),
                        new,
                    },
                }],
                note: None,
            }
        }
    }

    fn rows(names: &[&str]) -> Vec<ToolRecord> {
        names
            .iter()
            .map(|n| ToolRecord {
                name: n.to_string(),
                homepage: format!("https://{}.test", n),
                privacy: "https://old.test".into(),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn range_resolution() {
        assert_eq!(resolve_range(5, 1, Some(1)).unwrap(), 0..1);
        assert_eq!(resolve_range(5, 2, None).unwrap(), 1..5);
        assert_eq!(resolve_range(5, 0, Some(2)).unwrap(), 0..2);
        assert_eq!(resolve_range(5, 4, Some(99)).unwrap(), 3..5);
        assert!(resolve_range(5, 9, Some(12)).unwrap().is_empty());
        assert!(resolve_range(0, 1, None).unwrap().is_empty());
        assert!(matches!(
            resolve_range(5, 3, Some(2)),
            Err(ProcessError::InvalidRange { start: 3, end: 2 })
        ));
    }

    #[test]
    fn single_line_range_processes_one_record() {
        let input = rows(&["a", "b", "c", "d", "e"]);
        let mut researcher = Scripted { seen: Vec::new() };
        let (output, log) = run(&mut researcher, &input, 1, Some(1)).unwrap();

        assert_eq!(output.len(), 1);
        assert_eq!(output[0].name, "a");
        assert_eq!(output[0].privacy, "https://a.test/privacy");
        assert_eq!(researcher.seen, vec!["a"]);
        assert_eq!(log.entries().len(), 1);
        assert_eq!(log.entries()[0].line_number, 1);
    }

    #[test]
    fn keeps_order_and_positions() {
        let input = rows(&["a", "b", "c", "d"]);
        let mut researcher = Scripted { seen: Vec::new() };
        let (output, log) = run(&mut researcher, &input, 2, Some(3)).unwrap();

        let names: Vec<&str> = output.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c"]);
        let lines: Vec<usize> = log.entries().iter().map(|e| e.line_number).collect();
        assert_eq!(lines, vec![2, 3]);
    }

    #[test]
    fn failing_record_does_not_abort_batch() {
        let input = rows(&["a", "explode", "c"]);
        let mut researcher = Scripted { seen: Vec::new() };
        let (output, log) = run(&mut researcher, &input, 1, None).unwrap();

        assert_eq!(output.len(), 3);
        assert_eq!(output[1], input[1]);
        assert_eq!(output[2].privacy, "https://c.test/privacy");

        let failed = &log.entries()[1];
        assert!(failed.failed);
        assert!(failed.summary.contains("socket went away"));
        assert_eq!(log.summary().total_changed, 2);
    }

    #[test]
    fn inverted_range_is_rejected_before_any_work() {
        let input = rows(&["a", "b"]);
        let mut researcher = Scripted { seen: Vec::new() };
        assert!(run(&mut researcher, &input, 2, Some(1)).is_err());
        assert!(researcher.seen.is_empty());
    }
}
