use log::info;

use crate::delay_manager::Throttle;
use crate::error::ProcessError;
use crate::input_loader::{LinkField, ToolRecord};
use crate::processor::resolve_range;
use crate::validator::{issues_request, LinkProbe, LinkStatus};

pub const RESULTS_ROW_LABEL: &str = "[LINK CHECK RESULTS]";

#[derive(Debug, Default)]
pub struct CheckReport {
    /// All input rows, with an explanation row after each checked one.
    pub rows: Vec<ToolRecord>,
    pub checked: usize,
    /// Links that were present but did not validate.
    pub failing_links: usize,
}

/// Report-only pass: validates every link of the rows in range and annotates
/// them. Nothing is replaced.
pub fn check_rows<P: LinkProbe>(
    probe: &P,
    throttle: &mut Throttle,
    rows: &[ToolRecord],
    start_line: usize,
    end_line: Option<usize>,
) -> Result<CheckReport, ProcessError> {
    let range = resolve_range(rows.len(), start_line, end_line)?;
    let mut report = CheckReport::default();

    for (idx, record) in rows.iter().enumerate() {
        report.rows.push(record.clone());
        if !range.contains(&idx) {
            continue;
        }

        let line_number = idx + 1;
        info!("Line {}: {}", line_number, record.display_name(line_number));

        let mut explanation = ToolRecord {
            name: RESULTS_ROW_LABEL.to_string(),
            ..Default::default()
        };
        for field in LinkField::ALL {
            let url = record.link(field);
            if issues_request(url) {
                throttle.pace(field.column());
            }
            let result = probe.check(url);
            if !matches!(result.status, LinkStatus::Valid | LinkStatus::SkippedEmpty) {
                report.failing_links += 1;
            }
            info!("  {}: {}", field, result.describe());
            explanation.set_link(field, result.describe());
        }

        report.rows.push(explanation);
        report.checked += 1;
    }
    Ok(report)
}
