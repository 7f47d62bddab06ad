use std::fmt;
use log::{info, warn};
use serde::Serialize;

use crate::config::HttpConfig;
use crate::delay_manager::Throttle;
use crate::error::ProcessError;
use crate::fetcher::{CandidateLink, ContentFetcher, PageSource};
use crate::input_loader::{LinkField, ToolRecord};
use crate::matcher;
use crate::validator::{issues_request, LinkCheckResult, LinkProbe, LinkStatus, UrlValidator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorReason {
    /// The homepage itself failed validation. It is never replaced.
    BrokenHomepage,
    /// Nothing on the homepage matched the field's keywords, or the homepage
    /// content was not available.
    NoReplacementFound,
    /// The best candidate did not validate.
    ReplacementInvalid,
}

impl fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorReason::BrokenHomepage => "broken homepage",
            ErrorReason::NoReplacementFound => "no replacement found",
            ErrorReason::ReplacementInvalid => "replacement invalid",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum FieldOutcome {
    Unchanged {
        check: LinkCheckResult,
    },
    SkippedEmpty,
    Changed {
        old: String,
        new: String,
        check: LinkCheckResult,
    },
    Error {
        reason: ErrorReason,
        check: LinkCheckResult,
        #[serde(skip_serializing_if = "Option::is_none")]
        replacement: Option<LinkCheckResult>,
    },
}

impl FieldOutcome {
    pub fn is_changed(&self) -> bool {
        matches!(self, FieldOutcome::Changed { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, FieldOutcome::Error { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldReport {
    pub field: LinkField,
    #[serde(flatten)]
    pub outcome: FieldOutcome,
}

/// Result of researching one record.
#[derive(Debug, Clone)]
pub struct ResearchReport {
    pub record: ToolRecord,
    pub outcomes: Vec<FieldReport>,
    /// Record-level remark, e.g. why the homepage content was unavailable.
    pub note: Option<String>,
}

impl ResearchReport {
    pub fn changed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.outcome.is_changed()).count()
    }

    pub fn summary(&self) -> String {
        summary_sentence(&self.outcomes)
    }
}

/// "All links valid" when nothing failed or changed, otherwise "Updated N field(s)".
pub fn summary_sentence(outcomes: &[FieldReport]) -> String {
    let all_fine = outcomes.iter().all(|o| {
        matches!(o.outcome, FieldOutcome::Unchanged { .. } | FieldOutcome::SkippedEmpty)
    });
    if all_fine {
        "All links valid".to_string()
    } else {
        let changed = outcomes.iter().filter(|o| o.outcome.is_changed()).count();
        format!("Updated {} field(s)", changed)
    }
}

/// Processes one record at a time.
pub trait Research {
    fn research(&mut self, record: &ToolRecord) -> ResearchReport;
}

pub struct LinkResearcher<P, S> {
    probe: P,
    source: S,
    throttle: Throttle,
}

impl LinkResearcher<UrlValidator, ContentFetcher> {
    pub fn from_config(config: &HttpConfig) -> Result<Self, ProcessError> {
        Ok(LinkResearcher::new(
            UrlValidator::new(config.clone())?,
            ContentFetcher::new(config.clone())?,
            Throttle::new(config.delay),
        ))
    }
}

impl<P: LinkProbe, S: PageSource> LinkResearcher<P, S> {
    pub fn new(probe: P, source: S, throttle: Throttle) -> Self {
        LinkResearcher { probe, source, throttle }
    }

    fn check(&mut self, url: &str, step: &str) -> LinkCheckResult {
        if issues_request(url) {
            self.throttle.pace(step);
        }
        self.probe.check(url)
    }

    fn research_homepage(&mut self, homepage: &str) -> (FieldOutcome, Vec<CandidateLink>, Option<String>) {
        info!("    Checking homepage: {}", homepage);
        let check = self.check(homepage, "homepage check");

        match check.status {
            LinkStatus::SkippedEmpty => {
                warn!("    No homepage listed");
                (FieldOutcome::SkippedEmpty, Vec::new(), None)
            }
            LinkStatus::Valid => {
                self.throttle.pace("homepage fetch");
                match self.source.fetch(homepage) {
                    Ok(page) => {
                        info!("    Found {} links on homepage", page.candidates.len());
                        (FieldOutcome::Unchanged { check }, page.candidates, None)
                    }
                    Err(e) => {
                        warn!("    Could not fetch homepage content: {}", e);
                        let note = format!("Could not fetch homepage content: {}", e);
                        (FieldOutcome::Unchanged { check }, Vec::new(), Some(note))
                    }
                }
            }
            _ => {
                warn!("    Homepage invalid ({})", check.describe());
                let outcome = FieldOutcome::Error {
                    reason: ErrorReason::BrokenHomepage,
                    check,
                    replacement: None,
                };
                (outcome, Vec::new(), None)
            }
        }
    }

    fn research_field(
        &mut self,
        field: LinkField,
        record: &mut ToolRecord,
        candidates: &[CandidateLink],
    ) -> FieldOutcome {
        let current = record.link(field).trim().to_string();
        if current.is_empty() {
            return FieldOutcome::SkippedEmpty;
        }

        let check = self.check(&current, field.column());
        if check.is_valid() {
            info!("    {}: valid", field);
            return FieldOutcome::Unchanged { check };
        }
        warn!("    {}: {} ({})", field, check.status, check.describe());

        let candidate = match matcher::best_match(candidates, field, &current) {
            Some((candidate, _)) => candidate.resolved_url.to_string(),
            None => {
                warn!("    {}: no replacement found", field);
                return FieldOutcome::Error {
                    reason: ErrorReason::NoReplacementFound,
                    check,
                    replacement: None,
                };
            }
        };

        let replacement = self.check(&candidate, "replacement check");
        if replacement.is_valid() {
            info!("    {}: replaced with {}", field, candidate);
            record.set_link(field, candidate.clone());
            FieldOutcome::Changed {
                old: current,
                new: candidate,
                check: replacement,
            }
        } else {
            warn!("    {}: candidate {} is {}", field, candidate, replacement.status);
            FieldOutcome::Error {
                reason: ErrorReason::ReplacementInvalid,
                check,
                replacement: Some(replacement),
            }
        }
    }
}

impl<P: LinkProbe, S: PageSource> Research for LinkResearcher<P, S> {
    fn research(&mut self, record: &ToolRecord) -> ResearchReport {
        let mut updated = record.clone();
        let mut outcomes = Vec::with_capacity(LinkField::ALL.len());

        let (homepage, candidates, note) = self.research_homepage(record.homepage.trim());
        outcomes.push(FieldReport {
            field: LinkField::Homepage,
            outcome: homepage,
        });

        for field in LinkField::REPLACEABLE {
            let outcome = self.research_field(field, &mut updated, &candidates);
            outcomes.push(FieldReport { field, outcome });
        }

        ResearchReport {
            record: updated,
            outcomes,
            note,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::time::Duration;
    use url::Url;
    use crate::error::FetchError;
    use crate::fetcher::FetchedPage;

    #[derive(Default)]
    struct FakeProbe {
        valid: Vec<&'static str>,
        calls: RefCell<Vec<String>>,
    }

    impl LinkProbe for FakeProbe {
        fn check(&self, url: &str) -> LinkCheckResult {
            let url = url.trim();
            if url.is_empty() {
                return LinkCheckResult::new(url, LinkStatus::SkippedEmpty);
            }
            self.calls.borrow_mut().push(url.to_string());
            if self.valid.iter().any(|v| *v == url) {
                LinkCheckResult::new(url, LinkStatus::Valid).with_code(200)
            } else {
                LinkCheckResult::new(url, LinkStatus::Broken).with_code(404)
            }
        }
    }

    struct FakeSource {
        pages: HashMap<&'static str, Vec<(&'static str, &'static str)>>,
        fetches: Cell<usize>,
    }

    impl FakeSource {
        fn new(pages: Vec<(&'static str, Vec<(&'static str, &'static str)>)>) -> Self {
            FakeSource {
                pages: pages.into_iter().collect(),
                fetches: Cell::new(0),
            }
        }
    }

    impl PageSource for FakeSource {
        fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
            self.fetches.set(self.fetches.get() + 1);
            let anchors = self.pages.get(url).ok_or(FetchError::Status(500))?;
            let base = Url::parse(url).unwrap();
            let candidates = anchors
                .iter()
                .map(|(text, href)| CandidateLink {
                    anchor_text: text.to_string(),
                    href: href.to_string(),
                    resolved_url: base.join(href).unwrap(),
                })
                .collect();
            Ok(FetchedPage { final_url: base, html: String::new(), candidates })
        }
    }

    const HOME: &str = "https://tool.example/";

    fn record() -> ToolRecord {
        ToolRecord {
            name: "Tool".into(),
            homepage: HOME.into(),
            privacy: "https://tool.example/old-privacy".into(),
            gdpr: String::new(),
            storage: "https://tool.example/hosting".into(),
            dpa: "https://tool.example/old-dpa".into(),
        }
    }

    fn standard_page() -> Vec<(&'static str, Vec<(&'static str, &'static str)>)> {
        vec![(HOME, vec![
            ("Privacy Policy", "/privacy"),
            ("Terms", "/terms"),
            ("GDPR Info", "/gdpr-info"),
            ("Data Processing Agreement", "/legal/dpa"),
        ])]
    }

    fn researcher(probe: FakeProbe, source: FakeSource) -> LinkResearcher<FakeProbe, FakeSource> {
        LinkResearcher::new(probe, source, Throttle::new(Duration::ZERO))
    }

    fn outcome(report: &ResearchReport, field: LinkField) -> &FieldOutcome {
        &report.outcomes.iter().find(|o| o.field == field).unwrap().outcome
    }

    #[test]
    fn valid_links_stay_unchanged() {
        let probe = FakeProbe {
            valid: vec![HOME, "https://tool.example/old-privacy", "https://tool.example/hosting", "https://tool.example/old-dpa"],
            ..Default::default()
        };
        let mut r = researcher(probe, FakeSource::new(standard_page()));
        let report = r.research(&record());

        assert_eq!(report.record, record());
        assert_eq!(report.summary(), "All links valid");
        assert_eq!(outcome(&report, LinkField::Gdpr), &FieldOutcome::SkippedEmpty);
        assert!(matches!(outcome(&report, LinkField::Privacy), FieldOutcome::Unchanged { .. }));
        assert_eq!(r.source.fetches.get(), 1);
    }

    #[test]
    fn broken_fields_are_replaced_from_homepage() {
        let probe = FakeProbe {
            valid: vec![HOME, "https://tool.example/privacy", "https://tool.example/hosting", "https://tool.example/legal/dpa"],
            ..Default::default()
        };
        let mut r = researcher(probe, FakeSource::new(standard_page()));
        let report = r.research(&record());

        assert_eq!(report.record.privacy, "https://tool.example/privacy");
        assert_eq!(report.record.dpa, "https://tool.example/legal/dpa");
        assert_eq!(report.record.gdpr, "");
        assert_eq!(report.changed_count(), 2);
        assert_eq!(report.summary(), "Updated 2 field(s)");
        match outcome(&report, LinkField::Privacy) {
            FieldOutcome::Changed { old, new, check } => {
                assert_eq!(old, "https://tool.example/old-privacy");
                assert_eq!(new, "https://tool.example/privacy");
                assert!(check.is_valid());
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn invalid_candidate_is_not_applied_and_not_retried() {
        // /privacy matches best but is itself broken; /legal/dpa would also
        // score for privacy ("legal") but must not be tried.
        let probe = FakeProbe {
            valid: vec![HOME, "https://tool.example/hosting", "https://tool.example/old-dpa", "https://tool.example/legal/dpa"],
            ..Default::default()
        };
        let mut r = researcher(probe, FakeSource::new(standard_page()));
        let report = r.research(&record());

        assert_eq!(report.record.privacy, "https://tool.example/old-privacy");
        match outcome(&report, LinkField::Privacy) {
            FieldOutcome::Error { reason, replacement, .. } => {
                assert_eq!(*reason, ErrorReason::ReplacementInvalid);
                assert_eq!(replacement.as_ref().unwrap().url, "https://tool.example/privacy");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        let calls = r.probe.calls.borrow();
        assert_eq!(calls.iter().filter(|u| u.contains("/legal/dpa")).count(), 0);
        assert_eq!(report.summary(), "Updated 0 field(s)");
    }

    #[test]
    fn broken_homepage_is_not_fetched_or_replaced() {
        let probe = FakeProbe {
            valid: vec!["https://tool.example/hosting"],
            ..Default::default()
        };
        let mut r = researcher(probe, FakeSource::new(standard_page()));
        let report = r.research(&record());

        assert_eq!(r.source.fetches.get(), 0);
        assert_eq!(report.record, record());
        assert!(matches!(
            outcome(&report, LinkField::Homepage),
            FieldOutcome::Error { reason: ErrorReason::BrokenHomepage, .. }
        ));
        assert!(matches!(
            outcome(&report, LinkField::Privacy),
            FieldOutcome::Error { reason: ErrorReason::NoReplacementFound, .. }
        ));
        assert!(matches!(outcome(&report, LinkField::Storage), FieldOutcome::Unchanged { .. }));
    }

    #[test]
    fn fetch_failure_turns_broken_fields_into_errors() {
        let probe = FakeProbe {
            valid: vec![HOME],
            ..Default::default()
        };
        let mut r = researcher(probe, FakeSource::new(vec![]));
        let mut rec = record();
        rec.gdpr = "https://tool.example/old-gdpr".into();
        let report = r.research(&rec);

        assert!(report.note.as_deref().unwrap().contains("HTTP 500"));
        for field in LinkField::REPLACEABLE {
            assert!(matches!(
                outcome(&report, field),
                FieldOutcome::Error { reason: ErrorReason::NoReplacementFound, .. }
            ), "{} should be an error", field);
        }
        assert_eq!(report.record, rec);
    }

    #[test]
    fn summary_counts_only_changes() {
        let skipped = FieldReport { field: LinkField::Gdpr, outcome: FieldOutcome::SkippedEmpty };
        assert_eq!(summary_sentence(&[skipped.clone()]), "All links valid");
        assert_eq!(summary_sentence(&[]), "All links valid");

        let err = FieldReport {
            field: LinkField::Dpa,
            outcome: FieldOutcome::Error {
                reason: ErrorReason::NoReplacementFound,
                check: LinkCheckResult::new("x", LinkStatus::Timeout),
                replacement: None,
            },
        };
        assert_eq!(summary_sentence(&[skipped, err]), "Updated 0 field(s)");
    }

    #[test]
    fn outcome_serializes_with_field_and_tag() {
        let report = FieldReport {
            field: LinkField::Privacy,
            outcome: FieldOutcome::Changed {
                old: "a".into(),
                new: "b".into(),
                check: LinkCheckResult::new("b", LinkStatus::Valid).with_code(200),
            },
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["field"], "privacy");
        assert_eq!(json["outcome"], "changed");
        assert_eq!(json["new"], "b");
        assert_eq!(json["check"]["status"], "valid");
    }
}
