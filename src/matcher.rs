use crate::fetcher::CandidateLink;
use crate::input_loader::LinkField;

/// Keywords that mark a link as a plausible replacement for `field`.
/// Multi-word keywords also match hyphenated or underscored URL paths.
pub fn keywords(field: LinkField) -> &'static [&'static str] {
    match field {
        LinkField::Homepage => &[],
        LinkField::Privacy => &["privacy", "datenschutz", "legal", "policy"],
        LinkField::Gdpr => &["gdpr", "dsgvo", "data protection"],
        LinkField::Storage => &["storage", "hosting", "server", "infrastructure"],
        LinkField::Dpa => &["dpa", "avv", "data processing agreement", "data processing", "addendum"],
    }
}

/// One point per keyword found in the anchor text, one more per keyword found
/// in the URL path. Case-insensitive.
pub fn score(candidate: &CandidateLink, keywords: &[&str]) -> u32 {
    let anchor = candidate.anchor_text.to_lowercase();
    let path: String = candidate
        .resolved_url
        .path()
        .to_lowercase()
        .chars()
        .map(|c| if matches!(c, '-' | '_' | '/' | '.') { ' ' } else { c })
        .collect();

    keywords
        .iter()
        .map(|kw| u32::from(anchor.contains(kw)) + u32::from(path.contains(kw)))
        .sum()
}

/// Highest-scoring candidate for `field`; ties go to the earliest candidate.
/// A candidate pointing at `current` (the link being replaced) is never chosen.
/// Returns `None` when nothing scores above zero.
pub fn best_match<'a>(
    candidates: &'a [CandidateLink],
    field: LinkField,
    current: &str,
) -> Option<(&'a CandidateLink, u32)> {
    let kws = keywords(field);
    let current = current.trim();
    let mut best: Option<(&CandidateLink, u32)> = None;

    for candidate in candidates {
        if candidate.resolved_url.as_str() == current || candidate.href == current {
            continue;
        }
        let s = score(candidate, kws);
        if s == 0 {
            continue;
        }
        if best.map_or(true, |(_, top)| s > top) {
            best = Some((candidate, s));
        }
    }
    best
}
