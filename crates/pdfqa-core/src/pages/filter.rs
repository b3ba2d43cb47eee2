//! Page-marker filtering of extracted document text.
//!
//! The extractor prefixes every page with a boundary marker carrying the
//! 1-based page number. A page's segment runs from its marker to the next
//! marker (or end of text). Filtering keeps the segments whose 0-based index
//! is selected, joined by a blank line, in document order.
//!
//! Marker streams from broken extractions are tolerated: gaps, repeats and
//! out-of-order numbers are reported, and implausibly high page numbers cause
//! selection to be capped to the low pages instead of failing.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use pdfqa_config::FilterConfig;

use super::range::PageIndexSet;

/// Explicit extractor markers: `=== 第N页 ===` and `=== Page N ===`.
static EXPLICIT_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"===\s*第\s*([0-9]{1,9})\s*页\s*===|(?i:===\s*page\s+([0-9]{1,9})\s*===)")
        .expect("explicit marker pattern is valid")
});

/// Bare `page-N`, only honoured in documents without explicit markers.
static BARE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?i:page)-([0-9]{1,9})\b").expect("bare marker pattern is valid")
});

/// Separator placed between kept page segments.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// A page-boundary marker found in the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMarker {
    /// 1-based page number carried by the marker.
    pub page: u32,
    /// Byte offset of the marker in the text.
    pub start: usize,
}

/// Locate every page marker in document order.
///
/// The marker style is chosen once per document: explicit `=== ... ===`
/// markers win, so a `page-N` mention in body text is not a boundary.
pub fn find_markers(text: &str) -> Vec<PageMarker> {
    let explicit = collect_markers(&EXPLICIT_MARKER, text);
    if explicit.is_empty() {
        collect_markers(&BARE_MARKER, text)
    } else {
        explicit
    }
}

fn collect_markers(pattern: &Regex, text: &str) -> Vec<PageMarker> {
    pattern
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let number = caps.get(1).or_else(|| caps.get(2))?;
            let page = number.as_str().parse().ok()?;
            Some(PageMarker {
                page,
                start: whole.start(),
            })
        })
        .collect()
}

/// Signs that the marker stream came from a damaged extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterAnomaly {
    /// Page numbers between the lowest and highest marker are missing.
    Gaps { missing: usize },
    /// The same page number appears on more than one marker.
    Duplicates { pages: Vec<u32> },
    /// A marker carries a lower number than the one before it.
    OutOfOrder,
    /// The highest page number exceeds the plausibility ceiling; selection
    /// was restricted to markers numbered `capped_to` or lower.
    ExcessivePages { max_page: u32, capped_to: u32 },
}

impl fmt::Display for FilterAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gaps { missing } => write!(f, "{missing} page number(s) missing between markers"),
            Self::Duplicates { pages } => write!(f, "repeated page markers: {pages:?}"),
            Self::OutOfOrder => f.write_str("page markers out of order"),
            Self::ExcessivePages { max_page, capped_to } => write!(
                f,
                "marker for page {max_page} is implausible, selection capped to page {capped_to}"
            ),
        }
    }
}

/// How the filter arrived at its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    /// Nothing to do: no pages requested or empty document.
    Unfiltered,
    /// The text has no page markers; returned unchanged.
    NoMarkers,
    /// Matching segments were extracted.
    Selected,
    /// The selection came out blank; the whole document was returned instead.
    EmptySelection,
}

/// What happened during one filtering pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterReport {
    pub outcome: FilterOutcome,
    pub markers_found: usize,
    /// 1-based numbers of the pages that made it into the output.
    pub pages_kept: Vec<u32>,
    pub anomalies: Vec<FilterAnomaly>,
}

impl FilterReport {
    fn new(outcome: FilterOutcome) -> Self {
        Self {
            outcome,
            markers_found: 0,
            pages_kept: Vec::new(),
            anomalies: Vec::new(),
        }
    }
}

/// Output of [`PageFilter::filter`].
#[derive(Debug, Clone)]
pub struct Filtered<'a> {
    pub text: Cow<'a, str>,
    pub report: FilterReport,
}

impl Filtered<'_> {
    /// Whether the output differs from the input document.
    pub fn is_filtered(&self) -> bool {
        self.report.outcome == FilterOutcome::Selected
    }
}

/// Extracts selected pages from marker-delimited text.
#[derive(Debug, Clone)]
pub struct PageFilter {
    page_ceiling: u32,
    page_cap: u32,
}

impl Default for PageFilter {
    fn default() -> Self {
        Self::new(&FilterConfig::default())
    }
}

impl PageFilter {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            page_ceiling: config.page_ceiling,
            page_cap: config.page_cap,
        }
    }

    /// Keep only the pages in `desired`.
    ///
    /// Never returns blank text for a non-blank document: when nothing usable
    /// is selected the document comes back unchanged.
    pub fn filter<'a>(&self, document: &'a str, desired: &PageIndexSet) -> Filtered<'a> {
        if desired.is_empty() || document.is_empty() {
            debug!(
                requested = desired.len(),
                document_len = document.len(),
                "page filtering skipped"
            );
            return Filtered {
                text: Cow::Borrowed(document),
                report: FilterReport::new(FilterOutcome::Unfiltered),
            };
        }

        let markers = find_markers(document);
        let mut report = FilterReport::new(FilterOutcome::Selected);
        report.markers_found = markers.len();

        if markers.is_empty() {
            info!("document has no page markers, using full text");
            report.outcome = FilterOutcome::NoMarkers;
            return Filtered {
                text: Cow::Borrowed(document),
                report,
            };
        }

        report.anomalies = self.inspect(&markers);
        let eligible_max = report
            .anomalies
            .iter()
            .find_map(|a| match a {
                FilterAnomaly::ExcessivePages { capped_to, .. } => Some(*capped_to),
                _ => None,
            })
            .unwrap_or(u32::MAX);

        let mut segments = Vec::new();
        for (i, marker) in markers.iter().enumerate() {
            let index = (marker.page as usize).saturating_sub(1);
            let wanted = marker.page <= eligible_max && desired.contains(index);
            debug!(page = marker.page, offset = marker.start, wanted, "page marker");
            if !wanted {
                continue;
            }

            let end = markers
                .get(i + 1)
                .map_or(document.len(), |next| next.start);
            let segment = document[marker.start..end].trim();
            if !segment.is_empty() {
                segments.push(segment);
                report.pages_kept.push(marker.page);
            }
        }

        let joined = segments.join(PAGE_SEPARATOR);
        if joined.trim().is_empty() {
            warn!(
                requested = desired.len(),
                markers = markers.len(),
                "page selection is empty, using full text"
            );
            report.outcome = FilterOutcome::EmptySelection;
            report.pages_kept.clear();
            return Filtered {
                text: Cow::Borrowed(document),
                report,
            };
        }

        info!(
            original_chars = document.len(),
            filtered_chars = joined.len(),
            pages = report.pages_kept.len(),
            "page filtering complete"
        );
        Filtered {
            text: Cow::Owned(joined),
            report,
        }
    }

    /// Check the marker stream for signs of extraction damage.
    fn inspect(&self, markers: &[PageMarker]) -> Vec<FilterAnomaly> {
        let mut anomalies = Vec::new();

        if markers.windows(2).any(|w| w[1].page < w[0].page) {
            warn!("page markers are out of order");
            anomalies.push(FilterAnomaly::OutOfOrder);
        }

        let mut seen = BTreeSet::new();
        let mut duplicates = BTreeSet::new();
        for marker in markers {
            if !seen.insert(marker.page) {
                duplicates.insert(marker.page);
            }
        }
        if !duplicates.is_empty() {
            warn!(?duplicates, "page markers repeat");
            anomalies.push(FilterAnomaly::Duplicates {
                pages: duplicates.into_iter().collect(),
            });
        }

        // `seen` is non-empty because callers pass at least one marker
        let (min, max) = match (seen.first(), seen.last()) {
            (Some(&min), Some(&max)) => (min, max),
            _ => return anomalies,
        };
        let expected = (max - min) as usize + 1;
        if seen.len() != expected {
            let missing = expected - seen.len();
            warn!(min, max, missing, "page markers are not contiguous");
            anomalies.push(FilterAnomaly::Gaps { missing });
        }

        if max > self.page_ceiling {
            if markers.iter().any(|m| m.page <= self.page_cap) {
                warn!(
                    max_page = max,
                    ceiling = self.page_ceiling,
                    cap = self.page_cap,
                    "implausible page count, limiting selection to the first pages"
                );
                anomalies.push(FilterAnomaly::ExcessivePages {
                    max_page: max,
                    capped_to: self.page_cap,
                });
            } else {
                warn!(
                    max_page = max,
                    ceiling = self.page_ceiling,
                    "implausible page count and no low-numbered markers, not capping"
                );
            }
        }

        anomalies
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::range::parse;
    use pretty_assertions::assert_eq;

    fn doc(pages: &[u32]) -> String {
        pages
            .iter()
            .map(|p| format!("=== 第{p}页 ===\nbody of page {p}\n"))
            .collect()
    }

    #[test]
    fn test_empty_selection_is_identity() {
        let text = doc(&[1, 2, 3]);
        let out = PageFilter::default().filter(&text, &PageIndexSet::default());
        assert_eq!(out.text, text);
        assert_eq!(out.report.outcome, FilterOutcome::Unfiltered);
    }

    #[test]
    fn test_empty_document_is_identity() {
        let out = PageFilter::default().filter("", &parse("1").unwrap());
        assert_eq!(out.text, "");
    }

    #[test]
    fn test_selects_first_and_third_page() {
        let text = doc(&[1, 2, 3]);
        let out = PageFilter::default().filter(&text, &parse("1,3").unwrap());

        assert_eq!(
            out.text,
            "=== 第1页 ===\nbody of page 1\n\n=== 第3页 ===\nbody of page 3"
        );
        assert!(!out.text.contains("page 2"));
        assert_eq!(out.report.pages_kept, vec![1, 3]);
        assert!(out.is_filtered());
        assert!(out.report.anomalies.is_empty());
    }

    #[test]
    fn test_english_markers() {
        let text = "=== Page 1 ===\nalpha\n=== page 2 ===\nbeta\n=== PAGE 3 ===\ngamma";
        let out = PageFilter::default().filter(text, &parse("2-3").unwrap());
        assert_eq!(out.text, "=== page 2 ===\nbeta\n\n=== PAGE 3 ===\ngamma");
    }

    #[test]
    fn test_bare_markers_without_explicit_ones() {
        let text = "page-1\nalpha\npage-2\nbeta\npage-3\ngamma";
        let out = PageFilter::default().filter(text, &parse("2-3").unwrap());
        assert_eq!(out.text, "page-2\nbeta\n\npage-3\ngamma");
        assert_eq!(out.report.markers_found, 3);
    }

    #[test]
    fn test_page_mention_in_body_is_not_a_boundary() {
        let text = "=== 第1页 ===\nIntro. See page-3 for the results table.\n\
=== 第2页 ===\nMethods.\n=== 第3页 ===\nResults: 42.";

        let first = PageFilter::default().filter(text, &parse("1").unwrap());
        assert_eq!(
            first.text,
            "=== 第1页 ===\nIntro. See page-3 for the results table."
        );
        assert_eq!(first.report.markers_found, 3);

        let third = PageFilter::default().filter(text, &parse("3").unwrap());
        assert_eq!(third.text, "=== 第3页 ===\nResults: 42.");
        assert!(third.report.anomalies.is_empty());
    }

    #[test]
    fn test_no_markers_returns_original() {
        let text = "plain text without any structure";
        let out = PageFilter::default().filter(text, &parse("1").unwrap());
        assert_eq!(out.text, text);
        assert_eq!(out.report.outcome, FilterOutcome::NoMarkers);
    }

    #[test]
    fn test_unmatched_selection_falls_back() {
        let text = doc(&[1, 2]);
        let out = PageFilter::default().filter(&text, &parse("7").unwrap());
        assert_eq!(out.text, text);
        assert_eq!(out.report.outcome, FilterOutcome::EmptySelection);
        assert!(!out.is_filtered());
    }

    #[test]
    fn test_gap_is_reported_not_fatal() {
        let text = doc(&[1, 2, 5]);
        let out = PageFilter::default().filter(&text, &parse("5").unwrap());
        assert_eq!(out.text, "=== 第5页 ===\nbody of page 5");
        assert_eq!(out.report.anomalies, vec![FilterAnomaly::Gaps { missing: 2 }]);
    }

    #[test]
    fn test_duplicates_and_disorder_reported() {
        let text = doc(&[2, 1, 2]);
        let out = PageFilter::default().filter(&text, &parse("1").unwrap());
        assert!(out.report.anomalies.contains(&FilterAnomaly::OutOfOrder));
        assert!(
            out.report
                .anomalies
                .contains(&FilterAnomaly::Duplicates { pages: vec![2] })
        );
    }

    #[test]
    fn test_excessive_pages_capped() {
        let text = doc(&[1, 2, 60, 150]);
        let out = PageFilter::default().filter(&text, &parse("1-200").unwrap());

        assert_eq!(out.report.pages_kept, vec![1, 2]);
        assert!(out.report.anomalies.contains(&FilterAnomaly::ExcessivePages {
            max_page: 150,
            capped_to: 50
        }));
        // The capped page's segment still ends at the next marker
        assert!(!out.text.contains("page 60"));
    }

    #[test]
    fn test_thresholds_are_configurable() {
        let filter = PageFilter::new(&FilterConfig {
            page_ceiling: 500,
            page_cap: 400,
        });
        let text = doc(&[1, 150]);
        let out = filter.filter(&text, &parse("150").unwrap());
        assert_eq!(out.report.pages_kept, vec![150]);
    }

    #[test]
    fn test_find_markers_offsets() {
        let text = "intro\n=== 第2页 ===\nx";
        let markers = find_markers(text);
        assert_eq!(markers, vec![PageMarker { page: 2, start: 6 }]);
    }
}
