//! Page-range expressions.
//!
//! Grammar: comma-separated parts, each either a page `N` or an inclusive
//! range `A-B`, 1-based, whitespace around parts and numbers ignored. A blank
//! expression selects nothing (the caller treats that as "all pages").
//!
//! Parsing is fail-fast: a single bad part rejects the whole expression so the
//! caller falls back to "no filtering" instead of silently using a subset.

use std::collections::BTreeSet;

/// Highest page number accepted in a range expression.
pub const MAX_PAGE_NUMBER: u64 = 100_000;

/// Errors from parsing a page-range expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageRangeError {
    #[error("malformed page range part {part:?} (expected N or A-B)")]
    Malformed { part: String },

    #[error("page numbers start at 1, got {part:?}")]
    ZeroPage { part: String },

    #[error("page range {part:?} ends before it starts")]
    Reversed { part: String },

    #[error("page {page} exceeds the maximum of {MAX_PAGE_NUMBER}")]
    TooLarge { page: u64 },
}

/// Sorted, deduplicated 0-based page indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageIndexSet(Vec<usize>);

impl PageIndexSet {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.0.binary_search(&index).is_ok()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<usize> for PageIndexSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let set: BTreeSet<usize> = iter.into_iter().collect();
        Self(set.into_iter().collect())
    }
}

/// Parse a 1-based page-range expression into 0-based indices.
pub fn parse(spec: &str) -> Result<PageIndexSet, PageRangeError> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Ok(PageIndexSet::default());
    }

    let mut pages = BTreeSet::new();
    for raw in spec.split(',') {
        let part = raw.trim();
        match part.split_once('-') {
            Some((start, end)) => {
                let start = page_number(start, part)?;
                let end = page_number(end, part)?;
                if start > end {
                    return Err(PageRangeError::Reversed {
                        part: part.to_string(),
                    });
                }
                pages.extend((start - 1)..end);
            }
            None => {
                let page = page_number(part, part)?;
                pages.insert(page - 1);
            }
        }
    }

    Ok(PageIndexSet(pages.into_iter().collect()))
}

/// Check an expression without keeping the result.
pub fn validate(spec: &str) -> Result<(), PageRangeError> {
    parse(spec).map(|_| ())
}

fn page_number(text: &str, part: &str) -> Result<usize, PageRangeError> {
    let text = text.trim();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PageRangeError::Malformed {
            part: part.to_string(),
        });
    }
    // Digits only, so the only parse failure left is overflow.
    let page: u64 = text.parse().map_err(|_| PageRangeError::TooLarge { page: u64::MAX })?;
    if page == 0 {
        return Err(PageRangeError::ZeroPage {
            part: part.to_string(),
        });
    }
    if page > MAX_PAGE_NUMBER {
        return Err(PageRangeError::TooLarge { page });
    }
    Ok(page as usize)
}
