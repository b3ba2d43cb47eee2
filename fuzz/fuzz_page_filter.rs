//! Fuzz target for page-marker filtering.
//!
//! Run with: cargo +nightly fuzz run fuzz_page_filter
//!
//! The first byte picks a page range; the rest is the document text.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pdfqa_config::FilterConfig;
use pdfqa_core::pages::{self, PageFilter, PageIndexSet};

const SPECS: &[&str] = &["", "1", "1-3", "2,4", "1-200", "50-60,99"];

fuzz_target!(|data: &[u8]| {
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };
    let Ok(document) = std::str::from_utf8(rest) else {
        return;
    };

    let spec = SPECS[selector as usize % SPECS.len()];
    let desired = pages::parse(spec).unwrap_or_else(|_| PageIndexSet::default());
    let filtered = PageFilter::new(&FilterConfig::default()).filter(document, &desired);

    if desired.is_empty() {
        assert_eq!(filtered.text, document);
    }
    if !document.trim().is_empty() {
        assert!(!filtered.text.trim().is_empty());
    }
});
