//! Fuzz target for page-range parsing.
//!
//! Run with: cargo +nightly fuzz run fuzz_page_range

#![no_main]

use libfuzzer_sys::fuzz_target;
use pdfqa_core::pages::{self, range::MAX_PAGE_NUMBER};

fuzz_target!(|data: &[u8]| {
    let Ok(spec) = std::str::from_utf8(data) else {
        return;
    };

    let parsed = pages::parse(spec);
    assert_eq!(parsed.is_ok(), pages::validate(spec).is_ok());

    if let Ok(set) = parsed {
        let indices = set.as_slice();
        assert!(indices.windows(2).all(|w| w[0] < w[1]), "sorted and unique");
        assert!(indices.iter().all(|&i| (i as u64) < MAX_PAGE_NUMBER));
    }
});
