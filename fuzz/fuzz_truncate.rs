//! Fuzz target for relevance truncation.
//!
//! Run with: cargo +nightly fuzz run fuzz_truncate
//!
//! The first two bytes give the token budget, the next byte splits the rest
//! into question and content.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pdfqa_core::RelevanceTruncator;
use pdfqa_core::context::estimate_tokens;

fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }
    let max_tokens = u16::from_le_bytes([data[0], data[1]]) as usize;
    let rest = &data[3..];
    let split = (data[2] as usize).min(rest.len());
    let (Ok(question), Ok(content)) = (
        std::str::from_utf8(&rest[..split]),
        std::str::from_utf8(&rest[split..]),
    ) else {
        return;
    };

    let result = RelevanceTruncator::new().truncate(content, max_tokens, question);
    assert!(estimate_tokens(&result.content) <= max_tokens);
    if !result.was_truncated {
        assert_eq!(result.content, content);
    }
});
