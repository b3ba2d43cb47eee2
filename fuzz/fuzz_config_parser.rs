//! Fuzz target for the TOML configuration parser.
//!
//! Run with: cargo +nightly fuzz run fuzz_config_parser
//!
//! Feeds arbitrary text to `AppConfig::parse()`, covering both TOML decoding
//! and per-service validation.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(config) = pdfqa_config::AppConfig::parse(s) {
            // A config that passed validation must describe a usable service.
            if let Some(endpoint) = config.qa.endpoint() {
                assert!(endpoint.ends_with("/chat/completions") || endpoint.ends_with("/api/chat"));
            }
        }
    }
});
