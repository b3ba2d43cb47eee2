//! Token estimation and per-model context windows.
//!
//! Counting is a character heuristic rather than a real tokenizer: every
//! "narrow" character (UTF-8 width of one or two bytes: ASCII, Latin,
//! Greek, Cyrillic, ...) is a quarter token, every wider character (CJK,
//! symbols) is a whole token. The quarter tokens are rounded up once for the
//! whole text. Counts only depend on how many characters of each class a text
//! holds, so appending text never lowers the estimate.

use std::ops::{Add, AddAssign};

use pdfqa_config::BudgetConfig;

/// Narrow characters per token.
const NARROW_CHARS_PER_TOKEN: usize = 4;

/// Built-in context windows, matched as lowercase substrings of the model name.
const MODEL_LIMITS: &[(&str, usize)] = &[
    ("gpt-4o", 128_000),
    ("gpt-4-turbo", 128_000),
    ("gpt-4-32k", 32_768),
    ("gpt-4", 8_192),
    ("gpt-3.5-turbo", 16_385),
    ("claude", 200_000),
    ("deepseek", 64_000),
    ("qwen2.5", 32_768),
    ("qwen", 32_768),
    ("glm-4", 128_000),
    ("llama3.1", 128_000),
    ("llama-3.1", 128_000),
    ("llama3", 8_192),
    ("llama-3", 8_192),
    ("llama2", 4_096),
    ("llama-2", 4_096),
    ("mixtral", 32_768),
    ("mistral", 32_768),
    ("gemma", 8_192),
];

/// Character-class counts of a text; the token estimate is derived from these.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenTally {
    narrow: usize,
    wide: usize,
}

impl TokenTally {
    pub fn of(text: &str) -> Self {
        let mut tally = Self::default();
        for ch in text.chars() {
            tally.push(ch);
        }
        tally
    }

    pub fn push(&mut self, ch: char) {
        if ch.len_utf8() <= 2 {
            self.narrow += 1;
        } else {
            self.wide += 1;
        }
    }

    pub fn tokens(&self) -> usize {
        self.narrow.div_ceil(NARROW_CHARS_PER_TOKEN) + self.wide
    }
}

impl Add for TokenTally {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            narrow: self.narrow + rhs.narrow,
            wide: self.wide + rhs.wide,
        }
    }
}

impl AddAssign for TokenTally {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// Estimate the token count of a text.
pub fn estimate_tokens(text: &str) -> usize {
    TokenTally::of(text).tokens()
}

/// Token counting plus the model → context window lookup.
#[derive(Debug, Clone)]
pub struct TokenEstimator {
    /// Configured rows, lowercased; consulted before the built-in table.
    overrides: Vec<(String, usize)>,
    default_limit: usize,
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::new(&BudgetConfig::default())
    }
}

impl TokenEstimator {
    pub fn new(config: &BudgetConfig) -> Self {
        Self {
            overrides: config
                .models
                .iter()
                .map(|row| (row.pattern.trim().to_lowercase(), row.limit))
                .collect(),
            default_limit: config.default_token_limit,
        }
    }

    pub fn count_tokens(&self, text: &str) -> usize {
        estimate_tokens(text)
    }

    /// Context window of `model`; the longest matching pattern wins.
    ///
    /// Unrecognized names get the configured default (4096 unless overridden).
    pub fn token_limit(&self, model: &str) -> usize {
        let model = model.to_lowercase();
        let configured = self
            .overrides
            .iter()
            .map(|(pattern, limit)| (pattern.as_str(), *limit))
            .filter(|(pattern, _)| model.contains(pattern))
            .max_by_key(|(pattern, _)| pattern.len());
        if let Some((_, limit)) = configured {
            return limit;
        }

        MODEL_LIMITS
            .iter()
            .filter(|(pattern, _)| model.contains(pattern))
            .max_by_key(|(pattern, _)| pattern.len())
            .map_or(self.default_limit, |(_, limit)| *limit)
    }
}
