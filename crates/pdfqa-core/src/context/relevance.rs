//! Relevance-driven truncation of document content.
//!
//! When the filtered document does not fit its token budget, it is split into
//! chunks (paragraphs; oversized paragraphs are packed line by line and, as a
//! last resort, cut at character boundaries). Chunks are ranked with BM25
//! against the question and taken greedily, best first, while the budget
//! allows. The selection is emitted in document order; gaps between
//! non-adjacent chunks are marked with `[...]`.
//!
//! Every chunk fits the budget on its own, so a non-zero budget always yields
//! non-empty output. The separator cost is reserved for every chunk after the
//! first, which keeps the assembled text within budget no matter which
//! separator is eventually used.

use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use super::tokens::{TokenTally, estimate_tokens};

/// Inserted between chunks that were not adjacent in the source.
pub const OMISSION_MARKER: &str = "\n\n[...]\n\n";

const CHUNK_SEPARATOR: &str = "\n\n";

/// Upper bound on chunk size, so ranking works on passages and not on whole pages.
const DEFAULT_MAX_CHUNK_TOKENS: usize = 800;

const BM25_K1: f64 = 1.2;
const BM25_B: f64 = 0.75;

const STOPWORDS: &[&str] = &[
    "a", "about", "an", "and", "are", "as", "at", "be", "by", "can", "did", "do", "does", "for",
    "from", "has", "have", "how", "in", "is", "it", "its", "me", "of", "on", "or", "please",
    "tell", "that", "the", "this", "to", "was", "were", "what", "when", "where", "which", "who",
    "why", "will", "with", "you", "your",
];

const CJK_STOP_TERMS: &[&str] = &[
    "什么", "是否", "这个", "那个", "哪些", "如何", "为什", "么样", "怎么", "请问", "一下", "的是",
];

/// Outcome of [`RelevanceTruncator::truncate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TruncationResult<'a> {
    pub content: Cow<'a, str>,
    pub was_truncated: bool,
}

/// Selects the parts of a document most relevant to a question.
#[derive(Debug, Clone)]
pub struct RelevanceTruncator {
    max_chunk_tokens: usize,
}

impl Default for RelevanceTruncator {
    fn default() -> Self {
        Self {
            max_chunk_tokens: DEFAULT_MAX_CHUNK_TOKENS,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Chunk<'a> {
    text: &'a str,
    tally: TokenTally,
}

impl RelevanceTruncator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_chunk_tokens(mut self, tokens: usize) -> Self {
        self.max_chunk_tokens = tokens.max(1);
        self
    }

    /// Fit `content` into `max_tokens`, preferring passages relevant to `question`.
    ///
    /// Content that already fits is returned unchanged (borrowed).
    pub fn truncate<'a>(
        &self,
        content: &'a str,
        max_tokens: usize,
        question: &str,
    ) -> TruncationResult<'a> {
        let original = estimate_tokens(content);
        if original <= max_tokens {
            return TruncationResult {
                content: Cow::Borrowed(content),
                was_truncated: false,
            };
        }
        if max_tokens == 0 {
            debug!(original, "no budget for document content");
            return TruncationResult {
                content: Cow::Borrowed(""),
                was_truncated: true,
            };
        }

        let cap = self.max_chunk_tokens.min(max_tokens);
        let mut chunks = Vec::new();
        for paragraph in paragraphs(content) {
            push_chunks(paragraph, cap, &mut chunks);
        }
        if chunks.is_empty() {
            return TruncationResult {
                content: Cow::Borrowed(prefix_within(content, max_tokens)),
                was_truncated: true,
            };
        }

        let order = rank(&chunks, question);
        let marker = TokenTally::of(OMISSION_MARKER);
        let mut used = TokenTally::default();
        let mut selected = Vec::new();
        for index in order {
            let mut next = used + chunks[index].tally;
            if !selected.is_empty() {
                next += marker;
            }
            if next.tokens() <= max_tokens {
                used = next;
                selected.push(index);
            }
        }
        selected.sort_unstable();

        let mut out = String::new();
        for (n, &index) in selected.iter().enumerate() {
            if n > 0 {
                out.push_str(if index == selected[n - 1] + 1 {
                    CHUNK_SEPARATOR
                } else {
                    OMISSION_MARKER
                });
            }
            out.push_str(chunks[index].text);
        }

        debug!(
            original,
            budget = max_tokens,
            chunks = chunks.len(),
            selected = selected.len(),
            "document truncated by relevance"
        );

        TruncationResult {
            content: Cow::Owned(out),
            was_truncated: true,
        }
    }
}

/// Runs of non-blank lines, trimmed.
fn paragraphs(content: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = None;
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let blank = line.trim().is_empty();
        match (blank, start) {
            (false, None) => start = Some(offset),
            (true, Some(s)) => {
                out.push(content[s..offset].trim());
                start = None;
            }
            _ => {}
        }
        offset += line.len();
    }
    if let Some(s) = start {
        out.push(content[s..].trim());
    }
    out
}

fn push_chunks<'a>(paragraph: &'a str, cap: usize, out: &mut Vec<Chunk<'a>>) {
    let tally = TokenTally::of(paragraph);
    if tally.tokens() <= cap {
        out.push(Chunk {
            text: paragraph,
            tally,
        });
        return;
    }

    let mut start = 0;
    let mut offset = 0;
    let mut acc = TokenTally::default();
    for line in paragraph.split_inclusive('\n') {
        let line_tally = TokenTally::of(line);
        if line_tally.tokens() > cap {
            push_piece(&paragraph[start..offset], out);
            hard_split(line, cap, out);
            start = offset + line.len();
            acc = TokenTally::default();
        } else if (acc + line_tally).tokens() > cap {
            push_piece(&paragraph[start..offset], out);
            start = offset;
            acc = line_tally;
        } else {
            acc += line_tally;
        }
        offset += line.len();
    }
    push_piece(&paragraph[start..], out);
}

fn hard_split<'a>(text: &'a str, cap: usize, out: &mut Vec<Chunk<'a>>) {
    let mut start = 0;
    let mut acc = TokenTally::default();
    for (i, ch) in text.char_indices() {
        let mut next = acc;
        next.push(ch);
        if next.tokens() > cap {
            push_piece(&text[start..i], out);
            start = i;
            acc = TokenTally::default();
            acc.push(ch);
        } else {
            acc = next;
        }
    }
    push_piece(&text[start..], out);
}

fn push_piece<'a>(piece: &'a str, out: &mut Vec<Chunk<'a>>) {
    let piece = piece.trim();
    if !piece.is_empty() {
        out.push(Chunk {
            text: piece,
            tally: TokenTally::of(piece),
        });
    }
}

/// Longest prefix of `text` within `max_tokens`.
fn prefix_within(text: &str, max_tokens: usize) -> &str {
    let mut acc = TokenTally::default();
    for (i, ch) in text.char_indices() {
        acc.push(ch);
        if acc.tokens() > max_tokens {
            return &text[..i];
        }
    }
    text
}

/// Chunk indices, best BM25 score first; ties keep document order.
fn rank(chunks: &[Chunk<'_>], question: &str) -> Vec<usize> {
    let query: BTreeSet<String> = terms(question).into_iter().collect();
    let mut order: Vec<usize> = (0..chunks.len()).collect();
    if query.is_empty() {
        return order;
    }

    let docs: Vec<(HashMap<String, usize>, usize)> = chunks
        .iter()
        .map(|chunk| {
            let terms = terms(chunk.text);
            let len = terms.len();
            let mut freq = HashMap::new();
            for term in terms {
                *freq.entry(term).or_insert(0) += 1;
            }
            (freq, len)
        })
        .collect();

    let n = docs.len() as f64;
    let total_len: usize = docs.iter().map(|(_, len)| len).sum();
    let avg_len = if total_len == 0 {
        1.0
    } else {
        total_len as f64 / n
    };

    let idf: Vec<(&str, f64)> = query
        .iter()
        .map(|term| {
            let df = docs.iter().filter(|(freq, _)| freq.contains_key(term)).count() as f64;
            (term.as_str(), ((n - df + 0.5) / (df + 0.5) + 1.0).ln())
        })
        .collect();

    let scores: Vec<f64> = docs
        .iter()
        .map(|(freq, len)| {
            let norm = BM25_K1 * (1.0 - BM25_B + BM25_B * *len as f64 / avg_len);
            idf.iter()
                .map(|(term, idf)| {
                    let tf = freq.get(*term).copied().unwrap_or(0) as f64;
                    if tf == 0.0 {
                        0.0
                    } else {
                        idf * tf * (BM25_K1 + 1.0) / (tf + norm)
                    }
                })
                .sum()
        })
        .collect();

    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));
    order
}

/// Index terms: lowercase words of two or more characters, and character
/// bigrams inside CJK runs (a lone CJK character is its own term).
fn terms(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut word = String::new();
    let mut run: Vec<char> = Vec::new();

    for ch in text.chars() {
        if is_cjk(ch) {
            flush_word(&mut word, &mut out);
            run.push(ch);
        } else if ch.is_alphanumeric() {
            flush_run(&mut run, &mut out);
            word.extend(ch.to_lowercase());
        } else {
            flush_word(&mut word, &mut out);
            flush_run(&mut run, &mut out);
        }
    }
    flush_word(&mut word, &mut out);
    flush_run(&mut run, &mut out);
    out
}

fn flush_word(word: &mut String, out: &mut Vec<String>) {
    if word.chars().count() >= 2 && !STOPWORDS.contains(&word.as_str()) {
        out.push(std::mem::take(word));
    } else {
        word.clear();
    }
}

fn flush_run(run: &mut Vec<char>, out: &mut Vec<String>) {
    match run.len() {
        0 => {}
        1 => out.push(run[0].to_string()),
        _ => out.extend(
            run.windows(2)
                .map(|pair| pair.iter().collect::<String>())
                .filter(|bigram| !CJK_STOP_TERMS.contains(&bigram.as_str())),
        ),
    }
    run.clear();
}

fn is_cjk(ch: char) -> bool {
    matches!(
        ch,
        '\u{3040}'..='\u{30FF}'
            | '\u{3400}'..='\u{4DBF}'
            | '\u{4E00}'..='\u{9FFF}'
            | '\u{AC00}'..='\u{D7AF}'
            | '\u{F900}'..='\u{FAFF}'
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn filler(topic: &str, sentences: usize) -> String {
        (0..sentences)
            .map(|i| format!("Sentence {i} discusses {topic} in general terms."))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn sample_document() -> String {
        [
            filler("weather patterns", 6),
            filler("marine biology", 6),
            "The photosynthesis experiment measured chlorophyll output at noon. \
             Photosynthesis rates doubled under blue light."
                .to_string(),
            filler("ancient history", 6),
            filler("railway engineering", 6),
        ]
        .join("\n\n")
    }

    #[test]
    fn test_fitting_content_passes_through() {
        let content = "short document\n\nsecond paragraph";
        let result = RelevanceTruncator::new().truncate(content, 1000, "anything");
        assert!(!result.was_truncated);
        assert!(matches!(result.content, Cow::Borrowed(c) if c == content));
    }

    #[test]
    fn test_zero_budget_yields_empty() {
        let result = RelevanceTruncator::new().truncate("some text", 0, "text");
        assert!(result.was_truncated);
        assert_eq!(result.content, "");
    }

    #[test]
    fn test_prefers_relevant_paragraph() {
        let doc = sample_document();
        let budget = estimate_tokens(&doc) / 3;
        let result =
            RelevanceTruncator::new().truncate(&doc, budget, "What did the photosynthesis experiment show?");
        assert!(result.was_truncated);
        assert!(result.content.contains("Photosynthesis rates doubled"));
        assert!(estimate_tokens(&result.content) <= budget);
    }

    #[test]
    fn test_relevant_cjk_paragraph_selected() {
        let doc = [
            "第一章介绍了项目背景和团队成员。".repeat(10),
            "第二章讨论了市场营销策略以及预算。".repeat(10),
            "实验结果表明催化剂显著提高了反应速率。".to_string(),
            "第四章总结了未来的工作计划。".repeat(10),
        ]
        .join("\n\n");
        let budget = 60;
        let result = RelevanceTruncator::new().truncate(&doc, budget, "催化剂对反应速率有什么影响？");
        assert!(result.content.contains("催化剂显著提高"));
        assert!(estimate_tokens(&result.content) <= budget);
    }

    #[test]
    fn test_omission_marker_between_gaps() {
        let doc = sample_document();
        let budget = estimate_tokens(&doc) / 2;
        let result = RelevanceTruncator::new().truncate(&doc, budget, "photosynthesis railway");
        assert!(result.content.contains("[...]"));
        let photo = result.content.find("photosynthesis").unwrap();
        let rail = result.content.find("railway").unwrap();
        assert!(photo < rail, "selection must keep document order");
    }

    #[test]
    fn test_deterministic() {
        let doc = sample_document();
        let truncator = RelevanceTruncator::new();
        let a = truncator.truncate(&doc, 120, "marine history");
        let b = truncator.truncate(&doc, 120, "marine history");
        assert_eq!(a, b);
    }

    #[test]
    fn test_tiny_budget_still_non_empty() {
        let doc = "x".repeat(10_000);
        let result = RelevanceTruncator::new().truncate(&doc, 1, "x");
        assert!(result.was_truncated);
        assert!(!result.content.is_empty());
        assert!(estimate_tokens(&result.content) <= 1);
    }

    #[test]
    fn test_whitespace_only_content() {
        let doc = " \n\n \n".repeat(50);
        let result = RelevanceTruncator::new().truncate(&doc, 3, "anything");
        assert!(!result.content.is_empty());
        assert!(estimate_tokens(&result.content) <= 3);
    }

    #[test]
    fn test_oversized_paragraph_split_by_lines() {
        let paragraph = (0..400)
            .map(|i| format!("line {i} of the appendix table"))
            .collect::<Vec<_>>()
            .join("\n");
        let result = RelevanceTruncator::new()
            .with_max_chunk_tokens(50)
            .truncate(&paragraph, 200, "appendix");
        assert!(result.was_truncated);
        assert!(estimate_tokens(&result.content) <= 200);
        assert!(result.content.lines().count() > 1);
    }

    #[test]
    fn test_terms() {
        assert_eq!(
            terms("What is the Main RESULT of a study?"),
            vec!["main", "result", "study"]
        );
        assert_eq!(terms("催化剂"), vec!["催化", "化剂"]);
        assert_eq!(terms("猫 cat"), vec!["猫", "cat"]);
    }

    proptest! {
        #[test]
        fn prop_budget_compliance(
            paragraphs in proptest::collection::vec("[a-z 第页内容\\n]{0,200}", 0..20),
            budget in 0usize..400,
            question in "[a-z 内容]{0,30}",
        ) {
            let content = paragraphs.join("\n\n");
            let result = RelevanceTruncator::new().truncate(&content, budget, &question);
            prop_assert!(estimate_tokens(&result.content) <= budget);
            if budget > 0 && !content.is_empty() {
                prop_assert!(!result.content.is_empty());
            }
            if !result.was_truncated {
                prop_assert_eq!(&*result.content, content.as_str());
            }
        }
    }
}
