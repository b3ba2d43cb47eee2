//! Synthetic extracted-PDF text.

/// Text with `=== 第N页 ===` markers for pages `1..=pages`, each page holding
/// `paragraphs` short paragraphs that mention its page number.
pub fn paged_document(pages: u32, paragraphs: usize) -> String {
    (1..=pages)
        .map(|page| {
            let body = (0..paragraphs)
                .map(|i| format!("Page {page} paragraph {i} describes section {page}.{i} of the report."))
                .collect::<Vec<_>>()
                .join("\n\n");
            format!("=== 第{page}页 ===\n{body}")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Plain text of roughly `tokens` estimated tokens (four ASCII characters
/// per token), split into paragraphs.
pub fn filler_text(tokens: usize) -> String {
    // 97 chars plus the blank line: just under 25 tokens per paragraph.
    let paragraph = "lorem ipsum dolor sit amet consectetur adipiscing elit sed do eiusmod tempor incididunt ut labore";
    let count = tokens.div_ceil(25).max(1);
    vec![paragraph; count].join("\n\n")
}
