//! Planning a request end to end: config file, page filter, budget, truncation.

use pdfqa_core::context::estimate_tokens;
use pdfqa_core::pages::filter::FilterOutcome;
use pdfqa_core::{ContextPlanner, ConversationTurn};
use pdfqa_test_utils::documents::{filler_text, paged_document};
use pdfqa_test_utils::{TestConfigBuilder, TestConfigFile};
use pretty_assertions::assert_eq;

// About 50 tokens once the placeholder is removed.
const TEMPLATE: &str = "You are a careful assistant answering questions about a PDF. \
Use only the material below and cite page numbers whenever you can.\n\
{pdf_content}\nAnswer briefly and say so if the document is silent.";

const QUESTION: &str = "What were the main findings of the survey?";

fn planner(pages: &str) -> ContextPlanner {
    let config = TestConfigBuilder::new()
        .custom("http://unused.invalid", "gpt-4")
        .system_prompt(TEMPLATE)
        .max_response_tokens(2000)
        .pages(pages)
        .build();
    ContextPlanner::from_config(&config)
}

#[test]
fn test_small_document_sent_whole() {
    let planner = planner("");
    let document = filler_text(500);

    let plan = planner.plan(&document, &[], QUESTION);

    let overhead = estimate_tokens(&TEMPLATE.replace("{pdf_content}", ""))
        + estimate_tokens(QUESTION)
        + 2000
        + 100;
    assert_eq!(plan.report.model_limit, 8192);
    assert_eq!(plan.report.available_tokens, 8192 - overhead);
    assert!(!plan.report.was_truncated);
    assert_eq!(plan.content, document);
    assert!(plan.system_prompt.contains(&document));
}

#[test]
fn test_large_document_truncated_to_budget() {
    let planner = planner("");
    let document = filler_text(10_000);

    let plan = planner.plan(&document, &[], QUESTION);

    assert!(plan.report.original_tokens >= 10_000);
    assert!(plan.report.was_truncated);
    assert!(plan.report.final_tokens <= plan.report.available_tokens);
    assert!(!plan.content.is_empty());
    assert!(!plan.system_prompt.contains("{pdf_content}"));
}

#[test]
fn test_history_shrinks_budget() {
    let planner = planner("");
    let document = filler_text(500);
    let history = vec![ConversationTurn::new(
        "What is the sample size?",
        "The survey reached 1,200 respondents across four regions.",
    )];

    let fresh = planner.plan(&document, &[], QUESTION);
    let continued = planner.plan(&document, &history, QUESTION);

    assert!(continued.report.available_tokens < fresh.report.available_tokens);
    let messages = continued.messages(&history, QUESTION);
    assert_eq!(messages.len(), 4);
}

#[test]
fn test_page_range_selects_pages() {
    let planner = planner("2,4");
    let document = paged_document(5, 2);

    let plan = planner.plan(&document, &[], "section");

    assert_eq!(plan.report.filter.outcome, FilterOutcome::Selected);
    assert_eq!(plan.report.filter.markers_found, 5);
    assert_eq!(plan.report.filter.pages_kept, vec![2, 4]);
    assert!(plan.report.pages_filtered());
    assert!(plan.content.contains("=== 第2页 ==="));
    assert!(plan.content.contains("Page 4 paragraph 1"));
    assert!(!plan.content.contains("Page 3 paragraph"));
    assert!(plan.content.find("第2页") < plan.content.find("第4页"));
    assert!(plan.report.document_tokens < plan.report.original_tokens);
}

#[test]
fn test_invalid_page_range_uses_all_pages() {
    let planner = planner("5-3");
    let document = paged_document(3, 1);

    let plan = planner.plan(&document, &[], "section");

    assert_eq!(plan.report.page_spec.as_deref(), Some("5-3"));
    assert!(plan.report.page_spec_error.is_some());
    assert!(!plan.report.pages_filtered());
    assert_eq!(plan.content, document);
    assert!(plan.report.to_string().contains("ignored"));
}

#[tokio::test]
async fn test_plan_from_config_file() {
    let file = TestConfigFile::with_toml(
        r#"
[qa]
service = "ollama"
pages = "1"
max_response_tokens = 512

[qa.ollama]
model = "llama3:8b"

[budget]
safety_margin = 50
"#,
    )
    .await;
    let config = file.load().await.unwrap();
    let planner = ContextPlanner::from_config(&config);
    assert_eq!(planner.model(), "llama3:8b");

    let plan = planner.plan(&paged_document(2, 1), &[], "overview");

    assert_eq!(plan.report.model_limit, 8192);
    assert_eq!(plan.report.filter.pages_kept, vec![1]);
    assert!(plan.system_prompt.contains("Page 1 paragraph 0"));
    assert!(!plan.system_prompt.contains("Page 2 paragraph 0"));
}
