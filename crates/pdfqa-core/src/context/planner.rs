//! Assembles the request context for one question.
//!
//! Runs page filtering, budget computation and relevance truncation in order
//! and substitutes the result into the system-prompt template. The outcome is
//! summarised in a [`ContextReport`] so front-ends can tell the user when the
//! document did not fit.

use std::fmt;

use tracing::{info, warn};

use pdfqa_config::{AppConfig, CONTENT_PLACEHOLDER};

use super::budget::BudgetCalculator;
use super::relevance::RelevanceTruncator;
use super::tokens::estimate_tokens;
use crate::history::ConversationTurn;
use crate::llm::ChatMessage;
use crate::pages::filter::{FilterOutcome, FilterReport, PageFilter};
use crate::pages::range::{self, PageIndexSet};

/// Everything the planner decided about one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextReport {
    pub model: String,
    pub model_limit: usize,
    pub available_tokens: usize,
    pub budget_exhausted: bool,
    /// Tokens of the raw extracted text.
    pub original_tokens: usize,
    /// Tokens after page filtering.
    pub document_tokens: usize,
    /// Tokens of the content actually sent.
    pub final_tokens: usize,
    pub was_truncated: bool,
    /// The configured page range, when one is set.
    pub page_spec: Option<String>,
    /// Why the page range was ignored, if it failed to parse.
    pub page_spec_error: Option<String>,
    pub filter: FilterReport,
}

impl ContextReport {
    pub fn pages_filtered(&self) -> bool {
        self.filter.outcome == FilterOutcome::Selected
    }
}

impl fmt::Display for ContextReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Model: {} (context window {} tokens)",
            if self.model.is_empty() { "<none>" } else { &self.model },
            self.model_limit
        )?;

        match (&self.page_spec, &self.page_spec_error) {
            (Some(spec), Some(err)) => {
                writeln!(f, "Pages: range {spec:?} ignored ({err}), using all pages")?
            }
            (Some(spec), None) => match self.filter.outcome {
                FilterOutcome::Selected => writeln!(
                    f,
                    "Pages: {spec} ({} of {} pages kept)",
                    self.filter.pages_kept.len(),
                    self.filter.markers_found
                )?,
                FilterOutcome::NoMarkers => {
                    writeln!(f, "Pages: range {spec} ignored, document has no page markers")?
                }
                FilterOutcome::EmptySelection => {
                    writeln!(f, "Pages: range {spec} matched nothing, using all pages")?
                }
                FilterOutcome::Unfiltered => writeln!(f, "Pages: all")?,
            },
            (None, _) => writeln!(f, "Pages: all")?,
        }
        if !self.filter.anomalies.is_empty() {
            writeln!(
                f,
                "Warning: page markers look damaged ({} issue(s))",
                self.filter.anomalies.len()
            )?;
        }

        writeln!(
            f,
            "Document: {} tokens ({} before page filtering)",
            self.document_tokens, self.original_tokens
        )?;
        writeln!(f, "Budget: {} tokens available for document content", self.available_tokens)?;
        if self.budget_exhausted {
            writeln!(
                f,
                "Warning: the conversation leaves no room for the document; start a new session"
            )?;
        }
        if self.was_truncated {
            write!(
                f,
                "Content truncated to {} tokens, keeping the passages most relevant to the question",
                self.final_tokens
            )
        } else {
            write!(f, "Full content included ({} tokens)", self.final_tokens)
        }
    }
}

/// Request context ready to send.
#[derive(Debug, Clone)]
pub struct ContextPlan {
    /// Template with the selected content substituted.
    pub system_prompt: String,
    /// The selected document content on its own.
    pub content: String,
    pub report: ContextReport,
}

impl ContextPlan {
    /// System prompt, then history as alternating turns, then the question.
    pub fn messages(&self, history: &[ConversationTurn], question: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() * 2 + 2);
        messages.push(ChatMessage::system(self.system_prompt.as_str()));
        for turn in history {
            messages.push(ChatMessage::user(turn.question.as_str()));
            messages.push(ChatMessage::assistant(turn.answer.as_str()));
        }
        messages.push(ChatMessage::user(question));
        messages
    }
}

/// Filter → budget → truncate pipeline bound to one configuration snapshot.
#[derive(Debug, Clone)]
pub struct ContextPlanner {
    filter: PageFilter,
    budget: BudgetCalculator,
    truncator: RelevanceTruncator,
    page_spec: String,
    template: String,
    model: String,
    max_response_tokens: usize,
}

impl ContextPlanner {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            filter: PageFilter::new(&config.filter),
            budget: BudgetCalculator::new(&config.budget),
            truncator: RelevanceTruncator::new(),
            page_spec: config.qa.pages.trim().to_string(),
            template: config.qa.system_prompt_template().to_string(),
            model: config.qa.model().unwrap_or_default().to_string(),
            max_response_tokens: config.qa.max_response_tokens,
        }
    }

    pub fn with_truncator(mut self, truncator: RelevanceTruncator) -> Self {
        self.truncator = truncator;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the context for `question` given the session so far.
    pub fn plan(
        &self,
        document: &str,
        history: &[ConversationTurn],
        question: &str,
    ) -> ContextPlan {
        let (pages, page_spec_error) = match range::parse(&self.page_spec) {
            Ok(pages) => (pages, None),
            Err(err) => {
                warn!(spec = %self.page_spec, error = %err, "invalid page range, using all pages");
                (PageIndexSet::default(), Some(err.to_string()))
            }
        };

        let filtered = self.filter.filter(document, &pages);
        let budget = self.budget.available_tokens(
            &self.model,
            &self.template,
            history,
            question,
            self.max_response_tokens,
        );
        let truncated = self
            .truncator
            .truncate(&filtered.text, budget.available, question);

        let content = truncated.content.into_owned();
        let report = ContextReport {
            model: self.model.clone(),
            model_limit: budget.limit,
            available_tokens: budget.available,
            budget_exhausted: budget.exhausted,
            original_tokens: estimate_tokens(document),
            document_tokens: estimate_tokens(&filtered.text),
            final_tokens: estimate_tokens(&content),
            was_truncated: truncated.was_truncated,
            page_spec: (!self.page_spec.is_empty()).then(|| self.page_spec.clone()),
            page_spec_error,
            filter: filtered.report,
        };

        info!(
            model = %report.model,
            available = report.available_tokens,
            document = report.document_tokens,
            sent = report.final_tokens,
            truncated = report.was_truncated,
            "context planned"
        );

        ContextPlan {
            system_prompt: self.template.replace(CONTENT_PLACEHOLDER, &content),
            content,
            report,
        }
    }
}
