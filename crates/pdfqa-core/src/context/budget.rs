//! Token budget for document content.
//!
//! The model's context window has to hold the system prompt (without the
//! document), every earlier turn, the new question and the answer. Whatever
//! is left, minus a safety margin, is available for the document:
//!
//! ```text
//! available = limit - (prompt + history + question + response + margin)
//! ```
//!
//! The result never drops below the configured floor. Budgets are computed
//! fresh for every question because history grows each turn.

use tracing::{debug, warn};

use pdfqa_config::{BudgetConfig, CONTENT_PLACEHOLDER};

use super::tokens::TokenEstimator;
use crate::history::ConversationTurn;

/// Outcome of one budget computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    /// Tokens available for document content.
    pub available: usize,
    /// Context window of the model.
    pub limit: usize,
    /// Tokens consumed by everything except the document.
    pub overhead: usize,
    /// The overhead alone reached the limit; `available` is the floor.
    pub exhausted: bool,
}

/// Computes document budgets.
#[derive(Debug, Clone)]
pub struct BudgetCalculator {
    estimator: TokenEstimator,
    safety_margin: usize,
    floor: usize,
}

impl Default for BudgetCalculator {
    fn default() -> Self {
        Self::new(&BudgetConfig::default())
    }
}

impl BudgetCalculator {
    pub fn new(config: &BudgetConfig) -> Self {
        Self {
            estimator: TokenEstimator::new(config),
            safety_margin: config.safety_margin,
            floor: config.floor,
        }
    }

    pub fn estimator(&self) -> &TokenEstimator {
        &self.estimator
    }

    /// Tokens left for document content in the next request.
    pub fn available_tokens(
        &self,
        model: &str,
        system_prompt_template: &str,
        history: &[ConversationTurn],
        question: &str,
        max_response_tokens: usize,
    ) -> Budget {
        let limit = self.estimator.token_limit(model);

        let prompt = self
            .estimator
            .count_tokens(&system_prompt_template.replace(CONTENT_PLACEHOLDER, ""));
        let history_tokens: usize = history
            .iter()
            .map(|turn| {
                self.estimator.count_tokens(&turn.question) + self.estimator.count_tokens(&turn.answer)
            })
            .sum();
        let question_tokens = self.estimator.count_tokens(question);

        let overhead = prompt
            .saturating_add(history_tokens)
            .saturating_add(question_tokens)
            .saturating_add(max_response_tokens)
            .saturating_add(self.safety_margin);

        let remaining = limit.saturating_sub(overhead);
        let exhausted = remaining <= self.floor;
        let available = remaining.max(self.floor);

        if exhausted {
            warn!(
                model,
                limit,
                overhead,
                floor = self.floor,
                "prompt overhead leaves no room for document content"
            );
        } else {
            debug!(
                model,
                limit,
                prompt,
                history = history_tokens,
                question = question_tokens,
                response = max_response_tokens,
                available,
                "document budget computed"
            );
        }

        Budget {
            available,
            limit,
            overhead,
            exhausted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tokens::estimate_tokens;
    use proptest::prelude::*;

    const TEMPLATE: &str = "Answer from this document:\n{pdf_content}\nBe precise.";

    #[test]
    fn test_budget_arithmetic() {
        let calc = BudgetCalculator::default();
        let budget = calc.available_tokens("gpt-4", TEMPLATE, &[], "What is the main result?", 2000);

        let prompt = estimate_tokens("Answer from this document:\n\nBe precise.");
        let question = estimate_tokens("What is the main result?");
        assert_eq!(budget.limit, 8192);
        assert_eq!(budget.overhead, prompt + question + 2000 + 100);
        assert_eq!(budget.available, 8192 - budget.overhead);
        assert!(!budget.exhausted);
    }

    #[test]
    fn test_placeholder_not_counted() {
        let calc = BudgetCalculator::default();
        let with = calc.available_tokens("gpt-4", "{pdf_content}", &[], "", 0);
        let without = calc.available_tokens("gpt-4", "", &[], "", 0);
        assert_eq!(with, without);
    }

    #[test]
    fn test_history_counts_both_sides() {
        let calc = BudgetCalculator::default();
        let empty = calc.available_tokens("gpt-4", TEMPLATE, &[], "q", 2000);
        let turn = ConversationTurn::new("x".repeat(40), "y".repeat(80));
        let one = calc.available_tokens("gpt-4", TEMPLATE, &[turn], "q", 2000);
        assert_eq!(empty.available - one.available, 10 + 20);
    }

    #[test]
    fn test_exhausted_returns_floor() {
        let calc = BudgetCalculator::default();
        let budget = calc.available_tokens("llama2", TEMPLATE, &[], "q", 5000);
        assert_eq!(budget.available, 0);
        assert!(budget.exhausted);

        let calc = BudgetCalculator::new(&BudgetConfig {
            floor: 128,
            ..Default::default()
        });
        let budget = calc.available_tokens("llama2", TEMPLATE, &[], "q", 5000);
        assert_eq!(budget.available, 128);
        assert!(budget.exhausted);
    }

    proptest! {
        #[test]
        fn prop_more_history_never_increases_budget(
            turns in proptest::collection::vec(("\\PC{0,300}", "\\PC{0,300}"), 0..12),
            extra in ("\\PC{0,300}", "\\PC{0,300}"),
        ) {
            let calc = BudgetCalculator::default();
            let mut history: Vec<ConversationTurn> = turns
                .into_iter()
                .map(|(q, a)| ConversationTurn::new(q, a))
                .collect();
            let before = calc.available_tokens("gpt-4", TEMPLATE, &history, "question", 2000);
            history.push(ConversationTurn::new(extra.0, extra.1));
            let after = calc.available_tokens("gpt-4", TEMPLATE, &history, "question", 2000);
            prop_assert!(after.available <= before.available);
        }
    }
}
