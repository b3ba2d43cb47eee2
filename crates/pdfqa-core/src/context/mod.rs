//! Fitting document content into a model's context window.

pub mod budget;
pub mod planner;
pub mod relevance;
pub mod tokens;

pub use budget::{Budget, BudgetCalculator};
pub use planner::{ContextPlan, ContextPlanner, ContextReport};
pub use relevance::{RelevanceTruncator, TruncationResult};
pub use tokens::{TokenEstimator, estimate_tokens};
