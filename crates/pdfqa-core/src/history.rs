//! Conversation history of one chat session.
//!
//! Append-only: a turn is recorded once its answer has fully streamed, and
//! the whole history is cleared when the user resets the session.

use serde::{Deserialize, Serialize};

use crate::llm::ChatMessage;

/// One completed question/answer pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
}

impl ConversationTurn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Ordered turns of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationHistory {
    turns: Vec<ConversationTurn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a completed turn.
    pub fn record(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(ConversationTurn::new(question, answer));
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Alternating user/assistant messages, oldest first.
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        self.turns
            .iter()
            .flat_map(|turn| {
                [
                    ChatMessage::user(turn.question.as_str()),
                    ChatMessage::assistant(turn.answer.as_str()),
                ]
            })
            .collect()
    }
}

impl FromIterator<ConversationTurn> for ConversationHistory {
    fn from_iter<I: IntoIterator<Item = ConversationTurn>>(iter: I) -> Self {
        Self {
            turns: iter.into_iter().collect(),
        }
    }
}
