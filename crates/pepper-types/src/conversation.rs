//! Conversation turns and the append-only context owned by the orchestrator.

use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One utterance in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// Ordered, append-only history of one interactive run.
///
/// The full history is always retained. When a window is set, only the
/// trailing `window` turns are exposed to prompt assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationContext {
    turns: Vec<Turn>,
    window: Option<usize>,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context whose prompt view is limited to the last `window` turns.
    pub fn with_window(window: usize) -> Self {
        Self {
            turns: Vec::new(),
            window: Some(window),
        }
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Appends a completed user/assistant exchange.
    pub fn record_exchange(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.turns.push(Turn::user(user));
        self.turns.push(Turn::assistant(assistant));
    }

    /// Every turn recorded so far.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The turns that should be rendered into the next prompt.
    pub fn prompt_view(&self) -> &[Turn] {
        match self.window {
            Some(window) if self.turns.len() > window => &self.turns[self.turns.len() - window..],
            _ => &self.turns,
        }
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
