//! Conversation model persisted per user

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timestamp;

/// Title shown for a conversation before its first question
pub const DEFAULT_TITLE: &str = "Percakapan Baru";

const TITLE_CHARS: usize = 25;
const ELLIPSIS_THRESHOLD: usize = 50;

/// One question/answer turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub question: String,
    pub answer: String,
    #[serde(with = "timestamp")]
    pub timestamp: NaiveDateTime,
}

/// A titled, timestamped sequence of turns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(with = "timestamp")]
    pub created: NaiveDateTime,
    #[serde(with = "timestamp")]
    pub updated: NaiveDateTime,
    #[serde(default)]
    pub messages: Vec<Message>,
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

impl Conversation {
    /// A fresh, empty conversation with a random id
    pub fn new() -> Self {
        let now = timestamp::now();
        Self {
            id: Uuid::new_v4(),
            title: default_title(),
            created: now,
            updated: now,
            messages: Vec::new(),
        }
    }

    /// Append a turn. The first turn also sets the title.
    pub fn push_turn(&mut self, question: &str, answer: String) -> &Message {
        self.messages.push(Message {
            question: question.to_string(),
            answer,
            timestamp: timestamp::now(),
        });
        if self.messages.len() == 1 {
            self.title = title_from_question(question);
        }
        &self.messages[self.messages.len() - 1]
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            id: self.id,
            title: self.title.clone(),
            created: self.created,
            updated: self.updated,
            message_count: self.messages.len(),
        }
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

/// Listing entry for a stored conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationSummary {
    pub id: Uuid,
    pub title: String,
    #[serde(with = "timestamp")]
    pub created: NaiveDateTime,
    #[serde(with = "timestamp")]
    pub updated: NaiveDateTime,
    pub message_count: usize,
}

/// Derive a conversation title from its first question.
///
/// Keeps the first 25 characters of the trimmed question; `...` is appended
/// only when the trimmed question exceeds 50 characters.
pub fn title_from_question(question: &str) -> String {
    let trimmed = question.trim();
    let mut title: String = trimmed.chars().take(TITLE_CHARS).collect();
    if trimmed.chars().count() > ELLIPSIS_THRESHOLD {
        title.push_str("...");
    }
    title
}
