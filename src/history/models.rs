use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::Language;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: &str) -> Self {
        Self {
            role,
            content: content.to_string(),
        }
    }
}

/// A saved conversation and the summary generated at the end of it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub language: Language,
    pub summary_html: String,
    pub conversation: Vec<ChatMessage>,
}

/// The caller-provided parts of a record. Id and timestamp are
/// assigned on save.
#[derive(Clone, Debug)]
pub struct NewRecord {
    pub language: Language,
    pub summary_html: String,
    pub conversation: Vec<ChatMessage>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordMeta {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub language: Language,
    pub preview: String,
}

#[derive(Debug, thiserror::Error)]
#[error("Chat record {0} not found")]
pub struct RecordNotFound(pub String);
