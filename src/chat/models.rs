//! State tracked by the conversation controller.
use crate::client::Language;
use crate::history::{ChatMessage, Role};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Starting,
    Idle,
    Sending,
    Ending,
    Ended,
}

/// What happened to a request made through the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Nothing to send, e.g. blank input or an unchanged language
    Ignored,
    /// Another request was outstanding or the conversation isn't ready
    Dropped,
    Completed,
    /// The error was rendered in the chat log
    Failed,
    /// The session expired and a new one was started
    Restarted,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub session_id: Option<String>,
    pub language: Language,
}

impl Session {
    pub fn new(language: Language) -> Self {
        Self {
            session_id: None,
            language,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Transcript(Vec<ChatMessage>);

impl Transcript {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.0.clone()
    }

    pub fn push(&mut self, role: Role, content: &str) {
        self.0.push(ChatMessage::new(role, content))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
