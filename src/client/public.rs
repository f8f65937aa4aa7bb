//! Wire types for the MediPulse backend API and the normalized
//! replies the rest of the crate works with.
use std::fmt;
use std::str::FromStr;

use anyhow::{Error, anyhow};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ar,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ar => "ar",
        }
    }

    pub fn is_rtl(&self) -> bool {
        matches!(self, Language::Ar)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Language::En),
            "ar" | "arabic" => Ok(Language::Ar),
            other => Err(anyhow!("Unsupported language: {}", other)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Text,
    Number,
    Boolean,
    Choice,
    #[serde(other)]
    Other,
}

/// A structured question as sent by the backend, e.g.
/// `{"id": "smoker", "text": "Are you currently a smoker?", "type": "boolean"}`
#[derive(Clone, Debug, Deserialize)]
pub struct Question {
    pub text: String,
    #[serde(rename = "type", default)]
    pub kind: Option<QuestionType>,
    pub options: Option<Vec<String>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Questions,
    Assessment,
    #[serde(other)]
    Unknown,
}

// Requests

#[derive(Serialize)]
pub struct StartRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
}

#[derive(Serialize)]
pub struct ChatRequest<'a> {
    pub session_id: &'a str,
    pub message: &'a str,
}

#[derive(Serialize)]
pub struct EndChatRequest<'a> {
    pub session_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
}

#[derive(Serialize)]
pub struct SetLanguageRequest<'a> {
    pub session_id: &'a str,
    pub language: Language,
}

// Responses

#[derive(Debug, Deserialize)]
pub struct StartResponse {
    pub session_id: String,
    pub language: Option<Language>,
    pub response: Option<String>,
    pub question: Option<Question>,
    pub options: Option<Vec<String>>,
    pub stage: Option<Stage>,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub response: Option<String>,
    pub message: Option<String>,
    pub next_question: Option<Question>,
    pub options: Option<Vec<String>>,
    pub stage: Option<Stage>,
}

#[derive(Debug, Deserialize)]
pub struct EndChatResponse {
    pub summary: String,
}

#[derive(Debug, Deserialize)]
pub struct SetLanguageResponse {
    pub status: Option<String>,
    pub language: Option<Language>,
}

// Normalized replies

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromptKind {
    FreeText,
    Boolean,
    MultipleChoice,
}

/// What kind of answer the backend expects next.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub options: Vec<String>,
}

impl Prompt {
    pub fn free_text() -> Self {
        Self {
            kind: PromptKind::FreeText,
            options: Vec::new(),
        }
    }

    /// Boolean questions without explicit options get Yes/No buttons.
    pub fn from_parts(kind: Option<QuestionType>, options: Vec<String>) -> Self {
        match kind {
            Some(QuestionType::Boolean) if options.is_empty() => Self {
                kind: PromptKind::Boolean,
                options: vec![String::from("Yes"), String::from("No")],
            },
            Some(QuestionType::Boolean) => Self {
                kind: PromptKind::Boolean,
                options,
            },
            _ if !options.is_empty() => Self {
                kind: PromptKind::MultipleChoice,
                options,
            },
            _ => Self::free_text(),
        }
    }

    pub fn is_constrained(&self) -> bool {
        !self.options.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BotReply {
    pub text: String,
    pub prompt: Prompt,
    pub stage: Option<Stage>,
}

impl BotReply {
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            prompt: Prompt::free_text(),
            stage: None,
        }
    }

    pub fn with_options(mut self, options: &[&str]) -> Self {
        self.prompt = Prompt {
            kind: PromptKind::MultipleChoice,
            options: options.iter().map(|o| o.to_string()).collect(),
        };
        self
    }

    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StartReply {
    pub session_id: String,
    pub language: Language,
    pub reply: BotReply,
}

fn reply_from(
    text: Option<String>,
    question: Option<Question>,
    options: Option<Vec<String>>,
    stage: Option<Stage>,
) -> Option<BotReply> {
    // A null list is treated the same as a missing one
    let options = options.unwrap_or_default();
    let (question_text, kind, question_options) = match question {
        Some(q) => (Some(q.text), q.kind, q.options.unwrap_or_default()),
        None => (None, None, Vec::new()),
    };
    let options = if options.is_empty() {
        question_options
    } else {
        options
    };
    let text = text.or(question_text)?;

    Some(BotReply {
        text,
        prompt: Prompt::from_parts(kind, options),
        stage,
    })
}

impl StartResponse {
    pub fn into_reply(self, requested: Option<Language>) -> Option<StartReply> {
        let language = self.language.or(requested).unwrap_or_default();
        let session_id = self.session_id;
        let reply = reply_from(self.response, self.question, self.options, self.stage)?;
        Some(StartReply {
            session_id,
            language,
            reply,
        })
    }
}

impl ChatResponse {
    pub fn into_reply(self) -> Option<BotReply> {
        // Prefer the free-form response, then the stage message, then
        // the text of the next structured question
        let text = self.response.or(self.message);
        reply_from(text, self.next_question, self.options, self.stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn it_parses_languages() {
        assert_eq!("en".parse::<Language>().unwrap(), Language::En);
        assert_eq!(" Arabic ".parse::<Language>().unwrap(), Language::Ar);
        assert!("fr".parse::<Language>().is_err());
        assert!(Language::Ar.is_rtl());
        assert!(!Language::En.is_rtl());
    }

    #[test]
    fn it_normalizes_boolean_question_to_yes_no() {
        let resp: ChatResponse = serde_json::from_value(json!({
            "next_question": {"id": "smoker", "text": "Are you currently a smoker?", "type": "boolean"},
            "progress": 60
        }))
        .unwrap();
        let reply = resp.into_reply().unwrap();

        assert_eq!(reply.text, "Are you currently a smoker?");
        assert_eq!(reply.prompt.kind, PromptKind::Boolean);
        assert_eq!(reply.prompt.options, vec!["Yes", "No"]);
    }

    #[test]
    fn it_normalizes_options_to_multiple_choice() {
        let resp: ChatResponse = serde_json::from_value(json!({
            "response": "How long have you had it?",
            "options": ["Less than a day", "A few days", "Over a week"]
        }))
        .unwrap();
        let reply = resp.into_reply().unwrap();

        assert_eq!(reply.prompt.kind, PromptKind::MultipleChoice);
        assert_eq!(reply.prompt.options.len(), 3);
        assert_eq!(reply.stage, None);
    }

    #[test]
    fn it_reads_assessment_stage_message() {
        let resp: ChatResponse = serde_json::from_value(json!({
            "message": "Please describe your symptoms in detail:",
            "stage": "assessment"
        }))
        .unwrap();
        let reply = resp.into_reply().unwrap();

        assert_eq!(reply.text, "Please describe your symptoms in detail:");
        assert_eq!(reply.stage, Some(Stage::Assessment));
        assert!(!reply.prompt.is_constrained());
    }

    #[test]
    fn it_tolerates_unknown_stage_and_question_type() {
        let resp: ChatResponse = serde_json::from_value(json!({
            "next_question": {"text": "Pick a date", "type": "date"},
            "stage": "triage"
        }))
        .unwrap();
        let reply = resp.into_reply().unwrap();

        assert_eq!(reply.stage, Some(Stage::Unknown));
        assert_eq!(reply.prompt, Prompt::free_text());
    }

    #[test]
    fn it_treats_null_options_as_free_text() {
        let resp: ChatResponse = serde_json::from_value(json!({
            "response": "Tell me more about the pain",
            "options": null,
            "next_question": {"text": "Where does it hurt?", "type": "text", "options": null}
        }))
        .unwrap();
        let reply = resp.into_reply().unwrap();

        assert_eq!(reply.text, "Tell me more about the pain");
        assert_eq!(reply.prompt, Prompt::free_text());

        let resp: StartResponse = serde_json::from_value(json!({
            "session_id": "s1",
            "response": "Hello",
            "options": null
        }))
        .unwrap();
        let start = resp.into_reply(None).unwrap();
        assert!(!start.reply.prompt.is_constrained());
    }

    #[test]
    fn it_rejects_reply_without_text() {
        let resp: ChatResponse = serde_json::from_value(json!({"stage": "questions"})).unwrap();
        assert!(resp.into_reply().is_none());
    }

    #[test]
    fn it_keeps_requested_language_when_server_omits_it() {
        let resp: StartResponse = serde_json::from_value(json!({
            "session_id": "s1",
            "question": {"id": "name", "text": "What is your full name?", "type": "text"}
        }))
        .unwrap();
        let start = resp.into_reply(Some(Language::Ar)).unwrap();

        assert_eq!(start.language, Language::Ar);
        assert_eq!(start.reply.text, "What is your full name?");
    }
}
