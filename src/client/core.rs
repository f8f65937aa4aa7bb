use std::sync::Arc;
use std::time::Duration;

use anyhow::{Error, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::public::{
    BotReply, ChatRequest, ChatResponse, EndChatRequest, EndChatResponse, Language,
    SetLanguageRequest, SetLanguageResponse, StartReply, StartRequest, StartResponse,
};

/// Failures a chat call can end in. Callers branch on these so they
/// stay typed instead of going through `anyhow`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The request never got a response (connection, timeout)
    #[error("Network error: {0}")]
    Network(String),
    #[error("{0}")]
    Server(String),
    /// The backend dropped the session and wants the client to start over
    #[error("{0}")]
    SessionExpired(String),
}

/// The four calls the chat widget makes against the backend.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn start(&self, language: Option<Language>) -> Result<StartReply, ClientError>;

    async fn send_turn(&self, session_id: &str, message: &str) -> Result<BotReply, ClientError>;

    async fn set_language(
        &self,
        session_id: &str,
        language: Language,
    ) -> Result<Language, ClientError>;

    /// Returns the conversation summary as HTML.
    async fn end_chat(
        &self,
        session_id: &str,
        language: Option<Language>,
    ) -> Result<String, ClientError>;
}

#[async_trait]
impl<T: ChatBackend + ?Sized> ChatBackend for Arc<T> {
    async fn start(&self, language: Option<Language>) -> Result<StartReply, ClientError> {
        (**self).start(language).await
    }

    async fn send_turn(&self, session_id: &str, message: &str) -> Result<BotReply, ClientError> {
        (**self).send_turn(session_id, message).await
    }

    async fn set_language(
        &self,
        session_id: &str,
        language: Language,
    ) -> Result<Language, ClientError> {
        (**self).set_language(session_id, language).await
    }

    async fn end_chat(
        &self,
        session_id: &str,
        language: Option<Language>,
    ) -> Result<String, ClientError> {
        (**self).end_chat(session_id, language).await
    }
}

/// HTTP implementation of `ChatBackend` for the MediPulse API.
#[derive(Clone)]
pub struct SessionClient {
    api_base_url: String,
    http: reqwest::Client,
}

fn network_error(err: reqwest::Error) -> ClientError {
    if err.is_timeout() {
        ClientError::Network(String::from("Request timed out"))
    } else {
        ClientError::Network(err.to_string())
    }
}

/// Interpret a response body. The backend reports failures as
/// `{"error": "...", "action": "restart"?}` with varying status codes
/// so the body is inspected before the status.
fn decode<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T, ClientError> {
    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) if status.is_success() => {
            return Err(ClientError::Server(String::from(
                "Malformed response from server",
            )));
        }
        Err(_) => {
            return Err(ClientError::Server(format!(
                "Request failed with status {}",
                status
            )));
        }
    };

    if let Some(err) = value.get("error").filter(|e| !e.is_null()) {
        let msg = err
            .as_str()
            .map(String::from)
            .unwrap_or_else(|| err.to_string());
        if value.get("action").and_then(Value::as_str) == Some("restart") {
            return Err(ClientError::SessionExpired(msg));
        }
        return Err(ClientError::Server(msg));
    }

    if !status.is_success() {
        return Err(ClientError::Server(format!(
            "Request failed with status {}",
            status
        )));
    }

    serde_json::from_value(value)
        .map_err(|e| ClientError::Server(format!("Malformed response from server: {}", e)))
}

impl SessionClient {
    pub fn new(api_base_url: &str, timeout: Duration) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn post<Req, Resp>(&self, path: &str, payload: &Req) -> Result<Resp, ClientError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = format!("{}{}", self.api_base_url, path);
        tracing::debug!("POST {}", url);

        let resp = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await
            .map_err(network_error)?;
        let status = resp.status();
        let body = resp.text().await.map_err(network_error)?;

        tracing::debug!("{} responded {}: {}", path, status, body);
        decode(status, &body)
    }
}

#[async_trait]
impl ChatBackend for SessionClient {
    async fn start(&self, language: Option<Language>) -> Result<StartReply, ClientError> {
        let resp: StartResponse = self.post("/api/start", &StartRequest { language }).await?;
        resp.into_reply(language).ok_or(ClientError::Server(String::from(
            "Malformed response from server: missing opening message",
        )))
    }

    async fn send_turn(&self, session_id: &str, message: &str) -> Result<BotReply, ClientError> {
        let resp: ChatResponse = self
            .post(
                "/api/chat",
                &ChatRequest {
                    session_id,
                    message,
                },
            )
            .await?;
        resp.into_reply().ok_or(ClientError::Server(String::from(
            "Malformed response from server: missing reply",
        )))
    }

    async fn set_language(
        &self,
        session_id: &str,
        language: Language,
    ) -> Result<Language, ClientError> {
        let resp: SetLanguageResponse = self
            .post(
                "/api/set_language",
                &SetLanguageRequest {
                    session_id,
                    language,
                },
            )
            .await?;
        match resp.status.as_deref() {
            None | Some("success") => Ok(resp.language.unwrap_or(language)),
            Some(other) => Err(ClientError::Server(format!(
                "Unable to change language: {}",
                other
            ))),
        }
    }

    async fn end_chat(
        &self,
        session_id: &str,
        language: Option<Language>,
    ) -> Result<String, ClientError> {
        let resp: EndChatResponse = self
            .post(
                "/api/end_chat",
                &EndChatRequest {
                    session_id,
                    language,
                },
            )
            .await?;
        Ok(resp.summary)
    }
}
