use crate::config::Config;
use crate::events::{ChatMessage, ChatRole, Source};
use anyhow::Context;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Failures talking to the answer service.
///
/// Users only ever see the generic fallback message; the variants exist for
/// the log.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("service unreachable: {0}")]
    Unreachable(String),

    #[error("request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("request rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Prior turn forwarded in the `history` field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: ChatRole,
    pub content: String,
}

impl From<&ChatMessage> for HistoryTurn {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.role(),
            content: message.content().to_string(),
        }
    }
}

/// Body of `POST /api/v1/chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    pub history: Vec<HistoryTurn>,
}

impl ChatRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            history: Vec::new(),
        }
    }

    pub fn with_history(mut self, history: Vec<HistoryTurn>) -> Self {
        self.history = history;
        self
    }
}

/// Body returned by the chat endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    #[serde(default)]
    pub sources: Option<Vec<Source>>,
}

/// Body returned by the health endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

/// The answer service as seen by the conversation.
pub trait ChatApi: Send + Sync {
    /// Exchange one question for one answer.
    fn ask(&self, request: ChatRequest) -> BoxFuture<'_, Result<ChatResponse, ApiError>>;

    /// Probe service liveness.
    fn health(&self) -> BoxFuture<'_, Result<HealthStatus, ApiError>>;
}

/// reqwest-backed client for the Sema-Data API
#[derive(Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    chat_url: String,
    health_url: String,
    timeout_secs: Option<u64>,
}

impl ChatClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.api.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            chat_url: config.chat_url(),
            health_url: config.health_url(),
            timeout_secs: config.api.timeout_secs,
        })
    }

    async fn post_chat(&self, request: ChatRequest) -> Result<ChatResponse, ApiError> {
        debug!(url = %self.chat_url, history = request.history.len(), "sending chat request");

        let response = self
            .client
            .post(&self.chat_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        Self::decode(response).await
    }

    async fn get_health(&self) -> Result<HealthStatus, ApiError> {
        let response = self
            .client
            .get(&self.health_url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        Self::decode(response).await
    }

    async fn decode<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Malformed(format!("failed to read body: {}", e)))?;

        if !status.is_success() {
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| ApiError::Malformed(e.to_string()))
    }

    fn transport_error(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout {
                seconds: self.timeout_secs.unwrap_or_default(),
            }
        } else {
            ApiError::Unreachable(err.to_string())
        }
    }
}

impl ChatApi for ChatClient {
    fn ask(&self, request: ChatRequest) -> BoxFuture<'_, Result<ChatResponse, ApiError>> {
        self.post_chat(request).boxed()
    }

    fn health(&self) -> BoxFuture<'_, Result<HealthStatus, ApiError>> {
        self.get_health().boxed()
    }
}
