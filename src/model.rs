use futures::Stream;
use reqwest::Client;
use std::pin::Pin;
use tracing::debug;

use crate::error::Result;
use crate::providers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Finite, non-restartable sequence of reply fragments. Concatenating every
/// yielded chunk reconstructs the full assistant reply.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Backend wire shape for a configured model name. The set is enumerable on
/// purpose; each kind maps to one request/response format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// `chat/completions` endpoints; serves both `openai` and `deepseek`.
    OpenAiCompatible,
    /// DashScope text-generation endpoint.
    Qwen,
}

impl ProviderKind {
    pub fn from_model_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "openai" | "deepseek" => Some(Self::OpenAiCompatible),
            "qwen" => Some(Self::Qwen),
            _ => None,
        }
    }
}

/// Credentials, endpoint, and model identifier resolved for one backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelProfile {
    pub name: String,
    pub kind: ProviderKind,
    pub api_key: String,
    pub api_base: String,
    pub model: String,
}

pub async fn send(
    client: &Client,
    profile: &ModelProfile,
    messages: &[Message],
    stream: bool,
) -> Result<ChunkStream> {
    debug!(
        provider = ?profile.kind,
        model = %profile.model,
        message_count = messages.len(),
        stream,
        "dispatching model request"
    );

    match profile.kind {
        ProviderKind::OpenAiCompatible => {
            providers::openai::send(client, profile, messages, stream).await
        }
        ProviderKind::Qwen => providers::qwen::send(client, profile, messages, stream).await,
    }
}
