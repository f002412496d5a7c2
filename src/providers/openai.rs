use futures::{StreamExt, stream};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::{ChunkStream, Message, ModelProfile};
use crate::providers::http_errors::{request_error, status_error};

#[derive(Debug, Serialize)]
struct ChatCompletionsRequest {
    model: String,
    stream: bool,
    messages: Vec<WireMessage>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

fn chat_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

fn to_wire_messages(messages: &[Message]) -> Vec<WireMessage> {
    messages
        .iter()
        .map(|msg| WireMessage {
            role: msg.role.as_str().to_string(),
            content: msg.content.clone(),
        })
        .collect()
}

pub async fn send(
    client: &Client,
    profile: &ModelProfile,
    messages: &[Message],
    stream: bool,
) -> Result<ChunkStream> {
    let api_url = chat_url(&profile.api_base);
    let body = ChatCompletionsRequest {
        model: profile.model.clone(),
        stream,
        messages: to_wire_messages(messages),
    };
    debug!(
        api_url = %api_url,
        model = %profile.model,
        message_count = messages.len(),
        stream,
        "sending chat completions request"
    );

    let response = client
        .post(&api_url)
        .bearer_auth(&profile.api_key)
        .json(&body)
        .send()
        .await
        .map_err(|err| {
            warn!(api_url = %api_url, model = %profile.model, error = %err, "chat completions request failed");
            request_error(err, &api_url)
        })?;

    let status = response.status();
    if !status.is_success() {
        let response_body = response
            .text()
            .await
            .unwrap_or_else(|_| "<failed to read response body>".to_string());
        warn!(
            api_url = %api_url,
            model = %profile.model,
            status = %status,
            response_body_len = response_body.len(),
            "chat completions returned non-success status"
        );
        return Err(status_error(status, &response_body));
    }

    if stream {
        return Ok(delta_stream(response));
    }

    let parsed: ChatCompletionsResponse = response.json().await.map_err(|err| Error::Api {
        status: status.as_u16(),
        message: format!("failed to parse chat completions response: {err}"),
    })?;
    let content = parsed
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .unwrap_or_default();
    debug!(model = %profile.model, response_len = content.len(), "received chat completions response");
    Ok(stream::iter([Ok(content)]).boxed())
}

enum SseItem {
    Delta(String),
    Done,
}

/// Incremental decoder for `data:`-framed server-sent events. Fed raw body
/// bytes; yields complete text deltas as lines become available.
struct SseDecoder {
    buffer: String,
}

impl SseDecoder {
    fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    fn push(&mut self, bytes: &[u8]) -> Vec<SseItem> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));

        let mut items = Vec::new();
        while let Some(line_end) = self.buffer.find('\n') {
            let line = self.buffer[..line_end].trim().to_string();
            self.buffer.drain(..=line_end);

            if line.is_empty() || line.starts_with(':') {
                continue;
            }

            let Some(data) = line.strip_prefix("data: ") else {
                warn!(line_len = line.len(), "skipping unrecognized stream line");
                continue;
            };

            if data == "[DONE]" {
                items.push(SseItem::Done);
                continue;
            }

            match serde_json::from_str::<StreamChunk>(data) {
                Ok(chunk) => {
                    let delta = chunk
                        .choices
                        .into_iter()
                        .next()
                        .and_then(|choice| choice.delta.content);
                    if let Some(text) = delta
                        && !text.is_empty()
                    {
                        items.push(SseItem::Delta(text));
                    }
                }
                Err(err) => warn!(error = %err, "skipping malformed stream event"),
            }
        }
        items
    }
}

fn delta_stream(response: reqwest::Response) -> ChunkStream {
    response
        .bytes_stream()
        .map(|result| result.map_err(|err| Error::Network(format!("stream interrupted: {err}"))))
        .scan(
            (SseDecoder::new(), false),
            |(decoder, finished), result| {
                if *finished {
                    return futures::future::ready(None);
                }
                let items: Vec<Result<String>> = match result {
                    Ok(bytes) => decoder
                        .push(&bytes)
                        .into_iter()
                        .filter_map(|item| match item {
                            SseItem::Delta(text) => Some(Ok(text)),
                            SseItem::Done => {
                                *finished = true;
                                None
                            }
                        })
                        .collect(),
                    Err(err) => {
                        *finished = true;
                        vec![Err(err)]
                    }
                };
                futures::future::ready(Some(items))
            },
        )
        .flat_map(stream::iter)
        .boxed()
}
