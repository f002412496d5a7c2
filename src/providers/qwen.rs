use futures::{StreamExt, stream};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::{ChunkStream, Message, ModelProfile};
use crate::providers::http_errors::{request_error, status_error};

#[derive(Debug, Serialize)]
struct GenerationRequest {
    model: String,
    input: GenerationInput,
    parameters: GenerationParameters,
}

#[derive(Debug, Serialize)]
struct GenerationInput {
    messages: Vec<WireMessage>,
}

#[derive(Debug, Serialize)]
struct GenerationParameters {
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    output: GenerationOutput,
}

#[derive(Debug, Default, Deserialize)]
struct GenerationOutput {
    #[serde(default)]
    text: String,
}

fn generation_url(base_url: &str) -> String {
    format!(
        "{}/services/aigc/text-generation/generation",
        base_url.trim_end_matches('/')
    )
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
    let api_url = generation_url(&profile.api_base);
    let body = GenerationRequest {
        model: profile.model.clone(),
        input: GenerationInput {
            messages: to_wire_messages(messages),
        },
        parameters: GenerationParameters { stream },
    };
    debug!(
        api_url = %api_url,
        model = %profile.model,
        message_count = messages.len(),
        stream,
        "sending generation request"
    );

    let response = client
        .post(&api_url)
        .bearer_auth(&profile.api_key)
        .json(&body)
        .send()
        .await
        .map_err(|err| {
            warn!(api_url = %api_url, model = %profile.model, error = %err, "generation request failed");
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
            "generation returned non-success status"
        );
        return Err(status_error(status, &response_body));
    }

    if stream {
        return Ok(text_stream(response));
    }

    let parsed: GenerationResponse = response.json().await.map_err(|err| Error::Api {
        status: status.as_u16(),
        message: format!("failed to parse generation response: {err}"),
    })?;
    debug!(model = %profile.model, response_len = parsed.output.text.len(), "received generation response");
    Ok(stream::iter([Ok(parsed.output.text)]).boxed())
}

/// Incremental decoder for the newline-delimited JSON events the generation
/// endpoint streams. Malformed lines are skipped, never fatal.
struct LineDecoder {
    buffer: String,
}

impl LineDecoder {
    fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));

        let mut texts = Vec::new();
        while let Some(line_end) = self.buffer.find('\n') {
            let line = self.buffer[..line_end].trim().to_string();
            self.buffer.drain(..=line_end);

            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<GenerationResponse>(&line) {
                Ok(event) if !event.output.text.is_empty() => texts.push(event.output.text),
                Ok(_) => {}
                Err(err) => warn!(error = %err, "skipping malformed stream event"),
            }
        }
        texts
    }
}

fn text_stream(response: reqwest::Response) -> ChunkStream {
    response
        .bytes_stream()
        .map(|result| result.map_err(|err| Error::Network(format!("stream interrupted: {err}"))))
        .scan(LineDecoder::new(), |decoder, result| {
            let items: Vec<Result<String>> = match result {
                Ok(bytes) => decoder.push(&bytes).into_iter().map(Ok).collect(),
                Err(err) => vec![Err(err)],
            };
            futures::future::ready(Some(items))
        })
        .flat_map(stream::iter)
        .boxed()
}
