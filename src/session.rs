use futures::StreamExt;
use std::io::Write;
use tracing::debug;

use crate::error::Result;
use crate::gateway::{ChatRequest, ModelGateway};
use crate::history::HistoryBuffer;
use crate::model::Message;

/// Drives one question/answer exchange at a time. The request always carries
/// the rolling history plus the question being asked; both turns are
/// committed to the buffer only after the exchange succeeds, so a failed
/// call leaves history untouched.
pub struct ConversationSession<G, W> {
    gateway: G,
    history: HistoryBuffer,
    stream_output: bool,
    sink: W,
}

impl<G, W> ConversationSession<G, W>
where
    G: ModelGateway,
    W: Write,
{
    pub fn new(gateway: G, history: HistoryBuffer, stream_output: bool, sink: W) -> Self {
        Self {
            gateway,
            history,
            stream_output,
            sink,
        }
    }

    pub fn streams(&self) -> bool {
        self.stream_output
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    #[cfg(test)]
    pub(crate) fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Sends `user_text` with the current history and returns the full
    /// reply. When streaming is on, chunks are written to the sink as they
    /// arrive, in order.
    pub async fn ask(&mut self, user_text: &str) -> Result<String> {
        let mut messages = self.history.as_messages().to_vec();
        messages.push(Message::user(user_text));

        let mut chunks = self
            .gateway
            .send(ChatRequest {
                messages,
                stream: self.stream_output,
            })
            .await?;

        let mut reply = String::new();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            if self.stream_output {
                self.sink.write_all(chunk.as_bytes())?;
                self.sink.flush()?;
            }
            reply.push_str(&chunk);
        }

        self.history.append(Message::user(user_text));
        self.history.append(Message::assistant(reply.clone()));
        debug!(
            reply_len = reply.len(),
            history_len = self.history.len(),
            "conversation turn committed"
        );
        Ok(reply)
    }
}
