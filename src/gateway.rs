use reqwest::Client;
use std::future::Future;
use std::pin::Pin;

use crate::error::Result;
use crate::model::{self, ChunkStream, Message, ModelProfile};

/// One outbound exchange: the full message window plus the delivery mode.
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub stream: bool,
}

pub type ChatFuture<'a> = Pin<Box<dyn Future<Output = Result<ChunkStream>> + 'a>>;

/// Seam between the conversation logic and the HTTP backends. Sessions and
/// the interactive loop are tested against stub implementations.
pub trait ModelGateway {
    fn send(&self, request: ChatRequest) -> ChatFuture<'_>;
}

pub struct HttpModelGateway<'a> {
    client: &'a Client,
    profile: &'a ModelProfile,
}

impl<'a> HttpModelGateway<'a> {
    pub fn new(client: &'a Client, profile: &'a ModelProfile) -> Self {
        Self { client, profile }
    }
}

impl ModelGateway for HttpModelGateway<'_> {
    fn send(&self, request: ChatRequest) -> ChatFuture<'_> {
        Box::pin(async move {
            model::send(self.client, self.profile, &request.messages, request.stream).await
        })
    }
}
