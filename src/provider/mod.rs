// Copyright 2026 The Callwire Project
// SPDX-License-Identifier: Apache-2.0

// Provider client
//
// Opens a streaming chat completion against an OpenAI-compatible endpoint
// and exposes it as a stream of tokens. The registry's tool definitions
// are advertised on every request.

mod sse;

pub use sse::{decode_chunk, decode_sse, parse_sse_data};

use crate::config::ProviderConfig;
use crate::message::Message;
use crate::registry;
use crate::stream::Token;
use async_trait::async_trait;
use futures_util::{Stream, TryStreamExt};
use serde_json::{json, Value};
use std::pin::Pin;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Non-success HTTP status while opening the stream.
    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The provider reported an error inside the stream.
    #[error("provider error: {0}")]
    Api(String),

    /// The request could not be sent or the connection failed before
    /// streaming began.
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("provider request timed out: {0}")]
    Timeout(String),

    /// The connection failed after streaming began.
    #[error("stream interrupted: {0}")]
    Interrupted(String),

    #[error("undecodable chunk: {0}")]
    Decode(String),
}

impl ProviderError {
    fn from_request(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout(e.to_string())
        } else {
            ProviderError::Transport(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Trait: ChatProvider
// ---------------------------------------------------------------------------

pub type TokenStream = Pin<Box<dyn Stream<Item = Result<Token, ProviderError>> + Send>>;

/// Source of streamed model output.
///
/// Implementations must be Send + Sync; the engine shares one instance
/// across all connections via `Arc`.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Start a completion for `messages`. Resolves once the provider has
    /// accepted the request and streaming can begin.
    async fn open_stream(&self, messages: &[Message]) -> Result<TokenStream, ProviderError>;
}

// ---------------------------------------------------------------------------
// OpenAI-compatible provider
// ---------------------------------------------------------------------------

pub struct OpenAiProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    tools: Vec<Value>,
}

impl OpenAiProvider {
    pub fn new(client: reqwest::Client, config: &ProviderConfig) -> Self {
        Self {
            client,
            endpoint: format!("{}/v1/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            tools: registry::tool_definitions(),
        }
    }

    fn request_body(&self, messages: &[Message]) -> Value {
        json!({
            "model": self.model,
            "stream": true,
            "messages": messages,
            "tools": self.tools,
            "tool_choice": "auto",
        })
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    async fn open_stream(&self, messages: &[Message]) -> Result<TokenStream, ProviderError> {
        let mut request = self.client.post(&self.endpoint).json(&self.request_body(messages));
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.send().await.map_err(ProviderError::from_request)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "provider rejected completion request");
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(model = %self.model, messages = messages.len(), "provider stream opened");
        let bytes = response
            .bytes_stream()
            .map_err(|e| ProviderError::Interrupted(e.to_string()));
        Ok(decode_sse(bytes))
    }
}
