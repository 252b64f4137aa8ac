// Copyright 2026 The Callwire Project
// SPDX-License-Identifier: Apache-2.0

// SSE decoding
//
// Splits the provider's byte stream into lines (across arbitrary chunk
// boundaries, including mid-codepoint) and turns each `data:` payload of
// an OpenAI-compatible chat completion chunk into tokens.

use super::{ProviderError, TokenStream};
use crate::stream::{CallFragment, Token};
use bytes::Bytes;
use futures_util::stream::{self, Stream, StreamExt};
use serde_json::Value;
use std::collections::VecDeque;
use std::pin::Pin;

/// Extract the payload of a `data:` line. Comments, blank lines and other
/// fields yield `None`.
pub fn parse_sse_data(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(':') {
        return None;
    }
    trimmed
        .strip_prefix("data: ")
        .or_else(|| trimmed.strip_prefix("data:"))
}

/// Decode one chunk payload.
///
/// Visible content is emitted before call fragments when a chunk carries
/// both. An `error` object in the payload is a provider failure.
pub fn decode_chunk(data: &str) -> Result<Vec<Token>, ProviderError> {
    let json: Value =
        serde_json::from_str(data).map_err(|e| ProviderError::Decode(format!("{e}: {data}")))?;

    if let Some(error) = json.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(ProviderError::Api(message));
    }

    let Some(delta) = json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("delta"))
    else {
        return Ok(Vec::new());
    };

    let mut tokens = Vec::new();
    if let Some(content) = delta.get("content").and_then(Value::as_str) {
        if !content.is_empty() {
            tokens.push(Token::Text(content.to_string()));
        }
    }
    if let Some(calls) = delta.get("tool_calls").and_then(Value::as_array) {
        for call in calls {
            let function = call.get("function");
            let field = |name: &str| {
                function
                    .and_then(|f| f.get(name))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            };
            tokens.push(Token::Call(CallFragment {
                index: call.get("index").and_then(Value::as_u64).unwrap_or(0) as usize,
                name: field("name"),
                arguments: field("arguments"),
            }));
        }
    }
    Ok(tokens)
}

struct Decoder {
    input: Pin<Box<dyn Stream<Item = Result<Bytes, ProviderError>> + Send>>,
    buffer: Vec<u8>,
    pending: VecDeque<Result<Token, ProviderError>>,
    finished: bool,
}

impl Decoder {
    fn drain_lines(&mut self) {
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.handle_line(&line[..pos]);
        }
    }

    fn handle_line(&mut self, raw: &[u8]) {
        if self.finished {
            return;
        }
        let line = String::from_utf8_lossy(raw);
        match parse_sse_data(&line) {
            None => {}
            Some("[DONE]") => self.finished = true,
            Some(data) => match decode_chunk(data) {
                Ok(tokens) => self.pending.extend(tokens.into_iter().map(Ok)),
                Err(e) => {
                    self.pending.push_back(Err(e));
                    self.finished = true;
                }
            },
        }
    }
}

/// Turn an SSE byte stream into a token stream. Ends at `[DONE]`, at the
/// end of input, or after the first error.
pub fn decode_sse<S>(input: S) -> TokenStream
where
    S: Stream<Item = Result<Bytes, ProviderError>> + Send + 'static,
{
    let decoder = Decoder {
        input: Box::pin(input),
        buffer: Vec::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    Box::pin(stream::unfold(decoder, |mut decoder| async move {
        loop {
            if let Some(item) = decoder.pending.pop_front() {
                return Some((item, decoder));
            }
            if decoder.finished {
                return None;
            }
            match decoder.input.next().await {
                Some(Ok(chunk)) => {
                    decoder.buffer.extend_from_slice(&chunk);
                    decoder.drain_lines();
                }
                Some(Err(e)) => {
                    decoder.pending.push_back(Err(e));
                    decoder.finished = true;
                }
                None => {
                    let rest = std::mem::take(&mut decoder.buffer);
                    decoder.handle_line(&rest);
                    decoder.finished = true;
                }
            }
        }
    }))
}
