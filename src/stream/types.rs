// Copyright 2026 The Callwire Project
// SPDX-License-Identifier: Apache-2.0

// Stream types
//
// Tokens coming out of the provider, the call being assembled, the
// classifier's states and outputs, and stream errors.

use std::fmt;

/// Maximum accumulated argument bytes for one call (1 MiB).
pub const MAX_CALL_BUFFER_BYTES: usize = 1_048_576;

/// Text tokens an unresolved inline candidate may be held across.
pub const INLINE_WATCH_MAX_CHUNKS: usize = 16;

/// Bytes an unresolved inline candidate may grow to before its body opens.
pub const INLINE_WATCH_MAX_BYTES: usize = 256;

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// One incremental unit from the provider stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Visible text.
    Text(String),
    /// A structured call-channel fragment.
    Call(CallFragment),
}

/// A piece of a structured call. The name usually arrives once, in the
/// first fragment; arguments arrive as string deltas.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CallFragment {
    pub index: usize,
    pub name: Option<String>,
    pub arguments: Option<String>,
}

impl Token {
    pub fn text(s: impl Into<String>) -> Self {
        Token::Text(s.into())
    }

    pub fn call(index: usize, name: Option<&str>, arguments: Option<&str>) -> Self {
        Token::Call(CallFragment {
            index,
            name: name.map(str::to_string),
            arguments: arguments.map(str::to_string),
        })
    }
}

// ---------------------------------------------------------------------------
// Pending call
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallSource {
    /// Delivered on the provider's structured call channel.
    Channel,
    /// Written into the visible text as `functions.name({...})`.
    Inline,
}

/// A call being assembled, handed to the dispatcher once complete.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCall {
    pub name: Option<String>,
    pub raw_arguments: String,
    pub source: CallSource,
    pub index: usize,
    /// Text that arrived after the call was detected. Never shown to the
    /// consumer; kept for diagnostics.
    pub absorbed_text: String,
}

impl PendingCall {
    pub fn channel(index: usize) -> Self {
        Self {
            name: None,
            raw_arguments: String::new(),
            source: CallSource::Channel,
            index,
            absorbed_text: String::new(),
        }
    }

    pub fn inline(name: String, raw_arguments: String) -> Self {
        Self {
            name: Some(name),
            raw_arguments,
            source: CallSource::Inline,
            index: 0,
            absorbed_text: String::new(),
        }
    }

    /// The call name, or an empty string if the provider never sent one.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    pub fn append_arguments(&mut self, delta: &str, limit: usize) -> Result<(), StreamError> {
        if self.raw_arguments.len() + delta.len() > limit {
            return Err(StreamError::BufferOverflow {
                name: self.name().to_string(),
                limit,
            });
        }
        self.raw_arguments.push_str(delta);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Classifier state and output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierState {
    /// Forwarding text.
    Text,
    /// Accumulating a structured call.
    ChannelCall,
    /// Holding text that may be the start of an inline marker.
    InlineWatch,
    /// Holding an inline marker whose argument body is open.
    InlineCall,
    Done,
    Failed,
}

impl fmt::Display for ClassifierState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClassifierState::Text => "text",
            ClassifierState::ChannelCall => "channel_call",
            ClassifierState::InlineWatch => "inline_watch",
            ClassifierState::InlineCall => "inline_call",
            ClassifierState::Done => "done",
            ClassifierState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What the classifier asks its driver to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierOutput {
    /// Forward text to the consumer.
    Text(String),
    /// The text portion of the response is complete.
    Completed,
    /// A call was detected; the consumer should show a waiting state.
    CallStarted { name: Option<String> },
    /// The call is fully assembled and ready to dispatch.
    CallReady(PendingCall),
    /// Classification failed; nothing further will be produced.
    Error(StreamError),
}

/// Bounds on how much the classifier holds back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierLimits {
    pub inline_watch_max_chunks: usize,
    pub inline_watch_max_bytes: usize,
    pub max_call_buffer_bytes: usize,
}

impl Default for ClassifierLimits {
    fn default() -> Self {
        Self {
            inline_watch_max_chunks: INLINE_WATCH_MAX_CHUNKS,
            inline_watch_max_bytes: INLINE_WATCH_MAX_BYTES,
            max_call_buffer_bytes: MAX_CALL_BUFFER_BYTES,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    #[error("call arguments for `{name}` exceeded {limit} bytes")]
    BufferOverflow { name: String, limit: usize },
}
