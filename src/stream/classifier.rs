// Copyright 2026 The Callwire Project
// SPDX-License-Identifier: Apache-2.0

// Stream classifier
//
// Turns the provider's token stream into text to forward and at most one
// call to dispatch. Text that might be the start of an inline marker is
// held back until the marker completes or is disproved; everything held
// is eventually either forwarded or consumed by a call, never both. A
// marker still unfinished when the stream ends is dropped.

use super::inline::{self, MarkerMatch, MARKER_KEYWORD};
use super::types::{
    CallFragment, ClassifierLimits, ClassifierOutput, ClassifierState, PendingCall, StreamError,
    Token,
};

/// Per-request classification state machine.
///
/// Synchronous and single-owner: the driver pushes tokens in arrival order
/// and acts on the returned outputs in order.
pub struct StreamClassifier {
    state: ClassifierState,
    limits: ClassifierLimits,
    held: String,
    watch_chunks: usize,
    pending: Option<PendingCall>,
}

impl StreamClassifier {
    pub fn new(limits: ClassifierLimits) -> Self {
        Self {
            state: ClassifierState::Text,
            limits,
            held: String::new(),
            watch_chunks: 0,
            pending: None,
        }
    }

    pub fn state(&self) -> ClassifierState {
        self.state
    }

    pub fn push(&mut self, token: Token) -> Vec<ClassifierOutput> {
        let mut out = Vec::new();
        match token {
            Token::Text(text) => self.push_text(text, &mut out),
            Token::Call(fragment) => self.push_fragment(fragment, &mut out),
        }
        out
    }

    /// The provider stream ended normally.
    pub fn finish(&mut self) -> Vec<ClassifierOutput> {
        let mut out = Vec::new();
        match self.state {
            ClassifierState::Done | ClassifierState::Failed => return out,
            ClassifierState::Text => {
                self.flush_held(&mut out);
                out.push(ClassifierOutput::Completed);
            }
            // `held` starts at the candidate; text before it is already out.
            ClassifierState::InlineWatch => {
                let held = std::mem::take(&mut self.held);
                if held.len() >= MARKER_KEYWORD.len() {
                    tracing::debug!(dropped = %held, "dropping unterminated inline marker at end of stream");
                } else if !held.is_empty() {
                    out.push(ClassifierOutput::Text(held));
                }
                out.push(ClassifierOutput::Completed);
            }
            ClassifierState::InlineCall => {
                let held = std::mem::take(&mut self.held);
                tracing::warn!(
                    function_name = %marker_name(&held),
                    held_bytes = held.len(),
                    "inline call body never closed, dropping marker"
                );
                out.push(ClassifierOutput::Completed);
            }
            ClassifierState::ChannelCall => {
                out.push(ClassifierOutput::Completed);
                if let Some(call) = self.pending.take() {
                    out.push(ClassifierOutput::CallReady(call));
                }
            }
        }
        self.enter(ClassifierState::Done);
        out
    }

    /// The provider stream failed. Held text is discarded.
    pub fn fail(&mut self) {
        self.held.clear();
        self.pending = None;
        self.enter(ClassifierState::Failed);
    }

    // -----------------------------------------------------------------------
    // Text
    // -----------------------------------------------------------------------

    fn push_text(&mut self, text: String, out: &mut Vec<ClassifierOutput>) {
        match self.state {
            ClassifierState::Done | ClassifierState::Failed => {
                tracing::trace!(state = %self.state, "ignoring text after classification ended");
                return;
            }
            ClassifierState::ChannelCall => {
                if let Some(call) = self.pending.as_mut() {
                    call.absorbed_text.push_str(&text);
                }
                return;
            }
            ClassifierState::InlineWatch => self.watch_chunks += 1,
            ClassifierState::Text | ClassifierState::InlineCall => {}
        }

        if text.is_empty() {
            return;
        }
        self.held.push_str(&text);
        self.scan(out);
    }

    /// Re-examine `held`, releasing everything that cannot be part of a
    /// marker and stopping at the first live candidate.
    fn scan(&mut self, out: &mut Vec<ClassifierOutput>) {
        let mut released = String::new();

        loop {
            let Some(pos) = inline::find_candidate(&self.held) else {
                released.push_str(&self.held);
                self.held.clear();
                self.enter(ClassifierState::Text);
                break;
            };

            match inline::match_marker(&self.held[pos..]) {
                MarkerMatch::Rejected => {
                    // The candidate starts with an ASCII 'f'.
                    released.extend(self.held.drain(..pos + 1));
                    self.watch_chunks = 0;
                }
                MarkerMatch::Partial { body_open } => {
                    if pos > 0 {
                        released.extend(self.held.drain(..pos));
                        self.watch_chunks = 0;
                    }
                    if body_open {
                        if self.held.len() > self.limits.max_call_buffer_bytes {
                            push_text(out, released);
                            self.overflow(out);
                            return;
                        }
                        self.enter(ClassifierState::InlineCall);
                    } else if self.watch_exhausted() {
                        tracing::debug!(
                            candidate = %self.held,
                            chunks = self.watch_chunks,
                            "inline candidate not resolved in time, releasing"
                        );
                        released.extend(self.held.drain(..1));
                        self.watch_chunks = 0;
                        continue;
                    } else {
                        self.enter(ClassifierState::InlineWatch);
                    }
                    break;
                }
                MarkerMatch::Complete {
                    end,
                    name,
                    arguments,
                } => {
                    released.push_str(&self.held[..pos]);
                    let mut call = PendingCall::inline(name.clone(), arguments);
                    call.absorbed_text = self.held[pos + end..].to_string();
                    self.held.clear();

                    tracing::debug!(function_name = %name, "inline call detected");
                    push_text(out, released);
                    out.push(ClassifierOutput::Completed);
                    out.push(ClassifierOutput::CallStarted { name: Some(name) });
                    out.push(ClassifierOutput::CallReady(call));
                    self.enter(ClassifierState::Done);
                    return;
                }
            }
        }

        push_text(out, released);
    }

    fn watch_exhausted(&self) -> bool {
        self.watch_chunks >= self.limits.inline_watch_max_chunks
            || self.held.len() > self.limits.inline_watch_max_bytes
    }

    // -----------------------------------------------------------------------
    // Call channel
    // -----------------------------------------------------------------------

    fn push_fragment(&mut self, fragment: CallFragment, out: &mut Vec<ClassifierOutput>) {
        match self.state {
            ClassifierState::Done | ClassifierState::Failed => {
                tracing::trace!(state = %self.state, "ignoring call fragment after classification ended");
                return;
            }
            ClassifierState::ChannelCall => {}
            ClassifierState::Text | ClassifierState::InlineWatch | ClassifierState::InlineCall => {
                // A structured call disproves any inline candidate.
                self.flush_held(out);
                self.watch_chunks = 0;
                let name = fragment.name.clone().filter(|n| !n.is_empty());
                tracing::debug!(index = fragment.index, function_name = ?name, "channel call detected");
                out.push(ClassifierOutput::CallStarted { name });
                self.pending = Some(PendingCall::channel(fragment.index));
                self.enter(ClassifierState::ChannelCall);
            }
        }

        let limit = self.limits.max_call_buffer_bytes;
        let Some(call) = self.pending.as_mut() else {
            return;
        };
        if fragment.index != call.index {
            tracing::warn!(
                index = fragment.index,
                active = call.index,
                "ignoring fragment for an additional call"
            );
            return;
        }
        if let Some(name) = fragment.name.filter(|n| !n.is_empty()) {
            call.name = Some(name);
        }
        if let Some(delta) = fragment.arguments {
            if let Err(e) = call.append_arguments(&delta, limit) {
                out.push(ClassifierOutput::Error(e));
                self.fail();
            }
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn flush_held(&mut self, out: &mut Vec<ClassifierOutput>) {
        push_text(out, std::mem::take(&mut self.held));
    }

    fn overflow(&mut self, out: &mut Vec<ClassifierOutput>) {
        out.push(ClassifierOutput::Error(StreamError::BufferOverflow {
            name: marker_name(&self.held),
            limit: self.limits.max_call_buffer_bytes,
        }));
        self.fail();
    }

    fn enter(&mut self, next: ClassifierState) {
        // Every watch counts its chunks from zero.
        if next == ClassifierState::Text {
            self.watch_chunks = 0;
        }
        if self.state != next {
            tracing::trace!(from = %self.state, to = %next, "classifier transition");
            self.state = next;
        }
    }
}

fn push_text(out: &mut Vec<ClassifierOutput>, text: String) {
    if !text.is_empty() {
        out.push(ClassifierOutput::Text(text));
    }
}

/// Name portion of a held marker, for error reporting.
fn marker_name(held: &str) -> String {
    held.split_once('.')
        .map(|(_, rest)| rest)
        .unwrap_or_default()
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}
