// Copyright 2026 The Callwire Project
// SPDX-License-Identifier: Apache-2.0

// Session state
//
// Per-conversation history, replayed to the consumer on reconnect and sent
// to the provider as context on every request.

use crate::dispatch::DispatchResult;
use crate::message::{Message, Role};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Session state types
// ---------------------------------------------------------------------------

/// One turn as stored in a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    pub role: Role,
    pub content: String,
    /// The call this turn dispatched, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call: Option<DispatchResult>,
    pub timestamp: DateTime<Utc>,
}

impl StoredMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            call: None,
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>, call: Option<DispatchResult>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            call,
            timestamp: Utc::now(),
        }
    }
}

/// State tracked for a single session across turns.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub turn_count: u64,
    pub history: Vec<StoredMessage>,
}

impl SessionState {
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            created_at: now,
            last_seen: now,
            turn_count: 0,
            history: Vec::new(),
        }
    }

    /// Add a history entry, enforcing the max history cap.
    pub fn push_history(&mut self, entry: StoredMessage, max_history: usize) {
        self.history.push(entry);
        if self.history.len() > max_history {
            let excess = self.history.len() - max_history;
            self.history.drain(..excess);
        }
        self.turn_count += 1;
        self.last_seen = Utc::now();
    }

    /// History as provider context. Turns with no text (a call that
    /// produced no visible reply) are skipped.
    pub fn provider_messages(&self) -> Vec<Message> {
        self.history
            .iter()
            .filter(|m| !m.content.is_empty())
            .map(|m| Message::new(m.role, m.content.clone()))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// SessionStore trait
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PersistenceError {
    #[error("session store is full ({limit} sessions)")]
    Full { limit: usize },
}

/// Session persistence.
///
/// The engine holds `Arc<dyn SessionStore>` and calls it from every
/// connection task.
pub trait SessionStore: Send + Sync {
    /// Retrieve session state by ID. Returns None if not found or expired.
    fn get(&self, session_id: &str) -> Option<SessionState>;

    /// Store or update session state.
    fn update(&self, state: SessionState) -> Result<(), PersistenceError>;

    /// Remove sessions idle for longer than `max_age`.
    fn cleanup(&self, max_age: Duration);
}

// ---------------------------------------------------------------------------
// InMemorySessionStore
// ---------------------------------------------------------------------------

/// `DashMap`-backed store for single-instance deployments.
pub struct InMemorySessionStore {
    sessions: DashMap<String, SessionState>,
    ttl: Duration,
    max_sessions: usize,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
            max_sessions,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

fn idle_for(state: &SessionState, now: DateTime<Utc>) -> Duration {
    now.signed_duration_since(state.last_seen)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, session_id: &str) -> Option<SessionState> {
        let entry = self.sessions.get(session_id)?;

        if idle_for(entry.value(), Utc::now()) > self.ttl {
            drop(entry); // Release the read lock before removing
            self.sessions.remove(session_id);
            tracing::debug!(%session_id, "session expired");
            return None;
        }

        Some(entry.value().clone())
    }

    fn update(&self, state: SessionState) -> Result<(), PersistenceError> {
        if !self.sessions.contains_key(&state.session_id) && self.sessions.len() >= self.max_sessions {
            return Err(PersistenceError::Full {
                limit: self.max_sessions,
            });
        }
        self.sessions.insert(state.session_id.clone(), state);
        Ok(())
    }

    fn cleanup(&self, max_age: Duration) {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, state| idle_for(state, now) <= max_age);
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            tracing::info!(removed, remaining = self.sessions.len(), "expired sessions removed");
        }
    }
}
