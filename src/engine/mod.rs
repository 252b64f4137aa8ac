// Copyright 2026 The Callwire Project
// SPDX-License-Identifier: Apache-2.0

// Chat engine
//
// Per-request orchestration for one session turn:
// - Load (or start) the session
// - Build the provider message list from history
// - Run the stream processor against the provider
// - Record the turn and its dispatch result in the session history

use crate::catalog::{InMemoryPlanCatalog, PlanSearch, PlanSearchError};
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::Failure;
use crate::events::{EventSink, OutboundEvent};
use crate::message::Message;
use crate::preview::{HttpPreviewResolver, NoPreview, PreviewImageResolver};
use crate::provider::{ChatProvider, OpenAiProvider};
use crate::session::{InMemorySessionStore, SessionState, SessionStore, StoredMessage};
use crate::stream::{RequestOutcome, StreamProcessor};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Engine dependencies
// ---------------------------------------------------------------------------

pub struct EngineDeps {
    pub config: Arc<Config>,
    pub provider: Arc<dyn ChatProvider>,
    pub sessions: Arc<dyn SessionStore>,
    pub plans: Arc<dyn PlanSearch>,
    pub previews: Arc<dyn PreviewImageResolver>,
}

/// A session attached to a connection.
#[derive(Debug, Clone)]
pub struct OpenedSession {
    pub state: SessionState,
    /// True when an existing, unexpired session was picked up.
    pub resumed: bool,
}

// ---------------------------------------------------------------------------
// ChatEngine
// ---------------------------------------------------------------------------

pub struct ChatEngine {
    deps: EngineDeps,
    processor: StreamProcessor,
}

impl ChatEngine {
    pub fn new_with(deps: EngineDeps) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(
            deps.plans.clone(),
            deps.previews.clone(),
            deps.config.ui.clone(),
        ));
        let processor = StreamProcessor::new(
            deps.config.stream.clone(),
            deps.config.engine.establish_timeout,
            deps.config.engine.idle_timeout,
            dispatcher,
        );
        Self { deps, processor }
    }

    pub fn config(&self) -> &Config {
        &self.deps.config
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.deps.sessions
    }

    /// Resume `requested` if it names a live session, otherwise start a
    /// new one. New sessions are stored on their first turn.
    pub fn open_session(&self, requested: Option<&str>) -> OpenedSession {
        if let Some(state) = requested.filter(|id| !id.is_empty()).and_then(|id| self.deps.sessions.get(id)) {
            tracing::info!(session_id = %state.session_id, turns = state.turn_count, "session resumed");
            return OpenedSession {
                state,
                resumed: true,
            };
        }

        let state = SessionState::new(Uuid::new_v4().to_string());
        tracing::info!(
            session_id = %state.session_id,
            requested = requested.unwrap_or_default(),
            "session started"
        );
        OpenedSession {
            state,
            resumed: false,
        }
    }

    /// Answer one user message, streaming events to `sink`.
    pub async fn respond(&self, session_id: &str, text: &str, sink: &dyn EventSink) -> RequestOutcome {
        let request_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("request", %request_id, %session_id);
        self.respond_inner(session_id, text, sink).instrument(span).await
    }

    async fn respond_inner(&self, session_id: &str, text: &str, sink: &dyn EventSink) -> RequestOutcome {
        let mut state = self
            .deps
            .sessions
            .get(session_id)
            .unwrap_or_else(|| SessionState::new(session_id));

        let messages = self.provider_messages(&state, text);
        tracing::debug!(messages = messages.len(), "opening provider stream");

        let outcome = self
            .processor
            .run(self.deps.provider.open_stream(&messages), sink)
            .await;

        match &outcome {
            RequestOutcome::Abandoned => return outcome,
            RequestOutcome::Completed { text } => {
                tracing::info!(reply_bytes = text.len(), "request completed")
            }
            RequestOutcome::Dispatched { result, .. } => tracing::info!(
                function_name = %result.name,
                success = result.success,
                "request completed with call"
            ),
            RequestOutcome::Failed { error, .. } => {
                tracing::info!(kind = %error.kind, "request failed")
            }
        }

        self.record_turn(&mut state, text, &outcome);
        if let Err(e) = self.deps.sessions.update(state) {
            let failure = Failure::from(e);
            tracing::warn!(error = %failure, "failed to persist session");
            // The consumer may already be gone; nothing more to do then.
            let _ = sink.send(OutboundEvent::Error(failure.classify())).await;
        }

        outcome
    }

    fn provider_messages(&self, state: &SessionState, text: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(state.history.len() + 2);
        if let Some(prompt) = &self.deps.config.provider.system_prompt {
            messages.push(Message::system(prompt.clone()));
        }
        messages.extend(state.provider_messages());
        messages.push(Message::user(text));
        messages
    }

    fn record_turn(&self, state: &mut SessionState, text: &str, outcome: &RequestOutcome) {
        let max = self.deps.config.sessions.max_history;
        state.push_history(StoredMessage::user(text), max);

        let call = match outcome {
            RequestOutcome::Dispatched { result, .. } => Some(result.clone()),
            _ => None,
        };
        if !outcome.text().is_empty() || call.is_some() {
            state.push_history(StoredMessage::assistant(outcome.text(), call), max);
        }
    }
}

// ---------------------------------------------------------------------------
// Public factory for the default engine
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum EngineBuildError {
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Catalog(#[from] PlanSearchError),
}

pub fn build_engine(config: Arc<Config>) -> Result<ChatEngine, EngineBuildError> {
    let client = reqwest::Client::builder().build()?;
    let provider = OpenAiProvider::new(client, &config.provider);

    let previews: Arc<dyn PreviewImageResolver> = if config.preview.enabled {
        Arc::new(HttpPreviewResolver::new(&config.preview)?)
    } else {
        Arc::new(NoPreview)
    };

    let plans = match &config.catalog.plans_path {
        Some(path) => InMemoryPlanCatalog::from_path(path)?,
        None => {
            tracing::warn!("no plan catalog configured, searchPlans will return no plans");
            InMemoryPlanCatalog::empty()
        }
    };

    let sessions = InMemorySessionStore::new(config.sessions.ttl, config.sessions.max_sessions);

    Ok(ChatEngine::new_with(EngineDeps {
        provider: Arc::new(provider),
        sessions: Arc::new(sessions),
        plans: Arc::new(plans),
        previews,
        config,
    }))
}
