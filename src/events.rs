// Copyright 2026 The Callwire Project
// SPDX-License-Identifier: Apache-2.0

// Outbound events
//
// Everything the consumer sees goes through an `EventSink` as one of these
// events. On the wire each is `{"event": "<name>", "data": <payload>}`.

use crate::error::ClassifiedError;
use crate::session::StoredMessage;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum OutboundEvent {
    SessionId(String),
    SessionHistory(Vec<StoredMessage>),
    /// A piece of visible assistant text.
    Stream(String),
    /// The text portion of the response is complete.
    Done,
    Loading(Loading),
    LoadingEnd,
    OttServiceList(OptionList),
    OxCarouselButtons(OptionList),
    CarouselButtons(Vec<Value>),
    PlanLists(Vec<Value>),
    TextCard(TextCard),
    FirstCardList,
    Error(ClassifiedError),
}

impl OutboundEvent {
    /// Wire name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::SessionId(_) => "session-id",
            OutboundEvent::SessionHistory(_) => "session-history",
            OutboundEvent::Stream(_) => "stream",
            OutboundEvent::Done => "done",
            OutboundEvent::Loading(_) => "loading",
            OutboundEvent::LoadingEnd => "loading-end",
            OutboundEvent::OttServiceList(_) => "ott-service-list",
            OutboundEvent::OxCarouselButtons(_) => "ox-carousel-buttons",
            OutboundEvent::CarouselButtons(_) => "carousel-buttons",
            OutboundEvent::PlanLists(_) => "plan-lists",
            OutboundEvent::TextCard(_) => "text-card",
            OutboundEvent::FirstCardList => "first-card-list",
            OutboundEvent::Error(_) => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadingKind {
    Searching,
    DbCalling,
}

impl LoadingKind {
    /// Calls that touch the plan catalog show a database indicator.
    pub fn for_call(name: &str) -> Self {
        if name.contains("Plan") {
            LoadingKind::DbCalling
        } else {
            LoadingKind::Searching
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Loading {
    #[serde(rename = "type")]
    pub kind: LoadingKind,
    #[serde(rename = "functionName")]
    pub function_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionList {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextCard {
    pub title: String,
    pub description: String,
    pub url: String,
    pub button_text: String,
    pub image_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// The consumer is gone; no further events can be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("event consumer disconnected")]
pub struct SinkClosed;

/// Ordered delivery of events to one consumer.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn send(&self, event: OutboundEvent) -> Result<(), SinkClosed>;
}

#[async_trait]
impl EventSink for mpsc::Sender<OutboundEvent> {
    async fn send(&self, event: OutboundEvent) -> Result<(), SinkClosed> {
        mpsc::Sender::send(self, event).await.map_err(|_| SinkClosed)
    }
}
