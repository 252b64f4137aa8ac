// Copyright 2026 The Callwire Project
// SPDX-License-Identifier: Apache-2.0

// Call dispatch
//
// Executes one assembled call: resolve the name, repair and validate the
// arguments, run the handler, and report the outcome. Every dispatch ends
// the waiting state with `loading-end` and then emits exactly one terminal
// event, either the call's UI event or an error.

use crate::catalog::PlanSearch;
use crate::config::UiConfig;
use crate::error::{ErrorKind, Failure};
use crate::events::{EventSink, OptionList, OutboundEvent, SinkClosed, TextCard};
use crate::preview::PreviewImageResolver;
use crate::registry::CallName;
use crate::repair;
use crate::stream::PendingCall;
use futures_util::FutureExt;
use serde::Serialize;
use serde_json::{Map, Value};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// What happened to a dispatched call. Recorded in session history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    pub success: bool,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl DispatchResult {
    fn succeeded(name: String, outcome: String) -> Self {
        Self {
            success: true,
            name,
            outcome: Some(outcome),
            error_kind: None,
        }
    }

    fn failed(name: String, kind: ErrorKind) -> Self {
        Self {
            success: false,
            name,
            outcome: None,
            error_kind: Some(kind),
        }
    }
}

pub struct Dispatcher {
    plans: Arc<dyn PlanSearch>,
    previews: Arc<dyn PreviewImageResolver>,
    ui: UiConfig,
}

impl Dispatcher {
    pub fn new(plans: Arc<dyn PlanSearch>, previews: Arc<dyn PreviewImageResolver>, ui: UiConfig) -> Self {
        Self { plans, previews, ui }
    }

    /// Run `call` and deliver its events. Only a closed sink is an error;
    /// call failures are reported to the consumer and in the result.
    pub async fn dispatch(
        &self,
        call: PendingCall,
        sink: &dyn EventSink,
    ) -> Result<DispatchResult, SinkClosed> {
        let name = call.name().to_string();
        if !call.absorbed_text.is_empty() {
            tracing::debug!(function_name = %name, absorbed = %call.absorbed_text, "text after call suppressed");
        }

        let executed = AssertUnwindSafe(self.execute(&name, &call.raw_arguments))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(Failure::Panicked(panic_message(panic.as_ref()))));

        match executed {
            Ok((event, outcome)) => {
                tracing::info!(function_name = %name, source = ?call.source, %outcome, "call dispatched");
                sink.send(OutboundEvent::LoadingEnd).await?;
                sink.send(event).await?;
                Ok(DispatchResult::succeeded(name, outcome))
            }
            Err(failure) => {
                let error = failure.classify();
                tracing::warn!(
                    function_name = %name,
                    kind = %error.kind,
                    error = %failure,
                    raw_arguments = %call.raw_arguments,
                    "call dispatch failed"
                );
                sink.send(OutboundEvent::LoadingEnd).await?;
                let kind = error.kind;
                sink.send(OutboundEvent::Error(error)).await?;
                Ok(DispatchResult::failed(name, kind))
            }
        }
    }

    async fn execute(&self, raw_name: &str, raw_arguments: &str) -> Result<(OutboundEvent, String), Failure> {
        let name = CallName::parse(raw_name).ok_or_else(|| Failure::UnknownCall {
            name: raw_name.to_string(),
            raw_arguments: raw_arguments.to_string(),
        })?;

        let args = repair::parse_arguments(raw_arguments).map_err(|source| Failure::Repair {
            name: raw_name.to_string(),
            source,
        })?;

        let validation = name.spec().validate(&args);
        if !validation.is_ok() {
            return Err(Failure::InvalidArguments {
                name,
                validation,
                arguments: Value::Object(args),
            });
        }

        self.handle(name, args).await
    }

    async fn handle(
        &self,
        name: CallName,
        mut args: Map<String, Value>,
    ) -> Result<(OutboundEvent, String), Failure> {
        match name {
            CallName::RequestOttServiceList => Ok((
                OutboundEvent::OttServiceList(OptionList {
                    question: Some(self.ui.ott_question.clone()),
                    options: self.ui.ott_services.clone(),
                }),
                format!("{} services offered", self.ui.ott_services.len()),
            )),
            CallName::RequestOxCarouselButtons => Ok((
                OutboundEvent::OxCarouselButtons(OptionList {
                    question: None,
                    options: self.ui.ox_options.clone(),
                }),
                "yes/no offered".to_string(),
            )),
            CallName::RequestCarouselButtons => {
                let items = take_array(&mut args, "items");
                let outcome = format!("{} buttons shown", items.len());
                Ok((OutboundEvent::CarouselButtons(items), outcome))
            }
            CallName::SearchPlans => {
                let plans = self.plans.search(&args).await.map_err(|e| Failure::Dispatch {
                    name,
                    reason: e.to_string(),
                    arguments: Value::Object(args.clone()),
                })?;
                let outcome = if plans.is_empty() {
                    "no plans matched".to_string()
                } else {
                    format!("{} plans found", plans.len())
                };
                Ok((OutboundEvent::PlanLists(plans), outcome))
            }
            CallName::ShowPlanLists => {
                let plans = take_array(&mut args, "plans");
                let outcome = format!("{} plans shown", plans.len());
                Ok((OutboundEvent::PlanLists(plans), outcome))
            }
            CallName::RequestTextCard => {
                let card = self.text_card(args).await;
                let outcome = if card.image_url.is_some() {
                    "card shown with image"
                } else {
                    "card shown"
                };
                Ok((OutboundEvent::TextCard(card), outcome.to_string()))
            }
            CallName::ShowFirstCardList => {
                Ok((OutboundEvent::FirstCardList, "first card list shown".to_string()))
            }
        }
    }

    async fn text_card(&self, mut args: Map<String, Value>) -> TextCard {
        let url = take_string(&mut args, "url");
        let image_url = match take_string(&mut args, "imageUrl") {
            provided if !provided.is_empty() => Some(provided),
            _ => self.previews.resolve(&url).await,
        };
        TextCard {
            title: take_string(&mut args, "title"),
            description: take_string(&mut args, "description"),
            button_text: take_string(&mut args, "buttonText"),
            url,
            image_url,
        }
    }
}

/// Validated arrays; anything else (which validation rules out) is empty.
fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn take_array(args: &mut Map<String, Value>, key: &str) -> Vec<Value> {
    match args.remove(key) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    }
}

fn take_string(args: &mut Map<String, Value>, key: &str) -> String {
    match args.remove(key) {
        Some(Value::String(s)) => s,
        _ => String::new(),
    }
}
