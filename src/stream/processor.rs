// Copyright 2026 The Callwire Project
// SPDX-License-Identifier: Apache-2.0

// Stream processor
//
// Drives one request: waits for the provider stream under the establish
// timeout, feeds tokens to the classifier, forwards its outputs to the
// event sink and hands the completed call to the dispatcher. Each request
// ends in exactly one terminal outcome.

use super::classifier::StreamClassifier;
use super::types::{ClassifierLimits, ClassifierOutput, ClassifierState, PendingCall};
use crate::dispatch::{DispatchResult, Dispatcher};
use crate::error::{ClassifiedError, Failure, TimeoutPhase};
use crate::events::{EventSink, Loading, LoadingKind, OutboundEvent, SinkClosed};
use crate::provider::{ProviderError, TokenStream};
use futures_util::StreamExt;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Duration;

/// How a request ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    /// The stream ended with no call. `text` is everything forwarded.
    Completed { text: String },
    /// A call was detected and dispatched (successfully or not).
    Dispatched { text: String, result: DispatchResult },
    /// The request failed before any call could be dispatched.
    Failed { text: String, error: ClassifiedError },
    /// The consumer went away; nothing further was emitted.
    Abandoned,
}

impl RequestOutcome {
    /// Text forwarded to the consumer before the request ended.
    pub fn text(&self) -> &str {
        match self {
            RequestOutcome::Completed { text }
            | RequestOutcome::Dispatched { text, .. }
            | RequestOutcome::Failed { text, .. } => text,
            RequestOutcome::Abandoned => "",
        }
    }
}

pub struct StreamProcessor {
    limits: ClassifierLimits,
    establish_timeout: Duration,
    idle_timeout: Option<Duration>,
    dispatcher: Arc<Dispatcher>,
}

impl StreamProcessor {
    pub fn new(
        limits: ClassifierLimits,
        establish_timeout: Duration,
        idle_timeout: Option<Duration>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            limits,
            establish_timeout,
            idle_timeout,
            dispatcher,
        }
    }

    /// Run one request to its terminal outcome.
    ///
    /// `establish` resolves once the provider has accepted the request. If
    /// it does not resolve within the establish timeout it is dropped and
    /// the request fails with a timeout; the classifier never starts.
    pub async fn run<F>(&self, establish: F, sink: &dyn EventSink) -> RequestOutcome
    where
        F: Future<Output = Result<TokenStream, ProviderError>> + Send,
    {
        let mut request = RequestState::default();

        let mut stream = match tokio::time::timeout(self.establish_timeout, establish).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return request.fail(Failure::Provider(e), sink).await,
            Err(_) => {
                let failure = Failure::Timeout {
                    phase: TimeoutPhase::Establish,
                    after: self.establish_timeout,
                };
                return request.fail(failure, sink).await;
            }
        };

        let mut classifier = StreamClassifier::new(self.limits.clone());

        loop {
            let next = match self.idle_timeout {
                Some(idle) => match tokio::time::timeout(idle, stream.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        classifier.fail();
                        let failure = Failure::Timeout {
                            phase: TimeoutPhase::Consumption,
                            after: idle,
                        };
                        return request.fail(failure, sink).await;
                    }
                },
                None => stream.next().await,
            };

            let outputs = match next {
                Some(Ok(token)) => classifier.push(token),
                Some(Err(e)) => {
                    classifier.fail();
                    return request.fail(Failure::Provider(e), sink).await;
                }
                None => classifier.finish(),
            };

            for output in outputs {
                if let ClassifierOutput::Error(e) = output {
                    return request.fail(Failure::Stream(e), sink).await;
                }
                if request.forward(output, sink).await.is_err() {
                    return request.abandon();
                }
            }

            if matches!(classifier.state(), ClassifierState::Done | ClassifierState::Failed) {
                break;
            }
        }

        // Anything the provider sends after the call is not consumed.
        drop(stream);

        let Some(call) = request.ready.take() else {
            return RequestOutcome::Completed { text: request.text };
        };
        match self.dispatcher.dispatch(call, sink).await {
            Ok(result) => RequestOutcome::Dispatched {
                text: request.text,
                result,
            },
            Err(SinkClosed) => request.abandon(),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-request state
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RequestState {
    text: String,
    loading_open: bool,
    ready: Option<PendingCall>,
}

impl RequestState {
    async fn forward(&mut self, output: ClassifierOutput, sink: &dyn EventSink) -> Result<(), SinkClosed> {
        match output {
            ClassifierOutput::Text(text) => {
                self.text.push_str(&text);
                sink.send(OutboundEvent::Stream(text)).await
            }
            ClassifierOutput::Completed => sink.send(OutboundEvent::Done).await,
            ClassifierOutput::CallStarted { name } => {
                let function_name = name.unwrap_or_else(|| "unknown".to_string());
                self.loading_open = true;
                sink.send(OutboundEvent::Loading(Loading {
                    kind: LoadingKind::for_call(&function_name),
                    function_name,
                }))
                .await
            }
            ClassifierOutput::CallReady(call) => {
                self.ready = Some(call);
                Ok(())
            }
            // Handled by the caller.
            ClassifierOutput::Error(_) => Ok(()),
        }
    }

    async fn fail(self, failure: Failure, sink: &dyn EventSink) -> RequestOutcome {
        let error = failure.classify();
        tracing::warn!(kind = %error.kind, error = %failure, "request failed");

        if self.loading_open && sink.send(OutboundEvent::LoadingEnd).await.is_err() {
            return self.abandon();
        }
        if sink.send(OutboundEvent::Error(error.clone())).await.is_err() {
            return self.abandon();
        }
        RequestOutcome::Failed {
            text: self.text,
            error,
        }
    }

    fn abandon(self) -> RequestOutcome {
        tracing::info!(
            forwarded_bytes = self.text.len(),
            pending_call = self.ready.is_some(),
            "consumer disconnected, abandoning request"
        );
        RequestOutcome::Abandoned
    }
}
