// Copyright 2026 The Callwire Project
// SPDX-License-Identifier: Apache-2.0

// Tests for the stream classifier and request processor
//
// Classifier tests push tokens directly and inspect outputs. Processor
// tests run a full request against an in-memory token stream and a
// channel sink; timeouts use paused time.

use super::*;
use crate::catalog::InMemoryPlanCatalog;
use crate::config::UiConfig;
use crate::dispatch::Dispatcher;
use crate::error::ErrorKind;
use crate::events::{LoadingKind, OutboundEvent};
use crate::preview::NoPreview;
use crate::provider::{ProviderError, TokenStream};
use futures_util::stream;
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Duration;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn classifier() -> StreamClassifier {
    StreamClassifier::new(ClassifierLimits::default())
}

fn push_all(c: &mut StreamClassifier, tokens: Vec<Token>) -> Vec<ClassifierOutput> {
    let mut out = Vec::new();
    for token in tokens {
        out.extend(c.push(token));
    }
    out
}

fn texts(outputs: &[ClassifierOutput]) -> String {
    outputs
        .iter()
        .filter_map(|o| match o {
            ClassifierOutput::Text(t) => Some(t.as_str()),
            _ => None,
        })
        .collect()
}

fn ready_call(outputs: &[ClassifierOutput]) -> Option<&PendingCall> {
    outputs.iter().find_map(|o| match o {
        ClassifierOutput::CallReady(call) => Some(call),
        _ => None,
    })
}

fn tokens(items: Vec<Token>) -> TokenStream {
    Box::pin(stream::iter(items.into_iter().map(Ok::<Token, ProviderError>)))
}

fn dispatcher() -> Arc<Dispatcher> {
    Arc::new(Dispatcher::new(
        Arc::new(InMemoryPlanCatalog::empty()),
        Arc::new(NoPreview),
        UiConfig::default(),
    ))
}

fn processor() -> StreamProcessor {
    StreamProcessor::new(
        ClassifierLimits::default(),
        Duration::from_secs(30),
        Some(Duration::from_secs(60)),
        dispatcher(),
    )
}

async fn run_with(
    processor: &StreamProcessor,
    establish: impl std::future::Future<Output = Result<TokenStream, ProviderError>> + Send,
) -> (RequestOutcome, Vec<OutboundEvent>) {
    let (tx, mut rx) = mpsc::channel::<OutboundEvent>(256);
    let outcome = processor.run(establish, &tx).await;
    drop(tx);
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    (outcome, events)
}

async fn run_tokens(items: Vec<Token>) -> (RequestOutcome, Vec<OutboundEvent>) {
    run_with(&processor(), async move { Ok(tokens(items)) }).await
}

fn event_names(events: &[OutboundEvent]) -> Vec<&'static str> {
    events.iter().map(OutboundEvent::name).collect()
}

// ---------------------------------------------------------------------------
// Classifier: plain text
// ---------------------------------------------------------------------------

#[test]
fn plain_text_forwarded_in_order_then_completed() {
    let mut c = classifier();
    let out = push_all(&mut c, vec![Token::text("Hello"), Token::text(", "), Token::text("world")]);
    assert_eq!(
        out,
        vec![
            ClassifierOutput::Text("Hello".into()),
            ClassifierOutput::Text(", ".into()),
            ClassifierOutput::Text("world".into()),
        ]
    );
    assert_eq!(c.finish(), vec![ClassifierOutput::Completed]);
    assert_eq!(c.state(), ClassifierState::Done);
}

#[test]
fn keyword_prefix_is_held_then_released() {
    let mut c = classifier();
    let out = c.push(Token::text("I have fun"));
    assert_eq!(out, vec![ClassifierOutput::Text("I have ".into())]);
    assert_eq!(c.state(), ClassifierState::InlineWatch);

    let out = c.push(Token::text("ctional plans"));
    assert_eq!(out, vec![ClassifierOutput::Text("functional plans".into())]);
    assert_eq!(c.state(), ClassifierState::Text);
}

#[test]
fn keyword_followed_by_space_is_prose() {
    let mut c = classifier();
    let mut out = push_all(&mut c, vec![Token::text("This function "), Token::text("works.")]);
    out.extend(c.finish());
    assert_eq!(texts(&out), "This function works.");
    assert!(ready_call(&out).is_none());
}

// ---------------------------------------------------------------------------
// Classifier: inline markers
// ---------------------------------------------------------------------------

#[test]
fn inline_marker_split_across_tokens() {
    let mut c = classifier();
    let out = push_all(
        &mut c,
        vec![
            Token::text("Sure! "),
            Token::text("functions.requestOX"),
            Token::text("CarouselButtons({})"),
        ],
    );

    assert_eq!(
        out,
        vec![
            ClassifierOutput::Text("Sure! ".into()),
            ClassifierOutput::Completed,
            ClassifierOutput::CallStarted {
                name: Some("requestOXCarouselButtons".into())
            },
            ClassifierOutput::CallReady(PendingCall::inline(
                "requestOXCarouselButtons".into(),
                "{}".into()
            )),
        ]
    );
    assert_eq!(c.state(), ClassifierState::Done);
    assert!(c.push(Token::text("more")).is_empty());
    assert!(c.finish().is_empty());
}

#[test]
fn inline_marker_with_surrounding_text_in_one_token() {
    let mut c = classifier();
    let out = c.push(Token::text("ok functions.showFirstCardList({}) thanks"));
    assert_eq!(texts(&out), "ok ");
    let call = ready_call(&out).unwrap();
    assert_eq!(call.name(), "showFirstCardList");
    assert_eq!(call.source, CallSource::Inline);
    assert_eq!(call.absorbed_text, " thanks");
}

#[test]
fn inline_body_accumulates_across_tokens() {
    let mut c = classifier();
    let out = push_all(
        &mut c,
        vec![
            Token::text("function.requestTextCard({title: 'A } B', "),
            Token::text("url: 'https://x.test'"),
            Token::text("})"),
        ],
    );
    let call = ready_call(&out).unwrap();
    assert_eq!(call.name(), "requestTextCard");
    assert_eq!(call.raw_arguments, "{title: 'A } B', url: 'https://x.test'}");
    assert_eq!(texts(&out), "");
}

#[test]
fn watch_released_after_chunk_bound() {
    let mut c = StreamClassifier::new(ClassifierLimits {
        inline_watch_max_chunks: 2,
        ..ClassifierLimits::default()
    });
    assert!(c.push(Token::text("function")).is_empty());
    assert!(c.push(Token::text("s")).is_empty());
    let out = c.push(Token::text("."));
    assert_eq!(out, vec![ClassifierOutput::Text("functions.".into())]);
    assert_eq!(c.state(), ClassifierState::Text);
}

#[test]
fn each_watch_starts_with_a_fresh_chunk_count() {
    let mut c = StreamClassifier::new(ClassifierLimits {
        inline_watch_max_chunks: 4,
        ..ClassifierLimits::default()
    });
    let mut out = Vec::new();
    for _ in 0..16 {
        out.extend(c.push(Token::text("fun")));
        out.extend(c.push(Token::text("ding ")));
    }
    assert_eq!(c.state(), ClassifierState::Text);

    out.extend(c.push(Token::text("functions")));
    out.extend(c.push(Token::text(".requestOXCarouselButtons({})")));
    out.extend(c.finish());

    let call = ready_call(&out).unwrap();
    assert_eq!(call.name(), "requestOXCarouselButtons");
    let text = texts(&out);
    assert_eq!(text, "funding ".repeat(16));
    assert!(!text.contains("functions."));
}

#[test]
fn watch_released_after_byte_bound() {
    let mut c = StreamClassifier::new(ClassifierLimits {
        inline_watch_max_bytes: 16,
        ..ClassifierLimits::default()
    });
    let out = c.push(Token::text("functions.aVeryLongNameThatGoesOn"));
    assert_eq!(texts(&out), "functions.aVeryLongNameThatGoesOn");
    assert_eq!(c.state(), ClassifierState::Text);
}

#[test]
fn end_of_stream_flushes_keyword_prefix() {
    let mut c = classifier();
    let mut out = c.push(Token::text("Let me have fun"));
    out.extend(c.finish());
    assert_eq!(texts(&out), "Let me have fun");
    assert_eq!(out.last(), Some(&ClassifierOutput::Completed));
}

#[test]
fn end_of_stream_drops_unterminated_marker() {
    let mut c = classifier();
    let mut out = c.push(Token::text("Checking. functions.search"));
    out.extend(c.finish());
    assert_eq!(texts(&out), "Checking. ");
    assert!(ready_call(&out).is_none());
    assert_eq!(out.last(), Some(&ClassifierOutput::Completed));
}

#[test]
fn end_of_stream_drops_unclosed_body() {
    let mut c = classifier();
    let mut out = c.push(Token::text("One moment. functions.searchPlans({category: '5G'"));
    assert_eq!(c.state(), ClassifierState::InlineCall);
    out.extend(c.finish());
    assert_eq!(texts(&out), "One moment. ");
    assert!(ready_call(&out).is_none());
    assert_eq!(out.last(), Some(&ClassifierOutput::Completed));
}

#[test]
fn inline_body_over_limit_fails() {
    let mut c = StreamClassifier::new(ClassifierLimits {
        max_call_buffer_bytes: 32,
        ..ClassifierLimits::default()
    });
    let out = c.push(Token::text("ok functions.searchPlans({category: '5G', ageGroup: 'adult'"));
    assert_eq!(texts(&out), "ok ");
    assert!(matches!(
        out.last(),
        Some(ClassifierOutput::Error(StreamError::BufferOverflow { name, limit: 32 })) if name == "searchPlans"
    ));
    assert_eq!(c.state(), ClassifierState::Failed);
}

// ---------------------------------------------------------------------------
// Classifier: call channel
// ---------------------------------------------------------------------------

#[test]
fn channel_call_assembled_at_stream_end() {
    let mut c = classifier();
    let mut out = push_all(
        &mut c,
        vec![
            Token::text("Let me look."),
            Token::call(0, Some("searchPlans"), Some("")),
            Token::call(0, None, Some("{\"category\":")),
            Token::call(0, None, Some("\"5G\"}")),
        ],
    );
    assert_eq!(
        out[1],
        ClassifierOutput::CallStarted {
            name: Some("searchPlans".into())
        }
    );
    assert_eq!(c.state(), ClassifierState::ChannelCall);

    out.extend(c.finish());
    assert_eq!(texts(&out), "Let me look.");
    assert_eq!(out[out.len() - 2], ClassifierOutput::Completed);
    let call = ready_call(&out).unwrap();
    assert_eq!(call.name(), "searchPlans");
    assert_eq!(call.raw_arguments, "{\"category\":\"5G\"}");
    assert_eq!(call.source, CallSource::Channel);
}

#[test]
fn text_after_channel_call_is_absorbed() {
    let mut c = classifier();
    let mut out = push_all(
        &mut c,
        vec![
            Token::call(0, Some("showFirstCardList"), Some("{}")),
            Token::text("Here you go"),
        ],
    );
    out.extend(c.finish());
    assert_eq!(texts(&out), "");
    assert_eq!(ready_call(&out).unwrap().absorbed_text, "Here you go");
}

#[test]
fn channel_fragment_disproves_inline_candidate() {
    let mut c = classifier();
    let out = push_all(
        &mut c,
        vec![
            Token::text("see function"),
            Token::call(0, Some("showFirstCardList"), None),
        ],
    );
    assert_eq!(texts(&out), "see function");
    assert_eq!(c.state(), ClassifierState::ChannelCall);
}

#[test]
fn additional_call_indices_are_ignored() {
    let mut c = classifier();
    let mut out = push_all(
        &mut c,
        vec![
            Token::call(0, Some("requestOXCarouselButtons"), Some("{}")),
            Token::call(1, Some("showFirstCardList"), Some("{\"x\":1}")),
        ],
    );
    out.extend(c.finish());
    let calls: Vec<_> = out
        .iter()
        .filter(|o| matches!(o, ClassifierOutput::CallReady(_)))
        .collect();
    assert_eq!(calls.len(), 1);
    let call = ready_call(&out).unwrap();
    assert_eq!(call.name(), "requestOXCarouselButtons");
    assert_eq!(call.raw_arguments, "{}");
}

#[test]
fn channel_arguments_over_limit_fail() {
    let mut c = StreamClassifier::new(ClassifierLimits {
        max_call_buffer_bytes: 8,
        ..ClassifierLimits::default()
    });
    let out = c.push(Token::call(0, Some("searchPlans"), Some("{\"category\":\"5G\"}")));
    assert!(matches!(
        out.last(),
        Some(ClassifierOutput::Error(StreamError::BufferOverflow { limit: 8, .. }))
    ));
    assert_eq!(c.state(), ClassifierState::Failed);
    assert!(c.finish().is_empty());
}

// ---------------------------------------------------------------------------
// Processor
// ---------------------------------------------------------------------------

#[tokio::test]
async fn plain_stream_reconstructs_text_then_done() {
    let (outcome, events) =
        run_tokens(vec![Token::text("Hello"), Token::text(" "), Token::text("there")]).await;

    assert_eq!(
        events,
        vec![
            OutboundEvent::Stream("Hello".into()),
            OutboundEvent::Stream(" ".into()),
            OutboundEvent::Stream("there".into()),
            OutboundEvent::Done,
        ]
    );
    assert_eq!(
        outcome,
        RequestOutcome::Completed {
            text: "Hello there".into()
        }
    );
}

#[tokio::test]
async fn inline_call_dispatches_after_done() {
    let (outcome, events) = run_tokens(vec![
        Token::text("Shall I? "),
        Token::text("functions.requestOXCarouselButtons({})"),
    ])
    .await;

    assert_eq!(
        event_names(&events),
        vec!["stream", "done", "loading", "loading-end", "ox-carousel-buttons"]
    );
    assert!(!events.iter().any(|e| matches!(e, OutboundEvent::Stream(t) if t.contains("functions"))));
    match &events[4] {
        OutboundEvent::OxCarouselButtons(list) => assert_eq!(list.options, vec!["Yes", "No"]),
        other => panic!("unexpected event {other:?}"),
    }
    match outcome {
        RequestOutcome::Dispatched { text, result } => {
            assert_eq!(text, "Shall I? ");
            assert!(result.success);
            assert_eq!(result.name, "requestOXCarouselButtons");
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn channel_call_emits_loading_first() {
    let (outcome, events) = run_tokens(vec![
        Token::call(0, Some("searchPlans"), Some("{\"category\":")),
        Token::call(0, None, Some("\"5G\"}")),
    ])
    .await;

    assert_eq!(
        event_names(&events),
        vec!["loading", "done", "loading-end", "plan-lists"]
    );
    match &events[0] {
        OutboundEvent::Loading(loading) => {
            assert_eq!(loading.kind, LoadingKind::DbCalling);
            assert_eq!(loading.function_name, "searchPlans");
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(events[3], OutboundEvent::PlanLists(vec![]));
    assert!(matches!(outcome, RequestOutcome::Dispatched { ref result, .. } if result.success));
}

#[tokio::test]
async fn text_card_without_url_is_missing_fields() {
    let (outcome, events) = run_tokens(vec![Token::text(
        "functions.requestTextCard({title: 'A', description: 'B', buttonText: 'Go'})",
    )])
    .await;

    assert_eq!(event_names(&events), vec!["done", "loading", "loading-end", "error"]);
    match &events[3] {
        OutboundEvent::Error(error) => {
            assert_eq!(error.kind, ErrorKind::MissingRequiredFields);
            assert!(error.message.contains("url"));
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert!(!events.iter().any(|e| matches!(e, OutboundEvent::TextCard(_))));
    match outcome {
        RequestOutcome::Dispatched { result, .. } => {
            assert!(!result.success);
            assert_eq!(result.error_kind, Some(ErrorKind::MissingRequiredFields));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn unnamed_channel_call_is_unknown() {
    let (_, events) = run_tokens(vec![Token::call(0, None, Some("{}"))]).await;
    match &events[0] {
        OutboundEvent::Loading(loading) => assert_eq!(loading.function_name, "unknown"),
        other => panic!("unexpected event {other:?}"),
    }
    assert!(matches!(
        events.last(),
        Some(OutboundEvent::Error(e)) if e.kind == ErrorKind::UnknownCall
    ));
}

#[tokio::test]
async fn overflow_after_loading_closes_loading_before_error() {
    let processor = StreamProcessor::new(
        ClassifierLimits {
            max_call_buffer_bytes: 4,
            ..ClassifierLimits::default()
        },
        Duration::from_secs(30),
        None,
        dispatcher(),
    );
    let items = vec![Token::call(0, Some("searchPlans"), Some("{\"category\":\"5G\"}"))];
    let (outcome, events) = run_with(&processor, async move { Ok(tokens(items)) }).await;

    assert_eq!(event_names(&events), vec!["loading", "loading-end", "error"]);
    assert!(matches!(
        outcome,
        RequestOutcome::Failed { ref error, .. } if error.kind == ErrorKind::ParseError
    ));
}

#[tokio::test]
async fn establish_error_is_reported_once() {
    let (outcome, events) = run_with(&processor(), async {
        Err(ProviderError::Status {
            status: 503,
            body: "overloaded".into(),
        })
    })
    .await;

    assert_eq!(event_names(&events), vec!["error"]);
    match outcome {
        RequestOutcome::Failed { text, error } => {
            assert!(text.is_empty());
            assert_eq!(error.kind, ErrorKind::ProviderFailure);
            assert_eq!(error.details["status"], 503);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn establish_timeout_is_reported_once() {
    let (outcome, events) = run_with(
        &processor(),
        std::future::pending::<Result<TokenStream, ProviderError>>(),
    )
    .await;

    assert_eq!(event_names(&events), vec!["error"]);
    match outcome {
        RequestOutcome::Failed { error, .. } => {
            assert_eq!(error.kind, ErrorKind::Timeout);
            assert_eq!(error.details["phase"], "establish");
            assert_eq!(error.details["timeoutMs"], 30_000);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn idle_stream_times_out_after_partial_text() {
    let stalled: TokenStream = Box::pin(
        stream::iter(vec![Ok::<_, ProviderError>(Token::text("Partial"))]).chain(stream::pending()),
    );
    let (outcome, events) = run_with(&processor(), async move { Ok(stalled) }).await;

    assert_eq!(event_names(&events), vec!["stream", "error"]);
    match outcome {
        RequestOutcome::Failed { text, error } => {
            assert_eq!(text, "Partial");
            assert_eq!(error.kind, ErrorKind::Timeout);
            assert_eq!(error.details["phase"], "consumption");
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn mid_stream_failure_ends_request() {
    let broken: TokenStream = Box::pin(stream::iter(vec![
        Ok(Token::text("Half")),
        Err(ProviderError::Interrupted("connection reset".into())),
        Ok(Token::text(" never seen")),
    ]));
    let (outcome, events) = run_with(&processor(), async move { Ok(broken) }).await;

    assert_eq!(event_names(&events), vec!["stream", "error"]);
    assert!(matches!(
        outcome,
        RequestOutcome::Failed { ref error, .. } if error.kind == ErrorKind::StreamInterrupted
    ));
}

#[tokio::test]
async fn closed_sink_abandons_silently() {
    let (tx, rx) = mpsc::channel::<OutboundEvent>(4);
    drop(rx);
    let outcome = processor()
        .run(async { Ok(tokens(vec![Token::text("anyone there?")])) }, &tx)
        .await;
    assert_eq!(outcome, RequestOutcome::Abandoned);
    assert_eq!(outcome.text(), "");
}
