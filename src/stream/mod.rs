// Copyright 2026 The Callwire Project
// SPDX-License-Identifier: Apache-2.0

// Token stream classification
//
// Responsibilities:
// - Forward visible text as soon as it cannot be part of a call
// - Detect calls on the structured channel and written inline as text
// - Assemble exactly one call per request, bounded in size
// - Drive a request from stream establishment to its terminal outcome

mod classifier;
mod inline;
mod processor;
mod types;

pub use classifier::StreamClassifier;
pub(crate) use inline::MARKER_KEYWORD;
pub use processor::{RequestOutcome, StreamProcessor};
pub use types::*;

#[cfg(test)]
mod tests;
