// Copyright 2026 The Callwire Project
// SPDX-License-Identifier: Apache-2.0

// Error classification
//
// Every failure inside a request is mapped to exactly one `ErrorKind` and
// reported to the consumer as a single `error` event carrying a
// `ClassifiedError`. Messages are user-facing; `details` is for debugging.

use crate::provider::ProviderError;
use crate::registry::{CallName, Validation};
use crate::repair::RepairError;
use crate::session::PersistenceError;
use crate::stream::StreamError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    ParseError,
    MissingRequiredFields,
    UnknownCall,
    DispatchFailure,
    ProviderFailure,
    TransportFailure,
    StreamInterrupted,
    Timeout,
    PersistenceFailure,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ParseError => "PARSE_ERROR",
            ErrorKind::MissingRequiredFields => "MISSING_REQUIRED_FIELDS",
            ErrorKind::UnknownCall => "UNKNOWN_CALL",
            ErrorKind::DispatchFailure => "DISPATCH_FAILURE",
            ErrorKind::ProviderFailure => "PROVIDER_FAILURE",
            ErrorKind::TransportFailure => "TRANSPORT_FAILURE",
            ErrorKind::StreamInterrupted => "STREAM_INTERRUPTED",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::PersistenceFailure => "PERSISTENCE_FAILURE",
            ErrorKind::Unknown => "UNKNOWN",
        }
    }

    /// Generic consumer-facing text for the kind.
    pub fn user_message(self) -> &'static str {
        match self {
            ErrorKind::ParseError => "The assistant produced a request that could not be read.",
            ErrorKind::MissingRequiredFields => "The assistant's request was missing required information.",
            ErrorKind::UnknownCall => "The assistant asked for an action that is not available.",
            ErrorKind::DispatchFailure => "The requested action could not be completed.",
            ErrorKind::ProviderFailure => "The assistant service returned an error.",
            ErrorKind::TransportFailure => "Could not reach the assistant service.",
            ErrorKind::StreamInterrupted => "The response was interrupted.",
            ErrorKind::Timeout => "The assistant took too long to respond.",
            ErrorKind::PersistenceFailure => "The conversation could not be saved.",
            ErrorKind::Unknown => "Something went wrong.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The payload of an `error` event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedError {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
    pub details: Value,
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutPhase {
    /// Waiting for the provider to accept the request.
    Establish,
    /// Waiting for the next token.
    Consumption,
}

impl fmt::Display for TimeoutPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TimeoutPhase::Establish => "establish",
            TimeoutPhase::Consumption => "consumption",
        })
    }
}

/// Anything that can end a request or a dispatch unsuccessfully.
#[derive(Debug, thiserror::Error)]
pub enum Failure {
    #[error("arguments for `{name}` could not be parsed: {source}")]
    Repair {
        name: String,
        #[source]
        source: RepairError,
    },

    #[error("`{name}` arguments failed validation: {validation:?}")]
    InvalidArguments {
        name: CallName,
        validation: Validation,
        arguments: Value,
    },

    #[error("unknown call `{name}`")]
    UnknownCall { name: String, raw_arguments: String },

    #[error("`{name}` failed: {reason}")]
    Dispatch {
        name: CallName,
        reason: String,
        arguments: Value,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("{phase} timed out after {after:?}")]
    Timeout { phase: TimeoutPhase, after: Duration },

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// A call handler panicked instead of returning.
    #[error("call handler panicked: {0}")]
    Panicked(String),
}

impl Failure {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Failure::Repair { .. } | Failure::Stream(StreamError::BufferOverflow { .. }) => {
                ErrorKind::ParseError
            }
            Failure::InvalidArguments { .. } => ErrorKind::MissingRequiredFields,
            Failure::UnknownCall { .. } => ErrorKind::UnknownCall,
            Failure::Dispatch { .. } => ErrorKind::DispatchFailure,
            Failure::Provider(e) => match e {
                ProviderError::Status { .. } | ProviderError::Api(_) | ProviderError::Decode(_) => {
                    ErrorKind::ProviderFailure
                }
                ProviderError::Transport(_) => ErrorKind::TransportFailure,
                ProviderError::Timeout(_) => ErrorKind::Timeout,
                ProviderError::Interrupted(_) => ErrorKind::StreamInterrupted,
            },
            Failure::Timeout { .. } => ErrorKind::Timeout,
            Failure::Persistence(_) => ErrorKind::PersistenceFailure,
            Failure::Panicked(_) => ErrorKind::Unknown,
        }
    }

    /// Build the consumer-facing error.
    pub fn classify(&self) -> ClassifiedError {
        let kind = self.kind();
        let message = match self {
            Failure::InvalidArguments { name, validation, .. } => {
                let mut fields: Vec<&str> = validation.missing.clone();
                fields.extend(validation.mismatched.iter().copied());
                format!("{name} is missing required fields: {}", fields.join(", "))
            }
            Failure::UnknownCall { name, .. } => format!("Unknown function: {name}"),
            _ => kind.user_message().to_string(),
        };
        ClassifiedError {
            kind,
            message,
            details: self.details(),
        }
    }

    fn details(&self) -> Value {
        match self {
            Failure::Repair { name, source } => json!({
                "functionName": name,
                "rawArguments": source.raw,
                "error": source.to_string(),
            }),
            Failure::InvalidArguments {
                name,
                validation,
                arguments,
            } => json!({
                "functionName": name.as_str(),
                "missingFields": validation.missing,
                "mismatchedFields": validation.mismatched,
                "receivedArgs": arguments,
            }),
            Failure::UnknownCall { name, raw_arguments } => json!({
                "functionName": name,
                "rawArguments": raw_arguments,
            }),
            Failure::Dispatch {
                name,
                reason,
                arguments,
            } => json!({
                "functionName": name.as_str(),
                "error": reason,
                "args": arguments,
            }),
            Failure::Provider(ProviderError::Status { status, body }) => json!({
                "status": status,
                "body": body,
            }),
            Failure::Timeout { phase, after } => json!({
                "phase": phase.to_string(),
                "timeoutMs": after.as_millis() as u64,
            }),
            other => json!({ "error": other.to_string() }),
        }
    }
}
