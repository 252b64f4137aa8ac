// Copyright 2026 The Callwire Project
// SPDX-License-Identifier: Apache-2.0

// Raw YAML deserialization types (internal)
//
// Kept separate from the public Config structs: every field is optional
// here, interpolation and defaulting happen between raw and public, and
// durations arrive as milliseconds.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    pub callwire: String,
    pub environment: Option<String>,
    pub provider: RawProviderConfig,
    pub engine: Option<RawEngineConfig>,
    pub stream: Option<RawStreamConfig>,
    pub preview: Option<RawPreviewConfig>,
    pub sessions: Option<RawSessionConfig>,
    pub catalog: Option<RawCatalogConfig>,
    pub ui: Option<RawUiConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawProviderConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
    pub system_prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawEngineConfig {
    pub establish_timeout_ms: Option<u64>,
    /// 0 disables the idle timeout.
    pub idle_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawStreamConfig {
    pub inline_watch_max_chunks: Option<usize>,
    pub inline_watch_max_bytes: Option<usize>,
    pub max_call_buffer_bytes: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPreviewConfig {
    pub enabled: Option<bool>,
    pub timeout_ms: Option<u64>,
    pub max_redirects: Option<usize>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSessionConfig {
    pub ttl_secs: Option<u64>,
    pub max_history: Option<usize>,
    pub max_sessions: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawCatalogConfig {
    pub plans_path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawUiConfig {
    pub ott_question: Option<String>,
    pub ott_services: Option<Vec<String>>,
    pub ox_options: Option<Vec<String>>,
}
