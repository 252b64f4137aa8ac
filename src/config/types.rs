// Copyright 2026 The Callwire Project
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::stream::ClassifierLimits;

use super::defaults;

/// Fully loaded and validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub version: String,
    pub environment: String,
    pub provider: ProviderConfig,
    pub engine: EngineConfig,
    pub stream: ClassifierLimits,
    pub preview: PreviewConfig,
    pub sessions: SessionConfig,
    pub catalog: CatalogConfig,
    pub ui: UiConfig,
    /// `sha256:<hex>` of the raw YAML, logged at startup.
    pub config_hash: String,
}

#[derive(Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub system_prompt: Option<String>,
}

// Keeps the key out of logs.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("model", &self.model)
            .field("system_prompt", &self.system_prompt.as_ref().map(|p| p.len()))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub establish_timeout: Duration,
    /// `None` waits for the next token indefinitely.
    pub idle_timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            establish_timeout: Duration::from_millis(defaults::ESTABLISH_TIMEOUT_MS),
            idle_timeout: Some(Duration::from_millis(defaults::IDLE_TIMEOUT_MS)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreviewConfig {
    pub enabled: bool,
    pub timeout: Duration,
    pub max_redirects: usize,
    pub user_agent: String,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout: Duration::from_millis(defaults::PREVIEW_TIMEOUT_MS),
            max_redirects: defaults::PREVIEW_MAX_REDIRECTS,
            user_agent: defaults::PREVIEW_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub ttl: Duration,
    pub max_history: usize,
    pub max_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(defaults::SESSION_TTL_SECS),
            max_history: defaults::SESSION_MAX_HISTORY,
            max_sessions: defaults::SESSION_MAX_SESSIONS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogConfig {
    /// JSON array of plan records. Absent means an empty catalog.
    pub plans_path: Option<PathBuf>,
}

/// Fixed content for the option-list events.
#[derive(Debug, Clone, PartialEq)]
pub struct UiConfig {
    pub ott_question: String,
    pub ott_services: Vec<String>,
    /// Exactly two entries: the affirmative option first.
    pub ox_options: Vec<String>,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            ott_question: defaults::OTT_QUESTION.to_string(),
            ott_services: defaults::OTT_SERVICES.iter().map(|s| s.to_string()).collect(),
            ox_options: defaults::OX_OPTIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}
