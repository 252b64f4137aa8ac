// Copyright 2026 The Callwire Project
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;
use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::stream::ClassifierLimits;

use super::defaults;
use super::error::ConfigError;
use super::interpolation::resolve_variables;
use super::raw;
use super::source::ConfigSource;
use super::types::*;

/// Load and validate a callwire config from the given source.
///
/// Steps:
/// 1. Read raw YAML from source
/// 2. Compute SHA256 config hash
/// 3. Parse YAML into raw deserialization types
/// 4. Resolve `${VAR}` interpolation in provider strings
/// 5. Validate values and apply defaults
/// 6. Build typed Config struct
pub fn load_config(source: &dyn ConfigSource) -> Result<Config, ConfigError> {
    let raw_yaml = source.load()?;
    let config_hash = compute_hash(&raw_yaml);

    let raw: raw::RawConfig = serde_yaml::from_str(&raw_yaml)?;

    if raw.callwire != "v1" {
        return Err(ConfigError::Validation(format!(
            "unsupported config version \"{}\", expected \"v1\"",
            raw.callwire
        )));
    }

    let config = Config {
        version: raw.callwire,
        environment: raw.environment.unwrap_or_default(),
        provider: build_provider_config(raw.provider)?,
        engine: build_engine_config(raw.engine)?,
        stream: build_stream_limits(raw.stream)?,
        preview: build_preview_config(raw.preview)?,
        sessions: build_session_config(raw.sessions)?,
        catalog: CatalogConfig {
            plans_path: raw.catalog.and_then(|c| c.plans_path).map(PathBuf::from),
        },
        ui: build_ui_config(raw.ui)?,
        config_hash,
    };

    tracing::debug!(source = %source.describe(), hash = %config.config_hash, "config loaded");
    Ok(config)
}

pub fn compute_hash(raw_yaml: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_yaml.as_bytes());
    let hash = hasher.finalize();
    format!("sha256:{:x}", hash)
}

fn build_provider_config(raw: raw::RawProviderConfig) -> Result<ProviderConfig, ConfigError> {
    let model = resolve_variables(&raw.model, "provider.model")?;
    if model.trim().is_empty() {
        return Err(ConfigError::Validation("provider.model must not be empty".to_string()));
    }

    let base_url = match raw.base_url {
        Some(url) => resolve_variables(&url, "provider.base_url")?,
        None => defaults::PROVIDER_BASE_URL.to_string(),
    };
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(ConfigError::Validation(format!(
            "provider.base_url \"{base_url}\" must be an http(s) URL"
        )));
    }

    let api_key = match raw.api_key {
        Some(key) => resolve_variables(&key, "provider.api_key")?,
        None => String::new(),
    };

    let system_prompt = match raw.system_prompt {
        Some(prompt) => Some(resolve_variables(&prompt, "provider.system_prompt")?),
        None => None,
    };

    Ok(ProviderConfig {
        base_url: base_url.trim_end_matches('/').to_string(),
        api_key,
        model,
        system_prompt: system_prompt.filter(|p| !p.trim().is_empty()),
    })
}

fn build_engine_config(raw: Option<raw::RawEngineConfig>) -> Result<EngineConfig, ConfigError> {
    let raw = match raw {
        Some(r) => r,
        None => return Ok(EngineConfig::default()),
    };

    let establish_ms = raw.establish_timeout_ms.unwrap_or(defaults::ESTABLISH_TIMEOUT_MS);
    if establish_ms == 0 {
        return Err(ConfigError::Validation(
            "engine.establish_timeout_ms must be greater than 0".to_string(),
        ));
    }

    let idle_timeout = match raw.idle_timeout_ms.unwrap_or(defaults::IDLE_TIMEOUT_MS) {
        0 => None,
        ms => Some(Duration::from_millis(ms)),
    };

    Ok(EngineConfig {
        establish_timeout: Duration::from_millis(establish_ms),
        idle_timeout,
    })
}

fn build_stream_limits(raw: Option<raw::RawStreamConfig>) -> Result<ClassifierLimits, ConfigError> {
    let mut limits = ClassifierLimits::default();
    let Some(raw) = raw else {
        return Ok(limits);
    };

    if let Some(chunks) = raw.inline_watch_max_chunks {
        limits.inline_watch_max_chunks = chunks;
    }
    if let Some(bytes) = raw.inline_watch_max_bytes {
        limits.inline_watch_max_bytes = bytes;
    }
    if let Some(bytes) = raw.max_call_buffer_bytes {
        limits.max_call_buffer_bytes = bytes;
    }

    // A marker cannot be recognized in less room than its own keyword.
    if limits.inline_watch_max_bytes < crate::stream::MARKER_KEYWORD.len() {
        return Err(ConfigError::Validation(format!(
            "stream.inline_watch_max_bytes must be at least {}",
            crate::stream::MARKER_KEYWORD.len()
        )));
    }
    if limits.max_call_buffer_bytes == 0 {
        return Err(ConfigError::Validation(
            "stream.max_call_buffer_bytes must be greater than 0".to_string(),
        ));
    }
    Ok(limits)
}

fn build_preview_config(raw: Option<raw::RawPreviewConfig>) -> Result<PreviewConfig, ConfigError> {
    let mut preview = PreviewConfig::default();
    let Some(raw) = raw else {
        return Ok(preview);
    };

    if let Some(enabled) = raw.enabled {
        preview.enabled = enabled;
    }
    if let Some(ms) = raw.timeout_ms {
        if ms == 0 {
            return Err(ConfigError::Validation(
                "preview.timeout_ms must be greater than 0".to_string(),
            ));
        }
        preview.timeout = Duration::from_millis(ms);
    }
    if let Some(max) = raw.max_redirects {
        preview.max_redirects = max;
    }
    if let Some(agent) = raw.user_agent {
        preview.user_agent = agent;
    }
    Ok(preview)
}

fn build_session_config(raw: Option<raw::RawSessionConfig>) -> Result<SessionConfig, ConfigError> {
    let mut sessions = SessionConfig::default();
    let Some(raw) = raw else {
        return Ok(sessions);
    };

    if let Some(secs) = raw.ttl_secs {
        sessions.ttl = Duration::from_secs(secs);
    }
    if let Some(max) = raw.max_history {
        sessions.max_history = max;
    }
    if let Some(max) = raw.max_sessions {
        sessions.max_sessions = max;
    }

    for (key, value) in [
        ("sessions.ttl_secs", sessions.ttl.as_secs() as usize),
        ("sessions.max_history", sessions.max_history),
        ("sessions.max_sessions", sessions.max_sessions),
    ] {
        if value == 0 {
            return Err(ConfigError::Validation(format!("{key} must be greater than 0")));
        }
    }
    Ok(sessions)
}

fn build_ui_config(raw: Option<raw::RawUiConfig>) -> Result<UiConfig, ConfigError> {
    let mut ui = UiConfig::default();
    let Some(raw) = raw else {
        return Ok(ui);
    };

    if let Some(question) = raw.ott_question {
        ui.ott_question = question;
    }
    if let Some(services) = raw.ott_services {
        if services.is_empty() {
            return Err(ConfigError::Validation(
                "ui.ott_services must list at least one service".to_string(),
            ));
        }
        ui.ott_services = services;
    }
    if let Some(options) = raw.ox_options {
        if options.len() != 2 {
            return Err(ConfigError::Validation(format!(
                "ui.ox_options must have exactly 2 entries, got {}",
                options.len()
            )));
        }
        ui.ox_options = options;
    }
    Ok(ui)
}
