// Copyright 2026 The Callwire Project
// SPDX-License-Identifier: Apache-2.0

// Config loader and validator
//
// Loads callwire.yaml, validates structure, resolves variable
// interpolation, applies defaults, and computes a config hash.

mod defaults;
mod error;
mod interpolation;
mod loader;
mod raw;
mod source;
mod types;

pub use error::ConfigError;
pub use interpolation::resolve_variables;
pub use loader::{compute_hash, load_config};
pub use source::{ConfigSource, FileSource, StringSource};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    fn load(yaml: &str) -> Result<Config, ConfigError> {
        load_config(&StringSource::new(yaml))
    }

    const MINIMAL: &str = "callwire: v1\nprovider:\n  model: gpt-4o-mini\n";

    #[test]
    fn minimal_config_gets_defaults() {
        let config = load(MINIMAL).unwrap();
        assert_eq!(config.version, "v1");
        assert_eq!(config.provider.base_url, "https://api.openai.com");
        assert_eq!(config.provider.api_key, "");
        assert_eq!(config.engine, EngineConfig::default());
        assert_eq!(config.engine.idle_timeout, Some(Duration::from_secs(60)));
        assert_eq!(config.stream, crate::stream::ClassifierLimits::default());
        assert_eq!(config.sessions.max_history, 50);
        assert_eq!(config.ui.ox_options, vec!["Yes", "No"]);
        assert_eq!(config.catalog.plans_path, None);
        assert!(config.preview.enabled);
    }

    #[test]
    fn full_config_overrides_defaults() {
        let yaml = r#"
callwire: v1
environment: staging
provider:
  base_url: http://llm.internal:8000/
  model: local-model
  system_prompt: "You are a plan advisor."
engine:
  establish_timeout_ms: 5000
  idle_timeout_ms: 0
stream:
  inline_watch_max_chunks: 4
  inline_watch_max_bytes: 64
preview:
  enabled: false
  max_redirects: 2
sessions:
  ttl_secs: 600
  max_sessions: 10
catalog:
  plans_path: data/plans.json
ui:
  ott_services: [Netflix]
  ox_options: ["O", "X"]
"#;
        let config = load(yaml).unwrap();
        assert_eq!(config.environment, "staging");
        assert_eq!(config.provider.base_url, "http://llm.internal:8000");
        assert_eq!(config.provider.system_prompt.as_deref(), Some("You are a plan advisor."));
        assert_eq!(config.engine.establish_timeout, Duration::from_secs(5));
        assert_eq!(config.engine.idle_timeout, None);
        assert_eq!(config.stream.inline_watch_max_chunks, 4);
        assert_eq!(config.stream.inline_watch_max_bytes, 64);
        assert!(!config.preview.enabled);
        assert_eq!(config.preview.max_redirects, 2);
        assert_eq!(config.sessions.ttl, Duration::from_secs(600));
        assert_eq!(config.sessions.max_history, 50);
        assert_eq!(config.catalog.plans_path, Some(PathBuf::from("data/plans.json")));
        assert_eq!(config.ui.ott_services, vec!["Netflix"]);
        assert_eq!(config.ui.ox_options, vec!["O", "X"]);
    }

    #[test]
    fn hash_is_stable_and_content_sensitive() {
        let a = load(MINIMAL).unwrap();
        let b = load(MINIMAL).unwrap();
        assert_eq!(a.config_hash, b.config_hash);
        assert!(a.config_hash.starts_with("sha256:"));
        assert_eq!(a.config_hash, compute_hash(MINIMAL));

        let other = load("callwire: v1\nprovider:\n  model: gpt-4o\n").unwrap();
        assert_ne!(a.config_hash, other.config_hash);
    }

    #[test]
    fn rejects_wrong_version() {
        let err = load("callwire: v2\nprovider:\n  model: m\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("v2")));
    }

    #[test]
    fn rejects_invalid_values() {
        let cases = [
            "callwire: v1\nprovider:\n  model: \"  \"\n",
            "callwire: v1\nprovider:\n  model: m\n  base_url: llm.internal\n",
            "callwire: v1\nprovider:\n  model: m\nengine:\n  establish_timeout_ms: 0\n",
            "callwire: v1\nprovider:\n  model: m\nstream:\n  inline_watch_max_bytes: 3\n",
            "callwire: v1\nprovider:\n  model: m\nsessions:\n  max_history: 0\n",
            "callwire: v1\nprovider:\n  model: m\nui:\n  ox_options: [\"Yes\", \"No\", \"Maybe\"]\n",
        ];
        for yaml in cases {
            assert!(
                matches!(load(yaml), Err(ConfigError::Validation(_))),
                "expected validation error for:\n{yaml}"
            );
        }
    }

    #[test]
    fn malformed_yaml_and_unknown_keys_are_yaml_errors() {
        assert!(matches!(load("callwire: [v1"), Err(ConfigError::YamlError(_))));
        assert!(matches!(
            load("callwire: v1\nprovider:\n  model: m\nproviders: {}\n"),
            Err(ConfigError::YamlError(_))
        ));
        assert!(matches!(load("callwire: v1\n"), Err(ConfigError::YamlError(_))));
    }

    #[test]
    fn api_key_is_interpolated_and_redacted() {
        let yaml = "callwire: v1\nprovider:\n  model: m\n  api_key: \"${CALLWIRE_TEST_UNSET_KEY:-sk-fallback}\"\n";
        let config = load(yaml).unwrap();
        assert_eq!(config.provider.api_key, "sk-fallback");
        let debug = format!("{:?}", config.provider);
        assert!(!debug.contains("sk-fallback"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn undefined_variable_is_an_error() {
        let yaml = "callwire: v1\nprovider:\n  model: m\n  api_key: ${CALLWIRE_TEST_UNSET_KEY}\n";
        assert!(matches!(
            load(yaml),
            Err(ConfigError::UndefinedVariable { ref name, .. }) if name == "CALLWIRE_TEST_UNSET_KEY"
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(&FileSource::new("/nonexistent/callwire.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
