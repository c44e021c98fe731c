// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod types;
mod error;
mod provider;
mod ollama;
mod mock;

pub use types::*;
pub use error::ModelError;
pub use provider::{ModelProvider, ResponseStream};
pub use ollama::OllamaProvider;
pub use mock::{text_script, MockProvider, Script, ScriptedMockProvider};

use orgmate_config::BackendConfig;
use tracing::debug;

/// Construct a boxed [`ModelProvider`] from configuration.
///
/// Provider selection:
/// - `"ollama"` → [`OllamaProvider`] talking to `cfg.host`
/// - `"mock"` → [`MockProvider`] (echo-back)
///
/// `model_override` (from `--model`) wins over `cfg.default_model`.
pub fn from_config(
    cfg: &BackendConfig,
    model_override: Option<&str>,
) -> Result<Box<dyn ModelProvider>, ModelError> {
    let model = model_override.unwrap_or(&cfg.default_model);
    debug!(provider = %cfg.provider, model, "constructing model provider");
    match cfg.provider.as_str() {
        "ollama" | "" => Ok(Box::new(OllamaProvider::new(cfg.host.clone(), model))),
        "mock" => Ok(Box::new(MockProvider)),
        other => Err(ModelError::UnknownProvider(other.to_string())),
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_backend_is_ollama_with_default_model() {
        let p = from_config(&BackendConfig::default(), None).unwrap();
        assert_eq!(p.name(), "ollama");
        assert_eq!(p.model_name(), "llama3.2");
    }

    #[test]
    fn model_override_wins() {
        let p = from_config(&BackendConfig::default(), Some("qwen2.5")).unwrap();
        assert_eq!(p.model_name(), "qwen2.5");
    }

    #[test]
    fn mock_provider_selectable() {
        let cfg = BackendConfig { provider: "mock".into(), ..BackendConfig::default() };
        assert_eq!(from_config(&cfg, None).unwrap().name(), "mock");
    }

    #[test]
    fn unknown_provider_is_error() {
        let cfg = BackendConfig { provider: "nope".into(), ..BackendConfig::default() };
        let err = from_config(&cfg, None).err().unwrap();
        assert!(matches!(err, ModelError::UnknownProvider(p) if p == "nope"));
    }
}
