//! Streaming chat providers.
//!
//! ```text
//!                  ┌──────────────┐
//!  orchestrator ──▶│ ChatProvider │  (trait)
//!                  └──────┬───────┘
//!              ┌──────────┴──────────┐
//!              ▼                     ▼
//!     ┌─────────────────┐   ┌────────────────┐
//!     │ OpenAiProvider  │   │ OllamaProvider │
//!     │ silicon, custom │   │ ollama         │
//!     └─────────────────┘   └────────────────┘
//! ```

pub mod ollama;
pub mod openai;
pub mod provider;
pub(crate) mod stream;
pub mod types;

use std::sync::Arc;

use pdfqa_config::{ProviderFamily, QaConfig};

pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use provider::{ChatProvider, ChunkReceiver, LlmError};
pub use types::{ChatMessage, ChatRequest, StreamChunk};

/// Build the provider for the selected service; `None` when disabled.
pub fn create_provider(config: &QaConfig) -> Option<Arc<dyn ChatProvider>> {
    let endpoint = config.endpoint()?;
    let provider: Arc<dyn ChatProvider> = match config.family()? {
        ProviderFamily::OpenAiCompatible => {
            let mut provider = OpenAiProvider::new(endpoint).with_temperature(config.temperature);
            if let Some(key) = config.api_key() {
                provider = provider.with_api_key(key);
            }
            Arc::new(provider)
        }
        ProviderFamily::ChatObject => Arc::new(OllamaProvider::new(endpoint)),
    };
    Some(provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfqa_config::{CustomConfig, OllamaConfig, ServiceKind};

    #[test]
    fn test_disabled_has_no_provider() {
        assert!(create_provider(&QaConfig::default()).is_none());
    }

    #[test]
    fn test_ollama_provider() {
        let config = QaConfig {
            service: ServiceKind::Ollama,
            ollama: OllamaConfig {
                host: "http://127.0.0.1:11434/".to_string(),
                model: "llama3".to_string(),
            },
            ..Default::default()
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.name(), "Ollama");
    }

    #[test]
    fn test_custom_provider_is_openai_compatible() {
        let config = QaConfig {
            service: ServiceKind::Custom,
            custom: CustomConfig {
                host: "http://gpu-box:8000".to_string(),
                model: "qwen2.5".to_string(),
                api_key: None,
            },
            ..Default::default()
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.name(), "OpenAI-compatible");
    }
}
