//! Configuration builders for tests.
//!
//! Use [`TestConfigBuilder`] to create customised [`AppConfig`] values without
//! repeating boilerplate across crate boundaries.

use std::path::PathBuf;

use pdfqa_config::{
    AppConfig, ConfigError, CustomConfig, ModelLimitConfig, OllamaConfig, ServiceKind,
    SiliconConfig,
};
use tempfile::TempDir;

/// Fluent builder for [`AppConfig`] in tests.
///
/// # Example
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .custom("http://127.0.0.1:8080", "qwen2.5")
///     .pages("1-3")
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: AppConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn silicon(mut self, base_url: &str, api_key: &str, model: &str) -> Self {
        self.config.qa.service = ServiceKind::Silicon;
        self.config.qa.silicon = SiliconConfig {
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url.to_string(),
        };
        self
    }

    pub fn ollama(mut self, host: &str, model: &str) -> Self {
        self.config.qa.service = ServiceKind::Ollama;
        self.config.qa.ollama = OllamaConfig {
            host: host.to_string(),
            model: model.to_string(),
        };
        self
    }

    pub fn custom(mut self, host: &str, model: &str) -> Self {
        self.config.qa.service = ServiceKind::Custom;
        self.config.qa.custom = CustomConfig {
            host: host.to_string(),
            model: model.to_string(),
            api_key: None,
        };
        self
    }

    pub fn custom_api_key(mut self, key: &str) -> Self {
        self.config.qa.custom.api_key = Some(key.to_string());
        self
    }

    pub fn pages(mut self, spec: &str) -> Self {
        self.config.qa.pages = spec.to_string();
        self
    }

    pub fn system_prompt(mut self, template: &str) -> Self {
        self.config.qa.system_prompt = Some(template.to_string());
        self
    }

    pub fn max_response_tokens(mut self, tokens: usize) -> Self {
        self.config.qa.max_response_tokens = tokens;
        self
    }

    pub fn model_limit(mut self, pattern: &str, limit: usize) -> Self {
        self.config.budget.models.push(ModelLimitConfig {
            pattern: pattern.to_string(),
            limit,
        });
        self
    }

    pub fn safety_margin(mut self, tokens: usize) -> Self {
        self.config.budget.safety_margin = tokens;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.exchange.timeout_secs = secs;
        self
    }

    pub fn stall_timeout_secs(mut self, secs: u64) -> Self {
        self.config.exchange.stall_timeout_secs = secs;
        self
    }

    pub fn heartbeat_secs(mut self, secs: u64) -> Self {
        self.config.exchange.heartbeat_secs = secs;
        self
    }

    pub fn cancel_grace_ms(mut self, ms: u64) -> Self {
        self.config.exchange.cancel_grace_ms = ms;
        self
    }

    pub fn log_capacity(mut self, capacity: usize) -> Self {
        self.config.logging.capacity = capacity;
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A config file in a temporary directory, removed on drop.
pub struct TestConfigFile {
    pub path: PathBuf,
    _temp_dir: TempDir,
}

impl TestConfigFile {
    /// Write `toml_content` to `pdfqa.toml` in a fresh temp directory.
    pub async fn with_toml(toml_content: &str) -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("pdfqa.toml");
        tokio::fs::write(&path, toml_content)
            .await
            .expect("failed to write test config");
        Self {
            path,
            _temp_dir: temp_dir,
        }
    }

    pub async fn load(&self) -> Result<AppConfig, ConfigError> {
        AppConfig::load(&self.path).await
    }
}
