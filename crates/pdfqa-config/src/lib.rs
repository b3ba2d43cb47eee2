#![deny(unsafe_code)]

//! Configuration loading and validation for pdfqa.
//!
//! Loads TOML configuration files and validates them at load time. The
//! [`AppConfig`] type is the central configuration structure; the `[qa]`
//! section selects one of the recognized [`ServiceKind`]s and carries the
//! fields each service requires.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Placeholder in the system-prompt template that receives the document text.
pub const CONTENT_PLACEHOLDER: &str = "{pdf_content}";

/// Template used when the configuration does not provide one.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a PDF document analysis assistant. \
The user has opened a PDF document and you answer questions based on its content.\n\n\
PDF document content:\n{pdf_content}\n\n\
Please note:\n\
1. Answer only from the document content above.\n\
2. If the question is unrelated to the document, say so clearly.\n\
3. Be accurate and detailed, and cite the relevant pages.";

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level application configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Question-answering service selection and prompt settings.
    #[serde(default)]
    pub qa: QaConfig,

    /// Token budget tuning.
    #[serde(default)]
    pub budget: BudgetConfig,

    /// Page-marker sanity thresholds.
    #[serde(default)]
    pub filter: FilterConfig,

    /// Streaming exchange timeouts.
    #[serde(default)]
    pub exchange: ExchangeConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// The chat services the QA engine knows how to talk to.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    /// QA engine switched off.
    #[default]
    Disabled,
    /// SiliconFlow hosted models (OpenAI-compatible API).
    Silicon,
    /// A local Ollama server.
    Ollama,
    /// Any OpenAI-compatible endpoint.
    Custom,
}

impl ServiceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Silicon => "silicon",
            Self::Ollama => "ollama",
            Self::Custom => "custom",
        }
    }
}

/// Wire-format family spoken by a service's streaming endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFamily {
    /// `data: {...}` lines with `choices[0].delta.content`, ended by `[DONE]`.
    OpenAiCompatible,
    /// One JSON object per line with `message.content` and a boolean `done`.
    ChatObject,
}

/// The `[qa]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaConfig {
    /// Which service answers questions.
    #[serde(default)]
    pub service: ServiceKind,

    /// Page-range spec (e.g. "1-5,8"). Empty means all pages.
    #[serde(default)]
    pub pages: String,

    /// System-prompt template; must contain [`CONTENT_PLACEHOLDER`] exactly once.
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Tokens held back for the model's answer.
    #[serde(default = "default_max_response_tokens")]
    pub max_response_tokens: usize,

    /// Sampling temperature sent to OpenAI-compatible services.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default)]
    pub silicon: SiliconConfig,

    #[serde(default)]
    pub ollama: OllamaConfig,

    #[serde(default)]
    pub custom: CustomConfig,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            service: ServiceKind::default(),
            pages: String::new(),
            system_prompt: None,
            max_response_tokens: default_max_response_tokens(),
            temperature: default_temperature(),
            silicon: SiliconConfig::default(),
            ollama: OllamaConfig::default(),
            custom: CustomConfig::default(),
        }
    }
}

fn default_max_response_tokens() -> usize {
    2000
}

fn default_temperature() -> f32 {
    0.7
}

impl QaConfig {
    /// Model name of the selected service, if any.
    pub fn model(&self) -> Option<&str> {
        match self.service {
            ServiceKind::Disabled => None,
            ServiceKind::Silicon => Some(self.silicon.model.as_str()),
            ServiceKind::Ollama => Some(self.ollama.model.as_str()),
            ServiceKind::Custom => Some(self.custom.model.as_str()),
        }
    }

    /// Wire-format family of the selected service.
    pub fn family(&self) -> Option<ProviderFamily> {
        match self.service {
            ServiceKind::Disabled => None,
            ServiceKind::Silicon | ServiceKind::Custom => Some(ProviderFamily::OpenAiCompatible),
            ServiceKind::Ollama => Some(ProviderFamily::ChatObject),
        }
    }

    /// Full streaming endpoint URL of the selected service.
    pub fn endpoint(&self) -> Option<String> {
        match self.service {
            ServiceKind::Disabled => None,
            ServiceKind::Silicon => Some(format!(
                "{}/chat/completions",
                self.silicon.base_url.trim_end_matches('/')
            )),
            ServiceKind::Ollama => Some(format!(
                "{}/api/chat",
                self.ollama.host.trim_end_matches('/')
            )),
            ServiceKind::Custom => Some(format!(
                "{}/v1/chat/completions",
                self.custom.host.trim_end_matches('/')
            )),
        }
    }

    /// Bearer token of the selected service. Empty keys count as absent.
    pub fn api_key(&self) -> Option<&str> {
        let key = match self.service {
            ServiceKind::Silicon => self.silicon.api_key.as_str(),
            ServiceKind::Custom => self.custom.api_key.as_deref().unwrap_or_default(),
            ServiceKind::Ollama | ServiceKind::Disabled => "",
        };
        if key.is_empty() { None } else { Some(key) }
    }

    /// The configured system prompt, or [`DEFAULT_SYSTEM_PROMPT`].
    pub fn system_prompt_template(&self) -> &str {
        match self.system_prompt.as_deref() {
            Some(prompt) if !prompt.trim().is_empty() => prompt,
            _ => DEFAULT_SYSTEM_PROMPT,
        }
    }
}

/// `[qa.silicon]`: SiliconFlow hosted API.
#[derive(Clone, Serialize, Deserialize)]
pub struct SiliconConfig {
    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub model: String,

    #[serde(default = "default_silicon_base_url")]
    pub base_url: String,
}

impl Default for SiliconConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: String::new(),
            base_url: default_silicon_base_url(),
        }
    }
}

impl fmt::Debug for SiliconConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiliconConfig")
            .field("api_key", &redacted(Some(&self.api_key)))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn default_silicon_base_url() -> String {
    "https://api.siliconflow.cn/v1".to_string()
}

/// `[qa.ollama]`: local Ollama server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_host")]
    pub host: String,

    #[serde(default)]
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: default_ollama_host(),
            model: String::new(),
        }
    }
}

fn default_ollama_host() -> String {
    "http://127.0.0.1:11434".to_string()
}

/// `[qa.custom]`: any OpenAI-compatible endpoint.
#[derive(Default, Clone, Serialize, Deserialize)]
pub struct CustomConfig {
    /// Base URL; `/v1/chat/completions` is appended.
    #[serde(default)]
    pub host: String,

    #[serde(default)]
    pub model: String,

    /// Optional bearer token.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl fmt::Debug for CustomConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomConfig")
            .field("host", &self.host)
            .field("model", &self.model)
            .field("api_key", &redacted(self.api_key.as_deref()))
            .finish()
    }
}

fn redacted(value: Option<&str>) -> &'static str {
    match value {
        Some(v) if !v.is_empty() => "[REDACTED]",
        _ => "<unset>",
    }
}

/// A context-window override row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelLimitConfig {
    /// Matched as a case-insensitive substring of the model name.
    pub pattern: String,
    /// Context window in tokens.
    pub limit: usize,
}

/// `[budget]`: token budget tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Tokens held back on top of the computed overhead.
    #[serde(default = "default_safety_margin")]
    pub safety_margin: usize,

    /// Lowest budget ever returned for document content.
    #[serde(default)]
    pub floor: usize,

    /// Context window assumed for unrecognized model names.
    #[serde(default = "default_token_limit")]
    pub default_token_limit: usize,

    /// Extra model rows, consulted before the built-in table.
    #[serde(default)]
    pub models: Vec<ModelLimitConfig>,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            safety_margin: default_safety_margin(),
            floor: 0,
            default_token_limit: default_token_limit(),
            models: Vec::new(),
        }
    }
}

fn default_safety_margin() -> usize {
    100
}

fn default_token_limit() -> usize {
    4096
}

/// `[filter]`: page-marker sanity thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Highest page number considered plausible before capping kicks in.
    #[serde(default = "default_page_ceiling")]
    pub page_ceiling: u32,

    /// Page number markers are capped to once the ceiling is exceeded.
    #[serde(default = "default_page_cap")]
    pub page_cap: u32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            page_ceiling: default_page_ceiling(),
            page_cap: default_page_cap(),
        }
    }
}

fn default_page_ceiling() -> u32 {
    100
}

fn default_page_cap() -> u32 {
    50
}

/// `[exchange]`: streaming exchange timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Wall-clock ceiling for one exchange.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Longest silence tolerated between two stream events.
    #[serde(default = "default_stall_timeout_secs")]
    pub stall_timeout_secs: u64,

    /// Interval of the "still working" pulse.
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,

    /// How long a cancelled exchange may take to wind down before it is aborted.
    #[serde(default = "default_cancel_grace_ms")]
    pub cancel_grace_ms: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            stall_timeout_secs: default_stall_timeout_secs(),
            heartbeat_secs: default_heartbeat_secs(),
            cancel_grace_ms: default_cancel_grace_ms(),
        }
    }
}

impl ExchangeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn stall_timeout(&self) -> Duration {
        Duration::from_secs(self.stall_timeout_secs)
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }

    pub fn cancel_grace(&self) -> Duration {
        Duration::from_millis(self.cancel_grace_ms)
    }
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_stall_timeout_secs() -> u64 {
    60
}

fn default_heartbeat_secs() -> u64 {
    30
}

fn default_cancel_grace_ms() -> u64 {
    3000
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Entries kept by the in-memory log collector.
    #[serde(default = "default_log_capacity")]
    pub capacity: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            capacity: default_log_capacity(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_capacity() -> usize {
    1000
}

impl AppConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        debug!(path = %path.display(), bytes = content.len(), "read config file");
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_qa()?;

        for (i, row) in self.budget.models.iter().enumerate() {
            if row.pattern.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "budget.models[{i}].pattern must not be empty"
                )));
            }
            if row.limit == 0 {
                return Err(ConfigError::Validation(format!(
                    "budget.models[{i}].limit must be non-zero"
                )));
            }
        }
        if self.budget.default_token_limit == 0 {
            return Err(ConfigError::Validation(
                "budget.default_token_limit must be non-zero".to_string(),
            ));
        }

        if self.filter.page_cap == 0 || self.filter.page_ceiling == 0 {
            return Err(ConfigError::Validation(
                "filter.page_cap and filter.page_ceiling must be non-zero".to_string(),
            ));
        }
        if self.filter.page_cap > self.filter.page_ceiling {
            return Err(ConfigError::Validation(format!(
                "filter.page_cap ({}) must not exceed filter.page_ceiling ({})",
                self.filter.page_cap, self.filter.page_ceiling
            )));
        }

        let exchange = &self.exchange;
        for (name, value) in [
            ("timeout_secs", exchange.timeout_secs),
            ("stall_timeout_secs", exchange.stall_timeout_secs),
            ("heartbeat_secs", exchange.heartbeat_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::Validation(format!(
                    "exchange.{name} must be non-zero"
                )));
            }
        }

        if self.logging.capacity == 0 {
            return Err(ConfigError::Validation(
                "logging.capacity must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_qa(&self) -> Result<(), ConfigError> {
        let qa = &self.qa;

        if let Some(ref prompt) = qa.system_prompt {
            // Each occurrence would be filled with the whole document.
            let placeholders = prompt.matches(CONTENT_PLACEHOLDER).count();
            if !prompt.trim().is_empty() && placeholders != 1 {
                return Err(ConfigError::Validation(format!(
                    "qa.system_prompt must contain the {CONTENT_PLACEHOLDER} placeholder exactly once, found {placeholders}"
                )));
            }
        }
        if qa.max_response_tokens == 0 {
            return Err(ConfigError::Validation(
                "qa.max_response_tokens must be non-zero".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&qa.temperature) {
            return Err(ConfigError::Validation(format!(
                "qa.temperature must be in [0.0, 2.0], got {}",
                qa.temperature
            )));
        }

        // Required fields per service
        match qa.service {
            ServiceKind::Disabled => {}
            ServiceKind::Silicon => {
                require("qa.silicon.api_key", &qa.silicon.api_key)?;
                require("qa.silicon.model", &qa.silicon.model)?;
                require("qa.silicon.base_url", &qa.silicon.base_url)?;
            }
            ServiceKind::Ollama => {
                require("qa.ollama.host", &qa.ollama.host)?;
                require("qa.ollama.model", &qa.ollama.model)?;
            }
            ServiceKind::Custom => {
                require("qa.custom.host", &qa.custom.host)?;
                require("qa.custom.model", &qa.custom.model)?;
            }
        }

        Ok(())
    }
}

fn require(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "{field} is required for the selected service"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.qa.service, ServiceKind::Disabled);
        assert_eq!(config.qa.max_response_tokens, 2000);
        assert_eq!(config.budget.safety_margin, 100);
        assert_eq!(config.budget.default_token_limit, 4096);
        assert_eq!(config.filter.page_ceiling, 100);
        assert_eq!(config.filter.page_cap, 50);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.capacity, 1000);
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config.qa.service, ServiceKind::Disabled);
        assert!(config.qa.model().is_none());
        assert!(config.qa.endpoint().is_none());
    }

    #[test]
    fn test_parse_silicon_service() {
        let toml = r#"
            [qa]
            service = "silicon"
            pages = "1-5,8"

            [qa.silicon]
            api_key = "sk-test"
            model = "deepseek-ai/DeepSeek-V3"
        "#;
        let config = AppConfig::parse(toml).unwrap();
        assert_eq!(config.qa.service, ServiceKind::Silicon);
        assert_eq!(config.qa.pages, "1-5,8");
        assert_eq!(config.qa.model(), Some("deepseek-ai/DeepSeek-V3"));
        assert_eq!(config.qa.api_key(), Some("sk-test"));
        assert_eq!(config.qa.family(), Some(ProviderFamily::OpenAiCompatible));
        assert_eq!(
            config.qa.endpoint().unwrap(),
            "https://api.siliconflow.cn/v1/chat/completions"
        );
    }

    #[test]
    fn test_parse_ollama_service() {
        let toml = r#"
            [qa]
            service = "ollama"

            [qa.ollama]
            host = "http://localhost:11434/"
            model = "llama3"
        "#;
        let config = AppConfig::parse(toml).unwrap();
        assert_eq!(config.qa.family(), Some(ProviderFamily::ChatObject));
        assert_eq!(config.qa.endpoint().unwrap(), "http://localhost:11434/api/chat");
        assert!(config.qa.api_key().is_none());
    }

    #[test]
    fn test_custom_endpoint_joins_path() {
        let toml = r#"
            [qa]
            service = "custom"

            [qa.custom]
            host = "http://gateway.local:8000//"
            model = "qwen2.5"
        "#;
        let config = AppConfig::parse(toml).unwrap();
        assert_eq!(
            config.qa.endpoint().unwrap(),
            "http://gateway.local:8000/v1/chat/completions"
        );
        assert!(config.qa.api_key().is_none());
    }

    #[test]
    fn test_validation_requires_silicon_key() {
        let toml = r#"
            [qa]
            service = "silicon"

            [qa.silicon]
            model = "deepseek-chat"
        "#;
        let err = AppConfig::parse(toml).unwrap_err();
        assert!(err.to_string().contains("qa.silicon.api_key"));
    }

    #[test]
    fn test_validation_requires_ollama_model() {
        let toml = r#"
            [qa]
            service = "ollama"
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_unknown_service() {
        let toml = r#"
            [qa]
            service = "openrouter"
        "#;
        assert!(matches!(AppConfig::parse(toml), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validation_rejects_prompt_without_placeholder() {
        let toml = r#"
            [qa]
            system_prompt = "You are helpful."
        "#;
        let err = AppConfig::parse(toml).unwrap_err();
        assert!(err.to_string().contains("{pdf_content}"));
    }

    #[test]
    fn test_validation_rejects_repeated_placeholder() {
        let toml = r#"
            [qa]
            system_prompt = "Context: {pdf_content}\nAgain: {pdf_content}"
        "#;
        let err = AppConfig::parse(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("exactly once, found 2"));
    }

    #[test]
    fn test_blank_prompt_falls_back_to_default() {
        let toml = r#"
            [qa]
            system_prompt = "   "
        "#;
        let config = AppConfig::parse(toml).unwrap();
        assert_eq!(config.qa.system_prompt_template(), DEFAULT_SYSTEM_PROMPT);
        assert!(DEFAULT_SYSTEM_PROMPT.contains(CONTENT_PLACEHOLDER));
    }

    #[test]
    fn test_validation_rejects_cap_above_ceiling() {
        let toml = r#"
            [filter]
            page_ceiling = 40
            page_cap = 50
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_zero_heartbeat() {
        let toml = r#"
            [exchange]
            heartbeat_secs = 0
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_bad_temperature() {
        let toml = r#"
            [qa]
            temperature = 3.5
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_budget_model_rows() {
        let toml = r#"
            [budget]
            safety_margin = 64

            [[budget.models]]
            pattern = "my-finetune"
            limit = 16000
        "#;
        let config = AppConfig::parse(toml).unwrap();
        assert_eq!(config.budget.safety_margin, 64);
        assert_eq!(config.budget.models.len(), 1);
        assert_eq!(config.budget.models[0].limit, 16000);

        let bad = r#"
            [[budget.models]]
            pattern = ""
            limit = 16000
        "#;
        assert!(AppConfig::parse(bad).is_err());
    }

    #[test]
    fn test_debug_redacts_api_keys() {
        let mut config = AppConfig::default();
        config.qa.silicon.api_key = "sk-very-secret".to_string();
        config.qa.custom.api_key = Some("custom-secret".to_string());

        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-very-secret"));
        assert!(!debug.contains("custom-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_exchange_durations() {
        let exchange = ExchangeConfig::default();
        assert_eq!(exchange.timeout(), Duration::from_secs(120));
        assert_eq!(exchange.cancel_grace(), Duration::from_millis(3000));
    }

    // ── Async file-based loading ──────────────────────────────────────

    #[test_log::test(tokio::test)]
    async fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("pdfqa.toml");
        tokio::fs::write(
            &path,
            b"[qa]\nservice = \"ollama\"\n\n[qa.ollama]\nmodel = \"qwen2\"\n",
        )
        .await
        .unwrap();

        let config = AppConfig::load(&path).await.unwrap();
        assert_eq!(config.qa.service, ServiceKind::Ollama);
        assert_eq!(config.qa.model(), Some("qwen2"));
    }

    #[tokio::test]
    async fn test_load_nonexistent_file() {
        let result = AppConfig::load(Path::new("/nonexistent/pdfqa.toml")).await;
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[tokio::test]
    async fn test_load_invalid_toml_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.toml");
        tokio::fs::write(&path, b"not valid toml [[[").await.unwrap();

        let result = AppConfig::load(&path).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Validation("bad value".to_string());
        assert_eq!(err.to_string(), "validation error: bad value");
    }
}
