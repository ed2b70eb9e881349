//! # Model Configuration
//!
//! Centralized LLM configuration types. Every supported provider speaks the
//! OpenAI-compatible chat completions protocol; they differ only in default
//! endpoint and API key variable.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Supported LLM providers
///
/// - Qwen (DashScope compatible mode) - `QWEN_API_KEY`, or `DASHSCOPE_API_KEY`
/// - OpenAI - `OPENAI_API_KEY`
/// - DeepSeek - `DEEPSEEK_API_KEY`
/// - OpenRouter (Gateway) - `OPENROUTER_API_KEY`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Qwen,
    #[serde(rename = "openai")]
    OpenAI,
    DeepSeek,
    OpenRouter,
}

impl LlmProvider {
    /// Get all available providers
    pub fn all() -> Vec<LlmProvider> {
        vec![
            LlmProvider::Qwen,
            LlmProvider::OpenAI,
            LlmProvider::DeepSeek,
            LlmProvider::OpenRouter,
        ]
    }

    /// Display name for logs
    pub fn display_name(&self) -> &'static str {
        match self {
            LlmProvider::Qwen => "Qwen",
            LlmProvider::OpenAI => "OpenAI",
            LlmProvider::DeepSeek => "DeepSeek",
            LlmProvider::OpenRouter => "OpenRouter",
        }
    }

    /// Base URL used when none is configured
    pub fn default_base_url(&self) -> &'static str {
        match self {
            LlmProvider::Qwen => "https://dashscope.aliyuncs.com/compatible-mode/v1",
            LlmProvider::OpenAI => "https://api.openai.com/v1",
            LlmProvider::DeepSeek => "https://api.deepseek.com/v1",
            LlmProvider::OpenRouter => "https://openrouter.ai/api/v1",
        }
    }

    /// Primary environment variable holding the API key
    pub fn api_key_env(&self) -> &'static str {
        self.api_key_envs()[0]
    }

    /// Every accepted API key variable, most preferred first
    pub fn api_key_envs(&self) -> &'static [&'static str] {
        match self {
            LlmProvider::Qwen => &["QWEN_API_KEY", "DASHSCOPE_API_KEY"],
            LlmProvider::OpenAI => &["OPENAI_API_KEY"],
            LlmProvider::DeepSeek => &["DEEPSEEK_API_KEY"],
            LlmProvider::OpenRouter => &["OPENROUTER_API_KEY"],
        }
    }

    /// First non-empty API key found through `lookup`
    pub fn api_key_from<F>(&self, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.api_key_envs()
            .iter()
            .filter_map(|key| lookup(key))
            .find(|value| !value.trim().is_empty())
    }

    /// Parse a provider name, case-insensitively
    pub fn parse(name: &str) -> Option<LlmProvider> {
        match name.trim().to_ascii_lowercase().as_str() {
            "qwen" | "dashscope" => Some(LlmProvider::Qwen),
            "openai" => Some(LlmProvider::OpenAI),
            "deepseek" => Some(LlmProvider::DeepSeek),
            "openrouter" => Some(LlmProvider::OpenRouter),
            _ => None,
        }
    }
}

/// Configuration for LLM model selection
///
/// ## Example
/// ```rust,ignore
/// use matforge_core::models::{ModelConfig, LlmProvider};
///
/// let config = ModelConfig::with_provider(LlmProvider::DeepSeek, "deepseek-chat")
///     .with_temperature(0.3);
/// let client = ChatClient::new(config)?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// LLM provider to use
    #[serde(default)]
    pub provider: LlmProvider,
    /// Model name (e.g., "qwen-max", "gpt-4o")
    pub model: String,
    /// Optional base URL override
    #[serde(default)]
    pub base_url: Option<String>,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Completion token limit
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    2048
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Qwen,
            model: "qwen-max".to_string(),
            base_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl ModelConfig {
    /// Create a new model config with the default provider
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// Create config for a specific provider
    pub fn with_provider(provider: LlmProvider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            ..Self::default()
        }
    }

    /// Set base URL
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Chat completions endpoint
    pub fn endpoint(&self) -> String {
        let base = self
            .base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url());
        format!("{}/chat/completions", base.trim_end_matches('/'))
    }
}

/// Per-agent override of the global model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelOverride {
    #[serde(default)]
    pub provider: Option<LlmProvider>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

/// Global model plus per-agent overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentModels {
    #[serde(default)]
    pub global: ModelConfig,
    /// agent_id -> override
    #[serde(default)]
    pub per_agent: HashMap<String, ModelOverride>,
    /// Use the global temperature for every agent instead of role defaults
    #[serde(default)]
    pub uniform_temperature: bool,
}

impl AgentModels {
    pub fn new(global: ModelConfig) -> Self {
        Self {
            global,
            ..Self::default()
        }
    }

    /// Get model config for a specific agent
    ///
    /// Precedence: per-agent override -> role default temperature -> global
    pub fn resolve(&self, agent_id: &str) -> ModelConfig {
        let mut config = self.global.clone();
        if !self.uniform_temperature {
            if let Some(t) = role_temperature(agent_id) {
                config.temperature = t;
            }
        }

        if let Some(o) = self.per_agent.get(agent_id) {
            if let Some(provider) = o.provider {
                config.provider = provider;
            }
            if let Some(model) = &o.model {
                config.model = model.clone();
            }
            if let Some(url) = &o.base_url {
                config.base_url = Some(url.clone());
            }
            if let Some(t) = o.temperature {
                config.temperature = t;
            }
        }
        config
    }
}

/// Default sampling temperature by role
fn role_temperature(agent_id: &str) -> Option<f32> {
    match agent_id {
        "designer" => Some(0.8),
        "final_validator" => Some(0.5),
        id if id.starts_with("evaluator") => Some(0.3),
        "classifier" => Some(0.1),
        "mechanism_expert" | "synthesis_expert" | "operation_expert" => Some(0.3),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ModelConfig::default();
        assert_eq!(config.provider, LlmProvider::Qwen);
        assert_eq!(config.max_tokens, 2048);
    }

    #[test]
    fn test_provider_display_names() {
        assert_eq!(LlmProvider::Qwen.display_name(), "Qwen");
        assert_eq!(LlmProvider::OpenAI.display_name(), "OpenAI");
        assert_eq!(LlmProvider::parse("DashScope"), Some(LlmProvider::Qwen));
        assert_eq!(LlmProvider::parse("anthropic"), None);
    }

    #[test]
    fn test_qwen_key_variables() {
        let env = |pairs: &'static [(&'static str, &'static str)]| {
            move |key: &str| {
                pairs
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, v)| v.to_string())
            }
        };

        assert_eq!(LlmProvider::Qwen.api_key_env(), "QWEN_API_KEY");
        assert_eq!(
            LlmProvider::Qwen.api_key_from(env(&[("QWEN_API_KEY", "sk-qwen")])),
            Some("sk-qwen".into())
        );
        assert_eq!(
            LlmProvider::Qwen.api_key_from(env(&[("QWEN_API_KEY", ""), ("DASHSCOPE_API_KEY", "sk-ds")])),
            Some("sk-ds".into())
        );
        assert_eq!(
            LlmProvider::Qwen.api_key_from(env(&[
                ("DASHSCOPE_API_KEY", "sk-ds"),
                ("QWEN_API_KEY", "sk-qwen")
            ])),
            Some("sk-qwen".into())
        );
        assert_eq!(LlmProvider::OpenAI.api_key_from(env(&[("QWEN_API_KEY", "sk-qwen")])), None);
    }

    #[test]
    fn test_endpoint() {
        let config = ModelConfig::with_provider(LlmProvider::OpenAI, "gpt-4o");
        assert_eq!(config.endpoint(), "https://api.openai.com/v1/chat/completions");

        let config = config.with_base_url("http://localhost:8000/v1/");
        assert_eq!(config.endpoint(), "http://localhost:8000/v1/chat/completions");
    }

    #[test]
    fn test_model_config_serialization() {
        let config = ModelConfig::with_provider(LlmProvider::OpenAI, "gpt-4o");
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("openai"));
        assert!(json.contains("gpt-4o"));

        let parsed: ModelConfig = serde_json::from_str(r#"{"model":"qwen-plus"}"#).unwrap();
        assert_eq!(parsed.provider, LlmProvider::Qwen);
        assert_eq!(parsed.temperature, 0.3);
    }

    #[test]
    fn test_role_temperatures() {
        let models = AgentModels::new(ModelConfig::default().with_temperature(0.6));
        assert_eq!(models.resolve("designer").temperature, 0.8);
        assert_eq!(models.resolve("evaluator_b").temperature, 0.3);
        assert_eq!(models.resolve("final_validator").temperature, 0.5);
        assert_eq!(models.resolve("unknown_agent").temperature, 0.6);

        let uniform = AgentModels {
            uniform_temperature: true,
            ..models
        };
        assert_eq!(uniform.resolve("designer").temperature, 0.6);
    }

    #[test]
    fn test_per_agent_override() {
        let mut models = AgentModels::default();
        models.per_agent.insert(
            "designer".to_string(),
            ModelOverride {
                provider: Some(LlmProvider::DeepSeek),
                model: Some("deepseek-chat".into()),
                temperature: Some(1.0),
                ..ModelOverride::default()
            },
        );

        let designer = models.resolve("designer");
        assert_eq!(designer.provider, LlmProvider::DeepSeek);
        assert_eq!(designer.model, "deepseek-chat");
        assert_eq!(designer.temperature, 1.0);
        assert_eq!(models.resolve("evaluator_a").model, "qwen-max");
    }
}
