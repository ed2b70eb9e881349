//! CLI settings: defaults, then `.matforge/config.json`, then environment.
//! Command-line flags are applied last by `main`.

use anyhow::{Context, Result};
use matforge_core::models::{AgentModels, LlmProvider};
use matforge_core::swarm::CoordinatorConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_CONFIG_PATH: &str = ".matforge/config.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub coordinator: CoordinatorConfig,
    pub models: AgentModels,
}

impl Settings {
    /// Load the JSON file. A missing default file yields defaults; a missing
    /// explicit file is an error.
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let p = PathBuf::from(DEFAULT_CONFIG_PATH);
                if !p.exists() {
                    return Ok(Self::default());
                }
                p
            }
        };

        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let settings = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Loaded config file");
        Ok(settings)
    }

    /// Overlay recognised environment variables
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(n) = parsed::<u32, _>(&lookup, "MAX_DESIGN_ITERATIONS") {
            self.coordinator.max_rounds = n;
        }
        if let Some(s) = parsed::<f64, _>(&lookup, "MIN_ACCEPTABLE_SCORE") {
            self.coordinator.min_acceptable_score = s;
        }
        if let Some(sd) = parsed::<f64, _>(&lookup, "HIGH_CONSISTENCY_THRESHOLD") {
            self.coordinator.agreement.high_max_sd = sd;
        }
        if let Some(sd) = parsed::<f64, _>(&lookup, "MEDIUM_CONSISTENCY_THRESHOLD") {
            self.coordinator.agreement.medium_max_sd = sd;
        }
        if let Some(secs) = parsed::<u64, _>(&lookup, "NODE_TIMEOUT_SECS") {
            self.coordinator.node_timeout_secs = Some(secs);
        }

        if let Some(name) = non_empty(&lookup, "LLM_PROVIDER") {
            match LlmProvider::parse(&name) {
                Some(provider) => self.models.global.provider = provider,
                None => tracing::warn!(value = %name, "Ignoring unknown LLM_PROVIDER"),
            }
        }
        // QWEN_* names are accepted for older .env files
        if let Some(model) =
            non_empty(&lookup, "LLM_MODEL_NAME").or_else(|| non_empty(&lookup, "QWEN_MODEL_NAME"))
        {
            self.models.global.model = model;
        }
        if let Some(url) =
            non_empty(&lookup, "LLM_API_BASE").or_else(|| non_empty(&lookup, "QWEN_API_BASE"))
        {
            self.models.global.base_url = Some(url);
        }
        // An explicit temperature wins over the per-role defaults
        if let Some(t) = parsed::<f32, _>(&lookup, "MODEL_TEMPERATURE") {
            self.models.global.temperature = t;
            self.models.uniform_temperature = true;
        }
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = non_empty(lookup, key)?;
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable environment value");
            None
        }
    }
}
