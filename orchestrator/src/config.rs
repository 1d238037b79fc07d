//! Orchestrator configuration types and loading
//!
//! Grounded on the teacher's `src/config.rs`: same fallback chain
//! (explicit path -> project-local file -> user config dir -> defaults),
//! same `serde(default)` + kebab-case rename convention.

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub retry: RetryConfig,
    pub thresholds: ThresholdConfig,
    pub capture: CaptureConfig,
    pub intervention: InterventionConfig,
}

impl Config {
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("failed to load config from {}", path.display()));
        }

        let local_config = PathBuf::from(".orchestrator.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(err) => tracing::warn!("failed to load config from {}: {err}", local_config.display()),
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("orchestrator").join("orchestrator.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(err) => tracing::warn!("failed to load config from {}: {err}", user_config.display()),
                }
            }
        }

        tracing::info!("no config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("failed to parse config file")?;
        tracing::info!("loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// `spec.md` 6: "user_language (default \"uk\"); drives TTS phrasing and
    /// localized summaries." Read once at config load time, not re-read per
    /// call, so a session's language is stable for its lifetime.
    pub fn user_language() -> String {
        std::env::var("ORCH_USER_LANGUAGE").unwrap_or_else(|_| "uk".to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    #[serde(rename = "fallback-model")]
    pub fallback_model: Option<String>,
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,
    #[serde(rename = "api-endpoint-primary")]
    pub base_url: String,
    #[serde(rename = "api-endpoint-fallback")]
    pub fallback_base_url: Option<String>,
    #[serde(rename = "use-fallback-endpoint")]
    pub use_fallback_endpoint: bool,
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            fallback_model: Some("claude-haiku-4-20250514".to_string()),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            fallback_base_url: None,
            use_fallback_endpoint: false,
            max_tokens: 4096,
            timeout_ms: 30_000,
        }
    }
}

/// `spec.md` 6: "retry.itemExecution.maxAttempts"
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    #[serde(rename = "item-execution-max-attempts")]
    pub item_execution_max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { item_execution_max_attempts: 3 }
    }
}

/// `spec.md` 6: "thresholds {codeComplexity, errorRate, responseTime, coverage, memoryStability}"
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub code_complexity: u8,
    pub error_rate: f32,
    pub response_time_ms: u64,
    pub coverage: f32,
    pub memory_stability: f32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            code_complexity: 7,
            error_rate: 0.1,
            response_time_ms: 5_000,
            coverage: 0.7,
            memory_stability: 0.9,
        }
    }
}

/// `spec.md` 6: "capture.interval_ms, capture.directory, capture.maxStored"
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub interval_ms: u64,
    pub directory: PathBuf,
    pub max_stored: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2_000,
            directory: PathBuf::from("/tmp/orchestrator/screenshots"),
            max_stored: 10,
        }
    }
}

/// `spec.md` 6: "intervention.password"
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterventionConfig {
    pub password: Option<String>,
}

impl Default for InterventionConfig {
    fn default() -> Self {
        Self { password: None }
    }
}
