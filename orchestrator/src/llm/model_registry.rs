//! ModelRegistry - per-stage model configuration lookup and fallback chain

use std::collections::HashMap;

/// Per-stage model descriptor (`spec.md` 6: "per-stage model descriptor
/// {model, temperature, max_tokens, fallback}")
#[derive(Debug, Clone)]
pub struct StageModelConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub fallback: Option<String>,
}

impl StageModelConfig {
    pub fn new(model: impl Into<String>, temperature: f32, max_tokens: u32) -> Self {
        Self { model: model.into(), temperature, max_tokens, fallback: None }
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }
}

/// Shared, process-wide; holds no per-session state (`spec.md` 3).
pub struct ModelRegistry {
    by_stage: HashMap<String, StageModelConfig>,
    default_config: StageModelConfig,
    available: HashMap<String, bool>,
}

impl ModelRegistry {
    pub fn new(default_config: StageModelConfig) -> Self {
        Self { by_stage: HashMap::new(), default_config, available: HashMap::new() }
    }

    pub fn register_stage(&mut self, stage_id: impl Into<String>, config: StageModelConfig) {
        self.by_stage.insert(stage_id.into(), config);
    }

    pub fn set_availability(&mut self, model: impl Into<String>, available: bool) {
        self.available.insert(model.into(), available);
    }

    pub fn config_for(&self, stage_id: &str) -> &StageModelConfig {
        self.by_stage.get(stage_id).unwrap_or(&self.default_config)
    }

    /// Unknown models are assumed available (`spec.md` has no probe result
    /// without an explicit prior check)
    pub fn is_available(&self, model: &str) -> bool {
        *self.available.get(model).unwrap_or(&true)
    }

    /// Walks `config.fallback` until it finds an available model, or the
    /// configured model itself if nothing was ever marked unavailable.
    pub fn resolve_available(&self, stage_id: &str) -> Option<&str> {
        let config = self.config_for(stage_id);
        if self.is_available(&config.model) {
            return Some(&config.model);
        }
        let mut next = config.fallback.as_deref();
        while let Some(model) = next {
            if self.is_available(model) {
                return Some(model);
            }
            next = None;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_stage_falls_back_to_default() {
        let registry = ModelRegistry::new(StageModelConfig::new("claude-haiku", 0.2, 1024));
        assert_eq!(registry.config_for("mode_selector").model, "claude-haiku");
    }

    #[test]
    fn registered_stage_overrides_default() {
        let mut registry = ModelRegistry::new(StageModelConfig::new("claude-haiku", 0.2, 1024));
        registry.register_stage("verifier", StageModelConfig::new("claude-opus", 0.0, 4096));
        assert_eq!(registry.config_for("verifier").model, "claude-opus");
        assert_eq!(registry.config_for("mode_selector").model, "claude-haiku");
    }

    #[test]
    fn resolve_available_walks_to_fallback_when_primary_unavailable() {
        let mut registry = ModelRegistry::new(StageModelConfig::new("claude-opus", 0.0, 4096).with_fallback("claude-sonnet"));
        registry.set_availability("claude-opus", false);
        assert_eq!(registry.resolve_available("verifier"), Some("claude-sonnet"));
    }

    #[test]
    fn resolve_available_returns_none_when_nothing_is_up() {
        let mut registry = ModelRegistry::new(StageModelConfig::new("claude-opus", 0.0, 4096).with_fallback("claude-sonnet"));
        registry.set_availability("claude-opus", false);
        registry.set_availability("claude-sonnet", false);
        assert_eq!(registry.resolve_available("verifier"), None);
    }
}
