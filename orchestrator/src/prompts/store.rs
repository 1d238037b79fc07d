//! PromptStore - read-only mapping from prompt id to {system, user template, schema hint}

use handlebars::Handlebars;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::embedded::get_embedded;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("unknown prompt id: {0}")]
    UnknownPrompt(String),
    #[error("template render error: {0}")]
    Render(String),
}

#[derive(Debug, Clone)]
pub struct ResolvedPrompt {
    pub system: String,
    pub user: String,
}

/// Shared, process-wide, read-only once constructed.
pub struct PromptStore {
    handlebars: Handlebars<'static>,
}

impl Default for PromptStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptStore {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        Self { handlebars }
    }

    pub fn resolve(&self, prompt_id: &str, variables: &impl Serialize) -> Result<ResolvedPrompt, PromptError> {
        let prompt = get_embedded(prompt_id).ok_or_else(|| PromptError::UnknownPrompt(prompt_id.to_string()))?;
        let user = self.handlebars.render_template(prompt.user_template, variables).map_err(|e| PromptError::Render(e.to_string()))?;
        Ok(ResolvedPrompt { system: prompt.system.to_string(), user })
    }

    pub fn resolve_raw(&self, prompt_id: &str, variables: &Value) -> Result<ResolvedPrompt, PromptError> {
        self.resolve(prompt_id, variables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_placeholders_in_user_template() {
        let store = PromptStore::new();
        let resolved = store.resolve("mode_selector", &json!({"utterance": "Привіт"})).unwrap();
        assert!(resolved.user.contains("Привіт"));
        assert!(resolved.system.contains("chat"));
    }

    #[test]
    fn unknown_prompt_id_is_an_error() {
        let store = PromptStore::new();
        let err = store.resolve("nonexistent", &json!({})).unwrap_err();
        assert!(matches!(err, PromptError::UnknownPrompt(_)));
    }

    #[test]
    fn missing_template_variable_renders_empty_rather_than_failing() {
        let store = PromptStore::new();
        let resolved = store.resolve("context_enricher", &json!({})).unwrap();
        assert!(resolved.system.contains("enriched"));
    }
}
