//! EnrichedRequest - Stage 0.5 output

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Output of `ContextEnricher` (`spec.md` 3/4.5)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedRequest {
    pub original: String,
    pub enriched: String,
    pub implicit_requirements: Vec<String>,
    pub prerequisites: Vec<String>,
    pub technical_specifications: HashMap<String, String>,
    pub estimated_complexity: u8,
    /// Set when the stage fell back to the original message unchanged
    pub fallback: bool,
}

impl EnrichedRequest {
    /// The fallback path: original message passed through unchanged
    pub fn fallback(original: impl Into<String>) -> Self {
        let original = original.into();
        Self {
            enriched: original.clone(),
            original,
            implicit_requirements: Vec::new(),
            prerequisites: Vec::new(),
            technical_specifications: HashMap::new(),
            estimated_complexity: 1,
            fallback: true,
        }
    }

    /// Validate and clamp complexity into 1..=10, as required by `spec.md` 4.5
    pub fn with_complexity_checked(mut self, complexity: i64) -> Self {
        self.estimated_complexity = complexity.clamp(1, 10) as u8;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_preserves_original_message() {
        let enriched = EnrichedRequest::fallback("create a folder");
        assert!(enriched.fallback);
        assert_eq!(enriched.enriched, "create a folder");
    }

    #[test]
    fn complexity_is_clamped_to_1_10() {
        let enriched = EnrichedRequest::fallback("x").with_complexity_checked(99);
        assert_eq!(enriched.estimated_complexity, 10);
        let enriched = EnrichedRequest::fallback("x").with_complexity_checked(-5);
        assert_eq!(enriched.estimated_complexity, 1);
    }
}
