//! VerificationDecision / Verification - Stages 2.3a/2.3b (`spec.md` 3/4.10/4.11)

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The path `VerificationRouter` recommends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationPath {
    Visual,
    Data,
    Hybrid,
}

/// One additional data-path check the router derives from the item's action vocabulary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdditionalCheck {
    pub server: String,
    pub tool: String,
    pub parameters: Value,
    pub expected_evidence: String,
}

/// Output of `VerificationRouter` (Stage 2.3a)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationDecision {
    pub visual_possible: bool,
    pub confidence: f32,
    pub reason: String,
    pub recommended_path: VerificationPath,
    pub additional_checks: Vec<AdditionalCheck>,
    pub allow_visual_fallback: bool,
    pub verification_action: String,
}

/// How a `Verification` was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationMethod {
    Visual,
    Mcp,
}

/// Structured evidence from a visual attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualEvidence {
    pub observed: String,
    pub matches_criteria: bool,
    pub details: String,
}

/// Verdict that a `TodoItem` met its success criteria (`spec.md` 3)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verification {
    pub verified: bool,
    /// 0-100
    pub confidence: u8,
    pub reason: String,
    pub method: VerificationMethod,
    pub visual_evidence: Option<VisualEvidence>,
    pub screenshot_path: Option<String>,
    pub vision_model: Option<String>,
    pub mcp_results: Option<Vec<Value>>,
    pub tts_phrase: String,
    /// Rule 1 of `spec.md` 4.11: the vision model returned an unstructured response
    pub fallback_detected: bool,
    /// Never surfaces a visual-fallback-through-as-verified result
    pub security_checks_passed: bool,
}

impl Verification {
    /// `spec.md` 8: for verified=true, either explicit non-negated success
    /// wording, or matches_criteria && confidence >= threshold
    pub fn invariant_holds(&self, threshold: u8) -> bool {
        if !self.verified {
            return true;
        }
        let explicit_success = !self.fallback_detected && contains_non_negated_success(&self.reason);
        let data_backed = self
            .visual_evidence
            .as_ref()
            .map(|e| e.matches_criteria && self.confidence >= threshold)
            .unwrap_or(self.confidence >= threshold);
        explicit_success || data_backed
    }
}

fn contains_non_negated_success(reason: &str) -> bool {
    let lower = reason.to_lowercase();
    let success_markers = ["matches", "done", "completed", "success"];
    let negation_markers = ["does not", "not completed", "not match", "doesn't", "didn't"];
    let has_success = success_markers.iter().any(|m| lower.contains(m));
    let has_negation = negation_markers.iter().any(|m| lower.contains(m));
    has_success && !has_negation
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(reason: &str, confidence: u8, verified: bool) -> Verification {
        Verification {
            verified,
            confidence,
            reason: reason.to_string(),
            method: VerificationMethod::Mcp,
            visual_evidence: None,
            screenshot_path: None,
            vision_model: None,
            mcp_results: None,
            tts_phrase: String::new(),
            fallback_detected: false,
            security_checks_passed: true,
        }
    }

    #[test]
    fn invariant_holds_for_explicit_success_wording() {
        let verification = base("Task completed successfully", 70, true);
        assert!(verification.invariant_holds(50));
    }

    #[test]
    fn invariant_fails_for_negated_success_wording_without_data_backing() {
        let verification = base("does not match the expected state", 90, true);
        assert!(!verification.invariant_holds(50));
    }

    #[test]
    fn invariant_holds_for_data_backed_verification() {
        let mut verification = base("file exists as expected", 60, true);
        verification.visual_evidence = Some(VisualEvidence {
            observed: "folder present".into(),
            matches_criteria: true,
            details: String::new(),
        });
        assert!(verification.invariant_holds(50));
    }

    #[test]
    fn unverified_always_satisfies_invariant() {
        let verification = base("could not tell", 10, false);
        assert!(verification.invariant_holds(50));
    }
}
