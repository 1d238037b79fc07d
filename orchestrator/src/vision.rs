//! VisionModel - the out-of-scope external collaborator seam for visual verification
//!
//! Mirrors `llm::client::LlmClient`'s trait-plus-mock shape (`spec.md` 1
//! lists "the vision model gateway" as out of scope, specified only
//! through its interface).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use thiserror::Error;

/// Escalating model strength, weakest first (`spec.md` 4.11 escalation matrix)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisionTier {
    Fast,
    Primary,
    Top,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    ActiveWindow,
    FullScreen,
    DesktopOnly,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VisionQuery {
    pub screenshot_path: String,
    pub expectation: String,
}

/// A vision model's structured judgement of one screenshot. `structured`
/// is false when the model returned free text the parser could not fit
/// into this shape - that is the unstructured/fallback response Stage
/// 2.3b's acceptance rule 1 rejects outright.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VisionJudgement {
    pub structured: bool,
    pub matches_criteria: bool,
    pub confidence: u8,
    pub reason: String,
    pub observed: String,
}

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("vision model unavailable")]
    Unavailable,
    #[error("vision request timed out")]
    Timeout,
}

#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn judge(&self, tier: VisionTier, query: VisionQuery) -> Result<VisionJudgement, VisionError>;
}

pub struct MockVisionModel {
    responses: Mutex<Vec<Result<VisionJudgement, VisionError>>>,
}

impl MockVisionModel {
    pub fn new(responses: Vec<Result<VisionJudgement, VisionError>>) -> Self {
        Self { responses: Mutex::new(responses) }
    }
}

#[async_trait]
impl VisionModel for MockVisionModel {
    async fn judge(&self, _tier: VisionTier, _query: VisionQuery) -> Result<VisionJudgement, VisionError> {
        let mut responses = self.responses.lock().expect("mock vision responses poisoned");
        if responses.is_empty() {
            return Err(VisionError::Unavailable);
        }
        responses.remove(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_drains_scripted_judgements_in_order() {
        let model = MockVisionModel::new(vec![Ok(VisionJudgement {
            structured: true,
            matches_criteria: true,
            confidence: 90,
            reason: "folder present, matches expectation".into(),
            observed: "folder exists".into(),
        })]);
        let query = VisionQuery { screenshot_path: "/tmp/shot.png".into(), expectation: "folder exists".into() };
        let judgement = model.judge(VisionTier::Fast, query).await.unwrap();
        assert!(judgement.matches_criteria);
    }

    #[tokio::test]
    async fn mock_errors_as_unavailable_once_exhausted() {
        let model = MockVisionModel::new(vec![]);
        let query = VisionQuery { screenshot_path: "/tmp/shot.png".into(), expectation: "x".into() };
        let err = model.judge(VisionTier::Fast, query).await.unwrap_err();
        assert!(matches!(err, VisionError::Unavailable));
    }
}
