//! StageOutcome - the sum type every pipeline stage returns in place of
//! exceptions for control flow (`spec.md` 9 redesign note).

use serde::Serialize;

/// What a single pipeline stage produced
#[derive(Debug, Clone)]
pub enum StageOutcome<T> {
    /// The stage's prompt, parse, and validation all succeeded
    Ok(T),
    /// Parsing or validation failed but a keyword/heuristic fallback
    /// produced a usable partial result
    Fallback(T, String),
    /// The stage could not produce any usable result
    Fail(StageErrorKind, String),
}

impl<T> StageOutcome<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, StageOutcome::Ok(_))
    }

    pub fn into_output(self) -> Option<T> {
        match self {
            StageOutcome::Ok(value) | StageOutcome::Fallback(value, _) => Some(value),
            StageOutcome::Fail(_, _) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> StageOutcome<U> {
        match self {
            StageOutcome::Ok(value) => StageOutcome::Ok(f(value)),
            StageOutcome::Fallback(value, reason) => StageOutcome::Fallback(f(value), reason),
            StageOutcome::Fail(kind, detail) => StageOutcome::Fail(kind, detail),
        }
    }
}

/// `spec.md` 7: the full error-kind vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageErrorKind {
    RateLimited,
    Timeout,
    Transport,
    ModelUnavailable,
    BadResponse,
    ParseFailure,
    SchemaValidation,
    UnknownServer,
    UnknownTool,
    ToolExecution,
    VisionUnstructured,
    VerificationFailed,
    NeedsSplit,
    AuthRequired,
    Cancelled,
}

/// Metadata captured alongside a stage's outcome: timings, the model and
/// prompt used, and whether a fallback was invoked.
#[derive(Debug, Clone)]
pub struct StageMeta {
    pub stage_id: String,
    pub prompt_id: String,
    pub model_used: String,
    pub duration_ms: u64,
    pub fallback_used: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_and_fallback_both_unwrap_to_output() {
        let ok: StageOutcome<i32> = StageOutcome::Ok(1);
        let fallback: StageOutcome<i32> = StageOutcome::Fallback(2, "parser failed".into());
        assert_eq!(ok.into_output(), Some(1));
        assert_eq!(fallback.into_output(), Some(2));
    }

    #[test]
    fn fail_has_no_output() {
        let fail: StageOutcome<i32> = StageOutcome::Fail(StageErrorKind::ParseFailure, "no json found".into());
        assert_eq!(fail.into_output(), None);
    }

    #[test]
    fn map_preserves_variant() {
        let fallback: StageOutcome<i32> = StageOutcome::Fallback(2, "reason".into());
        let mapped = fallback.map(|v| v * 10);
        match mapped {
            StageOutcome::Fallback(value, reason) => {
                assert_eq!(value, 20);
                assert_eq!(reason, "reason");
            }
            _ => panic!("expected Fallback"),
        }
    }
}
