//! Verifier - Stage 2.3b (`spec.md` 4.11)

use tracing::warn;

use crate::capture::ScreenCapture;
use crate::domain::{TodoItem, Verification, VerificationDecision, VerificationMethod, VisualEvidence};
use crate::keywords::{contains_any, has_success_wording};
use crate::vision::{CaptureMode, VisionModel, VisionQuery, VisionTier};
use mcpkit::McpRegistry;

/// What the item does next (`spec.md` 4.11 "next-action decision")
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextAction {
    Continue,
    Retry,
    Adjust,
}

/// `spec.md` 4.11: root-cause classifier output, consumed by the Replanner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootCause {
    MissingPrerequisite,
    PermissionIssue,
    WrongParameters,
    ToolExecutionFailed,
    TimingIssue,
    WrongApproach,
    UnrealisticCriteria,
    UnclearState,
    VisionModelFailure,
    ExecutionErrorVisible,
    ToolsSucceededButWrongResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskType {
    Numeric,
    FileOperation,
    UiVisual,
}

const NUMERIC_CUES: &[&str] = &["compute", "calculate", "sum", "total", "обчисли", "порахуй"];
const FILE_CUES: &[&str] = &["file", "folder", "directory", "файл", "папка"];

fn classify_task_type(action: &str) -> TaskType {
    if contains_any(action, NUMERIC_CUES) {
        TaskType::Numeric
    } else if contains_any(action, FILE_CUES) {
        TaskType::FileOperation
    } else {
        TaskType::UiVisual
    }
}

fn threshold_for(task_type: TaskType) -> u8 {
    match task_type {
        TaskType::Numeric => 60,
        TaskType::FileOperation => 50,
        TaskType::UiVisual => 50,
    }
}

enum Acceptance {
    Accept { confidence: u8, reason: String },
    Reject { reason: String, fallback_detected: bool },
}

/// `spec.md` 4.11: "if the text explicitly asserts 'does not match/equal' or
/// a displayed/expected token pair differs while the sentence claims a
/// match, reject." Detected with a lightweight token scan rather than a
/// full NLU pass.
fn detect_contradiction(reason: &str) -> bool {
    let lower = reason.to_lowercase();
    if lower.contains("does not match") || lower.contains("does not equal") || lower.contains("not equal to") {
        return true;
    }
    if let (Some(displayed), Some(expected)) = (word_after(&lower, "displayed"), word_after(&lower, "expected")) {
        return displayed != expected && lower.contains("match");
    }
    false
}

fn word_after<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    let idx = text.find(marker)?;
    text[idx + marker.len()..].split_whitespace().next()
}

/// `spec.md` 4.11: acceptance rules, applied in order
fn evaluate_acceptance(judgement: &crate::vision::VisionJudgement, task_type: TaskType) -> Acceptance {
    if !judgement.structured {
        return Acceptance::Reject { reason: "vision model returned an unstructured response".to_string(), fallback_detected: true };
    }

    const SUCCESS_WORDING_FLOOR: u8 = 40;
    if has_success_wording(&judgement.reason) && !detect_contradiction(&judgement.reason) && judgement.confidence >= SUCCESS_WORDING_FLOOR {
        return Acceptance::Accept { confidence: judgement.confidence, reason: judgement.reason.clone() };
    }

    if detect_contradiction(&judgement.reason) {
        return Acceptance::Reject { reason: format!("contradiction detected in: {}", judgement.reason), fallback_detected: false };
    }

    if judgement.confidence >= 80 {
        return Acceptance::Accept { confidence: judgement.confidence, reason: judgement.reason.clone() };
    }

    let threshold = threshold_for(task_type);
    if judgement.matches_criteria && judgement.confidence >= threshold {
        Acceptance::Accept { confidence: judgement.confidence, reason: judgement.reason.clone() }
    } else {
        Acceptance::Reject { reason: format!("confidence {} below the {} threshold for this task type", judgement.confidence, threshold), fallback_detected: false }
    }
}

const TRANSIENT_CUES: &[&str] = &["timeout", "network", "loading", "тайм-аут", "завантаж"];
const STRUCTURAL_CUES: &[&str] = &["not found", "invalid", "missing", "не знайдено"];

/// `spec.md` 4.11: next-action decision
fn decide_next_action(verified: bool, attempt: u32, max_attempts: u32, reason: &str, confidence: u8) -> NextAction {
    if verified {
        return NextAction::Continue;
    }
    if attempt >= max_attempts {
        return NextAction::Adjust;
    }
    if contains_any(reason, TRANSIENT_CUES) {
        return NextAction::Retry;
    }
    if contains_any(reason, STRUCTURAL_CUES) {
        return NextAction::Adjust;
    }
    if confidence < 50 {
        return NextAction::Adjust;
    }
    NextAction::Adjust
}

/// `spec.md` 4.11: root-cause classifier
fn classify_root_cause(reason: &str, fallback_detected: bool, mcp_checks_ran: bool, mcp_all_succeeded: bool) -> RootCause {
    let lower = reason.to_lowercase();
    if fallback_detected {
        return RootCause::VisionModelFailure;
    }
    if lower.contains("permission") || lower.contains("доступ") {
        return RootCause::PermissionIssue;
    }
    if lower.contains("not found") || lower.contains("missing") || lower.contains("не знайдено") {
        return RootCause::MissingPrerequisite;
    }
    if lower.contains("invalid") || lower.contains("parameter") {
        return RootCause::WrongParameters;
    }
    if lower.contains("timeout") || lower.contains("loading") || lower.contains("network") {
        return RootCause::TimingIssue;
    }
    if lower.contains("error") || lower.contains("exception") || lower.contains("помилка") {
        return RootCause::ExecutionErrorVisible;
    }
    if mcp_checks_ran && !mcp_all_succeeded {
        return RootCause::ToolExecutionFailed;
    }
    if mcp_checks_ran && mcp_all_succeeded {
        return RootCause::ToolsSucceededButWrongResult;
    }
    if lower.contains("unrealistic") || lower.contains("нереалістич") {
        return RootCause::UnrealisticCriteria;
    }
    if lower.is_empty() {
        return RootCause::UnclearState;
    }
    RootCause::WrongApproach
}

pub struct VerifierOutcome {
    pub verification: Verification,
    pub next_action: NextAction,
    pub root_cause: Option<RootCause>,
}

pub struct Verifier;

impl Verifier {
    /// `spec.md` 4.11: state machine start -> visual_1 -> visual_2 ->
    /// visual_3 -> mcp_fallback -> decided.
    pub async fn verify(
        item: &TodoItem,
        decision: &VerificationDecision,
        session_id: &str,
        capture: &dyn ScreenCapture,
        vision: &dyn VisionModel,
        registry: &McpRegistry,
    ) -> VerifierOutcome {
        let task_type = classify_task_type(&item.action);

        if decision.visual_possible {
            const ESCALATION: [(VisionTier, CaptureMode); 3] =
                [(VisionTier::Fast, CaptureMode::ActiveWindow), (VisionTier::Primary, CaptureMode::FullScreen), (VisionTier::Top, CaptureMode::DesktopOnly)];

            for (tier, mode) in ESCALATION {
                let Ok(screenshot_path) = capture.capture(session_id, mode).await else {
                    continue;
                };
                let query = VisionQuery { screenshot_path: screenshot_path.clone(), expectation: decision.verification_action.clone() };
                let Ok(judgement) = vision.judge(tier, query).await else {
                    continue;
                };

                match evaluate_acceptance(&judgement, task_type) {
                    Acceptance::Accept { confidence, reason } => {
                        let verification = Verification {
                            verified: true,
                            confidence,
                            reason: reason.clone(),
                            method: VerificationMethod::Visual,
                            visual_evidence: Some(VisualEvidence { observed: judgement.observed.clone(), matches_criteria: judgement.matches_criteria, details: judgement.reason.clone() }),
                            screenshot_path: Some(screenshot_path),
                            vision_model: Some(format!("{tier:?}")),
                            mcp_results: None,
                            tts_phrase: reason,
                            fallback_detected: false,
                            security_checks_passed: true,
                        };
                        return VerifierOutcome {
                            next_action: decide_next_action(true, item.attempt, item.max_attempts, &verification.reason, confidence),
                            verification,
                            root_cause: None,
                        };
                    }
                    Acceptance::Reject { reason, fallback_detected } => {
                        if fallback_detected {
                            warn!(id = %item.id, %reason, "Verifier::verify: rejecting unstructured vision response");
                        }
                    }
                }
            }
        }

        Self::mcp_fallback(item, decision, registry).await
    }

    async fn mcp_fallback(item: &TodoItem, decision: &VerificationDecision, registry: &McpRegistry) -> VerifierOutcome {
        let mut mcp_results = Vec::new();
        let mut all_succeeded = true;

        for check in &decision.additional_checks {
            let invocation = mcpkit::ToolInvocation { server: check.server.clone(), tool: check.tool.clone(), parameters: check.parameters.clone() };
            let result = registry.invoke(&invocation).await;
            all_succeeded &= result.success;
            mcp_results.push(result.data.unwrap_or(serde_json::Value::Null));
        }

        let checks_ran = !decision.additional_checks.is_empty();
        let verified = checks_ran && all_succeeded;
        let reason = if !checks_ran {
            "no data-path probe available for this action".to_string()
        } else if verified {
            "data-path checks confirmed the success criteria".to_string()
        } else {
            "one or more data-path checks failed".to_string()
        };
        let confidence: u8 = if verified { 85 } else { 30 };

        let verification = Verification {
            verified,
            confidence,
            reason: reason.clone(),
            method: VerificationMethod::Mcp,
            visual_evidence: None,
            screenshot_path: None,
            vision_model: None,
            mcp_results: Some(mcp_results),
            tts_phrase: reason.clone(),
            fallback_detected: false,
            security_checks_passed: true,
        };

        let root_cause = if verified { None } else { Some(classify_root_cause(&reason, false, checks_ran, all_succeeded)) };
        VerifierOutcome {
            next_action: decide_next_action(verified, item.attempt, item.max_attempts, &reason, confidence),
            verification,
            root_cause,
        }
    }
}
