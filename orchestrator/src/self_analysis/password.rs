//! Password normalization and constant-time comparison for dev-mode intervention gating
//!
//! `spec.md` 9: "trim -> strip paired surrounding quotes -> lowercase;
//! compare to a constant-time-compared secret. Do not log the attempted
//! value except as a redacted length summary."

use tracing::debug;

fn strip_paired_quotes(text: &str) -> &str {
    let bytes = text.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return &text[1..text.len() - 1];
        }
    }
    text
}

pub fn normalize_password(raw: &str) -> String {
    strip_paired_quotes(raw.trim()).to_lowercase()
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Never logs the attempted password itself, only its redacted length.
pub fn verify_password(attempt: &str, expected: &str) -> bool {
    let normalized_attempt = normalize_password(attempt);
    let normalized_expected = normalize_password(expected);
    let matched = constant_time_eq(&normalized_attempt, &normalized_expected);
    debug!(attempt_len = normalized_attempt.len(), matched, "verify_password: called");
    matched
}
