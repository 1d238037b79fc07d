//! Typed multilingual keyword tables
//!
//! `spec.md` 9: "carry the full multilingual vocabulary in data, not code" -
//! every lookup here is a flat table matched against a normalized
//! (lowercased) substring, never a branch per language.

/// `spec.md` 4.4: markers that signal dev/self-analysis intent
pub const DEV_MARKERS: &[&str] = &[
    "виправ себе", "self-analysis", "self analysis", "analyze yourself", "analyze your own", "проаналізуй себе", "fix yourself", "debug yourself",
];

/// `spec.md` 4.4: imperative action verbs across the languages the source
/// vocabulary covers, used as the task-mode keyword fallback
pub const ACTION_VERBS: &[&str] = &[
    "create", "make", "build", "run", "execute", "open", "delete", "remove", "install", "start", "stop", "compute", "calculate", "write", "read",
    "download", "upload", "move", "copy", "rename", "створи", "зроби", "запусти", "відкрий", "видали", "встанови", "обчисли", "напиши",
];

/// `spec.md` 4.11: success wording markers, checked without negation
pub const SUCCESS_MARKERS: &[&str] = &["matches", "done", "completed", "success", "виконано", "готово", "успішно", "збігається"];

/// `spec.md` 4.11: negation markers that void an otherwise-positive success marker
pub const NEGATION_MARKERS: &[&str] = &[
    "does not", "not completed", "not match", "doesn't", "didn't", "не відповідає", "не виконано", "не збігається",
];

/// `spec.md` 4.13: the fixed intervention-intent verb that, together with a
/// verified password, authorizes the dev->task handoff
pub const INTERVENTION_VERBS: &[&str] = &["виправ себе", "fix yourself", "apply the fix", "intervene", "застосуй виправлення"];

/// `spec.md` 4.9: action verbs that push dispatch toward sequential
/// step-by-step mode regardless of the write/read overlap heuristic
pub const SEARCH_SCRAPE_VERBS: &[&str] = &["search", "scrape", "crawl", "пошук", "знайди", "скрейп"];

pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

pub fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    let normalized = normalize(haystack);
    needles.iter().any(|needle| normalized.contains(needle))
}

pub fn is_dev_marker(text: &str) -> bool {
    contains_any(text, DEV_MARKERS)
}

pub fn is_action_verb(text: &str) -> bool {
    contains_any(text, ACTION_VERBS)
}

pub fn has_success_wording(text: &str) -> bool {
    contains_any(text, SUCCESS_MARKERS) && !contains_any(text, NEGATION_MARKERS)
}

pub fn is_intervention_request(text: &str) -> bool {
    contains_any(text, INTERVENTION_VERBS)
}

pub fn is_search_scrape_verb(text: &str) -> bool {
    contains_any(text, SEARCH_SCRAPE_VERBS)
}

/// `spec.md` 4.10: action-verb -> verification-verb transform table.
/// Entries are matched in order, first cue wins; unmatched falls through
/// to the generic phrase. `transform` is idempotent by construction: a
/// verification phrase never re-matches a creation cue.
const VERIFICATION_TRANSFORMS: &[(&str, &str)] = &[
    ("create folder", "verify existence of folder"),
    ("create directory", "verify existence of folder"),
    ("створи папку", "verify existence of folder"),
    ("create file", "verify existence of file"),
    ("write", "verify contents of"),
    ("delete", "verify removal of"),
    ("remove", "verify removal of"),
    ("compute", "verify the result"),
    ("calculate", "verify the result"),
    ("обчисли", "verify the result"),
    ("open", "verify that"),
    ("install", "verify installation of"),
];

pub fn transform_action_to_verification(action: &str) -> String {
    let normalized = normalize(action);
    if normalized.starts_with("verify") {
        return action.trim().to_string();
    }
    for (cue, verb) in VERIFICATION_TRANSFORMS {
        if let Some(pos) = normalized.find(cue) {
            let subject = normalized[pos + cue.len()..].trim();
            return if subject.is_empty() { verb.to_string() } else { format!("{verb} {subject}") };
        }
    }
    "verify the result".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dev_marker_detected_case_insensitively() {
        assert!(is_dev_marker("Виправ Себе"));
        assert!(!is_dev_marker("Привіт, як справи?"));
    }

    #[test]
    fn success_wording_rejects_negated_text() {
        assert!(has_success_wording("task completed successfully"));
        assert!(!has_success_wording("task does not match the criteria"));
    }

    #[test]
    fn transform_action_to_verification_known_cue() {
        assert_eq!(transform_action_to_verification("create folder /tmp/demo"), "verify existence of folder /tmp/demo");
    }

    #[test]
    fn transform_action_to_verification_unknown_falls_back() {
        assert_eq!(transform_action_to_verification("juggle three chainsaws"), "verify the result");
    }

    #[test]
    fn transform_action_to_verification_is_idempotent() {
        let once = transform_action_to_verification("compute the sum");
        let twice = transform_action_to_verification(&once);
        assert_eq!(once, twice);
    }
}
