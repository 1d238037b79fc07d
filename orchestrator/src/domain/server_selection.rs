//! ServerSelection - Stage 2.0 output (`spec.md` 3/4.7)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSelection {
    /// At most 2 servers, unless `needs_split` is set
    pub selected_servers: Vec<String>,
    pub selected_prompts: Vec<String>,
    pub reasoning: String,
    pub confidence: f32,
    pub needs_split: bool,
    /// When `needs_split`, a suggested binary partition of the original suggestion
    pub suggested_partition: Option<(Vec<String>, Vec<String>)>,
}

impl ServerSelection {
    /// `spec.md` 8: "1 <= |selected_servers| <= 2 or needs_split == true"
    pub fn invariant_holds(&self) -> bool {
        if self.needs_split {
            true
        } else {
            (1..=2).contains(&self.selected_servers.len())
        }
    }

    pub fn adopted(servers: Vec<String>, confidence: f32) -> Self {
        let selected_prompts = servers.iter().map(|s| prompt_name_for(s)).collect();
        Self {
            selected_servers: servers,
            selected_prompts,
            reasoning: "adopted verbatim from planner selection".to_string(),
            confidence,
            needs_split: false,
            suggested_partition: None,
        }
    }

    pub fn split(suggested_partition: (Vec<String>, Vec<String>), reasoning: impl Into<String>) -> Self {
        Self {
            selected_servers: Vec::new(),
            selected_prompts: Vec::new(),
            reasoning: reasoning.into(),
            confidence: 0.0,
            needs_split: true,
            suggested_partition: Some(suggested_partition),
        }
    }
}

/// `TOOL_PLAN_<SERVERNAME_UPPER>` convention (`spec.md` 4.7 rule 3)
pub fn prompt_name_for(server: &str) -> String {
    format!("TOOL_PLAN_{}", server.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_holds_for_one_or_two_servers() {
        assert!(ServerSelection::adopted(vec!["filesystem".into()], 0.95).invariant_holds());
        assert!(ServerSelection::adopted(vec!["filesystem".into(), "shell".into()], 0.95).invariant_holds());
    }

    #[test]
    fn invariant_holds_when_split_regardless_of_count() {
        let selection = ServerSelection::split((vec!["filesystem".into()], vec!["shell".into(), "browser".into()]), "too many");
        assert!(selection.invariant_holds());
    }

    #[test]
    fn prompt_name_follows_convention() {
        assert_eq!(prompt_name_for("filesystem"), "TOOL_PLAN_FILESYSTEM");
    }
}
