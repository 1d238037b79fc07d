//! Embedded prompt templates
//!
//! Compiled into the binary from `.pmt` files under `orchestrator/prompts/`
//! (grounded on the teacher's `td/src/prompts/embedded.rs` `include_str!`
//! pattern).

pub struct EmbeddedPrompt {
    pub id: &'static str,
    pub system: &'static str,
    pub user_template: &'static str,
}

macro_rules! embedded_prompt {
    ($id:literal, $system:literal, $user:literal) => {
        EmbeddedPrompt { id: $id, system: include_str!(concat!("../../prompts/", $system)), user_template: include_str!(concat!("../../prompts/", $user)) }
    };
}

pub const PROMPTS: &[EmbeddedPrompt] = &[
    embedded_prompt!("mode_selector", "mode_selector.system.pmt", "mode_selector.user.pmt"),
    embedded_prompt!("chat_reply", "chat_reply.system.pmt", "chat_reply.user.pmt"),
    embedded_prompt!("context_enricher", "context_enricher.system.pmt", "context_enricher.user.pmt"),
    embedded_prompt!("todo_planner", "todo_planner.system.pmt", "todo_planner.user.pmt"),
    embedded_prompt!("server_selector", "server_selector.system.pmt", "server_selector.user.pmt"),
    embedded_prompt!("tool_planner", "tool_planner.system.pmt", "tool_planner.user.pmt"),
    embedded_prompt!("verification_router", "verification_router.system.pmt", "verification_router.user.pmt"),
    embedded_prompt!("replanner", "replanner.system.pmt", "replanner.user.pmt"),
    embedded_prompt!("final_summarizer", "final_summarizer.system.pmt", "final_summarizer.user.pmt"),
    embedded_prompt!("self_analysis", "self_analysis.system.pmt", "self_analysis.user.pmt"),
];

pub fn get_embedded(id: &str) -> Option<&'static EmbeddedPrompt> {
    PROMPTS.iter().find(|p| p.id == id)
}
