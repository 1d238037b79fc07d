//! Read-only prompt id -> {system, user template} lookup

mod embedded;
mod store;

pub use store::{PromptError, PromptStore, ResolvedPrompt};
