//! Process-wide interning of instruction and prompt strings.

mod cache;

pub use cache::{Atom, PromptId, intern_prompt, prompt, prompt_count};
