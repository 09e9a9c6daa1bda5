//! Prompt rendering and completion decoding for the sarvam-m chat format.
//!
//! ```text
//! BOS
//! [SYSTEM_PROMPT]...[/SYSTEM_PROMPT]
//! [INST]user_1[/INST]assistant_1 EOS
//! [INST]user_2[/INST]assistant_2 EOS
//! ...
//! [INST]last_user[/INST]<think>\n      <- generation continues here
//! ```
//!
//! Both directions share [`split_reasoning`], so a reply decoded here and
//! appended to the history renders back into the same reasoning block.

use sarvam_kernel_protocol::{DecodedCompletion, Role, Turn};
use thiserror::Error;

mod decode;
mod encode;
mod split;

pub use decode::decode_completion;
pub use encode::render_prompt;
pub use split::{split_reasoning, ReasoningSplit};

pub const SYSTEM_OPEN: &str = "[SYSTEM_PROMPT]";
pub const SYSTEM_CLOSE: &str = "[/SYSTEM_PROMPT]";
pub const USER_OPEN: &str = "[INST]";
pub const USER_CLOSE: &str = "[/INST]";
/// Opening reasoning tag as emitted. Splitting matches [`THINK_OPEN_MARKER`].
pub const THINK_OPEN: &str = "<think>\n";
pub const THINK_OPEN_MARKER: &str = "<think>";
pub const THINK_CLOSE: &str = "</think>";

pub const DEFAULT_THINK_SYSTEM_MESSAGE: &str = "You are a helpful assistant. Think deeply before answering the user's question. Do the thinking inside <think>...</think> tags.";
pub const DEFAULT_PLAIN_SYSTEM_MESSAGE: &str = "You are a helpful assistant.";
pub const THINK_SYSTEM_MESSAGE_ADDITION: &str =
    "Think deeply before answering the user's question. Do the thinking inside <think>...</think> tags.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error(
        "user and assistant turns must alternate starting with a user turn; found {role} at loop index {index}"
    )]
    Alternation { index: usize, role: Role },
    #[error("system turn can only be the first turn; found one at loop index {index}")]
    MisplacedSystem { index: usize },
    #[error(
        "only user, system and assistant roles are supported; got {role:?} at loop index {index}"
    )]
    UnsupportedRole { index: usize, role: String },
}

/// The fixed template bound to a tokenizer's special tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTemplate {
    pub bos_token: String,
    pub eos_token: String,
    pub thinking_enabled: bool,
}

impl Default for ChatTemplate {
    fn default() -> Self {
        Self {
            bos_token: String::new(),
            eos_token: String::new(),
            thinking_enabled: true,
        }
    }
}

impl ChatTemplate {
    pub fn new(bos_token: impl Into<String>, eos_token: impl Into<String>) -> Self {
        Self {
            bos_token: bos_token.into(),
            eos_token: eos_token.into(),
            thinking_enabled: true,
        }
    }

    pub fn with_thinking(mut self, thinking_enabled: bool) -> Self {
        self.thinking_enabled = thinking_enabled;
        self
    }

    pub fn render(&self, turns: &[Turn]) -> Result<String, TemplateError> {
        render_prompt(
            turns,
            &self.bos_token,
            &self.eos_token,
            self.thinking_enabled,
        )
    }

    pub fn decode(&self, raw: &str) -> DecodedCompletion {
        decode_completion(raw, &self.eos_token)
    }
}
