use sarvam_kernel_protocol::{Role, Turn};
use tracing::trace;

use crate::split::split_reasoning;
use crate::{
    TemplateError, DEFAULT_PLAIN_SYSTEM_MESSAGE, DEFAULT_THINK_SYSTEM_MESSAGE, SYSTEM_CLOSE,
    SYSTEM_OPEN, THINK_CLOSE, THINK_OPEN, THINK_SYSTEM_MESSAGE_ADDITION, USER_CLOSE, USER_OPEN,
};

/// Renders `turns` into the flat prompt the model consumes.
///
/// A leading system turn replaces the default system message; every other
/// turn must alternate user/assistant starting with user. When the last turn
/// is a user turn and thinking is enabled, the prompt ends with an open
/// `<think>` tag so generation starts inside the reasoning block.
pub fn render_prompt(
    turns: &[Turn],
    bos_token: &str,
    eos_token: &str,
    thinking_enabled: bool,
) -> Result<String, TemplateError> {
    let (system_message, loop_turns) = match turns.split_first() {
        Some((first, rest)) if first.role == Role::System => {
            let message = if thinking_enabled {
                format!("{THINK_SYSTEM_MESSAGE_ADDITION}\n\n{}", first.content)
            } else {
                first.content.clone()
            };
            (message, rest)
        }
        _ => {
            let message = if thinking_enabled {
                DEFAULT_THINK_SYSTEM_MESSAGE
            } else {
                DEFAULT_PLAIN_SYSTEM_MESSAGE
            };
            (message.to_string(), turns)
        }
    };

    let mut prompt = String::new();
    prompt.push_str(bos_token);
    prompt.push_str(SYSTEM_OPEN);
    prompt.push_str(&system_message);
    prompt.push_str(SYSTEM_CLOSE);

    let last_index = loop_turns.len().saturating_sub(1);
    for (index, turn) in loop_turns.iter().enumerate() {
        let is_last = index == last_index;
        match &turn.role {
            Role::User => {
                if index % 2 == 1 {
                    return Err(TemplateError::Alternation {
                        index,
                        role: Role::User,
                    });
                }
                push_user_turn(&mut prompt, &turn.content, is_last && thinking_enabled);
            }
            Role::Assistant => {
                if index % 2 == 0 {
                    return Err(TemplateError::Alternation {
                        index,
                        role: Role::Assistant,
                    });
                }
                push_assistant_turn(&mut prompt, turn, eos_token, is_last && thinking_enabled);
            }
            Role::System => return Err(TemplateError::MisplacedSystem { index }),
            Role::Other(name) => {
                return Err(TemplateError::UnsupportedRole {
                    index,
                    role: name.clone(),
                })
            }
        }
    }

    trace!(
        turns = turns.len(),
        thinking_enabled,
        prompt_chars = prompt.len(),
        "rendered prompt"
    );
    Ok(prompt)
}

fn push_user_turn(prompt: &mut String, content: &str, open_reasoning: bool) {
    prompt.push_str(USER_OPEN);
    prompt.push_str(content);
    prompt.push_str(USER_CLOSE);
    if open_reasoning {
        prompt.push_str(THINK_OPEN);
    }
}

fn push_assistant_turn(prompt: &mut String, turn: &Turn, eos_token: &str, rematerialize: bool) {
    if rematerialize {
        let (visible, reasoning) = match turn.explicit_reasoning() {
            Some(reasoning) => (turn.content.as_str(), reasoning),
            None => {
                let split = split_reasoning(&turn.content);
                (split.visible, split.reasoning)
            }
        };
        if !reasoning.is_empty() {
            prompt.push_str(THINK_OPEN);
            prompt.push_str(reasoning.trim_matches('\n'));
            prompt.push('\n');
            prompt.push_str(THINK_CLOSE);
            prompt.push_str("\n\n");
            prompt.push_str(visible.trim_start_matches('\n'));
            prompt.push_str(eos_token);
            return;
        }
    }

    // History keeps its recorded form, inline tags included.
    prompt.push_str(&turn.content);
    prompt.push_str(eos_token);
}
