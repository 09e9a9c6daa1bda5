use crate::{THINK_CLOSE, THINK_OPEN_MARKER};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReasoningSplit<'a> {
    /// Text after the last close tag, or the whole input when there is none.
    pub visible: &'a str,
    /// Text between the last open tag and the last close tag, or `""`.
    pub reasoning: &'a str,
}

/// Splits `text` into its visible answer and reasoning block.
///
/// Only a close tag makes a reasoning block: an unterminated `<think>` is
/// left in `visible`. The last `</think>` wins, and within the text before
/// it the last `<think>` wins; a missing open tag means the reasoning runs
/// from the start of the text (the prompt already carried the opener).
pub fn split_reasoning(text: &str) -> ReasoningSplit<'_> {
    let Some(close_at) = text.rfind(THINK_CLOSE) else {
        return ReasoningSplit {
            visible: text,
            reasoning: "",
        };
    };

    let visible = text[close_at + THINK_CLOSE.len()..].trim_start_matches('\n');
    let before = text[..close_at].trim_end_matches('\n');
    let reasoning = match before.rfind(THINK_OPEN_MARKER) {
        Some(open_at) => &before[open_at + THINK_OPEN_MARKER.len()..],
        None => before,
    }
    .trim_start_matches('\n');

    ReasoningSplit { visible, reasoning }
}
