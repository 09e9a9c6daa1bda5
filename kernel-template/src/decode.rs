use sarvam_kernel_protocol::DecodedCompletion;
use tracing::trace;

use crate::split::split_reasoning;

/// Splits a raw completion into its visible answer and reasoning.
///
/// A trailing `eos_token` is removed from the visible part together with any
/// whitespace before it. An empty `eos_token` disables the strip.
pub fn decode_completion(raw: &str, eos_token: &str) -> DecodedCompletion {
    let split = split_reasoning(raw);

    let mut visible = split.visible;
    if !eos_token.is_empty() {
        if let Some(stripped) = visible.strip_suffix(eos_token) {
            visible = stripped.trim_end();
        }
    }

    trace!(
        raw_chars = raw.len(),
        visible_chars = visible.len(),
        reasoning_chars = split.reasoning.len(),
        "decoded completion"
    );
    DecodedCompletion {
        visible: visible.to_string(),
        reasoning: split.reasoning.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_eos_token_is_a_no_op() {
        let decoded = decode_completion("hello", "");
        assert_eq!(decoded.visible, "hello");
        assert_eq!(decoded.reasoning, "");

        let decoded = decode_completion("hello  ", "");
        assert_eq!(decoded.visible, "hello  ");
    }

    #[test]
    fn strips_trailing_eos_and_whitespace() {
        let decoded = decode_completion("thought</think>\n\nanswer \n</s>", "</s>");
        assert_eq!(decoded.visible, "answer");
        assert_eq!(decoded.reasoning, "thought");
    }

    #[test]
    fn eos_in_the_middle_is_kept() {
        let decoded = decode_completion("a</s>b", "</s>");
        assert_eq!(decoded.visible, "a</s>b");
    }

    #[test]
    fn completion_without_reasoning_is_visible_only() {
        let decoded = decode_completion("just the answer</s>", "</s>");
        assert_eq!(decoded.visible, "just the answer");
        assert_eq!(decoded.reasoning, "");
    }

    #[test]
    fn unterminated_reasoning_is_left_visible() {
        let decoded = decode_completion("<think>\nhalf a thought", "</s>");
        assert_eq!(decoded.visible, "<think>\nhalf a thought");
        assert_eq!(decoded.reasoning, "");
    }

    #[test]
    fn repeated_blocks_use_the_last_pair() {
        let decoded = decode_completion("<think>\nA</think>\n<think>\nB</think>\nC<EOS>", "<EOS>");
        assert_eq!(decoded.reasoning, "B");
        assert_eq!(decoded.visible, "C");
    }
}
