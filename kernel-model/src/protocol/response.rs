use sarvam_kernel_protocol::TokenUsage;
use serde_json::Value;

use crate::{ModelError, RawCompletion};

pub(crate) fn parse_completions_response(body: &[u8]) -> Result<RawCompletion, ModelError> {
    let payload = serde_json::from_slice::<Value>(body).map_err(ModelError::from)?;
    parse_completions_payload(&payload)
}

pub(crate) fn parse_completions_payload(payload: &Value) -> Result<RawCompletion, ModelError> {
    let choice = payload
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .ok_or(ModelError::EmptyChoices)?;

    let text = choice
        .get("text")
        .and_then(Value::as_str)
        .ok_or(ModelError::MissingCompletionText)?
        .to_string();
    let finish_reason = choice
        .get("finish_reason")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(RawCompletion {
        text,
        usage: parse_usage(payload.get("usage")),
        finish_reason,
    })
}

fn parse_usage(raw: Option<&Value>) -> TokenUsage {
    let Some(usage) = raw else {
        return TokenUsage::default();
    };
    TokenUsage {
        input_tokens: parse_json_u64(usage.get("prompt_tokens")),
        output_tokens: parse_json_u64(usage.get("completion_tokens")),
    }
}

fn parse_json_u64(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(number)) => number.as_u64().unwrap_or(0),
        Some(Value::String(text)) => text.trim().parse::<u64>().unwrap_or(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_payload_reads_first_choice_and_usage() {
        let payload = json!({
            "id": "cmpl-1",
            "choices": [
                { "index": 0, "text": "thought</think>\n\nanswer</s>", "finish_reason": "stop" },
                { "index": 1, "text": "ignored" }
            ],
            "usage": { "prompt_tokens": 42, "completion_tokens": 9, "total_tokens": 51 }
        });

        let parsed = parse_completions_payload(&payload).expect("parse payload");
        assert_eq!(parsed.text, "thought</think>\n\nanswer</s>");
        assert_eq!(parsed.finish_reason.as_deref(), Some("stop"));
        assert_eq!(
            parsed.usage,
            TokenUsage {
                input_tokens: 42,
                output_tokens: 9
            }
        );
    }

    #[test]
    fn missing_usage_defaults_to_zero() {
        let parsed = parse_completions_payload(&json!({"choices":[{"text":"hi"}]}))
            .expect("parse payload");
        assert_eq!(parsed.usage, TokenUsage::default());
        assert_eq!(parsed.finish_reason, None);
    }

    #[test]
    fn empty_choices_is_an_error() {
        let err = parse_completions_payload(&json!({"choices": []})).expect_err("no choices");
        assert!(matches!(err, ModelError::EmptyChoices));

        let err = parse_completions_response(b"not json").expect_err("bad json");
        assert!(matches!(err, ModelError::ParsePayload(_)));
    }

    #[test]
    fn choice_without_text_is_an_error() {
        let err = parse_completions_payload(&json!({"choices":[{"finish_reason":"stop"}]}))
            .expect_err("missing text");
        assert!(matches!(err, ModelError::MissingCompletionText));

        let err = parse_completions_payload(&json!({"choices":[{"text": 42}]}))
            .expect_err("non-string text");
        assert!(matches!(err, ModelError::MissingCompletionText));
    }
}
