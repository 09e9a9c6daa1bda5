use serde_json::{json, Value};

pub(crate) fn build_completions_request_payload(
    model: &str,
    prompt: &str,
    temperature: f64,
    max_tokens: u32,
) -> Value {
    json!({
        "model": model,
        "prompt": prompt,
        "temperature": temperature,
        "max_tokens": max_tokens,
        "stream": false,
    })
}
