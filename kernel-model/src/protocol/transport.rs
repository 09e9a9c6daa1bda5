use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;

use crate::ModelError;

pub(crate) async fn send_completions_http(
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    payload: &Value,
    timeout: Duration,
) -> Result<Vec<u8>, ModelError> {
    let endpoint = format!("{}/v1/completions", base_url.trim_end_matches('/'));
    let response = client
        .post(endpoint)
        .header(CONTENT_TYPE, "application/json")
        .header(ACCEPT, "application/json")
        .bearer_auth(api_key)
        .timeout(timeout)
        .json(payload)
        .send()
        .await
        .map_err(map_request_error)?;

    let status = response.status();
    let body = response.bytes().await.map_err(map_request_error)?;
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ModelError::RateLimited {
            body: String::from_utf8_lossy(&body).to_string(),
        });
    }
    if !status.is_success() {
        return Err(ModelError::HttpStatus {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&body).to_string(),
        });
    }

    Ok(body.to_vec())
}

fn map_request_error(error: reqwest::Error) -> ModelError {
    if error.is_timeout() {
        ModelError::Timeout
    } else {
        ModelError::Request(error)
    }
}
