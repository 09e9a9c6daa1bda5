use async_trait::async_trait;
use sarvam_kernel_config::LocalModelConfig;
use sarvam_kernel_core::ChatEngine;
use sarvam_kernel_protocol::{AssistantReply, Role, TokenUsage, Turn, UserTurnOptions};
use sarvam_kernel_template::{ChatTemplate, TemplateError};
use thiserror::Error;
use tracing::{debug, warn};

mod protocol;

use protocol::request::build_completions_request_payload;
use protocol::response::parse_completions_response;
use protocol::transport::send_completions_http;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("completions request timed out")]
    Timeout,
    #[error("completions api rate limited the request; body: {body}")]
    RateLimited { body: String },
    #[error("http request failed: {0}")]
    Request(reqwest::Error),
    #[error("completions api returned non-success status: {status}; body: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("invalid completions payload: {0}")]
    ParsePayload(#[from] serde_json::Error),
    #[error("completions api returned no choices")]
    EmptyChoices,
    #[error("completions choice has no text")]
    MissingCompletionText,
    #[error("conversation does not end on a user turn")]
    NoPendingUserTurn,
    #[error("failed to render prompt: {0}")]
    Template(#[from] TemplateError),
}

/// Raw text completion as returned by the model, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCompletion {
    pub text: String,
    pub usage: TokenUsage,
    pub finish_reason: Option<String>,
}

/// Chat engine backed by an OpenAI-compatible `/v1/completions` endpoint.
///
/// Conversations are rendered locally with the sarvam-m template and the
/// raw completion is decoded back into visible text and reasoning.
#[derive(Clone)]
pub struct CompletionsChatEngine {
    config: LocalModelConfig,
    client: reqwest::Client,
}

impl CompletionsChatEngine {
    pub fn new(config: LocalModelConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &LocalModelConfig {
        &self.config
    }

    pub fn template(&self, thinking_enabled: Option<bool>) -> ChatTemplate {
        ChatTemplate::new(self.config.bos_token.clone(), self.config.eos_token.clone())
            .with_thinking(thinking_enabled.unwrap_or(self.config.thinking_enabled))
    }

    pub async fn complete_prompt(&self, prompt: &str) -> Result<RawCompletion, ModelError> {
        let payload = build_completions_request_payload(
            &self.config.model,
            prompt,
            self.config.temperature,
            self.config.max_tokens,
        );
        debug!(
            model = %self.config.model,
            prompt_chars = prompt.len(),
            "sending completions request"
        );

        let body = send_completions_http(
            &self.client,
            &self.config.base_url,
            &self.config.api_key,
            &payload,
            self.config.request_timeout,
        )
        .await
        .inspect_err(|error| warn!(%error, "completions request failed"))?;

        let completion = parse_completions_response(&body)?;
        debug!(
            input_tokens = completion.usage.input_tokens,
            output_tokens = completion.usage.output_tokens,
            finish_reason = ?completion.finish_reason,
            "received completion"
        );
        Ok(completion)
    }

    /// Renders `turns`, asks the model to continue, and decodes the result.
    /// The usage counters are passed through untouched.
    pub async fn reply_to(
        &self,
        turns: &[Turn],
        options: &UserTurnOptions,
    ) -> Result<AssistantReply, ModelError> {
        if !turns.last().is_some_and(|turn| turn.role == Role::User) {
            return Err(ModelError::NoPendingUserTurn);
        }

        let template = self.template(options.thinking_enabled);
        let prompt = template.render(turns)?;
        let completion = self.complete_prompt(&prompt).await?;

        let decoded = template.decode(&completion.text);
        let mut reply = AssistantReply::from_decoded(decoded, completion.usage);
        reply.finish_reason = completion.finish_reason;
        Ok(reply)
    }
}

#[async_trait]
impl ChatEngine for CompletionsChatEngine {
    async fn reply(
        &self,
        turns: &[Turn],
        options: &UserTurnOptions,
    ) -> Result<AssistantReply, String> {
        self.reply_to(turns, options)
            .await
            .map_err(|err| err.to_string())
    }
}
