use crate::adapters::openai::api::{ChatRequest, ChatResponse, ResponseMessage};
use crate::config::toml_config::ModelEndpoint;
use crate::domain::ports::ChatBackend;
use crate::utils::error::{AgentError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Thin client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ChatClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    pub fn from_endpoint(endpoint: &ModelEndpoint) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(seconds) = endpoint.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(seconds));
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url: endpoint.base_url.clone(),
            api_key: endpoint.resolved_api_key(),
            model: endpoint.model.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatBackend for ChatClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse> {
        let url = self.completions_url();
        tracing::debug!(
            "POST {} (model: {}, messages: {}, tools: {})",
            url,
            request.model,
            request.messages.len(),
            request.tools.len()
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("Model response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::ModelStatusError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        if let Some(usage) = &parsed.usage {
            tracing::debug!(
                "Token usage: prompt={}, completion={}, total={}",
                usage.prompt_tokens,
                usage.completion_tokens,
                usage.total_tokens
            );
        }
        Ok(parsed)
    }
}

/// First choice of a completion.
pub fn first_message(response: ChatResponse) -> Result<ResponseMessage> {
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or_else(|| AgentError::ModelResponseError {
            message: "response contained no choices".to_string(),
        })
}

/// Text of the first choice; an empty or missing content is an error.
pub fn first_message_text(response: ChatResponse) -> Result<String> {
    first_message(response)?
        .content
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| AgentError::ModelResponseError {
            message: "response contained no text content".to_string(),
        })
}
