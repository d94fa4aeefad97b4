use async_trait::async_trait;
use log::{debug, error};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::app_config::{ProviderConfig, ProviderKind};
use crate::errors::ProviderError;
use crate::translation::{TranslationRequest, TranslationResult};

use super::{
    backoff_delay, backoff_sleep, endpoint_for, error_for_status, send_cancellable, ModelInfo, PromptParts,
    ProviderDescriptor, TranslationProvider,
};

/// Client for OpenAI-compatible chat completion APIs (OpenAI, LM Studio)
pub struct OpenAI {
    name: String,
    kind: ProviderKind,
    client: Client,
    /// API key, empty for local servers
    api_key: String,
    /// Base URL including the `/v1` prefix
    endpoint: String,
    max_retries: u32,
    backoff_base_ms: u64,
    temperature: f32,
    max_tokens: u32,
    system_prompt: String,
}

impl std::fmt::Debug for OpenAI {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAI")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Chat completion request
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// One chat message
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

impl ChatCompletionRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Add a message to the request
    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage {
            role: role.into(),
            content: Some(content.into()),
        });
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

impl ChatCompletionResponse {
    /// Text of the first choice, if any
    pub fn first_text(&self) -> Option<&str> {
        self.choices.first().and_then(|c| c.message.content.as_deref())
    }
}

impl OpenAI {
    /// Create a new client from its configuration
    pub fn from_config(name: impl Into<String>, config: &ProviderConfig, system_prompt: &str) -> Self {
        Self {
            name: name.into(),
            kind: config.kind,
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .pool_idle_timeout(Duration::from_secs(90))
                .build()
                .unwrap_or_default(),
            api_key: config.api_key.clone(),
            endpoint: config.effective_endpoint().trim_end_matches('/').to_string(),
            max_retries: config.retry_count,
            backoff_base_ms: config.retry_backoff_ms,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            system_prompt: system_prompt.to_string(),
        }
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        if self.api_key.is_empty() {
            builder
        } else {
            builder.bearer_auth(&self.api_key)
        }
    }

    /// Send a chat completion request, retrying transient failures
    pub async fn complete(
        &self,
        endpoint: &str,
        request: &ChatCompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<ChatCompletionResponse, ProviderError> {
        let url = format!("{}/chat/completions", endpoint);

        let mut attempt = 0;
        loop {
            let builder = self.authorized(self.client.post(&url)).json(request);
            let result = match send_cancellable(builder, cancel).await {
                Ok(response) => match error_for_status(response).await {
                    Ok(response) => response.json::<ChatCompletionResponse>().await.map_err(ProviderError::from),
                    Err(e) => Err(e),
                },
                Err(e) => Err(e),
            };

            match result {
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    error!(
                        "{} API error: {} - attempt {}/{}",
                        self.kind.display_name(),
                        e,
                        attempt,
                        self.max_retries + 1
                    );
                    backoff_sleep(backoff_delay(self.backoff_base_ms, attempt), cancel).await?;
                }
                other => return other,
            }
        }
    }
}

#[async_trait]
impl TranslationProvider for OpenAI {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> ProviderDescriptor {
        ProviderDescriptor {
            name: self.name.clone(),
            kind: self.kind.to_lowercase_string(),
            endpoint: Some(self.endpoint.clone()),
        }
    }

    async fn list_models(&self, cancel: &CancellationToken) -> Result<Vec<ModelInfo>, ProviderError> {
        let url = format!("{}/models", self.endpoint);
        let response = send_cancellable(self.authorized(self.client.get(&url)), cancel).await?;
        let list = error_for_status(response).await?.json::<ModelList>().await?;
        Ok(list.data.into_iter().map(|m| ModelInfo::new(m.id)).collect())
    }

    async fn translate(
        &self,
        request: &TranslationRequest,
        cancel: &CancellationToken,
    ) -> Result<TranslationResult, ProviderError> {
        let model = request
            .model
            .clone()
            .ok_or_else(|| ProviderError::ModelNotFound("no model specified".to_string()))?;
        let prompts = PromptParts::for_request(&self.system_prompt, request);
        let body = ChatCompletionRequest::new(model.clone())
            .add_message("system", prompts.system)
            .add_message("user", prompts.user)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens);

        let endpoint = endpoint_for(&self.endpoint, request);
        debug!("Sending chat completion request to {} with model {}", endpoint, model);
        let response = self.complete(endpoint, &body, cancel).await?;

        let text = response.first_text().map(str::trim).unwrap_or_default();
        if text.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(TranslationResult::new(text, self.name.clone()).with_model(model))
    }
}
