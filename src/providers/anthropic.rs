use async_trait::async_trait;
use log::{debug, error};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::app_config::ProviderConfig;
use crate::errors::ProviderError;
use crate::translation::{TranslationRequest, TranslationResult};

use super::{
    backoff_delay, backoff_sleep, endpoint_for, error_for_status, send_cancellable, ModelInfo, PromptParts,
    ProviderDescriptor, TranslationProvider,
};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic client for interacting with Anthropic API
pub struct Anthropic {
    /// Name the client is registered under
    name: String,
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// API endpoint URL without the `/v1` suffix
    endpoint: String,
    max_retries: u32,
    backoff_base_ms: u64,
    temperature: f32,
    max_tokens: u32,
    system_prompt: String,
}

impl std::fmt::Debug for Anthropic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Anthropic")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Anthropic message request
#[derive(Debug, Serialize)]
pub struct AnthropicRequest {
    /// The model to use
    model: String,

    /// The messages for the conversation
    messages: Vec<AnthropicMessage>,

    /// System prompt to guide the AI
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,

    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    /// Maximum number of tokens to generate
    max_tokens: u32,
}

/// Anthropic message format
#[derive(Debug, Serialize, Deserialize)]
pub struct AnthropicMessage {
    /// Role of the message sender (user, assistant)
    pub role: String,

    /// Content of the message
    pub content: String,
}

/// Anthropic response
#[derive(Debug, Deserialize)]
pub struct AnthropicResponse {
    /// The content of the response
    pub content: Vec<AnthropicContent>,
}

/// Individual content block in an Anthropic response
#[derive(Debug, Deserialize)]
pub struct AnthropicContent {
    /// The type of content
    #[serde(rename = "type")]
    pub content_type: String,

    /// The actual text content
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
    #[serde(default)]
    display_name: Option<String>,
}

impl AnthropicRequest {
    /// Create a new Anthropic request
    pub fn new(model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            system: None,
            temperature: None,
            max_tokens,
        }
    }

    /// Add a message to the request
    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(AnthropicMessage {
            role: role.into(),
            content: content.into(),
        });
        self
    }

    /// Set the system prompt
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

impl Anthropic {
    /// Create a new Anthropic client from its configuration
    pub fn from_config(name: impl Into<String>, config: &ProviderConfig, system_prompt: &str) -> Self {
        Self {
            name: name.into(),
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
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

    fn with_headers(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Content-Type", "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
    }

    /// Complete a messages request, retrying transient failures
    pub async fn complete(
        &self,
        endpoint: &str,
        request: &AnthropicRequest,
        cancel: &CancellationToken,
    ) -> Result<AnthropicResponse, ProviderError> {
        let api_url = format!("{}/v1/messages", endpoint);

        let mut attempt = 0;
        loop {
            let builder = self.with_headers(self.client.post(&api_url)).json(request);
            let result = match send_cancellable(builder, cancel).await {
                Ok(response) => match error_for_status(response).await {
                    Ok(response) => response.json::<AnthropicResponse>().await.map_err(ProviderError::from),
                    Err(e) => Err(e),
                },
                Err(e) => Err(e),
            };

            match result {
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    error!("Anthropic API error: {} - attempt {}/{}", e, attempt, self.max_retries + 1);
                    backoff_sleep(backoff_delay(self.backoff_base_ms, attempt), cancel).await?;
                }
                other => return other,
            }
        }
    }

    /// Extract text from Anthropic response
    pub fn extract_text_from_response(response: &AnthropicResponse) -> String {
        response
            .content
            .iter()
            .filter(|c| c.content_type == "text")
            .map(|c| c.text.as_str())
            .collect()
    }
}

#[async_trait]
impl TranslationProvider for Anthropic {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> ProviderDescriptor {
        ProviderDescriptor {
            name: self.name.clone(),
            kind: "anthropic".to_string(),
            endpoint: Some(self.endpoint.clone()),
        }
    }

    async fn list_models(&self, cancel: &CancellationToken) -> Result<Vec<ModelInfo>, ProviderError> {
        let url = format!("{}/v1/models", self.endpoint);
        let response = send_cancellable(self.with_headers(self.client.get(&url)), cancel).await?;
        let list = error_for_status(response).await?.json::<ModelList>().await?;
        Ok(list
            .data
            .into_iter()
            .map(|m| ModelInfo {
                id: m.id,
                display_name: m.display_name,
            })
            .collect())
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
        let body = AnthropicRequest::new(model.clone(), self.max_tokens)
            .system(prompts.system)
            .temperature(self.temperature)
            .add_message("user", prompts.user);

        let endpoint = endpoint_for(&self.endpoint, request);
        debug!("Sending Anthropic messages request to {} with model {}", endpoint, model);
        let response = self.complete(endpoint, &body, cancel).await?;

        let text = Self::extract_text_from_response(&response);
        let text = text.trim();
        if text.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(TranslationResult::new(text, self.name.clone()).with_model(model))
    }
}
