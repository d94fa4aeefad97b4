use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
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

/// Ollama client for interacting with Ollama API
pub struct Ollama {
    /// Name the client is registered under
    name: String,
    /// Base URL of the Ollama API
    base_url: String,
    /// HTTP client for making requests
    client: Client,
    /// Maximum number of retry attempts
    max_retries: u32,
    /// Base backoff time in milliseconds for exponential backoff
    backoff_base_ms: u64,
    /// Sampling temperature
    temperature: f32,
    /// System prompt template
    system_prompt: String,
}

impl std::fmt::Debug for Ollama {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ollama")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Generate request for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model name to use for generation
    model: String,
    /// Prompt to generate from
    prompt: String,
    /// System message to guide the model
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// Whether to stream the response
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// Generation options for the Ollama API
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Temperature for generation (default: 0.8)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<i32>,
}

/// Generate response from the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Model name
    pub model: String,
    /// Generated text
    pub response: String,
    /// Whether the generation is complete
    #[serde(default)]
    pub done: bool,
    /// Number of prompt tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,
    /// Number of generated tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
}

/// Installed models listed by `/api/tags`
#[derive(Debug, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<ModelTag>,
}

/// One installed model
#[derive(Debug, Deserialize)]
pub struct ModelTag {
    pub name: String,
    #[serde(default)]
    pub model: Option<String>,
}

/// Builder methods for GenerationRequest
impl GenerationRequest {
    /// Create a new generation request
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            options: None,
            stream: Some(false),
        }
    }

    /// Set the system prompt
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options.get_or_insert_with(GenerationOptions::default).temperature = Some(temperature);
        self
    }
}

impl Ollama {
    /// Create a new Ollama client with configuration
    ///
    /// Uses connection pooling for better performance with concurrent requests.
    /// Note: Ollama typically uses HTTP/1.1, so we don't force HTTP/2.
    pub fn from_config(name: impl Into<String>, config: &ProviderConfig, system_prompt: &str) -> Self {
        Self {
            name: name.into(),
            base_url: config.effective_endpoint().trim_end_matches('/').to_string(),
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                // Force HTTP/1.1 - Ollama uses HTTP/1.1
                .http1_only()
                .pool_idle_timeout(Duration::from_secs(90))
                .tcp_keepalive(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            max_retries: config.retry_count,
            backoff_base_ms: config.retry_backoff_ms,
            temperature: config.temperature,
            system_prompt: system_prompt.to_string(),
        }
    }

    /// Generate text from the Ollama API with retry logic
    pub async fn generate(
        &self,
        base_url: &str,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerationResponse, ProviderError> {
        let url = format!("{}/api/generate", base_url);

        let mut attempt = 0;
        loop {
            let result = match send_cancellable(self.client.post(&url).json(request), cancel).await {
                Ok(response) => match error_for_status(response).await {
                    Ok(response) => {
                        let body = response.text().await.map_err(ProviderError::from)?;
                        parse_generation_response(&body)
                    }
                    Err(e) => Err(e),
                },
                Err(e) => Err(e),
            };

            match result {
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    error!(
                        "Ollama API error: {} - attempt {}/{}",
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

    /// List installed models
    pub async fn tags(&self, base_url: &str, cancel: &CancellationToken) -> Result<TagsResponse, ProviderError> {
        let url = format!("{}/api/tags", base_url);
        let response = send_cancellable(self.client.get(&url), cancel).await?;
        let response = error_for_status(response).await?;
        response.json::<TagsResponse>().await.map_err(ProviderError::from)
    }
}

/// Parse a generate response, accepting streamed JSONL bodies
fn parse_generation_response(body: &str) -> Result<GenerationResponse, ProviderError> {
    match serde_json::from_str::<GenerationResponse>(body) {
        Ok(response) => Ok(response),
        Err(e) => {
            error!(
                "Failed to parse Ollama API response: {}. Raw response (first 500 chars): {}",
                e,
                body.chars().take(500).collect::<String>()
            );

            // The response might be in JSONL format (streaming response)
            let mut parts = Vec::new();
            let mut model = None;
            for line in body.lines().filter(|l| !l.trim().is_empty()) {
                let value: serde_json::Value = serde_json::from_str(line)
                    .map_err(|_| ProviderError::ParseError(format!("Response contains invalid JSON: {}", e)))?;
                if let Some(part) = value.get("response").and_then(|v| v.as_str()) {
                    parts.push(part.to_string());
                }
                if model.is_none() {
                    model = value.get("model").and_then(|v| v.as_str()).map(str::to_string);
                }
            }

            if parts.is_empty() {
                return Err(ProviderError::ParseError(e.to_string()));
            }
            Ok(GenerationResponse {
                model: model.unwrap_or_else(|| "unknown".to_string()),
                response: parts.concat(),
                done: true,
                prompt_eval_count: None,
                eval_count: None,
            })
        }
    }
}

#[async_trait]
impl TranslationProvider for Ollama {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> ProviderDescriptor {
        ProviderDescriptor {
            name: self.name.clone(),
            kind: "ollama".to_string(),
            endpoint: Some(self.base_url.clone()),
        }
    }

    async fn list_models(&self, cancel: &CancellationToken) -> Result<Vec<ModelInfo>, ProviderError> {
        let tags = self.tags(&self.base_url, cancel).await?;
        Ok(tags
            .models
            .into_iter()
            .map(|tag| ModelInfo {
                display_name: tag.model.filter(|m| *m != tag.name),
                id: tag.name,
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
        let generation = GenerationRequest::new(model.clone(), prompts.user)
            .system(prompts.system)
            .temperature(self.temperature);

        let base_url = endpoint_for(&self.base_url, request);
        debug!("Sending Ollama generate request to {} with model {}", base_url, model);
        let response = self.generate(base_url, &generation, cancel).await?;

        let text = response.response.trim();
        if text.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(TranslationResult::new(text, self.name.clone()).with_model(model))
    }
}
