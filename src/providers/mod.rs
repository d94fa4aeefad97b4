/*!
 * Provider implementations for model-addressable translation backends.
 *
 * This module contains client implementations for various LLM providers:
 * - Ollama: Local LLM server
 * - OpenAI: OpenAI API integration, also used for LM Studio
 * - Anthropic: Anthropic API integration
 * - Mock: scripted provider for tests and demos
 *
 * Providers are looked up by name through the `ProviderRegistry`.
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::app_config::{ProviderConfig, ProviderKind};
use crate::errors::ProviderError;
use crate::language_utils::display_name_or_code;
use crate::translation::{TranslationRequest, TranslationResult};

pub use self::registry::ProviderRegistry;

/// A model offered by a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl ModelInfo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
        }
    }
}

/// Listable description of a registered provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Common trait for all translation providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be registered and resolved by name at runtime.
#[async_trait]
pub trait TranslationProvider: Send + Sync + Debug {
    /// Name the provider is registered under
    fn name(&self) -> &str;

    /// Descriptor shown when listing providers
    fn descriptor(&self) -> ProviderDescriptor {
        ProviderDescriptor {
            name: self.name().to_string(),
            kind: self.name().to_lowercase(),
            endpoint: None,
        }
    }

    /// List the models the provider offers
    async fn list_models(&self, cancel: &CancellationToken) -> Result<Vec<ModelInfo>, ProviderError>;

    /// Translate a single request
    ///
    /// # Returns
    /// * `Result<TranslationResult, ProviderError>` - The translation or a classified error
    async fn translate(
        &self,
        request: &TranslationRequest,
        cancel: &CancellationToken,
    ) -> Result<TranslationResult, ProviderError>;
}

/// System and user prompt text sent to an LLM provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptParts {
    pub system: String,
    pub user: String,
}

impl PromptParts {
    /// Compose prompts from a template and the request's terminology.
    ///
    /// The terminology system prompt is appended to the rendered template and
    /// the terminology user prompt precedes the source text.
    pub fn for_request(template: &str, request: &TranslationRequest) -> Self {
        let mut system = template
            .replace("{source_language}", &display_name_or_code(&request.source_language))
            .replace("{target_language}", &display_name_or_code(&request.target_language));
        if let Some(terminology) = request.terminology_system_prompt() {
            system.push_str("\n\n");
            system.push_str(terminology);
        }

        let user = match request.terminology_user_prompt() {
            Some(reminder) => format!("{}\n\n{}", reminder, request.text),
            None => request.text.clone(),
        };

        Self { system, user }
    }
}

/// Longest wait between two retries
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Exponential backoff for the given 1-based retry attempt, capped at `MAX_BACKOFF`
pub(crate) fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor)).min(MAX_BACKOFF)
}

/// Wait for a backoff delay unless the operation is cancelled first
pub(crate) async fn backoff_sleep(delay: Duration, cancel: &CancellationToken) -> Result<(), ProviderError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(ProviderError::Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}

/// Send an HTTP request unless the operation is cancelled first
pub(crate) async fn send_cancellable(
    builder: reqwest::RequestBuilder,
    cancel: &CancellationToken,
) -> Result<reqwest::Response, ProviderError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(ProviderError::Cancelled),
        response = builder.send() => response.map_err(ProviderError::from),
    }
}

/// Turn a non-success response into a classified error
pub(crate) async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to get error response text".to_string());
    Err(ProviderError::from_status(status.as_u16(), error_text))
}

/// Resolve the endpoint for a request, honouring its override
pub(crate) fn endpoint_for<'a>(configured: &'a str, request: &'a TranslationRequest) -> &'a str {
    request
        .endpoint_override
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .unwrap_or(configured)
        .trim_end_matches('/')
}

/// Create a provider client from its configuration
pub fn build_provider(config: &ProviderConfig, system_prompt: &str) -> Arc<dyn TranslationProvider> {
    let name = config.registration_name();
    match config.kind {
        ProviderKind::Ollama => Arc::new(ollama::Ollama::from_config(name, config, system_prompt)),
        ProviderKind::OpenAI | ProviderKind::LMStudio => {
            Arc::new(openai::OpenAI::from_config(name, config, system_prompt))
        }
        ProviderKind::Anthropic => Arc::new(anthropic::Anthropic::from_config(name, config, system_prompt)),
    }
}

pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod registry;
