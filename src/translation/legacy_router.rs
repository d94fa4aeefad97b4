/*!
 * Provider invocation with terminology and fallback to legacy translators.
 *
 * `LegacyTranslationRouter` owns the legacy translator chain and knows how to
 * call a provider safely: terminology metadata is attached when requested,
 * the call is bounded by the request timeout and the caller's cancellation
 * token, panics are caught, and every fault is classified. Provider failures
 * are retried once through the legacy chain when it is not empty.
 */

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use log::{debug, info, warn};
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use crate::app_config::{TranslationSettings, non_blank};
use crate::errors::{ProviderError, ProviderFailureKind, TranslationFailure};
use crate::legacy::{LegacyTranslator, LegacyTranslatorChain};
use crate::providers::TranslationProvider;
use crate::terminology::{
    TerminologyCache, TerminologyPack, TerminologyPrompt, TerminologyPromptBuilder, TerminologySource,
};

use super::models::{
    FallbackReason, FallbackStatus, PROFILE_KEY, RoutedTranslation, TERMINOLOGY_SOURCES_KEY, TranslationPipelineContext,
    TranslationRequest, TranslationResult, TranslationRouterRequest,
};

/// Cause type recorded for provider panics
const PANIC_CAUSE: &str = "panic";

/// Terminology prompt plus the sources it was built from
#[derive(Debug, Clone, PartialEq)]
pub struct TerminologyAttachment {
    pub prompt: TerminologyPrompt,
    pub sources: Vec<PathBuf>,
}

/// Invokes providers and the legacy translator chain
pub struct LegacyTranslationRouter {
    chain: LegacyTranslatorChain,
    settings: Arc<RwLock<TranslationSettings>>,
    terminology: Arc<TerminologyCache>,
    /// Provider bound at composition time for requests that do not ask for
    /// provider routing
    default_provider: Option<Arc<dyn TranslationProvider>>,
}

impl std::fmt::Debug for LegacyTranslationRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyTranslationRouter")
            .field("chain", &self.chain.names())
            .field("default_provider", &self.default_provider.as_ref().map(|p| p.name().to_string()))
            .finish()
    }
}

impl LegacyTranslationRouter {
    pub fn new(chain: LegacyTranslatorChain, settings: Arc<RwLock<TranslationSettings>>) -> Self {
        Self {
            chain,
            settings,
            terminology: Arc::new(TerminologyCache::new()),
            default_provider: None,
        }
    }

    /// Share a terminology cache with other routers
    pub fn with_terminology_cache(mut self, cache: Arc<TerminologyCache>) -> Self {
        self.terminology = cache;
        self
    }

    /// Bind the settings-level provider used when provider routing is off
    pub fn with_default_provider(mut self, provider: Arc<dyn TranslationProvider>) -> Self {
        self.default_provider = Some(provider);
        self
    }

    pub fn chain(&self) -> &LegacyTranslatorChain {
        &self.chain
    }

    pub fn has_legacy_translators(&self) -> bool {
        !self.chain.is_empty()
    }

    pub fn terminology_cache(&self) -> &Arc<TerminologyCache> {
        &self.terminology
    }

    /// Translate without provider routing.
    ///
    /// Uses the bound default provider when a model can be resolved for it,
    /// otherwise the legacy translator chain.
    pub async fn translate(
        &self,
        request: &TranslationRouterRequest,
        cancel: &CancellationToken,
    ) -> Result<RoutedTranslation, TranslationFailure> {
        if let Some(provider) = &self.default_provider {
            let model = non_blank(request.model_override.as_deref())
                .map(str::to_string)
                .or_else(|| self.settings.read().default_model());
            if let Some(model) = model {
                return self.translate_with_provider(provider, &model, request, cancel).await;
            }
            debug!(
                "Default provider '{}' has no model configured, using the legacy translator chain",
                provider.name()
            );
        }
        self.translate_with_legacy(request, cancel).await
    }

    /// Translate through a resolved provider, falling back to the legacy
    /// chain if the provider fails
    pub async fn translate_with_provider(
        &self,
        provider: &Arc<dyn TranslationProvider>,
        model: &str,
        request: &TranslationRouterRequest,
        cancel: &CancellationToken,
    ) -> Result<RoutedTranslation, TranslationFailure> {
        let provider_request = self.provider_request(model, request);

        let failure = match self.invoke_provider(provider.as_ref(), &provider_request, cancel).await {
            Ok(result) => {
                let mut routed = RoutedTranslation::from_provider(result);
                for (key, value) in &provider_request.metadata {
                    routed.metadata.entry(key.clone()).or_insert_with(|| value.clone());
                }
                return Ok(routed);
            }
            Err(failure) => failure,
        };

        if !failure.is_fallback_eligible() || !self.has_legacy_translators() {
            return Err(failure);
        }

        let kind = match &failure {
            TranslationFailure::Provider { kind, .. } => *kind,
            _ => ProviderFailureKind::Unknown,
        };
        warn!("{}; falling back to the legacy translator chain", failure);

        match self.translate_with_legacy(request, cancel).await {
            Ok(routed) => {
                let status = FallbackStatus::new(
                    FallbackReason::ProviderFailed {
                        provider: provider.name().to_string(),
                        kind,
                    },
                    routed.translated_by.clone(),
                );
                info!("{}", status);
                Ok(routed.with_fallback(status))
            }
            Err(TranslationFailure::LegacyTranslator { translator, message }) => {
                Err(TranslationFailure::LegacyTranslator {
                    translator,
                    message: format!("{} (after {})", message, failure),
                })
            }
            Err(other) => Err(other),
        }
    }

    /// Translate through the selected legacy translator
    pub async fn translate_with_legacy(
        &self,
        request: &TranslationRouterRequest,
        cancel: &CancellationToken,
    ) -> Result<RoutedTranslation, TranslationFailure> {
        if cancel.is_cancelled() {
            return Err(TranslationFailure::Cancelled);
        }

        let preferred = self.settings.read().translator_name.clone();
        let translator = self
            .chain
            .select(preferred.as_deref(), &request.source_language, &request.target_language)
            .ok_or_else(|| TranslationFailure::LegacyTranslator {
                translator: None,
                message: "no legacy translator is configured".to_string(),
            })?;

        let text = self.invoke_legacy(translator.as_ref(), request, cancel).await?;
        Ok(RoutedTranslation::from_legacy(text, translator.name()))
    }

    /// Load terminology for a context and build the prompt.
    ///
    /// Sources that fail to load are logged and skipped. Returns `None` when
    /// nothing usable was loaded.
    pub fn build_terminology(&self, context: &TranslationPipelineContext) -> Option<TerminologyAttachment> {
        let mut sources = Vec::new();
        let mut packs = Vec::new();
        for path in context.terminology_sources() {
            match self.terminology.load(path) {
                Ok(source) => {
                    packs.push(source.as_ref().clone().into_pack());
                    sources.push(path.clone());
                }
                Err(e) => warn!("Skipping terminology source {}: {}", path.display(), e),
            }
        }

        let mut tone_notes = Vec::new();
        let style_guide = context.style_guide_source().and_then(|path| match self.terminology.load(path) {
            Ok(source) => {
                sources.push(path.clone());
                Some(match source.as_ref() {
                    TerminologySource::StyleGuide(guide) => {
                        tone_notes = guide.tone_notes.clone();
                        guide.to_terminology_pack()
                    }
                    TerminologySource::Pack(pack) => pack.clone(),
                })
            }
            Err(e) => {
                warn!("Skipping style guide {}: {}", path.display(), e);
                None
            }
        });

        let terminology = (!packs.is_empty()).then(|| TerminologyPack::merge(&packs));
        let prompt =
            TerminologyPromptBuilder::build_with_tone_notes(terminology.as_ref(), style_guide.as_ref(), &tone_notes);
        if prompt.is_empty() {
            return None;
        }
        Some(TerminologyAttachment { prompt, sources })
    }

    fn provider_request(&self, model: &str, request: &TranslationRouterRequest) -> TranslationRequest {
        let mut provider_request =
            TranslationRequest::new(&request.text, &request.source_language, &request.target_language)
                .with_model(model);

        let base_url = non_blank(request.base_url_override.as_deref())
            .map(str::to_string)
            .or_else(|| non_blank(self.settings.read().base_url.as_deref()).map(str::to_string));
        provider_request.endpoint_override = base_url;

        let Some(context) = &request.context else {
            return provider_request;
        };
        provider_request.profile_id = context.profile_id.clone();
        provider_request.glossary_path = context
            .style_guide_source()
            .or_else(|| context.terminology_sources().next())
            .cloned();

        if request.wants_terminology() {
            if let Some(attachment) = self.build_terminology(context) {
                let sources: Vec<String> = attachment.sources.iter().map(|p| p.display().to_string()).collect();
                provider_request
                    .metadata
                    .insert(TERMINOLOGY_SOURCES_KEY.to_string(), sources.join(";"));
                if let Some(profile) = &context.profile_id {
                    provider_request.metadata.insert(PROFILE_KEY.to_string(), profile.clone());
                }
                provider_request.terminology = Some(attachment.prompt);
            }
        }
        provider_request
    }

    /// Call a provider, bounded by the request timeout and cancellation
    async fn invoke_provider(
        &self,
        provider: &dyn TranslationProvider,
        request: &TranslationRequest,
        cancel: &CancellationToken,
    ) -> Result<TranslationResult, TranslationFailure> {
        let name = provider.name();
        let timeout = self.request_timeout();
        let call = AssertUnwindSafe(provider.translate(request, cancel)).catch_unwind();

        let outcome = tokio::select! {
            _ = cancel.cancelled() => return Err(TranslationFailure::Cancelled),
            outcome = tokio::time::timeout(timeout, call) => outcome,
        };

        match outcome {
            Err(_) => Err(TranslationFailure::from_provider_error(
                name,
                &ProviderError::Timeout(format!("no response within {} seconds", timeout.as_secs())),
            )),
            Ok(Err(panic)) => Err(TranslationFailure::Provider {
                provider: name.to_string(),
                kind: ProviderFailureKind::Unknown,
                message: format!("Provider panicked: {}", panic_message(panic.as_ref())),
                cause_type: Some(PANIC_CAUSE.to_string()),
            }),
            Ok(Ok(Err(_))) if cancel.is_cancelled() => Err(TranslationFailure::Cancelled),
            Ok(Ok(Err(error))) => Err(TranslationFailure::from_provider_error(name, &error)),
            Ok(Ok(Ok(result))) if result.translated_text.trim().is_empty() => Err(
                TranslationFailure::from_provider_error(name, &ProviderError::EmptyResponse),
            ),
            Ok(Ok(Ok(result))) => Ok(result),
        }
    }

    /// Call a legacy translator, bounded by the request timeout and cancellation
    async fn invoke_legacy(
        &self,
        translator: &dyn LegacyTranslator,
        request: &TranslationRouterRequest,
        cancel: &CancellationToken,
    ) -> Result<String, TranslationFailure> {
        let name = translator.name().to_string();
        let failure = |message: String| TranslationFailure::LegacyTranslator {
            translator: Some(name.clone()),
            message,
        };

        let timeout = self.request_timeout();
        let call = AssertUnwindSafe(translator.translate(
            &request.text,
            &request.target_language,
            &request.source_language,
            cancel,
        ))
        .catch_unwind();

        let outcome = tokio::select! {
            _ = cancel.cancelled() => return Err(TranslationFailure::Cancelled),
            outcome = tokio::time::timeout(timeout, call) => outcome,
        };

        match outcome {
            Err(_) => Err(failure(format!(
                "'{}' did not respond within {} seconds",
                name,
                timeout.as_secs()
            ))),
            Ok(Err(panic)) => Err(failure(format!("'{}' panicked: {}", name, panic_message(panic.as_ref())))),
            Ok(Ok(Err(ProviderError::Cancelled))) => Err(TranslationFailure::Cancelled),
            Ok(Ok(Err(error))) => Err(failure(format!("'{}' failed: {}", name, error))),
            Ok(Ok(Ok(text))) if text.trim().is_empty() => {
                Err(failure(format!("'{}' returned an empty translation", name)))
            }
            Ok(Ok(Ok(text))) => Ok(text),
        }
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.read().request_timeout_secs.max(1))
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
