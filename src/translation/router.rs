/*!
 * Entry point for all translation requests.
 *
 * `TranslationRouter` decides per request whether a provider is used. With
 * provider routing off the request goes straight to the legacy router and
 * the provider registry is never consulted. With routing on, the provider
 * and model are resolved from the request, its pipeline context, the
 * context's profile and finally the settings; a missing field is a
 * validation failure. An unregistered provider falls back to the legacy
 * chain with a status annotation naming it.
 */

use std::sync::Arc;

use log::{debug, warn};
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use crate::app_config::{TranslationSettings, non_blank};
use crate::errors::{MissingRouteField, TranslationFailure};
use crate::providers::ProviderRegistry;

use super::legacy_router::LegacyTranslationRouter;
use super::memory::{MemoryEntry, MemoryRoute, TranslationMemory};
use super::models::{FallbackReason, FallbackStatus, RoutedTranslation, TranslationRouterRequest};

/// Provider and model names resolved for a request
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedRoute {
    pub provider: Option<String>,
    pub model: Option<String>,
}

/// How a validated request will be translated
#[derive(Debug, Clone, PartialEq, Eq)]
enum RoutePlan {
    Legacy,
    Provider { provider: String, model: String },
}

impl RoutePlan {
    fn memory_route(&self) -> MemoryRoute {
        match self {
            Self::Legacy => MemoryRoute::Legacy,
            Self::Provider { provider, model } => MemoryRoute::provider(provider, model),
        }
    }
}

/// Routes translation requests to providers or the legacy chain
#[derive(Debug)]
pub struct TranslationRouter {
    registry: Arc<ProviderRegistry>,
    legacy: Arc<LegacyTranslationRouter>,
    settings: Arc<RwLock<TranslationSettings>>,
    memory: TranslationMemory,
}

impl TranslationRouter {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        legacy: Arc<LegacyTranslationRouter>,
        settings: Arc<RwLock<TranslationSettings>>,
    ) -> Self {
        Self {
            registry,
            legacy,
            settings,
            memory: TranslationMemory::new(),
        }
    }

    /// Use a shared translation memory
    pub fn with_memory(mut self, memory: TranslationMemory) -> Self {
        self.memory = memory;
        self
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    pub fn legacy(&self) -> &Arc<LegacyTranslationRouter> {
        &self.legacy
    }

    pub fn settings(&self) -> &Arc<RwLock<TranslationSettings>> {
        &self.settings
    }

    pub fn memory(&self) -> &TranslationMemory {
        &self.memory
    }

    /// Translate one request
    pub async fn translate(
        &self,
        request: &TranslationRouterRequest,
        cancel: &CancellationToken,
    ) -> Result<RoutedTranslation, TranslationFailure> {
        if cancel.is_cancelled() {
            return Err(TranslationFailure::Cancelled);
        }

        let plan = self.plan(request)?;
        let memory_route = plan.memory_route();
        let use_memory = self.uses_memory(request);
        if use_memory {
            if let Some(entry) = self.memory.get(
                &memory_route,
                &request.text,
                &request.source_language,
                &request.target_language,
            ) {
                return Ok(RoutedTranslation {
                    model: entry.model,
                    from_memory: true,
                    ..RoutedTranslation::from_legacy(entry.text, entry.translated_by)
                });
            }
        }

        let outcome = self.route(plan, request, cancel).await;

        if use_memory {
            if let Ok(routed) = &outcome {
                self.memory.store(
                    memory_route,
                    &request.text,
                    &request.source_language,
                    &request.target_language,
                    MemoryEntry {
                        text: routed.text.clone(),
                        translated_by: routed.translated_by.clone(),
                        model: routed.model.clone(),
                    },
                );
            }
        }
        outcome
    }

    /// Decide the routing mode, failing validation when provider routing
    /// is requested without a provider or model
    fn plan(&self, request: &TranslationRouterRequest) -> Result<RoutePlan, TranslationFailure> {
        if !request.use_provider_for_translation {
            return Ok(RoutePlan::Legacy);
        }
        let route = self.resolve_route(request);
        match (route.provider, route.model) {
            (Some(provider), Some(model)) => Ok(RoutePlan::Provider { provider, model }),
            (provider, model) => {
                let missing = MissingRouteField::from_presence(provider.is_some(), model.is_some())
                    .unwrap_or(MissingRouteField::ProviderAndModel);
                Err(TranslationFailure::RequestValidation { missing })
            }
        }
    }

    async fn route(
        &self,
        plan: RoutePlan,
        request: &TranslationRouterRequest,
        cancel: &CancellationToken,
    ) -> Result<RoutedTranslation, TranslationFailure> {
        let (provider_name, model) = match plan {
            RoutePlan::Legacy => return self.legacy.translate(request, cancel).await,
            RoutePlan::Provider { provider, model } => (provider, model),
        };

        let Some(provider) = self.registry.resolve(&provider_name) else {
            warn!(
                "Provider '{}' is not registered; translating with the legacy translator chain",
                provider_name
            );
            if !self.legacy.has_legacy_translators() {
                return Err(TranslationFailure::LegacyTranslator {
                    translator: None,
                    message: format!(
                        "provider '{}' is not registered and no legacy translator is configured",
                        provider_name
                    ),
                });
            }
            return self.legacy.translate_with_legacy(request, cancel).await.map(|routed| {
                let status = FallbackStatus::new(
                    FallbackReason::ProviderNotRegistered {
                        provider: provider_name.clone(),
                    },
                    routed.translated_by.clone(),
                );
                routed.with_fallback(status)
            });
        };

        debug!("Routing request to provider '{}' with model '{}'", provider.name(), model);
        self.legacy.translate_with_provider(&provider, &model, request, cancel).await
    }

    /// Resolve provider and model names for a request.
    ///
    /// Each field is taken from the first non-blank source: request
    /// override, pipeline context, the context's profile, then the active
    /// profile and settings.
    pub fn resolve_route(&self, request: &TranslationRouterRequest) -> ResolvedRoute {
        let settings = self.settings.read();
        let context = request.context.as_ref();
        let profile = context
            .and_then(|c| c.profile_id.as_deref())
            .and_then(|id| settings.profile(id));

        let provider = non_blank(request.provider_override.as_deref())
            .or_else(|| context.and_then(|c| non_blank(c.provider_id.as_deref())))
            .or_else(|| profile.and_then(|p| non_blank(p.provider.as_deref())))
            .map(str::to_string)
            .or_else(|| settings.default_provider());
        let model = non_blank(request.model_override.as_deref())
            .or_else(|| context.and_then(|c| non_blank(c.model_id.as_deref())))
            .or_else(|| profile.and_then(|p| non_blank(p.model.as_deref())))
            .map(str::to_string)
            .or_else(|| settings.default_model());

        ResolvedRoute { provider, model }
    }

    fn uses_memory(&self, request: &TranslationRouterRequest) -> bool {
        match &request.context {
            Some(context) => context.use_translation_memory,
            None => self.settings.read().use_translation_memory,
        }
    }
}
