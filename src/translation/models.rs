/*!
 * Value objects exchanged between callers, the router and providers.
 */

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::app_config::TranslationSettings;
use crate::errors::ProviderFailureKind;
use crate::terminology::TerminologyPrompt;

/// Metadata key listing the terminology sources attached to a request
pub const TERMINOLOGY_SOURCES_KEY: &str = "terminology.sources";

/// Metadata key recording the profile that produced a request
pub const PROFILE_KEY: &str = "profile";

/// A single provider translation call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub text: String,
    pub source_language: String,
    pub target_language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glossary_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<String>,
    /// Base URL that overrides the provider's configured endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_override: Option<String>,
    /// Terminology constraints to inject into the provider prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminology: Option<TerminologyPrompt>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl TranslationRequest {
    pub fn new(
        text: impl Into<String>,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            source_language: source_language.into(),
            target_language: target_language.into(),
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint_override = Some(endpoint.into());
        self
    }

    pub fn with_terminology(mut self, prompt: TerminologyPrompt) -> Self {
        self.terminology = Some(prompt);
        self
    }

    /// System prompt fragment from attached terminology
    pub fn terminology_system_prompt(&self) -> Option<&str> {
        self.terminology
            .as_ref()
            .and_then(|t| t.system_prompt.as_deref())
            .filter(|s| !s.is_empty())
    }

    /// User prompt fragment from attached terminology
    pub fn terminology_user_prompt(&self) -> Option<&str> {
        self.terminology
            .as_ref()
            .and_then(|t| t.user_prompt.as_deref())
            .filter(|s| !s.is_empty())
    }
}

/// What a provider returns for a request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub translated_text: String,
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl TranslationResult {
    pub fn new(translated_text: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            translated_text: translated_text.into(),
            provider: provider.into(),
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Resolved profile, provider, model and terminology preferences for a session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslationPipelineContext {
    #[serde(default)]
    pub profile_id: Option<String>,
    #[serde(default)]
    pub provider_id: Option<String>,
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub terminology_paths: Vec<PathBuf>,
    #[serde(default)]
    pub style_guide_path: Option<PathBuf>,
    #[serde(default)]
    pub use_translation_memory: bool,
}

impl TranslationPipelineContext {
    /// Build a context from settings and the active profile
    pub fn from_settings(settings: &TranslationSettings, extra_terminology: &[PathBuf]) -> Self {
        settings.pipeline_context(extra_terminology)
    }

    /// Terminology paths that are not blank
    pub fn terminology_sources(&self) -> impl Iterator<Item = &PathBuf> {
        self.terminology_paths.iter().filter(|p| !p.as_os_str().is_empty())
    }

    /// Style guide path, if it is set and not blank
    pub fn style_guide_source(&self) -> Option<&PathBuf> {
        self.style_guide_path.as_ref().filter(|p| !p.as_os_str().is_empty())
    }

    /// Whether any terminology or style-guide source is configured
    pub fn has_terminology(&self) -> bool {
        self.terminology_sources().next().is_some() || self.style_guide_source().is_some()
    }
}

/// Entry-point request for the translation router
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslationRouterRequest {
    pub text: String,
    pub target_language: String,
    pub source_language: String,
    #[serde(default)]
    pub provider_override: Option<String>,
    #[serde(default)]
    pub model_override: Option<String>,
    #[serde(default)]
    pub base_url_override: Option<String>,
    #[serde(default)]
    pub use_provider_for_translation: bool,
    #[serde(default)]
    pub context: Option<TranslationPipelineContext>,
}

impl TranslationRouterRequest {
    pub fn new(
        text: impl Into<String>,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            source_language: source_language.into(),
            target_language: target_language.into(),
            ..Default::default()
        }
    }

    /// Request routing through a provider
    pub fn via_provider(mut self, provider: Option<String>, model: Option<String>) -> Self {
        self.use_provider_for_translation = true;
        self.provider_override = provider;
        self.model_override = model;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url_override = Some(base_url.into());
        self
    }

    pub fn with_context(mut self, context: TranslationPipelineContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Copy of this request carrying different text
    pub fn for_text(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..self.clone()
        }
    }

    /// Whether terminology metadata should be attached to the provider call
    pub fn wants_terminology(&self) -> bool {
        self.use_provider_for_translation && self.context.as_ref().is_some_and(|c| c.has_terminology())
    }
}

/// Why a translation was produced by the legacy chain instead of a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FallbackReason {
    /// The requested provider is not registered
    ProviderNotRegistered { provider: String },
    /// The provider call failed with a classified error
    ProviderFailed {
        provider: String,
        kind: ProviderFailureKind,
    },
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProviderNotRegistered { provider } => {
                write!(f, "provider '{}' is not registered", provider)
            }
            Self::ProviderFailed { provider, kind } => {
                write!(f, "provider '{}' failed ({})", provider, kind)
            }
        }
    }
}

/// Status annotation attached to a successful fallback translation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackStatus {
    pub reason: FallbackReason,
    pub translator: String,
    pub message: String,
}

impl FallbackStatus {
    pub fn new(reason: FallbackReason, translator: impl Into<String>) -> Self {
        let translator = translator.into();
        let message = format!("Translated with legacy translator '{}' because {}", translator, reason);
        Self {
            reason,
            translator,
            message,
        }
    }
}

impl fmt::Display for FallbackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Successful router outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutedTranslation {
    pub text: String,
    /// Provider or legacy translator that produced the text
    pub translated_by: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Set when the text came from the legacy chain after a provider problem
    #[serde(default)]
    pub fallback: Option<FallbackStatus>,
    /// Whether the text was served from translation memory
    #[serde(default)]
    pub from_memory: bool,
}

impl RoutedTranslation {
    pub fn from_provider(result: TranslationResult) -> Self {
        Self {
            text: result.translated_text,
            translated_by: result.provider,
            model: result.model,
            notes: result.notes,
            metadata: result.metadata,
            fallback: None,
            from_memory: false,
        }
    }

    pub fn from_legacy(text: String, translator: impl Into<String>) -> Self {
        Self {
            text,
            translated_by: translator.into(),
            model: None,
            notes: None,
            metadata: BTreeMap::new(),
            fallback: None,
            from_memory: false,
        }
    }

    pub fn with_fallback(mut self, status: FallbackStatus) -> Self {
        self.fallback = Some(status);
        self
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}
