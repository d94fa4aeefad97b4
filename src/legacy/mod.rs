/*!
 * Legacy translators: simple, non-model-addressable translation backends.
 *
 * They are used when provider routing is not requested, and as the fallback
 * chain when a provider call fails. Each translator advertises the languages
 * it accepts so the chain can pick one without matching on names.
 */

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::app_config::{LegacyTranslatorConfig, LegacyTranslatorKind};
use crate::errors::ProviderError;
use crate::language_utils::language_codes_match;

pub mod libretranslate;
pub mod mock;

/// Languages a legacy translator accepts
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LanguageSupport {
    /// Any language pair
    #[default]
    Any,
    /// Only the listed language codes, as source or target
    Only(Vec<String>),
}

impl LanguageSupport {
    /// Build from a configured language list; empty means any
    pub fn from_codes(codes: &[String]) -> Self {
        let codes: Vec<String> = codes
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        if codes.is_empty() { Self::Any } else { Self::Only(codes) }
    }

    pub fn supports(&self, code: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Only(codes) => codes.iter().any(|c| language_codes_match(c, code)),
        }
    }

    /// Whether both languages are accepted; a blank source means auto-detect
    pub fn supports_pair(&self, source_language: &str, target_language: &str) -> bool {
        (source_language.trim().is_empty() || self.supports(source_language)) && self.supports(target_language)
    }
}

/// Capability shared by all legacy translators
#[async_trait]
pub trait LegacyTranslator: Send + Sync + Debug {
    /// Name the translator is addressed by in settings
    fn name(&self) -> &str;

    fn supported_languages(&self) -> LanguageSupport {
        LanguageSupport::Any
    }

    /// Translate `text` into `target_language`
    async fn translate(
        &self,
        text: &str,
        target_language: &str,
        source_language: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ProviderError>;
}

/// Ordered set of legacy translators
#[derive(Debug, Clone, Default)]
pub struct LegacyTranslatorChain {
    translators: Vec<Arc<dyn LegacyTranslator>>,
}

impl LegacyTranslatorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a translator to the end of the chain
    pub fn with(mut self, translator: Arc<dyn LegacyTranslator>) -> Self {
        self.translators.push(translator);
        self
    }

    pub fn push(&mut self, translator: Arc<dyn LegacyTranslator>) {
        self.translators.push(translator);
    }

    pub fn is_empty(&self) -> bool {
        self.translators.is_empty()
    }

    pub fn len(&self) -> usize {
        self.translators.len()
    }

    pub fn names(&self) -> Vec<&str> {
        self.translators.iter().map(|t| t.name()).collect()
    }

    /// Pick the translator to use for a language pair.
    ///
    /// The preferred translator wins when it accepts the pair, then the first
    /// translator that accepts it, then the first translator in the chain.
    pub fn select(
        &self,
        preferred: Option<&str>,
        source_language: &str,
        target_language: &str,
    ) -> Option<Arc<dyn LegacyTranslator>> {
        let accepts = |t: &&Arc<dyn LegacyTranslator>| {
            t.supported_languages().supports_pair(source_language, target_language)
        };

        let preferred = preferred.map(str::trim).filter(|p| !p.is_empty());
        preferred
            .and_then(|name| {
                self.translators
                    .iter()
                    .filter(|t| t.name().eq_ignore_ascii_case(name))
                    .find(accepts)
            })
            .or_else(|| self.translators.iter().find(accepts))
            .or_else(|| self.translators.first())
            .cloned()
    }
}

/// Create a legacy translator from its configuration
pub fn build_legacy_translator(config: &LegacyTranslatorConfig) -> Arc<dyn LegacyTranslator> {
    match config.kind {
        LegacyTranslatorKind::LibreTranslate => Arc::new(libretranslate::LibreTranslate::from_config(config)),
    }
}
