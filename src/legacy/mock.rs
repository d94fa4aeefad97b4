//! Scripted legacy translator for tests and demos

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::errors::ProviderError;

use super::{LanguageSupport, LegacyTranslator};

#[derive(Debug, Clone)]
pub enum MockTranslatorBehavior {
    /// Prefix the text with `[name:target]`
    Working,
    /// Return an empty translation
    Empty,
    /// Fail with the given error
    Failing(ProviderError),
    /// Panic on the given source text, work like `Working` otherwise
    PanickingOn(String),
}

#[derive(Debug, Clone)]
pub struct MockTranslator {
    name: String,
    behavior: MockTranslatorBehavior,
    languages: LanguageSupport,
    calls: Arc<AtomicUsize>,
}

impl MockTranslator {
    pub fn new(name: impl Into<String>, behavior: MockTranslatorBehavior) -> Self {
        Self {
            name: name.into(),
            behavior,
            languages: LanguageSupport::Any,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn working(name: impl Into<String>) -> Self {
        Self::new(name, MockTranslatorBehavior::Working)
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, MockTranslatorBehavior::Empty)
    }

    pub fn failing(name: impl Into<String>, error: ProviderError) -> Self {
        Self::new(name, MockTranslatorBehavior::Failing(error))
    }

    pub fn panicking_on(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name, MockTranslatorBehavior::PanickingOn(text.into()))
    }

    /// Restrict the accepted languages
    pub fn with_languages(mut self, codes: &[&str]) -> Self {
        self.languages = LanguageSupport::Only(codes.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Number of `translate` calls, shared between clones
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LegacyTranslator for MockTranslator {
    fn name(&self) -> &str {
        &self.name
    }

    fn supported_languages(&self) -> LanguageSupport {
        self.languages.clone()
    }

    async fn translate(
        &self,
        text: &str,
        target_language: &str,
        _source_language: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }
        match &self.behavior {
            MockTranslatorBehavior::Working => Ok(format!("[{}:{}] {}", self.name, target_language, text)),
            MockTranslatorBehavior::Empty => Ok(String::new()),
            MockTranslatorBehavior::Failing(error) => Err(error.clone()),
            MockTranslatorBehavior::PanickingOn(trigger) if trigger == text => {
                panic!("Simulated legacy translator panic")
            }
            MockTranslatorBehavior::PanickingOn(_) => Ok(format!("[{}:{}] {}", self.name, target_language, text)),
        }
    }
}
