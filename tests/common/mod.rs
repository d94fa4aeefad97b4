/*!
 * Common test utilities for the loctext test suite
 */

use anyhow::Result;
use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use loctext::app_config::TranslationSettings;
use loctext::legacy::LegacyTranslator;
use loctext::legacy::LegacyTranslatorChain;
use loctext::legacy::mock::MockTranslator;
use loctext::providers::TranslationProvider;
use loctext::providers::registry::ProviderRegistry;
use loctext::string_table::{SharedItems, StringItem, shared_items};
use loctext::translation::{LegacyTranslationRouter, TranslationRouter};

/// Route test logs through env_logger, once per process
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates a small terminology pack with a header row
pub fn create_terminology_csv(dir: &Path, filename: &str) -> Result<PathBuf> {
    let content = "term,translation,notes,mode\n\
                   Potion,Trank,healing item,\n\
                   Moogle,Mogry,,required\n\
                   Gil,Gil,currency,\n";
    create_test_file(dir, filename, content)
}

/// Shared collection of `count` items keyed `line.N`
pub fn sample_items(count: usize) -> SharedItems {
    shared_items(
        (0..count)
            .map(|i| StringItem::new(format!("line.{}", i), format!("Line {}", i)))
            .collect(),
    )
}

/// Builds a router from scripted providers and legacy translators
pub struct RouterBuilder {
    settings: TranslationSettings,
    providers: Vec<Arc<dyn TranslationProvider>>,
    chain: LegacyTranslatorChain,
    default_provider: Option<Arc<dyn TranslationProvider>>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self {
            settings: TranslationSettings::default(),
            providers: Vec::new(),
            chain: LegacyTranslatorChain::new(),
            default_provider: None,
        }
    }

    pub fn settings(mut self, settings: TranslationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn provider(mut self, provider: impl TranslationProvider + 'static) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    pub fn legacy(mut self, translator: impl LegacyTranslator + 'static) -> Self {
        self.chain.push(Arc::new(translator));
        self
    }

    /// Legacy chain holding a single working translator named "Google"
    pub fn google(self) -> Self {
        self.legacy(MockTranslator::working("Google"))
    }

    pub fn default_provider(mut self, provider: impl TranslationProvider + 'static) -> Self {
        self.default_provider = Some(Arc::new(provider));
        self
    }

    pub fn build(self) -> Arc<TranslationRouter> {
        let settings = Arc::new(RwLock::new(self.settings));
        let registry = Arc::new(ProviderRegistry::new());
        for provider in self.providers {
            registry.register(provider);
        }
        let mut legacy = LegacyTranslationRouter::new(self.chain, Arc::clone(&settings));
        if let Some(provider) = self.default_provider {
            legacy = legacy.with_default_provider(provider);
        }
        Arc::new(TranslationRouter::new(registry, Arc::new(legacy), settings))
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
