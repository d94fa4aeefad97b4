/*!
 * Translation memory.
 *
 * Remembers successful translations per routing mode, source text and
 * language pair so a session that asks for the same string twice does not
 * call a provider or legacy translator again. A legacy translation never
 * answers a provider-routed request, and the reverse. Only consulted when the pipeline context enables
 * translation memory.
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::debug;
use parking_lot::RwLock;

use crate::language_utils::normalize_language_code;

/// Routing mode a translation was produced under
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemoryRoute {
    Legacy,
    Provider { provider: String, model: String },
}

impl MemoryRoute {
    /// Provider route; provider names compare case-insensitively like the registry
    pub fn provider(provider: &str, model: &str) -> Self {
        Self::Provider {
            provider: provider.trim().to_lowercase(),
            model: model.trim().to_string(),
        }
    }
}

/// Memory key combining route, source text, source language, and target language
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MemoryKey {
    route: MemoryRoute,
    source_text: String,
    source_language: String,
    target_language: String,
}

/// Normalized form of a language code so "de", "deu" and "de-DE" share entries
fn language_key(code: &str) -> String {
    normalize_language_code(code).unwrap_or_else(|_| code.trim().to_lowercase())
}

impl MemoryKey {
    fn new(route: MemoryRoute, source_text: &str, source_language: &str, target_language: &str) -> Self {
        Self {
            route,
            source_text: source_text.to_string(),
            source_language: language_key(source_language),
            target_language: language_key(target_language),
        }
    }
}

/// A remembered translation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryEntry {
    pub text: String,
    /// Provider or legacy translator that produced the text
    pub translated_by: String,
    pub model: Option<String>,
}

/// Translation memory shared by the sessions of one router
#[derive(Debug, Clone, Default)]
pub struct TranslationMemory {
    entries: Arc<RwLock<HashMap<MemoryKey, MemoryEntry>>>,
    hits: Arc<AtomicUsize>,
    misses: Arc<AtomicUsize>,
}

impl TranslationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a remembered translation
    pub fn get(
        &self,
        route: &MemoryRoute,
        source_text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Option<MemoryEntry> {
        let key = MemoryKey::new(route.clone(), source_text, source_language, target_language);
        match self.entries.read().get(&key) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "Translation memory hit for '{}' ({} -> {})",
                    truncate_text(source_text, 30),
                    source_language,
                    target_language
                );
                Some(entry.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Remember a translation
    pub fn store(
        &self,
        route: MemoryRoute,
        source_text: &str,
        source_language: &str,
        target_language: &str,
        entry: MemoryEntry,
    ) {
        let key = MemoryKey::new(route, source_text, source_language, target_language);
        self.entries.write().insert(key, entry);
    }

    /// Hits, misses and hit rate
    pub fn stats(&self) -> (usize, usize, f64) {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 { hits as f64 / total as f64 } else { 0.0 };
        (hits, misses, hit_rate)
    }

    pub fn clear(&self) {
        self.entries.write().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        debug!("Translation memory cleared");
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Truncate text to a maximum number of characters with ellipsis
fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => format!("{}...", &text[..index]),
        None => text.to_string(),
    }
}
