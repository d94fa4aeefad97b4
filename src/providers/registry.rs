/*!
 * Name-keyed lookup of translation providers.
 *
 * Names are compared case-insensitively. Registering a second provider
 * under an existing name replaces the first: the last registration wins, so
 * a composition root can override a built-in provider by re-registering it.
 */

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use crate::errors::ProviderError;

use super::{ModelInfo, ProviderDescriptor, TranslationProvider};

struct Registration {
    order: usize,
    provider: Arc<dyn TranslationProvider>,
}

/// Registry of providers, shared by every session
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Registration>>,
    next_order: AtomicUsize,
    resolutions: AtomicUsize,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

fn key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its own name, replacing any previous one
    pub fn register(&self, provider: Arc<dyn TranslationProvider>) {
        let name = provider.name().to_string();
        self.register_as(&name, provider);
    }

    /// Register a provider under an explicit name, replacing any previous one
    pub fn register_as(&self, name: &str, provider: Arc<dyn TranslationProvider>) {
        let order = self.next_order.fetch_add(1, Ordering::Relaxed);
        let replaced = self
            .providers
            .write()
            .insert(key(name), Registration { order, provider })
            .is_some();
        if replaced {
            debug!("Provider '{}' re-registered, replacing the previous registration", name);
        }
    }

    /// Look up a provider by name, ignoring case
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn TranslationProvider>> {
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        self.providers
            .read()
            .get(&key(name))
            .map(|registration| Arc::clone(&registration.provider))
    }

    /// Descriptors of the registered providers in registration order
    pub fn providers(&self) -> Vec<ProviderDescriptor> {
        let providers = self.providers.read();
        let mut registrations: Vec<&Registration> = providers.values().collect();
        registrations.sort_by_key(|registration| registration.order);
        registrations
            .into_iter()
            .map(|registration| registration.provider.descriptor())
            .collect()
    }

    /// Names of the registered providers in registration order
    pub fn names(&self) -> Vec<String> {
        self.providers().into_iter().map(|descriptor| descriptor.name).collect()
    }

    /// List the models of a named provider
    pub async fn list_models(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ModelInfo>, ProviderError> {
        let provider = self
            .resolve(name)
            .ok_or_else(|| ProviderError::RequestFailed(format!("provider '{}' is not registered", name)))?;
        provider.list_models(cancel).await
    }

    /// Number of `resolve` calls made so far
    pub fn resolution_count(&self) -> usize {
        self.resolutions.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.providers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.read().is_empty()
    }
}
