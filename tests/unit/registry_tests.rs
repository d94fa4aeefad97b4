/*!
 * Tests for the provider registry
 */

use std::sync::Arc;

use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

use loctext::providers::mock::MockProvider;
use loctext::providers::registry::ProviderRegistry;
use loctext::providers::TranslationProvider;
use loctext::translation::TranslationRequest;

#[test]
fn test_resolve_shouldIgnoreCaseAndWhitespace() {
    let registry = ProviderRegistry::new();
    registry.register(Arc::new(MockProvider::working().named("OpenAI")));

    assert!(registry.resolve("openai").is_some());
    assert!(registry.resolve(" OPENAI ").is_some());
    assert!(registry.resolve("ollama").is_none());
    assert_eq!(registry.resolution_count(), 3);
}

#[tokio::test]
async fn test_register_sameName_shouldReplaceEarlierProvider() {
    let registry = ProviderRegistry::new();
    let first = MockProvider::working().named("Ollama");
    let second = MockProvider::working().named("ollama");
    registry.register(Arc::new(first.clone()));
    registry.register(Arc::new(second.clone()));
    assert_eq!(registry.len(), 1);

    let provider = registry.resolve("OLLAMA").unwrap();
    let request = TranslationRequest::new("Hello", "en", "de").with_model("llama3");
    assert_ok!(provider.translate(&request, &CancellationToken::new()).await);
    assert_eq!(first.request_count(), 0);
    assert_eq!(second.request_count(), 1);
}

#[test]
fn test_providers_shouldListInRegistrationOrder() {
    let registry = ProviderRegistry::new();
    for name in ["Ollama", "Anthropic", "LM Studio"] {
        registry.register(Arc::new(MockProvider::working().named(name)));
    }
    registry.register_as("Local", Arc::new(MockProvider::working().named("Ollama")));

    assert_eq!(registry.names(), vec!["Ollama", "Anthropic", "LM Studio", "Ollama"]);
    assert!(registry.resolve("local").is_some());
}

#[tokio::test]
async fn test_listModels_shouldForwardToProvider() {
    let registry = ProviderRegistry::new();
    registry.register(Arc::new(MockProvider::working().named("Ollama").with_models(&["llama3", "qwen2"])));

    let models = registry.list_models("ollama", &CancellationToken::new()).await.unwrap();
    let ids: Vec<&str> = models.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["llama3", "qwen2"]);

    assert_err!(registry.list_models("missing", &CancellationToken::new()).await);
}
