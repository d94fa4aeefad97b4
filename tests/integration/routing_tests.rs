/*!
 * Integration tests for request routing, terminology attachment and fallback.
 */

use tokio_test::assert_ok;
use tokio_util::sync::CancellationToken;

use loctext::app_config::{TranslationProfile, TranslationSettings};
use loctext::errors::{FailureKind, ProviderError, ProviderFailureKind, TranslationFailure};
use loctext::legacy::mock::MockTranslator;
use loctext::providers::mock::MockProvider;
use loctext::translation::models::{PROFILE_KEY, TERMINOLOGY_SOURCES_KEY};
use loctext::translation::{FallbackReason, TranslationPipelineContext, TranslationRouterRequest};

use crate::common::{self, RouterBuilder};

fn routed_request(provider: &str, model: &str) -> TranslationRouterRequest {
    TranslationRouterRequest::new("Drink the Potion, Moogle!", "en", "de")
        .via_provider(Some(provider.to_string()), Some(model.to_string()))
}

#[tokio::test]
async fn test_providerRouting_withTerminology_shouldAttachPromptAndMetadata() {
    common::init_logging();
    let dir = common::create_temp_dir().unwrap();
    let items = common::create_terminology_csv(dir.path(), "items.csv").unwrap();
    let missing = dir.path().join("missing.csv");
    let style = common::create_test_file(dir.path(), "style.md", "## Forbidden terms\n- Elixir\n").unwrap();

    let provider = MockProvider::working().named("Ollama");
    let router = RouterBuilder::new().provider(provider.clone()).google().build();
    let request = routed_request("ollama", "llama3").with_context(TranslationPipelineContext {
        profile_id: Some("dialogue".to_string()),
        terminology_paths: vec![items.clone(), missing],
        style_guide_path: Some(style.clone()),
        ..Default::default()
    });

    let routed = router.translate(&request, &CancellationToken::new()).await.unwrap();
    assert_eq!(routed.translated_by, "Ollama");
    assert!(!routed.is_fallback());

    let sent = &provider.requests()[0];
    let expected_sources = format!("{};{}", items.display(), style.display());
    assert_eq!(sent.metadata.get(TERMINOLOGY_SOURCES_KEY), Some(&expected_sources));
    assert_eq!(sent.metadata.get(PROFILE_KEY).map(String::as_str), Some("dialogue"));
    assert_eq!(sent.profile_id.as_deref(), Some("dialogue"));
    assert_eq!(sent.glossary_path.as_ref(), Some(&style));

    let system = sent.terminology_system_prompt().unwrap();
    assert!(system.contains("- Potion => Trank"));
    assert!(system.contains("- Elixir =>  (mode: forbidden)"));
    assert_eq!(routed.metadata.get(TERMINOLOGY_SOURCES_KEY), Some(&expected_sources));
}

#[tokio::test]
async fn test_providerRouting_allTerminologyMissing_shouldOmitMetadata() {
    let dir = common::create_temp_dir().unwrap();
    let provider = MockProvider::working().named("Ollama");
    let router = RouterBuilder::new().provider(provider.clone()).build();
    let request = routed_request("Ollama", "llama3").with_context(TranslationPipelineContext {
        terminology_paths: vec![dir.path().join("nope.csv")],
        ..Default::default()
    });

    assert_ok!(router.translate(&request, &CancellationToken::new()).await);
    let sent = &provider.requests()[0];
    assert!(sent.terminology.is_none());
    assert!(sent.metadata.is_empty());
}

#[tokio::test]
async fn test_providerRouting_baseUrlOverride_shouldReachProvider() {
    let provider = MockProvider::working().named("LM Studio");
    let settings = TranslationSettings {
        base_url: Some("http://settings:1234/v1".to_string()),
        ..Default::default()
    };
    let router = RouterBuilder::new().settings(settings).provider(provider.clone()).build();

    let request = routed_request("lm studio", "qwen2");
    assert_ok!(router.translate(&request, &CancellationToken::new()).await);
    let request = request.with_base_url("http://override:1234/v1");
    assert_ok!(router.translate(&request, &CancellationToken::new()).await);

    let sent = provider.requests();
    assert_eq!(sent[0].endpoint_override.as_deref(), Some("http://settings:1234/v1"));
    assert_eq!(sent[1].endpoint_override.as_deref(), Some("http://override:1234/v1"));
}

#[tokio::test]
async fn test_slowProvider_shouldTimeOutAndFallBackToGoogle() {
    common::init_logging();
    let settings = TranslationSettings {
        request_timeout_secs: 1,
        ..Default::default()
    };
    let google = MockTranslator::working("Google");
    let router = RouterBuilder::new()
        .settings(settings)
        .provider(MockProvider::slow(10_000).named("Ollama"))
        .legacy(google.clone())
        .build();

    let routed = router
        .translate(&routed_request("Ollama", "llama3"), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(routed.translated_by, "Google");
    assert_eq!(routed.text, "[Google:de] Drink the Potion, Moogle!");
    let status = routed.fallback.unwrap();
    assert!(matches!(
        status.reason,
        FallbackReason::ProviderFailed {
            kind: ProviderFailureKind::Timeout,
            ..
        }
    ));
    assert_eq!(google.call_count(), 1);
}

#[tokio::test]
async fn test_providerAndLegacyBothFail_shouldReportBoth() {
    let router = RouterBuilder::new()
        .provider(MockProvider::failing(ProviderError::ConnectionError("refused".to_string())).named("Ollama"))
        .legacy(MockTranslator::failing("Google", ProviderError::RateLimitExceeded("quota".to_string())))
        .build();

    let failure = router
        .translate(&routed_request("Ollama", "llama3"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(failure.kind(), FailureKind::LegacyTranslator);
    let message = failure.to_string();
    assert!(message.contains("quota"));
    assert!(message.contains("refused"));
}

#[tokio::test]
async fn test_providerRoutingOff_withDefaultProvider_shouldNeverResolve() {
    let settings = TranslationSettings {
        model_name: Some("llama3".to_string()),
        ..Default::default()
    };
    let default_provider = MockProvider::working().named("Ollama");
    let router = RouterBuilder::new()
        .settings(settings)
        .provider(MockProvider::working().named("Ollama"))
        .default_provider(default_provider.clone())
        .google()
        .build();

    for text in ["One", "Two", "Three"] {
        let request = TranslationRouterRequest::new(text, "en", "fr");
        let routed = router.translate(&request, &CancellationToken::new()).await.unwrap();
        assert_eq!(routed.translated_by, "Ollama");
    }
    assert_eq!(default_provider.request_count(), 3);
    assert_eq!(router.registry().resolution_count(), 0);
}

#[tokio::test]
async fn test_profileRoute_shouldResolveProviderAndModelFromProfile() {
    let settings = TranslationSettings {
        profiles: vec![TranslationProfile {
            id: "ui".to_string(),
            provider: Some("anthropic".to_string()),
            model: Some("claude-3-haiku".to_string()),
            ..Default::default()
        }],
        ..Default::default()
    };
    let provider = MockProvider::working().named("Anthropic");
    let router = RouterBuilder::new().settings(settings).provider(provider.clone()).build();

    let request = TranslationRouterRequest::new("Options", "en", "ja")
        .via_provider(None, None)
        .with_context(TranslationPipelineContext {
            profile_id: Some("ui".to_string()),
            ..Default::default()
        });
    let routed = router.translate(&request, &CancellationToken::new()).await.unwrap();
    assert_eq!(routed.translated_by, "Anthropic");
    assert_eq!(routed.model.as_deref(), Some("claude-3-haiku"));
}

#[tokio::test]
async fn test_missingProviderAndModel_shouldFailBeforeAnyCall() {
    let google = MockTranslator::working("Google");
    let router = RouterBuilder::new().legacy(google.clone()).build();
    let request = TranslationRouterRequest::new("Hello", "en", "de").via_provider(None, None);

    let failure = router.translate(&request, &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(failure, TranslationFailure::RequestValidation { .. }));
    assert_eq!(google.call_count(), 0);
}

#[tokio::test]
async fn test_cancelledToken_shouldFailWithoutCallingAnything() {
    let provider = MockProvider::working().named("Ollama");
    let router = RouterBuilder::new().provider(provider.clone()).google().build();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let failure = router.translate(&routed_request("Ollama", "llama3"), &cancel).await.unwrap_err();
    assert!(failure.is_cancelled());
    assert_eq!(provider.request_count(), 0);
}
