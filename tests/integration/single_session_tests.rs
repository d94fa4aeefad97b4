/*!
 * Integration tests for single-item translation sessions.
 */

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_test::{assert_err, assert_ok};

use loctext::errors::{ProviderError, SessionError};
use loctext::legacy::mock::MockTranslator;
use loctext::providers::mock::MockProvider;
use loctext::session::{
    FixedAnswer, NavigationGuard, SessionNotifier, SingleItemTranslationSession, TranslateOutcome, TranslationDraft,
};
use loctext::translation::TranslationRouterRequest;

use crate::common::{self, RouterBuilder};

fn template() -> TranslationRouterRequest {
    TranslationRouterRequest::new("", "en", "de")
}

/// Guard that records every prompt and answers with a fixed value
struct RecordingGuard {
    answer: bool,
    prompts: Mutex<Vec<TranslationDraft>>,
}

#[async_trait]
impl NavigationGuard for RecordingGuard {
    async fn confirm_autosave(&self, draft: &TranslationDraft) -> bool {
        self.prompts.lock().push(draft.clone());
        self.answer
    }
}

#[derive(Default)]
struct RecordingNotifier {
    already_translated: Mutex<usize>,
    failures: Mutex<Vec<String>>,
}

impl SessionNotifier for RecordingNotifier {
    fn already_translated(&self, _draft: &TranslationDraft) {
        *self.already_translated.lock() += 1;
    }

    fn translation_failed(&self, message: &str) {
        self.failures.lock().push(message.to_string());
    }
}

#[tokio::test]
async fn test_next_withUnsavedDraftAndConfirmation_shouldSaveThenMove() {
    common::init_logging();
    let router = RouterBuilder::new().google().build();
    let items = common::sample_items(3);
    let guard = Arc::new(RecordingGuard {
        answer: true,
        prompts: Mutex::new(Vec::new()),
    });
    let session = SingleItemTranslationSession::new(router, Arc::clone(&items), 0, template())
        .unwrap()
        .with_guard(guard.clone());

    let outcome = session.translate().await.unwrap();
    assert!(matches!(outcome, TranslateOutcome::Translated(ref routed) if routed.translated_by == "Google"));
    assert!(session.draft().is_unsaved());

    assert_eq!(session.next().await.unwrap(), 1);
    assert_eq!(items.read()[0].text, "[Google:de] Line 0");
    assert_eq!(guard.prompts.lock().len(), 1);
    assert_eq!(session.draft().text, "Line 1");
    assert!(!session.draft().has_translation());
}

#[tokio::test]
async fn test_previous_withUnsavedDraftDeclined_shouldDiscardDraft() {
    let router = RouterBuilder::new().google().build();
    let items = common::sample_items(3);
    let session = SingleItemTranslationSession::new(router, Arc::clone(&items), 2, template())
        .unwrap()
        .with_guard(Arc::new(FixedAnswer(false)));

    assert_ok!(session.translate().await);
    assert_eq!(session.previous().await.unwrap(), 1);
    assert_eq!(items.read()[2].text, "Line 2");
    assert_eq!(session.current_index(), 1);
}

#[tokio::test]
async fn test_navigation_atBoundaries_shouldBeUnavailable() {
    let router = RouterBuilder::new().google().build();
    let session = SingleItemTranslationSession::new(router, common::sample_items(2), 0, template()).unwrap();

    assert!(!session.can_previous());
    assert_eq!(session.previous().await, Err(SessionError::AtBoundary("first")));
    assert!(session.can_next());
    assert_ok!(session.next().await);
    assert!(!session.can_next());
    assert_eq!(session.next().await, Err(SessionError::AtBoundary("last")));
}

#[tokio::test]
async fn test_translate_existingTranslation_shouldNotifyInsteadOfCalling() {
    let translator = MockTranslator::working("Google");
    let router = RouterBuilder::new().legacy(translator.clone()).build();
    let notifier = Arc::new(RecordingNotifier::default());
    let session = SingleItemTranslationSession::new(router, common::sample_items(1), 0, template())
        .unwrap()
        .with_notifier(notifier.clone());

    assert_ok!(session.translate().await);
    assert_eq!(session.translate().await.unwrap(), TranslateOutcome::AlreadyTranslated);
    assert_eq!(*notifier.already_translated.lock(), 1);
    assert_eq!(translator.call_count(), 1);

    assert_ok!(session.save());
    assert_eq!(session.translate().await.unwrap(), TranslateOutcome::AlreadyTranslated);
}

#[tokio::test]
async fn test_translate_failure_shouldNotifyAndKeepDraftEmpty() {
    let router = RouterBuilder::new()
        .legacy(MockTranslator::failing("Google", ProviderError::AuthenticationError("bad key".to_string())))
        .build();
    let notifier = Arc::new(RecordingNotifier::default());
    let session = SingleItemTranslationSession::new(router, common::sample_items(1), 0, template())
        .unwrap()
        .with_notifier(notifier.clone());

    let outcome = session.translate().await.unwrap();
    assert!(matches!(outcome, TranslateOutcome::Failed(_)));
    assert!(notifier.failures.lock()[0].contains("bad key"));
    assert_eq!(session.save(), Err(SessionError::NothingToSave));
}

#[tokio::test]
async fn test_cancel_runningTranslation_shouldReturnCancelled() {
    let settings = loctext::app_config::TranslationSettings {
        provider_name: Some("Ollama".to_string()),
        model_name: Some("llama3".to_string()),
        ..Default::default()
    };
    let translator = MockTranslator::working("Google");
    let router = RouterBuilder::new()
        .settings(settings)
        .provider(MockProvider::slow(5_000).named("Ollama"))
        .legacy(translator.clone())
        .build();
    let session = Arc::new(
        SingleItemTranslationSession::new(router, common::sample_items(2), 0, template().via_provider(None, None))
            .unwrap(),
    );

    assert_err!(session.cancel());
    let running = Arc::clone(&session);
    let handle = tokio::spawn(async move { running.translate().await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(session.is_busy());
    assert!(!session.can_next());
    assert_eq!(session.next().await, Err(SessionError::Busy));
    assert_ok!(session.cancel());

    assert_eq!(handle.await.unwrap().unwrap(), TranslateOutcome::Cancelled);
    assert!(!session.is_busy());
    assert_eq!(translator.call_count(), 0);
}

#[test]
fn test_new_invalidStartIndex_shouldFail() {
    let router = RouterBuilder::new().google().build();
    let result = SingleItemTranslationSession::new(router, common::sample_items(2), 5, template());
    assert!(matches!(result, Err(SessionError::IndexOutOfRange { index: 5, len: 2 })));
}
