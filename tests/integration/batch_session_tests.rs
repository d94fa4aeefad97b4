/*!
 * Integration tests for batch translation sessions.
 */

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_test::assert_err;

use loctext::errors::{ProviderError, SessionError};
use loctext::legacy::mock::MockTranslator;
use loctext::providers::mock::MockProvider;
use loctext::session::{BatchProgress, BatchTranslationSession, SessionState};
use loctext::translation::TranslationRouterRequest;

use crate::common::{self, RouterBuilder};

fn template() -> TranslationRouterRequest {
    TranslationRouterRequest::new("", "en", "de")
}

#[tokio::test]
async fn test_batch_cancelAfterTwoItems_shouldLeaveRestPending() {
    common::init_logging();
    let translator = MockTranslator::working("Google");
    let router = RouterBuilder::new().legacy(translator.clone()).build();
    let items = common::sample_items(5);
    let session = BatchTranslationSession::new(router, Arc::clone(&items), 0, 4, template());
    let canceller = session.cancel_handle();

    let progress = session
        .start_with_progress(|progress| {
            if progress.completed() == 2 {
                canceller.cancel().unwrap();
            }
        })
        .await
        .unwrap();

    assert_eq!(progress.success_count + progress.failure_count, 2);
    assert_eq!(progress.pending_count, 3);
    assert_eq!(progress.range_size, 5);
    assert_eq!(translator.call_count(), 2);
    assert_eq!(session.state(), SessionState::Idle);

    let items = items.read();
    assert_eq!(items[1].text, "[Google:de] Line 1");
    assert_eq!(items[2].text, "Line 2");
}

#[tokio::test]
async fn test_batch_failingItems_shouldBeCountedAndReported() {
    let settings = loctext::app_config::TranslationSettings {
        provider_name: Some("Ollama".to_string()),
        model_name: Some("llama3".to_string()),
        ..Default::default()
    };
    let router = RouterBuilder::new()
        .settings(settings)
        .provider(MockProvider::intermittent(2).named("Ollama"))
        .build();
    let items = common::sample_items(4);
    let session = BatchTranslationSession::new(router, Arc::clone(&items), 0, 3, template().via_provider(None, None));

    let snapshots = Arc::new(Mutex::new(Vec::<BatchProgress>::new()));
    let recorded = Arc::clone(&snapshots);
    let progress = session
        .start_with_progress(move |progress| recorded.lock().push(*progress))
        .await
        .unwrap();

    assert_eq!((progress.success_count, progress.failure_count, progress.pending_count), (2, 2, 0));
    let snapshots = snapshots.lock();
    assert_eq!(snapshots.len(), 4);
    assert!(snapshots.windows(2).all(|w| w[1].completed() == w[0].completed() + 1));
    assert_eq!(items.read()[1].text, "Line 1");
}

#[tokio::test]
async fn test_batch_endBeyondCollection_shouldClampRange() {
    let router = RouterBuilder::new().google().build();
    let items = common::sample_items(3);
    let session = BatchTranslationSession::new(router, Arc::clone(&items), 1, 50, template());

    let range = session.range().unwrap();
    assert_eq!((range.start, range.end), (1, 2));

    let progress = session.start().await.unwrap();
    assert_eq!(progress.success_count, 2);
    assert_eq!(items.read()[0].text, "Line 0");
}

#[tokio::test]
async fn test_batch_emptyCollection_shouldRefuseToStart() {
    let router = RouterBuilder::new().google().build();
    let session = BatchTranslationSession::new(router, common::sample_items(0), 0, 0, template());
    assert_eq!(session.start().await, Err(SessionError::EmptyCollection));
}

#[tokio::test]
async fn test_batch_cancelWhileIdle_shouldBeUnavailable() {
    let router = RouterBuilder::new().google().build();
    let session = BatchTranslationSession::new(router, common::sample_items(2), 0, 1, template());
    assert_err!(session.cancel());
    assert!(!session.is_busy());
}

#[tokio::test]
async fn test_batch_secondStartWhileBusy_shouldBeRejected() {
    let settings = loctext::app_config::TranslationSettings {
        provider_name: Some("Ollama".to_string()),
        model_name: Some("llama3".to_string()),
        ..Default::default()
    };
    let router = RouterBuilder::new()
        .settings(settings)
        .provider(MockProvider::slow(200).named("Ollama"))
        .build();
    let session = Arc::new(BatchTranslationSession::new(
        router,
        common::sample_items(3),
        0,
        2,
        template().via_provider(None, None),
    ));

    let running = Arc::clone(&session);
    let handle = tokio::spawn(async move { running.start().await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(session.is_busy());
    assert_eq!(session.start().await, Err(SessionError::Busy));
    session.cancel().unwrap();
    assert_eq!(session.state(), SessionState::Cancelling);

    let progress = handle.await.unwrap().unwrap();
    assert_eq!(progress.success_count, 0);
    assert_eq!(progress.pending_count, 3);
    assert!(!session.is_busy());
}

#[tokio::test]
async fn test_batch_legacyFailures_shouldNotStopBatch() {
    let router = RouterBuilder::new()
        .legacy(MockTranslator::failing("Google", ProviderError::ConnectionError("offline".to_string())))
        .build();
    let session = BatchTranslationSession::new(router, common::sample_items(3), 0, 2, template());

    let progress = session.start().await.unwrap();
    assert_eq!(progress.failure_count, 3);
    assert_eq!(progress.pending_count, 0);
}

#[tokio::test]
async fn test_batch_panickingItem_shouldCountFailureAndContinue() {
    let translator = MockTranslator::panicking_on("Google", "Line 1");
    let router = RouterBuilder::new().legacy(translator.clone()).build();
    let items = common::sample_items(4);
    let session = BatchTranslationSession::new(router, Arc::clone(&items), 0, 3, template());

    let progress = session.start().await.unwrap();
    assert_eq!(progress.failure_count, 1);
    assert_eq!(progress.success_count, 3);
    assert_eq!(progress.success_count + progress.failure_count + progress.pending_count, progress.range_size);
    assert_eq!(translator.call_count(), 4);
    assert!(!session.is_busy());

    let items = items.read();
    assert_eq!(items[1].text, "Line 1");
    assert_eq!(items[2].text, "[Google:de] Line 2");
    assert_eq!(items[3].text, "[Google:de] Line 3");
}

#[tokio::test]
async fn test_batch_panickingProvider_shouldFallBackPerItem() {
    let settings = loctext::app_config::TranslationSettings {
        provider_name: Some("Ollama".to_string()),
        model_name: Some("llama3".to_string()),
        ..Default::default()
    };
    let router = RouterBuilder::new()
        .settings(settings)
        .provider(MockProvider::panicking().named("Ollama"))
        .google()
        .build();
    let items = common::sample_items(3);
    let session = BatchTranslationSession::new(router, Arc::clone(&items), 0, 2, template().via_provider(None, None));

    let progress = session.start().await.unwrap();
    assert_eq!((progress.success_count, progress.failure_count, progress.pending_count), (3, 0, 0));
    assert_eq!(items.read()[2].text, "[Google:de] Line 2");
}
