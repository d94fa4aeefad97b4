use std::ops::RangeInclusive;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::errors::{SessionError, TranslationFailure};
use crate::string_table::SharedItems;
use crate::translation::{TranslationRouter, TranslationRouterRequest};

use super::SessionState;

/// Inclusive index range of a batch, clamped to the collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchRange {
    pub start: usize,
    pub end: usize,
}

impl BatchRange {
    /// Clamp `end` into `[start, len - 1]`
    pub fn clamp(start: usize, end: usize, len: usize) -> Result<Self, SessionError> {
        if len == 0 {
            return Err(SessionError::EmptyCollection);
        }
        if start >= len {
            return Err(SessionError::IndexOutOfRange { index: start, len });
        }
        Ok(Self {
            start,
            end: end.max(start).min(len - 1),
        })
    }

    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// A clamped range always holds at least its start item
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn indices(&self) -> RangeInclusive<usize> {
        self.start..=self.end
    }
}

/// Counters of one batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BatchProgress {
    pub success_count: usize,
    pub failure_count: usize,
    pub pending_count: usize,
    pub range_size: usize,
}

impl BatchProgress {
    pub fn new(range_size: usize) -> Self {
        Self {
            success_count: 0,
            failure_count: 0,
            pending_count: range_size,
            range_size,
        }
    }

    /// Items that finished, successfully or not
    pub fn completed(&self) -> usize {
        self.success_count + self.failure_count
    }

    fn record_success(&mut self) {
        self.success_count += 1;
        self.pending_count -= 1;
    }

    fn record_failure(&mut self) {
        self.failure_count += 1;
        self.pending_count -= 1;
    }
}

#[derive(Debug, Default)]
struct BatchState {
    state: SessionState,
    cancel: Option<CancellationToken>,
    progress: BatchProgress,
}

/// Handle that cancels a running batch from another task
#[derive(Debug, Clone)]
pub struct BatchCanceller {
    state: Arc<Mutex<BatchState>>,
}

impl BatchCanceller {
    /// Request cancellation; returns without waiting for the batch to stop
    pub fn cancel(&self) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        if !state.state.is_busy() {
            return Err(SessionError::NotBusy);
        }
        state.state = SessionState::Cancelling;
        if let Some(token) = &state.cancel {
            token.cancel();
        }
        Ok(())
    }

    pub fn is_busy(&self) -> bool {
        self.state.lock().state.is_busy()
    }
}

/// Translates an index range of items in order
pub struct BatchTranslationSession {
    router: Arc<TranslationRouter>,
    items: SharedItems,
    /// Languages, routing flags and context shared by every item request
    template: TranslationRouterRequest,
    start_index: usize,
    end_index: usize,
    state: Arc<Mutex<BatchState>>,
}

impl std::fmt::Debug for BatchTranslationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchTranslationSession")
            .field("start_index", &self.start_index)
            .field("end_index", &self.end_index)
            .field("state", &self.state())
            .finish()
    }
}

impl BatchTranslationSession {
    pub fn new(
        router: Arc<TranslationRouter>,
        items: SharedItems,
        start_index: usize,
        end_index: usize,
        template: TranslationRouterRequest,
    ) -> Self {
        Self {
            router,
            items,
            template,
            start_index,
            end_index,
            state: Arc::new(Mutex::new(BatchState::default())),
        }
    }

    /// The configured range clamped to the current collection
    pub fn range(&self) -> Result<BatchRange, SessionError> {
        BatchRange::clamp(self.start_index, self.end_index, self.items.read().len())
    }

    pub fn state(&self) -> SessionState {
        self.state.lock().state
    }

    pub fn is_busy(&self) -> bool {
        self.state().is_busy()
    }

    /// Counters of the current or last run
    pub fn progress(&self) -> BatchProgress {
        self.state.lock().progress
    }

    pub fn cancel_handle(&self) -> BatchCanceller {
        BatchCanceller {
            state: Arc::clone(&self.state),
        }
    }

    /// Request cancellation of the running batch
    pub fn cancel(&self) -> Result<(), SessionError> {
        self.cancel_handle().cancel()
    }

    pub async fn start(&self) -> Result<BatchProgress, SessionError> {
        self.start_with_progress(|_| {}).await
    }

    /// Translate the range, reporting counters after every item.
    ///
    /// Cancellation is observed before each item; items not reached stay
    /// pending. A failing or panicking item is counted and the batch goes on.
    pub async fn start_with_progress<F>(&self, mut on_progress: F) -> Result<BatchProgress, SessionError>
    where
        F: FnMut(&BatchProgress) + Send,
    {
        let (range, cancel) = {
            let mut state = self.state.lock();
            if state.state.is_busy() {
                return Err(SessionError::Busy);
            }
            let range = self.range()?;
            let cancel = CancellationToken::new();
            state.state = SessionState::Busy;
            state.progress = BatchProgress::new(range.len());
            state.cancel = Some(cancel.clone());
            (range, cancel)
        };
        info!(
            "Starting batch translation of items {}..={} ({} items)",
            range.start,
            range.end,
            range.len()
        );

        for index in range.indices() {
            if cancel.is_cancelled() {
                info!("Batch translation cancelled before item {}", index);
                break;
            }

            let text = self.items.read().get(index).map(|item| item.text.clone());
            let outcome = match text {
                Some(text) => {
                    let request = self.template.for_text(text);
                    AssertUnwindSafe(self.router.translate(&request, &cancel))
                        .catch_unwind()
                        .await
                }
                None => Ok(Err(TranslationFailure::LegacyTranslator {
                    translator: None,
                    message: format!("item {} was removed from the collection", index),
                })),
            };

            let snapshot = {
                let mut state = self.state.lock();
                match outcome {
                    Ok(Ok(routed)) => {
                        if let Some(item) = self.items.write().get_mut(index) {
                            item.text = routed.text;
                        }
                        if let Some(status) = &routed.fallback {
                            debug!("Item {}: {}", index, status);
                        }
                        state.progress.record_success();
                    }
                    Ok(Err(TranslationFailure::Cancelled)) => {
                        info!("Batch translation cancelled during item {}", index);
                        break;
                    }
                    Ok(Err(failure)) => {
                        warn!("Item {} failed: {}", index, failure);
                        state.progress.record_failure();
                    }
                    Err(_) => {
                        error!("Item {} panicked during translation", index);
                        state.progress.record_failure();
                    }
                }
                state.progress
            };
            on_progress(&snapshot);
        }

        let mut state = self.state.lock();
        state.state = SessionState::Idle;
        state.cancel = None;
        info!(
            "Batch translation finished: {} succeeded, {} failed, {} pending",
            state.progress.success_count, state.progress.failure_count, state.progress.pending_count
        );
        Ok(state.progress)
    }
}

impl Drop for BatchTranslationSession {
    fn drop(&mut self) {
        if let Some(token) = self.state.lock().cancel.take() {
            token.cancel();
        }
    }
}
