use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::errors::{SessionError, TranslationFailure};
use crate::string_table::{SharedItems, StringItem};
use crate::translation::{RoutedTranslation, TranslationRouter, TranslationRouterRequest};

/// In-progress translation of the current item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationDraft {
    /// Tracking id of the item the draft belongs to
    pub id: Uuid,
    pub text: String,
    pub translated_text: String,
    pub saved: bool,
}

impl TranslationDraft {
    pub fn from_item(item: &StringItem) -> Self {
        Self {
            id: item.id,
            text: item.text.clone(),
            translated_text: String::new(),
            saved: false,
        }
    }

    pub fn has_translation(&self) -> bool {
        !self.translated_text.trim().is_empty()
    }

    /// A translation exists that has not been written back
    pub fn is_unsaved(&self) -> bool {
        !self.saved && self.has_translation()
    }
}

/// Asks whether an unsaved draft should be saved before navigating away
#[async_trait]
pub trait NavigationGuard: Send + Sync {
    async fn confirm_autosave(&self, draft: &TranslationDraft) -> bool;
}

/// Guard that always gives the same answer
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

#[async_trait]
impl NavigationGuard for FixedAnswer {
    async fn confirm_autosave(&self, _draft: &TranslationDraft) -> bool {
        self.0
    }
}

/// Receives notices meant for the user
pub trait SessionNotifier: Send + Sync {
    fn already_translated(&self, draft: &TranslationDraft);
    fn translation_failed(&self, message: &str);
}

/// Notifier that writes notices to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl SessionNotifier for LogNotifier {
    fn already_translated(&self, draft: &TranslationDraft) {
        info!("Item {} is already translated; save or navigate to continue", draft.id);
    }

    fn translation_failed(&self, message: &str) {
        warn!("Translation failed: {}", message);
    }
}

/// Result of a `translate` command
#[derive(Debug, Clone, PartialEq)]
pub enum TranslateOutcome {
    Translated(RoutedTranslation),
    /// The draft already had a translation, nothing was sent
    AlreadyTranslated,
    Failed(TranslationFailure),
    Cancelled,
}

#[derive(Debug)]
struct SingleState {
    index: usize,
    draft: TranslationDraft,
    busy: bool,
    cancel: Option<CancellationToken>,
}

/// Translates one item at a time with forward and back navigation
pub struct SingleItemTranslationSession {
    router: Arc<TranslationRouter>,
    items: SharedItems,
    template: TranslationRouterRequest,
    guard: Arc<dyn NavigationGuard>,
    notifier: Arc<dyn SessionNotifier>,
    state: Mutex<SingleState>,
}

impl std::fmt::Debug for SingleItemTranslationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SingleItemTranslationSession")
            .field("index", &state.index)
            .field("busy", &state.busy)
            .finish()
    }
}

impl SingleItemTranslationSession {
    pub fn new(
        router: Arc<TranslationRouter>,
        items: SharedItems,
        start_index: usize,
        template: TranslationRouterRequest,
    ) -> Result<Self, SessionError> {
        let draft = {
            let collection = items.read();
            if collection.is_empty() {
                return Err(SessionError::EmptyCollection);
            }
            let item = collection.get(start_index).ok_or(SessionError::IndexOutOfRange {
                index: start_index,
                len: collection.len(),
            })?;
            TranslationDraft::from_item(item)
        };

        Ok(Self {
            router,
            items,
            template,
            guard: Arc::new(FixedAnswer(true)),
            notifier: Arc::new(LogNotifier),
            state: Mutex::new(SingleState {
                index: start_index,
                draft,
                busy: false,
                cancel: None,
            }),
        })
    }

    pub fn with_guard(mut self, guard: Arc<dyn NavigationGuard>) -> Self {
        self.guard = guard;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn SessionNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn current_index(&self) -> usize {
        self.state.lock().index
    }

    pub fn draft(&self) -> TranslationDraft {
        self.state.lock().draft.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.state.lock().busy
    }

    /// Move to another item, replacing the draft
    pub fn set_current_index(&self, index: usize) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        if state.busy {
            return Err(SessionError::Busy);
        }
        let items = self.items.read();
        let item = items.get(index).ok_or(SessionError::IndexOutOfRange {
            index,
            len: items.len(),
        })?;
        state.draft = TranslationDraft::from_item(item);
        state.index = index;
        Ok(())
    }

    /// Translate the current draft
    pub async fn translate(&self) -> Result<TranslateOutcome, SessionError> {
        let (request, cancel) = {
            let mut state = self.state.lock();
            if state.busy {
                return Err(SessionError::Busy);
            }
            if state.draft.has_translation() {
                self.notifier.already_translated(&state.draft);
                return Ok(TranslateOutcome::AlreadyTranslated);
            }
            let cancel = CancellationToken::new();
            state.busy = true;
            state.cancel = Some(cancel.clone());
            (self.template.for_text(state.draft.text.clone()), cancel)
        };

        let outcome = self.router.translate(&request, &cancel).await;

        let mut state = self.state.lock();
        state.busy = false;
        state.cancel = None;
        Ok(match outcome {
            Ok(routed) => {
                state.draft.translated_text = routed.text.clone();
                state.draft.saved = false;
                TranslateOutcome::Translated(routed)
            }
            Err(TranslationFailure::Cancelled) => TranslateOutcome::Cancelled,
            Err(failure) => {
                self.notifier.translation_failed(&failure.to_string());
                TranslateOutcome::Failed(failure)
            }
        })
    }

    /// Request cancellation of the running translation
    pub fn cancel(&self) -> Result<(), SessionError> {
        let state = self.state.lock();
        match (&state.cancel, state.busy) {
            (Some(token), true) => {
                token.cancel();
                Ok(())
            }
            _ => Err(SessionError::NotBusy),
        }
    }

    /// Write the draft's translation back into its item
    pub fn save(&self) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        if state.busy {
            return Err(SessionError::Busy);
        }
        Self::save_locked(&self.items, &mut state)
    }

    fn save_locked(items: &SharedItems, state: &mut SingleState) -> Result<(), SessionError> {
        if !state.draft.has_translation() {
            return Err(SessionError::NothingToSave);
        }
        let mut items = items.write();
        let len = items.len();
        let item = items
            .iter_mut()
            .find(|item| item.id == state.draft.id)
            .ok_or(SessionError::IndexOutOfRange { index: state.index, len })?;
        item.text = state.draft.translated_text.clone();
        state.draft.saved = true;
        Ok(())
    }

    pub fn can_next(&self) -> bool {
        let state = self.state.lock();
        !state.busy && state.index + 1 < self.items.read().len()
    }

    pub fn can_previous(&self) -> bool {
        let state = self.state.lock();
        !state.busy && state.index > 0
    }

    /// Move to the next item, offering to save an unsaved draft first
    pub async fn next(&self) -> Result<usize, SessionError> {
        let target = {
            let state = self.state.lock();
            if state.busy {
                return Err(SessionError::Busy);
            }
            if state.index + 1 >= self.items.read().len() {
                return Err(SessionError::AtBoundary("last"));
            }
            state.index + 1
        };
        self.navigate(target).await
    }

    /// Move to the previous item, offering to save an unsaved draft first
    pub async fn previous(&self) -> Result<usize, SessionError> {
        let target = {
            let state = self.state.lock();
            if state.busy {
                return Err(SessionError::Busy);
            }
            if state.index == 0 {
                return Err(SessionError::AtBoundary("first"));
            }
            state.index - 1
        };
        self.navigate(target).await
    }

    async fn navigate(&self, target: usize) -> Result<usize, SessionError> {
        let draft = self.draft();
        if draft.is_unsaved() && self.guard.confirm_autosave(&draft).await {
            let mut state = self.state.lock();
            if state.busy {
                return Err(SessionError::Busy);
            }
            Self::save_locked(&self.items, &mut state)?;
        }
        self.set_current_index(target)?;
        Ok(target)
    }
}

impl Drop for SingleItemTranslationSession {
    fn drop(&mut self) {
        if let Some(token) = self.state.lock().cancel.take() {
            token.cancel();
        }
    }
}
