/*!
 * Translation sessions.
 *
 * A session drives the router over a shared string-item collection and
 * allows one operation in flight at a time. Each operation gets a fresh
 * cancellation token; cancelling a session never affects another one.
 *
 * - `batch`: sequential translation over an index range with counters
 * - `single`: one item at a time with navigation and unsaved-draft guarding
 */

pub use self::batch::{BatchCanceller, BatchProgress, BatchRange, BatchTranslationSession};
pub use self::single::{
    FixedAnswer, LogNotifier, NavigationGuard, SessionNotifier, SingleItemTranslationSession, TranslateOutcome,
    TranslationDraft,
};

pub mod batch;
pub mod single;

/// Lifecycle of one session operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Busy,
    /// Cancellation was requested and the running operation has not yet stopped
    Cancelling,
}

impl SessionState {
    pub fn is_busy(self) -> bool {
        !matches!(self, Self::Idle)
    }
}
