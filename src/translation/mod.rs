/*!
 * Translation routing and execution.
 *
 * - `models`: request, result and fallback value objects
 * - `router`: entry point that validates and routes each request
 * - `legacy_router`: provider invocation with terminology and fallback
 * - `memory`: translation memory consulted when a context enables it
 */

pub use self::legacy_router::{LegacyTranslationRouter, TerminologyAttachment};
pub use self::memory::{MemoryEntry, MemoryRoute, TranslationMemory};
pub use self::models::{
    FallbackReason, FallbackStatus, RoutedTranslation, TranslationPipelineContext, TranslationRequest,
    TranslationResult, TranslationRouterRequest,
};
pub use self::router::{ResolvedRoute, TranslationRouter};

pub mod legacy_router;
pub mod memory;
pub mod models;
pub mod router;
