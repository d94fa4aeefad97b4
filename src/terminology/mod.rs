/*!
 * Terminology support for provider prompts.
 *
 * - `model`: terminology packs, entries and style guides
 * - `loader`: delimited and markdown source parsing
 * - `prompt`: deterministic prompt composition
 * - `cache`: modification-time aware source cache
 */

pub use self::cache::TerminologyCache;
pub use self::loader::{TerminologyFormat, TerminologyLoader, TerminologySource};
pub use self::model::{StyleGuide, StyleGuideSection, TermMode, TerminologyEntry, TerminologyPack};
pub use self::prompt::{TerminologyPrompt, TerminologyPromptBuilder};

pub mod cache;
pub mod loader;
pub mod model;
pub mod prompt;
