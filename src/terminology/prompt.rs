/*!
 * Terminology prompt composition.
 *
 * Turns terminology packs into prompt text for providers. Output must be
 * byte-identical for identical inputs, so entries are sorted with a stable
 * case-insensitive ordering and formatting never depends on map iteration.
 */

use serde::{Deserialize, Serialize};

use super::model::{TerminologyEntry, TerminologyPack};

const SYSTEM_PREAMBLE: &str = "Use the following terminology when translating. \
Entries marked required must be translated exactly as listed. \
Entries marked forbidden must not appear in the translation.";

const USER_REMINDER: &str = "Apply the terminology rules from the instructions to the following text.";

/// Prompt fragments that carry terminology constraints to a provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminologyPrompt {
    pub system_prompt: Option<String>,
    pub user_prompt: Option<String>,
}

impl TerminologyPrompt {
    /// An empty prompt means there is nothing to attach
    pub fn is_empty(&self) -> bool {
        self.system_prompt.as_deref().is_none_or(str::is_empty)
            && self.user_prompt.as_deref().is_none_or(str::is_empty)
    }
}

/// Builder for terminology prompts
pub struct TerminologyPromptBuilder;

impl TerminologyPromptBuilder {
    /// Build a prompt from a terminology pack and a style-guide pack.
    ///
    /// Returns an empty prompt when both inputs are absent or empty.
    pub fn build(terminology: Option<&TerminologyPack>, style_guide: Option<&TerminologyPack>) -> TerminologyPrompt {
        Self::build_with_tone_notes(terminology, style_guide, &[])
    }

    /// Build a prompt and append style-guide tone notes to the instructions
    pub fn build_with_tone_notes(
        terminology: Option<&TerminologyPack>,
        style_guide: Option<&TerminologyPack>,
        tone_notes: &[String],
    ) -> TerminologyPrompt {
        let mut blocks = Vec::new();
        if let Some(block) = terminology.and_then(|p| render_block("Terminology", p)) {
            blocks.push(block);
        }
        if let Some(block) = style_guide.and_then(|p| render_block("Style guide terms", p)) {
            blocks.push(block);
        }

        if blocks.is_empty() {
            return TerminologyPrompt::default();
        }

        if !tone_notes.is_empty() {
            let mut tone = String::from("Tone:");
            for note in tone_notes {
                tone.push_str("\n- ");
                tone.push_str(note);
            }
            blocks.push(tone);
        }

        let system_prompt = format!("{}\n\n{}", SYSTEM_PREAMBLE, blocks.join("\n\n"));
        TerminologyPrompt {
            system_prompt: Some(system_prompt),
            user_prompt: Some(USER_REMINDER.to_string()),
        }
    }
}

fn render_block(label: &str, pack: &TerminologyPack) -> Option<String> {
    if pack.is_empty() {
        return None;
    }

    let mut entries: Vec<&TerminologyEntry> = pack.entries.iter().collect();
    entries.sort_by_cached_key(|e| e.term.to_lowercase());

    let mut block = if pack.name.is_empty() {
        format!("{}:", label)
    } else {
        format!("{} ({}):", label, pack.name)
    };
    for entry in entries {
        block.push('\n');
        block.push_str(&render_entry(entry));
    }
    Some(block)
}

fn render_entry(entry: &TerminologyEntry) -> String {
    let mut details = Vec::new();
    if let Some(mode) = &entry.mode {
        details.push(format!("mode: {}", mode.as_str()));
    }
    if let Some(notes) = &entry.notes {
        details.push(format!("notes: {}", notes));
    }

    if details.is_empty() {
        format!("- {} => {}", entry.term, entry.translation)
    } else {
        format!("- {} => {} ({})", entry.term, entry.translation, details.join("; "))
    }
}
