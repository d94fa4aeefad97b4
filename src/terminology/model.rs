/*!
 * Terminology records shared by the loader and the prompt builder.
 */

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// How a terminology entry constrains the translation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermMode {
    /// The term must be translated as given
    Required,
    /// The term must not appear in the translation
    Forbidden,
    /// Any other tag found in the source file
    Other(String),
}

impl TermMode {
    /// Parse a mode tag; blank tags yield `None`
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        match trimmed.to_lowercase().as_str() {
            "required" => Some(Self::Required),
            "forbidden" => Some(Self::Forbidden),
            _ => Some(Self::Other(trimmed.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Required => "required",
            Self::Forbidden => "forbidden",
            Self::Other(tag) => tag,
        }
    }
}

/// A single term and its expected translation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminologyEntry {
    pub term: String,
    pub translation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<TermMode>,
}

impl TerminologyEntry {
    pub fn new(term: impl Into<String>, translation: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            translation: translation.into(),
            notes: None,
            mode: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        let notes = notes.into();
        self.notes = if notes.trim().is_empty() { None } else { Some(notes) };
        self
    }

    pub fn with_mode(mut self, mode: TermMode) -> Self {
        self.mode = Some(mode);
        self
    }
}

/// Read-only snapshot of a terminology source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TerminologyPack {
    pub name: String,
    pub source_path: PathBuf,
    pub entries: Vec<TerminologyEntry>,
}

impl TerminologyPack {
    pub fn new(name: impl Into<String>, source_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source_path: source_path.into(),
            entries: Vec::new(),
        }
    }

    pub fn with_entries(mut self, entries: Vec<TerminologyEntry>) -> Self {
        self.entries = entries;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Concatenate several packs into one, keeping every entry in order.
    ///
    /// No deduplication happens here: the merged pack holds exactly the sum
    /// of the input entry counts.
    pub fn merge(packs: &[TerminologyPack]) -> TerminologyPack {
        let name = packs
            .iter()
            .map(|p| p.name.as_str())
            .filter(|n| !n.is_empty())
            .collect::<Vec<_>>()
            .join(" + ");
        let source_path = match packs {
            [single] => single.source_path.clone(),
            _ => PathBuf::new(),
        };
        let entries = packs.iter().flat_map(|p| p.entries.iter().cloned()).collect();
        TerminologyPack {
            name,
            source_path,
            entries,
        }
    }
}

/// A named section of a style guide with its raw rule lines
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleGuideSection {
    pub name: String,
    pub rules: Vec<String>,
}

/// Structured style-guide rules plus the term lists derived from them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleGuide {
    pub name: String,
    pub source_path: PathBuf,
    pub sections: Vec<StyleGuideSection>,
    pub required_terms: Vec<String>,
    pub forbidden_terms: Vec<String>,
    pub tone_notes: Vec<String>,
}

impl StyleGuide {
    /// Synthesize a terminology pack from the derived term lists.
    ///
    /// Required terms translate to themselves, forbidden terms carry an empty
    /// translation. Terms are deduplicated case-insensitively across both
    /// lists and the first occurrence wins.
    pub fn to_terminology_pack(&self) -> TerminologyPack {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for term in &self.required_terms {
            if seen.insert(term.to_lowercase()) {
                entries.push(TerminologyEntry::new(term.clone(), term.clone()).with_mode(TermMode::Required));
            }
        }
        for term in &self.forbidden_terms {
            if seen.insert(term.to_lowercase()) {
                entries.push(TerminologyEntry::new(term.clone(), String::new()).with_mode(TermMode::Forbidden));
            }
        }

        TerminologyPack {
            name: self.name.clone(),
            source_path: self.source_path.clone(),
            entries,
        }
    }

    pub fn section(&self, name: &str) -> Option<&StyleGuideSection> {
        self.sections.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }
}

/// Derive a display name for a source from its file stem
pub(crate) fn name_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}
