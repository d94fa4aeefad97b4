/*!
 * Terminology and style-guide file loading.
 *
 * Delimited files (`.csv`, `.tsv`) become terminology packs. Markdown files
 * (`.md`, `.markdown`) become style guides, whose required and forbidden
 * term lists can themselves be turned into a pack.
 */

use std::fs;
use std::path::Path;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::TerminologyError;

use super::model::{
    name_from_path, StyleGuide, StyleGuideSection, TermMode, TerminologyEntry, TerminologyPack,
};

static HEADING_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s{0,3}#{1,6}\s*(.*?)\s*#*\s*$").expect("valid heading pattern"));

static BULLET_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[-*\x{2022}]\s+(.*)$").expect("valid bullet pattern"));

const RECOGNIZED_COLUMNS: [&str; 4] = ["term", "translation", "notes", "mode"];

const QUOTE_CHARS: &[char] = &['"', '\'', '`', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}', '\u{AB}', '\u{BB}'];

/// Terminology file formats, detected from the extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminologyFormat {
    Csv,
    Tsv,
    Markdown,
}

impl TerminologyFormat {
    /// Detect the format of a path from its extension
    pub fn from_path(path: &Path) -> Result<Self, TerminologyError> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "csv" => Ok(Self::Csv),
            "tsv" => Ok(Self::Tsv),
            "md" | "markdown" => Ok(Self::Markdown),
            _ => Err(TerminologyError::UnsupportedFormat(if extension.is_empty() {
                path.display().to_string()
            } else {
                format!(".{}", extension)
            })),
        }
    }

    fn delimiter(self) -> Option<u8> {
        match self {
            Self::Csv => Some(b','),
            Self::Tsv => Some(b'\t'),
            Self::Markdown => None,
        }
    }
}

/// Result of loading a terminology source
#[derive(Debug, Clone, PartialEq)]
pub enum TerminologySource {
    Pack(TerminologyPack),
    StyleGuide(StyleGuide),
}

impl TerminologySource {
    /// View the source as a terminology pack
    pub fn into_pack(self) -> TerminologyPack {
        match self {
            Self::Pack(pack) => pack,
            Self::StyleGuide(guide) => guide.to_terminology_pack(),
        }
    }
}

/// Column positions for a delimited terminology file
#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    term: Option<usize>,
    translation: Option<usize>,
    notes: Option<usize>,
    mode: Option<usize>,
}

impl ColumnMap {
    fn positional() -> Self {
        Self {
            term: Some(0),
            translation: Some(1),
            notes: Some(2),
            mode: Some(3),
        }
    }

    /// Interpret a row as a header if any cell names a recognized column
    fn from_header(record: &csv::StringRecord) -> Option<Self> {
        let names: Vec<String> = record.iter().map(|c| c.trim().to_lowercase()).collect();
        if !names.iter().any(|n| RECOGNIZED_COLUMNS.contains(&n.as_str())) {
            return None;
        }
        let position = |column: &str| names.iter().position(|n| n == column);
        Some(Self {
            term: position("term"),
            translation: position("translation"),
            notes: position("notes"),
            mode: position("mode"),
        })
    }
}

/// Loader for terminology packs and style guides
pub struct TerminologyLoader;

impl TerminologyLoader {
    /// Load any supported terminology source
    pub fn load(path: impl AsRef<Path>) -> Result<TerminologySource, TerminologyError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(TerminologyError::NotFound(path.to_path_buf()));
        }

        let format = TerminologyFormat::from_path(path)?;
        let content = fs::read_to_string(path)?;
        let name = name_from_path(path);

        let source = match format.delimiter() {
            Some(delimiter) => TerminologySource::Pack(Self::parse_delimited(&content, delimiter, &name, path)?),
            None => TerminologySource::StyleGuide(Self::parse_style_guide(&content, &name, path)),
        };
        debug!("Loaded terminology source {}", path.display());
        Ok(source)
    }

    /// Load a source as a pack; style guides contribute their derived terms
    pub fn load_pack(path: impl AsRef<Path>) -> Result<TerminologyPack, TerminologyError> {
        Self::load(path).map(TerminologySource::into_pack)
    }

    /// Load a markdown style guide
    pub fn load_style_guide(path: impl AsRef<Path>) -> Result<StyleGuide, TerminologyError> {
        let path = path.as_ref();
        match Self::load(path)? {
            TerminologySource::StyleGuide(guide) => Ok(guide),
            TerminologySource::Pack(_) => Err(TerminologyError::UnsupportedFormat(format!(
                "{} is not a markdown style guide",
                path.display()
            ))),
        }
    }

    /// Parse delimited terminology content.
    ///
    /// The first non-blank row is a header when it names any recognized
    /// column; otherwise columns are positional. Rows with a blank term are
    /// skipped.
    pub fn parse_delimited(
        content: &str,
        delimiter: u8,
        name: &str,
        source_path: &Path,
    ) -> Result<TerminologyPack, TerminologyError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(content.as_bytes());

        let mut columns: Option<ColumnMap> = None;
        let mut entries = Vec::new();

        for record in reader.records() {
            let record = record?;
            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }

            let map = match columns {
                Some(map) => map,
                None => {
                    let header = ColumnMap::from_header(&record);
                    columns = Some(header.unwrap_or_else(ColumnMap::positional));
                    if header.is_some() {
                        continue;
                    }
                    ColumnMap::positional()
                }
            };

            let cell = |index: Option<usize>| {
                index
                    .and_then(|i| record.get(i))
                    .map(|c| c.trim().to_string())
                    .unwrap_or_default()
            };

            let term = cell(map.term);
            if term.is_empty() {
                continue;
            }

            let mut entry = TerminologyEntry::new(term, cell(map.translation)).with_notes(cell(map.notes));
            if let Some(mode) = TermMode::parse(&cell(map.mode)) {
                entry = entry.with_mode(mode);
            }
            entries.push(entry);
        }

        Ok(TerminologyPack {
            name: name.to_string(),
            source_path: source_path.to_path_buf(),
            entries,
        })
    }

    /// Parse markdown style-guide content.
    pub fn parse_style_guide(content: &str, name: &str, source_path: &Path) -> StyleGuide {
        let mut guide = StyleGuide {
            name: name.to_string(),
            source_path: source_path.to_path_buf(),
            ..Default::default()
        };
        let mut current_kind = SectionKind::Unrecognized;

        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }

            if let Some(caps) = HEADING_PATTERN.captures(line) {
                let heading = caps.get(1).map(|m| m.as_str()).unwrap_or_default().to_string();
                current_kind = SectionKind::classify(&heading);
                guide.sections.push(StyleGuideSection {
                    name: heading,
                    rules: Vec::new(),
                });
                continue;
            }

            if guide.sections.is_empty() {
                guide.sections.push(StyleGuideSection {
                    name: "General".to_string(),
                    rules: Vec::new(),
                });
            }

            let bullet = BULLET_PATTERN
                .captures(line)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string());
            let rule = bullet.clone().unwrap_or_else(|| line.trim().to_string());
            if let Some(section) = guide.sections.last_mut() {
                section.rules.push(rule);
            }

            let Some(bullet) = bullet else {
                continue;
            };
            match current_kind {
                SectionKind::Required => guide.required_terms.extend(extract_terms(&bullet)),
                SectionKind::Forbidden => guide.forbidden_terms.extend(extract_terms(&bullet)),
                SectionKind::Tone => guide.tone_notes.push(bullet),
                SectionKind::Unrecognized => {}
            }
        }

        guide
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionKind {
    Required,
    Forbidden,
    Tone,
    Unrecognized,
}

impl SectionKind {
    fn classify(heading: &str) -> Self {
        let lower = heading.to_lowercase();
        if lower.contains("required") {
            Self::Required
        } else if lower.contains("forbidden") {
            Self::Forbidden
        } else if lower.contains("tone") {
            Self::Tone
        } else {
            Self::Unrecognized
        }
    }
}

/// Split a bullet into its primary terms
fn extract_terms(bullet: &str) -> Vec<String> {
    bullet
        .split(';')
        .map(|part| part.trim().trim_matches(QUOTE_CHARS).trim().to_string())
        .filter(|term| !term.is_empty())
        .collect()
}
