use anyhow::{Context, Result, anyhow};
use chrono::Local;
use log::{debug, info};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

// @module: String tables and the collaborators that read, write and back them up

/// One localizable string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringItem {
    // @field: Stable tracking id, generated when absent
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    // @field: Lookup key used by the game
    pub key: String,

    // @field: Current text, replaced in place by translation
    pub text: String,
}

impl StringItem {
    pub fn new(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            key: key.into(),
            text: text.into(),
        }
    }
}

/// Item collection shared between a caller and its translation sessions
pub type SharedItems = Arc<RwLock<Vec<StringItem>>>;

/// Wrap items for sharing with a session
pub fn shared_items(items: Vec<StringItem>) -> SharedItems {
    Arc::new(RwLock::new(items))
}

/// Where and how a string table is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializeContext {
    pub path: PathBuf,
    pub source_language: Option<String>,
    pub target_language: Option<String>,
}

impl SerializeContext {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            source_language: None,
            target_language: None,
        }
    }

    pub fn with_languages(mut self, source_language: impl Into<String>, target_language: impl Into<String>) -> Self {
        self.source_language = Some(source_language.into());
        self.target_language = Some(target_language.into());
        self
    }
}

/// Reads and writes string tables in one file format
pub trait StringTableSerializer: Send + Sync {
    // @returns: Items in file order
    fn deserialize(&self, path: &Path) -> Result<Vec<StringItem>>;

    fn serialize(&self, items: &[StringItem], context: &SerializeContext) -> Result<()>;
}

/// Takes a copy of a file before it is overwritten
pub trait BackupService: Send + Sync {
    // @returns: Path of the backup, or None if there was nothing to back up
    fn backup(&self, path: &Path) -> Result<Option<PathBuf>>;
}

#[derive(Debug, Serialize, Deserialize)]
struct StringTableDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target_language: Option<String>,
    strings: Vec<StringItem>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StringTableFile {
    Document(StringTableDocument),
    Items(Vec<StringItem>),
}

/// JSON string tables: either a bare array of items or `{ "strings": [...] }`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonStringTable;

impl StringTableSerializer for JsonStringTable {
    fn deserialize(&self, path: &Path) -> Result<Vec<StringItem>> {
        let content = fs::read_to_string(path).with_context(|| format!("Failed to read string table: {:?}", path))?;
        let file: StringTableFile =
            serde_json::from_str(&content).with_context(|| format!("Failed to parse string table: {:?}", path))?;
        let items = match file {
            StringTableFile::Document(document) => document.strings,
            StringTableFile::Items(items) => items,
        };
        debug!("Loaded {} strings from {:?}", items.len(), path);
        Ok(items)
    }

    fn serialize(&self, items: &[StringItem], context: &SerializeContext) -> Result<()> {
        let document = StringTableDocument {
            source_language: context.source_language.clone(),
            target_language: context.target_language.clone(),
            strings: items.to_vec(),
        };
        let content = serde_json::to_string_pretty(&document)?;
        if let Some(parent) = context.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&context.path, content)
            .with_context(|| format!("Failed to write string table: {:?}", context.path))?;
        Ok(())
    }
}

/// Copies a file to `<name>.<timestamp>.bak` before it is replaced
#[derive(Debug, Clone, Default)]
pub struct TimestampedBackup {
    // @field: Directory for backups, next to the original when unset
    directory: Option<PathBuf>,
}

impl TimestampedBackup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_directory(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: Some(directory.into()),
        }
    }

    fn backup_path(&self, path: &Path) -> Result<PathBuf> {
        let file_name = path
            .file_name()
            .ok_or_else(|| anyhow!("Cannot back up a path without a file name: {:?}", path))?;
        let directory = match &self.directory {
            Some(directory) => directory.clone(),
            None => path.parent().map(Path::to_path_buf).unwrap_or_default(),
        };

        let timestamp = Local::now().format("%Y%m%d-%H%M%S");
        let stem = format!("{}.{}", file_name.to_string_lossy(), timestamp);
        let mut candidate = directory.join(format!("{}.bak", stem));
        let mut counter = 1;
        while candidate.exists() {
            candidate = directory.join(format!("{}-{}.bak", stem, counter));
            counter += 1;
        }
        Ok(candidate)
    }
}

impl BackupService for TimestampedBackup {
    fn backup(&self, path: &Path) -> Result<Option<PathBuf>> {
        if !path.is_file() {
            return Ok(None);
        }
        let target = self.backup_path(path)?;
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::copy(path, &target).with_context(|| format!("Failed to back up {:?} to {:?}", path, target))?;
        info!("Backed up {:?} to {:?}", path, target);
        Ok(Some(target))
    }
}
