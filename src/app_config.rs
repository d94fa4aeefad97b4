use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use crate::translation::TranslationPipelineContext;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO)
    pub source_language: String,

    /// Target language code (ISO)
    pub target_language: String,

    /// Routing preferences
    #[serde(default)]
    pub settings: TranslationSettings,

    /// Provider registrations, in registration order
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderConfig>,

    /// Legacy translators, in fallback order
    #[serde(default)]
    pub legacy_translators: Vec<LegacyTranslatorConfig>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Provider implementation type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    // @provider: Ollama
    #[default]
    Ollama,
    // @provider: OpenAI
    OpenAI,
    // @provider: Anthropic
    Anthropic,
    // @provider: LM Studio (OpenAI-compatible local server)
    LMStudio,
}

impl ProviderKind {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Ollama => "Ollama",
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::LMStudio => "LM Studio",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Ollama => "ollama".to_string(),
            Self::OpenAI => "openai".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::LMStudio => "lmstudio".to_string(),
        }
    }

    // @returns: Whether the provider is hosted and needs an API key
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenAI | Self::Anthropic)
    }
}

// Implement Display trait for ProviderKind
impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

// Implement FromStr trait for ProviderKind
impl std::str::FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "lmstudio" => Ok(Self::LMStudio),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub kind: ProviderKind,

    // @field: Registration name, defaults to the display name
    #[serde(default)]
    pub name: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Retry count for failed requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    // @field: Base backoff in milliseconds, doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    // @field: Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    // @field: Max tokens for providers that require it
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl ProviderConfig {
    // @param kind: Provider enum
    // @returns: Provider config with defaults
    pub fn new(kind: ProviderKind) -> Self {
        let (endpoint, timeout_secs) = match kind {
            ProviderKind::Ollama => (default_ollama_endpoint(), default_timeout_secs()),
            ProviderKind::OpenAI => (default_openai_endpoint(), default_timeout_secs()),
            ProviderKind::Anthropic => (default_anthropic_endpoint(), default_anthropic_timeout_secs()),
            ProviderKind::LMStudio => (default_lmstudio_endpoint(), default_timeout_secs()),
        };
        Self {
            kind,
            name: kind.display_name().to_string(),
            api_key: String::new(),
            endpoint,
            timeout_secs,
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }

    /// Registration name, falling back to the kind's display name
    pub fn registration_name(&self) -> String {
        if self.name.trim().is_empty() {
            self.kind.display_name().to_string()
        } else {
            self.name.trim().to_string()
        }
    }

    /// Endpoint, falling back to the kind's default endpoint
    pub fn effective_endpoint(&self) -> String {
        if !self.endpoint.is_empty() {
            return self.endpoint.clone();
        }
        match self.kind {
            ProviderKind::Ollama => default_ollama_endpoint(),
            ProviderKind::OpenAI => default_openai_endpoint(),
            ProviderKind::Anthropic => default_anthropic_endpoint(),
            ProviderKind::LMStudio => default_lmstudio_endpoint(),
        }
    }
}

/// Legacy translator implementation type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LegacyTranslatorKind {
    #[default]
    LibreTranslate,
}

/// Legacy translator configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LegacyTranslatorConfig {
    #[serde(rename = "type", default)]
    pub kind: LegacyTranslatorKind,

    /// Name the translator is addressed by in settings
    pub name: String,

    #[serde(default = "default_libretranslate_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Target languages the translator accepts; empty means any
    #[serde(default)]
    pub languages: Vec<String>,
}

/// Named bundle of provider, model and terminology preferences
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct TranslationProfile {
    pub id: String,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub terminology_paths: Vec<PathBuf>,
    #[serde(default)]
    pub style_guide_path: Option<PathBuf>,
}

/// Routing preferences read by the router on every request
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationSettings {
    /// Provider used when a request does not name one
    #[serde(default)]
    pub provider_name: Option<String>,

    /// Model used when a request does not name one
    #[serde(default)]
    pub model_name: Option<String>,

    /// Base URL passed to the provider when a request does not override it
    #[serde(default)]
    pub base_url: Option<String>,

    /// Active profile
    #[serde(default)]
    pub profile_id: Option<String>,

    /// Preferred legacy translator
    #[serde(default)]
    pub translator_name: Option<String>,

    /// Whether sessions consult translation memory
    #[serde(default)]
    pub use_translation_memory: bool,

    /// Upper bound for a single provider call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// System prompt template for providers
    /// Placeholders: {source_language}, {target_language}
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    #[serde(default)]
    pub profiles: Vec<TranslationProfile>,
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            provider_name: None,
            model_name: None,
            base_url: None,
            profile_id: None,
            translator_name: None,
            use_translation_memory: false,
            request_timeout_secs: default_request_timeout_secs(),
            system_prompt: default_system_prompt(),
            profiles: Vec::new(),
        }
    }
}

impl TranslationSettings {
    /// The active profile, if the profile id names a configured one
    pub fn active_profile(&self) -> Option<&TranslationProfile> {
        self.profile(self.profile_id.as_deref()?)
    }

    /// Look up a profile by id, ignoring case
    pub fn profile(&self, id: &str) -> Option<&TranslationProfile> {
        let id = non_blank(Some(id))?;
        self.profiles.iter().find(|p| p.id.eq_ignore_ascii_case(id))
    }

    /// Provider name from the active profile or the settings
    pub fn default_provider(&self) -> Option<String> {
        self.active_profile()
            .and_then(|p| non_blank(p.provider.as_deref()))
            .or_else(|| non_blank(self.provider_name.as_deref()))
            .map(str::to_string)
    }

    /// Model name from the active profile or the settings
    pub fn default_model(&self) -> Option<String> {
        self.active_profile()
            .and_then(|p| non_blank(p.model.as_deref()))
            .or_else(|| non_blank(self.model_name.as_deref()))
            .map(str::to_string)
    }

    /// Build the pipeline context for a translation session.
    ///
    /// Terminology paths from the active profile come first, followed by
    /// `extra_terminology` in the given order.
    pub fn pipeline_context(&self, extra_terminology: &[PathBuf]) -> TranslationPipelineContext {
        let profile = self.active_profile();
        let mut terminology_paths: Vec<PathBuf> =
            profile.map(|p| p.terminology_paths.clone()).unwrap_or_default();
        terminology_paths.extend(extra_terminology.iter().cloned());

        TranslationPipelineContext {
            profile_id: profile.map(|p| p.id.clone()),
            provider_id: self.default_provider(),
            model_id: self.default_model(),
            terminology_paths,
            style_guide_path: profile.and_then(|p| p.style_guide_path.clone()),
            use_translation_memory: self.use_translation_memory,
        }
    }

    /// Render the system prompt template for a language pair
    pub fn render_system_prompt(&self, source_language: &str, target_language: &str) -> String {
        self.system_prompt
            .replace("{source_language}", source_language)
            .replace("{target_language}", target_language)
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig::new(ProviderKind::Ollama),
        ProviderConfig::new(ProviderKind::OpenAI),
        ProviderConfig::new(ProviderKind::Anthropic),
        ProviderConfig::new(ProviderKind::LMStudio),
    ]
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_anthropic_timeout_secs() -> u64 {
    60
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_retry_count() -> u32 {
    3 // Default to 3 retries
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_lmstudio_endpoint() -> String {
    // LM Studio default server (OpenAI compatible) runs on port 1234 under /v1
    "http://localhost:1234/v1".to_string()
}

fn default_libretranslate_endpoint() -> String {
    "http://localhost:5000".to_string()
}

fn default_system_prompt() -> String {
    "You are a professional video game localizer. Translate the following text from {source_language} to {target_language}. Preserve placeholders, markup and line breaks. Reply with the translation only.".to_string()
}

impl Config {
    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let config: Config = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Load a configuration file, writing the defaults first if it is missing
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load(path);
        }
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    /// Save the configuration as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path).with_context(|| format!("Failed to create config file: {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Default location of the configuration file
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("loctext")
            .join("config.json")
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        // Validate languages
        let _source_name = crate::language_utils::get_language_name(&self.source_language)?;
        let _target_name = crate::language_utils::get_language_name(&self.target_language)?;

        // Hosted providers need an API key; only the default provider is fatal
        let default_provider = self.settings.default_provider();
        for provider in &self.providers {
            if provider.kind.requires_api_key() && provider.api_key.is_empty() {
                let name = provider.registration_name();
                if default_provider.as_deref().is_some_and(|d| d.trim().eq_ignore_ascii_case(&name)) {
                    return Err(anyhow!("Translation API key is required for provider '{}'", name));
                }
                log::warn!("Provider '{}' has no API key and will fail when used", name);
            }
        }

        for provider in &self.providers {
            let endpoint = provider.effective_endpoint();
            url::Url::parse(&endpoint).with_context(|| {
                format!("Invalid endpoint for provider '{}': {}", provider.registration_name(), endpoint)
            })?;
        }

        for translator in &self.legacy_translators {
            if translator.name.trim().is_empty() {
                return Err(anyhow!("Legacy translators must have a name"));
            }
            url::Url::parse(&translator.endpoint)
                .with_context(|| format!("Invalid endpoint for translator '{}': {}", translator.name, translator.endpoint))?;
        }

        if let Some(base_url) = non_blank(self.settings.base_url.as_deref()) {
            url::Url::parse(base_url).with_context(|| format!("Invalid base URL: {}", base_url))?;
        }

        if let Some(profile_id) = non_blank(self.settings.profile_id.as_deref()) {
            if self.settings.active_profile().is_none() {
                return Err(anyhow!("Profile '{}' is not defined", profile_id));
            }
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: "en".to_string(),
            target_language: "fr".to_string(),
            settings: TranslationSettings::default(),
            providers: default_providers(),
            legacy_translators: Vec::new(),
            log_level: LogLevel::default(),
        }
    }
}
