/*!
 * Tests for application configuration
 */

use std::path::PathBuf;

use loctext::app_config::{Config, LegacyTranslatorConfig, ProviderConfig, ProviderKind, TranslationProfile};
use loctext::translation::TranslationPipelineContext;

use crate::common;

#[test]
fn test_loadOrCreate_missingFile_shouldWriteDefaults() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("config.json");

    let config = Config::load_or_create(&path).unwrap();
    assert!(path.exists());
    assert_eq!(config.source_language, "en");
    assert_eq!(config.providers.len(), 4);
    assert!(!config.settings.use_translation_memory);
}

#[test]
fn test_load_minimalFile_shouldApplyFieldDefaults() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(
        dir.path(),
        "config.json",
        r#"{
            "source_language": "ja",
            "target_language": "de",
            "providers": [{ "type": "ollama", "name": "Local" }],
            "legacy_translators": [{ "name": "Libre", "languages": ["de", "fr"] }],
            "settings": { "provider_name": "Local", "model_name": "qwen2" }
        }"#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    let provider = &config.providers[0];
    assert_eq!(provider.registration_name(), "Local");
    assert_eq!(provider.effective_endpoint(), "http://localhost:11434");
    assert_eq!(provider.retry_count, 3);
    assert_eq!(config.legacy_translators[0].endpoint, "http://localhost:5000");
    assert_eq!(config.settings.request_timeout_secs, 120);
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_invalidLanguageProfileOrEndpoint_shouldFail() {
    let mut config = Config {
        providers: vec![ProviderConfig::new(ProviderKind::Ollama)],
        ..Config::default()
    };
    config.target_language = "zz".to_string();
    assert!(config.validate().is_err());

    config.target_language = "de".to_string();
    config.settings.profile_id = Some("dialogue".to_string());
    assert!(config.validate().is_err());

    config.settings.profiles.push(TranslationProfile {
        id: "Dialogue".to_string(),
        ..Default::default()
    });
    assert!(config.validate().is_ok());

    config.providers[0].endpoint = "localhost without scheme".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_unnamedLegacyTranslator_shouldFail() {
    let config = Config {
        providers: Vec::new(),
        legacy_translators: vec![LegacyTranslatorConfig {
            kind: Default::default(),
            name: " ".to_string(),
            endpoint: "http://localhost:5000".to_string(),
            api_key: String::new(),
            timeout_secs: 30,
            languages: Vec::new(),
        }],
        ..Config::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_pipelineContextFromSettings_shouldFollowActiveProfile() {
    let mut config = Config::default();
    config.settings.model_name = Some("gpt-4o-mini".to_string());
    config.settings.use_translation_memory = true;
    config.settings.profile_id = Some("ui".to_string());
    config.settings.profiles.push(TranslationProfile {
        id: "ui".to_string(),
        provider: Some("OpenAI".to_string()),
        model: None,
        terminology_paths: vec![PathBuf::from("ui.csv")],
        style_guide_path: None,
    });

    let context = TranslationPipelineContext::from_settings(&config.settings, &[]);
    assert_eq!(context.profile_id.as_deref(), Some("ui"));
    assert_eq!(context.provider_id.as_deref(), Some("OpenAI"));
    assert_eq!(context.model_id.as_deref(), Some("gpt-4o-mini"));
    assert_eq!(context.terminology_paths, vec![PathBuf::from("ui.csv")]);
    assert!(context.use_translation_memory);
}

#[test]
fn test_renderSystemPrompt_shouldFillLanguagePlaceholders() {
    let config = Config::default();
    let prompt = config.settings.render_system_prompt("English", "German");
    assert!(prompt.contains("from English to German"));
    assert!(!prompt.contains('{'));
}
