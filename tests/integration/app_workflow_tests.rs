/*!
 * Full app workflow tests through the controller
 */

use std::fs;

use loctext::app_config::{Config, ProviderConfig, ProviderKind};
use loctext::app_controller::{Controller, TranslateJob};
use loctext::string_table::{JsonStringTable, StringTableSerializer};

use crate::common;

const TABLE: &str = r#"[
    {"key": "menu.start", "text": "Start"},
    {"key": "menu.options", "text": "Options"},
    {"key": "menu.quit", "text": "Quit"}
]"#;

fn offline_config() -> Config {
    let mut ollama = ProviderConfig::new(ProviderKind::Ollama);
    // Nothing listens on the discard port, so requests fail fast
    ollama.endpoint = "http://127.0.0.1:9".to_string();
    ollama.retry_count = 0;
    ollama.timeout_secs = 2;
    Config {
        source_language: "en".to_string(),
        target_language: "de".to_string(),
        providers: vec![ollama],
        ..Config::default()
    }
}

#[tokio::test]
async fn test_runTranslate_withoutTranslators_shouldCountFailuresAndStillWrite() {
    common::init_logging();
    let dir = common::create_temp_dir().unwrap();
    let input = common::create_test_file(dir.path(), "strings.json", TABLE).unwrap();
    let output = dir.path().join("strings.de.json");

    let controller = Controller::with_config(offline_config()).unwrap();
    let progress = controller
        .run_translate(TranslateJob {
            input: input.clone(),
            output: Some(output.clone()),
            start_index: 1,
            ..TranslateJob::default()
        })
        .await
        .unwrap();

    assert_eq!(progress.range_size, 2);
    assert_eq!(progress.failure_count, 2);
    assert_eq!(progress.pending_count, 0);

    let written = JsonStringTable.deserialize(&output).unwrap();
    assert_eq!(written.len(), 3);
    assert_eq!(written[1].text, "Options");
    assert!(fs::read_to_string(&output).unwrap().contains("\"target_language\": \"de\""));
    assert_eq!(fs::read_to_string(&input).unwrap(), TABLE);
}

#[tokio::test]
async fn test_runTranslate_overwritingInput_shouldBackUpFirst() {
    let dir = common::create_temp_dir().unwrap();
    let input = common::create_test_file(dir.path(), "strings.json", TABLE).unwrap();

    let controller = Controller::with_config(offline_config()).unwrap();
    let progress = controller
        .run_translate(TranslateJob {
            input: input.clone(),
            use_provider: true,
            provider: Some("ollama".to_string()),
            model: Some("llama3".to_string()),
            ..TranslateJob::default()
        })
        .await
        .unwrap();
    assert_eq!(progress.failure_count, 3);

    let backups: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|name| name.ends_with(".bak"))
        .collect();
    assert_eq!(backups.len(), 1);
    assert_eq!(fs::read_to_string(dir.path().join(&backups[0])).unwrap(), TABLE);
}

#[tokio::test]
async fn test_runTranslate_missingInput_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let controller = Controller::with_config(offline_config()).unwrap();
    let result = controller
        .run_translate(TranslateJob {
            input: dir.path().join("missing.json"),
            ..TranslateJob::default()
        })
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_models_unknownProvider_shouldFail() {
    let controller = Controller::with_config(offline_config()).unwrap();
    assert_eq!(controller.providers().len(), 1);
    assert!(controller.models("anthropic").await.is_err());
}
