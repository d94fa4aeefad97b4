/*!
 * Tests for terminology loading and prompt building
 */

use std::path::Path;

use loctext::errors::TerminologyError;
use loctext::terminology::{
    TermMode, TerminologyCache, TerminologyLoader, TerminologyPack, TerminologyPromptBuilder, TerminologySource,
};

use crate::common;

const STYLE_GUIDE: &str = "# Chrono Saga style guide

Keep menus short.

## Required terms
- \"Moogle\"; Kupo
- Chocobo

## Forbidden terms
- `moogle`
- Mana Potion

## Tone
- Playful, never sarcastic
";

#[test]
fn test_load_csvWithHeader_shouldReadEveryColumn() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_terminology_csv(dir.path(), "items.csv").unwrap();

    let pack = TerminologyLoader::load_pack(&path).unwrap();
    assert_eq!(pack.name, "items");
    assert_eq!(pack.source_path, path);
    assert_eq!(pack.len(), 3);
    assert_eq!(pack.entries[0].term, "Potion");
    assert_eq!(pack.entries[0].notes.as_deref(), Some("healing item"));
    assert_eq!(pack.entries[1].mode, Some(TermMode::Required));
    assert_eq!(pack.entries[2].mode, None);
}

#[test]
fn test_load_tsvWithoutHeader_shouldUsePositionalColumns() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "names.tsv", "Cid\tCid\tengineer\n\nBahamut\tBahamut\n\t\n").unwrap();

    let pack = TerminologyLoader::load_pack(&path).unwrap();
    assert_eq!(pack.len(), 2);
    assert_eq!(pack.entries[0].notes.as_deref(), Some("engineer"));
    assert_eq!(pack.entries[1].term, "Bahamut");
}

#[test]
fn test_load_unsupportedOrMissingFile_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let json = common::create_test_file(dir.path(), "terms.json", "{}").unwrap();

    assert!(matches!(TerminologyLoader::load(&json), Err(TerminologyError::UnsupportedFormat(_))));
    assert!(matches!(
        TerminologyLoader::load(dir.path().join("missing.csv")),
        Err(TerminologyError::NotFound(_))
    ));
}

#[test]
fn test_loadStyleGuide_shouldDeriveTermsAndTone() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "style.md", STYLE_GUIDE).unwrap();

    let guide = TerminologyLoader::load_style_guide(&path).unwrap();
    assert_eq!(guide.required_terms, vec!["Moogle", "Kupo", "Chocobo"]);
    assert_eq!(guide.forbidden_terms, vec!["moogle", "Mana Potion"]);
    assert_eq!(guide.tone_notes, vec!["Playful, never sarcastic"]);
    assert!(guide.section("required terms").is_some());
    assert_eq!(guide.sections[0].rules, vec!["Keep menus short."]);
}

#[test]
fn test_styleGuidePack_shouldDropCaseInsensitiveDuplicates() {
    let guide = TerminologyLoader::parse_style_guide(STYLE_GUIDE, "style", Path::new("style.md"));
    let pack = guide.to_terminology_pack();

    let terms: Vec<&str> = pack.entries.iter().map(|e| e.term.as_str()).collect();
    assert_eq!(terms, vec!["Moogle", "Kupo", "Chocobo", "Mana Potion"]);
    assert_eq!(pack.entries[0].translation, "Moogle");
    assert_eq!(pack.entries[3].translation, "");
    assert_eq!(pack.entries[3].mode, Some(TermMode::Forbidden));
}

#[test]
fn test_merge_shouldKeepEveryEntry() {
    let dir = common::create_temp_dir().unwrap();
    let first = TerminologyLoader::load_pack(common::create_terminology_csv(dir.path(), "a.csv").unwrap()).unwrap();
    let second = TerminologyLoader::load_pack(common::create_terminology_csv(dir.path(), "b.csv").unwrap()).unwrap();

    let merged = TerminologyPack::merge(&[first.clone(), second.clone()]);
    assert_eq!(merged.len(), first.len() + second.len());
    assert_eq!(merged.name, "a + b");
}

#[test]
fn test_promptBuilder_sameInputs_shouldProduceIdenticalText() {
    let dir = common::create_temp_dir().unwrap();
    let pack = TerminologyLoader::load_pack(common::create_terminology_csv(dir.path(), "items.csv").unwrap()).unwrap();
    let guide = TerminologyLoader::parse_style_guide(STYLE_GUIDE, "style", Path::new("style.md")).to_terminology_pack();

    let first = TerminologyPromptBuilder::build(Some(&pack), Some(&guide));
    let second = TerminologyPromptBuilder::build(Some(&pack.clone()), Some(&guide.clone()));
    assert_eq!(first, second);

    let system = first.system_prompt.unwrap();
    let gil = system.find("- Gil => Gil").unwrap();
    let moogle = system.find("- Moogle => Mogry").unwrap();
    let potion = system.find("- Potion => Trank").unwrap();
    assert!(gil < moogle && moogle < potion);
    assert!(system.contains("Style guide terms (style):"));
    assert!(first.user_prompt.is_some());
}

#[test]
fn test_cache_shouldReloadAfterFileChanges() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "terms.csv", "Sword,Schwert\n").unwrap();
    let cache = TerminologyCache::new();

    let first = cache.load(&path).unwrap();
    let again = cache.load(&path).unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &again));

    // Modification times can be coarse, so make the new content differ in size too
    std::thread::sleep(std::time::Duration::from_millis(20));
    std::fs::write(&path, "Sword,Schwert\nShield,Schild\n").unwrap();
    let reloaded = cache.load(&path).unwrap();
    match reloaded.as_ref() {
        TerminologySource::Pack(pack) => assert_eq!(pack.len(), 2),
        other => panic!("expected a pack, got {:?}", other),
    }
}
