/*!
 * Tests for string tables and backups
 */

use std::fs;

use loctext::string_table::{
    BackupService, JsonStringTable, SerializeContext, StringItem, StringTableSerializer, TimestampedBackup,
};

use crate::common;

#[test]
fn test_deserialize_document_shouldKeepExplicitIds() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(
        dir.path(),
        "strings.json",
        r#"{
            "source_language": "en",
            "strings": [
                { "id": "67e55044-10b1-426f-9247-bb680e5fe0c8", "key": "menu.start", "text": "Start" }
            ]
        }"#,
    )
    .unwrap();

    let items = JsonStringTable.deserialize(&path).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id.to_string(), "67e55044-10b1-426f-9247-bb680e5fe0c8");
    assert_eq!(items[0].key, "menu.start");
}

#[test]
fn test_deserialize_invalidJson_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "strings.json", "{ not json").unwrap();
    assert!(JsonStringTable.deserialize(&path).is_err());
}

#[test]
fn test_backupThenSerialize_shouldPreserveOriginalContent() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "strings.json", r#"[{"key":"a","text":"Hello"}]"#).unwrap();

    let backup = TimestampedBackup::new().backup(&path).unwrap().unwrap();
    assert_eq!(backup.parent(), path.parent());
    assert!(backup.file_name().unwrap().to_string_lossy().starts_with("strings.json."));

    let items = vec![StringItem::new("a", "Hallo")];
    JsonStringTable
        .serialize(&items, &SerializeContext::new(&path).with_languages("en", "de"))
        .unwrap();

    assert_eq!(fs::read_to_string(&backup).unwrap(), r#"[{"key":"a","text":"Hello"}]"#);
    assert_eq!(JsonStringTable.deserialize(&path).unwrap()[0].text, "Hallo");
}
