//! Snapshot save, restore and file storage.

mod common;

use common::{Panel, TextBox, init_tracing, log};
use trellis::file::{FileError, load_snapshot, save_snapshot};
use trellis::{
    EventHost, EventType, MissingAliasPolicy, ObjectKind, RestoreError, RestoreReport, Runtime, RuntimeConfig,
    SettingsError, SettingsValue, SnapshotCodec, SnapshotDocument, SnapshotRecord, Uid,
};

fn editor(rt: &mut Runtime, alias: &str, text: &str) -> Uid {
    let id = rt.create(Uid::INVALID, TextBox::new(text)).unwrap();
    rt.set_alias(id, alias).unwrap();
    id
}

fn text_of(rt: &Runtime, id: Uid) -> (String, bool) {
    let text_box = rt.object::<TextBox>(id).unwrap();
    (text_box.text.clone(), text_box.wrap)
}

#[test]
fn test_empty_registry_snapshot() {
    let mut rt = Runtime::new();
    let document = rt.save_snapshot("1.0");

    assert!(document.objects.is_empty());
    assert_eq!(document.application_version, "1.0");
    assert_eq!(document.schema_version, SnapshotCodec::SCHEMA_VERSION);
    assert!(!document.is_empty());

    let report = rt.restore_snapshot(&document, "1.0").unwrap();
    assert_eq!(report, RestoreReport::default());
    assert_eq!(rt.object_count(), 0);
}

#[test]
fn test_only_aliased_restorables_are_saved() {
    let events = log();
    let mut rt = Runtime::new();
    editor(&mut rt, "Out", "hello");
    rt.create(Uid::INVALID, TextBox::new("anonymous")).unwrap();
    let panel = rt.create(Uid::INVALID, Panel::new("p", &events)).unwrap();
    rt.set_alias(panel, "Side").unwrap();

    let document = rt.save_snapshot("1.0");
    let aliases: Vec<_> = document.objects.iter().map(|r| r.alias.as_str()).collect();
    assert_eq!(aliases, vec!["Out"]);
    assert_eq!(document.record("Out").unwrap().kind, ObjectKind::TextEdit);
}

#[test]
fn test_save_restore_is_idempotent() {
    init_tracing();
    let mut rt = Runtime::new();
    let out = editor(&mut rt, "Out", "build ok");
    let log_view = editor(&mut rt, "Log", "");
    rt.object_mut::<TextBox>(out).unwrap().wrap = true;

    let first = rt.save_snapshot("2.4");
    let report = rt.restore_snapshot(&first, "2.4").unwrap();
    assert!(report.is_complete());
    assert_eq!(report.restored, vec!["Out", "Log"]);

    assert_eq!(rt.save_snapshot("2.4"), first);
    assert_eq!(text_of(&rt, out), ("build ok".to_string(), true));
    assert_eq!(text_of(&rt, log_view), (String::new(), false));
}

#[test]
fn test_restore_brings_back_saved_state() {
    let mut rt = Runtime::new();
    let out = editor(&mut rt, "Out", "saved");
    let document = rt.save_snapshot("2.4");

    rt.object_mut::<TextBox>(out).unwrap().text = "edited".into();
    rt.restore_snapshot(&document, "2.4").unwrap();
    assert_eq!(text_of(&rt, out).0, "saved");
}

#[test]
fn test_version_mismatch_mutates_nothing() {
    let mut rt = Runtime::new();
    let out = editor(&mut rt, "Out", "saved");
    let document = rt.save_snapshot("1.0");
    rt.object_mut::<TextBox>(out).unwrap().text = "edited".into();

    assert_eq!(
        rt.restore_snapshot(&document, "2.0"),
        Err(RestoreError::AppVersionMismatch {
            expected: "2.0".into(),
            found: "1.0".into(),
        })
    );
    assert_eq!(text_of(&rt, out).0, "edited");

    let mut stale = document.clone();
    stale.schema_version = "0.9".into();
    assert!(matches!(
        rt.restore_snapshot(&stale, "1.0"),
        Err(RestoreError::SchemaVersionMismatch { .. })
    ));
    assert_eq!(text_of(&rt, out).0, "edited");
}

#[test]
fn test_kind_mismatch_is_fatal() {
    let events = log();
    let mut rt = Runtime::new();
    let out = editor(&mut rt, "Out", "edited");
    let side = rt.create(Uid::INVALID, Panel::new("side", &events)).unwrap();
    rt.set_alias(side, "Side").unwrap();

    let document = SnapshotDocument {
        application_version: "1.0".into(),
        schema_version: SnapshotCodec::SCHEMA_VERSION.into(),
        objects: vec![
            SnapshotRecord {
                alias: "Out".into(),
                kind: ObjectKind::TextEdit,
                settings: SettingsValue::object()
                    .with("text", "saved")
                    .with("layout.wrap", false),
            },
            SnapshotRecord {
                alias: "Side".into(),
                kind: ObjectKind::TreeView,
                settings: SettingsValue::object(),
            },
        ],
    };

    assert_eq!(
        rt.restore_snapshot(&document, "1.0"),
        Err(RestoreError::KindMismatch {
            alias: "Side".into(),
            live: ObjectKind::Panel,
            recorded: ObjectKind::TreeView,
        })
    );
    assert_eq!(text_of(&rt, out).0, "edited");
}

#[test]
fn test_missing_alias_policy() {
    let document = SnapshotDocument {
        application_version: "1.0".into(),
        schema_version: SnapshotCodec::SCHEMA_VERSION.into(),
        objects: vec![SnapshotRecord {
            alias: "Gone".into(),
            kind: ObjectKind::TextEdit,
            settings: SettingsValue::object(),
        }],
    };

    let mut lenient = Runtime::new();
    let report = lenient.restore_snapshot(&document, "1.0").unwrap();
    assert_eq!(report.skipped, vec!["Gone"]);
    assert!(!report.is_complete());

    let mut strict = Runtime::with_config(RuntimeConfig::new().missing_alias(MissingAliasPolicy::Strict));
    assert_eq!(
        strict.restore_snapshot(&document, "1.0"),
        Err(RestoreError::MissingObject("Gone".into()))
    );
}

#[test]
fn test_rejected_settings_are_reported() {
    let mut rt = Runtime::new();
    let out = editor(&mut rt, "Out", "kept");
    let good = editor(&mut rt, "Good", "");
    let document = SnapshotDocument {
        application_version: "1.0".into(),
        schema_version: SnapshotCodec::SCHEMA_VERSION.into(),
        objects: vec![
            SnapshotRecord {
                alias: "Out".into(),
                kind: ObjectKind::TextEdit,
                settings: SettingsValue::object().with("text", 7),
            },
            SnapshotRecord {
                alias: "Good".into(),
                kind: ObjectKind::TextEdit,
                settings: SettingsValue::object()
                    .with("text", "restored")
                    .with("layout.wrap", true),
            },
        ],
    };

    let report = rt.restore_snapshot(&document, "1.0").unwrap();
    assert_eq!(report.restored, vec!["Good"]);
    assert_eq!(
        report.failed,
        vec![("Out".to_string(), SettingsError::wrong_type("text", "a string"))]
    );
    assert_eq!(text_of(&rt, out).0, "kept");
    assert_eq!(text_of(&rt, good), ("restored".to_string(), true));
}

#[test]
fn test_empty_document_is_rejected() {
    let mut rt = Runtime::new();
    assert_eq!(
        rt.restore_snapshot(&SnapshotDocument::default(), "1.0"),
        Err(RestoreError::EmptySettings)
    );
}

#[test]
fn test_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("layout.json");

    let mut rt = Runtime::new();
    let out = editor(&mut rt, "Out", "from disk");
    save_snapshot(&path, &rt.save_snapshot("3.1")).unwrap();

    rt.object_mut::<TextBox>(out).unwrap().text.clear();
    let document = load_snapshot(&path).unwrap();
    rt.restore_snapshot(&document, "3.1").unwrap();
    assert_eq!(text_of(&rt, out).0, "from disk");
}

#[test]
fn test_missing_file_restores_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let document = load_snapshot(dir.path().join("absent.json")).unwrap();

    let mut rt = Runtime::new();
    assert_eq!(
        rt.restore_snapshot(&document, "1.0"),
        Err(RestoreError::EmptySettings)
    );
}

#[test]
fn test_corrupt_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("layout.json");
    std::fs::write(&path, "{ \"objects\": 3 }").unwrap();
    assert!(matches!(load_snapshot(&path), Err(FileError::Decode { .. })));
}

#[test]
fn test_object_saved_after_panicking_handler() {
    let mut rt = Runtime::new();
    let out = editor(&mut rt, "Out", "still here");
    rt.subscribe_all(move |rt, _| {
        rt.with_object_mut::<TextBox, _>(out, |_, _| panic!("handler bug"));
        Ok(())
    });

    rt.publish(out, EventType::Click, 0, 0);
    assert_eq!(rt.messenger_mut().take_diagnostics().len(), 1);
    assert_eq!(text_of(&rt, out).0, "still here");
    assert_eq!(rt.save_snapshot("1.0").objects.len(), 1);
}
