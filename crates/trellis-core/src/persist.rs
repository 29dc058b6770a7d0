//! Versioned snapshot documents.
//!
//! [`SnapshotCodec::save`] collects the settings of every live object that has
//! an alias and is [`Restorable`](crate::Restorable) into a
//! [`SnapshotDocument`]. [`SnapshotCodec::restore`] feeds a document back to
//! the live objects holding the same aliases.
//!
//! A document is rejected as a whole when it is empty, when it was written by a
//! different application version or codec schema, or when one of its records
//! names an object of a different kind than the live one. All of these checks
//! happen before any object is touched.
//!
//! # JSON shape
//!
//! ```json
//! {
//!   "application_version": "2.4",
//!   "schema_version": "1.0",
//!   "objects": [
//!     { "alias": "Out", "kind": "text_edit", "settings": { "wrap": true } }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::capability::Capability;
use crate::config::MissingAliasPolicy;
use crate::error::{RestoreError, SettingsError};
use crate::kind::ObjectKind;
use crate::object::ObjectRegistry;
use crate::settings::SettingsValue;
use crate::uid::Uid;

/// Persisted settings of one object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// Alias of the object the settings belong to.
    pub alias: String,
    /// Kind of that object when the snapshot was taken.
    pub kind: ObjectKind,
    /// Opaque settings produced by the object.
    #[serde(default)]
    pub settings: SettingsValue,
}

/// A full snapshot. The default value is the "absent" document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    /// Version of the application that wrote the document.
    #[serde(default)]
    pub application_version: String,
    /// Codec schema version, see [`SnapshotCodec::SCHEMA_VERSION`].
    #[serde(default)]
    pub schema_version: String,
    /// One record per saved object, in ascending UID order at save time.
    #[serde(default)]
    pub objects: Vec<SnapshotRecord>,
}

impl SnapshotDocument {
    /// Returns true for the absent document (no version information at all).
    pub fn is_empty(&self) -> bool {
        self.application_version.is_empty() && self.schema_version.is_empty()
    }

    /// Find the record for `alias`.
    pub fn record(&self, alias: &str) -> Option<&SnapshotRecord> {
        self.objects.iter().find(|r| r.alias == alias)
    }

    /// Encode as compact JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Encode as indented JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Decode JSON text. Blank text yields the absent document.
    pub fn from_json(text: &str) -> Result<Self, RestoreError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(text).map_err(|e| RestoreError::Malformed(e.to_string()))
    }
}

/// Outcome of a successful restore.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestoreReport {
    /// Aliases whose settings were applied.
    pub restored: Vec<String>,
    /// Aliases with no matching restorable live object.
    pub skipped: Vec<String>,
    /// Aliases whose object rejected its settings.
    pub failed: Vec<(String, SettingsError)>,
}

impl RestoreReport {
    /// Returns true if every record was applied.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty() && self.failed.is_empty()
    }
}

/// Encodes and decodes registry state as [`SnapshotDocument`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotCodec;

impl SnapshotCodec {
    /// Schema version written into every document.
    pub const SCHEMA_VERSION: &'static str = "1.0";

    /// Capture every aliased, restorable live object.
    pub fn save(registry: &ObjectRegistry, application_version: &str) -> SnapshotDocument {
        let mut objects = Vec::new();
        for id in registry.ids_with(Capability::Restorable) {
            let Some(record) = registry.record(id) else {
                continue;
            };
            let Some(alias) = record.alias() else {
                continue;
            };
            let Some(restorable) = registry.instance(id).and_then(|o| o.as_restorable()) else {
                tracing::warn!(target: "trellis_core::persist", %id, alias, "object busy, not saved");
                continue;
            };
            objects.push(SnapshotRecord {
                alias: alias.to_string(),
                kind: record.kind(),
                settings: restorable.serialize_settings(),
            });
        }
        tracing::debug!(
            target: "trellis_core::persist",
            application_version,
            records = objects.len(),
            "snapshot saved"
        );
        SnapshotDocument {
            application_version: application_version.to_string(),
            schema_version: Self::SCHEMA_VERSION.to_string(),
            objects,
        }
    }

    /// Apply `document` to the live objects of `registry`.
    pub fn restore(
        registry: &mut ObjectRegistry,
        document: &SnapshotDocument,
        application_version: &str,
        policy: MissingAliasPolicy,
    ) -> Result<RestoreReport, RestoreError> {
        let plan = Self::validate(registry, document, application_version, policy)?;

        let mut report = RestoreReport::default();
        for (record, target) in document.objects.iter().zip(plan) {
            let Some(id) = target else {
                tracing::debug!(target: "trellis_core::persist", alias = %record.alias, "no live object, skipped");
                report.skipped.push(record.alias.clone());
                continue;
            };
            let Some(restorable) = registry
                .instance_mut(id)
                .and_then(|o| o.as_restorable_mut())
            else {
                tracing::warn!(target: "trellis_core::persist", %id, alias = %record.alias, "object busy, skipped");
                report.skipped.push(record.alias.clone());
                continue;
            };
            match restorable.restore_settings(&record.settings) {
                Ok(()) => report.restored.push(record.alias.clone()),
                Err(err) => {
                    tracing::warn!(
                        target: "trellis_core::persist",
                        %id,
                        alias = %record.alias,
                        error = %err,
                        "object rejected its settings"
                    );
                    report.failed.push((record.alias.clone(), err));
                }
            }
        }
        tracing::debug!(
            target: "trellis_core::persist",
            restored = report.restored.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "snapshot restored"
        );
        Ok(report)
    }

    /// Check the document against the registry without touching any object.
    ///
    /// Returns, per record, the restorable live object it applies to.
    fn validate(
        registry: &ObjectRegistry,
        document: &SnapshotDocument,
        application_version: &str,
        policy: MissingAliasPolicy,
    ) -> Result<Vec<Option<Uid>>, RestoreError> {
        if document.is_empty() {
            return Err(RestoreError::EmptySettings);
        }
        if document.application_version != application_version {
            return Err(RestoreError::AppVersionMismatch {
                expected: application_version.to_string(),
                found: document.application_version.clone(),
            });
        }
        if document.schema_version != Self::SCHEMA_VERSION {
            return Err(RestoreError::SchemaVersionMismatch {
                expected: Self::SCHEMA_VERSION.to_string(),
                found: document.schema_version.clone(),
            });
        }

        let mut plan = Vec::with_capacity(document.objects.len());
        for record in &document.objects {
            let live = registry
                .by_alias(&record.alias)
                .and_then(|id| registry.record(id));
            let Some(live) = live else {
                if policy == MissingAliasPolicy::Strict {
                    return Err(RestoreError::MissingObject(record.alias.clone()));
                }
                plan.push(None);
                continue;
            };
            if live.kind() != record.kind {
                return Err(RestoreError::KindMismatch {
                    alias: record.alias.clone(),
                    live: live.kind(),
                    recorded: record.kind,
                });
            }
            plan.push(live.has(Capability::Restorable).then_some(live.id()));
        }
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Capabilities, Object, Restorable};

    struct Editor {
        wrap: bool,
    }

    impl Object for Editor {
        fn kind(&self) -> ObjectKind {
            ObjectKind::TextEdit
        }

        fn as_restorable(&self) -> Option<&dyn Restorable> {
            Some(self)
        }

        fn as_restorable_mut(&mut self) -> Option<&mut dyn Restorable> {
            Some(self)
        }
    }

    impl Restorable for Editor {
        fn serialize_settings(&self) -> SettingsValue {
            SettingsValue::object().with("wrap", self.wrap)
        }

        fn restore_settings(&mut self, settings: &SettingsValue) -> Result<(), SettingsError> {
            self.wrap = settings.require("wrap")?;
            Ok(())
        }
    }

    fn add_editor(registry: &mut ObjectRegistry, alias: &str, wrap: bool) -> Uid {
        let id = registry.reserve(Uid::INVALID).unwrap();
        let mut editor = Editor { wrap };
        let caps = Capabilities::probe(&mut editor);
        registry.insert(id, Uid::INVALID, Box::new(editor), caps);
        if !alias.is_empty() {
            registry.set_alias(id, alias).unwrap();
        }
        id
    }

    fn wrap_of(registry: &ObjectRegistry, id: Uid) -> bool {
        registry
            .instance(id)
            .and_then(|o| o.as_restorable())
            .map(|r| r.serialize_settings())
            .and_then(|s| s.get("wrap").and_then(SettingsValue::as_bool))
            .unwrap()
    }

    #[test]
    fn test_save_only_aliased() {
        let mut registry = ObjectRegistry::new();
        add_editor(&mut registry, "Out", true);
        add_editor(&mut registry, "", true);

        let doc = SnapshotCodec::save(&registry, "2.4");
        assert_eq!(doc.schema_version, "1.0");
        assert_eq!(doc.objects.len(), 1);
        assert_eq!(doc.objects[0].alias, "Out");
        assert_eq!(doc.objects[0].kind, ObjectKind::TextEdit);
    }

    #[test]
    fn test_empty_save_has_versions() {
        let registry = ObjectRegistry::new();
        let doc = SnapshotCodec::save(&registry, "2.4");
        assert!(!doc.is_empty());
        assert!(doc.objects.is_empty());
    }

    #[test]
    fn test_roundtrip() {
        let mut registry = ObjectRegistry::new();
        let out = add_editor(&mut registry, "Out", true);
        let doc = SnapshotCodec::save(&registry, "2.4");

        assert!(wrap_of(&registry, out));
        let mut other = ObjectRegistry::new();
        let copy = add_editor(&mut other, "Out", false);
        let report = SnapshotCodec::restore(&mut other, &doc, "2.4", MissingAliasPolicy::Skip).unwrap();
        assert!(report.is_complete());
        assert_eq!(report.restored, vec!["Out".to_string()]);
        assert!(wrap_of(&other, copy));
        assert_eq!(SnapshotCodec::save(&other, "2.4"), doc);
    }

    #[test]
    fn test_version_checks() {
        let mut registry = ObjectRegistry::new();
        let out = add_editor(&mut registry, "Out", false);
        let mut doc = SnapshotCodec::save(&registry, "1.0");
        doc.objects[0].settings = SettingsValue::object().with("wrap", true);

        assert_eq!(
            SnapshotCodec::restore(&mut registry, &SnapshotDocument::default(), "1.0", MissingAliasPolicy::Skip),
            Err(RestoreError::EmptySettings)
        );
        assert_eq!(
            SnapshotCodec::restore(&mut registry, &doc, "2.0", MissingAliasPolicy::Skip),
            Err(RestoreError::AppVersionMismatch {
                expected: "2.0".into(),
                found: "1.0".into()
            })
        );
        doc.schema_version = "0.9".into();
        assert!(matches!(
            SnapshotCodec::restore(&mut registry, &doc, "1.0", MissingAliasPolicy::Skip),
            Err(RestoreError::SchemaVersionMismatch { .. })
        ));
        assert!(!wrap_of(&registry, out));
    }

    #[test]
    fn test_kind_mismatch_mutates_nothing() {
        let mut registry = ObjectRegistry::new();
        let out = add_editor(&mut registry, "Out", false);
        add_editor(&mut registry, "Log", false);
        let mut doc = SnapshotCodec::save(&registry, "1.0");
        doc.objects[0].settings = SettingsValue::object().with("wrap", true);
        doc.objects[1].kind = ObjectKind::TreeView;

        let err = SnapshotCodec::restore(&mut registry, &doc, "1.0", MissingAliasPolicy::Skip).unwrap_err();
        assert_eq!(
            err,
            RestoreError::KindMismatch {
                alias: "Log".into(),
                live: ObjectKind::TextEdit,
                recorded: ObjectKind::TreeView
            }
        );
        assert!(!wrap_of(&registry, out));
    }

    #[test]
    fn test_missing_alias_policy() {
        let mut registry = ObjectRegistry::new();
        let out = add_editor(&mut registry, "Out", false);
        let mut doc = SnapshotCodec::save(&registry, "1.0");
        doc.objects[0].settings = SettingsValue::object().with("wrap", true);
        doc.objects.insert(
            0,
            SnapshotRecord {
                alias: "Gone".into(),
                kind: ObjectKind::Dock,
                settings: SettingsValue::Null,
            },
        );

        assert_eq!(
            SnapshotCodec::restore(&mut registry, &doc, "1.0", MissingAliasPolicy::Strict),
            Err(RestoreError::MissingObject("Gone".into()))
        );
        assert!(!wrap_of(&registry, out));

        let report = SnapshotCodec::restore(&mut registry, &doc, "1.0", MissingAliasPolicy::Skip).unwrap();
        assert_eq!(report.skipped, vec!["Gone".to_string()]);
        assert_eq!(report.restored, vec!["Out".to_string()]);
        assert!(wrap_of(&registry, out));
    }

    #[test]
    fn test_settings_failure_is_reported() {
        let mut registry = ObjectRegistry::new();
        add_editor(&mut registry, "Out", false);
        let mut doc = SnapshotCodec::save(&registry, "1.0");
        doc.objects[0].settings = SettingsValue::object().with("wrap", "yes");

        let report = SnapshotCodec::restore(&mut registry, &doc, "1.0", MissingAliasPolicy::Skip).unwrap();
        assert!(!report.is_complete());
        assert_eq!(
            report.failed,
            vec![("Out".to_string(), SettingsError::wrong_type("wrap", "a boolean"))]
        );
    }

    #[test]
    fn test_json() {
        assert_eq!(SnapshotDocument::from_json("  \n"), Ok(SnapshotDocument::default()));
        assert!(matches!(
            SnapshotDocument::from_json("{ nope"),
            Err(RestoreError::Malformed(_))
        ));

        let text = r#"{"application_version":"2.4","schema_version":"1.0",
            "objects":[{"alias":"Out","kind":"text_edit","settings":{"wrap":true}}]}"#;
        let doc = SnapshotDocument::from_json(text).unwrap();
        assert_eq!(doc.record("Out").map(|r| r.kind), Some(ObjectKind::TextEdit));
        assert_eq!(SnapshotDocument::from_json(&doc.to_json().unwrap()), Ok(doc));
    }
}
