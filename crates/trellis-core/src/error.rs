//! Error types for Trellis.

use crate::kind::ObjectKind;
use crate::uid::Uid;

/// Errors reported by registry and theme operations.
///
/// These are caller programming errors (stale handles, duplicate
/// registrations) and are always surfaced, never swallowed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The operation referenced a UID that is not currently live.
    #[error("invalid or destroyed object id {0}")]
    InvalidId(Uid),

    /// Another live object already holds the alias or unique name.
    #[error("name '{name}' is already held by object {holder}")]
    DuplicateName {
        /// The contested name.
        name: String,
        /// The live object that owns it.
        holder: Uid,
    },

    /// A theme with this name is already registered.
    #[error("a theme named '{0}' is already registered")]
    DuplicateThemeName(String),

    /// No theme with this name has been registered.
    #[error("unknown theme '{0}'")]
    UnknownTheme(String),

    /// The creator is neither [`Uid::INVALID`] nor a live object.
    #[error("unknown creator {0}")]
    UnknownCreator(Uid),

    /// The object does not implement the Container capability.
    #[error("object {0} is not a container")]
    NotContainer(Uid),

    /// The requested parent is the child itself or one of its descendants.
    #[error("cannot make {parent} the parent of {child}: it is {child} or one of its descendants")]
    CircularParentage {
        /// The object being re-parented.
        child: Uid,
        /// The rejected parent.
        parent: Uid,
    },
}

/// Errors reported while restoring a snapshot document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RestoreError {
    /// The document is empty or absent.
    #[error("no settings to restore")]
    EmptySettings,

    /// The document was saved by a different application version.
    #[error("application version mismatch: expected '{expected}', document has '{found}'")]
    AppVersionMismatch {
        /// The version supplied by the caller.
        expected: String,
        /// The version recorded in the document.
        found: String,
    },

    /// The document uses a different schema version than this codec.
    #[error("schema version mismatch: expected '{expected}', document has '{found}'")]
    SchemaVersionMismatch {
        /// The codec's schema version.
        expected: String,
        /// The version recorded in the document.
        found: String,
    },

    /// A record's kind differs from the live object holding its alias.
    #[error("kind mismatch for '{alias}': live object is {live}, document says {recorded}")]
    KindMismatch {
        /// The alias both sides share.
        alias: String,
        /// Kind of the live object.
        live: ObjectKind,
        /// Kind stored in the document.
        recorded: ObjectKind,
    },

    /// A record has no live object to restore into (strict policy only).
    #[error("no live object with alias '{0}'")]
    MissingObject(String),

    /// The document text could not be decoded.
    #[error("malformed snapshot document: {0}")]
    Malformed(String),
}

/// Errors a [`Restorable`](crate::Restorable) object reports while consuming
/// its settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// A required key was absent.
    #[error("missing settings key '{0}'")]
    MissingKey(String),

    /// A key held a value of the wrong type.
    #[error("settings key '{key}' should be {expected}")]
    WrongType {
        /// The offending key.
        key: String,
        /// Human-readable expected type.
        expected: &'static str,
    },

    /// Any other rejection.
    #[error("invalid settings: {0}")]
    Invalid(String),
}

impl SettingsError {
    /// Create a wrong-type error.
    pub fn wrong_type(key: impl Into<String>, expected: &'static str) -> Self {
        Self::WrongType {
            key: key.into(),
            expected,
        }
    }
}

/// The main error type for Trellis operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrellisError {
    /// Registry or theme error.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    /// Snapshot restore error.
    #[error("restore error: {0}")]
    Restore(#[from] RestoreError),
    /// Object settings error.
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),
}

/// Result type for registry and theme operations.
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// A specialized Result type for Trellis operations.
pub type Result<T> = std::result::Result<T, TrellisError>;
