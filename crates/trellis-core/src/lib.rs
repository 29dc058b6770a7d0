//! Core systems for Trellis.
//!
//! This crate provides the object lifecycle runtime and messaging core that a
//! desktop UI toolkit builds its widget catalog on:
//!
//! - **Identifiers**: stable, never reused [`Uid`]s
//! - **Object Registry**: creation, creator/created ownership, aliases and
//!   unique names, parent/child containment
//! - **Capabilities**: optional [`Paintable`], [`Restorable`], [`Widget`] and
//!   [`Container`] behavior, probed once per object
//! - **Themes**: named style bundles pushed to every Paintable object
//! - **Snapshots**: versioned per-object settings documents
//! - **Messenger**: typed publish/subscribe events with gating
//! - **Timers**: object-owned one-shot and repeating timers
//!
//! Everything hangs off an explicit [`Runtime`] value; there is no global
//! state.
//!
//! # Example
//!
//! ```
//! use trellis_core::{EventType, Object, ObjectKind, Runtime, Uid};
//!
//! struct Button;
//!
//! impl Object for Button {
//!     fn kind(&self) -> ObjectKind {
//!         ObjectKind::Button
//!     }
//! }
//!
//! let mut runtime = Runtime::new();
//! let ok = runtime.create(Uid::INVALID, Button).unwrap();
//! runtime.set_alias(ok, "Ok").unwrap();
//!
//! runtime.subscribe_by_sender(ok, |runtime, event| {
//!     runtime.destroy(event.sender, false)?;
//!     Ok(())
//! });
//!
//! assert_eq!(runtime.publish(ok, EventType::Click, 0, 0), 1);
//! assert!(runtime.lookup_by_alias("Ok").is_none());
//! ```

pub mod capability;
pub mod config;
mod error;
pub mod event;
mod kind;
pub mod logging;
pub mod messenger;
pub mod object;
pub mod persist;
pub mod runtime;
pub mod settings;
pub mod theme;
pub mod timer;
mod uid;

pub use capability::{
    Capabilities, Capability, Container, Object, Paintable, Restorable, Widget, WidgetHandle,
    object_cast, object_cast_mut,
};
pub use config::{MissingAliasPolicy, RuntimeConfig};
pub use error::{
    RegistryError, RegistryResult, RestoreError, Result, SettingsError, TrellisError,
};
pub use event::{Event, EventCategory, EventType};
pub use kind::{ObjectKind, UnknownKind};
pub use logging::{ObjectTreeDebug, TreeFormatOptions, TreeStyle};
pub use messenger::{
    Diagnostic, EventHost, ListenerError, ListenerResult, Messenger, SubscriptionId,
    SubscriptionKey,
};
pub use object::{ObjectRecord, ObjectRegistry};
pub use persist::{RestoreReport, SnapshotCodec, SnapshotDocument, SnapshotRecord};
pub use runtime::{Runtime, SharedRuntime};
pub use settings::{FromSettingsValue, SettingsValue};
pub use theme::{Theme, ThemeStore, ThemeVariables};
pub use timer::{TimerId, TimerKind};
pub use uid::{Uid, UidAllocator};
