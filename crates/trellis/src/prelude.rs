//! Prelude module for Trellis.
//!
//! ```ignore
//! use trellis::prelude::*;
//! ```

// ============================================================================
// Runtime
// ============================================================================

pub use crate::{Runtime, RuntimeConfig, SharedRuntime, Uid};

// ============================================================================
// Objects and Capabilities
// ============================================================================

pub use crate::{
    Capability, Container, Object, ObjectKind, Paintable, Restorable, Widget, WidgetHandle,
};

// ============================================================================
// Events
// ============================================================================

pub use crate::{Event, EventCategory, EventHost, EventType, ListenerResult, SubscriptionId};

// ============================================================================
// Themes and Snapshots
// ============================================================================

pub use crate::{SettingsError, SettingsValue, SnapshotDocument, Theme};

// ============================================================================
// Errors
// ============================================================================

pub use crate::{RegistryError, RestoreError, TrellisError};
