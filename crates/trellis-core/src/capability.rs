//! Object trait and optional capability interfaces.
//!
//! Every object stored in the registry implements [`Object`]. On top of that
//! an object may expose any of four optional behaviors:
//!
//! - [`Paintable`] - accepts the active [`Theme`]
//! - [`Restorable`] - serializes/restores its settings for snapshots
//! - [`Widget`] - exposes a presentation handle
//! - [`Container`] - owns child objects
//!
//! The registry probes the `as_*` accessors exactly once, when the object is
//! created, and records the result as [`Capabilities`]. All later dispatch is
//! done on those tags; the registry never guesses at concrete types.
//!
//! # Example
//!
//! ```
//! use trellis_core::{Object, ObjectKind, Paintable, Runtime, Theme, Uid};
//!
//! struct Label {
//!     color: String,
//! }
//!
//! impl Object for Label {
//!     fn kind(&self) -> ObjectKind {
//!         ObjectKind::Label
//!     }
//!
//!     fn as_paintable_mut(&mut self) -> Option<&mut dyn Paintable> {
//!         Some(self)
//!     }
//! }
//!
//! impl Paintable for Label {
//!     fn apply_theme(&mut self, theme: &Theme, _runtime: &mut Runtime) {
//!         self.color = theme.variable("text").unwrap_or("black").to_string();
//!     }
//! }
//!
//! let mut runtime = Runtime::new();
//! runtime
//!     .register_theme(Theme::new("night").with_variable("text", "#EEE"), true)
//!     .unwrap();
//! let id = runtime.create(Uid::INVALID, Label { color: String::new() }).unwrap();
//! assert_eq!(runtime.object::<Label>(id).unwrap().color, "#EEE");
//! ```

use std::any::Any;
use std::fmt;

use crate::error::SettingsError;
use crate::kind::ObjectKind;
use crate::runtime::Runtime;
use crate::settings::SettingsValue;
use crate::theme::Theme;
use crate::uid::Uid;

/// The base trait that all registry objects implement.
///
/// Only [`kind`](Self::kind) is required. The capability accessors default to
/// `None`; override the ones the concrete type supports by returning
/// `Some(self)`.
pub trait Object: Any + Send {
    /// The closed kind tag of this object.
    fn kind(&self) -> ObjectKind;

    /// Paintable capability.
    fn as_paintable_mut(&mut self) -> Option<&mut dyn Paintable> {
        None
    }

    /// Restorable capability (read side, used by snapshot saves).
    fn as_restorable(&self) -> Option<&dyn Restorable> {
        None
    }

    /// Restorable capability (write side, used by snapshot restores).
    fn as_restorable_mut(&mut self) -> Option<&mut dyn Restorable> {
        None
    }

    /// Widget capability.
    fn as_widget(&self) -> Option<&dyn Widget> {
        None
    }

    /// Container capability.
    fn as_container_mut(&mut self) -> Option<&mut dyn Container> {
        None
    }

    /// Teardown hook.
    ///
    /// Runs after the object has been removed from every registry index, so
    /// looking up its own id from here reports "not found". The runtime may
    /// be used freely, including destroying other objects.
    fn on_destroy(&mut self, runtime: &mut Runtime) {
        let _ = runtime;
    }
}

/// An object that restyles itself when the active theme changes.
pub trait Paintable {
    /// Apply `theme`. Called once on creation and once per theme activation.
    fn apply_theme(&mut self, theme: &Theme, runtime: &mut Runtime);
}

/// An object whose settings survive in snapshot documents.
pub trait Restorable {
    /// Produce the object's persistent settings.
    fn serialize_settings(&self) -> SettingsValue;

    /// Consume settings previously produced by [`serialize_settings`](Self::serialize_settings).
    fn restore_settings(&mut self, settings: &SettingsValue) -> Result<(), SettingsError>;
}

/// Opaque handle to the native presentation primitive behind a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WidgetHandle(pub u64);

/// An object backed by a native presentation primitive.
pub trait Widget {
    /// The native handle.
    fn widget_handle(&self) -> WidgetHandle;
}

/// An object that owns child objects.
///
/// The registry is the source of truth for the child list (see
/// [`Runtime::children`]); these hooks let the container attach or detach the
/// child's presentation.
pub trait Container {
    /// `child` was appended to this container.
    fn add_child(&mut self, child: Uid, kind: ObjectKind);

    /// `child` left this container (re-parented or destroyed).
    fn remove_child(&mut self, child: Uid);
}

/// A single capability tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Capability {
    /// See [`Paintable`].
    Paintable = 1 << 0,
    /// See [`Restorable`].
    Restorable = 1 << 1,
    /// See [`Widget`].
    Widget = 1 << 2,
    /// See [`Container`].
    Container = 1 << 3,
}

impl Capability {
    /// Every capability tag.
    pub const ALL: [Capability; 4] = [
        Self::Paintable,
        Self::Restorable,
        Self::Widget,
        Self::Container,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::Paintable => "Paintable",
            Self::Restorable => "Restorable",
            Self::Widget => "Widget",
            Self::Container => "Container",
        }
    }
}

/// The set of capability tags an object declared at creation.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Capabilities(u8);

impl Capabilities {
    /// The empty set.
    pub const NONE: Capabilities = Capabilities(0);

    /// Probe an object's accessors.
    pub fn probe(object: &mut dyn Object) -> Self {
        let mut caps = Self::NONE;
        if object.as_paintable_mut().is_some() {
            caps.insert(Capability::Paintable);
        }
        if object.as_restorable().is_some() {
            caps.insert(Capability::Restorable);
        }
        if object.as_widget().is_some() {
            caps.insert(Capability::Widget);
        }
        if object.as_container_mut().is_some() {
            caps.insert(Capability::Container);
        }
        caps
    }

    /// Add a tag.
    pub fn insert(&mut self, capability: Capability) {
        self.0 |= capability as u8;
    }

    /// Check for a tag.
    pub fn contains(self, capability: Capability) -> bool {
        self.0 & capability as u8 != 0
    }

    /// Returns true if no tag is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate the contained tags.
    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL.into_iter().filter(move |&c| self.contains(c))
    }
}

impl FromIterator<Capability> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        let mut caps = Self::NONE;
        for capability in iter {
            caps.insert(capability);
        }
        caps
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(Capability::name)).finish()
    }
}

/// Safe downcast function for [`Object`] trait objects.
///
/// Returns `Some(&T)` if the object is of type `T`, otherwise `None`.
pub fn object_cast<T: Object>(obj: &dyn Object) -> Option<&T> {
    (obj as &dyn Any).downcast_ref::<T>()
}

/// Safe mutable downcast function for [`Object`] trait objects.
pub fn object_cast_mut<T: Object>(obj: &mut dyn Object) -> Option<&mut T> {
    (obj as &mut dyn Any).downcast_mut::<T>()
}
