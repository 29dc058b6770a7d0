//! The closed set of object kinds known to the registry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! object_kinds {
    ($($(#[$doc:meta])* $variant:ident => $name:literal,)+) => {
        /// Identifies which concrete widget, dialog or container an object is.
        ///
        /// The kind is fixed for the life of an object and is written into
        /// snapshot documents by its snake_case name.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum ObjectKind {
            $($(#[$doc])* $variant,)+
        }

        impl ObjectKind {
            /// Every kind, in declaration order.
            pub const ALL: &'static [ObjectKind] = &[$(Self::$variant,)+];

            /// The snake_case name used in snapshot documents.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }

        impl FromStr for ObjectKind {
            type Err = UnknownKind;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Self::$variant),)+
                    other => Err(UnknownKind(other.to_string())),
                }
            }
        }
    };
}

object_kinds! {
    /// Top-level window.
    Window => "window",
    /// Dockable panel hosted by a window.
    Dock => "dock",
    /// Tab strip with tool buttons.
    TabToolbar => "tab_toolbar",
    /// Window status bar.
    StatusBar => "status_bar",
    /// Popup or menu bar menu.
    Menu => "menu",
    /// Menu or toolbar action.
    Action => "action",
    /// Modal or modeless dialog.
    Dialog => "dialog",
    /// Plain grouping container.
    Panel => "panel",
    /// Resizable split container.
    Splitter => "splitter",
    /// Hierarchical item view.
    TreeView => "tree_view",
    /// Flat item list.
    ListView => "list_view",
    /// Row/column grid view.
    TableView => "table_view",
    /// Name/value property editor.
    PropertyGrid => "property_grid",
    /// Push button.
    Button => "button",
    /// Static text.
    Label => "label",
    /// Single-line text input.
    LineEdit => "line_edit",
    /// Multi-line text input.
    TextEdit => "text_edit",
    /// Check box.
    CheckBox => "check_box",
    /// Drop-down selector.
    ComboBox => "combo_box",
    /// Value slider.
    Slider => "slider",
    /// Numeric spin box.
    SpinBox => "spin_box",
    /// Progress indicator.
    ProgressBar => "progress_bar",
    /// Non-visual timer object.
    Timer => "timer",
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing a kind name that is not part of [`ObjectKind`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown object kind '{0}'")]
pub struct UnknownKind(pub String);
