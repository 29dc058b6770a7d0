//! Logging and debugging facilities.
//!
//! Trellis logs through the `tracing` crate and never installs a subscriber;
//! the embedding application decides where logs go:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("trellis_core::theme=debug,trellis_core::messenger=error")
//!     .init();
//! ```
//!
//! Levels follow one convention across subsystems: object lifecycle at
//! `trace`, theme and persistence steps at `debug`, skipped or rejected
//! restores and forced teardown at `warn`, listener failures at `error`.
//!
//! [`ObjectTreeDebug`] renders the parent/child forest of a registry:
//!
//! ```
//! use trellis_core::{ObjectTreeDebug, Runtime};
//!
//! let runtime = Runtime::new();
//! let text = ObjectTreeDebug::new().format_all(runtime.registry());
//! assert!(text.starts_with("Object Tree (0 total objects)"));
//! ```

use std::fmt::Write as _;

use crate::error::{RegistryError, RegistryResult};
use crate::object::ObjectRegistry;
use crate::uid::Uid;

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "trellis_core";
    /// Object lifecycle and hierarchy.
    pub const OBJECT: &str = "trellis_core::object";
    /// Event delivery and listener failures.
    pub const MESSENGER: &str = "trellis_core::messenger";
    /// Theme registration and propagation.
    pub const THEME: &str = "trellis_core::theme";
    /// Snapshot save and restore.
    pub const PERSIST: &str = "trellis_core::persist";
    /// Timer scheduling.
    pub const TIMER: &str = "trellis_core::timer";
}

/// Style options for object tree visualization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
}

/// Configuration for object tree debug output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// The style of tree visualization.
    pub style: TreeStyle,
    /// Whether to show object ids.
    pub show_ids: bool,
    /// Whether to show object kinds.
    pub show_kinds: bool,
    /// Whether to show aliases and unique names.
    pub show_names: bool,
    /// Maximum depth to traverse (None for unlimited).
    pub max_depth: Option<usize>,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: true,
            show_kinds: true,
            show_names: true,
            max_depth: None,
        }
    }
}

impl TreeFormatOptions {
    /// Options printing only the structure and ids.
    pub fn minimal() -> Self {
        Self {
            show_kinds: false,
            show_names: false,
            ..Default::default()
        }
    }

    /// Set the branch style.
    pub fn style(mut self, style: TreeStyle) -> Self {
        self.style = style;
        self
    }

    /// Limit the rendered depth. Roots are depth 0.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }
}

/// Debug utility for visualizing object trees.
#[derive(Debug, Clone, Default)]
pub struct ObjectTreeDebug {
    options: TreeFormatOptions,
}

impl ObjectTreeDebug {
    /// Create a new debug visualizer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a debug visualizer with custom options.
    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Format every root object and its descendants.
    pub fn format_all(&self, registry: &ObjectRegistry) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "Object Tree ({} total objects):", registry.len());

        let roots = registry.roots();
        if roots.is_empty() {
            output.push_str("  (empty)\n");
        }
        for root in roots {
            self.format_node(registry, root, &mut Vec::new(), &mut output);
        }
        output
    }

    /// Format one subtree.
    pub fn format_subtree(&self, registry: &ObjectRegistry, root: Uid) -> RegistryResult<String> {
        if !registry.contains(root) {
            return Err(RegistryError::InvalidId(root));
        }
        let mut output = String::new();
        self.format_node(registry, root, &mut Vec::new(), &mut output);
        Ok(output)
    }

    /// `ancestors_last` holds, per ancestor level below the root, whether
    /// that ancestor was the last of its siblings.
    fn format_node(&self, registry: &ObjectRegistry, id: Uid, ancestors_last: &mut Vec<bool>, output: &mut String) {
        let depth = ancestors_last.len();
        if self.options.max_depth.is_some_and(|max| depth > max) {
            return;
        }
        let Some(record) = registry.record(id) else {
            return;
        };

        output.push_str(&self.prefix(ancestors_last));
        let mut parts = Vec::new();
        if self.options.show_names {
            match (record.alias(), record.unique_name()) {
                (Some(alias), Some(name)) => parts.push(format!("{alias} <{name}>")),
                (Some(alias), None) => parts.push(alias.to_string()),
                (None, Some(name)) => parts.push(format!("<{name}>")),
                (None, None) => parts.push("(unnamed)".to_string()),
            }
        }
        if self.options.show_kinds {
            parts.push(format!("({})", record.kind()));
        }
        if self.options.show_ids || parts.is_empty() {
            parts.push(format!("[{id}]"));
        }
        output.push_str(&parts.join(" "));
        output.push('\n');

        let children = record.children();
        for (i, &child) in children.iter().enumerate() {
            ancestors_last.push(i + 1 == children.len());
            self.format_node(registry, child, ancestors_last, output);
            ancestors_last.pop();
        }
    }

    fn prefix(&self, ancestors_last: &[bool]) -> String {
        let Some((&is_last, above)) = ancestors_last.split_last() else {
            return String::new();
        };
        let (pipe, tee, corner) = match self.options.style {
            TreeStyle::Ascii => ("|   ", "+-- ", "`-- "),
            TreeStyle::Unicode => ("\u{2502}   ", "\u{251c}\u{2500}\u{2500} ", "\u{2514}\u{2500}\u{2500} "),
        };

        let mut prefix = String::new();
        for &last in above {
            prefix.push_str(if last { "    " } else { pipe });
        }
        prefix.push_str(if is_last { corner } else { tee });
        prefix
    }
}
