//! Themes and the theme store.
//!
//! A [`Theme`] is a named, immutable bundle of style parameters: a set of
//! [`ThemeVariables`] plus per-kind style templates that may reference those
//! variables with `var(--name)`. The [`ThemeStore`] holds every registered
//! theme and remembers which one is current.
//!
//! The store only tracks state. Pushing a newly activated theme to every live
//! [`Paintable`](crate::Paintable) object is done by
//! [`Runtime::set_theme`](crate::Runtime::set_theme).

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::{RegistryError, RegistryResult};
use crate::kind::ObjectKind;

/// Named style parameters (colors, spacings, fonts).
///
/// Names may be given with or without the leading `--`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThemeVariables {
    variables: BTreeMap<String, String>,
}

impl ThemeVariables {
    /// Create empty variables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let name = name.strip_prefix("--").unwrap_or(&name).to_string();
        self.variables.insert(name, value.into());
    }

    /// Get a variable value.
    pub fn get(&self, name: &str) -> Option<&str> {
        let name = name.strip_prefix("--").unwrap_or(name);
        self.variables.get(name).map(|s| s.as_str())
    }

    /// Check if a variable exists.
    pub fn contains(&self, name: &str) -> bool {
        let name = name.strip_prefix("--").unwrap_or(name);
        self.variables.contains_key(name)
    }

    /// Iterate over all variables in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.variables.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Returns true if no variable is set.
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// A named visual style bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    name: String,
    variables: ThemeVariables,
    kind_styles: HashMap<ObjectKind, String>,
}

impl Theme {
    /// Create an empty theme.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: ThemeVariables::new(),
            kind_styles: HashMap::new(),
        }
    }

    /// Builder-style variable assignment.
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.set(name, value);
        self
    }

    /// Builder-style per-kind template assignment.
    pub fn with_kind_style(mut self, kind: ObjectKind, template: impl Into<String>) -> Self {
        self.kind_styles.insert(kind, template.into());
        self
    }

    /// The theme's unique name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All variables.
    pub fn variables(&self) -> &ThemeVariables {
        &self.variables
    }

    /// Look up one variable.
    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name)
    }

    /// The raw style template for `kind`, if the theme defines one.
    pub fn style_for(&self, kind: ObjectKind) -> Option<&str> {
        self.kind_styles.get(&kind).map(|s| s.as_str())
    }

    /// The style template for `kind` with every `var(--name)` expanded.
    pub fn resolve_style(&self, kind: ObjectKind) -> Option<String> {
        self.style_for(kind).map(|template| self.resolve(template))
    }

    /// Expand `var(--name)` references in `template`.
    ///
    /// References to unknown variables are left untouched.
    pub fn resolve(&self, template: &str) -> String {
        const OPEN: &str = "var(--";

        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find(OPEN) {
            out.push_str(&rest[..start]);
            let after = &rest[start + OPEN.len()..];
            let Some(end) = after.find(')') else {
                out.push_str(&rest[start..]);
                rest = "";
                break;
            };
            match self.variables.get(after[..end].trim()) {
                Some(value) => out.push_str(value),
                None => out.push_str(&rest[start..start + OPEN.len() + end + 1]),
            }
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        out
    }
}

/// Catalog of registered themes plus the current one.
///
/// A store always has a current theme: it starts with an empty theme named
/// [`ThemeStore::DEFAULT_THEME`].
#[derive(Debug, Clone)]
pub struct ThemeStore {
    themes: Vec<Arc<Theme>>,
    by_name: HashMap<String, usize>,
    current: usize,
    generation: u64,
}

impl ThemeStore {
    /// Name of the theme every store starts with.
    pub const DEFAULT_THEME: &'static str = "default";

    /// Create a store holding only the default theme.
    pub fn new() -> Self {
        let default = Arc::new(Theme::new(Self::DEFAULT_THEME));
        let mut by_name = HashMap::new();
        by_name.insert(Self::DEFAULT_THEME.to_string(), 0);
        Self {
            themes: vec![default],
            by_name,
            current: 0,
            generation: 0,
        }
    }

    /// Register a theme, optionally making it current.
    ///
    /// Activation here only flips the pointer; use
    /// [`Runtime::register_theme`](crate::Runtime::register_theme) to also
    /// propagate it.
    pub fn register(&mut self, theme: Theme, activate: bool) -> RegistryResult<()> {
        if self.by_name.contains_key(theme.name()) {
            return Err(RegistryError::DuplicateThemeName(theme.name().to_string()));
        }
        let index = self.themes.len();
        self.by_name.insert(theme.name().to_string(), index);
        tracing::debug!(target: "trellis_core::theme", name = theme.name(), activate, "registered theme");
        self.themes.push(Arc::new(theme));
        if activate {
            self.make_current(index);
        }
        Ok(())
    }

    /// Make the named theme current and return it.
    pub fn activate(&mut self, name: &str) -> RegistryResult<Arc<Theme>> {
        let index = *self
            .by_name
            .get(name)
            .ok_or_else(|| RegistryError::UnknownTheme(name.to_string()))?;
        self.make_current(index);
        Ok(self.themes[index].clone())
    }

    fn make_current(&mut self, index: usize) {
        self.current = index;
        self.generation += 1;
    }

    /// The current theme.
    pub fn current(&self) -> &Arc<Theme> {
        &self.themes[self.current]
    }

    /// Find a registered theme.
    pub fn by_name(&self, name: &str) -> Option<&Arc<Theme>> {
        self.by_name.get(name).map(|&i| &self.themes[i])
    }

    /// Registered theme names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.themes.iter().map(|t| t.name())
    }

    /// Counter bumped on every activation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of registered themes, including the default one.
    pub fn len(&self) -> usize {
        self.themes.len()
    }

    /// Always false: the default theme is always present.
    pub fn is_empty(&self) -> bool {
        self.themes.is_empty()
    }
}

impl Default for ThemeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn night() -> Theme {
        Theme::new("night")
            .with_variable("--background", "#1E1E1E")
            .with_variable("text", "#D4D4D4")
            .with_kind_style(ObjectKind::TreeView, "background: var(--background); color: var(--text);")
    }

    #[test]
    fn test_variables_set_get() {
        let mut vars = ThemeVariables::new();
        vars.set("primary-color", "#007AFF");

        assert_eq!(vars.get("primary-color"), Some("#007AFF"));
        assert_eq!(vars.get("--primary-color"), Some("#007AFF"));
        assert!(vars.contains("--primary-color"));
    }

    #[test]
    fn test_resolve_kind_style() {
        let theme = night();
        assert_eq!(
            theme.resolve_style(ObjectKind::TreeView).as_deref(),
            Some("background: #1E1E1E; color: #D4D4D4;")
        );
        assert_eq!(theme.resolve_style(ObjectKind::Button), None);
    }

    #[test]
    fn test_resolve_leaves_unknown_and_unterminated() {
        let theme = night();
        assert_eq!(theme.resolve("a var(--nope) b"), "a var(--nope) b");
        assert_eq!(theme.resolve("x var(--text"), "x var(--text");
        assert_eq!(theme.resolve("var( --text )"), "var( --text )");
        assert_eq!(theme.resolve("var(-- text )"), "#D4D4D4");
    }

    #[test]
    fn test_store_starts_with_default() {
        let store = ThemeStore::new();
        assert_eq!(store.current().name(), ThemeStore::DEFAULT_THEME);
        assert_eq!(store.len(), 1);
        assert_eq!(store.generation(), 0);
    }

    #[test]
    fn test_register_and_activate() {
        let mut store = ThemeStore::new();
        store.register(night(), false).unwrap();
        assert_eq!(store.current().name(), "default");

        let active = store.activate("night").unwrap();
        assert_eq!(active.name(), "night");
        assert_eq!(store.current().name(), "night");
        assert_eq!(store.generation(), 1);
        assert_eq!(store.names().collect::<Vec<_>>(), vec!["default", "night"]);
    }

    #[test]
    fn test_register_with_activate() {
        let mut store = ThemeStore::new();
        store.register(night(), true).unwrap();
        assert_eq!(store.current().name(), "night");
    }

    #[test]
    fn test_duplicate_and_unknown() {
        let mut store = ThemeStore::new();
        store.register(night(), false).unwrap();
        assert_eq!(
            store.register(night(), true),
            Err(RegistryError::DuplicateThemeName("night".into()))
        );
        assert_eq!(store.current().name(), "default");
        assert_eq!(
            store.activate("day").unwrap_err(),
            RegistryError::UnknownTheme("day".into())
        );
        assert!(store.by_name("night").is_some());
        assert!(store.by_name("day").is_none());
    }
}
