//! Runtime configuration.

/// What a restore does with a snapshot record whose alias no live object
/// holds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MissingAliasPolicy {
    /// Skip the record and report it in the restore report.
    #[default]
    Skip,
    /// Fail the whole restore with
    /// [`RestoreError::MissingObject`](crate::RestoreError::MissingObject)
    /// before any object is touched.
    Strict,
}

/// Tunables for a [`Runtime`](crate::Runtime).
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Handling of unmatched snapshot records.
    pub missing_alias: MissingAliasPolicy,
    /// Listener failures kept before the oldest are dropped.
    pub diagnostic_capacity: usize,
    /// Apply the current theme to Paintable objects as they are created.
    pub apply_theme_on_create: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            missing_alias: MissingAliasPolicy::Skip,
            diagnostic_capacity: 64,
            apply_theme_on_create: true,
        }
    }
}

impl RuntimeConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the missing-alias policy for restores.
    pub fn missing_alias(mut self, policy: MissingAliasPolicy) -> Self {
        self.missing_alias = policy;
        self
    }

    /// Set the number of listener diagnostics kept.
    pub fn diagnostic_capacity(mut self, capacity: usize) -> Self {
        self.diagnostic_capacity = capacity;
        self
    }

    /// Enable or disable theming on creation.
    pub fn apply_theme_on_create(mut self, enabled: bool) -> Self {
        self.apply_theme_on_create = enabled;
        self
    }
}
