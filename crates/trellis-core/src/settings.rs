//! Opaque per-object settings values.
//!
//! A [`Restorable`](crate::Restorable) object describes its persistent state
//! as a [`SettingsValue`] tree. The snapshot codec stores the tree verbatim
//! and hands it back on restore; only the object itself interprets it.
//!
//! ```
//! use trellis_core::SettingsValue;
//!
//! let settings = SettingsValue::object()
//!     .with("expanded", true)
//!     .with("columns", vec![120, 80])
//!     .with("sort.column", 1);
//!
//! assert_eq!(settings.get_path("sort.column").and_then(|v| v.as_integer()), Some(1));
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

/// A value that can be stored in settings.
///
/// This enum represents all the primitive types that can be stored directly.
/// Object keys are kept sorted so encoded documents are stable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingsValue {
    /// A null/empty value.
    #[default]
    Null,
    /// A boolean value.
    Bool(bool),
    /// A 64-bit signed integer.
    Integer(i64),
    /// A 64-bit floating point number.
    Float(f64),
    /// A string value.
    String(String),
    /// An array of values.
    Array(Vec<SettingsValue>),
    /// A nested object/table.
    Object(BTreeMap<String, SettingsValue>),
}

impl SettingsValue {
    /// Create an empty object value.
    pub fn object() -> Self {
        SettingsValue::Object(BTreeMap::new())
    }

    /// Builder-style insert. Paths use "." or "/" as separators and create
    /// intermediate objects as needed.
    pub fn with<V: Into<SettingsValue>>(mut self, path: &str, value: V) -> Self {
        self.set_path(path, value);
        self
    }

    /// Returns true if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, SettingsValue::Null)
    }

    /// Returns this value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingsValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns this value as an integer, if it is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            SettingsValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns this value as a float, if it is one.
    /// Also converts integers to floats.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            SettingsValue::Float(v) => Some(*v),
            SettingsValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Returns this value as a string, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingsValue::String(v) => Some(v),
            _ => None,
        }
    }

    /// Returns this value as an array, if it is one.
    pub fn as_array(&self) -> Option<&[SettingsValue]> {
        match self {
            SettingsValue::Array(v) => Some(v),
            _ => None,
        }
    }

    /// Returns this value as an object/table, if it is one.
    pub fn as_object(&self) -> Option<&BTreeMap<String, SettingsValue>> {
        match self {
            SettingsValue::Object(v) => Some(v),
            _ => None,
        }
    }

    /// Look up a direct member of an object value.
    pub fn get(&self, key: &str) -> Option<&SettingsValue> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Look up a nested member using a "." or "/" separated path.
    pub fn get_path(&self, path: &str) -> Option<&SettingsValue> {
        let mut current = self;
        for part in parse_path(path) {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// Set a nested member, creating intermediate objects.
    ///
    /// A non-object value found along the path is replaced by an object.
    pub fn set_path<V: Into<SettingsValue>>(&mut self, path: &str, value: V) {
        let parts = parse_path(path);
        if parts.is_empty() {
            return;
        }
        set_nested(self, &parts, value.into());
    }

    /// Typed lookup of a required key, for use inside `restore_settings`.
    pub fn require<T: FromSettingsValue>(&self, path: &str) -> Result<T, SettingsError> {
        let value = self
            .get_path(path)
            .ok_or_else(|| SettingsError::MissingKey(path.to_string()))?;
        T::from_settings_value(value).ok_or_else(|| SettingsError::wrong_type(path, T::TYPE_NAME))
    }
}

fn parse_path(path: &str) -> Vec<&str> {
    path.split(['.', '/']).filter(|s| !s.is_empty()).collect()
}

fn set_nested(target: &mut SettingsValue, parts: &[&str], value: SettingsValue) {
    if !matches!(target, SettingsValue::Object(_)) {
        *target = SettingsValue::object();
    }
    let SettingsValue::Object(map) = target else {
        return;
    };
    match parts {
        [] => {}
        [last] => {
            map.insert((*last).to_string(), value);
        }
        [first, rest @ ..] => {
            let entry = map
                .entry((*first).to_string())
                .or_insert_with(SettingsValue::object);
            set_nested(entry, rest, value);
        }
    }
}

impl From<bool> for SettingsValue {
    fn from(v: bool) -> Self {
        SettingsValue::Bool(v)
    }
}

impl From<i32> for SettingsValue {
    fn from(v: i32) -> Self {
        SettingsValue::Integer(v as i64)
    }
}

impl From<i64> for SettingsValue {
    fn from(v: i64) -> Self {
        SettingsValue::Integer(v)
    }
}

impl From<f64> for SettingsValue {
    fn from(v: f64) -> Self {
        SettingsValue::Float(v)
    }
}

impl From<String> for SettingsValue {
    fn from(v: String) -> Self {
        SettingsValue::String(v)
    }
}

impl From<&str> for SettingsValue {
    fn from(v: &str) -> Self {
        SettingsValue::String(v.to_string())
    }
}

impl<T: Into<SettingsValue>> From<Vec<T>> for SettingsValue {
    fn from(v: Vec<T>) -> Self {
        SettingsValue::Array(v.into_iter().map(Into::into).collect())
    }
}

/// Conversion out of a [`SettingsValue`].
pub trait FromSettingsValue: Sized {
    /// Human-readable type name used in [`SettingsError::WrongType`].
    const TYPE_NAME: &'static str;

    /// Convert, returning `None` on a type mismatch.
    fn from_settings_value(value: &SettingsValue) -> Option<Self>;
}

impl FromSettingsValue for bool {
    const TYPE_NAME: &'static str = "a boolean";

    fn from_settings_value(value: &SettingsValue) -> Option<Self> {
        value.as_bool()
    }
}

impl FromSettingsValue for i64 {
    const TYPE_NAME: &'static str = "an integer";

    fn from_settings_value(value: &SettingsValue) -> Option<Self> {
        value.as_integer()
    }
}

impl FromSettingsValue for i32 {
    const TYPE_NAME: &'static str = "a 32-bit integer";

    fn from_settings_value(value: &SettingsValue) -> Option<Self> {
        value.as_integer().and_then(|v| i32::try_from(v).ok())
    }
}

impl FromSettingsValue for f64 {
    const TYPE_NAME: &'static str = "a number";

    fn from_settings_value(value: &SettingsValue) -> Option<Self> {
        value.as_float()
    }
}

impl FromSettingsValue for String {
    const TYPE_NAME: &'static str = "a string";

    fn from_settings_value(value: &SettingsValue) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl<T: FromSettingsValue> FromSettingsValue for Vec<T> {
    const TYPE_NAME: &'static str = "an array";

    fn from_settings_value(value: &SettingsValue) -> Option<Self> {
        value
            .as_array()?
            .iter()
            .map(T::from_settings_value)
            .collect()
    }
}

impl FromSettingsValue for SettingsValue {
    const TYPE_NAME: &'static str = "any value";

    fn from_settings_value(value: &SettingsValue) -> Option<Self> {
        Some(value.clone())
    }
}
