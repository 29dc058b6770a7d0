//! Shared test objects for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use trellis::{
    Container, Object, ObjectKind, Paintable, Restorable, Runtime, SettingsError, SettingsValue,
    Theme, Uid,
};

pub type Log = Arc<Mutex<Vec<String>>>;

pub fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("trellis_core=trace")
        .with_test_writer()
        .try_init();
}

/// A restorable, paintable text field.
pub struct TextBox {
    pub text: String,
    pub wrap: bool,
    pub themes: Vec<String>,
}

impl TextBox {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            wrap: false,
            themes: Vec::new(),
        }
    }
}

impl Object for TextBox {
    fn kind(&self) -> ObjectKind {
        ObjectKind::TextEdit
    }

    fn as_paintable_mut(&mut self) -> Option<&mut dyn Paintable> {
        Some(self)
    }

    fn as_restorable(&self) -> Option<&dyn Restorable> {
        Some(self)
    }

    fn as_restorable_mut(&mut self) -> Option<&mut dyn Restorable> {
        Some(self)
    }
}

impl Paintable for TextBox {
    fn apply_theme(&mut self, theme: &Theme, _runtime: &mut Runtime) {
        self.themes.push(theme.name().to_string());
    }
}

impl Restorable for TextBox {
    fn serialize_settings(&self) -> SettingsValue {
        SettingsValue::object()
            .with("text", self.text.as_str())
            .with("layout.wrap", self.wrap)
    }

    fn restore_settings(&mut self, settings: &SettingsValue) -> Result<(), SettingsError> {
        self.text = settings.require("text")?;
        self.wrap = settings.require("layout.wrap")?;
        Ok(())
    }
}

/// A container that records its hooks and its own teardown.
pub struct Panel {
    pub name: &'static str,
    pub log: Log,
}

impl Panel {
    pub fn new(name: &'static str, log: &Log) -> Self {
        Self {
            name,
            log: log.clone(),
        }
    }
}

impl Object for Panel {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Panel
    }

    fn as_container_mut(&mut self) -> Option<&mut dyn Container> {
        Some(self)
    }

    fn on_destroy(&mut self, _runtime: &mut Runtime) {
        self.log.lock().push(format!("destroy {}", self.name));
    }
}

impl Container for Panel {
    fn add_child(&mut self, child: Uid, _kind: ObjectKind) {
        self.log.lock().push(format!("{} +{child}", self.name));
    }

    fn remove_child(&mut self, child: Uid) {
        self.log.lock().push(format!("{} -{child}", self.name));
    }
}

/// A plain object with no capabilities.
pub struct Plain(pub ObjectKind);

impl Object for Plain {
    fn kind(&self) -> ObjectKind {
        self.0
    }
}
