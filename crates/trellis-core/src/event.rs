//! Event records delivered through the [`Messenger`](crate::Messenger).

use std::fmt;

use crate::uid::Uid;

/// Broad grouping of event types, used for gating whole families at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    /// Pointer activation.
    Pointer,
    /// Value edits (spin boxes, sliders, property cells).
    Value,
    /// Selection changes in views.
    Selection,
    /// Text edits.
    Text,
    /// Keyboard input.
    Keyboard,
    /// Checked/expanded/visible style state flips.
    State,
    /// Focus transitions.
    Focus,
    /// Timer expiry.
    Timer,
}

/// The closed set of event types surfaced to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventType {
    /// A button, item or action was activated.
    Click,
    /// A value changed. `info1`/`info2` are kind specific (e.g. row/column).
    ValueChanged,
    /// The selection changed. `info1` usually carries the item id.
    SelectionChanged,
    /// Text content changed.
    TextChanged,
    /// A key was pressed. `info1` is the key code, `info2` the modifiers.
    KeyPressed,
    /// A state flag changed (checked, expanded, ...).
    StateChanged,
    /// The sender gained keyboard focus.
    FocusGained,
    /// The sender lost keyboard focus.
    FocusLost,
    /// A timer owned by the sender fired.
    TimerFired,
    /// The sender's content was cleared.
    Cleared,
}

impl EventType {
    /// Every event type, in declaration order.
    pub const ALL: [EventType; 10] = [
        Self::Click,
        Self::ValueChanged,
        Self::SelectionChanged,
        Self::TextChanged,
        Self::KeyPressed,
        Self::StateChanged,
        Self::FocusGained,
        Self::FocusLost,
        Self::TimerFired,
        Self::Cleared,
    ];

    /// Get the category of this event type.
    pub fn category(self) -> EventCategory {
        match self {
            Self::Click => EventCategory::Pointer,
            Self::ValueChanged => EventCategory::Value,
            Self::SelectionChanged | Self::Cleared => EventCategory::Selection,
            Self::TextChanged => EventCategory::Text,
            Self::KeyPressed => EventCategory::Keyboard,
            Self::StateChanged => EventCategory::State,
            Self::FocusGained | Self::FocusLost => EventCategory::Focus,
            Self::TimerFired => EventCategory::Timer,
        }
    }

    /// Iterate the event types belonging to `category`.
    pub fn in_category(category: EventCategory) -> impl Iterator<Item = EventType> {
        Self::ALL.into_iter().filter(move |t| t.category() == category)
    }

    /// Stable lowercase name, used in diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::ValueChanged => "value-changed",
            Self::SelectionChanged => "selection-changed",
            Self::TextChanged => "text-changed",
            Self::KeyPressed => "key-pressed",
            Self::StateChanged => "state-changed",
            Self::FocusGained => "focus-gained",
            Self::FocusLost => "focus-lost",
            Self::TimerFired => "timer-fired",
            Self::Cleared => "cleared",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single notification: who sent it, what happened, and two integers of
/// type-dependent detail.
///
/// Listeners that need richer state fetch it from the sender via its [`Uid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    /// The object that raised the event.
    pub sender: Uid,
    /// What happened.
    pub event_type: EventType,
    /// First detail value.
    pub info1: i64,
    /// Second detail value.
    pub info2: i64,
}

impl Event {
    /// Create an event with both detail values set.
    pub fn new(sender: Uid, event_type: EventType, info1: i64, info2: i64) -> Self {
        Self {
            sender,
            event_type,
            info1,
            info2,
        }
    }

    /// Create an event with zeroed detail values.
    pub fn simple(sender: Uid, event_type: EventType) -> Self {
        Self::new(sender, event_type, 0, 0)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} from {} ({}, {})",
            self.event_type, self.sender, self.info1, self.info2
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_cover_all_types() {
        let focus: Vec<_> = EventType::in_category(EventCategory::Focus).collect();
        assert_eq!(focus, vec![EventType::FocusGained, EventType::FocusLost]);

        let selection: Vec<_> = EventType::in_category(EventCategory::Selection).collect();
        assert_eq!(selection, vec![EventType::SelectionChanged, EventType::Cleared]);
    }

    #[test]
    fn test_event_display() {
        let event = Event::new(Uid::from_raw(3), EventType::ValueChanged, 2, 5);
        assert_eq!(event.to_string(), "value-changed from #3 (2, 5)");
    }
}
