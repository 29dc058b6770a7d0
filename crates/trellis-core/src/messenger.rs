//! Publish/subscribe event bus.
//!
//! A [`Messenger`] routes [`Event`]s from senders to listeners. Listeners
//! subscribe in one of three groups:
//!
//! - by sender: events raised by one object
//! - by type: events of one [`EventType`], from any sender
//! - global: every event
//!
//! On [`publish`](Messenger::publish) the groups run in that order, and within
//! a group listeners run in subscription order.
//!
//! # Context
//!
//! The messenger is generic over the context `C` that listeners receive
//! mutably, so a listener may create or destroy objects, publish further
//! events, or subscribe new listeners while it runs. The context owns the
//! messenger and exposes it through [`EventHost`]. In production the context
//! is the [`Runtime`](crate::Runtime).
//!
//! # Gating
//!
//! Delivery can be switched off globally ([`set_enabled`](Messenger::set_enabled))
//! or per event type / category. The gate is checked once per publish, before
//! any listener runs. Individual subscriptions can also be disabled; that flag
//! is checked right before each delivery.
//!
//! # Failures
//!
//! A listener that returns `Err` or panics does not stop delivery to the
//! remaining listeners. The failure is logged and kept as a [`Diagnostic`]
//! until drained with [`take_diagnostics`](Messenger::take_diagnostics).

use std::any::Any;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::event::{Event, EventCategory, EventType};
use crate::uid::Uid;

new_key_type! {
    /// Identifies one subscription on a [`Messenger`].
    pub struct SubscriptionId;
}

/// Error type listeners may return.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Return type of every listener.
pub type ListenerResult = Result<(), ListenerError>;

type Listener<C> = Arc<Mutex<dyn FnMut(&mut C, &Event) -> ListenerResult + Send>>;

/// Which group a subscription belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionKey {
    /// Events raised by this sender.
    Sender(Uid),
    /// Events of this type.
    Type(EventType),
    /// Every event.
    All,
}

struct Subscription<C> {
    key: SubscriptionKey,
    listener: Listener<C>,
    enabled: bool,
}

/// A recorded listener failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// The failing subscription.
    pub subscription: SubscriptionId,
    /// The event being delivered.
    pub event: Event,
    /// The error text or panic message.
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "listener {:?} failed on {}: {}",
            self.subscription, self.event, self.message
        )
    }
}

/// Implemented by the context type that owns a [`Messenger`].
pub trait EventHost: Sized {
    /// Shared access to the messenger.
    fn messenger(&self) -> &Messenger<Self>;

    /// Exclusive access to the messenger.
    fn messenger_mut(&mut self) -> &mut Messenger<Self>;
}

/// The event bus. See the [module docs](self).
pub struct Messenger<C> {
    subscriptions: SlotMap<SubscriptionId, Subscription<C>>,
    by_sender: HashMap<Uid, Vec<SubscriptionId>>,
    by_type: HashMap<EventType, Vec<SubscriptionId>>,
    global: Vec<SubscriptionId>,
    enabled: bool,
    disabled_types: HashSet<EventType>,
    diagnostics: VecDeque<Diagnostic>,
    diagnostic_capacity: usize,
}

impl<C> Messenger<C> {
    /// Default number of diagnostics kept before the oldest are dropped.
    pub const DEFAULT_DIAGNOSTIC_CAPACITY: usize = 64;

    /// Create an enabled messenger with no subscriptions.
    pub fn new() -> Self {
        Self::with_diagnostic_capacity(Self::DEFAULT_DIAGNOSTIC_CAPACITY)
    }

    /// Create a messenger keeping at most `capacity` diagnostics.
    pub fn with_diagnostic_capacity(capacity: usize) -> Self {
        Self {
            subscriptions: SlotMap::with_key(),
            by_sender: HashMap::new(),
            by_type: HashMap::new(),
            global: Vec::new(),
            enabled: true,
            disabled_types: HashSet::new(),
            diagnostics: VecDeque::new(),
            diagnostic_capacity: capacity,
        }
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Listen to every event raised by `sender`.
    pub fn subscribe_by_sender<F>(&mut self, sender: Uid, listener: F) -> SubscriptionId
    where
        F: FnMut(&mut C, &Event) -> ListenerResult + Send + 'static,
    {
        self.subscribe(SubscriptionKey::Sender(sender), listener)
    }

    /// Listen to every event of `event_type`.
    pub fn subscribe_by_type<F>(&mut self, event_type: EventType, listener: F) -> SubscriptionId
    where
        F: FnMut(&mut C, &Event) -> ListenerResult + Send + 'static,
    {
        self.subscribe(SubscriptionKey::Type(event_type), listener)
    }

    /// Listen to every event.
    pub fn subscribe_all<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&mut C, &Event) -> ListenerResult + Send + 'static,
    {
        self.subscribe(SubscriptionKey::All, listener)
    }

    /// Subscribe under an explicit key.
    pub fn subscribe<F>(&mut self, key: SubscriptionKey, listener: F) -> SubscriptionId
    where
        F: FnMut(&mut C, &Event) -> ListenerResult + Send + 'static,
    {
        let listener: Listener<C> = Arc::new(Mutex::new(listener));
        let id = self.subscriptions.insert(Subscription {
            key,
            listener,
            enabled: true,
        });
        match key {
            SubscriptionKey::Sender(sender) => self.by_sender.entry(sender).or_default().push(id),
            SubscriptionKey::Type(event_type) => {
                self.by_type.entry(event_type).or_default().push(id)
            }
            SubscriptionKey::All => self.global.push(id),
        }
        tracing::trace!(target: "trellis_core::messenger", ?id, ?key, "subscribed");
        id
    }

    /// Remove a subscription.
    ///
    /// Returns `true` if the subscription existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let Some(subscription) = self.subscriptions.remove(id) else {
            return false;
        };
        match subscription.key {
            SubscriptionKey::Sender(sender) => {
                if let Some(ids) = self.by_sender.get_mut(&sender) {
                    ids.retain(|&s| s != id);
                    if ids.is_empty() {
                        self.by_sender.remove(&sender);
                    }
                }
            }
            SubscriptionKey::Type(event_type) => {
                if let Some(ids) = self.by_type.get_mut(&event_type) {
                    ids.retain(|&s| s != id);
                    if ids.is_empty() {
                        self.by_type.remove(&event_type);
                    }
                }
            }
            SubscriptionKey::All => self.global.retain(|&s| s != id),
        }
        true
    }

    /// Remove every subscription keyed on `sender`.
    ///
    /// Returns the number removed.
    pub fn unsubscribe_sender(&mut self, sender: Uid) -> usize {
        let ids = self.by_sender.remove(&sender).unwrap_or_default();
        for id in &ids {
            self.subscriptions.remove(*id);
        }
        ids.len()
    }

    /// The key a subscription was made with.
    pub fn subscription_key(&self, id: SubscriptionId) -> Option<SubscriptionKey> {
        self.subscriptions.get(id).map(|s| s.key)
    }

    /// Get the number of subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Enable or disable one subscription.
    ///
    /// Returns `false` if the subscription does not exist.
    pub fn set_listener_enabled(&mut self, id: SubscriptionId, enabled: bool) -> bool {
        match self.subscriptions.get_mut(id) {
            Some(subscription) => {
                subscription.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Check whether a subscription exists and is enabled.
    pub fn is_listener_enabled(&self, id: SubscriptionId) -> bool {
        self.subscriptions.get(id).is_some_and(|s| s.enabled)
    }

    // =========================================================================
    // Gate
    // =========================================================================

    /// Switch all delivery on or off.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Check if delivery is globally enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Resume delivery of `event_type`.
    pub fn enable_event_type(&mut self, event_type: EventType) {
        self.disabled_types.remove(&event_type);
    }

    /// Suppress delivery of `event_type` for every subscription group.
    pub fn disable_event_type(&mut self, event_type: EventType) {
        self.disabled_types.insert(event_type);
    }

    /// Check if `event_type` is not individually suppressed.
    pub fn is_event_type_enabled(&self, event_type: EventType) -> bool {
        !self.disabled_types.contains(&event_type)
    }

    /// Resume delivery of every type in `category`.
    pub fn enable_category(&mut self, category: EventCategory) {
        for event_type in EventType::in_category(category) {
            self.enable_event_type(event_type);
        }
    }

    /// Suppress delivery of every type in `category`.
    pub fn disable_category(&mut self, category: EventCategory) {
        for event_type in EventType::in_category(category) {
            self.disable_event_type(event_type);
        }
    }

    fn is_open(&self, event_type: EventType) -> bool {
        self.enabled && self.is_event_type_enabled(event_type)
    }

    /// Recipients of `event`, in delivery order.
    fn recipients(&self, event: &Event) -> Vec<SubscriptionId> {
        let by_sender = self.by_sender.get(&event.sender).into_iter().flatten();
        let by_type = self.by_type.get(&event.event_type).into_iter().flatten();
        by_sender.chain(by_type).chain(&self.global).copied().collect()
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// Recorded failures, oldest first.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// Drain the recorded failures, oldest first.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.diagnostics.drain(..).collect()
    }

    /// Change how many diagnostics are kept.
    pub fn set_diagnostic_capacity(&mut self, capacity: usize) {
        self.diagnostic_capacity = capacity;
        while self.diagnostics.len() > capacity {
            self.diagnostics.pop_front();
        }
    }

    fn record_failure(&mut self, subscription: SubscriptionId, event: Event, message: String) {
        tracing::error!(
            target: "trellis_core::messenger",
            ?subscription,
            %event,
            %message,
            "listener failed"
        );
        if self.diagnostic_capacity == 0 {
            return;
        }
        if self.diagnostics.len() == self.diagnostic_capacity {
            self.diagnostics.pop_front();
        }
        self.diagnostics.push_back(Diagnostic {
            subscription,
            event,
            message,
        });
    }
}

impl<C: EventHost> Messenger<C> {
    /// Deliver `event` to every matching listener.
    ///
    /// Returns the number of listeners that ran. Publishing while the
    /// messenger or the event type is disabled is a silent no-op.
    ///
    /// The recipient list is fixed when publishing starts: listeners added
    /// during delivery do not see this event, and listeners removed or
    /// disabled during delivery are skipped. A listener that re-publishes an
    /// event it would receive itself is not re-entered.
    pub fn publish(ctx: &mut C, event: Event) -> usize {
        let recipients = {
            let messenger = ctx.messenger();
            if !messenger.is_open(event.event_type) {
                return 0;
            }
            messenger.recipients(&event)
        };

        let mut delivered = 0;
        for id in recipients {
            let listener = match ctx.messenger().subscriptions.get(id) {
                Some(subscription) if subscription.enabled => subscription.listener.clone(),
                _ => continue,
            };
            let Some(mut guard) = listener.try_lock() else {
                tracing::trace!(target: "trellis_core::messenger", ?id, "listener busy, skipped");
                continue;
            };

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| (&mut *guard)(ctx, &event)));
            drop(guard);
            delivered += 1;

            let failure = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(err)) => Some(err.to_string()),
                Err(payload) => Some(panic_message(payload.as_ref())),
            };
            if let Some(message) = failure {
                ctx.messenger_mut().record_failure(id, event, message);
            }
        }
        delivered
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

impl<C> Default for Messenger<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for Messenger<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Messenger")
            .field("subscriptions", &self.subscriptions.len())
            .field("enabled", &self.enabled)
            .field("disabled_types", &self.disabled_types)
            .field("diagnostics", &self.diagnostics.len())
            .finish()
    }
}
