//! The runtime context.
//!
//! A [`Runtime`] owns everything a set of objects shares: the
//! [`ObjectRegistry`], the [`ThemeStore`], the event [`Messenger`] and the
//! timers. Object callbacks receive `&mut Runtime`, so they may create and
//! destroy objects, publish events or switch themes while they run.
//!
//! # Reentrancy
//!
//! While a callback runs on an object, the object's instance is *lent* out of
//! its registry slot. The record stays, so lookups by id, alias or unique name
//! keep working; only typed access ([`Runtime::object`]) reports `None`.
//!
//! - Destroying a lent object removes it from every index right away. Its
//!   [`on_destroy`](Object::on_destroy) runs when the callback returns.
//! - Container hooks and theme applications aimed at a lent object are queued
//!   and delivered when it is returned.
//! - Every "all objects" walk works on a snapshot of ids and re-checks
//!   liveness before each step.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::capability::{Capabilities, Capability, Container, Object, WidgetHandle, object_cast, object_cast_mut};
use crate::config::RuntimeConfig;
use crate::error::{RegistryError, RegistryResult, RestoreError};
use crate::event::{Event, EventType};
use crate::kind::ObjectKind;
use crate::messenger::{EventHost, ListenerResult, Messenger, SubscriptionId};
use crate::object::{ObjectRecord, ObjectRegistry};
use crate::persist::{RestoreReport, SnapshotCodec, SnapshotDocument};
use crate::theme::{Theme, ThemeStore};
use crate::timer::{TimerId, TimerKind, TimerManager};
use crate::uid::Uid;

#[derive(Debug, Clone, Copy)]
enum Deferred {
    ChildAdded(Uid, ObjectKind),
    ChildRemoved(Uid),
    ApplyTheme,
}

impl Deferred {
    fn apply_hook(self, container: &mut dyn Container) {
        match self {
            Self::ChildAdded(child, kind) => container.add_child(child, kind),
            Self::ChildRemoved(child) => container.remove_child(child),
            Self::ApplyTheme => {}
        }
    }
}

/// Object lifecycle, theming, persistence and messaging context.
pub struct Runtime {
    registry: ObjectRegistry,
    themes: ThemeStore,
    messenger: Messenger<Runtime>,
    timers: TimerManager,
    config: RuntimeConfig,
    deferred: Vec<(Uid, Deferred)>,
}

static_assertions::assert_impl_all!(Runtime: Send);

impl Runtime {
    /// Create a runtime with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a runtime with a custom configuration.
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            registry: ObjectRegistry::new(),
            themes: ThemeStore::new(),
            messenger: Messenger::with_diagnostic_capacity(config.diagnostic_capacity),
            timers: TimerManager::new(),
            config,
            deferred: Vec::new(),
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Read-only access to the underlying registry.
    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Register `object`, created by `creator` ([`Uid::INVALID`] for a
    /// top-level object), and return its new id.
    ///
    /// Paintable objects receive the current theme before this returns.
    pub fn create<T: Object>(&mut self, creator: Uid, object: T) -> RegistryResult<Uid> {
        self.create_with(creator, |_| object)
    }

    /// Like [`create`](Self::create), for objects that need their own id at
    /// construction.
    pub fn create_with<T, F>(&mut self, creator: Uid, build: F) -> RegistryResult<Uid>
    where
        T: Object,
        F: FnOnce(Uid) -> T,
    {
        let id = self.registry.reserve(creator)?;
        let mut instance: Box<dyn Object> = Box::new(build(id));
        let capabilities = Capabilities::probe(instance.as_mut());
        let kind = instance.kind();
        self.registry.insert(id, creator, instance, capabilities);
        tracing::trace!(target: "trellis_core::object", %id, %kind, %creator, ?capabilities, "created");

        if capabilities.contains(Capability::Paintable) && self.config.apply_theme_on_create {
            let theme = self.themes.current().clone();
            self.apply_theme_to(id, &theme);
        }
        Ok(id)
    }

    /// Destroy a live object.
    ///
    /// With `ignore_if_has_children` set, an object that still has live
    /// children is left alone and `Ok(false)` is returned.
    ///
    /// Otherwise the object leaves every index, its parent container is
    /// notified, its children become roots, its timers and sender-keyed
    /// subscriptions are dropped, and finally its
    /// [`on_destroy`](Object::on_destroy) runs.
    pub fn destroy(&mut self, id: Uid, ignore_if_has_children: bool) -> RegistryResult<bool> {
        if !self.registry.contains(id) {
            return Err(RegistryError::InvalidId(id));
        }
        if ignore_if_has_children && self.registry.has_live_children(id) {
            tracing::trace!(target: "trellis_core::object", %id, "has children, not destroyed");
            return Ok(false);
        }
        let removed = self.registry.remove(id).ok_or(RegistryError::InvalidId(id))?;
        self.deferred.retain(|(target, _)| *target != id);
        self.timers.stop_owned_by(id);
        self.messenger.unsubscribe_sender(id);

        if let Some(parent) = removed.record.parent() {
            self.container_hook(parent, Deferred::ChildRemoved(id));
        }
        tracing::trace!(
            target: "trellis_core::object",
            %id,
            kind = %removed.record.kind(),
            orphaned = removed.record.children().len(),
            "destroyed"
        );

        match removed.instance {
            Some(mut instance) => instance.on_destroy(self),
            None => {
                tracing::trace!(target: "trellis_core::object", %id, "lent out, teardown deferred");
            }
        }
        Ok(true)
    }

    /// Destroy everything `creator` created, recursively, then `creator`
    /// itself. Returns the number of objects destroyed.
    ///
    /// Created objects are destroyed leaves first: repeated passes skip
    /// objects that still have children, and whatever remains once a pass
    /// makes no progress is destroyed by force.
    pub fn destroy_creator_tree(&mut self, creator: Uid) -> usize {
        let mut destroyed = self.destroy_created(creator);
        if self.registry.contains(creator) && matches!(self.destroy(creator, false), Ok(true)) {
            destroyed += 1;
        }
        self.registry.forget_creator(creator);
        destroyed
    }

    /// Walks creator chains depth first on an explicit stack.
    fn destroy_created(&mut self, root: Uid) -> usize {
        let mut destroyed = 0;
        let mut stack = vec![(root, self.registry.created_by(root), 0)];
        while let Some((_, created, next)) = stack.last_mut() {
            if let Some(&id) = created.get(*next) {
                *next += 1;
                let nested = self.registry.created_by(id);
                stack.push((id, nested, 0));
                continue;
            }
            let Some((creator, _, _)) = stack.pop() else {
                break;
            };
            destroyed += self.destroy_created_by(creator);
            if creator != root {
                self.registry.forget_creator(creator);
            }
        }
        destroyed
    }

    /// Destroy the live objects `creator` created directly.
    fn destroy_created_by(&mut self, creator: Uid) -> usize {
        let mut destroyed = 0;
        loop {
            let remaining = self.registry.created_by(creator);
            if remaining.is_empty() {
                break;
            }
            let mut progress = false;
            for &id in &remaining {
                if self.registry.contains(id) && matches!(self.destroy(id, true), Ok(true)) {
                    destroyed += 1;
                    progress = true;
                }
            }
            if progress {
                continue;
            }

            tracing::warn!(
                target: "trellis_core::object",
                %creator,
                remaining = remaining.len(),
                "teardown stalled, forcing"
            );
            for id in remaining {
                if self.registry.contains(id) && matches!(self.destroy(id, false), Ok(true)) {
                    destroyed += 1;
                }
            }
            break;
        }
        destroyed
    }

    /// Run `f` on a lent object of concrete type `T`.
    ///
    /// Returns `None` if the object is not live, is already lent out, or is
    /// not a `T`.
    pub fn with_object_mut<T, R>(&mut self, id: Uid, f: impl FnOnce(&mut T, &mut Runtime) -> R) -> Option<R>
    where
        T: Object,
    {
        if self.object::<T>(id).is_none() {
            return None;
        }
        self.with_lent(id, |object, runtime| object_cast_mut::<T>(object).map(|o| f(o, runtime)))
            .flatten()
    }

    /// The instance goes back to its slot even if `f` panics; the panic is
    /// resumed afterwards.
    fn with_lent<R>(&mut self, id: Uid, f: impl FnOnce(&mut dyn Object, &mut Runtime) -> R) -> Option<R> {
        let mut instance = self.registry.take_instance(id)?;
        let result = panic::catch_unwind(AssertUnwindSafe(|| f(instance.as_mut(), self)));
        match self.registry.return_instance(id, instance) {
            Ok(()) => self.flush_deferred(id),
            Err(mut orphan) => {
                tracing::trace!(target: "trellis_core::object", %id, "running deferred teardown");
                orphan.on_destroy(self);
            }
        }
        match result {
            Ok(result) => Some(result),
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    fn container_hook(&mut self, container: Uid, hook: Deferred) {
        if let Some(target) = self
            .registry
            .instance_mut(container)
            .and_then(|o| o.as_container_mut())
        {
            hook.apply_hook(target);
        } else if self.registry.contains(container) {
            self.deferred.push((container, hook));
        }
    }

    fn flush_deferred(&mut self, id: Uid) {
        if !self.deferred.iter().any(|(target, _)| *target == id) {
            return;
        }
        let (mine, rest): (Vec<_>, Vec<_>) = self.deferred.drain(..).partition(|(target, _)| *target == id);
        self.deferred = rest;
        for (_, action) in mine {
            match action {
                Deferred::ApplyTheme => {
                    let theme = self.themes.current().clone();
                    self.apply_theme_to(id, &theme);
                }
                hook => self.container_hook(id, hook),
            }
        }
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Check if an object is live.
    pub fn is_live(&self, id: Uid) -> bool {
        self.registry.contains(id)
    }

    /// The record of a live object.
    pub fn lookup(&self, id: Uid) -> Option<&ObjectRecord> {
        self.registry.record(id)
    }

    /// The record of the live object holding `alias`.
    pub fn lookup_by_alias(&self, alias: &str) -> Option<&ObjectRecord> {
        self.registry.by_alias(alias).and_then(|id| self.registry.record(id))
    }

    /// The record of the live object holding the unique name `name`.
    pub fn lookup_by_unique_name(&self, name: &str) -> Option<&ObjectRecord> {
        self.registry
            .by_unique_name(name)
            .and_then(|id| self.registry.record(id))
    }

    /// Typed access to a live object.
    ///
    /// Returns `None` if the object is not live, is not a `T`, or is lent out
    /// to a running callback.
    pub fn object<T: Object>(&self, id: Uid) -> Option<&T> {
        self.registry.instance(id).and_then(object_cast::<T>)
    }

    /// Typed mutable access to a live object.
    pub fn object_mut<T: Object>(&mut self, id: Uid) -> Option<&mut T> {
        self.registry.instance_mut(id).and_then(object_cast_mut::<T>)
    }

    /// Set or clear (empty string) an object's alias.
    pub fn set_alias(&mut self, id: Uid, alias: &str) -> RegistryResult<()> {
        self.registry.set_alias(id, alias)
    }

    /// Set or clear (empty string) an object's unique name.
    pub fn set_unique_name(&mut self, id: Uid, name: &str) -> RegistryResult<()> {
        self.registry.set_unique_name(id, name)
    }

    /// Get the number of live objects.
    pub fn object_count(&self) -> usize {
        self.registry.len()
    }

    /// All live ids, ascending.
    pub fn live_ids(&self) -> Vec<Uid> {
        self.registry.ids()
    }

    /// Check whether a live object declared `capability`.
    pub fn has_capability(&self, id: Uid, capability: Capability) -> bool {
        self.registry.record(id).is_some_and(|r| r.has(capability))
    }

    /// The presentation handle of a live Widget.
    pub fn widget_handle(&self, id: Uid) -> Option<WidgetHandle> {
        if !self.has_capability(id, Capability::Widget) {
            return None;
        }
        self.registry
            .instance(id)
            .and_then(|o| o.as_widget())
            .map(|w| w.widget_handle())
    }

    // =========================================================================
    // Hierarchy and ownership
    // =========================================================================

    /// Move `child` into the container `parent`, or make it a root with `None`.
    ///
    /// The old and new containers are told through their
    /// [`Container`] hooks.
    pub fn set_parent(&mut self, child: Uid, parent: Option<Uid>) -> RegistryResult<()> {
        let old = self.registry.set_parent(child, parent)?;
        if old == parent {
            return Ok(());
        }
        let kind = self
            .registry
            .record(child)
            .map(|r| r.kind())
            .ok_or(RegistryError::InvalidId(child))?;
        if let Some(old) = old {
            self.container_hook(old, Deferred::ChildRemoved(child));
        }
        if let Some(parent) = parent {
            self.container_hook(parent, Deferred::ChildAdded(child, kind));
        }
        Ok(())
    }

    /// Children of a live object, in insertion order.
    pub fn children(&self, id: Uid) -> RegistryResult<&[Uid]> {
        self.registry.children(id)
    }

    /// Parent of a live object.
    pub fn parent(&self, id: Uid) -> RegistryResult<Option<Uid>> {
        self.registry.parent(id)
    }

    /// Live objects created by `creator`, ascending.
    pub fn created_by(&self, creator: Uid) -> Vec<Uid> {
        self.registry.created_by(creator)
    }

    /// Creator of a live object.
    pub fn creator_of(&self, id: Uid) -> RegistryResult<Uid> {
        self.registry.creator_of(id)
    }

    // =========================================================================
    // Themes
    // =========================================================================

    /// Register a theme; with `activate`, also make it current and apply it.
    pub fn register_theme(&mut self, theme: Theme, activate: bool) -> RegistryResult<()> {
        let name = theme.name().to_string();
        self.themes.register(theme, false)?;
        if activate {
            self.set_theme(&name)?;
        }
        Ok(())
    }

    /// Make the named theme current and apply it to every live Paintable
    /// object, in ascending id order.
    ///
    /// Objects created or destroyed by an `apply_theme` callback are handled
    /// consistently: new objects were themed on creation and are not visited
    /// again, destroyed ones are skipped. If a callback switches the theme
    /// again, this walk stops and the nested one wins.
    pub fn set_theme(&mut self, name: &str) -> RegistryResult<()> {
        let theme = self.themes.activate(name)?;
        let generation = self.themes.generation();
        let targets = self.registry.ids_with(Capability::Paintable);
        tracing::debug!(target: "trellis_core::theme", name, objects = targets.len(), "applying theme");

        for id in targets {
            if self.themes.generation() != generation {
                tracing::debug!(target: "trellis_core::theme", name, "superseded by a nested activation");
                break;
            }
            if self.registry.contains(id) {
                self.apply_theme_to(id, &theme);
            }
        }
        Ok(())
    }

    fn apply_theme_to(&mut self, id: Uid, theme: &Theme) {
        let applied = self.with_lent(id, |object, runtime| {
            if let Some(paintable) = object.as_paintable_mut() {
                paintable.apply_theme(theme, runtime);
            }
        });
        let queued = self
            .deferred
            .iter()
            .any(|(target, action)| *target == id && matches!(action, Deferred::ApplyTheme));
        if applied.is_none() && !queued && self.registry.contains(id) {
            self.deferred.push((id, Deferred::ApplyTheme));
        }
    }

    /// The current theme.
    pub fn current_theme(&self) -> &Arc<Theme> {
        self.themes.current()
    }

    /// The theme catalog.
    pub fn themes(&self) -> &ThemeStore {
        &self.themes
    }

    // =========================================================================
    // Messaging
    // =========================================================================

    /// Publish an event. Returns the number of listeners that ran.
    pub fn publish(&mut self, sender: Uid, event_type: EventType, info1: i64, info2: i64) -> usize {
        Messenger::publish(self, Event::new(sender, event_type, info1, info2))
    }

    /// Publish a prepared event.
    pub fn publish_event(&mut self, event: Event) -> usize {
        Messenger::publish(self, event)
    }

    /// Listen to every event raised by `sender`.
    pub fn subscribe_by_sender<F>(&mut self, sender: Uid, listener: F) -> SubscriptionId
    where
        F: FnMut(&mut Runtime, &Event) -> ListenerResult + Send + 'static,
    {
        self.messenger.subscribe_by_sender(sender, listener)
    }

    /// Listen to every event of `event_type`.
    pub fn subscribe_by_type<F>(&mut self, event_type: EventType, listener: F) -> SubscriptionId
    where
        F: FnMut(&mut Runtime, &Event) -> ListenerResult + Send + 'static,
    {
        self.messenger.subscribe_by_type(event_type, listener)
    }

    /// Listen to every event.
    pub fn subscribe_all<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&mut Runtime, &Event) -> ListenerResult + Send + 'static,
    {
        self.messenger.subscribe_all(listener)
    }

    /// Remove a subscription.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.messenger.unsubscribe(id)
    }

    /// Run `f` with one listener disabled, then restore its previous state.
    ///
    /// This is how a listener keeps itself from hearing the events it raises.
    pub fn while_listener_disabled<R>(&mut self, id: SubscriptionId, f: impl FnOnce(&mut Runtime) -> R) -> R {
        let was_enabled = self.messenger.is_listener_enabled(id);
        self.messenger.set_listener_enabled(id, false);
        let result = f(self);
        if was_enabled {
            self.messenger.set_listener_enabled(id, true);
        }
        result
    }

    // =========================================================================
    // Timers
    // =========================================================================

    /// Start a timer owned by `owner`, counting from now.
    pub fn start_timer(&mut self, owner: Uid, interval: Duration, kind: TimerKind) -> RegistryResult<TimerId> {
        self.start_timer_at(owner, interval, kind, Instant::now())
    }

    /// Start a timer owned by `owner`, counting from `now`.
    pub fn start_timer_at(
        &mut self,
        owner: Uid,
        interval: Duration,
        kind: TimerKind,
        now: Instant,
    ) -> RegistryResult<TimerId> {
        if !self.registry.contains(owner) {
            return Err(RegistryError::InvalidId(owner));
        }
        Ok(self.timers.start(owner, interval, kind, now))
    }

    /// Stop a timer. Returns `false` if it was not active.
    pub fn stop_timer(&mut self, id: TimerId) -> bool {
        self.timers.stop(id)
    }

    /// Check if a timer is active.
    pub fn is_timer_active(&self, id: TimerId) -> bool {
        self.timers.is_active(id)
    }

    /// Time from `now` until the next timer is due.
    pub fn time_until_next_timer(&mut self, now: Instant) -> Option<Duration> {
        self.timers.time_until_next(now)
    }

    /// Fire every timer due at `now` as a
    /// [`TimerFired`](EventType::TimerFired) event from its owner, with the
    /// timer's sequence number in `info1` and its fire count in `info2`.
    ///
    /// A timer stopped by a listener earlier in the same call is not
    /// reported. Returns the number of timers that fired.
    pub fn process_timers(&mut self, now: Instant) -> usize {
        let mut fired = 0;
        for firing in self.timers.process_expired(now) {
            if !self.timers.claim(firing.id) || !self.registry.contains(firing.owner) {
                continue;
            }
            fired += 1;
            self.publish(
                firing.owner,
                EventType::TimerFired,
                i64::try_from(firing.sequence).unwrap_or(i64::MAX),
                i64::try_from(firing.fire_count).unwrap_or(i64::MAX),
            );
        }
        fired
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Capture the settings of every aliased, restorable object.
    pub fn save_snapshot(&self, application_version: &str) -> SnapshotDocument {
        SnapshotCodec::save(&self.registry, application_version)
    }

    /// Restore a snapshot into the live objects holding its aliases.
    pub fn restore_snapshot(
        &mut self,
        document: &SnapshotDocument,
        application_version: &str,
    ) -> Result<RestoreReport, RestoreError> {
        SnapshotCodec::restore(
            &mut self.registry,
            document,
            application_version,
            self.config.missing_alias,
        )
    }
}

impl EventHost for Runtime {
    fn messenger(&self) -> &Messenger<Self> {
        &self.messenger
    }

    fn messenger_mut(&mut self) -> &mut Messenger<Self> {
        &mut self.messenger
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("registry", &self.registry)
            .field("theme", &self.themes.current().name())
            .field("messenger", &self.messenger)
            .field("timers", &self.timers.active_count())
            .finish()
    }
}

/// A [`Runtime`] behind a mutex, for embedders that move it across threads.
#[derive(Debug, Default)]
pub struct SharedRuntime {
    inner: Mutex<Runtime>,
}

static_assertions::assert_impl_all!(SharedRuntime: Send, Sync);

impl SharedRuntime {
    /// Wrap a runtime.
    pub fn new(runtime: Runtime) -> Self {
        Self {
            inner: Mutex::new(runtime),
        }
    }

    /// Run `f` with exclusive access to the runtime.
    pub fn with<R>(&self, f: impl FnOnce(&mut Runtime) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Unwrap the runtime.
    pub fn into_inner(self) -> Runtime {
        self.inner.into_inner()
    }
}
