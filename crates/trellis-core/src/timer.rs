//! Object-owned timers.
//!
//! Timers are bookkeeping only: the core never sleeps or spawns threads. The
//! embedder calls [`Runtime::process_timers`](crate::Runtime::process_timers)
//! from its own loop, and every due timer is reported as a
//! [`EventType::TimerFired`](crate::EventType::TimerFired) event sent by the
//! owning object.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use slotmap::{SlotMap, new_key_type};

use crate::uid::Uid;

new_key_type! {
    /// A unique identifier for a timer.
    pub struct TimerId;
}

/// The type of timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Fires once after the specified duration.
    OneShot,
    /// Fires repeatedly at the specified interval.
    Repeating,
}

#[derive(Debug)]
struct TimerData {
    owner: Uid,
    /// Creation sequence, reported as `info1` of the fired event.
    sequence: u64,
    next_fire: Instant,
    interval: Duration,
    kind: TimerKind,
    fire_count: u64,
    /// A one-shot timer that fired and awaits [`TimerManager::claim`].
    spent: bool,
}

/// An entry in the timer queue (min-heap by fire time, then sequence).
#[derive(Debug, Clone, Copy)]
struct TimerQueueEntry {
    id: TimerId,
    fire_time: Instant,
    sequence: u64,
}

impl PartialEq for TimerQueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TimerQueueEntry {}

impl PartialOrd for TimerQueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerQueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap.
        (other.fire_time, other.sequence).cmp(&(self.fire_time, self.sequence))
    }
}

/// One expiry reported by [`TimerManager::process_expired`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFiring {
    /// The timer that fired.
    pub id: TimerId,
    /// The object owning the timer.
    pub owner: Uid,
    /// The timer's creation sequence number.
    pub sequence: u64,
    /// How many times this timer has fired, including this one.
    pub fire_count: u64,
}

/// Manages all timers of a runtime.
#[derive(Debug, Default)]
pub struct TimerManager {
    timers: SlotMap<TimerId, TimerData>,
    queue: BinaryHeap<TimerQueueEntry>,
    next_sequence: u64,
}

impl TimerManager {
    /// Create a new timer manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a timer owned by `owner` whose first expiry is `now + interval`.
    pub fn start(&mut self, owner: Uid, interval: Duration, kind: TimerKind, now: Instant) -> TimerId {
        self.next_sequence += 1;
        let sequence = self.next_sequence;
        let next_fire = now + interval;

        let id = self.timers.insert(TimerData {
            owner,
            sequence,
            next_fire,
            interval,
            kind,
            fire_count: 0,
            spent: false,
        });
        self.queue.push(TimerQueueEntry {
            id,
            fire_time: next_fire,
            sequence,
        });
        tracing::trace!(target: "trellis_core::timer", ?id, %owner, ?interval, ?kind, "timer started");
        id
    }

    /// Stop and remove a timer.
    ///
    /// Returns `true` if the timer was active.
    pub fn stop(&mut self, id: TimerId) -> bool {
        self.timers.remove(id).is_some_and(|t| !t.spent)
    }

    /// Stop every timer owned by `owner`. Returns how many were stopped.
    pub fn stop_owned_by(&mut self, owner: Uid) -> usize {
        let mut stopped = 0;
        self.timers.retain(|_, t| {
            if t.owner != owner {
                return true;
            }
            if !t.spent {
                stopped += 1;
            }
            false
        });
        stopped
    }

    /// Check if a timer is currently active.
    pub fn is_active(&self, id: TimerId) -> bool {
        self.timers.get(id).is_some_and(|t| !t.spent)
    }

    /// The owner of an active timer.
    pub fn owner(&self, id: TimerId) -> Option<Uid> {
        self.timers.get(id).filter(|t| !t.spent).map(|t| t.owner)
    }

    /// Get the duration from `now` until the next timer fires, if any.
    pub fn time_until_next(&mut self, now: Instant) -> Option<Duration> {
        self.discard_stale();
        self.queue
            .peek()
            .map(|entry| entry.fire_time.saturating_duration_since(now))
    }

    fn discard_stale(&mut self) {
        while let Some(entry) = self.queue.peek() {
            if self.is_current(entry) {
                break;
            }
            self.queue.pop();
        }
    }

    /// A queue entry is stale once its timer is gone or rescheduled.
    fn is_current(&self, entry: &TimerQueueEntry) -> bool {
        self.timers
            .get(entry.id)
            .is_some_and(|t| t.next_fire == entry.fire_time)
    }

    /// Collect every timer due at `now`, in expiry order.
    ///
    /// Each timer fires at most once per call, so a zero-interval repeating
    /// timer cannot stall the caller.
    pub fn process_expired(&mut self, now: Instant) -> Vec<TimerFiring> {
        let mut due = Vec::new();
        while let Some(entry) = self.queue.peek() {
            if entry.fire_time > now {
                break;
            }
            let entry = *entry;
            self.queue.pop();
            if self.is_current(&entry) {
                due.push(entry.id);
            }
        }

        let mut firings = Vec::with_capacity(due.len());
        for id in due {
            let Some(timer) = self.timers.get_mut(id) else {
                continue;
            };
            timer.fire_count += 1;
            firings.push(TimerFiring {
                id,
                owner: timer.owner,
                sequence: timer.sequence,
                fire_count: timer.fire_count,
            });
            tracing::trace!(target: "trellis_core::timer", ?id, fire_count = timer.fire_count, "timer fired");

            match timer.kind {
                TimerKind::OneShot => {
                    timer.spent = true;
                }
                TimerKind::Repeating => {
                    timer.next_fire = now + timer.interval;
                    self.queue.push(TimerQueueEntry {
                        id,
                        fire_time: timer.next_fire,
                        sequence: timer.sequence,
                    });
                }
            }
        }
        firings
    }

    /// Confirm that a firing from the last
    /// [`process_expired`](Self::process_expired) should still be delivered.
    ///
    /// Returns `false` if the timer was stopped since. A fired one-shot timer
    /// is held until it is claimed or stopped.
    pub fn claim(&mut self, id: TimerId) -> bool {
        match self.timers.get(id) {
            Some(timer) if timer.spent => {
                self.timers.remove(id);
                true
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Get the number of active timers.
    pub fn active_count(&self) -> usize {
        self.timers.values().filter(|t| !t.spent).count()
    }
}
