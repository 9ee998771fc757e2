//! # Scheduler
//!
//! A single queue of delayed events on a virtual clock.
//!
//! Nothing in the core reads the OS clock. Time only moves when the owner
//! pops due events or advances the clock explicitly, which makes every
//! timer-driven behavior reproducible in tests. A real-time driver sleeps
//! until `next_deadline()` and then advances by the same amount.
//!
//! Ordering: events fire by deadline, and events sharing a deadline fire in
//! the order they were scheduled.

use crate::types::Millis;
use std::collections::BTreeMap;

/// Identifier of a scheduled event. Doubles as the insertion sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub u64);

/// Virtual clock plus pending events.
#[derive(Debug)]
pub struct Scheduler<E> {
    now: Millis,
    next_id: u64,
    /// Pending events keyed by `(deadline, id)`.
    queue: BTreeMap<(Millis, TimerId), E>,
    /// Reverse index used by `cancel`.
    deadlines: BTreeMap<TimerId, Millis>,
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Scheduler<E> {
    /// Create a scheduler at time zero with no pending events.
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: Millis::ZERO,
            next_id: 0,
            queue: BTreeMap::new(),
            deadlines: BTreeMap::new(),
        }
    }

    /// Current virtual time.
    #[must_use]
    pub fn now(&self) -> Millis {
        self.now
    }

    /// Schedule `event` to fire `delay` after the current time.
    pub fn schedule(&mut self, delay: Millis, event: E) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);

        let deadline = self.now.saturating_add(delay);
        self.queue.insert((deadline, id), event);
        self.deadlines.insert(id, deadline);
        id
    }

    /// Cancel a pending event.
    ///
    /// Returns `false` if the event already fired or was already cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.deadlines.remove(&id) {
            Some(deadline) => self.queue.remove(&(deadline, id)).is_some(),
            None => false,
        }
    }

    /// Check if an event is still pending.
    #[must_use]
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.deadlines.contains_key(&id)
    }

    /// Deadline of the earliest pending event.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Millis> {
        self.queue.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Number of pending events.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Pop the earliest event due at or before `until`.
    ///
    /// The clock moves to the event's deadline (never backwards), so any
    /// event scheduled while handling it is measured from the moment it
    /// fired, not from `until`.
    pub fn pop_due(&mut self, until: Millis) -> Option<(TimerId, E)> {
        let (&(deadline, id), _) = self.queue.first_key_value()?;
        if deadline > until {
            return None;
        }

        let event = self.queue.remove(&(deadline, id))?;
        self.deadlines.remove(&id);
        self.now = self.now.max(deadline);
        Some((id, event))
    }

    /// Move the clock forward to `t`. Never moves it backwards.
    ///
    /// Does not fire anything: callers drain `pop_due(t)` first.
    pub fn advance_to(&mut self, t: Millis) {
        self.now = self.now.max(t);
    }
}

// =============================================================================
// TESTS
// =============================================================================
