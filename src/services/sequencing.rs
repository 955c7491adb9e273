//! Last-write-wins guard for concurrent loads of the same user's view.
//!
//! Every load takes a [`Ticket`] before issuing any gateway call. Tickets are
//! numbered per user in invocation order. When a load finishes it publishes
//! its result; a result is accepted only if no newer ticket has already
//! published, otherwise the caller gets the newer result back. Completion
//! order therefore never decides which snapshot wins.
//!
//! State for a user is dropped once no load for that user is in flight, so
//! nothing here outlives the requests that created it.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

/// Result of publishing a finished load.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// This load is the newest to finish; its own value.
    Current(T),
    /// A newer load already published; its value.
    Superseded(T),
}

impl<T> Outcome<T> {
    pub fn into_inner(self) -> T {
        match self {
            Outcome::Current(value) | Outcome::Superseded(value) => value,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, Outcome::Superseded(_))
    }
}

#[derive(Debug)]
struct Slot<T> {
    issued: u64,
    published: u64,
    in_flight: usize,
    latest: Option<T>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            issued: 0,
            published: 0,
            in_flight: 0,
            latest: None,
        }
    }
}

#[derive(Debug)]
pub struct Sequencer<T> {
    slots: Mutex<HashMap<Uuid, Slot<T>>>,
}

impl<T> Default for Sequencer<T> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

/// Claim on one load. Dropping it unpublished (error or cancellation)
/// releases the claim without touching the published value.
#[derive(Debug)]
pub struct Ticket<'a, T: Clone> {
    sequencer: &'a Sequencer<T>,
    user_id: Uuid,
    number: u64,
    settled: bool,
}

impl<T: Clone> Ticket<'_, T> {
    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn publish(mut self, value: T) -> Outcome<T> {
        self.settled = true;
        self.sequencer.publish(self.user_id, self.number, value)
    }
}

impl<T: Clone> Drop for Ticket<'_, T> {
    fn drop(&mut self) {
        if !self.settled {
            self.sequencer.release(self.user_id);
        }
    }
}

impl<T: Clone> Sequencer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Slot<T>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn begin(&self, user_id: Uuid) -> Ticket<'_, T> {
        let mut slots = self.lock();
        let slot = slots.entry(user_id).or_default();
        slot.issued += 1;
        slot.in_flight += 1;
        Ticket {
            sequencer: self,
            user_id,
            number: slot.issued,
            settled: false,
        }
    }

    /// Number of users with a load in flight.
    pub fn active_users(&self) -> usize {
        self.lock().len()
    }

    fn publish(&self, user_id: Uuid, number: u64, value: T) -> Outcome<T> {
        let mut slots = self.lock();
        let Some(slot) = slots.get_mut(&user_id) else {
            return Outcome::Current(value);
        };

        let outcome = if number > slot.published {
            slot.published = number;
            slot.latest = Some(value.clone());
            Outcome::Current(value)
        } else {
            match &slot.latest {
                Some(newer) => Outcome::Superseded(newer.clone()),
                None => Outcome::Current(value),
            }
        };

        slot.in_flight = slot.in_flight.saturating_sub(1);
        if slot.in_flight == 0 {
            slots.remove(&user_id);
        }
        outcome
    }

    fn release(&self, user_id: Uuid) {
        let mut slots = self.lock();
        if let Some(slot) = slots.get_mut(&user_id) {
            slot.in_flight = slot.in_flight.saturating_sub(1);
            if slot.in_flight == 0 {
                slots.remove(&user_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_order_completion_keeps_each_result() {
        let seq = Sequencer::<&str>::new();
        let user = Uuid::new_v4();
        let first = seq.begin(user);
        assert_eq!(first.publish("a"), Outcome::Current("a"));
        let second = seq.begin(user);
        assert_eq!(second.publish("b"), Outcome::Current("b"));
    }

    #[test]
    fn stale_load_never_overwrites_newer_one() {
        let seq = Sequencer::<&str>::new();
        let user = Uuid::new_v4();
        let older = seq.begin(user);
        let newer = seq.begin(user);
        assert!(newer.number() > older.number());

        assert_eq!(newer.publish("new"), Outcome::Current("new"));
        let stale = older.publish("old");
        assert!(stale.is_superseded());
        assert_eq!(stale.into_inner(), "new");
    }

    #[test]
    fn users_are_sequenced_independently() {
        let seq = Sequencer::<u32>::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let a1 = seq.begin(a);
        let b1 = seq.begin(b);
        assert_eq!(b1.publish(2), Outcome::Current(2));
        assert_eq!(a1.publish(1), Outcome::Current(1));
    }

    #[test]
    fn state_is_dropped_when_idle() {
        let seq = Sequencer::<u32>::new();
        let user = Uuid::new_v4();
        let older = seq.begin(user);
        let newer = seq.begin(user);
        assert_eq!(seq.active_users(), 1);
        newer.publish(2);
        assert_eq!(seq.active_users(), 1);
        drop(older);
        assert_eq!(seq.active_users(), 0);
    }

    #[test]
    fn abandoned_newer_ticket_does_not_block_older_result() {
        let seq = Sequencer::<u32>::new();
        let user = Uuid::new_v4();
        let older = seq.begin(user);
        let newer = seq.begin(user);
        drop(newer);
        assert_eq!(older.publish(1), Outcome::Current(1));
    }
}
