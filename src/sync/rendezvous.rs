//! Capacity-1 blocking handoff between the UI thread and the engine
//!
//! A [`RendezvousSlot`] is a strict one-at-a-time synchronous exchange:
//! `put` blocks while a previous value is unconsumed, `take` blocks while
//! the slot is empty. It is used where one thread must wait for the other
//! to finish processing a specific payload - in this crate, the
//! save/load-configuration round trip. This is the only place in the core
//! where either thread blocks indefinitely.

use std::sync::{Condvar, Mutex};

/// Blocking, capacity-1 handshake cell
#[derive(Debug)]
pub struct RendezvousSlot<V> {
    slot: Mutex<Option<V>>,
    filled: Condvar,
    emptied: Condvar,
}

impl<V> RendezvousSlot<V> {
    /// Create an empty slot
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            filled: Condvar::new(),
            emptied: Condvar::new(),
        }
    }

    /// Store a value, blocking until any previous value has been taken
    pub fn put(&self, value: V) {
        let mut slot = self.slot.lock().expect("rendezvous mutex poisoned");
        while slot.is_some() {
            slot = self
                .emptied
                .wait(slot)
                .expect("rendezvous mutex poisoned");
        }
        *slot = Some(value);
        self.filled.notify_one();
    }

    /// Consume the stored value, blocking until one exists
    pub fn take(&self) -> V {
        let mut slot = self.slot.lock().expect("rendezvous mutex poisoned");
        loop {
            if let Some(value) = slot.take() {
                self.emptied.notify_one();
                return value;
            }
            slot = self
                .filled
                .wait(slot)
                .expect("rendezvous mutex poisoned");
        }
    }

    /// Non-blocking take, for tests and opportunistic drains
    pub fn try_take(&self) -> Option<V> {
        let mut slot = self.slot.lock().expect("rendezvous mutex poisoned");
        let value = slot.take();
        if value.is_some() {
            self.emptied.notify_one();
        }
        value
    }
}

impl<V> Default for RendezvousSlot<V> {
    fn default() -> Self {
        Self::new()
    }
}
