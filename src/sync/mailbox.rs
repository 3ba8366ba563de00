//! Single-slot, latest-wins, origin-tagged mailbox
//!
//! A [`ValueMailbox`] carries typed values between the UI thread and the
//! playback engine without blocking. Writes overwrite the previous value
//! ("latest wins"); reads are filtered by origin so a side never observes
//! its own write, which is what prevents feedback loops between the two
//! threads.
//!
//! Mailboxes carrying user-facing selection state are created with
//! [`ValueMailbox::with_engine_priority`]: on those, a UI write is silently
//! dropped while an unread engine write is pending, so an automatic
//! group-switch reselection cannot be clobbered by a stray late click.

use std::sync::Mutex;

/// Which side of the UI/engine boundary performed an access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The UI thread
    Ui,
    /// The playback engine thread
    Engine,
}

#[derive(Debug)]
struct Cell<V> {
    value: V,
    fresh: bool,
    origin: Side,
}

/// Single-slot, overwrite-latest cell with a freshness flag and origin tag
#[derive(Debug)]
pub struct ValueMailbox<V> {
    cell: Mutex<Cell<V>>,
    engine_priority: bool,
}

impl<V: Clone> ValueMailbox<V> {
    /// Create a mailbox holding `initial`, not marked fresh
    pub fn new(initial: V) -> Self {
        Self {
            cell: Mutex::new(Cell {
                value: initial,
                fresh: false,
                origin: Side::Ui,
            }),
            engine_priority: false,
        }
    }

    /// Create a mailbox on which a pending engine write outranks a UI write
    pub fn with_engine_priority(initial: V) -> Self {
        Self {
            engine_priority: true,
            ..Self::new(initial)
        }
    }

    /// Store a value, overwriting whatever was there
    ///
    /// On engine-priority mailboxes, a UI-origin write is dropped while an
    /// unread engine-origin value is pending. The drop only applies until
    /// that value has been read.
    pub fn set(&self, value: V, origin: Side) {
        let mut cell = self.cell.lock().expect("mailbox mutex poisoned");
        if self.engine_priority
            && origin == Side::Ui
            && cell.fresh
            && cell.origin == Side::Engine
        {
            tracing::trace!("mailbox: UI write dropped, engine update pending");
            return;
        }
        cell.value = value;
        cell.fresh = true;
        cell.origin = origin;
    }

    /// Take the stored value if it is fresh and was written by the other side
    ///
    /// Clears the freshness flag, so exactly one `get` observes each write.
    pub fn get(&self, requesting: Side) -> Option<V> {
        let mut cell = self.cell.lock().expect("mailbox mutex poisoned");
        if cell.fresh && cell.origin != requesting {
            cell.fresh = false;
            Some(cell.value.clone())
        } else {
            None
        }
    }

    /// Read the current value without consuming the freshness flag
    ///
    /// Used for readouts where the latest value matters regardless of who
    /// wrote it (for example formatting preferences).
    pub fn peek(&self) -> V {
        self.cell
            .lock()
            .expect("mailbox mutex poisoned")
            .value
            .clone()
    }
}
