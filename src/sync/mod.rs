//! Cross-thread synchronization primitives
//!
//! Exactly two logical threads exist in the core: the UI thread and the
//! playback engine thread. All communication between them passes through
//! the primitives in this module; no other mutable state is touched by
//! both sides.
//!
//! - [`ValueMailbox`] - single-slot, latest-wins, origin-tagged cell
//! - [`CommandQueue`] - lossless FIFO with non-blocking pop
//! - [`RendezvousSlot`] - capacity-1 blocking synchronous handoff
//! - [`PositionDurationStore`] - mailbox bundle for the time state

pub mod command_queue;
pub mod mailbox;
pub mod position_store;
pub mod rendezvous;

pub use command_queue::CommandQueue;
pub use mailbox::{Side, ValueMailbox};
pub use position_store::PositionDurationStore;
pub use rendezvous::RendezvousSlot;
