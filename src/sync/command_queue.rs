//! Lossless FIFO of control commands
//!
//! Unlike a [`ValueMailbox`](super::ValueMailbox), which intentionally
//! coalesces rapid updates to "latest wins", the command queue never drops
//! or merges entries: every pushed command is popped exactly once, in
//! order. It is used for coarse commands that must not be lost (open/close
//! connection, refresh channels, load/save config, export, ...).

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};

/// Unbounded FIFO with non-blocking pop
#[derive(Debug, Clone)]
pub struct CommandQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T: Send> CommandQueue<T> {
    /// Create an empty queue
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Append a command to the tail
    pub fn push(&self, cmd: T) {
        // The receiver lives as long as the queue, so send cannot fail.
        let _ = self.tx.send(cmd);
    }

    /// Remove and return the head command, or `None` if the queue is empty
    pub fn pop(&self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(cmd) => Some(cmd),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Whether any command is pending
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Number of pending commands
    pub fn len(&self) -> usize {
        self.rx.len()
    }
}

impl<T: Send> Default for CommandQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ControlCommand;

    #[test]
    fn test_push_pop_exactly_once() {
        let q = CommandQueue::new();
        q.push(ControlCommand::RefreshChannels);
        assert_eq!(q.pop(), Some(ControlCommand::RefreshChannels));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn test_fifo_order_no_coalescing() {
        let q = CommandQueue::new();
        q.push(1);
        q.push(2);
        q.push(2);
        q.push(3);
        assert_eq!(q.len(), 4);
        assert_eq!(q.pop(), Some(1));
        assert_eq!(q.pop(), Some(2));
        assert_eq!(q.pop(), Some(2));
        assert_eq!(q.pop(), Some(3));
        assert!(q.is_empty());
    }

    #[test]
    fn test_cross_thread_delivery() {
        let q = CommandQueue::new();
        let producer = q.clone();
        let handle = std::thread::spawn(move || {
            for i in 0..100 {
                producer.push(i);
            }
        });
        handle.join().unwrap();

        let mut received = Vec::new();
        while let Some(v) = q.pop() {
            received.push(v);
        }
        assert_eq!(received, (0..100).collect::<Vec<_>>());
    }
}
