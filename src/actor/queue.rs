//! `KeyQueue`: FIFO of captured key events shared between threads.
//!
//! The capture thread is the only producer. Any thread may consume or
//! inspect. Every operation, including the full scan in
//! [`KeyQueue::is_key_pressed`], runs under one mutex.

use super::messages::KeyEvent;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Cloneable handle to a shared, unbounded queue of key events.
#[derive(Debug, Clone, Default)]
pub struct KeyQueue {
    inner: Arc<Mutex<VecDeque<KeyEvent>>>,
}

impl KeyQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// A panic while holding the lock cannot leave the deque half-updated,
    /// so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, VecDeque<KeyEvent>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an event. [`KeyEvent::None`] is never queued.
    pub fn push(&self, key: KeyEvent) {
        if key.is_none() {
            return;
        }
        self.lock().push_back(key);
    }

    /// Whether any event is waiting.
    pub fn has_input(&self) -> bool {
        !self.lock().is_empty()
    }

    /// Pop the oldest event, or [`KeyEvent::None`] if the queue is empty.
    pub fn get_key(&self) -> KeyEvent {
        self.lock().pop_front().unwrap_or_default()
    }

    /// Whether `key` is anywhere in the queue. Nothing is removed.
    pub fn is_key_pressed(&self, key: KeyEvent) -> bool {
        self.lock().contains(&key)
    }

    /// Number of waiting events.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Take every waiting event, oldest first.
    pub fn drain(&self) -> Vec<KeyEvent> {
        self.lock().drain(..).collect()
    }

    /// Discard every waiting event.
    pub fn clear(&self) {
        self.lock().clear();
    }
}
