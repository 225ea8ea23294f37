//! Multi-producer, single-consumer FIFO of operator strokes.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use super::event::InteractionEvent;

/// Depth above which an unbounded queue logs a backlog warning.
pub const SOFT_BACKLOG_LIMIT: usize = 16;

/// What happens when strokes arrive faster than iterations drain them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BacklogPolicy {
    /// Keep every stroke in arrival order.
    Unbounded,
    /// Keep only the newest `n` strokes.
    DropOldest(usize),
}

/// Cloneable handle to a shared stroke queue.
///
/// Producers push from input handlers without blocking on the iteration
/// loop; the loop pops at most one stroke per iteration.
#[derive(Debug, Clone)]
pub struct InteractionQueue {
    events: Arc<Mutex<VecDeque<InteractionEvent>>>,
    clock: Arc<AtomicU64>,
    policy: BacklogPolicy,
}

impl Default for InteractionQueue {
    fn default() -> Self {
        Self::new(BacklogPolicy::Unbounded)
    }
}

impl InteractionQueue {
    pub fn new(policy: BacklogPolicy) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::new())),
            clock: Arc::new(AtomicU64::new(0)),
            policy,
        }
    }

    pub fn policy(&self) -> BacklogPolicy {
        self.policy
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<InteractionEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Next creation-order timestamp, shared by every handle.
    pub fn next_timestamp(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Append a stroke. Returns the stroke evicted by the backlog policy, if any.
    pub fn push(&self, event: InteractionEvent) -> Option<InteractionEvent> {
        let mut events = self.lock();
        events.push_back(event);

        match self.policy {
            BacklogPolicy::DropOldest(cap) if events.len() > cap => {
                let dropped = events.pop_front();
                if let Some(ref e) = dropped {
                    tracing::warn!(timestamp = e.timestamp, cap, "interaction backlog full, dropped oldest stroke");
                }
                dropped
            }
            BacklogPolicy::Unbounded if events.len() > SOFT_BACKLOG_LIMIT => {
                tracing::warn!(depth = events.len(), "interaction backlog growing");
                None
            }
            _ => None,
        }
    }

    /// Remove the oldest stroke.
    pub fn pop(&self) -> Option<InteractionEvent> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot of pending strokes, oldest first, for overlay drawing.
    pub fn pending(&self) -> Vec<InteractionEvent> {
        self.lock().iter().cloned().collect()
    }

    /// Discard every pending stroke.
    pub fn clear(&self) {
        self.lock().clear();
    }
}
