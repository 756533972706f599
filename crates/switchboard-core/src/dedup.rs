//! Bounded FIFO set of recently processed message ids.
//!
//! Platforms redeliver events; the dispatcher consults this cache before
//! doing any work. Only the most recent `capacity` distinct ids are
//! remembered, so a very old id can be seen as new again.

use std::collections::{HashSet, VecDeque};

use tracing::{debug, info};

/// Default number of message ids remembered.
pub const DEFAULT_DEDUP_CAPACITY: usize = 1000;

/// Remembers the last `capacity` distinct message ids, evicting oldest first.
#[derive(Debug)]
pub struct DeduplicationCache {
    capacity: usize,
    order: VecDeque<String>,
    seen: HashSet<String>,
}

impl DeduplicationCache {
    /// Create a cache holding at most `capacity` ids (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
        }
    }

    /// Whether `id` is among the remembered ids.
    pub fn is_processed(&self, id: &str) -> bool {
        let hit = self.seen.contains(id);
        if hit {
            info!(message_id = id, "duplicate message detected");
        }
        hit
    }

    /// Remember `id`. No-op if already present.
    pub fn mark_processed(&mut self, id: &str) {
        if self.seen.contains(id) {
            return;
        }
        if self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
                debug!(message_id = %oldest, "evicted from dedup cache");
            }
        }
        self.order.push_back(id.to_string());
        self.seen.insert(id.to_string());
    }

    /// Number of ids currently remembered.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for DeduplicationCache {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_CAPACITY)
    }
}
