//! Bounded FIFO of inbound spike keys.
//!
//! Single producer (the packet-receive interrupt handler), single consumer
//! (the tick scheduler). Lock freedom comes from disjoint head and tail
//! indices: the producer release-stores `head` after writing its slot, the
//! consumer acquire-loads it, and vice versa for `tail`. Capacity is a
//! power of two so wrapping is a mask.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};

/// Lock-free single-producer/single-consumer ring of spike keys.
///
/// `push` on a full queue and `pop` on an empty queue fail without touching
/// stored entries; each failure increments a monotonic counter that the
/// recording layer reports at the end of the run.
#[derive(Debug)]
pub struct SpikeInputBuffer {
    keys: Box<[AtomicU32]>,
    mask: usize,
    head: AtomicUsize,
    tail: AtomicUsize,
    overflows: AtomicU64,
    underflows: AtomicU64,
}

impl SpikeInputBuffer {
    /// Create a queue holding up to `capacity` keys.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is not a power of two.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(
            capacity.is_power_of_two() && capacity > 0,
            "spike queue capacity must be a power of two"
        );
        Self {
            keys: (0..capacity).map(|_| AtomicU32::new(0)).collect(),
            mask: capacity - 1,
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            overflows: AtomicU64::new(0),
            underflows: AtomicU64::new(0),
        }
    }

    /// Enqueue a spike key. Returns `false` (and counts an overflow) when
    /// the queue is full.
    pub fn push(&self, key: u32) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if head.wrapping_sub(tail) == self.keys.len() {
            self.overflows.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        self.keys[head & self.mask].store(key, Ordering::Relaxed);
        self.head.store(head.wrapping_add(1), Ordering::Release);
        true
    }

    /// Dequeue the oldest spike key. Returns `None` (and counts an
    /// underflow) when the queue is empty.
    pub fn pop(&self) -> Option<u32> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if head == tail {
            self.underflows.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        let key = self.keys[tail & self.mask].load(Ordering::Relaxed);
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        Some(key)
    }

    /// Keys currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.head
            .load(Ordering::Acquire)
            .wrapping_sub(self.tail.load(Ordering::Acquire))
    }

    /// Whether the queue holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of queued keys.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.keys.len()
    }

    /// Number of rejected `push` calls.
    #[must_use]
    pub fn overflow_count(&self) -> u64 {
        self.overflows.load(Ordering::Relaxed)
    }

    /// Number of failed `pop` calls.
    #[must_use]
    pub fn underflow_count(&self) -> u64 {
        self.underflows.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order() {
        let queue = SpikeInputBuffer::new(8);
        for key in 0..5 {
            assert!(queue.push(key));
        }
        for key in 0..5 {
            assert_eq!(queue.pop(), Some(key));
        }
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn overflow_preserves_stored_keys() {
        let queue = SpikeInputBuffer::new(4);
        for key in 0..4 {
            assert!(queue.push(key));
        }
        // Five more pushes bounce without corrupting the first four
        for key in 100..105 {
            assert!(!queue.push(key));
        }
        assert_eq!(queue.overflow_count(), 5);
        for key in 0..4 {
            assert_eq!(queue.pop(), Some(key));
        }
    }

    #[test]
    fn underflow_counted() {
        let queue = SpikeInputBuffer::new(4);
        assert_eq!(queue.pop(), None);
        assert_eq!(queue.pop(), None);
        assert_eq!(queue.underflow_count(), 2);
    }

    #[test]
    fn concurrent_producer_consumer() {
        use std::sync::Arc;

        let queue = Arc::new(SpikeInputBuffer::new(64));
        let producer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || {
                for key in 0..10_000u32 {
                    while !queue.push(key) {
                        std::thread::yield_now();
                    }
                }
            })
        };

        let mut received = Vec::with_capacity(10_000);
        while received.len() < 10_000 {
            if let Some(key) = queue.pop() {
                received.push(key);
            }
        }
        producer.join().unwrap();

        // SPSC ordering: keys arrive exactly in production order
        assert!(received.iter().copied().eq(0..10_000));
    }
}
