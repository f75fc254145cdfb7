//! Bounded lock-free SPSC ring buffer for event delivery.
//!
//! One producer thread (the engine) pushes, one consumer thread pops; the
//! acquire/release pairing on `head` and `tail` is the only synchronization.
//! When the buffer is full, `push` fails immediately and the item is dropped
//! rather than blocking the producer.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Keeps each index on its own cache line so producer and consumer
/// never write-share one.
#[repr(align(64))]
struct CacheAligned<T>(T);

struct RingInner<T> {
    /// `capacity - 1`; capacity is a power of two, so `& mask` is modulo.
    mask: usize,
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
    /// Consumer index. Written by the consumer only.
    head: CacheAligned<AtomicUsize>,
    /// Producer index. Written by the producer only.
    tail: CacheAligned<AtomicUsize>,
}

// SAFETY: slot access is partitioned by the head/tail protocol. The producer
// writes a slot before publishing it with a release store of `tail`; the
// consumer's acquire load of `tail` therefore observes the slot write before
// reading it, and vice versa for `head` when the producer checks for space.
// Exactly one Producer and one Consumer exist, neither is Clone.
unsafe impl<T: Send> Send for RingInner<T> {}
unsafe impl<T: Send> Sync for RingInner<T> {}

impl<T> Drop for RingInner<T> {
    fn drop(&mut self) {
        let mut head = *self.head.0.get_mut();
        let tail = *self.tail.0.get_mut();
        while head != tail {
            // SAFETY: slots in [head, tail) were written and never read.
            unsafe { (*self.slots[head].get()).assume_init_drop() };
            head = (head + 1) & self.mask;
        }
    }
}

/// Producer end. Exactly one exists per ring.
pub struct Producer<T> {
    inner: Arc<RingInner<T>>,
}

/// Consumer end. Exactly one exists per ring.
pub struct Consumer<T> {
    inner: Arc<RingInner<T>>,
}

/// Create a bounded SPSC ring.
///
/// The capacity is rounded up to the next power of two (minimum 2). One slot
/// stays empty to distinguish full from empty, so the ring holds up to
/// `capacity() - 1` items at once.
pub fn bounded<T>(capacity: usize) -> (Producer<T>, Consumer<T>) {
    let capacity = capacity.max(2).next_power_of_two();
    let slots = (0..capacity)
        .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
        .collect::<Vec<_>>()
        .into_boxed_slice();

    let inner = Arc::new(RingInner {
        mask: capacity - 1,
        slots,
        head: CacheAligned(AtomicUsize::new(0)),
        tail: CacheAligned(AtomicUsize::new(0)),
    });

    (
        Producer {
            inner: inner.clone(),
        },
        Consumer { inner },
    )
}

impl<T> Producer<T> {
    /// Push an item. Returns it back if the ring is full.
    #[inline]
    pub fn push(&mut self, item: T) -> Result<(), T> {
        let inner = &*self.inner;
        let tail = inner.tail.0.load(Ordering::Relaxed);
        let next = (tail + 1) & inner.mask;

        if next == inner.head.0.load(Ordering::Acquire) {
            return Err(item); // full
        }

        // SAFETY: the slot at `tail` is not visible to the consumer until
        // the release store below, and was drained by any prior pop.
        unsafe { (*inner.slots[tail].get()).write(item) };
        inner.tail.0.store(next, Ordering::Release);
        Ok(())
    }

    /// Whether a push would currently fail.
    #[inline]
    pub fn is_full(&self) -> bool {
        let inner = &*self.inner;
        let tail = inner.tail.0.load(Ordering::Relaxed);
        ((tail + 1) & inner.mask) == inner.head.0.load(Ordering::Acquire)
    }

    /// Total slot count (power of two); usable capacity is one less.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.mask + 1
    }
}

impl<T> Consumer<T> {
    /// Pop the oldest item, if any.
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        let inner = &*self.inner;
        let head = inner.head.0.load(Ordering::Relaxed);

        if head == inner.tail.0.load(Ordering::Acquire) {
            return None; // empty
        }

        // SAFETY: the acquire load of `tail` above orders this read after
        // the producer's slot write.
        let item = unsafe { (*inner.slots[head].get()).assume_init_read() };
        inner.head.0.store((head + 1) & inner.mask, Ordering::Release);
        Some(item)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        let inner = &*self.inner;
        inner.head.0.load(Ordering::Acquire) == inner.tail.0.load(Ordering::Acquire)
    }

    /// Number of items currently buffered.
    #[inline]
    pub fn len(&self) -> usize {
        let inner = &*self.inner;
        let head = inner.head.0.load(Ordering::Acquire);
        let tail = inner.tail.0.load(Ordering::Acquire);
        (tail.wrapping_sub(head)) & inner.mask
    }

    /// Total slot count (power of two); usable capacity is one less.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.mask + 1
    }
}
