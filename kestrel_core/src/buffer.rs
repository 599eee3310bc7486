// Copyright 2026 the Kestrel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fixed-capacity FIFO used for raw input samples.
//!
//! The queue's slots live in one block of the runtime [`Heap`], reserved
//! when the queue is created. Items are stored in their [`Slot`] encoding,
//! so a queue that fits at startup never allocates again.

use core::marker::PhantomData;

use crate::heap::{Heap, HeapPtr};

/// A fixed-size byte encoding for items stored in a [`RingBuffer`].
pub trait Slot: Sized {
    /// Encoded size in bytes.
    const SIZE: usize;

    /// Writes `self` into `out`, which is exactly [`SIZE`](Self::SIZE)
    /// bytes long.
    fn write(&self, out: &mut [u8]);

    /// Reads an item back from [`SIZE`](Self::SIZE) bytes.
    fn read(bytes: &[u8]) -> Self;
}

/// Copies `N` bytes starting at `at`.
pub(crate) fn field<const N: usize>(bytes: &[u8], at: usize) -> [u8; N] {
    let mut out = [0_u8; N];
    out.copy_from_slice(&bytes[at..at + N]);
    out
}

/// A bounded first-in first-out queue stored in the runtime heap.
///
/// The capacity is fixed at construction. When the queue is full, the
/// *newest* item is rejected and counted in [`dropped_count`], so samples
/// that were queued first are always delivered in arrival order.
///
/// [`dropped_count`]: Self::dropped_count
#[derive(Debug)]
pub struct RingBuffer<T> {
    block: Option<HeapPtr>,
    head: usize,
    len: usize,
    capacity: usize,
    dropped: u64,
    _items: PhantomData<T>,
}

impl<T: Slot> RingBuffer<T> {
    /// Reserves room for `capacity` items (at least one) in `heap`. Returns
    /// `None` if the heap cannot hold them.
    pub fn new(heap: &mut Heap, capacity: usize) -> Option<Self> {
        let capacity = capacity.max(1);
        let block = heap.alloc(capacity.checked_mul(T::SIZE)?)?;
        Some(Self {
            block: Some(block),
            head: 0,
            len: 0,
            capacity,
            dropped: 0,
            _items: PhantomData,
        })
    }

    /// Bytes the queue reserves for `capacity` items.
    #[must_use]
    pub fn bytes_for(capacity: usize) -> usize {
        capacity.max(1).saturating_mul(T::SIZE)
    }

    /// Appends an item, returning `false` (and counting a drop) when full.
    pub fn push(&mut self, heap: &mut Heap, item: &T) -> bool {
        if self.len >= self.capacity {
            self.dropped += 1;
            return false;
        }
        let Some(bytes) = self.block.and_then(|b| heap.bytes_mut(b)) else {
            self.dropped += 1;
            return false;
        };
        let at = (self.head + self.len) % self.capacity * T::SIZE;
        item.write(&mut bytes[at..at + T::SIZE]);
        self.len += 1;
        true
    }

    /// Removes the oldest item.
    pub fn pop(&mut self, heap: &Heap) -> Option<T> {
        let item = self.peek(heap)?;
        self.head = (self.head + 1) % self.capacity;
        self.len -= 1;
        Some(item)
    }

    /// Returns a copy of the oldest item without removing it.
    #[must_use]
    pub fn peek(&self, heap: &Heap) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let bytes = heap.bytes(self.block?)?;
        let at = self.head * T::SIZE;
        Some(T::read(&bytes[at..at + T::SIZE]))
    }

    /// Discards every queued item.
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// Returns the slot storage to `heap`. The queue stays empty and
    /// rejects every later push.
    pub fn release(&mut self, heap: &mut Heap) {
        self.clear();
        if let Some(block) = self.block.take() {
            heap.free(block);
        }
    }
}

impl<T> RingBuffer<T> {
    /// Number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` if the next push would be rejected.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len >= self.capacity
    }

    /// Maximum number of queued items.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of items rejected because the queue was full.
    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::Region;
    use crate::input::KeySample;
    use crate::time::Millis;

    fn heap() -> Heap {
        let mut heap = Heap::new();
        heap.register(&[Region::new(0x2000_0000, 4 * 1024)])
            .expect("test region is valid");
        heap
    }

    fn key(c: char) -> KeySample {
        KeySample {
            key: c,
            time: Millis(u32::from(c)),
        }
    }

    #[test]
    fn preserves_arrival_order() {
        let mut heap = heap();
        let mut q = RingBuffer::new(&mut heap, 4).expect("fits");
        for c in ['a', 'b', 'c'] {
            assert!(q.push(&mut heap, &key(c)));
        }
        assert_eq!(q.pop(&heap), Some(key('a')));
        assert_eq!(q.pop(&heap), Some(key('b')));
        assert_eq!(q.pop(&heap), Some(key('c')));
        assert_eq!(q.pop(&heap), None);
    }

    #[test]
    fn overflow_drops_newest() {
        let mut heap = heap();
        let mut q = RingBuffer::new(&mut heap, 2).expect("fits");
        assert!(q.push(&mut heap, &key('a')));
        assert!(q.push(&mut heap, &key('b')));
        assert!(!q.push(&mut heap, &key('c')), "full queue rejects");
        assert_eq!(q.dropped_count(), 1);
        assert_eq!(q.pop(&heap), Some(key('a')), "oldest survives");
        assert_eq!(q.pop(&heap), Some(key('b')));
        assert!(q.is_empty());
    }

    #[test]
    fn wraps_around_the_reserved_block() {
        let mut heap = heap();
        let mut q = RingBuffer::new(&mut heap, 2).expect("fits");
        for round in ['a', 'c', 'e'] {
            let next = char::from_u32(u32::from(round) + 1).expect("ascii");
            assert!(q.push(&mut heap, &key(round)));
            assert!(q.push(&mut heap, &key(next)));
            assert_eq!(q.pop(&heap), Some(key(round)));
            assert_eq!(q.pop(&heap), Some(key(next)));
        }
        assert_eq!(q.dropped_count(), 0);
    }

    #[test]
    fn storage_is_taken_from_the_heap() {
        let mut heap = heap();
        let before = heap.used_bytes();
        let mut q = RingBuffer::<KeySample>::new(&mut heap, 8).expect("fits");
        let reserved = heap.used_bytes() - before;
        assert!(
            reserved as usize >= RingBuffer::<KeySample>::bytes_for(8),
            "slots live in the heap block"
        );
        q.release(&mut heap);
        assert_eq!(heap.used_bytes(), before);
        assert!(!q.push(&mut heap, &key('x')), "released queue rejects");
    }

    #[test]
    fn oversized_queue_does_not_fit() {
        let mut heap = heap();
        let before = heap.used_bytes();
        assert!(RingBuffer::<KeySample>::new(&mut heap, 1024).is_none());
        assert_eq!(heap.used_bytes(), before, "nothing left behind");
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut heap = heap();
        let mut q = RingBuffer::new(&mut heap, 0).expect("fits");
        assert_eq!(q.capacity(), 1);
        assert!(q.push(&mut heap, &key('a')));
        assert!(q.is_full());
    }
}
