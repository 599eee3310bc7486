// Copyright 2026 the Kestrel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fixed-region free-list heap.
//!
//! [`Heap`] manages one or more memory regions registered once at startup.
//! Every block starts with an in-band 8-byte header `{next_free, size}`; the
//! high bit of `size` marks the block as allocated. Free blocks form a singly
//! linked list kept in strictly ascending address order, and address-adjacent
//! free blocks are always merged, so no two free blocks ever touch.
//!
//! Each region ends in a zero-size sentinel header that links to the first
//! block of the next region. Sentinels can never be allocated or merged, so a
//! block never spans two regions.
//!
//! Addresses are plain `u32` values in the address space described by the
//! [`Region`] list; the backing bytes live in one compact buffer owned by the
//! heap. Allocations are handed out as [`HeapPtr`] handles to the first
//! payload byte and read or written through [`Heap::bytes`] /
//! [`Heap::bytes_mut`].
//!
//! All failures are `None`/`false` returns. The heap never panics on bad
//! input: freeing an unknown or already-free pointer is a silent no-op.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use core::num::NonZeroU32;

/// Block alignment in bytes. Every block address and size is a multiple of it.
pub const ALIGNMENT: u32 = 4;

/// Size of the in-band block header.
pub const HEADER_SIZE: u32 = 8;

const ALLOC_BIT: u32 = 1 << 31;
const NIL: u32 = u32::MAX;

/// A contiguous memory region offered to the heap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Region {
    /// First address of the region.
    pub start: u32,
    /// Size of the region in bytes.
    pub size: u32,
}

impl Region {
    /// Creates a region descriptor.
    #[inline]
    #[must_use]
    pub const fn new(start: u32, size: u32) -> Self {
        Self { start, size }
    }
}

/// Handle to the first payload byte of an allocated block.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapPtr(NonZeroU32);

impl HeapPtr {
    /// Returns the payload address.
    #[inline]
    #[must_use]
    pub const fn addr(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Debug for HeapPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HeapPtr({:#x})", self.0.get())
    }
}

/// Why [`Heap::register`] refused a region list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeapError {
    /// Regions were already registered; registration happens exactly once.
    AlreadyRegistered,
    /// Regions are not strictly ascending and non-overlapping.
    Unordered,
    /// Every region was too small to hold a block.
    NoUsableRegion,
}

impl fmt::Display for HeapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AlreadyRegistered => "heap regions already registered",
            Self::Unordered => "heap regions must be ascending and non-overlapping",
            Self::NoUsableRegion => "no heap region large enough to hold a block",
        })
    }
}

impl core::error::Error for HeapError {}

/// Point-in-time heap usage figures.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeapStats {
    /// Bytes managed by the heap, headers of live blocks included.
    pub total: u32,
    /// Bytes currently free.
    pub free: u32,
    /// Lowest value `free` has ever reached.
    pub min_ever_free: u32,
}

impl HeapStats {
    /// Bytes currently allocated (including block headers).
    #[inline]
    #[must_use]
    pub const fn used(&self) -> u32 {
        self.total - self.free
    }
}

/// Maps a registered region onto the compact backing buffer.
#[derive(Clone, Copy, Debug)]
struct Mapping {
    start: u32,
    len: u32,
    offset: usize,
}

fn store_index(maps: &[Mapping], addr: u32, len: u32) -> Option<usize> {
    let end = addr.checked_add(len)?;
    maps.iter()
        .find(|m| addr >= m.start && end <= m.start + m.len)
        .map(|m| m.offset + (addr - m.start) as usize)
}

const fn align_up(v: u32) -> Option<u32> {
    match v.checked_add(ALIGNMENT - 1) {
        Some(v) => Some(v & !(ALIGNMENT - 1)),
        None => None,
    }
}

const fn align_down(v: u32) -> u32 {
    v & !(ALIGNMENT - 1)
}

/// A free-list allocator over a fixed set of regions.
#[derive(Clone, Debug, Default)]
pub struct Heap {
    store: Vec<u8>,
    maps: Vec<Mapping>,
    head: u32,
    total: u32,
    free: u32,
    min_free: u32,
    registered: bool,
}

impl Heap {
    /// Creates a heap with no memory. Call [`register`](Self::register) once
    /// before allocating.
    #[must_use]
    pub fn new() -> Self {
        Self {
            head: NIL,
            ..Self::default()
        }
    }

    /// Registers the regions the heap may hand out, returning the number of
    /// usable bytes.
    ///
    /// Regions must be strictly ascending by address and must not overlap.
    /// Regions too small to hold a block (after alignment) are skipped. On
    /// error nothing changes, and a second call after a success always fails.
    pub fn register(&mut self, regions: &[Region]) -> Result<u32, HeapError> {
        if self.registered {
            return Err(HeapError::AlreadyRegistered);
        }
        for pair in regions.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            match a.start.checked_add(a.size) {
                Some(end) if b.start > a.start && end <= b.start => {}
                _ => return Err(HeapError::Unordered),
            }
        }

        let mut maps = Vec::new();
        let mut store_len = 0_usize;
        for region in regions {
            let Some(start) = align_up(region.start) else {
                continue;
            };
            let skipped = start - region.start;
            if skipped >= region.size {
                continue;
            }
            let len = align_down(region.size - skipped);
            if len <= 2 * HEADER_SIZE || len & ALLOC_BIT != 0 {
                continue;
            }
            maps.push(Mapping {
                start,
                len,
                offset: store_len,
            });
            store_len += len as usize;
        }
        if maps.is_empty() {
            return Err(HeapError::NoUsableRegion);
        }

        self.store = vec![0; store_len];
        self.maps = maps;
        self.head = NIL;
        self.total = 0;

        let mut prev_sentinel = NIL;
        for i in 0..self.maps.len() {
            let Mapping { start, len, .. } = self.maps[i];
            let sentinel = start + len - HEADER_SIZE;
            self.set_size(start, len - HEADER_SIZE);
            self.set_next(start, sentinel);
            self.set_size(sentinel, 0);
            self.set_next(sentinel, NIL);
            if prev_sentinel == NIL {
                self.head = start;
            } else {
                self.set_next(prev_sentinel, start);
            }
            prev_sentinel = sentinel;
            self.total += len - HEADER_SIZE;
        }

        self.free = self.total;
        self.min_free = self.total;
        self.registered = true;
        Ok(self.total)
    }

    /// Allocates `n` bytes using a first-fit scan.
    ///
    /// Returns `None` when `n` is zero, when `n` is too large to be
    /// represented, or when no free block is big enough.
    pub fn alloc(&mut self, n: usize) -> Option<HeapPtr> {
        if !self.registered || n == 0 {
            return None;
        }
        let n = u32::try_from(n).ok()?;
        if n & ALLOC_BIT != 0 {
            return None;
        }
        let size = align_up(n.checked_add(HEADER_SIZE)?)?;
        if size & ALLOC_BIT != 0 || size > self.free {
            return None;
        }

        let mut prev = NIL;
        let mut cur = self.head;
        while cur != NIL && self.size_of(cur) < size {
            prev = cur;
            cur = self.next(cur);
        }
        if cur == NIL {
            return None;
        }

        let next = self.next(cur);
        if prev == NIL {
            self.head = next;
        } else {
            self.set_next(prev, next);
        }

        let found = self.size_of(cur);
        if found - size > 2 * HEADER_SIZE {
            let rest = cur + size;
            self.set_size(rest, found - size);
            self.set_next(rest, NIL);
            self.set_size(cur, size);
            self.insert_free(rest);
        }

        let granted = self.size_of(cur);
        self.free -= granted;
        self.min_free = self.min_free.min(self.free);
        self.set_size(cur, granted | ALLOC_BIT);
        self.set_next(cur, NIL);
        NonZeroU32::new(cur + HEADER_SIZE).map(HeapPtr)
    }

    /// Allocates `count * size` bytes and zero-fills the whole payload.
    pub fn calloc(&mut self, count: usize, size: usize) -> Option<HeapPtr> {
        let ptr = self.alloc(count.checked_mul(size)?)?;
        if let Some(bytes) = self.bytes_mut(ptr) {
            bytes.fill(0);
        }
        Some(ptr)
    }

    /// Resizes an allocation by allocating, copying, and freeing.
    ///
    /// `None` as input behaves like [`alloc`](Self::alloc); a zero size frees
    /// the block. If the new allocation fails the original block is left
    /// untouched and `None` is returned.
    pub fn realloc(&mut self, ptr: Option<HeapPtr>, n: usize) -> Option<HeapPtr> {
        let Some(old) = ptr else {
            return self.alloc(n);
        };
        if n == 0 {
            self.free(old);
            return None;
        }
        let (src, old_len) = self.view().payload_range(old)?;
        let new = self.alloc(n)?;
        if let Some((dst, _)) = self.view().payload_range(new) {
            let len = old_len.min(n);
            self.store.copy_within(src..src + len, dst);
        }
        self.free(old);
        Some(new)
    }

    /// Returns a block to the free list, merging it with free neighbours.
    ///
    /// Pointers that do not name a live allocation are ignored.
    pub fn free(&mut self, ptr: HeapPtr) {
        let Some(block) = ptr.addr().checked_sub(HEADER_SIZE) else {
            return;
        };
        if self.view().allocated_size(block).is_none() {
            return;
        }
        let size = self.size_of(block);
        self.set_size(block, size);
        self.free += size;
        self.insert_free(block);
    }

    /// Returns the usable payload size of an allocation.
    #[must_use]
    pub fn user_size(&self, ptr: HeapPtr) -> Option<usize> {
        self.view().payload_range(ptr).map(|(_, len)| len)
    }

    /// Returns the payload bytes of an allocation.
    #[must_use]
    pub fn bytes(&self, ptr: HeapPtr) -> Option<&[u8]> {
        self.view().bytes(ptr)
    }

    /// Returns the payload bytes of an allocation for writing.
    pub fn bytes_mut(&mut self, ptr: HeapPtr) -> Option<&mut [u8]> {
        let (start, len) = self.view().payload_range(ptr)?;
        Some(&mut self.store[start..start + len])
    }

    /// Splits the heap into a writable payload and a read-only view of every
    /// other block.
    ///
    /// Used when one allocation is written (a compositing scratch layer)
    /// while others are read (widget text).
    pub fn split_mut(&mut self, ptr: HeapPtr) -> Option<(&mut [u8], HeapView<'_>)> {
        let (start, len) = self.view().payload_range(ptr)?;
        let (before, rest) = self.store.split_at_mut(start);
        let (payload, after) = rest.split_at_mut(len);
        let view = HeapView {
            before,
            after,
            hole: (start, start + len),
            maps: &self.maps,
        };
        Some((payload, view))
    }

    /// Returns a read-only view of the whole heap.
    #[must_use]
    pub fn view(&self) -> HeapView<'_> {
        HeapView {
            before: &self.store,
            after: &[],
            hole: (self.store.len(), self.store.len()),
            maps: &self.maps,
        }
    }

    /// Bytes currently free.
    #[inline]
    #[must_use]
    pub fn free_bytes(&self) -> u32 {
        self.free
    }

    /// Bytes currently allocated, block headers included.
    #[inline]
    #[must_use]
    pub fn used_bytes(&self) -> u32 {
        self.total - self.free
    }

    /// Bytes managed by the heap (registered regions minus sentinels).
    #[inline]
    #[must_use]
    pub fn total_bytes(&self) -> u32 {
        self.total
    }

    /// Lowest free-byte count observed since registration.
    #[inline]
    #[must_use]
    pub fn min_ever_free(&self) -> u32 {
        self.min_free
    }

    /// Returns a snapshot of the usage figures.
    #[must_use]
    pub fn stats(&self) -> HeapStats {
        HeapStats {
            total: self.total,
            free: self.free,
            min_ever_free: self.min_free,
        }
    }

    /// Returns `true` once regions have been registered.
    #[inline]
    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.registered
    }

    // -- Free-list maintenance --

    /// Inserts a free block at its address-ordered position, merging with
    /// the previous and next free blocks when they touch it.
    fn insert_free(&mut self, block: u32) {
        let mut prev = NIL;
        let mut cur = self.head;
        while cur != NIL && cur < block {
            prev = cur;
            cur = self.next(cur);
        }

        let mut block = block;
        if prev != NIL {
            let prev_size = self.size_of(prev);
            if prev_size != 0 && prev + prev_size == block {
                self.set_size(prev, prev_size + self.size_of(block));
                block = prev;
            }
        }

        let size = self.size_of(block);
        let cur_size = if cur == NIL { 0 } else { self.size_of(cur) };
        if cur_size != 0 && block + size == cur {
            self.set_size(block, size + cur_size);
            let after = self.next(cur);
            self.set_next(block, after);
        } else {
            self.set_next(block, cur);
        }

        if block != prev {
            if prev == NIL {
                self.head = block;
            } else {
                self.set_next(prev, block);
            }
        }
    }

    // -- Header access --

    fn word(&self, addr: u32) -> u32 {
        match store_index(&self.maps, addr, 4) {
            Some(i) => u32::from_le_bytes([
                self.store[i],
                self.store[i + 1],
                self.store[i + 2],
                self.store[i + 3],
            ]),
            None => NIL,
        }
    }

    fn set_word(&mut self, addr: u32, value: u32) {
        if let Some(i) = store_index(&self.maps, addr, 4) {
            self.store[i..i + 4].copy_from_slice(&value.to_le_bytes());
        }
    }

    fn next(&self, block: u32) -> u32 {
        self.word(block)
    }

    fn set_next(&mut self, block: u32, next: u32) {
        self.set_word(block, next);
    }

    fn size_of(&self, block: u32) -> u32 {
        self.word(block + 4) & !ALLOC_BIT
    }

    fn set_size(&mut self, block: u32, size: u32) {
        self.set_word(block + 4, size);
    }
}

/// Read-only access to heap payloads, possibly with one block carved out.
#[derive(Clone, Copy, Debug)]
pub struct HeapView<'a> {
    before: &'a [u8],
    after: &'a [u8],
    /// Carved-out byte range as `(start, end)`.
    hole: (usize, usize),
    maps: &'a [Mapping],
}

impl<'a> HeapView<'a> {
    /// Returns the payload bytes of an allocation, or `None` if the pointer
    /// is not live or its block is the one carved out of this view.
    #[must_use]
    pub fn bytes(&self, ptr: HeapPtr) -> Option<&'a [u8]> {
        let (start, len) = self.payload_range(ptr)?;
        self.slice(start, len)
    }

    fn slice(&self, start: usize, len: usize) -> Option<&'a [u8]> {
        let end = start.checked_add(len)?;
        if end <= self.hole.0 {
            self.before.get(start..end)
        } else if start >= self.hole.1 {
            self.after.get(start - self.hole.1..end - self.hole.1)
        } else {
            None
        }
    }

    /// Returns the size word of an allocated block, validating the witness
    /// pair (allocation bit set, free pointer cleared).
    fn allocated_size(&self, block: u32) -> Option<u32> {
        if block % ALIGNMENT != 0 {
            return None;
        }
        let i = store_index(self.maps, block, HEADER_SIZE)?;
        let header = self.slice(i, HEADER_SIZE as usize)?;
        let next = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        if size & ALLOC_BIT == 0 || next != NIL {
            return None;
        }
        let size = size & !ALLOC_BIT;
        if size <= HEADER_SIZE {
            return None;
        }
        store_index(self.maps, block, size)?;
        Some(size)
    }

    /// Returns the backing-store index and length of a live payload.
    fn payload_range(&self, ptr: HeapPtr) -> Option<(usize, usize)> {
        let block = ptr.addr().checked_sub(HEADER_SIZE)?;
        let size = self.allocated_size(block)?;
        let start = store_index(self.maps, ptr.addr(), size - HEADER_SIZE)?;
        Some((start, (size - HEADER_SIZE) as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::ops::Range;

    fn heap_with(size: u32) -> Heap {
        let mut heap = Heap::new();
        heap.register(&[Region::new(0x1000, size)])
            .expect("single region registers");
        heap
    }

    fn span(heap: &Heap, ptr: HeapPtr) -> Range<u32> {
        let len = heap.user_size(ptr).expect("live allocation") as u32;
        ptr.addr()..ptr.addr() + len
    }

    #[test]
    fn register_rejects_unordered_regions() {
        let mut heap = Heap::new();
        let regions = [Region::new(0x2000, 256), Region::new(0x1000, 256)];
        assert_eq!(heap.register(&regions), Err(HeapError::Unordered));
        assert!(!heap.is_registered(), "failed registration changes nothing");
    }

    #[test]
    fn register_rejects_overlapping_regions() {
        let mut heap = Heap::new();
        let regions = [Region::new(0x1000, 0x200), Region::new(0x1100, 0x200)];
        assert_eq!(heap.register(&regions), Err(HeapError::Unordered));
    }

    #[test]
    fn register_happens_once() {
        let mut heap = heap_with(1024);
        assert_eq!(
            heap.register(&[Region::new(0x8000, 1024)]),
            Err(HeapError::AlreadyRegistered)
        );
    }

    #[test]
    fn undersized_regions_are_skipped() {
        let mut heap = Heap::new();
        let total = heap
            .register(&[Region::new(0x100, 12), Region::new(0x1000, 256)])
            .expect("second region is usable");
        assert_eq!(total, 256 - HEADER_SIZE, "only the large region counts");
    }

    #[test]
    fn all_regions_undersized_is_an_error() {
        let mut heap = Heap::new();
        assert_eq!(
            heap.register(&[Region::new(0x100, 16)]),
            Err(HeapError::NoUsableRegion)
        );
        assert!(heap.alloc(1).is_none(), "nothing to allocate from");
    }

    #[test]
    fn unaligned_region_start_is_rounded_up() {
        let mut heap = Heap::new();
        let total = heap
            .register(&[Region::new(0x1001, 259)])
            .expect("region registers");
        assert_eq!(total, 256 - HEADER_SIZE, "3 bytes lost to alignment");
        let p = heap.alloc(4).expect("fits");
        assert_eq!(p.addr() % ALIGNMENT, 0, "payload aligned");
    }

    #[test]
    fn zero_and_oversized_requests_fail() {
        let mut heap = heap_with(1024);
        assert!(heap.alloc(0).is_none(), "zero-size request");
        assert!(heap.alloc(1 << 31).is_none(), "collides with allocation bit");
        assert!(heap.alloc(4096).is_none(), "larger than the region");
        assert_eq!(heap.used_bytes(), 0, "failures leave the heap untouched");
    }

    #[test]
    fn accounting_balances_after_mixed_sequence() {
        let mut heap = heap_with(4096);
        let total = heap.total_bytes();
        let a = heap.alloc(10).expect("a");
        let b = heap.alloc(100).expect("b");
        let c = heap.alloc(33).expect("c");
        heap.free(b);
        let d = heap.alloc(50).expect("d");
        heap.free(a);
        assert_eq!(heap.free_bytes() + heap.used_bytes(), total, "free + used");
        heap.free(c);
        heap.free(d);
        assert_eq!(heap.free_bytes(), total, "everything returned");
        assert_eq!(heap.used_bytes(), 0);
    }

    #[test]
    fn live_allocations_never_overlap() {
        let mut heap = heap_with(2048);
        let mut live = Vec::new();
        for n in [7_usize, 64, 1, 200, 13, 90] {
            live.push(heap.alloc(n).expect("allocation fits"));
        }
        heap.free(live.remove(2));
        live.push(heap.alloc(3).expect("reuses the freed hole"));
        for (i, a) in live.iter().enumerate() {
            for b in &live[i + 1..] {
                let (ra, rb) = (span(&heap, *a), span(&heap, *b));
                assert!(
                    ra.end <= rb.start || rb.end <= ra.start,
                    "{ra:?} overlaps {rb:?}"
                );
            }
        }
    }

    #[test]
    fn free_then_alloc_same_size_round_trips() {
        let mut heap = heap_with(1024);
        let keep = heap.alloc(16).expect("keep");
        heap.bytes_mut(keep)
            .expect("writable")
            .copy_from_slice(&[0xAB; 16]);
        let tmp = heap.alloc(40).expect("tmp");
        heap.free(tmp);
        let again = heap.alloc(40).expect("same size again");
        assert_eq!(again, tmp, "first fit returns the same block");
        assert_eq!(heap.bytes(keep).expect("readable"), &[0xAB; 16]);
    }

    #[test]
    fn adjacent_frees_coalesce() {
        let mut heap = heap_with(256);
        let a = heap.alloc(64).expect("a");
        let b = heap.alloc(64).expect("b");
        let _c = heap.alloc(64).expect("c");
        assert!(heap.alloc(120).is_none(), "no single hole is big enough yet");
        heap.free(a);
        heap.free(b);
        let merged = heap.alloc(120).expect("a and b merged into one block");
        assert_eq!(merged, a, "merged block starts where a was");
    }

    #[test]
    fn min_ever_free_is_monotonic_under_allocation() {
        let mut heap = heap_with(2048);
        let mut last = heap.min_ever_free();
        for _ in 0..10 {
            let _ = heap.alloc(24);
            assert!(heap.min_ever_free() <= last, "high-water mark only drops");
            last = heap.min_ever_free();
        }
        assert_eq!(last, heap.free_bytes());
    }

    #[test]
    fn double_free_is_a_no_op() {
        let mut heap = heap_with(512);
        let a = heap.alloc(32).expect("a");
        let _b = heap.alloc(32).expect("b");
        heap.free(a);
        let free = heap.free_bytes();
        heap.free(a);
        assert_eq!(heap.free_bytes(), free, "second free ignored");
    }

    #[test]
    fn bogus_pointer_is_ignored() {
        let mut heap = heap_with(512);
        let a = heap.alloc(32).expect("a");
        let inner = HeapPtr(NonZeroU32::new(a.addr() + 4).expect("non-zero"));
        let used = heap.used_bytes();
        heap.free(inner);
        assert_eq!(heap.used_bytes(), used, "pointer into a payload ignored");
    }

    #[test]
    fn realloc_preserves_contents() {
        let mut heap = heap_with(1024);
        let a = heap.alloc(8).expect("a");
        heap.bytes_mut(a)
            .expect("writable")
            .copy_from_slice(b"kestrel!");
        let b = heap.realloc(Some(a), 64).expect("grown");
        assert_eq!(&heap.bytes(b).expect("readable")[..8], b"kestrel!");
        assert!(heap.bytes(a).is_none(), "old block released");
    }

    #[test]
    fn failed_realloc_keeps_original() {
        let mut heap = heap_with(256);
        let a = heap.alloc(100).expect("a");
        heap.bytes_mut(a).expect("writable")[0] = 7;
        assert!(heap.realloc(Some(a), 400).is_none(), "too big");
        assert_eq!(heap.bytes(a).expect("still live")[0], 7);
    }

    #[test]
    fn calloc_zeroes_reused_memory() {
        let mut heap = heap_with(256);
        let a = heap.alloc(32).expect("a");
        heap.bytes_mut(a).expect("writable").fill(0xFF);
        heap.free(a);
        let b = heap.calloc(4, 8).expect("b");
        assert!(heap.bytes(b).expect("readable").iter().all(|&x| x == 0));
    }

    #[test]
    fn blocks_never_span_regions() {
        let mut heap = Heap::new();
        heap.register(&[Region::new(0x1000, 128), Region::new(0x1080, 128)])
            .expect("touching regions are allowed");
        assert!(heap.alloc(200).is_none(), "sentinel separates the regions");
        let a = heap.alloc(100).expect("fits in one region");
        let b = heap.alloc(100).expect("fits in the other");
        assert!(b.addr() > 0x1080, "second block lives in the second region");
        heap.free(a);
        heap.free(b);
        assert_eq!(heap.used_bytes(), 0);
    }

    #[test]
    fn split_view_reads_other_blocks() {
        let mut heap = heap_with(512);
        let text = heap.alloc(5).expect("text");
        heap.bytes_mut(text)
            .expect("writable")
            .copy_from_slice(b"hello");
        let scratch = heap.alloc(64).expect("scratch");
        let (pixels, view) = heap.split_mut(scratch).expect("live");
        pixels.fill(1);
        assert_eq!(&view.bytes(text).expect("outside the hole")[..5], b"hello");
        assert!(view.bytes(scratch).is_none(), "carved block is hidden");
    }
}
