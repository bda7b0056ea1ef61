//! Sliding-window byte buffer.
//!
//! Despite the name this is not a modulo-indexed ring: data always lives in
//! one contiguous `[start, end)` range so it can be handed to a single
//! `send`/`recv` call. Space freed at the front is reclaimed by compaction,
//! which shifts the live range back to offset 0.
//!
//! ```text
//!   0        start            end             capacity
//!   ├─ consumed ─┼── buffered ───┼── available ───┤
//! ```

/// A fixed-capacity contiguous byte array.
#[derive(Debug)]
pub struct MemoryRegion {
    bytes: Box<[u8]>,
}

impl MemoryRegion {
    /// Allocate a zero-filled region of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0u8; capacity].into_boxed_slice(),
        }
    }

    /// Size of the region in bytes.
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

/// Read/write window over an owned [`MemoryRegion`].
///
/// Invariant: `start <= end <= capacity`.
#[derive(Debug)]
pub struct RingBuffer {
    region: MemoryRegion,
    start: usize,
    end: usize,
}

impl RingBuffer {
    /// Create an empty buffer with a fixed capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            region: MemoryRegion::new(capacity),
            start: 0,
            end: 0,
        }
    }

    /// Total capacity of the underlying region.
    pub fn capacity(&self) -> usize {
        self.region.capacity()
    }

    /// Bytes written but not yet read (`end - start`).
    pub fn amount_buffered(&self) -> usize {
        self.end - self.start
    }

    /// Free bytes after the write cursor (`capacity - end`).
    ///
    /// Space before `start` is not counted until the buffer is compacted.
    pub fn available(&self) -> usize {
        self.capacity() - self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Append `data`. All-or-nothing: fails without writing if it does not fit.
    #[must_use]
    pub fn put(&mut self, data: &[u8]) -> bool {
        if data.len() > self.available() {
            return false;
        }
        let end = self.end + data.len();
        self.region.as_mut_slice()[self.end..end].copy_from_slice(data);
        self.end = end;
        true
    }

    /// Fill `out` from the front. All-or-nothing: fails without consuming if
    /// fewer than `out.len()` bytes are buffered.
    #[must_use]
    pub fn get(&mut self, out: &mut [u8]) -> bool {
        if out.len() > self.amount_buffered() {
            return false;
        }
        let start = self.start + out.len();
        out.copy_from_slice(&self.region.as_slice()[self.start..start]);
        self.start = start;
        true
    }

    /// Look at the first `len` buffered bytes without consuming them.
    pub fn peek(&self, len: usize) -> Option<&[u8]> {
        if len > self.amount_buffered() {
            return None;
        }
        Some(&self.region.as_slice()[self.start..self.start + len])
    }

    /// The whole buffered range, for handing to a single send call.
    pub fn buffered_slice(&self) -> &[u8] {
        &self.region.as_slice()[self.start..self.end]
    }

    /// The free range after `end`, for handing to a single receive call.
    pub fn open_region_mut(&mut self) -> &mut [u8] {
        let end = self.end;
        &mut self.region.as_mut_slice()[end..]
    }

    /// Mark `len` bytes of the open region as written.
    #[must_use]
    pub fn commit(&mut self, len: usize) -> bool {
        if len > self.available() {
            return false;
        }
        self.end += len;
        true
    }

    /// Drop `len` bytes from the front without copying them out.
    #[must_use]
    pub fn consume(&mut self, len: usize) -> bool {
        if len > self.amount_buffered() {
            return false;
        }
        self.start += len;
        true
    }

    /// Compact only when the write cursor has hit the end of the region.
    pub fn compress(&mut self) {
        if self.available() == 0 {
            self.full_compress();
        }
    }

    /// Shift the buffered range down to offset 0.
    pub fn full_compress(&mut self) {
        if self.start == 0 {
            return;
        }
        let buffered = self.amount_buffered();
        self.region
            .as_mut_slice()
            .copy_within(self.start..self.end, 0);
        self.start = 0;
        self.end = buffered;
    }

    /// Discard everything. Bytes are left in place; only the cursors move.
    pub fn reset(&mut self) {
        self.start = 0;
        self.end = 0;
    }
}
