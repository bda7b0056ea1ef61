use std::net::SocketAddr;

/// Ordered candidate addresses with a wrap-around cursor.
///
/// Insertion order is preserved and duplicates are rejected. The set is
/// expected to be small, so membership is a linear scan.
#[derive(Debug, Clone, Default)]
pub struct AddressQueue {
    addrs: Vec<SocketAddr>,
    cursor: usize,
}

impl AddressQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `addr` unless it is already present.
    pub fn push(&mut self, addr: SocketAddr) -> bool {
        if self.addrs.contains(&addr) {
            return false;
        }
        self.addrs.push(addr);
        true
    }

    /// The address at the cursor, advancing (and wrapping) the cursor.
    pub fn next_address(&mut self) -> Option<SocketAddr> {
        let addr = *self.addrs.get(self.cursor)?;
        self.cursor = (self.cursor + 1) % self.addrs.len();
        Some(addr)
    }

    /// Move the cursor back to the first address.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    pub fn clear(&mut self) {
        self.addrs.clear();
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SocketAddr> {
        self.addrs.iter()
    }
}
