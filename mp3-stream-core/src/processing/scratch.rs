/// Smallest capacity a scratch buffer grows to.
const CAPACITY_FLOOR: usize = 1024;

/// Reusable growable byte region.
///
/// Capacity is monotonically non-decreasing: it grows by doubling from a
/// floor of 1024 bytes until it meets the required minimum, and never
/// shrinks. Growth is a pre-write sizing operation, not a copy-preserving
/// resize: contents are unspecified after [`ensure_capacity`] grows the
/// buffer.
///
/// The capture session keeps one of these per session and reuses it for
/// every delivered packet; encoder callers size one per stream for the
/// compressed output.
///
/// [`ensure_capacity`]: ScratchBuffer::ensure_capacity
#[derive(Debug, Default)]
pub struct ScratchBuffer {
    data: Vec<u8>,
}

impl ScratchBuffer {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Grow until capacity is at least `required`. No-op if already large
    /// enough.
    pub fn ensure_capacity(&mut self, required: usize) {
        let current = self.data.len();
        if current >= required {
            return;
        }
        let mut capacity = current.max(CAPACITY_FLOOR);
        while capacity < required {
            capacity *= 2;
        }
        // Fresh allocation: prior contents are not carried over.
        self.data = vec![0u8; capacity];
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Zero the first `len` bytes, for silence-flagged packets.
    pub fn fill_zero(&mut self, len: usize) {
        self.data[..len].fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let buf = ScratchBuffer::new();
        assert_eq!(buf.capacity(), 0);
        assert!(buf.is_empty());
    }

    #[test]
    fn first_growth_starts_at_the_floor() {
        let mut buf = ScratchBuffer::new();
        buf.ensure_capacity(1);
        assert_eq!(buf.capacity(), 1024);

        let mut buf = ScratchBuffer::new();
        buf.ensure_capacity(1024);
        assert_eq!(buf.capacity(), 1024);
    }

    #[test]
    fn grows_by_doubling() {
        let mut buf = ScratchBuffer::new();
        buf.ensure_capacity(1025);
        assert_eq!(buf.capacity(), 2048);

        buf.ensure_capacity(5000);
        assert_eq!(buf.capacity(), 8192);
    }

    #[test]
    fn capacity_never_shrinks() {
        let mut buf = ScratchBuffer::new();
        buf.ensure_capacity(10_000);
        let grown = buf.capacity();

        buf.ensure_capacity(16);
        assert_eq!(buf.capacity(), grown);
    }

    #[test]
    fn capacity_is_monotone_over_arbitrary_requests() {
        let mut buf = ScratchBuffer::new();
        let mut last = 0;
        for required in [3, 4096, 100, 9000, 9000, 40_000, 1] {
            buf.ensure_capacity(required);
            assert!(buf.capacity() >= required);
            assert!(buf.capacity() >= last);
            last = buf.capacity();
        }
    }

    #[test]
    fn fill_zero_clears_prefix() {
        let mut buf = ScratchBuffer::new();
        buf.ensure_capacity(16);
        buf.as_mut_slice()[..4].copy_from_slice(&[1, 2, 3, 4]);
        buf.fill_zero(3);
        assert_eq!(&buf.as_slice()[..4], &[0, 0, 0, 4]);
    }
}
