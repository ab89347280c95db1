/// The output buffer compressed bytes accumulate in before being copied to
/// the caller's output slice.
#[derive(Debug)]
pub(crate) struct Pending {
    buf: Box<[u8]>,
    /// index of the first byte not yet copied out
    out: usize,
    /// number of bytes waiting to be copied out
    pending: usize,
}

impl Pending {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity].into_boxed_slice(),
            out: 0,
            pending: 0,
        }
    }

    pub fn reset_keep(&mut self) {
        self.out = 0;
        self.pending = 0;
    }

    pub fn pending(&self) -> &[u8] {
        &self.buf[self.out..][..self.pending]
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Number of bytes that can still be added before the buffer is full.
    pub fn remaining(&self) -> usize {
        self.buf.len() - (self.out + self.pending)
    }

    /// Mark `n` pending bytes as copied out.
    pub fn advance(&mut self, n: usize) {
        debug_assert!(n <= self.pending);
        self.out += n;
        self.pending -= n;
        if self.pending == 0 {
            self.out = 0;
        }
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        debug_assert!(self.remaining() >= bytes.len());
        self.buf[self.out + self.pending..][..bytes.len()].copy_from_slice(bytes);
        self.pending += bytes.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_and_advance() {
        let mut pending = Pending::new(16);
        pending.extend(&[1, 2, 3, 4]);
        assert_eq!(pending.pending(), &[1, 2, 3, 4]);
        assert_eq!(pending.remaining(), 12);

        pending.advance(2);
        assert_eq!(pending.pending(), &[3, 4]);

        pending.advance(2);
        assert_eq!(pending.pending(), &[] as &[u8]);
        // fully drained buffers rewind, freeing the whole capacity again
        assert_eq!(pending.remaining(), 16);
    }
}
