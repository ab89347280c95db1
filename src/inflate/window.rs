/// Sliding output history for back-reference copies that reach before the
/// start of the current output buffer.
///
/// The buffer is circular: `next` is the write position, `have` the number of
/// valid bytes. It is only allocated once the first output actually needs to
/// be saved, so decompressing in a single call never pays for it.
#[derive(Debug, Default)]
pub(crate) struct Window {
    buf: Vec<u8>,
    have: usize,
    next: usize,
}

impl Window {
    pub(crate) fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub(crate) fn alloc(&mut self, window_bits: u8) {
        let size = 1usize << window_bits;
        if self.buf.len() != size {
            self.buf = vec![0; size];
            self.have = 0;
            self.next = 0;
        }
    }

    pub(crate) fn size(&self) -> usize {
        self.buf.len()
    }

    /// number of valid history bytes
    pub(crate) fn have(&self) -> usize {
        self.have
    }

    /// write position in the circular buffer
    pub(crate) fn next(&self) -> usize {
        self.next
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub(crate) fn clear(&mut self) {
        self.have = 0;
        self.next = 0;
    }

    /// Append freshly produced output to the history, keeping only the most
    /// recent `size()` bytes.
    pub(crate) fn extend(&mut self, slice: &[u8]) {
        let wsize = self.buf.len();

        if slice.len() >= wsize {
            // the slice alone fills the window
            self.buf.copy_from_slice(&slice[slice.len() - wsize..]);
            self.next = 0;
            self.have = wsize;
            return;
        }

        let dist = Ord::min(wsize - self.next, slice.len());
        let (first, second) = slice.split_at(dist);

        self.buf[self.next..self.next + first.len()].copy_from_slice(first);
        if !second.is_empty() {
            self.buf[..second.len()].copy_from_slice(second);
            self.next = second.len();
            self.have = wsize;
        } else {
            self.next += dist;
            if self.next == wsize {
                self.next = 0;
            }
            if self.have < wsize {
                self.have += dist;
            }
        }
    }
}
