/// Output cursor over the caller's buffer.
pub(crate) struct Writer<'a> {
    buf: &'a mut [u8],
    filled: usize,
}

impl<'a> Writer<'a> {
    pub(crate) fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, filled: 0 }
    }

    /// number of bytes written so far
    pub(crate) fn len(&self) -> usize {
        self.filled
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.filled
    }

    pub(crate) fn is_full(&self) -> bool {
        self.filled == self.buf.len()
    }

    pub(crate) fn filled(&self) -> &[u8] {
        &self.buf[..self.filled]
    }

    pub(crate) fn push(&mut self, byte: u8) {
        self.buf[self.filled] = byte;
        self.filled += 1;
    }

    pub(crate) fn extend(&mut self, slice: &[u8]) {
        self.buf[self.filled..self.filled + slice.len()].copy_from_slice(slice);
        self.filled += slice.len();
    }

    /// Copy `length` bytes from `offset_from_end` bytes before the current
    /// position. The regions may overlap; an overlapping copy repeats the
    /// bytes already written, as deflate match semantics require.
    pub(crate) fn copy_match(&mut self, offset_from_end: usize, length: usize) {
        let start = self.filled - offset_from_end;

        if offset_from_end == 1 {
            // a run of a single byte
            let byte = self.buf[start];
            self.buf[self.filled..self.filled + length].fill(byte);
        } else if offset_from_end >= length {
            self.buf.copy_within(start..start + length, self.filled);
        } else {
            for i in 0..length {
                self.buf[self.filled + i] = self.buf[start + i];
            }
        }

        self.filled += length;
    }
}

impl core::fmt::Debug for Writer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Writer")
            .field("filled", &self.filled)
            .field("capacity", &self.buf.len())
            .finish()
    }
}
