use crate::ReturnCode;

/// LSB-first bit accumulator over the current input slice.
///
/// The accumulator contents survive across calls: the caller saves [`hold`]
/// and [`bits_in_buffer`] when a call suspends and restores them into the
/// reader for the next slice. Bytes pulled into the accumulator count as
/// consumed input.
///
/// [`hold`]: Self::hold
/// [`bits_in_buffer`]: Self::bits_in_buffer
#[derive(Debug)]
pub(crate) struct BitReader<'a> {
    slice: &'a [u8],
    pos: usize,
    hold: u64,
    bits: u8,
}

impl<'a> BitReader<'a> {
    pub fn new(slice: &'a [u8], hold: u64, bits: u8) -> Self {
        Self {
            slice,
            pos: 0,
            hold,
            bits,
        }
    }

    pub fn hold(&self) -> u64 {
        self.hold
    }

    pub fn bits_in_buffer(&self) -> u8 {
        self.bits
    }

    pub fn bytes_consumed(&self) -> usize {
        self.pos
    }

    pub fn bytes_remaining(&self) -> usize {
        self.slice.len() - self.pos
    }

    /// The input not yet pulled into the accumulator.
    pub fn as_slice(&self) -> &'a [u8] {
        &self.slice[self.pos..]
    }

    pub fn advance(&mut self, n: usize) {
        debug_assert!(self.bits == 0);
        self.pos += n;
    }

    /// The low `n` bits of the accumulator, without consuming them.
    pub fn bits(&self, n: usize) -> u64 {
        self.hold & ((1u64 << n) - 1)
    }

    pub fn drop_bits(&mut self, n: u8) {
        debug_assert!(n <= self.bits);
        self.hold >>= n;
        self.bits -= n;
    }

    pub fn init_bits(&mut self) {
        self.hold = 0;
        self.bits = 0;
    }

    /// Discard bits up to the next byte boundary.
    pub fn next_byte_boundary(&mut self) {
        let partial = self.bits & 7;
        self.hold >>= partial;
        self.bits -= partial;
    }

    /// Pull one byte of input into the accumulator; `Err` means the input is
    /// exhausted and the caller must suspend.
    pub fn pull_byte(&mut self) -> Result<(), ReturnCode> {
        let Some(&byte) = self.slice.get(self.pos) else {
            return Err(ReturnCode::Ok);
        };

        self.hold |= (byte as u64) << self.bits;
        self.bits += 8;
        self.pos += 1;

        Ok(())
    }

    pub fn need_bits(&mut self, n: usize) -> Result<(), ReturnCode> {
        while (self.bits as usize) < n {
            self.pull_byte()?;
        }
        Ok(())
    }

    /// Top the accumulator up to at least 56 bits, or until the input runs
    /// out. The decode hot loop relies on this to avoid per-symbol bounds
    /// checks on the accumulator.
    pub fn refill(&mut self) {
        while self.bits <= 56 {
            match self.slice.get(self.pos) {
                Some(&byte) => {
                    self.hold |= (byte as u64) << self.bits;
                    self.bits += 8;
                    self.pos += 1;
                }
                None => break,
            }
        }
    }

    /// Hand whole unconsumed bytes in the accumulator back to the input, so
    /// that suspension points never sit in the middle of a byte run pulled in
    /// by [`refill`](Self::refill).
    pub fn return_unused_bytes(&mut self) {
        let whole_bytes = self.bits >> 3;
        self.pos -= whole_bytes as usize;
        self.bits -= whole_bytes << 3;
        self.hold &= (1u64 << self.bits) - 1;
    }

    /// Flush the accumulator to a byte sequence for the marker search of a
    /// sync operation, returning the bytes and how many are valid.
    pub fn start_sync_search(&mut self) -> ([u8; 4], usize) {
        let mut buf = [0u8; 4];
        let mut len = 0;

        // partial bits cannot participate in a byte-aligned marker
        self.hold <<= self.bits & 7;
        self.bits -= self.bits & 7;

        while self.bits >= 8 && len < 4 {
            buf[len] = self.hold as u8;
            len += 1;
            self.hold >>= 8;
            self.bits -= 8;
        }

        self.hold = 0;
        self.bits = 0;

        (buf, len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_are_lsb_first() {
        let mut reader = BitReader::new(&[0b1010_0110, 0xff], 0, 0);
        reader.need_bits(3).unwrap();
        assert_eq!(reader.bits(3), 0b110);
        reader.drop_bits(3);
        reader.need_bits(5).unwrap();
        assert_eq!(reader.bits(5), 0b10100);
    }

    #[test]
    fn suspends_on_empty_input() {
        let mut reader = BitReader::new(&[0xab], 0, 0);
        assert!(reader.need_bits(8).is_ok());
        assert!(reader.need_bits(9).is_err());
        // partial state survives for the next call
        assert_eq!(reader.hold(), 0xab);
        assert_eq!(reader.bits_in_buffer(), 8);
    }

    #[test]
    fn return_unused_bytes_rewinds() {
        let mut reader = BitReader::new(&[1, 2, 3, 4, 5, 6, 7, 8, 9], 0, 0);
        reader.refill();
        assert_eq!(reader.bits_in_buffer(), 64);
        reader.drop_bits(4);
        reader.return_unused_bytes();
        assert_eq!(reader.bits_in_buffer(), 4);
        assert_eq!(reader.bytes_consumed(), 1);
    }
}
