/// Buffer of tallied symbols waiting for the end of the current block.
///
/// Literals and matches are stored in two parallel arrays (a distance and a
/// length/literal byte per symbol) rather than a packed byte stream, so no
/// unaligned reads are needed when the block is emitted. A distance of zero
/// marks a literal.
#[derive(Debug)]
pub(crate) struct SymBuf {
    dist: Vec<u16>,
    len_code: Vec<u8>,
    limit: usize,
}

impl SymBuf {
    pub fn new(lit_bufsize: usize) -> Self {
        Self {
            dist: Vec::with_capacity(lit_bufsize),
            len_code: Vec::with_capacity(lit_bufsize),
            // leave room for one more symbol so the fixed-code block size
            // estimate stays valid when the flush is triggered
            limit: lit_bufsize - 1,
        }
    }

    pub fn push_lit(&mut self, byte: u8) {
        self.dist.push(0);
        self.len_code.push(byte);
    }

    pub fn push_dist(&mut self, dist: u16, len: u8) {
        debug_assert!(dist > 0);
        self.dist.push(dist);
        self.len_code.push(len);
    }

    /// The block must be flushed once only one free slot remains.
    pub fn should_flush_block(&self) -> bool {
        self.dist.len() >= self.limit
    }

    pub fn len(&self) -> usize {
        self.dist.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dist.is_empty()
    }

    pub fn clear(&mut self) {
        self.dist.clear();
        self.len_code.clear();
    }

    pub fn get(&self, index: usize) -> (u16, u8) {
        (self.dist[index], self.len_code[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals_and_matches() {
        let mut buf = SymBuf::new(16);
        buf.push_lit(b'a');
        buf.push_dist(1, 255);
        buf.push_lit(0);

        let symbols: Vec<_> = (0..buf.len()).map(|i| buf.get(i)).collect();
        assert_eq!(symbols, [(0, b'a'), (1, 255), (0, 0)]);
    }

    #[test]
    fn flush_trigger_leaves_one_slot() {
        let mut buf = SymBuf::new(4);
        buf.push_lit(1);
        buf.push_lit(2);
        assert!(!buf.should_flush_block());
        buf.push_lit(3);
        assert!(buf.should_flush_block());
    }
}
