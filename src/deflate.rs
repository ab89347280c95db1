//! Compression (RFC 1951), with optional zlib (RFC 1950) or gzip (RFC 1952)
//! framing.

use std::ops::Range;

use crate::{
    adler32::adler32,
    crc32::{crc32, Crc32Fold},
    gz::GzHeader,
    Error, Flush, Progress, ReturnCode, ADLER32_INITIAL_VALUE, CRC32_INITIAL_VALUE,
};

mod algorithm;
mod hash_calc;
mod longest_match;
mod pending;
mod slide_hash;
mod sym_buf;
mod trees_tbl;
mod window;

use self::{
    algorithm::CONFIGURATION_TABLE,
    pending::Pending,
    sym_buf::SymBuf,
    trees_tbl::{
        bit_reverse, d_code, BASE_DIST, BASE_LENGTH, EXTRA_DBITS, EXTRA_LBITS, LENGTH_CODE,
        STATIC_DTREE, STATIC_LTREE,
    },
    window::Window,
};

pub(crate) const STD_MIN_MATCH: usize = 3;
pub(crate) const STD_MAX_MATCH: usize = 258;

/// position of the byte rolled into the hash of a string
pub(crate) const HASH_CALC_OFFSET: usize = STD_MIN_MATCH - 1;

/// Matches are never found closer to the end of the input than this: one
/// maximum-length match plus the next hashable string.
pub(crate) const MIN_LOOKAHEAD: usize = STD_MAX_MATCH + STD_MIN_MATCH + 1;

const LENGTH_CODES: usize = 29;
const LITERALS: usize = 256;
const L_CODES: usize = LITERALS + 1 + LENGTH_CODES;
const D_CODES: usize = 30;
const BL_CODES: usize = 19;
const HEAP_SIZE: usize = 2 * L_CODES + 1;
const MAX_BITS: usize = 15;
const MAX_BL_BITS: usize = 7;

const END_BLOCK: usize = 256;

/// repeat the previous code length 3-6 times (2 extra bits)
const REP_3_6: usize = 16;
/// repeat a zero length 3-10 times (3 extra bits)
const REPZ_3_10: usize = 17;
/// repeat a zero length 11-138 times (7 extra bits)
const REPZ_11_138: usize = 18;

const EXTRA_BLBITS: [u8; BL_CODES] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2, 3, 7];

/// the lengths of the bit length codes are sent in this order
const BL_ORDER: [u8; BL_CODES] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

pub(crate) const NIL: u16 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum Method {
    #[default]
    Deflated = 8,
}

impl TryFrom<i32> for Method {
    type Error = ();

    fn try_from(value: i32) -> Result<Self, ()> {
        match value {
            8 => Ok(Method::Deflated),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(i32)]
pub enum Strategy {
    #[default]
    Default = 0,
    Filtered = 1,
    HuffmanOnly = 2,
    Rle = 3,
    Fixed = 4,
}

impl TryFrom<i32> for Strategy {
    type Error = ();

    fn try_from(value: i32) -> Result<Self, ()> {
        match value {
            0 => Ok(Strategy::Default),
            1 => Ok(Strategy::Filtered),
            2 => Ok(Strategy::HuffmanOnly),
            3 => Ok(Strategy::Rle),
            4 => Ok(Strategy::Fixed),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Binary = 0,
    Text = 1,
    Unknown = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeflateConfig {
    pub level: i32,
    pub method: Method,
    pub window_bits: i32,
    pub mem_level: i32,
    pub strategy: Strategy,
}

impl DeflateConfig {
    pub fn new(level: i32) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }
}

impl Default for DeflateConfig {
    fn default() -> Self {
        Self {
            level: crate::Z_DEFAULT_COMPRESSION,
            method: Method::Deflated,
            window_bits: crate::MAX_WBITS,
            mem_level: DEF_MEM_LEVEL,
            strategy: Strategy::Default,
        }
    }
}

pub const DEF_MEM_LEVEL: i32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Init,
    GZip,
    Extra,
    Name,
    Comment,
    Hcrc,
    Busy,
    Finish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockState {
    /// block not completed, need more input or more output
    NeedMore = 0,
    /// block flush performed
    BlockDone = 1,
    /// finish started, need only more output at next deflate
    FinishStarted = 2,
    /// finish done, accept no more input or output
    FinishDone = 3,
}

/// Compressed block type, the 2-bit field after the final-block bit.
#[derive(Debug, Clone, Copy)]
enum BlockType {
    StoredBlock = 0,
    StaticTrees = 1,
    DynamicTrees = 2,
}

/// A node of a Huffman tree under construction: `fc` holds the frequency
/// while counting and the code once assigned, `dl` holds the parent index
/// while building and the code length once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TreeNode {
    fc: u16,
    dl: u16,
}

impl TreeNode {
    pub(crate) const fn new(fc: u16, dl: u16) -> Self {
        Self { fc, dl }
    }

    fn freq(&self) -> u16 {
        self.fc
    }

    fn set_freq(&mut self, freq: u16) {
        self.fc = freq;
    }

    fn code(&self) -> u16 {
        self.fc
    }

    fn set_code(&mut self, code: u16) {
        self.fc = code;
    }

    fn dad(&self) -> u16 {
        self.dl
    }

    fn set_dad(&mut self, dad: u16) {
        self.dl = dad;
    }

    pub(crate) fn len(&self) -> u16 {
        self.dl
    }

    fn set_len(&mut self, len: u16) {
        self.dl = len;
    }
}

struct StaticTreeDesc {
    static_tree: &'static [TreeNode],
    extra_bits: &'static [u8],
    /// first code that carries extra bits
    extra_base: usize,
    elems: usize,
    max_length: u16,
}

static STATIC_L_DESC: StaticTreeDesc = StaticTreeDesc {
    static_tree: &STATIC_LTREE,
    extra_bits: &EXTRA_LBITS,
    extra_base: LITERALS + 1,
    elems: L_CODES,
    max_length: MAX_BITS as u16,
};

static STATIC_D_DESC: StaticTreeDesc = StaticTreeDesc {
    static_tree: &STATIC_DTREE,
    extra_bits: &EXTRA_DBITS,
    extra_base: 0,
    elems: D_CODES,
    max_length: MAX_BITS as u16,
};

static STATIC_BL_DESC: StaticTreeDesc = StaticTreeDesc {
    static_tree: &[],
    extra_bits: &EXTRA_BLBITS,
    extra_base: 0,
    elems: BL_CODES,
    max_length: MAX_BL_BITS as u16,
};

struct TreeDesc<const N: usize> {
    dyn_tree: [TreeNode; N],
    max_code: usize,
    stat_desc: &'static StaticTreeDesc,
}

impl<const N: usize> TreeDesc<N> {
    fn new(stat_desc: &'static StaticTreeDesc) -> Self {
        Self {
            dyn_tree: [TreeNode::new(0, 0); N],
            max_code: 0,
            stat_desc,
        }
    }
}

/// Priority queue of tree nodes, ordered by frequency with tree depth as the
/// tie breaker; `heap[1]` is the least frequent node.
struct Heap {
    heap: [u32; HEAP_SIZE],
    heap_len: usize,
    heap_max: usize,
    depth: [u8; HEAP_SIZE],
}

impl Heap {
    fn new() -> Self {
        Self {
            heap: [0; HEAP_SIZE],
            heap_len: 0,
            heap_max: HEAP_SIZE,
            depth: [0; HEAP_SIZE],
        }
    }

    fn smaller(tree: &[TreeNode], depth: &[u8], n: usize, m: usize) -> bool {
        tree[n].freq() < tree[m].freq()
            || (tree[n].freq() == tree[m].freq() && depth[n] <= depth[m])
    }

    /// Restore the heap property starting at node `k`, sifting down.
    fn pqdownheap(&mut self, tree: &[TreeNode], mut k: usize) {
        let v = self.heap[k];
        let mut j = k << 1;

        while j <= self.heap_len {
            if j < self.heap_len
                && Self::smaller(
                    tree,
                    &self.depth,
                    self.heap[j + 1] as usize,
                    self.heap[j] as usize,
                )
            {
                j += 1;
            }

            if Self::smaller(tree, &self.depth, v as usize, self.heap[j] as usize) {
                break;
            }

            self.heap[k] = self.heap[j];
            k = j;
            j <<= 1;
        }

        self.heap[k] = v;
    }
}

pub(crate) struct State {
    status: Status,

    level: i8,
    strategy: Strategy,
    /// 0 = raw deflate, 1 = zlib, 2 = gzip; negated once the trailer is out
    wrap: i8,
    w_size: usize,
    w_bits: u8,
    w_mask: usize,
    /// `2 * w_size`: history plus lookahead
    window_size: usize,

    pub(crate) pending: Pending,
    sym_buf: SymBuf,
    window: Window,

    /// heads of the hash chains, indexed by hash value
    head: Vec<u16>,
    /// link to the previous string with the same hash, indexed by position
    prev: Vec<u16>,
    hash_mask: u32,
    hash_shift: u32,
    ins_h: u32,

    strstart: usize,
    lookahead: usize,
    /// window position at which the current block started, negative after a
    /// slide pushed the block start out of the window
    block_start: isize,
    /// number of string inserts pending at the start of the lookahead
    insert: usize,

    match_start: usize,
    match_length: usize,
    match_available: bool,
    prev_match: u16,
    prev_length: usize,

    good_match: usize,
    nice_match: usize,
    max_chain_length: usize,
    max_lazy_match: usize,

    l_desc: TreeDesc<HEAP_SIZE>,
    d_desc: TreeDesc<{ 2 * D_CODES + 1 }>,
    bl_desc: TreeDesc<{ 2 * BL_CODES + 1 }>,
    bl_count: [u16; MAX_BITS + 1],
    heap: Heap,
    opt_len: usize,
    static_len: usize,
    matches: usize,

    bi_buf: u64,
    bi_valid: u8,

    adler: u32,
    crc_fold: Crc32Fold,
    gzhead: Option<GzHeader>,
    gzindex: usize,

    last_flush: i32,
    data_type: DataType,
    total_in: u64,
    total_out: u64,
    msg: Option<&'static str>,
}

impl State {
    fn new(level: i8, w_bits: u8, mem_level: i32, strategy: Strategy, wrap: i8) -> Self {
        let w_size = 1usize << w_bits;
        let hash_bits = mem_level as u32 + 7;
        let hash_size = 1usize << hash_bits;
        let lit_bufsize = 1usize << (mem_level + 6);

        Self {
            status: if wrap == 2 { Status::GZip } else { Status::Init },
            level,
            strategy,
            wrap,
            w_size,
            w_bits,
            w_mask: w_size - 1,
            window_size: 2 * w_size,
            pending: Pending::new(lit_bufsize * 4),
            sym_buf: SymBuf::new(lit_bufsize),
            window: Window::new(2 * w_size),
            head: vec![NIL; hash_size],
            prev: vec![NIL; w_size],
            hash_mask: (hash_size - 1) as u32,
            hash_shift: (hash_bits + STD_MIN_MATCH as u32 - 1) / STD_MIN_MATCH as u32,
            ins_h: 0,
            strstart: 0,
            lookahead: 0,
            block_start: 0,
            insert: 0,
            match_start: 0,
            match_length: STD_MIN_MATCH - 1,
            match_available: false,
            prev_match: 0,
            prev_length: STD_MIN_MATCH - 1,
            good_match: 0,
            nice_match: 0,
            max_chain_length: 0,
            max_lazy_match: 0,
            l_desc: TreeDesc::new(&STATIC_L_DESC),
            d_desc: TreeDesc::new(&STATIC_D_DESC),
            bl_desc: TreeDesc::new(&STATIC_BL_DESC),
            bl_count: [0; MAX_BITS + 1],
            heap: Heap::new(),
            opt_len: 0,
            static_len: 0,
            matches: 0,
            bi_buf: 0,
            bi_valid: 0,
            adler: if wrap == 2 {
                CRC32_INITIAL_VALUE
            } else {
                ADLER32_INITIAL_VALUE
            },
            crc_fold: Crc32Fold::new(),
            gzhead: None,
            gzindex: 0,
            last_flush: -2,
            data_type: DataType::Unknown,
            total_in: 0,
            total_out: 0,
            msg: None,
        }
    }

    pub(crate) fn max_dist(&self) -> usize {
        self.w_size - MIN_LOOKAHEAD
    }

    /// Record a literal; returns true when the block should be flushed.
    fn tally_lit(&mut self, byte: u8) -> bool {
        self.sym_buf.push_lit(byte);
        let freq = self.l_desc.dyn_tree[byte as usize].freq();
        self.l_desc.dyn_tree[byte as usize].set_freq(freq + 1);
        self.sym_buf.should_flush_block()
    }

    /// Record a match of length `len + STD_MIN_MATCH` at distance `dist`.
    fn tally_dist(&mut self, dist: usize, len: usize) -> bool {
        debug_assert!(dist > 0 && dist <= 32768);
        self.sym_buf.push_dist(dist as u16, len as u8);
        self.matches += 1;

        let l_code = LITERALS + 1 + LENGTH_CODE[len] as usize;
        let freq = self.l_desc.dyn_tree[l_code].freq();
        self.l_desc.dyn_tree[l_code].set_freq(freq + 1);

        let d_code = d_code(dist - 1) as usize;
        let freq = self.d_desc.dyn_tree[d_code].freq();
        self.d_desc.dyn_tree[d_code].set_freq(freq + 1);

        self.sym_buf.should_flush_block()
    }

    fn send_bits(&mut self, value: u64, len: u8) {
        debug_assert!(len <= 16);
        debug_assert!(value < (1 << len));

        self.bi_buf |= value << self.bi_valid;
        self.bi_valid += len;

        if self.bi_valid >= 48 {
            let bytes = self.bi_buf.to_le_bytes();
            self.pending.extend(&bytes[..6]);
            self.bi_buf >>= 48;
            self.bi_valid -= 48;
        }
    }

    fn send_code(&mut self, node: TreeNode) {
        self.send_bits(node.code() as u64, node.len() as u8);
    }

    /// Flush whole bytes out of the bit buffer into pending, keeping any
    /// partial byte.
    fn flush_bits(&mut self) {
        let whole_bytes = (self.bi_valid / 8) as usize;
        if whole_bytes > 0 {
            let bytes = self.bi_buf.to_le_bytes();
            self.pending.extend(&bytes[..whole_bytes]);
            self.bi_buf >>= whole_bytes * 8;
            self.bi_valid -= (whole_bytes * 8) as u8;
        }
    }

    /// Flush the bit buffer completely, padding to a byte boundary.
    fn bi_windup(&mut self) {
        let bytes = (self.bi_valid as usize + 7) / 8;
        if bytes > 0 {
            let src = self.bi_buf.to_le_bytes();
            self.pending.extend(&src[..bytes]);
        }
        self.bi_buf = 0;
        self.bi_valid = 0;
    }

    fn emit_tree_header(&mut self, block_type: BlockType, is_last: bool) {
        let header_bits = ((block_type as u64) << 1) | is_last as u64;
        self.send_bits(header_bits, 3);
    }

    fn emit_lit(&mut self, dynamic: bool, byte: u8) {
        let node = if dynamic {
            self.l_desc.dyn_tree[byte as usize]
        } else {
            STATIC_LTREE[byte as usize]
        };
        self.send_code(node);
    }

    fn emit_dist(&mut self, dynamic: bool, len_code: u8, dist: u16) {
        // the length code, then its extra bits
        let code = LENGTH_CODE[len_code as usize] as usize;
        let node = if dynamic {
            self.l_desc.dyn_tree[LITERALS + 1 + code]
        } else {
            STATIC_LTREE[LITERALS + 1 + code]
        };
        self.send_code(node);

        let extra = EXTRA_LBITS[code];
        if extra > 0 {
            let diff = len_code - BASE_LENGTH[code];
            self.send_bits(diff as u64, extra);
        }

        // the distance code, then its extra bits
        let dist = dist - 1;
        let code = d_code(dist as usize) as usize;
        let node = if dynamic {
            self.d_desc.dyn_tree[code]
        } else {
            STATIC_DTREE[code]
        };
        self.send_code(node);

        let extra = EXTRA_DBITS[code];
        if extra > 0 {
            let diff = dist - BASE_DIST[code];
            self.send_bits(diff as u64, extra);
        }
    }

    fn emit_end_block(&mut self, dynamic: bool) {
        let node = if dynamic {
            self.l_desc.dyn_tree[END_BLOCK]
        } else {
            STATIC_LTREE[END_BLOCK]
        };
        self.send_code(node);
    }

    /// Emit the buffered symbols as one compressed block body.
    fn compress_block(&mut self, dynamic: bool) {
        for i in 0..self.sym_buf.len() {
            let (dist, len_code) = self.sym_buf.get(i);
            if dist == 0 {
                self.emit_lit(dynamic, len_code);
            } else {
                self.emit_dist(dynamic, len_code, dist);
            }
        }

        self.emit_end_block(dynamic);
    }

    /// Emit a stored block holding `range` of the window.
    fn tr_stored_block(&mut self, range: Range<usize>, is_last: bool) {
        self.emit_tree_header(BlockType::StoredBlock, is_last);
        self.bi_windup();

        let len = range.len() as u16;
        self.pending.extend(&len.to_le_bytes());
        self.pending.extend(&(!len).to_le_bytes());
        self.pending.extend(&self.window.filled()[range]);
    }

    /// Emit an empty static block, realigning the output to a byte boundary
    /// within at most ten bits.
    fn tr_align(&mut self) {
        self.emit_tree_header(BlockType::StaticTrees, false);
        self.emit_end_block(false);
        self.flush_bits();
    }

    /// Decide between a stored, static, or dynamic block for the buffered
    /// symbols, and emit it.
    fn tr_flush_block(&mut self, window_range: Option<Range<usize>>, is_last: bool) {
        let stored_len = window_range.as_ref().map(Range::len).unwrap_or(0);

        let mut opt_lenb;
        let static_lenb;
        let mut max_blindex = 0;

        if self.level > 0 {
            if self.data_type == DataType::Unknown {
                self.data_type = self.detect_data_type();
            }

            build_tree(
                &mut self.l_desc,
                &mut self.heap,
                &mut self.bl_count,
                &mut self.opt_len,
                &mut self.static_len,
            );
            build_tree(
                &mut self.d_desc,
                &mut self.heap,
                &mut self.bl_count,
                &mut self.opt_len,
                &mut self.static_len,
            );

            max_blindex = self.build_bl_tree();

            // in bytes, including the 3 header bits
            opt_lenb = (self.opt_len + 3 + 7) >> 3;
            static_lenb = (self.static_len + 3 + 7) >> 3;

            log::trace!(
                "opt {opt_lenb}({}) stat {static_lenb}({}) stored {stored_len} lit {}",
                self.opt_len,
                self.static_len,
                self.sym_buf.len(),
            );

            if static_lenb <= opt_lenb || self.strategy == Strategy::Fixed {
                opt_lenb = static_lenb;
            }
        } else {
            opt_lenb = stored_len + 5;
            static_lenb = opt_lenb;
        }

        match window_range {
            Some(range) if stored_len + 4 <= opt_lenb => {
                // a stored block is cheapest, and the bytes are still in the
                // window to be copied
                self.tr_stored_block(range, is_last);
            }
            _ => {
                if static_lenb == opt_lenb {
                    self.emit_tree_header(BlockType::StaticTrees, is_last);
                    self.compress_block(false);
                } else {
                    self.emit_tree_header(BlockType::DynamicTrees, is_last);
                    self.send_all_trees(
                        self.l_desc.max_code + 1,
                        self.d_desc.max_code + 1,
                        max_blindex + 1,
                    );
                    self.compress_block(true);
                }
            }
        }

        self.init_block();

        if is_last {
            self.bi_windup();
        }
    }

    /// Construct the bit length tree over the code lengths of the literal and
    /// distance trees, returning the index of the last bit length code used.
    fn build_bl_tree(&mut self) -> usize {
        let l_max = self.l_desc.max_code;
        scan_tree(&mut self.bl_desc.dyn_tree, &mut self.l_desc.dyn_tree, l_max);
        let d_max = self.d_desc.max_code;
        scan_tree(&mut self.bl_desc.dyn_tree, &mut self.d_desc.dyn_tree, d_max);

        build_tree(
            &mut self.bl_desc,
            &mut self.heap,
            &mut self.bl_count,
            &mut self.opt_len,
            &mut self.static_len,
        );

        // the lengths are sent in BL_ORDER; trailing zero lengths of that
        // sequence can be omitted, but at least 4 lengths must be sent
        let mut max_blindex = BL_CODES - 1;
        while max_blindex >= 3
            && self.bl_desc.dyn_tree[BL_ORDER[max_blindex] as usize].len() == 0
        {
            max_blindex -= 1;
        }

        self.opt_len += 3 * (max_blindex + 1) + 5 + 5 + 4;

        max_blindex
    }

    fn send_all_trees(&mut self, lcodes: usize, dcodes: usize, blcodes: usize) {
        debug_assert!(lcodes >= 257 && dcodes >= 1 && blcodes >= 4);

        self.send_bits((lcodes - 257) as u64, 5);
        self.send_bits((dcodes - 1) as u64, 5);
        self.send_bits((blcodes - 4) as u64, 4);

        for rank in 0..blcodes {
            let len = self.bl_desc.dyn_tree[BL_ORDER[rank] as usize].len();
            self.send_bits(len as u64, 3);
        }

        self.send_compressed_tree(TreeKind::Lit, lcodes - 1);
        self.send_compressed_tree(TreeKind::Dist, dcodes - 1);
    }

    fn tree_len(&self, kind: TreeKind, n: usize) -> u16 {
        match kind {
            TreeKind::Lit => self.l_desc.dyn_tree[n].len(),
            TreeKind::Dist => self.d_desc.dyn_tree[n].len(),
        }
    }

    /// Emit the code lengths of a tree in run-length encoded form, using the
    /// bit length codes.
    fn send_compressed_tree(&mut self, kind: TreeKind, max_code: usize) {
        let mut prevlen = -1isize;
        let mut nextlen = self.tree_len(kind, 0) as isize;
        let mut count = 0;
        let mut max_count = 7;
        let mut min_count = 4;

        if nextlen == 0 {
            max_count = 138;
            min_count = 3;
        }

        for n in 0..=max_code {
            let curlen = nextlen;
            nextlen = if n + 1 <= max_code {
                self.tree_len(kind, n + 1) as isize
            } else {
                // guard value, different from any real length
                -2
            };

            count += 1;
            if count < max_count && curlen == nextlen {
                continue;
            }

            if count < min_count {
                let node = self.bl_desc.dyn_tree[curlen as usize];
                for _ in 0..count {
                    self.send_code(node);
                }
            } else if curlen != 0 {
                if curlen != prevlen {
                    let node = self.bl_desc.dyn_tree[curlen as usize];
                    self.send_code(node);
                    count -= 1;
                }
                debug_assert!((3..=6).contains(&count));
                let node = self.bl_desc.dyn_tree[REP_3_6];
                self.send_code(node);
                self.send_bits((count - 3) as u64, 2);
            } else if count <= 10 {
                let node = self.bl_desc.dyn_tree[REPZ_3_10];
                self.send_code(node);
                self.send_bits((count - 3) as u64, 3);
            } else {
                let node = self.bl_desc.dyn_tree[REPZ_11_138];
                self.send_code(node);
                self.send_bits((count - 11) as u64, 7);
            }

            count = 0;
            prevlen = curlen;
            if nextlen == 0 {
                max_count = 138;
                min_count = 3;
            } else if curlen == nextlen {
                max_count = 6;
                min_count = 3;
            } else {
                max_count = 7;
                min_count = 4;
            }
        }
    }

    fn detect_data_type(&self) -> DataType {
        // set bits 0..6, 14..25, and 28..31: control characters whose
        // presence marks the block as binary ("allow-listed" codes like
        // \n \r \t are excluded)
        let mut block_mask = 0xf3ffc07fu32;

        for n in 0..=31 {
            if block_mask & 1 != 0 && self.l_desc.dyn_tree[n].freq() != 0 {
                return DataType::Binary;
            }
            block_mask >>= 1;
        }

        // allow-listed characters imply text
        if self.l_desc.dyn_tree[9].freq() != 0
            || self.l_desc.dyn_tree[10].freq() != 0
            || self.l_desc.dyn_tree[13].freq() != 0
        {
            return DataType::Text;
        }
        if (32..LITERALS).any(|n| self.l_desc.dyn_tree[n].freq() != 0) {
            return DataType::Text;
        }

        // no characters at all: binary by convention
        DataType::Binary
    }

    fn init_block(&mut self) {
        for node in &mut self.l_desc.dyn_tree[..L_CODES] {
            node.set_freq(0);
        }
        for node in &mut self.d_desc.dyn_tree[..D_CODES] {
            node.set_freq(0);
        }
        for node in &mut self.bl_desc.dyn_tree[..BL_CODES] {
            node.set_freq(0);
        }

        // the end-of-block symbol always occurs once
        self.l_desc.dyn_tree[END_BLOCK].set_freq(1);
        self.opt_len = 0;
        self.static_len = 0;
        self.sym_buf.clear();
        self.matches = 0;
    }

    fn tr_init(&mut self) {
        self.bi_buf = 0;
        self.bi_valid = 0;
        self.data_type = DataType::Unknown;
        self.init_block();
    }

    fn reset_keep(&mut self) {
        self.total_in = 0;
        self.total_out = 0;
        self.msg = None;
        self.pending.reset_keep();

        // re-arm the trailer if a previous stream finished
        if self.wrap < 0 {
            self.wrap = -self.wrap;
        }

        self.status = if self.wrap == 2 {
            Status::GZip
        } else {
            Status::Init
        };
        self.adler = if self.wrap == 2 {
            CRC32_INITIAL_VALUE
        } else {
            ADLER32_INITIAL_VALUE
        };
        self.crc_fold = Crc32Fold::new();
        self.last_flush = -2;
        self.gzindex = 0;
        self.tr_init();
    }

    fn lm_init(&mut self) {
        self.window_size = 2 * self.w_size;
        self.head.fill(NIL);

        let config = &CONFIGURATION_TABLE[self.level as usize];
        self.max_lazy_match = config.max_lazy as usize;
        self.good_match = config.good_length as usize;
        self.nice_match = config.nice_length as usize;
        self.max_chain_length = config.max_chain as usize;

        self.strstart = 0;
        self.block_start = 0;
        self.lookahead = 0;
        self.insert = 0;
        self.match_length = STD_MIN_MATCH - 1;
        self.prev_length = STD_MIN_MATCH - 1;
        self.match_available = false;
        self.ins_h = 0;
    }
}

#[derive(Debug, Clone, Copy)]
enum TreeKind {
    Lit,
    Dist,
}

/// Update the frequencies of the bit length codes for one tree's sequence of
/// code lengths, counting runs the way `send_compressed_tree` will emit them.
fn scan_tree(bl_tree: &mut [TreeNode], tree: &mut [TreeNode], max_code: usize) {
    let mut prevlen = -1isize;
    let mut nextlen = tree[0].len() as isize;
    let mut count = 0;
    let mut max_count = 7;
    let mut min_count = 4;

    if nextlen == 0 {
        max_count = 138;
        min_count = 3;
    }

    // guard
    tree[max_code + 1].set_len(0xffff);

    for n in 0..=max_code {
        let curlen = nextlen;
        nextlen = tree[n + 1].len() as isize;

        count += 1;
        if count < max_count && curlen == nextlen {
            continue;
        }

        if count < min_count {
            let freq = bl_tree[curlen as usize].freq();
            bl_tree[curlen as usize].set_freq(freq + count as u16);
        } else if curlen != 0 {
            if curlen != prevlen {
                let freq = bl_tree[curlen as usize].freq();
                bl_tree[curlen as usize].set_freq(freq + 1);
            }
            let freq = bl_tree[REP_3_6].freq();
            bl_tree[REP_3_6].set_freq(freq + 1);
        } else if count <= 10 {
            let freq = bl_tree[REPZ_3_10].freq();
            bl_tree[REPZ_3_10].set_freq(freq + 1);
        } else {
            let freq = bl_tree[REPZ_11_138].freq();
            bl_tree[REPZ_11_138].set_freq(freq + 1);
        }

        count = 0;
        prevlen = curlen;
        if nextlen == 0 {
            max_count = 138;
            min_count = 3;
        } else if curlen == nextlen {
            max_count = 6;
            min_count = 3;
        } else {
            max_count = 7;
            min_count = 4;
        }
    }
}

/// Build an optimal Huffman tree from the symbol frequencies in `desc` and
/// assign canonical codes.
fn build_tree<const N: usize>(
    desc: &mut TreeDesc<N>,
    heap: &mut Heap,
    bl_count: &mut [u16; MAX_BITS + 1],
    opt_len: &mut usize,
    static_len: &mut usize,
) {
    let stree = desc.stat_desc.static_tree;
    let elems = desc.stat_desc.elems;
    let mut max_code: isize = -1;

    heap.heap_len = 0;
    heap.heap_max = HEAP_SIZE;

    for n in 0..elems {
        if desc.dyn_tree[n].freq() != 0 {
            heap.heap_len += 1;
            heap.heap[heap.heap_len] = n as u32;
            max_code = n as isize;
            heap.depth[n] = 0;
        } else {
            desc.dyn_tree[n].set_len(0);
        }
    }

    // the format requires at least one distance code and the block header
    // assumes at least two; force dummy codes with frequency one
    while heap.heap_len < 2 {
        let node = if max_code < 2 {
            max_code += 1;
            max_code as usize
        } else {
            0
        };
        heap.heap_len += 1;
        heap.heap[heap.heap_len] = node as u32;
        desc.dyn_tree[node].set_freq(1);
        heap.depth[node] = 0;
        // the dummy's length bits are added back by gen_bitlen; the counters
        // wrap transiently when the tree was empty, like zlib's ulg math
        *opt_len = opt_len.wrapping_sub(1);
        if !stree.is_empty() {
            *static_len = static_len.wrapping_sub(stree[node].len() as usize);
        }
    }
    desc.max_code = max_code as usize;

    let mut n = heap.heap_len / 2;
    while n >= 1 {
        heap.pqdownheap(&desc.dyn_tree, n);
        n -= 1;
    }

    // repeatedly combine the two least frequent nodes into an internal node
    let mut node = elems;
    loop {
        let n = heap.heap[1] as usize;
        heap.heap[1] = heap.heap[heap.heap_len];
        heap.heap_len -= 1;
        heap.pqdownheap(&desc.dyn_tree, 1);
        let m = heap.heap[1] as usize;

        // keep the removed nodes, sorted, for gen_bitlen
        heap.heap_max -= 1;
        heap.heap[heap.heap_max] = n as u32;
        heap.heap_max -= 1;
        heap.heap[heap.heap_max] = m as u32;

        let freq = desc.dyn_tree[n].freq() + desc.dyn_tree[m].freq();
        desc.dyn_tree[node].set_freq(freq);
        heap.depth[node] = Ord::max(heap.depth[n], heap.depth[m]) + 1;
        desc.dyn_tree[n].set_dad(node as u16);
        desc.dyn_tree[m].set_dad(node as u16);

        heap.heap[1] = node as u32;
        node += 1;
        heap.pqdownheap(&desc.dyn_tree, 1);

        if heap.heap_len < 2 {
            break;
        }
    }

    heap.heap_max -= 1;
    heap.heap[heap.heap_max] = heap.heap[1];

    gen_bitlen(desc, heap, bl_count, opt_len, static_len);
    gen_codes(&mut desc.dyn_tree, desc.max_code, bl_count);
}

/// Compute code lengths for the tree just built, enforcing the 15-bit limit
/// by moving overflowing leaves up.
fn gen_bitlen<const N: usize>(
    desc: &mut TreeDesc<N>,
    heap: &mut Heap,
    bl_count: &mut [u16; MAX_BITS + 1],
    opt_len: &mut usize,
    static_len: &mut usize,
) {
    let max_length = desc.stat_desc.max_length as usize;
    let stree = desc.stat_desc.static_tree;
    let extra = desc.stat_desc.extra_bits;
    let base = desc.stat_desc.extra_base;
    let max_code = desc.max_code;
    let tree = &mut desc.dyn_tree;

    bl_count.fill(0);

    // the root has length zero; lengths propagate down in heap order
    tree[heap.heap[heap.heap_max] as usize].set_len(0);
    let mut overflow = 0i32;

    for h in heap.heap_max + 1..HEAP_SIZE {
        let n = heap.heap[h] as usize;
        let mut bits = tree[tree[n].dad() as usize].len() as usize + 1;
        if bits > max_length {
            bits = max_length;
            overflow += 1;
        }
        tree[n].set_len(bits as u16);

        if n > max_code {
            // internal node, not a symbol
            continue;
        }

        bl_count[bits] += 1;
        let mut xbits = 0;
        if n >= base {
            xbits = extra[n - base] as usize;
        }
        let f = tree[n].freq() as usize;
        *opt_len = opt_len.wrapping_add(f * (bits + xbits));
        if !stree.is_empty() {
            *static_len = static_len.wrapping_add(f * (stree[n].len() as usize + xbits));
        }
    }

    if overflow == 0 {
        return;
    }

    // move leaves from over-long codes to a shorter sibling's subtree
    loop {
        let mut bits = max_length - 1;
        while bl_count[bits] == 0 {
            bits -= 1;
        }
        bl_count[bits] -= 1;
        bl_count[bits + 1] += 2;
        bl_count[max_length] -= 1;

        overflow -= 2;
        if overflow <= 0 {
            break;
        }
    }

    // reassign lengths to symbols in increasing frequency order; the heap
    // region above heap_max holds them sorted
    let mut h = HEAP_SIZE;
    for bits in (1..=max_length).rev() {
        let mut n = bl_count[bits];
        while n != 0 {
            h -= 1;
            let m = heap.heap[h] as usize;
            if m > max_code {
                continue;
            }
            if tree[m].len() as usize != bits {
                let delta = bits as isize - tree[m].len() as isize;
                *opt_len = opt_len.wrapping_add_signed(delta * tree[m].freq() as isize);
                tree[m].set_len(bits as u16);
            }
            n -= 1;
        }
    }
}

/// Assign canonical codes: consecutive values within each bit length, stored
/// bit-reversed for LSB-first emission.
fn gen_codes(tree: &mut [TreeNode], max_code: usize, bl_count: &[u16; MAX_BITS + 1]) {
    let mut next_code = [0u16; MAX_BITS + 1];
    let mut code = 0u16;

    for bits in 1..=MAX_BITS {
        code = (code + bl_count[bits - 1]) << 1;
        next_code[bits] = code;
    }

    for n in 0..=max_code {
        let len = tree[n].len() as usize;
        if len == 0 {
            continue;
        }
        tree[n].set_code(bit_reverse(next_code[len], len));
        next_code[len] += 1;
    }
}

/// A single `deflate` call's view of the stream: the unread input, the
/// unfilled output, and the persistent state.
pub(crate) struct DeflateStream<'a> {
    pub(crate) input: &'a [u8],
    pub(crate) output: &'a mut [u8],
    pub(crate) out_pos: usize,
    pub(crate) state: &'a mut State,
}

impl DeflateStream<'_> {
    pub(crate) fn avail_out(&self) -> usize {
        self.output.len() - self.out_pos
    }
}

/// Copy up to `size` bytes of input into the window at `offset`, folding them
/// into the running checksum.
fn read_buf_window(stream: &mut DeflateStream, offset: usize, size: usize) -> usize {
    let len = Ord::min(stream.input.len(), size);
    if len == 0 {
        return 0;
    }

    let (data, rest) = stream.input.split_at(len);
    stream.state.window.filled_mut()[offset..offset + len].copy_from_slice(data);

    match stream.state.wrap {
        2 => stream.state.crc_fold.fold(data),
        1 => stream.state.adler = adler32(stream.state.adler, data),
        _ => {}
    }

    stream.input = rest;
    stream.state.total_in += len as u64;

    len
}

/// Fill the window with input, sliding it when the scan position gets within
/// a window's worth of the end, and keep the hash chains in sync.
pub(crate) fn fill_window(stream: &mut DeflateStream) {
    debug_assert!(stream.state.lookahead < MIN_LOOKAHEAD);

    loop {
        let state = &mut *stream.state;
        let mut more = state.window_size - state.lookahead - state.strstart;

        if state.strstart >= state.w_size + state.max_dist() {
            let w_size = state.w_size;
            state.window.slide(w_size);
            state.match_start = state.match_start.saturating_sub(w_size);
            state.strstart -= w_size;
            state.block_start -= w_size as isize;
            if state.insert > state.strstart {
                state.insert = state.strstart;
            }
            slide_hash::slide_hash(state);
            more += w_size;
        }

        if stream.input.is_empty() {
            break;
        }

        let offset = stream.state.strstart + stream.state.lookahead;
        let n = read_buf_window(stream, offset, more);
        stream.state.lookahead += n;

        // the insert count tracks strings whose hash could not be computed
        // yet for lack of bytes; catch up now that more input arrived
        let state = &mut *stream.state;
        if state.lookahead + state.insert >= STD_MIN_MATCH {
            let mut string = state.strstart - state.insert;
            let window = state.window.filled();
            state.ins_h = window[string] as u32;
            state.ins_h = hash_calc::update_hash(state, state.ins_h, window[string + 1]);

            while state.insert > 0 {
                hash_calc::insert_string(state, string, 1);
                string += 1;
                state.insert -= 1;
                if state.lookahead + state.insert < STD_MIN_MATCH {
                    break;
                }
            }
        }

        if stream.state.lookahead >= MIN_LOOKAHEAD || stream.input.is_empty() {
            break;
        }
    }
}

/// Copy as much pending output to the caller's buffer as fits.
pub(crate) fn flush_pending(stream: &mut DeflateStream) {
    stream.state.flush_bits();

    let pending = stream.state.pending.pending();
    let len = Ord::min(pending.len(), stream.avail_out());
    if len == 0 {
        return;
    }

    stream.output[stream.out_pos..stream.out_pos + len].copy_from_slice(&pending[..len]);
    stream.out_pos += len;
    stream.state.pending.advance(len);
    stream.state.total_out += len as u64;
}

/// Flush the current block and record the start of the next one.
pub(crate) fn flush_block_only(stream: &mut DeflateStream, is_last: bool) {
    let state = &mut *stream.state;
    let range = if state.block_start >= 0 {
        Some(state.block_start as usize..state.strstart)
    } else {
        None
    };
    state.tr_flush_block(range, is_last);
    state.block_start = state.strstart as isize;
    flush_pending(stream);
}

/// Flushes are ordered by how much they do; a repeated equal-or-weaker flush
/// without new input is a no-op and reports `BufError`.
fn rank_flush(f: i32) -> i32 {
    // Block (5) ranks below SyncFlush (2)
    (f * 2) - if f > 4 { 9 } else { 0 }
}

fn gzip_xfl(state: &State) -> u8 {
    if state.level == 9 {
        2
    } else if state.strategy >= Strategy::HuffmanOnly || state.level < 2 {
        4
    } else {
        0
    }
}

pub(crate) fn deflate(stream: &mut DeflateStream, flush: Flush) -> ReturnCode {
    if stream.avail_out() == 0 {
        stream.state.msg = Some(ReturnCode::BufError.error_message());
        return ReturnCode::BufError;
    }
    if stream.state.status == Status::Finish && flush != Flush::Finish {
        stream.state.msg = Some(ReturnCode::StreamError.error_message());
        return ReturnCode::StreamError;
    }

    let old_flush = stream.state.last_flush;
    stream.state.last_flush = flush as i32;

    // flush as much leftover output as possible
    if !stream.state.pending.pending().is_empty() {
        flush_pending(stream);
        if stream.avail_out() == 0 {
            // the next call is free to have real work to do
            stream.state.last_flush = -1;
            return ReturnCode::Ok;
        }
    } else if stream.input.is_empty()
        && rank_flush(flush as i32) <= rank_flush(old_flush)
        && flush != Flush::Finish
    {
        stream.state.msg = Some(ReturnCode::BufError.error_message());
        return ReturnCode::BufError;
    }

    if stream.state.status == Status::Finish && !stream.input.is_empty() {
        stream.state.msg = Some(ReturnCode::BufError.error_message());
        return ReturnCode::BufError;
    }

    if stream.state.status == Status::Init && stream.state.wrap == 0 {
        stream.state.status = Status::Busy;
    }

    // zlib header
    if stream.state.status == Status::Init {
        let state = &mut *stream.state;
        let mut header = ((Method::Deflated as u16) + ((state.w_bits as u16 - 8) << 4)) << 8;

        let level_flags: u16 = if state.strategy >= Strategy::HuffmanOnly || state.level < 2 {
            0
        } else if state.level < 6 {
            1
        } else if state.level == 6 {
            2
        } else {
            3
        };
        header |= level_flags << 6;
        if state.strstart != 0 {
            // preset dictionary
            header |= 0x20;
        }
        header += 31 - (header % 31);

        state.pending.extend(&header.to_be_bytes());

        // dictionary id
        if state.strstart != 0 {
            let adler = state.adler;
            state.pending.extend(&adler.to_be_bytes());
        }
        state.adler = ADLER32_INITIAL_VALUE;
        state.status = Status::Busy;

        flush_pending(stream);
        if !stream.state.pending.pending().is_empty() {
            stream.state.last_flush = -1;
            return ReturnCode::Ok;
        }
    }

    // gzip header
    if stream.state.status == Status::GZip {
        let state = &mut *stream.state;
        state.crc_fold = Crc32Fold::new();
        state.adler = CRC32_INITIAL_VALUE;

        state.pending.extend(&[0x1f, 0x8b, 8]);

        match &state.gzhead {
            None => {
                let xfl = gzip_xfl(state);
                state
                    .pending
                    .extend(&[0, 0, 0, 0, 0, xfl, crate::gz::OS_CODE]);
                state.status = Status::Busy;

                flush_pending(stream);
                if !stream.state.pending.pending().is_empty() {
                    stream.state.last_flush = -1;
                    return ReturnCode::Ok;
                }
            }
            Some(head) => {
                let flags = head.flags();
                let time = head.time.to_le_bytes();
                let xfl = gzip_xfl(state);
                let os = head.os;
                let extra_len = head.extra.as_ref().map(|extra| extra.len() as u16);

                state.pending.extend(&[flags]);
                state.pending.extend(&time);
                state.pending.extend(&[xfl, os]);
                if let Some(extra_len) = extra_len {
                    state.pending.extend(&extra_len.to_le_bytes());
                }

                if head.hcrc {
                    let crc = crc32(state.adler, state.pending.pending());
                    state.adler = crc;
                }

                state.gzindex = 0;
                state.status = Status::Extra;
            }
        }
    }

    if stream.state.status == Status::Extra {
        let extra = stream.state.gzhead.as_ref().and_then(|h| h.extra.clone());
        if let Some(extra) = extra {
            if let Some(rc) = flush_gz_section(stream, &extra) {
                return rc;
            }
        }
        stream.state.status = Status::Name;
    }

    if stream.state.status == Status::Name {
        let name = stream.state.gzhead.as_ref().and_then(|h| h.name.clone());
        if let Some(mut name) = name {
            name.push(0);
            if let Some(rc) = flush_gz_section(stream, &name) {
                return rc;
            }
        }
        stream.state.status = Status::Comment;
    }

    if stream.state.status == Status::Comment {
        let comment = stream.state.gzhead.as_ref().and_then(|h| h.comment.clone());
        if let Some(mut comment) = comment {
            comment.push(0);
            if let Some(rc) = flush_gz_section(stream, &comment) {
                return rc;
            }
        }
        stream.state.status = Status::Hcrc;
    }

    if stream.state.status == Status::Hcrc {
        let hcrc = stream.state.gzhead.as_ref().is_some_and(|h| h.hcrc);
        if hcrc {
            if stream.state.pending.remaining() < 2 {
                flush_pending(stream);
                if !stream.state.pending.pending().is_empty() {
                    stream.state.last_flush = -1;
                    return ReturnCode::Ok;
                }
            }
            let state = &mut *stream.state;
            let crc = (state.adler & 0xffff) as u16;
            state.pending.extend(&crc.to_le_bytes());
            state.adler = CRC32_INITIAL_VALUE;
        }
        stream.state.status = Status::Busy;

        flush_pending(stream);
        if !stream.state.pending.pending().is_empty() {
            stream.state.last_flush = -1;
            return ReturnCode::Ok;
        }
    }

    // compress
    if !stream.input.is_empty()
        || stream.state.lookahead != 0
        || (flush != Flush::NoFlush && stream.state.status != Status::Finish)
    {
        let bstate = algorithm::run(stream, flush);

        if matches!(bstate, BlockState::FinishStarted | BlockState::FinishDone) {
            stream.state.status = Status::Finish;
        }

        match bstate {
            BlockState::NeedMore | BlockState::FinishStarted => {
                if stream.avail_out() == 0 {
                    stream.state.last_flush = -1;
                }
                // with avail_out > 0 the stream is simply waiting for more
                // input; the next call will not report BufError twice thanks
                // to last_flush
                return ReturnCode::Ok;
            }
            BlockState::BlockDone => {
                let state = &mut *stream.state;
                if flush == Flush::PartialFlush {
                    state.tr_align();
                } else if flush != Flush::Block {
                    // an empty stored block realigns and fully flushes
                    state.tr_stored_block(0..0, false);

                    if flush == Flush::FullFlush {
                        state.head.fill(NIL);
                        if state.lookahead == 0 {
                            state.strstart = 0;
                            state.block_start = 0;
                            state.insert = 0;
                        }
                    }
                }

                flush_pending(stream);
                if stream.avail_out() == 0 {
                    stream.state.last_flush = -1;
                    return ReturnCode::Ok;
                }
            }
            BlockState::FinishDone => { /* fall through to the trailer */ }
        }
    }

    if flush != Flush::Finish {
        return ReturnCode::Ok;
    }
    if stream.state.wrap <= 0 {
        return ReturnCode::StreamEnd;
    }

    // write the trailer, only once
    {
        let state = &mut *stream.state;
        if state.wrap == 2 {
            let crc = state.crc_fold.finish();
            state.pending.extend(&crc.to_le_bytes());
            state.pending.extend(&(state.total_in as u32).to_le_bytes());
        } else {
            let adler = state.adler;
            state.pending.extend(&adler.to_be_bytes());
        }
        state.wrap = -state.wrap;
    }

    flush_pending(stream);
    if stream.state.pending.pending().is_empty() {
        ReturnCode::StreamEnd
    } else {
        ReturnCode::Ok
    }
}

/// Write one (sub)field of the gzip header, suspending when the output fills
/// up; `gzindex` remembers the position within the field across calls.
fn flush_gz_section(stream: &mut DeflateStream, bytes: &[u8]) -> Option<ReturnCode> {
    let hcrc = stream.state.gzhead.as_ref().is_some_and(|h| h.hcrc);

    loop {
        {
            let state = &mut *stream.state;
            let take = Ord::min(bytes.len() - state.gzindex, state.pending.remaining());
            let chunk = &bytes[state.gzindex..state.gzindex + take];
            state.pending.extend(chunk);
            if hcrc && !chunk.is_empty() {
                state.adler = crc32(state.adler, chunk);
            }
            state.gzindex += take;
            if state.gzindex == bytes.len() {
                state.gzindex = 0;
                return None;
            }
        }

        flush_pending(stream);
        if !stream.state.pending.pending().is_empty() {
            stream.state.last_flush = -1;
            return Some(ReturnCode::Ok);
        }
    }
}

/// An ongoing compression stream.
///
/// Feed it input and receive output through [`deflate`](Self::deflate); the
/// caller owns both buffers.
pub struct Deflate {
    state: State,
}

impl Deflate {
    pub fn new(config: DeflateConfig) -> Result<Self, Error> {
        let DeflateConfig {
            mut level,
            method,
            mut window_bits,
            mem_level,
            strategy,
        } = config;

        if level == crate::Z_DEFAULT_COMPRESSION {
            level = 6;
        }

        let wrap = if window_bits < 0 {
            // raw deflate, no header or trailer
            window_bits = -window_bits;
            0
        } else if window_bits > crate::MAX_WBITS {
            // gzip framing
            window_bits -= 16;
            2
        } else {
            1
        };

        if !(1..=9).contains(&mem_level)
            || method != Method::Deflated
            || !(crate::MIN_WBITS..=crate::MAX_WBITS).contains(&window_bits)
            || !(0..=9).contains(&level)
            || (window_bits == 8 && wrap != 1)
        {
            return Err(Error::Stream(ReturnCode::StreamError.error_message()));
        }

        // 256-byte windows round up; the zlib format cannot express them
        if window_bits == 8 {
            window_bits = 9;
        }

        let mut state = State::new(level as i8, window_bits as u8, mem_level, strategy, wrap);
        state.reset_keep();
        state.lm_init();

        Ok(Self { state })
    }

    /// Compress from `input` into `output`, consuming and producing as much
    /// as the buffers allow.
    pub fn deflate(&mut self, input: &[u8], output: &mut [u8], flush: Flush) -> Progress {
        let mut stream = DeflateStream {
            input,
            output,
            out_pos: 0,
            state: &mut self.state,
        };

        let status = deflate(&mut stream, flush);

        Progress {
            consumed: input.len() - stream.input.len(),
            written: stream.out_pos,
            status,
        }
    }

    /// Prime the window (and for zlib streams, the header) with a preset
    /// dictionary. Must be called before the first [`deflate`](Self::deflate).
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<(), Error> {
        let state = &mut self.state;
        let wrap = state.wrap;

        if wrap == 2 || (wrap == 1 && state.status != Status::Init) || state.lookahead != 0 {
            return Err(Error::Stream(ReturnCode::StreamError.error_message()));
        }

        // the zlib header carries the dictionary id
        if wrap == 1 {
            state.adler = adler32(state.adler, dictionary);
        }

        // skip checksumming the dictionary bytes in read_buf_window
        state.wrap = 0;

        let mut dictionary = dictionary;
        if dictionary.len() >= state.w_size {
            if wrap == 0 {
                state.head.fill(NIL);
                state.strstart = 0;
                state.block_start = 0;
                state.insert = 0;
            }
            // use only the tail
            dictionary = &dictionary[dictionary.len() - state.w_size..];
        }

        let mut stream = DeflateStream {
            input: dictionary,
            output: &mut [],
            out_pos: 0,
            state,
        };

        fill_window(&mut stream);
        while stream.state.lookahead >= STD_MIN_MATCH {
            let string = stream.state.strstart;
            let count = stream.state.lookahead - (STD_MIN_MATCH - 1);
            hash_calc::insert_string(stream.state, string, count);
            stream.state.strstart += count;
            stream.state.lookahead = STD_MIN_MATCH - 1;
            fill_window(&mut stream);
        }

        let state = &mut self.state;
        state.strstart += state.lookahead;
        state.block_start = state.strstart as isize;
        state.insert = state.lookahead;
        state.lookahead = 0;
        state.match_length = STD_MIN_MATCH - 1;
        state.prev_length = STD_MIN_MATCH - 1;
        state.match_available = false;
        state.wrap = wrap;

        Ok(())
    }

    /// Describe the gzip header to emit. Only valid for gzip streams, before
    /// any output was produced.
    pub fn set_header(&mut self, header: GzHeader) -> Result<(), Error> {
        if self.state.wrap != 2 || self.state.status != Status::GZip {
            return Err(Error::Stream(ReturnCode::StreamError.error_message()));
        }
        self.state.gzhead = Some(header);
        Ok(())
    }

    /// Change the compression level and strategy mid-stream.
    ///
    /// All buffered symbols and pending output must have been flushed (for
    /// instance with [`Flush::Block`]); otherwise `Error::Buf` is returned
    /// and nothing changes.
    pub fn params(&mut self, level: i32, strategy: Strategy) -> Result<(), Error> {
        let level = if level == crate::Z_DEFAULT_COMPRESSION {
            6
        } else {
            level
        };
        if !(0..=9).contains(&level) {
            return Err(Error::Stream(ReturnCode::StreamError.error_message()));
        }

        let state = &mut self.state;
        let func = CONFIGURATION_TABLE[state.level as usize].func;

        if (strategy != state.strategy || func != CONFIGURATION_TABLE[level as usize].func)
            && state.last_flush != -2
            && (!state.sym_buf.is_empty()
                || !state.pending.pending().is_empty()
                || state.lookahead != 0)
        {
            return Err(Error::Buf);
        }

        if state.level as i32 != level {
            if state.level == 0 && level != 0 {
                // the hash chains were not maintained while storing
                state.head.fill(NIL);
                state.insert = Ord::min(state.strstart, STD_MIN_MATCH - 1);
            }
            state.level = level as i8;

            let config = &CONFIGURATION_TABLE[level as usize];
            state.max_lazy_match = config.max_lazy as usize;
            state.good_match = config.good_length as usize;
            state.nice_match = config.nice_length as usize;
            state.max_chain_length = config.max_chain as usize;
        }
        state.strategy = strategy;

        Ok(())
    }

    /// Override the match-finder limits of the current compression level.
    pub fn tune(&mut self, good_length: usize, max_lazy: usize, nice_length: usize, max_chain: usize) {
        self.state.good_match = good_length;
        self.state.max_lazy_match = max_lazy;
        self.state.nice_match = nice_length;
        self.state.max_chain_length = max_chain;
    }

    /// Reset the stream for a new compression with the same configuration.
    pub fn reset(&mut self) {
        self.state.reset_keep();
        self.state.lm_init();
    }

    /// An upper bound on the compressed size of `source_len` input bytes for
    /// this stream's configuration.
    pub fn bound(&self, source_len: usize) -> usize {
        let state = &self.state;

        let wrap_len = match state.wrap.unsigned_abs() {
            0 => 0,
            2 => {
                let mut n = 18;
                if let Some(head) = &state.gzhead {
                    if let Some(extra) = &head.extra {
                        n += 2 + extra.len();
                    }
                    if let Some(name) = &head.name {
                        n += name.len() + 1;
                    }
                    if let Some(comment) = &head.comment {
                        n += comment.len() + 1;
                    }
                    if head.hcrc {
                        n += 2;
                    }
                }
                n
            }
            // zlib header and trailer, plus the dictionary id when set
            _ => 6 + if state.strstart != 0 { 4 } else { 0 },
        };

        bound_help(source_len) + wrap_len
    }

    pub fn total_in(&self) -> u64 {
        self.state.total_in
    }

    pub fn total_out(&self) -> u64 {
        self.state.total_out
    }

    pub fn data_type(&self) -> DataType {
        self.state.data_type
    }

    /// The last error message, if any; mirrors the zlib `msg` field.
    pub fn msg(&self) -> Option<&'static str> {
        self.state.msg
    }
}

impl std::fmt::Debug for Deflate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deflate")
            .field("level", &self.state.level)
            .field("wrap", &self.state.wrap)
            .field("total_in", &self.state.total_in)
            .field("total_out", &self.state.total_out)
            .finish_non_exhaustive()
    }
}

/// Worst case is a run of stored blocks: 5 bytes of overhead per block, plus
/// slack for the final alignment.
fn bound_help(source_len: usize) -> usize {
    source_len + (source_len >> 12) + (source_len >> 14) + (source_len >> 25) + 7
}

/// An upper bound on `compress_slice` output size for a zlib-wrapped stream
/// at any compression level.
pub const fn compress_bound(source_len: usize) -> usize {
    source_len + (source_len >> 12) + (source_len >> 14) + (source_len >> 25) + 7 + 6
}

/// Compress `input` into `output` in a single call, returning the written
/// prefix of `output`.
pub fn compress_slice<'a>(
    output: &'a mut [u8],
    input: &[u8],
    config: DeflateConfig,
) -> (&'a mut [u8], ReturnCode) {
    let mut deflate = match Deflate::new(config) {
        Ok(deflate) => deflate,
        Err(_) => return (&mut [], ReturnCode::StreamError),
    };

    let mut in_pos = 0;
    let mut out_pos = 0;

    loop {
        let progress = deflate.deflate(&input[in_pos..], &mut output[out_pos..], Flush::Finish);
        in_pos += progress.consumed;
        out_pos += progress.written;

        match progress.status {
            ReturnCode::Ok => {
                if progress.written == 0 && progress.consumed == 0 {
                    // no room left in the output
                    return (&mut output[..out_pos], ReturnCode::BufError);
                }
            }
            ReturnCode::StreamEnd => return (&mut output[..out_pos], ReturnCode::StreamEnd),
            code => return (&mut output[..out_pos], code),
        }
    }
}

/// Compress `input` into a freshly allocated `Vec`.
pub fn compress_to_vec(input: &[u8], config: DeflateConfig) -> Result<Vec<u8>, Error> {
    let deflate = Deflate::new(config)?;
    let mut output = vec![0; deflate.bound(input.len())];
    drop(deflate);

    let (prefix, code) = compress_slice(&mut output, input, config);
    match code {
        ReturnCode::StreamEnd => {
            let len = prefix.len();
            output.truncate(len);
            Ok(output)
        }
        code => Err(Error::from_return_code(code, None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deflate_all(input: &[u8], config: DeflateConfig) -> Vec<u8> {
        compress_to_vec(input, config).unwrap()
    }

    /// Parse a zlib stream produced at level 0 (stored blocks only) by hand.
    fn parse_stored_zlib(data: &[u8]) -> (Vec<u8>, u32) {
        // 2-byte zlib header; CM/CINFO then FLG with a valid check value
        assert_eq!(data[0] & 0x0f, 8);
        assert_eq!((u16::from_be_bytes([data[0], data[1]])) % 31, 0);

        let mut pos = 2;
        let mut out = Vec::new();
        loop {
            let bfinal = data[pos] & 1;
            let btype = (data[pos] >> 1) & 3;
            assert_eq!(btype, 0, "level 0 must emit stored blocks");
            pos += 1;

            let len = u16::from_le_bytes([data[pos], data[pos + 1]]) as usize;
            let nlen = u16::from_le_bytes([data[pos + 2], data[pos + 3]]);
            assert_eq!(!(len as u16), nlen);
            pos += 4;

            out.extend_from_slice(&data[pos..pos + len]);
            pos += len;

            if bfinal == 1 {
                break;
            }
        }

        let adler = u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]);
        (out, adler)
    }

    #[test]
    fn zlib_header_default_config() {
        let out = deflate_all(b"hello world", DeflateConfig::default());
        // CMF 0x78: deflate, 32K window; FLG 0x9c: level 2 (default), no dict
        assert_eq!(out[0], 0x78);
        assert_eq!(out[1], 0x9c);
    }

    #[test]
    fn gzip_header_default_config() {
        let config = DeflateConfig {
            window_bits: 15 + 16,
            ..Default::default()
        };
        let out = deflate_all(b"hello world", config);
        assert_eq!(&out[..4], &[0x1f, 0x8b, 8, 0]);
        // mtime zero, default xfl, unix os
        assert_eq!(&out[4..10], &[0, 0, 0, 0, 0, crate::gz::OS_CODE]);

        // crc and input size trailer
        let n = out.len();
        let crc = u32::from_le_bytes(out[n - 8..n - 4].try_into().unwrap());
        let isize = u32::from_le_bytes(out[n - 4..].try_into().unwrap());
        assert_eq!(crc, crc32(0, b"hello world"));
        assert_eq!(isize, 11);
    }

    #[test]
    fn raw_deflate_has_no_wrapper() {
        let config = DeflateConfig {
            level: 0,
            window_bits: -15,
            ..Default::default()
        };
        let out = deflate_all(b"abc", config);
        // stored block: header byte, LEN, NLEN, payload
        assert_eq!(out[0], 1);
        assert_eq!(&out[1..5], &[3, 0, 0xfc, 0xff]);
        assert_eq!(&out[5..], b"abc");
    }

    #[test]
    fn stored_roundtrip_with_checksum() {
        let input: Vec<u8> = (0..70000u32).map(|x| (x * 7) as u8).collect();
        let out = deflate_all(&input, DeflateConfig::new(0));

        let (decoded, adler) = parse_stored_zlib(&out);
        assert_eq!(decoded, input);
        assert_eq!(adler, crate::adler32(1, &input));
    }

    #[test]
    fn empty_input_roundtrip() {
        let out = deflate_all(&[], DeflateConfig::new(0));
        let (decoded, adler) = parse_stored_zlib(&out);
        assert!(decoded.is_empty());
        assert_eq!(adler, 1);
    }

    #[test]
    fn bound_is_sufficient_for_incompressible_data() {
        // pseudo-random bytes do not compress; the bound must still hold
        let mut state = 0x12345678u32;
        let input: Vec<u8> = (0..100_000)
            .map(|_| {
                state = state.wrapping_mul(1664525).wrapping_add(1013904223);
                (state >> 24) as u8
            })
            .collect();

        for level in [0, 1, 6, 9] {
            let config = DeflateConfig::new(level);
            let deflate = Deflate::new(config).unwrap();
            let bound = deflate.bound(input.len());
            drop(deflate);

            let out = deflate_all(&input, config);
            assert!(
                out.len() <= bound,
                "level {level}: {} > bound {bound}",
                out.len()
            );
        }
    }

    #[test]
    fn finish_with_tiny_output_buffers() {
        // drive the stream with a 1-byte output buffer; it must still
        // terminate and produce a valid stored stream
        let input = b"to be or not to be, that is the question";
        let mut deflate = Deflate::new(DeflateConfig::new(0)).unwrap();

        let mut out = Vec::new();
        let mut in_pos = 0;
        loop {
            let mut buf = [0u8; 1];
            let progress = deflate.deflate(&input[in_pos..], &mut buf, Flush::Finish);
            in_pos += progress.consumed;
            out.extend_from_slice(&buf[..progress.written]);
            match progress.status {
                ReturnCode::Ok => {}
                ReturnCode::StreamEnd => break,
                code => panic!("unexpected status {code:?}"),
            }
        }

        let (decoded, _) = parse_stored_zlib(&out);
        assert_eq!(decoded, input);
    }

    #[test]
    fn sync_flush_produces_empty_stored_block() {
        let mut deflate = Deflate::new(DeflateConfig::new(6)).unwrap();
        let mut out = vec![0u8; 128];

        let progress = deflate.deflate(b"abcabcabc", &mut out, Flush::SyncFlush);
        assert_eq!(progress.status, ReturnCode::Ok);
        // a sync flush ends with the empty stored block marker
        assert!(progress.written >= 4);
        assert_eq!(
            &out[progress.written - 4..progress.written],
            &[0x00, 0x00, 0xff, 0xff]
        );
    }

    #[test]
    fn invalid_config_is_rejected() {
        for config in [
            DeflateConfig {
                level: 10,
                ..Default::default()
            },
            DeflateConfig {
                window_bits: 16,
                ..Default::default()
            },
            DeflateConfig {
                mem_level: 0,
                ..Default::default()
            },
            DeflateConfig {
                mem_level: 10,
                ..Default::default()
            },
        ] {
            assert!(Deflate::new(config).is_err(), "{config:?}");
        }
    }

    #[test]
    fn repeated_flush_without_input_is_buf_error() {
        let mut deflate = Deflate::new(DeflateConfig::new(6)).unwrap();
        let mut out = vec![0u8; 128];

        let progress = deflate.deflate(b"data", &mut out, Flush::SyncFlush);
        assert_eq!(progress.status, ReturnCode::Ok);

        let progress = deflate.deflate(&[], &mut out, Flush::SyncFlush);
        assert_eq!(progress.status, ReturnCode::BufError);
    }

    #[test]
    fn set_dictionary_marks_zlib_header() {
        let dictionary = b"sample dictionary content";
        let mut deflate = Deflate::new(DeflateConfig::new(6)).unwrap();
        deflate.set_dictionary(dictionary).unwrap();

        let mut out = vec![0u8; 256];
        let progress = deflate.deflate(b"sample dictionary", &mut out, Flush::Finish);
        assert_eq!(progress.status, ReturnCode::StreamEnd);

        // FDICT bit set, followed by the dictionary's adler32
        assert_ne!(out[1] & 0x20, 0);
        let dictid = u32::from_be_bytes(out[2..6].try_into().unwrap());
        assert_eq!(dictid, crate::adler32(1, dictionary));
    }

    #[test]
    fn set_dictionary_after_deflate_fails() {
        let mut deflate = Deflate::new(DeflateConfig::new(6)).unwrap();
        let mut out = vec![0u8; 64];
        deflate.deflate(b"abc", &mut out, Flush::NoFlush);
        assert!(deflate.set_dictionary(b"dictionary").is_err());
    }

    #[test]
    fn reset_allows_reuse() {
        let mut deflate = Deflate::new(DeflateConfig::new(0)).unwrap();
        let mut out = vec![0u8; 128];

        let first = deflate.deflate(b"first", &mut out, Flush::Finish);
        assert_eq!(first.status, ReturnCode::StreamEnd);
        let first_out = out[..first.written].to_vec();

        deflate.reset();
        let second = deflate.deflate(b"first", &mut out, Flush::Finish);
        assert_eq!(second.status, ReturnCode::StreamEnd);
        assert_eq!(&out[..second.written], &first_out[..]);
    }

    #[test]
    fn all_levels_and_strategies_produce_output() {
        let input: Vec<u8> = b"abcabcabcabc".repeat(100);

        for level in 0..=9 {
            for strategy in [
                Strategy::Default,
                Strategy::Filtered,
                Strategy::HuffmanOnly,
                Strategy::Rle,
                Strategy::Fixed,
            ] {
                let config = DeflateConfig {
                    level,
                    strategy,
                    ..Default::default()
                };
                let out = deflate_all(&input, config);
                assert!(out.len() > 6, "level {level}, {strategy:?}");
            }
        }
    }

    #[test]
    fn gzip_header_fields_are_emitted() {
        let config = DeflateConfig {
            window_bits: 15 + 16,
            ..Default::default()
        };
        let mut deflate = Deflate::new(config).unwrap();
        deflate
            .set_header(GzHeader {
                text: true,
                time: 1234567,
                os: 3,
                extra: Some(vec![1, 2, 3, 4]),
                name: Some(b"file.txt".to_vec()),
                comment: Some(b"a comment".to_vec()),
                hcrc: true,
                ..Default::default()
            })
            .unwrap();

        let mut out = vec![0u8; 512];
        let progress = deflate.deflate(b"payload", &mut out, Flush::Finish);
        assert_eq!(progress.status, ReturnCode::StreamEnd);
        let out = &out[..progress.written];

        assert_eq!(&out[..3], &[0x1f, 0x8b, 8]);
        // FLG: text | hcrc | extra | name | comment
        assert_eq!(out[3], 1 | 2 | 4 | 8 | 16);
        assert_eq!(u32::from_le_bytes(out[4..8].try_into().unwrap()), 1234567);
        // XLEN and the extra bytes
        assert_eq!(&out[10..12], &[4, 0]);
        assert_eq!(&out[12..16], &[1, 2, 3, 4]);
        // zero-terminated name and comment
        assert_eq!(&out[16..25], b"file.txt\0");
        assert_eq!(&out[25..35], b"a comment\0");
        // header crc over everything before it
        let hcrc = u16::from_le_bytes(out[35..37].try_into().unwrap());
        assert_eq!(hcrc, (crc32(0, &out[..35]) & 0xffff) as u16);
    }

    #[test]
    fn skewed_frequencies_stay_within_length_limit() {
        // Fibonacci frequencies give the deepest possible unconstrained
        // Huffman tree; 18 symbols would need a depth-17 code without the
        // length limit.
        let mut desc = TreeDesc::<HEAP_SIZE>::new(&STATIC_L_DESC);
        let (mut a, mut b) = (1u16, 1u16);
        for n in 0..18 {
            desc.dyn_tree[n].set_freq(a);
            (a, b) = (b, a + b);
        }

        let mut heap = Heap::new();
        let mut bl_count = [0u16; MAX_BITS + 1];
        let (mut opt_len, mut static_len) = (0, 0);
        build_tree(
            &mut desc,
            &mut heap,
            &mut bl_count,
            &mut opt_len,
            &mut static_len,
        );

        assert_eq!(desc.max_code, 17);
        for node in &desc.dyn_tree[..18] {
            let len = node.len() as usize;
            assert!(len >= 1 && len <= MAX_BITS);
        }

        // the redistributed lengths still form a complete prefix code
        let kraft: u32 = bl_count
            .iter()
            .enumerate()
            .skip(1)
            .map(|(bits, &count)| (count as u32) << (MAX_BITS - bits))
            .sum();
        assert_eq!(kraft, 1 << MAX_BITS);
    }
}
