//! Decompression of DEFLATE streams (RFC 1951), optionally framed by a zlib
//! (RFC 1950) or gzip (RFC 1952) wrapper.
//!
//! The decoder is a resumable state machine: [`Inflate::inflate`] consumes as
//! much input and produces as much output as the provided buffers allow, then
//! suspends, remembering its exact position (down to the bit) for the next
//! call.

use crate::adler32;
use crate::crc32::{crc32, Crc32Fold};
use crate::gz::GzHeader;
use crate::{
    Code, Error, InflateFlush, Progress, ReturnCode, ADLER32_INITIAL_VALUE, CRC32_INITIAL_VALUE,
    DEF_WBITS, ENOUGH_DISTS, ENOUGH_LENS, MAX_WBITS, MIN_WBITS,
};

mod bitreader;
mod inffixed;
mod inftrees;
mod window;
mod writer;

use bitreader::BitReader;
use inffixed::fixed_tables;
use inftrees::{inflate_table, CodeType, InflateTable};
use window::Window;
use writer::Writer;

const Z_DEFLATED: u64 = 8;

const MAX_BITS: u8 = 15;

/// When false, the distance-vs-dmax check of a strict RFC 1950 reading is
/// skipped, matching default zlib builds.
const INFLATE_STRICT: bool = false;

/// Bound on the collected gzip header `extra`/`name`/`comment` fields, so a
/// hostile header cannot balloon memory.
const GZ_HEADER_FIELD_MAX: usize = 65536;

// the fast decode loop requires this much input and output headroom
const INFLATE_FAST_MIN_HAVE: usize = 15;
const INFLATE_FAST_MIN_LEFT: usize = 260;

/// swaps endianness
const fn zswap32(q: u32) -> u32 {
    q.swap_bytes()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Mode {
    #[default]
    Head,
    Flags,
    Time,
    Os,
    ExLen,
    Extra,
    Name,
    Comment,
    HCrc,
    DictId,
    Dict,
    Type,
    TypeDo,
    Stored,
    CopyBlock,
    Table,
    LenLens,
    CodeLens,
    Len_,
    Len,
    Lit,
    LenExt,
    Dist,
    DistExt,
    Match,
    Check,
    Length,
    Done,
    Sync,
    Bad,
}

#[derive(Debug, Clone, Copy, Default)]
enum Codes {
    #[default]
    Fixed,
    Codes,
    Len,
    Dist,
}

/// Which decode table is active, and how many bits its root resolves.
#[derive(Debug, Clone, Copy, Default)]
struct Table {
    codes: Codes,
    bits: usize,
}

pub(crate) struct State {
    mode: Mode,

    /// true if the current block is the last block
    last: bool,
    /// dictionary provided (if one was demanded)
    have_dict: bool,

    /// bit 0 accepts zlib, bit 1 accepts gzip, bit 2 computes the check value
    wrap: u8,
    /// log base 2 of the window size, 0 until a header determines it
    wbits: u8,
    flush: InflateFlush,

    /// bit accumulator contents, persisted between calls
    hold: u64,
    bits: u8,

    window: Window,

    /// -1 before any header, 0 for a zlib header, FLG byte for a gzip header
    gzip_flags: i32,
    checksum: u32,
    crc_fold: Crc32Fold,
    /// zlib header maximum distance, for strict checking
    dmax: usize,

    /// collected gzip header, if the caller requested one
    head: Option<GzHeader>,
    head_done: bool,

    // dynamic table building
    ncode: usize,
    nlen: usize,
    ndist: usize,
    have: usize,
    lens: [u16; 320],
    work: [u16; 288],

    len_table: Table,
    dist_table: Table,
    codes_codes: [Code; ENOUGH_LENS],
    len_codes: [Code; ENOUGH_LENS],
    dist_codes: [Code; ENOUGH_DISTS],

    /// literal or length of the match to copy
    length: usize,
    /// distance back of the match to copy
    offset: usize,
    /// number of extra bits needed
    extra: usize,
    /// bits back of the last decoded length/distance pair, or `usize::MAX`
    /// after an end-of-block
    back: usize,
    /// initial length of the match
    was: usize,

    /// output byte count, for the gzip ISIZE check
    total: usize,
    total_in: u64,
    total_out: u64,

    msg: Option<&'static str>,
}

impl State {
    fn new() -> Self {
        Self {
            mode: Mode::Head,
            last: false,
            have_dict: false,
            wrap: 0,
            wbits: 0,
            flush: InflateFlush::NoFlush,
            hold: 0,
            bits: 0,
            window: Window::empty(),
            gzip_flags: -1,
            checksum: ADLER32_INITIAL_VALUE,
            crc_fold: Crc32Fold::new(),
            dmax: 32768,
            head: None,
            head_done: false,
            ncode: 0,
            nlen: 0,
            ndist: 0,
            have: 0,
            lens: [0; 320],
            work: [0; 288],
            len_table: Table::default(),
            dist_table: Table::default(),
            codes_codes: [Code::default(); ENOUGH_LENS],
            len_codes: [Code::default(); ENOUGH_LENS],
            dist_codes: [Code::default(); ENOUGH_DISTS],
            length: 0,
            offset: 0,
            extra: 0,
            back: usize::MAX,
            was: 0,
            total: 0,
            total_in: 0,
            total_out: 0,
            msg: None,
        }
    }
}

/// Per-call carrier: the persistent [`State`] plus this call's input and
/// output cursors. All decode steps run as methods on this so that a
/// suspension can happen anywhere in the mode chain.
struct Stream<'a> {
    bit_reader: BitReader<'a>,
    writer: Writer<'a>,
    state: &'a mut State,
    /// output bytes already folded into the running checksum this call
    folded: usize,
    /// output bytes already added to `state.total` this call
    counted: usize,
}

macro_rules! pull_byte {
    ($self:expr) => {
        match $self.bit_reader.pull_byte() {
            Err(return_code) => return $self.inflate_leave(return_code),
            Ok(_) => (),
        }
    };
}

macro_rules! need_bits {
    ($self:expr, $n:expr) => {
        match $self.bit_reader.need_bits($n) {
            Err(return_code) => return $self.inflate_leave(return_code),
            Ok(v) => v,
        }
    };
}

impl<'a> Stream<'a> {
    fn dispatch(&mut self) -> ReturnCode {
        match self.state.mode {
            Mode::Head => self.head(),
            Mode::Flags => self.flags(),
            Mode::Time => self.time(),
            Mode::Os => self.os(),
            Mode::ExLen => self.ex_len(),
            Mode::Extra => self.extra(),
            Mode::Name => self.name(),
            Mode::Comment => self.comment(),
            Mode::HCrc => self.hcrc(),
            Mode::DictId => self.dict_id(),
            Mode::Dict => self.dict(),
            Mode::Type => self.type_(),
            Mode::TypeDo => self.type_do(),
            Mode::Stored => self.stored(),
            Mode::CopyBlock => self.copy_block(),
            Mode::Table => self.table(),
            Mode::LenLens => self.len_lens(),
            Mode::CodeLens => self.code_lens(),
            Mode::Len_ => self.len_(),
            Mode::Len => self.len(),
            Mode::Lit => self.lit(),
            Mode::LenExt => self.len_ext(),
            Mode::Dist => self.dist(),
            Mode::DistExt => self.dist_ext(),
            Mode::Match => self.match_(),
            Mode::Check => self.check(),
            Mode::Length => self.length(),
            Mode::Done => self.inflate_leave(ReturnCode::StreamEnd),
            Mode::Sync => self.inflate_leave(ReturnCode::StreamError),
            Mode::Bad => self.inflate_leave(ReturnCode::DataError),
        }
    }

    // NOTE: it is crucial for the bookkeeping in `inflate` that this is the
    // only route out of the mode chain
    fn inflate_leave(&mut self, return_code: ReturnCode) -> ReturnCode {
        return_code
    }

    fn bad(&mut self, msg: &'static str) -> ReturnCode {
        self.state.msg = Some(msg);
        self.inflate_leave(ReturnCode::DataError)
    }

    fn len_table_get(&self, index: usize) -> Code {
        match self.state.len_table.codes {
            Codes::Fixed => fixed_tables().lenfix[index],
            Codes::Codes => self.state.codes_codes[index],
            Codes::Len => self.state.len_codes[index],
            Codes::Dist => self.state.dist_codes[index],
        }
    }

    fn dist_table_get(&self, index: usize) -> Code {
        match self.state.dist_table.codes {
            Codes::Fixed => fixed_tables().distfix[index],
            Codes::Codes => self.state.codes_codes[index],
            Codes::Len => self.state.len_codes[index],
            Codes::Dist => self.state.dist_codes[index],
        }
    }

    /// Fold output produced since the last fold into the running check value.
    fn fold_output(&mut self) {
        if self.state.wrap & 4 != 0 {
            let fresh = &self.writer.filled()[self.folded..];
            if !fresh.is_empty() {
                if self.state.gzip_flags > 0 {
                    self.state.crc_fold.fold(fresh);
                } else if self.state.gzip_flags == 0 {
                    self.state.checksum = adler32(self.state.checksum, fresh);
                }
            }
        }

        self.folded = self.writer.len();
    }

    // ----------------

    /// Initial state
    fn head(&mut self) -> ReturnCode {
        if self.state.wrap == 0 {
            self.state.mode = Mode::TypeDo;
            return self.type_do();
        }

        need_bits!(self, 16);

        // gzip magic
        if (self.state.wrap & 2) != 0 && self.bit_reader.bits(16) == 0x8b1f {
            if self.state.wbits == 0 {
                self.state.wbits = 15;
            }

            let b0 = self.bit_reader.bits(8) as u8;
            let b1 = (self.bit_reader.bits(16) >> 8) as u8;
            self.state.checksum = crc32(CRC32_INITIAL_VALUE, &[b0, b1]);
            self.bit_reader.init_bits();

            self.state.mode = Mode::Flags;
            return self.flags();
        }

        // the zlib header check bytes form a multiple of 31
        if (self.state.wrap & 1) == 0
            || ((self.bit_reader.bits(8) << 8) + (self.bit_reader.bits(16) >> 8)) % 31 != 0
        {
            self.state.mode = Mode::Bad;
            return self.bad("incorrect header check");
        }

        if self.bit_reader.bits(4) != Z_DEFLATED {
            self.state.mode = Mode::Bad;
            return self.bad("unknown compression method");
        }

        self.bit_reader.drop_bits(4);
        let len = self.bit_reader.bits(4) as u8 + 8;

        if self.state.wbits == 0 {
            self.state.wbits = len;
        }

        if len as i32 > MAX_WBITS || len > self.state.wbits {
            self.state.mode = Mode::Bad;
            return self.bad("invalid window size");
        }

        self.state.dmax = 1 << len;
        self.state.gzip_flags = 0; // indicate zlib header
        self.state.checksum = ADLER32_INITIAL_VALUE;

        let have_dictid = self.bit_reader.bits(16) & 0x200 != 0;
        self.bit_reader.init_bits();

        if have_dictid {
            self.state.mode = Mode::DictId;
            self.dict_id()
        } else {
            self.state.mode = Mode::Type;
            self.type_()
        }
    }

    fn flags(&mut self) -> ReturnCode {
        need_bits!(self, 16);
        self.state.gzip_flags = self.bit_reader.bits(16) as i32;

        if self.state.gzip_flags & 0xff != Z_DEFLATED as i32 {
            self.state.mode = Mode::Bad;
            return self.bad("unknown compression method");
        }

        if self.state.gzip_flags & 0xe000 != 0 {
            self.state.mode = Mode::Bad;
            return self.bad("unknown header flags set");
        }

        if let Some(head) = self.state.head.as_mut() {
            head.text = (self.bit_reader.bits(16) >> 8) & 1 != 0;
        }

        if (self.state.gzip_flags & 0x0200) != 0 && (self.state.wrap & 4) != 0 {
            let bytes = (self.bit_reader.bits(16) as u16).to_le_bytes();
            self.state.checksum = crc32(self.state.checksum, &bytes);
        }

        self.bit_reader.init_bits();
        self.state.mode = Mode::Time;
        self.time()
    }

    fn time(&mut self) -> ReturnCode {
        need_bits!(self, 32);
        if let Some(head) = self.state.head.as_mut() {
            head.time = self.bit_reader.bits(32) as u32;
        }

        if (self.state.gzip_flags & 0x0200) != 0 && (self.state.wrap & 4) != 0 {
            let bytes = (self.bit_reader.bits(32) as u32).to_le_bytes();
            self.state.checksum = crc32(self.state.checksum, &bytes);
        }

        self.bit_reader.init_bits();
        self.state.mode = Mode::Os;
        self.os()
    }

    fn os(&mut self) -> ReturnCode {
        need_bits!(self, 16);
        if let Some(head) = self.state.head.as_mut() {
            head.xflags = (self.bit_reader.bits(8)) as u8;
            head.os = (self.bit_reader.bits(16) >> 8) as u8;
        }

        if (self.state.gzip_flags & 0x0200) != 0 && (self.state.wrap & 4) != 0 {
            let bytes = (self.bit_reader.bits(16) as u16).to_le_bytes();
            self.state.checksum = crc32(self.state.checksum, &bytes);
        }

        self.bit_reader.init_bits();
        self.state.mode = Mode::ExLen;
        self.ex_len()
    }

    fn ex_len(&mut self) -> ReturnCode {
        if (self.state.gzip_flags & 0x0400) != 0 {
            need_bits!(self, 16);

            self.state.length = self.bit_reader.bits(16) as usize;
            if let Some(head) = self.state.head.as_mut() {
                head.extra = Some(Vec::new());
            }

            if (self.state.gzip_flags & 0x0200) != 0 && (self.state.wrap & 4) != 0 {
                let bytes = (self.bit_reader.bits(16) as u16).to_le_bytes();
                self.state.checksum = crc32(self.state.checksum, &bytes);
            }
            self.bit_reader.init_bits();
        } else if let Some(head) = self.state.head.as_mut() {
            head.extra = None;
        }

        self.state.mode = Mode::Extra;
        self.extra()
    }

    fn extra(&mut self) -> ReturnCode {
        if (self.state.gzip_flags & 0x0400) != 0 {
            // the remaining extra bytes may not all be available
            let available = Ord::min(self.state.length, self.bit_reader.bytes_remaining());
            let extra_slice = &self.bit_reader.as_slice()[..available];

            if !extra_slice.is_empty() {
                if let Some(head) = self.state.head.as_mut() {
                    if let Some(extra) = head.extra.as_mut() {
                        let space = GZ_HEADER_FIELD_MAX.saturating_sub(extra.len());
                        extra.extend_from_slice(&extra_slice[..Ord::min(space, extra_slice.len())]);
                    }
                }

                if (self.state.gzip_flags & 0x0200) != 0 && (self.state.wrap & 4) != 0 {
                    self.state.checksum = crc32(self.state.checksum, extra_slice);
                }

                self.bit_reader.advance(available);
                self.state.length -= available;
            }

            if self.state.length != 0 {
                return self.inflate_leave(ReturnCode::Ok);
            }
        }

        self.state.length = 0;
        self.state.mode = Mode::Name;
        self.name()
    }

    fn name(&mut self) -> ReturnCode {
        if (self.state.gzip_flags & 0x0800) != 0 {
            if self.bit_reader.bytes_remaining() == 0 {
                return self.inflate_leave(ReturnCode::Ok);
            }

            // the name is NUL-terminated, but the terminator (or even the
            // start of the name) may be in a later chunk of input
            let slice = self.bit_reader.as_slice();
            let nul = slice.iter().position(|c| *c == 0);
            let name_slice = match nul {
                Some(i) => &slice[..=i],
                None => slice,
            };

            if let Some(head) = self.state.head.as_mut() {
                let name = head.name.get_or_insert_with(Vec::new);
                let without_nul = match nul {
                    Some(i) => &slice[..i],
                    None => slice,
                };
                let space = GZ_HEADER_FIELD_MAX.saturating_sub(name.len());
                name.extend_from_slice(&without_nul[..Ord::min(space, without_nul.len())]);
            }

            if (self.state.gzip_flags & 0x0200) != 0 && (self.state.wrap & 4) != 0 {
                self.state.checksum = crc32(self.state.checksum, name_slice);
            }

            let reached_end = name_slice.last() == Some(&0);
            self.bit_reader.advance(name_slice.len());

            if !reached_end && self.bit_reader.bytes_remaining() == 0 {
                return self.inflate_leave(ReturnCode::Ok);
            }
        } else if let Some(head) = self.state.head.as_mut() {
            head.name = None;
        }

        self.state.length = 0;
        self.state.mode = Mode::Comment;
        self.comment()
    }

    fn comment(&mut self) -> ReturnCode {
        if (self.state.gzip_flags & 0x1000) != 0 {
            if self.bit_reader.bytes_remaining() == 0 {
                return self.inflate_leave(ReturnCode::Ok);
            }

            let slice = self.bit_reader.as_slice();
            let nul = slice.iter().position(|c| *c == 0);
            let comment_slice = match nul {
                Some(i) => &slice[..=i],
                None => slice,
            };

            if let Some(head) = self.state.head.as_mut() {
                let comment = head.comment.get_or_insert_with(Vec::new);
                let without_nul = match nul {
                    Some(i) => &slice[..i],
                    None => slice,
                };
                let space = GZ_HEADER_FIELD_MAX.saturating_sub(comment.len());
                comment.extend_from_slice(&without_nul[..Ord::min(space, without_nul.len())]);
            }

            if (self.state.gzip_flags & 0x0200) != 0 && (self.state.wrap & 4) != 0 {
                self.state.checksum = crc32(self.state.checksum, comment_slice);
            }

            let reached_end = comment_slice.last() == Some(&0);
            self.bit_reader.advance(comment_slice.len());

            if !reached_end && self.bit_reader.bytes_remaining() == 0 {
                return self.inflate_leave(ReturnCode::Ok);
            }
        } else if let Some(head) = self.state.head.as_mut() {
            head.comment = None;
        }

        self.state.mode = Mode::HCrc;
        self.hcrc()
    }

    fn hcrc(&mut self) -> ReturnCode {
        if (self.state.gzip_flags & 0x0200) != 0 {
            need_bits!(self, 16);

            if (self.state.wrap & 4) != 0
                && self.bit_reader.bits(16) as u32 != (self.state.checksum & 0xffff)
            {
                self.state.mode = Mode::Bad;
                return self.bad("header crc mismatch");
            }

            self.bit_reader.init_bits();
        }

        if let Some(head) = self.state.head.as_mut() {
            head.hcrc = (self.state.gzip_flags >> 9) & 1 != 0;
        }
        self.state.head_done = true;
        log::trace!("inflate: gzip header complete");

        // the header is done; restart the check value for the deflate body
        if (self.state.wrap & 4) != 0 && self.state.gzip_flags != 0 {
            self.state.crc_fold = Crc32Fold::new();
            self.state.checksum = CRC32_INITIAL_VALUE;
        }

        self.state.mode = Mode::Type;
        self.type_()
    }

    fn dict_id(&mut self) -> ReturnCode {
        need_bits!(self, 32);

        self.state.checksum = zswap32(self.bit_reader.bits(32) as u32);
        self.bit_reader.init_bits();

        self.state.mode = Mode::Dict;
        self.dict()
    }

    fn dict(&mut self) -> ReturnCode {
        if !self.state.have_dict {
            return self.inflate_leave(ReturnCode::NeedDict);
        }

        self.state.checksum = ADLER32_INITIAL_VALUE;

        self.state.mode = Mode::Type;
        self.type_()
    }

    fn type_(&mut self) -> ReturnCode {
        match self.state.flush {
            InflateFlush::Block => self.inflate_leave(ReturnCode::Ok),
            _ => self.type_do(),
        }
    }

    fn type_do(&mut self) -> ReturnCode {
        if self.state.last {
            self.bit_reader.next_byte_boundary();
            self.state.mode = Mode::Check;
            return self.check();
        }

        need_bits!(self, 3);
        self.state.last = self.bit_reader.bits(1) != 0;
        self.bit_reader.drop_bits(1);

        match self.bit_reader.bits(2) {
            0 => {
                log::trace!("inflate: stored block (last = {})", self.state.last);
                self.bit_reader.drop_bits(2);
                self.state.mode = Mode::Stored;
                self.stored()
            }
            1 => {
                log::trace!("inflate: fixed codes block (last = {})", self.state.last);
                self.state.len_table = Table {
                    codes: Codes::Fixed,
                    bits: 9,
                };
                self.state.dist_table = Table {
                    codes: Codes::Fixed,
                    bits: 5,
                };
                self.bit_reader.drop_bits(2);

                self.state.mode = Mode::Len_;
                self.len_()
            }
            2 => {
                log::trace!("inflate: dynamic codes block (last = {})", self.state.last);
                self.bit_reader.drop_bits(2);
                self.state.mode = Mode::Table;
                self.table()
            }
            _ => {
                self.bit_reader.drop_bits(2);
                self.state.mode = Mode::Bad;
                self.bad("invalid block type")
            }
        }
    }

    fn stored(&mut self) -> ReturnCode {
        self.bit_reader.next_byte_boundary();

        need_bits!(self, 32);

        let hold = self.bit_reader.bits(32) as u32;
        if hold as u16 != !((hold >> 16) as u16) {
            self.state.mode = Mode::Bad;
            return self.bad("invalid stored block lengths");
        }

        self.state.length = hold as usize & 0xffff;
        self.bit_reader.init_bits();

        self.state.mode = Mode::CopyBlock;
        self.copy_block()
    }

    fn copy_block(&mut self) -> ReturnCode {
        loop {
            let mut copy = self.state.length;

            if copy == 0 {
                break;
            }

            copy = Ord::min(copy, self.writer.remaining());
            copy = Ord::min(copy, self.bit_reader.bytes_remaining());

            if copy == 0 {
                return self.inflate_leave(ReturnCode::Ok);
            }

            self.writer.extend(&self.bit_reader.as_slice()[..copy]);
            self.bit_reader.advance(copy);

            self.state.length -= copy;
        }

        self.state.mode = Mode::Type;
        self.type_()
    }

    /// get dynamic table entries descriptor
    fn table(&mut self) -> ReturnCode {
        need_bits!(self, 14);
        self.state.nlen = self.bit_reader.bits(5) as usize + 257;
        self.bit_reader.drop_bits(5);
        self.state.ndist = self.bit_reader.bits(5) as usize + 1;
        self.bit_reader.drop_bits(5);
        self.state.ncode = self.bit_reader.bits(4) as usize + 4;
        self.bit_reader.drop_bits(4);

        if self.state.nlen > 286 || self.state.ndist > 30 {
            self.state.mode = Mode::Bad;
            return self.bad("too many length or distance symbols");
        }

        self.state.have = 0;
        self.state.mode = Mode::LenLens;
        self.len_lens()
    }

    /// get code length code lengths (not a typo)
    fn len_lens(&mut self) -> ReturnCode {
        // permutation of code lengths
        const ORDER: [u16; 19] = [
            16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
        ];

        while self.state.have < self.state.ncode {
            need_bits!(self, 3);
            self.state.lens[ORDER[self.state.have] as usize] = self.bit_reader.bits(3) as u16;
            self.state.have += 1;
            self.bit_reader.drop_bits(3);
        }

        while self.state.have < 19 {
            self.state.lens[ORDER[self.state.have] as usize] = 0;
            self.state.have += 1;
        }

        let InflateTable::Success(root) = inflate_table(
            CodeType::Codes,
            &self.state.lens,
            19,
            &mut self.state.codes_codes,
            7,
            &mut self.state.work,
        ) else {
            self.state.mode = Mode::Bad;
            return self.bad("invalid code lengths set");
        };

        self.state.len_table = Table {
            codes: Codes::Codes,
            bits: root,
        };

        self.state.have = 0;
        self.state.mode = Mode::CodeLens;
        self.code_lens()
    }

    /// get length and distance code code lengths
    fn code_lens(&mut self) -> ReturnCode {
        while self.state.have < self.state.nlen + self.state.ndist {
            let here = loop {
                let bits = self.bit_reader.bits(self.state.len_table.bits);
                let here = self.len_table_get(bits as usize);
                if here.bits <= self.bit_reader.bits_in_buffer() {
                    break here;
                }

                pull_byte!(self);
            };

            match here.val {
                0..=15 => {
                    self.bit_reader.drop_bits(here.bits);
                    self.state.lens[self.state.have] = here.val;
                    self.state.have += 1;
                }
                16 => {
                    need_bits!(self, here.bits as usize + 2);
                    self.bit_reader.drop_bits(here.bits);
                    if self.state.have == 0 {
                        self.state.mode = Mode::Bad;
                        return self.bad("invalid bit length repeat");
                    }

                    let len = self.state.lens[self.state.have - 1];
                    let copy = 3 + self.bit_reader.bits(2) as usize;
                    self.bit_reader.drop_bits(2);

                    if self.state.have + copy > self.state.nlen + self.state.ndist {
                        self.state.mode = Mode::Bad;
                        return self.bad("invalid bit length repeat");
                    }

                    for _ in 0..copy {
                        self.state.lens[self.state.have] = len;
                        self.state.have += 1;
                    }
                }
                17 => {
                    need_bits!(self, here.bits as usize + 3);
                    self.bit_reader.drop_bits(here.bits);
                    let copy = 3 + self.bit_reader.bits(3) as usize;
                    self.bit_reader.drop_bits(3);

                    if self.state.have + copy > self.state.nlen + self.state.ndist {
                        self.state.mode = Mode::Bad;
                        return self.bad("invalid bit length repeat");
                    }

                    for _ in 0..copy {
                        self.state.lens[self.state.have] = 0;
                        self.state.have += 1;
                    }
                }
                18.. => {
                    need_bits!(self, here.bits as usize + 7);
                    self.bit_reader.drop_bits(here.bits);
                    let copy = 11 + self.bit_reader.bits(7) as usize;
                    self.bit_reader.drop_bits(7);

                    if self.state.have + copy > self.state.nlen + self.state.ndist {
                        self.state.mode = Mode::Bad;
                        return self.bad("invalid bit length repeat");
                    }

                    for _ in 0..copy {
                        self.state.lens[self.state.have] = 0;
                        self.state.have += 1;
                    }
                }
            }
        }

        // check for end-of-block code (better have one)
        if self.state.lens[256] == 0 {
            self.state.mode = Mode::Bad;
            return self.bad("invalid code -- missing end-of-block");
        }

        let InflateTable::Success(root) = inflate_table(
            CodeType::Lens,
            &self.state.lens,
            self.state.nlen,
            &mut self.state.len_codes,
            9,
            &mut self.state.work,
        ) else {
            self.state.mode = Mode::Bad;
            return self.bad("invalid literal/lengths set");
        };

        self.state.len_table = Table {
            codes: Codes::Len,
            bits: root,
        };

        let nlen = self.state.nlen;
        let InflateTable::Success(root) = inflate_table(
            CodeType::Dists,
            &self.state.lens[nlen..],
            self.state.ndist,
            &mut self.state.dist_codes,
            6,
            &mut self.state.work,
        ) else {
            self.state.mode = Mode::Bad;
            return self.bad("invalid distances set");
        };

        self.state.dist_table = Table {
            codes: Codes::Dist,
            bits: root,
        };

        self.state.mode = Mode::Len_;
        self.len_()
    }

    fn len_(&mut self) -> ReturnCode {
        self.state.mode = Mode::Len;
        self.len()
    }

    fn len(&mut self) -> ReturnCode {
        // with enough input and output headroom, decode whole symbols at a
        // time without suspension checks
        if self.bit_reader.bytes_remaining() >= INFLATE_FAST_MIN_HAVE
            && self.writer.remaining() >= INFLATE_FAST_MIN_LEFT
        {
            return self.inflate_fast();
        }

        self.state.back = 0;

        // get a literal, length, or end-of-block code
        let mut here;
        loop {
            let bits = self.bit_reader.bits(self.state.len_table.bits);
            here = self.len_table_get(bits as usize);

            if here.bits <= self.bit_reader.bits_in_buffer() {
                break;
            }

            pull_byte!(self);
        }

        if here.op != 0 && here.op & 0xf0 == 0 {
            // second level table index
            let last = here;
            loop {
                let bits = self.bit_reader.bits((last.bits + last.op) as usize) as u16;
                here = self.len_table_get((last.val + (bits >> last.bits)) as usize);
                if last.bits + here.bits <= self.bit_reader.bits_in_buffer() {
                    break;
                }

                pull_byte!(self);
            }

            self.bit_reader.drop_bits(last.bits);
            self.state.back += last.bits as usize;
        }

        self.bit_reader.drop_bits(here.bits);
        self.state.back += here.bits as usize;
        self.state.length = here.val as usize;

        if here.op == 0 {
            self.state.mode = Mode::Lit;
            self.lit()
        } else if here.op & 32 != 0 {
            // end of block
            self.state.back = usize::MAX;
            self.state.mode = Mode::Type;
            self.type_()
        } else if here.op & 64 != 0 {
            self.state.mode = Mode::Bad;
            self.bad("invalid literal/length code")
        } else {
            self.state.extra = (here.op & MAX_BITS) as usize;
            self.state.mode = Mode::LenExt;
            self.len_ext()
        }
    }

    fn lit(&mut self) -> ReturnCode {
        if self.writer.is_full() {
            return self.inflate_leave(ReturnCode::Ok);
        }

        self.writer.push(self.state.length as u8);

        self.state.mode = Mode::Len;
        self.len()
    }

    fn len_ext(&mut self) -> ReturnCode {
        let extra = self.state.extra;

        if extra != 0 {
            need_bits!(self, extra);
            self.state.length += self.bit_reader.bits(extra) as usize;
            self.bit_reader.drop_bits(extra as u8);
            self.state.back += extra;
        }

        self.state.was = self.state.length;
        self.state.mode = Mode::Dist;
        self.dist()
    }

    fn dist(&mut self) -> ReturnCode {
        let mut here;
        loop {
            let bits = self.bit_reader.bits(self.state.dist_table.bits) as usize;
            here = self.dist_table_get(bits);
            if here.bits <= self.bit_reader.bits_in_buffer() {
                break;
            }

            pull_byte!(self);
        }

        if here.op & 0xf0 == 0 {
            let last = here;
            loop {
                let bits = self.bit_reader.bits((last.bits + last.op) as usize);
                here = self.dist_table_get(last.val as usize + ((bits as usize) >> last.bits));

                if last.bits + here.bits <= self.bit_reader.bits_in_buffer() {
                    break;
                }

                pull_byte!(self);
            }

            self.bit_reader.drop_bits(last.bits);
            self.state.back += last.bits as usize;
        }

        self.bit_reader.drop_bits(here.bits);
        self.state.back += here.bits as usize;

        if here.op & 64 != 0 {
            self.state.mode = Mode::Bad;
            return self.bad("invalid distance code");
        }

        self.state.offset = here.val as usize;
        self.state.extra = (here.op & MAX_BITS) as usize;
        self.state.mode = Mode::DistExt;
        self.dist_ext()
    }

    fn dist_ext(&mut self) -> ReturnCode {
        let extra = self.state.extra;

        if extra > 0 {
            need_bits!(self, extra);
            self.state.offset += self.bit_reader.bits(extra) as usize;
            self.bit_reader.drop_bits(extra as u8);
            self.state.back += extra;
        }

        if INFLATE_STRICT && self.state.offset > self.state.dmax {
            self.state.mode = Mode::Bad;
            return self.bad("invalid distance too far back");
        }

        self.state.mode = Mode::Match;
        self.match_()
    }

    /// copy match from window or earlier output to output
    fn match_(&mut self) -> ReturnCode {
        loop {
            if self.writer.is_full() {
                return self.inflate_leave(ReturnCode::Ok);
            }

            let left = self.writer.remaining();
            let written = self.writer.len();

            let copy = if self.state.offset > written {
                // copy from the window
                let mut copy = self.state.offset - written;

                if copy > self.state.window.have() {
                    self.state.mode = Mode::Bad;
                    return self.bad("invalid distance too far back");
                }

                let wnext = self.state.window.next();
                let wsize = self.state.window.size();

                let from = if copy > wnext {
                    copy -= wnext;
                    wsize - copy
                } else {
                    wnext - copy
                };

                copy = Ord::min(copy, self.state.length);
                copy = Ord::min(copy, left);

                self.writer
                    .extend(&self.state.window.as_slice()[from..from + copy]);

                copy
            } else {
                let copy = Ord::min(self.state.length, left);
                self.writer.copy_match(self.state.offset, copy);
                copy
            };

            self.state.length -= copy;

            if self.state.length == 0 {
                self.state.mode = Mode::Len;
                return self.len();
            }
        }
    }

    /// Decode literals and matches until the input or output headroom drops
    /// below what a whole iteration could consume. Entered from [`Self::len`]
    /// with mode `Len`; leaves the mode at `Len`, `Type` or `Bad`.
    fn inflate_fast(&mut self) -> ReturnCode {
        let lmask = (1u64 << self.state.len_table.bits) - 1;
        let dmask = (1u64 << self.state.dist_table.bits) - 1;

        let mut bad = None;

        'outer: loop {
            // one iteration consumes at most 48 bits: a 15-bit length code,
            // 5 extra bits, a 15-bit distance code and 13 extra bits
            self.bit_reader.refill();

            let mut here = self.len_table_get((self.bit_reader.hold() & lmask) as usize);

            'dolen: loop {
                self.bit_reader.drop_bits(here.bits);
                let op = here.op;

                if op == 0 {
                    self.writer.push(here.val as u8);
                } else if op & 16 != 0 {
                    let op = op & MAX_BITS;
                    let mut len = here.val as usize + self.bit_reader.bits(op as usize) as usize;
                    self.bit_reader.drop_bits(op);

                    here = self.dist_table_get((self.bit_reader.hold() & dmask) as usize);

                    'dodist: loop {
                        self.bit_reader.drop_bits(here.bits);
                        let op = here.op;

                        if op & 16 != 0 {
                            let op = op & MAX_BITS;
                            let dist =
                                here.val as usize + self.bit_reader.bits(op as usize) as usize;

                            if INFLATE_STRICT && dist > self.state.dmax {
                                bad = Some("invalid distance too far back");
                                self.state.mode = Mode::Bad;
                                break 'outer;
                            }

                            self.bit_reader.drop_bits(op);

                            let written = self.writer.len();

                            if dist > written {
                                // the match reaches back into the window
                                if dist - written > self.state.window.have() {
                                    bad = Some("invalid distance too far back");
                                    self.state.mode = Mode::Bad;
                                    break 'outer;
                                }

                                let mut op = dist - written;
                                let mut from;

                                let wnext = self.state.window.next();
                                let wsize = self.state.window.size();

                                if wnext == 0 {
                                    // window is full; match is at its end
                                    from = wsize - op;
                                } else if wnext >= op {
                                    // contiguous copy, no wrap
                                    from = wnext - op;
                                } else {
                                    // match starts in the wrapped-around tail
                                    op -= wnext;
                                    from = wsize - op;

                                    if op < len {
                                        // tail section first, then the start
                                        len -= op;
                                        self.writer
                                            .extend(&self.state.window.as_slice()[from..from + op]);
                                        from = 0;
                                        op = wnext;
                                    }
                                }

                                let copy = Ord::min(op, len);
                                self.writer
                                    .extend(&self.state.window.as_slice()[from..from + copy]);

                                if op < len {
                                    // the rest comes from the output itself
                                    self.writer.copy_match(dist, len - op);
                                }
                            } else {
                                self.writer.copy_match(dist, len);
                            }
                        } else if op & 64 == 0 {
                            // second level distance code
                            here = self.dist_table_get(
                                here.val as usize + self.bit_reader.bits(op as usize) as usize,
                            );
                            continue 'dodist;
                        } else {
                            bad = Some("invalid distance code");
                            self.state.mode = Mode::Bad;
                            break 'outer;
                        }

                        break 'dodist;
                    }
                } else if op & 64 == 0 {
                    // second level length code
                    here = self.len_table_get(
                        here.val as usize + self.bit_reader.bits(op as usize) as usize,
                    );
                    continue 'dolen;
                } else if op & 32 != 0 {
                    // end of block
                    self.state.mode = Mode::Type;
                    break 'outer;
                } else {
                    bad = Some("invalid literal/length code");
                    self.state.mode = Mode::Bad;
                    break 'outer;
                }

                break 'dolen;
            }

            if self.bit_reader.bytes_remaining() < INFLATE_FAST_MIN_HAVE
                || self.writer.remaining() < INFLATE_FAST_MIN_LEFT
            {
                break 'outer;
            }
        }

        // hand whole bytes in the accumulator back to the input
        self.bit_reader.return_unused_bytes();

        match self.state.mode {
            Mode::Type => self.type_(),
            Mode::Len => self.len(),
            Mode::Bad => match bad {
                Some(msg) => self.bad(msg),
                None => unreachable!(),
            },
            _ => unreachable!(),
        }
    }

    fn check(&mut self) -> ReturnCode {
        if self.state.wrap != 0 {
            need_bits!(self, 32);

            // account for the output so far; the trailer checks need it now
            self.fold_output();
            self.state.total += self.writer.len() - self.counted;
            self.counted = self.writer.len();

            if self.state.wrap & 4 != 0 && self.state.gzip_flags > 0 {
                self.state.checksum = self.state.crc_fold.finish();
            }

            let given_checksum = if self.state.gzip_flags > 0 {
                // gzip stores the CRC in little-endian order
                self.bit_reader.bits(32) as u32
            } else {
                zswap32(self.bit_reader.bits(32) as u32)
            };

            if self.state.wrap & 4 != 0 && given_checksum != self.state.checksum {
                self.state.mode = Mode::Bad;
                return self.bad("incorrect data check");
            }

            self.bit_reader.init_bits();
        }

        self.state.mode = Mode::Length;
        self.length()
    }

    fn length(&mut self) -> ReturnCode {
        // the gzip trailer ends with ISIZE, the output length mod 2^32
        if self.state.wrap != 0 && self.state.gzip_flags != 0 {
            need_bits!(self, 32);

            if self.state.wrap & 4 != 0
                && self.bit_reader.bits(32) as u32 != self.state.total as u32
            {
                self.state.mode = Mode::Bad;
                return self.bad("incorrect length check");
            }

            self.bit_reader.init_bits();
        }

        self.state.mode = Mode::Done;
        self.inflate_leave(ReturnCode::StreamEnd)
    }
}

fn syncsearch(mut got: usize, buf: &[u8]) -> (usize, usize) {
    let len = buf.len();
    let mut next = 0;

    while next < len && got < 4 {
        if buf[next] == if got < 2 { 0 } else { 0xff } {
            got += 1;
        } else if buf[next] != 0 {
            got = 0;
        } else {
            got = 4 - got;
        }
        next += 1;
    }

    (got, next)
}

/// Configuration for an [`Inflate`] stream.
///
/// `window_bits` selects the wrapper and the maximum window size: 8..=15 for
/// zlib, +16 for gzip, +32 to auto-detect either, negated for a raw deflate
/// stream. A value of 0 takes the window size from the zlib header.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct InflateConfig {
    pub window_bits: i32,
}

impl Default for InflateConfig {
    fn default() -> Self {
        Self {
            window_bits: DEF_WBITS,
        }
    }
}

/// A DEFLATE decompression stream.
pub struct Inflate {
    state: Box<State>,
}

impl Inflate {
    pub fn new(config: InflateConfig) -> Result<Self, Error> {
        let mut inflate = Self {
            state: Box::new(State::new()),
        };
        inflate.reset_with_config(config)?;
        Ok(inflate)
    }

    /// Decompress as much of `input` into `output` as the buffers allow.
    ///
    /// The returned [`Progress`] says how much of each buffer was used and
    /// where the stream stands: `Ok` means call again with more input or
    /// output space, `StreamEnd` that the stream is complete and verified,
    /// `NeedDict` that [`set_dictionary`](Self::set_dictionary) must supply
    /// the preset dictionary the stream was compressed with.
    pub fn inflate(&mut self, input: &[u8], output: &mut [u8], flush: InflateFlush) -> Progress {
        let state = &mut *self.state;

        // on entry, skip the check that Block flush mode performs
        if matches!(state.mode, Mode::Type) {
            state.mode = Mode::TypeDo;
        }
        state.flush = flush;

        let hold = state.hold;
        let bits = state.bits;

        let mut stream = Stream {
            bit_reader: BitReader::new(input, hold, bits),
            writer: Writer::new(output),
            state,
            folded: 0,
            counted: 0,
        };

        let mut err = stream.dispatch();

        let in_read = stream.bit_reader.bytes_consumed();
        let out_written = stream.writer.len();

        stream.fold_output();

        let Stream {
            bit_reader,
            writer,
            state,
            counted,
            ..
        } = stream;

        state.hold = bit_reader.hold();
        state.bits = bit_reader.bits_in_buffer();

        state.total_in += in_read as u64;
        state.total_out += out_written as u64;
        state.total += out_written - counted;

        // Save the tail of the output in the window for back-references that
        // cross the next call boundary. Skipped when the stream finished in
        // one shot and the window was never needed.
        let valid_mode = !matches!(state.mode, Mode::Bad | Mode::Sync);
        let not_done = !matches!(
            state.mode,
            Mode::Check | Mode::Length | Mode::Done | Mode::Bad | Mode::Sync
        );

        let must_update_window = state.window.size() != 0
            || (out_written != 0
                && valid_mode
                && (not_done || !matches!(flush, InflateFlush::Finish)));

        if must_update_window {
            if state.window.is_empty() {
                state.window.alloc(state.wbits);
            }
            state.window.extend(writer.filled());
        }

        if ((in_read == 0 && out_written == 0) || flush == InflateFlush::Finish)
            && err == ReturnCode::Ok
        {
            err = ReturnCode::BufError;
        }

        Progress {
            consumed: in_read,
            written: out_written,
            status: err,
        }
    }

    pub fn reset(&mut self) {
        self.state.window.clear();
        self.state.msg = None;
        self.reset_keep();
    }

    /// Like [`reset`](Self::reset), but changes the wrapper and window size.
    pub fn reset_with_config(&mut self, config: InflateConfig) -> Result<(), Error> {
        let mut window_bits = config.window_bits;
        let wrap;

        if window_bits < 0 {
            if window_bits < -MAX_WBITS {
                return Err(Error::from_return_code(ReturnCode::StreamError, None));
            }

            wrap = 0;
            window_bits = -window_bits;
        } else {
            wrap = (window_bits >> 4) + 5;

            if window_bits < 48 {
                window_bits &= MAX_WBITS;
            }
        }

        if window_bits != 0 && !(MIN_WBITS..=MAX_WBITS).contains(&window_bits) {
            return Err(Error::from_return_code(ReturnCode::StreamError, None));
        }

        let state = &mut *self.state;

        if state.window.size() != 0 && state.wbits as i32 != window_bits {
            state.window = Window::empty();
        }

        state.wrap = wrap as u8;
        state.wbits = window_bits as u8;

        self.reset();
        Ok(())
    }

    /// Like [`reset`](Self::reset), but keeps the window contents, so a new
    /// stream can refer back into the previous one.
    pub fn reset_keep(&mut self) {
        let state = &mut *self.state;

        state.total_in = 0;
        state.total_out = 0;
        state.total = 0;
        state.msg = None;

        state.mode = Mode::Head;
        state.checksum = ADLER32_INITIAL_VALUE;
        state.crc_fold = Crc32Fold::new();
        state.last = false;
        state.have_dict = false;
        state.gzip_flags = -1;
        state.dmax = 32768;
        state.head = None;
        state.head_done = false;
        state.hold = 0;
        state.bits = 0;
        state.len_table = Table::default();
        state.dist_table = Table::default();
        state.back = usize::MAX;
    }

    /// Supply the preset dictionary after `inflate` returned `NeedDict`. For
    /// a zlib stream the dictionary's Adler-32 must match the DICTID from the
    /// header; for a raw stream it may be set before any input.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<(), Error> {
        let state = &mut *self.state;

        if state.wrap != 0 && !matches!(state.mode, Mode::Dict) {
            return Err(Error::from_return_code(ReturnCode::StreamError, None));
        }

        if matches!(state.mode, Mode::Dict) {
            let dictid = adler32(ADLER32_INITIAL_VALUE, dictionary);
            if dictid != state.checksum {
                return Err(Error::from_return_code(ReturnCode::DataError, None));
            }
        }

        if state.window.is_empty() {
            state.window.alloc(state.wbits);
        }
        state.window.extend(dictionary);

        state.have_dict = true;
        Ok(())
    }

    /// Ask for the gzip header fields to be collected as the stream's header
    /// is parsed; fails unless this stream accepts gzip wrapping.
    pub fn request_header(&mut self) -> Result<(), Error> {
        if self.state.wrap & 2 == 0 {
            return Err(Error::from_return_code(ReturnCode::StreamError, None));
        }

        self.state.head = Some(GzHeader::default());
        self.state.head_done = false;
        Ok(())
    }

    /// The collected gzip header, once it has been fully parsed.
    pub fn header(&self) -> Option<&GzHeader> {
        if self.state.head_done {
            self.state.head.as_ref()
        } else {
            None
        }
    }

    /// Scan `input` for the `00 00 FF FF` marker of a sync flush point and
    /// prepare the stream to continue from there. Returns how many input
    /// bytes were examined and whether a full marker was found (`Ok`) or more
    /// input is needed (`DataError`).
    pub fn sync(&mut self, input: &[u8]) -> (usize, ReturnCode) {
        let state = &mut *self.state;

        if input.is_empty() && state.bits < 8 {
            return (0, ReturnCode::BufError);
        }

        // if first time, start search in the bit accumulator
        if !matches!(state.mode, Mode::Sync) {
            state.mode = Mode::Sync;

            let mut reader = BitReader::new(&[], state.hold, state.bits);
            let (buf, len) = reader.start_sync_search();
            state.hold = reader.hold();
            state.bits = reader.bits_in_buffer();

            let (got, _) = syncsearch(0, &buf[..len]);
            state.have = got;
        }

        let (got, len) = syncsearch(state.have, input);
        state.have = got;
        state.total_in += len as u64;

        if state.have != 4 {
            return (len, ReturnCode::DataError);
        }

        if state.gzip_flags == -1 {
            // if no header yet, treat the stream as raw
            state.wrap = 0;
        } else {
            // no point in computing a check value now
            state.wrap &= !4;
        }

        let flags = state.gzip_flags;
        let total_in = state.total_in;
        let total_out = state.total_out;

        self.reset();

        let state = &mut *self.state;
        state.total_in = total_in;
        state.total_out = total_out;
        state.gzip_flags = flags;
        state.mode = Mode::Type;

        (len, ReturnCode::Ok)
    }

    /// True when the stream sits exactly at the end of a block produced by a
    /// sync or full flush, waiting for the stored-block length bytes.
    pub fn sync_point(&self) -> bool {
        matches!(self.state.mode, Mode::Stored) && self.state.bits == 0
    }

    pub fn total_in(&self) -> u64 {
        self.state.total_in
    }

    pub fn total_out(&self) -> u64 {
        self.state.total_out
    }

    /// Explanation of the last `DataError`, if there is one.
    pub fn msg(&self) -> Option<&'static str> {
        self.state.msg
    }

    /// True once the stream has ended and its check values verified.
    pub fn is_done(&self) -> bool {
        matches!(self.state.mode, Mode::Done)
    }
}

impl core::fmt::Debug for Inflate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Inflate")
            .field("mode", &self.state.mode)
            .field("wrap", &self.state.wrap)
            .field("wbits", &self.state.wbits)
            .field("total_in", &self.state.total_in)
            .field("total_out", &self.state.total_out)
            .field("msg", &self.state.msg)
            .finish_non_exhaustive()
    }
}

/// Decompress `input` into `output` in one go.
///
/// On success the prefix of `output` holding the decompressed data is
/// returned. The whole stream must fit; a short buffer is `ReturnCode::
/// BufError`, a stream that ends prematurely is a `DataError`.
pub fn uncompress_slice<'a>(
    output: &'a mut [u8],
    input: &[u8],
    config: InflateConfig,
) -> (&'a mut [u8], ReturnCode) {
    let mut inflate = match Inflate::new(config) {
        Ok(inflate) => inflate,
        Err(_) => return (&mut [], ReturnCode::StreamError),
    };

    let mut in_pos = 0;
    let mut out_pos = 0;

    loop {
        let progress = inflate.inflate(&input[in_pos..], &mut output[out_pos..], InflateFlush::NoFlush);
        in_pos += progress.consumed;
        out_pos += progress.written;

        match progress.status {
            ReturnCode::Ok | ReturnCode::BufError => {
                if progress.consumed == 0 && progress.written == 0 {
                    // a short output buffer reports BufError; running out of
                    // input while space remains means a truncated stream
                    let code = if out_pos < output.len() {
                        ReturnCode::DataError
                    } else {
                        ReturnCode::BufError
                    };
                    return (&mut output[..out_pos], code);
                }
            }
            ReturnCode::StreamEnd => return (&mut output[..out_pos], ReturnCode::StreamEnd),
            code => return (&mut output[..out_pos], code),
        }
    }
}

/// Decompress `input` into a freshly allocated `Vec`, growing it as needed.
pub fn uncompress_to_vec(input: &[u8], config: InflateConfig) -> Result<Vec<u8>, Error> {
    let mut inflate = Inflate::new(config)?;

    let mut out = vec![0u8; Ord::max(64, input.len().saturating_mul(2))];
    let mut in_pos = 0;
    let mut filled = 0;

    loop {
        let progress = inflate.inflate(&input[in_pos..], &mut out[filled..], InflateFlush::NoFlush);
        in_pos += progress.consumed;
        filled += progress.written;

        match progress.status {
            ReturnCode::StreamEnd => {
                out.truncate(filled);
                return Ok(out);
            }
            ReturnCode::Ok | ReturnCode::BufError => {
                if progress.consumed == 0 && progress.written == 0 && filled < out.len() {
                    // input ran out with output space to spare
                    return Err(Error::from_return_code(
                        ReturnCode::DataError,
                        inflate.msg(),
                    ));
                }
                if filled == out.len() {
                    out.resize(out.len() * 2, 0);
                }
            }
            code => return Err(Error::from_return_code(code, inflate.msg())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // zlib stream for "abc" at the default level: a fixed-Huffman block
    const ABC_ZLIB: &[u8] = &[
        0x78, 0x9c, 0x4b, 0x4c, 0x4a, 0x06, 0x00, 0x02, 0x4d, 0x01, 0x27,
    ];

    // zlib stream for "abc" at level 0: a stored block
    const ABC_ZLIB_STORED: &[u8] = &[
        0x78, 0x01, 0x01, 0x03, 0x00, 0xfc, 0xff, 0x61, 0x62, 0x63, 0x02, 0x4d, 0x01, 0x27,
    ];

    #[test]
    fn fixed_block_zlib_stream() {
        let mut output = [0u8; 16];
        let (decoded, code) = uncompress_slice(&mut output, ABC_ZLIB, InflateConfig::default());
        assert_eq!(code, ReturnCode::StreamEnd);
        assert_eq!(decoded, b"abc");
    }

    #[test]
    fn stored_block_zlib_stream() {
        let mut output = [0u8; 16];
        let (decoded, code) =
            uncompress_slice(&mut output, ABC_ZLIB_STORED, InflateConfig::default());
        assert_eq!(code, ReturnCode::StreamEnd);
        assert_eq!(decoded, b"abc");
    }

    #[test]
    fn auto_detect_accepts_zlib() {
        let config = InflateConfig { window_bits: 15 + 32 };
        let mut output = [0u8; 16];
        let (decoded, code) = uncompress_slice(&mut output, ABC_ZLIB, config);
        assert_eq!(code, ReturnCode::StreamEnd);
        assert_eq!(decoded, b"abc");
    }

    #[test]
    fn raw_stream_rejects_wrapped_input() {
        let config = InflateConfig { window_bits: 15 + 16 };
        let mut inflate = Inflate::new(config).unwrap();
        let mut output = [0u8; 16];
        let progress = inflate.inflate(ABC_ZLIB, &mut output, InflateFlush::NoFlush);
        assert_eq!(progress.status, ReturnCode::DataError);
        assert_eq!(inflate.msg(), Some("incorrect header check"));
    }

    #[test]
    fn corrupted_checksum_is_detected() {
        let mut corrupted = ABC_ZLIB.to_vec();
        let last = corrupted.len() - 1;
        corrupted[last] ^= 0xff;

        let mut output = [0u8; 16];
        let (_, code) = uncompress_slice(&mut output, &corrupted, InflateConfig::default());
        assert_eq!(code, ReturnCode::DataError);
    }

    #[test]
    fn invalid_block_type() {
        // BFINAL=1, BTYPE=11
        let config = InflateConfig { window_bits: -15 };
        let mut inflate = Inflate::new(config).unwrap();
        let mut output = [0u8; 16];
        let progress = inflate.inflate(&[0x07], &mut output, InflateFlush::NoFlush);
        assert_eq!(progress.status, ReturnCode::DataError);
        assert_eq!(inflate.msg(), Some("invalid block type"));
    }

    #[test]
    fn invalid_stored_lengths() {
        // stored block whose LEN and NLEN do not complement
        let config = InflateConfig { window_bits: -15 };
        let mut inflate = Inflate::new(config).unwrap();
        let mut output = [0u8; 16];
        let progress = inflate.inflate(&[0x01, 0x03, 0x00, 0x12, 0x34], &mut output, InflateFlush::NoFlush);
        assert_eq!(progress.status, ReturnCode::DataError);
        assert_eq!(inflate.msg(), Some("invalid stored block lengths"));
    }

    #[test]
    fn one_byte_at_a_time() {
        let mut inflate = Inflate::new(InflateConfig::default()).unwrap();

        let mut decoded = Vec::new();
        let mut buf = [0u8; 1];
        let mut status = ReturnCode::Ok;

        for &byte in ABC_ZLIB {
            loop {
                let progress = inflate.inflate(&[byte], &mut buf, InflateFlush::NoFlush);
                assert_ne!(progress.status, ReturnCode::DataError);
                decoded.extend_from_slice(&buf[..progress.written]);
                status = progress.status;
                if progress.consumed == 1 || progress.status == ReturnCode::StreamEnd {
                    break;
                }
            }
        }

        assert_eq!(status, ReturnCode::StreamEnd);
        assert_eq!(decoded, b"abc");
    }

    #[test]
    fn truncated_stream_is_an_error() {
        let result = uncompress_to_vec(&ABC_ZLIB[..6], InflateConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn uncompress_to_vec_roundtrip() {
        let decoded = uncompress_to_vec(ABC_ZLIB, InflateConfig::default()).unwrap();
        assert_eq!(decoded, b"abc");
    }

    #[test]
    fn dynamic_block_with_long_literal_codes() {
        // 256 singleton literals next to a dominant run push the rare
        // literals past the 9-bit root table, so decoding them has to go
        // through a second-level table
        let mut data: Vec<u8> = (0u8..=255).collect();
        data.resize(1 << 20, b'a');

        let compressed =
            crate::deflate::compress_to_vec(&data, crate::deflate::DeflateConfig::new(6))
                .unwrap();
        let decoded = uncompress_to_vec(&compressed, InflateConfig::default()).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn totals_are_tracked() {
        let mut inflate = Inflate::new(InflateConfig::default()).unwrap();
        let mut output = [0u8; 16];
        let progress = inflate.inflate(ABC_ZLIB, &mut output, InflateFlush::Finish);
        assert_eq!(progress.status, ReturnCode::StreamEnd);
        assert_eq!(inflate.total_in(), ABC_ZLIB.len() as u64);
        assert_eq!(inflate.total_out(), 3);
    }

    #[test]
    fn malformed_input_does_not_panic() {
        // regression input that used to overflow a decode buffer
        let mut output = [0; 1 << 13];
        let input = [
            72, 137, 58, 0, 3, 39, 255, 255, 255, 255, 255, 14, 14, 14, 14, 14, 14, 14, 14, 14, 14,
            14, 14, 184, 14, 14, 14, 14, 14, 14, 14, 14, 14, 14, 14, 14, 14, 14, 14, 184, 14, 14,
            14, 14, 14, 14, 14, 63, 14, 14, 14, 14, 14, 14, 14, 14, 184, 14, 14, 255, 14, 103, 14,
            14, 14, 14, 14, 14, 61, 14, 255, 255, 63, 14, 14, 14, 14, 14, 14, 14, 14, 184, 14, 14,
            255, 14, 14, 14, 14, 14, 14, 14, 14, 14, 14, 14, 6, 14, 14, 14, 14, 14, 14, 14, 14, 71,
            4, 137, 106,
        ];

        let config = InflateConfig { window_bits: 15 };
        let (_, code) = uncompress_slice(&mut output, &input, config);
        assert!(matches!(code, ReturnCode::DataError | ReturnCode::BufError));
    }

    #[test]
    fn invalid_window_bits_rejected() {
        assert!(Inflate::new(InflateConfig { window_bits: 7 }).is_err());
        assert!(Inflate::new(InflateConfig { window_bits: -16 }).is_err());
    }
}
