#![doc = core::include_str!("../README.md")]

mod adler32;
pub mod crc32;
pub mod deflate;
pub mod gz;
pub mod inflate;

pub use adler32::adler32;
pub use crc32::crc32;

/// Maximum number of entries in a literal/length decode table (root table of
/// 9 bits) and in a distance decode table (root table of 6 bits). These
/// bounds come from exhaustive search over all complete length-limited code
/// sets ("enough 286 9 15" and "enough 30 6 15" in the zlib distribution).
pub(crate) const ENOUGH_LENS: usize = 852;
pub(crate) const ENOUGH_DISTS: usize = 592;

/// initial adler-32 hash value
pub(crate) const ADLER32_INITIAL_VALUE: u32 = 1;
/// initial crc-32 hash value
pub(crate) const CRC32_INITIAL_VALUE: u32 = 0;

pub const MIN_WBITS: i32 = 8; // 256b LZ77 window
pub const MAX_WBITS: i32 = 15; // 32kb LZ77 window
pub(crate) const DEF_WBITS: i32 = MAX_WBITS;

/// Picks the default compression level (currently 6).
pub const Z_DEFAULT_COMPRESSION: i32 = -1;

/// Flush behavior for [`deflate::Deflate::deflate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flush {
    #[default]
    NoFlush = 0,
    PartialFlush = 1,
    SyncFlush = 2,
    FullFlush = 3,
    Finish = 4,
    Block = 5,
}

impl TryFrom<i32> for Flush {
    type Error = ();

    fn try_from(value: i32) -> Result<Self, ()> {
        match value {
            0 => Ok(Flush::NoFlush),
            1 => Ok(Flush::PartialFlush),
            2 => Ok(Flush::SyncFlush),
            3 => Ok(Flush::FullFlush),
            4 => Ok(Flush::Finish),
            5 => Ok(Flush::Block),
            _ => Err(()),
        }
    }
}

/// Flush behavior for [`inflate::Inflate::inflate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InflateFlush {
    #[default]
    NoFlush = 0,
    SyncFlush = 2,
    Finish = 4,
    Block = 5,
}

/// An entry of an inflate decode table.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Code {
    /// operation, extra bits, table bits
    pub op: u8,
    /// bits in this part of the code
    pub bits: u8,
    /// offset in table or code value
    pub val: u16,
}

/// Status of a (resumable) stream operation.
///
/// `Ok`, `StreamEnd`, `NeedDict` and `BufError` describe where a cooperative
/// call left off; only the negative values other than `BufError` are fatal
/// for the stream.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(i32)]
pub enum ReturnCode {
    Ok = 0,
    StreamEnd = 1,
    NeedDict = 2,
    ErrNo = -1,
    StreamError = -2,
    DataError = -3,
    MemError = -4,
    BufError = -5,
    VersionError = -6,
}

impl ReturnCode {
    pub(crate) const fn error_message(self) -> &'static str {
        match self {
            ReturnCode::NeedDict => "need dictionary",
            ReturnCode::StreamEnd => "stream end",
            ReturnCode::Ok => "",
            ReturnCode::ErrNo => "file error",
            ReturnCode::StreamError => "stream error",
            ReturnCode::DataError => "data error",
            ReturnCode::MemError => "insufficient memory",
            ReturnCode::BufError => "buffer error",
            ReturnCode::VersionError => "incompatible version",
        }
    }
}

impl From<i32> for ReturnCode {
    fn from(value: i32) -> Self {
        use ReturnCode::*;

        match value {
            0 => Ok,
            1 => StreamEnd,
            2 => NeedDict,
            -1 => ErrNo,
            -2 => StreamError,
            -3 => DataError,
            -4 => MemError,
            -5 => BufError,
            -6 => VersionError,
            _ => panic!("invalid return code {value}"),
        }
    }
}

/// Failure of a one-shot operation, the closed set of zlib error kinds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("stream error: {0}")]
    Stream(&'static str),
    #[error("data error: {0}")]
    Data(&'static str),
    #[error("insufficient memory")]
    Mem,
    #[error("buffer error")]
    Buf,
    #[error("need dictionary")]
    NeedDict,
}

impl Error {
    pub(crate) fn from_return_code(code: ReturnCode, msg: Option<&'static str>) -> Self {
        let msg = msg.unwrap_or_else(|| code.error_message());
        match code {
            ReturnCode::StreamError => Error::Stream(msg),
            ReturnCode::DataError => Error::Data(msg),
            ReturnCode::MemError => Error::Mem,
            ReturnCode::BufError => Error::Buf,
            ReturnCode::NeedDict => Error::NeedDict,
            _ => Error::Stream(msg),
        }
    }
}

/// How far a resumable stream call got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// bytes of input consumed by this call
    pub consumed: usize,
    /// bytes of output produced by this call
    pub written: usize,
    pub status: ReturnCode,
}
