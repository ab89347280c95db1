//! The gzip container (RFC 1952): header metadata and a file-like layer over
//! [`Deflate`] and [`Inflate`].

use std::io::{self, BufRead, Read, Write};

use crate::deflate::{Deflate, DeflateConfig};
use crate::inflate::{Inflate, InflateConfig};
use crate::{Flush, InflateFlush, ReturnCode, MAX_WBITS};

/// OS code for "unix", the conventional value to write regardless of host.
pub(crate) const OS_CODE: u8 = 3;

const BUFFER_SIZE: usize = 16 * 1024;

/// The metadata fields of a gzip member header.
///
/// When compressing, pass one to [`Deflate::set_header`] (or
/// [`GzipWriter::with_header`]) before producing any output. When
/// decompressing, [`Inflate::request_header`] collects the parsed fields.
/// `name` and `comment` are stored without their NUL terminators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GzHeader {
    pub text: bool,
    /// modification time, seconds since the Unix epoch
    pub time: u32,
    pub xflags: u8,
    pub os: u8,
    pub extra: Option<Vec<u8>>,
    pub name: Option<Vec<u8>>,
    pub comment: Option<Vec<u8>>,
    /// write (or demand) a CRC-16 over the header itself
    pub hcrc: bool,
}

impl Default for GzHeader {
    fn default() -> Self {
        Self {
            text: false,
            time: 0,
            xflags: 0,
            os: OS_CODE,
            extra: None,
            name: None,
            comment: None,
            hcrc: false,
        }
    }
}

impl GzHeader {
    /// The FLG byte: FTEXT, FHCRC, FEXTRA, FNAME, FCOMMENT.
    pub(crate) fn flags(&self) -> u8 {
        (self.text as u8)
            | (self.hcrc as u8) << 1
            | (self.extra.is_some() as u8) << 2
            | (self.name.is_some() as u8) << 3
            | (self.comment.is_some() as u8) << 4
    }
}

/// Failure while reading or writing a gzip stream.
#[derive(Debug, thiserror::Error)]
pub enum GzError {
    #[error("input is not in gzip format")]
    NotGzip,
    #[error("unknown compression method")]
    UnsupportedMethod,
    #[error("header crc mismatch")]
    HeaderCrcMismatch,
    #[error("incorrect data check")]
    CrcMismatch,
    #[error("incorrect length check")]
    LengthMismatch,
    #[error("unexpected end of gzip stream")]
    UnexpectedEof,
    #[error("corrupt deflate stream: {0}")]
    Corrupt(&'static str),
    #[error(transparent)]
    Io(#[from] io::Error),
}

fn into_io_error(err: GzError) -> io::Error {
    let kind = match &err {
        GzError::UnexpectedEof => io::ErrorKind::UnexpectedEof,
        GzError::Io(inner) => inner.kind(),
        _ => io::ErrorKind::InvalidData,
    };
    io::Error::new(kind, err)
}

fn map_data_error(msg: Option<&'static str>) -> GzError {
    match msg {
        Some("incorrect header check") => GzError::NotGzip,
        Some("unknown compression method") => GzError::UnsupportedMethod,
        Some("header crc mismatch") => GzError::HeaderCrcMismatch,
        Some("incorrect data check") => GzError::CrcMismatch,
        Some("incorrect length check") => GzError::LengthMismatch,
        Some(msg) => GzError::Corrupt(msg),
        None => GzError::Corrupt("data error"),
    }
}

/// Compresses everything written to it into a gzip member on the underlying
/// writer. The trailer is only emitted by [`finish`](Self::finish); dropping
/// the writer without finishing produces a truncated stream.
pub struct GzipWriter<W: Write> {
    inner: W,
    deflate: Deflate,
    buf: Box<[u8]>,
}

impl<W: Write> GzipWriter<W> {
    pub fn new(inner: W) -> Self {
        Self::with_header(inner, GzHeader::default())
    }

    /// Like [`new`](Self::new), with header metadata to emit.
    pub fn with_header(inner: W, header: GzHeader) -> Self {
        let config = DeflateConfig {
            window_bits: MAX_WBITS + 16,
            ..DeflateConfig::default()
        };

        // the configuration is valid and the stream is in its initial state,
        // so neither call can fail
        let Ok(mut deflate) = Deflate::new(config) else {
            unreachable!()
        };
        let Ok(()) = deflate.set_header(header) else {
            unreachable!()
        };

        Self {
            inner,
            deflate,
            buf: vec![0; BUFFER_SIZE].into_boxed_slice(),
        }
    }

    /// Finish the stream, write the trailer, and hand back the writer.
    pub fn finish(mut self) -> Result<W, GzError> {
        loop {
            let progress = self.deflate.deflate(&[], &mut self.buf, Flush::Finish);
            self.inner.write_all(&self.buf[..progress.written])?;

            match progress.status {
                ReturnCode::StreamEnd => break,
                _ if progress.written > 0 => continue,
                _ => {
                    return Err(GzError::Io(io::Error::other(
                        "deflate stream made no progress",
                    )))
                }
            }
        }

        self.inner.flush()?;
        Ok(self.inner)
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }
}

impl<W: Write> Write for GzipWriter<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut consumed = 0;

        while consumed < data.len() {
            let progress = self
                .deflate
                .deflate(&data[consumed..], &mut self.buf, Flush::NoFlush);
            consumed += progress.consumed;
            self.inner.write_all(&self.buf[..progress.written])?;

            if progress.consumed == 0 && progress.written == 0 {
                return Err(io::Error::other("deflate stream made no progress"));
            }
        }

        Ok(consumed)
    }

    fn flush(&mut self) -> io::Result<()> {
        loop {
            let progress = self.deflate.deflate(&[], &mut self.buf, Flush::SyncFlush);
            self.inner.write_all(&self.buf[..progress.written])?;

            // a full scratch buffer means there is more to drain
            if progress.written < self.buf.len() {
                break;
            }
        }

        self.inner.flush()
    }
}

impl<W: Write> core::fmt::Debug for GzipWriter<W> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GzipWriter")
            .field("deflate", &self.deflate)
            .finish_non_exhaustive()
    }
}

/// Decompresses a gzip member from the underlying reader.
///
/// Implements [`Read`] and [`BufRead`], so line-oriented access comes via
/// `read_line`/`lines`. Malformed input surfaces as an [`io::Error`] wrapping
/// the specific [`GzError`]; a stream that ends before its trailer is
/// [`GzError::UnexpectedEof`], never silent partial output.
pub struct GzipReader<R: Read> {
    inner: R,
    inflate: Inflate,
    in_buf: Box<[u8]>,
    in_pos: usize,
    in_len: usize,
    out_buf: Box<[u8]>,
    out_pos: usize,
    out_len: usize,
    done: bool,
}

impl<R: Read> GzipReader<R> {
    pub fn new(inner: R) -> Self {
        let config = InflateConfig {
            window_bits: MAX_WBITS + 16,
        };

        // valid config, and the wrapper accepts gzip, so neither call fails
        let Ok(mut inflate) = Inflate::new(config) else {
            unreachable!()
        };
        let Ok(()) = inflate.request_header() else {
            unreachable!()
        };

        Self {
            inner,
            inflate,
            in_buf: vec![0; BUFFER_SIZE].into_boxed_slice(),
            in_pos: 0,
            in_len: 0,
            out_buf: vec![0; BUFFER_SIZE].into_boxed_slice(),
            out_pos: 0,
            out_len: 0,
            done: false,
        }
    }

    /// The member's header fields, once enough input has been read to parse
    /// them.
    pub fn header(&self) -> Option<&GzHeader> {
        self.inflate.header()
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> BufRead for GzipReader<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        while self.out_pos == self.out_len && !self.done {
            if self.in_pos == self.in_len {
                self.in_len = self.inner.read(&mut self.in_buf)?;
                self.in_pos = 0;

                if self.in_len == 0 {
                    return Err(into_io_error(GzError::UnexpectedEof));
                }
            }

            let progress = self.inflate.inflate(
                &self.in_buf[self.in_pos..self.in_len],
                &mut self.out_buf,
                InflateFlush::NoFlush,
            );
            self.in_pos += progress.consumed;
            self.out_pos = 0;
            self.out_len = progress.written;

            match progress.status {
                ReturnCode::StreamEnd => self.done = true,
                ReturnCode::Ok | ReturnCode::BufError => (),
                ReturnCode::DataError => {
                    return Err(into_io_error(map_data_error(self.inflate.msg())))
                }
                _ => return Err(into_io_error(GzError::Corrupt("inflate failed"))),
            }
        }

        Ok(&self.out_buf[self.out_pos..self.out_len])
    }

    fn consume(&mut self, amt: usize) {
        self.out_pos = Ord::min(self.out_pos + amt, self.out_len);
    }
}

impl<R: Read> Read for GzipReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = Ord::min(available.len(), buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl<R: Read> core::fmt::Debug for GzipReader<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GzipReader")
            .field("inflate", &self.inflate)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_flags_byte() {
        let header = GzHeader {
            text: true,
            hcrc: true,
            name: Some(b"x".to_vec()),
            ..GzHeader::default()
        };
        assert_eq!(header.flags(), 1 | 2 | 8);

        assert_eq!(GzHeader::default().flags(), 0);
    }

    #[test]
    fn writer_reader_roundtrip() {
        let mut writer = GzipWriter::new(Vec::new());
        writer.write_all(b"hello gzip world").unwrap();
        let compressed = writer.finish().unwrap();

        let mut reader = GzipReader::new(compressed.as_slice());
        let mut decoded = String::new();
        reader.read_to_string(&mut decoded).unwrap();
        assert_eq!(decoded, "hello gzip world");
    }

    #[test]
    fn reader_rejects_non_gzip_input() {
        let mut reader = GzipReader::new(&b"definitely not gzip data"[..]);
        let mut out = Vec::new();
        let err = reader.read_to_end(&mut out).unwrap_err();
        let gz = err.get_ref().and_then(|e| e.downcast_ref::<GzError>());
        assert!(matches!(gz, Some(GzError::NotGzip)));
    }

    #[test]
    fn truncated_stream_is_unexpected_eof() {
        let mut writer = GzipWriter::new(Vec::new());
        writer.write_all(b"some data that will be cut off").unwrap();
        let compressed = writer.finish().unwrap();

        let truncated = &compressed[..compressed.len() - 5];
        let mut reader = GzipReader::new(truncated);
        let mut out = Vec::new();
        let err = reader.read_to_end(&mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
