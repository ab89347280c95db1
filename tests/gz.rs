use std::fs::File;
use std::io::{self, BufRead, Read, Seek, SeekFrom, Write};

use zflate::gz::{GzError, GzHeader, GzipReader, GzipWriter};

fn gz_error(err: &io::Error) -> Option<&GzError> {
    err.get_ref().and_then(|e| e.downcast_ref::<GzError>())
}

#[test]
fn file_roundtrip() {
    let mut file = tempfile::tempfile().unwrap();

    {
        let mut writer = GzipWriter::new(&mut file);
        writer.write_all(b"line one\nline two\nline three\n").unwrap();
        writer.finish().unwrap();
    }

    file.seek(SeekFrom::Start(0)).unwrap();

    let mut reader = GzipReader::new(file);
    let mut contents = String::new();
    reader.read_to_string(&mut contents).unwrap();
    assert_eq!(contents, "line one\nline two\nline three\n");
}

#[test]
fn line_oriented_reads() {
    let mut writer = GzipWriter::new(Vec::new());
    writer.write_all(b"alpha\nbeta\ngamma\n").unwrap();
    let compressed = writer.finish().unwrap();

    let reader = GzipReader::new(compressed.as_slice());
    let lines: Vec<String> = reader.lines().collect::<Result<_, _>>().unwrap();
    assert_eq!(lines, ["alpha", "beta", "gamma"]);
}

#[test]
fn header_metadata_roundtrip() {
    let header = GzHeader {
        text: true,
        time: 1_700_000_000,
        extra: Some(vec![0xde, 0xad, 0xbe, 0xef]),
        name: Some(b"data.txt".to_vec()),
        comment: Some(b"test stream".to_vec()),
        hcrc: true,
        ..GzHeader::default()
    };

    let mut writer = GzipWriter::with_header(Vec::new(), header);
    writer.write_all(b"the payload").unwrap();
    let compressed = writer.finish().unwrap();

    let mut reader = GzipReader::new(compressed.as_slice());
    let mut decoded = Vec::new();
    reader.read_to_end(&mut decoded).unwrap();
    assert_eq!(decoded, b"the payload");

    let parsed = reader.header().expect("header should be parsed");
    assert!(parsed.text);
    assert_eq!(parsed.time, 1_700_000_000);
    assert_eq!(parsed.extra.as_deref(), Some(&[0xde, 0xad, 0xbe, 0xef][..]));
    assert_eq!(parsed.name.as_deref(), Some(&b"data.txt"[..]));
    assert_eq!(parsed.comment.as_deref(), Some(&b"test stream"[..]));
    assert!(parsed.hcrc);
}

#[test]
fn flush_makes_written_data_visible() {
    // after flush, everything written so far must decode from the bytes
    // emitted so far, without the trailer
    let mut writer = GzipWriter::new(Vec::new());
    writer.write_all(b"visible after flush").unwrap();
    writer.flush().unwrap();

    let partial = writer.get_ref().clone();
    assert!(!partial.is_empty());

    let mut reader = GzipReader::new(partial.as_slice());
    let mut buf = [0u8; 64];
    let n = reader.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"visible after flush");

    // the stream is unterminated, so reading past the data reports EOF
    let err = reader.read(&mut buf).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);

    writer.finish().unwrap();
}

#[test]
fn not_gzip_input() {
    let mut reader = GzipReader::new(&b"PK\x03\x04 this is a zip, not a gzip"[..]);
    let mut out = Vec::new();
    let err = reader.read_to_end(&mut out).unwrap_err();
    assert!(matches!(gz_error(&err), Some(GzError::NotGzip)));
}

#[test]
fn corrupt_payload_reports_crc_mismatch() {
    let mut writer = GzipWriter::new(Vec::new());
    writer.write_all(&vec![b'a'; 10_000]).unwrap();
    let mut compressed = writer.finish().unwrap();

    // corrupt the stored CRC32 in the trailer
    let crc_byte = compressed.len() - 8;
    compressed[crc_byte] ^= 0xff;

    let mut reader = GzipReader::new(compressed.as_slice());
    let mut out = Vec::new();
    let err = reader.read_to_end(&mut out).unwrap_err();
    assert!(matches!(gz_error(&err), Some(GzError::CrcMismatch)));
}

#[test]
fn corrupt_length_reports_length_mismatch() {
    let mut writer = GzipWriter::new(Vec::new());
    writer.write_all(b"sized payload").unwrap();
    let mut compressed = writer.finish().unwrap();

    // corrupt ISIZE, the last four bytes
    let isize_byte = compressed.len() - 4;
    compressed[isize_byte] ^= 0xff;

    let mut reader = GzipReader::new(compressed.as_slice());
    let mut out = Vec::new();
    let err = reader.read_to_end(&mut out).unwrap_err();
    assert!(matches!(gz_error(&err), Some(GzError::LengthMismatch)));
}

#[test]
fn truncated_file_is_unexpected_eof() {
    let mut file = tempfile::tempfile().unwrap();

    {
        let mut writer = GzipWriter::new(&mut file);
        writer.write_all(&vec![b'x'; 50_000]).unwrap();
        writer.finish().unwrap();
    }

    let len = file.seek(SeekFrom::End(0)).unwrap();
    file.set_len(len / 2).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();

    let mut reader = GzipReader::new(file);
    let mut out = Vec::new();
    let err = reader.read_to_end(&mut out).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
}

#[test]
fn large_file_roundtrip() {
    let mut data = Vec::with_capacity(1 << 20);
    let mut state = 0x12345678u32;
    while data.len() < 1 << 20 {
        state = state.wrapping_mul(1103515245).wrapping_add(12345);
        if state % 3 == 0 {
            data.extend_from_slice(b"repetitive section of the archive ");
        } else {
            data.push((state >> 17) as u8);
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.gz");

    {
        let file = File::create(&path).unwrap();
        let mut writer = GzipWriter::new(file);
        writer.write_all(&data).unwrap();
        writer.finish().unwrap();
    }

    let file = File::open(&path).unwrap();
    let mut reader = GzipReader::new(file);
    let mut decoded = Vec::new();
    reader.read_to_end(&mut decoded).unwrap();
    assert_eq!(decoded, data);
}
