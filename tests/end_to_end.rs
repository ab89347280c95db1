use zflate::deflate::{self, Deflate, DeflateConfig, Strategy};
use zflate::inflate::{self, Inflate, InflateConfig};
use zflate::{Flush, InflateFlush, ReturnCode};

fn roundtrip(data: &[u8], config: DeflateConfig) -> Vec<u8> {
    let compressed = deflate::compress_to_vec(data, config).unwrap();

    let inflate_config = InflateConfig {
        window_bits: match config.window_bits {
            w if w < 0 => w,
            w if w > 15 => 15 + 16,
            _ => 15,
        },
    };

    inflate::uncompress_to_vec(&compressed, inflate_config).unwrap()
}

// a compressible but not trivial corpus
fn corpus(len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(len);
    let mut state = 0x2545f491u32;
    while out.len() < len {
        state = state.wrapping_mul(1103515245).wrapping_add(12345);
        match state % 7 {
            0..=3 => out.extend_from_slice(b"the quick brown fox "),
            4 | 5 => out.extend_from_slice(b"jumps over "),
            _ => out.push((state >> 16) as u8),
        }
    }
    out.truncate(len);
    out
}

#[test]
fn roundtrip_all_levels() {
    let data = corpus(100_000);

    for level in 0..=9 {
        let config = DeflateConfig::new(level);
        assert_eq!(roundtrip(&data, config), data, "level {level}");
    }
}

#[test]
fn roundtrip_all_strategies() {
    let data = corpus(50_000);

    for strategy in [
        Strategy::Default,
        Strategy::Filtered,
        Strategy::HuffmanOnly,
        Strategy::Rle,
        Strategy::Fixed,
    ] {
        let config = DeflateConfig {
            strategy,
            ..DeflateConfig::default()
        };
        assert_eq!(roundtrip(&data, config), data, "{strategy:?}");
    }
}

#[test]
fn roundtrip_raw_and_gzip_wrappers() {
    let data = corpus(20_000);

    for window_bits in [-15, -9, 9, 15, 15 + 16] {
        let config = DeflateConfig {
            window_bits,
            ..DeflateConfig::default()
        };
        assert_eq!(roundtrip(&data, config), data, "window_bits {window_bits}");
    }
}

#[test]
fn roundtrip_boundary_sizes() {
    // 5552 is the adler32 modulo block size
    for size in [0, 1, 2, 255, 5552, 5553, 32768, 65536] {
        let data = corpus(size);
        assert_eq!(roundtrip(&data, DeflateConfig::default()), data, "{size}");
    }
}

#[test]
fn chunked_decoding_matches_one_shot() {
    let data = corpus(80_000);
    let compressed = deflate::compress_to_vec(&data, DeflateConfig::default()).unwrap();

    let one_shot = inflate::uncompress_to_vec(&compressed, InflateConfig::default()).unwrap();

    for chunk_size in [1, 7, 512, 4096] {
        let mut inflate = Inflate::new(InflateConfig::default()).unwrap();
        let mut decoded = Vec::new();
        let mut out = vec![0u8; 1024];
        let mut status = ReturnCode::Ok;

        for chunk in compressed.chunks(chunk_size) {
            let mut pos = 0;
            loop {
                let progress = inflate.inflate(&chunk[pos..], &mut out, InflateFlush::NoFlush);
                pos += progress.consumed;
                decoded.extend_from_slice(&out[..progress.written]);
                status = progress.status;

                assert!(
                    !matches!(status, ReturnCode::DataError | ReturnCode::StreamError),
                    "chunk size {chunk_size}: {status:?}",
                );

                if pos == chunk.len() || status == ReturnCode::StreamEnd {
                    break;
                }
            }
        }

        assert_eq!(status, ReturnCode::StreamEnd, "chunk size {chunk_size}");
        assert_eq!(decoded, one_shot, "chunk size {chunk_size}");
    }
}

#[test]
fn chunked_encoding_matches_one_shot() {
    let data = corpus(60_000);
    let one_shot = deflate::compress_to_vec(&data, DeflateConfig::default()).unwrap();

    let mut deflate = Deflate::new(DeflateConfig::default()).unwrap();
    let mut compressed = Vec::new();
    let mut out = vec![0u8; 997];

    for chunk in data.chunks(1234) {
        let mut pos = 0;
        while pos < chunk.len() {
            let progress = deflate.deflate(&chunk[pos..], &mut out, Flush::NoFlush);
            pos += progress.consumed;
            compressed.extend_from_slice(&out[..progress.written]);
        }
    }

    loop {
        let progress = deflate.deflate(&[], &mut out, Flush::Finish);
        compressed.extend_from_slice(&out[..progress.written]);
        if progress.status == ReturnCode::StreamEnd {
            break;
        }
    }

    assert_eq!(compressed, one_shot);
}

#[test]
fn sync_flush_prefix_is_decodable() {
    let mut deflate = Deflate::new(DeflateConfig::default()).unwrap();
    let mut out = vec![0u8; 4096];

    let first = b"the first half of the payload, ";
    let progress = deflate.deflate(first, &mut out, Flush::SyncFlush);
    assert_eq!(progress.status, ReturnCode::Ok);
    let flushed = progress.written;

    // everything up to the sync point decodes on its own
    let mut inflate = Inflate::new(InflateConfig::default()).unwrap();
    let mut decoded = vec![0u8; 256];
    let progress = inflate.inflate(&out[..flushed], &mut decoded, InflateFlush::SyncFlush);
    assert_eq!(progress.status, ReturnCode::Ok);
    assert_eq!(&decoded[..progress.written], first);

    // and the stream remains usable afterwards
    let second = b"and the second half";
    let mut tail = vec![0u8; 4096];
    let progress2 = deflate.deflate(second, &mut tail, Flush::Finish);
    assert_eq!(progress2.status, ReturnCode::StreamEnd);

    let progress = inflate.inflate(
        &tail[..progress2.written],
        &mut decoded,
        InflateFlush::Finish,
    );
    assert_eq!(progress.status, ReturnCode::StreamEnd);
    assert_eq!(&decoded[..progress.written], second);
}

#[test]
fn preset_dictionary_roundtrip() {
    let dictionary = b"a common preamble shared by both sides";
    let data = b"a common preamble shared by both sides, then the payload";

    let mut deflate = Deflate::new(DeflateConfig::default()).unwrap();
    deflate.set_dictionary(dictionary).unwrap();

    let mut compressed = vec![0u8; 4096];
    let progress = deflate.deflate(data, &mut compressed, Flush::Finish);
    assert_eq!(progress.status, ReturnCode::StreamEnd);
    let compressed = &compressed[..progress.written];

    let mut inflate = Inflate::new(InflateConfig::default()).unwrap();
    let mut decoded = vec![0u8; 4096];

    let progress = inflate.inflate(compressed, &mut decoded, InflateFlush::NoFlush);
    assert_eq!(progress.status, ReturnCode::NeedDict);

    // the wrong dictionary is rejected by its adler32
    assert!(inflate.set_dictionary(b"not the dictionary").is_err());
    inflate.set_dictionary(dictionary).unwrap();

    let progress = inflate.inflate(
        &compressed[progress.consumed..],
        &mut decoded,
        InflateFlush::Finish,
    );
    assert_eq!(progress.status, ReturnCode::StreamEnd);
    assert_eq!(&decoded[..progress.written], data);
}

#[test]
fn sync_recovers_after_corruption() {
    let mut deflate = Deflate::new(DeflateConfig::default()).unwrap();
    let mut out = vec![0u8; 4096];

    let progress = deflate.deflate(b"first packet", &mut out, Flush::FullFlush);
    assert_eq!(progress.status, ReturnCode::Ok);
    let first_len = progress.written;

    let progress = deflate.deflate(b"second packet", &mut out[first_len..], Flush::Finish);
    assert_eq!(progress.status, ReturnCode::StreamEnd);
    let total_len = first_len + progress.written;

    // skip the first packet entirely and resynchronize on its flush marker
    let mut inflate = Inflate::new(InflateConfig::default()).unwrap();
    let (consumed, code) = inflate.sync(&out[..total_len]);
    assert_eq!(code, ReturnCode::Ok);

    // the second packet decodes from the sync point on
    let mut decoded = vec![0u8; 256];
    let progress = inflate.inflate(
        &out[consumed..total_len],
        &mut decoded,
        InflateFlush::NoFlush,
    );
    assert_eq!(&decoded[..progress.written], b"second packet");
}

#[test]
fn sync_point_after_sync_flush() {
    let mut deflate = Deflate::new(DeflateConfig::default()).unwrap();
    let mut out = vec![0u8; 4096];
    let progress = deflate.deflate(b"payload", &mut out, Flush::SyncFlush);
    assert_eq!(progress.status, ReturnCode::Ok);

    // drop the empty stored block's length bytes, as PPP does
    let stripped = &out[..progress.written - 4];

    let mut inflate = Inflate::new(InflateConfig::default()).unwrap();
    let mut decoded = vec![0u8; 256];
    let progress = inflate.inflate(stripped, &mut decoded, InflateFlush::NoFlush);
    assert_eq!(progress.status, ReturnCode::Ok);
    assert!(inflate.sync_point());
}

#[test]
fn incompressible_data_roundtrip() {
    // pseudo-random bytes do not compress; they must still survive
    let mut data = Vec::with_capacity(70_000);
    let mut state = 0x9e3779b9u32;
    for _ in 0..70_000 {
        state = state.wrapping_mul(1103515245).wrapping_add(12345);
        data.push((state >> 23) as u8);
    }

    for level in [1, 6, 9] {
        let config = DeflateConfig::new(level);
        assert_eq!(roundtrip(&data, config), data, "level {level}");
    }
}

#[test]
fn gzip_crc_corruption_is_detected() {
    let data = corpus(10_000);
    let config = DeflateConfig {
        window_bits: 15 + 16,
        ..DeflateConfig::default()
    };
    let mut compressed = deflate::compress_to_vec(&data, config).unwrap();

    // flip a bit in the stored CRC (the trailer is CRC32 then ISIZE)
    let crc_byte = compressed.len() - 8;
    compressed[crc_byte] ^= 0x01;

    let config = InflateConfig {
        window_bits: 15 + 16,
    };
    let err = inflate::uncompress_to_vec(&compressed, config).unwrap_err();
    assert_eq!(err, zflate::Error::Data("incorrect data check"));
}

#[test]
fn checksum_test_vectors() {
    assert_eq!(zflate::crc32(0, b"abc"), 0x352441C2);
    assert_eq!(zflate::crc32(0, b""), 0);
    assert_eq!(zflate::adler32(1, b""), 1);
    assert_eq!(zflate::adler32(1, b"abc"), 0x024d0127);

    // cross-validate our crc32 against an independent implementation
    let data = corpus(10_000);
    assert_eq!(zflate::crc32(0, &data), crc32fast::hash(&data));
}

#[test]
fn window_spanning_matches_decode_correctly() {
    // matches that reach back across multiple inflate calls force the
    // decoder through its window copy paths
    let mut data = corpus(40_000);
    let tail = data[..300].to_vec();
    data.extend_from_slice(&tail);

    let compressed = deflate::compress_to_vec(&data, DeflateConfig::new(9)).unwrap();

    let mut inflate = Inflate::new(InflateConfig::default()).unwrap();
    let mut decoded = Vec::new();
    let mut out = vec![0u8; 512];

    let mut pos = 0;
    loop {
        let progress = inflate.inflate(&compressed[pos..], &mut out, InflateFlush::NoFlush);
        pos += progress.consumed;
        decoded.extend_from_slice(&out[..progress.written]);
        match progress.status {
            ReturnCode::StreamEnd => break,
            ReturnCode::Ok | ReturnCode::BufError => (),
            code => panic!("{code:?}"),
        }
    }

    assert_eq!(decoded, data);
}

#[test]
fn quickcheck_roundtrip() {
    fn prop(data: Vec<u8>, level: u8) -> bool {
        let config = DeflateConfig::new((level % 10) as i32);
        roundtrip(&data, config) == data
    }

    quickcheck::QuickCheck::new()
        .tests(100)
        .quickcheck(prop as fn(Vec<u8>, u8) -> bool);
}
