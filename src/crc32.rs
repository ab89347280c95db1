//! CRC-32 (RFC 1952 section 8), the reflected polynomial `0xEDB88320`.

use crate::CRC32_INITIAL_VALUE;

/// Process-wide read-only lookup table, one entry per byte value.
static CRC_TABLE: [u32; 256] = build_crc_table();

const fn build_crc_table() -> [u32; 256] {
    const POLY: u32 = 0xEDB88320;

    let mut table = [0u32; 256];
    let mut n = 0;
    while n < 256 {
        let mut c = n as u32;
        let mut k = 0;
        while k < 8 {
            c = if c & 1 != 0 { POLY ^ (c >> 1) } else { c >> 1 };
            k += 1;
        }
        table[n] = c;
        n += 1;
    }

    table
}

/// Updates a running CRC-32 with `data`. The initial value for a fresh
/// checksum is 0; the pre- and post-conditioning XOR with `0xFFFFFFFF`
/// happens inside, so values compose: `crc32(crc32(0, a), b) == crc32(0, ab)`.
pub fn crc32(start: u32, data: &[u8]) -> u32 {
    let mut c = !start;

    for &byte in data {
        c = CRC_TABLE[((c ^ byte as u32) & 0xff) as usize] ^ (c >> 8);
    }

    !c
}

/// A fold-style accumulator, for call sites that checksum incrementally.
#[derive(Debug, Clone, Copy)]
pub struct Crc32Fold {
    value: u32,
}

impl Default for Crc32Fold {
    fn default() -> Self {
        Self::new()
    }
}

impl Crc32Fold {
    pub const fn new() -> Self {
        Self {
            value: CRC32_INITIAL_VALUE,
        }
    }

    pub fn fold(&mut self, src: &[u8]) {
        self.value = crc32(self.value, src);
    }

    pub const fn finish(self) -> u32 {
        self.value
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const INPUT: [u8; 1024] = {
        let mut array = [0; 1024];
        let mut i = 0;
        while i < array.len() {
            array[i] = i as u8;
            i += 1;
        }

        array
    };

    #[test]
    fn known_vectors() {
        assert_eq!(crc32(0, b""), 0);
        assert_eq!(crc32(0, b"abc"), 0x352441C2);
        assert_eq!(crc32(0, b"123456789"), 0xCBF43926);
    }

    #[test]
    fn test_crc32_long_input() {
        let mut h = crc32fast::Hasher::new_with_initial(CRC32_INITIAL_VALUE);
        h.update(&INPUT);
        assert_eq!(crc32(CRC32_INITIAL_VALUE, &INPUT), h.finalize());
    }

    #[test]
    fn test_crc32_fold() {
        let mut h = crc32fast::Hasher::new_with_initial(CRC32_INITIAL_VALUE);
        h.update(&INPUT);

        let mut fold = Crc32Fold::new();
        for chunk in INPUT.chunks(17) {
            fold.fold(chunk);
        }
        assert_eq!(fold.finish(), h.finalize());
    }

    quickcheck::quickcheck! {
        fn crc32_is_crc32fast(v: Vec<u8>, start: u32) -> bool {
            let mut h = crc32fast::Hasher::new_with_initial(start);
            h.update(&v);

            crc32(start, &v) == h.finalize()
        }
    }
}
