//! Tables fixed by the deflate format (RFC 1951 section 3.2), computed in
//! const context from the canonical-code rule instead of being pasted as
//! literals.

use super::{TreeNode, D_CODES, LENGTH_CODES, L_CODES, MAX_BITS, STD_MIN_MATCH};

/// extra bits for each length code
pub(crate) const EXTRA_LBITS: [u8; LENGTH_CODES] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];

/// extra bits for each distance code
pub(crate) const EXTRA_DBITS: [u8; D_CODES] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13,
];

/// first length (minus `STD_MIN_MATCH`) covered by each length code
pub(crate) const BASE_LENGTH: [u8; LENGTH_CODES] = build_base_length();

/// first distance (minus one) covered by each distance code
pub(crate) const BASE_DIST: [u16; D_CODES] = build_base_dist();

/// maps a match length minus `STD_MIN_MATCH` to its length code
pub(crate) const LENGTH_CODE: [u8; 256] = build_length_code();

/// distance code lookup; the first 256 entries map distance minus one, the
/// second 256 entries map `(distance - 1) >> 7` for distances above 256
pub(crate) const DIST_CODE: [u8; 512] = build_dist_code();

/// the static literal/length tree (lengths 8/9/7/8 per the RFC)
pub(crate) const STATIC_LTREE: [TreeNode; L_CODES + 2] = build_static_ltree();

/// the static distance tree: 30 codes of 5 bits each
pub(crate) const STATIC_DTREE: [TreeNode; D_CODES] = build_static_dtree();

const fn build_base_length() -> [u8; LENGTH_CODES] {
    let mut base = [0u8; LENGTH_CODES];
    let mut length = 0usize;

    let mut code = 0;
    while code < LENGTH_CODES - 1 {
        base[code] = length as u8;
        length += 1 << EXTRA_LBITS[code];
        code += 1;
    }
    // code 28 (length 258) overlaps the end of the previous range and never
    // carries extra bits, so its base is not consulted
    debug_assert!(length == 256);

    base
}

const fn build_length_code() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut length = 0usize;

    let mut code = 0;
    while code < LENGTH_CODES - 1 {
        let mut n = 0;
        while n < 1 << EXTRA_LBITS[code] {
            table[length] = code as u8;
            length += 1;
            n += 1;
        }
        code += 1;
    }

    // the longest match length (258) gets its own code
    table[255] = (LENGTH_CODES - 1) as u8;

    table
}

const fn build_base_dist() -> [u16; D_CODES] {
    let mut base = [0u16; D_CODES];
    let mut dist = 0usize;

    let mut code = 0;
    while code < 16 {
        base[code] = dist as u16;
        dist += 1 << EXTRA_DBITS[code];
        code += 1;
    }
    debug_assert!(dist == 256);

    // from here on, all distances are divided by 128
    dist >>= 7;
    while code < D_CODES {
        base[code] = (dist << 7) as u16;
        dist += 1 << (EXTRA_DBITS[code] - 7);
        code += 1;
    }

    base
}

const fn build_dist_code() -> [u8; 512] {
    let mut table = [0u8; 512];
    let mut dist = 0usize;

    let mut code = 0;
    while code < 16 {
        let mut n = 0;
        while n < 1 << EXTRA_DBITS[code] {
            table[dist] = code as u8;
            dist += 1;
            n += 1;
        }
        code += 1;
    }

    dist >>= 7;
    while code < D_CODES {
        let mut n = 0;
        while n < 1 << (EXTRA_DBITS[code] - 7) {
            table[256 + dist] = code as u8;
            dist += 1;
            n += 1;
        }
        code += 1;
    }

    table
}

pub(crate) const fn bit_reverse(code: u16, len: usize) -> u16 {
    code.reverse_bits() >> (16 - len)
}

const fn build_static_ltree() -> [TreeNode; L_CODES + 2] {
    let mut len = [0u16; L_CODES + 2];

    let mut n = 0;
    while n < 144 {
        len[n] = 8;
        n += 1;
    }
    while n < 256 {
        len[n] = 9;
        n += 1;
    }
    while n < 280 {
        len[n] = 7;
        n += 1;
    }
    while n < L_CODES + 2 {
        len[n] = 8;
        n += 1;
    }

    // canonical code assignment, the same rule as gen_codes
    let mut bl_count = [0u16; MAX_BITS + 1];
    let mut n = 0;
    while n < L_CODES + 2 {
        bl_count[len[n] as usize] += 1;
        n += 1;
    }

    let mut next_code = [0u16; MAX_BITS + 1];
    let mut code = 0u16;
    let mut bits = 1;
    while bits <= MAX_BITS {
        code = (code + bl_count[bits - 1]) << 1;
        next_code[bits] = code;
        bits += 1;
    }

    let mut tree = [TreeNode::new(0, 0); L_CODES + 2];
    let mut n = 0;
    while n < L_CODES + 2 {
        let bits = len[n] as usize;
        tree[n] = TreeNode::new(bit_reverse(next_code[bits], bits), bits as u16);
        next_code[bits] += 1;
        n += 1;
    }

    tree
}

const fn build_static_dtree() -> [TreeNode; D_CODES] {
    let mut tree = [TreeNode::new(0, 0); D_CODES];

    let mut n = 0;
    while n < D_CODES {
        tree[n] = TreeNode::new(bit_reverse(n as u16, 5), 5);
        n += 1;
    }

    tree
}

/// The distance code for a (one-based) distance minus one.
pub(crate) const fn d_code(dist: usize) -> u8 {
    if dist < 256 {
        DIST_CODE[dist]
    } else {
        DIST_CODE[256 + (dist >> 7)]
    }
}

const _: () = assert!(STD_MIN_MATCH == 3);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_ltree_matches_rfc() {
        // RFC 1951 section 3.2.6: literal 0 is 8 bits, value 0b00110000;
        // codes are stored bit-reversed for LSB-first emission.
        assert_eq!(STATIC_LTREE[0].len(), 8);
        assert_eq!(STATIC_LTREE[0].code(), bit_reverse(0x30, 8));

        // end-of-block (256) is the 7-bit code 0.
        assert_eq!(STATIC_LTREE[256].len(), 7);
        assert_eq!(STATIC_LTREE[256].code(), 0);

        // literal 144 is the first 9-bit code, 0b110010000.
        assert_eq!(STATIC_LTREE[144].len(), 9);
        assert_eq!(STATIC_LTREE[144].code(), bit_reverse(0b110010000, 9));

        // symbol 280 is the first 8-bit code after the 7-bit block, 0b11000000.
        assert_eq!(STATIC_LTREE[280].len(), 8);
        assert_eq!(STATIC_LTREE[280].code(), bit_reverse(0b11000000, 8));
    }

    #[test]
    fn length_code_boundaries() {
        assert_eq!(LENGTH_CODE[0], 0); // length 3
        assert_eq!(LENGTH_CODE[7], 7); // length 10, last 0-extra code
        assert_eq!(LENGTH_CODE[8], 8); // length 11, first 1-extra code
        assert_eq!(LENGTH_CODE[254], 27); // length 257
        assert_eq!(LENGTH_CODE[255], 28); // length 258 has its own code
    }

    #[test]
    fn dist_code_boundaries() {
        assert_eq!(d_code(0), 0); // distance 1
        assert_eq!(d_code(3), 3); // distance 4
        assert_eq!(d_code(4), 4); // distance 5, first 1-extra code
        assert_eq!(d_code(255), 15); // distance 256
        assert_eq!(d_code(256), 16); // distance 257
        assert_eq!(d_code(32767), 29); // distance 32768
    }

    #[test]
    fn base_tables_consistent() {
        for (code, &base) in BASE_DIST.iter().enumerate() {
            assert_eq!(d_code(base as usize), code as u8);
        }
        for (code, &base) in BASE_LENGTH.iter().enumerate().take(28) {
            assert_eq!(LENGTH_CODE[base as usize], code as u8);
        }
    }
}
