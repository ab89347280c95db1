//! Adler-32 (RFC 1950 section 8.2).

/// largest prime smaller than 65536
const BASE: u32 = 65521;

/// NMAX is the largest n such that 255n(n+1)/2 + (n+1)(BASE-1) <= 2^32-1,
/// i.e. the longest run of bytes that can be summed before the accumulators
/// must be reduced mod BASE.
const NMAX: usize = 5552;

/// Updates a running Adler-32 checksum with `data`. The initial value for a
/// fresh checksum is 1; `adler32(adler, &[])` returns `adler` unchanged.
pub fn adler32(start_checksum: u32, data: &[u8]) -> u32 {
    let mut adler = start_checksum & 0xffff;
    let mut sum2 = (start_checksum >> 16) & 0xffff;

    // short inputs are common (single bytes during header processing); a
    // plain loop with one deferred reduction beats the batched path there
    if data.len() < 16 {
        for &byte in data {
            adler += byte as u32;
            sum2 += adler;
        }
        if adler >= BASE {
            adler -= BASE;
        }
        sum2 %= BASE;

        return (sum2 << 16) | adler;
    }

    // defer the modulo: the accumulators cannot overflow within NMAX bytes
    for chunk in data.chunks(NMAX) {
        let mut iter = chunk.chunks_exact(16);
        for group in &mut iter {
            for &byte in group {
                adler += byte as u32;
                sum2 += adler;
            }
        }
        for &byte in iter.remainder() {
            adler += byte as u32;
            sum2 += adler;
        }

        adler %= BASE;
        sum2 %= BASE;
    }

    (sum2 << 16) | adler
}

#[cfg(test)]
mod test {
    use super::*;

    // inefficient but correct, useful for testing
    fn naive_adler32(start_checksum: u32, data: &[u8]) -> u32 {
        let mut a = start_checksum & 0xFFFF;
        let mut b = (start_checksum >> 16) & 0xFFFF;

        for &byte in data {
            a = (a + byte as u32) % BASE;
            b = (b + a) % BASE;
        }

        (b << 16) | a
    }

    #[test]
    fn identity_value() {
        assert_eq!(adler32(1, &[]), 1);
        assert_eq!(adler32(42, &[]), 42);
    }

    #[test]
    fn known_vectors() {
        assert_eq!(adler32(1, b"abc"), 0x024d0127);
        assert_eq!(adler32(1, b"Wikipedia"), 0x11E60398);
    }

    #[test]
    fn naive_is_batched_small_inputs() {
        for i in 0..128 {
            let v = (0u8..i).collect::<Vec<_>>();
            assert_eq!(naive_adler32(1, &v), adler32(1, &v));
        }
    }

    #[test]
    fn nmax_boundary() {
        for len in [NMAX - 1, NMAX, NMAX + 1, 2 * NMAX, 32768] {
            let v: Vec<u8> = (0..len).map(|i| (i * 7 + 13) as u8).collect();
            assert_eq!(naive_adler32(1, &v), adler32(1, &v), "len = {len}");
        }
    }

    quickcheck::quickcheck! {
        fn batched_is_naive(v: Vec<u8>, start: u32) -> bool {
            adler32(start & 0xffff_ffff, &v) == naive_adler32(start, &v)
        }

        fn split_is_whole(v: Vec<u8>, at: usize) -> bool {
            let at = if v.is_empty() { 0 } else { at % v.len() };
            let (a, b) = v.split_at(at);
            adler32(adler32(1, a), b) == adler32(1, &v)
        }
    }
}
