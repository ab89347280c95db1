use crate::{Code, ENOUGH_DISTS, ENOUGH_LENS};

/// Whether a table decodes code length codes, literal/length codes, or
/// distance codes; determines the base value and extra-bit tables applied to
/// the decoded symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CodeType {
    Codes,
    Lens,
    Dists,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum InflateTable {
    /// the number of bits of the root table
    Success(usize),
    /// over-subscribed or incomplete set of lengths
    Failure,
}

const MAX_BITS: usize = 15;

/// Length codes 257..=285: base match lengths and extra bits. The op values
/// 77 and 202 mark the two invalid codes 286 and 287.
const LBASE: [u16; 31] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115, 131,
    163, 195, 227, 258, 0, 0,
];
const LEXT: [u16; 31] = [
    16, 16, 16, 16, 16, 16, 16, 16, 17, 17, 17, 17, 18, 18, 18, 18, 19, 19, 19, 19, 20, 20, 20, 20,
    21, 21, 21, 21, 16, 77, 202,
];

/// Distance codes 0..=29: base distances and extra bits.
const DBASE: [u16; 32] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577, 0, 0,
];
const DEXT: [u16; 32] = [
    16, 16, 16, 16, 17, 17, 18, 18, 19, 19, 20, 20, 21, 21, 22, 22, 23, 23, 24, 24, 25, 25, 26, 26,
    27, 27, 28, 28, 29, 29, 64, 64,
];

/// Build a multi-level decode table for a canonical Huffman code given by the
/// code lengths `lens[..codes]`.
///
/// The root table resolves up to `bits` bits at once; longer codes chain into
/// sub-tables stored after it. `work` is scratch space for the symbols sorted
/// by code length. Returns the resulting root bit count, or `Failure` when
/// the lengths do not describe a valid complete code (a code with a single
/// symbol of one bit is accepted as incomplete for length and distance
/// tables, per the convention inherited from PKZIP).
pub(crate) fn inflate_table(
    codetype: CodeType,
    lens: &[u16],
    codes: usize,
    table: &mut [Code],
    bits: usize,
    work: &mut [u16; 288],
) -> InflateTable {
    // number of codes of each length
    let mut count = [0u16; MAX_BITS + 1];
    for &len in &lens[..codes] {
        count[len as usize] += 1;
    }

    let mut root = bits;

    let mut max = MAX_BITS;
    while max >= 1 {
        if count[max] != 0 {
            break;
        }
        max -= 1;
    }

    if max == 0 {
        // no symbols at all; make a table anyway so that decoding fails with
        // an invalid-code error instead of indexing garbage
        let invalid = Code {
            op: 64,
            bits: 1,
            val: 0,
        };
        table[0] = invalid;
        table[1] = invalid;
        return InflateTable::Success(1);
    }

    root = Ord::min(root, max);

    let mut min = 1;
    while min < max {
        if count[min] != 0 {
            break;
        }
        min += 1;
    }
    root = Ord::max(root, min);

    // check for an over-subscribed or incomplete set of lengths
    let mut left = 1i32;
    for len in 1..=MAX_BITS {
        left <<= 1;
        left -= count[len] as i32;
        if left < 0 {
            return InflateTable::Failure;
        }
    }
    if left > 0 && (codetype == CodeType::Codes || max != 1) {
        return InflateTable::Failure;
    }

    // offsets into the sorted symbol table for each length
    let mut offs = [0u16; MAX_BITS + 1];
    for len in 1..MAX_BITS {
        offs[len + 1] = offs[len] + count[len];
    }

    // sort symbols by length, by symbol order within each length
    for (sym, &len) in lens[..codes].iter().enumerate() {
        if len != 0 {
            work[offs[len as usize] as usize] = sym as u16;
            offs[len as usize] += 1;
        }
    }

    let (base, extra, match_): (&[u16], &[u16], usize) = match codetype {
        CodeType::Codes => (&[], &[], 20),
        CodeType::Lens => (&LBASE, &LEXT, 257),
        CodeType::Dists => (&DBASE, &DEXT, 0),
    };

    let mut huff = 0usize; // code value, bit-reversed
    let mut sym = 0usize; // index into work
    let mut len = min; // current code length
    let mut next = 0usize; // index of the current (sub-)table
    let mut curr = root; // bits of the current table
    let mut drop_ = 0usize; // bits dropped before indexing sub-tables
    let mut low = usize::MAX; // trigger for a new sub-table
    let mut used = 1usize << root;
    let mask = used - 1;

    if (codetype == CodeType::Lens && used > ENOUGH_LENS)
        || (codetype == CodeType::Dists && used > ENOUGH_DISTS)
    {
        return InflateTable::Failure;
    }

    loop {
        // entry for this symbol
        let here = if (work[sym] as usize) + 1 < match_ {
            Code {
                op: 0,
                bits: (len - drop_) as u8,
                val: work[sym],
            }
        } else if (work[sym] as usize) >= match_ {
            Code {
                op: extra[work[sym] as usize - match_] as u8,
                bits: (len - drop_) as u8,
                val: base[work[sym] as usize - match_],
            }
        } else {
            // end-of-block
            Code {
                op: 32 + 64,
                bits: (len - drop_) as u8,
                val: 0,
            }
        };

        // replicate the entry for every table index whose low bits match
        let incr = 1usize << (len - drop_);
        let mut fill = 1usize << curr;
        let min_ = fill;
        loop {
            fill -= incr;
            table[next + (huff >> drop_) + fill] = here;
            if fill == 0 {
                break;
            }
        }

        // advance to the next code, in bit-reversed order
        let mut incr = 1usize << (len - 1);
        while huff & incr != 0 {
            incr >>= 1;
        }
        if incr != 0 {
            huff &= incr - 1;
            huff += incr;
        } else {
            huff = 0;
        }

        sym += 1;
        count[len] -= 1;
        if count[len] == 0 {
            if len == max {
                break;
            }
            len = lens[work[sym] as usize] as usize;
        }

        // open a new sub-table when the code got longer than the root covers
        // and the low root bits changed
        if len > root && (huff & mask) != low {
            if drop_ == 0 {
                drop_ = root;
            }

            next += min_;

            // size of the new sub-table: enough for the longest code that
            // shares these low bits
            curr = len - drop_;
            let mut left = 1i32 << curr;
            while curr + drop_ < max {
                left -= count[curr + drop_] as i32;
                if left <= 0 {
                    break;
                }
                curr += 1;
                left <<= 1;
            }

            used += 1usize << curr;
            if (codetype == CodeType::Lens && used > ENOUGH_LENS)
                || (codetype == CodeType::Dists && used > ENOUGH_DISTS)
            {
                return InflateTable::Failure;
            }

            // link to the sub-table from the root entry
            low = huff & mask;
            table[low] = Code {
                op: curr as u8,
                bits: root as u8,
                val: next as u16,
            };
        }
    }

    // an incomplete code leaves exactly one table entry undefined
    if huff != 0 {
        table[next + (huff >> drop_)] = Code {
            op: 64,
            bits: (len - drop_) as u8,
            val: 0,
        };
    }

    InflateTable::Success(root)
}
