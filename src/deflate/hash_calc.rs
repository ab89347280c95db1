//! Rolling hash over `STD_MIN_MATCH` bytes, used to index the chained hash
//! table of previous string positions.
//!
//! The hash of position `p` covers the bytes `p..p + 3`; folding in one byte
//! at a time keeps the hash incremental as the scan position advances. The
//! shift and mask depend on the configured memory level and live in `State`.

use super::{State, HASH_CALC_OFFSET};

pub(crate) fn update_hash(state: &State, h: u32, val: u8) -> u32 {
    ((h << state.hash_shift) ^ val as u32) & state.hash_mask
}

/// Insert the string at `string` into the hash chains and return the previous
/// head of its chain. Requires `state.ins_h` to already cover the two bytes
/// before the rolled-in one.
pub(crate) fn quick_insert_string(state: &mut State, string: usize) -> u16 {
    let byte = state.window.filled()[string + HASH_CALC_OFFSET];
    state.ins_h = update_hash(state, state.ins_h, byte);

    let hm = state.ins_h as usize;
    let head = state.head[hm];
    if head != string as u16 {
        state.prev[string & state.w_mask] = head;
        state.head[hm] = string as u16;
    }

    head
}

/// Insert `count` consecutive strings starting at `string`.
pub(crate) fn insert_string(state: &mut State, string: usize, count: usize) {
    for pos in string..string + count {
        let byte = state.window.filled()[pos + HASH_CALC_OFFSET];
        state.ins_h = update_hash(state, state.ins_h, byte);

        let hm = state.ins_h as usize;
        let head = state.head[hm];
        if head != pos as u16 {
            state.prev[pos & state.w_mask] = head;
            state.head[hm] = pos as u16;
        }
    }
}
