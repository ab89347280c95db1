use super::State;

/// Correct the hash chains after the window slid down by `w_size` bytes.
///
/// Positions below `w_size` have left the window; mapping them to `NIL` (0)
/// via the saturating subtraction terminates their chains.
pub(crate) fn slide_hash(state: &mut State) {
    let w_size = state.w_size as u16;
    slide_hash_chain(&mut state.head, w_size);
    slide_hash_chain(&mut state.prev, w_size);
}

fn slide_hash_chain(table: &mut [u16], w_size: u16) {
    for m in table.iter_mut() {
        *m = m.saturating_sub(w_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_shift_or_terminate() {
        let mut table = [0, 4096, 4097, 8192, 65535];
        slide_hash_chain(&mut table, 4096);
        assert_eq!(table, [0, 0, 1, 4096, 61439]);
    }
}
