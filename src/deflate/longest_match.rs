use super::{State, STD_MAX_MATCH, STD_MIN_MATCH};

/// Find the longest match for the string at `strstart` among the candidates
/// on the hash chain starting at `cur_match`.
///
/// Sets `state.match_start` when a match at least as long as the previous one
/// is found. The returned length never exceeds the lookahead; the window
/// buffer is zero filled past the valid data, so a comparison may run a few
/// bytes long but the clamp at the end discards the excess.
pub(crate) fn longest_match(state: &mut State, mut cur_match: u16) -> usize {
    let window = state.window.filled();
    let strstart = state.strstart;
    let w_mask = state.w_mask;

    let mut chain_length = state.max_chain_length;
    let mut best_len = state.prev_length;
    let mut match_start = state.match_start;

    // stop once a match is "long enough", or when the lookahead runs out
    let nice_match = Ord::min(state.nice_match, state.lookahead);

    // candidates at or below this position are too far back
    let limit = if strstart > state.max_dist() {
        (strstart - state.max_dist()) as u16
    } else {
        0
    };

    // an already-good match from the previous step is not worth chasing far
    if state.prev_length >= state.good_match {
        chain_length >>= 2;
    }

    debug_assert!(strstart <= state.window_size - super::MIN_LOOKAHEAD);
    let scan = &window[strstart..];
    let max_len = Ord::min(STD_MAX_MATCH, scan.len());

    loop {
        let match_pos = cur_match as usize;
        debug_assert!(match_pos < strstart);

        // cheap rejects first: the byte that would beat the current best,
        // then the first two bytes of the candidate
        if window[match_pos + best_len] == scan[best_len]
            && window[match_pos + best_len - 1] == scan[best_len - 1]
            && window[match_pos] == scan[0]
            && window[match_pos + 1] == scan[1]
        {
            let len = 2 + common_prefix(&window[match_pos + 2..], &scan[2..], max_len - 2);

            if len > best_len {
                match_start = match_pos;
                best_len = len;
                if len >= nice_match {
                    break;
                }
            }
        }

        chain_length -= 1;
        if chain_length == 0 {
            break;
        }

        cur_match = state.prev[match_pos & w_mask];
        if cur_match <= limit {
            break;
        }
    }

    state.match_start = match_start;
    Ord::min(best_len, state.lookahead)
}

fn common_prefix(a: &[u8], b: &[u8], max: usize) -> usize {
    a.iter()
        .zip(b.iter())
        .take(max)
        .take_while(|(x, y)| x == y)
        .count()
}

const _: () = assert!(STD_MIN_MATCH - 1 == 2);

#[cfg(test)]
mod tests {
    use super::common_prefix;

    #[test]
    fn common_prefix_counts_and_caps() {
        assert_eq!(common_prefix(b"abcdef", b"abcxef", 6), 3);
        assert_eq!(common_prefix(b"abcdef", b"abcdef", 4), 4);
        assert_eq!(common_prefix(b"x", b"y", 8), 0);
    }
}
