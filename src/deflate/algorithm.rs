//! The block-splitting strategies that drive the match finder.

use crate::{
    deflate::{
        fill_window, flush_block_only,
        hash_calc::{insert_string, quick_insert_string, update_hash},
        BlockState, DeflateStream, Strategy, MIN_LOOKAHEAD, STD_MAX_MATCH, STD_MIN_MATCH,
    },
    Flush,
};

/// Matches of length 3 are discarded if their distance exceeds this.
const TOO_FAR: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeflateAlgorithm {
    Stored,
    Fast,
    Slow,
}

/// Tuning knobs per compression level; `tune` can override them.
pub(crate) struct Config {
    /// reduce lazy search above this match length
    pub good_length: u16,
    /// do not perform lazy search above this match length
    pub max_lazy: u16,
    /// quit search above this match length
    pub nice_length: u16,
    pub max_chain: u16,
    pub func: DeflateAlgorithm,
}

impl Config {
    const fn new(
        good_length: u16,
        max_lazy: u16,
        nice_length: u16,
        max_chain: u16,
        func: DeflateAlgorithm,
    ) -> Self {
        Self {
            good_length,
            max_lazy,
            nice_length,
            max_chain,
            func,
        }
    }
}

pub(crate) const CONFIGURATION_TABLE: [Config; 10] = {
    use DeflateAlgorithm::*;

    [
        Config::new(0, 0, 0, 0, Stored),   // 0: store only
        Config::new(4, 4, 8, 4, Fast),     // 1: max speed, no lazy matches
        Config::new(4, 5, 16, 8, Fast),    // 2
        Config::new(4, 6, 32, 32, Fast),   // 3
        Config::new(4, 4, 16, 16, Slow),   // 4: lazy matches from here on
        Config::new(8, 16, 32, 32, Slow),  // 5
        Config::new(8, 16, 128, 128, Slow), // 6: default
        Config::new(8, 32, 128, 256, Slow), // 7
        Config::new(32, 128, 258, 1024, Slow), // 8
        Config::new(32, 258, 258, 4096, Slow), // 9: max compression
    ]
};

pub(crate) fn run(stream: &mut DeflateStream, flush: Flush) -> BlockState {
    match stream.state.strategy {
        _ if stream.state.level == 0 => deflate_stored(stream, flush),
        Strategy::HuffmanOnly => deflate_huff(stream, flush),
        Strategy::Rle => deflate_rle(stream, flush),
        _ => match CONFIGURATION_TABLE[stream.state.level as usize].func {
            DeflateAlgorithm::Stored => deflate_stored(stream, flush),
            DeflateAlgorithm::Fast => deflate_fast(stream, flush),
            DeflateAlgorithm::Slow => deflate_slow(stream, flush),
        },
    }
}

macro_rules! flush_block {
    ($stream:expr, $is_last:expr) => {
        flush_block_only($stream, $is_last);
        if $stream.avail_out() == 0 {
            return if $is_last {
                BlockState::FinishStarted
            } else {
                BlockState::NeedMore
            };
        }
    };
}

/// Copy the input to the output as stored blocks, without compression.
fn deflate_stored(stream: &mut DeflateStream, flush: Flush) -> BlockState {
    // stored blocks are limited to 64K-1 bytes and must also fit in the
    // pending buffer together with their 5 byte header
    let max_block_size = Ord::min(0xffff, stream.state.pending.capacity() - 5);

    loop {
        // fill the window with as much input as fits
        if stream.state.lookahead <= 1 {
            fill_window(stream);
            if stream.state.lookahead == 0 && flush == Flush::NoFlush {
                return BlockState::NeedMore;
            }
            if stream.state.lookahead == 0 {
                break;
            }
        }

        let state = &mut *stream.state;
        state.strstart += state.lookahead;
        state.lookahead = 0;

        // emit a stored block whenever it reaches the size limit
        let max_start = state.block_start as usize + max_block_size;
        if state.strstart >= max_start {
            stream.state.lookahead = stream.state.strstart - max_start;
            stream.state.strstart = max_start;
            flush_block!(stream, false);
        }

        // flush if the window is about to run out of room
        let state = &mut *stream.state;
        if state.strstart - state.block_start as usize >= state.max_dist() {
            flush_block!(stream, false);
        }
    }

    stream.state.insert = 0;

    if flush == Flush::Finish {
        flush_block!(stream, true);
        return BlockState::FinishDone;
    }

    if stream.state.block_start < stream.state.strstart as isize {
        flush_block!(stream, false);
    }

    BlockState::BlockDone
}

/// Greedy matching: take the first acceptable match and move on.
fn deflate_fast(stream: &mut DeflateStream, flush: Flush) -> BlockState {
    loop {
        // keep a full lookahead unless the input is exhausted; the lookahead
        // must cover one maximum match plus the next hash insert
        if stream.state.lookahead < MIN_LOOKAHEAD {
            fill_window(stream);
            if stream.state.lookahead < MIN_LOOKAHEAD && flush == Flush::NoFlush {
                return BlockState::NeedMore;
            }
            if stream.state.lookahead == 0 {
                break;
            }
        }

        let state = &mut *stream.state;
        let mut hash_head = 0;
        if state.lookahead >= STD_MIN_MATCH {
            hash_head = quick_insert_string(state, state.strstart);
        }

        if hash_head != 0 && state.strstart - hash_head as usize <= state.max_dist() {
            state.match_length = super::longest_match::longest_match(state, hash_head);
        }

        let bflush;
        if state.match_length >= STD_MIN_MATCH {
            bflush = state.tally_dist(
                state.strstart - state.match_start,
                state.match_length - STD_MIN_MATCH,
            );
            state.lookahead -= state.match_length;

            // insert the new strings the match skipped over, unless the
            // match is long enough that updating the hash is not worth it
            if state.match_length <= state.max_lazy_match && state.lookahead >= STD_MIN_MATCH {
                insert_string(state, state.strstart + 1, state.match_length - 1);
                state.strstart += state.match_length;
            } else {
                state.strstart += state.match_length;
                let window = state.window.filled();
                state.ins_h = window[state.strstart] as u32;
                state.ins_h = update_hash(state, state.ins_h, window[state.strstart + 1]);
            }
            state.match_length = 0;
        } else {
            let lc = state.window.filled()[state.strstart];
            bflush = state.tally_lit(lc);
            state.lookahead -= 1;
            state.strstart += 1;
        }

        if bflush {
            flush_block!(stream, false);
        }
    }

    let state = &mut *stream.state;
    state.insert = Ord::min(state.strstart, STD_MIN_MATCH - 1);

    if flush == Flush::Finish {
        flush_block!(stream, true);
        return BlockState::FinishDone;
    }

    if !stream.state.sym_buf.is_empty() {
        flush_block!(stream, false);
    }

    BlockState::BlockDone
}

/// Lazy matching: defer each match by one byte to see if the next position
/// yields a longer one.
fn deflate_slow(stream: &mut DeflateStream, flush: Flush) -> BlockState {
    loop {
        if stream.state.lookahead < MIN_LOOKAHEAD {
            fill_window(stream);
            if stream.state.lookahead < MIN_LOOKAHEAD && flush == Flush::NoFlush {
                return BlockState::NeedMore;
            }
            if stream.state.lookahead == 0 {
                break;
            }
        }

        let state = &mut *stream.state;
        let mut hash_head = 0;
        if state.lookahead >= STD_MIN_MATCH {
            hash_head = quick_insert_string(state, state.strstart);
        }

        // previous match becomes the candidate to beat
        state.prev_length = state.match_length;
        state.prev_match = state.match_start as u16;
        state.match_length = STD_MIN_MATCH - 1;

        if hash_head != 0
            && state.prev_length < state.max_lazy_match
            && state.strstart - hash_head as usize <= state.max_dist()
        {
            state.match_length = super::longest_match::longest_match(state, hash_head);

            // drop short matches that are likely noise: far 3-byte matches
            // cost more bits than the literals they replace
            if state.match_length <= 5
                && (state.strategy == Strategy::Filtered
                    || (state.match_length == STD_MIN_MATCH
                        && state.strstart - state.match_start > TOO_FAR))
            {
                state.match_length = STD_MIN_MATCH - 1;
            }
        }

        if state.prev_length >= STD_MIN_MATCH && state.match_length <= state.prev_length {
            let max_insert = state.strstart + state.lookahead - STD_MIN_MATCH;

            let bflush = state.tally_dist(
                state.strstart - 1 - state.prev_match as usize,
                state.prev_length - STD_MIN_MATCH,
            );

            // the previous match wins; insert the strings it covers, minus
            // the two positions already hashed
            state.lookahead -= state.prev_length - 1;
            let count = Ord::min(
                state.prev_length - 2,
                max_insert.saturating_sub(state.strstart),
            );
            insert_string(state, state.strstart + 1, count);
            state.strstart += state.prev_length - 1;

            state.prev_length = 0;
            state.match_available = false;
            state.match_length = STD_MIN_MATCH - 1;

            if bflush {
                flush_block!(stream, false);
            }
        } else if state.match_available {
            // no improvement on the previous position, emit its literal
            let lc = state.window.filled()[state.strstart - 1];
            let bflush = state.tally_lit(lc);
            if bflush {
                flush_block_only(stream, false);
            }
            stream.state.strstart += 1;
            stream.state.lookahead -= 1;
            if stream.avail_out() == 0 {
                return BlockState::NeedMore;
            }
        } else {
            // first byte of a possible match, wait for the next position
            state.match_available = true;
            state.strstart += 1;
            state.lookahead -= 1;
        }
    }

    debug_assert_ne!(flush, Flush::NoFlush);

    let state = &mut *stream.state;
    if state.match_available {
        let lc = state.window.filled()[state.strstart - 1];
        state.tally_lit(lc);
        state.match_available = false;
    }
    state.insert = Ord::min(state.strstart, STD_MIN_MATCH - 1);

    if flush == Flush::Finish {
        flush_block!(stream, true);
        return BlockState::FinishDone;
    }

    if !stream.state.sym_buf.is_empty() {
        flush_block!(stream, false);
    }

    BlockState::BlockDone
}

/// Run-length encoding: only distance-one matches, for PNG-style filtered
/// data.
fn deflate_rle(stream: &mut DeflateStream, flush: Flush) -> BlockState {
    loop {
        // a run can extend one maximum match past the window, so keep that
        // much lookahead around
        if stream.state.lookahead <= STD_MAX_MATCH {
            fill_window(stream);
            if stream.state.lookahead <= STD_MAX_MATCH && flush == Flush::NoFlush {
                return BlockState::NeedMore;
            }
            if stream.state.lookahead == 0 {
                break;
            }
        }

        let state = &mut *stream.state;

        // find a run of the byte before strstart
        state.match_length = 0;
        if state.lookahead >= STD_MIN_MATCH && state.strstart > 0 {
            let window = state.window.filled();
            let prev_byte = window[state.strstart - 1];
            if prev_byte == window[state.strstart] && prev_byte == window[state.strstart + 1] {
                let scan = &window[state.strstart + 2..];
                let run = 2 + scan.iter().take_while(|&&b| b == prev_byte).count();
                state.match_length = Ord::min(run, Ord::min(STD_MAX_MATCH, state.lookahead));
            }
        }

        let bflush;
        if state.match_length >= STD_MIN_MATCH {
            bflush = state.tally_dist(1, state.match_length - STD_MIN_MATCH);
            state.lookahead -= state.match_length;
            state.strstart += state.match_length;
            state.match_length = 0;
        } else {
            let lc = state.window.filled()[state.strstart];
            bflush = state.tally_lit(lc);
            state.lookahead -= 1;
            state.strstart += 1;
        }

        if bflush {
            flush_block!(stream, false);
        }
    }

    stream.state.insert = 0;

    if flush == Flush::Finish {
        flush_block!(stream, true);
        return BlockState::FinishDone;
    }

    if !stream.state.sym_buf.is_empty() {
        flush_block!(stream, false);
    }

    BlockState::BlockDone
}

/// Huffman-only coding: every byte is emitted as a literal.
fn deflate_huff(stream: &mut DeflateStream, flush: Flush) -> BlockState {
    loop {
        if stream.state.lookahead == 0 {
            fill_window(stream);
            if stream.state.lookahead == 0 {
                if flush == Flush::NoFlush {
                    return BlockState::NeedMore;
                }
                break;
            }
        }

        let state = &mut *stream.state;
        state.match_length = 0;
        let lc = state.window.filled()[state.strstart];
        let bflush = state.tally_lit(lc);
        state.lookahead -= 1;
        state.strstart += 1;
        if bflush {
            flush_block!(stream, false);
        }
    }

    stream.state.insert = 0;

    if flush == Flush::Finish {
        flush_block!(stream, true);
        return BlockState::FinishDone;
    }

    if !stream.state.sym_buf.is_empty() {
        flush_block!(stream, false);
    }

    BlockState::BlockDone
}
