/// The deflate sliding window: the last `w_size` bytes of history followed by
/// room for `w_size` bytes of lookahead.
///
/// The buffer is zero initialized, so `longest_match` may read a couple of
/// bytes past the lookahead without observing stale data; any overlong match
/// that produces is clamped to the lookahead by the caller.
#[derive(Debug)]
pub(crate) struct Window {
    buf: Box<[u8]>,
}

impl Window {
    pub fn new(window_size: usize) -> Self {
        Self {
            buf: vec![0; window_size].into_boxed_slice(),
        }
    }

    pub fn filled(&self) -> &[u8] {
        &self.buf
    }

    pub fn filled_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    /// Drop the oldest `w_size` bytes by moving the upper half down.
    pub fn slide(&mut self, w_size: usize) {
        self.buf.copy_within(w_size.., 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slide_moves_upper_half_down() {
        let mut window = Window::new(8);
        window.filled_mut().copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        window.slide(4);
        assert_eq!(&window.filled()[..4], &[5, 6, 7, 8]);
    }
}
