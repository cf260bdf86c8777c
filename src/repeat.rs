//! Repeat frame disambiguation
//!
//! While a button is held, the receiver stops re-sending the button's code
//! and emits the repeat sentinel instead. The filter absorbs a configured
//! number of those frames as debounce, then replays the last genuine code so
//! holding a button behaves like keyboard auto-repeat.

/// Reserved frame value meaning "the last button is still held". Only the
/// receiver boundary may produce it and only this filter consumes it.
pub const REPEAT_SENTINEL: u32 = 0;

/// What became of a raw frame.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Frame {
    /// Still inside the debounce window, nothing to dispatch.
    Suppressed,
    /// Dispatch this code.
    Code(u32),
}

pub struct RepeatFilter {
    handle_repeat: bool,
    delay_reports: u8,
    last_code: u32,
    count: u8,
}

impl RepeatFilter {
    pub fn new(handle_repeat: bool, delay_reports: u8) -> Self {
        RepeatFilter {
            handle_repeat,
            delay_reports,
            last_code: 0,
            count: 0,
        }
    }

    /// Pure state transition from a raw frame to its disposition.
    ///
    /// A genuine code always records itself and resets the debounce count.
    /// The sentinel never touches the last code. With repeat handling off
    /// the sentinel is passed through as an ordinary code, which will miss
    /// every lookup downstream.
    pub fn filter(&mut self, raw: u32) -> Frame {
        if raw == REPEAT_SENTINEL && self.handle_repeat {
            if self.count < self.delay_reports {
                self.count += 1;
                return Frame::Suppressed;
            }

            return Frame::Code(self.last_code);
        }

        self.last_code = raw;
        self.count = 0;

        Frame::Code(raw)
    }

    #[cfg(test)]
    fn count(&self) -> u8 {
        self.count
    }
}

#[test]
fn suppresses_until_threshold_then_replays() {
    let mut filter = RepeatFilter::new(true, 5);

    assert_eq!(filter.filter(0xdead_beef), Frame::Code(0xdead_beef));

    for _ in 0..5 {
        assert_eq!(filter.filter(REPEAT_SENTINEL), Frame::Suppressed);
    }

    // held past the debounce window: the last genuine code is replayed
    assert_eq!(filter.filter(REPEAT_SENTINEL), Frame::Code(0xdead_beef));
    assert_eq!(filter.filter(REPEAT_SENTINEL), Frame::Code(0xdead_beef));
}

#[test]
fn genuine_code_resets_count() {
    let mut filter = RepeatFilter::new(true, 3);

    filter.filter(0x11);
    filter.filter(REPEAT_SENTINEL);
    filter.filter(REPEAT_SENTINEL);
    assert_eq!(filter.count(), 2);

    assert_eq!(filter.filter(0x22), Frame::Code(0x22));
    assert_eq!(filter.count(), 0);

    // and the replayed code is now the new one
    filter.filter(REPEAT_SENTINEL);
    filter.filter(REPEAT_SENTINEL);
    filter.filter(REPEAT_SENTINEL);
    assert_eq!(filter.filter(REPEAT_SENTINEL), Frame::Code(0x22));
}

#[test]
fn disabled_passes_sentinel_through() {
    let mut filter = RepeatFilter::new(false, 5);

    filter.filter(0x33);
    assert_eq!(filter.filter(REPEAT_SENTINEL), Frame::Code(0));
    assert_eq!(filter.filter(REPEAT_SENTINEL), Frame::Code(0));
}

#[test]
fn zero_threshold_replays_immediately() {
    let mut filter = RepeatFilter::new(true, 0);

    filter.filter(0x33);
    assert_eq!(filter.filter(REPEAT_SENTINEL), Frame::Code(0x33));
}
