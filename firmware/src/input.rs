//! Button conditioning: debouncing and edge detection.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

/// Accepts a new level only after it has been sampled continuously for
/// `hold_ms`, however often `update` is called.
#[derive(Copy, Clone, Debug)]
pub struct Debouncer {
    stable: bool,
    /// When the raw level first differed from `stable`.
    changing_since: Option<u64>,
    hold_ms: u64,
}

impl Debouncer {
    #[must_use]
    pub const fn new(hold_ms: u64) -> Self {
        Self {
            stable: false,
            changing_since: None,
            hold_ms,
        }
    }

    pub fn update(&mut self, raw: bool, now_ms: u64) -> bool {
        if raw == self.stable {
            self.changing_since = None;
        } else {
            let since = *self.changing_since.get_or_insert(now_ms);
            if now_ms.saturating_sub(since) >= self.hold_ms {
                self.stable = raw;
                self.changing_since = None;
            }
        }
        self.stable
    }
}

/// Reports `true` exactly once per rising edge.
#[derive(Copy, Clone, Debug, Default)]
pub struct RisingEdge {
    previous: bool,
}

impl RisingEdge {
    pub fn update(&mut self, level: bool) -> bool {
        let rising = level && !self.previous;
        self.previous = level;
        rising
    }
}
