//! Single-slot shared registers.
//!
//! Every value that crosses a task boundary lives in a [`Share`]. A register
//! holds exactly one `Copy` value; readers always observe the most recent
//! write. There is no queue and no history. By convention each mode or
//! command register has exactly one writer, while sensor registers may be read
//! by several consumers.
//!
//! The controller runs every task on one cooperative execution context, so a
//! register is a plain [`Cell`]: stores are single writes and never race.

use core::cell::Cell;
use core::fmt;

/// Typed last-write-wins register.
pub struct Share<T: Copy> {
    name: &'static str,
    value: Cell<T>,
}

impl<T: Copy> Share<T> {
    #[must_use]
    pub const fn new(name: &'static str, initial: T) -> Self {
        Self {
            name,
            value: Cell::new(initial),
        }
    }

    /// Returns the most recently written value.
    #[must_use]
    pub fn get(&self) -> T {
        self.value.get()
    }

    /// Overwrites the stored value.
    pub fn put(&self, value: T) {
        self.value.set(value);
    }

    /// Overwrites the stored value and returns the previous one.
    pub fn replace(&self, value: T) -> T {
        self.value.replace(value)
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T: Copy + fmt::Debug> fmt::Debug for Share<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Share")
            .field("name", &self.name)
            .field("value", &self.value.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_write_wins() {
        let share = Share::new("flag", false);
        assert!(!share.get());
        share.put(true);
        share.put(false);
        share.put(true);
        assert!(share.get());
    }

    #[test]
    fn replace_returns_previous_value() {
        let share = Share::new("count", 3_u32);
        assert_eq!(share.replace(7), 3);
        assert_eq!(share.get(), 7);
        assert_eq!(share.name(), "count");
    }
}
