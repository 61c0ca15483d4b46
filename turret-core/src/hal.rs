//! Hardware seams consumed by the control tasks.
//!
//! The firmware implements these against STM32 timers and UARTs; the emulator
//! and tests implement them against simulated plants.

/// Bidirectional DC motor. `percent` is signed effort in `-100..=100`;
/// the sign selects direction and zero disengages the bridge.
pub trait Motor {
    fn set_duty_cycle(&mut self, percent: f32);
}

/// Unidirectional speed-controlled motor (flywheel ESC), `0..=100` percent.
pub trait Flywheel {
    fn set_percent(&mut self, percent: f32);
}

/// Two-position firing servo.
pub trait Servo {
    /// Move to the firing angle.
    fn set(&mut self);
    /// Move back to the rest angle.
    fn back(&mut self);
    fn is_set(&self) -> bool;
}

/// Cumulative position feedback in encoder counts.
pub trait PositionSensor {
    /// Samples the hardware and returns the overflow-corrected position.
    fn read(&mut self) -> i32;
    /// Declares the current physical position to be zero.
    fn zero(&mut self);
    /// Counts moved between the two most recent reads.
    fn delta(&self) -> i32;
}

/// Non-blocking byte source for the camera link.
pub trait CameraLink {
    fn read_byte(&mut self) -> Option<u8>;
}

/// Debounced digital input, polled once per outer iteration.
pub trait DigitalInput {
    fn is_active(&mut self) -> bool;
}

/// Extends a wrapping 16-bit hardware counter into a cumulative position.
///
/// Consecutive samples are assumed to differ by less than half the counter
/// range, so a raw difference beyond that is an overflow in the other
/// direction.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct EncoderCounter {
    last_raw: u16,
    position: i32,
    delta: i32,
}

impl EncoderCounter {
    #[must_use]
    pub const fn new(initial_raw: u16) -> Self {
        Self {
            last_raw: initial_raw,
            position: 0,
            delta: 0,
        }
    }

    /// Folds in a fresh raw sample and returns the cumulative position.
    #[allow(clippy::cast_possible_wrap)]
    pub fn update(&mut self, raw: u16) -> i32 {
        self.delta = i32::from(raw.wrapping_sub(self.last_raw) as i16);
        self.last_raw = raw;
        self.position = self.position.wrapping_add(self.delta);
        self.position
    }

    pub fn zero(&mut self) {
        self.position = 0;
    }

    #[must_use]
    pub const fn position(&self) -> i32 {
        self.position
    }

    #[must_use]
    pub const fn delta(&self) -> i32 {
        self.delta
    }
}
