//! Control-law building blocks shared by the actuator tasks.

pub mod pid;

pub use pid::{PidController, PidGains, PidLimits, PidTerms, SettleThresholds};

use crate::magnitude;

/// Largest effort magnitude any actuator accepts, in percent.
pub const MAX_EFFORT: f32 = 100.0;

/// Clamps a signed effort to `±MAX_EFFORT`. NaN maps to zero.
#[must_use]
pub fn clamp_effort(effort: f32) -> f32 {
    if effort.is_nan() {
        return 0.0;
    }
    effort.clamp(-MAX_EFFORT, MAX_EFFORT)
}

/// Lifts small non-zero efforts to `min_effort` so the motor overcomes static friction.
#[must_use]
pub fn compensate_deadband(effort: f32, min_effort: f32) -> f32 {
    if effort == 0.0 || magnitude(effort) >= min_effort {
        effort
    } else if effort > 0.0 {
        min_effort
    } else {
        -min_effort
    }
}

/// Soft travel limits in encoder counts.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SoftEndstops {
    pub min: i32,
    pub max: i32,
}

impl SoftEndstops {
    #[must_use]
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// Drops any effort that would push further past the limit already reached.
    #[must_use]
    pub fn limit(&self, position: i32, effort: f32) -> f32 {
        if (position >= self.max && effort > 0.0) || (position <= self.min && effort < 0.0) {
            0.0
        } else {
            effort
        }
    }
}

/// Rate limiter for set-and-forget actuators such as the flywheels.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SlewLimiter {
    current: f32,
    rate_per_ms: f32,
}

impl SlewLimiter {
    /// `rate_per_s` is the largest change in output per second.
    #[must_use]
    pub fn new(initial: f32, rate_per_s: f32) -> Self {
        Self {
            current: initial,
            rate_per_ms: rate_per_s / 1000.0,
        }
    }

    #[must_use]
    pub fn current(&self) -> f32 {
        self.current
    }

    /// Moves toward `target` by at most the allowed change over `elapsed_ms`.
    #[allow(clippy::cast_precision_loss)]
    pub fn advance(&mut self, target: f32, elapsed_ms: u64) -> f32 {
        let step = self.rate_per_ms * elapsed_ms as f32;
        let wanted = target - self.current;
        self.current += wanted.clamp(-step, step);
        self.current
    }
}
