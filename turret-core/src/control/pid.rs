//! PID control law with anti-windup, staleness reset and a settled predicate.
//!
//! Time is integer milliseconds. The integral term accumulates
//! `Ki * error * delta_ms`, and the derivative term is expressed per
//! millisecond, so gains are tuned against the controller's native tick.

use crate::{Millis, magnitude};

/// Default bound on `|P + I|` beyond which the integrator stops accumulating.
pub const DEFAULT_SATURATION: f32 = 100.0;

/// Default gap after which the previous sample is considered stale.
pub const DEFAULT_STALE_AFTER_MS: Millis = 250;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PidGains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
}

impl PidGains {
    #[must_use]
    pub const fn new(kp: f32, ki: f32, kd: f32) -> Self {
        Self { kp, ki, kd }
    }
}

/// Exclusive thresholds for [`PidController::is_settled`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SettleThresholds {
    pub error: f32,
    /// Error rate per millisecond.
    pub derivative: f32,
}

impl SettleThresholds {
    #[must_use]
    pub const fn new(error: f32, derivative: f32) -> Self {
        Self { error, derivative }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PidLimits {
    /// Largest `|P + I|` for which the integrator may grow.
    pub saturation: f32,
    /// Gaps longer than this reset the integrator.
    pub stale_after_ms: Millis,
}

impl PidLimits {
    pub const DEFAULT: Self = Self {
        saturation: DEFAULT_SATURATION,
        stale_after_ms: DEFAULT_STALE_AFTER_MS,
    };
}

impl Default for PidLimits {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Contributions of the most recent [`PidController::run`].
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PidTerms {
    pub proportional: f32,
    pub integral: f32,
    pub derivative: f32,
}

impl PidTerms {
    #[must_use]
    pub fn actuation(&self) -> f32 {
        self.proportional + self.integral + self.derivative
    }
}

/// Stateful PID controller; one instance per control loop.
#[derive(Clone, Debug)]
pub struct PidController {
    gains: PidGains,
    settle: SettleThresholds,
    limits: PidLimits,
    setpoint: f32,
    integral: f32,
    error: f32,
    error_derivative: f32,
    last_time: Millis,
    terms: PidTerms,
    has_run: bool,
}

impl PidController {
    /// Creates a controller with zeroed history, timestamped at `now`.
    #[must_use]
    pub fn new(gains: PidGains, setpoint: f32, settle: SettleThresholds, now: Millis) -> Self {
        Self {
            gains,
            settle,
            limits: PidLimits::DEFAULT,
            setpoint,
            integral: 0.0,
            error: 0.0,
            error_derivative: 0.0,
            last_time: now,
            terms: PidTerms::default(),
            has_run: false,
        }
    }

    #[must_use]
    pub fn with_limits(mut self, limits: PidLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Changes the target without clearing the integrator or error history.
    pub fn set_setpoint(&mut self, setpoint: f32) {
        self.setpoint = setpoint;
    }

    #[must_use]
    pub fn setpoint(&self) -> f32 {
        self.setpoint
    }

    pub fn set_gains(&mut self, gains: PidGains) {
        self.gains = gains;
    }

    #[must_use]
    pub fn gains(&self) -> PidGains {
        self.gains
    }

    #[must_use]
    pub fn integral(&self) -> f32 {
        self.integral
    }

    /// Error seen by the most recent `run`.
    #[must_use]
    pub fn error(&self) -> f32 {
        self.error
    }

    #[must_use]
    pub fn error_derivative(&self) -> f32 {
        self.error_derivative
    }

    #[must_use]
    pub fn terms(&self) -> PidTerms {
        self.terms
    }

    /// Clears accumulated state as if the controller had just been created at `now`.
    pub fn reset(&mut self, now: Millis) {
        self.integral = 0.0;
        self.error = 0.0;
        self.error_derivative = 0.0;
        self.last_time = now;
        self.terms = PidTerms::default();
        self.has_run = false;
    }

    /// Computes the actuation for `measured` at time `now`.
    #[allow(clippy::cast_precision_loss)]
    pub fn run(&mut self, measured: f32, now: Millis) -> f32 {
        let error = self.setpoint - measured;

        let mut delta_ms = now.saturating_sub(self.last_time);
        if delta_ms > self.limits.stale_after_ms {
            self.integral = 0.0;
            delta_ms = 0;
        }
        let delta = delta_ms as f32;

        let error_derivative = if self.has_run && delta_ms > 0 {
            (error - self.error) / delta
        } else {
            0.0
        };

        let proportional = self.gains.kp * error;
        let derivative = self.gains.kd * error_derivative;

        let candidate = self.integral + self.gains.ki * error * delta;
        if magnitude(proportional + candidate) <= self.limits.saturation {
            self.integral = candidate;
        }

        self.terms = PidTerms {
            proportional,
            integral: self.integral,
            derivative,
        };
        self.error = error;
        self.error_derivative = error_derivative;
        self.last_time = now;
        self.has_run = true;

        self.terms.actuation()
    }

    /// True when both the last error and its rate sit strictly inside the thresholds.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.has_run
            && magnitude(self.error) < self.settle.error
            && magnitude(self.error_derivative) < self.settle.derivative
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    const SETTLE: SettleThresholds = SettleThresholds::new(2.0, 1.0);

    #[test]
    fn first_run_has_no_derivative() {
        let mut pid = PidController::new(PidGains::new(1.0, 0.0, 5.0), 10.0, SETTLE, 0);
        let out = pid.run(0.0, 20);
        assert_eq!(pid.error_derivative(), 0.0);
        assert_eq!(out, 10.0);
    }

    #[test]
    fn zero_delta_has_no_derivative_or_integral_growth() {
        let mut pid = PidController::new(PidGains::new(1.0, 0.5, 5.0), 10.0, SETTLE, 0);
        pid.run(0.0, 10);
        let integral = pid.integral();
        pid.run(4.0, 10);
        assert_eq!(pid.error_derivative(), 0.0);
        assert_eq!(pid.integral(), integral);
    }

    #[test]
    fn derivative_is_per_millisecond() {
        let mut pid = PidController::new(PidGains::new(0.0, 0.0, 2.0), 0.0, SETTLE, 0);
        pid.run(-10.0, 10);
        let out = pid.run(-4.0, 12);
        assert_eq!(pid.error_derivative(), -3.0);
        assert_eq!(out, -6.0);
    }

    #[test]
    fn integral_accumulates_error_times_delta() {
        let mut pid = PidController::new(PidGains::new(0.0, 0.5, 0.0), 4.0, SETTLE, 0);
        pid.run(0.0, 10);
        assert_eq!(pid.integral(), 20.0);
        pid.run(2.0, 20);
        assert_eq!(pid.integral(), 30.0);
    }

    #[test]
    fn setpoint_change_keeps_history() {
        let mut pid = PidController::new(PidGains::new(1.0, 0.1, 0.0), 5.0, SETTLE, 0);
        pid.run(0.0, 10);
        let integral = pid.integral();
        pid.set_setpoint(50.0);
        assert_eq!(pid.setpoint(), 50.0);
        assert_eq!(pid.integral(), integral);
    }

    #[test]
    fn reset_clears_state() {
        let mut pid = PidController::new(PidGains::new(1.0, 0.1, 0.0), 5.0, SETTLE, 0);
        pid.run(0.0, 10);
        pid.run(0.0, 20);
        pid.reset(30);
        assert_eq!(pid.integral(), 0.0);
        assert!(!pid.is_settled());
        pid.run(0.0, 40);
        assert_eq!(pid.error_derivative(), 0.0);
    }

    #[test]
    fn not_settled_before_first_run() {
        let pid = PidController::new(PidGains::new(1.0, 0.0, 0.0), 0.0, SETTLE, 0);
        assert!(!pid.is_settled());
    }
}
