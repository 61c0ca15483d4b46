//! Flywheel speed with pitch differential from the camera's y offset.

use crate::Millis;
use crate::config::FlywheelConfig;
use crate::control::SlewLimiter;
use crate::hal::Flywheel;
use crate::registers::Registers;
use crate::scheduler::Task;

pub struct FlywheelTask<'a, U, L> {
    upper: U,
    lower: L,
    registers: &'a Registers,
    config: &'a FlywheelConfig,
    upper_ramp: SlewLimiter,
    lower_ramp: SlewLimiter,
    last_step: Option<Millis>,
}

impl<'a, U: Flywheel, L: Flywheel> FlywheelTask<'a, U, L> {
    pub fn new(
        mut upper: U,
        mut lower: L,
        registers: &'a Registers,
        config: &'a FlywheelConfig,
    ) -> Self {
        upper.set_percent(0.0);
        lower.set_percent(0.0);
        Self {
            upper,
            lower,
            registers,
            config,
            upper_ramp: SlewLimiter::new(0.0, config.max_ramp_per_s),
            lower_ramp: SlewLimiter::new(0.0, config.max_ramp_per_s),
            last_step: None,
        }
    }

    /// Current `(upper, lower)` commanded speeds in percent.
    #[must_use]
    pub fn speeds(&self) -> (f32, f32) {
        (self.upper_ramp.current(), self.lower_ramp.current())
    }

    /// Target speeds before slew limiting.
    #[must_use]
    pub fn targets(&self) -> (f32, f32) {
        let base = self.registers.flywheel_percent.get();
        let pitch = -self.config.pitch_factor * self.registers.camera_y.get();
        (
            (base * (1.0 + pitch)).clamp(0.0, 100.0),
            (base * (1.0 - pitch)).clamp(0.0, 100.0),
        )
    }
}

impl<U: Flywheel, L: Flywheel> Task for FlywheelTask<'_, U, L> {
    fn step(&mut self, now: Millis) {
        let elapsed = self.last_step.map_or(0, |last| now.saturating_sub(last));
        self.last_step = Some(now);

        let (upper_target, lower_target) = self.targets();
        let upper = self.upper_ramp.advance(upper_target, elapsed);
        let lower = self.lower_ramp.advance(lower_target, elapsed);
        self.upper.set_percent(upper);
        self.lower.set_percent(lower);
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::config::TurretConfig;

    #[derive(Default)]
    struct Esc {
        percent: f32,
    }

    impl Flywheel for Esc {
        fn set_percent(&mut self, percent: f32) {
            self.percent = percent;
        }
    }

    fn config() -> FlywheelConfig {
        let mut config = TurretConfig::DEFAULT.flywheel;
        config.max_ramp_per_s = 100.0;
        config
    }

    #[test]
    fn ramps_toward_base_speed() {
        let registers = Registers::new();
        let config = config();
        let mut task = FlywheelTask::new(Esc::default(), Esc::default(), &registers, &config);
        registers.flywheel_percent.put(50.0);

        task.step(0);
        assert_eq!(task.speeds(), (0.0, 0.0));
        task.step(100);
        assert_eq!(task.speeds(), (10.0, 10.0));
        task.step(1_100);
        assert_eq!(task.speeds(), (50.0, 50.0));
        assert_eq!(task.upper.percent, 50.0);
        assert_eq!(task.lower.percent, 50.0);
    }

    #[test]
    fn pitch_splits_upper_and_lower() {
        let registers = Registers::new();
        let config = config();
        let task = FlywheelTask::new(Esc::default(), Esc::default(), &registers, &config);
        registers.flywheel_percent.put(50.0);
        registers.camera_y.put(-10.0);

        let (upper, lower) = task.targets();
        assert!(upper > 50.0);
        assert!(lower < 50.0);
        assert!(crate::magnitude(upper - 55.0) < 1e-4);
        assert!(crate::magnitude(lower - 45.0) < 1e-4);
    }

    #[test]
    fn targets_stay_within_percent_range() {
        let registers = Registers::new();
        let mut config = config();
        config.pitch_factor = 1.0;
        let task = FlywheelTask::new(Esc::default(), Esc::default(), &registers, &config);
        registers.flywheel_percent.put(90.0);
        registers.camera_y.put(-5.0);
        assert_eq!(task.targets(), (100.0, 0.0));
    }
}
