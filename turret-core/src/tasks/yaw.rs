//! Yaw axis: position loop, raw passthrough and homing.

use crate::Millis;
use crate::config::YawConfig;
use crate::control::{PidController, clamp_effort, compensate_deadband};
use crate::hal::{Motor, PositionSensor};
use crate::registers::{Registers, YawMode};
use crate::scheduler::Task;

pub struct YawTask<'a, M, S> {
    motor: M,
    sensor: S,
    registers: &'a Registers,
    config: &'a YawConfig,
    position_loop: PidController,
    homing_loop: PidController,
    mode: YawMode,
    home_started: Option<Millis>,
    homed: bool,
    last_step: Option<Millis>,
    output: f32,
}

impl<'a, M: Motor, S: PositionSensor> YawTask<'a, M, S> {
    pub fn new(
        mut motor: M,
        sensor: S,
        registers: &'a Registers,
        config: &'a YawConfig,
        now: Millis,
    ) -> Self {
        motor.set_duty_cycle(0.0);
        let position_loop = PidController::new(config.gains, 0.0, config.settle, now)
            .with_limits(config.limits);
        let homing_loop =
            PidController::new(config.home_gains, config.home_velocity, config.settle, now)
                .with_limits(config.limits);
        Self {
            motor,
            sensor,
            registers,
            config,
            position_loop,
            homing_loop,
            mode: YawMode::Idle,
            home_started: None,
            homed: false,
            last_step: None,
            output: 0.0,
        }
    }

    /// Effort last written to the motor.
    #[must_use]
    pub fn output(&self) -> f32 {
        self.output
    }

    #[must_use]
    pub fn motor(&self) -> &M {
        &self.motor
    }

    #[must_use]
    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    fn enter(&mut self, mode: YawMode, now: Millis) {
        if mode == YawMode::Home {
            self.homing_loop.reset(now);
            self.home_started = Some(now);
            self.homed = false;
        } else {
            self.home_started = None;
        }
        self.mode = mode;
    }

    #[allow(clippy::cast_precision_loss)]
    fn position_effort(&mut self, position: i32, now: Millis) -> f32 {
        self.position_loop
            .set_setpoint(self.registers.yaw_setpoint.get());
        let effort = self.position_loop.run(position as f32, now);
        self.shape(position, effort)
    }

    #[allow(clippy::cast_precision_loss)]
    fn homing_effort(&mut self, delta: i32, now: Millis) -> f32 {
        if self.homed {
            return 0.0;
        }
        let started = *self.home_started.get_or_insert(now);
        if delta == 0 && now.saturating_sub(started) >= self.config.home_min_duration_ms {
            self.sensor.zero();
            self.homed = true;
            return 0.0;
        }

        let elapsed = self.last_step.map_or(0, |last| now.saturating_sub(last));
        if elapsed == 0 {
            return self.output;
        }
        let velocity = delta as f32 / elapsed as f32;
        let limit = self.config.home_effort_limit;
        self.homing_loop.run(velocity, now).clamp(-limit, limit)
    }

    /// Clamp, deadband compensation, then soft endstops.
    fn shape(&self, position: i32, effort: f32) -> f32 {
        let mut effort = clamp_effort(effort);
        if let Some(min_effort) = self.config.min_effort {
            effort = compensate_deadband(effort, min_effort);
        }
        match self.config.endstops {
            Some(stops) => stops.limit(position, effort),
            None => effort,
        }
    }
}

impl<M: Motor, S: PositionSensor> Task for YawTask<'_, M, S> {
    fn step(&mut self, now: Millis) {
        let mut position = self.sensor.read();
        let delta = self.sensor.delta();

        let mode = self.registers.yaw_mode.get();
        let command = self.registers.yaw_command.get();
        if mode != self.mode {
            self.enter(mode, now);
        }

        let effort = match mode {
            YawMode::Idle => 0.0,
            YawMode::Disable => {
                self.sensor.zero();
                position = 0;
                0.0
            }
            YawMode::Position => self.position_effort(position, now),
            YawMode::Pwm => self.shape(position, self.registers.yaw_effort.get()),
            YawMode::Home => {
                let effort = self.homing_effort(delta, now);
                if self.homed {
                    position = 0;
                }
                effort
            }
        };

        let settled = mode == YawMode::Position && self.position_loop.is_settled();
        self.registers.yaw_settled.put(settled);
        self.registers
            .yaw_homed
            .put(mode == YawMode::Home && self.homed);
        self.registers.yaw_position.put(position);
        self.registers.yaw_ack.put(command);

        self.motor.set_duty_cycle(effort);
        self.output = effort;
        self.last_step = Some(now);
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::config::TurretConfig;
    use crate::control::SoftEndstops;

    #[derive(Default)]
    struct RecordingMotor {
        duty: f32,
    }

    impl Motor for RecordingMotor {
        fn set_duty_cycle(&mut self, percent: f32) {
            self.duty = percent;
        }
    }

    /// Encoder whose position the test script moves directly.
    #[derive(Default)]
    struct FakeEncoder {
        raw: i32,
        offset: i32,
        last: i32,
        delta: i32,
        zeroed: u32,
    }

    impl FakeEncoder {
        fn at(raw: i32) -> Self {
            Self {
                raw,
                last: raw,
                ..Self::default()
            }
        }
    }

    impl PositionSensor for FakeEncoder {
        fn read(&mut self) -> i32 {
            self.delta = self.raw - self.last;
            self.last = self.raw;
            self.raw - self.offset
        }

        fn zero(&mut self) {
            self.offset = self.raw;
            self.zeroed += 1;
        }

        fn delta(&self) -> i32 {
            self.delta
        }
    }

    fn config() -> YawConfig {
        let mut config = TurretConfig::DEFAULT.yaw;
        config.endstops = None;
        config
    }

    #[test]
    fn idle_mode_disengages_motor() {
        let registers = Registers::new();
        let config = config();
        let mut yaw = YawTask::new(RecordingMotor::default(), FakeEncoder::at(50), &registers, &config, 0);
        registers.yaw_effort.put(80.0);
        yaw.step(20);
        assert_eq!(yaw.motor().duty, 0.0);
        assert_eq!(registers.yaw_position.get(), 50);
    }

    #[test]
    fn position_mode_saturates_and_reports_settled() {
        let registers = Registers::new();
        let config = config();
        let mut yaw = YawTask::new(RecordingMotor::default(), FakeEncoder::at(0), &registers, &config, 0);
        registers.yaw_setpoint.put(10_000.0);
        registers.yaw_mode.put(YawMode::Position);

        yaw.step(20);
        assert_eq!(yaw.motor().duty, 100.0);
        assert!(!registers.yaw_settled.get());

        yaw.sensor.raw = 10_000;
        yaw.step(40);
        assert!(!registers.yaw_settled.get(), "fast approach is not settled");
        yaw.step(60);
        assert!(registers.yaw_settled.get());

        registers.yaw_mode.put(YawMode::Idle);
        yaw.step(80);
        assert!(!registers.yaw_settled.get());
    }

    #[test]
    fn step_acknowledges_the_command_it_ran_under() {
        let registers = Registers::new();
        let config = config();
        let mut yaw = YawTask::new(RecordingMotor::default(), FakeEncoder::at(0), &registers, &config, 0);
        registers.yaw_mode.put(YawMode::Position);
        registers.yaw_command.put(7);
        assert_ne!(registers.yaw_ack.get(), 7);
        yaw.step(20);
        assert_eq!(registers.yaw_ack.get(), 7);

        registers.yaw_command.put(8);
        assert_eq!(registers.yaw_ack.get(), 7, "ack only moves when the task steps");
        yaw.step(40);
        assert_eq!(registers.yaw_ack.get(), 8);
    }

    #[test]
    fn pwm_mode_passes_effort_through_clamped() {
        let registers = Registers::new();
        let config = config();
        let mut yaw = YawTask::new(RecordingMotor::default(), FakeEncoder::at(0), &registers, &config, 0);
        registers.yaw_mode.put(YawMode::Pwm);
        registers.yaw_effort.put(-35.0);
        yaw.step(20);
        assert_eq!(yaw.motor().duty, -35.0);
        registers.yaw_effort.put(-400.0);
        yaw.step(40);
        assert_eq!(yaw.motor().duty, -100.0);
    }

    #[test]
    fn endstops_block_outward_effort() {
        let registers = Registers::new();
        let mut config = config();
        config.endstops = Some(SoftEndstops::new(0, 1_000));
        let mut yaw = YawTask::new(RecordingMotor::default(), FakeEncoder::at(1_000), &registers, &config, 0);
        registers.yaw_mode.put(YawMode::Pwm);
        registers.yaw_effort.put(50.0);
        yaw.step(20);
        assert_eq!(yaw.motor().duty, 0.0);
        registers.yaw_effort.put(-50.0);
        yaw.step(40);
        assert_eq!(yaw.motor().duty, -50.0);
    }

    #[test]
    fn deadband_compensation_lifts_small_efforts() {
        let registers = Registers::new();
        let mut config = config();
        config.min_effort = Some(26.0);
        let mut yaw = YawTask::new(RecordingMotor::default(), FakeEncoder::at(0), &registers, &config, 0);
        registers.yaw_mode.put(YawMode::Pwm);
        registers.yaw_effort.put(-4.0);
        yaw.step(20);
        assert_eq!(yaw.motor().duty, -26.0);
    }

    #[test]
    fn disable_mode_holds_encoder_at_zero() {
        let registers = Registers::new();
        let config = config();
        let mut yaw = YawTask::new(RecordingMotor::default(), FakeEncoder::at(700), &registers, &config, 0);
        registers.yaw_mode.put(YawMode::Disable);
        yaw.step(20);
        assert_eq!(registers.yaw_position.get(), 0);
        assert_eq!(yaw.motor().duty, 0.0);
        yaw.sensor.raw = 900;
        yaw.step(40);
        assert_eq!(registers.yaw_position.get(), 0);
    }

    #[test]
    fn homing_drives_until_stall_then_zeroes() {
        let registers = Registers::new();
        let config = config();
        let mut yaw = YawTask::new(RecordingMotor::default(), FakeEncoder::at(5_000), &registers, &config, 0);
        registers.yaw_mode.put(YawMode::Home);

        // Stationary at entry: inside the minimum duration the axis keeps pushing.
        yaw.step(20);
        yaw.step(40);
        assert!(yaw.motor().duty < 0.0);
        assert!(!registers.yaw_homed.get());

        // Moving toward the stop.
        let mut now = 40;
        while now < 1_000 {
            now += 20;
            yaw.sensor.raw -= 200;
            yaw.step(now);
            assert!(!registers.yaw_homed.get());
        }
        assert!(yaw.motor().duty <= 0.0);
        assert!(yaw.motor().duty >= -config.home_effort_limit);

        // Hit the stop.
        now += 20;
        yaw.step(now);
        assert!(registers.yaw_homed.get());
        assert_eq!(yaw.sensor().zeroed, 1);
        assert_eq!(registers.yaw_position.get(), 0);
        assert_eq!(yaw.motor().duty, 0.0);

        // Leaving Home clears the flag.
        registers.yaw_mode.put(YawMode::Idle);
        yaw.step(now + 20);
        assert!(!registers.yaw_homed.get());
    }
}
