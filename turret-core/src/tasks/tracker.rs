//! Closes the loop from camera x offset to raw yaw effort.

use crate::Millis;
use crate::config::TrackerConfig;
use crate::control::{PidController, clamp_effort};
use crate::registers::Registers;
use crate::scheduler::Task;

pub struct TrackerTask<'a> {
    registers: &'a Registers,
    pid: PidController,
}

impl<'a> TrackerTask<'a> {
    #[must_use]
    pub fn new(registers: &'a Registers, config: &TrackerConfig, now: Millis) -> Self {
        let pid = PidController::new(config.gains, config.offset_x, config.settle, now)
            .with_limits(config.limits);
        Self { registers, pid }
    }

    #[must_use]
    pub fn controller(&self) -> &PidController {
        &self.pid
    }
}

impl Task for TrackerTask<'_> {
    fn step(&mut self, now: Millis) {
        if !self.registers.tracking.get() {
            self.registers.yaw_effort.put(0.0);
            self.registers.track_settled.put(false);
            return;
        }
        let effort = self.pid.run(self.registers.camera_x.get(), now);
        self.registers.yaw_effort.put(clamp_effort(effort));
        self.registers.track_settled.put(self.pid.is_settled());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TurretConfig;

    #[test]
    fn idle_tracker_writes_nothing_but_zero() {
        let registers = Registers::new();
        let mut tracker = TrackerTask::new(&registers, &TurretConfig::DEFAULT.tracker, 0);
        registers.camera_x.put(-9.0);
        registers.track_settled.put(true);
        tracker.step(20);
        assert!(registers.yaw_effort.get() == 0.0);
        assert!(!registers.track_settled.get());
    }

    #[test]
    fn steers_toward_offset_and_settles_on_target() {
        let registers = Registers::new();
        let config = TurretConfig::DEFAULT.tracker;
        let mut tracker = TrackerTask::new(&registers, &config, 0);
        registers.tracking.put(true);

        registers.camera_x.put(config.offset_x - 2.0);
        tracker.step(20);
        assert!(registers.yaw_effort.get() > 0.0);
        assert!(!registers.track_settled.get());

        registers.camera_x.put(config.offset_x + 2.0);
        tracker.step(40);
        assert!(registers.yaw_effort.get() < 0.0);

        // Small error, but it changed by 1.75 px within one millisecond.
        registers.camera_x.put(config.offset_x + 0.25);
        tracker.step(41);
        assert!(!registers.track_settled.get());
        tracker.step(61);
        assert!(registers.track_settled.get());
    }
}
