//! Edge-triggered firing servo sequence.

use crate::Millis;
use crate::config::FiringConfig;
use crate::hal::Servo;
use crate::registers::Registers;
use crate::scheduler::Task;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FiringPhase {
    /// Servo at rest, waiting for `fire`.
    Ready,
    /// Servo at the firing angle since the given time.
    Extended { since: Millis },
    /// Shot complete; waiting for `fire` to drop before re-arming.
    Spent,
}

pub struct FiringTask<'a, S> {
    servo: S,
    registers: &'a Registers,
    config: &'a FiringConfig,
    phase: FiringPhase,
}

impl<'a, S: Servo> FiringTask<'a, S> {
    pub fn new(mut servo: S, registers: &'a Registers, config: &'a FiringConfig) -> Self {
        servo.back();
        Self {
            servo,
            registers,
            config,
            phase: FiringPhase::Ready,
        }
    }

    #[must_use]
    pub fn phase(&self) -> FiringPhase {
        self.phase
    }

    #[must_use]
    pub fn servo(&self) -> &S {
        &self.servo
    }
}

impl<S: Servo> Task for FiringTask<'_, S> {
    fn step(&mut self, now: Millis) {
        let fire = self.registers.fire.get();
        self.phase = match self.phase {
            FiringPhase::Ready if fire => {
                self.servo.set();
                let shots = self.registers.shots_fired.get();
                self.registers.shots_fired.put(shots.saturating_add(1));
                FiringPhase::Extended { since: now }
            }
            FiringPhase::Extended { since }
                if now.saturating_sub(since) >= self.config.servo_hold_ms =>
            {
                self.servo.back();
                if fire {
                    FiringPhase::Spent
                } else {
                    FiringPhase::Ready
                }
            }
            FiringPhase::Spent if !fire => FiringPhase::Ready,
            phase => phase,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TurretConfig;

    #[derive(Default)]
    struct FakeServo {
        extended: bool,
        moves: u32,
    }

    impl Servo for FakeServo {
        fn set(&mut self) {
            self.extended = true;
            self.moves += 1;
        }

        fn back(&mut self) {
            self.extended = false;
            self.moves += 1;
        }

        fn is_set(&self) -> bool {
            self.extended
        }
    }

    #[test]
    fn holding_fire_shoots_once() {
        let registers = Registers::new();
        let config = TurretConfig::DEFAULT.firing;
        let mut task = FiringTask::new(FakeServo::default(), &registers, &config);
        registers.fire.put(true);

        task.step(0);
        assert!(task.servo().is_set());
        assert_eq!(task.phase(), FiringPhase::Extended { since: 0 });

        task.step(140);
        assert!(task.servo().is_set(), "servo held for the full dwell");
        task.step(150);
        assert!(!task.servo().is_set());
        assert_eq!(task.phase(), FiringPhase::Spent);

        for now in (170..1_000).step_by(20) {
            task.step(now);
        }
        assert_eq!(registers.shots_fired.get(), 1);
        assert!(!task.servo().is_set());
    }

    #[test]
    fn rearms_after_fire_drops() {
        let registers = Registers::new();
        let config = TurretConfig::DEFAULT.firing;
        let mut task = FiringTask::new(FakeServo::default(), &registers, &config);

        registers.fire.put(true);
        task.step(0);
        task.step(200);
        registers.fire.put(false);
        task.step(220);
        assert_eq!(task.phase(), FiringPhase::Ready);

        registers.fire.put(true);
        task.step(240);
        assert_eq!(registers.shots_fired.get(), 2);
    }

    #[test]
    fn fire_pulse_shorter_than_dwell_still_retracts() {
        let registers = Registers::new();
        let config = TurretConfig::DEFAULT.firing;
        let mut task = FiringTask::new(FakeServo::default(), &registers, &config);

        registers.fire.put(true);
        task.step(0);
        registers.fire.put(false);
        task.step(20);
        assert!(task.servo().is_set());
        task.step(160);
        assert_eq!(task.phase(), FiringPhase::Ready);
        assert!(!task.servo().is_set());
        assert_eq!(task.servo().moves, 3);
    }
}
