//! Duel sequencing.
//!
//! The [`TurretStateMachine`] is evaluated once per outer iteration, after the
//! scheduler tick. It never touches hardware: it reads status registers written
//! by the tasks, writes command registers, and records every transition.
//!
//! ```text
//! Idle --start--> PreActivate --pre_arm--> Activate --yaw settled for post_settle--> Track
//!   ^                                                                                  |
//!   |                                                                          target settled
//!   |                                                                                  v
//!   +--yaw settled at home-- Return <--------------fire_duration------------------- Fire
//! ```
//!
//! An abort input sends any active state straight to `Return`.

use core::fmt;

use crate::Millis;
use crate::config::TurretConfig;
use crate::registers::{Registers, YawMode};
use crate::scheduler::Scheduler;
use crate::telemetry::{TransitionCause, TransitionLog, TransitionRecord};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum TurretState {
    #[default]
    Idle,
    /// Flywheels spinning up.
    PreActivate,
    /// Yaw slewing to the engagement angle.
    Activate,
    /// Yaw steered by the camera until the target is centred.
    Track,
    /// Fire flag asserted.
    Fire,
    /// Yaw returning to the home angle.
    Return,
}

impl TurretState {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            TurretState::Idle => "idle",
            TurretState::PreActivate => "pre-activate",
            TurretState::Activate => "activate",
            TurretState::Track => "track",
            TurretState::Fire => "fire",
            TurretState::Return => "return",
        }
    }

    /// States an abort can interrupt.
    #[must_use]
    pub const fn is_engaged(self) -> bool {
        matches!(
            self,
            TurretState::PreActivate | TurretState::Activate | TurretState::Track | TurretState::Fire
        )
    }
}

impl fmt::Display for TurretState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Operator inputs sampled once per outer iteration. Edge detection and
/// debouncing are the caller's responsibility.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Inputs {
    pub start: bool,
    pub home: bool,
    pub abort: bool,
}

pub struct TurretStateMachine<'a> {
    registers: &'a Registers,
    config: &'a TurretConfig,
    state: TurretState,
    entered_at: Millis,
    started_at: Option<Millis>,
    settled_since: Option<Millis>,
    homing: bool,
    log: TransitionLog,
}

impl<'a> TurretStateMachine<'a> {
    /// Starts in `Idle` and drives every command register to rest.
    pub fn new(registers: &'a Registers, config: &'a TurretConfig, now: Millis) -> Self {
        registers.yaw_setpoint.put(config.yaw.home_setpoint);
        registers.yaw_mode.put(YawMode::Idle);
        registers.yaw_command.put(registers.yaw_command.get().wrapping_add(1));
        registers.tracking.put(false);
        registers.fire.put(false);
        registers.flywheel_percent.put(0.0);
        Self {
            registers,
            config,
            state: TurretState::Idle,
            entered_at: now,
            started_at: None,
            settled_since: None,
            homing: false,
            log: TransitionLog::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> TurretState {
        self.state
    }

    /// When the current state was entered.
    #[must_use]
    pub fn entered_at(&self) -> Millis {
        self.entered_at
    }

    /// When the current (or most recent) duel was started.
    #[must_use]
    pub fn started_at(&self) -> Option<Millis> {
        self.started_at
    }

    #[must_use]
    pub fn is_homing(&self) -> bool {
        self.homing
    }

    #[must_use]
    pub fn history(&self) -> &TransitionLog {
        &self.log
    }

    /// Evaluates one outer iteration and returns the transition taken, if any.
    pub fn update(&mut self, now: Millis, inputs: Inputs) -> Option<TransitionRecord> {
        if inputs.abort && self.state.is_engaged() {
            self.command_return();
            return Some(self.transition(now, TurretState::Return, TransitionCause::Aborted));
        }

        let elapsed = now.saturating_sub(self.entered_at);
        let registers = self.registers;
        let config = self.config;
        let duel = &config.duel;

        match self.state {
            TurretState::Idle => {
                if self.homing {
                    if self.yaw_answered() && registers.yaw_homed.get() {
                        self.command_yaw(YawMode::Idle);
                        self.homing = false;
                    }
                    None
                } else if inputs.home {
                    self.command_yaw(YawMode::Home);
                    self.homing = true;
                    None
                } else if inputs.start {
                    registers
                        .flywheel_percent
                        .put(config.flywheel.arm_percent);
                    self.started_at = Some(now);
                    Some(self.transition(now, TurretState::PreActivate, TransitionCause::StartRequested))
                } else {
                    None
                }
            }
            TurretState::PreActivate => {
                if elapsed < duel.pre_arm_ms {
                    return None;
                }
                registers.yaw_setpoint.put(config.yaw.active_setpoint);
                self.command_yaw(YawMode::Position);
                registers
                    .flywheel_percent
                    .put(config.flywheel.fire_percent);
                self.settled_since = None;
                Some(self.transition(now, TurretState::Activate, TransitionCause::PreArmElapsed))
            }
            TurretState::Activate => {
                if !self.yaw_settled() {
                    self.settled_since = None;
                    return None;
                }
                let since = *self.settled_since.get_or_insert(now);
                if now.saturating_sub(since) < duel.post_settle_ms {
                    return None;
                }
                registers.tracking.put(true);
                self.command_yaw(YawMode::Pwm);
                Some(self.transition(now, TurretState::Track, TransitionCause::YawSettled))
            }
            TurretState::Track => {
                if !registers.track_settled.get() {
                    return None;
                }
                registers.fire.put(true);
                Some(self.transition(now, TurretState::Fire, TransitionCause::TargetSettled))
            }
            TurretState::Fire => {
                if elapsed < duel.fire_duration_ms {
                    return None;
                }
                self.command_return();
                Some(self.transition(now, TurretState::Return, TransitionCause::FireElapsed))
            }
            TurretState::Return => {
                if !self.yaw_settled() {
                    return None;
                }
                self.command_yaw(YawMode::Idle);
                registers.flywheel_percent.put(0.0);
                Some(self.transition(now, TurretState::Idle, TransitionCause::ReturnedHome))
            }
        }
    }

    fn command_return(&mut self) {
        let registers = self.registers;
        registers.fire.put(false);
        registers.tracking.put(false);
        registers.yaw_setpoint.put(self.config.yaw.home_setpoint);
        self.command_yaw(YawMode::Position);
    }

    /// Writes a yaw mode as a new command. Status written for earlier
    /// commands is ignored until the yaw task has stepped under this one.
    fn command_yaw(&self, mode: YawMode) {
        let registers = self.registers;
        registers.yaw_mode.put(mode);
        registers
            .yaw_command
            .put(registers.yaw_command.get().wrapping_add(1));
    }

    fn yaw_answered(&self) -> bool {
        self.registers.yaw_ack.get() == self.registers.yaw_command.get()
    }

    fn yaw_settled(&self) -> bool {
        self.yaw_answered() && self.registers.yaw_settled.get()
    }

    fn transition(
        &mut self,
        now: Millis,
        to: TurretState,
        cause: TransitionCause,
    ) -> TransitionRecord {
        let from = self.state;
        self.state = to;
        self.entered_at = now;
        self.log.record(now, from, to, cause)
    }
}

/// One outer-loop iteration: a scheduler tick followed by a state machine update.
pub fn run_cycle<const N: usize>(
    scheduler: &mut Scheduler<'_, N>,
    machine: &mut TurretStateMachine<'_>,
    now: Millis,
    inputs: Inputs,
) -> Option<TransitionRecord> {
    scheduler.tick(now);
    machine.update(now, inputs)
}
