//! Immutable controller configuration.
//!
//! Defaults mirror the tuning the turret shipped with. Everything is `const` so
//! the firmware can keep its configuration in flash.

use core::fmt;

use crate::Millis;
use crate::control::{PidGains, PidLimits, SettleThresholds, SoftEndstops};
use crate::scheduler::{Priority, TaskSpec};

/// Quadrature counts per motor-shaft revolution.
pub const ENCODER_COUNTS_PER_REV: f32 = 16_384.0;
/// Output gear reduction between the motor shaft and the turret.
pub const GEAR_RATIO: f32 = 200.0 / 27.0;
/// Encoder counts per degree of turret yaw.
pub const COUNTS_PER_DEGREE: f32 = ENCODER_COUNTS_PER_REV / 360.0 * GEAR_RATIO;

#[allow(clippy::cast_possible_truncation)]
const fn degrees_to_counts(degrees: f32) -> i32 {
    (degrees * COUNTS_PER_DEGREE) as i32
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct YawConfig {
    pub gains: PidGains,
    pub settle: SettleThresholds,
    pub limits: PidLimits,
    /// Position setpoint while engaging a target, in counts.
    pub active_setpoint: f32,
    /// Position setpoint at rest, in counts.
    pub home_setpoint: f32,
    pub endstops: Option<SoftEndstops>,
    /// Smallest non-zero effort the motor is commanded with.
    pub min_effort: Option<f32>,
    /// Homing loop, regulating velocity in counts per millisecond.
    pub home_gains: PidGains,
    pub home_velocity: f32,
    pub home_effort_limit: f32,
    pub home_min_duration_ms: Millis,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TrackerConfig {
    pub gains: PidGains,
    pub settle: SettleThresholds,
    pub limits: PidLimits,
    /// Camera x reading (pixels) at which the launcher is on target.
    pub offset_x: f32,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FlywheelConfig {
    pub arm_percent: f32,
    pub fire_percent: f32,
    /// Differential per pixel of vertical camera offset.
    pub pitch_factor: f32,
    /// Largest speed change in percent per second.
    pub max_ramp_per_s: f32,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FiringConfig {
    pub servo_hold_ms: Millis,
    pub fire_angle_deg: f32,
    pub rest_angle_deg: f32,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CameraConfig {
    /// Records with `|x| >= x_limit` are rejected.
    pub x_limit: f32,
    /// Records with `|y| >= y_limit` are rejected.
    pub y_limit: f32,
    pub max_bytes_per_step: usize,
    pub baud: u32,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DuelConfig {
    pub pre_arm_ms: Millis,
    /// How long the yaw axis must stay settled before tracking starts.
    pub post_settle_ms: Millis,
    pub fire_duration_ms: Millis,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TaskTiming {
    pub priority: Priority,
    pub period_ms: u32,
}

impl TaskTiming {
    #[must_use]
    pub const fn new(priority: u8, period_ms: u32) -> Self {
        Self {
            priority: Priority(priority),
            period_ms,
        }
    }

    #[must_use]
    pub const fn spec(self, name: &'static str) -> TaskSpec {
        TaskSpec::new(name, self.priority, self.period_ms)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TaskTable {
    pub camera: TaskTiming,
    pub yaw: TaskTiming,
    pub tracker: TaskTiming,
    pub firing: TaskTiming,
    pub flywheel: TaskTiming,
}

impl TaskTable {
    /// Specs in registration order, named as they appear in logs.
    #[must_use]
    pub const fn specs(&self) -> [TaskSpec; 5] {
        [
            self.camera.spec("camera"),
            self.yaw.spec("yaw"),
            self.tracker.spec("tracker"),
            self.firing.spec("firing"),
            self.flywheel.spec("flywheel"),
        ]
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TurretConfig {
    pub yaw: YawConfig,
    pub tracker: TrackerConfig,
    pub flywheel: FlywheelConfig,
    pub firing: FiringConfig,
    pub camera: CameraConfig,
    pub duel: DuelConfig,
    pub tasks: TaskTable,
}

impl TurretConfig {
    pub const DEFAULT: Self = Self {
        yaw: YawConfig {
            gains: PidGains::new(0.09, 0.001, 0.0),
            settle: SettleThresholds::new(200.0, 2.0),
            limits: PidLimits::DEFAULT,
            active_setpoint: 200.0 * COUNTS_PER_DEGREE,
            home_setpoint: 20.0 * COUNTS_PER_DEGREE,
            endstops: Some(SoftEndstops::new(
                degrees_to_counts(20.0),
                degrees_to_counts(250.0),
            )),
            min_effort: None,
            home_gains: PidGains::new(2.0, 0.005, 0.0),
            home_velocity: -10.0,
            home_effort_limit: 40.0,
            home_min_duration_ms: 1_000,
        },
        tracker: TrackerConfig {
            gains: PidGains::new(8.0, 0.01, 0.0),
            settle: SettleThresholds::new(1.0, 1.0),
            limits: PidLimits::DEFAULT,
            offset_x: 3.5,
        },
        flywheel: FlywheelConfig {
            arm_percent: 45.0,
            fire_percent: 45.0,
            pitch_factor: 0.01,
            max_ramp_per_s: 45.0,
        },
        firing: FiringConfig {
            servo_hold_ms: 150,
            fire_angle_deg: 120.0,
            rest_angle_deg: 75.0,
        },
        camera: CameraConfig {
            x_limit: 16.0,
            y_limit: 12.0,
            max_bytes_per_step: 64,
            baud: 115_200,
        },
        duel: DuelConfig {
            pre_arm_ms: 1_000,
            post_settle_ms: 250,
            fire_duration_ms: 500,
        },
        tasks: TaskTable {
            camera: TaskTiming::new(0, 33),
            yaw: TaskTiming::new(1, 20),
            tracker: TaskTiming::new(2, 20),
            firing: TaskTiming::new(3, 20),
            flywheel: TaskTiming::new(4, 10),
        },
    };

    /// Checks the invariants the control tasks rely on.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for spec in self.tasks.specs() {
            if spec.period_ms == 0 {
                return Err(ConfigError::ZeroPeriod { task: spec.name });
            }
        }

        check_loop("yaw", self.yaw.settle, self.yaw.limits)?;
        check_loop("tracker", self.tracker.settle, self.tracker.limits)?;
        // A loop stepped less often than its staleness window never integrates.
        if self.yaw.limits.stale_after_ms < Millis::from(self.tasks.yaw.period_ms) {
            return Err(ConfigError::InvalidRange {
                what: "yaw staleness",
            });
        }
        if self.tracker.limits.stale_after_ms < Millis::from(self.tasks.tracker.period_ms) {
            return Err(ConfigError::InvalidRange {
                what: "tracker staleness",
            });
        }

        if self
            .yaw
            .endstops
            .is_some_and(|stops| stops.min >= stops.max)
        {
            return Err(ConfigError::InvalidRange {
                what: "yaw endstops",
            });
        }
        if let Some(min_effort) = self.yaw.min_effort {
            check_percent("yaw min effort", min_effort)?;
        }
        check_percent("homing effort limit", self.yaw.home_effort_limit)?;
        if self.yaw.home_effort_limit <= 0.0 || self.yaw.home_velocity == 0.0 {
            return Err(ConfigError::InvalidRange { what: "homing" });
        }

        check_percent("arm percent", self.flywheel.arm_percent)?;
        check_percent("fire percent", self.flywheel.fire_percent)?;
        if self.flywheel.max_ramp_per_s <= 0.0 {
            return Err(ConfigError::NonPositive {
                what: "flywheel ramp",
            });
        }

        if self.camera.x_limit <= 0.0 || self.camera.y_limit <= 0.0 {
            return Err(ConfigError::NonPositive {
                what: "camera frame limits",
            });
        }
        if self.camera.max_bytes_per_step == 0 {
            return Err(ConfigError::NonPositive {
                what: "camera bytes per step",
            });
        }
        Ok(())
    }
}

impl Default for TurretConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

fn check_loop(
    name: &'static str,
    settle: SettleThresholds,
    limits: PidLimits,
) -> Result<(), ConfigError> {
    if settle.error <= 0.0 || settle.derivative <= 0.0 {
        return Err(ConfigError::NonPositive { what: name });
    }
    if limits.saturation <= 0.0 {
        return Err(ConfigError::NonPositive { what: name });
    }
    Ok(())
}

fn check_percent(what: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::PercentOutOfRange { what })
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    ZeroPeriod { task: &'static str },
    NonPositive { what: &'static str },
    InvalidRange { what: &'static str },
    PercentOutOfRange { what: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroPeriod { task } => write!(f, "task `{task}` has a zero period"),
            ConfigError::NonPositive { what } => write!(f, "{what} must be positive"),
            ConfigError::InvalidRange { what } => write!(f, "{what} range is empty or inverted"),
            ConfigError::PercentOutOfRange { what } => {
                write!(f, "{what} must be within 0..=100 percent")
            }
        }
    }
}
