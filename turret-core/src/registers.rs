//! The register bundle shared by the control tasks and the state machine.

use core::fmt;

use crate::shared::Share;
use crate::tasks::CameraStats;

/// Operating mode of the yaw axis, written by the state machine.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum YawMode {
    /// Motor disengaged.
    #[default]
    Idle,
    /// Motor disengaged and the encoder held at zero.
    Disable,
    /// Closed-loop position control toward `yaw_setpoint`.
    Position,
    /// Raw effort passthrough from `yaw_effort`.
    Pwm,
    /// Drive into the mechanical stop and zero the encoder there.
    Home,
}

impl YawMode {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            YawMode::Idle => "idle",
            YawMode::Disable => "disable",
            YawMode::Position => "position",
            YawMode::Pwm => "pwm",
            YawMode::Home => "home",
        }
    }
}

impl fmt::Display for YawMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// All cross-task state. Created once at startup and borrowed by every task.
///
/// | register | writer |
/// |---|---|
/// | `yaw_mode`, `yaw_setpoint`, `yaw_command`, `tracking`, `flywheel_percent`, `fire` | state machine |
/// | `yaw_ack`, `yaw_settled`, `yaw_homed`, `yaw_position` | yaw task |
///
/// `yaw_settled` and `yaw_homed` answer the command numbered `yaw_ack`; they
/// are stale whenever `yaw_ack != yaw_command`.
/// | `yaw_effort`, `track_settled` | tracker task |
/// | `camera_x`, `camera_y`, `camera_stats` | camera task |
/// | `shots_fired` | firing task |
#[derive(Debug)]
pub struct Registers {
    pub yaw_mode: Share<YawMode>,
    /// Position target in encoder counts.
    pub yaw_setpoint: Share<f32>,
    /// Signed raw effort in percent, applied in [`YawMode::Pwm`].
    pub yaw_effort: Share<f32>,
    /// Bumped each time the state machine writes a new yaw mode.
    pub yaw_command: Share<u32>,
    /// The `yaw_command` in force during the yaw task's last step.
    pub yaw_ack: Share<u32>,
    pub yaw_settled: Share<bool>,
    pub yaw_homed: Share<bool>,
    /// Cumulative encoder position in counts.
    pub yaw_position: Share<i32>,
    pub tracking: Share<bool>,
    pub track_settled: Share<bool>,
    /// Horizontal target offset in camera pixels.
    pub camera_x: Share<f32>,
    /// Vertical target offset in camera pixels.
    pub camera_y: Share<f32>,
    /// Accepted and rejected record counts.
    pub camera_stats: Share<CameraStats>,
    /// Base flywheel speed in percent.
    pub flywheel_percent: Share<f32>,
    pub fire: Share<bool>,
    pub shots_fired: Share<u32>,
}

impl Registers {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            yaw_mode: Share::new("yaw mode", YawMode::Idle),
            yaw_setpoint: Share::new("yaw setpoint", 0.0),
            yaw_effort: Share::new("yaw effort", 0.0),
            yaw_command: Share::new("yaw command", 0),
            yaw_ack: Share::new("yaw ack", 0),
            yaw_settled: Share::new("yaw settled", false),
            yaw_homed: Share::new("yaw homed", false),
            yaw_position: Share::new("yaw position", 0),
            tracking: Share::new("tracking", false),
            track_settled: Share::new("track settled", false),
            camera_x: Share::new("camera x", 0.0),
            camera_y: Share::new("camera y", 0.0),
            camera_stats: Share::new("camera stats", CameraStats::new()),
            flywheel_percent: Share::new("flywheel percent", 0.0),
            fire: Share::new("fire", false),
            shots_fired: Share::new("shots fired", 0),
        }
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}
