//! The turret's periodic control tasks.
//!
//! Each task owns its hardware handles, borrows the shared [`Registers`] and
//! its slice of the configuration, and implements [`Task`]. Tasks never call
//! each other; everything they exchange goes through registers.
//!
//! [`Registers`]: crate::registers::Registers
//! [`Task`]: crate::scheduler::Task

pub mod camera;
pub mod firing;
pub mod flywheel;
pub mod tracker;
pub mod yaw;

pub use camera::{CameraStats, CameraTask};
pub use firing::{FiringPhase, FiringTask};
pub use flywheel::FlywheelTask;
pub use tracker::TrackerTask;
pub use yaw::YawTask;
