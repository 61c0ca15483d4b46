#![no_std]

// Shared logic for the turret controller.
//
// This crate stays portable across MCU firmware and host tooling by avoiding the
// Rust standard library. Hardware lives behind the traits in `hal`; everything
// else (registers, control loops, scheduler, duel sequencing) is plain data and
// runs identically on the STM32 and in the emulator.

pub mod camera;
pub mod config;
pub mod console;
pub mod control;
pub mod hal;
pub mod registers;
pub mod scheduler;
pub mod shared;
pub mod tasks;
pub mod telemetry;
pub mod turret;

/// Monotonic controller time in milliseconds.
pub type Millis = u64;

/// Absolute value without pulling in `libm` on targets where `f32::abs` lives in `std`.
#[must_use]
pub(crate) fn magnitude(value: f32) -> f32 {
    if value < 0.0 { -value } else { value }
}
