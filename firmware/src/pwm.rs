//! Duty-cycle arithmetic for the turret's PWM outputs.
//!
//! Kept free of HAL types so the conversions are unit-tested on the host.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

/// H-bridge switching frequency for the yaw motor.
pub const MOTOR_PWM_HZ: u32 = 20_000;
/// Update rate for the flywheel ESCs.
pub const ESC_PWM_HZ: u32 = 200;
/// Update rate for the firing servo.
pub const SERVO_PWM_HZ: u32 = 50;

const SERVO_MIN_PULSE_US: f32 = 500.0;
const SERVO_MAX_PULSE_US: f32 = 2_500.0;
const SERVO_TRAVEL_DEG: f32 = 180.0;
const ESC_IDLE_PULSE_US: f32 = 1_000.0;
const ESC_FULL_PULSE_US: f32 = 2_000.0;

/// Duty fractions for the two half-bridges driving the yaw motor.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BridgeDuty {
    pub forward: f32,
    pub reverse: f32,
}

/// Splits a signed effort in percent across the bridge inputs; the idle
/// half-bridge is held low.
#[must_use]
pub fn bridge_duty(effort: f32) -> BridgeDuty {
    let fraction = (effort / 100.0).clamp(-1.0, 1.0);
    if fraction >= 0.0 {
        BridgeDuty {
            forward: fraction,
            reverse: 0.0,
        }
    } else {
        BridgeDuty {
            forward: 0.0,
            reverse: -fraction,
        }
    }
}

/// Servo pulse width for an angle, clamped to the servo's travel.
#[must_use]
pub fn servo_pulse_us(angle_deg: f32) -> f32 {
    let angle = angle_deg.clamp(0.0, SERVO_TRAVEL_DEG);
    SERVO_MIN_PULSE_US + angle / SERVO_TRAVEL_DEG * (SERVO_MAX_PULSE_US - SERVO_MIN_PULSE_US)
}

/// ESC pulse width for a speed in percent.
#[must_use]
pub fn esc_pulse_us(percent: f32) -> f32 {
    let percent = percent.clamp(0.0, 100.0);
    ESC_IDLE_PULSE_US + percent / 100.0 * (ESC_FULL_PULSE_US - ESC_IDLE_PULSE_US)
}

/// Fraction of the PWM period covered by `pulse_us` at `frequency_hz`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn pulse_fraction(pulse_us: f32, frequency_hz: u32) -> f32 {
    let period_us = 1_000_000.0 / frequency_hz as f32;
    (pulse_us / period_us).clamp(0.0, 1.0)
}

/// Compare value for `fraction` of a timer whose full scale is `max_duty`.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_lossless
)]
pub fn scale_duty(max_duty: u16, fraction: f32) -> u16 {
    let fraction = if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    };
    (f32::from(max_duty) * fraction + 0.5) as u16
}
