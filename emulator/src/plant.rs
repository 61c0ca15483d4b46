//! Simulated bench: a geared yaw motor with an incremental encoder, two
//! flywheels, a firing servo and a camera that reports where the target
//! sits in its frame.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use turret_core::Millis;
use turret_core::config::COUNTS_PER_DEGREE;
use turret_core::hal::{CameraLink, EncoderCounter, Flywheel, Motor, PositionSensor, Servo};

/// Yaw speed at full duty, in encoder counts per millisecond.
const MAX_SPEED_COUNTS_PER_MS: f64 = 40.0;
/// First-order lag between duty and speed.
const MOTOR_LAG_MS: f64 = 50.0;
/// Mechanical travel; the lower stop is where homing zeroes the encoder.
const HARD_STOP_MAX_DEG: f64 = 270.0;
const FRAME_INTERVAL_MS: Millis = 33;
const PIXELS_PER_DEGREE: f64 = 0.5;
const TARGET_ROW: f64 = 1.25;
/// Encoder reading at the lower stop, away from zero so wrapping is exercised.
const ENCODER_RAW_AT_STOP: i64 = 40_000;

pub type SharedBench = Rc<RefCell<Bench>>;

#[derive(Debug)]
pub struct Bench {
    yaw_counts: f64,
    yaw_speed: f64,
    duty: f32,
    target_deg: f32,
    boresight_x: f32,
    upper_percent: f32,
    lower_percent: f32,
    servo_extended: bool,
    servo_pushes: u32,
    camera_bytes: VecDeque<u8>,
    next_frame: Millis,
    now: Millis,
}

impl Bench {
    /// Places the turret at `start_deg` from the lower stop facing a target at
    /// `target_deg`. `boresight_x` is the column the target appears in when the
    /// turret points straight at it.
    pub fn new(start_deg: f32, target_deg: f32, boresight_x: f32) -> Self {
        Self {
            yaw_counts: f64::from(start_deg) * f64::from(COUNTS_PER_DEGREE),
            yaw_speed: 0.0,
            duty: 0.0,
            target_deg,
            boresight_x,
            upper_percent: 0.0,
            lower_percent: 0.0,
            servo_extended: false,
            servo_pushes: 0,
            camera_bytes: VecDeque::new(),
            next_frame: 0,
            now: 0,
        }
    }

    pub fn shared(self) -> SharedBench {
        Rc::new(RefCell::new(self))
    }

    /// Integrates the plant up to `now`, one millisecond at a time.
    pub fn advance(&mut self, now: Millis) {
        while self.now < now {
            self.now += 1;
            let target_speed = f64::from(self.duty) / 100.0 * MAX_SPEED_COUNTS_PER_MS;
            self.yaw_speed += (target_speed - self.yaw_speed) / MOTOR_LAG_MS;
            self.yaw_counts += self.yaw_speed;

            let max_counts = HARD_STOP_MAX_DEG * f64::from(COUNTS_PER_DEGREE);
            if self.yaw_counts <= 0.0 {
                self.yaw_counts = 0.0;
                self.yaw_speed = self.yaw_speed.max(0.0);
            } else if self.yaw_counts >= max_counts {
                self.yaw_counts = max_counts;
                self.yaw_speed = self.yaw_speed.min(0.0);
            }

            if self.now >= self.next_frame {
                self.emit_frame();
                self.next_frame = self.now + FRAME_INTERVAL_MS;
            }
        }
    }

    fn emit_frame(&mut self) {
        let x = (self.yaw_deg() - f64::from(self.target_deg)) * PIXELS_PER_DEGREE
            + f64::from(self.boresight_x);
        let line = format!("{x:.2}, {TARGET_ROW:.2}\n");
        self.camera_bytes.extend(line.bytes());
    }

    pub fn yaw_deg(&self) -> f64 {
        self.yaw_counts / f64::from(COUNTS_PER_DEGREE)
    }

    pub fn target_deg(&self) -> f32 {
        self.target_deg
    }

    pub fn set_target_deg(&mut self, degrees: f32) {
        self.target_deg = degrees;
    }

    pub fn duty(&self) -> f32 {
        self.duty
    }

    /// `(upper, lower)` flywheel commands in percent.
    pub fn flywheels(&self) -> (f32, f32) {
        (self.upper_percent, self.lower_percent)
    }

    pub fn servo_pushes(&self) -> u32 {
        self.servo_pushes
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn encoder_raw(&self) -> u16 {
        let counts = self.yaw_counts.round() as i64 + ENCODER_RAW_AT_STOP;
        counts.rem_euclid(1 << 16) as u16
    }
}

pub struct BenchMotor(pub SharedBench);

impl Motor for BenchMotor {
    fn set_duty_cycle(&mut self, percent: f32) {
        self.0.borrow_mut().duty = percent;
    }
}

pub struct BenchEncoder {
    bench: SharedBench,
    counter: EncoderCounter,
}

impl BenchEncoder {
    pub fn new(bench: SharedBench) -> Self {
        let counter = EncoderCounter::new(bench.borrow().encoder_raw());
        Self { bench, counter }
    }
}

impl PositionSensor for BenchEncoder {
    fn read(&mut self) -> i32 {
        let raw = self.bench.borrow().encoder_raw();
        self.counter.update(raw)
    }

    fn zero(&mut self) {
        self.counter.zero();
    }

    fn delta(&self) -> i32 {
        self.counter.delta()
    }
}

#[derive(Copy, Clone, Debug)]
pub enum Wheel {
    Upper,
    Lower,
}

pub struct BenchFlywheel {
    pub bench: SharedBench,
    pub wheel: Wheel,
}

impl Flywheel for BenchFlywheel {
    fn set_percent(&mut self, percent: f32) {
        let mut bench = self.bench.borrow_mut();
        match self.wheel {
            Wheel::Upper => bench.upper_percent = percent,
            Wheel::Lower => bench.lower_percent = percent,
        }
    }
}

pub struct BenchServo(pub SharedBench);

impl Servo for BenchServo {
    fn set(&mut self) {
        let mut bench = self.0.borrow_mut();
        if !bench.servo_extended {
            bench.servo_pushes += 1;
        }
        bench.servo_extended = true;
    }

    fn back(&mut self) {
        self.0.borrow_mut().servo_extended = false;
    }

    fn is_set(&self) -> bool {
        self.0.borrow().servo_extended
    }
}

pub struct BenchCamera(pub SharedBench);

impl CameraLink for BenchCamera {
    fn read_byte(&mut self) -> Option<u8> {
        self.0.borrow_mut().camera_bytes.pop_front()
    }
}
