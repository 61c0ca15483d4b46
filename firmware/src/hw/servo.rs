use embassy_stm32::timer::GeneralInstance4Channel;
use embassy_stm32::timer::simple_pwm::SimplePwmChannel;
use turret_core::config::FiringConfig;
use turret_core::hal::Servo;

use crate::pwm::{SERVO_PWM_HZ, pulse_fraction, scale_duty, servo_pulse_us};

/// Hobby servo pushing darts into the flywheels.
pub struct PwmServo<'d, T: GeneralInstance4Channel> {
    channel: SimplePwmChannel<'d, T>,
    fire_angle_deg: f32,
    rest_angle_deg: f32,
    extended: bool,
}

impl<'d, T: GeneralInstance4Channel> PwmServo<'d, T> {
    pub fn new(mut channel: SimplePwmChannel<'d, T>, config: &FiringConfig) -> Self {
        channel.enable();
        Self {
            channel,
            fire_angle_deg: config.fire_angle_deg,
            rest_angle_deg: config.rest_angle_deg,
            extended: false,
        }
    }

    fn move_to(&mut self, angle_deg: f32) {
        let fraction = pulse_fraction(servo_pulse_us(angle_deg), SERVO_PWM_HZ);
        let max = self.channel.max_duty_cycle();
        self.channel.set_duty_cycle(scale_duty(max, fraction));
    }
}

impl<T: GeneralInstance4Channel> Servo for PwmServo<'_, T> {
    fn set(&mut self) {
        self.move_to(self.fire_angle_deg);
        self.extended = true;
    }

    fn back(&mut self) {
        self.move_to(self.rest_angle_deg);
        self.extended = false;
    }

    fn is_set(&self) -> bool {
        self.extended
    }
}
