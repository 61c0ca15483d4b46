use embassy_stm32::gpio::Output;
use embassy_stm32::timer::GeneralInstance4Channel;
use embassy_stm32::timer::simple_pwm::SimplePwmChannel;
use turret_core::hal::Motor;

use crate::pwm::{bridge_duty, scale_duty};

/// Yaw motor on an enable-gated H-bridge with one PWM input per direction.
pub struct HBridgeMotor<'d, T: GeneralInstance4Channel> {
    enable: Output<'d>,
    forward: SimplePwmChannel<'d, T>,
    reverse: SimplePwmChannel<'d, T>,
}

impl<'d, T: GeneralInstance4Channel> HBridgeMotor<'d, T> {
    pub fn new(
        enable: Output<'d>,
        mut forward: SimplePwmChannel<'d, T>,
        mut reverse: SimplePwmChannel<'d, T>,
    ) -> Self {
        forward.set_duty_cycle(0);
        reverse.set_duty_cycle(0);
        forward.enable();
        reverse.enable();
        Self {
            enable,
            forward,
            reverse,
        }
    }
}

impl<T: GeneralInstance4Channel> Motor for HBridgeMotor<'_, T> {
    fn set_duty_cycle(&mut self, percent: f32) {
        let duty = bridge_duty(percent);
        let max = self.forward.max_duty_cycle();
        self.forward.set_duty_cycle(scale_duty(max, duty.forward));
        self.reverse.set_duty_cycle(scale_duty(max, duty.reverse));
        if duty.forward > 0.0 || duty.reverse > 0.0 {
            self.enable.set_high();
        } else {
            self.enable.set_low();
        }
    }
}
