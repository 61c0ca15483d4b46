use embassy_stm32::timer::GeneralInstance4Channel;
use embassy_stm32::timer::simple_pwm::SimplePwmChannel;
use turret_core::hal::Flywheel;

use crate::pwm::{ESC_PWM_HZ, esc_pulse_us, pulse_fraction, scale_duty};

/// Flywheel motor behind a hobby ESC driven with 1000-2000 us pulses.
pub struct EscFlywheel<'d, T: GeneralInstance4Channel> {
    channel: SimplePwmChannel<'d, T>,
}

impl<'d, T: GeneralInstance4Channel> EscFlywheel<'d, T> {
    /// Starts at the idle pulse so the ESC arms.
    pub fn new(mut channel: SimplePwmChannel<'d, T>) -> Self {
        channel.enable();
        let mut esc = Self { channel };
        esc.set_percent(0.0);
        esc
    }
}

impl<T: GeneralInstance4Channel> Flywheel for EscFlywheel<'_, T> {
    fn set_percent(&mut self, percent: f32) {
        let fraction = pulse_fraction(esc_pulse_us(percent), ESC_PWM_HZ);
        let max = self.channel.max_duty_cycle();
        self.channel.set_duty_cycle(scale_duty(max, fraction));
    }
}
