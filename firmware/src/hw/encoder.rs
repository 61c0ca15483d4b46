use embassy_stm32::timer::GeneralInstance4Channel;
use embassy_stm32::timer::qei::Qei;
use turret_core::hal::{EncoderCounter, PositionSensor};

/// Yaw encoder decoded by a timer in quadrature mode.
pub struct QuadratureEncoder<'d, T: GeneralInstance4Channel> {
    qei: Qei<'d, T>,
    counter: EncoderCounter,
}

impl<'d, T: GeneralInstance4Channel> QuadratureEncoder<'d, T> {
    pub fn new(qei: Qei<'d, T>) -> Self {
        let counter = EncoderCounter::new(qei.count());
        Self { qei, counter }
    }
}

impl<T: GeneralInstance4Channel> PositionSensor for QuadratureEncoder<'_, T> {
    fn read(&mut self) -> i32 {
        self.counter.update(self.qei.count())
    }

    fn zero(&mut self) {
        self.counter.zero();
    }

    fn delta(&self) -> i32 {
        self.counter.delta()
    }
}
