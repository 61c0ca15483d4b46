use embassy_stm32::gpio::Input;
use embassy_time::Instant;
use turret_core::hal::DigitalInput;

use crate::input::{Debouncer, RisingEdge};

/// How long a new level must hold before it is accepted.
const DEBOUNCE_MS: u64 = 20;

/// Active-low push button reported as one pulse per press.
pub struct StartButton<'d> {
    pin: Input<'d>,
    debouncer: Debouncer,
    edge: RisingEdge,
}

impl<'d> StartButton<'d> {
    pub fn new(pin: Input<'d>) -> Self {
        Self {
            pin,
            debouncer: Debouncer::new(DEBOUNCE_MS),
            edge: RisingEdge::default(),
        }
    }
}

impl DigitalInput for StartButton<'_> {
    fn is_active(&mut self) -> bool {
        let pressed = self
            .debouncer
            .update(self.pin.is_low(), Instant::now().as_millis());
        self.edge.update(pressed)
    }
}
