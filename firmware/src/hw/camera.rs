use embassy_stm32::usart::{BufferedUartRx, BufferedUartTx};
use embedded_io::{Read, ReadReady};
use turret_core::hal::CameraLink;

/// Camera coprocessor on a buffered UART. Reads never block: a byte is taken
/// only when the interrupt-filled ring already holds one.
pub struct UartCamera<'d> {
    // Held so the UART stays configured; the camera link is receive-only.
    _tx: BufferedUartTx<'d>,
    rx: BufferedUartRx<'d>,
}

impl<'d> UartCamera<'d> {
    pub fn new(tx: BufferedUartTx<'d>, rx: BufferedUartRx<'d>) -> Self {
        Self { _tx: tx, rx }
    }
}

impl CameraLink for UartCamera<'_> {
    fn read_byte(&mut self) -> Option<u8> {
        match self.rx.read_ready() {
            Ok(true) => {}
            Ok(false) => return None,
            Err(_) => {
                defmt::warn!("camera: UART error");
                return None;
            }
        }
        let mut byte = [0_u8; 1];
        match self.rx.read(&mut byte) {
            Ok(1) => Some(byte[0]),
            _ => None,
        }
    }
}
