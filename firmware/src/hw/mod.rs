//! STM32L476 bindings for the `turret-core` hardware traits.
//!
//! Pin map (Nucleo-L476RG):
//!
//! | function | pin | peripheral |
//! |---|---|---|
//! | yaw bridge enable | PA10 | GPIO |
//! | yaw bridge IN1 / IN2 | PB4 / PB5 | TIM3 CH1 / CH2 |
//! | yaw encoder A / B | PC6 / PC7 | TIM8 quadrature |
//! | lower / upper flywheel ESC | PB8 / PB9 | TIM4 CH3 / CH4 |
//! | firing servo | PB10 | TIM2 CH3 |
//! | camera TX / RX | PA0 / PA1 | UART4 |
//! | start button | PC13 | GPIO, active low |

pub mod button;
pub mod camera;
pub mod encoder;
pub mod esc;
pub mod motor;
pub mod servo;

pub use button::StartButton;
pub use camera::UartCamera;
pub use encoder::QuadratureEncoder;
pub use esc::EscFlywheel;
pub use motor::HBridgeMotor;
pub use servo::PwmServo;
