use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::gpio::{Input, Level, Output, OutputType, Pull, Speed};
use embassy_stm32::peripherals;
use embassy_stm32::time::hz;
use embassy_stm32::timer::low_level::CountingMode;
use embassy_stm32::timer::qei::{Qei, QeiPin};
use embassy_stm32::timer::simple_pwm::{PwmPin, SimplePwm};
use embassy_stm32::usart::{self, BufferedUart};
use embassy_time::Instant;
use static_cell::StaticCell;
use turret_core::Millis;
use turret_core::config::TurretConfig;
use turret_core::hal::DigitalInput;
use turret_core::registers::Registers;
use turret_core::scheduler::Scheduler;
use turret_core::tasks::{CameraTask, FiringTask, FlywheelTask, TrackerTask, YawTask};
use turret_core::turret::{Inputs, TurretStateMachine, run_cycle};

use crate::hw::{EscFlywheel, HBridgeMotor, PwmServo, QuadratureEncoder, StartButton, UartCamera};
use crate::log;
use crate::pwm::{ESC_PWM_HZ, MOTOR_PWM_HZ, SERVO_PWM_HZ};

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

hal::bind_interrupts!(struct Irqs {
    UART4 => usart::BufferedInterruptHandler<peripherals::UART4>;
});

/// Interval between scheduler statistics dumps.
const STATS_INTERVAL_MS: Millis = 5_000;

static CONFIG: TurretConfig = TurretConfig::DEFAULT;
static REGISTERS: StaticCell<Registers> = StaticCell::new();
static CAMERA_TX_BUF: StaticCell<[u8; 16]> = StaticCell::new();
static CAMERA_RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

fn now_ms() -> Millis {
    Instant::now().as_millis()
}

#[embassy_executor::main]
pub async fn main(_spawner: Spawner) {
    if let Err(error) = CONFIG.validate() {
        defmt::panic!("config: {}", defmt::Display2Format(&error));
    }

    let p = hal::init(hal::Config::default());
    let registers: &'static Registers = REGISTERS.init(Registers::new());

    let yaw_pwm = SimplePwm::new(
        p.TIM3,
        Some(PwmPin::new(p.PB4, OutputType::PushPull)),
        Some(PwmPin::new(p.PB5, OutputType::PushPull)),
        None,
        None,
        hz(MOTOR_PWM_HZ),
        CountingMode::EdgeAlignedUp,
    );
    let yaw_channels = yaw_pwm.split();
    let motor = HBridgeMotor::new(
        Output::new(p.PA10, Level::Low, Speed::Low),
        yaw_channels.ch1,
        yaw_channels.ch2,
    );
    let encoder = QuadratureEncoder::new(Qei::new(p.TIM8, QeiPin::new(p.PC6), QeiPin::new(p.PC7)));

    let esc_pwm = SimplePwm::new(
        p.TIM4,
        None,
        None,
        Some(PwmPin::new(p.PB8, OutputType::PushPull)),
        Some(PwmPin::new(p.PB9, OutputType::PushPull)),
        hz(ESC_PWM_HZ),
        CountingMode::EdgeAlignedUp,
    );
    let esc_channels = esc_pwm.split();
    let lower = EscFlywheel::new(esc_channels.ch3);
    let upper = EscFlywheel::new(esc_channels.ch4);

    let servo_pwm = SimplePwm::new(
        p.TIM2,
        None,
        None,
        Some(PwmPin::new(p.PB10, OutputType::PushPull)),
        None,
        hz(SERVO_PWM_HZ),
        CountingMode::EdgeAlignedUp,
    );
    let servo = PwmServo::new(servo_pwm.split().ch3, &CONFIG.firing);

    let mut uart_config = usart::Config::default();
    uart_config.baudrate = CONFIG.camera.baud;
    let uart = BufferedUart::new(
        p.UART4,
        p.PA1,
        p.PA0,
        CAMERA_TX_BUF.init([0; 16]),
        CAMERA_RX_BUF.init([0; 256]),
        Irqs,
        uart_config,
    )
    .expect("camera UART init");
    let (camera_tx, camera_rx) = uart.split();
    let camera = UartCamera::new(camera_tx, camera_rx);

    let mut button = StartButton::new(Input::new(p.PC13, Pull::Up));

    let boot = now_ms();
    let mut camera_task = CameraTask::new(camera, registers, &CONFIG.camera);
    let mut yaw_task = YawTask::new(motor, encoder, registers, &CONFIG.yaw, boot);
    let mut tracker_task = TrackerTask::new(registers, &CONFIG.tracker, boot);
    let mut firing_task = FiringTask::new(servo, registers, &CONFIG.firing);
    let mut flywheel_task = FlywheelTask::new(upper, lower, registers, &CONFIG.flywheel);

    let [camera_spec, yaw_spec, tracker_spec, firing_spec, flywheel_spec] = CONFIG.tasks.specs();
    let mut scheduler: Scheduler<'_> = Scheduler::new();
    scheduler
        .add(camera_spec, &mut camera_task)
        .expect("register camera task");
    scheduler.add(yaw_spec, &mut yaw_task).expect("register yaw task");
    scheduler
        .add(tracker_spec, &mut tracker_task)
        .expect("register tracker task");
    scheduler
        .add(firing_spec, &mut firing_task)
        .expect("register firing task");
    scheduler
        .add(flywheel_spec, &mut flywheel_task)
        .expect("register flywheel task");

    let mut machine = TurretStateMachine::new(registers, &CONFIG, boot);
    log::log_boot(scheduler.len());

    // Home once at power-up so the encoder has a reference before the first duel.
    let mut inputs = Inputs {
        home: true,
        ..Inputs::default()
    };
    let mut was_homing = false;
    let mut next_stats = boot + STATS_INTERVAL_MS;

    loop {
        let now = now_ms();
        inputs.start = button.is_active();

        if let Some(record) = run_cycle(&mut scheduler, &mut machine, now, inputs) {
            log::log_transition(&record);
        }
        inputs.home = false;

        let homing = machine.is_homing();
        if homing != was_homing {
            log::log_homing(homing, now);
            was_homing = homing;
        }

        if now >= next_stats {
            for (_, spec, stats) in scheduler.iter() {
                log::log_task_stats(spec, stats);
            }
            log::log_camera_stats(&registers.camera_stats.get());
            next_stats = now + STATS_INTERVAL_MS;
        }

        embassy_futures::yield_now().await;
    }
}
