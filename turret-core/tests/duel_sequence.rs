#![allow(clippy::float_cmp)]

use core::cell::Cell;

use turret_core::Millis;
use turret_core::config::TurretConfig;
use turret_core::hal::{CameraLink, Flywheel, Motor, PositionSensor, Servo};
use turret_core::registers::{Registers, YawMode};
use turret_core::scheduler::Scheduler;
use turret_core::tasks::{CameraTask, FiringTask, FlywheelTask, TrackerTask, YawTask};
use turret_core::turret::{Inputs, TurretState, TurretStateMachine, run_cycle};

/// Position sensor that reports whatever the test script writes into `raw`.
struct ScriptedEncoder<'a> {
    raw: &'a Cell<i32>,
    last: i32,
    delta: i32,
    offset: i32,
}

impl<'a> ScriptedEncoder<'a> {
    fn new(raw: &'a Cell<i32>) -> Self {
        Self {
            raw,
            last: raw.get(),
            delta: 0,
            offset: 0,
        }
    }
}

impl PositionSensor for ScriptedEncoder<'_> {
    fn read(&mut self) -> i32 {
        let raw = self.raw.get();
        self.delta = raw - self.last;
        self.last = raw;
        raw - self.offset
    }

    fn zero(&mut self) {
        self.offset = self.last;
    }

    fn delta(&self) -> i32 {
        self.delta
    }
}

struct NullMotor;

impl Motor for NullMotor {
    fn set_duty_cycle(&mut self, _percent: f32) {}
}

struct NullFlywheel;

impl Flywheel for NullFlywheel {
    fn set_percent(&mut self, _percent: f32) {}
}

struct CountingServo<'a> {
    extended: bool,
    shots: &'a Cell<u32>,
}

impl Servo for CountingServo<'_> {
    fn set(&mut self) {
        self.extended = true;
        self.shots.set(self.shots.get() + 1);
    }

    fn back(&mut self) {
        self.extended = false;
    }

    fn is_set(&self) -> bool {
        self.extended
    }
}

/// Camera that sees the target dead ahead in every frame.
struct CentredCamera {
    record: &'static [u8],
    cursor: usize,
}

impl CameraLink for CentredCamera {
    fn read_byte(&mut self) -> Option<u8> {
        let byte = self.record[self.cursor];
        self.cursor = (self.cursor + 1) % self.record.len();
        Some(byte)
    }
}

fn test_config() -> TurretConfig {
    let mut config = TurretConfig::DEFAULT;
    config.yaw.endstops = None;
    config.duel.pre_arm_ms = 1_000;
    config.duel.post_settle_ms = 100;
    config.duel.fire_duration_ms = 500;
    config
}

#[allow(clippy::cast_possible_truncation)]
fn counts(setpoint: f32) -> i32 {
    setpoint.round() as i32
}

#[test]
fn full_duel_follows_the_scripted_timeline() {
    let config = test_config();
    let registers = Registers::new();
    let raw_position = Cell::new(0);
    let servo_shots = Cell::new(0);

    let mut camera = CameraTask::new(
        CentredCamera {
            record: b"3.5,0.0\n",
            cursor: 0,
        },
        &registers,
        &config.camera,
    );
    let mut yaw = YawTask::new(
        NullMotor,
        ScriptedEncoder::new(&raw_position),
        &registers,
        &config.yaw,
        0,
    );
    let mut tracker = TrackerTask::new(&registers, &config.tracker, 0);
    let mut firing = FiringTask::new(
        CountingServo {
            extended: false,
            shots: &servo_shots,
        },
        &registers,
        &config.firing,
    );
    let mut flywheel = FlywheelTask::new(NullFlywheel, NullFlywheel, &registers, &config.flywheel);

    let [camera_spec, yaw_spec, tracker_spec, firing_spec, flywheel_spec] = config.tasks.specs();
    let mut scheduler: Scheduler<'_> = Scheduler::new();
    scheduler.add(camera_spec, &mut camera).unwrap();
    scheduler.add(yaw_spec, &mut yaw).unwrap();
    scheduler.add(tracker_spec, &mut tracker).unwrap();
    scheduler.add(firing_spec, &mut firing).unwrap();
    scheduler.add(flywheel_spec, &mut flywheel).unwrap();

    let mut machine = TurretStateMachine::new(&registers, &config, 0);

    let active = counts(config.yaw.active_setpoint);
    let home = counts(config.yaw.home_setpoint);
    let mut arrival: Option<(Millis, i32)> = None;
    let mut timeline = Vec::new();

    for now in 0..20_000 {
        if let Some((at, target)) = arrival {
            if now >= at {
                raw_position.set(target);
                arrival = None;
            }
        }

        let inputs = Inputs {
            start: now == 0,
            ..Inputs::default()
        };
        if let Some(record) = run_cycle(&mut scheduler, &mut machine, now, inputs) {
            timeline.push((now, record.to));
            match record.to {
                TurretState::PreActivate => {
                    assert_eq!(registers.flywheel_percent.get(), config.flywheel.arm_percent);
                }
                TurretState::Activate => {
                    assert_eq!(registers.yaw_mode.get(), YawMode::Position);
                    arrival = Some((now + 400, active));
                }
                TurretState::Fire => assert!(registers.fire.get()),
                TurretState::Return => arrival = Some((now + 300, home)),
                TurretState::Idle => break,
                TurretState::Track => {}
            }
        }
    }

    let states: Vec<_> = timeline.iter().map(|(_, state)| *state).collect();
    assert_eq!(
        states,
        [
            TurretState::PreActivate,
            TurretState::Activate,
            TurretState::Track,
            TurretState::Fire,
            TurretState::Return,
            TurretState::Idle,
        ]
    );

    let at = |index: usize| timeline[index].0;
    assert_eq!(at(0), 0);
    assert_eq!(at(1), 1_000);
    // Sensor arrives at 1400; two yaw periods to settle plus the post-settle hold.
    assert!((1_520..=1_545).contains(&at(2)), "track entered at {}", at(2));
    assert!(at(3) - at(2) <= 25, "fire entered at {}", at(3));
    assert_eq!(at(4) - at(3), 500);
    assert!(
        (at(4) + 320..=at(4) + 345).contains(&at(5)),
        "idle entered at {}",
        at(5)
    );

    assert_eq!(servo_shots.get(), 1);
    assert_eq!(registers.shots_fired.get(), 1);
    assert!(!registers.fire.get());
    assert!(!registers.tracking.get());
    assert_eq!(registers.yaw_mode.get(), YawMode::Idle);
    assert_eq!(registers.flywheel_percent.get(), 0.0);
    assert_eq!(machine.history().len(), 6);
}

#[test]
fn homing_zeroes_at_the_stop_before_a_duel_can_start() {
    let config = test_config();
    let registers = Registers::new();
    let raw_position = Cell::new(3_000);

    let mut yaw = YawTask::new(
        NullMotor,
        ScriptedEncoder::new(&raw_position),
        &registers,
        &config.yaw,
        0,
    );
    let mut scheduler: Scheduler<'_> = Scheduler::new();
    scheduler.add(config.tasks.yaw.spec("yaw"), &mut yaw).unwrap();
    let mut machine = TurretStateMachine::new(&registers, &config, 0);

    let stop = -2_000;
    let mut homed_at = None;
    for now in 0..3_000_u64 {
        // Axis creeps toward the stop at 10 counts/ms, then stalls there.
        let travelled = i32::try_from(now).unwrap() * 10;
        raw_position.set((3_000 - travelled).max(stop));

        let inputs = Inputs {
            home: now == 0,
            start: now == 100,
            ..Inputs::default()
        };
        assert_eq!(run_cycle(&mut scheduler, &mut machine, now, inputs), None);
        if !machine.is_homing() && homed_at.is_none() && now > 0 {
            homed_at = Some(now);
            break;
        }
    }

    let homed_at = homed_at.expect("homing never finished");
    // Stall begins at 500 ms, but the minimum homing duration holds until 1000 ms.
    assert!((1_000..=1_045).contains(&homed_at), "homed at {homed_at}");
    assert_eq!(registers.yaw_mode.get(), YawMode::Idle);
    assert_eq!(machine.state(), TurretState::Idle);

    for now in homed_at + 1..homed_at + 40 {
        run_cycle(&mut scheduler, &mut machine, now, Inputs::default());
    }
    assert_eq!(registers.yaw_position.get(), 0);
    assert!(!registers.yaw_homed.get());

    let record = run_cycle(
        &mut scheduler,
        &mut machine,
        homed_at + 40,
        Inputs {
            start: true,
            ..Inputs::default()
        },
    );
    assert_eq!(record.map(|r| r.to), Some(TurretState::PreActivate));
}

#[test]
fn abort_after_settling_still_travels_home() {
    let config = test_config();
    let registers = Registers::new();
    let raw_position = Cell::new(0);

    let mut yaw = YawTask::new(
        NullMotor,
        ScriptedEncoder::new(&raw_position),
        &registers,
        &config.yaw,
        0,
    );
    let mut scheduler: Scheduler<'_> = Scheduler::new();
    scheduler.add(config.tasks.yaw.spec("yaw"), &mut yaw).unwrap();
    let mut machine = TurretStateMachine::new(&registers, &config, 0);

    let active = counts(config.yaw.active_setpoint);
    let home = counts(config.yaw.home_setpoint);
    let mut aborted_at = None;
    let mut idle_at = None;

    for now in 0..5_000 {
        if now == 1_400 {
            raw_position.set(active);
        }
        let abort = aborted_at.is_none()
            && machine.state() == TurretState::Activate
            && registers.yaw_settled.get();
        if abort {
            aborted_at = Some(now);
        }
        if aborted_at.is_some_and(|at| now == at + 300) {
            raw_position.set(home);
        }

        let inputs = Inputs {
            start: now == 0,
            abort,
            ..Inputs::default()
        };
        if let Some(record) = run_cycle(&mut scheduler, &mut machine, now, inputs) {
            if record.to == TurretState::Idle {
                idle_at = Some(now);
                break;
            }
        }
        if aborted_at.is_some() && raw_position.get() == active {
            assert_eq!(machine.state(), TurretState::Return, "left Return at {now}");
            assert_eq!(registers.yaw_mode.get(), YawMode::Position);
        }
    }

    let aborted_at = aborted_at.expect("yaw never settled in Activate");
    let idle_at = idle_at.expect("never returned to Idle");
    assert!(
        idle_at > aborted_at + 300,
        "idle at {idle_at} before the axis left {active}"
    );
    assert_eq!(registers.yaw_position.get(), home);
    assert_eq!(registers.yaw_mode.get(), YawMode::Idle);
}
