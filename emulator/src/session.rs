//! Runs the turret core against the simulated bench, one simulated
//! millisecond per outer-loop iteration.

use std::io::{self, BufRead, Write};

use turret_core::Millis;
use turret_core::config::TurretConfig;
use turret_core::console::{self, Command, HELP};
use turret_core::registers::Registers;
use turret_core::scheduler::{Scheduler, SchedulerError};
use turret_core::tasks::{CameraTask, FiringTask, FlywheelTask, TrackerTask, YawTask};
use turret_core::turret::{Inputs, TurretState, TurretStateMachine, run_cycle};

use crate::plant::{
    BenchCamera, BenchEncoder, BenchFlywheel, BenchMotor, BenchServo, SharedBench, Wheel,
};
use crate::transcript::{TranscriptLogger, TranscriptRole};

/// Simulated time after which a scripted duel is considered stuck.
pub const SCRIPT_TIMEOUT_MS: Millis = 60_000;

pub enum Step {
    Continue(Inputs),
    Quit,
}

/// Read-only snapshot handed to the operator before each iteration.
pub struct View<'v, 'a> {
    pub now: Millis,
    pub machine: &'v TurretStateMachine<'a>,
    pub scheduler: &'v Scheduler<'a>,
    pub registers: &'a Registers,
    pub bench: &'v SharedBench,
}

/// Source of operator inputs: a fixed script or a human at the console.
pub trait Operator {
    fn poll(
        &mut self,
        view: &View<'_, '_>,
        transcript: &mut TranscriptLogger,
    ) -> io::Result<Step>;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Summary {
    pub final_state: TurretState,
    pub elapsed_ms: Millis,
    pub transitions: u32,
    pub shots_fired: u32,
    pub servo_pushes: u32,
    pub homed_at: Option<Millis>,
}

pub fn run(
    config: &TurretConfig,
    bench: &SharedBench,
    operator: &mut dyn Operator,
    transcript: &mut TranscriptLogger,
) -> io::Result<Summary> {
    let registers = Registers::new();

    let mut camera = CameraTask::new(BenchCamera(bench.clone()), &registers, &config.camera);
    let mut yaw = YawTask::new(
        BenchMotor(bench.clone()),
        BenchEncoder::new(bench.clone()),
        &registers,
        &config.yaw,
        0,
    );
    let mut tracker = TrackerTask::new(&registers, &config.tracker, 0);
    let mut firing = FiringTask::new(BenchServo(bench.clone()), &registers, &config.firing);
    let mut flywheel = FlywheelTask::new(
        BenchFlywheel {
            bench: bench.clone(),
            wheel: Wheel::Upper,
        },
        BenchFlywheel {
            bench: bench.clone(),
            wheel: Wheel::Lower,
        },
        &registers,
        &config.flywheel,
    );

    let [camera_spec, yaw_spec, tracker_spec, firing_spec, flywheel_spec] = config.tasks.specs();
    let mut scheduler: Scheduler<'_> = Scheduler::new();
    scheduler.add(camera_spec, &mut camera).map_err(scheduler_error)?;
    scheduler.add(yaw_spec, &mut yaw).map_err(scheduler_error)?;
    scheduler.add(tracker_spec, &mut tracker).map_err(scheduler_error)?;
    scheduler.add(firing_spec, &mut firing).map_err(scheduler_error)?;
    scheduler.add(flywheel_spec, &mut flywheel).map_err(scheduler_error)?;

    let mut machine = TurretStateMachine::new(&registers, config, 0);
    transcript.append_line(
        0,
        TranscriptRole::Turret,
        &format!("controller up, {} tasks registered", scheduler.len()),
    )?;

    let mut now: Millis = 0;
    let mut watch = Watch::default();

    loop {
        let view = View {
            now,
            machine: &machine,
            scheduler: &scheduler,
            registers: &registers,
            bench,
        };
        let Step::Continue(inputs) = operator.poll(&view, transcript)? else {
            break;
        };

        bench.borrow_mut().advance(now);
        if let Some(record) = run_cycle(&mut scheduler, &mut machine, now, inputs) {
            transcript.append_transition(&record)?;
        }
        watch.observe(now, &machine, &registers, bench, transcript)?;
        now += 1;
    }

    let stats = registers.camera_stats.get();
    transcript.append_line(
        now,
        TranscriptRole::Turret,
        &format!(
            "camera: accepted={} rejected={}",
            stats.accepted, stats.rejected
        ),
    )?;

    Ok(Summary {
        final_state: machine.state(),
        elapsed_ms: now,
        transitions: machine.history().total(),
        shots_fired: registers.shots_fired.get(),
        servo_pushes: bench.borrow().servo_pushes(),
        homed_at: watch.homed_at,
    })
}

fn scheduler_error(error: SchedulerError) -> io::Error {
    io::Error::other(error.to_string())
}

/// Reports homing and shots as they happen.
#[derive(Default)]
struct Watch {
    was_homing: bool,
    homed_at: Option<Millis>,
    shots: u32,
}

impl Watch {
    fn observe(
        &mut self,
        now: Millis,
        machine: &TurretStateMachine<'_>,
        registers: &Registers,
        bench: &SharedBench,
        transcript: &mut TranscriptLogger,
    ) -> io::Result<()> {
        let homing = machine.is_homing();
        if homing != self.was_homing {
            let line = if homing {
                "homing started"
            } else {
                self.homed_at = Some(now);
                "homed, encoder zeroed"
            };
            transcript.append_line(now, TranscriptRole::Turret, line)?;
            self.was_homing = homing;
        }

        let fired = registers.shots_fired.get();
        if fired != self.shots {
            self.shots = fired;
            let bench = bench.borrow();
            let line = format!(
                "shot {fired} away, yaw {:.2} deg, target {:.2} deg",
                bench.yaw_deg(),
                bench.target_deg()
            );
            transcript.append_line(now, TranscriptRole::Bench, &line)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ScriptPhase {
    Boot,
    Homing,
    Start,
    Engaged,
}

/// Homes, starts one duel and stops once the turret is back in `Idle`.
pub struct ScriptedDuel {
    phase: ScriptPhase,
    timeout_ms: Millis,
}

impl ScriptedDuel {
    pub fn new(timeout_ms: Millis) -> Self {
        Self {
            phase: ScriptPhase::Boot,
            timeout_ms,
        }
    }
}

impl Operator for ScriptedDuel {
    fn poll(
        &mut self,
        view: &View<'_, '_>,
        transcript: &mut TranscriptLogger,
    ) -> io::Result<Step> {
        if view.now >= self.timeout_ms {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!(
                    "duel stuck in {} after {} ms",
                    view.machine.state(),
                    view.now
                ),
            ));
        }

        let mut inputs = Inputs::default();
        match self.phase {
            ScriptPhase::Boot => {
                transcript.append_line(view.now, TranscriptRole::Host, "home")?;
                inputs.home = true;
                self.phase = ScriptPhase::Homing;
            }
            ScriptPhase::Homing => {
                if !view.machine.is_homing() {
                    self.phase = ScriptPhase::Start;
                }
            }
            ScriptPhase::Start => {
                transcript.append_line(view.now, TranscriptRole::Host, "start")?;
                inputs.start = true;
                self.phase = ScriptPhase::Engaged;
            }
            ScriptPhase::Engaged => {
                if view.machine.state() == TurretState::Idle {
                    return Ok(Step::Quit);
                }
            }
        }
        Ok(Step::Continue(inputs))
    }
}

/// Line-oriented operator console.
pub struct Console<R, W> {
    input: R,
    output: W,
    run_until: Millis,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            run_until: 0,
        }
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        write!(self.output, "> ")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn print_status(&mut self, view: &View<'_, '_>) -> io::Result<()> {
        let registers = view.registers;
        let bench = view.bench.borrow();
        let (upper, lower) = bench.flywheels();
        writeln!(
            self.output,
            "t={}ms state={} homing={} yaw_mode={}",
            view.now,
            view.machine.state(),
            view.machine.is_homing(),
            registers.yaw_mode.get()
        )?;
        writeln!(
            self.output,
            "yaw {:.2} deg ({} counts) duty={:.1}% settled={} target {:.2} deg",
            bench.yaw_deg(),
            registers.yaw_position.get(),
            bench.duty(),
            registers.yaw_settled.get(),
            bench.target_deg()
        )?;
        writeln!(
            self.output,
            "camera x={:.2} y={:.2} tracking={} track_settled={}",
            registers.camera_x.get(),
            registers.camera_y.get(),
            registers.tracking.get(),
            registers.track_settled.get()
        )?;
        writeln!(
            self.output,
            "flywheels upper={upper:.1}% lower={lower:.1}% shots={}",
            registers.shots_fired.get()
        )?;
        for (_, spec, stats) in view.scheduler.iter() {
            writeln!(
                self.output,
                "  {:<8} runs={} late={} worst={}ms",
                spec.name, stats.runs, stats.late_runs, stats.max_lateness_ms
            )?;
        }
        Ok(())
    }
}

impl<R: BufRead, W: Write> Operator for Console<R, W> {
    fn poll(
        &mut self,
        view: &View<'_, '_>,
        transcript: &mut TranscriptLogger,
    ) -> io::Result<Step> {
        if view.now < self.run_until {
            return Ok(Step::Continue(Inputs::default()));
        }

        loop {
            let Some(line) = self.read_line()? else {
                return Ok(Step::Quit);
            };
            if line.is_empty() {
                continue;
            }
            if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
                writeln!(self.output, "Session closed.")?;
                return Ok(Step::Quit);
            }
            transcript.append_line(view.now, TranscriptRole::Host, &line)?;

            match console::parse(&line) {
                Ok(command @ (Command::Start | Command::Home | Command::Abort)) => {
                    return Ok(Step::Continue(command.inputs().unwrap_or_default()));
                }
                Ok(Command::Run(ms)) => {
                    self.run_until = view.now + Millis::from(ms);
                    return Ok(Step::Continue(Inputs::default()));
                }
                Ok(Command::Target(degrees)) => {
                    view.bench.borrow_mut().set_target_deg(degrees);
                    writeln!(self.output, "target moved to {degrees:.2} deg")?;
                }
                Ok(Command::Status) => self.print_status(view)?,
                Ok(Command::Help) => writeln!(self.output, "{HELP}")?,
                Err(error) => writeln!(self.output, "error: {error}")?,
            }
        }
    }
}
