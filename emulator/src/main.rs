mod plant;
mod session;
mod transcript;

use std::env;
use std::io;
use std::path::PathBuf;
use std::process;

use turret_core::config::TurretConfig;

use plant::Bench;
use session::{Console, SCRIPT_TIMEOUT_MS, ScriptedDuel};
use transcript::TranscriptLogger;

const USAGE: &str = "Usage: turret-emulator [--pre-arm-ms <ms>] [--target-deg <deg>] \
                     [--start-deg <deg>] [--transcript <path>] [--interactive]";

#[derive(Debug)]
struct Options {
    pre_arm_ms: Option<u64>,
    target_deg: f32,
    start_deg: f32,
    transcript: Option<PathBuf>,
    interactive: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            pre_arm_ms: None,
            target_deg: 195.0,
            start_deg: 30.0,
            transcript: None,
            interactive: false,
        }
    }
}

fn main() -> io::Result<()> {
    let options = parse_options(env::args().skip(1)).unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("{USAGE}");
        process::exit(2);
    });

    let mut config = TurretConfig::DEFAULT;
    if let Some(pre_arm_ms) = options.pre_arm_ms {
        config.duel.pre_arm_ms = pre_arm_ms;
    }
    if let Err(err) = config.validate() {
        eprintln!("invalid configuration: {err}");
        process::exit(2);
    }

    let bench = Bench::new(options.start_deg, options.target_deg, config.tracker.offset_x).shared();
    let mut transcript = TranscriptLogger::new(options.transcript.as_deref())?;

    let summary = if options.interactive {
        println!("Turret emulator ready. Type `help` for commands or `exit` to quit.");
        let stdin = io::stdin();
        let stdout = io::stdout();
        let mut console = Console::new(stdin.lock(), stdout.lock());
        session::run(&config, &bench, &mut console, &mut transcript)?
    } else {
        let mut script = ScriptedDuel::new(SCRIPT_TIMEOUT_MS);
        session::run(&config, &bench, &mut script, &mut transcript)?
    };

    println!(
        "finished in {} after {} ms: {} transitions, {} shot(s), servo pushed {} time(s)",
        summary.final_state,
        summary.elapsed_ms,
        summary.transitions,
        summary.shots_fired,
        summary.servo_pushes
    );
    Ok(())
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<Options, String> {
    let mut options = Options::default();
    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
            None => (arg, None),
        };
        if flag == "--interactive" {
            options.interactive = true;
            continue;
        }
        let value = match inline {
            Some(value) => value,
            None => args
                .next()
                .ok_or_else(|| format!("Expected value after {flag}"))?,
        };
        match flag.as_str() {
            "--pre-arm-ms" => options.pre_arm_ms = Some(parse_value(&flag, &value)?),
            "--target-deg" => options.target_deg = parse_value(&flag, &value)?,
            "--start-deg" => options.start_deg = parse_value(&flag, &value)?,
            "--transcript" => options.transcript = Some(PathBuf::from(value)),
            _ => return Err(format!("Unknown option `{flag}`")),
        }
    }
    Ok(options)
}

fn parse_value<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("Invalid value `{value}` for {flag}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Options, String> {
        parse_options(args.iter().map(ToString::to_string))
    }

    #[test]
    fn defaults_run_the_scripted_duel() {
        let options = parse(&[]).unwrap();
        assert!(!options.interactive);
        assert!(options.pre_arm_ms.is_none());
        assert!(options.transcript.is_none());
    }

    #[test]
    fn accepts_split_and_inline_values() {
        let options = parse(&[
            "--pre-arm-ms",
            "250",
            "--target-deg=180.5",
            "--transcript",
            "out/duel.log",
            "--interactive",
        ])
        .unwrap();
        assert_eq!(options.pre_arm_ms, Some(250));
        assert!((options.target_deg - 180.5).abs() < f32::EPSILON);
        assert_eq!(options.transcript, Some(PathBuf::from("out/duel.log")));
        assert!(options.interactive);
    }

    #[test]
    fn rejects_unknown_and_malformed_options() {
        assert!(parse(&["--profile", "reboot"]).is_err());
        assert!(parse(&["--pre-arm-ms", "soon"]).is_err());
        assert!(parse(&["--target-deg"]).is_err());
    }
}
