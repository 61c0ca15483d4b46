use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crossterm::style::{StyledContent, Stylize};
use turret_core::Millis;
use turret_core::telemetry::TransitionRecord;
use turret_core::turret::TurretState;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TranscriptRole {
    Host,
    Turret,
    Bench,
}

impl TranscriptRole {
    fn prefix(self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Turret => "TRT <",
            TranscriptRole::Bench => "SIM <",
        }
    }
}

/// Writes timestamped lines to the terminal, coloured, and optionally to a
/// plain-text file.
pub struct TranscriptLogger {
    console: bool,
    file: Option<BufWriter<File>>,
}

impl TranscriptLogger {
    pub fn new(path: Option<&Path>) -> io::Result<Self> {
        let file = match path {
            Some(path) => Some(Self::open(path)?),
            None => None,
        };
        let mut logger = Self {
            console: true,
            file,
        };
        logger.write_header()?;
        Ok(logger)
    }

    /// Discards everything; used by tests.
    #[cfg(test)]
    pub fn silent() -> Self {
        Self {
            console: false,
            file: None,
        }
    }

    fn open(path: &Path) -> io::Result<BufWriter<File>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Ok(BufWriter::new(file))
    }

    fn write_header(&mut self) -> io::Result<()> {
        if let Some(file) = self.file.as_mut() {
            writeln!(file, "# Turret emulator transcript")?;
            writeln!(file, "# Timestamps are simulated milliseconds since boot")?;
            writeln!(file)?;
            file.flush()?;
        }
        Ok(())
    }

    pub fn append_line(&mut self, at: Millis, role: TranscriptRole, line: &str) -> io::Result<()> {
        if self.console {
            let prefix = match role {
                TranscriptRole::Host => role.prefix().cyan(),
                TranscriptRole::Turret => role.prefix().bold(),
                TranscriptRole::Bench => role.prefix().dark_grey(),
            };
            println!("[+{at:>6} ms] {prefix} {line}");
        }
        if let Some(file) = self.file.as_mut() {
            writeln!(file, "[+{at:>6} ms] {} {line}", role.prefix())?;
            file.flush()?;
        }
        Ok(())
    }

    /// Logs a state change with the destination state highlighted on the terminal.
    pub fn append_transition(&mut self, record: &TransitionRecord) -> io::Result<()> {
        let TransitionRecord {
            sequence,
            at,
            from,
            to,
            cause,
        } = *record;
        let cause = cause.label();
        if self.console {
            let prefix = TranscriptRole::Turret.prefix().bold();
            println!(
                "[+{at:>6} ms] {prefix} #{sequence} {} -> {} ({cause})",
                from.label(),
                state_colour(to)
            );
        }
        if let Some(file) = self.file.as_mut() {
            writeln!(
                file,
                "[+{at:>6} ms] {} #{sequence} {} -> {} ({cause})",
                TranscriptRole::Turret.prefix(),
                from.label(),
                to.label()
            )?;
            file.flush()?;
        }
        Ok(())
    }
}

fn state_colour(state: TurretState) -> StyledContent<&'static str> {
    let label = state.label();
    match state {
        TurretState::Idle => label.green(),
        TurretState::PreActivate | TurretState::Activate => label.yellow(),
        TurretState::Track => label.blue(),
        TurretState::Fire => label.red().bold(),
        TurretState::Return => label.magenta(),
    }
}
