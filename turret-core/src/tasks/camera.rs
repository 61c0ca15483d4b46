//! Drains the camera link and publishes target offsets.

use heapless::Vec;

use crate::Millis;
use crate::camera::{self, FrameBounds, MAX_RECORD_LEN, RecordError};
use crate::config::CameraConfig;
use crate::hal::CameraLink;
use crate::registers::Registers;
use crate::scheduler::Task;

/// Running counters for the camera feed.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct CameraStats {
    pub accepted: u32,
    pub rejected: u32,
    pub last_error: Option<RecordError>,
}

impl CameraStats {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            accepted: 0,
            rejected: 0,
            last_error: None,
        }
    }
}

pub struct CameraTask<'a, L> {
    link: L,
    registers: &'a Registers,
    bounds: FrameBounds,
    max_bytes_per_step: usize,
    line: Vec<u8, MAX_RECORD_LEN>,
    overflowed: bool,
    stats: CameraStats,
}

impl<'a, L: CameraLink> CameraTask<'a, L> {
    pub fn new(link: L, registers: &'a Registers, config: &CameraConfig) -> Self {
        Self {
            link,
            registers,
            bounds: FrameBounds::from_config(config),
            max_bytes_per_step: config.max_bytes_per_step,
            line: Vec::new(),
            overflowed: false,
            stats: CameraStats::new(),
        }
    }

    #[must_use]
    pub fn stats(&self) -> CameraStats {
        self.stats
    }

    #[must_use]
    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    fn finish_line(&mut self) {
        let outcome = if self.overflowed {
            Err(RecordError::Overflow)
        } else if self.line.is_empty() {
            // Second half of a `\r\n` pair.
            return;
        } else {
            camera::decode(&self.line, &self.bounds)
        };
        self.line.clear();
        self.overflowed = false;

        match outcome {
            Ok(record) => {
                self.registers.camera_x.put(record.x);
                self.registers.camera_y.put(record.y);
                self.stats.accepted = self.stats.accepted.saturating_add(1);
            }
            Err(error) => {
                self.stats.rejected = self.stats.rejected.saturating_add(1);
                self.stats.last_error = Some(error);
            }
        }
        self.registers.camera_stats.put(self.stats);
    }
}

impl<L: CameraLink> Task for CameraTask<'_, L> {
    fn step(&mut self, _now: Millis) {
        for _ in 0..self.max_bytes_per_step {
            let Some(byte) = self.link.read_byte() else {
                break;
            };
            match byte {
                b'\n' | b'\r' => self.finish_line(),
                _ if self.overflowed => {}
                _ => {
                    if self.line.push(byte).is_err() {
                        self.overflowed = true;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    extern crate std;

    use std::collections::VecDeque;

    use super::*;
    use crate::config::TurretConfig;

    struct ScriptedLink {
        bytes: VecDeque<u8>,
    }

    impl ScriptedLink {
        fn new(text: &[u8]) -> Self {
            Self {
                bytes: text.iter().copied().collect(),
            }
        }
    }

    impl CameraLink for ScriptedLink {
        fn read_byte(&mut self) -> Option<u8> {
            self.bytes.pop_front()
        }
    }

    #[test]
    fn publishes_valid_records_and_counts_rejects() {
        let registers = Registers::new();
        let config = TurretConfig::DEFAULT.camera;
        let link = ScriptedLink::new(b"1.5,-2.0\r\n20.0,1.0\ngarbage\n-3.25, 4.5\n");
        let mut task = CameraTask::new(link, &registers, &config);

        task.step(0);

        assert_eq!(registers.camera_x.get(), -3.25);
        assert_eq!(registers.camera_y.get(), 4.5);
        let stats = task.stats();
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.rejected, 2);
        assert_eq!(stats.last_error, Some(RecordError::Syntax));
        assert_eq!(registers.camera_stats.get(), stats);
    }

    #[test]
    fn out_of_range_record_leaves_registers_untouched() {
        let registers = Registers::new();
        let config = TurretConfig::DEFAULT.camera;
        let mut task = CameraTask::new(ScriptedLink::new(b"2.0,3.0\n2.0,13.0\n"), &registers, &config);

        task.step(0);

        assert_eq!(registers.camera_x.get(), 2.0);
        assert_eq!(registers.camera_y.get(), 3.0);
        assert_eq!(task.stats().last_error, Some(RecordError::OutOfRange));
    }

    #[test]
    fn drains_a_bounded_number_of_bytes_per_step() {
        let registers = Registers::new();
        let mut config = TurretConfig::DEFAULT.camera;
        config.max_bytes_per_step = 4;
        let mut task = CameraTask::new(ScriptedLink::new(b"1.0,2.0\n"), &registers, &config);

        task.step(0);
        assert_eq!(task.stats().accepted, 0);
        assert_eq!(task.link().bytes.len(), 4);
        task.step(33);
        assert_eq!(task.stats().accepted, 1);
        assert_eq!(registers.camera_x.get(), 1.0);
    }

    #[test]
    fn overlong_line_is_dropped_whole() {
        let registers = Registers::new();
        let config = TurretConfig::DEFAULT.camera;
        let mut text = [b'1'; MAX_RECORD_LEN + 8];
        text[MAX_RECORD_LEN + 7] = b'\n';
        let mut task = CameraTask::new(ScriptedLink::new(&text), &registers, &config);
        task.link_mut().bytes.extend(b"4.0,5.0\n");

        task.step(0);
        task.step(33);

        let stats = task.stats();
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.accepted, 1);
        assert_eq!(registers.camera_x.get(), 4.0);
    }
}
