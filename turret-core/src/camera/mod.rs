//! Thermal-camera record codec.
//!
//! The camera coprocessor streams one record per frame as ASCII text,
//! `"<x>,<y>"` terminated by `\n` or `\r`, giving the hottest blob's offset from
//! the frame centre in pixels. Records outside the sensor frame are noise and
//! are rejected whole so the two axes never disagree about which frame they
//! came from.

use core::fmt;

use winnow::ascii::{float, space0};
use winnow::error::ContextError;
use winnow::prelude::*;

use crate::config::CameraConfig;
use crate::magnitude;

/// Longest record the camera task buffers before discarding the line.
pub const MAX_RECORD_LEN: usize = 32;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CameraRecord {
    pub x: f32,
    pub y: f32,
}

/// Frame half-extents; a record is valid only strictly inside them.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FrameBounds {
    pub x_limit: f32,
    pub y_limit: f32,
}

impl FrameBounds {
    #[must_use]
    pub const fn from_config(config: &CameraConfig) -> Self {
        Self {
            x_limit: config.x_limit,
            y_limit: config.y_limit,
        }
    }

    /// NaN never compares below a limit, so it is rejected here too.
    #[must_use]
    pub fn contains(&self, record: &CameraRecord) -> bool {
        magnitude(record.x) < self.x_limit && magnitude(record.y) < self.y_limit
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RecordError {
    /// The line was not valid UTF-8.
    Encoding,
    /// The line held only whitespace.
    Empty,
    /// The line was not two comma-separated numbers.
    Syntax,
    /// A coordinate fell outside the sensor frame.
    OutOfRange,
    /// The line exceeded [`MAX_RECORD_LEN`] bytes.
    Overflow,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::Encoding => f.write_str("record is not valid UTF-8"),
            RecordError::Empty => f.write_str("empty record"),
            RecordError::Syntax => f.write_str("expected `<x>,<y>`"),
            RecordError::OutOfRange => f.write_str("offset outside the camera frame"),
            RecordError::Overflow => write!(f, "record longer than {MAX_RECORD_LEN} bytes"),
        }
    }
}

/// Parses and validates one raw line (terminator already stripped).
///
/// # Errors
///
/// Returns a [`RecordError`] describing why the line was discarded.
pub fn decode(line: &[u8], bounds: &FrameBounds) -> Result<CameraRecord, RecordError> {
    let text = core::str::from_utf8(line).map_err(|_| RecordError::Encoding)?;
    parse_record(text, bounds)
}

/// Parses and validates one record.
///
/// # Errors
///
/// Returns a [`RecordError`] describing why the text was discarded.
pub fn parse_record(text: &str, bounds: &FrameBounds) -> Result<CameraRecord, RecordError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(RecordError::Empty);
    }
    let record = record().parse(text).map_err(|_| RecordError::Syntax)?;
    if bounds.contains(&record) {
        Ok(record)
    } else {
        Err(RecordError::OutOfRange)
    }
}

fn record<'a>() -> impl Parser<&'a str, CameraRecord, ContextError> {
    move |input: &mut &'a str| {
        let x: f32 = float.parse_next(input)?;
        (space0, ',', space0).parse_next(input)?;
        let y: f32 = float.parse_next(input)?;
        Ok(CameraRecord { x, y })
    }
}
