//! Duel transition log shared by firmware and host targets.
//!
//! The core never prints. Instead the state machine appends every transition
//! to a fixed-size ring that the firmware drains into `defmt` and the emulator
//! renders into its transcript.

use core::fmt;

use heapless::{HistoryBuf, OldestOrdered};

use crate::Millis;
use crate::turret::TurretState;

/// Number of transitions retained; older entries are overwritten.
pub const TRANSITION_LOG_CAPACITY: usize = 32;

/// Why the state machine moved.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TransitionCause {
    StartRequested,
    PreArmElapsed,
    YawSettled,
    TargetSettled,
    FireElapsed,
    Aborted,
    ReturnedHome,
}

impl TransitionCause {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            TransitionCause::StartRequested => "start requested",
            TransitionCause::PreArmElapsed => "pre-arm elapsed",
            TransitionCause::YawSettled => "yaw settled",
            TransitionCause::TargetSettled => "target settled",
            TransitionCause::FireElapsed => "fire elapsed",
            TransitionCause::Aborted => "aborted",
            TransitionCause::ReturnedHome => "returned home",
        }
    }
}

impl fmt::Display for TransitionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TransitionRecord {
    /// Monotonic sequence number, starting at zero.
    pub sequence: u32,
    pub at: Millis,
    pub from: TurretState,
    pub to: TurretState,
    pub cause: TransitionCause,
}

impl fmt::Display for TransitionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} t={}ms {} -> {} ({})",
            self.sequence, self.at, self.from, self.to, self.cause
        )
    }
}

pub struct TransitionLog {
    ring: HistoryBuf<TransitionRecord, TRANSITION_LOG_CAPACITY>,
    next_sequence: u32,
}

impl TransitionLog {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            next_sequence: 0,
        }
    }

    pub fn record(
        &mut self,
        at: Millis,
        from: TurretState,
        to: TurretState,
        cause: TransitionCause,
    ) -> TransitionRecord {
        let record = TransitionRecord {
            sequence: self.next_sequence,
            at,
            from,
            to,
            cause,
        };
        self.next_sequence = self.next_sequence.wrapping_add(1);
        self.ring.write(record);
        record
    }

    /// Iterates retained transitions from oldest to newest.
    pub fn oldest_first(&self) -> OldestOrdered<'_, TransitionRecord> {
        self.ring.oldest_ordered()
    }

    #[must_use]
    pub fn latest(&self) -> Option<&TransitionRecord> {
        self.ring.recent()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.len() == 0
    }

    /// Total transitions recorded, including overwritten ones.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.next_sequence
    }
}

impl Default for TransitionLog {
    fn default() -> Self {
        Self::new()
    }
}
