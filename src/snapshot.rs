//! Local clock capture.
//!
//! A snapshot here is a copy of one process's vector clock taken at the moment the snapshot is
//! opened. It is **not** a Chandy-Lamport global snapshot: no markers are sent to other
//! processes and no in-flight channel state is recorded.
//!
//! The recorder is a two-state machine, `Idle -> Open -> Idle`. Opening twice, or recording or
//! closing while idle, fails with a dedicated error instead of being ignored.

use crate::{Error, ProcessId, Result, VectorClock};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SnapshotState {
    #[default]
    Idle,
    Open {
        initiator: ProcessId,
        captured: VectorClock,
    },
}

#[derive(Debug)]
pub struct SnapshotRecorder {
    owner: ProcessId,
    state: SnapshotState,
}

impl SnapshotRecorder {
    pub fn new(owner: ProcessId) -> Self {
        Self {
            owner,
            state: SnapshotState::Idle,
        }
    }

    pub fn state(&self) -> &SnapshotState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, SnapshotState::Open { .. })
    }

    /// Captures a copy of `clock`, moving `Idle -> Open`.
    pub fn start(&mut self, clock: &VectorClock) -> Result<&VectorClock> {
        if self.is_open() {
            return Err(Error::SnapshotAlreadyOpen(self.owner));
        }
        self.state = SnapshotState::Open {
            initiator: self.owner,
            captured: clock.clone(),
        };
        self.captured()
    }

    /// The captured clock. Reading it never changes it.
    pub fn captured(&self) -> Result<&VectorClock> {
        match &self.state {
            SnapshotState::Open { captured, .. } => Ok(captured),
            SnapshotState::Idle => Err(Error::SnapshotNotOpen(self.owner)),
        }
    }

    /// Releases the captured clock, moving `Open -> Idle`.
    pub fn end(&mut self) -> Result<VectorClock> {
        match std::mem::take(&mut self.state) {
            SnapshotState::Open { captured, .. } => Ok(captured),
            SnapshotState::Idle => Err(Error::SnapshotNotOpen(self.owner)),
        }
    }
}
