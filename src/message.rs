use serde::{Deserialize, Serialize};

use crate::{ProcessId, VectorClock};

/// A vector timestamp in transit from `sender` to `destination`.
///
/// The clock is the sender's state right after its send event; it is never touched again once
/// the message exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    sender: ProcessId,
    destination: ProcessId,
    clock: VectorClock,
}

impl Message {
    pub fn new(sender: ProcessId, destination: ProcessId, clock: VectorClock) -> Self {
        Self {
            sender,
            destination,
            clock,
        }
    }

    #[inline]
    pub fn sender(&self) -> ProcessId {
        self.sender
    }

    #[inline]
    pub fn destination(&self) -> ProcessId {
        self.destination
    }

    #[inline]
    pub fn clock(&self) -> &VectorClock {
        &self.clock
    }

    pub fn into_clock(self) -> VectorClock {
        self.clock
    }
}
