use thiserror::Error;

use crate::ProcessId;

/// Errors surfaced by queues, transports, snapshots and process setup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A ring needs one free slot to tell full from empty, so capacity must be at least 2.
    #[error("queue capacity must be in 2..={max}, got {0}", max = crate::config::MAX_QUEUE_CAPACITY)]
    InvalidCapacity(usize),

    #[error("participant count must be in 1..={max}, got {0}", max = crate::config::MAX_PARTICIPANTS)]
    InvalidParticipants(usize),

    #[error("process {id} is outside the group of {participants} participants")]
    InvalidProcess { id: ProcessId, participants: usize },

    /// The queue was closed by shutdown and holds no more items.
    #[error("queue closed")]
    QueueClosed,

    #[error("transport disconnected at process {0}")]
    Disconnected(ProcessId),

    #[error("process {destination} is unreachable")]
    Unreachable { destination: ProcessId },

    #[error("snapshot already open at process {0}")]
    SnapshotAlreadyOpen(ProcessId),

    #[error("no snapshot open at process {0}")]
    SnapshotNotOpen(ProcessId),

    #[error("config error: {0}")]
    Config(String),

    /// A pump or driver thread could not be spawned, or panicked.
    #[error("{thread} thread of process {process} failed: {reason}")]
    Thread {
        process: ProcessId,
        thread: &'static str,
        reason: String,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
