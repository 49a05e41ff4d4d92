//! The observable stream of clock activity.
//!
//! Every event, send, receive, snapshot start and snapshot record produces one [`LogRecord`].
//! Records are handed to an [`EventSink`] injected when a process is built, keeping output
//! concerns out of the clock logic. The `Display` form of a record is the line format downstream
//! tooling parses:
//!
//! ```text
//! Event: 0, Clock: (1, 0, 0)
//! Send: 0, Clock: (2, 0, 0)
//! Receive: 1, Clock: (2, 2, 0)
//! Snapshot started by process 0
//! Snapshot value at process 0: Clock (1, 0, 0)
//! ```

use parking_lot::Mutex;
use std::fmt;
use std::io::Write;
use tracing::{info, warn};

use crate::{ProcessId, VectorClock};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRecord {
    Event {
        process: ProcessId,
        clock: VectorClock,
    },
    /// Emitted by the pump once the message has been handed to the transport. `clock` is the
    /// timestamp carried by the message.
    Send {
        process: ProcessId,
        destination: ProcessId,
        clock: VectorClock,
    },
    /// `clock` is the receiver's clock after the merge.
    Receive {
        process: ProcessId,
        sender: ProcessId,
        clock: VectorClock,
    },
    SnapshotStarted {
        process: ProcessId,
        captured: VectorClock,
    },
    SnapshotRecorded {
        process: ProcessId,
        captured: VectorClock,
    },
}

impl LogRecord {
    pub fn process(&self) -> ProcessId {
        match self {
            LogRecord::Event { process, .. }
            | LogRecord::Send { process, .. }
            | LogRecord::Receive { process, .. }
            | LogRecord::SnapshotStarted { process, .. }
            | LogRecord::SnapshotRecorded { process, .. } => *process,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LogRecord::Event { .. } => "Event",
            LogRecord::Send { .. } => "Send",
            LogRecord::Receive { .. } => "Receive",
            LogRecord::SnapshotStarted { .. } => "SnapshotStarted",
            LogRecord::SnapshotRecorded { .. } => "SnapshotRecorded",
        }
    }

    pub fn clock(&self) -> &VectorClock {
        match self {
            LogRecord::Event { clock, .. }
            | LogRecord::Send { clock, .. }
            | LogRecord::Receive { clock, .. } => clock,
            LogRecord::SnapshotStarted { captured, .. }
            | LogRecord::SnapshotRecorded { captured, .. } => captured,
        }
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogRecord::Event { process, clock } => write!(f, "Event: {process}, Clock: {clock}"),
            LogRecord::Send { process, clock, .. } => write!(f, "Send: {process}, Clock: {clock}"),
            LogRecord::Receive { process, clock, .. } => {
                write!(f, "Receive: {process}, Clock: {clock}")
            }
            LogRecord::SnapshotStarted { process, .. } => {
                write!(f, "Snapshot started by process {process}")
            }
            LogRecord::SnapshotRecorded { process, captured } => {
                write!(f, "Snapshot value at process {process}: Clock {captured}")
            }
        }
    }
}

/// Destination for [`LogRecord`]s. Called from the driver thread and from pump threads.
pub trait EventSink: Send + Sync {
    fn record(&self, record: &LogRecord);
}

/// Emits each record as an `info` event on the `causal_clock::observer` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, record: &LogRecord) {
        info!(
            process = record.process(),
            kind = record.kind(),
            clock = %record.clock(),
            "{record}"
        );
    }
}

/// Prints the bare record lines to standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl EventSink for StdoutSink {
    fn record(&self, record: &LogRecord) {
        // Lock once per line so lines from different threads never interleave.
        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "{record}") {
            warn!(process = record.process(), error = %e, "stdout write failed");
        }
    }
}

/// Keeps every record in memory, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: Mutex<Vec<LogRecord>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Records emitted by one process, in order.
    pub fn records_for(&self, process: ProcessId) -> Vec<LogRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.process() == process)
            .cloned()
            .collect()
    }

    pub fn lines(&self) -> Vec<String> {
        self.records.lock().iter().map(ToString::to_string).collect()
    }
}

impl EventSink for RecordingSink {
    fn record(&self, record: &LogRecord) {
        self.records.lock().push(record.clone());
    }
}

impl<S: EventSink + ?Sized> EventSink for std::sync::Arc<S> {
    fn record(&self, record: &LogRecord) {
        (**self).record(record);
    }
}
