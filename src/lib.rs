//! A closed group of processes exchanging vector clocks over reliable FIFO channels.
//!
//! Each process owns one live [`VectorClock`], two [`BoundedQueue`]s decoupling the application
//! from the network, a [`ChannelPump`] moving messages between those queues and a
//! [`Transport`], and a [`SnapshotRecorder`] capturing its local clock on demand.

/// The (Lamport) Clock Condition gives that if `a` happens before `b` (denoted `a -> b`), then
/// `TS(a) < TS(b)`. Vector clocks guarantee a stronger condition: `a -> b` <=> `TS(a) < TS(b)`.
pub mod vector_clock;

pub mod config;
pub mod error;
pub mod message;
pub mod observer;
pub mod process;
pub mod pump;
pub mod queue;
pub mod scenario;
pub mod snapshot;
pub mod transport;

pub use config::{Config, MAX_PARTICIPANTS, MAX_QUEUE_CAPACITY};
pub use error::{Error, Result};
pub use message::Message;
pub use observer::{EventSink, LogRecord, RecordingSink, StdoutSink, TracingSink};
pub use process::Process;
pub use pump::ChannelPump;
pub use queue::BoundedQueue;
pub use scenario::{ProcessOutcome, ScenarioReport, Step, run_reference_scenario, script_for};
pub use snapshot::{SnapshotRecorder, SnapshotState};
pub use transport::{InMemoryEndpoint, InMemoryNetwork, Transport};
pub use vector_clock::VectorClock;

/// Identity of a participant, in `0..participants`.
pub type ProcessId = usize;

/// The three operations every logical clock supports.
pub trait LamportClock: Sized {
    /// Records a local event.
    fn bump(&mut self);

    /// Records a send event and returns the timestamp to piggyback on the outgoing message.
    fn send(&mut self) -> Self;

    /// Records the receipt of a message carrying `incoming_clock`.
    fn receive(&mut self, incoming_clock: &Self);
}
