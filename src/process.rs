use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    BoundedQueue, ChannelPump, Config, EventSink, LogRecord, Message, ProcessId, Result,
    SnapshotRecorder, Transport, VectorClock,
};

/// One participant of the group.
///
/// The process owns its live [`VectorClock`] exclusively: only the thread driving the process
/// mutates it, through [`event`](Self::event), [`send`](Self::send) and
/// [`receive`](Self::receive). The pump threads only ever see immutable copies inside
/// [`Message`]s, and the two queues are the only state shared with them.
pub struct Process {
    clock: VectorClock,
    snapshot: SnapshotRecorder,
    config: Config,
    inbound: Arc<BoundedQueue<Message>>,
    outbound: Arc<BoundedQueue<Message>>,
    pump: Option<ChannelPump>,
    sink: Arc<dyn EventSink>,
}

impl Process {
    /// Starts participant `transport.local()`: validates the group config and identity, creates
    /// both queues and starts the pump threads.
    pub fn spawn<T>(config: &Config, transport: T, sink: Arc<dyn EventSink>) -> Result<Self>
    where
        T: Transport + 'static,
    {
        config.validate()?;
        let id = transport.local();
        config.check_process(id)?;

        let inbound = Arc::new(BoundedQueue::new(config.queue_capacity)?);
        let outbound = Arc::new(BoundedQueue::new(config.queue_capacity)?);
        let pump = ChannelPump::start(
            Arc::new(transport),
            Arc::clone(&inbound),
            Arc::clone(&outbound),
            Arc::clone(&sink),
        )?;

        debug!(process = id, participants = config.participants, "process started");
        Ok(Self {
            clock: VectorClock::new(id, config.participants),
            snapshot: SnapshotRecorder::new(id),
            config: *config,
            inbound,
            outbound,
            pump: Some(pump),
            sink,
        })
    }

    pub fn id(&self) -> ProcessId {
        self.clock.owner()
    }

    pub fn clock(&self) -> &VectorClock {
        &self.clock
    }

    pub fn snapshot(&self) -> &SnapshotRecorder {
        &self.snapshot
    }

    /// A local computation step.
    pub fn event(&mut self) {
        self.clock.bump();
        self.sink.record(&LogRecord::Event {
            process: self.id(),
            clock: self.clock.clone(),
        });
    }

    /// Counts a send event and queues a copy of the resulting clock for `target`.
    ///
    /// Returns once the message is queued, not once it is delivered; blocks only while the
    /// outbound queue is full. The `Send` record is emitted by the pump after transmission.
    /// A message the transport later refuses, e.g. because `target` already shut down, gets no
    /// `Send` record and is counted by [`dropped_sends`](Self::dropped_sends) instead.
    pub fn send(&mut self, target: ProcessId) -> Result<()> {
        self.config.check_process(target)?;
        let stamp = self.clock.send();
        self.outbound.enqueue(Message::new(self.id(), target, stamp))
    }

    /// Blocks until a message arrives, counts the receive event and merges the message's clock
    /// into the live one.
    ///
    /// Returns the message as received, i.e. carrying the sender's clock from before the merge.
    pub fn receive(&mut self) -> Result<Message> {
        let message = self.inbound.dequeue()?;
        self.clock.receive(message.clock());
        self.sink.record(&LogRecord::Receive {
            process: self.id(),
            sender: message.sender(),
            clock: self.clock.clone(),
        });
        Ok(message)
    }

    /// Outbound messages the transport refused so far.
    pub fn dropped_sends(&self) -> usize {
        self.pump.as_ref().map_or(0, ChannelPump::dropped_sends)
    }

    /// Opens a local snapshot of the current clock.
    pub fn start_snapshot(&mut self) -> Result<()> {
        let captured = self.snapshot.start(&self.clock)?.clone();
        self.sink.record(&LogRecord::SnapshotStarted {
            process: self.id(),
            captured,
        });
        Ok(())
    }

    /// Reports the clock captured by the open snapshot.
    pub fn record_state(&self) -> Result<VectorClock> {
        let captured = self.snapshot.captured()?.clone();
        self.sink.record(&LogRecord::SnapshotRecorded {
            process: self.id(),
            captured: captured.clone(),
        });
        Ok(captured)
    }

    /// Closes the open snapshot and hands back what it captured.
    pub fn end_snapshot(&mut self) -> Result<VectorClock> {
        self.snapshot.end()
    }

    /// Opens, records and closes a snapshot in one go.
    pub fn take_snapshot(&mut self) -> Result<VectorClock> {
        self.start_snapshot()?;
        self.record_state()?;
        self.end_snapshot()
    }

    /// Stops the pump threads and returns the final clock.
    ///
    /// Messages still in the outbound queue are transmitted first.
    pub fn shutdown(mut self) -> Result<VectorClock> {
        if let Some(pump) = self.pump.take() {
            pump.shutdown()?;
        }
        debug!(process = self.id(), clock = %self.clock, "process stopped");
        Ok(self.clock.clone())
    }
}

impl Drop for Process {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            if let Err(e) = pump.shutdown() {
                warn!(process = self.id(), error = %e, "pump stopped uncleanly");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, InMemoryNetwork, RecordingSink};
    use std::thread;
    use std::time::{Duration, Instant};

    fn group(participants: usize) -> (Vec<Process>, Arc<RecordingSink>) {
        let config = Config {
            participants,
            ..Config::default()
        };
        let network = InMemoryNetwork::new(participants).unwrap();
        let sink = Arc::new(RecordingSink::new());
        let processes = (0..participants)
            .map(|id| Process::spawn(&config, network.endpoint(id).unwrap(), sink.clone()).unwrap())
            .collect();
        (processes, sink)
    }

    #[test]
    fn send_and_receive_merge_clocks() {
        let (mut processes, _sink) = group(2);
        let mut p1 = processes.pop().unwrap();
        let mut p0 = processes.pop().unwrap();

        p0.event();
        p0.send(1).unwrap();
        assert_eq!(p0.clock().as_slice(), &[2, 0]);

        let received = p1.receive().unwrap();
        assert_eq!(received.sender(), 0);
        assert_eq!(received.destination(), 1);
        assert_eq!(received.clock().as_slice(), &[2, 0]);
        assert_eq!(p1.clock().as_slice(), &[2, 1]);

        p0.shutdown().unwrap();
        assert_eq!(p1.shutdown().unwrap().as_slice(), &[2, 1]);
    }

    #[test]
    fn emits_one_record_per_operation() {
        let (mut processes, sink) = group(2);
        let mut p1 = processes.pop().unwrap();
        let mut p0 = processes.pop().unwrap();

        p0.event();
        p0.send(1).unwrap();
        p1.receive().unwrap();
        p0.shutdown().unwrap();
        p1.shutdown().unwrap();

        // The pump emits `Send` after transmission, so it may land after the receiver's record.
        let lines = |id| -> Vec<String> {
            sink.records_for(id).iter().map(ToString::to_string).collect()
        };
        assert_eq!(lines(0), ["Event: 0, Clock: (1, 0)", "Send: 0, Clock: (2, 0)"]);
        assert_eq!(lines(1), ["Receive: 1, Clock: (2, 1)"]);
    }

    #[test]
    fn network_shutdown_releases_a_blocked_receive() {
        let config = Config {
            participants: 2,
            ..Config::default()
        };
        let network = InMemoryNetwork::new(2).unwrap();
        let sink: Arc<RecordingSink> = Arc::new(RecordingSink::new());
        let mut p1 = Process::spawn(&config, network.endpoint(1).unwrap(), sink.clone()).unwrap();

        let waiter = thread::spawn(move || {
            let outcome = p1.receive();
            (outcome, p1)
        });
        thread::sleep(Duration::from_millis(20));
        network.shutdown();

        let (outcome, p1) = waiter.join().unwrap();
        assert_eq!(outcome.map(|m| m.sender()), Err(Error::QueueClosed));
        assert_eq!(p1.shutdown().unwrap().as_slice(), &[0, 0]);
        assert!(sink.records().is_empty());
    }

    #[test]
    fn counts_sends_to_a_stopped_peer() {
        let (mut processes, sink) = group(2);
        let p1 = processes.pop().unwrap();
        let mut p0 = processes.pop().unwrap();
        p1.shutdown().unwrap();

        p0.send(1).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while p0.dropped_sends() == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(p0.dropped_sends(), 1);
        assert_eq!(p0.clock().as_slice(), &[1, 0]);
        p0.shutdown().unwrap();
        assert!(sink.records_for(0).is_empty());
    }

    #[test]
    fn rejects_out_of_group_target() {
        let (mut processes, _sink) = group(2);
        let p0 = &mut processes[0];
        assert_eq!(
            p0.send(2),
            Err(Error::InvalidProcess {
                id: 2,
                participants: 2
            })
        );
        assert_eq!(p0.clock().as_slice(), &[0, 0]);
    }

    #[test]
    fn rejects_identity_outside_group() {
        let network = InMemoryNetwork::new(4).unwrap();
        let config = Config::default();
        let result = Process::spawn(
            &config,
            network.endpoint(3).unwrap(),
            Arc::new(RecordingSink::new()),
        );
        assert!(matches!(
            result,
            Err(Error::InvalidProcess {
                id: 3,
                participants: 3
            })
        ));
    }

    #[test]
    fn snapshot_lifecycle() {
        let (mut processes, sink) = group(1);
        let mut p0 = processes.pop().unwrap();

        assert_eq!(p0.record_state(), Err(Error::SnapshotNotOpen(0)));
        p0.event();
        p0.start_snapshot().unwrap();
        assert_eq!(p0.start_snapshot(), Err(Error::SnapshotAlreadyOpen(0)));
        p0.event();

        let first = p0.record_state().unwrap();
        let second = p0.record_state().unwrap();
        assert_eq!(first.as_slice(), &[1]);
        assert_eq!(first, second);
        assert_eq!(p0.end_snapshot().unwrap().as_slice(), &[1]);

        assert_eq!(p0.take_snapshot().unwrap().as_slice(), &[2]);
        assert!(!p0.snapshot().is_open());
        p0.shutdown().unwrap();

        assert_eq!(
            sink.lines(),
            [
                "Event: 0, Clock: (1)",
                "Snapshot started by process 0",
                "Event: 0, Clock: (2)",
                "Snapshot value at process 0: Clock (1)",
                "Snapshot value at process 0: Clock (1)",
                "Snapshot started by process 0",
                "Snapshot value at process 0: Clock (2)",
            ]
        );
    }
}
