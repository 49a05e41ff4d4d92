//! The two background threads that connect a process's queues to its transport.
//!
//! - The receiver thread blocks on [`Transport::next_inbound`] and pushes every arrival onto the
//!   inbound queue.
//! - The sender thread pops the outbound queue, transmits each message to its destination and
//!   then emits a [`LogRecord::Send`].
//!
//! Neither thread touches the process's live clock. Both run until [`ChannelPump::shutdown`].
//!
//! A message the transport refuses is dropped with a warning and counted; see
//! [`ChannelPump::dropped_sends`].

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

use crate::{BoundedQueue, Error, EventSink, LogRecord, Message, ProcessId, Result, Transport};

pub struct ChannelPump {
    owner: ProcessId,
    transport: Arc<dyn Transport>,
    inbound: Arc<BoundedQueue<Message>>,
    outbound: Arc<BoundedQueue<Message>>,
    receiver: Option<JoinHandle<()>>,
    sender: Option<JoinHandle<()>>,
    dropped: Arc<AtomicUsize>,
}

impl ChannelPump {
    pub fn start(
        transport: Arc<dyn Transport>,
        inbound: Arc<BoundedQueue<Message>>,
        outbound: Arc<BoundedQueue<Message>>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        let owner = transport.local();

        let receiver = {
            let transport = Arc::clone(&transport);
            let inbound = Arc::clone(&inbound);
            spawn(owner, "receiver", move || receive_loop(owner, &*transport, &inbound))?
        };

        let dropped = Arc::new(AtomicUsize::new(0));
        let sender = {
            let out_transport = Arc::clone(&transport);
            let out_queue = Arc::clone(&outbound);
            let out_dropped = Arc::clone(&dropped);
            let spawned = spawn(owner, "sender", move || {
                send_loop(owner, &*out_transport, &out_queue, &*sink, &out_dropped)
            });
            match spawned {
                Ok(handle) => handle,
                Err(e) => {
                    // Unblock the receiver we already started.
                    transport.close();
                    inbound.close();
                    if let Err(failed) = join(owner, "receiver", receiver) {
                        warn!(process = owner, error = %failed, "receiver failed on aborted start");
                    }
                    return Err(e);
                }
            }
        };

        debug!(process = owner, "pump started");
        Ok(Self {
            owner,
            transport,
            inbound,
            outbound,
            receiver: Some(receiver),
            sender: Some(sender),
            dropped,
        })
    }

    pub fn owner(&self) -> ProcessId {
        self.owner
    }

    /// Outbound messages the transport refused so far. These never produce a `Send` record.
    pub fn dropped_sends(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Stops both threads and waits for them.
    ///
    /// Messages already in the outbound queue are still transmitted. Inbound messages that
    /// arrive after this call are refused by the transport.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> Result<()> {
        let mut outcome = Ok(());

        self.outbound.close();
        if let Some(sender) = self.sender.take() {
            outcome = outcome.and(join(self.owner, "sender", sender));
        }

        self.transport.close();
        self.inbound.close();
        if let Some(receiver) = self.receiver.take() {
            outcome = outcome.and(join(self.owner, "receiver", receiver));
        }

        debug!(process = self.owner, "pump stopped");
        outcome
    }
}

impl Drop for ChannelPump {
    fn drop(&mut self) {
        if self.sender.is_some() || self.receiver.is_some() {
            if let Err(e) = self.stop() {
                warn!(process = self.owner, error = %e, "pump stopped uncleanly");
            }
        }
    }
}

fn spawn<F>(owner: ProcessId, role: &'static str, body: F) -> Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(format!("p{owner}-{role}"))
        .spawn(body)
        .map_err(|e| Error::Thread {
            process: owner,
            thread: role,
            reason: e.to_string(),
        })
}

fn join(owner: ProcessId, role: &'static str, handle: JoinHandle<()>) -> Result<()> {
    handle.join().map_err(|_| Error::Thread {
        process: owner,
        thread: role,
        reason: "panicked".to_string(),
    })
}

fn receive_loop(owner: ProcessId, transport: &dyn Transport, inbound: &BoundedQueue<Message>) {
    loop {
        let message = match transport.next_inbound() {
            Ok(message) => message,
            Err(Error::Disconnected(_)) => break,
            Err(e) => {
                warn!(process = owner, error = %e, "receiver stopping");
                break;
            }
        };
        if inbound.enqueue(message).is_err() {
            break;
        }
    }
    // Nothing more can arrive; let a blocked `receive` drain and fail instead of hanging.
    inbound.close();
    debug!(process = owner, "receiver exited");
}

fn send_loop(
    owner: ProcessId,
    transport: &dyn Transport,
    outbound: &BoundedQueue<Message>,
    sink: &dyn EventSink,
    dropped: &AtomicUsize,
) {
    while let Ok(message) = outbound.dequeue() {
        let record = LogRecord::Send {
            process: owner,
            destination: message.destination(),
            clock: message.clock().clone(),
        };
        match transport.transmit(message) {
            Ok(()) => sink.record(&record),
            Err(e) => {
                dropped.fetch_add(1, Ordering::Relaxed);
                warn!(process = owner, error = %e, "dropping outbound message");
            }
        }
    }
    debug!(process = owner, "sender exited");
}
