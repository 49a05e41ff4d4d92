//! Point-to-point delivery of [`Message`]s between participants.
//!
//! A transport must be reliable and preserve order per sender/receiver pair. How bytes move is
//! up to the implementation; [`InMemoryNetwork`] keeps one mailbox per participant in process
//! memory, which is what tests and the reference scenario run over.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::config::MAX_PARTICIPANTS;
use crate::{Error, Message, ProcessId, Result};

/// One participant's view of the network.
pub trait Transport: Send + Sync {
    /// The participant this endpoint belongs to.
    fn local(&self) -> ProcessId;

    /// Delivers `message` to `message.destination()`.
    fn transmit(&self, message: Message) -> Result<()>;

    /// Blocks until a message addressed to this participant arrives, from any sender.
    ///
    /// Fails with [`Error::Disconnected`] once the endpoint has been closed.
    fn next_inbound(&self) -> Result<Message>;

    /// Stops accepting inbound messages and wakes a blocked [`next_inbound`](Self::next_inbound).
    fn close(&self);
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn local(&self) -> ProcessId {
        (**self).local()
    }

    fn transmit(&self, message: Message) -> Result<()> {
        (**self).transmit(message)
    }

    fn next_inbound(&self) -> Result<Message> {
        (**self).next_inbound()
    }

    fn close(&self) {
        (**self).close()
    }
}

#[derive(Default)]
struct Mailbox {
    inbox: Mutex<Inbox>,
    arrived: Condvar,
}

#[derive(Default)]
struct Inbox {
    messages: VecDeque<Message>,
    closed: bool,
}

/// A fully connected mesh of unbounded mailboxes, one per participant.
pub struct InMemoryNetwork {
    mailboxes: Vec<Mailbox>,
}

impl InMemoryNetwork {
    /// Builds a mesh for `participants` processes, at most `MAX_PARTICIPANTS`.
    pub fn new(participants: usize) -> Result<Arc<Self>> {
        if !(1..=MAX_PARTICIPANTS).contains(&participants) {
            return Err(Error::InvalidParticipants(participants));
        }
        let mut mailboxes = Vec::with_capacity(participants);
        mailboxes.resize_with(participants, Mailbox::default);
        Ok(Arc::new(Self { mailboxes }))
    }

    pub fn participants(&self) -> usize {
        self.mailboxes.len()
    }

    /// Hands out the endpoint for participant `id`.
    pub fn endpoint(self: &Arc<Self>, id: ProcessId) -> Result<InMemoryEndpoint> {
        if id >= self.participants() {
            return Err(Error::InvalidProcess {
                id,
                participants: self.participants(),
            });
        }
        Ok(InMemoryEndpoint {
            network: Arc::clone(self),
            local: id,
        })
    }

    /// Closes every mailbox.
    pub fn shutdown(&self) {
        for id in 0..self.participants() {
            self.close_mailbox(id);
        }
    }

    fn deliver(&self, message: Message) -> Result<()> {
        let destination = message.destination();
        let mailbox = self
            .mailboxes
            .get(destination)
            .ok_or(Error::Unreachable { destination })?;
        let mut inbox = mailbox.inbox.lock();
        if inbox.closed {
            return Err(Error::Unreachable { destination });
        }
        trace!(from = message.sender(), to = destination, "deliver");
        inbox.messages.push_back(message);
        mailbox.arrived.notify_one();
        Ok(())
    }

    fn take(&self, id: ProcessId) -> Result<Message> {
        let mailbox = &self.mailboxes[id];
        let mut inbox = mailbox.inbox.lock();
        loop {
            if let Some(message) = inbox.messages.pop_front() {
                return Ok(message);
            }
            if inbox.closed {
                return Err(Error::Disconnected(id));
            }
            mailbox.arrived.wait(&mut inbox);
        }
    }

    fn close_mailbox(&self, id: ProcessId) {
        let Some(mailbox) = self.mailboxes.get(id) else {
            return;
        };
        let mut inbox = mailbox.inbox.lock();
        if !inbox.closed {
            inbox.closed = true;
            debug!(process = id, undelivered = inbox.messages.len(), "mailbox closed");
        }
        drop(inbox);
        mailbox.arrived.notify_all();
    }
}

/// Participant `local`'s handle onto an [`InMemoryNetwork`].
#[derive(Clone)]
pub struct InMemoryEndpoint {
    network: Arc<InMemoryNetwork>,
    local: ProcessId,
}

impl Transport for InMemoryEndpoint {
    fn local(&self) -> ProcessId {
        self.local
    }

    fn transmit(&self, message: Message) -> Result<()> {
        self.network.deliver(message)
    }

    fn next_inbound(&self) -> Result<Message> {
        self.network.take(self.local)
    }

    fn close(&self) {
        self.network.close_mailbox(self.local);
    }
}
