use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{Error, ProcessId, Result};

const DEFAULT_PARTICIPANTS: usize = 3;
const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// Largest group size accepted. Clocks, mailboxes and identities are all sized from it.
pub const MAX_PARTICIPANTS: usize = 1 << 12;
/// Largest ring size accepted for a [`BoundedQueue`](crate::BoundedQueue).
pub const MAX_QUEUE_CAPACITY: usize = 1 << 16;

/// Sizing of a process group.
///
/// Every field has a default, so `{}` is a valid config file and yields the three-process,
/// capacity-ten group the reference scenario runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Number of processes, and therefore the width of every vector clock.
    pub participants: usize,
    /// Ring size of each inbound and outbound queue. One slot is always left unused.
    pub queue_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            participants: DEFAULT_PARTICIPANTS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl Config {
    /// Loads and validates a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("read {}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| Error::Config(format!("parse: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_PARTICIPANTS).contains(&self.participants) {
            return Err(Error::InvalidParticipants(self.participants));
        }
        if !(2..=MAX_QUEUE_CAPACITY).contains(&self.queue_capacity) {
            return Err(Error::InvalidCapacity(self.queue_capacity));
        }
        Ok(())
    }

    /// Fails unless `id` names one of the group's participants.
    pub fn check_process(&self, id: ProcessId) -> Result<()> {
        if id < self.participants {
            Ok(())
        } else {
            Err(Error::InvalidProcess {
                id,
                participants: self.participants,
            })
        }
    }
}
