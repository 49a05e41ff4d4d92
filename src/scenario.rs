//! The fixed three-process run.
//!
//! Each process follows a hardcoded script of clock operations:
//!
//! | process | script |
//! |---------|--------|
//! | 0 | Event, StartSnapshot, Send(1), Receive, Send(2), Receive, Send(1), Event, RecordState, EndSnapshot |
//! | 1 | Send(0), StartSnapshot, Receive, Receive, RecordState |
//! | 2 | Event, Send(0), StartSnapshot, Receive, RecordState |
//!
//! When its script is done a process closes any snapshot it left open, takes one final snapshot
//! of its clock and shuts down.

use serde::Serialize;
use std::sync::Arc;
use std::thread;
use tracing::{debug, error};

use crate::{Config, Error, EventSink, InMemoryNetwork, Process, ProcessId, Result, VectorClock};

const PARTICIPANTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Step {
    Event,
    Send(ProcessId),
    Receive,
    StartSnapshot,
    RecordState,
    EndSnapshot,
}

const PROCESS_0: &[Step] = &[
    Step::Event,
    Step::StartSnapshot,
    Step::Send(1),
    Step::Receive,
    Step::Send(2),
    Step::Receive,
    Step::Send(1),
    Step::Event,
    Step::RecordState,
    Step::EndSnapshot,
];
const PROCESS_1: &[Step] = &[
    Step::Send(0),
    Step::StartSnapshot,
    Step::Receive,
    Step::Receive,
    Step::RecordState,
];
const PROCESS_2: &[Step] = &[
    Step::Event,
    Step::Send(0),
    Step::StartSnapshot,
    Step::Receive,
    Step::RecordState,
];

/// The script process `id` runs, or `None` for identities outside the scenario.
pub fn script_for(id: ProcessId) -> Option<&'static [Step]> {
    match id {
        0 => Some(PROCESS_0),
        1 => Some(PROCESS_1),
        2 => Some(PROCESS_2),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessOutcome {
    pub id: ProcessId,
    /// Values reported by every `RecordState` step, in order.
    pub recorded: Vec<VectorClock>,
    /// The snapshot taken after the script finished.
    pub final_snapshot: VectorClock,
    pub final_clock: VectorClock,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    pub processes: Vec<ProcessOutcome>,
}

impl ScenarioReport {
    pub fn process(&self, id: ProcessId) -> Option<&ProcessOutcome> {
        self.processes.iter().find(|p| p.id == id)
    }
}

/// Runs the three scripts concurrently over an in-memory network, one driver thread each.
pub fn run_reference_scenario(config: &Config, sink: Arc<dyn EventSink>) -> Result<ScenarioReport> {
    config.validate()?;
    if config.participants != PARTICIPANTS {
        return Err(Error::Config(format!(
            "the reference scenario needs {PARTICIPANTS} participants, got {}",
            config.participants
        )));
    }

    let network = InMemoryNetwork::new(PARTICIPANTS)?;
    let mut processes = Vec::with_capacity(PARTICIPANTS);
    for id in 0..PARTICIPANTS {
        processes.push(Process::spawn(config, network.endpoint(id)?, Arc::clone(&sink))?);
    }

    let results: Vec<Result<ProcessOutcome>> = thread::scope(|scope| {
        let drivers: Vec<_> = processes
            .into_iter()
            .map(|process| {
                let network = &network;
                scope.spawn(move || {
                    let id = process.id();
                    let outcome = drive(process);
                    if let Err(e) = &outcome {
                        error!(process = id, error = %e, "script failed, tearing down network");
                        network.shutdown();
                    }
                    outcome
                })
            })
            .collect();

        drivers
            .into_iter()
            .enumerate()
            .map(|(id, driver)| {
                driver.join().unwrap_or_else(|_| {
                    Err(Error::Thread {
                        process: id,
                        thread: "driver",
                        reason: "panicked".to_string(),
                    })
                })
            })
            .collect()
    });

    let processes = results.into_iter().collect::<Result<Vec<_>>>()?;
    Ok(ScenarioReport { processes })
}

fn drive(mut process: Process) -> Result<ProcessOutcome> {
    let id = process.id();
    let script = script_for(id).ok_or(Error::InvalidProcess {
        id,
        participants: PARTICIPANTS,
    })?;

    let mut recorded = Vec::new();
    for step in script {
        debug!(process = id, ?step, "step");
        match *step {
            Step::Event => process.event(),
            Step::Send(target) => process.send(target)?,
            Step::Receive => {
                process.receive()?;
            }
            Step::StartSnapshot => process.start_snapshot()?,
            Step::RecordState => recorded.push(process.record_state()?),
            Step::EndSnapshot => {
                process.end_snapshot()?;
            }
        }
    }

    if process.snapshot().is_open() {
        process.end_snapshot()?;
    }
    let final_snapshot = process.take_snapshot()?;
    let final_clock = process.shutdown()?;

    Ok(ProcessOutcome {
        id,
        recorded,
        final_snapshot,
        final_clock,
    })
}
