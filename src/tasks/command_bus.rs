//! Command Bus: merges external requests (apply-state, snapshot,
//! shutdown) into the event stream.
//!
//! Grounded on `clasp-service`'s `Request`/`Response` tagged-enum pattern,
//! adapted from a JSON-RPC-style service boundary to an in-process
//! `mpsc`/`oneshot` handle.

use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, Result};
use crate::logic::{CommandKind, Event, SnapshotPath, SnapshotValue, StatePatch};

/// A patch payload as it arrives from outside the process: either
/// map-shaped (applied field-by-field) or explicitly non-map (rejected).
/// Keeps the patch itself typed while still modeling a "reject non-map
/// state" check against whatever arrives over the wire.
#[derive(Debug, Clone)]
pub enum StatePayload {
    Map(StatePatch),
    NonMap,
}

/// `apply-state-command(state)`: wraps a patch into a command event.
/// `None` is coerced to an empty patch; a `NonMap` payload fails with
/// `ApplyStateExpectsMap`.
pub fn apply_state_command(payload: Option<StatePayload>) -> Result<Event> {
    let patch = match payload {
        None => StatePatch::default(),
        Some(StatePayload::Map(patch)) => patch,
        Some(StatePayload::NonMap) => return Err(Error::ApplyStateExpectsMap),
    };
    Ok(Event::Command(CommandKind::ApplyState(patch)))
}

/// `snapshot-command(path)`: a request for a read-only state projection,
/// replying out-of-band via a one-shot completion handle.
pub fn snapshot_command(path: SnapshotPath) -> (Event, oneshot::Receiver<SnapshotValue>) {
    let (tx, rx) = oneshot::channel();
    (
        Event::Command(CommandKind::Snapshot { path, reply: tx }),
        rx,
    )
}

/// `shutdown-command()`: sets the shared `running?` flag to false via the
/// logic step and lets task teardown observe channel-closed afterward.
pub fn shutdown_command() -> Event {
    Event::Command(CommandKind::Shutdown)
}

/// The command bus task: forwards external requests into the event
/// stream, preserving FIFO order relative to other event producers.
pub struct CommandBusTask {
    commands: mpsc::Receiver<Event>,
    events: mpsc::Sender<Event>,
}

impl CommandBusTask {
    pub fn new(commands: mpsc::Receiver<Event>, events: mpsc::Sender<Event>) -> Self {
        Self { commands, events }
    }

    pub async fn run(mut self) {
        while let Some(event) = self.commands.recv().await {
            let is_shutdown = matches!(event, Event::Command(CommandKind::Shutdown));
            if self.events.send(event).await.is_err() || is_shutdown {
                // A shutdown command is forwarded and then this task exits
                // on its own. It must not wait for every external command
                // sender to drop, since callers may keep a clone alive.
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nil_and_empty_map_coerce_to_the_same_command() {
        let from_none = apply_state_command(None).unwrap();
        let from_empty = apply_state_command(Some(StatePayload::Map(StatePatch::default()))).unwrap();
        assert!(matches!(
            (from_none, from_empty),
            (
                Event::Command(CommandKind::ApplyState(a)),
                Event::Command(CommandKind::ApplyState(b))
            ) if a == b
        ));
    }

    #[test]
    fn non_map_payload_is_rejected() {
        assert!(matches!(
            apply_state_command(Some(StatePayload::NonMap)),
            Err(Error::ApplyStateExpectsMap)
        ));
    }

    #[tokio::test]
    async fn forwards_commands_in_order() {
        let (cmd_tx, cmd_rx) = mpsc::channel(4);
        let (event_tx, mut event_rx) = mpsc::channel(4);
        let task = CommandBusTask::new(cmd_rx, event_tx);
        let handle = tokio::spawn(task.run());

        cmd_tx.send(shutdown_command()).await.unwrap();
        drop(cmd_tx);

        let received = event_rx.recv().await.unwrap();
        assert!(matches!(
            received,
            Event::Command(CommandKind::Shutdown)
        ));
        handle.await.unwrap();
    }
}
