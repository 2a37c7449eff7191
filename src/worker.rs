use std::thread::{self, JoinHandle};

use crossbeam::channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};

use crate::error::{TrackerError, TrackerResult};
use crate::pipeline::{AnchorTracker, TrackerOutput, TrackerSnapshot};
use crate::types::{FilteredEstimate, RawFix};

/// Accepted estimates buffered per anchor before the oldest are dropped
pub const DEFAULT_UPDATE_CAPACITY: usize = 64;

/// Opaque identifier the rendering side attaches to a tracked anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnchorId(pub u64);

/// Accepted estimate for one anchor, as handed to the rendering side.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnchorUpdate {
    pub anchor: AnchorId,
    pub estimate: FilteredEstimate,
}

enum Command {
    Fix(RawFix),
    Reset,
    Shutdown,
}

/// Runs one [`AnchorTracker`] on its own thread.
///
/// Fixes can be submitted from any thread; the tracker itself is only ever
/// touched by the worker thread, so no lock is needed around it.
///
/// The updates channel is bounded. When the consumer falls behind, the oldest
/// pending estimate is dropped so the newest position is always delivered and
/// memory stays flat.
pub struct TrackerWorker {
    anchor: AnchorId,
    commands: Sender<Command>,
    updates: Receiver<AnchorUpdate>,
    handle: JoinHandle<TrackerSnapshot>,
}

impl TrackerWorker {
    pub fn spawn(anchor: AnchorId, tracker: AnchorTracker) -> Self {
        Self::spawn_with_capacity(anchor, tracker, DEFAULT_UPDATE_CAPACITY)
    }

    /// Like [`TrackerWorker::spawn`], holding at most `capacity` (minimum 1)
    /// undelivered updates.
    pub fn spawn_with_capacity(anchor: AnchorId, mut tracker: AnchorTracker, capacity: usize) -> Self {
        let (cmd_tx, cmd_rx) = unbounded::<Command>();
        let (update_tx, update_rx) = bounded::<AnchorUpdate>(capacity.max(1));
        let drain = update_rx.clone();

        let handle = thread::spawn(move || {
            for command in cmd_rx.iter() {
                match command {
                    Command::Fix(fix) => {
                        if let TrackerOutput::Update(estimate) = tracker.process(fix) {
                            publish(&update_tx, &drain, AnchorUpdate { anchor, estimate });
                        }
                    }
                    Command::Reset => tracker.reset(),
                    Command::Shutdown => break,
                }
            }
            tracker.snapshot()
        });

        Self {
            anchor,
            commands: cmd_tx,
            updates: update_rx,
            handle,
        }
    }

    pub fn anchor(&self) -> AnchorId {
        self.anchor
    }

    pub fn submit(&self, fix: RawFix) -> TrackerResult<()> {
        self.commands
            .send(Command::Fix(fix))
            .map_err(|_| TrackerError::WorkerStopped)
    }

    pub fn reset(&self) -> TrackerResult<()> {
        self.commands
            .send(Command::Reset)
            .map_err(|_| TrackerError::WorkerStopped)
    }

    /// Channel of accepted estimates, in submission order.
    pub fn updates(&self) -> &Receiver<AnchorUpdate> {
        &self.updates
    }

    /// Stop the worker after it drains pending commands and return its final state.
    pub fn shutdown(self) -> TrackerResult<TrackerSnapshot> {
        // Already-stopped worker still has a snapshot to hand back
        let _ = self.commands.send(Command::Shutdown);
        self.handle.join().map_err(|_| TrackerError::WorkerPanicked)
    }
}

/// Send without blocking, evicting the oldest queued update while the channel is full.
fn publish(tx: &Sender<AnchorUpdate>, drain: &Receiver<AnchorUpdate>, mut update: AnchorUpdate) {
    loop {
        match tx.try_send(update) {
            Ok(()) => return,
            Err(TrySendError::Full(back)) => {
                update = back;
                if let Ok(stale) = drain.try_recv() {
                    log::debug!(
                        "Updates for {:?} backed up, dropped estimate at t={}",
                        stale.anchor,
                        stale.estimate.timestamp
                    );
                }
            }
            // The worker holds `drain`, so the channel cannot disconnect
            Err(TrySendError::Disconnected(_)) => return,
        }
    }
}
