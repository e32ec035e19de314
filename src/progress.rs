//! Progress reporting for a categorization run.
//!
//! The engine owns a [`ProgressTracker`] and pushes [`ProgressUpdate`]s to a
//! [`ProgressObserver`] synchronously, on the calling thread. A slow observer
//! stalls the run.

use crate::transfer::TransferRecord;
use serde::Serialize;
use std::sync::mpsc::Sender;

/// A single progress notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressUpdate {
    /// Percentage of planned entries transferred, `0..=100`.
    pub progress: u8,
    /// Number of entries planned for transfer.
    pub total: usize,
    /// Number of entries transferred so far.
    pub finished: usize,
    /// Set only on the final notification of a run.
    pub completed: bool,
}

/// Computes `floor(100 * finished / total)`.
///
/// A run with nothing to transfer stays at 0.
pub fn percent(finished: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let value = (finished as u128 * 100) / total as u128;
    value.min(100) as u8
}

/// Counters mutated by the transfer step.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: usize,
    finished: usize,
    progress: u8,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            finished: 0,
            progress: 0,
        }
    }

    /// Records one finished transfer and returns the update to publish.
    pub fn record_finished(&mut self) -> ProgressUpdate {
        self.finished += 1;
        self.progress = percent(self.finished, self.total);
        self.snapshot()
    }

    /// Returns the current state without the completion flag.
    pub fn snapshot(&self) -> ProgressUpdate {
        ProgressUpdate {
            progress: self.progress,
            total: self.total,
            finished: self.finished,
            completed: false,
        }
    }

    /// Returns the final update, reusing the last computed values.
    pub fn completion(&self) -> ProgressUpdate {
        ProgressUpdate {
            completed: true,
            ..self.snapshot()
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn finished(&self) -> usize {
        self.finished
    }
}

/// Receives progress notifications and transfer records from a run.
///
/// Any `FnMut(ProgressUpdate)` closure is an observer.
pub trait ProgressObserver {
    /// Called once after planning, after every transfer, and once on completion.
    fn on_progress(&mut self, update: ProgressUpdate);

    /// Called after each entry has been transferred, before its progress update.
    fn on_transfer(&mut self, _record: &TransferRecord) {}
}

impl<F> ProgressObserver for F
where
    F: FnMut(ProgressUpdate),
{
    fn on_progress(&mut self, update: ProgressUpdate) {
        self(update)
    }
}

/// Observer that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentObserver;

impl ProgressObserver for SilentObserver {
    fn on_progress(&mut self, _update: ProgressUpdate) {}
}

/// Forwards progress updates over a channel.
///
/// A disconnected receiver is ignored; the run does not depend on anyone listening.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: Sender<ProgressUpdate>,
}

impl ChannelObserver {
    pub fn new(sender: Sender<ProgressUpdate>) -> Self {
        Self { sender }
    }
}

impl ProgressObserver for ChannelObserver {
    fn on_progress(&mut self, update: ProgressUpdate) {
        let _ = self.sender.send(update);
    }
}
