use std::sync::Arc;

use tokio::sync::watch;

use crate::{messaging::port::ProgressSink, migration::validation::ResolvedTargets};

/// Coarse stage of a job, for presentation layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressPhase {
    Fetching,
    Replaying,
    Completed,
    NothingToMigrate,
    Aborted,
}

/// Numeric state of a job at one point in time.
///
/// While fetching, `total` is unknown (`None`) and `current` carries the number
/// of messages fetched so far. Once `total` is known, `current <= total`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub phase: ProgressPhase,
    pub current: usize,
    pub total: Option<usize>,
    pub failed: usize,
    pub status: String,
}

impl ProgressSnapshot {
    pub fn fetching(fetched: usize) -> Self {
        let status = if fetched == 0 {
            "Fetching messages...".to_string()
        } else {
            format!("Fetched {fetched} messages...")
        };
        Self {
            phase: ProgressPhase::Fetching,
            current: fetched,
            total: None,
            failed: 0,
            status,
        }
    }

    pub fn replaying(current: usize, total: usize, failed: usize) -> Self {
        let status = if current == 0 {
            "Starting backup...".to_string()
        } else {
            format!("Backing up messages... ({failed} failed)")
        };
        Self {
            phase: ProgressPhase::Replaying,
            current: current.min(total),
            total: Some(total),
            failed,
            status,
        }
    }

    pub fn completed(total: usize, failed: usize, status: impl Into<String>) -> Self {
        Self {
            phase: ProgressPhase::Completed,
            current: total,
            total: Some(total),
            failed,
            status: status.into(),
        }
    }

    pub fn nothing_to_migrate() -> Self {
        Self {
            phase: ProgressPhase::NothingToMigrate,
            current: 0,
            total: Some(0),
            failed: 0,
            status: "No messages to backup".to_string(),
        }
    }

    pub fn aborted(reason: impl Into<String>) -> Self {
        Self {
            phase: ProgressPhase::Aborted,
            current: 0,
            total: None,
            failed: 0,
            status: reason.into(),
        }
    }

    /// `round(current / total * 100)`, or 0 while the total is unknown or zero.
    pub fn percentage(&self) -> u32 {
        match self.total {
            Some(total) if total > 0 => {
                ((self.current as f64 / total as f64) * 100.0).round() as u32
            }
            _ => 0,
        }
    }
}

/// Holds the latest snapshot and fans it out to subscribers and sinks.
///
/// Delivery is best-effort: sink failures are logged and never reach the job.
pub struct ProgressTracker {
    tx: watch::Sender<ProgressSnapshot>,
    sinks: Vec<Arc<dyn ProgressSink>>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ProgressSnapshot::fetching(0));
        Self {
            tx,
            sinks: Vec::new(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Update stream; the receiver is notified on every push.
    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.tx.subscribe()
    }

    pub fn latest(&self) -> ProgressSnapshot {
        self.tx.borrow().clone()
    }

    pub async fn announce(&self, targets: &ResolvedTargets) {
        for sink in &self.sinks {
            if let Err(e) = sink.targets_resolved(targets).await {
                tracing::warn!("Failed to announce backup targets: {e}");
            }
        }
    }

    pub async fn push(&self, snapshot: ProgressSnapshot) {
        for sink in &self.sinks {
            if let Err(e) = sink.publish(&snapshot).await {
                tracing::warn!("Failed to update progress: {e}");
            }
        }
        self.tx.send_replace(snapshot);
    }
}
