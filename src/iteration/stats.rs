//! Per-run and per-superstep counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened in one superstep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SuperstepStats {
    pub superstep: u64,
    /// Messages drained from the previous superstep.
    pub messages_received: usize,
    /// Vertices whose update produced a new value. Always 0 in superstep 0.
    pub updated: usize,
    /// Vertices that ran the messaging function.
    pub active: usize,
    pub messages_sent: usize,
}

/// Run-level statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationStats {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub supersteps: Vec<SuperstepStats>,
}

impl IterationStats {
    pub(crate) fn start() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            supersteps: Vec::new(),
        }
    }

    pub(crate) fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn supersteps_run(&self) -> usize {
        self.supersteps.len()
    }

    pub fn total_messages(&self) -> usize {
        self.supersteps.iter().map(|s| s.messages_sent).sum()
    }

    pub fn total_updates(&self) -> usize {
        self.supersteps.iter().map(|s| s.updated).sum()
    }

    pub fn elapsed_ms(&self) -> Option<i64> {
        self.finished_at.map(|end| (end - self.started_at).num_milliseconds())
    }
}
