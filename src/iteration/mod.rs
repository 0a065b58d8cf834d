//! # Iteration Driver
//!
//! Runs the superstep loop over a `Graph`:
//!
//! ```text
//! Initializing ──► Running(0) ──► Running(1) ──► … ──► Converged(k)
//!                                              ├─────► IterationCapReached
//!                                              ├─────► Cancelled
//!                                              └─────► Failed(k)
//! ```
//!
//! Superstep 0 only runs the messaging function. Every later superstep drains
//! the previous mailbox, updates every vertex, then lets the active vertices
//! send. The run converges in the first superstep ≥ 1 in which no vertex
//! produced a new value.
//!
//! Cap and cancellation are not errors: the graph as it stands at that
//! boundary is a valid intermediate result. A failed superstep is final and
//! leaves no result: `into_result` refuses to hand out its graph.

mod cancel;
mod config;
mod driver;
mod stats;

pub use cancel::CancelHandle;
pub use config::{ExecutionMode, IterationConfig, MessagingPolicy};
pub use driver::Iteration;
pub use stats::{IterationStats, SuperstepStats};

use serde::{Deserialize, Serialize};

use crate::function::{MessagingFunction, VertexUpdateFunction};
use crate::graph::Graph;
use crate::model::VertexKey;
use crate::Result;

/// Where the driver is in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverState {
    Initializing,
    /// `superstep` is the last completed superstep.
    Running { superstep: u64 },
    Converged { superstep: u64 },
    IterationCapReached { supersteps: u64 },
    Cancelled { supersteps: u64 },
    /// `superstep` returned an error. Nothing more runs and there is no result.
    Failed { superstep: u64 },
}

impl DriverState {
    pub fn is_failed(&self) -> bool {
        matches!(self, DriverState::Failed { .. })
    }

    /// The outcome of a successfully finished run, if this is one.
    pub fn termination(&self) -> Option<Termination> {
        match *self {
            DriverState::Converged { superstep } => Some(Termination::Converged { superstep }),
            DriverState::IterationCapReached { supersteps } => {
                Some(Termination::IterationCapReached { supersteps })
            }
            DriverState::Cancelled { supersteps } => Some(Termination::Cancelled { supersteps }),
            DriverState::Initializing | DriverState::Running { .. } | DriverState::Failed { .. } => None,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// No vertex changed in the update round of `superstep`.
    Converged { superstep: u64 },
    /// `supersteps` (= `max_iterations`) ran without reaching a fixed point.
    IterationCapReached { supersteps: u64 },
    /// Cancelled at a boundary after `supersteps` supersteps.
    Cancelled { supersteps: u64 },
}

impl Termination {
    pub fn is_converged(&self) -> bool {
        matches!(self, Termination::Converged { .. })
    }
}

/// Final graph plus how and how fast it got there.
#[derive(Debug)]
pub struct IterationResult<K, V, E> {
    pub graph: Graph<K, V, E>,
    pub termination: Termination,
    pub stats: IterationStats,
}

impl<K, V, E> Graph<K, V, E>
where
    K: VertexKey,
    V: Send + Sync,
    E: Send + Sync,
{
    /// Run a vertex-centric iteration over this graph to a terminal state.
    pub fn run_vertex_centric_iteration<M, U, F>(
        self,
        update: U,
        messaging: F,
        config: IterationConfig,
    ) -> Result<IterationResult<K, V, E>>
    where
        M: Send,
        U: VertexUpdateFunction<K, V, M>,
        F: MessagingFunction<K, V, E, M>,
    {
        Iteration::new(self, update, messaging, config)?.run()
    }
}
