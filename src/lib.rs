//! # spargel: Vertex-Centric Superstep Iteration
//!
//! A Pregel-style bulk-synchronous graph iteration engine. Computation is
//! expressed from each vertex's local perspective: a vertex sees its own value
//! and the messages sent to it in the previous superstep, never another
//! vertex's state.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `VertexUpdateFunction` and `MessagingFunction` are the
//!    contract between user logic and the driver
//! 2. **Barrier only**: supersteps are strict barriers; nothing inside a round
//!    waits on another vertex
//! 3. **Driver owns state**: vertex values and the superstep counter are never
//!    shared mutably with vertex-level work
//! 4. **Fail whole**: a failing vertex fails the run, there is no partial output
//!
//! ## Quick Start
//!
//! ```rust
//! use spargel::{Graph, IterationConfig, Termination};
//! use spargel::algorithms::connected_components;
//!
//! # fn example() -> spargel::Result<()> {
//! let graph = Graph::build(
//!     [(1u64, 1u64), (2, 2), (3, 3)],
//!     [(1, 2, ()), (2, 3, ())],
//! )?
//! .undirected();
//!
//! let result = connected_components(graph, IterationConfig::new(10))?;
//! assert!(matches!(result.termination, Termination::Converged { .. }));
//! assert_eq!(result.graph.value_of(&3), Some(&1));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Superstep Layout
//!
//! ```text
//! superstep 0:  messaging(all vertices)                     → mailbox[0]
//! superstep k:  drain mailbox[k-1] → update(all vertices)
//!               → messaging(changed vertices)               → mailbox[k]
//!               → converged if nothing changed
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod graph;
pub mod channel;
pub mod function;
pub mod iteration;
pub mod algorithms;
pub mod export;

// ============================================================================
// Re-exports: Model
// ============================================================================

pub use model::{Edge, Vertex, VertexKey};

// ============================================================================
// Re-exports: Graph store and channel
// ============================================================================

pub use graph::{Graph, Neighbors};
pub use channel::{Inbox, MessageChannel, MessageIterator};

// ============================================================================
// Re-exports: User functions
// ============================================================================

pub use function::{BoxError, MessagingContext, MessagingFunction, VertexUpdateFunction};

// ============================================================================
// Re-exports: Iteration
// ============================================================================

pub use iteration::{
    CancelHandle, DriverState, ExecutionMode, Iteration, IterationConfig,
    IterationResult, IterationStats, MessagingPolicy, SuperstepStats, Termination,
};

// ============================================================================
// Error Types
// ============================================================================

/// The phase of a superstep in which a user function ran.
///
/// Hook phases name the function whose hook ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Phase {
    UpdatePreSuperstep,
    Update,
    UpdatePostSuperstep,
    MessagingPreSuperstep,
    Messaging,
    MessagingPostSuperstep,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::UpdatePreSuperstep => "update pre-superstep hook",
            Phase::Update => "update",
            Phase::UpdatePostSuperstep => "update post-superstep hook",
            Phase::MessagingPreSuperstep => "messaging pre-superstep hook",
            Phase::Messaging => "messaging",
            Phase::MessagingPostSuperstep => "messaging post-superstep hook",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    #[error("Invalid message target at superstep {superstep}: vertex {source_vertex} has no edge to {target}")]
    InvalidMessageTarget {
        source_vertex: String,
        target: String,
        superstep: u64,
    },

    #[error("User function failed in {phase} at superstep {superstep}{}: {source}", vertex_suffix(.vertex))]
    UserFunction {
        /// `None` when a superstep hook failed rather than a per-vertex call.
        vertex: Option<String>,
        superstep: u64,
        phase: Phase,
        #[source]
        source: BoxError,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Mailbox for superstep {0} was already drained")]
    MailboxDrained(u64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Iteration finished: {0}")]
    IterationFinished(String),

    #[error("Iteration failed at superstep {0}; no result is available")]
    IterationFailed(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

fn vertex_suffix(vertex: &Option<String>) -> String {
    vertex.as_ref().map(|v| format!(" (vertex {v})")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_function_error_keeps_source() {
        let err = Error::UserFunction {
            vertex: Some("7".into()),
            superstep: 3,
            phase: Phase::Update,
            source: "boom".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("update"));
        assert!(msg.contains("superstep 3"));
        assert!(msg.contains("vertex 7"));
        assert_eq!(std::error::Error::source(&err).unwrap().to_string(), "boom");
    }

    #[test]
    fn test_hook_error_has_no_vertex() {
        let err = Error::UserFunction {
            vertex: None,
            superstep: 0,
            phase: Phase::MessagingPreSuperstep,
            source: "setup".into(),
        };
        assert_eq!(
            err.to_string(),
            "User function failed in messaging pre-superstep hook at superstep 0: setup"
        );
    }

    #[test]
    fn test_invalid_target_display() {
        let err = Error::InvalidMessageTarget {
            source_vertex: "1".into(),
            target: "9".into(),
            superstep: 0,
        };
        assert_eq!(
            err.to_string(),
            "Invalid message target at superstep 0: vertex 1 has no edge to 9"
        );
    }
}
