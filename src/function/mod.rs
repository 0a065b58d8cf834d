//! # User Function Contracts
//!
//! The two capabilities a vertex-centric algorithm plugs into the driver:
//!
//! | Trait | Runs | Produces |
//! |-------|------|----------|
//! | `VertexUpdateFunction` | once per vertex per superstep ≥ 1 | optional new value |
//! | `MessagingFunction` | once per active vertex per superstep | messages to neighbors |
//!
//! Per-vertex calls take `&self` because they may run in parallel inside a
//! superstep. The `pre_superstep` / `post_superstep` hooks take `&mut self`:
//! the driver calls them serially, outside the parallel section.

use hashbrown::HashSet;

use crate::channel::{MessageChannel, MessageIterator};
use crate::graph::Neighbors;
use crate::model::VertexKey;
use crate::{Error, Result};

/// Error type user functions may return. Wrapped into `Error::UserFunction`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// ============================================================================
// VertexUpdateFunction
// ============================================================================

/// Consumes the messages delivered to one vertex and decides its new value.
///
/// Returning `Ok(None)` leaves the value unchanged and marks the vertex as
/// quiescent for this superstep. Message order across senders is not
/// specified, so the reduction over `messages` must not depend on it.
pub trait VertexUpdateFunction<K, V, M>: Send + Sync {
    fn update(&self, id: &K, value: &V, messages: MessageIterator<M>) -> std::result::Result<Option<V>, BoxError>;

    /// Called once before the update phase of every superstep ≥ 1.
    fn pre_superstep(&mut self, _superstep: u64) -> std::result::Result<(), BoxError> {
        Ok(())
    }

    /// Called once after the update phase of every superstep ≥ 1.
    fn post_superstep(&mut self, _superstep: u64) -> std::result::Result<(), BoxError> {
        Ok(())
    }
}

// ============================================================================
// MessagingFunction
// ============================================================================

/// Decides which messages a vertex sends to which of its neighbors.
pub trait MessagingFunction<K, V, E, M>: Send + Sync {
    fn send_messages(
        &self,
        ctx: &mut MessagingContext<'_, K, E, M>,
        id: &K,
        value: &V,
    ) -> std::result::Result<(), BoxError>;

    /// Called once before the messaging phase of every superstep.
    fn pre_superstep(&mut self, _superstep: u64) -> std::result::Result<(), BoxError> {
        Ok(())
    }

    /// Called once after the messaging phase of every superstep.
    fn post_superstep(&mut self, _superstep: u64) -> std::result::Result<(), BoxError> {
        Ok(())
    }
}

// ============================================================================
// MessagingContext
// ============================================================================

/// Outbox handed to `MessagingFunction::send_messages` for one vertex.
///
/// Targets must be outgoing neighbors of the sending vertex. A message to any
/// other vertex is dropped and the violation fails the run once the call returns.
pub struct MessagingContext<'a, K, E, M> {
    superstep: u64,
    source: &'a K,
    neighbors: Neighbors<'a, K, E>,
    /// Neighbor ids, built on the first targeted send.
    targets: Option<HashSet<&'a K>>,
    channel: &'a MessageChannel<K, M>,
    sent: usize,
    invalid_target: Option<K>,
    publish_error: Option<Error>,
}

impl<'a, K: VertexKey, E, M> MessagingContext<'a, K, E, M> {
    pub(crate) fn new(
        superstep: u64,
        source: &'a K,
        neighbors: Neighbors<'a, K, E>,
        channel: &'a MessageChannel<K, M>,
    ) -> Self {
        Self {
            superstep,
            source,
            neighbors,
            targets: None,
            channel,
            sent: 0,
            invalid_target: None,
            publish_error: None,
        }
    }

    pub fn superstep(&self) -> u64 {
        self.superstep
    }

    /// The sending vertex.
    pub fn vertex(&self) -> &K {
        self.source
    }

    /// Outgoing `(neighbor, edge_value)` pairs of the sending vertex.
    pub fn neighbors(&self) -> Neighbors<'a, K, E> {
        self.neighbors.clone()
    }

    pub fn is_neighbor(&self, id: &K) -> bool {
        match &self.targets {
            Some(targets) => targets.contains(id),
            None => self.neighbors.clone().any(|(n, _)| n == id),
        }
    }

    fn targets(&mut self) -> &HashSet<&'a K> {
        let neighbors = &self.neighbors;
        self.targets
            .get_or_insert_with(|| neighbors.clone().map(|(id, _)| id).collect())
    }

    /// Messages successfully sent so far by this vertex.
    pub fn sent(&self) -> usize {
        self.sent
    }

    /// One message per outgoing edge, each carrying a copy of `message`.
    pub fn send_to_all_neighbors(&mut self, message: M)
    where
        M: Clone,
    {
        for (target, _) in self.neighbors.clone() {
            self.deliver(target.clone(), message.clone());
        }
    }

    /// Send to a single neighbor.
    pub fn send_to(&mut self, target: K, message: M) {
        if self.targets().contains(&target) {
            self.deliver(target, message);
        } else if self.invalid_target.is_none() {
            self.invalid_target = Some(target);
        }
    }

    /// Send a copy of `message` to each of `targets`. Every target must be a neighbor.
    pub fn send_to_subset<I>(&mut self, targets: I, message: M)
    where
        I: IntoIterator<Item = K>,
        M: Clone,
    {
        for target in targets {
            self.send_to(target, message.clone());
        }
    }

    fn deliver(&mut self, target: K, message: M) {
        if self.publish_error.is_some() {
            return;
        }
        match self.channel.publish(self.superstep, target, message) {
            Ok(()) => self.sent += 1,
            Err(e) => self.publish_error = Some(e),
        }
    }

    /// Close the outbox: the number of messages sent, or the first contract violation.
    pub(crate) fn finish(self) -> Result<usize> {
        if let Some(target) = self.invalid_target {
            return Err(Error::InvalidMessageTarget {
                source_vertex: format!("{:?}", self.source),
                target: format!("{target:?}"),
                superstep: self.superstep,
            });
        }
        match self.publish_error {
            Some(e) => Err(e),
            None => Ok(self.sent),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
