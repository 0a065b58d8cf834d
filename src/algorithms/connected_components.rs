//! Connected components by minimum-label propagation.
//!
//! Every vertex starts labelled with its own id. Each superstep a vertex adopts
//! the smallest label it hears about, and only vertices whose label dropped
//! tell their neighbors. Labels never increase and are bounded below, so the
//! run reaches a fixed point in at most diameter + 1 supersteps.
//!
//! Messages only travel along outgoing edges: build the graph with
//! `Graph::undirected` for weakly connected components.

use crate::channel::MessageIterator;
use crate::function::{BoxError, MessagingContext, MessagingFunction, VertexUpdateFunction};
use crate::graph::Graph;
use crate::iteration::{IterationConfig, IterationResult};
use crate::model::VertexKey;
use crate::Result;

/// `min(current, messages)`, reported only when strictly smaller.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinLabelUpdate;

impl<K, L> VertexUpdateFunction<K, L, L> for MinLabelUpdate
where
    L: Ord + Send + Sync,
{
    fn update(&self, _id: &K, label: &L, messages: MessageIterator<L>) -> std::result::Result<Option<L>, BoxError> {
        Ok(messages.min().filter(|candidate| candidate < label))
    }
}

/// Sends the current label to every outgoing neighbor.
#[derive(Debug, Clone, Copy, Default)]
pub struct SendLabelToNeighbors;

impl<K, L, E> MessagingFunction<K, L, E, L> for SendLabelToNeighbors
where
    K: VertexKey,
    L: Clone + Send + Sync,
    E: Send + Sync,
{
    fn send_messages(
        &self,
        ctx: &mut MessagingContext<'_, K, E, L>,
        _id: &K,
        label: &L,
    ) -> std::result::Result<(), BoxError> {
        ctx.send_to_all_neighbors(label.clone());
        Ok(())
    }
}

/// Initial `(id, id)` pairs: every vertex is its own component.
pub fn identity_labels<K, I>(ids: I) -> impl Iterator<Item = (K, K)>
where
    K: Clone,
    I: IntoIterator<Item = K>,
{
    ids.into_iter().map(|id| (id.clone(), id))
}

/// Label every vertex with the smallest label reachable against edge direction.
pub fn connected_components<K, E>(
    graph: Graph<K, K, E>,
    config: IterationConfig,
) -> Result<IterationResult<K, K, E>>
where
    K: VertexKey + Ord,
    E: Send + Sync,
{
    graph.run_vertex_centric_iteration(MinLabelUpdate, SendLabelToNeighbors, config)
}
