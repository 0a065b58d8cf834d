//! Single-source shortest paths over non-negative `f64` edge weights.
//!
//! The source starts at distance 0, everything else at infinity. A vertex
//! that learns a shorter distance forwards `distance + weight` along each
//! outgoing edge.

use crate::channel::MessageIterator;
use crate::function::{BoxError, MessagingContext, MessagingFunction, VertexUpdateFunction};
use crate::graph::Graph;
use crate::iteration::{IterationConfig, IterationResult};
use crate::model::VertexKey;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, Default)]
pub struct DistanceUpdate;

impl<K> VertexUpdateFunction<K, f64, f64> for DistanceUpdate {
    fn update(&self, _id: &K, distance: &f64, messages: MessageIterator<f64>) -> std::result::Result<Option<f64>, BoxError> {
        let shortest = messages.fold(f64::INFINITY, f64::min);
        Ok((shortest < *distance).then_some(shortest))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SendDistances;

impl<K: VertexKey> MessagingFunction<K, f64, f64, f64> for SendDistances {
    fn send_messages(
        &self,
        ctx: &mut MessagingContext<'_, K, f64, f64>,
        _id: &K,
        distance: &f64,
    ) -> std::result::Result<(), BoxError> {
        if distance.is_infinite() {
            return Ok(());
        }
        for (target, weight) in ctx.neighbors() {
            if *weight < 0.0 {
                return Err(format!("negative edge weight {weight} to {target:?}").into());
            }
            ctx.send_to(target.clone(), distance + weight);
        }
        Ok(())
    }
}

/// Distances from `source` along outgoing edges. Unreachable vertices stay at infinity.
///
/// Vertex values of `graph` are ignored and re-initialized.
pub fn single_source_shortest_paths<K, V>(
    graph: Graph<K, V, f64>,
    source: &K,
    config: IterationConfig,
) -> Result<IterationResult<K, f64, f64>>
where
    K: VertexKey,
{
    if !graph.contains_vertex(source) {
        return Err(Error::NotFound(format!("Source vertex {source:?}")));
    }

    let vertices: Vec<(K, f64)> = graph
        .vertices()
        .map(|v| {
            let d = if &v.id == source { 0.0 } else { f64::INFINITY };
            (v.id.clone(), d)
        })
        .collect();
    let edges: Vec<(K, K, f64)> = graph
        .edges()
        .iter()
        .map(|e| (e.source.clone(), e.target.clone(), e.value))
        .collect();

    Graph::build(vertices, edges)?.run_vertex_centric_iteration(DistanceUpdate, SendDistances, config)
}
