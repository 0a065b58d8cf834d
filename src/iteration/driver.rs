//! The superstep loop.

use std::fmt::Debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::{
    DriverState, ExecutionMode, IterationConfig, IterationResult, IterationStats,
    MessagingPolicy, SuperstepStats, Termination,
};
use crate::channel::{MessageChannel, MessageIterator};
use crate::function::{BoxError, MessagingContext, MessagingFunction, VertexUpdateFunction};
use crate::graph::Graph;
use crate::model::VertexKey;
use crate::{Error, Phase, Result};

/// One vertex-centric iteration run.
///
/// Owns the graph, both user functions, the message channel and the superstep
/// counter. Vertex-level work only ever sees shared borrows of these; values
/// are written back by the driver after each update phase.
pub struct Iteration<K, V, E, M, U, F> {
    graph: Graph<K, V, E>,
    update: U,
    messaging: F,
    config: IterationConfig,
    channel: MessageChannel<K, M>,
    state: DriverState,
    next_superstep: u64,
    stats: IterationStats,
}

impl<K, V, E, M, U, F> Iteration<K, V, E, M, U, F>
where
    K: VertexKey,
    V: Send + Sync,
    E: Send + Sync,
    M: Send,
    U: VertexUpdateFunction<K, V, M>,
    F: MessagingFunction<K, V, E, M>,
{
    pub fn new(graph: Graph<K, V, E>, update: U, messaging: F, config: IterationConfig) -> Result<Self> {
        config.validate()?;

        if config.execution == ExecutionMode::Parallel && !cfg!(feature = "parallel") {
            tracing::warn!(
                name = %config.name,
                "parallel execution requested without the `parallel` feature; running sequentially"
            );
        }

        Ok(Self {
            graph,
            update,
            messaging,
            config,
            channel: MessageChannel::new(),
            state: DriverState::Initializing,
            next_superstep: 0,
            stats: IterationStats::start(),
        })
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Index of the superstep `step()` would run next.
    pub fn next_superstep(&self) -> u64 {
        self.next_superstep
    }

    pub fn graph(&self) -> &Graph<K, V, E> {
        &self.graph
    }

    pub fn stats(&self) -> &IterationStats {
        &self.stats
    }

    pub fn config(&self) -> &IterationConfig {
        &self.config
    }

    /// Run supersteps until converged, capped or cancelled.
    pub fn run(mut self) -> Result<IterationResult<K, V, E>> {
        let span = tracing::info_span!("iteration", name = %self.config.name);
        let _guard = span.enter();

        tracing::info!(
            vertices = self.graph.vertex_count(),
            edges = self.graph.edge_count(),
            max_iterations = self.config.max_iterations,
            "starting vertex-centric iteration"
        );

        loop {
            if self.state.termination().is_some() {
                break;
            }
            if self.config.is_cancelled() {
                self.state = DriverState::Cancelled { supersteps: self.next_superstep };
                break;
            }
            if self.next_superstep >= self.config.max_iterations {
                self.state = DriverState::IterationCapReached { supersteps: self.next_superstep };
                break;
            }
            if let Err(e) = self.step() {
                tracing::error!(error = %e, superstep = self.next_superstep, "iteration failed");
                return Err(e);
            }
        }

        self.into_result()
    }

    /// Run exactly one superstep.
    ///
    /// Stepping a converged iteration is allowed. Stepping past the cap,
    /// after cancellation or after a failed superstep is
    /// `Error::IterationFinished`. An error from the superstep itself moves
    /// the driver to `DriverState::Failed`.
    pub fn step(&mut self) -> Result<SuperstepStats> {
        match self.state {
            DriverState::IterationCapReached { .. }
            | DriverState::Cancelled { .. }
            | DriverState::Failed { .. } => {
                return Err(Error::IterationFinished(format!("{:?}", self.state)));
            }
            _ => {}
        }

        let k = self.next_superstep;
        if k >= self.config.max_iterations {
            // a converged run stays converged
            if !matches!(self.state, DriverState::Converged { .. }) {
                self.state = DriverState::IterationCapReached { supersteps: k };
            }
            return Err(Error::IterationFinished(format!(
                "superstep {k} would exceed max_iterations {}",
                self.config.max_iterations
            )));
        }

        let outcome = if k == 0 { self.seed() } else { self.superstep(k) };
        let stats = match outcome {
            Ok(stats) => stats,
            Err(e) => {
                self.state = DriverState::Failed { superstep: k };
                return Err(e);
            }
        };

        tracing::debug!(
            superstep = k,
            received = stats.messages_received,
            updated = stats.updated,
            active = stats.active,
            sent = stats.messages_sent,
            "superstep complete"
        );

        self.next_superstep = k + 1;
        self.stats.supersteps.push(stats);
        self.state = if k > 0 && stats.updated == 0 {
            DriverState::Converged { superstep: k }
        } else {
            DriverState::Running { superstep: k }
        };

        Ok(stats)
    }

    /// Consume the driver and hand back the graph in its current state.
    ///
    /// If no terminal state was reached the termination is reported as
    /// `IterationCapReached` with the supersteps run so far. A failed run
    /// has no result: its graph may hold a half-applied superstep.
    pub fn into_result(mut self) -> Result<IterationResult<K, V, E>> {
        if let DriverState::Failed { superstep } = self.state {
            return Err(Error::IterationFailed(superstep));
        }

        self.stats.finish();
        let termination = self.state.termination().unwrap_or(Termination::IterationCapReached {
            supersteps: self.next_superstep,
        });

        tracing::info!(
            ?termination,
            supersteps = self.stats.supersteps_run(),
            messages = self.stats.total_messages(),
            updates = self.stats.total_updates(),
            elapsed_ms = self.stats.elapsed_ms(),
            "iteration finished"
        );

        Ok(IterationResult {
            graph: self.graph,
            termination,
            stats: self.stats,
        })
    }

    // ========================================================================
    // Supersteps
    // ========================================================================

    /// Superstep 0: every vertex announces its initial value.
    fn seed(&mut self) -> Result<SuperstepStats> {
        let all: Vec<usize> = (0..self.graph.vertex_count()).collect();
        let sent = self.messaging_phase(0, &all)?;

        Ok(SuperstepStats {
            superstep: 0,
            messages_received: 0,
            updated: 0,
            active: all.len(),
            messages_sent: sent,
        })
    }

    fn superstep(&mut self, k: u64) -> Result<SuperstepStats> {
        let inbox = self.channel.drain(k - 1)?;
        let received = inbox.message_count();

        // Route by slot so each vertex owns its messages during the update phase.
        let mut per_slot: Vec<Vec<M>> = (0..self.graph.vertex_count()).map(|_| Vec::new()).collect();
        for (destination, messages) in inbox {
            let slot = self
                .graph
                .slot_of(&destination)
                .ok_or_else(|| Error::NotFound(format!("Vertex {destination:?}")))?;
            per_slot[slot] = messages;
        }

        self.update
            .pre_superstep(k)
            .map_err(|e| hook_error(k, Phase::UpdatePreSuperstep, e))?;
        let updates = self.update_phase(k, per_slot)?;
        self.update
            .post_superstep(k)
            .map_err(|e| hook_error(k, Phase::UpdatePostSuperstep, e))?;

        let updated = updates.len();
        let mut changed = Vec::with_capacity(updated);
        for (slot, value) in updates {
            self.graph.set_value_at(slot, value);
            changed.push(slot);
        }

        let active = match self.config.messaging {
            MessagingPolicy::ChangedVertices => changed,
            MessagingPolicy::AllVertices => (0..self.graph.vertex_count()).collect(),
        };
        let sent = self.messaging_phase(k, &active)?;

        Ok(SuperstepStats {
            superstep: k,
            messages_received: received,
            updated,
            active: active.len(),
            messages_sent: sent,
        })
    }

    /// Update every vertex. Returns `(slot, new_value)` for the vertices that changed.
    fn update_phase(&self, k: u64, per_slot: Vec<Vec<M>>) -> Result<Vec<(usize, V)>> {
        let graph = &self.graph;
        let update = &self.update;

        let eval = |(slot, messages): (usize, Vec<M>)| -> Option<Result<(usize, V)>> {
            let vertex = graph.vertex_at(slot);
            match update.update(&vertex.id, &vertex.value, MessageIterator::new(messages)) {
                Ok(Some(value)) => Some(Ok((slot, value))),
                Ok(None) => None,
                Err(e) => Some(Err(vertex_error(&vertex.id, k, Phase::Update, e))),
            }
        };

        if self.parallel() {
            par_filter_collect(per_slot, eval)
        } else {
            per_slot.into_iter().enumerate().filter_map(eval).collect()
        }
    }

    /// Run the messaging function for `active` slots. Returns messages sent.
    fn messaging_phase(&mut self, k: u64, active: &[usize]) -> Result<usize> {
        self.messaging
            .pre_superstep(k)
            .map_err(|e| hook_error(k, Phase::MessagingPreSuperstep, e))?;

        let graph = &self.graph;
        let messaging = &self.messaging;
        let channel = &self.channel;

        let send = |&slot: &usize| -> Result<usize> {
            let vertex = graph.vertex_at(slot);
            let mut ctx = MessagingContext::new(k, &vertex.id, graph.neighbors_at(slot), channel);
            messaging
                .send_messages(&mut ctx, &vertex.id, &vertex.value)
                .map_err(|e| vertex_error(&vertex.id, k, Phase::Messaging, e))?;
            ctx.finish()
        };

        let sent = if self.parallel() {
            par_sum(active, send)?
        } else {
            active.iter().map(send).sum::<Result<usize>>()?
        };

        self.messaging
            .post_superstep(k)
            .map_err(|e| hook_error(k, Phase::MessagingPostSuperstep, e))?;

        Ok(sent)
    }

    fn parallel(&self) -> bool {
        cfg!(feature = "parallel") && self.config.execution == ExecutionMode::Parallel
    }
}

// ============================================================================
// Parallel helpers
// ============================================================================

/// Evaluate `f` over `(slot, item)` pairs with rayon, keeping the `Some` results.
#[cfg(feature = "parallel")]
fn par_filter_collect<T, R, F>(items: Vec<T>, f: F) -> Result<Vec<R>>
where
    T: Send,
    R: Send,
    F: Fn((usize, T)) -> Option<Result<R>> + Sync + Send,
{
    items.into_par_iter().enumerate().filter_map(f).collect()
}

#[cfg(not(feature = "parallel"))]
fn par_filter_collect<T, R, F>(items: Vec<T>, f: F) -> Result<Vec<R>>
where
    F: Fn((usize, T)) -> Option<Result<R>>,
{
    items.into_iter().enumerate().filter_map(f).collect()
}

/// Sum `f` over `items` with rayon. Stops at the first error.
#[cfg(feature = "parallel")]
fn par_sum<T, F>(items: &[T], f: F) -> Result<usize>
where
    T: Sync,
    F: Fn(&T) -> Result<usize> + Sync + Send,
{
    items.par_iter().map(f).try_reduce(|| 0, |a, b| Ok(a + b))
}

#[cfg(not(feature = "parallel"))]
fn par_sum<T, F>(items: &[T], f: F) -> Result<usize>
where
    F: Fn(&T) -> Result<usize>,
{
    items.iter().map(f).sum()
}

fn vertex_error<K: Debug>(id: &K, superstep: u64, phase: Phase, source: BoxError) -> Error {
    Error::UserFunction {
        vertex: Some(format!("{id:?}")),
        superstep,
        phase,
        source,
    }
}

fn hook_error(superstep: u64, phase: Phase, source: BoxError) -> Error {
    Error::UserFunction {
        vertex: None,
        superstep,
        phase,
        source,
    }
}

// ============================================================================
// Tests
// ============================================================================
