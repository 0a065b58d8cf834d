//! End-to-end driver behavior: trivial graphs, caps, monotonicity,
//! idempotence of convergence and failure propagation.

use hashbrown::HashMap;

use pretty_assertions::assert_eq;

use spargel::algorithms::{connected_components, identity_labels, MinLabelUpdate, SendLabelToNeighbors};
use spargel::{
    BoxError, CancelHandle, DriverState, Error, Graph, Iteration, IterationConfig, MessageIterator,
    MessagingContext, MessagingFunction, Phase, Termination, VertexUpdateFunction,
};

// ============================================================================
// Helpers
// ============================================================================

/// Undirected path 1 - 2 - … - n.
fn path(n: u64) -> Graph<u64, u64, ()> {
    let edges: Vec<(u64, u64, ())> = (1..n).map(|i| (i, i + 1, ())).collect();
    Graph::build(identity_labels(1..=n), edges).unwrap().undirected()
}

// ============================================================================
// 1. Trivial graphs
// ============================================================================

#[test]
fn test_single_vertex() {
    let graph = Graph::<u64, u64, ()>::build([(7, 7)], []).unwrap();
    let result = connected_components(graph, IterationConfig::new(10)).unwrap();

    assert_eq!(result.termination, Termination::Converged { superstep: 1 });
    assert_eq!(result.graph.value_of(&7), Some(&7));
    assert_eq!(result.stats.total_messages(), 0);
    assert_eq!(result.stats.total_updates(), 0);
}

#[test]
fn test_disconnected_pair() {
    let graph = Graph::<u64, u64, ()>::build([(1, 1), (2, 2)], []).unwrap();
    let result = connected_components(graph, IterationConfig::new(10)).unwrap();

    assert_eq!(result.termination, Termination::Converged { superstep: 1 });
    assert_eq!(result.graph.value_of(&1), Some(&1));
    assert_eq!(result.graph.value_of(&2), Some(&2));
    assert_eq!(result.stats.total_messages(), 0);
}

#[test]
fn test_empty_graph() {
    let graph = Graph::<u64, u64, ()>::build([], []).unwrap();
    let result = connected_components(graph, IterationConfig::new(10)).unwrap();
    assert_eq!(result.termination, Termination::Converged { superstep: 1 });
    assert_eq!(result.graph.vertex_count(), 0);
}

// ============================================================================
// 2. Iteration cap
// ============================================================================

#[test]
fn test_cap_yields_intermediate_labeling() {
    let result = connected_components(path(20), IterationConfig::new(3)).unwrap();

    assert_eq!(result.termination, Termination::IterationCapReached { supersteps: 3 });
    let last = result.stats.supersteps.last().unwrap().superstep;
    assert_eq!(last, 2);

    // two update rounds: every label is the minimum within distance 2
    for v in result.graph.vertices() {
        assert_eq!(v.value, v.id.saturating_sub(2).max(1), "vertex {}", v.id);
    }
}

#[test]
fn test_cap_of_one_runs_only_superstep_zero() {
    let result = connected_components(path(5), IterationConfig::new(1)).unwrap();
    assert_eq!(result.termination, Termination::IterationCapReached { supersteps: 1 });
    assert_eq!(result.stats.supersteps_run(), 1);
    assert_eq!(result.stats.total_updates(), 0);
    assert_eq!(result.graph.values_snapshot(), path(5).values_snapshot());
}

#[test]
fn test_never_runs_superstep_at_or_beyond_cap() {
    for cap in 1..8u64 {
        let result = connected_components(path(30), IterationConfig::new(cap)).unwrap();
        assert!(result.stats.supersteps.iter().all(|s| s.superstep < cap));
    }
}

// ============================================================================
// 3. Monotonicity and idempotence
// ============================================================================

#[test]
fn test_labels_never_increase() {
    let graph = Graph::build(
        identity_labels([9u64, 4, 7, 1, 8, 3]),
        [(9, 4, ()), (4, 7, ()), (8, 3, ()), (3, 9, ()), (7, 1, ())],
    )
    .unwrap()
    .undirected();

    let mut it = Iteration::new(graph, MinLabelUpdate, SendLabelToNeighbors, IterationConfig::new(50)).unwrap();
    let mut previous = it.graph().values_snapshot();

    while it.state().termination().is_none() {
        it.step().unwrap();
        let current = it.graph().values_snapshot();
        for (id, label) in &current {
            assert!(label <= &previous[id], "label of {id} rose from {} to {label}", previous[id]);
        }
        previous = current;
    }

    assert!(previous.values().all(|&label| label == 1));
}

#[test]
fn test_extra_superstep_after_convergence_changes_nothing() {
    let mut it = Iteration::new(path(6), MinLabelUpdate, SendLabelToNeighbors, IterationConfig::new(50)).unwrap();
    while it.state().termination().is_none() {
        it.step().unwrap();
    }
    let converged_at = match it.state() {
        DriverState::Converged { superstep } => superstep,
        other => panic!("expected convergence, got {other:?}"),
    };
    let before = it.graph().values_snapshot();

    let extra = it.step().unwrap();
    assert_eq!(extra.superstep, converged_at + 1);
    assert_eq!(extra.messages_received, 0);
    assert_eq!(extra.updated, 0);
    assert_eq!(extra.messages_sent, 0);
    assert_eq!(it.graph().values_snapshot(), before);

    let result = it.into_result().unwrap();
    assert_eq!(result.termination, Termination::Converged { superstep: converged_at + 1 });
}

// ============================================================================
// 4. Non-numeric keys and custom functions
// ============================================================================

/// Collects the distinct names a vertex has heard of, sorted.
struct KnownNames;

impl VertexUpdateFunction<String, Vec<String>, String> for KnownNames {
    fn update(
        &self,
        _id: &String,
        known: &Vec<String>,
        messages: MessageIterator<String>,
    ) -> Result<Option<Vec<String>>, BoxError> {
        let mut next = known.clone();
        for name in messages {
            if !next.contains(&name) {
                next.push(name);
            }
        }
        next.sort();
        Ok((next != *known).then_some(next))
    }
}

/// Forwards every known name to each neighbor.
struct Gossip;

impl MessagingFunction<String, Vec<String>, (), String> for Gossip {
    fn send_messages(
        &self,
        ctx: &mut MessagingContext<'_, String, (), String>,
        _id: &String,
        known: &Vec<String>,
    ) -> Result<(), BoxError> {
        for name in known {
            ctx.send_to_all_neighbors(name.clone());
        }
        Ok(())
    }
}

#[test]
fn test_gossip_with_string_keys() {
    let names = ["ada", "bob", "cy"];
    let graph = Graph::build(
        names.iter().map(|n| (n.to_string(), vec![n.to_string()])),
        [
            ("ada".to_string(), "bob".to_string(), ()),
            ("bob".to_string(), "cy".to_string(), ()),
        ],
    )
    .unwrap()
    .undirected();

    let result = graph
        .run_vertex_centric_iteration(KnownNames, Gossip, IterationConfig::new(10))
        .unwrap();

    assert!(result.termination.is_converged());
    let everyone: Vec<String> = names.iter().map(|n| n.to_string()).collect();
    let values: HashMap<String, Vec<String>> = result.graph.values_snapshot();
    for name in names {
        assert_eq!(values[name], everyone);
    }
}

// ============================================================================
// 5. Failures
// ============================================================================

#[test]
fn test_dangling_edge_fails_before_any_superstep() {
    let err = Graph::build(identity_labels([1u64, 2]), [(1u64, 3u64, ())]).unwrap_err();
    assert!(matches!(err, Error::InvalidGraph(_)));
}

/// Rejects any message larger than its own value.
struct Picky;

impl VertexUpdateFunction<u64, u64, u64> for Picky {
    fn update(&self, id: &u64, value: &u64, messages: MessageIterator<u64>) -> Result<Option<u64>, BoxError> {
        for m in messages {
            if m > *value {
                return Err(format!("vertex {id} refuses {m}").into());
            }
        }
        Ok(None)
    }
}

#[test]
fn test_user_error_fails_whole_run() {
    let err = path(3)
        .run_vertex_centric_iteration(Picky, SendLabelToNeighbors, IterationConfig::new(10))
        .unwrap_err();

    match err {
        Error::UserFunction { superstep, phase, source, .. } => {
            assert_eq!(superstep, 1);
            assert_eq!(phase, Phase::Update);
            assert!(source.to_string().contains("refuses"));
        }
        other => panic!("expected UserFunction, got {other:?}"),
    }
}

/// Sends the label along edges, plus once to vertex 99 from vertex 1.
struct Stray;

impl MessagingFunction<u64, u64, (), u64> for Stray {
    fn send_messages(
        &self,
        ctx: &mut MessagingContext<'_, u64, (), u64>,
        id: &u64,
        label: &u64,
    ) -> Result<(), BoxError> {
        ctx.send_to_all_neighbors(*label);
        if *id == 1 {
            ctx.send_to(99, *label);
        }
        Ok(())
    }
}

#[test]
fn test_message_to_non_neighbor_fails_run() {
    let err = path(3)
        .run_vertex_centric_iteration(MinLabelUpdate, Stray, IterationConfig::new(10))
        .unwrap_err();
    match err {
        Error::InvalidMessageTarget { source_vertex, target, superstep } => {
            assert_eq!(source_vertex, "1");
            assert_eq!(target, "99");
            assert_eq!(superstep, 0);
        }
        other => panic!("expected InvalidMessageTarget, got {other:?}"),
    }
}

/// Label propagation that pulls the plug once superstep `at` starts messaging.
struct CancelAt {
    at: u64,
    handle: CancelHandle,
}

impl MessagingFunction<u64, u64, (), u64> for CancelAt {
    fn send_messages(
        &self,
        ctx: &mut MessagingContext<'_, u64, (), u64>,
        _id: &u64,
        label: &u64,
    ) -> Result<(), BoxError> {
        ctx.send_to_all_neighbors(*label);
        Ok(())
    }

    fn pre_superstep(&mut self, superstep: u64) -> Result<(), BoxError> {
        if superstep == self.at {
            self.handle.cancel();
        }
        Ok(())
    }
}

#[test]
fn test_cancel_stops_at_next_boundary() {
    let handle = CancelHandle::new();
    let config = IterationConfig::new(100).with_cancel(handle.clone());
    let messaging = CancelAt { at: 2, handle };

    let result = path(10)
        .run_vertex_centric_iteration(MinLabelUpdate, messaging, config)
        .unwrap();

    // superstep 2 still completes; nothing after it runs
    assert_eq!(result.termination, Termination::Cancelled { supersteps: 3 });
    assert_eq!(result.stats.supersteps_run(), 3);
    for v in result.graph.vertices() {
        assert_eq!(v.value, v.id.saturating_sub(2).max(1));
    }
}

/// Label propagation whose messaging breaks for one vertex at one superstep.
struct BreaksAt {
    vertex: u64,
    superstep: u64,
}

impl MessagingFunction<u64, u64, (), u64> for BreaksAt {
    fn send_messages(
        &self,
        ctx: &mut MessagingContext<'_, u64, (), u64>,
        id: &u64,
        label: &u64,
    ) -> Result<(), BoxError> {
        if *id == self.vertex && ctx.superstep() == self.superstep {
            return Err("link down".into());
        }
        ctx.send_to_all_neighbors(*label);
        Ok(())
    }
}

#[test]
fn test_failed_superstep_leaves_no_result() {
    let messaging = BreaksAt { vertex: 4, superstep: 2 };
    let mut it = Iteration::new(path(6), MinLabelUpdate, messaging, IterationConfig::new(50)).unwrap();

    it.step().unwrap();
    it.step().unwrap();
    let err = it.step().unwrap_err();
    assert!(matches!(
        err,
        Error::UserFunction { vertex: Some(_), superstep: 2, phase: Phase::Messaging, .. }
    ));
    assert_eq!(it.state(), DriverState::Failed { superstep: 2 });
    assert_eq!(it.stats().supersteps_run(), 2);

    // no retry from the half-applied superstep
    assert!(matches!(it.step(), Err(Error::IterationFinished(_))));
    assert_eq!(it.state(), DriverState::Failed { superstep: 2 });

    // and no partial graph passed off as a capped result
    match it.into_result() {
        Err(Error::IterationFailed(superstep)) => assert_eq!(superstep, 2),
        Err(other) => panic!("expected IterationFailed, got {other:?}"),
        Ok(result) => panic!("failed run produced a result: {:?}", result.termination),
    }
}

#[test]
fn test_termination_serializes() {
    let result = connected_components(path(4), IterationConfig::new(10)).unwrap();
    let json = serde_json::to_value(result.termination).unwrap();
    assert_eq!(json, serde_json::json!({"Converged": {"superstep": 4}}));

    let stats = serde_json::to_value(&result.stats).unwrap();
    assert_eq!(stats["supersteps"].as_array().unwrap().len(), 5);
}
