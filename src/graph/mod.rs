//! # Graph Store
//!
//! Holds the vertex set and the fixed edge set of one iteration run.
//!
//! Vertices keep their insertion order and are addressed internally by slot
//! (their position in that order). Each slot owns the list of its outgoing
//! edge indices, so `neighbors_of` yields neighbors in edge-insertion order.
//!
//! Edges are validated once, at build time: an edge whose endpoint is not a
//! vertex is an `InvalidGraph` error, never a runtime one.

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::model::{Edge, Vertex, VertexKey};
use crate::{Error, Result};

/// Outgoing edge indices of one vertex. Most vertices have few out-edges.
type EdgeSlots = SmallVec<[usize; 4]>;

/// The unit passed into and returned from the iteration driver.
#[derive(Debug, Clone)]
pub struct Graph<K, V, E> {
    vertices: Vec<Vertex<K, V>>,
    /// vertex id → slot in `vertices`
    index: HashMap<K, usize>,
    edges: Vec<Edge<K, E>>,
    /// slot → indices into `edges`, in insertion order
    out_edges: Vec<EdgeSlots>,
}

impl<K: VertexKey, V, E> Graph<K, V, E> {
    /// Build a graph from an id → value mapping and a `(source, target, value)` edge list.
    ///
    /// Fails with `Error::InvalidGraph` on a duplicate vertex id or on an edge
    /// endpoint that is not in the vertex set.
    pub fn build<VI, EI>(vertices: VI, edges: EI) -> Result<Self>
    where
        VI: IntoIterator<Item = (K, V)>,
        EI: IntoIterator<Item = (K, K, E)>,
    {
        let vertices = vertices.into_iter();
        let mut slots = Vec::with_capacity(vertices.size_hint().0);
        let mut index = HashMap::with_capacity(vertices.size_hint().0);

        for (id, value) in vertices {
            if index.contains_key(&id) {
                return Err(Error::InvalidGraph(format!("duplicate vertex {id:?}")));
            }
            index.insert(id.clone(), slots.len());
            slots.push(Vertex::new(id, value));
        }

        let mut graph = Self {
            out_edges: vec![EdgeSlots::new(); slots.len()],
            vertices: slots,
            index,
            edges: Vec::new(),
        };

        for (source, target, value) in edges {
            graph.push_edge(Edge::new(source, target, value))?;
        }

        tracing::debug!(
            vertices = graph.vertex_count(),
            edges = graph.edge_count(),
            "graph built"
        );

        Ok(graph)
    }

    fn push_edge(&mut self, edge: Edge<K, E>) -> Result<()> {
        let src = *self.index.get(&edge.source).ok_or_else(|| {
            Error::InvalidGraph(format!(
                "edge {:?} -> {:?} references unknown source vertex",
                edge.source, edge.target
            ))
        })?;
        if !self.index.contains_key(&edge.target) {
            return Err(Error::InvalidGraph(format!(
                "edge {:?} -> {:?} references unknown target vertex",
                edge.source, edge.target
            )));
        }

        self.out_edges[src].push(self.edges.len());
        self.edges.push(edge);
        Ok(())
    }

    /// Add the reverse of every edge, keeping edge values.
    ///
    /// Self-loops are not duplicated.
    pub fn undirected(mut self) -> Self
    where
        E: Clone,
    {
        let reversed: Vec<Edge<K, E>> = self
            .edges
            .iter()
            .filter(|e| !e.is_self_loop())
            .map(Edge::reversed)
            .collect();

        for edge in reversed {
            // Endpoints were validated when the forward edge was added.
            let src = self.index[&edge.source];
            self.out_edges[src].push(self.edges.len());
            self.edges.push(edge);
        }
        self
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains_vertex(&self, id: &K) -> bool {
        self.index.contains_key(id)
    }

    pub fn value_of(&self, id: &K) -> Option<&V> {
        self.index.get(id).map(|&slot| &self.vertices[slot].value)
    }

    /// Outgoing neighbors of `id` with their edge values, in edge-insertion order.
    pub fn neighbors_of(&self, id: &K) -> Result<Neighbors<'_, K, E>> {
        let slot = self
            .slot_of(id)
            .ok_or_else(|| Error::NotFound(format!("Vertex {id:?}")))?;
        Ok(self.neighbors_at(slot))
    }

    /// Vertices in insertion order.
    pub fn vertices(&self) -> impl ExactSizeIterator<Item = &Vertex<K, V>> {
        self.vertices.iter()
    }

    pub fn edges(&self) -> &[Edge<K, E>] {
        &self.edges
    }

    /// Copy of the current id → value mapping.
    pub fn values_snapshot(&self) -> HashMap<K, V>
    where
        V: Clone,
    {
        self.vertices
            .iter()
            .map(|v| (v.id.clone(), v.value.clone()))
            .collect()
    }

    // ========================================================================
    // Slot access (driver only)
    // ========================================================================

    pub(crate) fn slot_of(&self, id: &K) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub(crate) fn vertex_at(&self, slot: usize) -> &Vertex<K, V> {
        &self.vertices[slot]
    }

    pub(crate) fn neighbors_at(&self, slot: usize) -> Neighbors<'_, K, E> {
        Neighbors {
            edges: &self.edges,
            slots: self.out_edges[slot].iter(),
        }
    }

    /// Whole-value replacement. Only called by the driver between phases.
    pub(crate) fn set_value_at(&mut self, slot: usize, value: V) {
        self.vertices[slot].value = value;
    }
}

// ============================================================================
// Neighbors
// ============================================================================

/// Iterator over `(neighbor_id, edge_value)` of one vertex's outgoing edges.
#[derive(Debug)]
pub struct Neighbors<'g, K, E> {
    edges: &'g [Edge<K, E>],
    slots: std::slice::Iter<'g, usize>,
}

// Only borrows, so cloning needs no bounds on K or E.
impl<K, E> Clone for Neighbors<'_, K, E> {
    fn clone(&self) -> Self {
        Self {
            edges: self.edges,
            slots: self.slots.clone(),
        }
    }
}

impl<'g, K, E> Iterator for Neighbors<'g, K, E> {
    type Item = (&'g K, &'g E);

    fn next(&mut self) -> Option<Self::Item> {
        self.slots.next().map(|&i| {
            let edge = &self.edges[i];
            (&edge.target, &edge.value)
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.slots.size_hint()
    }
}

impl<K, E> ExactSizeIterator for Neighbors<'_, K, E> {}

// ============================================================================
// Tests
// ============================================================================
