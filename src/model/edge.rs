//! Edge (directed) in the iteration graph.

use serde::{Deserialize, Serialize};

/// A directed edge `source -> target` carrying an edge value.
///
/// Use `()` as the value type for edges without payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge<K, E> {
    pub source: K,
    pub target: K,
    pub value: E,
}

impl<K, E> Edge<K, E> {
    pub fn new(source: K, target: K, value: E) -> Self {
        Self { source, target, value }
    }

    /// The same edge pointing the other way.
    pub fn reversed(&self) -> Self
    where
        K: Clone,
        E: Clone,
    {
        Self {
            source: self.target.clone(),
            target: self.source.clone(),
            value: self.value.clone(),
        }
    }

    pub fn is_self_loop(&self) -> bool
    where
        K: PartialEq,
    {
        self.source == self.target
    }
}
