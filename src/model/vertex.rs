//! Vertex in the iteration graph.

use std::fmt::Debug;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// Bound for vertex identifiers.
///
/// Any comparable, hashable, thread-safe key qualifies. `Debug` is required so
/// that failures can name the vertex they happened at.
pub trait VertexKey: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T> VertexKey for T where T: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

/// A vertex: identity plus its current value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vertex<K, V> {
    pub id: K,
    pub value: V,
}

impl<K, V> Vertex<K, V> {
    pub fn new(id: K, value: V) -> Self {
        Self { id, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_id_value_object() {
        let v = Vertex::new(1u64, "one");
        assert_eq!(serde_json::to_value(&v).unwrap(), serde_json::json!({"id": 1, "value": "one"}));
    }
}
