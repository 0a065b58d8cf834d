//! Vertex value export, the sink side of an iteration run.
//!
//! Writes the final `(id, value)` pairs, one vertex per line, in vertex
//! insertion order:
//!
//! ```text
//! Graph → write_vertex_values()       → "1 1\n2 1\n3 3\n"
//!       → write_vertex_values_json()  → {"id":1,"value":1}\n…
//! ```

use std::fmt::Display;
use std::io::Write;

use serde::Serialize;

use crate::graph::Graph;
use crate::model::VertexKey;
use crate::Result;

/// Write `id value` lines, space separated.
pub fn write_vertex_values<K, V, E>(graph: &Graph<K, V, E>, writer: &mut dyn Write) -> Result<()>
where
    K: VertexKey + Display,
    V: Display,
{
    write_vertex_values_delimited(graph, writer, " ")
}

/// Write `id<delimiter>value` lines.
pub fn write_vertex_values_delimited<K, V, E>(
    graph: &Graph<K, V, E>,
    writer: &mut dyn Write,
    delimiter: &str,
) -> Result<()>
where
    K: VertexKey + Display,
    V: Display,
{
    for vertex in graph.vertices() {
        writeln!(writer, "{}{}{}", vertex.id, delimiter, vertex.value)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write one JSON object `{"id": …, "value": …}` per line.
pub fn write_vertex_values_json<K, V, E>(graph: &Graph<K, V, E>, writer: &mut dyn Write) -> Result<()>
where
    K: VertexKey + Serialize,
    V: Serialize,
{
    for vertex in graph.vertices() {
        serde_json::to_writer(&mut *writer, vertex)?;
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}
