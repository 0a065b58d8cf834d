//! # Graph Model
//!
//! Plain DTOs shared by the graph store, the channel and the driver.
//!
//! Design rule: this module is pure data: no I/O, no locks, no iteration state.

pub mod vertex;
pub mod edge;

pub use vertex::{Vertex, VertexKey};
pub use edge::Edge;
