//! Reference vertex-centric algorithms built on the iteration driver.

pub mod connected_components;
pub mod shortest_paths;

pub use connected_components::{connected_components, identity_labels, MinLabelUpdate, SendLabelToNeighbors};
pub use shortest_paths::{single_source_shortest_paths, DistanceUpdate, SendDistances};
