//! Inputs of the sweep: mesh adjacency, the scalar order and entity ids.
//!
//! - [`mesh`]: the [`MeshTopology`] contract and the CSR-backed [`TriangleMesh`]
//! - [`scalars`]: the strict (value, offset) vertex order
//! - [`ids`]: typed handles for graph nodes, arcs and propagations

pub mod ids;
pub mod mesh;
pub mod scalars;

pub use ids::{ArcId, NodeId, PropagationId};
pub use mesh::{EdgeId, MeshTopology, TriangleId, TriangleMesh, VertexId};
pub use scalars::{ScalarValue, Scalars, identity_offsets};
