#![cfg_attr(docsrs, feature(doc_cfg))]
//! # ftr-graph
//!
//! ftr-graph computes the Reeb graph of a piecewise-linear scalar field on a
//! triangulated surface. Local sweeps ("propagations") grow from the extrema
//! of the field, wait for each other at join saddles, split at split saddles
//! and run in parallel on a `rayon` pool.
//!
//! ## Features
//! - A dynamic ST-forest tracking the level-set components of the sweep
//! - Lock-protected join coordination per saddle vertex
//! - Canonical output: repeated builds produce identical graphs, whatever the
//!   thread count
//! - Optional segmentation of regular vertices onto arcs
//! - Mesh generators for plates, plates with holes, tori and spheres
//!
//! ## Determinism
//!
//! Vertices are ordered by value, then by a caller-provided offset, and any
//! tie left is rejected up front. Graph node and arc ids are renumbered by
//! that order after the sweep, so scheduling never shows in the output.
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! ftr-graph = "0.1"
//! # Optional features:
//! # features = ["check-invariants"]
//! ```
//!
//! ```
//! use ftr_graph::prelude::*;
//! use ftr_graph::algs::meshgen;
//!
//! let torus = meshgen::torus(24, 12, 3.0, 1.0).unwrap();
//! let f = height_field(&torus.coords, |[x, y, z]| x + 0.01 * y + 0.001 * z);
//! let offsets = identity_offsets(f.len());
//!
//! let mut ftr = FtrGraph::new(FtrConfig::default());
//! ftr.setup_mesh(&torus.mesh).set_scalars(&f).set_offsets(&offsets);
//! let graph = ftr.build().unwrap();
//! assert_eq!(graph.num_loops(), 1);
//! ```

pub mod algs;
pub mod config;
pub mod debug_invariants;
pub mod forest;
pub mod ftr_error;
pub mod graph;
pub mod topology;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::ftr::FtrGraph;
    pub use crate::algs::growth::SweepStats;
    pub use crate::algs::meshgen::{GeneratedMesh, height_field};
    pub use crate::config::{FtrConfig, SweepDirection};
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::forest::DynamicForest;
    pub use crate::ftr_error::FtrError;
    pub use crate::graph::{NodeKind, ReebArc, ReebGraph, ReebNode};
    pub use crate::topology::ids::{ArcId, NodeId, PropagationId};
    pub use crate::topology::mesh::{EdgeId, MeshTopology, TriangleId, TriangleMesh, VertexId};
    pub use crate::topology::scalars::{ScalarValue, Scalars, identity_offsets};
}
