//! FtrError: Unified error type for ftr-graph public APIs
//!
//! Every fallible entry point of the crate returns `Result<_, FtrError>`.
//! Precondition violations are reported before a sweep starts; the sweep
//! itself only fails when one of its own invariants is broken.

use thiserror::Error;

/// Unified error type for Reeb graph construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FtrError {
    /// `build` was called before a mesh was attached.
    #[error("no mesh attached: call `setup_mesh` before building")]
    MissingMesh,
    /// The mesh adjacency caches were not computed.
    #[error("mesh adjacency caches are missing: call `preprocess` on the mesh first")]
    MeshNotPreprocessed,
    /// `build` was called before a scalar field was attached.
    #[error("no scalar field attached: call `set_scalars` before building")]
    MissingScalars,
    /// `build` was called before tie-breaking offsets were attached.
    #[error("no vertex offsets attached: call `set_offsets` before building")]
    MissingOffsets,
    /// The scalar array does not cover the mesh vertices.
    #[error("scalar field has {found} values but the mesh has {expected} vertices")]
    ScalarCountMismatch { expected: usize, found: usize },
    /// The offset array does not cover the mesh vertices.
    #[error("offset array has {found} entries but the mesh has {expected} vertices")]
    OffsetCountMismatch { expected: usize, found: usize },
    /// A scalar value cannot be ordered (e.g. NaN).
    #[error("scalar value at vertex {0} cannot be ordered")]
    IncomparableScalar(usize),
    /// Two vertices share both value and offset; the order would not be strict.
    #[error("vertices {a} and {b} tie on both scalar value and offset")]
    AmbiguousOrder { a: usize, b: usize },
    /// The mesh description itself is malformed.
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),
    /// A mesh entity refers to a preimage node outside of the forest arena.
    #[error("dynamic forest holds {available} nodes but node {required} was requested")]
    ForestCapacity { required: usize, available: usize },
    /// The worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
    /// The sweep stopped with work left (typically a non-manifold input).
    #[error("sweep ended with {unprocessed} unprocessed vertices and {parked} parked propagations")]
    IncompleteSweep { unprocessed: usize, parked: usize },
    /// An internal invariant was violated.
    #[error("invariant violated: {0}")]
    Invariant(String),
}
