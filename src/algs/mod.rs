//! Re-export public algorithms.

pub mod ftr;
pub mod growth;
pub mod meshgen;
pub mod propagation;
pub mod saddle;
pub(crate) mod split;

pub use ftr::FtrGraph;
pub use growth::SweepStats;
pub use meshgen::{GeneratedMesh, height_field};
pub use propagation::{Propagation, PropagationRegistry, PropagationStatus};
