//! Builder entry point for Reeb graph computation.
//!
//! ```
//! use ftr_graph::prelude::*;
//!
//! let generated = ftr_graph::algs::meshgen::grid(4, 3).unwrap();
//! let f = height_field(&generated.coords, |[x, y, _]| x + 0.37 * y);
//! let offsets = identity_offsets(f.len());
//!
//! let mut ftr = FtrGraph::new(FtrConfig::default().with_threads(2));
//! ftr.setup_mesh(&generated.mesh).set_scalars(&f).set_offsets(&offsets);
//! let graph = ftr.build().unwrap();
//! assert_eq!(graph.num_nodes(), 2);
//! assert_eq!(graph.num_arcs(), 1);
//! ```

use super::growth::{SweepContext, SweepStats};
use crate::config::{FtrConfig, SweepDirection};
use crate::ftr_error::FtrError;
use crate::graph::ReebGraph;
use crate::topology::mesh::MeshTopology;
use crate::topology::scalars::{ScalarValue, Scalars};
use std::time::Instant;

/// Reeb graph builder.
///
/// Inputs are borrowed; nothing is computed before [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct FtrGraph<'a, M, T> {
    config: FtrConfig,
    mesh: Option<&'a M>,
    scalars: Option<&'a [T]>,
    offsets: Option<&'a [usize]>,
}

impl<'a, M, T> FtrGraph<'a, M, T>
where
    M: MeshTopology,
    T: ScalarValue,
{
    pub fn new(config: FtrConfig) -> Self {
        Self {
            config,
            mesh: None,
            scalars: None,
            offsets: None,
        }
    }

    /// Attach a mesh. Its adjacency caches must already be built.
    pub fn setup_mesh(&mut self, mesh: &'a M) -> &mut Self {
        self.mesh = Some(mesh);
        self
    }

    pub fn set_scalars(&mut self, values: &'a [T]) -> &mut Self {
        self.scalars = Some(values);
        self
    }

    /// Tie-breaking offsets, one per vertex.
    pub fn set_offsets(&mut self, offsets: &'a [usize]) -> &mut Self {
        self.offsets = Some(offsets);
        self
    }

    pub fn set_thread_number(&mut self, threads: usize) -> &mut Self {
        self.config.threads = threads;
        self
    }

    pub fn set_debug_level(&mut self, level: u8) -> &mut Self {
        self.config.debug_level = level;
        self
    }

    pub fn set_direction(&mut self, direction: SweepDirection) -> &mut Self {
        self.config.direction = direction;
        self
    }

    pub fn config(&self) -> &FtrConfig {
        &self.config
    }

    pub fn build(&self) -> Result<ReebGraph, FtrError> {
        self.build_with_stats().map(|(graph, _)| graph)
    }

    /// Build the graph and report sweep counters.
    pub fn build_with_stats(&self) -> Result<(ReebGraph, SweepStats), FtrError> {
        let mesh = self.mesh.ok_or(FtrError::MissingMesh)?;
        if !mesh.is_preprocessed() {
            return Err(FtrError::MeshNotPreprocessed);
        }
        let values = self.scalars.ok_or(FtrError::MissingScalars)?;
        let offsets = self.offsets.ok_or(FtrError::MissingOffsets)?;
        let n = mesh.num_vertices();
        if values.len() != n {
            return Err(FtrError::ScalarCountMismatch {
                expected: n,
                found: values.len(),
            });
        }
        if offsets.len() != n {
            return Err(FtrError::OffsetCountMismatch {
                expected: n,
                found: offsets.len(),
            });
        }
        validate_mesh(mesh)?;

        let verbose = self.config.verbose(1);
        if verbose {
            log::info!(
                "setup: {} vertices, {} edges, {} triangles, {} sweep",
                n,
                mesh.num_edges(),
                mesh.num_triangles(),
                match self.config.direction {
                    SweepDirection::Ascending => "ascending",
                    SweepDirection::Descending => "descending",
                }
            );
        }

        let start = Instant::now();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .build()
            .map_err(|e| FtrError::ThreadPool(e.to_string()))?;

        let (ctx, seeds) = pool.install(|| -> Result<_, FtrError> {
            let scalars = Scalars::new(values, offsets)?;
            let ctx = SweepContext::new(mesh, scalars, self.config.clone());
            let seeds = ctx.find_seeds();
            if verbose {
                log::info!(
                    "{} seeds found on {} threads",
                    seeds.len(),
                    rayon::current_num_threads()
                );
            }
            rayon::scope(|s| ctx.sweep(s, &seeds));
            Ok((ctx, seeds.len()))
        })?;

        let (graph, stats) = ctx.finish(seeds, start.elapsed())?;
        if verbose {
            log::info!(
                "sweep done in {:?}: {} propagations, {} merges, {} splits, {} parkings",
                stats.elapsed,
                stats.propagations,
                stats.merges,
                stats.splits,
                stats.parkings
            );
            log::info!(
                "graph: {} nodes, {} arcs, {} loops",
                graph.num_nodes(),
                graph.num_arcs(),
                graph.num_loops()
            );
        }
        Ok((graph, stats))
    }
}

/// Cross-check the adjacency a mesh reports before sizing the sweep on it.
fn validate_mesh<M: MeshTopology>(mesh: &M) -> Result<(), FtrError> {
    let n = mesh.num_vertices();
    let num_edges = mesh.num_edges();
    for e in 0..num_edges {
        let [a, b] = mesh.edge_vertices(e);
        if a >= n || b >= n || a == b {
            return Err(FtrError::InvalidMesh(format!(
                "edge {e} has invalid endpoints ({a}, {b})"
            )));
        }
    }
    for t in 0..mesh.num_triangles() {
        let verts = mesh.triangle_vertices(t);
        for e in mesh.triangle_edges(t) {
            if e >= num_edges {
                return Err(FtrError::ForestCapacity {
                    required: e,
                    available: num_edges,
                });
            }
            let [a, b] = mesh.edge_vertices(e);
            if !verts.contains(&a) || !verts.contains(&b) {
                return Err(FtrError::InvalidMesh(format!(
                    "edge {e} ({a}, {b}) is not a side of triangle {t} {verts:?}"
                )));
            }
        }
    }
    let num_triangles = mesh.num_triangles();
    for v in 0..n {
        if let Some(&e) = mesh.vertex_edges(v).iter().find(|&&e| e >= num_edges) {
            return Err(FtrError::ForestCapacity {
                required: e,
                available: num_edges,
            });
        }
        if let Some(&t) = mesh.vertex_triangles(v).iter().find(|&&t| t >= num_triangles) {
            return Err(FtrError::InvalidMesh(format!(
                "vertex {v} lists triangle {t} of {num_triangles}"
            )));
        }
    }
    for e in 0..num_edges {
        if let Some(&t) = mesh.edge_triangles(e).iter().find(|&&t| t >= num_triangles) {
            return Err(FtrError::InvalidMesh(format!(
                "edge {e} lists triangle {t} of {num_triangles}"
            )));
        }
    }
    let fins = (0..num_edges)
        .filter(|&e| mesh.edge_triangles(e).len() > 2)
        .count();
    if fins > 0 {
        log::warn!("{fins} edges are shared by more than two triangles; the sweep may not complete");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::mesh::TriangleMesh;
    use crate::topology::scalars::identity_offsets;

    fn triangle() -> TriangleMesh {
        let mut mesh = TriangleMesh::new(3, vec![[0, 1, 2]]).unwrap();
        mesh.preprocess();
        mesh
    }

    #[test]
    fn single_triangle_is_one_arc() {
        let mesh = triangle();
        let values = [0.0f32, 1.0, 2.0];
        let offsets = identity_offsets(3);
        let mut ftr = FtrGraph::new(FtrConfig::default().with_threads(1));
        ftr.setup_mesh(&mesh).set_scalars(&values).set_offsets(&offsets);
        let (graph, stats) = ftr.build_with_stats().unwrap();
        assert_eq!(graph.num_nodes(), 2);
        assert_eq!(graph.num_arcs(), 1);
        assert_eq!(graph.arcs()[0].vertices, vec![1]);
        assert_eq!(stats.seeds, 1);
        assert_eq!(stats.propagations, 1);
        assert_eq!(stats.splits, 0);
    }

    #[test]
    fn isolated_vertex_is_a_lone_node() {
        let mut mesh = TriangleMesh::new(4, vec![[0, 1, 2]]).unwrap();
        mesh.preprocess();
        let values = [0.0, 1.0, 2.0, -5.0];
        let offsets = identity_offsets(4);
        let mut ftr = FtrGraph::new(FtrConfig::default());
        ftr.setup_mesh(&mesh).set_scalars(&values).set_offsets(&offsets);
        let graph = ftr.build().unwrap();
        assert_eq!(graph.num_nodes(), 3);
        assert_eq!(graph.num_components(), 2);
        let lone = graph.vertex_node(3).unwrap();
        assert_eq!(graph.node(lone).kind, crate::graph::NodeKind::Minimum);
        assert_eq!(graph.up_degree(lone), 0);
    }

    #[test]
    fn highest_debug_level_builds_without_a_logger() {
        let mesh = triangle();
        let values = [2.0, 0.0, 1.0];
        let offsets = identity_offsets(3);
        let mut ftr = FtrGraph::new(FtrConfig::default().with_debug_level(4));
        ftr.setup_mesh(&mesh).set_scalars(&values).set_offsets(&offsets);
        let graph = ftr.build().unwrap();
        assert_eq!(graph.num_arcs(), 1);
        assert_eq!(graph.arcs()[0].vertices, vec![2]);
    }

    #[test]
    fn setters_override_config() {
        let mut ftr: FtrGraph<'_, TriangleMesh, f64> = FtrGraph::new(FtrConfig::default());
        ftr.set_thread_number(3)
            .set_debug_level(2)
            .set_direction(SweepDirection::Descending);
        assert_eq!(ftr.config().threads, 3);
        assert_eq!(ftr.config().debug_level, 2);
        assert_eq!(ftr.config().direction, SweepDirection::Descending);
    }

    #[test]
    fn preconditions_are_checked_in_order() {
        let mesh = triangle();
        let values = [0.0, 1.0];
        let offsets = identity_offsets(3);

        let mut ftr: FtrGraph<'_, TriangleMesh, f64> = FtrGraph::new(FtrConfig::default());
        assert_eq!(ftr.build().unwrap_err(), FtrError::MissingMesh);
        ftr.setup_mesh(&mesh);
        assert_eq!(ftr.build().unwrap_err(), FtrError::MissingScalars);
        ftr.set_scalars(&values);
        assert_eq!(ftr.build().unwrap_err(), FtrError::MissingOffsets);
        ftr.set_offsets(&offsets);
        assert_eq!(
            ftr.build().unwrap_err(),
            FtrError::ScalarCountMismatch {
                expected: 3,
                found: 2
            }
        );
    }
}
