//! Growth engine: drives propagations vertex by vertex.
//!
//! Every mesh edge is a node of the shared [`DynamicForest`]. An edge is in
//! the preimage while exactly one of its endpoints is processed; a triangle
//! with two such edges links them. Trees of the forest are the components of
//! the current level set, and each one is owned by exactly one propagation,
//! which is the only task mutating it.
//!
//! Ownership is recorded per edge: when a vertex is processed its upper
//! edges are tagged with the propagation's token. Tokens of absorbed
//! propagations resolve through the registry's union-find.

use super::propagation::{Propagation, PropagationRegistry, PropagationStatus};
use super::saddle::{Arrival, SaddleTable};
use super::split;
use crate::config::{FtrConfig, SweepDirection};
use crate::debug_invariants::DebugInvariants;
use crate::forest::DynamicForest;
use crate::ftr_error::FtrError;
use crate::graph::{GraphBuilder, NodeKind, ReebGraph};
use crate::topology::ids::{ArcId, PropagationId};
use crate::topology::mesh::{EdgeId, MeshTopology, TriangleId, VertexId};
use crate::topology::scalars::{ScalarValue, Scalars};
use itertools::Itertools;
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

pub(crate) const UNTAGGED: usize = usize::MAX;

/// Counters reported by a build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepStats {
    /// Extrema the sweep started from.
    pub seeds: usize,
    /// Propagations created, seeds and split children included.
    pub propagations: usize,
    /// Saddles where parked propagations were absorbed.
    pub merges: usize,
    /// Saddles where a propagation was split.
    pub splits: usize,
    /// Times a propagation parked at a saddle.
    pub parkings: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Default)]
struct Counters {
    merges: AtomicUsize,
    splits: AtomicUsize,
    parkings: AtomicUsize,
}

/// What the current propagation does after a vertex.
pub(crate) enum Step {
    Continue,
    /// The component vanished; the propagation is done.
    Vanished,
    /// The component split; the children carry on.
    Branched(Vec<Propagation>),
}

/// Shared state of one sweep.
pub(crate) struct SweepContext<'a, M, T> {
    pub(crate) mesh: &'a M,
    pub(crate) scalars: Scalars<'a, T>,
    pub(crate) config: FtrConfig,
    pub(crate) forest: DynamicForest<usize>,
    pub(crate) processed: Vec<AtomicBool>,
    pub(crate) edge_owner: Vec<AtomicUsize>,
    pub(crate) registry: PropagationRegistry,
    pub(crate) graph: GraphBuilder,
    saddles: SaddleTable,
    counters: Counters,
    failure: Mutex<Option<FtrError>>,
}

impl<'a, M, T> SweepContext<'a, M, T>
where
    M: MeshTopology,
    T: ScalarValue,
{
    pub(crate) fn new(mesh: &'a M, scalars: Scalars<'a, T>, config: FtrConfig) -> Self {
        let num_vertices = mesh.num_vertices();
        let num_edges = mesh.num_edges();
        Self {
            mesh,
            scalars,
            forest: DynamicForest::new(num_edges),
            processed: (0..num_vertices).map(|_| AtomicBool::new(false)).collect(),
            edge_owner: (0..num_edges).map(|_| AtomicUsize::new(UNTAGGED)).collect(),
            registry: PropagationRegistry::new(),
            graph: GraphBuilder::new(num_vertices, config.segmentation),
            saddles: SaddleTable::new(),
            counters: Counters::default(),
            failure: Mutex::new(None),
            config,
        }
    }

    #[inline]
    pub(crate) fn direction(&self) -> SweepDirection {
        self.config.direction
    }

    /// Position of `v` in the order the propagations sweep.
    #[inline]
    pub(crate) fn sweep_rank(&self, v: VertexId) -> usize {
        let rank = self.scalars.rank(v);
        match self.direction() {
            SweepDirection::Ascending => rank,
            SweepDirection::Descending => self.scalars.len() - 1 - rank,
        }
    }

    #[inline]
    fn is_before(&self, a: VertexId, b: VertexId) -> bool {
        self.sweep_rank(a) < self.sweep_rank(b)
    }

    #[inline]
    pub(crate) fn is_processed(&self, v: VertexId) -> bool {
        self.processed[v].load(Ordering::Acquire)
    }

    /// An edge is in the preimage while exactly one endpoint is processed.
    #[inline]
    pub(crate) fn is_crossing(&self, e: EdgeId) -> bool {
        let [a, b] = self.mesh.edge_vertices(e);
        self.is_processed(a) != self.is_processed(b)
    }

    #[inline]
    pub(crate) fn tag_edge(&self, e: EdgeId, owner: PropagationId) {
        self.edge_owner[e].store(owner.index(), Ordering::Release);
    }

    /// Vertices with no earlier neighbour in sweep order.
    pub(crate) fn find_seeds(&self) -> Vec<VertexId> {
        let mut seeds: Vec<VertexId> = (0..self.mesh.num_vertices())
            .into_par_iter()
            .filter(|&v| {
                self.mesh
                    .vertex_edges(v)
                    .iter()
                    .all(|&e| !self.is_before(self.mesh.edge_other_vertex(e, v), v))
            })
            .collect();
        seeds.sort_unstable_by_key(|&v| self.sweep_rank(v));
        seeds
    }

    /// Run every propagation to completion on the calling pool.
    pub(crate) fn sweep<'s>(&'s self, scope: &rayon::Scope<'s>, seeds: &[VertexId]) {
        for &seed in seeds {
            let mut prop = Propagation::new(self.registry.register(), self.direction());
            prop.push(seed, self.scalars.rank(seed));
            scope.spawn(move |s| self.grow(s, prop));
        }
    }

    /// Star edges of `v` split into (lower, upper) in sweep order.
    pub(crate) fn visit_star(&self, v: VertexId) -> (Vec<EdgeId>, Vec<EdgeId>) {
        self.mesh
            .vertex_edges(v)
            .iter()
            .copied()
            .partition(|&e| self.is_before(self.mesh.edge_other_vertex(e, v), v))
    }

    /// Resolved owners of `edges`, or `None` if one is still untagged.
    fn owners(&self, edges: &[EdgeId]) -> Option<Vec<PropagationId>> {
        let tags: Vec<PropagationId> = edges
            .iter()
            .map(|&e| match self.edge_owner[e].load(Ordering::Acquire) {
                UNTAGGED => None,
                tag => Some(PropagationId::new(tag)),
            })
            .collect::<Option<_>>()?;
        Some(self.registry.find_many(tags))
    }

    /// Every lower edge of the vertex exists and is owned by an arrival.
    fn check_last(&self, lower: &[EdgeId], arrived: &[PropagationId]) -> bool {
        let Some(owners) = self.owners(lower) else {
            return false;
        };
        let arrived = self.registry.find_many(arrived.iter().copied());
        owners.iter().all(|o| arrived.contains(o))
    }

    fn record_failure(&self, err: FtrError) {
        let mut failure = self.failure.lock();
        if failure.is_none() {
            log::error!("sweep aborted: {err}");
            *failure = Some(err);
        }
    }

    fn has_failed(&self) -> bool {
        self.failure.lock().is_some()
    }

    /// Main loop of one propagation task.
    pub(crate) fn grow<'s>(&'s self, scope: &rayon::Scope<'s>, mut prop: Propagation) {
        loop {
            if self.has_failed() {
                return;
            }
            let Some(v) = prop.pop() else {
                log::warn!("{} ran out of vertices without its component vanishing", prop.id());
                self.registry.set_status(prop.id(), PropagationStatus::Terminated);
                return;
            };
            if self.is_processed(v) {
                continue;
            }
            let (lower, upper) = self.visit_star(v);

            let owned = self
                .owners(&lower)
                .is_some_and(|owners| owners.iter().all(|&o| o == prop.id()));
            if !owned {
                let id = prop.id();
                match self.saddles.arrive(v, prop, &self.registry, |arrived| {
                    self.check_last(&lower, arrived)
                }) {
                    Arrival::Parked => {
                        self.counters.parkings.fetch_add(1, Ordering::Relaxed);
                        if self.config.verbose(3) {
                            log::trace!("{id} parks at vertex {v}");
                        }
                        return;
                    }
                    Arrival::AlreadyMerged(p) => {
                        prop = p;
                        continue;
                    }
                    Arrival::Last { survivor, parked } => {
                        if !parked.is_empty() {
                            self.counters.merges.fetch_add(1, Ordering::Relaxed);
                            if self.config.verbose(3) {
                                log::trace!(
                                    "{id} absorbs {} at vertex {v}",
                                    parked.iter().map(Propagation::id).join(", ")
                                );
                            }
                        }
                        prop = survivor;
                        for p in parked {
                            prop.absorb(p);
                        }
                    }
                }
            }

            if self.processed[v].swap(true, Ordering::AcqRel) {
                continue;
            }
            match self.process_vertex(v, &mut prop, &lower, &upper) {
                Ok(Step::Continue) => {}
                Ok(Step::Vanished) => return,
                Ok(Step::Branched(children)) => {
                    for child in children {
                        scope.spawn(move |s| self.grow(s, child));
                    }
                    return;
                }
                Err(err) => {
                    self.record_failure(err);
                    return;
                }
            }
        }
    }

    /// Update the forest around `v` and emit graph events.
    pub(crate) fn process_vertex(
        &self,
        v: VertexId,
        prop: &mut Propagation,
        lower: &[EdgeId],
        upper: &[EdgeId],
    ) -> Result<Step, FtrError> {
        let lower_roots = self.forest.find_roots(lower.iter().copied());
        let lower_arcs: Vec<ArcId> = lower_roots
            .iter()
            .map(|&r| {
                self.forest.subtree_arc(r).ok_or_else(|| {
                    FtrError::Invariant(format!(
                        "component of edge {r} reaches vertex {v} without an arc"
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .sorted_unstable()
            .dedup()
            .collect();

        self.update_preimage(v)?;

        for &e in upper {
            self.tag_edge(e, prop.id());
            let w = self.mesh.edge_other_vertex(e, v);
            prop.push(w, self.scalars.rank(w));
        }
        let upper_roots = self.forest.find_roots(upper.iter().copied());

        if self.config.verbose(4) && log::log_enabled!(log::Level::Trace) {
            log::trace!("forest after vertex {v}:\n{}", self.forest);
        }

        match (lower_roots.len(), upper_roots.len()) {
            (1, 1) => {
                let arc = lower_arcs[0];
                self.graph.assign_vertex(v, arc);
                self.forest.set_subtree_arc(upper_roots[0], arc);
                Ok(Step::Continue)
            }
            (l, u) => {
                let kind = classify(l, u, self.direction());
                let node = self.graph.make_node(v, kind);
                for &arc in &lower_arcs {
                    self.graph.close_arc(arc, node)?;
                }
                if self.config.verbose(2) {
                    log::debug!(
                        "{} at vertex {v} ({l} in, {u} out) by {}",
                        kind,
                        prop.id()
                    );
                }
                match u {
                    0 => {
                        self.registry
                            .set_status(prop.id(), PropagationStatus::Terminated);
                        let left = prop.drain_sorted().filter(|&w| !self.is_processed(w)).count();
                        if left > 0 {
                            log::warn!(
                                "{} vanished at vertex {v} with {left} unprocessed vertices queued",
                                prop.id()
                            );
                        }
                        if self.config.verbose(3) {
                            log::trace!("{} ends at vertex {v} after {} steps", prop.id(), prop.steps());
                        }
                        Ok(Step::Vanished)
                    }
                    1 => {
                        let arc = self.graph.open_arc(node);
                        self.forest.set_subtree_arc(upper_roots[0], arc);
                        Ok(Step::Continue)
                    }
                    _ => {
                        self.counters.splits.fetch_add(1, Ordering::Relaxed);
                        let children = split::split_propagation(self, node, prop, &upper_roots, upper)?;
                        Ok(Step::Branched(children))
                    }
                }
            }
        }
    }

    /// Edge of triangle `t` joining `a` and `b`.
    fn triangle_edge(&self, t: TriangleId, a: VertexId, b: VertexId) -> Result<EdgeId, FtrError> {
        self.mesh
            .triangle_edges(t)
            .into_iter()
            .find(|&e| {
                let [p, q] = self.mesh.edge_vertices(e);
                (p == a && q == b) || (p == b && q == a)
            })
            .ok_or_else(|| {
                FtrError::Invariant(format!("triangle {t} has no edge between {a} and {b}"))
            })
    }

    /// Apply the preimage change of every triangle around `v`.
    ///
    /// With the triangle's vertices `x < y < z` in sweep order, the level
    /// crosses `xy, xz` between `x` and `y`, then `xz, yz` until `z`. Links
    /// weigh the sweep rank at which they disappear.
    pub(crate) fn update_preimage(&self, v: VertexId) -> Result<(), FtrError> {
        for &t in self.mesh.vertex_triangles(v) {
            let mut tri = self.mesh.triangle_vertices(t);
            tri.sort_unstable_by_key(|&u| self.sweep_rank(u));
            let [x, y, z] = tri;
            if v == x {
                let xy = self.triangle_edge(t, x, y)?;
                let xz = self.triangle_edge(t, x, z)?;
                self.forest.insert_edge(xy, xz, self.sweep_rank(y));
            } else if v == y {
                let xy = self.triangle_edge(t, x, y)?;
                let xz = self.triangle_edge(t, x, z)?;
                let yz = self.triangle_edge(t, y, z)?;
                // the link may already have been replaced by a heavier one
                self.forest.remove_edge_between(xy, xz);
                self.forest.insert_edge(xz, yz, self.sweep_rank(z));
            } else {
                let xz = self.triangle_edge(t, x, z)?;
                let yz = self.triangle_edge(t, y, z)?;
                self.forest.remove_edge_between(xz, yz);
            }
        }
        Ok(())
    }

    /// Check the end state and canonicalize the graph.
    pub(crate) fn finish(self, seeds: usize, elapsed: Duration) -> Result<(ReebGraph, SweepStats), FtrError> {
        if let Some(err) = self.failure.into_inner() {
            return Err(err);
        }
        let unprocessed = self.processed.iter().filter(|p| !p.load(Ordering::Acquire)).count();
        let parked = self.saddles.num_parked();
        if unprocessed > 0 || parked > 0 {
            if self.config.verbose(1) {
                log::info!(
                    "{} saddles still waiting for arrivals",
                    self.saddles.num_awaiting()
                );
                for (id, v) in self.registry.parked() {
                    log::info!("{id} still parked at vertex {v}");
                }
            }
            return Err(FtrError::IncompleteSweep {
                unprocessed,
                parked,
            });
        }
        self.forest.debug_assert_invariants();
        crate::debug_invariants!(
            crate::debug_invariants::ensure(self.forest.num_links() == 0, || {
                format!("{} preimage links survive the sweep", self.forest.num_links())
            }),
            "sweep end"
        );

        let stats = SweepStats {
            seeds,
            propagations: self.registry.len(),
            merges: self.counters.merges.into_inner(),
            splits: self.counters.splits.into_inner(),
            parkings: self.counters.parkings.into_inner(),
            elapsed,
        };
        let scalars = self.scalars;
        let graph = self.graph.finish(|v| scalars.rank(v))?;
        graph.debug_assert_invariants();
        Ok((graph, stats))
    }
}

/// Node kind of a critical vertex with `lower` components entering it and
/// `upper` leaving it, in sweep order.
pub(crate) fn classify(lower: usize, upper: usize, direction: SweepDirection) -> NodeKind {
    let ascending = direction == SweepDirection::Ascending;
    match (lower, upper) {
        (0, _) if ascending => NodeKind::Minimum,
        (0, _) => NodeKind::Maximum,
        (_, 0) if ascending => NodeKind::Maximum,
        (_, 0) => NodeKind::Minimum,
        (1, _) if ascending => NodeKind::SplitSaddle,
        (1, _) => NodeKind::JoinSaddle,
        (_, 1) if ascending => NodeKind::JoinSaddle,
        (_, 1) => NodeKind::SplitSaddle,
        _ => NodeKind::Degenerate,
    }
}
