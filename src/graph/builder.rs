//! Concurrent recorder of node and arc events emitted during a sweep.

use super::{NodeKind, ReebArc, ReebGraph, ReebNode};
use crate::ftr_error::FtrError;
use crate::topology::ids::{ArcId, NodeId};
use crate::topology::mesh::VertexId;
use itertools::Itertools;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

const UNASSIGNED: usize = usize::MAX;

#[derive(Debug, Clone, Copy)]
struct ArcRecord {
    start: NodeId,
    end: Option<NodeId>,
}

/// Thread-safe event sink turned into a [`ReebGraph`] by [`finish`](Self::finish).
///
/// Ids handed out during the sweep depend on scheduling; `finish` renumbers
/// everything canonically.
#[derive(Debug)]
pub struct GraphBuilder {
    nodes: Mutex<Vec<ReebNode>>,
    arcs: Mutex<Vec<ArcRecord>>,
    vertex_arc: Vec<AtomicUsize>,
    segmentation: bool,
}

impl GraphBuilder {
    pub fn new(num_vertices: usize, segmentation: bool) -> Self {
        Self {
            nodes: Mutex::new(Vec::new()),
            arcs: Mutex::new(Vec::new()),
            vertex_arc: (0..num_vertices)
                .map(|_| AtomicUsize::new(UNASSIGNED))
                .collect(),
            segmentation,
        }
    }

    pub fn make_node(&self, vertex: VertexId, kind: NodeKind) -> NodeId {
        let mut nodes = self.nodes.lock();
        nodes.push(ReebNode { vertex, kind });
        NodeId::new(nodes.len() - 1)
    }

    pub fn open_arc(&self, from: NodeId) -> ArcId {
        let mut arcs = self.arcs.lock();
        arcs.push(ArcRecord {
            start: from,
            end: None,
        });
        ArcId::new(arcs.len() - 1)
    }

    /// Close `arc` at node `at`. Closing an arc twice is an invariant error.
    pub fn close_arc(&self, arc: ArcId, at: NodeId) -> Result<(), FtrError> {
        let mut arcs = self.arcs.lock();
        let record = arcs
            .get_mut(arc.index())
            .ok_or_else(|| FtrError::Invariant(format!("closing unknown arc {arc}")))?;
        if let Some(end) = record.end {
            return Err(FtrError::Invariant(format!(
                "arc {arc} closed at {at} but already ends at {end}"
            )));
        }
        record.end = Some(at);
        Ok(())
    }

    /// Record regular vertex `v` on `arc` (no-op without segmentation).
    #[inline]
    pub fn assign_vertex(&self, v: VertexId, arc: ArcId) {
        if self.segmentation {
            self.vertex_arc[v].store(arc.index(), Ordering::Relaxed);
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.lock().len()
    }

    pub fn num_arcs(&self) -> usize {
        self.arcs.lock().len()
    }

    /// Canonicalize the recorded events.
    ///
    /// Nodes are renumbered by `rank` of their vertex, arcs point from the
    /// lower to the upper node and are sorted by `(down, up, first segment
    /// vertex rank)`.
    pub fn finish<R>(self, rank: R) -> Result<ReebGraph, FtrError>
    where
        R: Fn(VertexId) -> usize,
    {
        let nodes = self.nodes.into_inner();
        let records = self.arcs.into_inner();
        let num_vertices = self.vertex_arc.len();

        let order: Vec<usize> = (0..nodes.len())
            .sorted_by_key(|&i| rank(nodes[i].vertex))
            .collect();
        let mut new_node = vec![0usize; nodes.len()];
        for (new, &old) in order.iter().enumerate() {
            new_node[old] = new;
        }

        let mut segments: Vec<Vec<VertexId>> = vec![Vec::new(); records.len()];
        for (v, slot) in self.vertex_arc.into_iter().enumerate() {
            let arc = slot.into_inner();
            if arc != UNASSIGNED {
                segments
                    .get_mut(arc)
                    .ok_or_else(|| {
                        FtrError::Invariant(format!("vertex {v} mapped to unknown arc a{arc}"))
                    })?
                    .push(v);
            }
        }

        let mut arcs = Vec::with_capacity(records.len());
        for ((i, record), mut vertices) in records.iter().enumerate().zip(segments) {
            let end = record.end.ok_or_else(|| {
                FtrError::Invariant(format!(
                    "arc a{i} opened at vertex {} was never closed",
                    nodes[record.start.index()].vertex
                ))
            })?;
            let a = new_node[record.start.index()];
            let b = new_node[end.index()];
            vertices.sort_by_key(|&v| rank(v));
            arcs.push(ReebArc {
                down: NodeId::new(a.min(b)),
                up: NodeId::new(a.max(b)),
                vertices,
            });
        }
        arcs.sort_by_cached_key(|arc| (arc.down, arc.up, arc.vertices.first().map(|&v| rank(v))));

        let nodes = order.into_iter().map(|i| nodes[i]).collect();
        Ok(ReebGraph::from_parts(nodes, arcs, num_vertices))
    }
}
