//! Output Reeb graph.
//!
//! A [`ReebGraph`] is produced by [`GraphBuilder::finish`] and is immutable.
//! Nodes are numbered by the rank of their vertex and every arc points from
//! its lower node (`down`) to its upper node (`up`), so two builds of the same
//! field compare equal regardless of scheduling.

pub mod builder;

pub use builder::GraphBuilder;

use crate::debug_invariants::{DebugInvariants, ensure};
use crate::ftr_error::FtrError;
use crate::topology::ids::{ArcId, NodeId};
use crate::topology::mesh::VertexId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a critical point with respect to the scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    Minimum,
    Maximum,
    /// Several components below merge into one above.
    JoinSaddle,
    /// One component below splits into several above.
    SplitSaddle,
    /// Several components on both sides.
    Degenerate,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Minimum => "minimum",
            NodeKind::Maximum => "maximum",
            NodeKind::JoinSaddle => "join saddle",
            NodeKind::SplitSaddle => "split saddle",
            NodeKind::Degenerate => "degenerate",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReebNode {
    pub vertex: VertexId,
    pub kind: NodeKind,
}

/// Arc between two critical points, with the regular vertices mapped on it
/// (in ascending scalar order) when segmentation is enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReebArc {
    pub down: NodeId,
    pub up: NodeId,
    pub vertices: Vec<VertexId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReebGraph {
    nodes: Vec<ReebNode>,
    arcs: Vec<ReebArc>,
    down_arcs: Vec<Vec<ArcId>>,
    up_arcs: Vec<Vec<ArcId>>,
    vertex_arc: Vec<Option<ArcId>>,
    vertex_node: Vec<Option<NodeId>>,
}

impl ReebGraph {
    /// Assemble a graph from canonical nodes and arcs; builds the adjacency
    /// lists and vertex maps.
    pub(crate) fn from_parts(nodes: Vec<ReebNode>, arcs: Vec<ReebArc>, num_vertices: usize) -> Self {
        let mut down_arcs = vec![Vec::new(); nodes.len()];
        let mut up_arcs = vec![Vec::new(); nodes.len()];
        let mut vertex_arc = vec![None; num_vertices];
        let mut vertex_node = vec![None; num_vertices];

        for (i, arc) in arcs.iter().enumerate() {
            let id = ArcId::new(i);
            up_arcs[arc.down.index()].push(id);
            down_arcs[arc.up.index()].push(id);
            for &v in &arc.vertices {
                vertex_arc[v] = Some(id);
            }
        }
        for (i, node) in nodes.iter().enumerate() {
            vertex_node[node.vertex] = Some(NodeId::new(i));
        }

        Self {
            nodes,
            arcs,
            down_arcs,
            up_arcs,
            vertex_arc,
            vertex_node,
        }
    }

    #[inline]
    pub fn nodes(&self) -> &[ReebNode] {
        &self.nodes
    }

    #[inline]
    pub fn arcs(&self) -> &[ReebArc] {
        &self.arcs
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &ReebNode {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn arc(&self, id: ArcId) -> &ReebArc {
        &self.arcs[id.index()]
    }

    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn num_arcs(&self) -> usize {
        self.arcs.len()
    }

    pub fn count_kind(&self, kind: NodeKind) -> usize {
        self.nodes.iter().filter(|n| n.kind == kind).count()
    }

    /// Arcs ending at `n` from below.
    pub fn down_arcs(&self, n: NodeId) -> &[ArcId] {
        &self.down_arcs[n.index()]
    }

    /// Arcs leaving `n` upwards.
    pub fn up_arcs(&self, n: NodeId) -> &[ArcId] {
        &self.up_arcs[n.index()]
    }

    pub fn down_degree(&self, n: NodeId) -> usize {
        self.down_arcs[n.index()].len()
    }

    pub fn up_degree(&self, n: NodeId) -> usize {
        self.up_arcs[n.index()].len()
    }

    /// Arc a regular vertex was mapped to (`None` for critical vertices or
    /// when segmentation is disabled).
    pub fn vertex_arc(&self, v: VertexId) -> Option<ArcId> {
        self.vertex_arc.get(v).copied().flatten()
    }

    /// Node of a critical vertex.
    pub fn vertex_node(&self, v: VertexId) -> Option<NodeId> {
        self.vertex_node.get(v).copied().flatten()
    }

    /// Number of connected components of the graph.
    pub fn num_components(&self) -> usize {
        let mut parent: Vec<usize> = (0..self.nodes.len()).collect();
        fn find(parent: &mut [usize], mut x: usize) -> usize {
            while parent[x] != x {
                parent[x] = parent[parent[x]];
                x = parent[x];
            }
            x
        }
        let mut components = self.nodes.len();
        for arc in &self.arcs {
            let a = find(&mut parent, arc.down.index());
            let b = find(&mut parent, arc.up.index());
            if a != b {
                parent[a] = b;
                components -= 1;
            }
        }
        components
    }

    /// First Betti number: independent cycles of the graph.
    pub fn num_loops(&self) -> usize {
        (self.arcs.len() + self.num_components()).saturating_sub(self.nodes.len())
    }

    /// `true` if the graph has no cycle (it is a contour tree per component).
    pub fn is_forest(&self) -> bool {
        self.num_loops() == 0
    }
}

impl DebugInvariants for ReebGraph {
    fn validate_invariants(&self) -> Result<(), FtrError> {
        let n = self.nodes.len();
        for (i, arc) in self.arcs.iter().enumerate() {
            ensure(arc.down.index() < n && arc.up.index() < n, || {
                format!("arc a{i} references a missing node")
            })?;
            ensure(arc.down < arc.up, || {
                format!("arc a{i} is not oriented upwards: {} -> {}", arc.down, arc.up)
            })?;
            for &v in &arc.vertices {
                ensure(self.vertex_arc(v) == Some(ArcId::new(i)), || {
                    format!("vertex {v} listed on a{i} maps elsewhere")
                })?;
                ensure(self.vertex_node(v).is_none(), || {
                    format!("critical vertex {v} is also listed on a{i}")
                })?;
            }
        }
        for (i, node) in self.nodes.iter().enumerate() {
            let id = NodeId::new(i);
            let (down, up) = (self.down_degree(id), self.up_degree(id));
            let consistent = match node.kind {
                NodeKind::Minimum => down == 0,
                NodeKind::Maximum => up == 0,
                NodeKind::JoinSaddle => down >= 2 && up == 1,
                NodeKind::SplitSaddle => down == 1 && up >= 2,
                NodeKind::Degenerate => down >= 2 && up >= 2,
            };
            ensure(consistent, || {
                format!(
                    "{id} at vertex {} is a {} with {down} arcs below and {up} above",
                    node.vertex, node.kind
                )
            })?;
        }
        Ok(())
    }
}

impl fmt::Display for ReebGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Reeb graph: {} nodes, {} arcs, {} loops",
            self.num_nodes(),
            self.num_arcs(),
            self.num_loops()
        )?;
        for (i, node) in self.nodes.iter().enumerate() {
            writeln!(f, "  n{i}: {} at vertex {}", node.kind, node.vertex)?;
        }
        for (i, arc) in self.arcs.iter().enumerate() {
            writeln!(
                f,
                "  a{i}: {} -> {} ({} regular vertices)",
                arc.down,
                arc.up,
                arc.vertices.len()
            )?;
        }
        Ok(())
    }
}
