//! Splitting a propagation at a vertex with several upper components.
//!
//! The parent is retired. Each upper component gets a child propagation and
//! a fresh arc from the saddle node. A breadth-first scan over crossing edges
//! and the triangles joining them hands the component's edges to the child
//! and rebuilds its frontier from their unprocessed endpoints.

use super::growth::SweepContext;
use super::propagation::{Propagation, PropagationStatus};
use crate::ftr_error::FtrError;
use crate::topology::ids::NodeId;
use crate::topology::mesh::{EdgeId, MeshTopology};
use crate::topology::scalars::ScalarValue;
use hashbrown::HashSet;
use itertools::Itertools;
use std::collections::VecDeque;

pub(crate) fn split_propagation<M, T>(
    ctx: &SweepContext<'_, M, T>,
    node: NodeId,
    parent: &Propagation,
    upper_roots: &[EdgeId],
    upper: &[EdgeId],
) -> Result<Vec<Propagation>, FtrError>
where
    M: MeshTopology,
    T: ScalarValue,
{
    ctx.registry.set_status(parent.id(), PropagationStatus::Split);

    let groups = upper
        .iter()
        .map(|&e| (ctx.forest.find_root(e), e))
        .sorted_unstable()
        .chunk_by(|&(root, _)| root);

    let mut visited: HashSet<EdgeId> = HashSet::new();
    let mut children = Vec::with_capacity(upper_roots.len());
    for (root, group) in &groups {
        let mut child = Propagation::new(ctx.registry.register(), parent.direction());
        let arc = ctx.graph.open_arc(node);
        ctx.forest.set_subtree_arc(root, arc);

        let mut queue: VecDeque<EdgeId> = VecDeque::new();
        for (_, e) in group {
            if visited.insert(e) {
                queue.push_back(e);
            }
        }
        if queue.is_empty() {
            return Err(FtrError::Invariant(format!(
                "upper component of edge {root} was already claimed by a sibling"
            )));
        }
        while let Some(e) = queue.pop_front() {
            ctx.tag_edge(e, child.id());
            let [a, b] = ctx.mesh.edge_vertices(e);
            let ahead = if ctx.is_processed(a) { b } else { a };
            child.push(ahead, ctx.scalars.rank(ahead));
            for &t in ctx.mesh.edge_triangles(e) {
                for f in ctx.mesh.triangle_edges(t) {
                    if f != e && ctx.is_crossing(f) && visited.insert(f) {
                        queue.push_back(f);
                    }
                }
            }
        }
        children.push(child);
    }

    if children.len() != upper_roots.len() {
        return Err(FtrError::Invariant(format!(
            "split of {} produced {} children for {} components",
            parent.id(),
            children.len(),
            upper_roots.len()
        )));
    }
    if ctx.config.verbose(3) {
        log::trace!(
            "{} splits into {}",
            parent.id(),
            children.iter().map(Propagation::id).join(", ")
        );
    }
    Ok(children)
}
