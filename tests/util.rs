#![allow(dead_code)]
use ftr_graph::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Scheduling-independent view of a Reeb graph, keyed by mesh vertices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub nodes: Vec<(VertexId, NodeKind)>,
    pub arcs: Vec<(VertexId, VertexId)>,
    /// Regular vertex -> (down, up) vertices of its arc.
    pub segments: Vec<(VertexId, (VertexId, VertexId))>,
}

pub fn summarize(graph: &ReebGraph) -> Summary {
    let ends = |arc: &ReebArc| (graph.node(arc.down).vertex, graph.node(arc.up).vertex);
    let mut nodes: Vec<_> = graph.nodes().iter().map(|n| (n.vertex, n.kind)).collect();
    nodes.sort_unstable();
    let mut arcs: Vec<_> = graph.arcs().iter().map(ends).collect();
    arcs.sort_unstable();
    let mut segments: Vec<_> = graph
        .arcs()
        .iter()
        .flat_map(|arc| arc.vertices.iter().map(move |&v| (v, ends(arc))))
        .collect();
    segments.sort_unstable();
    Summary {
        nodes,
        arcs,
        segments,
    }
}

/// Label every crossing edge (exactly one endpoint processed) with its
/// component in the preimage graph, by plain BFS over crossed triangles.
fn preimage_components<M: MeshTopology>(mesh: &M, processed: &[bool]) -> Vec<Option<usize>> {
    let crossing = |e: EdgeId| {
        let [a, b] = mesh.edge_vertices(e);
        processed[a] != processed[b]
    };
    let mut label = vec![None; mesh.num_edges()];
    let mut next = 0;
    for start in 0..mesh.num_edges() {
        if label[start].is_some() || !crossing(start) {
            continue;
        }
        label[start] = Some(next);
        let mut queue = VecDeque::from([start]);
        while let Some(e) = queue.pop_front() {
            for &t in mesh.edge_triangles(e) {
                for f in mesh.triangle_edges(t) {
                    if label[f].is_none() && crossing(f) {
                        label[f] = Some(next);
                        queue.push_back(f);
                    }
                }
            }
        }
        next += 1;
    }
    label
}

/// Sequential Reeb graph: one global ascending sweep that recomputes the
/// preimage components from scratch at every vertex.
pub fn reference_summary<M: MeshTopology>(mesh: &M, values: &[f64], offsets: &[usize]) -> Summary {
    let scalars = Scalars::new(values, offsets).unwrap();
    let mut processed = vec![false; mesh.num_vertices()];
    let mut arc_of_edge: Vec<Option<usize>> = vec![None; mesh.num_edges()];
    let mut arcs: Vec<(VertexId, Option<VertexId>)> = Vec::new();
    let mut nodes = Vec::new();
    let mut regular: Vec<(VertexId, usize)> = Vec::new();

    for &v in scalars.sorted_vertices() {
        let (lower, upper): (Vec<EdgeId>, Vec<EdgeId>) = mesh
            .vertex_edges(v)
            .iter()
            .copied()
            .partition(|&e| scalars.is_lower(mesh.edge_other_vertex(e, v), v));

        let before = preimage_components(mesh, &processed);
        let lower_comps: BTreeSet<usize> = lower.iter().map(|&e| before[e].unwrap()).collect();
        let lower_arcs: BTreeSet<usize> = lower.iter().map(|&e| arc_of_edge[e].unwrap()).collect();

        processed[v] = true;
        let after = preimage_components(mesh, &processed);
        let upper_comps: BTreeSet<usize> = upper.iter().map(|&e| after[e].unwrap()).collect();

        let mut arc_of_comp: BTreeMap<usize, usize> = BTreeMap::new();
        match (lower_comps.len(), upper_comps.len()) {
            (1, 1) => {
                assert_eq!(lower_arcs.len(), 1);
                let arc = *lower_arcs.first().unwrap();
                regular.push((v, arc));
                arc_of_comp.insert(*upper_comps.first().unwrap(), arc);
            }
            (l, u) => {
                let kind = match (l, u) {
                    (0, _) => NodeKind::Minimum,
                    (_, 0) => NodeKind::Maximum,
                    (1, _) => NodeKind::SplitSaddle,
                    (_, 1) => NodeKind::JoinSaddle,
                    _ => NodeKind::Degenerate,
                };
                nodes.push((v, kind));
                for &a in &lower_arcs {
                    arcs[a].1 = Some(v);
                }
                for &c in &upper_comps {
                    arcs.push((v, None));
                    arc_of_comp.insert(c, arcs.len() - 1);
                }
            }
        }

        arc_of_edge = (0..mesh.num_edges())
            .map(|e| {
                after[e].map(|c| match arc_of_comp.get(&c) {
                    Some(&a) => a,
                    None => arc_of_edge[e].expect("persisting edge carries an arc"),
                })
            })
            .collect();
    }

    let ends: Vec<(VertexId, VertexId)> = arcs
        .iter()
        .map(|&(start, end)| (start, end.expect("reference arc left open")))
        .collect();
    let mut arc_list = ends.clone();
    arc_list.sort_unstable();
    nodes.sort_unstable();
    let mut segments: Vec<_> = regular.into_iter().map(|(v, a)| (v, ends[a])).collect();
    segments.sort_unstable();
    Summary {
        nodes,
        arcs: arc_list,
        segments,
    }
}

/// Build with the given direction and thread count.
pub fn build<M: MeshTopology>(
    mesh: &M,
    values: &[f64],
    direction: SweepDirection,
    threads: usize,
) -> (ReebGraph, SweepStats) {
    let offsets = identity_offsets(values.len());
    let config = FtrConfig::default()
        .with_direction(direction)
        .with_threads(threads);
    let mut ftr = FtrGraph::new(config);
    ftr.setup_mesh(mesh).set_scalars(values).set_offsets(&offsets);
    let (graph, stats) = ftr.build_with_stats().unwrap();
    graph.validate_invariants().unwrap();
    (graph, stats)
}

/// Assert that both sweep directions reproduce the reference graph.
pub fn assert_matches_reference<M: MeshTopology>(mesh: &M, values: &[f64]) -> ReebGraph {
    let offsets = identity_offsets(values.len());
    let expected = reference_summary(mesh, values, &offsets);
    let (ascending, _) = build(mesh, values, SweepDirection::Ascending, 4);
    assert_eq!(summarize(&ascending), expected, "ascending sweep");
    let (descending, _) = build(mesh, values, SweepDirection::Descending, 4);
    assert_eq!(summarize(&descending), expected, "descending sweep");
    assert_eq!(ascending, descending);
    ascending
}

/// Gaussian bumps `(cx, cy, height, width)` over a tilted plane.
pub fn terrain(coords: &[[f64; 3]], bumps: &[(f64, f64, f64, f64)]) -> Vec<f64> {
    height_field(coords, |[x, y, _]| {
        let hills: f64 = bumps
            .iter()
            .map(|&(cx, cy, h, w)| {
                let d2 = (x - cx).powi(2) + (y - cy).powi(2);
                h * (-d2 / (w * w)).exp()
            })
            .sum();
        hills + 0.013 * x + 0.007 * y
    })
}

/// Uniform random values in `[0, 1)`.
pub fn noise(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(0.0..1.0)).collect()
}
