//! Triangle-mesh adjacency used by the sweep.
//!
//! The sweep only ever asks local questions: the star of a vertex, the edges
//! of a triangle, the triangles around an edge. [`MeshTopology`] captures
//! that contract; [`TriangleMesh`] answers it from CSR caches built once by
//! [`TriangleMesh::preprocess`].

use crate::ftr_error::FtrError;
use hashbrown::{HashMap, HashSet};

pub type VertexId = usize;
pub type EdgeId = usize;
pub type TriangleId = usize;

/// Adjacency queries consumed by the sweep.
///
/// Star queries (`vertex_edges`, `vertex_triangles`, `edge_triangles`) are
/// only meaningful once [`is_preprocessed`](Self::is_preprocessed) returns
/// `true`.
pub trait MeshTopology: Sync {
    fn num_vertices(&self) -> usize;
    fn num_edges(&self) -> usize;
    fn num_triangles(&self) -> usize;

    /// `true` once the star caches are available.
    fn is_preprocessed(&self) -> bool;

    /// Endpoints of an edge, lower index first.
    fn edge_vertices(&self, e: EdgeId) -> [VertexId; 2];
    fn triangle_vertices(&self, t: TriangleId) -> [VertexId; 3];
    fn triangle_edges(&self, t: TriangleId) -> [EdgeId; 3];

    /// Edges incident to `v`.
    fn vertex_edges(&self, v: VertexId) -> &[EdgeId];
    /// Triangles incident to `v`.
    fn vertex_triangles(&self, v: VertexId) -> &[TriangleId];
    /// Triangles incident to `e`.
    fn edge_triangles(&self, e: EdgeId) -> &[TriangleId];

    /// Endpoint of `e` that is not `v`.
    #[inline]
    fn edge_other_vertex(&self, e: EdgeId, v: VertexId) -> VertexId {
        let [a, b] = self.edge_vertices(e);
        if a == v { b } else { a }
    }
}

/// Compressed row storage: row `i` is `adjncy[xadj[i]..xadj[i + 1]]`.
#[derive(Debug, Clone, Default)]
struct Csr {
    xadj: Vec<usize>,
    adjncy: Vec<usize>,
}

impl Csr {
    fn build(rows: usize, pairs: impl Iterator<Item = (usize, usize)> + Clone) -> Self {
        let mut xadj = vec![0usize; rows + 1];
        for (row, _) in pairs.clone() {
            xadj[row + 1] += 1;
        }
        for i in 0..rows {
            xadj[i + 1] += xadj[i];
        }
        let mut fill = xadj.clone();
        let mut adjncy = vec![0usize; xadj[rows]];
        for (row, col) in pairs {
            adjncy[fill[row]] = col;
            fill[row] += 1;
        }
        Self { xadj, adjncy }
    }

    #[inline]
    fn row(&self, i: usize) -> &[usize] {
        match (self.xadj.get(i), self.xadj.get(i + 1)) {
            (Some(&s), Some(&e)) => &self.adjncy[s..e],
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Default)]
struct StarCaches {
    vertex_edges: Csr,
    vertex_triangles: Csr,
    edge_triangles: Csr,
}

/// Indexed triangle soup with derived edges and optional star caches.
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    num_vertices: usize,
    triangles: Vec<[VertexId; 3]>,
    edges: Vec<[VertexId; 2]>,
    triangle_edges: Vec<[EdgeId; 3]>,
    caches: Option<StarCaches>,
}

impl TriangleMesh {
    /// Build a mesh from `num_vertices` vertices and a triangle list.
    ///
    /// Edges are numbered in order of first appearance. Triangles with an
    /// out-of-range or repeated vertex, and duplicated triangles, are
    /// rejected.
    pub fn new(num_vertices: usize, triangles: Vec<[VertexId; 3]>) -> Result<Self, FtrError> {
        let mut seen = HashSet::with_capacity(triangles.len());
        let mut edge_ids: HashMap<[VertexId; 2], EdgeId> = HashMap::new();
        let mut edges = Vec::new();
        let mut triangle_edges = Vec::with_capacity(triangles.len());

        for (t, tri) in triangles.iter().enumerate() {
            if let Some(&v) = tri.iter().find(|&&v| v >= num_vertices) {
                return Err(FtrError::InvalidMesh(format!(
                    "triangle {t} references vertex {v} but the mesh has {num_vertices} vertices"
                )));
            }
            let [a, b, c] = *tri;
            if a == b || b == c || a == c {
                return Err(FtrError::InvalidMesh(format!(
                    "triangle {t} is degenerate: {tri:?}"
                )));
            }
            let mut key = *tri;
            key.sort_unstable();
            if !seen.insert(key) {
                return Err(FtrError::InvalidMesh(format!(
                    "triangle {t} duplicates vertices {key:?}"
                )));
            }

            let mut ids = [0; 3];
            for (slot, (p, q)) in [(a, b), (b, c), (a, c)].into_iter().enumerate() {
                let key = [p.min(q), p.max(q)];
                ids[slot] = *edge_ids.entry(key).or_insert_with(|| {
                    edges.push(key);
                    edges.len() - 1
                });
            }
            triangle_edges.push(ids);
        }

        Ok(Self {
            num_vertices,
            triangles,
            edges,
            triangle_edges,
            caches: None,
        })
    }

    /// Build the vertex-star and edge-triangle caches. Idempotent.
    pub fn preprocess(&mut self) {
        if self.caches.is_some() {
            return;
        }
        let vertex_edges = Csr::build(
            self.num_vertices,
            self.edges
                .iter()
                .enumerate()
                .flat_map(|(e, &[a, b])| [(a, e), (b, e)]),
        );
        let vertex_triangles = Csr::build(
            self.num_vertices,
            self.triangles
                .iter()
                .enumerate()
                .flat_map(|(t, tri)| tri.map(|v| (v, t))),
        );
        let edge_triangles = Csr::build(
            self.edges.len(),
            self.triangle_edges
                .iter()
                .enumerate()
                .flat_map(|(t, tri)| tri.map(|e| (e, t))),
        );
        self.caches = Some(StarCaches {
            vertex_edges,
            vertex_triangles,
            edge_triangles,
        });
    }

    /// Edges shared by more than two triangles.
    pub fn non_manifold_edges(&self) -> Vec<EdgeId> {
        let count = self.edge_degrees();
        (0..self.edges.len()).filter(|&e| count[e] > 2).collect()
    }

    /// Number of edges with exactly one incident triangle.
    pub fn num_boundary_edges(&self) -> usize {
        self.edge_degrees().iter().filter(|&&c| c == 1).count()
    }

    fn edge_degrees(&self) -> Vec<u32> {
        let mut count = vec![0u32; self.edges.len()];
        for &e in self.triangle_edges.iter().flatten() {
            count[e] += 1;
        }
        count
    }

    /// Euler characteristic `V - E + T`.
    pub fn euler_characteristic(&self) -> i64 {
        self.num_vertices as i64 - self.edges.len() as i64 + self.triangles.len() as i64
    }

    pub fn triangles(&self) -> &[[VertexId; 3]] {
        &self.triangles
    }

    pub fn edges(&self) -> &[[VertexId; 2]] {
        &self.edges
    }
}

impl MeshTopology for TriangleMesh {
    #[inline]
    fn num_vertices(&self) -> usize {
        self.num_vertices
    }

    #[inline]
    fn num_edges(&self) -> usize {
        self.edges.len()
    }

    #[inline]
    fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    #[inline]
    fn is_preprocessed(&self) -> bool {
        self.caches.is_some()
    }

    #[inline]
    fn edge_vertices(&self, e: EdgeId) -> [VertexId; 2] {
        self.edges[e]
    }

    #[inline]
    fn triangle_vertices(&self, t: TriangleId) -> [VertexId; 3] {
        self.triangles[t]
    }

    #[inline]
    fn triangle_edges(&self, t: TriangleId) -> [EdgeId; 3] {
        self.triangle_edges[t]
    }

    fn vertex_edges(&self, v: VertexId) -> &[EdgeId] {
        match &self.caches {
            Some(c) => c.vertex_edges.row(v),
            None => &[],
        }
    }

    fn vertex_triangles(&self, v: VertexId) -> &[TriangleId] {
        match &self.caches {
            Some(c) => c.vertex_triangles.row(v),
            None => &[],
        }
    }

    fn edge_triangles(&self, e: EdgeId) -> &[TriangleId] {
        match &self.caches {
            Some(c) => c.edge_triangles.row(e),
            None => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> TriangleMesh {
        // 3---2
        // | / |
        // 0---1
        let mut mesh = TriangleMesh::new(4, vec![[0, 1, 2], [0, 2, 3]]).unwrap();
        mesh.preprocess();
        mesh
    }

    #[test]
    fn edges_are_shared_between_triangles() {
        let mesh = square();
        assert_eq!(mesh.num_edges(), 5);
        let diag = mesh.edges().iter().position(|&e| e == [0, 2]).unwrap();
        assert_eq!(mesh.edge_triangles(diag), &[0, 1]);
        assert_eq!(mesh.num_boundary_edges(), 4);
        assert_eq!(mesh.euler_characteristic(), 1);
        assert!(mesh.non_manifold_edges().is_empty());
    }

    #[test]
    fn star_queries_after_preprocess() {
        let mesh = square();
        assert_eq!(mesh.vertex_edges(0).len(), 3);
        assert_eq!(mesh.vertex_edges(1).len(), 2);
        assert_eq!(mesh.vertex_triangles(2), &[0, 1]);
        for e in mesh.vertex_edges(0).iter().copied() {
            let other = mesh.edge_other_vertex(e, 0);
            assert_ne!(other, 0);
            assert!(mesh.edge_vertices(e).contains(&0));
        }
        for t in 0..mesh.num_triangles() {
            let verts = mesh.triangle_vertices(t);
            for e in mesh.triangle_edges(t) {
                let [a, b] = mesh.edge_vertices(e);
                assert!(verts.contains(&a) && verts.contains(&b));
            }
        }
    }

    #[test]
    fn star_is_empty_before_preprocess() {
        let mut mesh = TriangleMesh::new(3, vec![[0, 1, 2]]).unwrap();
        assert!(!mesh.is_preprocessed());
        assert!(mesh.vertex_edges(0).is_empty());
        mesh.preprocess();
        mesh.preprocess();
        assert!(mesh.is_preprocessed());
        assert_eq!(mesh.vertex_edges(0).len(), 2);
    }

    #[test]
    fn rejects_malformed_triangles() {
        assert!(matches!(
            TriangleMesh::new(3, vec![[0, 1, 3]]),
            Err(FtrError::InvalidMesh(_))
        ));
        assert!(matches!(
            TriangleMesh::new(3, vec![[0, 1, 1]]),
            Err(FtrError::InvalidMesh(_))
        ));
        assert!(matches!(
            TriangleMesh::new(3, vec![[0, 1, 2], [2, 0, 1]]),
            Err(FtrError::InvalidMesh(_))
        ));
    }

    #[test]
    fn detects_non_manifold_fins() {
        let mesh = TriangleMesh::new(5, vec![[0, 1, 2], [0, 1, 3], [0, 1, 4]]).unwrap();
        assert_eq!(mesh.non_manifold_edges(), vec![0]);
    }

    #[test]
    fn isolated_vertices_have_empty_stars() {
        let mut mesh = TriangleMesh::new(4, vec![[0, 1, 2]]).unwrap();
        mesh.preprocess();
        assert!(mesh.vertex_edges(3).is_empty());
        assert!(mesh.vertex_triangles(3).is_empty());
    }
}
