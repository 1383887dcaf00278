//! Basic triangulated surface generators: plates, plates with holes, tori
//! and spheres. Every generator returns a preprocessed mesh with vertex
//! coordinates, ready for a sweep.

use crate::ftr_error::FtrError;
use crate::topology::mesh::{TriangleMesh, VertexId};

/// A generated mesh with one coordinate triple per vertex.
#[derive(Debug, Clone)]
pub struct GeneratedMesh {
    pub mesh: TriangleMesh,
    pub coords: Vec<[f64; 3]>,
}

fn invalid_geometry(message: impl Into<String>) -> FtrError {
    FtrError::InvalidMesh(message.into())
}

fn build_mesh(coords: Vec<[f64; 3]>, triangles: Vec<[VertexId; 3]>) -> Result<GeneratedMesh, FtrError> {
    let mut mesh = TriangleMesh::new(coords.len(), triangles)?;
    mesh.preprocess();
    Ok(GeneratedMesh { mesh, coords })
}

/// Sample `f` at every vertex.
pub fn height_field<F>(coords: &[[f64; 3]], f: F) -> Vec<f64>
where
    F: Fn([f64; 3]) -> f64,
{
    coords.iter().map(|&p| f(p)).collect()
}

/// Structured plate over `[0, nx] x [0, ny]` with two triangles per cell.
pub fn grid(nx: usize, ny: usize) -> Result<GeneratedMesh, FtrError> {
    grid_with_holes(nx, ny, &[])
}

/// Structured plate with rectangular holes.
///
/// Each hole `[i0, j0, i1, j1]` removes the cells `i0 <= i < i1`,
/// `j0 <= j < j1`. Vertices left without a triangle are dropped and the
/// remaining ones renumbered in row-major order.
pub fn grid_with_holes(
    nx: usize,
    ny: usize,
    holes: &[[usize; 4]],
) -> Result<GeneratedMesh, FtrError> {
    if nx == 0 || ny == 0 {
        return Err(invalid_geometry("nx and ny must be positive"));
    }
    for hole in holes {
        let [i0, j0, i1, j1] = *hole;
        if i0 >= i1 || j0 >= j1 || i1 > nx || j1 > ny {
            return Err(invalid_geometry(format!(
                "hole {hole:?} is empty or exceeds the {nx}x{ny} grid"
            )));
        }
    }
    let in_hole = |i: usize, j: usize| {
        holes
            .iter()
            .any(|&[i0, j0, i1, j1]| (i0..i1).contains(&i) && (j0..j1).contains(&j))
    };

    let row_stride = nx + 1;
    let mut cells = Vec::with_capacity(2 * nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            if in_hole(i, j) {
                continue;
            }
            let v0 = j * row_stride + i;
            let v1 = v0 + 1;
            let v3 = v0 + row_stride;
            let v2 = v3 + 1;
            cells.push([v0, v1, v2]);
            cells.push([v0, v2, v3]);
        }
    }

    let mut used = vec![false; row_stride * (ny + 1)];
    for &v in cells.iter().flatten() {
        used[v] = true;
    }
    let mut remap = vec![usize::MAX; used.len()];
    let mut coords = Vec::new();
    for j in 0..=ny {
        for i in 0..=nx {
            let v = j * row_stride + i;
            if used[v] {
                remap[v] = coords.len();
                coords.push([i as f64, j as f64, 0.0]);
            }
        }
    }
    let triangles = cells.into_iter().map(|c| c.map(|v| remap[v])).collect();
    build_mesh(coords, triangles)
}

/// Torus around the z axis: `nu` divisions along the major circle, `nv`
/// around the tube.
pub fn torus(nu: usize, nv: usize, major: f64, minor: f64) -> Result<GeneratedMesh, FtrError> {
    if nu < 3 || nv < 3 {
        return Err(invalid_geometry("torus requires nu >= 3 and nv >= 3"));
    }
    if minor <= 0.0 || major <= minor {
        return Err(invalid_geometry("torus requires 0 < minor < major"));
    }

    let two_pi = std::f64::consts::TAU;
    let mut coords = Vec::with_capacity(nu * nv);
    for i in 0..nu {
        let u = two_pi * (i as f64) / (nu as f64);
        for j in 0..nv {
            let v = two_pi * (j as f64) / (nv as f64);
            let ring = major + minor * v.cos();
            coords.push([ring * u.cos(), ring * u.sin(), minor * v.sin()]);
        }
    }

    let id = |i: usize, j: usize| (i % nu) * nv + (j % nv);
    let mut triangles = Vec::with_capacity(2 * nu * nv);
    for i in 0..nu {
        for j in 0..nv {
            let a = id(i, j);
            let b = id(i + 1, j);
            let c = id(i + 1, j + 1);
            let d = id(i, j + 1);
            triangles.push([a, b, c]);
            triangles.push([a, c, d]);
        }
    }
    build_mesh(coords, triangles)
}

/// Triangulated sphere with `n_lat` latitude bands and `n_lon` meridians.
pub fn sphere(radius: f64, n_lat: usize, n_lon: usize) -> Result<GeneratedMesh, FtrError> {
    if radius <= 0.0 {
        return Err(invalid_geometry("radius must be positive"));
    }
    if n_lat < 2 || n_lon < 3 {
        return Err(invalid_geometry("sphere requires n_lat >= 2 and n_lon >= 3"));
    }

    let mut coords = vec![[0.0, 0.0, radius]];
    let mut rings: Vec<Vec<usize>> = Vec::with_capacity(n_lat - 1);
    let two_pi = std::f64::consts::TAU;
    for lat in 1..n_lat {
        let theta = std::f64::consts::PI * (lat as f64) / (n_lat as f64);
        let (sin_t, cos_t) = theta.sin_cos();
        let mut ring = Vec::with_capacity(n_lon);
        for lon in 0..n_lon {
            let phi = two_pi * (lon as f64) / (n_lon as f64);
            ring.push(coords.len());
            coords.push([
                radius * sin_t * phi.cos(),
                radius * sin_t * phi.sin(),
                radius * cos_t,
            ]);
        }
        rings.push(ring);
    }
    let bottom = coords.len();
    coords.push([0.0, 0.0, -radius]);

    let mut triangles = Vec::new();
    if let (Some(first), Some(last)) = (rings.first(), rings.last()) {
        for lon in 0..n_lon {
            let next = (lon + 1) % n_lon;
            triangles.push([0, first[lon], first[next]]);
            triangles.push([last[lon], bottom, last[next]]);
        }
    }
    for band in rings.windows(2) {
        let (ring_a, ring_b) = (&band[0], &band[1]);
        for lon in 0..n_lon {
            let next = (lon + 1) % n_lon;
            triangles.push([ring_a[lon], ring_b[lon], ring_b[next]]);
            triangles.push([ring_a[lon], ring_b[next], ring_a[next]]);
        }
    }
    build_mesh(coords, triangles)
}
