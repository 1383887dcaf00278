//! Strict total order over mesh vertices.
//!
//! Vertices compare by scalar value, then by offset. Offsets are a
//! simulation-of-simplicity perturbation; the pair must be unique per vertex
//! or the order is rejected.

use crate::ftr_error::FtrError;
use crate::topology::mesh::VertexId;
use num_traits::ToPrimitive;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::fmt::Debug;

/// Numeric types usable as scalar field values.
pub trait ScalarValue: Copy + PartialOrd + Send + Sync + Debug + ToPrimitive {}

impl<T> ScalarValue for T where T: Copy + PartialOrd + Send + Sync + Debug + ToPrimitive {}

/// Offsets `0..n`: ties resolve by vertex index.
pub fn identity_offsets(n: usize) -> Vec<usize> {
    (0..n).collect()
}

/// Sorted view of a scalar field.
#[derive(Debug, Clone)]
pub struct Scalars<'a, T> {
    values: &'a [T],
    offsets: &'a [usize],
    /// `mirror[v]` is the rank of vertex `v`.
    mirror: Vec<usize>,
    /// `sorted[r]` is the vertex of rank `r`.
    sorted: Vec<VertexId>,
}

impl<'a, T: ScalarValue> Scalars<'a, T> {
    /// Validate and sort the field.
    pub fn new(values: &'a [T], offsets: &'a [usize]) -> Result<Self, FtrError> {
        if offsets.len() != values.len() {
            return Err(FtrError::OffsetCountMismatch {
                expected: values.len(),
                found: offsets.len(),
            });
        }
        if let Some(v) = values.iter().position(|x| x.partial_cmp(x).is_none()) {
            return Err(FtrError::IncomparableScalar(v));
        }

        let mut sorted: Vec<VertexId> = (0..values.len()).collect();
        sorted.par_sort_unstable_by(|&a, &b| compare(values, offsets, a, b));
        if let Some(w) = sorted
            .windows(2)
            .find(|w| compare(values, offsets, w[0], w[1]) == Ordering::Equal)
        {
            return Err(FtrError::AmbiguousOrder {
                a: w[0].min(w[1]),
                b: w[0].max(w[1]),
            });
        }

        let mut mirror = vec![0usize; values.len()];
        for (rank, &v) in sorted.iter().enumerate() {
            mirror[v] = rank;
        }
        Ok(Self {
            values,
            offsets,
            mirror,
            sorted,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn value(&self, v: VertexId) -> T {
        self.values[v]
    }

    #[inline]
    pub fn offset(&self, v: VertexId) -> usize {
        self.offsets[v]
    }

    /// Position of `v` in the ascending order.
    #[inline]
    pub fn rank(&self, v: VertexId) -> usize {
        self.mirror[v]
    }

    /// `true` if `a` comes strictly before `b`.
    #[inline]
    pub fn is_lower(&self, a: VertexId, b: VertexId) -> bool {
        self.mirror[a] < self.mirror[b]
    }

    /// Vertices in ascending order.
    #[inline]
    pub fn sorted_vertices(&self) -> &[VertexId] {
        &self.sorted
    }

    /// Value as `f64`, for diagnostics.
    pub fn value_f64(&self, v: VertexId) -> Option<f64> {
        self.values[v].to_f64()
    }
}

fn compare<T: ScalarValue>(values: &[T], offsets: &[usize], a: usize, b: usize) -> Ordering {
    // NaN was rejected up front
    values[a]
        .partial_cmp(&values[b])
        .unwrap_or(Ordering::Equal)
        .then_with(|| offsets[a].cmp(&offsets[b]))
}
