//! Strong, zero-cost handles for Reeb-graph entities and propagations.
//!
//! Mesh entities (vertices, edges, triangles) are addressed by plain `usize`
//! indices, as the mesh caches are CSR arrays. Entities created *during* a
//! sweep are wrapped in newtypes so a node id cannot be passed where an arc
//! id is expected:
//! - [`NodeId`]: a critical point of the output graph.
//! - [`ArcId`]: an arc of the output graph.
//! - [`PropagationId`]: the ownership token of one local sweep.
//!
//! All three are `repr(transparent)` over `usize`.

use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $tag:literal) => {
        $(#[$meta])*
        #[derive(
            Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
        )]
        #[repr(transparent)]
        pub struct $name(usize);

        impl $name {
            /// Wraps a raw index.
            #[inline]
            pub const fn new(raw: usize) -> Self {
                Self(raw)
            }

            /// Returns the raw index.
            #[inline]
            pub const fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.0).finish()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($tag, "{}"), self.0)
            }
        }

        impl From<$name> for usize {
            #[inline]
            fn from(id: $name) -> usize {
                id.0
            }
        }
    };
}

define_id!(
    /// Identifier of a node (critical point) in the output Reeb graph.
    NodeId,
    "n"
);

define_id!(
    /// Identifier of an arc in the output Reeb graph.
    ArcId,
    "a"
);

define_id!(
    /// Ownership token shared by a propagation and the forest component it drives.
    PropagationId,
    "p"
);


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_and_index() {
        let n = NodeId::new(42);
        assert_eq!(n.index(), 42);
        assert_eq!(usize::from(n), 42);
    }

    #[test]
    fn debug_and_display() {
        assert_eq!(format!("{:?}", ArcId::new(7)), "ArcId(7)");
        assert_eq!(format!("{}", ArcId::new(7)), "a7");
        assert_eq!(format!("{}", NodeId::new(3)), "n3");
        assert_eq!(format!("{}", PropagationId::new(0)), "p0");
    }

    #[test]
    fn ordering_and_hash() {
        let a = PropagationId::new(1);
        let b = PropagationId::new(2);
        assert!(a < b);
        let set: std::collections::HashSet<_> = [a, b, a].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn json_roundtrip() {
        let n = NodeId::new(123);
        let s = serde_json::to_string(&n).unwrap();
        assert_eq!(s, "123");
        let back: NodeId = serde_json::from_str(&s).unwrap();
        assert_eq!(back, n);
    }
}
