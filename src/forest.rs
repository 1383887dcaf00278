//! Dynamic ST-forest tracking the connectivity of the preimage graph.
//!
//! Every preimage node owns one slot of a fixed arena. A slot stores an
//! optional parent index, the weight of the link to that parent, the number
//! of direct children and, on roots, the Reeb-graph arc of the component.
//! Operations walk parent links and cost O(depth); no balancing is done.
//!
//! Link weights are *removal times*: a link is dropped when the sweep reaches
//! the vertex whose rank is its weight. [`DynamicForest::insert_edge`] keeps
//! a maximum spanning forest with respect to those weights, so removing a
//! tree link never needs a replacement search.
//!
//! Each slot sits behind its own lock and no operation holds two locks at
//! once. Concurrent callers must work on disjoint trees; the locks only make
//! that sharing sound.

use crate::debug_invariants::{DebugInvariants, ensure};
use crate::ftr_error::FtrError;
use crate::topology::ids::ArcId;
use itertools::Itertools;
use parking_lot::Mutex;
use std::fmt;

/// Snapshot of one forest slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForestNode<W> {
    parent: Option<usize>,
    weight: W,
    child_count: usize,
    arc: Option<ArcId>,
}

impl<W: Copy + Default> Default for ForestNode<W> {
    fn default() -> Self {
        Self {
            parent: None,
            weight: W::default(),
            child_count: 0,
            arc: None,
        }
    }
}

impl<W: Copy> ForestNode<W> {
    #[inline]
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    /// Weight of the link to the parent. Roots keep the weight of the last
    /// link they hung from.
    #[inline]
    pub fn weight(&self) -> W {
        self.weight
    }

    #[inline]
    pub fn child_count(&self) -> usize {
        self.child_count
    }

    #[inline]
    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }

    /// Arc stored on this node (only meaningful on roots).
    #[inline]
    pub fn arc(&self) -> Option<ArcId> {
        self.arc
    }
}

/// Arena-backed forest of parent-pointer trees.
#[derive(Debug)]
pub struct DynamicForest<W> {
    nodes: Vec<Mutex<ForestNode<W>>>,
}

impl<W> DynamicForest<W>
where
    W: Copy + Ord + Default,
{
    /// Allocate `len` isolated nodes.
    pub fn new(len: usize) -> Self {
        let mut nodes = Vec::with_capacity(len);
        nodes.resize_with(len, || Mutex::new(ForestNode::default()));
        Self { nodes }
    }

    /// Number of slots in the arena.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Copy of the slot `n`.
    #[inline]
    pub fn node(&self, n: usize) -> ForestNode<W> {
        *self.nodes[n].lock()
    }

    #[inline]
    pub fn has_parent(&self, n: usize) -> bool {
        self.nodes[n].lock().parent.is_some()
    }

    /// `true` if `n` has neither a parent nor children.
    pub fn is_disconnected(&self, n: usize) -> bool {
        let node = self.nodes[n].lock();
        node.parent.is_none() && node.child_count == 0
    }

    /// Number of nodes currently hanging from a parent.
    pub fn num_links(&self) -> usize {
        self.nodes.iter().filter(|n| n.lock().parent.is_some()).count()
    }

    #[inline]
    fn parent_of(&self, n: usize) -> Option<usize> {
        self.nodes[n].lock().parent
    }

    /// Representative of `n`'s tree.
    pub fn find_root(&self, n: usize) -> usize {
        let mut cur = n;
        while let Some(p) = self.parent_of(cur) {
            cur = p;
        }
        cur
    }

    /// Sorted, de-duplicated roots of a set of nodes.
    pub fn find_roots<I>(&self, nodes: I) -> Vec<usize>
    where
        I: IntoIterator<Item = usize>,
    {
        nodes
            .into_iter()
            .map(|n| self.find_root(n))
            .sorted_unstable()
            .dedup()
            .collect()
    }

    /// Number of distinct components among `nodes`.
    pub fn nb_cc<I>(&self, nodes: I) -> usize
    where
        I: IntoIterator<Item = usize>,
    {
        self.find_roots(nodes).len()
    }

    /// Walk from `n` to its root and return `(root, lightest)`, where
    /// `lightest` is the non-root node of minimum link weight on the path.
    /// Ties keep the node closest to `n`; if `n` is a root, `lightest == n`.
    pub fn find_min_weight_root(&self, n: usize) -> (usize, usize) {
        let mut cur = n;
        let mut lightest = n;
        let mut lightest_weight: Option<W> = None;
        loop {
            let node = self.node(cur);
            match node.parent {
                None => return (cur, lightest),
                Some(p) => {
                    if lightest_weight.is_none_or(|w| node.weight < w) {
                        lightest = cur;
                        lightest_weight = Some(node.weight);
                    }
                    cur = p;
                }
            }
        }
    }

    /// Make `n` the root of its tree by reversing the path to the old root.
    /// Link weights move with their links and the subtree arc moves to `n`.
    pub fn evert(&self, n: usize) {
        if !self.has_parent(n) {
            return;
        }
        let mut cur = n;
        let mut new_parent: Option<usize> = None;
        let mut carried = W::default();
        let old_root = loop {
            let mut node = self.nodes[cur].lock();
            let old_parent = node.parent;
            let old_weight = node.weight;
            node.parent = new_parent;
            if new_parent.is_some() {
                node.weight = carried;
            }
            match old_parent {
                None => break cur,
                Some(p) => {
                    new_parent = Some(cur);
                    carried = old_weight;
                    cur = p;
                }
            }
        };

        let arc = {
            let mut root = self.nodes[old_root].lock();
            root.child_count -= 1;
            root.arc.take()
        };
        let mut head = self.nodes[n].lock();
        head.child_count += 1;
        head.arc = arc;
    }

    fn link(&self, child: usize, parent: usize, weight: W) {
        {
            let mut node = self.nodes[child].lock();
            debug_assert!(node.parent.is_none(), "linking a non-root node {child}");
            node.parent = Some(parent);
            node.weight = weight;
            node.arc = None;
        }
        self.nodes[parent].lock().child_count += 1;
    }

    /// `true` if the tree rooted at `r1` should hang below the one at `r2`:
    /// the root with the smaller `(weight, index)` becomes the child.
    fn hangs_below(&self, r1: usize, r2: usize) -> bool {
        (self.node(r1).weight, r1) < (self.node(r2).weight, r2)
    }

    /// Link `n1` and `n2` with weight `w`.
    ///
    /// Returns `true` if two trees were merged. When both nodes already share
    /// a tree nothing merges; the lightest link on their path is swapped for
    /// the new one if it is lighter than `w`.
    pub fn insert_edge(&self, n1: usize, n2: usize, w: W) -> bool {
        if n1 == n2 {
            return false;
        }
        let r1 = self.find_root(n1);
        let r2 = self.find_root(n2);
        if r1 != r2 {
            let (child, parent) = if self.hangs_below(r1, r2) {
                (n1, n2)
            } else {
                (n2, n1)
            };
            self.evert(child);
            self.link(child, parent, w);
            return true;
        }

        self.evert(n1);
        let (_, lightest) = self.find_min_weight_root(n2);
        if self.node(lightest).weight < w {
            self.remove_edge(lightest);
            self.evert(n2);
            self.link(n2, n1, w);
        }
        false
    }

    /// Cut `n` from its parent. Returns `false` if `n` is a root.
    pub fn remove_edge(&self, n: usize) -> bool {
        let parent = {
            let mut node = self.nodes[n].lock();
            match node.parent.take() {
                Some(p) => p,
                None => return false,
            }
        };
        self.nodes[parent].lock().child_count -= 1;
        true
    }

    /// Remove the direct link between `n1` and `n2`, if there is one.
    pub fn remove_edge_between(&self, n1: usize, n2: usize) -> bool {
        if n1 == n2 {
            return false;
        }
        self.evert(n1);
        if self.parent_of(n2) == Some(n1) {
            self.remove_edge(n2)
        } else {
            false
        }
    }

    /// Attach `arc` to the component of `n`.
    pub fn set_subtree_arc(&self, n: usize, arc: ArcId) {
        let root = self.find_root(n);
        self.nodes[root].lock().arc = Some(arc);
    }

    /// Arc attached to the component of `n`.
    pub fn subtree_arc(&self, n: usize) -> Option<ArcId> {
        let root = self.find_root(n);
        self.nodes[root].lock().arc
    }
}

impl<W> DebugInvariants for DynamicForest<W>
where
    W: Copy + Ord + Default,
{
    fn validate_invariants(&self) -> Result<(), FtrError> {
        let len = self.len();
        let snapshot: Vec<ForestNode<W>> = (0..len).map(|n| self.node(n)).collect();
        let mut children = vec![0usize; len];
        for (n, node) in snapshot.iter().enumerate() {
            if let Some(p) = node.parent {
                ensure(p < len, || format!("node {n} has out-of-range parent {p}"))?;
                ensure(p != n, || format!("node {n} is its own parent"))?;
                ensure(node.arc.is_none(), || format!("non-root node {n} carries an arc"))?;
                children[p] += 1;
            }
        }
        for (n, node) in snapshot.iter().enumerate() {
            ensure(node.child_count == children[n], || {
                format!(
                    "node {n} counts {} children but has {}",
                    node.child_count, children[n]
                )
            })?;
            // any walk longer than the arena revisits a node
            let mut cur = n;
            let mut steps = 0;
            while let Some(p) = snapshot[cur].parent {
                steps += 1;
                ensure(steps <= len, || format!("cycle through node {n}"))?;
                cur = p;
            }
        }
        Ok(())
    }
}

impl<W> fmt::Display for DynamicForest<W>
where
    W: Copy + Ord + Default + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for n in 0..self.len() {
            let node = self.node(n);
            match node.parent {
                Some(p) => writeln!(f, "{n} -> {p} ({:?})", node.weight)?,
                None if node.child_count > 0 || node.arc.is_some() => match node.arc {
                    Some(arc) => writeln!(f, "{n} root [{arc}]")?,
                    None => writeln!(f, "{n} root")?,
                },
                None => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(forest: &DynamicForest<u32>, n: usize) -> Vec<usize> {
        let mut out = vec![n];
        let mut cur = n;
        while let Some(p) = forest.node(cur).parent() {
            out.push(p);
            cur = p;
        }
        out
    }

    #[test]
    fn new_nodes_are_isolated_roots() {
        let forest = DynamicForest::<u32>::new(4);
        assert_eq!(forest.len(), 4);
        for n in 0..4 {
            assert!(forest.is_disconnected(n));
            assert_eq!(forest.find_root(n), n);
        }
        assert_eq!(forest.nb_cc(0..4), 4);
        assert_eq!(forest.num_links(), 0);
    }

    #[test]
    fn insert_reports_merges_only_across_trees() {
        let forest = DynamicForest::<u32>::new(4);
        assert!(forest.insert_edge(0, 1, 5));
        assert!(forest.insert_edge(2, 3, 5));
        assert!(forest.insert_edge(1, 2, 7));
        assert_eq!(forest.nb_cc(0..4), 1);
        assert!(!forest.insert_edge(0, 3, 1));
        assert!(!forest.insert_edge(2, 2, 9));
        forest.validate_invariants().unwrap();
    }

    #[test]
    fn lighter_root_hangs_below() {
        let forest = DynamicForest::<u32>::new(2);
        // both roots weigh 0: the smaller index becomes the child
        forest.insert_edge(1, 0, 3);
        assert_eq!(forest.node(0).parent(), Some(1));
        assert_eq!(forest.node(0).weight(), 3);
        assert_eq!(forest.node(1).child_count(), 1);
    }

    #[test]
    fn same_tree_insert_swaps_out_lighter_link() {
        let forest = DynamicForest::<u32>::new(3);
        forest.insert_edge(0, 1, 2);
        forest.insert_edge(1, 2, 8);
        // cycle 0-1-2-0: the link of weight 2 is the lightest and goes
        assert!(!forest.insert_edge(2, 0, 5));
        assert!(!forest.remove_edge_between(0, 1));
        assert!(forest.remove_edge_between(2, 0));
        assert_eq!(forest.nb_cc([0, 1, 2]), 2);
        assert_eq!(forest.find_root(1), forest.find_root(2));
        forest.validate_invariants().unwrap();
    }

    #[test]
    fn same_tree_insert_keeps_heavier_links() {
        let forest = DynamicForest::<u32>::new(3);
        forest.insert_edge(0, 1, 6);
        forest.insert_edge(1, 2, 8);
        assert!(!forest.insert_edge(2, 0, 5));
        assert!(!forest.remove_edge_between(2, 0));
        assert!(forest.remove_edge_between(0, 1));
        assert_eq!(forest.nb_cc([0, 1, 2]), 2);
    }

    #[test]
    fn remove_edge_on_root_is_noop() {
        let forest = DynamicForest::<u32>::new(3);
        forest.insert_edge(0, 1, 1);
        let root = forest.find_root(0);
        assert!(!forest.remove_edge(root));
        assert_eq!(forest.nb_cc([0, 1]), 1);
        let child = if root == 0 { 1 } else { 0 };
        assert!(forest.remove_edge(child));
        assert!(!forest.has_parent(child));
        assert_eq!(forest.nb_cc([0, 1]), 2);
    }

    #[test]
    fn remove_between_unlinked_nodes_fails() {
        let forest = DynamicForest::<u32>::new(4);
        forest.insert_edge(0, 1, 1);
        forest.insert_edge(1, 2, 1);
        // same tree but no direct link
        assert!(!forest.remove_edge_between(0, 2));
        // different trees
        assert!(!forest.remove_edge_between(0, 3));
        assert_eq!(forest.nb_cc(0..3), 1);
    }

    #[test]
    fn evert_reverses_path_and_moves_arc() {
        let forest = DynamicForest::<u32>::new(4);
        // build chain 0 -> 1 -> 2 -> 3 by hand-picked merges
        forest.insert_edge(3, 2, 30);
        forest.insert_edge(2, 1, 20);
        forest.insert_edge(1, 0, 10);
        let root = forest.find_root(0);
        forest.set_subtree_arc(0, ArcId::new(9));
        assert_eq!(forest.node(root).arc(), Some(ArcId::new(9)));

        let before: Vec<_> = (0..4).map(|n| forest.find_root(n)).collect();
        assert!(before.iter().all(|&r| r == root));

        forest.evert(0);
        assert_eq!(forest.find_root(3), 0);
        assert_eq!(forest.subtree_arc(3), Some(ArcId::new(9)));
        assert_eq!(forest.node(root).arc(), if root == 0 { Some(ArcId::new(9)) } else { None });
        forest.validate_invariants().unwrap();

        // link weights travel with their links
        let p = path(&forest, 3);
        assert_eq!(*p.last().unwrap(), 0);
        for pair in p.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let expected = (a.max(b) as u32) * 10;
            assert_eq!(forest.node(a).weight(), expected, "link {a}-{b}");
        }
    }

    #[test]
    fn min_weight_root_brute_force() {
        let forest = DynamicForest::<u32>::new(6);
        forest.insert_edge(0, 1, 7);
        forest.insert_edge(1, 2, 3);
        forest.insert_edge(2, 3, 9);
        forest.insert_edge(3, 4, 4);
        forest.insert_edge(5, 4, 6);
        for n in 0..6 {
            let (root, lightest) = forest.find_min_weight_root(n);
            let p = path(&forest, n);
            assert_eq!(root, *p.last().unwrap());
            if n == root {
                assert_eq!(lightest, n);
                continue;
            }
            let edges = &p[..p.len() - 1];
            assert!(edges.contains(&lightest));
            let w = forest.node(lightest).weight();
            assert!(edges.iter().all(|&m| forest.node(m).weight() >= w));
        }
    }

    #[test]
    fn subtree_arc_follows_root() {
        let forest = DynamicForest::<u32>::new(3);
        forest.insert_edge(0, 1, 1);
        forest.set_subtree_arc(1, ArcId::new(4));
        assert_eq!(forest.subtree_arc(0), Some(ArcId::new(4)));
        assert_eq!(forest.subtree_arc(2), None);
        forest.insert_edge(2, 0, 2);
        forest.set_subtree_arc(2, ArcId::new(5));
        assert!((0..3).all(|n| forest.subtree_arc(n) == Some(ArcId::new(5))));
    }

    #[test]
    fn display_lists_links() {
        let forest = DynamicForest::<u32>::new(3);
        forest.insert_edge(0, 1, 4);
        let text = forest.to_string();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("(4)"));
    }
}
