//! Local sweeps and the registry tracking their fate.

use crate::config::SweepDirection;
use crate::topology::ids::PropagationId;
use crate::topology::mesh::VertexId;
use parking_lot::Mutex;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// One local sweep: a frontier of candidate vertices popped in sweep order.
///
/// The frontier may hold duplicates and vertices already processed by
/// someone else; the engine filters them when popping.
#[derive(Debug, Clone)]
pub struct Propagation {
    id: PropagationId,
    direction: SweepDirection,
    frontier: BinaryHeap<Reverse<(usize, VertexId)>>,
    steps: usize,
}

impl Propagation {
    pub fn new(id: PropagationId, direction: SweepDirection) -> Self {
        Self {
            id,
            direction,
            frontier: BinaryHeap::new(),
            steps: 0,
        }
    }

    #[inline]
    pub fn id(&self) -> PropagationId {
        self.id
    }

    #[inline]
    pub fn direction(&self) -> SweepDirection {
        self.direction
    }

    #[inline]
    fn key(&self, rank: usize) -> usize {
        match self.direction {
            SweepDirection::Ascending => rank,
            SweepDirection::Descending => usize::MAX - rank,
        }
    }

    /// Queue `v`, whose ascending rank is `rank`.
    pub fn push(&mut self, v: VertexId, rank: usize) {
        let key = self.key(rank);
        self.frontier.push(Reverse((key, v)));
    }

    /// Next vertex in sweep order.
    pub fn pop(&mut self) -> Option<VertexId> {
        let Reverse((_, v)) = self.frontier.pop()?;
        self.steps += 1;
        Some(v)
    }

    pub fn peek(&self) -> Option<VertexId> {
        self.frontier.peek().map(|Reverse((_, v))| *v)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frontier.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frontier.is_empty()
    }

    /// Take over the frontier of a propagation merged into this one.
    pub fn absorb(&mut self, mut other: Propagation) {
        debug_assert_eq!(self.direction, other.direction);
        if other.frontier.len() > self.frontier.len() {
            std::mem::swap(&mut self.frontier, &mut other.frontier);
        }
        self.frontier.append(&mut other.frontier);
        self.steps += other.steps;
    }

    /// Number of vertices popped so far, including absorbed propagations.
    #[inline]
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Drain the frontier, lowest sweep key first.
    pub(crate) fn drain_sorted(&mut self) -> impl Iterator<Item = VertexId> + '_ {
        std::iter::from_fn(move || self.frontier.pop().map(|Reverse((_, v))| v))
    }
}

/// Lifecycle of a propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropagationStatus {
    Active,
    /// Waiting at a saddle for the remaining incoming propagations.
    Parked(VertexId),
    /// Absorbed by another propagation at a saddle.
    Merged(PropagationId),
    /// Retired after spawning one child per upper component.
    Split,
    /// Its component vanished.
    Terminated,
}

#[derive(Debug, Default)]
struct RegistryInner {
    status: Vec<PropagationStatus>,
    parent: Vec<usize>,
}

impl RegistryInner {
    fn find(&mut self, id: usize) -> usize {
        let mut root = id;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = id;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }
}

/// Append-only record of every propagation created during a sweep.
///
/// Besides statuses it keeps a union-find over propagation ids: edges
/// tagged by an absorbed propagation resolve to the one that absorbed it.
#[derive(Debug, Default)]
pub struct PropagationRegistry {
    inner: Mutex<RegistryInner>,
}

impl PropagationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh active id.
    pub fn register(&self) -> PropagationId {
        let mut inner = self.inner.lock();
        let id = inner.status.len();
        inner.status.push(PropagationStatus::Active);
        inner.parent.push(id);
        PropagationId::new(id)
    }

    pub fn set_status(&self, id: PropagationId, status: PropagationStatus) {
        self.inner.lock().status[id.index()] = status;
    }

    pub fn status(&self, id: PropagationId) -> PropagationStatus {
        self.inner.lock().status[id.index()]
    }

    /// Redirect `absorbed` to `survivor` and mark it merged.
    pub fn union_into(&self, absorbed: PropagationId, survivor: PropagationId) {
        let mut inner = self.inner.lock();
        let a = inner.find(absorbed.index());
        let s = inner.find(survivor.index());
        if a != s {
            inner.parent[a] = s;
        }
        inner.status[absorbed.index()] = PropagationStatus::Merged(survivor);
    }

    /// Current owner of the token `id`.
    pub fn find(&self, id: PropagationId) -> PropagationId {
        PropagationId::new(self.inner.lock().find(id.index()))
    }

    /// Resolve several tokens under a single lock.
    pub fn find_many<I>(&self, ids: I) -> Vec<PropagationId>
    where
        I: IntoIterator<Item = PropagationId>,
    {
        let mut inner = self.inner.lock();
        ids.into_iter()
            .map(|id| PropagationId::new(inner.find(id.index())))
            .collect()
    }

    /// Number of propagations ever created.
    pub fn len(&self) -> usize {
        self.inner.lock().status.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of propagations whose status matches `pred`.
    pub fn count<P>(&self, pred: P) -> usize
    where
        P: Fn(&PropagationStatus) -> bool,
    {
        self.inner.lock().status.iter().filter(|s| pred(s)).count()
    }

    /// Propagations still parked, with the saddle they wait at.
    pub fn parked(&self) -> Vec<(PropagationId, VertexId)> {
        self.inner
            .lock()
            .status
            .iter()
            .enumerate()
            .filter_map(|(i, s)| match s {
                PropagationStatus::Parked(v) => Some((PropagationId::new(i), *v)),
                _ => None,
            })
            .collect()
    }
}
