//! Per-vertex join coordination.
//!
//! Propagations reaching a vertex whose lower edges they do not all own
//! *arrive* at the vertex slot. The slot is a small state machine:
//!
//! ```text
//!   (empty) --arrive, not last--> Awaiting([p..]) --arrive, last--> Merged
//!      \_____________________arrive, last______________________/
//! ```
//!
//! The last arrival takes every parked propagation with it and goes on to
//! process the vertex; the others stop. Arrival, the completeness check and
//! the hand-over all happen under the slot's map entry lock.

use super::propagation::{Propagation, PropagationRegistry, PropagationStatus};
use crate::topology::ids::PropagationId;
use crate::topology::mesh::VertexId;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

#[derive(Debug)]
enum SaddleState {
    Awaiting(Vec<Propagation>),
    Merged,
}

/// Outcome of [`SaddleTable::arrive`].
#[derive(Debug)]
pub enum Arrival {
    /// The caller was the last expected arrival and gets its propagation
    /// back as `survivor`. `parked` were already unioned into its token and
    /// must be absorbed by it.
    Last {
        survivor: Propagation,
        parked: Vec<Propagation>,
    },
    /// The caller now waits in the slot; its task ends.
    Parked,
    /// Someone else already merged at this vertex; the propagation is handed
    /// back unchanged.
    AlreadyMerged(Propagation),
}

#[derive(Debug, Default)]
pub struct SaddleTable {
    slots: DashMap<VertexId, SaddleState>,
}

impl SaddleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arrive at `v` with `prop`.
    ///
    /// `check_last` receives the ids of every propagation present at `v`
    /// (the parked ones and `prop`) and decides whether nobody else is
    /// expected.
    pub fn arrive<F>(
        &self,
        v: VertexId,
        prop: Propagation,
        registry: &PropagationRegistry,
        check_last: F,
    ) -> Arrival
    where
        F: FnOnce(&[PropagationId]) -> bool,
    {
        match self.slots.entry(v) {
            Entry::Vacant(slot) => {
                if check_last(&[prop.id()]) {
                    slot.insert(SaddleState::Merged);
                    Arrival::Last {
                        survivor: prop,
                        parked: Vec::new(),
                    }
                } else {
                    registry.set_status(prop.id(), PropagationStatus::Parked(v));
                    slot.insert(SaddleState::Awaiting(vec![prop]));
                    Arrival::Parked
                }
            }
            Entry::Occupied(mut slot) => match slot.get_mut() {
                SaddleState::Merged => Arrival::AlreadyMerged(prop),
                SaddleState::Awaiting(waiting) => {
                    let arrived: Vec<PropagationId> = waiting
                        .iter()
                        .map(Propagation::id)
                        .chain(std::iter::once(prop.id()))
                        .collect();
                    if check_last(&arrived) {
                        let parked = std::mem::take(waiting);
                        for p in &parked {
                            registry.union_into(p.id(), prop.id());
                        }
                        slot.insert(SaddleState::Merged);
                        Arrival::Last {
                            survivor: prop,
                            parked,
                        }
                    } else {
                        registry.set_status(prop.id(), PropagationStatus::Parked(v));
                        waiting.push(prop);
                        Arrival::Parked
                    }
                }
            },
        }
    }

    /// Number of vertices with propagations still waiting.
    pub fn num_awaiting(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot.value(), SaddleState::Awaiting(w) if !w.is_empty()))
            .count()
    }

    /// Number of propagations still waiting, over all vertices.
    pub fn num_parked(&self) -> usize {
        self.slots
            .iter()
            .map(|slot| match slot.value() {
                SaddleState::Awaiting(w) => w.len(),
                SaddleState::Merged => 0,
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SweepDirection;

    fn prop(reg: &PropagationRegistry) -> Propagation {
        Propagation::new(reg.register(), SweepDirection::Ascending)
    }

    #[test]
    fn first_arrivals_park_last_one_merges() {
        let reg = PropagationRegistry::new();
        let table = SaddleTable::new();
        let (a, b, c) = (prop(&reg), prop(&reg), prop(&reg));
        let (ida, idb, idc) = (a.id(), b.id(), c.id());

        assert!(matches!(table.arrive(7, a, &reg, |ids| ids.len() == 3), Arrival::Parked));
        assert!(matches!(table.arrive(7, b, &reg, |ids| ids.len() == 3), Arrival::Parked));
        assert_eq!(reg.status(ida), PropagationStatus::Parked(7));
        assert_eq!(table.num_parked(), 2);
        assert_eq!(table.num_awaiting(), 1);

        match table.arrive(7, c, &reg, |ids| ids.len() == 3) {
            Arrival::Last { survivor, parked } => {
                assert_eq!(survivor.id(), idc);
                let ids: Vec<_> = parked.iter().map(Propagation::id).collect();
                assert_eq!(ids, vec![ida, idb]);
            }
            other => panic!("unexpected arrival {other:?}"),
        }
        assert_eq!(table.num_awaiting(), 0);
        assert_eq!(table.num_parked(), 0);
        assert_eq!(reg.find(ida), idc);
        assert_eq!(reg.status(idb), PropagationStatus::Merged(idc));
        assert!(reg.parked().is_empty());
    }

    #[test]
    fn lone_complete_arrival_merges_immediately() {
        let reg = PropagationRegistry::new();
        let table = SaddleTable::new();
        let a = prop(&reg);
        assert!(matches!(
            table.arrive(3, a, &reg, |_| true),
            Arrival::Last { parked, .. } if parked.is_empty()
        ));
        let b = prop(&reg);
        assert!(matches!(
            table.arrive(3, b, &reg, |_| unreachable!()),
            Arrival::AlreadyMerged(_)
        ));
    }

    #[test]
    fn late_arrival_gets_its_propagation_back() {
        let reg = PropagationRegistry::new();
        let table = SaddleTable::new();
        let a = prop(&reg);
        let b = prop(&reg);
        let idb = b.id();
        table.arrive(3, a, &reg, |_| true);
        match table.arrive(3, b, &reg, |_| unreachable!()) {
            Arrival::AlreadyMerged(p) => assert_eq!(p.id(), idb),
            other => panic!("unexpected arrival {other:?}"),
        }
        assert_eq!(reg.status(idb), PropagationStatus::Active);
    }
}
