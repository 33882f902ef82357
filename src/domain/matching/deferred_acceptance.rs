//! Deferred-acceptance negotiation of one batch.
//!
//! Every request proposes to its shortest feasible hospital. Each hospital
//! keeps the proposer with the highest cost (earliest in the batch on ties)
//! and rejects the others, who then propose elsewhere in the next round.
//! Rejections live in the negotiation, never in the requests, so a request
//! that goes back to the queue keeps its original durations.
//!
//! In the first round a contended hospital whose losers still have patience
//! aborts the whole batch: patient losers are deferred to the next slot and
//! everybody else is retried at the head of the queue.

use serde::Serialize;

use crate::domain::hospital::hospital::{HOSPITAL_COUNT, HospitalId};
use crate::domain::hospital::hospital_pool::HospitalPool;
use crate::domain::queue::admission_queue::BATCH_CAPACITY;
use crate::domain::request::request::Request;
use crate::domain::request::request_store::{RequestId, RequestStore};
use crate::domain::utils::units::{SlotIndex, SlotSpan};
use crate::error::{Error, Result};

/// A request finalized at a hospital.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Assignment {
    #[serde(skip)]
    pub request: RequestId,
    pub hospital: HospitalId,
    pub duration: SlotSpan,
    pub cost: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NegotiationOutcome {
    /// Every remaining proposer holds a hospital of its own.
    Converged {
        assignments: Vec<Assignment>,
        /// Requests that ran out of feasible hospitals; they go back to the tail untouched.
        unplaced: Vec<RequestId>,
        rounds: u32,
    },
    /// First-round contention with patient losers. Availability is shared by the
    /// whole batch, so nobody can be unplaced in a round that aborts.
    Aborted {
        contested: HospitalId,
        /// Losers at the contested hospital; they pass this slot and lose one unit of patience.
        deferred: Vec<RequestId>,
        /// Remaining batch members, retried at the head of the queue in batch order.
        retried: Vec<RequestId>,
    },
}

type WaitingLists = [Vec<usize>; HOSPITAL_COUNT];

struct Negotiation<'a> {
    slot: SlotIndex,
    batch: &'a [RequestId],
    requests: Vec<&'a Request>,
    pool: &'a HospitalPool,

    /// `infeasible[i][h]`: batch member `i` was rejected by hospital `h` in an earlier round.
    infeasible: Vec<[bool; HOSPITAL_COUNT]>,
    active: Vec<bool>,
    unplaced: Vec<RequestId>,
}

/// Negotiates one batch against the current hospital availability.
///
/// The caller applies the outcome: occupy hospitals and record delays for
/// `Converged`, requeue for `Aborted`. The store and the pool are not modified.
pub fn negotiate(slot: SlotIndex, batch: &[RequestId], store: &RequestStore, pool: &HospitalPool) -> Result<NegotiationOutcome> {
    Negotiation::new(slot, batch, store, pool)?.run()
}

/// Upper bound on rounds for a batch of `len` requests. Every round that neither
/// converges nor aborts adds at least one rejection, and a request can be
/// rejected at most once per hospital.
pub fn max_rounds(len: usize) -> u32 {
    (len * HOSPITAL_COUNT) as u32 + 1
}

impl<'a> Negotiation<'a> {
    fn new(slot: SlotIndex, batch: &'a [RequestId], store: &'a RequestStore, pool: &'a HospitalPool) -> Result<Self> {
        if batch.len() > BATCH_CAPACITY {
            return Err(Error::invariant(slot, 0, None, format!("batch of {} requests exceeds capacity {}", batch.len(), BATCH_CAPACITY)));
        }

        let mut requests = Vec::with_capacity(batch.len());
        for key in batch {
            let request = store.get(*key).ok_or_else(|| Error::invariant(slot, 0, Some(*key), "batch member missing from request store"))?;
            requests.push(request);
        }

        Ok(Negotiation {
            slot,
            batch,
            requests,
            pool,
            infeasible: vec![[false; HOSPITAL_COUNT]; batch.len()],
            active: vec![true; batch.len()],
            unplaced: Vec::new(),
        })
    }

    fn run(mut self) -> Result<NegotiationOutcome> {
        let bound = max_rounds(self.batch.len());
        let mut round: u32 = 1;

        loop {
            if round > bound {
                return Err(Error::invariant(self.slot, round, self.batch.first().copied(), format!("negotiation did not settle within {} rounds", bound)));
            }

            tracing::trace!(slot = self.slot, round, "negotiation round");

            let lists = self.propose(round);
            let winners = self.reject_losers(&lists, round);

            if round == 1 {
                if let Some(outcome) = self.escape_valve(&lists, &winners) {
                    return Ok(outcome);
                }
            }

            if lists.iter().all(|list| list.len() <= 1) {
                return Ok(self.converge(&lists, round));
            }

            round += 1;
        }
    }

    /// Shortest positive duration among hospitals that are available and have not rejected member `i`.
    fn best_feasible(&self, i: usize) -> Option<HospitalId> {
        let mut best: Option<(HospitalId, SlotSpan)> = None;

        for hospital in HospitalId::ALL {
            if !self.pool.is_available(hospital) || self.infeasible[i][hospital.index()] {
                continue;
            }

            let duration = self.requests[i].duration_at(hospital);
            if duration <= 0.0 {
                continue;
            }

            if best.is_none_or(|(_, shortest)| duration < shortest) {
                best = Some((hospital, duration));
            }
        }

        best.map(|(hospital, _)| hospital)
    }

    /// Groups active members by their current best hospital. Members without
    /// any feasible hospital are dropped from the negotiation.
    fn propose(&mut self, round: u32) -> WaitingLists {
        let mut lists: WaitingLists = Default::default();

        for i in 0..self.batch.len() {
            if !self.active[i] {
                continue;
            }

            match self.best_feasible(i) {
                Some(hospital) => lists[hospital.index()].push(i),
                None => {
                    tracing::debug!(slot = self.slot, round, request = %self.requests[i].name, "no feasible hospital, back to the queue");
                    self.active[i] = false;
                    self.unplaced.push(self.batch[i]);
                }
            }
        }

        lists
    }

    /// Picks the tentative winner per hospital and marks the hospital infeasible for everybody else.
    fn reject_losers(&mut self, lists: &WaitingLists, round: u32) -> [Option<usize>; HOSPITAL_COUNT] {
        let mut winners = [None; HOSPITAL_COUNT];

        for hospital in HospitalId::ALL {
            let list = &lists[hospital.index()];
            let cost = self.pool.cost(hospital);

            // All proposers to one hospital are ranked by that hospital's cost; the first one wins ties.
            let mut winner: Option<(usize, u32)> = None;
            for &i in list {
                if winner.is_none_or(|(_, best_cost)| cost > best_cost) {
                    winner = Some((i, cost));
                }
            }

            if let Some((winner_index, _)) = winner {
                for &i in list.iter().filter(|&&i| i != winner_index) {
                    tracing::debug!(
                        slot = self.slot,
                        round,
                        hospital = %hospital,
                        request = %self.requests[i].name,
                        holder = %self.requests[winner_index].name,
                        "proposal rejected"
                    );
                    self.infeasible[i][hospital.index()] = true;
                }
            }

            winners[hospital.index()] = winner.map(|(i, _)| i);
        }

        winners
    }

    fn escape_valve(&self, lists: &WaitingLists, winners: &[Option<usize>; HOSPITAL_COUNT]) -> Option<NegotiationOutcome> {
        for hospital in HospitalId::ALL {
            let list = &lists[hospital.index()];
            if list.len() <= 1 {
                continue;
            }

            let winner = winners[hospital.index()];
            let deferred: Vec<usize> = list.iter().copied().filter(|&i| Some(i) != winner && self.requests[i].remaining_patience > 0).collect();

            if deferred.is_empty() {
                continue;
            }

            let retried: Vec<RequestId> =
                (0..self.batch.len()).filter(|&i| self.active[i] && !deferred.contains(&i)).map(|i| self.batch[i]).collect();
            let deferred: Vec<RequestId> = deferred.into_iter().map(|i| self.batch[i]).collect();

            tracing::debug!(
                slot = self.slot,
                hospital = %hospital,
                deferred = deferred.len(),
                retried = retried.len(),
                "first-round contention, deferring patient losers"
            );

            return Some(NegotiationOutcome::Aborted { contested: hospital, deferred, retried });
        }

        None
    }

    fn converge(&self, lists: &WaitingLists, rounds: u32) -> NegotiationOutcome {
        let mut assignments = Vec::new();

        for hospital in HospitalId::ALL {
            if let Some(&i) = lists[hospital.index()].first() {
                assignments.push(Assignment {
                    request: self.batch[i],
                    hospital,
                    duration: self.requests[i].duration_at(hospital),
                    cost: self.pool.cost(hospital),
                });
            }
        }

        tracing::debug!(slot = self.slot, rounds, assigned = assignments.len(), unplaced = self.unplaced.len(), "negotiation converged");

        NegotiationOutcome::Converged { assignments, unplaced: self.unplaced.clone(), rounds }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::request::request::SurgeryClass;
    use crate::domain::utils::id::RequestName;

    fn add(store: &mut RequestStore, name: &str, class: SurgeryClass, arrival: f64, base: f64, patience: u32) -> RequestId {
        store.add(Request::new(RequestName::new(name), class, arrival, class.durations_for(base), patience).unwrap())
    }

    fn pool() -> HospitalPool {
        HospitalPool::new([2, 5, 7])
    }

    #[test]
    fn test_single_request_takes_fastest_hospital() {
        let mut store = RequestStore::new();
        let key = add(&mut store, "a1", SurgeryClass::A, 0.3, 0.25, 5);

        let outcome = negotiate(0, &[key], &store, &pool()).unwrap();

        match outcome {
            NegotiationOutcome::Converged { assignments, unplaced, rounds } => {
                assert_eq!(rounds, 1);
                assert!(unplaced.is_empty());
                assert_eq!(assignments.len(), 1);
                assert_eq!(assignments[0].hospital, HospitalId::A);
                assert_eq!(assignments[0].duration, 0.25);
                assert_eq!(assignments[0].cost, 2);
            }
            other => panic!("expected convergence, got {:?}", other),
        }
    }

    #[test]
    fn test_distinct_preferences_converge_in_one_round() {
        let mut store = RequestStore::new();
        let a = add(&mut store, "a", SurgeryClass::A, 0.1, 0.25, 5);
        let b = add(&mut store, "b", SurgeryClass::B, 0.2, 0.6, 5);
        let c = add(&mut store, "c", SurgeryClass::C, 0.3, 1.2, 5);

        let outcome = negotiate(0, &[a, b, c], &store, &pool()).unwrap();

        let NegotiationOutcome::Converged { assignments, rounds, .. } = outcome else { panic!("expected convergence") };
        assert_eq!(rounds, 1);
        let pairs: Vec<(RequestId, HospitalId)> = assignments.iter().map(|x| (x.request, x.hospital)).collect();
        assert_eq!(pairs, vec![(a, HospitalId::A), (b, HospitalId::B), (c, HospitalId::C)]);
    }

    #[test]
    fn test_contention_with_patience_aborts_batch() {
        let mut store = RequestStore::new();
        let first = add(&mut store, "first", SurgeryClass::A, 0.1, 0.25, 5);
        let second = add(&mut store, "second", SurgeryClass::A, 0.2, 0.25, 5);

        let outcome = negotiate(0, &[first, second], &store, &pool()).unwrap();

        assert_eq!(
            outcome,
            NegotiationOutcome::Aborted { contested: HospitalId::A, deferred: vec![second], retried: vec![first] }
        );
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_abort_is_traced() {
        let mut store = RequestStore::new();
        let first = add(&mut store, "first", SurgeryClass::C, 0.1, 1.0, 5);
        let second = add(&mut store, "second", SurgeryClass::C, 0.2, 1.0, 5);

        negotiate(0, &[first, second], &store, &pool()).unwrap();

        assert!(logs_contain("proposal rejected"));
        assert!(logs_contain("first-round contention"));
    }

    #[test]
    fn test_impatient_loser_moves_on_to_next_hospital() {
        let mut store = RequestStore::new();
        let first = add(&mut store, "first", SurgeryClass::A, 0.1, 0.25, 5);
        let second = add(&mut store, "second", SurgeryClass::A, 0.2, 0.25, 0);

        let outcome = negotiate(0, &[first, second], &store, &pool()).unwrap();

        let NegotiationOutcome::Converged { assignments, rounds, .. } = outcome else { panic!("expected convergence") };
        assert_eq!(rounds, 2);
        assert_eq!(assignments[0].request, first);
        assert_eq!(assignments[0].hospital, HospitalId::A);
        assert_eq!(assignments[1].request, second);
        assert_eq!(assignments[1].hospital, HospitalId::B);
        assert_eq!(assignments[1].duration, 0.5);
    }

    #[test]
    fn test_all_hospitals_busy_routes_to_unplaced() {
        let mut store = RequestStore::new();
        let key = add(&mut store, "late", SurgeryClass::C, 0.4, 1.0, 5);
        let mut pool = pool();
        for hospital in HospitalId::ALL {
            assert!(pool.occupy(hospital, 2.0));
        }

        let outcome = negotiate(3, &[key], &store, &pool).unwrap();

        assert_eq!(outcome, NegotiationOutcome::Converged { assignments: vec![], unplaced: vec![key], rounds: 1 });
    }

    #[test]
    fn test_impatient_loser_exhausts_to_unplaced() {
        let mut store = RequestStore::new();
        let first = add(&mut store, "first", SurgeryClass::A, 0.1, 0.25, 0);
        let second = add(&mut store, "second", SurgeryClass::A, 0.2, 0.25, 0);
        let mut pool = pool();
        assert!(pool.occupy(HospitalId::B, 1.0));
        assert!(pool.occupy(HospitalId::C, 1.0));

        let outcome = negotiate(0, &[first, second], &store, &pool).unwrap();

        let NegotiationOutcome::Converged { assignments, unplaced, rounds } = outcome else { panic!("expected convergence") };
        assert_eq!(rounds, 2);
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].request, first);
        assert_eq!(unplaced, vec![second]);
    }

    #[test]
    fn test_every_patient_loser_is_deferred() {
        let mut store = RequestStore::new();
        let first = add(&mut store, "first", SurgeryClass::A, 0.1, 0.25, 5);
        let second = add(&mut store, "second", SurgeryClass::A, 0.2, 0.25, 5);
        let third = add(&mut store, "third", SurgeryClass::B, 0.3, 0.6, 5);
        let mut pool = pool();
        assert!(pool.occupy(HospitalId::B, 1.0));
        assert!(pool.occupy(HospitalId::C, 1.0));

        let outcome = negotiate(0, &[first, second, third], &store, &pool).unwrap();

        // Only hospital a is open, so all three propose there.
        let NegotiationOutcome::Aborted { contested, deferred, retried } = outcome else { panic!("expected abort") };
        assert_eq!(contested, HospitalId::A);
        assert_eq!(deferred, vec![second, third]);
        assert_eq!(retried, vec![first]);
    }

    #[test]
    fn test_impatient_loser_is_retried_instead_of_deferred() {
        let mut store = RequestStore::new();
        let first = add(&mut store, "first", SurgeryClass::A, 0.1, 0.25, 5);
        let second = add(&mut store, "second", SurgeryClass::A, 0.2, 0.25, 0);
        let third = add(&mut store, "third", SurgeryClass::B, 0.3, 0.6, 5);
        let mut pool = pool();
        assert!(pool.occupy(HospitalId::B, 1.0));
        assert!(pool.occupy(HospitalId::C, 1.0));

        let outcome = negotiate(0, &[first, second, third], &store, &pool).unwrap();

        let NegotiationOutcome::Aborted { contested, deferred, retried } = outcome else { panic!("expected abort") };
        assert_eq!(contested, HospitalId::A);
        assert_eq!(deferred, vec![third]);
        assert_eq!(retried, vec![first, second]);
    }

    #[test]
    fn test_negotiation_does_not_touch_request_durations() {
        let mut store = RequestStore::new();
        let first = add(&mut store, "first", SurgeryClass::A, 0.1, 0.25, 0);
        let second = add(&mut store, "second", SurgeryClass::A, 0.2, 0.25, 0);

        negotiate(0, &[first, second], &store, &pool()).unwrap();

        assert_eq!(store.get(second).unwrap().durations(), &[0.25, 0.5, 0.75]);
    }

    #[test]
    fn test_oversized_batch_fails_loudly() {
        let mut store = RequestStore::new();
        let keys: Vec<RequestId> = (0..4).map(|i| add(&mut store, &format!("r{}", i), SurgeryClass::A, 0.1, 0.25, 5)).collect();

        let result = negotiate(9, &keys, &store, &pool());

        assert!(matches!(result, Err(Error::InvariantViolation { slot: 9, .. })));
    }

    #[test]
    fn test_cascading_rejections_stay_within_bound() {
        let mut store = RequestStore::new();
        let keys: Vec<RequestId> = (0..3).map(|i| add(&mut store, &format!("r{}", i), SurgeryClass::A, 0.1 * i as f64, 0.25, 0)).collect();

        let outcome = negotiate(0, &keys, &store, &pool()).unwrap();

        let NegotiationOutcome::Converged { assignments, rounds, .. } = outcome else { panic!("expected convergence") };
        assert_eq!(rounds, 3);
        let hospitals: Vec<HospitalId> = assignments.iter().map(|x| x.hospital).collect();
        assert_eq!(hospitals, vec![HospitalId::A, HospitalId::B, HospitalId::C]);
        assert!(rounds <= max_rounds(keys.len()));
    }
}
