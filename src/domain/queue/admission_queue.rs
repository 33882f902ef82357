use std::collections::VecDeque;

use crate::domain::request::request::RequestStatus;
use crate::domain::request::request_store::{RequestId, RequestStore};

/// Number of requests negotiated together.
pub const BATCH_CAPACITY: usize = 3;

/// Ordered holding area for every request that has not been admitted yet.
///
/// Order is ascending arrival time after each intake. Requeued requests are
/// placed at the head or the tail without re-sorting until the next intake.
#[derive(Debug, Default)]
pub struct AdmissionQueue {
    entries: VecDeque<RequestId>,
}

impl AdmissionQueue {
    pub fn new() -> Self {
        AdmissionQueue { entries: VecDeque::new() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RequestId> {
        self.entries.iter()
    }

    /// Appends freshly arrived requests and re-sorts the whole queue by arrival time.
    /// The sort is stable, so equal arrival times keep insertion order.
    pub fn admit(&mut self, requests: impl IntoIterator<Item = RequestId>, store: &RequestStore) {
        self.entries.extend(requests);

        let arrival = |key: &RequestId| store.get(*key).map(|r| r.arrival_time()).unwrap_or(f64::INFINITY);
        self.entries.make_contiguous().sort_by(|lhs, rhs| arrival(lhs).total_cmp(&arrival(rhs)));
    }

    /// Pulls the next negotiation batch.
    ///
    /// Scans from the front and collects up to `capacity` requests whose status is
    /// not `PassSlot`. Exactly the collected requests are removed; skipped `PassSlot`
    /// entries keep their positions. The batch is returned in arrival order.
    pub fn take_batch(&mut self, capacity: usize, store: &RequestStore) -> Vec<RequestId> {
        let mut positions: Vec<usize> = Vec::with_capacity(capacity);

        for (position, key) in self.entries.iter().enumerate() {
            if positions.len() == capacity {
                break;
            }

            let is_pass_slot = store.get(*key).map(|r| r.status == RequestStatus::PassSlot).unwrap_or(false);
            if !is_pass_slot {
                positions.push(position);
            }
        }

        let mut batch: Vec<RequestId> = Vec::with_capacity(positions.len());
        for position in positions.into_iter().rev() {
            if let Some(key) = self.entries.remove(position) {
                batch.push(key);
            }
        }
        batch.reverse();

        let arrival = |key: &RequestId| store.get(*key).map(|r| r.arrival_time()).unwrap_or(f64::INFINITY);
        batch.sort_by(|lhs, rhs| arrival(lhs).total_cmp(&arrival(rhs)));

        batch
    }

    /// Puts requests back at the head of the queue, keeping their relative order.
    pub fn requeue_front(&mut self, requests: &[RequestId]) {
        for key in requests.iter().rev() {
            self.entries.push_front(*key);
        }
    }

    /// Puts requests back at the tail of the queue without touching their patience.
    pub fn requeue_back(&mut self, requests: &[RequestId]) {
        self.entries.extend(requests.iter().copied());
    }

    /// Puts deferred requests at the tail of the queue, consuming one unit of patience each.
    pub fn requeue_back_with_decrement(&mut self, requests: &[RequestId], store: &mut RequestStore) {
        for key in requests {
            if let Some(request) = store.get_mut(*key) {
                request.decrement_patience();
            }
            self.entries.push_back(*key);
        }
    }

    /// Formatted table of the queue contents for diagnostics.
    pub fn snapshot(&self, store: &RequestStore) -> String {
        let mut out = format!(
            "{:<8} {:<3} {:<14} {:<34} {:<6} {:<18} {}\n{}\n",
            "Request",
            "Cls",
            "Arrival",
            "Durations at a, b, c",
            "Pass",
            "Status",
            "Best",
            "-".repeat(96)
        );

        for key in &self.entries {
            match store.get(*key) {
                Some(request) => out.push_str(&format!("{}\n", request)),
                None => out.push_str(&format!("{:?} <missing from store>\n", key)),
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::request::request::{Request, SurgeryClass};
    use crate::domain::utils::id::RequestName;

    fn add(store: &mut RequestStore, name: &str, arrival: f64) -> RequestId {
        let request = Request::new(RequestName::new(name), SurgeryClass::A, arrival, SurgeryClass::A.durations_for(0.25), 5).unwrap();
        store.add(request)
    }

    fn names(queue: &AdmissionQueue, store: &RequestStore) -> Vec<String> {
        queue.iter().map(|k| store.get(*k).unwrap().name.to_string()).collect()
    }

    #[test]
    fn test_admit_sorts_by_arrival_stably() {
        let mut store = RequestStore::new();
        let mut queue = AdmissionQueue::new();

        let first = add(&mut store, "r1", 0.7);
        let second = add(&mut store, "r2", 0.2);
        let third = add(&mut store, "r3", 0.7);
        queue.admit([first, second, third], &store);

        assert_eq!(names(&queue, &store), vec!["r2", "r1", "r3"]);
    }

    #[test]
    fn test_take_batch_respects_capacity() {
        let mut store = RequestStore::new();
        let mut queue = AdmissionQueue::new();
        let keys: Vec<RequestId> = (0..5).map(|i| add(&mut store, &format!("r{}", i), i as f64 * 0.1)).collect();
        queue.admit(keys.clone(), &store);

        let batch = queue.take_batch(BATCH_CAPACITY, &store);

        assert_eq!(batch, keys[..3].to_vec());
        assert_eq!(names(&queue, &store), vec!["r3", "r4"]);
    }

    // Only the collected requests leave the queue. A PassSlot entry sitting in
    // front of batch members stays where it is instead of being popped by count.
    #[test]
    fn test_pass_slot_entries_ahead_of_batch_stay_queued() {
        let mut store = RequestStore::new();
        let mut queue = AdmissionQueue::new();
        let keys: Vec<RequestId> = (0..5).map(|i| add(&mut store, &format!("r{}", i), i as f64 * 0.1)).collect();
        queue.admit(keys.clone(), &store);

        store.get_mut(keys[0]).unwrap().status = RequestStatus::PassSlot;
        store.get_mut(keys[2]).unwrap().status = RequestStatus::PassSlot;

        let batch = queue.take_batch(BATCH_CAPACITY, &store);

        assert_eq!(batch, vec![keys[1], keys[3], keys[4]]);
        assert_eq!(names(&queue, &store), vec!["r0", "r2"]);
    }

    #[test]
    fn test_take_batch_from_only_pass_slot_is_empty() {
        let mut store = RequestStore::new();
        let mut queue = AdmissionQueue::new();
        let key = add(&mut store, "r0", 0.0);
        queue.admit([key], &store);
        store.get_mut(key).unwrap().status = RequestStatus::PassSlot;

        assert!(queue.take_batch(BATCH_CAPACITY, &store).is_empty());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_requeue_front_preserves_order() {
        let mut store = RequestStore::new();
        let mut queue = AdmissionQueue::new();
        let keys: Vec<RequestId> = (0..4).map(|i| add(&mut store, &format!("r{}", i), i as f64 * 0.1)).collect();
        queue.admit([keys[3]], &store);

        queue.requeue_front(&[keys[0], keys[1], keys[2]]);

        assert_eq!(names(&queue, &store), vec!["r0", "r1", "r2", "r3"]);
    }

    #[test]
    fn test_requeue_back_with_decrement_consumes_patience() {
        let mut store = RequestStore::new();
        let mut queue = AdmissionQueue::new();
        let deferred = add(&mut store, "deferred", 0.1);
        let unplaced = add(&mut store, "unplaced", 0.2);

        queue.requeue_back(&[unplaced]);
        queue.requeue_back_with_decrement(&[deferred], &mut store);

        assert_eq!(names(&queue, &store), vec!["unplaced", "deferred"]);
        assert_eq!(store.get(deferred).unwrap().remaining_patience, 4);
        assert_eq!(store.get(unplaced).unwrap().remaining_patience, 5);
    }
}
