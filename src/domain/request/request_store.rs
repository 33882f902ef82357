use slotmap::{SlotMap, new_key_type};

use crate::domain::request::request::Request;

new_key_type! {
    pub struct RequestId;
}

/// Owner of every request that has arrived and not yet been admitted.
///
/// The admission queue and the negotiation only hold `RequestId`s. A request
/// leaves the store when it is admitted to a hospital.
#[derive(Debug, Default)]
pub struct RequestStore {
    slots: SlotMap<RequestId, Request>,
}

impl RequestStore {
    pub fn new() -> Self {
        Self { slots: SlotMap::with_key() }
    }

    pub fn add(&mut self, request: Request) -> RequestId {
        self.slots.insert(request)
    }

    pub fn get(&self, key: RequestId) -> Option<&Request> {
        self.slots.get(key)
    }

    pub fn get_mut(&mut self, key: RequestId) -> Option<&mut Request> {
        self.slots.get_mut(key)
    }

    pub fn remove(&mut self, key: RequestId) -> Option<Request> {
        self.slots.remove(key)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> slotmap::basic::Iter<'_, RequestId, Request> {
        self.slots.iter()
    }

    pub fn iter_mut(&mut self) -> slotmap::basic::IterMut<'_, RequestId, Request> {
        self.slots.iter_mut()
    }
}
