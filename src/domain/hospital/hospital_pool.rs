use crate::domain::hospital::hospital::{HOSPITAL_COUNT, Hospital, HospitalId};
use crate::domain::utils::units::SlotSpan;

/// The three hospitals and their availability for the current slot.
#[derive(Debug, Clone)]
pub struct HospitalPool {
    hospitals: [Hospital; HOSPITAL_COUNT],
}

impl HospitalPool {
    pub fn new(costs: [u32; HOSPITAL_COUNT]) -> Self {
        HospitalPool { hospitals: HospitalId::ALL.map(|id| Hospital::new(id, costs[id.index()])) }
    }

    /// Ages every hospital by one slot. Called once per slot, before any negotiation.
    pub fn advance(&mut self) {
        for hospital in self.hospitals.iter_mut() {
            hospital.advance();
        }
    }

    /// Marks `id` busy for `duration` slots.
    ///
    /// # Returns
    /// `false` if the hospital was not available; the caller treats this as a contract breach.
    pub fn occupy(&mut self, id: HospitalId, duration: SlotSpan) -> bool {
        self.hospitals[id.index()].occupy(duration)
    }

    pub fn is_available(&self, id: HospitalId) -> bool {
        self.hospitals[id.index()].is_available()
    }

    pub fn availability(&self) -> [bool; HOSPITAL_COUNT] {
        HospitalId::ALL.map(|id| self.is_available(id))
    }

    pub fn cost(&self, id: HospitalId) -> u32 {
        self.hospitals[id.index()].cost
    }

    pub fn get(&self, id: HospitalId) -> &Hospital {
        &self.hospitals[id.index()]
    }
}
