use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::utils::units::SlotSpan;

/// Number of hospitals in the system. Fixed.
pub const HOSPITAL_COUNT: usize = 3;

/// Identity of one of the three single-capacity hospitals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HospitalId {
    A,
    B,
    C,
}

impl HospitalId {
    pub const ALL: [HospitalId; HOSPITAL_COUNT] = [HospitalId::A, HospitalId::B, HospitalId::C];

    pub fn index(self) -> usize {
        match self {
            HospitalId::A => 0,
            HospitalId::B => 1,
            HospitalId::C => 2,
        }
    }
}

impl fmt::Display for HospitalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HospitalId::A => "a",
            HospitalId::B => "b",
            HospitalId::C => "c",
        };
        f.pad(label)
    }
}

/// A single hospital and its occupancy.
///
/// `busy_for` counts the remaining slots of exclusive occupancy. It is
/// fractional because surgery durations are; the hospital becomes available
/// in the first slot where the countdown drops below zero.
#[derive(Debug, Clone)]
pub struct Hospital {
    pub id: HospitalId,

    /// Priority key used when several requests propose to this hospital. Higher wins.
    pub cost: u32,

    busy_for: SlotSpan,
    available: bool,
}

impl Hospital {
    pub fn new(id: HospitalId, cost: u32) -> Self {
        Hospital { id, cost, busy_for: 0.0, available: true }
    }

    pub fn busy_for(&self) -> SlotSpan {
        self.busy_for
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Ages the hospital by one slot.
    pub fn advance(&mut self) {
        self.busy_for -= 1.0;

        if self.busy_for < 0.0 {
            self.busy_for = 0.0;
            self.available = true;
        } else {
            self.available = false;
        }
    }

    /// Starts a surgery of `duration` slots.
    ///
    /// # Returns
    /// `false` if the hospital was not available, in which case nothing changes.
    pub fn occupy(&mut self, duration: SlotSpan) -> bool {
        if !self.available {
            log::error!("Hospital {} is still busy for {:.3} slots and cannot take another surgery.", self.id, self.busy_for);
            return false;
        }

        self.busy_for = duration;
        self.available = false;
        true
    }
}
