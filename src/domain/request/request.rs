use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::hospital::hospital::{HOSPITAL_COUNT, HospitalId};
use crate::domain::utils::id::RequestName;
use crate::domain::utils::units::{Patience, SlotIndex, SlotSpan, SlotTime, slot_of};
use crate::error::{Error, Result};

/// Surgery class of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SurgeryClass {
    A,
    B,
    C,
}

impl SurgeryClass {
    pub const ALL: [SurgeryClass; 3] = [SurgeryClass::A, SurgeryClass::B, SurgeryClass::C];

    pub fn index(self) -> usize {
        match self {
            SurgeryClass::A => 0,
            SurgeryClass::B => 1,
            SurgeryClass::C => 2,
        }
    }

    /// Multipliers applied to one drawn base duration to get the duration at hospital a, b and c.
    /// Each class is fastest at its own hospital.
    pub fn scaling(self) -> [f64; HOSPITAL_COUNT] {
        match self {
            SurgeryClass::A => [1.0, 2.0, 3.0],
            SurgeryClass::B => [3.0, 1.0, 2.0],
            SurgeryClass::C => [2.0, 3.0, 1.0],
        }
    }

    /// Duration triple for a drawn base duration.
    pub fn durations_for(self, base: SlotSpan) -> [SlotSpan; HOSPITAL_COUNT] {
        self.scaling().map(|factor| base * factor)
    }
}

impl fmt::Display for SurgeryClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SurgeryClass::A => "A",
            SurgeryClass::B => "B",
            SurgeryClass::C => "C",
        };
        f.pad(label)
    }
}

/// Queue status of a request.
///
/// Only `PassSlot` influences batching: such requests are skipped until the next slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    NewRequest,
    ReadyToProcess,
    Queued,
    PassSlot,
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RequestStatus::NewRequest => "new request",
            RequestStatus::ReadyToProcess => "ready to process",
            RequestStatus::Queued => "queued",
            RequestStatus::PassSlot => "pass slot",
        };
        f.pad(label)
    }
}

/// A surgery request waiting for a hospital.
///
/// Identity, arrival and durations are fixed at creation. Rejections during a
/// negotiation are tracked by the negotiation itself and never written back here.
#[derive(Debug, Clone)]
pub struct Request {
    pub name: RequestName,
    pub class: SurgeryClass,
    arrival_time: SlotTime,
    durations: [SlotSpan; HOSPITAL_COUNT],
    pub remaining_patience: Patience,
    pub status: RequestStatus,
    preferred_hospital: Option<HospitalId>,
}

impl Request {
    pub fn new(name: RequestName, class: SurgeryClass, arrival_time: SlotTime, durations: [SlotSpan; HOSPITAL_COUNT], patience: Patience) -> Result<Self> {
        if !arrival_time.is_finite() || arrival_time < 0.0 {
            return Err(Error::invariant(0, 0, None, format!("request {} has invalid arrival time {}", name, arrival_time)));
        }

        if durations.iter().any(|d| !d.is_finite() || *d <= 0.0) {
            return Err(Error::invariant(
                slot_of(arrival_time),
                0,
                None,
                format!("request {} has a malformed duration triple {:?}", name, durations),
            ));
        }

        Ok(Request {
            name,
            class,
            arrival_time,
            durations,
            remaining_patience: patience,
            status: RequestStatus::NewRequest,
            preferred_hospital: None,
        })
    }

    pub fn arrival_time(&self) -> SlotTime {
        self.arrival_time
    }

    pub fn arrival_slot(&self) -> SlotIndex {
        slot_of(self.arrival_time)
    }

    pub fn duration_at(&self, hospital: HospitalId) -> SlotSpan {
        self.durations[hospital.index()]
    }

    pub fn durations(&self) -> &[SlotSpan; HOSPITAL_COUNT] {
        &self.durations
    }

    pub fn preferred_hospital(&self) -> Option<HospitalId> {
        self.preferred_hospital
    }

    /// Records the hospital with the globally shortest duration, ignoring availability.
    /// Only the first call has an effect; the annotation never changes afterwards.
    pub fn annotate_preferred_hospital(&mut self) -> HospitalId {
        if let Some(hospital) = self.preferred_hospital {
            return hospital;
        }

        let mut best = HospitalId::A;
        for hospital in HospitalId::ALL {
            if self.duration_at(hospital) < self.duration_at(best) {
                best = hospital;
            }
        }

        self.preferred_hospital = Some(best);
        best
    }

    /// Consumes one unit of patience. Saturates at zero.
    pub fn decrement_patience(&mut self) {
        self.remaining_patience = self.remaining_patience.saturating_sub(1);
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let durations = self.durations.iter().map(|d| format!("{:.4}", d)).collect::<Vec<_>>().join(", ");
        let preferred = self.preferred_hospital.map(|h| h.to_string()).unwrap_or_else(|| "-".to_string());

        write!(
            f,
            "{:<8} {:<3} {:<14.6} {:<34} {:<6} {:<18} {}",
            self.name, self.class, self.arrival_time, durations, self.remaining_patience, self.status, preferred
        )
    }
}
