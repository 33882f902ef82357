//! Numeric units used across the simulation.
//!
//! Time is measured in slots. Positions in time and service durations are
//! fractional, while slot indices, patience and delays are whole slots. The
//! aliases keep the two apart at function boundaries; conversions between them
//! go through the helpers below so truncation happens in exactly one place.

/// Index of a discrete slot.
pub type SlotIndex = u64;

/// Point in time measured in slots: slot index plus the fractional offset inside the slot.
pub type SlotTime = f64;

/// Fractional number of slots a hospital is occupied by one surgery.
pub type SlotSpan = f64;

/// Number of additional slots a request may still be deferred.
pub type Patience = u32;

/// Whole slots between arrival and admission.
pub type Delay = u64;

/// Slot in which a point in time lies.
pub fn slot_of(time: SlotTime) -> SlotIndex {
    if time <= 0.0 { 0 } else { time.floor() as SlotIndex }
}

/// Waiting time of a request admitted in `slot` that arrived at `arrival`.
pub fn delay_between(arrival: SlotTime, slot: SlotIndex) -> Delay {
    slot.saturating_sub(slot_of(arrival))
}
