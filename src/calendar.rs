//! Booking index for the agenda.
//!
//! `BookingCalendar` keeps, for every doctor, the pending appointments keyed
//! by their scheduled start. A doctor can hold at most one pending booking
//! per timestamp, so the conflict check is a single map lookup.

use crate::models::{AppointmentId, DoctorId};
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default)]
pub struct BookingCalendar {
    bookings: HashMap<DoctorId, BTreeMap<NaiveDateTime, AppointmentId>>,
}

impl BookingCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// The pending appointment holding `doctor_id` at `when`, if any.
    pub fn booked(&self, doctor_id: DoctorId, when: NaiveDateTime) -> Option<AppointmentId> {
        self.bookings
            .get(&doctor_id)
            .and_then(|slots| slots.get(&when))
            .copied()
    }

    /// Reserve `when` for `appointment_id`.
    ///
    /// Fails with the id of the appointment already holding the slot.
    pub fn reserve(
        &mut self,
        doctor_id: DoctorId,
        when: NaiveDateTime,
        appointment_id: AppointmentId,
    ) -> Result<(), AppointmentId> {
        let slots = self.bookings.entry(doctor_id).or_default();
        match slots.get(&when) {
            Some(existing) if *existing != appointment_id => Err(*existing),
            _ => {
                slots.insert(when, appointment_id);
                Ok(())
            }
        }
    }

    /// Free the slot, but only if it is held by `appointment_id`.
    pub fn release(
        &mut self,
        doctor_id: DoctorId,
        when: NaiveDateTime,
        appointment_id: AppointmentId,
    ) -> bool {
        let Some(slots) = self.bookings.get_mut(&doctor_id) else {
            return false;
        };
        if slots.get(&when) != Some(&appointment_id) {
            return false;
        }
        slots.remove(&when);
        if slots.is_empty() {
            self.bookings.remove(&doctor_id);
        }
        true
    }

    /// Pending bookings of a doctor sorted by time.
    pub fn bookings_for(&self, doctor_id: DoctorId) -> Vec<(NaiveDateTime, AppointmentId)> {
        self.bookings
            .get(&doctor_id)
            .map(|slots| slots.iter().map(|(when, id)| (*when, *id)).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.bookings.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }
}

impl std::fmt::Display for BookingCalendar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BookingCalendar(doctors={}, pending={})",
            self.bookings.len(),
            self.len()
        )
    }
}
