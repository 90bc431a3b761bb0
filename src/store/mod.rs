//! Persistence for the agenda.
//!
//! A [`Store`] owns the canonical [`Registry`] and exposes it through one
//! read accessor and one transactional write. Backends decide where the
//! registry lives between writes.

pub mod json_file;
pub mod memory;
pub mod rows;

use crate::calendar::BookingCalendar;
use crate::error::{AgendaError, Entity, Result};
use crate::models::{
    Appointment, AppointmentId, AppointmentStatus, Doctor, DoctorId, HistoryEntry, Patient,
    PatientId,
};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

pub trait Store {
    fn read(&self) -> &Registry;

    /// Apply `f` as one unit: its changes are committed when it returns `Ok`
    /// and discarded when it returns `Err` or the commit itself fails.
    fn write<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Registry) -> Result<T>;
}

/// Patients, doctors and appointments keyed by auto-incrementing id.
///
/// Every pending appointment is mirrored in the booking calendar, which is
/// what keeps a doctor from holding two pending bookings at one timestamp.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    patients: BTreeMap<PatientId, Patient>,
    doctors: BTreeMap<DoctorId, Doctor>,
    appointments: BTreeMap<AppointmentId, Appointment>,
    calendar: BookingCalendar,
    last_patient_id: u32,
    last_doctor_id: u32,
    last_appointment_id: u32,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from previously persisted records.
    ///
    /// References and the double-booking invariant are re-checked, so a
    /// tampered file is rejected instead of loaded half-consistent.
    pub fn from_records(
        patients: Vec<Patient>,
        doctors: Vec<Doctor>,
        appointments: Vec<Appointment>,
    ) -> Result<Self> {
        let mut registry = Registry::new();

        for patient in patients {
            registry.last_patient_id = registry.last_patient_id.max(patient.id.get());
            if registry.patients.insert(patient.id, patient).is_some() {
                return Err(AgendaError::storage("duplicate patient id in stored data"));
            }
        }
        for doctor in doctors {
            registry.last_doctor_id = registry.last_doctor_id.max(doctor.id.get());
            if registry.doctors.insert(doctor.id, doctor).is_some() {
                return Err(AgendaError::storage("duplicate doctor id in stored data"));
            }
        }
        for appointment in appointments {
            if !registry.patients.contains_key(&appointment.patient_id) {
                return Err(AgendaError::storage(format!(
                    "appointment {} references unknown patient {}",
                    appointment.id, appointment.patient_id
                )));
            }
            if !registry.doctors.contains_key(&appointment.doctor_id) {
                return Err(AgendaError::storage(format!(
                    "appointment {} references unknown doctor {}",
                    appointment.id, appointment.doctor_id
                )));
            }
            if appointment.is_pending() {
                registry
                    .calendar
                    .reserve(appointment.doctor_id, appointment.when, appointment.id)
                    .map_err(|existing| {
                        AgendaError::storage(format!(
                            "appointments {} and {} double-book doctor {} at {}",
                            existing, appointment.id, appointment.doctor_id, appointment.when
                        ))
                    })?;
            }
            registry.last_appointment_id = registry.last_appointment_id.max(appointment.id.get());
            if registry
                .appointments
                .insert(appointment.id, appointment)
                .is_some()
            {
                return Err(AgendaError::storage("duplicate appointment id in stored data"));
            }
        }

        Ok(registry)
    }

    pub fn patient(&self, id: PatientId) -> Option<&Patient> {
        self.patients.get(&id)
    }

    pub fn doctor(&self, id: DoctorId) -> Option<&Doctor> {
        self.doctors.get(&id)
    }

    pub fn appointment(&self, id: AppointmentId) -> Option<&Appointment> {
        self.appointments.get(&id)
    }

    /// All patients in id order.
    pub fn patients(&self) -> impl Iterator<Item = &Patient> {
        self.patients.values()
    }

    pub fn doctors(&self) -> impl Iterator<Item = &Doctor> {
        self.doctors.values()
    }

    pub fn appointments(&self) -> impl Iterator<Item = &Appointment> {
        self.appointments.values()
    }

    pub fn calendar(&self) -> &BookingCalendar {
        &self.calendar
    }

    pub fn find_patient_by_name(&self, name: &str) -> Option<&Patient> {
        let needle = normalize_name(name);
        self.patients
            .values()
            .find(|p| normalize_name(&p.name) == needle)
    }

    pub fn find_doctor_by_name(&self, name: &str) -> Option<&Doctor> {
        let needle = normalize_name(name);
        self.doctors
            .values()
            .find(|d| normalize_name(&d.name) == needle)
    }

    pub fn insert_patient(&mut self, name: String, birth_date: NaiveDate, phone: String) -> Patient {
        self.last_patient_id += 1;
        let patient = Patient::new(PatientId(self.last_patient_id), name, birth_date, phone);
        self.patients.insert(patient.id, patient.clone());
        patient
    }

    pub fn insert_doctor(&mut self, name: String, specialty: String) -> Doctor {
        self.last_doctor_id += 1;
        let doctor = Doctor {
            id: DoctorId(self.last_doctor_id),
            name,
            specialty,
        };
        self.doctors.insert(doctor.id, doctor.clone());
        doctor
    }

    /// Book a pending appointment; the slot lookup and the insert happen in
    /// one step.
    pub fn insert_appointment(
        &mut self,
        patient_id: PatientId,
        doctor_id: DoctorId,
        when: NaiveDateTime,
        reason: String,
    ) -> Result<Appointment> {
        if !self.patients.contains_key(&patient_id) {
            return Err(AgendaError::NotFound {
                entity: Entity::Patient,
                id: patient_id.get(),
            });
        }
        if !self.doctors.contains_key(&doctor_id) {
            return Err(AgendaError::NotFound {
                entity: Entity::Doctor,
                id: doctor_id.get(),
            });
        }

        let id = AppointmentId(self.last_appointment_id + 1);
        self.calendar
            .reserve(doctor_id, when, id)
            .map_err(|existing| AgendaError::Conflict {
                doctor_id,
                when,
                existing,
            })?;

        self.last_appointment_id = id.get();
        let appointment = Appointment::new(id, patient_id, doctor_id, when, reason);
        self.appointments.insert(id, appointment.clone());
        Ok(appointment)
    }

    /// Move a pending appointment to `status`, freeing its calendar slot.
    pub fn close_appointment(
        &mut self,
        id: AppointmentId,
        status: AppointmentStatus,
        notes: Option<String>,
    ) -> Result<Appointment> {
        let appointment = self
            .appointments
            .get_mut(&id)
            .ok_or(AgendaError::NotFound {
                entity: Entity::Appointment,
                id: id.get(),
            })?;

        if !appointment.status.can_transition_to(status) {
            return Err(AgendaError::InvalidState {
                id,
                status: appointment.status,
                action: match status {
                    AppointmentStatus::Attended => "marked attended",
                    AppointmentStatus::Cancelled => "cancelled",
                    AppointmentStatus::Pending => "reopened",
                },
            });
        }

        self.calendar
            .release(appointment.doctor_id, appointment.when, id);
        appointment.status = status;
        appointment.notes = notes;
        Ok(appointment.clone())
    }

    /// Change the time of a pending appointment, keeping the slot exclusive.
    pub fn move_appointment(&mut self, id: AppointmentId, when: NaiveDateTime) -> Result<Appointment> {
        let appointment = self
            .appointments
            .get_mut(&id)
            .ok_or(AgendaError::NotFound {
                entity: Entity::Appointment,
                id: id.get(),
            })?;

        if !appointment.is_pending() {
            return Err(AgendaError::InvalidState {
                id,
                status: appointment.status,
                action: "rescheduled",
            });
        }

        let doctor_id = appointment.doctor_id;
        self.calendar
            .reserve(doctor_id, when, id)
            .map_err(|existing| AgendaError::Conflict {
                doctor_id,
                when,
                existing,
            })?;
        if appointment.when != when {
            self.calendar.release(doctor_id, appointment.when, id);
        }
        appointment.when = when;
        Ok(appointment.clone())
    }

    pub fn append_history(&mut self, patient_id: PatientId, entry: HistoryEntry) -> Result<()> {
        let patient = self
            .patients
            .get_mut(&patient_id)
            .ok_or(AgendaError::NotFound {
                entity: Entity::Patient,
                id: patient_id.get(),
            })?;
        patient.history.push(entry);
        Ok(())
    }
}

fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn when(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2030, 1, 10)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn seeded() -> Registry {
        let mut registry = Registry::new();
        registry.insert_patient(
            "Ana Torres".to_string(),
            NaiveDate::from_ymd_opt(1990, 5, 1).unwrap(),
            "12345678".to_string(),
        );
        registry.insert_doctor("Luis Paz".to_string(), "Cardiologia".to_string());
        registry
    }

    #[test]
    fn test_ids_increase_from_one() {
        let mut registry = seeded();
        let second = registry.insert_patient(
            "Mario Rojas".to_string(),
            NaiveDate::from_ymd_opt(1985, 1, 1).unwrap(),
            "87654321".to_string(),
        );
        assert_eq!(second.id, PatientId(2));
        assert_eq!(registry.doctor(DoctorId(1)).unwrap().name, "Luis Paz");
    }

    #[test]
    fn test_find_by_name_ignores_case_and_spacing() {
        let registry = seeded();
        assert!(registry.find_patient_by_name("  ana   TORRES ").is_some());
        assert!(registry.find_doctor_by_name("LUIS PAZ").is_some());
        assert!(registry.find_doctor_by_name("Luis Pazos").is_none());
    }

    #[test]
    fn test_conflicting_insert_leaves_counter_untouched() {
        let mut registry = seeded();
        registry
            .insert_appointment(PatientId(1), DoctorId(1), when(9), "chequeo".into())
            .unwrap();
        let err = registry
            .insert_appointment(PatientId(1), DoctorId(1), when(9), "otro".into())
            .unwrap_err();
        assert!(matches!(err, AgendaError::Conflict { existing: AppointmentId(1), .. }));

        let next = registry
            .insert_appointment(PatientId(1), DoctorId(1), when(10), "otro".into())
            .unwrap();
        assert_eq!(next.id, AppointmentId(2));
    }

    #[test]
    fn test_closing_frees_the_slot() {
        let mut registry = seeded();
        let apt = registry
            .insert_appointment(PatientId(1), DoctorId(1), when(9), "chequeo".into())
            .unwrap();
        registry
            .close_appointment(apt.id, AppointmentStatus::Cancelled, None)
            .unwrap();
        assert!(registry.calendar().is_empty());
        assert!(registry
            .insert_appointment(PatientId(1), DoctorId(1), when(9), "chequeo".into())
            .is_ok());
    }

    #[test]
    fn test_move_appointment_checks_target_slot() {
        let mut registry = seeded();
        let first = registry
            .insert_appointment(PatientId(1), DoctorId(1), when(9), "a".into())
            .unwrap();
        registry
            .insert_appointment(PatientId(1), DoctorId(1), when(10), "b".into())
            .unwrap();

        assert!(matches!(
            registry.move_appointment(first.id, when(10)),
            Err(AgendaError::Conflict { .. })
        ));
        assert_eq!(registry.calendar().booked(DoctorId(1), when(9)), Some(first.id));

        registry.move_appointment(first.id, when(11)).unwrap();
        assert_eq!(registry.calendar().booked(DoctorId(1), when(9)), None);
        assert_eq!(registry.calendar().booked(DoctorId(1), when(11)), Some(first.id));
    }

    #[test]
    fn test_from_records_rejects_double_booking() {
        let registry = seeded();
        let patients: Vec<_> = registry.patients().cloned().collect();
        let doctors: Vec<_> = registry.doctors().cloned().collect();
        let appointments = vec![
            Appointment::new(AppointmentId(1), PatientId(1), DoctorId(1), when(9), "a".into()),
            Appointment::new(AppointmentId(2), PatientId(1), DoctorId(1), when(9), "b".into()),
        ];
        let err = Registry::from_records(patients, doctors, appointments).unwrap_err();
        assert!(matches!(err, AgendaError::Storage { .. }));
    }

    #[test]
    fn test_from_records_resumes_id_sequence() {
        let mut registry = seeded();
        registry.insert_doctor("Rosa Vega".into(), "Pediatria".into());
        let reloaded = Registry::from_records(
            registry.patients().cloned().collect(),
            registry.doctors().cloned().collect(),
            Vec::new(),
        );
        let mut reloaded = reloaded.unwrap();
        let doctor = reloaded.insert_doctor("Ines Mora".into(), "Dermatologia".into());
        assert_eq!(doctor.id, DoctorId(3));
    }
}
