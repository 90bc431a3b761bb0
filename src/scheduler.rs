//! Scheduling operations for the medical agenda.
//!
//! `Agenda` applies the business rules (field validation, duplicate names,
//! operating hours, double-booking, status lifecycle) on top of a [`Store`],
//! which keeps the records. Every mutation is a single store write.

use crate::clock::{Clock, SystemClock};
use crate::config::OperatingHours;
use crate::error::{AgendaError, Entity, Result};
use crate::models::{
    Appointment, AppointmentId, AppointmentStatus, CancelOutcome, Doctor, DoctorId, HistoryEntry,
    Patient, PatientId,
};
use crate::store::{Registry, Store};
use crate::validation::{
    validate_birth_date, validate_nonempty, validate_person_name, validate_phone, validate_text,
};
use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info, warn};

pub struct Agenda<S: Store, C: Clock = SystemClock> {
    store: S,
    clock: C,
    hours: OperatingHours,
}

impl<S: Store> Agenda<S, SystemClock> {
    pub fn new(store: S) -> Self {
        Agenda::with_clock(store, SystemClock, OperatingHours::default())
    }
}

impl<S: Store, C: Clock> Agenda<S, C> {
    pub fn with_clock(store: S, clock: C, hours: OperatingHours) -> Self {
        Agenda {
            store,
            clock,
            hours,
        }
    }

    pub fn operating_hours(&self) -> OperatingHours {
        self.hours
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn registry(&self) -> &Registry {
        self.store.read()
    }

    /// Register a new patient.
    pub fn register_patient(
        &mut self,
        name: &str,
        birth_date: NaiveDate,
        phone: &str,
    ) -> Result<Patient> {
        let name = name.trim();
        let phone = phone.trim();

        if !validate_person_name(name) {
            warn!("Rejected patient name '{}'", name);
            return Err(AgendaError::validation(
                "name",
                "use letters and spaces only, at least 4 characters",
            ));
        }
        validate_birth_date(birth_date, self.clock.today())?;
        if !validate_phone(phone) {
            return Err(AgendaError::validation(
                "phone",
                "use digits only, at least 8 of them",
            ));
        }

        let patient = self.store.write(|registry| {
            if let Some(existing) = registry.find_patient_by_name(name) {
                return Err(AgendaError::Duplicate {
                    entity: Entity::Patient,
                    name: existing.name.clone(),
                });
            }
            Ok(registry.insert_patient(name.to_string(), birth_date, phone.to_string()))
        })?;

        info!("Registered patient {} (ID {})", patient.name, patient.id);
        Ok(patient)
    }

    /// Register a new doctor.
    pub fn register_doctor(&mut self, name: &str, specialty: &str) -> Result<Doctor> {
        let name = name.trim();
        let specialty = specialty.trim();

        if !validate_person_name(name) {
            warn!("Rejected doctor name '{}'", name);
            return Err(AgendaError::validation(
                "name",
                "use letters and spaces only, at least 4 characters",
            ));
        }
        if !validate_text(specialty) {
            return Err(AgendaError::validation(
                "specialty",
                "use letters and spaces only",
            ));
        }

        let doctor = self.store.write(|registry| {
            if let Some(existing) = registry.find_doctor_by_name(name) {
                return Err(AgendaError::Duplicate {
                    entity: Entity::Doctor,
                    name: existing.name.clone(),
                });
            }
            Ok(registry.insert_doctor(name.to_string(), specialty.to_string()))
        })?;

        info!("Registered doctor {} (ID {})", doctor.name, doctor.id);
        Ok(doctor)
    }

    fn check_slot_time(&self, when: NaiveDateTime) -> Result<()> {
        if when < self.clock.now() {
            return Err(AgendaError::validation("date", "cannot book in the past"));
        }
        if !self.hours.contains(when.time()) {
            return Err(AgendaError::validation(
                "time",
                format!("appointments must start between {}", self.hours),
            ));
        }
        Ok(())
    }

    fn require_patient(&self, id: PatientId) -> Result<&Patient> {
        self.registry().patient(id).ok_or(AgendaError::NotFound {
            entity: Entity::Patient,
            id: id.get(),
        })
    }

    fn require_doctor(&self, id: DoctorId) -> Result<&Doctor> {
        self.registry().doctor(id).ok_or(AgendaError::NotFound {
            entity: Entity::Doctor,
            id: id.get(),
        })
    }

    fn require_appointment(&self, id: AppointmentId) -> Result<&Appointment> {
        self.registry().appointment(id).ok_or(AgendaError::NotFound {
            entity: Entity::Appointment,
            id: id.get(),
        })
    }

    /// Book an appointment in `Pending` status.
    pub fn book_appointment(
        &mut self,
        patient_id: PatientId,
        doctor_id: DoctorId,
        when: NaiveDateTime,
        reason: &str,
    ) -> Result<Appointment> {
        self.require_patient(patient_id)?;
        self.require_doctor(doctor_id)?;
        self.check_slot_time(when)?;
        let reason = reason.trim();
        if !validate_nonempty(reason) {
            return Err(AgendaError::validation("reason", "cannot be empty"));
        }

        let appointment = self
            .store
            .write(|registry| {
                registry.insert_appointment(patient_id, doctor_id, when, reason.to_string())
            })
            .map_err(|e| {
                warn!("Booking for doctor {} at {} rejected: {}", doctor_id, when, e);
                e
            })?;

        info!(
            "Booked appointment {} for patient {} with doctor {} at {}",
            appointment.id, patient_id, doctor_id, when
        );
        Ok(appointment)
    }

    /// Close a pending appointment as attended and record it in the
    /// patient's history.
    pub fn mark_attended(&mut self, appointment_id: AppointmentId, notes: &str) -> Result<()> {
        let notes = notes.trim().to_string();

        self.store.write(|registry| {
            let appointment = registry.close_appointment(
                appointment_id,
                AppointmentStatus::Attended,
                Some(notes.clone()),
            )?;
            let doctor_name = registry
                .doctor(appointment.doctor_id)
                .map(|d| d.name.clone())
                .ok_or_else(|| {
                    AgendaError::storage(format!(
                        "appointment {} references missing doctor {}",
                        appointment.id, appointment.doctor_id
                    ))
                })?;
            registry.append_history(
                appointment.patient_id,
                HistoryEntry {
                    appointment_id: appointment.id,
                    date: appointment.when,
                    doctor_name,
                    reason: appointment.reason.clone(),
                    notes,
                },
            )
        })?;

        info!("Appointment {} marked as attended", appointment_id);
        Ok(())
    }

    /// Cancel a pending appointment. Cancelling twice is a no-op.
    pub fn cancel_appointment(&mut self, appointment_id: AppointmentId) -> Result<CancelOutcome> {
        if self.require_appointment(appointment_id)?.status == AppointmentStatus::Cancelled {
            info!("Appointment {} was already cancelled", appointment_id);
            return Ok(CancelOutcome::AlreadyCancelled);
        }

        self.store.write(|registry| {
            registry.close_appointment(appointment_id, AppointmentStatus::Cancelled, None)
        })?;

        info!("Appointment {} cancelled", appointment_id);
        Ok(CancelOutcome::Cancelled)
    }

    /// Move a pending appointment to another time, under the same rules as
    /// booking it.
    pub fn reschedule_appointment(
        &mut self,
        appointment_id: AppointmentId,
        when: NaiveDateTime,
    ) -> Result<Appointment> {
        let current = self.require_appointment(appointment_id)?;
        if !current.is_pending() {
            return Err(AgendaError::InvalidState {
                id: appointment_id,
                status: current.status,
                action: "rescheduled",
            });
        }
        self.check_slot_time(when)?;

        let appointment = self
            .store
            .write(|registry| registry.move_appointment(appointment_id, when))?;

        info!("Appointment {} rescheduled to {}", appointment_id, when);
        Ok(appointment)
    }

    /// Pending appointments from now on, earliest first.
    pub fn list_upcoming(&self) -> Vec<Appointment> {
        let now = self.clock.now();
        let mut upcoming: Vec<Appointment> = self
            .registry()
            .appointments()
            .filter(|a| a.is_pending() && a.when >= now)
            .cloned()
            .collect();
        upcoming.sort_by_key(|a| (a.when, a.id));
        debug!("{} upcoming appointments", upcoming.len());
        upcoming
    }

    /// Attended appointments of a patient, most recent first.
    pub fn patient_history(&self, patient_id: PatientId) -> Result<Vec<HistoryEntry>> {
        let mut history = self.require_patient(patient_id)?.history.clone();
        history.sort_by(|a, b| b.date.cmp(&a.date).then(b.appointment_id.cmp(&a.appointment_id)));
        Ok(history)
    }

    pub fn list_patients(&self) -> Vec<Patient> {
        self.registry().patients().cloned().collect()
    }

    pub fn list_doctors(&self) -> Vec<Doctor> {
        self.registry().doctors().cloned().collect()
    }

    /// Every appointment regardless of status, earliest first.
    pub fn all_appointments(&self) -> Vec<Appointment> {
        let mut appointments: Vec<Appointment> =
            self.registry().appointments().cloned().collect();
        appointments.sort_by_key(|a| (a.when, a.id));
        appointments
    }

    /// Every appointment of one patient, earliest first.
    pub fn appointments_for_patient(&self, patient_id: PatientId) -> Result<Vec<Appointment>> {
        self.require_patient(patient_id)?;
        Ok(self
            .all_appointments()
            .into_iter()
            .filter(|a| a.patient_id == patient_id)
            .collect())
    }

    /// Pending bookings of one doctor, earliest first.
    pub fn doctor_schedule(&self, doctor_id: DoctorId) -> Result<Vec<Appointment>> {
        self.require_doctor(doctor_id)?;
        let registry = self.registry();
        Ok(registry
            .calendar()
            .bookings_for(doctor_id)
            .into_iter()
            .filter_map(|(_, id)| registry.appointment(id).cloned())
            .collect())
    }

    pub fn get_patient(&self, id: PatientId) -> Result<Patient> {
        self.require_patient(id).cloned()
    }

    pub fn get_doctor(&self, id: DoctorId) -> Result<Doctor> {
        self.require_doctor(id).cloned()
    }

    pub fn get_appointment(&self, id: AppointmentId) -> Result<Appointment> {
        self.require_appointment(id).cloned()
    }
}
