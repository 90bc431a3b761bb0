//! Data models for the medical agenda.
//!
//! This module defines the core records kept by the agenda:
//! - Patient: registered patient and their attended-appointment history
//! - Doctor: registered doctor and specialty
//! - Appointment: a booking between one patient and one doctor
//! - AppointmentStatus: the pending -> attended / cancelled lifecycle
//! - HistoryEntry: one attended appointment retained on the patient

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! record_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            pub fn get(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(PatientId);
record_id!(DoctorId);
record_id!(AppointmentId);

/// Lifecycle state of an appointment.
///
/// `Pending` is the only state that accepts transitions; `Attended` and
/// `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Attended,
    Cancelled,
}

impl AppointmentStatus {
    /// Convert a string to an AppointmentStatus value.
    pub fn from_string(value: &str) -> Result<Self, String> {
        match value.to_lowercase().trim() {
            "pending" => Ok(AppointmentStatus::Pending),
            "attended" => Ok(AppointmentStatus::Attended),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            _ => Err(format!(
                "Invalid status: '{}'. Must be one of: pending, attended, cancelled",
                value
            )),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Attended => "attended",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AppointmentStatus::Pending)
    }

    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        matches!(
            (self, next),
            (AppointmentStatus::Pending, AppointmentStatus::Attended)
                | (AppointmentStatus::Pending, AppointmentStatus::Cancelled)
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One attended appointment, kept on the patient for later review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub appointment_id: AppointmentId,
    pub date: NaiveDateTime,
    pub doctor_name: String,
    pub reason: String,
    pub notes: String,
}

/// Represents a patient registered in the agenda.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patient {
    pub id: PatientId,
    pub name: String,
    pub birth_date: NaiveDate,
    pub phone: String,
    pub history: Vec<HistoryEntry>,
}

impl Patient {
    pub fn new(id: PatientId, name: String, birth_date: NaiveDate, phone: String) -> Self {
        Patient {
            id,
            name,
            birth_date,
            phone,
            history: Vec::new(),
        }
    }
}

/// Represents a doctor registered in the agenda.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Doctor {
    pub id: DoctorId,
    pub name: String,
    pub specialty: String,
}

/// Represents an appointment between a patient and a doctor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appointment {
    pub id: AppointmentId,
    pub patient_id: PatientId,
    pub doctor_id: DoctorId,
    pub when: NaiveDateTime,
    pub reason: String,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
}

impl Appointment {
    /// Create a new appointment in `Pending` status.
    pub fn new(
        id: AppointmentId,
        patient_id: PatientId,
        doctor_id: DoctorId,
        when: NaiveDateTime,
        reason: String,
    ) -> Self {
        Appointment {
            id,
            patient_id,
            doctor_id,
            when,
            reason,
            status: AppointmentStatus::Pending,
            notes: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == AppointmentStatus::Pending
    }
}

/// Result of a cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    /// The appointment was cancelled before; nothing changed.
    AlreadyCancelled,
}
