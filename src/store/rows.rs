//! Flat, persisted shapes of the agenda records and the mapping between them
//! and the domain models. Rows carry dates and statuses as text; nothing
//! outside this module reads a row directly.

use crate::error::{AgendaError, Result};
use crate::models::{
    Appointment, AppointmentId, AppointmentStatus, Doctor, DoctorId, HistoryEntry, Patient,
    PatientId,
};
use crate::store::Registry;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRow {
    pub id: u32,
    pub name: String,
    pub birth_date: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorRow {
    pub id: u32,
    pub name: String,
    pub specialty: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentRow {
    pub id: u32,
    pub patient_id: u32,
    pub doctor_id: u32,
    pub when: String,
    pub reason: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub patient_id: u32,
    pub appointment_id: u32,
    pub date: String,
    pub doctor_name: String,
    pub reason: String,
    pub notes: String,
}

/// Everything the JSON backend writes to disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub patients: Vec<PatientRow>,
    #[serde(default)]
    pub doctors: Vec<DoctorRow>,
    #[serde(default)]
    pub appointments: Vec<AppointmentRow>,
    #[serde(default)]
    pub history: Vec<HistoryRow>,
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| AgendaError::storage(format!("bad {} '{}': {}", field, value, e)))
}

fn parse_datetime(field: &str, value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, DATETIME_FORMAT)
        .map_err(|e| AgendaError::storage(format!("bad {} '{}': {}", field, value, e)))
}

impl TryFrom<PatientRow> for Patient {
    type Error = AgendaError;

    fn try_from(row: PatientRow) -> Result<Self> {
        let birth_date = parse_date("birth_date", &row.birth_date)?;
        Ok(Patient::new(PatientId(row.id), row.name, birth_date, row.phone))
    }
}

impl TryFrom<DoctorRow> for Doctor {
    type Error = AgendaError;

    fn try_from(row: DoctorRow) -> Result<Self> {
        Ok(Doctor {
            id: DoctorId(row.id),
            name: row.name,
            specialty: row.specialty,
        })
    }
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = AgendaError;

    fn try_from(row: AppointmentRow) -> Result<Self> {
        let status = AppointmentStatus::from_string(&row.status).map_err(AgendaError::storage)?;
        if row.notes.is_some() && status != AppointmentStatus::Attended {
            return Err(AgendaError::storage(format!(
                "appointment {} has notes but is {}",
                row.id, status
            )));
        }
        Ok(Appointment {
            id: AppointmentId(row.id),
            patient_id: PatientId(row.patient_id),
            doctor_id: DoctorId(row.doctor_id),
            when: parse_datetime("when", &row.when)?,
            reason: row.reason,
            status,
            notes: row.notes,
        })
    }
}

impl TryFrom<HistoryRow> for HistoryEntry {
    type Error = AgendaError;

    fn try_from(row: HistoryRow) -> Result<Self> {
        Ok(HistoryEntry {
            appointment_id: AppointmentId(row.appointment_id),
            date: parse_datetime("date", &row.date)?,
            doctor_name: row.doctor_name,
            reason: row.reason,
            notes: row.notes,
        })
    }
}

impl From<&Patient> for PatientRow {
    fn from(patient: &Patient) -> Self {
        PatientRow {
            id: patient.id.get(),
            name: patient.name.clone(),
            birth_date: patient.birth_date.format(DATE_FORMAT).to_string(),
            phone: patient.phone.clone(),
        }
    }
}

impl From<&Doctor> for DoctorRow {
    fn from(doctor: &Doctor) -> Self {
        DoctorRow {
            id: doctor.id.get(),
            name: doctor.name.clone(),
            specialty: doctor.specialty.clone(),
        }
    }
}

impl From<&Appointment> for AppointmentRow {
    fn from(appointment: &Appointment) -> Self {
        AppointmentRow {
            id: appointment.id.get(),
            patient_id: appointment.patient_id.get(),
            doctor_id: appointment.doctor_id.get(),
            when: appointment.when.format(DATETIME_FORMAT).to_string(),
            reason: appointment.reason.clone(),
            status: appointment.status.name().to_string(),
            notes: appointment.notes.clone(),
        }
    }
}

impl HistoryRow {
    fn from_entry(patient_id: PatientId, entry: &HistoryEntry) -> Self {
        HistoryRow {
            patient_id: patient_id.get(),
            appointment_id: entry.appointment_id.get(),
            date: entry.date.format(DATETIME_FORMAT).to_string(),
            doctor_name: entry.doctor_name.clone(),
            reason: entry.reason.clone(),
            notes: entry.notes.clone(),
        }
    }
}

impl Snapshot {
    pub fn from_registry(registry: &Registry) -> Self {
        let history = registry
            .patients()
            .flat_map(|p| p.history.iter().map(move |e| HistoryRow::from_entry(p.id, e)))
            .collect();

        Snapshot {
            patients: registry.patients().map(PatientRow::from).collect(),
            doctors: registry.doctors().map(DoctorRow::from).collect(),
            appointments: registry.appointments().map(AppointmentRow::from).collect(),
            history,
        }
    }

    /// Map every row into its domain type, then assemble the registry.
    pub fn into_registry(self) -> Result<Registry> {
        let mut patients = self
            .patients
            .into_iter()
            .map(|row| Patient::try_from(row).map(|p| (p.id, p)))
            .collect::<Result<BTreeMap<_, _>>>()?;

        for row in self.history {
            let patient_id = PatientId(row.patient_id);
            let entry = HistoryEntry::try_from(row)?;
            patients
                .get_mut(&patient_id)
                .ok_or_else(|| {
                    AgendaError::storage(format!(
                        "history entry references unknown patient {}",
                        patient_id
                    ))
                })?
                .history
                .push(entry);
        }

        let doctors = self
            .doctors
            .into_iter()
            .map(Doctor::try_from)
            .collect::<Result<Vec<_>>>()?;
        let appointments = self
            .appointments
            .into_iter()
            .map(Appointment::try_from)
            .collect::<Result<Vec<_>>>()?;

        Registry::from_records(patients.into_values().collect(), doctors, appointments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn appointment_row(status: &str, notes: Option<&str>) -> AppointmentRow {
        AppointmentRow {
            id: 1,
            patient_id: 1,
            doctor_id: 1,
            when: "2030-01-10T09:00:00".to_string(),
            reason: "chequeo".to_string(),
            status: status.to_string(),
            notes: notes.map(str::to_string),
        }
    }

    #[test]
    fn test_appointment_row_maps_status_and_time() {
        let apt = Appointment::try_from(appointment_row("attended", Some("todo bien"))).unwrap();
        assert_eq!(apt.status, AppointmentStatus::Attended);
        assert_eq!(apt.when.to_string(), "2030-01-10 09:00:00");
        assert_eq!(apt.notes.as_deref(), Some("todo bien"));
    }

    #[test]
    fn test_bad_rows_are_storage_errors() {
        assert!(matches!(
            Appointment::try_from(appointment_row("done", None)),
            Err(AgendaError::Storage { .. })
        ));
        assert!(Appointment::try_from(appointment_row("pending", Some("early notes"))).is_err());

        let patient = PatientRow {
            id: 1,
            name: "Ana Torres".to_string(),
            birth_date: "01/05/1990".to_string(),
            phone: "12345678".to_string(),
        };
        assert!(Patient::try_from(patient).is_err());
    }

    #[test]
    fn test_orphan_history_is_rejected() {
        let snapshot = Snapshot {
            history: vec![HistoryRow {
                patient_id: 4,
                appointment_id: 1,
                date: "2030-01-10T09:00:00".to_string(),
                doctor_name: "Luis Paz".to_string(),
                reason: "chequeo".to_string(),
                notes: String::new(),
            }],
            ..Snapshot::default()
        };
        assert!(snapshot.into_registry().is_err());
    }

    #[test]
    fn test_snapshot_json_shape() {
        let json = r#"{
            "patients": [{"id": 1, "name": "Ana Torres", "birth_date": "1990-05-01", "phone": "12345678"}],
            "doctors": [{"id": 1, "name": "Luis Paz", "specialty": "Cardiologia"}],
            "appointments": [{"id": 1, "patient_id": 1, "doctor_id": 1,
                              "when": "2030-01-10T09:00:00", "reason": "chequeo", "status": "pending"}]
        }"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        let registry = snapshot.into_registry().unwrap();
        assert_eq!(registry.calendar().len(), 1);
        assert_eq!(registry.patient(PatientId(1)).unwrap().history.len(), 0);
    }
}
