use agenda_medica::store::rows::Snapshot;
use agenda_medica::{
    Agenda, AgendaError, AppointmentStatus, DoctorId, FixedClock, JsonFileStore, OperatingHours,
    PatientId, Store,
};
use chrono::{NaiveDate, NaiveDateTime};
use tempfile::TempDir;

fn at(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn open(path: &std::path::Path) -> Agenda<JsonFileStore, FixedClock> {
    Agenda::with_clock(
        JsonFileStore::open(path).unwrap(),
        FixedClock::new(at(2026, 10, 16, 8)),
        OperatingHours::default(),
    )
}

#[test]
fn test_agenda_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("agenda.json");

    {
        let mut agenda = open(&path);
        agenda
            .register_patient(
                "Ana Torres",
                NaiveDate::from_ymd_opt(1990, 5, 1).unwrap(),
                "12345678",
            )
            .unwrap();
        agenda.register_doctor("Luis Paz", "Cardiologia").unwrap();
        let first = agenda
            .book_appointment(PatientId(1), DoctorId(1), at(2027, 1, 5, 9), "primera")
            .unwrap();
        let second = agenda
            .book_appointment(PatientId(1), DoctorId(1), at(2027, 2, 5, 9), "segunda")
            .unwrap();
        agenda
            .book_appointment(PatientId(1), DoctorId(1), at(2030, 1, 10, 9), "pendiente")
            .unwrap();
        agenda.mark_attended(first.id, "bien").unwrap();
        agenda.mark_attended(second.id, "mejor").unwrap();
    }

    let mut agenda = open(&path);
    assert_eq!(agenda.list_patients().len(), 1);
    assert_eq!(agenda.list_doctors().len(), 1);

    let history: Vec<_> = agenda
        .patient_history(PatientId(1))
        .unwrap()
        .into_iter()
        .map(|h| h.notes)
        .collect();
    assert_eq!(history, vec!["mejor", "bien"]);

    // The pending booking is still protected after reload.
    let err = agenda
        .book_appointment(PatientId(1), DoctorId(1), at(2030, 1, 10, 9), "otra")
        .unwrap_err();
    assert!(matches!(err, AgendaError::Conflict { .. }));

    // Id sequences continue where they stopped.
    let doctor = agenda.register_doctor("Rosa Vega", "Pediatria").unwrap();
    assert_eq!(doctor.id, DoctorId(2));
    let apt = agenda
        .book_appointment(PatientId(1), DoctorId(2), at(2030, 1, 10, 9), "otra")
        .unwrap();
    assert_eq!(apt.id.get(), 4);
}

#[test]
fn test_file_holds_flat_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("agenda.json");

    let mut agenda = open(&path);
    agenda
        .register_patient(
            "Ana Torres",
            NaiveDate::from_ymd_opt(1990, 5, 1).unwrap(),
            "12345678",
        )
        .unwrap();
    agenda.register_doctor("Luis Paz", "Cardiologia").unwrap();
    let apt = agenda
        .book_appointment(PatientId(1), DoctorId(1), at(2030, 1, 10, 9), "chequeo")
        .unwrap();
    agenda.mark_attended(apt.id, "todo bien").unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let snapshot: Snapshot = serde_json::from_str(&content).unwrap();
    assert_eq!(snapshot.patients[0].birth_date, "1990-05-01");
    assert_eq!(snapshot.appointments[0].when, "2030-01-10T09:00:00");
    assert_eq!(snapshot.appointments[0].status, "attended");
    assert_eq!(snapshot.appointments[0].notes.as_deref(), Some("todo bien"));
    assert_eq!(snapshot.history.len(), 1);
    assert_eq!(snapshot.history[0].doctor_name, "Luis Paz");
}

#[test]
fn test_rejected_operation_leaves_file_unchanged() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("agenda.json");

    let mut agenda = open(&path);
    agenda
        .register_patient(
            "Ana Torres",
            NaiveDate::from_ymd_opt(1990, 5, 1).unwrap(),
            "12345678",
        )
        .unwrap();
    let before = std::fs::read_to_string(&path).unwrap();

    assert!(agenda
        .register_patient(
            "ana torres",
            NaiveDate::from_ymd_opt(1991, 5, 1).unwrap(),
            "87654321",
        )
        .is_err());
    assert!(agenda.cancel_appointment(agenda_medica::AppointmentId(3)).is_err());

    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    assert_eq!(agenda.store().read().patients().count(), 1);
}

#[test]
fn test_tampered_file_with_double_booking_is_refused() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("agenda.json");
    std::fs::write(
        &path,
        r#"{
  "patients": [{"id": 1, "name": "Ana Torres", "birth_date": "1990-05-01", "phone": "12345678"}],
  "doctors": [{"id": 1, "name": "Luis Paz", "specialty": "Cardiologia"}],
  "appointments": [
    {"id": 1, "patient_id": 1, "doctor_id": 1, "when": "2030-01-10T09:00:00", "reason": "a", "status": "pending"},
    {"id": 2, "patient_id": 1, "doctor_id": 1, "when": "2030-01-10T09:00:00", "reason": "b", "status": "pending"}
  ]
}"#,
    )
    .unwrap();

    let err = JsonFileStore::open(&path).unwrap_err();
    assert!(matches!(err, AgendaError::Storage { .. }));

    // A cancelled duplicate is fine.
    let fixed = std::fs::read_to_string(&path)
        .unwrap()
        .replacen(r#""reason": "b", "status": "pending""#, r#""reason": "b", "status": "cancelled""#, 1);
    std::fs::write(&path, fixed).unwrap();
    let store = JsonFileStore::open(&path).unwrap();
    let statuses: Vec<_> = store.read().appointments().map(|a| a.status).collect();
    assert_eq!(
        statuses,
        vec![AppointmentStatus::Pending, AppointmentStatus::Cancelled]
    );
}
