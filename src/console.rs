//! Menu-driven console for the agenda.
//!
//! The console reads from any `BufRead` and writes to any `Write`, so the
//! binary hands it stdin/stdout while tests feed it a scripted session.

use crate::clock::Clock;
use crate::config::FormatConfig;
use crate::models::{AppointmentId, CancelOutcome, DoctorId, PatientId};
use crate::scheduler::Agenda;
use crate::store::Store;
use crate::validation::{
    validate_date, validate_datetime, validate_nonempty, validate_person_name, validate_phone,
    validate_text,
};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::io::{self, BufRead, Write};

pub struct Console<R, W, S: Store, C: Clock> {
    agenda: Agenda<S, C>,
    formats: FormatConfig,
    input: R,
    output: W,
    running: bool,
}

impl<R: BufRead, W: Write, S: Store, C: Clock> Console<R, W, S, C> {
    pub fn new(agenda: Agenda<S, C>, formats: FormatConfig, input: R, output: W) -> Self {
        Console {
            agenda,
            formats,
            input,
            output,
            running: true,
        }
    }

    pub fn agenda(&self) -> &Agenda<S, C> {
        &self.agenda
    }

    pub fn into_parts(self) -> (Agenda<S, C>, W) {
        (self.agenda, self.output)
    }

    fn print_header(&mut self) -> io::Result<()> {
        writeln!(self.output, "\n{}", "=".repeat(60))?;
        writeln!(self.output, "       MEDICAL AGENDA")?;
        writeln!(self.output, "{}", "=".repeat(60))
    }

    fn print_menu(&mut self) -> io::Result<()> {
        writeln!(self.output, "\n--- Main Menu ---")?;
        writeln!(self.output, "1. Register patient")?;
        writeln!(self.output, "2. Register doctor")?;
        writeln!(self.output, "3. Book appointment")?;
        writeln!(self.output, "4. List upcoming appointments")?;
        writeln!(self.output, "5. Mark appointment as attended")?;
        writeln!(self.output, "6. View patient history")?;
        writeln!(self.output, "7. List patients")?;
        writeln!(self.output, "8. List doctors")?;
        writeln!(self.output, "9. Cancel appointment")?;
        writeln!(self.output, "10. Reschedule appointment")?;
        writeln!(self.output, "11. Run demo")?;
        writeln!(self.output, "0. Exit")?;
        writeln!(self.output, "{}", "-".repeat(20))
    }

    /// Read one trimmed line; `None` once input is exhausted.
    fn get_input(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}: ", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            self.running = false;
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Prompt until `accept` turns the answer into a value.
    fn ask<T>(
        &mut self,
        prompt: &str,
        mut accept: impl FnMut(&str) -> Result<T, String>,
    ) -> io::Result<Option<T>> {
        loop {
            let Some(answer) = self.get_input(prompt)? else {
                return Ok(None);
            };
            match accept(&answer) {
                Ok(value) => return Ok(Some(value)),
                Err(message) => writeln!(self.output, "{}", message)?,
            }
        }
    }

    fn ask_checked(
        &mut self,
        prompt: &str,
        check: fn(&str) -> bool,
        message: &str,
    ) -> io::Result<Option<String>> {
        self.ask(prompt, |answer| {
            if check(answer) {
                Ok(answer.to_string())
            } else {
                Err(message.to_string())
            }
        })
    }

    fn ask_id(&mut self, prompt: &str) -> io::Result<Option<u32>> {
        self.ask(prompt, |answer| {
            answer
                .parse::<u32>()
                .map_err(|_| "Please enter a valid number".to_string())
        })
    }

    fn ask_date(&mut self, prompt: &str) -> io::Result<Option<NaiveDate>> {
        let format = self.formats.date.clone();
        let prompt = format!("{} ({})", prompt, format);
        self.ask(&prompt, |answer| {
            validate_date(answer, &format).map_err(|e| e.to_string())
        })
    }

    fn ask_datetime(&mut self, prompt: &str) -> io::Result<Option<NaiveDateTime>> {
        let format = self.formats.datetime.clone();
        let prompt = format!("{} ({})", prompt, format);
        self.ask(&prompt, |answer| {
            validate_datetime(answer, &format).map_err(|e| e.to_string())
        })
    }

    fn report_error(&mut self, error: impl std::fmt::Display) -> io::Result<()> {
        writeln!(self.output, "\nError: {}", error)
    }

    fn patient_name(&self, id: PatientId) -> String {
        self.agenda
            .get_patient(id)
            .map(|p| p.name)
            .unwrap_or_else(|_| format!("#{}", id))
    }

    fn doctor_name(&self, id: DoctorId) -> String {
        self.agenda
            .get_doctor(id)
            .map(|d| d.name)
            .unwrap_or_else(|_| format!("#{}", id))
    }

    fn register_patient(&mut self) -> io::Result<()> {
        writeln!(self.output, "\n--- Register Patient ---")?;

        let Some(name) = self.ask_checked(
            "Full name",
            validate_person_name,
            "Name must use letters and spaces only, at least 4 characters",
        )?
        else {
            return Ok(());
        };
        let Some(birth_date) = self.ask_date("Birth date")? else {
            return Ok(());
        };
        let Some(phone) = self.ask_checked(
            "Phone",
            validate_phone,
            "Phone must use digits only, at least 8 of them",
        )?
        else {
            return Ok(());
        };

        match self.agenda.register_patient(&name, birth_date, &phone) {
            Ok(patient) => writeln!(
                self.output,
                "\nPatient registered: {} (ID {})",
                patient.name, patient.id
            ),
            Err(e) => self.report_error(e),
        }
    }

    fn register_doctor(&mut self) -> io::Result<()> {
        writeln!(self.output, "\n--- Register Doctor ---")?;

        let Some(name) = self.ask_checked(
            "Full name",
            validate_person_name,
            "Name must use letters and spaces only, at least 4 characters",
        )?
        else {
            return Ok(());
        };
        let Some(specialty) = self.ask_checked(
            "Specialty",
            validate_text,
            "Specialty must use letters and spaces only",
        )?
        else {
            return Ok(());
        };

        match self.agenda.register_doctor(&name, &specialty) {
            Ok(doctor) => writeln!(
                self.output,
                "\nDoctor registered: {} (ID {})",
                doctor.name, doctor.id
            ),
            Err(e) => self.report_error(e),
        }
    }

    fn book_appointment(&mut self) -> io::Result<()> {
        writeln!(self.output, "\n--- Book Appointment ---")?;

        let Some(patient_id) = self.ask_id("Patient ID")? else {
            return Ok(());
        };
        let Some(doctor_id) = self.ask_id("Doctor ID")? else {
            return Ok(());
        };
        let Some(when) = self.ask_datetime("Date and time")? else {
            return Ok(());
        };
        let Some(reason) =
            self.ask_checked("Reason", validate_nonempty, "Reason cannot be empty")?
        else {
            return Ok(());
        };

        match self.agenda.book_appointment(
            PatientId(patient_id),
            DoctorId(doctor_id),
            when,
            &reason,
        ) {
            Ok(apt) => {
                let patient = self.patient_name(apt.patient_id);
                let doctor = self.doctor_name(apt.doctor_id);
                writeln!(
                    self.output,
                    "\nAppointment {} booked: {} with {} on {}",
                    apt.id,
                    patient,
                    doctor,
                    apt.when.format(&self.formats.datetime)
                )
            }
            Err(e) => self.report_error(e),
        }
    }

    fn list_upcoming(&mut self) -> io::Result<()> {
        let upcoming = self.agenda.list_upcoming();
        if upcoming.is_empty() {
            return writeln!(self.output, "\nNo upcoming appointments");
        }

        writeln!(self.output, "\n--- Upcoming Appointments ({}) ---", upcoming.len())?;
        for apt in &upcoming {
            let patient = self.patient_name(apt.patient_id);
            let doctor = self.doctor_name(apt.doctor_id);
            writeln!(
                self.output,
                "  ID {}: {} - Patient: {}, Doctor: {} ({})",
                apt.id,
                apt.when.format(&self.formats.datetime),
                patient,
                doctor,
                apt.reason
            )?;
        }
        Ok(())
    }

    fn mark_attended(&mut self) -> io::Result<()> {
        writeln!(self.output, "\n--- Mark Attended ---")?;

        let Some(id) = self.ask_id("Appointment ID")? else {
            return Ok(());
        };
        let Some(notes) = self.get_input("Attendance notes")? else {
            return Ok(());
        };

        match self.agenda.mark_attended(AppointmentId(id), &notes) {
            Ok(()) => writeln!(self.output, "\nAppointment {} marked as attended", id),
            Err(e) => self.report_error(e),
        }
    }

    fn view_history(&mut self) -> io::Result<()> {
        let Some(id) = self.ask_id("Patient ID")? else {
            return Ok(());
        };
        let patient_id = PatientId(id);

        let history = match self.agenda.patient_history(patient_id) {
            Ok(history) => history,
            Err(e) => return self.report_error(e),
        };
        let name = self.patient_name(patient_id);
        if history.is_empty() {
            return writeln!(self.output, "\nNo medical history for {}", name);
        }

        writeln!(self.output, "\n--- Medical history of {} ---", name)?;
        for entry in &history {
            writeln!(
                self.output,
                "  - {}: Doctor {}, Reason: {}, Notes: {}",
                entry.date.format(&self.formats.datetime),
                entry.doctor_name,
                entry.reason,
                entry.notes
            )?;
        }
        Ok(())
    }

    fn list_patients(&mut self) -> io::Result<()> {
        let patients = self.agenda.list_patients();
        if patients.is_empty() {
            return writeln!(self.output, "\nNo patients registered");
        }

        writeln!(self.output, "\n--- Patients ({}) ---", patients.len())?;
        for p in &patients {
            writeln!(
                self.output,
                "  ID {}: {}, Born: {}, Phone: {}",
                p.id,
                p.name,
                p.birth_date.format(&self.formats.date),
                p.phone
            )?;
        }
        Ok(())
    }

    fn list_doctors(&mut self) -> io::Result<()> {
        let doctors = self.agenda.list_doctors();
        if doctors.is_empty() {
            return writeln!(self.output, "\nNo doctors registered");
        }

        writeln!(self.output, "\n--- Doctors ({}) ---", doctors.len())?;
        for d in &doctors {
            writeln!(self.output, "  ID {}: {}, Specialty: {}", d.id, d.name, d.specialty)?;
        }
        Ok(())
    }

    fn cancel_appointment(&mut self) -> io::Result<()> {
        writeln!(self.output, "\n--- Cancel Appointment ---")?;

        let Some(id) = self.ask_id("Appointment ID (0 to go back)")? else {
            return Ok(());
        };
        if id == 0 {
            return Ok(());
        }

        match self.agenda.cancel_appointment(AppointmentId(id)) {
            Ok(CancelOutcome::Cancelled) => {
                writeln!(self.output, "\nAppointment {} cancelled", id)
            }
            Ok(CancelOutcome::AlreadyCancelled) => {
                writeln!(self.output, "\nAppointment {} was already cancelled", id)
            }
            Err(e) => self.report_error(e),
        }
    }

    fn reschedule_appointment(&mut self) -> io::Result<()> {
        writeln!(self.output, "\n--- Reschedule Appointment ---")?;

        let Some(id) = self.ask_id("Appointment ID")? else {
            return Ok(());
        };
        let Some(when) = self.ask_datetime("New date and time")? else {
            return Ok(());
        };

        match self.agenda.reschedule_appointment(AppointmentId(id), when) {
            Ok(apt) => writeln!(
                self.output,
                "\nAppointment {} moved to {}",
                apt.id,
                apt.when.format(&self.formats.datetime)
            ),
            Err(e) => self.report_error(e),
        }
    }

    fn run_demo(&mut self) -> io::Result<()> {
        writeln!(self.output, "\n--- Running Demo ---")?;

        let tomorrow = self.agenda.now().date() + Duration::days(1);
        let when = tomorrow.and_time(NaiveTime::MIN + Duration::hours(9));
        let birth_date = NaiveDate::from_ymd_opt(1990, 5, 1).unwrap_or_default();

        let result = self
            .agenda
            .register_patient("Ana Torres", birth_date, "12345678")
            .and_then(|patient| {
                let doctor = self.agenda.register_doctor("Luis Paz", "Cardiologia")?;
                Ok((patient, doctor))
            })
            .and_then(|(patient, doctor)| {
                self.agenda
                    .book_appointment(patient.id, doctor.id, when, "chequeo")
            });

        match result {
            Ok(apt) => {
                writeln!(
                    self.output,
                    "Booked appointment {} on {}",
                    apt.id,
                    apt.when.format(&self.formats.datetime)
                )?;
                if let Err(e) = self
                    .agenda
                    .book_appointment(apt.patient_id, apt.doctor_id, when, "segunda cita")
                {
                    writeln!(self.output, "Second booking at the same time refused: {}", e)?;
                }
                if let Err(e) = self.agenda.mark_attended(apt.id, "todo bien") {
                    return self.report_error(e);
                }
                writeln!(self.output, "Appointment {} marked as attended", apt.id)?;
                if let Err(e) = self.agenda.cancel_appointment(apt.id) {
                    writeln!(self.output, "Cancelling it afterwards refused: {}", e)?;
                }
                Ok(())
            }
            Err(e) => self.report_error(format!("demo could not run: {}", e)),
        }
    }

    pub fn run(&mut self) -> io::Result<()> {
        self.print_header()?;

        while self.running {
            self.print_menu()?;

            let Some(choice) = self.get_input("Enter choice")? else {
                break;
            };

            match choice.as_str() {
                "1" => self.register_patient()?,
                "2" => self.register_doctor()?,
                "3" => self.book_appointment()?,
                "4" => self.list_upcoming()?,
                "5" => self.mark_attended()?,
                "6" => self.view_history()?,
                "7" => self.list_patients()?,
                "8" => self.list_doctors()?,
                "9" => self.cancel_appointment()?,
                "10" => self.reschedule_appointment()?,
                "11" => self.run_demo()?,
                "0" => {
                    self.running = false;
                    writeln!(self.output, "\nGoodbye!")?;
                }
                _ => writeln!(self.output, "Invalid choice")?,
            }
        }

        self.output.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::config::OperatingHours;
    use crate::store::MemoryStore;
    use std::io::Cursor;

    fn run_session(script: &str) -> (Agenda<MemoryStore, FixedClock>, String) {
        let now = NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let agenda = Agenda::with_clock(
            MemoryStore::new(),
            FixedClock::new(now),
            OperatingHours::default(),
        );
        let mut console = Console::new(
            agenda,
            FormatConfig::default(),
            Cursor::new(script.as_bytes().to_vec()),
            Vec::new(),
        );
        console.run().unwrap();
        let (agenda, output) = console.into_parts();
        (agenda, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_exit_and_invalid_choice() {
        let (_, output) = run_session("42\n0\n");
        assert!(output.contains("Invalid choice"));
        assert!(output.contains("Goodbye!"));
    }

    #[test]
    fn test_end_of_input_stops_the_loop() {
        let (_, output) = run_session("7\n");
        assert!(output.contains("No patients registered"));
        assert!(!output.contains("Goodbye!"));
    }

    #[test]
    fn test_register_and_book_session() {
        let script = "\
1
Ana Torres
1990-05-01
12345678
2
Luis Paz
Cardiologia
3
1
1
2030-01-10 09:00
chequeo
3
1
1
2030-01-10 09:00
otra
4
0
";
        let (agenda, output) = run_session(script);
        assert!(output.contains("Patient registered: Ana Torres (ID 1)"));
        assert!(output.contains("Doctor registered: Luis Paz (ID 1)"));
        assert!(output.contains("Appointment 1 booked: Ana Torres with Luis Paz on 2030-01-10 09:00"));
        assert!(output.contains("Error: Doctor 1 already has appointment 1 pending"));
        assert!(output.contains("ID 1: 2030-01-10 09:00 - Patient: Ana Torres, Doctor: Luis Paz"));
        assert_eq!(agenda.all_appointments().len(), 1);
    }

    #[test]
    fn test_bad_fields_reprompt() {
        let script = "\
1
Ana
Ana Torres
01/05/1990
1990-05-01
1234
12345678
0
";
        let (agenda, output) = run_session(script);
        assert!(output.contains("Name must use letters and spaces only"));
        assert!(output.contains("does not match the expected format"));
        assert!(output.contains("Phone must use digits only"));
        assert_eq!(agenda.list_patients().len(), 1);
    }

    #[test]
    fn test_attend_history_and_cancel_session() {
        let script = "\
11
5
1
otra nota
6
1
9
1
0
";
        let (_, output) = run_session(script);
        assert!(output.contains("Booked appointment 1 on 2026-10-17 09:00"));
        assert!(output.contains("Second booking at the same time refused"));
        assert!(output.contains("Cancelling it afterwards refused"));
        assert!(output.contains("Error: Appointment 1 is attended and cannot be marked attended"));
        assert!(output.contains("Medical history of Ana Torres"));
        assert!(output.contains("Doctor Luis Paz, Reason: chequeo, Notes: todo bien"));
        assert!(output.contains("Error: Appointment 1 is attended and cannot be cancelled"));
    }

    #[test]
    fn test_demo_twice_reports_duplicate() {
        let (_, output) = run_session("11\n11\n0\n");
        assert!(output.contains("demo could not run: A patient named 'Ana Torres' is already registered"));
    }
}
