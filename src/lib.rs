pub mod calendar;
pub mod clock;
pub mod config;
pub mod console;
pub mod error;
pub mod logger;
pub mod models;
pub mod scheduler;
pub mod store;
pub mod validation;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AgendaConfig, CliArgs, OperatingHours};
pub use console::Console;
pub use error::{AgendaError, ErrorKind, Result};
pub use models::{
    Appointment, AppointmentId, AppointmentStatus, CancelOutcome, Doctor, DoctorId, HistoryEntry,
    Patient, PatientId,
};
pub use scheduler::Agenda;
pub use store::{JsonFileStore, MemoryStore, Registry, Store};
