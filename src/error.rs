use crate::models::{AppointmentId, AppointmentStatus, DoctorId};
use chrono::NaiveDateTime;
use thiserror::Error;

/// Broad category of an [`AgendaError`], used by callers to decide how to
/// report a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Duplicate,
    Conflict,
    InvalidState,
    Storage,
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Patient,
    Doctor,
    Appointment,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Entity::Patient => "patient",
            Entity::Doctor => "doctor",
            Entity::Appointment => "appointment",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum AgendaError {
    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("'{value}' does not match the expected format '{format}'")]
    Format { value: String, format: String },

    #[error("No {entity} with ID {id}")]
    NotFound { entity: Entity, id: u32 },

    #[error("A {entity} named '{name}' is already registered")]
    Duplicate { entity: Entity, name: String },

    #[error("Doctor {doctor_id} already has appointment {existing} pending at {when}")]
    Conflict {
        doctor_id: DoctorId,
        when: NaiveDateTime,
        existing: AppointmentId,
    },

    #[error("Appointment {id} is {status} and cannot be {action}")]
    InvalidState {
        id: AppointmentId,
        status: AppointmentStatus,
        action: &'static str,
    },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AgendaError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        AgendaError::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        AgendaError::Storage {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AgendaError::Validation { .. } | AgendaError::Format { .. } => ErrorKind::Validation,
            AgendaError::NotFound { .. } => ErrorKind::NotFound,
            AgendaError::Duplicate { .. } => ErrorKind::Duplicate,
            AgendaError::Conflict { .. } => ErrorKind::Conflict,
            AgendaError::InvalidState { .. } => ErrorKind::InvalidState,
            AgendaError::Storage { .. } | AgendaError::Io(_) | AgendaError::Serialization(_) => {
                ErrorKind::Storage
            }
            AgendaError::Config { .. } => ErrorKind::Config,
        }
    }
}

impl From<toml::de::Error> for AgendaError {
    fn from(err: toml::de::Error) -> Self {
        AgendaError::Config {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AgendaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_is_a_validation_kind() {
        let err = AgendaError::Format {
            value: "10/01/2030".to_string(),
            format: "%Y-%m-%d".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_not_found_message_names_entity() {
        let err = AgendaError::NotFound {
            entity: Entity::Doctor,
            id: 7,
        };
        assert_eq!(err.to_string(), "No doctor with ID 7");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_io_errors_are_storage_kind() {
        let err: AgendaError = std::io::Error::new(std::io::ErrorKind::Other, "disk").into();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }
}
