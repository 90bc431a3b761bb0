use crate::error::{AgendaError, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::fmt::{Display, Write};
use std::sync::OnceLock;

/// Letters (accented ones included) and whitespace only.
fn letters_and_spaces() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[\p{L}\s]+$").expect("static pattern"))
}

pub const MIN_NAME_CHARS: usize = 4;
pub const MIN_PHONE_DIGITS: usize = 8;
pub const MIN_BIRTH_YEAR: i32 = 1900;

/// True when `text` holds only letters and spaces and is not blank.
pub fn validate_text(text: &str) -> bool {
    validate_nonempty(text) && letters_and_spaces().is_match(text)
}

/// Person names: letters and spaces, more than three characters.
pub fn validate_person_name(text: &str) -> bool {
    validate_text(text) && text.chars().count() >= MIN_NAME_CHARS
}

pub fn validate_phone(text: &str) -> bool {
    text.len() >= MIN_PHONE_DIGITS && text.chars().all(|c| c.is_ascii_digit())
}

pub fn validate_nonempty(text: &str) -> bool {
    !text.trim().is_empty()
}

pub fn validate_date(text: &str, format: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), format).map_err(|_| AgendaError::Format {
        value: text.to_string(),
        format: format.to_string(),
    })
}

pub fn validate_datetime(text: &str, format: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text.trim(), format).map_err(|_| AgendaError::Format {
        value: text.to_string(),
        format: format.to_string(),
    })
}

/// Birth dates must not lie in the future nor before 1900.
pub fn validate_birth_date(birth_date: NaiveDate, today: NaiveDate) -> Result<()> {
    if birth_date.year() < MIN_BIRTH_YEAR {
        return Err(AgendaError::validation(
            "birth date",
            format!("year must be {} or later", MIN_BIRTH_YEAR),
        ));
    }
    if birth_date > today {
        return Err(AgendaError::validation(
            "birth date",
            "cannot be in the future",
        ));
    }
    Ok(())
}

/// Print a chrono `format(..)` result, or `None` when the pattern cannot be
/// printed for the value, such as an unknown specifier or `%z` on a naive time.
fn render<T: Display>(value: T) -> Option<String> {
    let mut shown = String::new();
    write!(shown, "{}", value).ok()?;
    Some(shown)
}

/// True when `format` can both print and read back a calendar date.
pub fn validate_date_pattern(format: &str) -> bool {
    let Some(sample) = NaiveDate::from_ymd_opt(2031, 7, 24) else {
        return false;
    };
    validate_nonempty(format)
        && render(sample.format(format))
            .and_then(|shown| NaiveDate::parse_from_str(&shown, format).ok())
            == Some(sample)
}

/// True when `format` can both print and read back a date with its time of
/// day, down to the minute.
pub fn validate_datetime_pattern(format: &str) -> bool {
    let Some(sample) = NaiveDate::from_ymd_opt(2031, 7, 24).and_then(|d| d.and_hms_opt(13, 47, 0))
    else {
        return false;
    };
    validate_nonempty(format)
        && render(sample.format(format))
            .and_then(|shown| NaiveDateTime::parse_from_str(&shown, format).ok())
            == Some(sample)
}
