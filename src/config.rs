use crate::error::{AgendaError, Result};
use crate::validation::{validate_date_pattern, validate_datetime_pattern};
use chrono::{NaiveTime, Timelike};
use clap::Parser;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Clone, Parser)]
#[command(name = "agenda-medica")]
#[command(about = "Console agenda for patients, doctors and appointments")]
pub struct CliArgs {
    #[arg(long, help = "TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "AGENDA_DATA", help = "JSON file to keep the agenda in")]
    pub data: Option<PathBuf>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgendaConfig {
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub formats: FormatConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub opens: String,
    pub closes: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            opens: "06:00".to_string(),
            closes: "20:00".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatConfig {
    pub date: String,
    pub datetime: String,
}

impl Default for FormatConfig {
    fn default() -> Self {
        FormatConfig {
            date: "%Y-%m-%d".to_string(),
            datetime: "%Y-%m-%d %H:%M".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON file for the agenda; in-memory when unset.
    pub path: Option<PathBuf>,
}

/// Time-of-day window in which appointments may start, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatingHours {
    pub opens: NaiveTime,
    pub closes: NaiveTime,
}

impl OperatingHours {
    pub fn new(opens: NaiveTime, closes: NaiveTime) -> Result<Self> {
        if opens > closes {
            return Err(AgendaError::Config {
                message: format!(
                    "schedule opens at {} but closes earlier, at {}",
                    opens.format(TIME_FORMAT),
                    closes.format(TIME_FORMAT)
                ),
            });
        }
        Ok(OperatingHours { opens, closes })
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        self.opens <= time && time <= self.closes
    }
}

impl Default for OperatingHours {
    fn default() -> Self {
        OperatingHours {
            opens: NaiveTime::MIN.with_hour(6).unwrap_or(NaiveTime::MIN),
            closes: NaiveTime::MIN.with_hour(20).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl std::fmt::Display for OperatingHours {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-{}",
            self.opens.format(TIME_FORMAT),
            self.closes.format(TIME_FORMAT)
        )
    }
}

impl AgendaConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| AgendaError::Config {
            message: format!("cannot read {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content);
        let config: AgendaConfig = toml::from_str(&processed)?;
        config.validate()?;
        Ok(config)
    }

    /// Settings for a CLI run: the config file if given, then flag overrides.
    pub fn load(args: &CliArgs) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        if let Some(data) = &args.data {
            config.storage.path = Some(data.clone());
        }
        config.validate()?;
        Ok(config)
    }

    /// Replace `${VAR}` with the value of the environment variable `VAR`.
    /// Unknown variables are left as written.
    fn substitute_env_vars(content: &str) -> String {
        let Ok(re) = Regex::new(r"\$\{([^}]+)\}") else {
            return content.to_string();
        };
        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    pub fn operating_hours(&self) -> Result<OperatingHours> {
        OperatingHours::new(
            parse_time("schedule.opens", &self.schedule.opens)?,
            parse_time("schedule.closes", &self.schedule.closes)?,
        )
    }

    pub fn validate(&self) -> Result<()> {
        self.operating_hours()?;
        if !validate_date_pattern(&self.formats.date) {
            return Err(AgendaError::Config {
                message: format!(
                    "formats.date must print and read back a date, got '{}'",
                    self.formats.date
                ),
            });
        }
        if !validate_datetime_pattern(&self.formats.datetime) {
            return Err(AgendaError::Config {
                message: format!(
                    "formats.datetime must print and read back a date and time, got '{}'",
                    self.formats.datetime
                ),
            });
        }
        Ok(())
    }
}

fn parse_time(field: &str, value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), TIME_FORMAT).map_err(|_| AgendaError::Config {
        message: format!("{} must be HH:MM, got '{}'", field, value),
    })
}
