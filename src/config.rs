//! Service settings.
//!
//! Read from the TOML file named by `TIMETABLE_CONFIG` (every key optional),
//! then overridden by `TIMETABLE_LISTEN_ADDR` and `TIMETABLE_SOLVER`.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::engine::EngineOptions;
use crate::grid::DEFAULT_DAY_START_HOUR;
use crate::solver::SolverKind;

pub const CONFIG_PATH_VAR: &str = "TIMETABLE_CONFIG";
pub const LISTEN_ADDR_VAR: &str = "TIMETABLE_LISTEN_ADDR";
pub const SOLVER_VAR: &str = "TIMETABLE_SOLVER";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid {var}: {reason}")]
    Env { var: &'static str, reason: String },
    #[error("invalid dayStartHour {0}: must be between 0 and 23")]
    DayStartHour(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_day_start_hour")]
    pub day_start_hour: u32,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default)]
    pub solver: SolverKind,
}

fn default_listen_addr() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_day_start_hour() -> u32 {
    DEFAULT_DAY_START_HOUR
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            day_start_hour: default_day_start_hour(),
            log_filter: default_log_filter(),
            solver: SolverKind::default(),
        }
    }
}

impl Settings {
    pub fn from_toml_str(contents: &str, path: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })?;
        settings.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.day_start_hour > 23 {
            return Err(ConfigError::DayStartHour(self.day_start_hour));
        }
        Ok(self)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents, &path.display().to_string())
    }

    /// File (if `TIMETABLE_CONFIG` is set) plus environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let settings = match env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        settings.with_overrides(env::var(LISTEN_ADDR_VAR).ok(), env::var(SOLVER_VAR).ok())
    }

    pub fn with_overrides(
        mut self,
        listen_addr: Option<String>,
        solver: Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(addr) = listen_addr {
            self.listen_addr = addr;
        }
        if let Some(name) = solver {
            self.solver = name.parse().map_err(|reason| ConfigError::Env {
                var: SOLVER_VAR,
                reason,
            })?;
        }
        Ok(self)
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            day_start_hour: self.day_start_hour,
            solver: self.solver,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let settings = Settings::from_toml_str("", "test.toml").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.listen_addr, "127.0.0.1:5000");
        assert_eq!(settings.engine_options(), EngineOptions::default());
    }

    #[test]
    fn reads_partial_file() {
        let settings = Settings::from_toml_str(
            "dayStartHour = 8\nsolver = \"ilp\"\nlogFilter = \"debug\"\n",
            "test.toml",
        )
        .unwrap();
        assert_eq!(settings.day_start_hour, 8);
        assert_eq!(settings.solver, SolverKind::Ilp);
        assert_eq!(settings.log_filter, "debug");
        assert_eq!(settings.listen_addr, "127.0.0.1:5000");
    }

    #[test]
    fn rejects_bad_file_and_bad_overrides() {
        assert!(matches!(
            Settings::from_toml_str("dayStartHour = \"nine\"", "test.toml"),
            Err(ConfigError::Parse { .. })
        ));
        assert!(Settings::from_file("/nonexistent/timetable.toml").is_err());
        assert!(matches!(
            Settings::from_toml_str("dayStartHour = 4294967295", "test.toml"),
            Err(ConfigError::DayStartHour(4294967295))
        ));
        assert!(Settings::from_toml_str("dayStartHour = 23", "test.toml").is_ok());
        assert!(matches!(
            Settings::default().with_overrides(None, Some("simplex".to_string())),
            Err(ConfigError::Env { var: SOLVER_VAR, .. })
        ));
    }

    #[test]
    fn overrides_replace_file_values() {
        let settings = Settings::default()
            .with_overrides(Some("0.0.0.0:8080".to_string()), Some("ILP".to_string()))
            .unwrap();
        assert_eq!(settings.listen_addr, "0.0.0.0:8080");
        assert_eq!(settings.solver, SolverKind::Ilp);
    }
}
