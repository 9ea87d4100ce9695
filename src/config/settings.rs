//! Settings configuration types

use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::gamification::{EngineSettings, DEFAULT_QUEUE_CAPACITY};

/// General settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// SQLite database location. `~` expands to the home directory.
    /// Defaults to ~/.momentum/gamification.db
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,

    /// Reference timezone for calendar days, in minutes east of UTC
    #[serde(default)]
    pub utc_offset_minutes: i32,

    /// Accounts created on or before this day earn `early_adopter`.
    /// Must be a quoted "YYYY-MM-DD" string.
    #[serde(default = "default_early_adopter_cutoff")]
    pub early_adopter_cutoff: NaiveDate,

    /// Maximum number of triggers waiting for the worker
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_early_adopter_cutoff() -> NaiveDate {
    EngineSettings::default_early_adopter_cutoff()
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: None,
            utc_offset_minutes: 0,
            early_adopter_cutoff: default_early_adopter_cutoff(),
            queue_capacity: default_queue_capacity(),
        }
    }
}
