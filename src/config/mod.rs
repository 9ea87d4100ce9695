//! Configuration loading and management

mod io;
mod settings;

pub use settings::Settings;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::gamification::{reference_offset, AchievementCatalog, AchievementDefinition, EngineSettings};

/// Largest accepted timezone offset (18 hours)
const MAX_OFFSET_MINUTES: i32 = 18 * 60;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub settings: Settings,

    /// Extra achievements appended to the builtin catalog
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub achievement: Vec<AchievementDefinition>,
}

impl Config {
    /// Check values serde cannot check on its own
    pub fn validate(&self) -> Result<()> {
        if self.settings.queue_capacity == 0 {
            bail!("settings.queue_capacity must be greater than 0");
        }
        if self.settings.utc_offset_minutes.abs() > MAX_OFFSET_MINUTES {
            bail!(
                "settings.utc_offset_minutes must be within +-{} (got {})",
                MAX_OFFSET_MINUTES,
                self.settings.utc_offset_minutes
            );
        }
        self.catalog()?;
        Ok(())
    }

    /// Builtin catalog plus configured achievements
    pub fn catalog(&self) -> Result<AchievementCatalog> {
        AchievementCatalog::builtin_with(self.achievement.clone())
            .context("Invalid [[achievement]] entries in config")
    }

    pub fn engine_settings(&self) -> Result<EngineSettings> {
        let offset = reference_offset(self.settings.utc_offset_minutes).with_context(|| {
            format!(
                "Invalid utc_offset_minutes: {}",
                self.settings.utc_offset_minutes
            )
        })?;

        Ok(EngineSettings {
            reference_offset: offset,
            early_adopter_cutoff: self.settings.early_adopter_cutoff,
        })
    }

    /// Database location with `~` expanded
    pub fn database_path(&self) -> PathBuf {
        match &self.settings.database_path {
            Some(path) => expand_home(path),
            None => Self::default_database_path(),
        }
    }
}

fn expand_home(path: &std::path::Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest),
        Err(_) => path.to_path_buf(),
    }
}
