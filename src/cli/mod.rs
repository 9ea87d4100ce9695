//! CLI command implementations

pub mod catalog;
pub mod evaluate;
pub mod init;
pub mod status;
pub mod trigger;

use std::path::PathBuf;

use anyhow::Result;

use momentum::config::Config;
use momentum::gamification::GamificationManager;

/// Global path options shared by every command
pub struct Paths {
    pub config: Option<PathBuf>,
    pub db: Option<PathBuf>,
}

impl Paths {
    pub fn load_config(&self) -> Result<Config> {
        Config::load(self.config.as_deref())
    }

    /// Load the config and open the engine on its database
    pub fn open(&self) -> Result<GamificationManager> {
        let config = self.load_config()?;
        GamificationManager::open(&config, self.db.as_deref())
    }
}
