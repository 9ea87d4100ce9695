//! Init command implementation

use anyhow::{bail, Result};

use momentum::config::Config;

use super::Paths;

/// Write a default configuration.
/// By default creates the global config at ~/.momentum/config.toml;
/// use --config to pick another path.
pub fn init_command(paths: &Paths, utc_offset_minutes: Option<i32>, force: bool) -> Result<()> {
    let config_path = paths
        .config
        .clone()
        .unwrap_or_else(Config::global_config_path);

    if config_path.exists() && !force {
        bail!(
            "Configuration already exists: {}\nUse --force to overwrite.",
            config_path.display()
        );
    }

    let mut config = Config::default();
    config.settings.database_path = paths.db.clone();
    if let Some(offset) = utc_offset_minutes {
        config.settings.utc_offset_minutes = offset;
    }
    config.validate()?;

    config.save_to_file(&config_path)?;
    println!("Created: {}", config_path.display());
    println!("Database: {}", config.database_path().display());

    Ok(())
}
