//! Status command implementation

use anyhow::{Context, Result};

use super::Paths;

/// Print the status projection of one user as pretty JSON
pub fn status_command(paths: &Paths, user: &str) -> Result<()> {
    let gamification = paths.open()?;
    let status = gamification
        .query()
        .status(user)
        .with_context(|| format!("Failed to load status for {user}"))?;

    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
