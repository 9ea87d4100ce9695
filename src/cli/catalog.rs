//! Catalog command implementation

use anyhow::Result;

use super::Paths;

/// List achievement definitions, optionally with a user's progress
pub fn catalog_command(paths: &Paths, user: Option<&str>) -> Result<()> {
    let Some(user) = user else {
        let catalog = paths.load_config()?.catalog()?;
        println!("Achievements ({}):\n", catalog.len());
        for def in catalog.iter() {
            println!("  {:<22} {:>4} XP  {} - {}", def.code, def.xp_reward, def.name, def.requirement);
        }
        return Ok(());
    };

    let gamification = paths.open()?;
    let report = gamification.engine().progress_report(user)?;

    println!("Achievements for {} ({}):\n", user, report.len());
    for entry in report {
        let progress = match (&entry.progress, entry.earned) {
            (_, true) => "earned".to_string(),
            (Ok(p), false) => format!("{:>5.1}%", p * 100.0),
            (Err(e), false) => format!("error: {e}"),
        };
        println!("  {:<22} {:<12} {}", entry.code, progress, entry.name);
    }

    Ok(())
}
