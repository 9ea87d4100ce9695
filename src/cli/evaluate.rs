//! Evaluate command implementation

use anyhow::Result;

use super::Paths;

/// Run the achievement evaluator for one user
pub fn evaluate_command(paths: &Paths, user: &str) -> Result<()> {
    let gamification = paths.open()?;
    let report = gamification.engine().evaluate_all(user)?;

    if report.earned.is_empty() {
        println!("No new achievements.");
    } else {
        println!("Earned ({}):", report.earned.len());
        for earned in &report.earned {
            println!("  {} - {} (+{} XP)", earned.code, earned.name, earned.xp_reward);
        }
    }

    for failure in &report.failures {
        eprintln!("  {} failed: {}", failure.code, failure.error);
    }

    Ok(())
}
