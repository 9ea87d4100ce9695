//! Trigger command implementation

use anyhow::{bail, Result};

use momentum::gamification::{GamificationEvent, StepSummary, Trigger, TRIGGER_NAMES};

use super::Paths;

/// Submit one trigger through the queue and print what it did
pub async fn trigger_command(paths: &Paths, event: &str, user: &str, habit: Option<&str>) -> Result<()> {
    let trigger = match Trigger::from_name(event, user, habit) {
        Ok(trigger) => trigger,
        Err(e) => bail!("{}\nKnown triggers: {}", e, TRIGGER_NAMES.join(", ")),
    };

    let gamification = paths.open()?;
    let queue = gamification.start_queue();
    let ticket = queue.submit(trigger).await?;
    let id = ticket.id;
    let outcome = ticket.wait().await?;
    queue.shutdown().await;

    println!("Trigger {} [{}]", outcome.trigger, id);
    for step in &outcome.steps {
        match &step.result {
            Ok(StepSummary::Xp(award)) => println!(
                "  ok    {} -> level {} ({} XP, {})",
                step.step, award.new_level, award.state.current_xp, award.state.title
            ),
            Ok(StepSummary::Streak(update)) => println!(
                "  ok    {} -> {} day(s)",
                step.step, update.streak.current_streak
            ),
            Err(e) => println!("  FAIL  {} -> {}", step.step, e),
        }
    }

    for event in outcome.events() {
        match event {
            GamificationEvent::LevelUp(level_up) => {
                println!("Level up! {} -> {} ({})", level_up.old_level, level_up.new_level, level_up.new_title);
            }
            GamificationEvent::AchievementUnlocked(earned) => {
                println!("Achievement unlocked: {} (+{} XP)", earned.name, earned.xp_reward);
            }
            _ => {}
        }
    }

    if !outcome.is_complete() {
        bail!("{} of {} step(s) failed", outcome.failed().count(), outcome.steps.len());
    }
    Ok(())
}
