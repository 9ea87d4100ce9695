//! Achievement progress checking
//!
//! Maps an achievement code onto a progress rule and computes a 0..1
//! completion fraction from the store. Codes without a rule never progress.

use chrono::{FixedOffset, NaiveDate};

use super::streaks::StreakKind;
use crate::gamification::error::{EngineError, EngineResult};
use crate::gamification::store::Store;
use crate::gamification::time_bucket::calendar_day;

/// Completed habit logs with a perfect rating needed for `habit_perfectionist`
const PERFECTIONIST_TARGET: u32 = 10;

/// Aggregate habit streak needed for `habit_consistent`
const CONSISTENT_STREAK_TARGET: u32 = 14;

/// Distinct habit categories needed for `habit_diversity`
const DIVERSITY_TARGET: u32 = 5;

/// How progress towards an achievement is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressRule {
    FirstHabit,
    /// Best current per-habit streak against N days
    HabitStreak(u32),
    MoodLogger(u32),
    DreamJournal(u32),
    DecisionMaker,
    InsightSeeker,
    EarlyAdopter,
    HabitPerfectionist,
    HabitConsistent,
    HabitDiversity,
}

impl ProgressRule {
    /// Parse an achievement code. `None` for codes without matching logic.
    pub fn parse(code: &str) -> Option<Self> {
        let rule = match code {
            "first_habit" => Self::FirstHabit,
            "decision_maker" => Self::DecisionMaker,
            "insight_seeker" => Self::InsightSeeker,
            "early_adopter" => Self::EarlyAdopter,
            "habit_perfectionist" => Self::HabitPerfectionist,
            "habit_consistent" => Self::HabitConsistent,
            "habit_diversity" => Self::HabitDiversity,
            _ => return Self::parse_counted(code),
        };
        Some(rule)
    }

    /// `habit_streak_N`, `mood_logger_N`, `dream_journal_N`
    fn parse_counted(code: &str) -> Option<Self> {
        let families: [(&str, fn(u32) -> Self); 3] = [
            ("habit_streak_", Self::HabitStreak),
            ("mood_logger_", Self::MoodLogger),
            ("dream_journal_", Self::DreamJournal),
        ];

        families.into_iter().find_map(|(prefix, make)| {
            let target: u32 = code.strip_prefix(prefix)?.parse().ok()?;
            (target > 0).then(|| make(target))
        })
    }
}

/// Everything a progress computation may look at
pub struct ProgressContext<'a> {
    pub store: &'a dyn Store,
    pub user_id: &'a str,
    pub early_adopter_cutoff: NaiveDate,
    pub reference_offset: FixedOffset,
}

/// `min(count / target, 1)`
pub fn ratio(count: u64, target: u32) -> f64 {
    if target == 0 {
        return 1.0;
    }
    (count as f64 / f64::from(target)).min(1.0)
}

fn binary(condition: bool) -> f64 {
    if condition { 1.0 } else { 0.0 }
}

/// Progress towards the achievement with `code`
pub fn progress_for(code: &str, ctx: &ProgressContext<'_>) -> EngineResult<f64> {
    let Some(rule) = ProgressRule::parse(code) else {
        return Ok(0.0);
    };

    let store = ctx.store;
    let user = ctx.user_id;

    let progress = match rule {
        ProgressRule::FirstHabit => binary(store.habit_count(user)? >= 1),
        ProgressRule::HabitStreak(days) => {
            let best = store.max_current_streak(user, StreakKind::HabitSpecific)?;
            ratio(u64::from(best), days)
        }
        ProgressRule::MoodLogger(target) => ratio(store.mood_entry_count(user)?, target),
        ProgressRule::DreamJournal(target) => ratio(store.dream_entry_count(user)?, target),
        ProgressRule::DecisionMaker => binary(store.decision_count(user)? >= 1),
        ProgressRule::InsightSeeker => binary(store.insight_count(user)? >= 1),
        ProgressRule::EarlyAdopter => {
            let created_at = store
                .user_created_at(user)?
                .ok_or_else(|| EngineError::not_found("user", user))?;
            binary(calendar_day(created_at, ctx.reference_offset) <= ctx.early_adopter_cutoff)
        }
        ProgressRule::HabitPerfectionist => {
            ratio(store.perfect_habit_log_count(user)?, PERFECTIONIST_TARGET)
        }
        ProgressRule::HabitConsistent => {
            let best = store.max_current_streak(user, StreakKind::OverallHabits)?;
            ratio(u64::from(best), CONSISTENT_STREAK_TARGET)
        }
        ProgressRule::HabitDiversity => ratio(store.habit_category_count(user)?, DIVERSITY_TARGET),
    };

    Ok(progress)
}
