//! Achievement Manager - Core gamification logic
//!
//! Handles XP awards, streak updates and achievement evaluation on top of an
//! injected store.
//!
//! Earning an achievement awards XP, and an XP award re-checks the catalog.
//! Instead of recursing, `evaluate_all` runs a work-list: each pass only
//! looks at achievements the user does not own yet, and evaluation stops
//! after the first pass that earns nothing. The unearned set shrinks on
//! every pass that continues, so evaluation always terminates.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::Serialize;

use super::checker::{progress_for, ProgressContext};
use super::definitions::{AchievementCatalog, AchievementDefinition};
use super::levels::{self, LevelState};
use super::streaks::{advance, Streak, StreakKey, StreakKind, StreakTransition};
use crate::gamification::error::{EngineError, EngineResult};
use crate::gamification::models::UserAchievement;
use crate::gamification::store::Store;
use crate::gamification::time_bucket::{calendar_day, Clock};

/// Engine tunables, resolved from configuration at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Timezone whose calendar days drive streaks
    pub reference_offset: FixedOffset,
    /// Accounts created on or before this day earn `early_adopter`
    pub early_adopter_cutoff: NaiveDate,
}

impl EngineSettings {
    pub fn default_early_adopter_cutoff() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default()
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            reference_offset: Utc.fix(),
            early_adopter_cutoff: Self::default_early_adopter_cutoff(),
        }
    }
}

/// An achievement that was just earned
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EarnedAchievement {
    pub code: String,
    pub name: String,
    pub xp_reward: i64,
    pub earned_at: DateTime<Utc>,
}

/// A level up event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelUp {
    pub old_level: u32,
    pub new_level: u32,
    pub new_title: String,
}

/// Events that can happen during gamification updates
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GamificationEvent {
    XpAwarded { amount: i64, reason: String },
    LevelUp(LevelUp),
    StreakStarted { kind: StreakKind, target_id: Option<String> },
    StreakExtended { kind: StreakKind, target_id: Option<String>, count: u32 },
    StreakReset { kind: StreakKind, target_id: Option<String>, previous: u32 },
    AchievementUnlocked(EarnedAchievement),
}

/// Level change applied by one XP award, without the follow-up evaluation
#[derive(Debug, Clone)]
struct LevelChange {
    state: LevelState,
    leveled_up: bool,
    events: Vec<GamificationEvent>,
}

/// Result of `award_xp`
#[derive(Debug, Clone)]
pub struct XpAward {
    pub xp_awarded: i64,
    pub new_level: u32,
    pub leveled_up: bool,
    pub state: LevelState,
    pub events: Vec<GamificationEvent>,
    /// The catalog re-check that follows every award. The XP is persisted
    /// even when this failed.
    pub evaluation: EngineResult<EvaluationReport>,
}

/// Result of `record_activity`
#[derive(Debug, Clone)]
pub struct StreakUpdate {
    pub streak: Streak,
    pub transition: StreakTransition,
    pub events: Vec<GamificationEvent>,
}

/// An achievement whose evaluation failed.
///
/// If the achievement was recorded but its XP reward could not be applied,
/// the code is owned from then on and the reward is never retried.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationFailure {
    pub code: String,
    pub error: EngineError,
}

/// Outcome of one `evaluate_all` run
#[derive(Debug, Clone, Default)]
pub struct EvaluationReport {
    pub earned: Vec<EarnedAchievement>,
    pub failures: Vec<EvaluationFailure>,
    /// Passes over the work-list
    pub passes: u32,
    pub events: Vec<GamificationEvent>,
}

impl EvaluationReport {
    pub fn earned_codes(&self) -> Vec<&str> {
        self.earned.iter().map(|e| e.code.as_str()).collect()
    }
}

/// Progress snapshot for one catalog entry
#[derive(Debug, Clone)]
pub struct AchievementProgress {
    pub code: String,
    pub name: String,
    pub earned: bool,
    pub progress: EngineResult<f64>,
}

enum EarnAttempt {
    Earned,
    /// Recorded concurrently by someone else, nothing awarded here
    AlreadyOwned,
    NotYet,
}

/// Main manager for all gamification features
pub struct AchievementManager {
    store: Arc<dyn Store>,
    catalog: AchievementCatalog,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
}

impl AchievementManager {
    pub fn new(
        store: Arc<dyn Store>,
        catalog: AchievementCatalog,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            catalog,
            clock,
            settings,
        }
    }

    pub fn catalog(&self) -> &AchievementCatalog {
        &self.catalog
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Today's date in the reference timezone
    pub fn today(&self) -> NaiveDate {
        calendar_day(self.clock.now(), self.settings.reference_offset)
    }

    fn check_user(user_id: &str) -> EngineResult<()> {
        if user_id.trim().is_empty() {
            return Err(EngineError::invalid("user id must not be empty"));
        }
        Ok(())
    }

    // ========================================
    // XP & LEVEL OPERATIONS
    // ========================================

    /// Award XP, then re-check the achievement catalog for the user
    pub fn award_xp(&self, user_id: &str, amount: i64, reason: &str) -> EngineResult<XpAward> {
        let change = self.apply_xp(user_id, amount, reason)?;

        let evaluation = self.evaluate_all(user_id);
        if let Err(err) = &evaluation {
            tracing::warn!("Achievement evaluation after XP award failed for {}: {}", user_id, err);
        }

        Ok(XpAward {
            xp_awarded: amount,
            new_level: change.state.level,
            leveled_up: change.leveled_up,
            state: change.state,
            events: change.events,
            evaluation,
        })
    }

    /// Persist an XP award without evaluating achievements
    fn apply_xp(&self, user_id: &str, amount: i64, reason: &str) -> EngineResult<LevelChange> {
        Self::check_user(user_id)?;
        if amount < 0 {
            return Err(EngineError::invalid(format!("xp amount must be non-negative, got {amount}")));
        }

        let mut old_level = 1;
        let state = self.store.update_level_state(user_id, &mut |current| {
            old_level = current.map_or(1, |s| s.level);
            levels::apply_xp(current, user_id, amount)
        })?;

        let leveled_up = state.level > old_level;
        let mut events = vec![GamificationEvent::XpAwarded {
            amount,
            reason: reason.to_string(),
        }];

        tracing::debug!("Awarded {} XP to {} ({})", amount, user_id, reason);
        if leveled_up {
            tracing::info!(
                "Level up for {}: {} -> {} ({})",
                user_id,
                old_level,
                state.level,
                state.title
            );
            events.push(GamificationEvent::LevelUp(LevelUp {
                old_level,
                new_level: state.level,
                new_title: state.title.clone(),
            }));
        }

        Ok(LevelChange {
            state,
            leveled_up,
            events,
        })
    }

    /// Level state for display; users without XP get the initial state
    pub fn level_state(&self, user_id: &str) -> EngineResult<LevelState> {
        Ok(self
            .store
            .level_state(user_id)?
            .unwrap_or_else(|| LevelState::initial(user_id)))
    }

    // ========================================
    // STREAK OPERATIONS
    // ========================================

    /// Record activity for today's calendar date
    pub fn record_activity(
        &self,
        user_id: &str,
        kind: StreakKind,
        target_id: Option<&str>,
    ) -> EngineResult<StreakUpdate> {
        self.record_activity_on(user_id, kind, target_id, self.today())
    }

    /// Record activity for an explicit calendar date
    pub fn record_activity_on(
        &self,
        user_id: &str,
        kind: StreakKind,
        target_id: Option<&str>,
        today: NaiveDate,
    ) -> EngineResult<StreakUpdate> {
        let key = StreakKey::new(user_id, kind, target_id)?;

        let mut transition = StreakTransition::Unchanged;
        let streak = self.store.update_streak(&key, &mut |current| {
            let (next, t) = advance(current, &key, today);
            transition = t;
            next
        })?;

        let target = streak.target_id.clone();
        let events = match transition {
            StreakTransition::Started => vec![GamificationEvent::StreakStarted { kind, target_id: target }],
            StreakTransition::Extended => vec![GamificationEvent::StreakExtended {
                kind,
                target_id: target,
                count: streak.current_streak,
            }],
            StreakTransition::Reset { previous } => vec![GamificationEvent::StreakReset {
                kind,
                target_id: target,
                previous,
            }],
            StreakTransition::Unchanged => Vec::new(),
        };

        if transition != StreakTransition::Unchanged {
            tracing::debug!(
                "Streak {} for {} ({:?}): {:?} -> {}",
                kind,
                user_id,
                target_id,
                transition,
                streak.current_streak
            );
        }

        Ok(StreakUpdate {
            streak,
            transition,
            events,
        })
    }

    // ========================================
    // ACHIEVEMENT OPERATIONS
    // ========================================

    fn progress_context<'a>(&'a self, user_id: &'a str) -> ProgressContext<'a> {
        ProgressContext {
            store: self.store.as_ref(),
            user_id,
            early_adopter_cutoff: self.settings.early_adopter_cutoff,
            reference_offset: self.settings.reference_offset,
        }
    }

    /// Evaluate every unearned achievement, recording and rewarding the ones
    /// that reached full progress.
    ///
    /// A failing achievement is reported in `failures` and skipped for the
    /// rest of this run; the others are still evaluated.
    pub fn evaluate_all(&self, user_id: &str) -> EngineResult<EvaluationReport> {
        Self::check_user(user_id)?;

        let owned = self.store.earned_codes(user_id)?;
        let mut pending: Vec<&AchievementDefinition> = self
            .catalog
            .iter()
            .filter(|def| !owned.contains(&def.code))
            .collect();

        let mut report = EvaluationReport::default();

        while !pending.is_empty() {
            report.passes += 1;
            let mut earned_this_pass = false;
            let mut remaining = Vec::with_capacity(pending.len());

            for def in pending {
                match self.try_earn(user_id, def, &mut report) {
                    Ok(EarnAttempt::Earned) => earned_this_pass = true,
                    Ok(EarnAttempt::AlreadyOwned) => {}
                    Ok(EarnAttempt::NotYet) => remaining.push(def),
                    Err(error) => {
                        tracing::warn!("Achievement {} evaluation failed for {}: {}", def.code, user_id, error);
                        report.failures.push(EvaluationFailure {
                            code: def.code.clone(),
                            error,
                        });
                    }
                }
            }

            if !earned_this_pass {
                break;
            }
            pending = remaining;
        }

        Ok(report)
    }

    fn try_earn(
        &self,
        user_id: &str,
        def: &AchievementDefinition,
        report: &mut EvaluationReport,
    ) -> EngineResult<EarnAttempt> {
        let progress = progress_for(&def.code, &self.progress_context(user_id))?;
        if progress < 1.0 {
            return Ok(EarnAttempt::NotYet);
        }

        let earned_at = self.clock.now();
        let record = UserAchievement {
            user_id: user_id.to_string(),
            achievement_code: def.code.clone(),
            progress: progress.min(1.0),
            earned_at,
        };
        if !self.store.insert_user_achievement(&record)? {
            tracing::debug!("Achievement {} already recorded for {}", def.code, user_id);
            return Ok(EarnAttempt::AlreadyOwned);
        }

        tracing::info!("Achievement unlocked for {}: {} (+{} XP)", user_id, def.code, def.xp_reward);
        let earned = EarnedAchievement {
            code: def.code.clone(),
            name: def.name.clone(),
            xp_reward: def.xp_reward,
            earned_at,
        };
        report.events.push(GamificationEvent::AchievementUnlocked(earned.clone()));
        report.earned.push(earned);

        if def.xp_reward > 0 {
            match self.apply_xp(user_id, def.xp_reward, &format!("achievement:{}", def.code)) {
                Ok(change) => report.events.extend(change.events),
                Err(error) => {
                    // The achievement stays recorded; only its reward is missing
                    tracing::error!("Reward for achievement {} not applied for {}: {}", def.code, user_id, error);
                    report.failures.push(EvaluationFailure {
                        code: def.code.clone(),
                        error,
                    });
                }
            }
        }

        Ok(EarnAttempt::Earned)
    }

    /// Current progress for every catalog entry, without recording anything
    pub fn progress_report(&self, user_id: &str) -> EngineResult<Vec<AchievementProgress>> {
        Self::check_user(user_id)?;
        let owned = self.store.earned_codes(user_id)?;
        let ctx = self.progress_context(user_id);

        Ok(self
            .catalog
            .iter()
            .map(|def| {
                let earned = owned.contains(&def.code);
                let progress = if earned {
                    Ok(1.0)
                } else {
                    progress_for(&def.code, &ctx)
                };
                AchievementProgress {
                    code: def.code.clone(),
                    name: def.name.clone(),
                    earned,
                    progress,
                }
            })
            .collect())
    }
}
