//! Gamification rules: XP, levels, streaks and achievements
//!
//! The pure rules live in `levels`, `streaks` and `checker`; the manager
//! applies them against the store.

mod checker;
mod definitions;
mod levels;
mod manager;
mod streaks;

pub use checker::{progress_for, ProgressRule};
pub use definitions::{AchievementCatalog, AchievementDefinition};
pub use levels::{apply_xp, threshold_for, title_for, LevelState, XpRewards};
pub use manager::{
    AchievementManager, AchievementProgress, EarnedAchievement, EngineSettings, EvaluationFailure,
    EvaluationReport, GamificationEvent, LevelUp, StreakUpdate, XpAward,
};
pub use streaks::{advance, Streak, StreakKey, StreakKind, StreakTransition};
