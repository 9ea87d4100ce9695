//! Data models for the gamification engine
//!
//! Engine-owned state (`UserAchievement`, plus `LevelState` and `Streak` in
//! the achievements module) and the activity rows the surrounding
//! application writes and the engine only reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::achievements::{LevelState, Streak};

/// Quality rating that counts as perfect for `habit_perfectionist`
pub const PERFECT_QUALITY_RATING: u8 = 5;

/// An earned achievement. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAchievement {
    pub user_id: String,
    pub achievement_code: String,
    /// Progress at the moment it was earned (always 1.0 today)
    pub progress: f64,
    pub earned_at: DateTime<Utc>,
}

/// Read-only status projection for one user
#[derive(Debug, Clone, Serialize)]
pub struct GamificationStatus {
    pub level: LevelState,
    pub streaks: Vec<Streak>,
    pub achievements: Vec<UserAchievement>,
}

// ============================================
// ACTIVITY RECORDS (owned by the host app)
// ============================================

/// Account of a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// A habit definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitRecord {
    pub habit_id: String,
    pub user_id: String,
    pub name: String,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a habit on a given day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HabitLogStatus {
    Completed,
    Partial,
    Skipped,
}

impl HabitLogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::Skipped => "skipped",
        }
    }
}

/// One habit check-in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitLogRecord {
    pub habit_id: String,
    pub user_id: String,
    pub status: HabitLogStatus,
    /// 1-5, optional
    pub quality_rating: Option<u8>,
    pub logged_at: DateTime<Utc>,
}

impl HabitLogRecord {
    pub fn is_perfect(&self) -> bool {
        self.status == HabitLogStatus::Completed
            && self.quality_rating == Some(PERFECT_QUALITY_RATING)
    }
}

/// Mood journal entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoodEntryRecord {
    pub user_id: String,
    pub mood: i32,
    pub logged_at: DateTime<Utc>,
}

/// Dream journal entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DreamEntryRecord {
    pub user_id: String,
    pub title: String,
    pub recorded_at: DateTime<Utc>,
}

/// Analyzed decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub user_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// Generated insight report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightRecord {
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}
