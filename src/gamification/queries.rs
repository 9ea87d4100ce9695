//! Status queries for reading gamification state
//!
//! Read-only projections for display. Nothing here creates or updates rows.

use std::sync::Arc;

use super::achievements::LevelState;
use super::error::{EngineError, EngineResult};
use super::models::GamificationStatus;
use super::store::Store;

/// Query interface for gamification state
#[derive(Clone)]
pub struct StatusQuery {
    store: Arc<dyn Store>,
}

impl StatusQuery {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Level, streaks and earned achievements of one user.
    ///
    /// A user without XP reports the initial level state; streaks are
    /// ordered by kind then target, achievements by earn time.
    pub fn status(&self, user_id: &str) -> EngineResult<GamificationStatus> {
        if user_id.trim().is_empty() {
            return Err(EngineError::invalid("user id must not be empty"));
        }

        let level = self
            .store
            .level_state(user_id)?
            .unwrap_or_else(|| LevelState::initial(user_id));
        let streaks = self.store.streaks(user_id)?;
        let mut achievements = self.store.user_achievements(user_id)?;
        achievements.sort_by(|a, b| {
            a.earned_at
                .cmp(&b.earned_at)
                .then_with(|| a.achievement_code.cmp(&b.achievement_code))
        });

        Ok(GamificationStatus {
            level,
            streaks,
            achievements,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gamification::achievements::{advance, StreakKey, StreakKind};
    use crate::gamification::models::UserAchievement;
    use crate::gamification::store::{GamificationStore, MemoryStore};
    use chrono::{Duration, NaiveDate, Utc};

    #[test]
    fn test_status_for_new_user() {
        let query = StatusQuery::new(Arc::new(MemoryStore::new()));
        let status = query.status("fresh").unwrap();
        assert_eq!(status.level.level, 1);
        assert_eq!(status.level.current_xp, 0);
        assert_eq!(status.level.xp_to_next_level, 100);
        assert_eq!(status.level.title, "Beginner");
        assert!(status.streaks.is_empty());
        assert!(status.achievements.is_empty());
    }

    #[test]
    fn test_status_projection() {
        let store = Arc::new(MemoryStore::new());
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        for (kind, target) in [
            (StreakKind::MoodLogging, None),
            (StreakKind::HabitSpecific, Some("h2")),
            (StreakKind::HabitSpecific, Some("h1")),
        ] {
            let key = StreakKey::new("u1", kind, target).unwrap();
            store
                .update_streak(&key, &mut |current| advance(current, &key, today).0)
                .unwrap();
        }

        let now = Utc::now();
        for (code, age) in [("mood_logger_1", 1), ("first_habit", 5)] {
            store
                .insert_user_achievement(&UserAchievement {
                    user_id: "u1".into(),
                    achievement_code: code.into(),
                    progress: 1.0,
                    earned_at: now - Duration::minutes(age),
                })
                .unwrap();
        }

        let status = StatusQuery::new(store).status("u1").unwrap();
        let streaks: Vec<_> = status
            .streaks
            .iter()
            .map(|s| (s.kind, s.target_id.as_deref()))
            .collect();
        assert_eq!(
            streaks,
            vec![
                (StreakKind::HabitSpecific, Some("h1")),
                (StreakKind::HabitSpecific, Some("h2")),
                (StreakKind::MoodLogging, None),
            ]
        );
        let codes: Vec<_> = status.achievements.iter().map(|a| a.achievement_code.as_str()).collect();
        assert_eq!(codes, vec!["first_habit", "mood_logger_1"]);

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["level"]["title"], "Beginner");
        assert_eq!(json["streaks"][2]["kind"], "mood_logging");
    }

    #[test]
    fn test_blank_user_rejected() {
        let query = StatusQuery::new(Arc::new(MemoryStore::new()));
        assert!(matches!(query.status(" "), Err(EngineError::InvalidInput(_))));
    }
}
