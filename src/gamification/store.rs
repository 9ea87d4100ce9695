//! Storage contracts for the gamification engine
//!
//! The engine never talks to a database directly. It is handed a `Store`:
//! - `GamificationStore`: engine-owned state (levels, streaks, achievements)
//! - `ActivitySource`: read-only counts over the host application's data
//!
//! Every read-modify-write goes through a single atomic `update_*` call that
//! receives the current row and returns the next one, so two concurrent
//! triggers for the same key can never both act on the same old state.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::achievements::{LevelState, Streak, StreakKey, StreakKind};
use super::error::EngineResult;
use super::models::{
    DecisionRecord, DreamEntryRecord, HabitLogRecord, HabitRecord, InsightRecord,
    MoodEntryRecord, UserAchievement,
};

/// Engine-owned state
pub trait GamificationStore: Send + Sync {
    fn level_state(&self, user_id: &str) -> EngineResult<Option<LevelState>>;

    /// Atomically replace the user's level state with `apply(current)`
    fn update_level_state(
        &self,
        user_id: &str,
        apply: &mut dyn FnMut(Option<&LevelState>) -> LevelState,
    ) -> EngineResult<LevelState>;

    fn streaks(&self, user_id: &str) -> EngineResult<Vec<Streak>>;

    /// Atomically replace the streak at `key` with `apply(current)`
    fn update_streak(
        &self,
        key: &StreakKey,
        apply: &mut dyn FnMut(Option<&Streak>) -> Streak,
    ) -> EngineResult<Streak>;

    /// Highest current streak across every target of `kind` (0 if none)
    fn max_current_streak(&self, user_id: &str, kind: StreakKind) -> EngineResult<u32>;

    fn earned_codes(&self, user_id: &str) -> EngineResult<HashSet<String>>;

    /// Insert unless the pair already exists. Returns whether a row was added.
    fn insert_user_achievement(&self, achievement: &UserAchievement) -> EngineResult<bool>;

    fn user_achievements(&self, user_id: &str) -> EngineResult<Vec<UserAchievement>>;
}

/// Read-only view over the host application's activity data
pub trait ActivitySource: Send + Sync {
    /// Account creation time, `None` if the user is unknown
    fn user_created_at(&self, user_id: &str) -> EngineResult<Option<DateTime<Utc>>>;
    fn habit_count(&self, user_id: &str) -> EngineResult<u64>;
    fn habit_category_count(&self, user_id: &str) -> EngineResult<u64>;
    /// Completed habit logs with a perfect quality rating
    fn perfect_habit_log_count(&self, user_id: &str) -> EngineResult<u64>;
    fn mood_entry_count(&self, user_id: &str) -> EngineResult<u64>;
    fn dream_entry_count(&self, user_id: &str) -> EngineResult<u64>;
    fn decision_count(&self, user_id: &str) -> EngineResult<u64>;
    fn insight_count(&self, user_id: &str) -> EngineResult<u64>;
}

/// Everything the engine needs from persistence
pub trait Store: GamificationStore + ActivitySource {}

impl<T> Store for T where T: GamificationStore + ActivitySource + ?Sized {}

// ============================================
// IN-MEMORY STORE
// ============================================

/// In-memory store.
///
/// One mutex guards all state, so each update is atomic per key.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
pub(crate) struct MemoryState {
    pub(crate) levels: HashMap<String, LevelState>,
    pub(crate) streaks: HashMap<StreakKey, Streak>,
    pub(crate) achievements: HashMap<(String, String), UserAchievement>,
    pub(crate) users: HashMap<String, DateTime<Utc>>,
    pub(crate) habits: Vec<HabitRecord>,
    pub(crate) habit_logs: Vec<HabitLogRecord>,
    pub(crate) moods: Vec<MoodEntryRecord>,
    pub(crate) dreams: Vec<DreamEntryRecord>,
    pub(crate) decisions: Vec<DecisionRecord>,
    pub(crate) insights: Vec<InsightRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn lock(&self) -> EngineResult<MutexGuard<'_, MemoryState>> {
        Ok(self.state.lock()?)
    }

    fn count<T>(&self, rows: impl Fn(&MemoryState) -> &Vec<T>, matches: impl Fn(&T) -> bool) -> EngineResult<u64> {
        let state = self.lock()?;
        Ok(rows(&state).iter().filter(|row| matches(row)).count() as u64)
    }
}

impl GamificationStore for MemoryStore {
    fn level_state(&self, user_id: &str) -> EngineResult<Option<LevelState>> {
        Ok(self.lock()?.levels.get(user_id).cloned())
    }

    fn update_level_state(
        &self,
        user_id: &str,
        apply: &mut dyn FnMut(Option<&LevelState>) -> LevelState,
    ) -> EngineResult<LevelState> {
        let mut state = self.lock()?;
        let next = apply(state.levels.get(user_id));
        state.levels.insert(user_id.to_string(), next.clone());
        Ok(next)
    }

    fn streaks(&self, user_id: &str) -> EngineResult<Vec<Streak>> {
        let state = self.lock()?;
        let mut streaks: Vec<Streak> = state
            .streaks
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        streaks.sort_by(|a, b| (a.kind, &a.target_id).cmp(&(b.kind, &b.target_id)));
        Ok(streaks)
    }

    fn update_streak(
        &self,
        key: &StreakKey,
        apply: &mut dyn FnMut(Option<&Streak>) -> Streak,
    ) -> EngineResult<Streak> {
        let mut state = self.lock()?;
        let next = apply(state.streaks.get(key));
        state.streaks.insert(key.clone(), next.clone());
        Ok(next)
    }

    fn max_current_streak(&self, user_id: &str, kind: StreakKind) -> EngineResult<u32> {
        let state = self.lock()?;
        Ok(state
            .streaks
            .values()
            .filter(|s| s.user_id == user_id && s.kind == kind)
            .map(|s| s.current_streak)
            .max()
            .unwrap_or(0))
    }

    fn earned_codes(&self, user_id: &str) -> EngineResult<HashSet<String>> {
        let state = self.lock()?;
        Ok(state
            .achievements
            .keys()
            .filter(|(user, _)| user == user_id)
            .map(|(_, code)| code.clone())
            .collect())
    }

    fn insert_user_achievement(&self, achievement: &UserAchievement) -> EngineResult<bool> {
        let mut state = self.lock()?;
        let key = (
            achievement.user_id.clone(),
            achievement.achievement_code.clone(),
        );
        if state.achievements.contains_key(&key) {
            return Ok(false);
        }
        state.achievements.insert(key, achievement.clone());
        Ok(true)
    }

    fn user_achievements(&self, user_id: &str) -> EngineResult<Vec<UserAchievement>> {
        let state = self.lock()?;
        let mut earned: Vec<UserAchievement> = state
            .achievements
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        earned.sort_by(|a, b| {
            a.earned_at
                .cmp(&b.earned_at)
                .then_with(|| a.achievement_code.cmp(&b.achievement_code))
        });
        Ok(earned)
    }
}

impl ActivitySource for MemoryStore {
    fn user_created_at(&self, user_id: &str) -> EngineResult<Option<DateTime<Utc>>> {
        Ok(self.lock()?.users.get(user_id).copied())
    }

    fn habit_count(&self, user_id: &str) -> EngineResult<u64> {
        self.count(|s| &s.habits, |h| h.user_id == user_id)
    }

    fn habit_category_count(&self, user_id: &str) -> EngineResult<u64> {
        let state = self.lock()?;
        let categories: HashSet<&str> = state
            .habits
            .iter()
            .filter(|h| h.user_id == user_id)
            .filter_map(|h| h.category.as_deref())
            .collect();
        Ok(categories.len() as u64)
    }

    fn perfect_habit_log_count(&self, user_id: &str) -> EngineResult<u64> {
        self.count(|s| &s.habit_logs, |l| l.user_id == user_id && l.is_perfect())
    }

    fn mood_entry_count(&self, user_id: &str) -> EngineResult<u64> {
        self.count(|s| &s.moods, |m| m.user_id == user_id)
    }

    fn dream_entry_count(&self, user_id: &str) -> EngineResult<u64> {
        self.count(|s| &s.dreams, |d| d.user_id == user_id)
    }

    fn decision_count(&self, user_id: &str) -> EngineResult<u64> {
        self.count(|s| &s.decisions, |d| d.user_id == user_id)
    }

    fn insight_count(&self, user_id: &str) -> EngineResult<u64> {
        self.count(|s| &s.insights, |i| i.user_id == user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gamification::achievements::advance;
    use chrono::NaiveDate;

    #[test]
    fn test_insert_user_achievement_once() {
        let store = MemoryStore::new();
        let earned = UserAchievement {
            user_id: "u1".into(),
            achievement_code: "first_habit".into(),
            progress: 1.0,
            earned_at: Utc::now(),
        };
        assert!(store.insert_user_achievement(&earned).unwrap());
        assert!(!store.insert_user_achievement(&earned).unwrap());
        assert_eq!(store.user_achievements("u1").unwrap().len(), 1);
        assert!(store.earned_codes("u1").unwrap().contains("first_habit"));
        assert!(store.earned_codes("u2").unwrap().is_empty());
    }

    #[test]
    fn test_max_current_streak_across_targets() {
        let store = MemoryStore::new();
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        for (habit, days) in [("h1", 2), ("h2", 4)] {
            let key = StreakKey::new("u1", StreakKind::HabitSpecific, Some(habit)).unwrap();
            for offset in 0..days {
                let today = day + chrono::Duration::days(offset);
                store
                    .update_streak(&key, &mut |current| advance(current, &key, today).0)
                    .unwrap();
            }
        }

        assert_eq!(store.max_current_streak("u1", StreakKind::HabitSpecific).unwrap(), 4);
        assert_eq!(store.max_current_streak("u1", StreakKind::OverallHabits).unwrap(), 0);
        assert_eq!(store.streaks("u1").unwrap().len(), 2);
    }
}
