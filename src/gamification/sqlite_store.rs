//! SQLite implementation of the storage contracts
//!
//! Updates run inside `BEGIN IMMEDIATE` transactions: the write lock is
//! taken before the current row is read, so other connections (the host
//! application, a second engine process) cannot interleave a write between
//! our read and our write.

use std::collections::HashSet;
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::achievements::{LevelState, Streak, StreakKey, StreakKind};
use super::db::GamificationDb;
use super::error::{EngineError, EngineResult};
use super::models::{HabitLogStatus, UserAchievement, PERFECT_QUALITY_RATING};
use super::store::{ActivitySource, GamificationStore};
use super::time_bucket::{day_bucket, from_millis, parse_day_bucket};

/// Store backed by the gamification database
#[derive(Clone)]
pub struct SqliteStore {
    db: GamificationDb,
}

impl SqliteStore {
    pub fn new(db: GamificationDb) -> Self {
        Self { db }
    }

    /// Open or create a database file
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(GamificationDb::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(GamificationDb::open_in_memory()?))
    }

    pub fn db(&self) -> &GamificationDb {
        &self.db
    }

    fn count(&self, sql: &str, user_id: &str) -> EngineResult<u64> {
        let conn = self.db.conn()?;
        let count: i64 = conn.query_row(sql, [user_id], |r| r.get(0))?;
        Ok(count.max(0) as u64)
    }
}

/// Raw streak row, dates still as day buckets
struct StreakRow {
    user_id: String,
    kind: String,
    target_id: String,
    current_streak: u32,
    longest_streak: u32,
    last_activity_date: String,
    streak_start_date: String,
}

impl StreakRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get(0)?,
            kind: row.get(1)?,
            target_id: row.get(2)?,
            current_streak: row.get(3)?,
            longest_streak: row.get(4)?,
            last_activity_date: row.get(5)?,
            streak_start_date: row.get(6)?,
        })
    }

    fn into_streak(self) -> EngineResult<Streak> {
        let corrupt = |what: &str| {
            EngineError::Persistence(format!(
                "corrupt streak row {}/{}: bad {what}",
                self.user_id, self.kind
            ))
        };
        let kind: StreakKind = self.kind.parse().map_err(|_| corrupt("kind"))?;
        let last = parse_day_bucket(&self.last_activity_date).ok_or_else(|| corrupt("last_activity_date"))?;
        let start = parse_day_bucket(&self.streak_start_date).ok_or_else(|| corrupt("streak_start_date"))?;

        Ok(Streak {
            kind,
            target_id: (!self.target_id.is_empty()).then(|| self.target_id.clone()),
            current_streak: self.current_streak,
            longest_streak: self.longest_streak,
            last_activity_date: last,
            streak_start_date: start,
            user_id: self.user_id,
        })
    }
}

const STREAK_COLUMNS: &str = "user_id, kind, target_id, current_streak, longest_streak, last_activity_date, streak_start_date";

fn load_level_state(conn: &Connection, user_id: &str) -> EngineResult<Option<LevelState>> {
    let state = conn
        .query_row(
            r#"SELECT user_id, level, current_xp, total_xp, xp_to_next_level, title
               FROM level_states WHERE user_id = ?1"#,
            [user_id],
            |r| {
                Ok(LevelState {
                    user_id: r.get(0)?,
                    level: r.get(1)?,
                    current_xp: r.get(2)?,
                    total_xp: r.get(3)?,
                    xp_to_next_level: r.get(4)?,
                    title: r.get(5)?,
                })
            },
        )
        .optional()?;
    Ok(state)
}

fn load_streak(conn: &Connection, key: &StreakKey) -> EngineResult<Option<Streak>> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {STREAK_COLUMNS} FROM streaks WHERE user_id = ?1 AND kind = ?2 AND target_id = ?3"
            ),
            params![key.user_id, key.kind.as_str(), key.target_id.as_deref().unwrap_or("")],
            StreakRow::from_row,
        )
        .optional()?;
    row.map(StreakRow::into_streak).transpose()
}

fn earned_at_from(ms: i64) -> EngineResult<DateTime<Utc>> {
    from_millis(ms).ok_or_else(|| EngineError::Persistence(format!("corrupt timestamp {ms}")))
}

impl GamificationStore for SqliteStore {
    fn level_state(&self, user_id: &str) -> EngineResult<Option<LevelState>> {
        let conn = self.db.conn()?;
        load_level_state(&conn, user_id)
    }

    fn update_level_state(
        &self,
        user_id: &str,
        apply: &mut dyn FnMut(Option<&LevelState>) -> LevelState,
    ) -> EngineResult<LevelState> {
        let mut conn = self.db.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = load_level_state(&tx, user_id)?;
        let next = apply(current.as_ref());

        tx.execute(
            r#"INSERT INTO level_states
                   (user_id, level, current_xp, total_xp, xp_to_next_level, title, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
               ON CONFLICT(user_id) DO UPDATE SET
                   level = ?2, current_xp = ?3, total_xp = ?4,
                   xp_to_next_level = ?5, title = ?6, updated_at = ?7"#,
            params![
                user_id,
                next.level,
                next.current_xp,
                next.total_xp,
                next.xp_to_next_level,
                next.title,
                Utc::now().timestamp_millis(),
            ],
        )?;
        tx.commit()?;

        Ok(next)
    }

    fn streaks(&self, user_id: &str) -> EngineResult<Vec<Streak>> {
        let conn = self.db.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {STREAK_COLUMNS} FROM streaks WHERE user_id = ?1 ORDER BY kind, target_id"
        ))?;
        let rows = stmt
            .query_map([user_id], StreakRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let mut streaks = rows
            .into_iter()
            .map(StreakRow::into_streak)
            .collect::<EngineResult<Vec<_>>>()?;
        // Kind order of the enum, not of the stored string
        streaks.sort_by(|a, b| (a.kind, &a.target_id).cmp(&(b.kind, &b.target_id)));
        Ok(streaks)
    }

    fn update_streak(
        &self,
        key: &StreakKey,
        apply: &mut dyn FnMut(Option<&Streak>) -> Streak,
    ) -> EngineResult<Streak> {
        let mut conn = self.db.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = load_streak(&tx, key)?;
        let next = apply(current.as_ref());

        if current.as_ref() != Some(&next) {
            tx.execute(
                r#"INSERT INTO streaks
                       (user_id, kind, target_id, current_streak, longest_streak,
                        last_activity_date, streak_start_date, updated_at)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                   ON CONFLICT(user_id, kind, target_id) DO UPDATE SET
                       current_streak = ?4, longest_streak = ?5,
                       last_activity_date = ?6, streak_start_date = ?7, updated_at = ?8"#,
                params![
                    key.user_id,
                    key.kind.as_str(),
                    key.target_id.as_deref().unwrap_or(""),
                    next.current_streak,
                    next.longest_streak,
                    day_bucket(next.last_activity_date),
                    day_bucket(next.streak_start_date),
                    Utc::now().timestamp_millis(),
                ],
            )?;
        }
        tx.commit()?;

        Ok(next)
    }

    fn max_current_streak(&self, user_id: &str, kind: StreakKind) -> EngineResult<u32> {
        let conn = self.db.conn()?;
        let max: Option<u32> = conn.query_row(
            "SELECT MAX(current_streak) FROM streaks WHERE user_id = ?1 AND kind = ?2",
            params![user_id, kind.as_str()],
            |r| r.get(0),
        )?;
        Ok(max.unwrap_or(0))
    }

    fn earned_codes(&self, user_id: &str) -> EngineResult<HashSet<String>> {
        let conn = self.db.conn()?;
        let mut stmt = conn.prepare("SELECT achievement_code FROM user_achievements WHERE user_id = ?1")?;
        let codes = stmt
            .query_map([user_id], |row| row.get(0))?
            .collect::<rusqlite::Result<HashSet<String>>>()?;
        Ok(codes)
    }

    fn insert_user_achievement(&self, achievement: &UserAchievement) -> EngineResult<bool> {
        let conn = self.db.conn()?;
        let inserted = conn.execute(
            r#"INSERT OR IGNORE INTO user_achievements (user_id, achievement_code, progress, earned_at)
               VALUES (?1, ?2, ?3, ?4)"#,
            params![
                achievement.user_id,
                achievement.achievement_code,
                achievement.progress,
                achievement.earned_at.timestamp_millis(),
            ],
        )?;
        Ok(inserted == 1)
    }

    fn user_achievements(&self, user_id: &str) -> EngineResult<Vec<UserAchievement>> {
        let conn = self.db.conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT user_id, achievement_code, progress, earned_at FROM user_achievements
               WHERE user_id = ?1 ORDER BY earned_at, achievement_code"#,
        )?;
        let rows = stmt
            .query_map([user_id], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, f64>(2)?,
                    r.get::<_, i64>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(user_id, achievement_code, progress, earned_at)| {
                Ok(UserAchievement {
                    user_id,
                    achievement_code,
                    progress,
                    earned_at: earned_at_from(earned_at)?,
                })
            })
            .collect()
    }
}

impl ActivitySource for SqliteStore {
    fn user_created_at(&self, user_id: &str) -> EngineResult<Option<DateTime<Utc>>> {
        let conn = self.db.conn()?;
        let created: Option<i64> = conn
            .query_row("SELECT created_at FROM users WHERE user_id = ?1", [user_id], |r| r.get(0))
            .optional()?;
        created.map(earned_at_from).transpose()
    }

    fn habit_count(&self, user_id: &str) -> EngineResult<u64> {
        self.count("SELECT COUNT(*) FROM habits WHERE user_id = ?1", user_id)
    }

    fn habit_category_count(&self, user_id: &str) -> EngineResult<u64> {
        self.count(
            "SELECT COUNT(DISTINCT category) FROM habits WHERE user_id = ?1 AND category IS NOT NULL",
            user_id,
        )
    }

    fn perfect_habit_log_count(&self, user_id: &str) -> EngineResult<u64> {
        let conn = self.db.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM habit_logs WHERE user_id = ?1 AND status = ?2 AND quality_rating = ?3",
            params![user_id, HabitLogStatus::Completed.as_str(), PERFECT_QUALITY_RATING],
            |r| r.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    fn mood_entry_count(&self, user_id: &str) -> EngineResult<u64> {
        self.count("SELECT COUNT(*) FROM mood_entries WHERE user_id = ?1", user_id)
    }

    fn dream_entry_count(&self, user_id: &str) -> EngineResult<u64> {
        self.count("SELECT COUNT(*) FROM dream_entries WHERE user_id = ?1", user_id)
    }

    fn decision_count(&self, user_id: &str) -> EngineResult<u64> {
        self.count("SELECT COUNT(*) FROM decisions WHERE user_id = ?1", user_id)
    }

    fn insight_count(&self, user_id: &str) -> EngineResult<u64> {
        self.count("SELECT COUNT(*) FROM insights WHERE user_id = ?1", user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gamification::achievements::{advance, apply_xp};
    use chrono::NaiveDate;
    use std::sync::Arc;
    use std::thread;
    use tempfile::tempdir;

    #[test]
    fn test_level_state_roundtrip() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.level_state("u1").unwrap().is_none());

        let state = store
            .update_level_state("u1", &mut |current| apply_xp(current, "u1", 130))
            .unwrap();
        assert_eq!(state.level, 2);

        let loaded = store.level_state("u1").unwrap().unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_unscoped_and_scoped_streaks_are_distinct() {
        let store = SqliteStore::open_in_memory().unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let overall = StreakKey::new("u1", StreakKind::OverallHabits, None).unwrap();
        let habit = StreakKey::new("u1", StreakKind::HabitSpecific, Some("h1")).unwrap();

        for key in [&overall, &habit] {
            store
                .update_streak(key, &mut |current| advance(current, key, today).0)
                .unwrap();
        }

        let streaks = store.streaks("u1").unwrap();
        assert_eq!(streaks.len(), 2);
        assert_eq!(streaks[0].kind, StreakKind::HabitSpecific);
        assert_eq!(streaks[0].target_id.as_deref(), Some("h1"));
        assert_eq!(streaks[1].target_id, None);
        assert_eq!(streaks[1].last_activity_date, today);
    }

    #[test]
    fn test_insert_user_achievement_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        let earned = UserAchievement {
            user_id: "u1".into(),
            achievement_code: "decision_maker".into(),
            progress: 1.0,
            earned_at: Utc::now(),
        };
        assert!(store.insert_user_achievement(&earned).unwrap());
        assert!(!store.insert_user_achievement(&earned).unwrap());

        let all = store.user_achievements("u1").unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].earned_at.timestamp_millis(), earned.earned_at.timestamp_millis());
    }

    #[test]
    fn test_concurrent_level_updates_lose_nothing() {
        let dir = tempdir().unwrap();
        let store = Arc::new(SqliteStore::open(&dir.path().join("race.db")).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..25 {
                        store
                            .update_level_state("u1", &mut |current| apply_xp(current, "u1", 7))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let state = store.level_state("u1").unwrap().unwrap();
        assert_eq!(state.total_xp, 4 * 25 * 7);
        assert!(state.current_xp < state.xp_to_next_level);
    }

    #[test]
    fn test_corrupt_streak_row_is_persistence_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .db()
            .conn()
            .unwrap()
            .execute(
                "INSERT INTO streaks VALUES ('u1', 'napping', '', 1, 1, '2024-01-01', '2024-01-01', 0)",
                [],
            )
            .unwrap();
        assert!(matches!(store.streaks("u1"), Err(EngineError::Persistence(_))));
    }
}
