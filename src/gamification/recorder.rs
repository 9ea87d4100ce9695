//! Activity recorder - writes host application activity rows
//!
//! In production these rows are written by the surrounding application
//! before it fires a trigger. The recorder exists so embedders and tests
//! can populate the read side the progress formulas query.

use rusqlite::params;

use super::error::{EngineError, EngineResult};
use super::models::{
    DecisionRecord, DreamEntryRecord, HabitLogRecord, HabitRecord, InsightRecord,
    MoodEntryRecord, UserRecord,
};
use super::sqlite_store::SqliteStore;
use super::store::MemoryStore;

/// Writes activity records
pub trait ActivityRecorder {
    fn record_user(&self, user: &UserRecord) -> EngineResult<()>;
    fn record_habit(&self, habit: &HabitRecord) -> EngineResult<()>;
    fn record_habit_log(&self, log: &HabitLogRecord) -> EngineResult<()>;
    fn record_mood_entry(&self, entry: &MoodEntryRecord) -> EngineResult<()>;
    fn record_dream_entry(&self, entry: &DreamEntryRecord) -> EngineResult<()>;
    fn record_decision(&self, decision: &DecisionRecord) -> EngineResult<()>;
    fn record_insight(&self, insight: &InsightRecord) -> EngineResult<()>;
}

fn check_rating(rating: Option<u8>) -> EngineResult<()> {
    match rating {
        Some(r) if !(1..=5).contains(&r) => Err(EngineError::invalid(format!(
            "quality rating must be 1-5, got {r}"
        ))),
        _ => Ok(()),
    }
}

impl ActivityRecorder for SqliteStore {
    fn record_user(&self, user: &UserRecord) -> EngineResult<()> {
        let conn = self.db().conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO users (user_id, created_at) VALUES (?1, ?2)",
            params![user.user_id, user.created_at.timestamp_millis()],
        )?;
        Ok(())
    }

    fn record_habit(&self, habit: &HabitRecord) -> EngineResult<()> {
        let conn = self.db().conn()?;
        conn.execute(
            r#"INSERT OR REPLACE INTO habits (habit_id, user_id, name, category, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
            params![
                habit.habit_id,
                habit.user_id,
                habit.name,
                habit.category,
                habit.created_at.timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    fn record_habit_log(&self, log: &HabitLogRecord) -> EngineResult<()> {
        check_rating(log.quality_rating)?;
        let conn = self.db().conn()?;
        conn.execute(
            r#"INSERT INTO habit_logs (habit_id, user_id, status, quality_rating, logged_at)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
            params![
                log.habit_id,
                log.user_id,
                log.status.as_str(),
                log.quality_rating,
                log.logged_at.timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    fn record_mood_entry(&self, entry: &MoodEntryRecord) -> EngineResult<()> {
        let conn = self.db().conn()?;
        conn.execute(
            "INSERT INTO mood_entries (user_id, mood, logged_at) VALUES (?1, ?2, ?3)",
            params![entry.user_id, entry.mood, entry.logged_at.timestamp_millis()],
        )?;
        Ok(())
    }

    fn record_dream_entry(&self, entry: &DreamEntryRecord) -> EngineResult<()> {
        let conn = self.db().conn()?;
        conn.execute(
            "INSERT INTO dream_entries (user_id, title, recorded_at) VALUES (?1, ?2, ?3)",
            params![entry.user_id, entry.title, entry.recorded_at.timestamp_millis()],
        )?;
        Ok(())
    }

    fn record_decision(&self, decision: &DecisionRecord) -> EngineResult<()> {
        let conn = self.db().conn()?;
        conn.execute(
            "INSERT INTO decisions (user_id, title, created_at) VALUES (?1, ?2, ?3)",
            params![decision.user_id, decision.title, decision.created_at.timestamp_millis()],
        )?;
        Ok(())
    }

    fn record_insight(&self, insight: &InsightRecord) -> EngineResult<()> {
        let conn = self.db().conn()?;
        conn.execute(
            "INSERT INTO insights (user_id, created_at) VALUES (?1, ?2)",
            params![insight.user_id, insight.created_at.timestamp_millis()],
        )?;
        Ok(())
    }
}

impl ActivityRecorder for MemoryStore {
    fn record_user(&self, user: &UserRecord) -> EngineResult<()> {
        self.lock()?
            .users
            .insert(user.user_id.clone(), user.created_at);
        Ok(())
    }

    fn record_habit(&self, habit: &HabitRecord) -> EngineResult<()> {
        let mut state = self.lock()?;
        state.habits.retain(|h| h.habit_id != habit.habit_id);
        state.habits.push(habit.clone());
        Ok(())
    }

    fn record_habit_log(&self, log: &HabitLogRecord) -> EngineResult<()> {
        check_rating(log.quality_rating)?;
        self.lock()?.habit_logs.push(log.clone());
        Ok(())
    }

    fn record_mood_entry(&self, entry: &MoodEntryRecord) -> EngineResult<()> {
        self.lock()?.moods.push(entry.clone());
        Ok(())
    }

    fn record_dream_entry(&self, entry: &DreamEntryRecord) -> EngineResult<()> {
        self.lock()?.dreams.push(entry.clone());
        Ok(())
    }

    fn record_decision(&self, decision: &DecisionRecord) -> EngineResult<()> {
        self.lock()?.decisions.push(decision.clone());
        Ok(())
    }

    fn record_insight(&self, insight: &InsightRecord) -> EngineResult<()> {
        self.lock()?.insights.push(insight.clone());
        Ok(())
    }
}
