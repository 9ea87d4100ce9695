//! Shared test utilities for engine integration tests

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tempfile::TempDir;

use momentum::gamification::{
    AchievementCatalog, ActivityRecorder, DecisionRecord, EngineSettings, FixedClock,
    GamificationManager, HabitRecord, MoodEntryRecord, SqliteStore, UserRecord,
};

/// Engine over an on-disk SQLite database with a controllable clock
pub struct TestEngine {
    /// Keeps the database directory alive for the test
    pub dir: TempDir,
    pub store: Arc<SqliteStore>,
    pub clock: Arc<FixedClock>,
    pub gamification: GamificationManager,
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Creates an engine with the builtin catalog, starting on `start`
pub fn sqlite_engine(start: NaiveDate) -> TestEngine {
    sqlite_engine_with(start, AchievementCatalog::builtin())
}

pub fn sqlite_engine_with(start: NaiveDate, catalog: AchievementCatalog) -> TestEngine {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = Arc::new(
        SqliteStore::open(&dir.path().join("gamification.db")).expect("Failed to open test db"),
    );
    let clock = Arc::new(FixedClock::at_date(start));
    let gamification = GamificationManager::with_store(
        store.clone(),
        catalog,
        clock.clone(),
        EngineSettings::default(),
    );

    TestEngine {
        dir,
        store,
        clock,
        gamification,
    }
}

/// Registers a user and one habit, the way the host app would
pub fn seed_user_with_habit(store: &SqliteStore, user_id: &str, habit_id: &str) {
    store
        .record_user(&UserRecord {
            user_id: user_id.to_string(),
            created_at: Utc::now(),
        })
        .expect("Failed to record user");
    store
        .record_habit(&HabitRecord {
            habit_id: habit_id.to_string(),
            user_id: user_id.to_string(),
            name: format!("Habit {habit_id}"),
            category: Some("health".to_string()),
            created_at: Utc::now(),
        })
        .expect("Failed to record habit");
}

/// Writes a mood entry row, as the host app does before firing `mood_logged`
pub fn seed_mood_entry(store: &SqliteStore, user_id: &str) {
    store
        .record_mood_entry(&MoodEntryRecord {
            user_id: user_id.to_string(),
            mood: 7,
            logged_at: Utc::now(),
        })
        .expect("Failed to record mood entry");
}

/// Writes a decision row, as the host app does before firing `decision_analyzed`
pub fn seed_decision(store: &SqliteStore, user_id: &str) {
    store
        .record_decision(&DecisionRecord {
            user_id: user_id.to_string(),
            title: "Switch teams".to_string(),
            created_at: Utc::now(),
        })
        .expect("Failed to record decision");
}
