//! SQLite database connection and schema management for gamification
//!
//! Manages the `~/.momentum/gamification.db` database with automatic schema
//! migration. The activity tables belong to the host application; the
//! engine only reads them. Level, streak and achievement tables are owned
//! by the engine.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::Connection;

use super::error::EngineResult;

/// Current schema version
const SCHEMA_VERSION: i32 = 2;

/// Shared database handle
#[derive(Clone)]
pub struct GamificationDb {
    conn: Arc<Mutex<Connection>>,
}

impl GamificationDb {
    /// Open or create the database at a specific path
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database dir: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open gamification db: {}", path.display()))?;

        // WAL so the host application can read while the engine writes
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        Self::from_connection(conn)
    }

    /// Throwaway database for tests and dry runs
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory db")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Lock the connection
    pub fn conn(&self) -> EngineResult<MutexGuard<'_, Connection>> {
        Ok(self.conn.lock()?)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA_SQL)
            .context("Failed to create gamification schema")?;
        drop(conn);
        self.run_migrations()?;
        Ok(())
    }

    /// Run any pending migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        let version: i32 = conn
            .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))
            .unwrap_or(0);

        // Migration 2: index for the streak lookups done on every evaluation pass
        if version < 2 {
            conn.execute_batch(
                r#"
                CREATE INDEX IF NOT EXISTS idx_streaks_user_kind ON streaks(user_id, kind);
                CREATE INDEX IF NOT EXISTS idx_habit_logs_user ON habit_logs(user_id, status);
                "#,
            )?;
            conn.execute("INSERT OR REPLACE INTO schema_version VALUES (?1)", [SCHEMA_VERSION])?;
        }

        Ok(())
    }
}

/// SQL schema for the gamification database
const SCHEMA_SQL: &str = r#"
-- Schema version
CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY);
INSERT OR IGNORE INTO schema_version VALUES (1);

-- ============================================
-- ACTIVITY TABLES (written by the host app)
-- ============================================

CREATE TABLE IF NOT EXISTS users (
    user_id TEXT PRIMARY KEY,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS habits (
    habit_id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    name TEXT NOT NULL,
    category TEXT,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_habits_user ON habits(user_id);

CREATE TABLE IF NOT EXISTS habit_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    habit_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    status TEXT NOT NULL,               -- completed, partial, skipped
    quality_rating INTEGER,             -- 1-5
    logged_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS mood_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    mood INTEGER NOT NULL,
    logged_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_mood_user ON mood_entries(user_id);

CREATE TABLE IF NOT EXISTS dream_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    title TEXT NOT NULL,
    recorded_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_dream_user ON dream_entries(user_id);

CREATE TABLE IF NOT EXISTS decisions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    title TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS insights (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

-- ============================================
-- GAMIFICATION TABLES
-- ============================================

-- One row per user, created on first XP award
CREATE TABLE IF NOT EXISTS level_states (
    user_id TEXT PRIMARY KEY,
    level INTEGER NOT NULL DEFAULT 1,
    current_xp INTEGER NOT NULL DEFAULT 0,
    total_xp INTEGER NOT NULL DEFAULT 0,
    xp_to_next_level INTEGER NOT NULL,
    title TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);

-- target_id '' means the aggregate (unscoped) streak
CREATE TABLE IF NOT EXISTS streaks (
    user_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    target_id TEXT NOT NULL DEFAULT '',
    current_streak INTEGER NOT NULL,
    longest_streak INTEGER NOT NULL,
    last_activity_date TEXT NOT NULL,   -- YYYY-MM-DD
    streak_start_date TEXT NOT NULL,    -- YYYY-MM-DD
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (user_id, kind, target_id)
);

-- Earned achievements, never updated
CREATE TABLE IF NOT EXISTS user_achievements (
    user_id TEXT NOT NULL,
    achievement_code TEXT NOT NULL,
    progress REAL NOT NULL DEFAULT 1.0,
    earned_at INTEGER NOT NULL,
    PRIMARY KEY (user_id, achievement_code)
);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_and_init() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test_gamification.db");
        let db = GamificationDb::open(&db_path).unwrap();

        // Verify tables exist
        let conn = db.conn().unwrap();
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .unwrap();
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"level_states".to_string()));
        assert!(tables.contains(&"streaks".to_string()));
        assert!(tables.contains(&"user_achievements".to_string()));
        assert!(tables.contains(&"habit_logs".to_string()));

        let version: i32 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("reopen.db");
        drop(GamificationDb::open(&db_path).unwrap());
        assert!(GamificationDb::open(&db_path).is_ok());
    }
}
