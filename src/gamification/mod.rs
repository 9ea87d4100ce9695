//! Gamification engine for Momentum
//!
//! Awards XP and levels, tracks daily activity streaks and evaluates an
//! achievement catalog. State lives in a SQLite database
//! (`~/.momentum/gamification.db`) or any other `Store` implementation.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐
//! │  Request        │     │  TriggerQueue   │
//! │  handlers       ├────►│  (tokio worker) │
//! └─────────────────┘     └────────┬────────┘
//!                                  ▼
//!                         TriggerDispatcher
//!                                  ▼
//!                  AchievementManager (XP, streaks,
//!                  achievement evaluation)
//!                                  ▼
//!                          dyn Store (SQLite)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let gamification = GamificationManager::open(&config, None)?;
//!
//! // Report a domain event after the habit log was written
//! let outcome = gamification.dispatcher().habit_completed("user-1", "habit-7");
//!
//! // Read for display
//! let status = gamification.query().status("user-1")?;
//! ```

mod achievements;
mod db;
mod error;
mod models;
mod queries;
mod queue;
mod recorder;
mod sqlite_store;
mod store;
mod time_bucket;
mod triggers;

pub use achievements::{
    advance, apply_xp, progress_for, threshold_for, title_for, AchievementCatalog,
    AchievementDefinition, AchievementManager, AchievementProgress, EarnedAchievement,
    EngineSettings, EvaluationFailure, EvaluationReport, GamificationEvent, LevelState, LevelUp,
    ProgressRule, Streak, StreakKey, StreakKind, StreakTransition, StreakUpdate, XpAward,
    XpRewards,
};
pub use db::GamificationDb;
pub use error::{EngineError, EngineResult};
pub use models::{
    DecisionRecord, DreamEntryRecord, GamificationStatus, HabitLogRecord, HabitLogStatus,
    HabitRecord, InsightRecord, MoodEntryRecord, UserAchievement, UserRecord,
    PERFECT_QUALITY_RATING,
};
pub use queries::StatusQuery;
pub use queue::{QueueError, TriggerQueue, TriggerTicket};
pub use recorder::ActivityRecorder;
pub use sqlite_store::SqliteStore;
pub use store::{ActivitySource, GamificationStore, MemoryStore, Store};
pub use time_bucket::{calendar_day, day_bucket, reference_offset, Clock, FixedClock, SystemClock};
pub use triggers::{
    StepOutcome, StepSummary, Trigger, TriggerDispatcher, TriggerOutcome, TriggerStep,
    TRIGGER_NAMES,
};

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;

/// Default bound of the trigger queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Central entry point for the gamification engine
///
/// Wires a store, the catalog and a clock into the manager and hands out
/// the dispatcher, status queries and the async queue.
#[derive(Clone)]
pub struct GamificationManager {
    store: Arc<dyn Store>,
    engine: Arc<AchievementManager>,
    dispatcher: Arc<TriggerDispatcher>,
    queue_capacity: usize,
}

impl GamificationManager {
    /// Open the SQLite store named by the config (or `db_override`)
    pub fn open(config: &Config, db_override: Option<&Path>) -> Result<Self> {
        let path = match db_override {
            Some(path) => path.to_path_buf(),
            None => config.database_path(),
        };
        tracing::debug!("Opening gamification store at {}", path.display());

        let store = SqliteStore::open(&path)?;
        let manager = Self::with_store(
            Arc::new(store),
            config.catalog()?,
            Arc::new(SystemClock),
            config.engine_settings()?,
        );
        Ok(manager.with_queue_capacity(config.settings.queue_capacity))
    }

    /// Builtin catalog over a fresh `MemoryStore`
    pub fn in_memory() -> Self {
        Self::with_store(
            Arc::new(MemoryStore::new()),
            AchievementCatalog::builtin(),
            Arc::new(SystemClock),
            EngineSettings::default(),
        )
    }

    pub fn with_store(
        store: Arc<dyn Store>,
        catalog: AchievementCatalog,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
    ) -> Self {
        let engine = Arc::new(AchievementManager::new(store.clone(), catalog, clock, settings));
        let dispatcher = Arc::new(TriggerDispatcher::new(engine.clone()));
        Self {
            store,
            engine,
            dispatcher,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// XP, streak and achievement operations
    pub fn engine(&self) -> &Arc<AchievementManager> {
        &self.engine
    }

    /// Synchronous trigger entry point
    pub fn dispatcher(&self) -> &Arc<TriggerDispatcher> {
        &self.dispatcher
    }

    /// Read-only status projections
    pub fn query(&self) -> StatusQuery {
        StatusQuery::new(self.store.clone())
    }

    /// Start the async trigger queue. Must be called from within a tokio runtime.
    pub fn start_queue(&self) -> TriggerQueue {
        TriggerQueue::start(self.dispatcher.clone(), self.queue_capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_wiring() {
        let gamification = GamificationManager::in_memory();
        let outcome = gamification.dispatcher().decision_analyzed("u1");
        assert!(outcome.is_complete());

        let status = gamification.query().status("u1").unwrap();
        assert_eq!(status.level.total_xp, 20);
        assert_eq!(gamification.engine().catalog().len(), 14);
    }

    #[test]
    fn test_open_with_db_override() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("g.db");
        let gamification = GamificationManager::open(&Config::default(), Some(db_path.as_path())).unwrap();

        gamification.dispatcher().first_habit_created("u1");
        assert!(db_path.exists());
        assert_eq!(gamification.query().status("u1").unwrap().level.total_xp, 50);
    }
}
