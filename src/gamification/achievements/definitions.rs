//! Achievement definitions and metadata
//!
//! The builtin catalog lives here. Deployments can append entries through
//! configuration; the resulting catalog is built once at startup and never
//! changes afterwards.

use std::collections::HashSet;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::gamification::error::EngineError;

/// One achievement a user can earn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementDefinition {
    /// Unique code, also selects the progress formula
    pub code: String,
    pub name: String,
    /// Human readable requirement
    pub requirement: String,
    #[serde(default)]
    pub xp_reward: i64,
}

impl AchievementDefinition {
    pub fn new(code: &str, name: &str, requirement: &str, xp_reward: i64) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            requirement: requirement.to_string(),
            xp_reward,
        }
    }
}

/// Builtin catalog entries: (code, name, requirement, xp_reward)
static BUILTIN_ACHIEVEMENTS: &[(&str, &str, &str, i64)] = &[
    ("first_habit", "First Step", "Create your first habit", 50),
    ("habit_streak_3", "Warming Up", "Keep a habit going for 3 days in a row", 30),
    ("habit_streak_7", "Week Strong", "Keep a habit going for 7 days in a row", 75),
    ("habit_streak_30", "Unbreakable", "Keep a habit going for 30 days in a row", 300),
    ("mood_logger_1", "Checking In", "Log your first mood", 10),
    ("mood_logger_30", "Self Aware", "Log 30 moods", 150),
    ("dream_journal_1", "Dreamer", "Record your first dream", 15),
    ("dream_journal_10", "Oneironaut", "Record 10 dreams", 100),
    ("decision_maker", "Decision Maker", "Analyze your first decision", 25),
    ("insight_seeker", "Insight Seeker", "Generate your first insights", 25),
    ("early_adopter", "Early Adopter", "Join before the early adopter cutoff", 100),
    ("habit_perfectionist", "Perfectionist", "Complete 10 habit logs with a perfect rating", 100),
    ("habit_consistent", "Consistent", "Complete habits 14 days in a row", 150),
    ("habit_diversity", "Well Rounded", "Create habits in 5 different categories", 75),
];

static BUILTIN_CATALOG: Lazy<AchievementCatalog> = Lazy::new(|| AchievementCatalog {
    definitions: BUILTIN_ACHIEVEMENTS
        .iter()
        .map(|(code, name, requirement, xp)| AchievementDefinition::new(code, name, requirement, *xp))
        .collect(),
});

/// Immutable achievement catalog, cheap to clone
#[derive(Debug, Clone)]
pub struct AchievementCatalog {
    definitions: Arc<[AchievementDefinition]>,
}

impl AchievementCatalog {
    /// The builtin catalog
    pub fn builtin() -> Self {
        BUILTIN_CATALOG.clone()
    }

    /// Build a catalog from explicit definitions.
    ///
    /// Codes must be unique and non-empty, rewards non-negative.
    pub fn from_definitions(definitions: Vec<AchievementDefinition>) -> Result<Self, EngineError> {
        let mut seen = HashSet::new();
        for def in &definitions {
            if def.code.trim().is_empty() {
                return Err(EngineError::invalid("achievement code must not be empty"));
            }
            if def.xp_reward < 0 {
                return Err(EngineError::invalid(format!(
                    "achievement '{}' has a negative xp reward",
                    def.code
                )));
            }
            if !seen.insert(def.code.as_str()) {
                return Err(EngineError::invalid(format!(
                    "duplicate achievement code '{}'",
                    def.code
                )));
            }
        }

        Ok(Self {
            definitions: definitions.into(),
        })
    }

    /// Builtin catalog followed by `extra`
    pub fn builtin_with(extra: Vec<AchievementDefinition>) -> Result<Self, EngineError> {
        if extra.is_empty() {
            return Ok(Self::builtin());
        }
        let mut all = BUILTIN_CATALOG.definitions.to_vec();
        all.extend(extra);
        Self::from_definitions(all)
    }

    pub fn get(&self, code: &str) -> Option<&AchievementDefinition> {
        self.definitions.iter().find(|d| d.code == code)
    }

    /// Like `get`, but a missing code is an error
    pub fn require(&self, code: &str) -> Result<&AchievementDefinition, EngineError> {
        self.get(code)
            .ok_or_else(|| EngineError::not_found("achievement", code))
    }

    pub fn iter(&self) -> impl Iterator<Item = &AchievementDefinition> {
        self.definitions.iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
