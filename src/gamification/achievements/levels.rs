//! XP and Level system
//!
//! Level thresholds follow an exponential curve, titles follow fixed
//! breakpoints. Everything here is pure; persistence happens in the manager.

use serde::{Deserialize, Serialize};

/// XP needed to clear level 1
const BASE_LEVEL_XP: f64 = 100.0;

/// Growth factor applied per level
const LEVEL_GROWTH: f64 = 1.2;

/// Title breakpoint: levels strictly below `below` carry `title`
#[derive(Debug, Clone)]
pub struct LevelTitle {
    pub below: u32,
    pub title: &'static str,
}

/// All title breakpoints (must be sorted by `below`)
pub static LEVEL_TITLES: &[LevelTitle] = &[
    LevelTitle {
        below: 5,
        title: "Beginner",
    },
    LevelTitle {
        below: 10,
        title: "Explorer",
    },
    LevelTitle {
        below: 20,
        title: "Achiever",
    },
    LevelTitle {
        below: 35,
        title: "Expert",
    },
    LevelTitle {
        below: 50,
        title: "Master",
    },
];

const TOP_TITLE: &str = "Grandmaster";

/// XP needed to advance from `level` to `level + 1`.
///
/// `floor(100 * 1.2^(level - 1))`, computed as a floating power and then
/// floored so the curve matches existing data exactly.
pub fn threshold_for(level: u32) -> i64 {
    let exponent = f64::from(level.max(1) - 1);
    (BASE_LEVEL_XP * LEVEL_GROWTH.powf(exponent)).floor() as i64
}

/// Title for a level
pub fn title_for(level: u32) -> &'static str {
    LEVEL_TITLES
        .iter()
        .find(|t| level < t.below)
        .map(|t| t.title)
        .unwrap_or(TOP_TITLE)
}

/// Per-user level state.
///
/// Invariant: `current_xp < xp_to_next_level`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelState {
    pub user_id: String,
    pub level: u32,
    pub current_xp: i64,
    pub total_xp: i64,
    pub xp_to_next_level: i64,
    pub title: String,
}

impl LevelState {
    /// State of a user that never earned XP
    pub fn initial(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            level: 1,
            current_xp: 0,
            total_xp: 0,
            xp_to_next_level: threshold_for(1),
            title: title_for(1).to_string(),
        }
    }

    /// Add XP, rolling over as many levels as the amount covers.
    ///
    /// `amount` must already be validated as non-negative.
    pub fn with_xp(&self, amount: i64) -> Self {
        let mut next = self.clone();
        next.current_xp = next.current_xp.saturating_add(amount);
        next.total_xp = next.total_xp.saturating_add(amount);

        while next.current_xp >= next.xp_to_next_level {
            next.current_xp -= next.xp_to_next_level;
            next.level += 1;
            next.xp_to_next_level = threshold_for(next.level);
        }

        next.title = title_for(next.level).to_string();
        next
    }

    /// Calculate progress percentage to next level (0.0 - 1.0)
    pub fn progress_to_next(&self) -> f32 {
        if self.xp_to_next_level <= 0 {
            return 1.0;
        }
        (self.current_xp as f32 / self.xp_to_next_level as f32).clamp(0.0, 1.0)
    }
}

/// Apply an XP award on top of an optional stored state.
pub fn apply_xp(current: Option<&LevelState>, user_id: &str, amount: i64) -> LevelState {
    match current {
        Some(state) => state.with_xp(amount),
        None => LevelState::initial(user_id).with_xp(amount),
    }
}

/// XP rewards for the domain triggers
pub struct XpRewards;

impl XpRewards {
    pub const HABIT_COMPLETED: i64 = 10;
    pub const MOOD_LOGGED: i64 = 5;
    pub const DREAM_RECORDED: i64 = 15;
    pub const DECISION_ANALYZED: i64 = 20;
    pub const INSIGHTS_GENERATED: i64 = 25;
    pub const FIRST_HABIT_CREATED: i64 = 50;
    pub const FIRST_DREAM_RECORDED: i64 = 30;
}
