//! Streak tracking system
//!
//! Tracks consecutive calendar days of activity per user, streak kind and
//! optional target (a specific habit). The transition itself is pure; the
//! store applies it atomically per key.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::gamification::error::EngineError;

/// Type of streak being tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakKind {
    /// One habit, scoped by habit id
    HabitSpecific,
    /// Any habit completed that day
    OverallHabits,
    MoodLogging,
    DreamJournaling,
}

impl StreakKind {
    pub const ALL: [StreakKind; 4] = [
        Self::HabitSpecific,
        Self::OverallHabits,
        Self::MoodLogging,
        Self::DreamJournaling,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HabitSpecific => "habit_specific",
            Self::OverallHabits => "overall_habits",
            Self::MoodLogging => "mood_logging",
            Self::DreamJournaling => "dream_journaling",
        }
    }

    /// Whether the kind only makes sense scoped to a target
    pub fn requires_target(&self) -> bool {
        matches!(self, Self::HabitSpecific)
    }
}

impl fmt::Display for StreakKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreakKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| EngineError::invalid(format!("unknown streak kind '{s}'")))
    }
}

/// Identity of one streak
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreakKey {
    pub user_id: String,
    pub kind: StreakKind,
    pub target_id: Option<String>,
}

impl StreakKey {
    /// Validated key: habit streaks need a habit, targets are never blank
    pub fn new(user_id: &str, kind: StreakKind, target_id: Option<&str>) -> Result<Self, EngineError> {
        if user_id.trim().is_empty() {
            return Err(EngineError::invalid("user id must not be empty"));
        }
        if target_id.is_some_and(|target| target.trim().is_empty()) {
            return Err(EngineError::invalid("streak target must not be empty"));
        }
        if kind.requires_target() && target_id.is_none() {
            return Err(EngineError::invalid(format!("streak kind '{kind}' needs a target")));
        }

        Ok(Self {
            user_id: user_id.to_string(),
            kind,
            target_id: target_id.map(str::to_string),
        })
    }
}

/// Stored streak
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak {
    pub user_id: String,
    pub kind: StreakKind,
    pub target_id: Option<String>,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_activity_date: NaiveDate,
    pub streak_start_date: NaiveDate,
}

impl Streak {
    fn start(key: &StreakKey, today: NaiveDate) -> Self {
        Self {
            user_id: key.user_id.clone(),
            kind: key.kind,
            target_id: key.target_id.clone(),
            current_streak: 1,
            longest_streak: 1,
            last_activity_date: today,
            streak_start_date: today,
        }
    }
}

/// What a recorded activity did to the streak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakTransition {
    /// First activity for this key
    Started,
    /// Already counted today
    Unchanged,
    /// Activity yesterday, counter continues
    Extended,
    /// Gap of two or more days, counter back to 1
    Reset { previous: u32 },
}

/// Advance a streak to `today`.
///
/// Dates are compared as calendar days. A stored date after `today` (clock
/// skew between writers) leaves the streak untouched.
pub fn advance(current: Option<&Streak>, key: &StreakKey, today: NaiveDate) -> (Streak, StreakTransition) {
    let Some(streak) = current else {
        return (Streak::start(key, today), StreakTransition::Started);
    };

    let yesterday = today.pred_opt();
    let last = streak.last_activity_date;

    if last >= today {
        return (streak.clone(), StreakTransition::Unchanged);
    }

    let mut next = streak.clone();
    next.last_activity_date = today;

    if Some(last) == yesterday {
        next.current_streak = streak.current_streak.saturating_add(1);
        next.longest_streak = next.longest_streak.max(next.current_streak);
        (next, StreakTransition::Extended)
    } else {
        next.current_streak = 1;
        next.streak_start_date = today;
        (
            next,
            StreakTransition::Reset {
                previous: streak.current_streak,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, n).unwrap()
    }

    fn habit_key() -> StreakKey {
        StreakKey::new("u1", StreakKind::HabitSpecific, Some("h1")).unwrap()
    }

    #[test]
    fn test_first_activity_starts_streak() {
        let (streak, transition) = advance(None, &habit_key(), day(1));
        assert_eq!(transition, StreakTransition::Started);
        assert_eq!(streak.current_streak, 1);
        assert_eq!(streak.longest_streak, 1);
        assert_eq!(streak.last_activity_date, day(1));
        assert_eq!(streak.streak_start_date, day(1));
    }

    #[test]
    fn test_same_day_is_idempotent() {
        let key = habit_key();
        let (first, _) = advance(None, &key, day(1));
        let (second, transition) = advance(Some(&first), &key, day(1));
        assert_eq!(transition, StreakTransition::Unchanged);
        assert_eq!(second, first);
    }

    #[test]
    fn test_skipped_day_scenario() {
        // D, D+1, D+2, D+4
        let key = habit_key();
        let mut current: Option<Streak> = None;
        let mut counts = Vec::new();
        for d in [1, 2, 3, 5] {
            let (next, _) = advance(current.as_ref(), &key, day(d));
            counts.push(next.current_streak);
            current = Some(next);
        }
        let streak = current.unwrap();
        assert_eq!(counts, vec![1, 2, 3, 1]);
        assert_eq!(streak.longest_streak, 3);
        assert_eq!(streak.streak_start_date, day(5));
    }

    #[test]
    fn test_reset_reports_previous_run() {
        let key = habit_key();
        let (first, _) = advance(None, &key, day(1));
        let (second, _) = advance(Some(&first), &key, day(2));
        let (third, transition) = advance(Some(&second), &key, day(10));
        assert_eq!(transition, StreakTransition::Reset { previous: 2 });
        assert_eq!(third.current_streak, 1);
        assert_eq!(third.longest_streak, 2);
    }

    #[test]
    fn test_longest_never_below_current() {
        let key = habit_key();
        let days = [1, 2, 4, 5, 6, 7, 9, 10, 20, 21, 22, 23, 24, 25];
        let mut current: Option<Streak> = None;
        let mut best_seen = 0;
        for d in days {
            let (next, _) = advance(current.as_ref(), &key, day(d));
            assert!(next.longest_streak >= next.current_streak);
            assert!(next.longest_streak >= best_seen);
            best_seen = next.longest_streak;
            current = Some(next);
        }
        assert_eq!(best_seen, 6);
    }

    #[test]
    fn test_month_boundary_continues() {
        let key = StreakKey::new("u1", StreakKind::MoodLogging, None).unwrap();
        let feb_end = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let (first, _) = advance(None, &key, feb_end);
        let (second, transition) = advance(Some(&first), &key, day(1));
        assert_eq!(transition, StreakTransition::Extended);
        assert_eq!(second.current_streak, 2);
    }

    #[test]
    fn test_future_last_activity_is_untouched() {
        let key = habit_key();
        let (first, _) = advance(None, &key, day(5));
        let (second, transition) = advance(Some(&first), &key, day(4));
        assert_eq!(transition, StreakTransition::Unchanged);
        assert_eq!(second, first);
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("mood_logging".parse::<StreakKind>().unwrap(), StreakKind::MoodLogging);
        assert!(matches!(
            "sleeping".parse::<StreakKind>(),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_key_validation() {
        assert!(StreakKey::new("u1", StreakKind::HabitSpecific, None).is_err());
        assert!(StreakKey::new("u1", StreakKind::OverallHabits, Some(" ")).is_err());
        assert!(StreakKey::new("", StreakKind::OverallHabits, None).is_err());
        assert!(StreakKey::new("u1", StreakKind::OverallHabits, None).is_ok());
    }
}
