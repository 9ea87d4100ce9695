//! Trigger dispatcher - the public entry point for domain events
//!
//! Each trigger maps to a fixed list of steps against the manager. Steps
//! are isolated: a failed streak update does not undo or block the XP award
//! and vice versa. The outcome lists every step with its own result.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::achievements::{
    AchievementManager, GamificationEvent, StreakKind, StreakUpdate, XpAward, XpRewards,
};
use super::error::{EngineError, EngineResult};

/// A named domain event, reported after the host's own write committed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "trigger", rename_all = "snake_case")]
pub enum Trigger {
    HabitCompleted { user_id: String, habit_id: String },
    MoodLogged { user_id: String },
    DreamRecorded { user_id: String },
    DecisionAnalyzed { user_id: String },
    InsightsGenerated { user_id: String },
    FirstHabitCreated { user_id: String },
    FirstDreamRecorded { user_id: String },
}

/// Trigger names as accepted by `Trigger::from_name`
pub const TRIGGER_NAMES: &[&str] = &[
    "habit_completed",
    "mood_logged",
    "dream_recorded",
    "decision_analyzed",
    "insights_generated",
    "first_habit_created",
    "first_dream_recorded",
];

impl Trigger {
    /// Build a trigger from its name. `habit_id` is required for
    /// `habit_completed` and ignored otherwise. Dashes and underscores are
    /// interchangeable.
    pub fn from_name(name: &str, user_id: &str, habit_id: Option<&str>) -> EngineResult<Self> {
        let user_id = user_id.to_string();
        let normalized = name.trim().to_ascii_lowercase().replace('-', "_");

        let trigger = match normalized.as_str() {
            "habit_completed" => {
                let habit_id = habit_id
                    .filter(|h| !h.trim().is_empty())
                    .ok_or_else(|| EngineError::invalid("habit_completed needs a habit id"))?;
                Self::HabitCompleted {
                    user_id,
                    habit_id: habit_id.to_string(),
                }
            }
            "mood_logged" => Self::MoodLogged { user_id },
            "dream_recorded" => Self::DreamRecorded { user_id },
            "decision_analyzed" => Self::DecisionAnalyzed { user_id },
            "insights_generated" => Self::InsightsGenerated { user_id },
            "first_habit_created" => Self::FirstHabitCreated { user_id },
            "first_dream_recorded" => Self::FirstDreamRecorded { user_id },
            _ => return Err(EngineError::invalid(format!("unknown trigger '{name}'"))),
        };
        Ok(trigger)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::HabitCompleted { .. } => "habit_completed",
            Self::MoodLogged { .. } => "mood_logged",
            Self::DreamRecorded { .. } => "dream_recorded",
            Self::DecisionAnalyzed { .. } => "decision_analyzed",
            Self::InsightsGenerated { .. } => "insights_generated",
            Self::FirstHabitCreated { .. } => "first_habit_created",
            Self::FirstDreamRecorded { .. } => "first_dream_recorded",
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            Self::HabitCompleted { user_id, .. }
            | Self::MoodLogged { user_id }
            | Self::DreamRecorded { user_id }
            | Self::DecisionAnalyzed { user_id }
            | Self::InsightsGenerated { user_id }
            | Self::FirstHabitCreated { user_id }
            | Self::FirstDreamRecorded { user_id } => user_id,
        }
    }

    /// The steps this trigger runs, in order.
    ///
    /// Streak steps come first so the evaluation following the XP award
    /// sees today's streaks.
    pub fn steps(&self) -> Vec<TriggerStep> {
        let reason = self.name().to_string();
        let xp = |amount| TriggerStep::AwardXp {
            amount,
            reason: reason.clone(),
        };

        match self {
            Self::HabitCompleted { habit_id, .. } => vec![
                TriggerStep::RecordStreak {
                    kind: StreakKind::HabitSpecific,
                    target_id: Some(habit_id.clone()),
                },
                TriggerStep::RecordStreak {
                    kind: StreakKind::OverallHabits,
                    target_id: None,
                },
                xp(XpRewards::HABIT_COMPLETED),
            ],
            Self::MoodLogged { .. } => vec![
                TriggerStep::RecordStreak {
                    kind: StreakKind::MoodLogging,
                    target_id: None,
                },
                xp(XpRewards::MOOD_LOGGED),
            ],
            Self::DreamRecorded { .. } => vec![
                TriggerStep::RecordStreak {
                    kind: StreakKind::DreamJournaling,
                    target_id: None,
                },
                xp(XpRewards::DREAM_RECORDED),
            ],
            Self::DecisionAnalyzed { .. } => vec![xp(XpRewards::DECISION_ANALYZED)],
            Self::InsightsGenerated { .. } => vec![xp(XpRewards::INSIGHTS_GENERATED)],
            Self::FirstHabitCreated { .. } => vec![xp(XpRewards::FIRST_HABIT_CREATED)],
            Self::FirstDreamRecorded { .. } => vec![xp(XpRewards::FIRST_DREAM_RECORDED)],
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HabitCompleted { user_id, habit_id } => {
                write!(f, "{} ({}, habit {})", self.name(), user_id, habit_id)
            }
            _ => write!(f, "{} ({})", self.name(), self.user_id()),
        }
    }
}

/// One call a trigger makes into the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum TriggerStep {
    AwardXp { amount: i64, reason: String },
    RecordStreak { kind: StreakKind, target_id: Option<String> },
}

impl fmt::Display for TriggerStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwardXp { amount, .. } => write!(f, "award {amount} XP"),
            Self::RecordStreak {
                kind,
                target_id: Some(target),
            } => write!(f, "record {kind} streak for {target}"),
            Self::RecordStreak { kind, target_id: None } => write!(f, "record {kind} streak"),
        }
    }
}

/// What a successful step produced
#[derive(Debug, Clone)]
pub enum StepSummary {
    Xp(XpAward),
    Streak(StreakUpdate),
}

#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub step: TriggerStep,
    pub result: Result<StepSummary, EngineError>,
}

/// Per-step results of one dispatched trigger
#[derive(Debug, Clone)]
pub struct TriggerOutcome {
    pub trigger: Trigger,
    pub steps: Vec<StepOutcome>,
}

impl TriggerOutcome {
    /// True when every step applied
    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(|s| s.result.is_ok())
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &StepOutcome> {
        self.steps.iter().filter(|s| s.result.is_ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&TriggerStep, &EngineError)> {
        self.steps.iter().filter_map(|s| match &s.result {
            Err(err) => Some((&s.step, err)),
            Ok(_) => None,
        })
    }

    /// The XP award, when the trigger had one and it applied
    pub fn xp_award(&self) -> Option<&XpAward> {
        self.steps.iter().find_map(|s| match &s.result {
            Ok(StepSummary::Xp(award)) => Some(award),
            _ => None,
        })
    }

    /// All events in step order, including achievements unlocked by the XP award
    pub fn events(&self) -> Vec<GamificationEvent> {
        let mut events = Vec::new();
        for outcome in &self.steps {
            match &outcome.result {
                Ok(StepSummary::Streak(update)) => events.extend(update.events.iter().cloned()),
                Ok(StepSummary::Xp(award)) => {
                    events.extend(award.events.iter().cloned());
                    if let Ok(report) = &award.evaluation {
                        events.extend(report.events.iter().cloned());
                    }
                }
                Err(_) => {}
            }
        }
        events
    }
}

/// Runs triggers against the manager
#[derive(Clone)]
pub struct TriggerDispatcher {
    manager: Arc<AchievementManager>,
}

impl TriggerDispatcher {
    pub fn new(manager: Arc<AchievementManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<AchievementManager> {
        &self.manager
    }

    /// Run every step of `trigger`. Step failures are logged and reported in
    /// the outcome, never returned as an error.
    pub fn dispatch(&self, trigger: &Trigger) -> TriggerOutcome {
        let user_id = trigger.user_id();
        tracing::debug!("Dispatching trigger {}", trigger);

        let steps = trigger
            .steps()
            .into_iter()
            .map(|step| {
                let result = self.run_step(user_id, &step);
                if let Err(err) = &result {
                    tracing::warn!("Trigger {}: step '{}' failed: {}", trigger, step, err);
                }
                StepOutcome { step, result }
            })
            .collect();

        TriggerOutcome {
            trigger: trigger.clone(),
            steps,
        }
    }

    fn run_step(&self, user_id: &str, step: &TriggerStep) -> EngineResult<StepSummary> {
        match step {
            TriggerStep::AwardXp { amount, reason } => self
                .manager
                .award_xp(user_id, *amount, reason)
                .map(StepSummary::Xp),
            TriggerStep::RecordStreak { kind, target_id } => self
                .manager
                .record_activity(user_id, *kind, target_id.as_deref())
                .map(StepSummary::Streak),
        }
    }

    // ========================================
    // TYPED ENTRY POINTS
    // ========================================

    pub fn habit_completed(&self, user_id: &str, habit_id: &str) -> TriggerOutcome {
        self.dispatch(&Trigger::HabitCompleted {
            user_id: user_id.to_string(),
            habit_id: habit_id.to_string(),
        })
    }

    pub fn mood_logged(&self, user_id: &str) -> TriggerOutcome {
        self.dispatch(&Trigger::MoodLogged {
            user_id: user_id.to_string(),
        })
    }

    pub fn dream_recorded(&self, user_id: &str) -> TriggerOutcome {
        self.dispatch(&Trigger::DreamRecorded {
            user_id: user_id.to_string(),
        })
    }

    pub fn decision_analyzed(&self, user_id: &str) -> TriggerOutcome {
        self.dispatch(&Trigger::DecisionAnalyzed {
            user_id: user_id.to_string(),
        })
    }

    pub fn insights_generated(&self, user_id: &str) -> TriggerOutcome {
        self.dispatch(&Trigger::InsightsGenerated {
            user_id: user_id.to_string(),
        })
    }

    pub fn first_habit_created(&self, user_id: &str) -> TriggerOutcome {
        self.dispatch(&Trigger::FirstHabitCreated {
            user_id: user_id.to_string(),
        })
    }

    pub fn first_dream_recorded(&self, user_id: &str) -> TriggerOutcome {
        self.dispatch(&Trigger::FirstDreamRecorded {
            user_id: user_id.to_string(),
        })
    }
}
