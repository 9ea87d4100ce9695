//! Momentum - gamification engine
//!
//! Momentum turns domain events from a self-improvement app (habit
//! completed, mood logged, dream recorded, ...) into XP, levels, daily
//! activity streaks and achievements.
//!
//! ## Entry Points
//!
//! 1. **Triggers**: `TriggerDispatcher` runs a named domain event
//!    synchronously; `TriggerQueue` runs them on a background worker.
//!
//! 2. **Queries**: `StatusQuery` returns the level, streaks and earned
//!    achievements of a user for display.

pub mod config;
pub mod gamification;
