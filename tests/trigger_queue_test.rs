//! Trigger queue tests: triggers submitted from async code are applied in
//! order by the background worker.

mod common;

use common::{day, seed_decision, seed_mood_entry, seed_user_with_habit, sqlite_engine};
use momentum::gamification::{GamificationStore, QueueError, StreakKind, Trigger};

fn habit(user: &str, habit: &str) -> Trigger {
    Trigger::from_name("habit_completed", user, Some(habit)).unwrap()
}

#[tokio::test]
async fn test_queue_applies_triggers_in_order() {
    let engine = sqlite_engine(day(2024, 3, 1));
    seed_user_with_habit(&engine.store, "u1", "h1");
    let queue = engine.gamification.start_queue();

    let mut tickets = Vec::new();
    for _ in 0..3 {
        tickets.push(queue.submit(habit("u1", "h1")).await.unwrap());
    }

    let mut outcomes = Vec::new();
    for ticket in tickets {
        outcomes.push(ticket.wait().await.unwrap());
    }
    queue.shutdown().await;

    assert!(outcomes.iter().all(|o| o.is_complete()));
    // Only the first trigger of the day unlocks first_habit
    let first_report = outcomes[0].xp_award().unwrap().evaluation.as_ref().unwrap();
    assert_eq!(first_report.earned_codes(), vec!["first_habit"]);
    assert!(outcomes[1].xp_award().unwrap().evaluation.as_ref().unwrap().earned.is_empty());

    // 3 x 10 + 50
    let level = engine.store.level_state("u1").unwrap().unwrap();
    assert_eq!(level.total_xp, 80);

    let streaks = engine.store.streaks("u1").unwrap();
    let habit_streak = streaks
        .iter()
        .find(|s| s.kind == StreakKind::HabitSpecific)
        .unwrap();
    assert_eq!(habit_streak.current_streak, 1);
}

#[tokio::test]
async fn test_ticket_ids_are_unique() {
    let engine = sqlite_engine(day(2024, 3, 1));
    seed_mood_entry(&engine.store, "u2");
    let queue = engine.gamification.start_queue();

    let a = queue.submit(Trigger::from_name("mood_logged", "u1", None).unwrap()).await.unwrap();
    let b = queue.submit(Trigger::from_name("mood-logged", "u2", None).unwrap()).await.unwrap();
    assert_ne!(a.id, b.id);

    a.wait().await.unwrap();
    b.wait().await.unwrap();
    queue.shutdown().await;

    // u2 has a mood entry and earns mood_logger_1; u1 only gets the trigger XP
    assert_eq!(engine.store.level_state("u1").unwrap().unwrap().total_xp, 5);
    assert_eq!(engine.store.level_state("u2").unwrap().unwrap().total_xp, 5 + 10);
}

#[tokio::test]
async fn test_try_submit_reports_full_queue() {
    let engine = sqlite_engine(day(2024, 3, 1));
    seed_decision(&engine.store, "u1");
    let queue = engine.gamification.clone().with_queue_capacity(1).start_queue();

    // Submit faster than the worker drains; at least one attempt must bounce
    let mut results = Vec::new();
    for _ in 0..200 {
        results.push(queue.try_submit(Trigger::from_name("decision_analyzed", "u1", None).unwrap()));
    }
    queue.shutdown().await;

    let accepted = results.iter().filter(|r| r.is_ok()).count();
    assert!(accepted >= 1);
    assert!(results.iter().any(|r| matches!(r, Err(QueueError::Full))));

    // Every accepted trigger was applied before shutdown returned;
    // decision_maker (+25) is earned once
    let total = engine.store.level_state("u1").unwrap().unwrap().total_xp;
    assert_eq!(total, accepted as i64 * 20 + 25);
}
