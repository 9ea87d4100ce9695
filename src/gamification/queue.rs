//! Asynchronous trigger queue
//!
//! Request handlers submit triggers without waiting for the engine. A single
//! worker drains a bounded channel and runs each trigger on the blocking
//! pool, so triggers are applied in submission order. Failures are logged by
//! the worker; callers that care can hold on to the ticket and await the
//! outcome.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::triggers::{Trigger, TriggerDispatcher, TriggerOutcome};

/// Errors from submitting to or waiting on the queue
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("Trigger queue is full")]
    Full,

    #[error("Trigger queue is shut down")]
    Closed,

    #[error("Trigger {0} was dropped before it completed")]
    Dropped(Uuid),
}

struct QueuedTrigger {
    id: Uuid,
    trigger: Trigger,
    reply: oneshot::Sender<TriggerOutcome>,
}

/// Handle to a submitted trigger
#[derive(Debug)]
pub struct TriggerTicket {
    pub id: Uuid,
    reply: oneshot::Receiver<TriggerOutcome>,
}

impl TriggerTicket {
    /// Wait until the worker has applied the trigger
    pub async fn wait(self) -> Result<TriggerOutcome, QueueError> {
        self.reply.await.map_err(|_| QueueError::Dropped(self.id))
    }

    /// Stop tracking the trigger; it is still applied
    pub fn detach(self) -> Uuid {
        self.id
    }
}

/// Bounded queue in front of a `TriggerDispatcher`
pub struct TriggerQueue {
    tx: mpsc::Sender<QueuedTrigger>,
    worker: JoinHandle<()>,
}

impl TriggerQueue {
    /// Start the worker. Must be called from within a tokio runtime.
    pub fn start(dispatcher: Arc<TriggerDispatcher>, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let worker = spawn_worker(rx, dispatcher);
        Self { tx, worker }
    }

    fn enqueue(trigger: Trigger) -> (QueuedTrigger, TriggerTicket) {
        let id = Uuid::new_v4();
        let (reply_tx, reply_rx) = oneshot::channel();
        (
            QueuedTrigger {
                id,
                trigger,
                reply: reply_tx,
            },
            TriggerTicket { id, reply: reply_rx },
        )
    }

    /// Submit a trigger, waiting for queue space if needed
    pub async fn submit(&self, trigger: Trigger) -> Result<TriggerTicket, QueueError> {
        let (job, ticket) = Self::enqueue(trigger);
        self.tx.send(job).await.map_err(|_| QueueError::Closed)?;
        Ok(ticket)
    }

    /// Submit a trigger without waiting
    pub fn try_submit(&self, trigger: Trigger) -> Result<TriggerTicket, QueueError> {
        let (job, ticket) = Self::enqueue(trigger);
        self.tx.try_send(job).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => QueueError::Full,
            mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
        })?;
        Ok(ticket)
    }

    /// Close the queue and wait for already submitted triggers to finish
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker.await {
            tracing::error!("Trigger queue worker ended abnormally: {}", e);
        }
    }
}

fn spawn_worker(
    mut rx: mpsc::Receiver<QueuedTrigger>,
    dispatcher: Arc<TriggerDispatcher>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            let QueuedTrigger { id, trigger, reply } = job;
            let dispatcher = dispatcher.clone();

            let result = tokio::task::spawn_blocking(move || dispatcher.dispatch(&trigger)).await;
            match result {
                Ok(outcome) => {
                    if !outcome.is_complete() {
                        tracing::warn!(
                            "Trigger {} ({}) applied partially: {} step(s) failed",
                            id,
                            outcome.trigger,
                            outcome.failed().count()
                        );
                    }
                    // Receiver gone means the ticket was detached
                    let _ = reply.send(outcome);
                }
                Err(e) => {
                    tracing::error!("Trigger {} panicked in worker: {}", id, e);
                }
            }
        }
        tracing::debug!("Trigger queue worker stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gamification::achievements::{AchievementCatalog, AchievementManager, EngineSettings};
    use crate::gamification::store::{GamificationStore, MemoryStore};
    use crate::gamification::time_bucket::SystemClock;

    fn queue(capacity: usize) -> (TriggerQueue, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let manager = AchievementManager::new(
            store.clone(),
            AchievementCatalog::builtin(),
            Arc::new(SystemClock),
            EngineSettings::default(),
        );
        let dispatcher = Arc::new(TriggerDispatcher::new(Arc::new(manager)));
        (TriggerQueue::start(dispatcher, capacity), store)
    }

    fn mood(user: &str) -> Trigger {
        Trigger::MoodLogged {
            user_id: user.to_string(),
        }
    }

    #[tokio::test]
    async fn test_submit_and_wait() {
        let (queue, store) = queue(8);
        let ticket = queue.submit(mood("u1")).await.unwrap();
        let id = ticket.id;
        let outcome = ticket.wait().await.unwrap();

        assert!(outcome.is_complete());
        assert_eq!(outcome.trigger, mood("u1"));
        assert_eq!(store.level_state("u1").unwrap().unwrap().total_xp, 5);
        assert!(!id.is_nil());
        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_drains_detached_triggers() {
        let (queue, store) = queue(16);
        for _ in 0..5 {
            queue.submit(mood("u1")).await.unwrap().detach();
        }
        queue.shutdown().await;
        assert_eq!(store.level_state("u1").unwrap().unwrap().total_xp, 25);
    }

    #[tokio::test]
    async fn test_partial_failure_is_reported_not_raised() {
        let (queue, _) = queue(4);
        let outcome = queue
            .submit(Trigger::HabitCompleted {
                user_id: "u1".into(),
                habit_id: "  ".into(),
            })
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();

        // blank habit id: the scoped streak fails, the rest applies
        assert_eq!(outcome.failed().count(), 1);
        assert_eq!(outcome.succeeded().count(), 2);
        queue.shutdown().await;
    }
}
