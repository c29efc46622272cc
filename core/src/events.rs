//! Change notifications from the store to whoever renders it.
//!
//! Repositories publish a [`StoreChange`] after every successful mutation.
//! Consumers attach with [`ChangeBus::subscribe`] and detach by dropping the
//! returned [`Subscription`].

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreChange {
    FoodTemplates,
    FoodLogs,
    Recipes,
    RecipeLogs,
    Exercises,
    WorkoutSessions,
    WorkoutPlans,
    WeightEntries,
    Preferences,
}

#[derive(Debug, Clone)]
pub struct ChangeBus {
    tx: broadcast::Sender<StoreChange>,
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ChangeBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Fire-and-forget: having no subscribers is not an error.
    pub fn publish(&self, change: StoreChange) {
        let receivers = self.tx.send(change).unwrap_or(0);
        tracing::trace!(?change, receivers, "store change published");
    }

    /// Subscribe to the given tables; an empty filter means every table.
    #[must_use]
    pub fn subscribe(&self, filter: &[StoreChange]) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            filter: filter.to_vec(),
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[derive(Debug)]
pub struct Subscription {
    rx: broadcast::Receiver<StoreChange>,
    filter: Vec<StoreChange>,
}

impl Subscription {
    fn wants(&self, change: StoreChange) -> bool {
        self.filter.is_empty() || self.filter.contains(&change)
    }

    /// Consume everything queued so far; true when any of it was relevant.
    ///
    /// A lagged receiver has missed events and reports a change.
    pub fn drain(&mut self) -> bool {
        let mut relevant = false;
        loop {
            match self.rx.try_recv() {
                Ok(change) => relevant |= self.wants(change),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "subscription lagged");
                    relevant = true;
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return relevant,
            }
        }
    }

    /// Wait until a relevant change (or a lag) arrives. False once the bus is gone.
    pub async fn changed(&mut self) -> bool {
        loop {
            match self.rx.recv().await {
                Ok(change) if self.wants(change) => return true,
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "subscription lagged");
                    return true;
                }
                Err(RecvError::Closed) => return false,
            }
        }
    }
}
