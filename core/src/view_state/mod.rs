//! Screen state assembled from the repositories.
//!
//! Each view model has a `load` that builds an immutable snapshot and an
//! `observe` that wraps the same loader in an [`Observer`], which rebuilds the
//! snapshot whenever one of the tables it reads from changes.

mod diary;
mod home;
mod nutrition;
mod weight;
mod workout;

use anyhow::Result;

use crate::events::Subscription;

pub use diary::{DayDiary, DiaryState, DiaryViewModel, HistoryState};
pub use home::{HomeState, HomeViewModel};
pub use nutrition::{NutritionState, NutritionViewModel};
pub use weight::{WeightState, WeightViewModel};
pub use workout::{WorkoutState, WorkoutViewModel};

type Loader<T> = Box<dyn Fn() -> Result<T> + Send>;

/// Latest state of one screen, kept fresh from store changes.
pub struct Observer<T> {
    subscription: Subscription,
    loader: Loader<T>,
    current: T,
}

impl<T> Observer<T> {
    /// Loads the initial state before returning.
    pub fn new(
        subscription: Subscription,
        loader: impl Fn() -> Result<T> + Send + 'static,
    ) -> Result<Self> {
        let current = loader()?;
        Ok(Self {
            subscription,
            loader: Box::new(loader),
            current,
        })
    }

    #[must_use]
    pub fn current(&self) -> &T {
        &self.current
    }

    pub fn into_current(self) -> T {
        self.current
    }

    /// Reload if anything relevant changed since the last call.
    pub fn poll(&mut self) -> Result<bool> {
        if !self.subscription.drain() {
            return Ok(false);
        }
        self.reload()?;
        Ok(true)
    }

    /// Wait for the next relevant change and reload. `None` once the bus is gone.
    pub async fn changed(&mut self) -> Result<Option<&T>> {
        if !self.subscription.changed().await {
            return Ok(None);
        }
        // fold any burst of changes into one reload
        self.subscription.drain();
        self.reload()?;
        Ok(Some(&self.current))
    }

    pub fn reload(&mut self) -> Result<()> {
        self.current = (self.loader)()?;
        tracing::trace!("view state reloaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};

    use super::*;
    use crate::events::{ChangeBus, StoreChange};

    fn counter_observer(bus: &ChangeBus) -> (Observer<i64>, Arc<AtomicI64>) {
        let loads = Arc::new(AtomicI64::new(0));
        let seen = loads.clone();
        let observer = Observer::new(bus.subscribe(&[StoreChange::FoodLogs]), move || {
            Ok(seen.fetch_add(1, Ordering::SeqCst) + 1)
        })
        .unwrap();
        (observer, loads)
    }

    #[test]
    fn test_poll_reloads_on_relevant_change() {
        let bus = ChangeBus::default();
        let (mut observer, loads) = counter_observer(&bus);
        assert_eq!(*observer.current(), 1);

        bus.publish(StoreChange::Exercises);
        assert!(!observer.poll().unwrap());

        bus.publish(StoreChange::FoodLogs);
        bus.publish(StoreChange::FoodLogs);
        assert!(observer.poll().unwrap());
        assert_eq!(*observer.current(), 2);
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_changed_waits_for_publish() {
        let bus = ChangeBus::default();
        let (mut observer, _) = counter_observer(&bus);
        bus.publish(StoreChange::FoodLogs);
        assert_eq!(observer.changed().await.unwrap(), Some(&2));

        drop(bus);
        assert!(observer.changed().await.unwrap().is_none());
    }

    #[test]
    fn test_initial_load_error_propagates() {
        let bus = ChangeBus::default();
        let result: Result<Observer<i64>> =
            Observer::new(bus.subscribe(&[]), || anyhow::bail!("store closed"));
        assert!(result.is_err());
    }
}
