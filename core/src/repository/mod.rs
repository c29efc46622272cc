//! Mutation and query entry points over the shared store.
//!
//! Every successful mutation publishes the affected tables on the
//! [`ChangeBus`](crate::events::ChangeBus) so view-state observers reload.

mod food;
mod health;
mod preferences;
mod recipe;
mod weight;
mod workout;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::db::Database;

pub use food::{DeletedTemplate, FoodRepository, ScanError};
pub use health::{HealthRepository, HealthStatus};
pub use preferences::{DEFAULT_LANGUAGE, Preferences, PreferencesRepository};
pub use recipe::RecipeRepository;
pub use weight::WeightRepository;
pub use workout::WorkoutRepository;

pub type SharedDb = Arc<Mutex<Database>>;

#[must_use]
pub fn shared(db: Database) -> SharedDb {
    Arc::new(Mutex::new(db))
}

/// Lock the store, recovering from a poisoned mutex.
pub(crate) fn lock(db: &SharedDb) -> MutexGuard<'_, Database> {
    db.lock().unwrap_or_else(PoisonError::into_inner)
}
