use anyhow::Result;
use chrono::NaiveDate;

use super::{SharedDb, lock};
use crate::events::{ChangeBus, StoreChange};
use crate::models::{NewWeightEntry, WeightEntry, validate_weight};

#[derive(Clone)]
pub struct WeightRepository {
    db: SharedDb,
    bus: ChangeBus,
}

impl WeightRepository {
    #[must_use]
    pub fn new(db: SharedDb, bus: ChangeBus) -> Self {
        Self { db, bus }
    }

    /// Replaces any entry already logged for the same date.
    pub fn log(&self, entry: &NewWeightEntry) -> Result<WeightEntry> {
        validate_weight(entry.weight_kg)?;
        let saved = lock(&self.db).upsert_weight(entry)?;
        self.bus.publish(StoreChange::WeightEntries);
        Ok(saved)
    }

    pub fn get(&self, date: NaiveDate) -> Result<Option<WeightEntry>> {
        lock(&self.db).get_weight(date)
    }

    pub fn latest(&self) -> Result<Option<WeightEntry>> {
        lock(&self.db).get_latest_weight()
    }

    pub fn history(&self, since: Option<NaiveDate>) -> Result<Vec<WeightEntry>> {
        lock(&self.db).get_weight_history(since)
    }

    pub fn delete(&self, date: NaiveDate) -> Result<bool> {
        let deleted = lock(&self.db).delete_weight(date)?;
        if deleted {
            self.bus.publish(StoreChange::WeightEntries);
        }
        Ok(deleted)
    }
}
