use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{OptionalExtension, params};

use super::{Database, now_rfc3339};
use crate::models::{NewWeightEntry, WeightEntry};

const DATE_FORMAT: &str = "%Y-%m-%d";

impl Database {
    fn weight_entry_from_row(row: &rusqlite::Row) -> rusqlite::Result<WeightEntry> {
        let date_str: String = row.get(0)?;
        let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;
        Ok(WeightEntry {
            date,
            weight_kg: row.get(1)?,
            notes: row.get(2)?,
            updated_at: row.get(3)?,
        })
    }

    /// One entry per date; logging the same date again replaces it.
    pub fn upsert_weight(&self, entry: &NewWeightEntry) -> Result<WeightEntry> {
        let now = now_rfc3339();
        let date_str = entry.date.format(DATE_FORMAT).to_string();
        self.conn.execute(
            "INSERT INTO weight_entries (date, weight_kg, notes, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(date) DO UPDATE SET
                weight_kg = excluded.weight_kg,
                notes = excluded.notes,
                updated_at = excluded.updated_at",
            params![date_str, entry.weight_kg, entry.notes, now],
        )?;
        tracing::debug!(date = %entry.date, weight_kg = entry.weight_kg, "weight upserted");
        self.get_weight(entry.date)?
            .context("Weight entry not found after upsert")
    }

    pub fn get_weight(&self, date: NaiveDate) -> Result<Option<WeightEntry>> {
        Ok(self
            .conn
            .query_row(
                "SELECT date, weight_kg, notes, updated_at FROM weight_entries WHERE date = ?1",
                params![date.format(DATE_FORMAT).to_string()],
                Self::weight_entry_from_row,
            )
            .optional()?)
    }

    pub fn get_latest_weight(&self) -> Result<Option<WeightEntry>> {
        Ok(self
            .conn
            .query_row(
                "SELECT date, weight_kg, notes, updated_at FROM weight_entries
                 ORDER BY date DESC LIMIT 1",
                [],
                Self::weight_entry_from_row,
            )
            .optional()?)
    }

    /// Entries on or after `since` (all when `None`), newest first.
    pub fn get_weight_history(&self, since: Option<NaiveDate>) -> Result<Vec<WeightEntry>> {
        let since = since.map(|d| d.format(DATE_FORMAT).to_string());
        let mut stmt = self.conn.prepare(
            "SELECT date, weight_kg, notes, updated_at FROM weight_entries
             WHERE ?1 IS NULL OR date >= ?1
             ORDER BY date DESC",
        )?;
        let entries = stmt
            .query_map(params![since], Self::weight_entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn delete_weight(&self, date: NaiveDate) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM weight_entries WHERE date = ?1",
            params![date.format(DATE_FORMAT).to_string()],
        )?;
        Ok(rows > 0)
    }

    pub fn count_weight_entries(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM weight_entries", [], |row| row.get(0))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(date: NaiveDate, weight_kg: f64) -> NewWeightEntry {
        NewWeightEntry {
            date,
            weight_kg,
            notes: None,
        }
    }

    #[test]
    fn test_same_date_replaces() {
        let db = Database::open_in_memory().unwrap();
        let day = ymd(2024, 6, 15);
        db.upsert_weight(&entry(day, 80.0)).unwrap();
        let mut second = entry(day, 79.4);
        second.notes = Some("after run".to_string());
        let saved = db.upsert_weight(&second).unwrap();

        assert_eq!(db.count_weight_entries().unwrap(), 1);
        assert!((saved.weight_kg - 79.4).abs() < f64::EPSILON);
        assert_eq!(saved.notes.as_deref(), Some("after run"));
        let fetched = db.get_weight(day).unwrap().unwrap();
        assert!((fetched.weight_kg - 79.4).abs() < f64::EPSILON);
    }

    #[test]
    fn test_history_and_latest() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_weight(&entry(ymd(2024, 6, 1), 81.0)).unwrap();
        db.upsert_weight(&entry(ymd(2024, 6, 10), 80.2)).unwrap();
        db.upsert_weight(&entry(ymd(2024, 6, 15), 79.8)).unwrap();

        let all = db.get_weight_history(None).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].date, ymd(2024, 6, 15));

        let recent = db.get_weight_history(Some(ymd(2024, 6, 10))).unwrap();
        assert_eq!(recent.len(), 2);

        let latest = db.get_latest_weight().unwrap().unwrap();
        assert_eq!(latest.date, ymd(2024, 6, 15));
    }

    #[test]
    fn test_delete_weight() {
        let db = Database::open_in_memory().unwrap();
        let day = ymd(2024, 6, 15);
        assert!(db.get_latest_weight().unwrap().is_none());
        db.upsert_weight(&entry(day, 80.0)).unwrap();
        assert!(db.delete_weight(day).unwrap());
        assert!(!db.delete_weight(day).unwrap());
        assert!(db.get_weight(day).unwrap().is_none());
    }
}
