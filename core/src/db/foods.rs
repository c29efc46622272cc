use anyhow::{Context, Result};
use rusqlite::{OptionalExtension, params};

use super::{Database, like_pattern, now_rfc3339};
use crate::diary::DayBounds;
use crate::models::{
    FoodLog, FoodLogWithTemplate, FoodTemplate, Macros, NewFoodLog, NewFoodTemplate, PerHundred,
};

/// Why a food log edit could not be applied.
#[derive(Debug, thiserror::Error)]
pub enum LogEditError {
    #[error("Food log {0} not found")]
    NotFound(i64),
    /// The template behind the log is gone, so grams cannot be rescaled.
    /// Edit the macros directly instead.
    #[error("The food behind log {log_id} was deleted; edit its macros directly")]
    TemplateMissing { log_id: i64 },
    #[error(transparent)]
    Sql(#[from] rusqlite::Error),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

const TEMPLATE_COLUMNS: &str = "id, name, brand, barcode, calories_per_100g, protein_per_100g,
    carbs_per_100g, fat_per_100g, sugar_per_100g, salt_per_100g, image_url, image_path,
    source, created_at";

// Columns:
// 0: l.id, 1: l.template_id, 2: l.grams, 3: l.calories, 4: l.protein,
// 5: l.carbs, 6: l.fat, 7: l.timestamp,
// 8: t.name, 9: t.brand, 10: t.calories_per_100g, 11: t.protein_per_100g,
// 12: t.carbs_per_100g, 13: t.fat_per_100g
const LOG_WITH_TEMPLATE_SELECT: &str = "SELECT l.id, l.template_id, l.grams, l.calories,
        l.protein, l.carbs, l.fat, l.timestamp,
        t.name, t.brand, t.calories_per_100g, t.protein_per_100g, t.carbs_per_100g, t.fat_per_100g
     FROM food_logs l
     LEFT JOIN food_templates t ON l.template_id = t.id";

impl Database {
    // --- Row mapping helpers ---

    fn food_template_from_row(row: &rusqlite::Row) -> rusqlite::Result<FoodTemplate> {
        let source: String = row.get(12)?;
        Ok(FoodTemplate {
            id: row.get(0)?,
            name: row.get(1)?,
            brand: row.get(2)?,
            barcode: row.get(3)?,
            calories_per_100g: row.get(4)?,
            protein_per_100g: row.get(5)?,
            carbs_per_100g: row.get(6)?,
            fat_per_100g: row.get(7)?,
            sugar_per_100g: row.get(8)?,
            salt_per_100g: row.get(9)?,
            image_url: row.get(10)?,
            image_path: row.get(11)?,
            source: source.parse().map_err(|e: anyhow::Error| {
                rusqlite::Error::FromSqlConversionFailure(
                    12,
                    rusqlite::types::Type::Text,
                    e.into(),
                )
            })?,
            created_at: row.get(13)?,
        })
    }

    fn food_log_from_row(row: &rusqlite::Row) -> rusqlite::Result<FoodLog> {
        Ok(FoodLog {
            id: row.get(0)?,
            template_id: row.get(1)?,
            grams: row.get(2)?,
            calories: row.get(3)?,
            protein: row.get(4)?,
            carbs: row.get(5)?,
            fat: row.get(6)?,
            timestamp: row.get(7)?,
        })
    }

    fn food_log_with_template_from_row(
        row: &rusqlite::Row,
    ) -> rusqlite::Result<FoodLogWithTemplate> {
        let log = Self::food_log_from_row(row)?;
        let calories: Option<f64> = row.get(10)?;
        let rates = match calories {
            Some(calories) => Some(PerHundred {
                calories,
                protein: row.get(11)?,
                carbs: row.get(12)?,
                fat: row.get(13)?,
            }),
            None => None,
        };
        Ok(FoodLogWithTemplate {
            log,
            food_name: row.get(8)?,
            food_brand: row.get(9)?,
            rates,
        })
    }

    // --- Food templates ---

    pub fn insert_food_template(&self, food: &NewFoodTemplate) -> Result<FoodTemplate> {
        let now = now_rfc3339();
        self.conn.execute(
            "INSERT INTO food_templates (name, brand, barcode, calories_per_100g, protein_per_100g,
                carbs_per_100g, fat_per_100g, sugar_per_100g, salt_per_100g, image_url, image_path,
                source, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                food.name,
                food.brand,
                food.barcode,
                food.calories_per_100g,
                food.protein_per_100g,
                food.carbs_per_100g,
                food.fat_per_100g,
                food.sugar_per_100g,
                food.salt_per_100g,
                food.image_url,
                food.image_path,
                food.source.as_str(),
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, name = %food.name, source = %food.source, "food template inserted");
        self.get_food_template(id)
    }

    /// Returns the existing template when the barcode is already known.
    pub fn upsert_food_template_by_barcode(&self, food: &NewFoodTemplate) -> Result<FoodTemplate> {
        if let Some(barcode) = &food.barcode {
            if let Some(existing) = self.get_food_template_by_barcode(barcode)? {
                return Ok(existing);
            }
        }
        self.insert_food_template(food)
    }

    pub fn get_food_template(&self, id: i64) -> Result<FoodTemplate> {
        self.find_food_template(id)?
            .context("Food template not found")
    }

    pub fn find_food_template(&self, id: i64) -> Result<Option<FoodTemplate>> {
        let sql = format!("SELECT {TEMPLATE_COLUMNS} FROM food_templates WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id], Self::food_template_from_row)
            .optional()?)
    }

    pub fn get_food_template_by_barcode(&self, barcode: &str) -> Result<Option<FoodTemplate>> {
        let sql = format!("SELECT {TEMPLATE_COLUMNS} FROM food_templates WHERE barcode = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![barcode], Self::food_template_from_row)
            .optional()?)
    }

    /// Case-insensitive exact name match; the oldest template wins on duplicates.
    pub fn get_food_template_by_name(&self, name: &str) -> Result<Option<FoodTemplate>> {
        let sql = format!(
            "SELECT {TEMPLATE_COLUMNS} FROM food_templates WHERE LOWER(name) = LOWER(?1) ORDER BY id LIMIT 1"
        );
        Ok(self
            .conn
            .query_row(&sql, params![name.trim()], Self::food_template_from_row)
            .optional()?)
    }

    pub fn search_food_templates(&self, query: &str) -> Result<Vec<FoodTemplate>> {
        let sql = format!(
            "SELECT {TEMPLATE_COLUMNS} FROM food_templates
             WHERE name LIKE ?1 ESCAPE '\\' OR brand LIKE ?1 ESCAPE '\\'
             ORDER BY name LIMIT 20"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let foods = stmt
            .query_map(params![like_pattern(query)], Self::food_template_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(foods)
    }

    pub fn list_food_templates(&self, search: Option<&str>) -> Result<Vec<FoodTemplate>> {
        if let Some(query) = search {
            return self.search_food_templates(query);
        }
        let sql = format!("SELECT {TEMPLATE_COLUMNS} FROM food_templates ORDER BY name LIMIT 100");
        let mut stmt = self.conn.prepare(&sql)?;
        let foods = stmt
            .query_map([], Self::food_template_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(foods)
    }

    pub fn set_food_template_image(&self, id: i64, image_path: Option<&str>) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE food_templates SET image_path = ?1 WHERE id = ?2",
            params![image_path, id],
        )?;
        Ok(rows > 0)
    }

    /// Deletes the template; its food logs and recipe ingredient rows go with it.
    pub fn delete_food_template(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM food_templates WHERE id = ?1", params![id])?;
        if rows > 0 {
            tracing::debug!(id, "food template deleted");
        }
        Ok(rows > 0)
    }

    pub fn count_food_logs_for_template(&self, template_id: i64) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM food_logs WHERE template_id = ?1",
            params![template_id],
            |row| row.get(0),
        )?)
    }

    // --- Food logs ---

    /// Snapshots the template's macros for `grams` at insert time.
    pub fn insert_food_log(&self, log: &NewFoodLog) -> Result<FoodLog> {
        let template = self
            .find_food_template(log.template_id)?
            .with_context(|| format!("Food template {} not found", log.template_id))?;
        let macros = template.macros_for(log.grams);
        self.conn.execute(
            "INSERT INTO food_logs (template_id, grams, calories, protein, carbs, fat, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                log.template_id,
                log.grams,
                macros.calories,
                macros.protein,
                macros.carbs,
                macros.fat,
                log.timestamp,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, template_id = log.template_id, grams = log.grams, "food log inserted");
        self.get_food_log(id)
    }

    pub fn get_food_log(&self, id: i64) -> Result<FoodLog> {
        self.conn
            .query_row(
                "SELECT id, template_id, grams, calories, protein, carbs, fat, timestamp
                 FROM food_logs WHERE id = ?1",
                params![id],
                Self::food_log_from_row,
            )
            .context("Food log not found")
    }

    pub fn find_food_log_with_template(&self, id: i64) -> Result<Option<FoodLogWithTemplate>> {
        let sql = format!("{LOG_WITH_TEMPLATE_SELECT} WHERE l.id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id], Self::food_log_with_template_from_row)
            .optional()?)
    }

    /// Logs with `start <= timestamp < end`, oldest first.
    pub fn get_food_logs_between(&self, bounds: DayBounds) -> Result<Vec<FoodLogWithTemplate>> {
        let sql = format!(
            "{LOG_WITH_TEMPLATE_SELECT}
             WHERE l.timestamp >= ?1 AND l.timestamp < ?2
             ORDER BY l.timestamp, l.id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let logs = stmt
            .query_map(
                params![bounds.start_millis, bounds.end_millis],
                Self::food_log_with_template_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(logs)
    }

    /// Rescales the snapshot from the template's current per-100g rates.
    pub fn update_food_log_grams(&self, id: i64, grams: f64) -> Result<FoodLog, LogEditError> {
        let entry = self
            .find_food_log_with_template(id)?
            .ok_or(LogEditError::NotFound(id))?;
        let rates = entry
            .rates
            .ok_or(LogEditError::TemplateMissing { log_id: id })?;
        let macros = rates.macros_for(grams);
        self.conn.execute(
            "UPDATE food_logs SET grams = ?1, calories = ?2, protein = ?3, carbs = ?4, fat = ?5
             WHERE id = ?6",
            params![
                grams,
                macros.calories,
                macros.protein,
                macros.carbs,
                macros.fat,
                id
            ],
        )?;
        tracing::debug!(id, from = entry.log.grams, to = grams, "food log rescaled");
        Ok(self.get_food_log(id)?)
    }

    /// Manual edit path: overwrites the snapshot without touching the template.
    pub fn update_food_log_macros(&self, id: i64, macros: &Macros) -> Result<FoodLog> {
        let rows = self.conn.execute(
            "UPDATE food_logs SET calories = ?1, protein = ?2, carbs = ?3, fat = ?4 WHERE id = ?5",
            params![macros.calories, macros.protein, macros.carbs, macros.fat, id],
        )?;
        if rows == 0 {
            anyhow::bail!("Food log not found");
        }
        self.get_food_log(id)
    }

    pub fn update_food_log_timestamp(&self, id: i64, timestamp: i64) -> Result<FoodLog> {
        let rows = self.conn.execute(
            "UPDATE food_logs SET timestamp = ?1 WHERE id = ?2",
            params![timestamp, id],
        )?;
        if rows == 0 {
            anyhow::bail!("Food log not found");
        }
        self.get_food_log(id)
    }

    pub fn delete_food_log(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM food_logs WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    /// Most recently logged distinct templates, newest first.
    pub fn get_recent_food_templates(&self, limit: i64) -> Result<Vec<FoodTemplate>> {
        let sql = format!(
            "SELECT {TEMPLATE_COLUMNS} FROM food_templates t
             JOIN (SELECT template_id, MAX(timestamp) AS last_logged
                   FROM food_logs GROUP BY template_id) r ON r.template_id = t.id
             ORDER BY r.last_logged DESC, t.id
             LIMIT ?1"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let foods = stmt
            .query_map(params![limit], Self::food_template_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(foods)
    }
}
