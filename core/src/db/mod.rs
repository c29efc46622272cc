mod foods;
mod recipes;
mod settings;
mod weight;
mod workouts;

pub use foods::LogEditError;

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use rusqlite::Connection;

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        // Cascades below depend on this; SQLite leaves it off per connection.
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    #[allow(clippy::too_many_lines)]
    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS food_templates (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    brand TEXT,
                    barcode TEXT UNIQUE,
                    calories_per_100g REAL NOT NULL,
                    protein_per_100g REAL NOT NULL DEFAULT 0,
                    carbs_per_100g REAL NOT NULL DEFAULT 0,
                    fat_per_100g REAL NOT NULL DEFAULT 0,
                    sugar_per_100g REAL,
                    salt_per_100g REAL,
                    image_url TEXT,
                    image_path TEXT,
                    source TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS food_logs (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    template_id INTEGER NOT NULL REFERENCES food_templates(id) ON DELETE CASCADE,
                    grams REAL NOT NULL,
                    calories INTEGER NOT NULL,
                    protein INTEGER NOT NULL,
                    carbs INTEGER NOT NULL,
                    fat INTEGER NOT NULL,
                    timestamp INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS recipes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE COLLATE NOCASE,
                    instructions TEXT,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS recipe_ingredients (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                    template_id INTEGER NOT NULL REFERENCES food_templates(id) ON DELETE CASCADE,
                    grams REAL NOT NULL
                );

                CREATE TABLE IF NOT EXISTS recipe_logs (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    recipe_id INTEGER REFERENCES recipes(id) ON DELETE SET NULL,
                    name TEXT NOT NULL,
                    instructions TEXT,
                    ingredients_json TEXT NOT NULL,
                    calories INTEGER NOT NULL,
                    protein INTEGER NOT NULL,
                    carbs INTEGER NOT NULL,
                    fat INTEGER NOT NULL,
                    timestamp INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS exercises (
                    name TEXT PRIMARY KEY NOT NULL,
                    muscle_group TEXT,
                    category TEXT NOT NULL DEFAULT 'strength'
                );

                CREATE TABLE IF NOT EXISTS workout_sessions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    exercise_name TEXT NOT NULL REFERENCES exercises(name) ON DELETE CASCADE,
                    sets INTEGER NOT NULL,
                    reps INTEGER NOT NULL,
                    weight_kg REAL NOT NULL,
                    timestamp INTEGER NOT NULL,
                    notes TEXT
                );

                CREATE TABLE IF NOT EXISTS workout_plans (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE COLLATE NOCASE,
                    weekly_goal INTEGER NOT NULL CHECK (weekly_goal > 0),
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS plan_exercises (
                    plan_id INTEGER NOT NULL REFERENCES workout_plans(id) ON DELETE CASCADE,
                    exercise_name TEXT NOT NULL REFERENCES exercises(name) ON DELETE CASCADE,
                    position INTEGER NOT NULL,
                    PRIMARY KEY (plan_id, exercise_name)
                );

                CREATE TABLE IF NOT EXISTS weight_entries (
                    date TEXT PRIMARY KEY NOT NULL,
                    weight_kg REAL NOT NULL,
                    notes TEXT,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS user_settings (
                    key TEXT PRIMARY KEY NOT NULL,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_food_templates_name ON food_templates(name);
                CREATE INDEX IF NOT EXISTS idx_food_logs_timestamp ON food_logs(timestamp);
                CREATE INDEX IF NOT EXISTS idx_food_logs_template ON food_logs(template_id);
                CREATE INDEX IF NOT EXISTS idx_recipe_ingredients_recipe ON recipe_ingredients(recipe_id);
                CREATE INDEX IF NOT EXISTS idx_recipe_logs_timestamp ON recipe_logs(timestamp);
                CREATE INDEX IF NOT EXISTS idx_workout_sessions_timestamp ON workout_sessions(timestamp);
                CREATE INDEX IF NOT EXISTS idx_workout_sessions_exercise ON workout_sessions(exercise_name);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    pub fn schema_version(&self) -> Result<i64> {
        Ok(self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?)
    }

    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> Result<()> {
        Ok(self.conn.execute_batch(sql)?)
    }
}

fn now_rfc3339() -> String {
    Local::now().to_rfc3339()
}

/// Escape a user query for `LIKE ... ESCAPE '\'`.
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_sets_version() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.schema_version().unwrap(), 1);
        // second run is a no-op
        db.migrate().unwrap();
        assert_eq!(db.schema_version().unwrap(), 1);
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let db = Database::open_in_memory().unwrap();
        let enabled: i64 = db
            .conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn test_open_file_reopens_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stride.db");
        {
            let db = Database::open(&path).unwrap();
            db.set_setting("language", "de").unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.get_setting("language").unwrap().as_deref(), Some("de"));
    }

    #[test]
    fn test_like_pattern_escapes() {
        assert_eq!(like_pattern("50%_a\\b"), "%50\\%\\_a\\\\b%");
    }
}
