use anyhow::{Context, Result, bail};
use rusqlite::{OptionalExtension, params};

use super::{Database, now_rfc3339};
use crate::diary::DayBounds;
use crate::models::{
    IngredientSnapshot, Macros, PerHundred, Recipe, RecipeDetail, RecipeIngredient, RecipeLog,
};

const RECIPE_LOG_COLUMNS: &str = "id, recipe_id, name, instructions, ingredients_json,
    calories, protein, carbs, fat, timestamp";

impl Database {
    fn recipe_from_row(row: &rusqlite::Row) -> rusqlite::Result<Recipe> {
        Ok(Recipe {
            id: row.get(0)?,
            name: row.get(1)?,
            instructions: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    fn recipe_log_from_row(row: &rusqlite::Row) -> rusqlite::Result<RecipeLog> {
        Ok(RecipeLog {
            id: row.get(0)?,
            recipe_id: row.get(1)?,
            name: row.get(2)?,
            instructions: row.get(3)?,
            ingredients_json: row.get(4)?,
            calories: row.get(5)?,
            protein: row.get(6)?,
            carbs: row.get(7)?,
            fat: row.get(8)?,
            timestamp: row.get(9)?,
        })
    }

    // --- Recipes ---

    pub fn create_recipe(&self, name: &str, instructions: Option<&str>) -> Result<Recipe> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Recipe name must not be empty");
        }
        if self.find_recipe_by_name(name)?.is_some() {
            bail!("Recipe '{name}' already exists");
        }
        let now = now_rfc3339();
        self.conn.execute(
            "INSERT INTO recipes (name, instructions, created_at) VALUES (?1, ?2, ?3)",
            params![name, instructions, now],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, name, "recipe created");
        self.get_recipe(id)
    }

    pub fn get_recipe(&self, id: i64) -> Result<Recipe> {
        self.conn
            .query_row(
                "SELECT id, name, instructions, created_at FROM recipes WHERE id = ?1",
                params![id],
                Self::recipe_from_row,
            )
            .context("Recipe not found")
    }

    pub fn find_recipe_by_name(&self, name: &str) -> Result<Option<Recipe>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, instructions, created_at FROM recipes WHERE LOWER(name) = LOWER(?1)",
                params![name.trim()],
                Self::recipe_from_row,
            )
            .optional()?)
    }

    pub fn get_recipe_by_name(&self, name: &str) -> Result<Recipe> {
        self.find_recipe_by_name(name)?
            .context(format!("Recipe '{name}' not found"))
    }

    pub fn set_recipe_instructions(&self, id: i64, instructions: Option<&str>) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE recipes SET instructions = ?1 WHERE id = ?2",
            params![instructions, id],
        )?;
        if rows == 0 {
            bail!("Recipe not found");
        }
        Ok(())
    }

    pub fn add_recipe_ingredient(
        &self,
        recipe_id: i64,
        template_id: i64,
        grams: f64,
    ) -> Result<RecipeIngredient> {
        self.get_recipe(recipe_id)?;
        let template = self.get_food_template(template_id)?;
        self.conn.execute(
            "INSERT INTO recipe_ingredients (recipe_id, template_id, grams) VALUES (?1, ?2, ?3)",
            params![recipe_id, template_id, grams],
        )?;
        let id = self.conn.last_insert_rowid();
        Ok(RecipeIngredient {
            id,
            recipe_id,
            template_id,
            grams,
            macros: template.macros_for(grams),
            food_name: template.name,
        })
    }

    pub fn remove_recipe_ingredient(&self, recipe_id: i64, food_name: &str) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM recipe_ingredients WHERE recipe_id = ?1 AND template_id IN (
                SELECT id FROM food_templates WHERE LOWER(name) = LOWER(?2)
            )",
            params![recipe_id, food_name],
        )?;
        Ok(rows > 0)
    }

    pub fn get_recipe_ingredients(&self, recipe_id: i64) -> Result<Vec<RecipeIngredient>> {
        let mut stmt = self.conn.prepare(
            "SELECT ri.id, ri.recipe_id, ri.template_id, ri.grams,
                    t.name, t.calories_per_100g, t.protein_per_100g, t.carbs_per_100g, t.fat_per_100g
             FROM recipe_ingredients ri
             JOIN food_templates t ON ri.template_id = t.id
             WHERE ri.recipe_id = ?1
             ORDER BY ri.id",
        )?;
        let ingredients = stmt
            .query_map(params![recipe_id], |row| {
                let grams: f64 = row.get(3)?;
                let rates = PerHundred {
                    calories: row.get(5)?,
                    protein: row.get(6)?,
                    carbs: row.get(7)?,
                    fat: row.get(8)?,
                };
                Ok(RecipeIngredient {
                    id: row.get(0)?,
                    recipe_id: row.get(1)?,
                    template_id: row.get(2)?,
                    grams,
                    food_name: row.get(4)?,
                    macros: rates.macros_for(grams),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ingredients)
    }

    pub fn get_recipe_detail(&self, recipe_id: i64) -> Result<RecipeDetail> {
        let recipe = self.get_recipe(recipe_id)?;
        let ingredients = self.get_recipe_ingredients(recipe_id)?;
        let total_grams: f64 = ingredients.iter().map(|i| i.grams).sum();
        let totals: Macros = ingredients.iter().map(|i| i.macros).sum();
        Ok(RecipeDetail {
            recipe,
            ingredients,
            total_grams,
            totals,
        })
    }

    pub fn list_recipes(&self) -> Result<Vec<RecipeDetail>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM recipes ORDER BY name COLLATE NOCASE")?;
        let ids: Vec<i64> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        let mut details = Vec::new();
        for id in ids {
            details.push(self.get_recipe_detail(id)?);
        }
        Ok(details)
    }

    /// Ingredients cascade; logged snapshots keep their copy and lose the link.
    pub fn delete_recipe(&self, recipe_id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM recipes WHERE id = ?1", params![recipe_id])?;
        Ok(rows > 0)
    }

    // --- Recipe logs ---

    /// Snapshots the whole recipe as it is now: name, instructions,
    /// ingredients and totals.
    pub fn log_recipe(&self, recipe_id: i64, timestamp: i64) -> Result<RecipeLog> {
        let detail = self.get_recipe_detail(recipe_id)?;
        if detail.ingredients.is_empty() {
            bail!("Recipe '{}' has no ingredients", detail.recipe.name);
        }
        let snapshot: Vec<IngredientSnapshot> = detail
            .ingredients
            .iter()
            .map(|i| IngredientSnapshot {
                name: i.food_name.clone(),
                grams: i.grams,
                calories: i.macros.calories,
                protein: i.macros.protein,
                carbs: i.macros.carbs,
                fat: i.macros.fat,
            })
            .collect();
        let ingredients_json = serde_json::to_string(&snapshot)?;
        self.conn.execute(
            "INSERT INTO recipe_logs (recipe_id, name, instructions, ingredients_json,
                calories, protein, carbs, fat, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                recipe_id,
                detail.recipe.name,
                detail.recipe.instructions,
                ingredients_json,
                detail.totals.calories,
                detail.totals.protein,
                detail.totals.carbs,
                detail.totals.fat,
                timestamp,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, recipe_id, calories = detail.totals.calories, "recipe logged");
        self.get_recipe_log(id)
    }

    pub fn get_recipe_log(&self, id: i64) -> Result<RecipeLog> {
        self.find_recipe_log(id)?.context("Recipe log not found")
    }

    pub fn find_recipe_log(&self, id: i64) -> Result<Option<RecipeLog>> {
        let sql = format!("SELECT {RECIPE_LOG_COLUMNS} FROM recipe_logs WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id], Self::recipe_log_from_row)
            .optional()?)
    }

    pub fn get_recipe_logs_between(&self, bounds: DayBounds) -> Result<Vec<RecipeLog>> {
        let sql = format!(
            "SELECT {RECIPE_LOG_COLUMNS} FROM recipe_logs
             WHERE timestamp >= ?1 AND timestamp < ?2
             ORDER BY timestamp, id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let logs = stmt
            .query_map(
                params![bounds.start_millis, bounds.end_millis],
                Self::recipe_log_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(logs)
    }

    pub fn delete_recipe_log(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM recipe_logs WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }
}
