use anyhow::Result;

use super::{SharedDb, lock};
use crate::diary::DayBounds;
use crate::events::{ChangeBus, StoreChange};
use crate::models::{RecipeDetail, RecipeIngredient, RecipeLog, validate_grams};

#[derive(Clone)]
pub struct RecipeRepository {
    db: SharedDb,
    bus: ChangeBus,
}

impl RecipeRepository {
    #[must_use]
    pub fn new(db: SharedDb, bus: ChangeBus) -> Self {
        Self { db, bus }
    }

    pub fn create(&self, name: &str, instructions: Option<&str>) -> Result<RecipeDetail> {
        let detail = {
            let db = lock(&self.db);
            let recipe = db.create_recipe(name, instructions)?;
            db.get_recipe_detail(recipe.id)?
        };
        self.bus.publish(StoreChange::Recipes);
        Ok(detail)
    }

    pub fn detail(&self, id: i64) -> Result<RecipeDetail> {
        lock(&self.db).get_recipe_detail(id)
    }

    pub fn detail_by_name(&self, name: &str) -> Result<RecipeDetail> {
        let db = lock(&self.db);
        let recipe = db.get_recipe_by_name(name)?;
        db.get_recipe_detail(recipe.id)
    }

    pub fn list(&self) -> Result<Vec<RecipeDetail>> {
        lock(&self.db).list_recipes()
    }

    pub fn add_ingredient(
        &self,
        recipe_id: i64,
        template_id: i64,
        grams: f64,
    ) -> Result<RecipeIngredient> {
        validate_grams(grams)?;
        let ingredient = lock(&self.db).add_recipe_ingredient(recipe_id, template_id, grams)?;
        self.bus.publish(StoreChange::Recipes);
        Ok(ingredient)
    }

    pub fn remove_ingredient(&self, recipe_id: i64, food_name: &str) -> Result<bool> {
        let removed = lock(&self.db).remove_recipe_ingredient(recipe_id, food_name)?;
        if removed {
            self.bus.publish(StoreChange::Recipes);
        }
        Ok(removed)
    }

    pub fn set_instructions(&self, recipe_id: i64, instructions: Option<&str>) -> Result<()> {
        lock(&self.db).set_recipe_instructions(recipe_id, instructions)?;
        self.bus.publish(StoreChange::Recipes);
        Ok(())
    }

    /// Earlier logs of the recipe keep their snapshot.
    pub fn delete(&self, recipe_id: i64) -> Result<bool> {
        let deleted = lock(&self.db).delete_recipe(recipe_id)?;
        if deleted {
            self.bus.publish(StoreChange::Recipes);
            self.bus.publish(StoreChange::RecipeLogs);
        }
        Ok(deleted)
    }

    // --- Logs ---

    pub fn log(&self, recipe_id: i64, timestamp: i64) -> Result<RecipeLog> {
        let log = lock(&self.db).log_recipe(recipe_id, timestamp)?;
        self.bus.publish(StoreChange::RecipeLogs);
        Ok(log)
    }

    pub fn get_log(&self, id: i64) -> Result<Option<RecipeLog>> {
        lock(&self.db).find_recipe_log(id)
    }

    pub fn logs_between(&self, bounds: DayBounds) -> Result<Vec<RecipeLog>> {
        lock(&self.db).get_recipe_logs_between(bounds)
    }

    pub fn delete_log(&self, id: i64) -> Result<bool> {
        let deleted = lock(&self.db).delete_recipe_log(id)?;
        if deleted {
            self.bus.publish(StoreChange::RecipeLogs);
        }
        Ok(deleted)
    }
}
