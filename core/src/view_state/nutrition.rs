use anyhow::Result;
use serde::Serialize;

use super::Observer;
use crate::events::{ChangeBus, StoreChange};
use crate::models::{FoodTemplate, RecipeDetail};
use crate::repository::{FoodRepository, RecipeRepository};

const RECENT_LIMIT: i64 = 10;

/// Food picker: recently logged templates, the (filtered) catalogue, and recipes.
#[derive(Debug, Clone, Serialize)]
pub struct NutritionState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    pub recent: Vec<FoodTemplate>,
    pub templates: Vec<FoodTemplate>,
    pub recipes: Vec<RecipeDetail>,
}

#[derive(Clone)]
pub struct NutritionViewModel {
    foods: FoodRepository,
    recipes: RecipeRepository,
    bus: ChangeBus,
}

impl NutritionViewModel {
    #[must_use]
    pub fn new(foods: FoodRepository, recipes: RecipeRepository, bus: ChangeBus) -> Self {
        Self {
            foods,
            recipes,
            bus,
        }
    }

    pub fn load(&self, search: Option<&str>) -> Result<NutritionState> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        let recipes = self
            .recipes
            .list()?
            .into_iter()
            .filter(|r| search.is_none_or(|q| contains_ignore_case(&r.recipe.name, q)))
            .collect();
        Ok(NutritionState {
            search: search.map(str::to_string),
            recent: self.foods.recent_templates(RECENT_LIMIT)?,
            templates: self.foods.list_templates(search)?,
            recipes,
        })
    }

    pub fn observe(&self, search: Option<String>) -> Result<Observer<NutritionState>> {
        let vm = self.clone();
        Observer::new(
            self.bus.subscribe(&[
                StoreChange::FoodTemplates,
                StoreChange::FoodLogs,
                StoreChange::Recipes,
            ]),
            move || vm.load(search.as_deref()),
        )
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::StrideService;

    #[test]
    fn test_search_filters_templates_and_recipes() {
        let service = StrideService::new_in_memory().unwrap();
        service.recipes().create("Salmon Bowl", None).unwrap();
        service.recipes().create("Porridge", None).unwrap();

        let state = service.nutrition_view().load(Some(" salmon ")).unwrap();
        assert_eq!(state.search.as_deref(), Some("salmon"));
        assert_eq!(state.templates.len(), 1);
        assert_eq!(state.recipes.len(), 1);
        assert_eq!(state.recipes[0].recipe.name, "Salmon Bowl");
    }

    #[test]
    fn test_recent_follows_logging() {
        let service = StrideService::new_in_memory().unwrap();
        let mut observer = service.nutrition_view().observe(None).unwrap();
        assert!(observer.current().recent.is_empty());
        assert!(!observer.current().templates.is_empty());

        let egg = service.foods().find_by_name("Egg").unwrap().unwrap();
        service.foods().log_food(egg.id, 50.0, 0).unwrap();
        assert!(observer.poll().unwrap());
        assert_eq!(observer.current().recent[0].id, egg.id);
    }
}
