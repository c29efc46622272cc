use anyhow::{Result, bail};
use std::path::PathBuf;

use stride_core::models::{FoodSource, NewFoodTemplate};
use stride_core::service::StrideService;

use super::helpers::{exit_not_found, print_food_table, print_json};

/// Per-100g values for a custom food.
pub(crate) struct FoodInput {
    pub name: String,
    pub brand: Option<String>,
    pub barcode: Option<String>,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub sugar: Option<f64>,
    pub salt: Option<f64>,
    pub image: Option<PathBuf>,
}

pub(crate) fn cmd_food_add(svc: &StrideService, input: FoodInput, json: bool) -> Result<()> {
    let name = input.name.trim();
    if svc.foods().find_by_name(name)?.is_some() {
        bail!("A food named '{name}' already exists");
    }

    let food = NewFoodTemplate {
        name: name.to_string(),
        brand: input.brand,
        barcode: input.barcode,
        calories_per_100g: input.calories,
        protein_per_100g: input.protein,
        carbs_per_100g: input.carbs,
        fat_per_100g: input.fat,
        sugar_per_100g: input.sugar,
        salt_per_100g: input.salt,
        image_url: None,
        image_path: None,
        source: FoodSource::Custom,
    };
    let template = match &input.image {
        Some(path) => svc.foods().add_template_with_image(&food, path)?,
        None => svc.foods().add_template(&food)?,
    };

    if json {
        print_json(&template)?;
    } else {
        println!(
            "Added food [{}] {}: {:.0} kcal | P:{:.1}g C:{:.1}g F:{:.1}g per 100g",
            template.id,
            template.name,
            template.calories_per_100g,
            template.protein_per_100g,
            template.carbs_per_100g,
            template.fat_per_100g
        );
        if let Some(path) = &template.image_path {
            println!("  Image: {path}");
        }
    }
    Ok(())
}

pub(crate) fn cmd_food_list(svc: &StrideService, search: Option<&str>, json: bool) -> Result<()> {
    let state = svc.nutrition_view().load(search)?;

    if json {
        return print_json(&state);
    }

    if state.search.is_none() && !state.recent.is_empty() {
        println!("Recently logged:");
        let recent: Vec<_> = state.recent.iter().collect();
        print_food_table(&recent);
        println!();
    }

    if state.templates.is_empty() && state.recipes.is_empty() {
        let msg = match &state.search {
            Some(q) => format!("No foods or recipes match '{q}'"),
            None => "No foods found. Add one with `stride food add`".to_string(),
        };
        exit_not_found(&msg, false);
    }

    if !state.templates.is_empty() {
        let all: Vec<_> = state.templates.iter().collect();
        print_food_table(&all);
    }
    if !state.recipes.is_empty() {
        println!("\nRecipes:");
        for r in &state.recipes {
            println!(
                "  [{}] {} ({:.0}g, {} kcal)",
                r.recipe.id, r.recipe.name, r.total_grams, r.totals.calories
            );
        }
    }
    Ok(())
}

pub(crate) fn cmd_food_delete(svc: &StrideService, id: i64, json: bool) -> Result<()> {
    let Some(deleted) = svc.foods().delete_template(id)? else {
        exit_not_found(&format!("Food {id} not found"), json);
    };

    if json {
        print_json(&deleted)?;
    } else {
        println!("Deleted food [{id}] {}", deleted.template.name);
        if deleted.logs_removed > 0 {
            println!("  Removed {} diary entries", deleted.logs_removed);
        }
    }
    Ok(())
}
