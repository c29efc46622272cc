use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use stride_core::service::StrideService;

use super::helpers::{
    entry_timestamp, exit_not_found, format_macros, parse_amount, print_json, truncate,
};
use super::log::format_time;
use super::resolve_food;

pub(crate) fn cmd_recipe_create(
    svc: &StrideService,
    name: &str,
    instructions: Option<&str>,
    json: bool,
) -> Result<()> {
    let detail = svc.recipes().create(name, instructions)?;
    if json {
        print_json(&detail)?;
    } else {
        let id = detail.recipe.id;
        println!("Created recipe: {} (id: {id})", detail.recipe.name);
        println!("Add ingredients with: stride recipe add-ingredient \"{name}\" <food> <amount>");
    }
    Ok(())
}

pub(crate) fn cmd_recipe_add_ingredient(
    svc: &StrideService,
    recipe_name: &str,
    food_query: &str,
    amount: &str,
    json: bool,
) -> Result<()> {
    let recipe = svc.recipes().detail_by_name(recipe_name)?;
    let grams = parse_amount(amount)?;
    let food = resolve_food(svc, food_query, json)?;

    let ingredient = svc.recipes().add_ingredient(recipe.recipe.id, food.id, grams)?;
    if json {
        print_json(&ingredient)?;
    } else {
        println!(
            "Added {grams:.0}g of {} to {}: {}",
            food.name,
            recipe.recipe.name,
            format_macros(&ingredient.macros)
        );
    }
    Ok(())
}

pub(crate) fn cmd_recipe_remove_ingredient(
    svc: &StrideService,
    recipe_name: &str,
    food_name: &str,
    json: bool,
) -> Result<()> {
    let recipe = svc.recipes().detail_by_name(recipe_name)?;
    if !svc.recipes().remove_ingredient(recipe.recipe.id, food_name)? {
        exit_not_found(
            &format!("Ingredient '{food_name}' not found in recipe"),
            json,
        );
    }
    if json {
        println!("{}", serde_json::json!({ "removed": food_name }));
    } else {
        println!("Removed {food_name} from {}", recipe.recipe.name);
    }
    Ok(())
}

pub(crate) fn cmd_recipe_set_instructions(
    svc: &StrideService,
    recipe_name: &str,
    instructions: Option<&str>,
    json: bool,
) -> Result<()> {
    let recipe = svc.recipes().detail_by_name(recipe_name)?;
    let instructions = instructions.map(str::trim).filter(|s| !s.is_empty());
    svc.recipes().set_instructions(recipe.recipe.id, instructions)?;
    if json {
        print_json(&svc.recipes().detail(recipe.recipe.id)?)?;
    } else if instructions.is_some() {
        println!("Updated instructions for {}", recipe.recipe.name);
    } else {
        println!("Cleared instructions for {}", recipe.recipe.name);
    }
    Ok(())
}

pub(crate) fn cmd_recipe_show(svc: &StrideService, recipe_name: &str, json: bool) -> Result<()> {
    let detail = svc.recipes().detail_by_name(recipe_name)?;

    if json {
        return print_json(&detail);
    }

    println!("=== {} ===", detail.recipe.name);
    println!("  Total: {:.0}g\n", detail.total_grams);

    if detail.ingredients.is_empty() {
        println!("  No ingredients yet");
    } else {
        println!("  INGREDIENTS:");
        for ing in &detail.ingredients {
            println!(
                "    {}, {:.0}g: {}",
                ing.food_name,
                ing.grams,
                format_macros(&ing.macros)
            );
        }
    }

    println!("\n  TOTAL: {}", format_macros(&detail.totals));
    if let Some(instructions) = &detail.recipe.instructions {
        println!("\n  INSTRUCTIONS:\n    {instructions}");
    }
    Ok(())
}

pub(crate) fn cmd_recipe_list(svc: &StrideService, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct RecipeRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Ingredients")]
        ingredients: usize,
        #[tabled(rename = "Weight")]
        weight: String,
        #[tabled(rename = "Calories")]
        calories: i64,
    }

    let recipes = svc.recipes().list()?;
    if recipes.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No recipes found");
        }
        std::process::exit(2);
    }

    if json {
        return print_json(&recipes);
    }

    let rows: Vec<RecipeRow> = recipes
        .iter()
        .map(|r| RecipeRow {
            id: r.recipe.id,
            name: truncate(&r.recipe.name, 30),
            ingredients: r.ingredients.len(),
            weight: format!("{:.0}g", r.total_grams),
            calories: r.totals.calories,
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_recipe_log(
    svc: &StrideService,
    recipe_name: &str,
    date: Option<String>,
    time: Option<&str>,
    json: bool,
) -> Result<()> {
    let recipe = svc.recipes().detail_by_name(recipe_name)?;
    let timestamp = entry_timestamp(date, time)?;
    let log = svc.recipes().log(recipe.recipe.id, timestamp)?;

    if json {
        print_json(&log)?;
    } else {
        println!(
            "Logged [r{}] {} at {}: {}",
            log.id,
            log.name,
            format_time(log.timestamp),
            format_macros(&log.macros())
        );
    }
    Ok(())
}

pub(crate) fn cmd_recipe_delete(svc: &StrideService, recipe_name: &str, json: bool) -> Result<()> {
    let recipe = svc.recipes().detail_by_name(recipe_name)?;
    if !svc.recipes().delete(recipe.recipe.id)? {
        exit_not_found(&format!("Recipe '{recipe_name}' not found"), json);
    }
    if json {
        println!("{}", serde_json::json!({ "deleted": recipe.recipe.id }));
    } else {
        println!(
            "Deleted recipe {} (diary entries keep their logged values)",
            recipe.recipe.name
        );
    }
    Ok(())
}
