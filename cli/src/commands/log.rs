use anyhow::{Result, bail};
use chrono::{DateTime, Local};

use crate::openfoodfacts::OpenFoodFactsClient;
use stride_core::db::LogEditError;
use stride_core::models::{FoodLog, FoodTemplate, Macros};
use stride_core::openfoodfacts::LookupError;
use stride_core::repository::ScanError;
use stride_core::service::StrideService;

use super::helpers::{
    EntryRef, entry_timestamp, exit_not_found, format_macros, parse_amount, parse_entry_ref,
    print_json,
};
use super::resolve_food;

pub(crate) fn format_time(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "?".to_string())
}

fn display_name(food: &FoodTemplate) -> String {
    match &food.brand {
        Some(b) => format!("{} ({b})", food.name),
        None => food.name.clone(),
    }
}

fn print_logged(food: &FoodTemplate, log: &FoodLog) {
    println!(
        "Logged [{}] {} {:.0}g at {}: {}",
        log.id,
        display_name(food),
        log.grams,
        format_time(log.timestamp),
        format_macros(&log.macros())
    );
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_log(
    svc: &StrideService,
    food_query: &str,
    amount: &str,
    food_id: Option<i64>,
    date: Option<String>,
    time: Option<&str>,
    json: bool,
) -> Result<()> {
    let grams = parse_amount(amount)?;
    let timestamp = entry_timestamp(date, time)?;

    let food = match food_id {
        Some(id) => svc.foods().get_template(id)?,
        None => resolve_food(svc, food_query, json)?,
    };
    let log = svc.foods().log_food(food.id, grams, timestamp)?;

    if json {
        print_json(&log)?;
    } else {
        print_logged(&food, &log);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_scan(
    svc: &StrideService,
    off: &OpenFoodFactsClient,
    barcode: &str,
    amount: Option<&str>,
    date: Option<String>,
    time: Option<&str>,
    save_image: bool,
    json: bool,
) -> Result<()> {
    let grams = amount.map(parse_amount).transpose()?;
    let timestamp = entry_timestamp(date, time)?;

    let mut food = match svc.scan(off, barcode) {
        Ok(food) => food,
        Err(ScanError::Lookup(e @ LookupError::NotFound(_))) => {
            exit_not_found(&e.to_string(), json)
        }
        Err(e) => return Err(e.into()),
    };

    if save_image && food.image_path.is_none() {
        if let Some(url) = food.image_url.clone() {
            match off
                .fetch_image_blocking(&url)
                .and_then(|(bytes, ext)| svc.foods().attach_image_bytes(food.id, &bytes, &ext))
            {
                Ok(updated) => food = updated,
                Err(e) => tracing::warn!(error = %e, "could not save product image"),
            }
        }
    }

    let Some(grams) = grams else {
        if json {
            print_json(&food)?;
        } else {
            println!(
                "{} [{}]: {:.0} kcal | P:{:.1}g C:{:.1}g F:{:.1}g per 100g",
                display_name(&food),
                food.id,
                food.calories_per_100g,
                food.protein_per_100g,
                food.carbs_per_100g,
                food.fat_per_100g
            );
            println!("Log it with: stride scan {barcode} <amount>");
        }
        return Ok(());
    };

    let log = svc.foods().log_food(food.id, grams, timestamp)?;
    if json {
        print_json(&log)?;
    } else {
        print_logged(&food, &log);
    }
    Ok(())
}

/// Field overrides for a food log edit.
#[derive(Default)]
pub(crate) struct LogEdit {
    pub grams: Option<String>,
    pub calories: Option<i64>,
    pub protein: Option<i64>,
    pub carbs: Option<i64>,
    pub fat: Option<i64>,
    pub date: Option<String>,
    pub time: Option<String>,
}

impl LogEdit {
    fn has_macros(&self) -> bool {
        self.calories.is_some() || self.protein.is_some() || self.carbs.is_some() || self.fat.is_some()
    }

    fn is_empty(&self) -> bool {
        self.grams.is_none() && !self.has_macros() && self.date.is_none() && self.time.is_none()
    }
}

pub(crate) fn cmd_edit(svc: &StrideService, entry: &str, edit: LogEdit, json: bool) -> Result<()> {
    if edit.is_empty() {
        bail!("Nothing to update. Provide --grams, a macro flag, --date or --time");
    }
    let id = match parse_entry_ref(entry)? {
        EntryRef::Food(id) => id,
        EntryRef::Recipe(_) => {
            bail!("Recipe entries cannot be edited. Delete the entry and log the recipe again")
        }
    };
    let foods = svc.foods();
    let Some(existing) = foods.get_log(id)? else {
        exit_not_found(&format!("Entry {id} not found"), json);
    };

    if let Some(grams) = &edit.grams {
        match foods.update_log_grams(id, parse_amount(grams)?) {
            Ok(_) => {}
            Err(LogEditError::NotFound(_)) => exit_not_found(&format!("Entry {id} not found"), json),
            Err(e @ LogEditError::TemplateMissing { .. }) => {
                bail!("{e}. Use --calories/--protein/--carbs/--fat")
            }
            Err(e) => return Err(e.into()),
        }
    }

    if edit.has_macros() {
        let current = foods.get_log(id)?.map_or(existing.log.macros(), |l| l.log.macros());
        let macros = Macros {
            calories: edit.calories.unwrap_or(current.calories),
            protein: edit.protein.unwrap_or(current.protein),
            carbs: edit.carbs.unwrap_or(current.carbs),
            fat: edit.fat.unwrap_or(current.fat),
        };
        foods.update_log_macros(id, &macros)?;
    }

    if edit.date.is_some() || edit.time.is_some() {
        let timestamp = entry_timestamp(edit.date, edit.time.as_deref())?;
        foods.update_log_timestamp(id, timestamp)?;
    }

    let Some(updated) = foods.get_log(id)? else {
        exit_not_found(&format!("Entry {id} not found"), json);
    };
    if json {
        print_json(&updated)?;
    } else {
        let name = updated.food_name.as_deref().unwrap_or("Deleted food");
        println!(
            "Updated entry {id}: {name} {:.0}g at {}: {}",
            updated.log.grams,
            format_time(updated.log.timestamp),
            format_macros(&updated.log.macros())
        );
    }
    Ok(())
}

pub(crate) fn cmd_delete(svc: &StrideService, entry: &str, json: bool) -> Result<()> {
    let entry_ref = parse_entry_ref(entry)?;
    let deleted = match entry_ref {
        EntryRef::Food(id) => svc.foods().delete_log(id)?,
        EntryRef::Recipe(id) => svc.recipes().delete_log(id)?,
    };
    if !deleted {
        exit_not_found(&format!("Entry {entry} not found"), json);
    }
    if json {
        println!("{}", serde_json::json!({ "deleted": entry }));
    } else {
        println!("Deleted entry {entry}");
    }
    Ok(())
}
