mod diary;
mod food;
mod helpers;
mod home;
mod log;
mod recipe;
mod settings;
mod weight;
mod workout;

use anyhow::Result;

use stride_core::models::FoodTemplate;
use stride_core::service::StrideService;

use helpers::{exit_not_found, print_food_table, prompt_choice};

pub(crate) use diary::{cmd_diary, cmd_export, cmd_history};
pub(crate) use food::{FoodInput, cmd_food_add, cmd_food_delete, cmd_food_list};
pub(crate) use home::cmd_home;
pub(crate) use log::{LogEdit, cmd_delete, cmd_edit, cmd_log, cmd_scan};
pub(crate) use recipe::{
    cmd_recipe_add_ingredient, cmd_recipe_create, cmd_recipe_delete, cmd_recipe_list,
    cmd_recipe_log, cmd_recipe_remove_ingredient, cmd_recipe_set_instructions, cmd_recipe_show,
};
pub(crate) use settings::{
    GoalUpdate, cmd_goals_set, cmd_goals_show, cmd_health, cmd_settings_decline_health,
    cmd_settings_dismiss_card, cmd_settings_language, cmd_settings_show,
};
pub(crate) use weight::{cmd_weight_delete, cmd_weight_history, cmd_weight_log, cmd_weight_show};
pub(crate) use workout::{
    SessionInput, cmd_exercise_add, cmd_exercise_delete, cmd_exercise_list, cmd_plan_add_exercise,
    cmd_plan_create, cmd_plan_delete, cmd_plan_goal, cmd_plan_list, cmd_plan_remove_exercise,
    cmd_plan_show, cmd_workout_delete, cmd_workout_history, cmd_workout_log,
};

/// Resolve a food name against the local catalogue.
///
/// An exact (case-insensitive) name wins; several partial matches prompt for a choice.
pub(super) fn resolve_food(svc: &StrideService, query: &str, json: bool) -> Result<FoodTemplate> {
    if let Some(exact) = svc.foods().find_by_name(query)? {
        return Ok(exact);
    }

    let mut matches = svc.foods().list_templates(Some(query))?;
    match matches.len() {
        0 => exit_not_found(
            &format!("No food found for '{query}'. Add it with `stride food add`"),
            json,
        ),
        1 => Ok(matches.remove(0)),
        n => {
            let refs: Vec<&FoodTemplate> = matches.iter().collect();
            print_food_table(&refs);
            let idx = prompt_choice(n)?;
            Ok(matches.swap_remove(idx))
        }
    }
}
