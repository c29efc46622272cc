use anyhow::{Result, bail};
use chrono::Local;

use stride_core::diary::day_bounds;
use stride_core::goals::{CalorieMode, UserGoals};
use stride_core::repository::HealthStatus;
use stride_core::service::StrideService;

use super::helpers::{parse_date, print_json};
use crate::config::Config;

/// Goal fields to change; `None` keeps the stored value.
#[derive(Default)]
pub(crate) struct GoalUpdate {
    pub calories: Option<i64>,
    pub protein: Option<i64>,
    pub carbs: Option<i64>,
    pub fat: Option<i64>,
    pub steps: Option<i64>,
    pub mode: Option<CalorieMode>,
}

impl GoalUpdate {
    fn is_empty(&self) -> bool {
        self.calories.is_none()
            && self.protein.is_none()
            && self.carbs.is_none()
            && self.fat.is_none()
            && self.steps.is_none()
            && self.mode.is_none()
    }

    fn apply(self, goals: UserGoals) -> UserGoals {
        UserGoals {
            calorie_goal: self.calories.unwrap_or(goals.calorie_goal),
            protein_goal: self.protein.unwrap_or(goals.protein_goal),
            carb_goal: self.carbs.unwrap_or(goals.carb_goal),
            fat_goal: self.fat.unwrap_or(goals.fat_goal),
            steps_goal: self.steps.unwrap_or(goals.steps_goal),
            calorie_mode: self.mode.unwrap_or(goals.calorie_mode),
        }
    }
}

fn print_goals(goals: &UserGoals) {
    let mode = match goals.calorie_mode {
        CalorieMode::Deficit => "deficit (stay at or under)",
        CalorieMode::Surplus => "surplus (reach at least)",
    };
    println!("  Calories: {} kcal, {mode}", goals.calorie_goal);
    println!("  Protein:  {} g", goals.protein_goal);
    println!("  Carbs:    {} g", goals.carb_goal);
    println!("  Fat:      {} g", goals.fat_goal);
    println!("  Steps:    {}", goals.steps_goal);
}

pub(crate) fn cmd_goals_show(svc: &StrideService, json: bool) -> Result<()> {
    let goals = svc.preferences().goals()?;
    if json {
        return print_json(&goals);
    }
    println!("Daily goals:");
    print_goals(&goals);
    Ok(())
}

pub(crate) fn cmd_goals_set(svc: &StrideService, update: GoalUpdate, json: bool) -> Result<()> {
    if update.is_empty() {
        bail!("Nothing to update. Provide at least one goal flag");
    }
    let prefs = svc.preferences();
    let goals = update.apply(prefs.goals()?);
    prefs.set_goals(&goals)?;

    if json {
        print_json(&goals)?;
    } else {
        println!("Updated daily goals:");
        print_goals(&goals);
    }
    Ok(())
}

pub(crate) fn cmd_settings_show(svc: &StrideService, config: &Config, json: bool) -> Result<()> {
    let prefs = svc.preferences().all()?;
    let schema_version = svc.schema_version()?;

    if json {
        return print_json(&serde_json::json!({
            "preferences": prefs,
            "data_dir": config.data_dir,
            "database": config.db_path,
            "schema_version": schema_version,
            "week_start": svc.week_start(),
            "health_data_file": config.health_data_file(),
        }));
    }

    println!("Language: {}", prefs.language);
    println!("Week starts on: {}", svc.week_start());
    println!(
        "Health data: {}",
        match (config.health_data_file(), prefs.health_permissions_declined) {
            (_, true) => "declined".to_string(),
            (Some(path), false) => path.display().to_string(),
            (None, false) => "not configured".to_string(),
        }
    );
    println!(
        "Health card: {}",
        if prefs.dismissed_disabled_card { "hidden" } else { "shown" }
    );
    println!("Database: {} (schema v{schema_version})", config.db_path.display());
    println!("\nDaily goals:");
    print_goals(&prefs.goals);
    Ok(())
}

pub(crate) fn cmd_settings_language(svc: &StrideService, language: &str, json: bool) -> Result<()> {
    svc.preferences().set_language(language)?;
    let stored = svc.preferences().language()?;
    if json {
        println!("{}", serde_json::json!({ "language": stored }));
    } else {
        println!("Language set to {stored}");
    }
    Ok(())
}

pub(crate) fn cmd_settings_dismiss_card(svc: &StrideService, undo: bool, json: bool) -> Result<()> {
    svc.preferences().set_dismissed_disabled_card(!undo)?;
    if json {
        println!("{}", serde_json::json!({ "dismissed_disabled_card": !undo }));
    } else if undo {
        println!("The health data card will be shown again");
    } else {
        println!("The health data card is now hidden");
    }
    Ok(())
}

pub(crate) fn cmd_settings_decline_health(
    svc: &StrideService,
    undo: bool,
    json: bool,
) -> Result<()> {
    svc.preferences().set_health_permissions_declined(!undo)?;
    if json {
        println!("{}", serde_json::json!({ "health_permissions_declined": !undo }));
    } else if undo {
        println!("Health data will be read again");
    } else {
        println!("Health data will no longer be read");
    }
    Ok(())
}

pub(crate) fn cmd_health(svc: &StrideService, date: Option<String>, json: bool) -> Result<()> {
    let date = parse_date(date)?;
    let (status, summary) = svc.health().query(day_bounds(date, &Local))?;
    let goals = svc.preferences().goals()?;

    if json {
        return print_json(&serde_json::json!({
            "date": date,
            "status": status,
            "summary": summary,
            "steps_met": summary.map(|s| goals.steps_met(s.steps)),
        }));
    }

    let Some(summary) = summary else {
        let reason = match status {
            HealthStatus::NoProvider => {
                "No health data file configured. Set health_data_file in config.json"
            }
            HealthStatus::Declined => {
                "Health access is declined. Re-enable with: stride settings decline-health --undo"
            }
            _ => "Health data could not be read. Run with --verbose for details",
        };
        eprintln!("{reason}");
        std::process::exit(2);
    };

    println!("=== {date} ===\n");
    println!(
        "  Steps:    {} / {}{}",
        summary.steps,
        goals.steps_goal,
        if goals.steps_met(summary.steps) { " (goal met)" } else { "" }
    );
    println!("  Distance: {:.2} km", summary.distance_m / 1000.0);
    println!("  Burned:   {:.0} kcal", summary.calories_burned);
    Ok(())
}
