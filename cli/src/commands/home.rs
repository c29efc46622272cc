use anyhow::Result;
use chrono::Local;

use stride_core::goals::GoalStatus;
use stride_core::repository::HealthStatus;
use stride_core::service::StrideService;

use super::helpers::{format_macros, parse_date, print_json};

pub(crate) fn cmd_home(svc: &StrideService, date: Option<String>, json: bool) -> Result<()> {
    let date = parse_date(date)?;
    let home = svc.home_view().load(date, &Local)?;

    if json {
        return print_json(&home);
    }

    let goals = &home.goals;
    println!("=== {date} ===\n");
    println!(
        "  Calories: {} / {} kcal ({} mode, {})",
        home.intake.calories,
        goals.calorie_goal,
        goals.calorie_mode.as_str().to_lowercase(),
        match home.calorie_status {
            GoalStatus::OnTrack => "on track",
            GoalStatus::OffTarget => "off target",
        }
    );
    println!(
        "  Protein:  {} / {} g",
        home.intake.protein, goals.protein_goal
    );
    println!("  Carbs:    {} / {} g", home.intake.carbs, goals.carb_goal);
    println!("  Fat:      {} / {} g", home.intake.fat, goals.fat_goal);
    println!("  Remaining: {}", format_macros(&home.remaining));

    println!();
    match (&home.health, home.health_status) {
        (Some(h), _) => {
            let met = if home.steps_met == Some(true) { " (goal met)" } else { "" };
            println!("  Steps: {} / {}{met}", h.steps, goals.steps_goal);
            println!(
                "  Distance: {:.1} km, burned {:.0} kcal",
                h.distance_m / 1000.0,
                h.calories_burned
            );
        }
        (None, status) if home.show_disabled_card => {
            let reason = match status {
                HealthStatus::Declined => "access was declined",
                HealthStatus::Unavailable => "the health data file could not be read",
                _ => "no health data file is configured",
            };
            println!("  Health data is off: {reason}.");
            println!("  Hide this with: stride settings dismiss-card");
        }
        (None, _) => {}
    }

    println!("  Workouts logged: {}", home.workouts_logged);
    if let Some(w) = &home.latest_weight {
        println!("  Latest weight: {:.1} kg ({})", w.weight_kg, w.date);
    }
    Ok(())
}
