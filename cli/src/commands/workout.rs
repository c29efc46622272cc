use anyhow::{Result, bail};
use chrono::Local;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use stride_core::models::{Exercise, NewWorkoutSession, PlanDetail, WorkoutSession};
use stride_core::plans::{PlanProgress, plan_progress};
use stride_core::service::StrideService;

use super::helpers::{entry_timestamp, exit_not_found, parse_date, print_json};
use super::log::format_time;

// --- Exercises ---

pub(crate) fn cmd_exercise_add(
    svc: &StrideService,
    name: &str,
    muscle_group: Option<String>,
    category: &str,
    json: bool,
) -> Result<()> {
    let exercise = Exercise {
        name: name.to_string(),
        muscle_group,
        category: category.to_lowercase(),
    };
    if !svc.workouts().add_exercise(&exercise)? {
        bail!("Exercise '{}' already exists", name.trim());
    }
    if json {
        print_json(&svc.workouts().exercise(name.trim())?)?;
    } else {
        println!("Added exercise {}", name.trim());
    }
    Ok(())
}

pub(crate) fn cmd_exercise_list(
    svc: &StrideService,
    muscle_group: Option<&str>,
    json: bool,
) -> Result<()> {
    #[derive(Tabled)]
    struct ExerciseRow {
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Muscle group")]
        muscle_group: String,
        #[tabled(rename = "Category")]
        category: String,
    }

    let exercises = svc.workouts().exercises(muscle_group)?;
    if json {
        return print_json(&exercises);
    }
    if exercises.is_empty() {
        exit_not_found("No exercises found", false);
    }

    let rows: Vec<ExerciseRow> = exercises
        .into_iter()
        .map(|e| ExerciseRow {
            name: e.name,
            muscle_group: e.muscle_group.unwrap_or_default(),
            category: e.category,
        })
        .collect();
    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_exercise_delete(svc: &StrideService, name: &str, json: bool) -> Result<()> {
    if !svc.workouts().delete_exercise(name)? {
        exit_not_found(&format!("Exercise '{name}' not found"), json);
    }
    if json {
        println!("{}", serde_json::json!({ "deleted": name }));
    } else {
        println!("Deleted exercise {name} with its logged sessions");
    }
    Ok(())
}

// --- Sessions ---

/// One set of sets-by-reps for `stride workout log`.
pub(crate) struct SessionInput {
    pub exercise: String,
    pub sets: i64,
    pub reps: i64,
    pub weight_kg: f64,
    pub date: Option<String>,
    pub time: Option<String>,
    pub notes: Option<String>,
}

fn session_line(s: &WorkoutSession) -> String {
    format!(
        "[{}] {} {}: {}x{} @ {:.1} kg ({:.0} kg volume)",
        s.id,
        format_time(s.timestamp),
        s.exercise_name,
        s.sets,
        s.reps,
        s.weight_kg,
        s.volume_kg()
    )
}

pub(crate) fn cmd_workout_log(svc: &StrideService, input: SessionInput, json: bool) -> Result<()> {
    // stored spelling of the name wins over what was typed
    let exercise = svc.workouts().exercise(&input.exercise)?;
    let session = NewWorkoutSession {
        exercise_name: exercise.name,
        sets: input.sets,
        reps: input.reps,
        weight_kg: input.weight_kg,
        timestamp: entry_timestamp(input.date, input.time.as_deref())?,
        notes: input.notes,
    };
    let logged = svc.workouts().log_session(&session)?;

    if json {
        print_json(&logged)?;
    } else {
        println!("Logged {}", session_line(&logged));
    }
    Ok(())
}

pub(crate) fn cmd_workout_history(
    svc: &StrideService,
    date: Option<String>,
    exercise: Option<&str>,
    limit: i64,
    json: bool,
) -> Result<()> {
    if let Some(name) = exercise {
        let sessions = svc.workouts().exercise_history(name, limit)?;
        if json {
            return print_json(&sessions);
        }
        if sessions.is_empty() {
            exit_not_found(&format!("No sessions logged for '{name}'"), false);
        }
        for s in &sessions {
            println!("  {}", session_line(s));
        }
        return Ok(());
    }

    let date = parse_date(date)?;
    let state = svc.workout_view().load(date, &Local)?;
    if json {
        return print_json(&state);
    }

    println!("=== {date} ===\n");
    if state.sessions.is_empty() {
        println!("  No workouts logged");
    } else {
        for s in &state.sessions {
            println!("  {}", session_line(s));
        }
        println!("\n  Volume: {:.0} kg", state.volume_kg);
    }
    if !state.plans.is_empty() {
        println!();
        print_progress_table(&state.plans);
    }
    Ok(())
}

pub(crate) fn cmd_workout_delete(svc: &StrideService, id: i64, json: bool) -> Result<()> {
    if !svc.workouts().delete_session(id)? {
        exit_not_found(&format!("Workout session {id} not found"), json);
    }
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted workout session {id}");
    }
    Ok(())
}

// --- Plans ---

fn print_progress_table(plans: &[PlanProgress]) {
    #[derive(Tabled)]
    struct PlanRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Plan")]
        name: String,
        #[tabled(rename = "This week")]
        week: String,
        #[tabled(rename = "Goal met")]
        met: &'static str,
        #[tabled(rename = "Streak")]
        streak: String,
    }

    let rows: Vec<PlanRow> = plans
        .iter()
        .map(|p| PlanRow {
            id: p.plan_id,
            name: p.name.clone(),
            week: format!("{}/{}", p.current_week.logged, p.current_week.goal),
            met: if p.current_week.met { "yes" } else { "no" },
            streak: format!("{} wk", p.streak_weeks),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

fn progress_of(svc: &StrideService, plan_name: &str) -> Result<(PlanDetail, PlanProgress)> {
    let plan = svc.workouts().plan_by_name(plan_name)?;
    let sessions = svc.workouts().plan_sessions(plan.plan.id)?;
    let progress = plan_progress(
        &plan,
        &sessions,
        Local::now().date_naive(),
        svc.week_start(),
        &Local,
    );
    Ok((plan, progress))
}

pub(crate) fn cmd_plan_create(
    svc: &StrideService,
    name: &str,
    weekly_goal: i64,
    exercises: &[String],
    json: bool,
) -> Result<()> {
    let plan = svc.workouts().create_plan(name, weekly_goal)?;
    for exercise in exercises {
        let stored = svc.workouts().exercise(exercise)?;
        svc.workouts().add_plan_exercise(plan.plan.id, &stored.name)?;
    }
    let plan = svc.workouts().plan(plan.plan.id)?;

    if json {
        print_json(&plan)?;
    } else {
        println!(
            "Created plan {} (id: {}, {} sessions per week)",
            plan.plan.name, plan.plan.id, plan.plan.weekly_goal
        );
        if plan.exercises.is_empty() {
            println!("Add exercises with: stride plan add-exercise \"{name}\" <exercise>");
        }
    }
    Ok(())
}

pub(crate) fn cmd_plan_add_exercise(
    svc: &StrideService,
    plan_name: &str,
    exercise: &str,
    json: bool,
) -> Result<()> {
    let plan = svc.workouts().plan_by_name(plan_name)?;
    let stored = svc.workouts().exercise(exercise)?;
    let added = svc.workouts().add_plan_exercise(plan.plan.id, &stored.name)?;

    if json {
        println!("{}", serde_json::json!({ "added": added, "exercise": stored.name }));
    } else if added {
        println!("Added {} to {}", stored.name, plan.plan.name);
    } else {
        println!("{} is already part of {}", stored.name, plan.plan.name);
    }
    Ok(())
}

pub(crate) fn cmd_plan_remove_exercise(
    svc: &StrideService,
    plan_name: &str,
    exercise: &str,
    json: bool,
) -> Result<()> {
    let plan = svc.workouts().plan_by_name(plan_name)?;
    if !svc.workouts().remove_plan_exercise(plan.plan.id, exercise)? {
        exit_not_found(
            &format!("Exercise '{exercise}' is not part of {}", plan.plan.name),
            json,
        );
    }
    if json {
        println!("{}", serde_json::json!({ "removed": exercise }));
    } else {
        println!("Removed {exercise} from {}", plan.plan.name);
    }
    Ok(())
}

pub(crate) fn cmd_plan_goal(
    svc: &StrideService,
    plan_name: &str,
    weekly_goal: i64,
    json: bool,
) -> Result<()> {
    let plan = svc.workouts().plan_by_name(plan_name)?;
    svc.workouts().set_weekly_goal(plan.plan.id, weekly_goal)?;
    if json {
        print_json(&svc.workouts().plan(plan.plan.id)?)?;
    } else {
        println!("{} now targets {weekly_goal} sessions per week", plan.plan.name);
    }
    Ok(())
}

pub(crate) fn cmd_plan_show(svc: &StrideService, plan_name: &str, json: bool) -> Result<()> {
    let (plan, progress) = progress_of(svc, plan_name)?;

    if json {
        return print_json(&serde_json::json!({ "plan": plan, "progress": progress }));
    }

    println!("=== {} ===", plan.plan.name);
    println!("  Weekly goal: {} sessions", plan.plan.weekly_goal);
    println!(
        "  Week of {}: {}/{}{}",
        progress.current_week.week_start,
        progress.current_week.logged,
        progress.current_week.goal,
        if progress.current_week.met { " (met)" } else { "" }
    );
    println!("  Streak: {} weeks\n", progress.streak_weeks);
    if plan.exercises.is_empty() {
        println!("  No exercises yet");
    } else {
        println!("  EXERCISES:");
        for name in &plan.exercises {
            println!("    {name}");
        }
    }
    Ok(())
}

pub(crate) fn cmd_plan_list(svc: &StrideService, json: bool) -> Result<()> {
    let state = svc.workout_view().load(Local::now().date_naive(), &Local)?;
    if json {
        return print_json(&state.plans);
    }
    if state.plans.is_empty() {
        exit_not_found("No workout plans found", false);
    }
    print_progress_table(&state.plans);
    Ok(())
}

pub(crate) fn cmd_plan_delete(svc: &StrideService, plan_name: &str, json: bool) -> Result<()> {
    let plan = svc.workouts().plan_by_name(plan_name)?;
    if !svc.workouts().delete_plan(plan.plan.id)? {
        exit_not_found(&format!("Plan '{plan_name}' not found"), json);
    }
    if json {
        println!("{}", serde_json::json!({ "deleted": plan.plan.id }));
    } else {
        println!("Deleted plan {}", plan.plan.name);
    }
    Ok(())
}
