mod commands;
mod config;
mod openfoodfacts;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    FoodInput, GoalUpdate, LogEdit, SessionInput, cmd_delete, cmd_diary, cmd_edit,
    cmd_exercise_add, cmd_exercise_delete, cmd_exercise_list, cmd_export, cmd_food_add,
    cmd_food_delete, cmd_food_list, cmd_goals_set, cmd_goals_show, cmd_health, cmd_history,
    cmd_home, cmd_log, cmd_plan_add_exercise, cmd_plan_create, cmd_plan_delete, cmd_plan_goal,
    cmd_plan_list, cmd_plan_remove_exercise, cmd_plan_show, cmd_recipe_add_ingredient,
    cmd_recipe_create, cmd_recipe_delete, cmd_recipe_list, cmd_recipe_log,
    cmd_recipe_remove_ingredient, cmd_recipe_set_instructions, cmd_recipe_show, cmd_scan,
    cmd_settings_decline_health, cmd_settings_dismiss_card, cmd_settings_language,
    cmd_settings_show, cmd_weight_delete, cmd_weight_history, cmd_weight_log, cmd_weight_show,
    cmd_workout_delete, cmd_workout_history, cmd_workout_log,
};
use crate::config::Config;
use crate::openfoodfacts::OpenFoodFactsClient;
use stride_core::goals::CalorieMode;
use stride_core::health::JsonFileHealthProvider;
use stride_core::service::StrideService;

#[derive(Parser)]
#[command(
    name = "stride",
    version,
    about = "Local-first workout, nutrition and weight tracker"
)]
struct Cli {
    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Today's overview: intake against goals, activity, workouts, weight
    Home {
        /// Date (YYYY-MM-DD or today/yesterday, default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the food and recipe diary for a day
    Diary {
        /// Date (YYYY-MM-DD or today/yesterday, default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show daily totals for the last N days
    History {
        /// Number of days to show
        #[arg(short, long, default_value = "7")]
        days: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log a food from the local catalogue
    Log {
        /// Food name to search for
        food: String,
        /// Amount (e.g. "200g", "500ml", "2 tbsp", "1.5 oz")
        amount: String,
        /// Log directly by food ID (skip search)
        #[arg(long)]
        food_id: Option<i64>,
        /// Date to log for (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Time of day (HH:MM, default: now, or noon for other days)
        #[arg(long)]
        time: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Look up a barcode on `OpenFoodFacts` and optionally log it
    Scan {
        /// Barcode number
        barcode: String,
        /// Amount to log; without it the product is only shown
        amount: Option<String>,
        /// Date to log for (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Time of day (HH:MM)
        #[arg(long)]
        time: Option<String>,
        /// Download and keep the product photo
        #[arg(long)]
        save_image: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit a food diary entry (amount, macros or time)
    Edit {
        /// Entry ID as shown in the diary
        entry: String,
        /// New amount (e.g. "150g"); macros are recomputed from the food
        #[arg(short, long)]
        grams: Option<String>,
        /// Override calories
        #[arg(long)]
        calories: Option<i64>,
        /// Override protein (g)
        #[arg(long)]
        protein: Option<i64>,
        /// Override carbs (g)
        #[arg(long)]
        carbs: Option<i64>,
        /// Override fat (g)
        #[arg(long)]
        fat: Option<i64>,
        /// Move to another date (YYYY-MM-DD or today/yesterday)
        #[arg(long)]
        date: Option<String>,
        /// New time of day (HH:MM)
        #[arg(long)]
        time: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a diary entry (`12` for a food, `r12` for a recipe)
    Delete {
        /// Entry ID as shown in the diary
        entry: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the food catalogue
    Food {
        #[command(subcommand)]
        command: FoodCommands,
    },
    /// Manage recipes
    Recipe {
        #[command(subcommand)]
        command: RecipeCommands,
    },
    /// Track body weight
    Weight {
        #[command(subcommand)]
        command: WeightCommands,
    },
    /// Exercises, sessions and workout plans
    Workout {
        #[command(subcommand)]
        command: WorkoutCommands,
    },
    /// Daily calorie, macro and step goals
    Goals {
        #[command(subcommand)]
        command: GoalCommands,
    },
    /// App preferences
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
    /// Steps, distance and burned calories for a day
    Health {
        /// Date (YYYY-MM-DD or today/yesterday, default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export diary entries as CSV
    Export {
        /// Number of days to export, ending with --last
        #[arg(short, long, default_value = "30")]
        days: u32,
        /// Last day to include (default: today)
        #[arg(long)]
        last: Option<String>,
        /// Output file (default: stdout)
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum FoodCommands {
    /// Add a custom food (values per 100g)
    Add {
        /// Food name
        name: String,
        /// Calories per 100g
        #[arg(long)]
        calories: f64,
        /// Protein per 100g
        #[arg(long, default_value = "0")]
        protein: f64,
        /// Carbs per 100g
        #[arg(long, default_value = "0")]
        carbs: f64,
        /// Fat per 100g
        #[arg(long, default_value = "0")]
        fat: f64,
        /// Sugar per 100g
        #[arg(long)]
        sugar: Option<f64>,
        /// Salt per 100g
        #[arg(long)]
        salt: Option<f64>,
        /// Brand name
        #[arg(long)]
        brand: Option<String>,
        /// Barcode
        #[arg(long)]
        barcode: Option<String>,
        /// Photo to copy into the image store
        #[arg(long, value_name = "PATH")]
        image: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List foods and recipes, optionally filtered
    List {
        /// Search query to filter foods
        #[arg(short, long)]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a food together with its diary entries
    Delete {
        /// Food ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum RecipeCommands {
    /// Create a new recipe
    Create {
        /// Recipe name
        name: String,
        /// Preparation instructions
        #[arg(short, long)]
        instructions: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add an ingredient to a recipe
    AddIngredient {
        /// Recipe name
        recipe: String,
        /// Food name from the local catalogue
        food: String,
        /// Amount (e.g. "500g", "2 tbsp", "1 lb")
        amount: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove an ingredient from a recipe
    RemoveIngredient {
        /// Recipe name
        recipe: String,
        /// Ingredient food name to remove
        food: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace or clear a recipe's instructions
    Instructions {
        /// Recipe name
        recipe: String,
        /// New instructions (omit to clear)
        text: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show recipe ingredients and totals
    Show {
        /// Recipe name
        recipe: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all recipes
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log a whole recipe to the diary
    Log {
        /// Recipe name
        recipe: String,
        /// Date to log for (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Time of day (HH:MM)
        #[arg(long)]
        time: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a recipe (logged entries are kept)
    Delete {
        /// Recipe name
        recipe: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum WeightCommands {
    /// Log a weight entry
    Log {
        /// Weight value (number)
        value: f64,
        /// Unit: kg or lbs (default: kg)
        #[arg(short, long, default_value = "kg")]
        unit: String,
        /// Date (YYYY-MM-DD or today/yesterday, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Optional notes
        #[arg(long)]
        notes: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show weight for a specific date (default: today)
    Show {
        /// Date (YYYY-MM-DD or today/yesterday, default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show weight history and change over the window
    History {
        /// Number of days to show (default: all)
        #[arg(short, long)]
        days: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete the weight entry for a date
    Delete {
        /// Date (YYYY-MM-DD or today/yesterday, default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum WorkoutCommands {
    /// Manage exercises
    Exercise {
        #[command(subcommand)]
        command: ExerciseCommands,
    },
    /// Manage workout plans
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Log a workout session
    Log {
        /// Exercise name
        exercise: String,
        /// Number of sets
        #[arg(short, long)]
        sets: i64,
        /// Reps per set
        #[arg(short, long)]
        reps: i64,
        /// Weight in kg (0 for bodyweight)
        #[arg(short, long, default_value = "0")]
        weight: f64,
        /// Date (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Time of day (HH:MM)
        #[arg(long)]
        time: Option<String>,
        /// Optional notes
        #[arg(long)]
        notes: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show sessions for a day, or recent sessions of one exercise
    History {
        /// Date (YYYY-MM-DD or today/yesterday, default: today)
        date: Option<String>,
        /// Show the latest sessions of this exercise instead
        #[arg(short, long)]
        exercise: Option<String>,
        /// Maximum sessions with --exercise
        #[arg(long, default_value = "20")]
        limit: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a workout session by ID
    Delete {
        /// Session ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ExerciseCommands {
    /// Add a custom exercise
    Add {
        /// Exercise name
        name: String,
        /// Muscle group (e.g. chest, legs)
        #[arg(short, long)]
        muscle_group: Option<String>,
        /// Category (e.g. strength, cardio, bodyweight)
        #[arg(short, long, default_value = "strength")]
        category: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List exercises
    List {
        /// Only this muscle group
        #[arg(short, long)]
        muscle_group: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an exercise with its sessions
    Delete {
        /// Exercise name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PlanCommands {
    /// Create a plan
    Create {
        /// Plan name
        name: String,
        /// Sessions per week
        #[arg(short, long, default_value = "3")]
        goal: i64,
        /// Exercises to include
        #[arg(short, long = "exercise")]
        exercises: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add an exercise to a plan
    AddExercise {
        /// Plan name
        plan: String,
        /// Exercise name
        exercise: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove an exercise from a plan
    RemoveExercise {
        /// Plan name
        plan: String,
        /// Exercise name
        exercise: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change a plan's weekly session goal
    Goal {
        /// Plan name
        plan: String,
        /// Sessions per week
        goal: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a plan with this week's progress and streak
    Show {
        /// Plan name
        plan: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List plans with weekly progress
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a plan
    Delete {
        /// Plan name
        plan: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum GoalCommands {
    /// Show daily goals
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change one or more daily goals
    Set {
        /// Daily calories
        #[arg(long)]
        calories: Option<i64>,
        /// Daily protein (g)
        #[arg(long)]
        protein: Option<i64>,
        /// Daily carbs (g)
        #[arg(long)]
        carbs: Option<i64>,
        /// Daily fat (g)
        #[arg(long)]
        fat: Option<i64>,
        /// Daily steps
        #[arg(long)]
        steps: Option<i64>,
        /// Calorie mode: deficit (stay under) or surplus (reach at least)
        #[arg(long)]
        mode: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Show preferences and storage locations
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set the display language
    Language {
        /// Language code (e.g. en, de)
        language: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Hide the "health data is off" card on the home screen
    DismissCard {
        /// Show the card again
        #[arg(long)]
        undo: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Stop reading health data
    DeclineHealth {
        /// Read health data again
        #[arg(long)]
        undo: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn open_service(config: &Config) -> Result<StrideService> {
    let mut svc = StrideService::open(&config.db_path)?
        .with_image_dir(config.image_dir.clone())
        .with_week_start(config.settings.week_start);
    if let Some(path) = config.health_data_file() {
        svc = svc.with_health_provider(Arc::new(JsonFileHealthProvider::new(path)));
    }
    let seeded = svc.seeded();
    if seeded.exercises_added > 0 || seeded.foods_added > 0 {
        tracing::info!(
            exercises = seeded.exercises_added,
            foods = seeded.foods_added,
            "seeded default catalogue"
        );
    }
    Ok(svc)
}

#[allow(clippy::too_many_lines)]
fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let svc = open_service(&config)?;

    match cli.command {
        Commands::Home { date, json } => cmd_home(&svc, date, json),
        Commands::Diary { date, json } => cmd_diary(&svc, date, json),
        Commands::History { days, json } => cmd_history(&svc, days, json),
        Commands::Log {
            food,
            amount,
            food_id,
            date,
            time,
            json,
        } => cmd_log(&svc, &food, &amount, food_id, date, time.as_deref(), json),
        Commands::Scan {
            barcode,
            amount,
            date,
            time,
            save_image,
            json,
        } => {
            let off = OpenFoodFactsClient::new(config.lookup_timeout())?;
            cmd_scan(
                &svc,
                &off,
                &barcode,
                amount.as_deref(),
                date,
                time.as_deref(),
                save_image,
                json,
            )
        }
        Commands::Edit {
            entry,
            grams,
            calories,
            protein,
            carbs,
            fat,
            date,
            time,
            json,
        } => cmd_edit(
            &svc,
            &entry,
            LogEdit {
                grams,
                calories,
                protein,
                carbs,
                fat,
                date,
                time,
            },
            json,
        ),
        Commands::Delete { entry, json } => cmd_delete(&svc, &entry, json),
        Commands::Food { command } => match command {
            FoodCommands::Add {
                name,
                calories,
                protein,
                carbs,
                fat,
                sugar,
                salt,
                brand,
                barcode,
                image,
                json,
            } => cmd_food_add(
                &svc,
                FoodInput {
                    name,
                    brand,
                    barcode,
                    calories,
                    protein,
                    carbs,
                    fat,
                    sugar,
                    salt,
                    image,
                },
                json,
            ),
            FoodCommands::List { search, json } => cmd_food_list(&svc, search.as_deref(), json),
            FoodCommands::Delete { id, json } => cmd_food_delete(&svc, id, json),
        },
        Commands::Recipe { command } => match command {
            RecipeCommands::Create {
                name,
                instructions,
                json,
            } => cmd_recipe_create(&svc, &name, instructions.as_deref(), json),
            RecipeCommands::AddIngredient {
                recipe,
                food,
                amount,
                json,
            } => cmd_recipe_add_ingredient(&svc, &recipe, &food, &amount, json),
            RecipeCommands::RemoveIngredient { recipe, food, json } => {
                cmd_recipe_remove_ingredient(&svc, &recipe, &food, json)
            }
            RecipeCommands::Instructions { recipe, text, json } => {
                cmd_recipe_set_instructions(&svc, &recipe, text.as_deref(), json)
            }
            RecipeCommands::Show { recipe, json } => cmd_recipe_show(&svc, &recipe, json),
            RecipeCommands::List { json } => cmd_recipe_list(&svc, json),
            RecipeCommands::Log {
                recipe,
                date,
                time,
                json,
            } => cmd_recipe_log(&svc, &recipe, date, time.as_deref(), json),
            RecipeCommands::Delete { recipe, json } => cmd_recipe_delete(&svc, &recipe, json),
        },
        Commands::Weight { command } => match command {
            WeightCommands::Log {
                value,
                unit,
                date,
                notes,
                json,
            } => cmd_weight_log(&svc, value, &unit, date, notes, json),
            WeightCommands::Show { date, json } => cmd_weight_show(&svc, date, json),
            WeightCommands::History { days, json } => cmd_weight_history(&svc, days, json),
            WeightCommands::Delete { date, json } => cmd_weight_delete(&svc, date, json),
        },
        Commands::Workout { command } => match command {
            WorkoutCommands::Exercise { command } => match command {
                ExerciseCommands::Add {
                    name,
                    muscle_group,
                    category,
                    json,
                } => cmd_exercise_add(&svc, &name, muscle_group, &category, json),
                ExerciseCommands::List { muscle_group, json } => {
                    cmd_exercise_list(&svc, muscle_group.as_deref(), json)
                }
                ExerciseCommands::Delete { name, json } => cmd_exercise_delete(&svc, &name, json),
            },
            WorkoutCommands::Plan { command } => match command {
                PlanCommands::Create {
                    name,
                    goal,
                    exercises,
                    json,
                } => cmd_plan_create(&svc, &name, goal, &exercises, json),
                PlanCommands::AddExercise {
                    plan,
                    exercise,
                    json,
                } => cmd_plan_add_exercise(&svc, &plan, &exercise, json),
                PlanCommands::RemoveExercise {
                    plan,
                    exercise,
                    json,
                } => cmd_plan_remove_exercise(&svc, &plan, &exercise, json),
                PlanCommands::Goal { plan, goal, json } => cmd_plan_goal(&svc, &plan, goal, json),
                PlanCommands::Show { plan, json } => cmd_plan_show(&svc, &plan, json),
                PlanCommands::List { json } => cmd_plan_list(&svc, json),
                PlanCommands::Delete { plan, json } => cmd_plan_delete(&svc, &plan, json),
            },
            WorkoutCommands::Log {
                exercise,
                sets,
                reps,
                weight,
                date,
                time,
                notes,
                json,
            } => cmd_workout_log(
                &svc,
                SessionInput {
                    exercise,
                    sets,
                    reps,
                    weight_kg: weight,
                    date,
                    time,
                    notes,
                },
                json,
            ),
            WorkoutCommands::History {
                date,
                exercise,
                limit,
                json,
            } => cmd_workout_history(&svc, date, exercise.as_deref(), limit, json),
            WorkoutCommands::Delete { id, json } => cmd_workout_delete(&svc, id, json),
        },
        Commands::Goals { command } => match command {
            GoalCommands::Show { json } => cmd_goals_show(&svc, json),
            GoalCommands::Set {
                calories,
                protein,
                carbs,
                fat,
                steps,
                mode,
                json,
            } => {
                let mode = mode.map(|m| m.parse::<CalorieMode>()).transpose()?;
                cmd_goals_set(
                    &svc,
                    GoalUpdate {
                        calories,
                        protein,
                        carbs,
                        fat,
                        steps,
                        mode,
                    },
                    json,
                )
            }
        },
        Commands::Settings { command } => match command {
            SettingsCommands::Show { json } => cmd_settings_show(&svc, &config, json),
            SettingsCommands::Language { language, json } => {
                cmd_settings_language(&svc, &language, json)
            }
            SettingsCommands::DismissCard { undo, json } => {
                cmd_settings_dismiss_card(&svc, undo, json)
            }
            SettingsCommands::DeclineHealth { undo, json } => {
                cmd_settings_decline_health(&svc, undo, json)
            }
        },
        Commands::Health { date, json } => cmd_health(&svc, date, json),
        Commands::Export {
            days,
            last,
            out,
            json,
        } => cmd_export(&svc, days, last, out.as_deref(), json),
    }
}
