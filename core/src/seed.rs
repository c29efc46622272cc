//! Built-in exercises and foods available on first launch.

use anyhow::Result;
use serde::Serialize;

use crate::db::Database;
use crate::models::{Exercise, FoodSource, NewFoodTemplate};

/// Bump when the lists below change so existing stores pick up additions.
pub const SEED_VERSION: i64 = 1;
const SEED_VERSION_KEY: &str = "seed_version";

/// `(name, muscle group, category)`
pub const PREDEFINED_EXERCISES: &[(&str, &str, &str)] = &[
    ("Bench Press", "chest", "strength"),
    ("Incline Dumbbell Press", "chest", "strength"),
    ("Push-Up", "chest", "bodyweight"),
    ("Squat", "legs", "strength"),
    ("Leg Press", "legs", "strength"),
    ("Lunge", "legs", "strength"),
    ("Deadlift", "back", "strength"),
    ("Barbell Row", "back", "strength"),
    ("Pull-Up", "back", "bodyweight"),
    ("Lat Pulldown", "back", "strength"),
    ("Overhead Press", "shoulders", "strength"),
    ("Lateral Raise", "shoulders", "strength"),
    ("Bicep Curl", "arms", "strength"),
    ("Tricep Dip", "arms", "bodyweight"),
    ("Plank", "core", "bodyweight"),
    ("Running", "cardio", "cardio"),
    ("Cycling", "cardio", "cardio"),
    ("Rowing", "cardio", "cardio"),
];

/// `(name, kcal, protein, carbs, fat)` per 100 g.
pub const PREDEFINED_FOODS: &[(&str, f64, f64, f64, f64)] = &[
    ("Apple", 52.0, 0.3, 14.0, 0.2),
    ("Banana", 89.0, 1.1, 23.0, 0.3),
    ("Chicken Breast", 165.0, 31.0, 0.0, 3.6),
    ("Egg", 155.0, 13.0, 1.1, 11.0),
    ("White Rice (cooked)", 130.0, 2.7, 28.0, 0.3),
    ("Rolled Oats", 389.0, 16.9, 66.3, 6.9),
    ("Whole Milk", 61.0, 3.2, 4.8, 3.3),
    ("Greek Yogurt", 97.0, 9.0, 3.6, 5.0),
    ("Salmon", 208.0, 20.0, 0.0, 13.0),
    ("Broccoli", 34.0, 2.8, 7.0, 0.4),
    ("Almonds", 579.0, 21.0, 22.0, 50.0),
    ("Whole Wheat Bread", 247.0, 13.0, 41.0, 3.4),
    ("Olive Oil", 884.0, 0.0, 0.0, 100.0),
    ("Potato (boiled)", 87.0, 1.9, 20.0, 0.1),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub exercises_added: usize,
    pub foods_added: usize,
}

/// Inserts whatever predefined rows are missing. Runs once per `SEED_VERSION`,
/// so a predefined food the user deleted stays deleted.
pub fn seed_defaults(db: &Database) -> Result<SeedSummary> {
    let applied = db
        .get_setting(SEED_VERSION_KEY)?
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(0);
    if applied >= SEED_VERSION {
        return Ok(SeedSummary::default());
    }

    let mut summary = SeedSummary::default();
    for (name, muscle_group, category) in PREDEFINED_EXERCISES {
        let added = db.insert_exercise(&Exercise {
            name: (*name).to_string(),
            muscle_group: Some((*muscle_group).to_string()),
            category: (*category).to_string(),
        })?;
        if added {
            summary.exercises_added += 1;
        }
    }

    for &(name, calories, protein, carbs, fat) in PREDEFINED_FOODS {
        if db.get_food_template_by_name(name)?.is_some() {
            continue;
        }
        db.insert_food_template(&NewFoodTemplate {
            name: name.to_string(),
            brand: None,
            barcode: None,
            calories_per_100g: calories,
            protein_per_100g: protein,
            carbs_per_100g: carbs,
            fat_per_100g: fat,
            sugar_per_100g: None,
            salt_per_100g: None,
            image_url: None,
            image_path: None,
            source: FoodSource::Predefined,
        })?;
        summary.foods_added += 1;
    }

    db.set_setting(SEED_VERSION_KEY, &SEED_VERSION.to_string())?;
    tracing::info!(
        exercises = summary.exercises_added,
        foods = summary.foods_added,
        "seeded defaults"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let first = seed_defaults(&db).unwrap();
        assert_eq!(first.exercises_added, PREDEFINED_EXERCISES.len());
        assert_eq!(first.foods_added, PREDEFINED_FOODS.len());

        let second = seed_defaults(&db).unwrap();
        assert_eq!(second, SeedSummary::default());
        assert_eq!(db.list_exercises(None).unwrap().len(), PREDEFINED_EXERCISES.len());
    }

    #[test]
    fn test_seed_keeps_existing_rows() {
        let db = Database::open_in_memory().unwrap();
        db.insert_exercise(&Exercise {
            name: "Squat".to_string(),
            muscle_group: Some("glutes".to_string()),
            category: "strength".to_string(),
        })
        .unwrap();
        let summary = seed_defaults(&db).unwrap();
        assert_eq!(summary.exercises_added, PREDEFINED_EXERCISES.len() - 1);
        assert_eq!(
            db.get_exercise("Squat").unwrap().muscle_group.as_deref(),
            Some("glutes")
        );
    }

    #[test]
    fn test_deleted_predefined_food_not_restored() {
        let db = Database::open_in_memory().unwrap();
        seed_defaults(&db).unwrap();
        let apple = db.get_food_template_by_name("Apple").unwrap().unwrap();
        assert_eq!(apple.source, FoodSource::Predefined);
        db.delete_food_template(apple.id).unwrap();

        seed_defaults(&db).unwrap();
        assert!(db.get_food_template_by_name("Apple").unwrap().is_none());
    }

    #[test]
    fn test_predefined_names_unique() {
        let mut names: Vec<&str> = PREDEFINED_EXERCISES.iter().map(|e| e.0).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), PREDEFINED_EXERCISES.len());
    }
}
