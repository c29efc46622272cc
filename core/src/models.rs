use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// --- Food templates ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoodSource {
    Scanned,
    Custom,
    Predefined,
}

impl FoodSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FoodSource::Scanned => "scanned",
            FoodSource::Custom => "custom",
            FoodSource::Predefined => "predefined",
        }
    }
}

impl fmt::Display for FoodSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FoodSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "scanned" => Ok(FoodSource::Scanned),
            "custom" => Ok(FoodSource::Custom),
            "predefined" => Ok(FoodSource::Predefined),
            _ => bail!("Unknown food source '{s}'"),
        }
    }
}

/// Reusable per-100g nutrition definition for a food item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodTemplate {
    pub id: i64,
    pub name: String,
    pub brand: Option<String>,
    pub barcode: Option<String>,
    pub calories_per_100g: f64,
    pub protein_per_100g: f64,
    pub carbs_per_100g: f64,
    pub fat_per_100g: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sugar_per_100g: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salt_per_100g: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    pub source: FoodSource,
    pub created_at: String,
}

impl FoodTemplate {
    #[must_use]
    pub fn rates(&self) -> PerHundred {
        PerHundred {
            calories: self.calories_per_100g,
            protein: self.protein_per_100g,
            carbs: self.carbs_per_100g,
            fat: self.fat_per_100g,
        }
    }

    #[must_use]
    pub fn macros_for(&self, grams: f64) -> Macros {
        self.rates().macros_for(grams)
    }
}

#[derive(Debug, Clone)]
pub struct NewFoodTemplate {
    pub name: String,
    pub brand: Option<String>,
    pub barcode: Option<String>,
    pub calories_per_100g: f64,
    pub protein_per_100g: f64,
    pub carbs_per_100g: f64,
    pub fat_per_100g: f64,
    pub sugar_per_100g: Option<f64>,
    pub salt_per_100g: Option<f64>,
    pub image_url: Option<String>,
    pub image_path: Option<String>,
    pub source: FoodSource,
}

/// Per-100g macro rates of a template.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerHundred {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl PerHundred {
    /// Snapshot values for `grams`, each `round(rate * grams / 100)`.
    #[must_use]
    pub fn macros_for(&self, grams: f64) -> Macros {
        let scale = |rate: f64| (rate * grams / 100.0).round() as i64;
        Macros {
            calories: scale(self.calories),
            protein: scale(self.protein),
            carbs: scale(self.carbs),
            fat: scale(self.fat),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Macros {
    pub calories: i64,
    pub protein: i64,
    pub carbs: i64,
    pub fat: i64,
}

impl Add for Macros {
    type Output = Macros;

    fn add(self, rhs: Macros) -> Macros {
        Macros {
            calories: self.calories + rhs.calories,
            protein: self.protein + rhs.protein,
            carbs: self.carbs + rhs.carbs,
            fat: self.fat + rhs.fat,
        }
    }
}

impl Sum for Macros {
    fn sum<I: Iterator<Item = Macros>>(iter: I) -> Macros {
        iter.fold(Macros::default(), Add::add)
    }
}

// --- Food logs ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodLog {
    pub id: i64,
    pub template_id: i64,
    pub grams: f64,
    pub calories: i64,
    pub protein: i64,
    pub carbs: i64,
    pub fat: i64,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

impl FoodLog {
    #[must_use]
    pub fn macros(&self) -> Macros {
        Macros {
            calories: self.calories,
            protein: self.protein,
            carbs: self.carbs,
            fat: self.fat,
        }
    }
}

/// A food log joined with whatever is left of its template.
#[derive(Debug, Clone, Serialize)]
pub struct FoodLogWithTemplate {
    #[serde(flatten)]
    pub log: FoodLog,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub food_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub food_brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rates: Option<PerHundred>,
}

#[derive(Debug, Clone)]
pub struct NewFoodLog {
    pub template_id: i64,
    pub grams: f64,
    pub timestamp: i64,
}

// --- Recipes ---

#[derive(Debug, Clone, Serialize)]
pub struct Recipe {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeIngredient {
    pub id: i64,
    pub recipe_id: i64,
    pub template_id: i64,
    pub grams: f64,
    pub food_name: String,
    pub macros: Macros,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub ingredients: Vec<RecipeIngredient>,
    pub total_grams: f64,
    pub totals: Macros,
}

/// Ingredient as it looked when a recipe was logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientSnapshot {
    pub name: String,
    pub grams: f64,
    pub calories: i64,
    pub protein: i64,
    pub carbs: i64,
    pub fat: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeLog {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_id: Option<i64>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    pub ingredients_json: String,
    pub calories: i64,
    pub protein: i64,
    pub carbs: i64,
    pub fat: i64,
    pub timestamp: i64,
}

impl RecipeLog {
    #[must_use]
    pub fn macros(&self) -> Macros {
        Macros {
            calories: self.calories,
            protein: self.protein,
            carbs: self.carbs,
            fat: self.fat,
        }
    }

    pub fn ingredients(&self) -> Result<Vec<IngredientSnapshot>> {
        Ok(serde_json::from_str(&self.ingredients_json)?)
    }
}

// --- Workouts ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exercise {
    pub name: String,
    pub muscle_group: Option<String>,
    pub category: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkoutSession {
    pub id: i64,
    pub exercise_name: String,
    pub sets: i64,
    pub reps: i64,
    pub weight_kg: f64,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl WorkoutSession {
    /// Total lifted load: sets x reps x weight.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn volume_kg(&self) -> f64 {
        (self.sets * self.reps) as f64 * self.weight_kg
    }
}

#[derive(Debug, Clone)]
pub struct NewWorkoutSession {
    pub exercise_name: String,
    pub sets: i64,
    pub reps: i64,
    pub weight_kg: f64,
    pub timestamp: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkoutPlan {
    pub id: i64,
    pub name: String,
    pub weekly_goal: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanDetail {
    #[serde(flatten)]
    pub plan: WorkoutPlan,
    pub exercises: Vec<String>,
}

// --- Weight tracking ---

#[derive(Debug, Clone, Serialize)]
pub struct WeightEntry {
    pub date: NaiveDate,
    pub weight_kg: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewWeightEntry {
    pub date: NaiveDate,
    pub weight_kg: f64,
    pub notes: Option<String>,
}

/// Convert a quantity with a unit to grams.
/// Volume-based conversions assume water density (1 ml = 1 g).
/// Returns `(grams, is_approximate)` where `is_approximate` is true for volume conversions.
#[must_use]
pub fn convert_to_grams(quantity: f64, unit: &str) -> Option<(f64, bool)> {
    let lower = unit.to_lowercase();
    match lower.as_str() {
        "g" | "gram" | "grams" => Some((quantity, false)),
        "kg" | "kilogram" | "kilograms" => Some((quantity * 1000.0, false)),
        "lb" | "lbs" | "pound" | "pounds" => Some((quantity * 454.0, false)),
        "oz" | "ounce" | "ounces" => Some((quantity * 28.35, false)),
        "tbsp" | "tablespoon" | "tablespoons" => Some((quantity * 15.0, true)),
        "tsp" | "teaspoon" | "teaspoons" => Some((quantity * 5.0, true)),
        "ml" | "milliliter" | "milliliters" | "millilitre" | "millilitres" => {
            Some((quantity, true))
        }
        "l" | "liter" | "liters" | "litre" | "litres" => Some((quantity * 1000.0, true)),
        _ => None,
    }
}

pub fn validate_grams(grams: f64) -> Result<()> {
    if !grams.is_finite() || grams <= 0.0 {
        bail!("Amount must be greater than 0 grams");
    }
    Ok(())
}

/// Name must not be empty, per-100g rates must not be negative.
pub fn validate_food_template(food: &NewFoodTemplate) -> Result<()> {
    if food.name.trim().is_empty() {
        bail!("Food name must not be empty");
    }
    let rates = [
        ("calories_per_100g", Some(food.calories_per_100g)),
        ("protein_per_100g", Some(food.protein_per_100g)),
        ("carbs_per_100g", Some(food.carbs_per_100g)),
        ("fat_per_100g", Some(food.fat_per_100g)),
        ("sugar_per_100g", food.sugar_per_100g),
        ("salt_per_100g", food.salt_per_100g),
    ];
    for (field, value) in rates {
        if value.is_some_and(|v| v < 0.0) {
            bail!("{field} must not be negative");
        }
    }
    Ok(())
}

pub fn validate_macros(macros: &Macros) -> Result<()> {
    if macros.calories < 0 || macros.protein < 0 || macros.carbs < 0 || macros.fat < 0 {
        bail!("Macro values must not be negative");
    }
    Ok(())
}

pub fn validate_workout_session(session: &NewWorkoutSession) -> Result<()> {
    if session.sets <= 0 {
        bail!("Sets must be greater than 0");
    }
    if session.reps <= 0 {
        bail!("Reps must be greater than 0");
    }
    if session.weight_kg < 0.0 {
        bail!("Weight must not be negative");
    }
    Ok(())
}

pub fn validate_weekly_goal(goal: i64) -> Result<()> {
    if !(1..=50).contains(&goal) {
        bail!("Weekly goal must be between 1 and 50 sessions");
    }
    Ok(())
}

pub fn validate_weight(weight_kg: f64) -> Result<()> {
    if !weight_kg.is_finite() || weight_kg <= 0.0 {
        bail!("Weight must be greater than 0");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_template() -> NewFoodTemplate {
        NewFoodTemplate {
            name: "Greek Yogurt".to_string(),
            brand: None,
            barcode: None,
            calories_per_100g: 97.0,
            protein_per_100g: 9.0,
            carbs_per_100g: 3.6,
            fat_per_100g: 5.0,
            sugar_per_100g: Some(3.6),
            salt_per_100g: None,
            image_url: None,
            image_path: None,
            source: FoodSource::Custom,
        }
    }

    #[test]
    fn test_macros_for_rounds_each_field() {
        let rates = PerHundred {
            calories: 165.0,
            protein: 31.0,
            carbs: 0.0,
            fat: 3.6,
        };
        let m = rates.macros_for(150.0);
        // 247.5 -> 248, 46.5 -> 47, 5.4 -> 5
        assert_eq!(m.calories, 248);
        assert_eq!(m.protein, 47);
        assert_eq!(m.carbs, 0);
        assert_eq!(m.fat, 5);
    }

    #[test]
    fn test_macros_sum() {
        let a = Macros {
            calories: 100,
            protein: 10,
            carbs: 5,
            fat: 2,
        };
        let b = Macros {
            calories: 250,
            protein: 1,
            carbs: 40,
            fat: 9,
        };
        let total: Macros = [a, b].into_iter().sum();
        assert_eq!(total.calories, 350);
        assert_eq!(total.protein, 11);
        assert_eq!(total.carbs, 45);
        assert_eq!(total.fat, 11);
        assert_eq!(std::iter::empty::<Macros>().sum::<Macros>(), Macros::default());
    }

    #[test]
    fn test_food_source_round_trip_names() {
        for source in [FoodSource::Scanned, FoodSource::Custom, FoodSource::Predefined] {
            assert_eq!(source.as_str().parse::<FoodSource>().unwrap(), source);
        }
        assert!("legacy".parse::<FoodSource>().is_err());
    }

    #[test]
    fn test_recipe_log_ingredients_parse() {
        let log = RecipeLog {
            id: 1,
            recipe_id: None,
            name: "Oats".to_string(),
            instructions: None,
            ingredients_json: r#"[{"name":"Oats","grams":50.0,"calories":194,"protein":7,"carbs":33,"fat":3}]"#.to_string(),
            calories: 194,
            protein: 7,
            carbs: 33,
            fat: 3,
            timestamp: 0,
        };
        let ingredients = log.ingredients().unwrap();
        assert_eq!(ingredients.len(), 1);
        assert_eq!(ingredients[0].name, "Oats");

        let broken = RecipeLog {
            ingredients_json: "not json".to_string(),
            ..log
        };
        assert!(broken.ingredients().is_err());
    }

    #[test]
    fn test_workout_volume() {
        let session = WorkoutSession {
            id: 1,
            exercise_name: "Squat".to_string(),
            sets: 5,
            reps: 5,
            weight_kg: 100.0,
            timestamp: 0,
            notes: None,
        };
        assert!((session.volume_kg() - 2500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_convert_to_grams_weight_units() {
        let (g, approx) = convert_to_grams(2.0, "kg").unwrap();
        assert!((g - 2000.0).abs() < f64::EPSILON);
        assert!(!approx);

        let (g, _) = convert_to_grams(1.0, "oz").unwrap();
        assert!((g - 28.35).abs() < f64::EPSILON);
    }

    #[test]
    fn test_convert_to_grams_volume_units() {
        let (g, approx) = convert_to_grams(1.0, "TBSP").unwrap();
        assert!((g - 15.0).abs() < f64::EPSILON);
        assert!(approx);

        let (g, _) = convert_to_grams(1.0, "l").unwrap();
        assert!((g - 1000.0).abs() < f64::EPSILON);
        assert!(convert_to_grams(1.0, "cup").is_none());
    }

    #[test]
    fn test_validate_food_template() {
        assert!(validate_food_template(&sample_template()).is_ok());

        let mut empty = sample_template();
        empty.name = "  ".to_string();
        assert!(validate_food_template(&empty).is_err());

        let mut negative = sample_template();
        negative.fat_per_100g = -1.0;
        assert!(validate_food_template(&negative).is_err());

        let mut negative_salt = sample_template();
        negative_salt.salt_per_100g = Some(-0.1);
        assert!(validate_food_template(&negative_salt).is_err());
    }

    #[test]
    fn test_validate_grams() {
        assert!(validate_grams(150.0).is_ok());
        assert!(validate_grams(0.0).is_err());
        assert!(validate_grams(-5.0).is_err());
        assert!(validate_grams(f64::NAN).is_err());
    }

    #[test]
    fn test_validate_workout_session() {
        let mut session = NewWorkoutSession {
            exercise_name: "Bench Press".to_string(),
            sets: 3,
            reps: 8,
            weight_kg: 60.0,
            timestamp: 0,
            notes: None,
        };
        assert!(validate_workout_session(&session).is_ok());
        session.weight_kg = 0.0;
        assert!(validate_workout_session(&session).is_ok());
        session.reps = 0;
        assert!(validate_workout_session(&session).is_err());
    }

    #[test]
    fn test_validate_weekly_goal_and_weight() {
        assert!(validate_weekly_goal(3).is_ok());
        assert!(validate_weekly_goal(0).is_err());
        assert!(validate_weight(72.5).is_ok());
        assert!(validate_weight(0.0).is_err());
        assert!(
            validate_macros(&Macros {
                calories: -1,
                ..Macros::default()
            })
            .is_err()
        );
    }
}
