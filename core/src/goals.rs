use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::models::Macros;

/// Whether the calorie goal is an upper limit or a lower target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalorieMode {
    #[default]
    Deficit,
    Surplus,
}

impl CalorieMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CalorieMode::Deficit => "DEFICIT",
            CalorieMode::Surplus => "SURPLUS",
        }
    }
}

impl fmt::Display for CalorieMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CalorieMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "DEFICIT" => Ok(CalorieMode::Deficit),
            "SURPLUS" => Ok(CalorieMode::Surplus),
            _ => bail!("Invalid calorie mode '{s}'. Use deficit or surplus"),
        }
    }
}

/// Deficit is met at or under the goal, surplus at or over it.
#[must_use]
pub fn is_goal_met(intake: i64, goal: i64, mode: CalorieMode) -> bool {
    match mode {
        CalorieMode::Deficit => intake <= goal,
        CalorieMode::Surplus => intake >= goal,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    OnTrack,
    OffTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGoals {
    pub calorie_goal: i64,
    pub protein_goal: i64,
    pub carb_goal: i64,
    pub fat_goal: i64,
    pub steps_goal: i64,
    pub calorie_mode: CalorieMode,
}

impl Default for UserGoals {
    fn default() -> Self {
        Self {
            calorie_goal: 2000,
            protein_goal: 150,
            carb_goal: 250,
            fat_goal: 70,
            steps_goal: 10_000,
            calorie_mode: CalorieMode::Deficit,
        }
    }
}

impl UserGoals {
    #[must_use]
    pub fn calories_met(&self, intake: i64) -> bool {
        is_goal_met(intake, self.calorie_goal, self.calorie_mode)
    }

    #[must_use]
    pub fn calorie_status(&self, intake: i64) -> GoalStatus {
        if self.calories_met(intake) {
            GoalStatus::OnTrack
        } else {
            GoalStatus::OffTarget
        }
    }

    /// Goal minus intake for each macro; negative means over.
    #[must_use]
    pub fn remaining(&self, intake: &Macros) -> Macros {
        Macros {
            calories: self.calorie_goal - intake.calories,
            protein: self.protein_goal - intake.protein,
            carbs: self.carb_goal - intake.carbs,
            fat: self.fat_goal - intake.fat,
        }
    }

    #[must_use]
    pub fn steps_met(&self, steps: i64) -> bool {
        steps >= self.steps_goal
    }
}

pub fn validate_goals(goals: &UserGoals) -> Result<()> {
    if goals.calorie_goal <= 0 {
        bail!("Calorie goal must be greater than 0");
    }
    if goals.protein_goal < 0 || goals.carb_goal < 0 || goals.fat_goal < 0 {
        bail!("Macro goals must not be negative");
    }
    if goals.steps_goal < 0 {
        bail!("Steps goal must not be negative");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deficit_mode() {
        assert!(is_goal_met(1800, 2000, CalorieMode::Deficit));
        assert!(is_goal_met(2000, 2000, CalorieMode::Deficit));
        assert!(!is_goal_met(2100, 2000, CalorieMode::Deficit));
    }

    #[test]
    fn test_surplus_mode() {
        assert!(is_goal_met(2100, 2000, CalorieMode::Surplus));
        assert!(is_goal_met(2000, 2000, CalorieMode::Surplus));
        assert!(!is_goal_met(1800, 2000, CalorieMode::Surplus));
    }

    #[test]
    fn test_calorie_mode_parse() {
        assert_eq!("deficit".parse::<CalorieMode>().unwrap(), CalorieMode::Deficit);
        assert_eq!("SURPLUS".parse::<CalorieMode>().unwrap(), CalorieMode::Surplus);
        assert!("bulk".parse::<CalorieMode>().is_err());
        assert_eq!(CalorieMode::Surplus.to_string(), "SURPLUS");
    }

    #[test]
    fn test_calorie_status() {
        let goals = UserGoals::default();
        assert_eq!(goals.calorie_status(1500), GoalStatus::OnTrack);
        assert_eq!(goals.calorie_status(2500), GoalStatus::OffTarget);

        let bulking = UserGoals {
            calorie_mode: CalorieMode::Surplus,
            ..UserGoals::default()
        };
        assert_eq!(bulking.calorie_status(1500), GoalStatus::OffTarget);
    }

    #[test]
    fn test_remaining() {
        let goals = UserGoals::default();
        let intake = Macros {
            calories: 2100,
            protein: 100,
            carbs: 200,
            fat: 80,
        };
        let remaining = goals.remaining(&intake);
        assert_eq!(remaining.calories, -100);
        assert_eq!(remaining.protein, 50);
        assert_eq!(remaining.carbs, 50);
        assert_eq!(remaining.fat, -10);
    }

    #[test]
    fn test_validate_goals() {
        assert!(validate_goals(&UserGoals::default()).is_ok());
        let bad = UserGoals {
            calorie_goal: 0,
            ..UserGoals::default()
        };
        assert!(validate_goals(&bad).is_err());
        let negative_steps = UserGoals {
            steps_goal: -1,
            ..UserGoals::default()
        };
        assert!(validate_goals(&negative_steps).is_err());
    }
}
