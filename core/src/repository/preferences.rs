use std::str::FromStr;

use anyhow::Result;
use serde::Serialize;

use super::{SharedDb, lock};
use crate::events::{ChangeBus, StoreChange};
use crate::goals::{CalorieMode, UserGoals, validate_goals};

const LANGUAGE: &str = "language";
const CALORIE_GOAL: &str = "calorie_goal";
const PROTEIN_GOAL: &str = "protein_goal";
const CARB_GOAL: &str = "carb_goal";
const FAT_GOAL: &str = "fat_goal";
const STEPS_GOAL: &str = "steps_goal";
const CALORIE_MODE: &str = "calorie_mode";
const HEALTH_PERMISSIONS_DECLINED: &str = "health_permissions_declined";
const DISMISSED_DISABLED_CARD: &str = "dismissed_disabled_card";

pub const DEFAULT_LANGUAGE: &str = "en";

/// Everything the settings screen shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preferences {
    pub language: String,
    pub goals: UserGoals,
    pub health_permissions_declined: bool,
    pub dismissed_disabled_card: bool,
}

/// Typed access to the key/value preference store.
#[derive(Clone)]
pub struct PreferencesRepository {
    db: SharedDb,
    bus: ChangeBus,
}

impl PreferencesRepository {
    #[must_use]
    pub fn new(db: SharedDb, bus: ChangeBus) -> Self {
        Self { db, bus }
    }

    /// Unparseable stored values fall back to the default with a warning.
    fn get_parsed<T: FromStr>(&self, key: &str, default: T) -> Result<T> {
        let Some(raw) = lock(&self.db).get_setting(key)? else {
            return Ok(default);
        };
        match raw.parse() {
            Ok(value) => Ok(value),
            Err(_) => {
                tracing::warn!(key, value = %raw, "ignoring invalid preference value");
                Ok(default)
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        lock(&self.db).set_setting(key, value)?;
        self.bus.publish(StoreChange::Preferences);
        Ok(())
    }

    pub fn language(&self) -> Result<String> {
        Ok(lock(&self.db)
            .get_setting(LANGUAGE)?
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()))
    }

    pub fn set_language(&self, language: &str) -> Result<()> {
        let language = language.trim();
        if language.is_empty() {
            anyhow::bail!("Language must not be empty");
        }
        self.set(LANGUAGE, language)
    }

    pub fn goals(&self) -> Result<UserGoals> {
        let defaults = UserGoals::default();
        Ok(UserGoals {
            calorie_goal: self.get_parsed(CALORIE_GOAL, defaults.calorie_goal)?,
            protein_goal: self.get_parsed(PROTEIN_GOAL, defaults.protein_goal)?,
            carb_goal: self.get_parsed(CARB_GOAL, defaults.carb_goal)?,
            fat_goal: self.get_parsed(FAT_GOAL, defaults.fat_goal)?,
            steps_goal: self.get_parsed(STEPS_GOAL, defaults.steps_goal)?,
            calorie_mode: self.get_parsed(CALORIE_MODE, defaults.calorie_mode)?,
        })
    }

    /// Writes all goal keys in one transaction; nothing is written when validation fails.
    pub fn set_goals(&self, goals: &UserGoals) -> Result<()> {
        validate_goals(goals)?;
        lock(&self.db).set_settings(&[
            (CALORIE_GOAL, goals.calorie_goal.to_string()),
            (PROTEIN_GOAL, goals.protein_goal.to_string()),
            (CARB_GOAL, goals.carb_goal.to_string()),
            (FAT_GOAL, goals.fat_goal.to_string()),
            (STEPS_GOAL, goals.steps_goal.to_string()),
            (CALORIE_MODE, goals.calorie_mode.to_string()),
        ])?;
        self.bus.publish(StoreChange::Preferences);
        Ok(())
    }

    pub fn set_calorie_mode(&self, mode: CalorieMode) -> Result<()> {
        self.set(CALORIE_MODE, mode.as_str())
    }

    pub fn health_permissions_declined(&self) -> Result<bool> {
        self.get_parsed(HEALTH_PERMISSIONS_DECLINED, false)
    }

    pub fn set_health_permissions_declined(&self, declined: bool) -> Result<()> {
        self.set(HEALTH_PERMISSIONS_DECLINED, &declined.to_string())
    }

    pub fn dismissed_disabled_card(&self) -> Result<bool> {
        self.get_parsed(DISMISSED_DISABLED_CARD, false)
    }

    pub fn set_dismissed_disabled_card(&self, dismissed: bool) -> Result<()> {
        self.set(DISMISSED_DISABLED_CARD, &dismissed.to_string())
    }

    pub fn all(&self) -> Result<Preferences> {
        Ok(Preferences {
            language: self.language()?,
            goals: self.goals()?,
            health_permissions_declined: self.health_permissions_declined()?,
            dismissed_disabled_card: self.dismissed_disabled_card()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::repository::shared;

    fn repo() -> (PreferencesRepository, SharedDb, ChangeBus) {
        let db = shared(Database::open_in_memory().unwrap());
        let bus = ChangeBus::default();
        (PreferencesRepository::new(db.clone(), bus.clone()), db, bus)
    }

    #[test]
    fn test_defaults() {
        let (prefs, _, _) = repo();
        let all = prefs.all().unwrap();
        assert_eq!(all.language, "en");
        assert_eq!(all.goals, UserGoals::default());
        assert!(!all.health_permissions_declined);
        assert!(!all.dismissed_disabled_card);
    }

    #[test]
    fn test_set_goals_round_trip() {
        let (prefs, _, bus) = repo();
        let mut sub = bus.subscribe(&[StoreChange::Preferences]);
        let goals = UserGoals {
            calorie_goal: 2800,
            protein_goal: 180,
            carb_goal: 320,
            fat_goal: 90,
            steps_goal: 8000,
            calorie_mode: CalorieMode::Surplus,
        };
        prefs.set_goals(&goals).unwrap();
        assert!(sub.drain());
        assert_eq!(prefs.goals().unwrap(), goals);
    }

    #[test]
    fn test_invalid_goals_not_written() {
        let (prefs, _, bus) = repo();
        let mut sub = bus.subscribe(&[]);
        let bad = UserGoals {
            calorie_goal: -5,
            ..UserGoals::default()
        };
        assert!(prefs.set_goals(&bad).is_err());
        assert!(!sub.drain());
        assert_eq!(prefs.goals().unwrap(), UserGoals::default());
    }

    #[test]
    fn test_corrupt_value_falls_back() {
        let (prefs, db, _) = repo();
        lock(&db).set_setting(CALORIE_GOAL, "lots").unwrap();
        lock(&db).set_setting(CALORIE_MODE, "surplus").unwrap();
        let goals = prefs.goals().unwrap();
        assert_eq!(goals.calorie_goal, 2000);
        assert_eq!(goals.calorie_mode, CalorieMode::Surplus);
    }

    #[test]
    fn test_flags_and_language() {
        let (prefs, _, _) = repo();
        prefs.set_health_permissions_declined(true).unwrap();
        prefs.set_dismissed_disabled_card(true).unwrap();
        prefs.set_language("de").unwrap();
        assert!(prefs.set_language(" ").is_err());
        let all = prefs.all().unwrap();
        assert!(all.health_permissions_declined);
        assert!(all.dismissed_disabled_card);
        assert_eq!(all.language, "de");
    }
}
