use anyhow::Result;
use chrono::{NaiveDate, TimeZone};
use serde::Serialize;

use super::Observer;
use crate::diary::{day_bounds, totals_of};
use crate::events::{ChangeBus, StoreChange};
use crate::goals::{GoalStatus, UserGoals};
use crate::health::HealthSummary;
use crate::models::{Macros, WeightEntry};
use crate::repository::{
    FoodRepository, HealthRepository, HealthStatus, PreferencesRepository, RecipeRepository,
    WeightRepository, WorkoutRepository,
};

const WATCHED: &[StoreChange] = &[
    StoreChange::FoodLogs,
    StoreChange::RecipeLogs,
    StoreChange::FoodTemplates,
    StoreChange::WorkoutSessions,
    StoreChange::WeightEntries,
    StoreChange::Preferences,
];

/// Dashboard for one day.
#[derive(Debug, Clone, Serialize)]
pub struct HomeState {
    pub date: NaiveDate,
    pub intake: Macros,
    pub goals: UserGoals,
    pub remaining: Macros,
    pub calorie_status: GoalStatus,
    pub health_status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps_met: Option<bool>,
    /// Show the "health data disabled" card.
    pub show_disabled_card: bool,
    pub workouts_logged: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_weight: Option<WeightEntry>,
}

#[derive(Clone)]
pub struct HomeViewModel {
    foods: FoodRepository,
    recipes: RecipeRepository,
    workouts: WorkoutRepository,
    weight: WeightRepository,
    preferences: PreferencesRepository,
    health: HealthRepository,
    bus: ChangeBus,
}

impl HomeViewModel {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        foods: FoodRepository,
        recipes: RecipeRepository,
        workouts: WorkoutRepository,
        weight: WeightRepository,
        preferences: PreferencesRepository,
        health: HealthRepository,
        bus: ChangeBus,
    ) -> Self {
        Self {
            foods,
            recipes,
            workouts,
            weight,
            preferences,
            health,
            bus,
        }
    }

    pub fn load<Tz: TimeZone>(&self, date: NaiveDate, tz: &Tz) -> Result<HomeState> {
        let bounds = day_bounds(date, tz);
        let intake = totals_of(
            &self.foods.logs_between(bounds)?,
            &self.recipes.logs_between(bounds)?,
        );
        let goals = self.preferences.goals()?;
        let (health_status, health) = self.health.query(bounds)?;
        let show_disabled_card = health_status != HealthStatus::Available
            && !self.preferences.dismissed_disabled_card()?;

        Ok(HomeState {
            date,
            intake,
            remaining: goals.remaining(&intake),
            calorie_status: goals.calorie_status(intake.calories),
            steps_met: health.map(|h| goals.steps_met(h.steps)),
            goals,
            health_status,
            health,
            show_disabled_card,
            workouts_logged: self.workouts.sessions_between(bounds)?.len(),
            latest_weight: self.weight.latest()?,
        })
    }

    pub fn observe<Tz>(&self, date: NaiveDate, tz: Tz) -> Result<Observer<HomeState>>
    where
        Tz: TimeZone + Send + 'static,
    {
        let vm = self.clone();
        Observer::new(self.bus.subscribe(WATCHED), move || vm.load(date, &tz))
    }
}
