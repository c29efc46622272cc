use anyhow::Result;
use chrono::{NaiveDate, TimeZone};
use serde::Serialize;

use super::Observer;
use crate::diary::day_bounds;
use crate::events::{ChangeBus, StoreChange};
use crate::models::{Exercise, WorkoutSession};
use crate::plans::{PlanProgress, WeekStart, plan_progress};
use crate::repository::WorkoutRepository;

#[derive(Debug, Clone, Serialize)]
pub struct WorkoutState {
    pub date: NaiveDate,
    pub sessions: Vec<WorkoutSession>,
    pub volume_kg: f64,
    pub plans: Vec<PlanProgress>,
    pub exercises: Vec<Exercise>,
}

#[derive(Clone)]
pub struct WorkoutViewModel {
    workouts: WorkoutRepository,
    bus: ChangeBus,
    week_start: WeekStart,
}

impl WorkoutViewModel {
    #[must_use]
    pub fn new(workouts: WorkoutRepository, bus: ChangeBus, week_start: WeekStart) -> Self {
        Self {
            workouts,
            bus,
            week_start,
        }
    }

    pub fn load<Tz: TimeZone>(&self, date: NaiveDate, tz: &Tz) -> Result<WorkoutState> {
        let sessions = self.workouts.sessions_between(day_bounds(date, tz))?;
        let mut plans = Vec::new();
        for plan in self.workouts.plans()? {
            let history = self.workouts.plan_sessions(plan.plan.id)?;
            plans.push(plan_progress(&plan, &history, date, self.week_start, tz));
        }
        Ok(WorkoutState {
            date,
            volume_kg: sessions.iter().map(WorkoutSession::volume_kg).sum(),
            sessions,
            plans,
            exercises: self.workouts.exercises(None)?,
        })
    }

    pub fn observe<Tz>(&self, date: NaiveDate, tz: Tz) -> Result<Observer<WorkoutState>>
    where
        Tz: TimeZone + Send + 'static,
    {
        let vm = self.clone();
        Observer::new(
            self.bus.subscribe(&[
                StoreChange::Exercises,
                StoreChange::WorkoutSessions,
                StoreChange::WorkoutPlans,
            ]),
            move || vm.load(date, &tz),
        )
    }
}
