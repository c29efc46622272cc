use anyhow::{Result, bail};

use super::{SharedDb, lock};
use crate::diary::DayBounds;
use crate::events::{ChangeBus, StoreChange};
use crate::models::{
    Exercise, NewWorkoutSession, PlanDetail, WorkoutSession, validate_weekly_goal,
    validate_workout_session,
};

#[derive(Clone)]
pub struct WorkoutRepository {
    db: SharedDb,
    bus: ChangeBus,
}

impl WorkoutRepository {
    #[must_use]
    pub fn new(db: SharedDb, bus: ChangeBus) -> Self {
        Self { db, bus }
    }

    // --- Exercises ---

    /// False when an exercise with that name already exists.
    pub fn add_exercise(&self, exercise: &Exercise) -> Result<bool> {
        if exercise.name.trim().is_empty() {
            bail!("Exercise name must not be empty");
        }
        let trimmed = Exercise {
            name: exercise.name.trim().to_string(),
            ..exercise.clone()
        };
        let db = lock(&self.db);
        if db.find_exercise(&trimmed.name)?.is_some() {
            return Ok(false);
        }
        let added = db.insert_exercise(&trimmed)?;
        drop(db);
        if added {
            self.bus.publish(StoreChange::Exercises);
        }
        Ok(added)
    }

    pub fn exercise(&self, name: &str) -> Result<Exercise> {
        lock(&self.db).get_exercise(name)
    }

    pub fn exercises(&self, muscle_group: Option<&str>) -> Result<Vec<Exercise>> {
        lock(&self.db).list_exercises(muscle_group)
    }

    /// Removes the exercise with its sessions and plan memberships.
    pub fn delete_exercise(&self, name: &str) -> Result<bool> {
        let deleted = lock(&self.db).delete_exercise(name)?;
        if deleted {
            self.bus.publish(StoreChange::Exercises);
            self.bus.publish(StoreChange::WorkoutSessions);
            self.bus.publish(StoreChange::WorkoutPlans);
        }
        Ok(deleted)
    }

    // --- Sessions ---

    pub fn log_session(&self, session: &NewWorkoutSession) -> Result<WorkoutSession> {
        validate_workout_session(session)?;
        let logged = lock(&self.db).insert_workout_session(session)?;
        self.bus.publish(StoreChange::WorkoutSessions);
        Ok(logged)
    }

    pub fn sessions_between(&self, bounds: DayBounds) -> Result<Vec<WorkoutSession>> {
        lock(&self.db).get_workout_sessions_between(bounds)
    }

    pub fn exercise_history(&self, name: &str, limit: i64) -> Result<Vec<WorkoutSession>> {
        lock(&self.db).get_sessions_for_exercise(name, limit)
    }

    pub fn delete_session(&self, id: i64) -> Result<bool> {
        let deleted = lock(&self.db).delete_workout_session(id)?;
        if deleted {
            self.bus.publish(StoreChange::WorkoutSessions);
        }
        Ok(deleted)
    }

    // --- Plans ---

    pub fn create_plan(&self, name: &str, weekly_goal: i64) -> Result<PlanDetail> {
        validate_weekly_goal(weekly_goal)?;
        let detail = {
            let db = lock(&self.db);
            let plan = db.create_plan(name, weekly_goal)?;
            db.get_plan_detail(plan.id)?
        };
        self.bus.publish(StoreChange::WorkoutPlans);
        Ok(detail)
    }

    pub fn plan(&self, id: i64) -> Result<PlanDetail> {
        lock(&self.db).get_plan_detail(id)
    }

    pub fn plan_by_name(&self, name: &str) -> Result<PlanDetail> {
        let db = lock(&self.db);
        let plan = db.get_plan_by_name(name)?;
        db.get_plan_detail(plan.id)
    }

    pub fn plans(&self) -> Result<Vec<PlanDetail>> {
        lock(&self.db).list_plans()
    }

    pub fn set_weekly_goal(&self, plan_id: i64, weekly_goal: i64) -> Result<()> {
        validate_weekly_goal(weekly_goal)?;
        lock(&self.db).set_plan_weekly_goal(plan_id, weekly_goal)?;
        self.bus.publish(StoreChange::WorkoutPlans);
        Ok(())
    }

    pub fn add_plan_exercise(&self, plan_id: i64, exercise_name: &str) -> Result<bool> {
        let added = lock(&self.db).add_plan_exercise(plan_id, exercise_name)?;
        if added {
            self.bus.publish(StoreChange::WorkoutPlans);
        }
        Ok(added)
    }

    pub fn remove_plan_exercise(&self, plan_id: i64, exercise_name: &str) -> Result<bool> {
        let removed = lock(&self.db).remove_plan_exercise(plan_id, exercise_name)?;
        if removed {
            self.bus.publish(StoreChange::WorkoutPlans);
        }
        Ok(removed)
    }

    pub fn delete_plan(&self, plan_id: i64) -> Result<bool> {
        let deleted = lock(&self.db).delete_plan(plan_id)?;
        if deleted {
            self.bus.publish(StoreChange::WorkoutPlans);
        }
        Ok(deleted)
    }

    pub fn plan_sessions(&self, plan_id: i64) -> Result<Vec<WorkoutSession>> {
        lock(&self.db).get_sessions_for_plan(plan_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::repository::shared;

    fn repo() -> (WorkoutRepository, ChangeBus) {
        let bus = ChangeBus::default();
        let repo = WorkoutRepository::new(shared(Database::open_in_memory().unwrap()), bus.clone());
        (repo, bus)
    }

    fn squat() -> Exercise {
        Exercise {
            name: " Squat ".to_string(),
            muscle_group: Some("legs".to_string()),
            category: "strength".to_string(),
        }
    }

    #[test]
    fn test_add_exercise_case_insensitive_duplicate() {
        let (repo, bus) = repo();
        let mut sub = bus.subscribe(&[StoreChange::Exercises]);
        assert!(repo.add_exercise(&squat()).unwrap());
        assert!(sub.drain());

        let mut upper = squat();
        upper.name = "SQUAT".to_string();
        assert!(!repo.add_exercise(&upper).unwrap());
        assert!(!sub.drain());
        assert_eq!(repo.exercise("squat").unwrap().name, "Squat");
    }

    #[test]
    fn test_log_session_validates() {
        let (repo, _) = repo();
        repo.add_exercise(&squat()).unwrap();
        let mut session = NewWorkoutSession {
            exercise_name: "squat".to_string(),
            sets: 5,
            reps: 5,
            weight_kg: 100.0,
            timestamp: 10,
            notes: Some("felt strong".to_string()),
        };
        let logged = repo.log_session(&session).unwrap();
        assert_eq!(logged.exercise_name, "Squat");
        assert_eq!(repo.exercise_history("Squat", 10).unwrap().len(), 1);

        session.sets = 0;
        assert!(repo.log_session(&session).is_err());
    }

    #[test]
    fn test_plan_goal_bounds() {
        let (repo, _) = repo();
        assert!(repo.create_plan("Legs", 0).is_err());
        assert!(repo.create_plan("Legs", 51).is_err());
        let plan = repo.create_plan("Legs", 3).unwrap();
        assert!(repo.set_weekly_goal(plan.plan.id, 0).is_err());
        repo.set_weekly_goal(plan.plan.id, 4).unwrap();
        assert_eq!(repo.plan_by_name("legs").unwrap().plan.weekly_goal, 4);
    }

    #[test]
    fn test_delete_exercise_publishes_dependents() {
        let (repo, bus) = repo();
        repo.add_exercise(&squat()).unwrap();
        let plan = repo.create_plan("Legs", 2).unwrap();
        repo.add_plan_exercise(plan.plan.id, "Squat").unwrap();
        let mut plans = bus.subscribe(&[StoreChange::WorkoutPlans]);

        assert!(repo.delete_exercise("squat").unwrap());
        assert!(plans.drain());
        assert!(repo.plan(plan.plan.id).unwrap().exercises.is_empty());
    }
}
