use anyhow::{Context, Result, bail};
use rusqlite::{OptionalExtension, params};

use super::{Database, now_rfc3339};
use crate::diary::DayBounds;
use crate::models::{Exercise, NewWorkoutSession, PlanDetail, WorkoutPlan, WorkoutSession};

const SESSION_COLUMNS: &str = "id, exercise_name, sets, reps, weight_kg, timestamp, notes";

impl Database {
    fn exercise_from_row(row: &rusqlite::Row) -> rusqlite::Result<Exercise> {
        Ok(Exercise {
            name: row.get(0)?,
            muscle_group: row.get(1)?,
            category: row.get(2)?,
        })
    }

    fn workout_session_from_row(row: &rusqlite::Row) -> rusqlite::Result<WorkoutSession> {
        Ok(WorkoutSession {
            id: row.get(0)?,
            exercise_name: row.get(1)?,
            sets: row.get(2)?,
            reps: row.get(3)?,
            weight_kg: row.get(4)?,
            timestamp: row.get(5)?,
            notes: row.get(6)?,
        })
    }

    fn workout_plan_from_row(row: &rusqlite::Row) -> rusqlite::Result<WorkoutPlan> {
        Ok(WorkoutPlan {
            id: row.get(0)?,
            name: row.get(1)?,
            weekly_goal: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    // --- Exercises ---

    /// `INSERT OR IGNORE`: returns false when the name already exists.
    pub fn insert_exercise(&self, exercise: &Exercise) -> Result<bool> {
        let rows = self.conn.execute(
            "INSERT OR IGNORE INTO exercises (name, muscle_group, category) VALUES (?1, ?2, ?3)",
            params![exercise.name, exercise.muscle_group, exercise.category],
        )?;
        Ok(rows > 0)
    }

    /// Case-insensitive lookup returning the stored spelling.
    pub fn find_exercise(&self, name: &str) -> Result<Option<Exercise>> {
        Ok(self
            .conn
            .query_row(
                "SELECT name, muscle_group, category FROM exercises WHERE LOWER(name) = LOWER(?1)",
                params![name.trim()],
                Self::exercise_from_row,
            )
            .optional()?)
    }

    pub fn get_exercise(&self, name: &str) -> Result<Exercise> {
        self.find_exercise(name)?
            .context(format!("Exercise '{name}' not found"))
    }

    pub fn list_exercises(&self, muscle_group: Option<&str>) -> Result<Vec<Exercise>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, muscle_group, category FROM exercises
             WHERE ?1 IS NULL OR LOWER(muscle_group) = LOWER(?1)
             ORDER BY name",
        )?;
        let exercises = stmt
            .query_map(params![muscle_group], Self::exercise_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(exercises)
    }

    /// Sessions and plan memberships of the exercise cascade.
    pub fn delete_exercise(&self, name: &str) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM exercises WHERE LOWER(name) = LOWER(?1)",
            params![name.trim()],
        )?;
        Ok(rows > 0)
    }

    // --- Workout sessions ---

    pub fn insert_workout_session(&self, session: &NewWorkoutSession) -> Result<WorkoutSession> {
        let exercise = self.get_exercise(&session.exercise_name)?;
        self.conn.execute(
            "INSERT INTO workout_sessions (exercise_name, sets, reps, weight_kg, timestamp, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                exercise.name,
                session.sets,
                session.reps,
                session.weight_kg,
                session.timestamp,
                session.notes,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, exercise = %exercise.name, "workout session inserted");
        self.get_workout_session(id)
    }

    pub fn get_workout_session(&self, id: i64) -> Result<WorkoutSession> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM workout_sessions WHERE id = ?1");
        self.conn
            .query_row(&sql, params![id], Self::workout_session_from_row)
            .context("Workout session not found")
    }

    /// Sessions inside `bounds`, most recent first.
    pub fn get_workout_sessions_between(&self, bounds: DayBounds) -> Result<Vec<WorkoutSession>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM workout_sessions
             WHERE timestamp >= ?1 AND timestamp < ?2
             ORDER BY timestamp DESC, id DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let sessions = stmt
            .query_map(
                params![bounds.start_millis, bounds.end_millis],
                Self::workout_session_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    pub fn get_sessions_for_exercise(&self, name: &str, limit: i64) -> Result<Vec<WorkoutSession>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM workout_sessions
             WHERE LOWER(exercise_name) = LOWER(?1)
             ORDER BY timestamp DESC, id DESC
             LIMIT ?2"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let sessions = stmt
            .query_map(params![name.trim(), limit], Self::workout_session_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    /// Every session of an exercise that belongs to the plan.
    pub fn get_sessions_for_plan(&self, plan_id: i64) -> Result<Vec<WorkoutSession>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.id, s.exercise_name, s.sets, s.reps, s.weight_kg, s.timestamp, s.notes
             FROM workout_sessions s
             JOIN plan_exercises pe ON pe.exercise_name = s.exercise_name
             WHERE pe.plan_id = ?1
             ORDER BY s.timestamp DESC, s.id DESC",
        )?;
        let sessions = stmt
            .query_map(params![plan_id], Self::workout_session_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    pub fn delete_workout_session(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM workout_sessions WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // --- Workout plans ---

    pub fn create_plan(&self, name: &str, weekly_goal: i64) -> Result<WorkoutPlan> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Plan name must not be empty");
        }
        if self.find_plan_by_name(name)?.is_some() {
            bail!("Plan '{name}' already exists");
        }
        let now = now_rfc3339();
        self.conn.execute(
            "INSERT INTO workout_plans (name, weekly_goal, created_at) VALUES (?1, ?2, ?3)",
            params![name, weekly_goal, now],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, name, weekly_goal, "workout plan created");
        self.get_plan(id)
    }

    pub fn get_plan(&self, id: i64) -> Result<WorkoutPlan> {
        self.conn
            .query_row(
                "SELECT id, name, weekly_goal, created_at FROM workout_plans WHERE id = ?1",
                params![id],
                Self::workout_plan_from_row,
            )
            .context("Workout plan not found")
    }

    pub fn find_plan_by_name(&self, name: &str) -> Result<Option<WorkoutPlan>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, weekly_goal, created_at FROM workout_plans
                 WHERE LOWER(name) = LOWER(?1)",
                params![name.trim()],
                Self::workout_plan_from_row,
            )
            .optional()?)
    }

    pub fn get_plan_by_name(&self, name: &str) -> Result<WorkoutPlan> {
        self.find_plan_by_name(name)?
            .context(format!("Plan '{name}' not found"))
    }

    pub fn set_plan_weekly_goal(&self, id: i64, weekly_goal: i64) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE workout_plans SET weekly_goal = ?1 WHERE id = ?2",
            params![weekly_goal, id],
        )?;
        if rows == 0 {
            bail!("Workout plan not found");
        }
        Ok(())
    }

    /// Appends the exercise to the plan; false when it is already a member.
    pub fn add_plan_exercise(&self, plan_id: i64, exercise_name: &str) -> Result<bool> {
        self.get_plan(plan_id)?;
        let exercise = self.get_exercise(exercise_name)?;
        let rows = self.conn.execute(
            "INSERT OR IGNORE INTO plan_exercises (plan_id, exercise_name, position)
             VALUES (?1, ?2, (SELECT COALESCE(MAX(position), -1) + 1 FROM plan_exercises WHERE plan_id = ?1))",
            params![plan_id, exercise.name],
        )?;
        Ok(rows > 0)
    }

    pub fn remove_plan_exercise(&self, plan_id: i64, exercise_name: &str) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM plan_exercises WHERE plan_id = ?1 AND LOWER(exercise_name) = LOWER(?2)",
            params![plan_id, exercise_name.trim()],
        )?;
        Ok(rows > 0)
    }

    pub fn get_plan_detail(&self, id: i64) -> Result<PlanDetail> {
        let plan = self.get_plan(id)?;
        let mut stmt = self.conn.prepare(
            "SELECT exercise_name FROM plan_exercises WHERE plan_id = ?1 ORDER BY position",
        )?;
        let exercises = stmt
            .query_map(params![id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(PlanDetail { plan, exercises })
    }

    pub fn list_plans(&self) -> Result<Vec<PlanDetail>> {
        let mut stmt = self.conn.prepare("SELECT id FROM workout_plans ORDER BY id")?;
        let ids: Vec<i64> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        let mut plans = Vec::new();
        for id in ids {
            plans.push(self.get_plan_detail(id)?);
        }
        Ok(plans)
    }

    pub fn delete_plan(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM workout_plans WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }
}
