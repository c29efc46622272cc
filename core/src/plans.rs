//! Weekly completion tracking for workout plans.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use chrono::{Days, NaiveDate, TimeZone, Weekday};
use serde::{Deserialize, Serialize};

use crate::diary::local_date;
use crate::models::{PlanDetail, WorkoutSession};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Monday,
    Sunday,
}

impl WeekStart {
    fn weekday(self) -> Weekday {
        match self {
            WeekStart::Monday => Weekday::Mon,
            WeekStart::Sunday => Weekday::Sun,
        }
    }

    /// First day of the week containing `date`.
    #[must_use]
    pub fn week_of(self, date: NaiveDate) -> NaiveDate {
        date.week(self.weekday()).first_day()
    }
}

impl fmt::Display for WeekStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeekStart::Monday => f.write_str("monday"),
            WeekStart::Sunday => f.write_str("sunday"),
        }
    }
}

impl FromStr for WeekStart {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "monday" | "mon" => Ok(WeekStart::Monday),
            "sunday" | "sun" => Ok(WeekStart::Sunday),
            _ => bail!("Invalid week start '{s}'. Use monday or sunday"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeeklyProgress {
    pub week_start: NaiveDate,
    pub logged: i64,
    pub goal: i64,
    pub met: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanProgress {
    pub plan_id: i64,
    pub name: String,
    pub current_week: WeeklyProgress,
    pub streak_weeks: i64,
}

/// Count of plan sessions per week, keyed by week start.
#[must_use]
pub fn sessions_per_week<Tz: TimeZone>(
    plan: &PlanDetail,
    sessions: &[WorkoutSession],
    week_start: WeekStart,
    tz: &Tz,
) -> BTreeMap<NaiveDate, i64> {
    let exercises: HashSet<&str> = plan.exercises.iter().map(String::as_str).collect();
    let mut counts: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    for session in sessions {
        if !exercises.contains(session.exercise_name.as_str()) {
            continue;
        }
        let week = week_start.week_of(local_date(session.timestamp, tz));
        *counts.entry(week).or_default() += 1;
    }
    counts
}

#[must_use]
pub fn weekly_progress<Tz: TimeZone>(
    plan: &PlanDetail,
    sessions: &[WorkoutSession],
    today: NaiveDate,
    week_start: WeekStart,
    tz: &Tz,
) -> WeeklyProgress {
    let week = week_start.week_of(today);
    let logged = sessions_per_week(plan, sessions, week_start, tz)
        .get(&week)
        .copied()
        .unwrap_or(0);
    WeeklyProgress {
        week_start: week,
        logged,
        goal: plan.plan.weekly_goal,
        met: logged >= plan.plan.weekly_goal,
    }
}

/// Consecutive weeks with the goal met, counting back from the current week.
///
/// A current week that is not met yet is still in progress, so the streak may
/// end with last week instead.
#[must_use]
pub fn weekly_streak<Tz: TimeZone>(
    plan: &PlanDetail,
    sessions: &[WorkoutSession],
    today: NaiveDate,
    week_start: WeekStart,
    tz: &Tz,
) -> i64 {
    let counts = sessions_per_week(plan, sessions, week_start, tz);
    let goal = plan.plan.weekly_goal;
    let met = |week: NaiveDate| counts.get(&week).is_some_and(|&n| n >= goal);

    let mut week = week_start.week_of(today);
    if !met(week) {
        match week.checked_sub_days(Days::new(7)) {
            Some(previous) => week = previous,
            None => return 0,
        }
    }

    let mut streak = 0;
    while met(week) {
        streak += 1;
        match week.checked_sub_days(Days::new(7)) {
            Some(previous) => week = previous,
            None => break,
        }
    }
    streak
}

#[must_use]
pub fn plan_progress<Tz: TimeZone>(
    plan: &PlanDetail,
    sessions: &[WorkoutSession],
    today: NaiveDate,
    week_start: WeekStart,
    tz: &Tz,
) -> PlanProgress {
    PlanProgress {
        plan_id: plan.plan.id,
        name: plan.plan.name.clone(),
        current_week: weekly_progress(plan, sessions, today, week_start, tz),
        streak_weeks: weekly_streak(plan, sessions, today, week_start, tz),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diary::day_bounds;
    use crate::models::WorkoutPlan;
    use chrono::Utc;

    fn plan(goal: i64) -> PlanDetail {
        PlanDetail {
            plan: WorkoutPlan {
                id: 1,
                name: "Push".to_string(),
                weekly_goal: goal,
                created_at: String::new(),
            },
            exercises: vec!["Bench Press".to_string(), "Overhead Press".to_string()],
        }
    }

    fn session(id: i64, exercise: &str, date: NaiveDate) -> WorkoutSession {
        WorkoutSession {
            id,
            exercise_name: exercise.to_string(),
            sets: 3,
            reps: 8,
            weight_kg: 50.0,
            timestamp: day_bounds(date, &Utc).start_millis + 3_600_000,
            notes: None,
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_week_of() {
        // 2024-06-15 is a Saturday
        let sat = ymd(2024, 6, 15);
        assert_eq!(WeekStart::Monday.week_of(sat), ymd(2024, 6, 10));
        assert_eq!(WeekStart::Sunday.week_of(sat), ymd(2024, 6, 9));
        let sun = ymd(2024, 6, 16);
        assert_eq!(WeekStart::Monday.week_of(sun), ymd(2024, 6, 10));
        assert_eq!(WeekStart::Sunday.week_of(sun), ymd(2024, 6, 16));
    }

    #[test]
    fn test_week_start_parse() {
        assert_eq!("Sun".parse::<WeekStart>().unwrap(), WeekStart::Sunday);
        assert!("friday".parse::<WeekStart>().is_err());
    }

    #[test]
    fn test_weekly_progress_counts_only_plan_exercises() {
        let today = ymd(2024, 6, 14);
        let sessions = vec![
            session(1, "Bench Press", ymd(2024, 6, 10)),
            session(2, "Squat", ymd(2024, 6, 11)),
            session(3, "Overhead Press", ymd(2024, 6, 12)),
            // previous week
            session(4, "Bench Press", ymd(2024, 6, 7)),
        ];
        let progress = weekly_progress(&plan(3), &sessions, today, WeekStart::Monday, &Utc);
        assert_eq!(progress.week_start, ymd(2024, 6, 10));
        assert_eq!(progress.logged, 2);
        assert_eq!(progress.goal, 3);
        assert!(!progress.met);

        let easy = weekly_progress(&plan(2), &sessions, today, WeekStart::Monday, &Utc);
        assert!(easy.met);
    }

    #[test]
    fn test_streak_empty() {
        assert_eq!(weekly_streak(&plan(1), &[], ymd(2024, 6, 14), WeekStart::Monday, &Utc), 0);
    }

    #[test]
    fn test_streak_counts_consecutive_weeks() {
        let sessions = vec![
            session(1, "Bench Press", ymd(2024, 6, 11)),
            session(2, "Bench Press", ymd(2024, 6, 4)),
            session(3, "Bench Press", ymd(2024, 5, 28)),
            // gap week of 2024-05-20
            session(4, "Bench Press", ymd(2024, 5, 14)),
        ];
        let streak = weekly_streak(&plan(1), &sessions, ymd(2024, 6, 14), WeekStart::Monday, &Utc);
        assert_eq!(streak, 3);
    }

    #[test]
    fn test_streak_current_week_in_progress() {
        // nothing logged yet this week, last two weeks met
        let sessions = vec![
            session(1, "Bench Press", ymd(2024, 6, 4)),
            session(2, "Bench Press", ymd(2024, 5, 28)),
        ];
        let streak = weekly_streak(&plan(1), &sessions, ymd(2024, 6, 11), WeekStart::Monday, &Utc);
        assert_eq!(streak, 2);
    }

    #[test]
    fn test_streak_broken_by_unmet_last_week() {
        let sessions = vec![session(1, "Bench Press", ymd(2024, 5, 28))];
        let streak = weekly_streak(&plan(1), &sessions, ymd(2024, 6, 11), WeekStart::Monday, &Utc);
        assert_eq!(streak, 0);
    }

    #[test]
    fn test_plan_progress_sunday_weeks() {
        // Sunday 2024-06-16 belongs to the next week when weeks start on Sunday
        let sessions = vec![
            session(1, "Bench Press", ymd(2024, 6, 16)),
            session(2, "Bench Press", ymd(2024, 6, 17)),
        ];
        let monday = plan_progress(&plan(2), &sessions, ymd(2024, 6, 17), WeekStart::Monday, &Utc);
        assert_eq!(monday.current_week.logged, 1);
        let sunday = plan_progress(&plan(2), &sessions, ymd(2024, 6, 17), WeekStart::Sunday, &Utc);
        assert_eq!(sunday.current_week.logged, 2);
        assert!(sunday.current_week.met);
        assert_eq!(sunday.streak_weeks, 1);
    }
}
