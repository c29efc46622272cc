//! Unified diary: food logs and recipe logs merged into one feed.

use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Days, NaiveDate, TimeDelta, TimeZone};
use serde::Serialize;

use crate::models::{FoodLogWithTemplate, Macros, RecipeLog};

/// One row of the diary feed. Never persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiaryEntry {
    Food(FoodLogWithTemplate),
    Recipe(RecipeLog),
}

impl DiaryEntry {
    fn tag(&self) -> &'static str {
        match self {
            DiaryEntry::Food(_) => "food",
            DiaryEntry::Recipe(_) => "recipe",
        }
    }

    /// Id of the underlying log row (unique per kind only).
    #[must_use]
    pub fn source_id(&self) -> i64 {
        match self {
            DiaryEntry::Food(f) => f.log.id,
            DiaryEntry::Recipe(r) => r.id,
        }
    }

    /// Feed-unique id: hash of the kind tag and the underlying row id.
    #[must_use]
    pub fn id(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.tag().hash(&mut hasher);
        self.source_id().hash(&mut hasher);
        hasher.finish()
    }

    #[must_use]
    pub fn timestamp(&self) -> i64 {
        match self {
            DiaryEntry::Food(f) => f.log.timestamp,
            DiaryEntry::Recipe(r) => r.timestamp,
        }
    }

    #[must_use]
    pub fn macros(&self) -> Macros {
        match self {
            DiaryEntry::Food(f) => f.log.macros(),
            DiaryEntry::Recipe(r) => r.macros(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            DiaryEntry::Food(f) => f.food_name.as_deref().unwrap_or("Deleted food"),
            DiaryEntry::Recipe(r) => &r.name,
        }
    }

    #[must_use]
    pub fn is_food(&self) -> bool {
        matches!(self, DiaryEntry::Food(_))
    }
}

/// Merge both log kinds into one feed, most recent first.
///
/// Equal timestamps are ordered food before recipe, then by ascending row id,
/// so the same data always yields the same order.
#[must_use]
pub fn build_feed(foods: Vec<FoodLogWithTemplate>, recipes: Vec<RecipeLog>) -> Vec<DiaryEntry> {
    let mut feed: Vec<DiaryEntry> = foods
        .into_iter()
        .map(DiaryEntry::Food)
        .chain(recipes.into_iter().map(DiaryEntry::Recipe))
        .collect();
    feed.sort_by(|a, b| {
        b.timestamp()
            .cmp(&a.timestamp())
            .then_with(|| b.is_food().cmp(&a.is_food()))
            .then_with(|| a.source_id().cmp(&b.source_id()))
    });
    feed
}

#[must_use]
pub fn totals(entries: &[DiaryEntry]) -> Macros {
    entries.iter().map(DiaryEntry::macros).sum()
}

/// Totals straight from the two log lists; no merge or sort needed.
#[must_use]
pub fn totals_of(foods: &[FoodLogWithTemplate], recipes: &[RecipeLog]) -> Macros {
    let food_total: Macros = foods.iter().map(|f| f.log.macros()).sum();
    let recipe_total: Macros = recipes.iter().map(RecipeLog::macros).sum();
    food_total + recipe_total
}

/// Half-open `[start, end)` range of epoch millis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayBounds {
    pub start_millis: i64,
    pub end_millis: i64,
}

impl DayBounds {
    #[must_use]
    pub fn contains(&self, millis: i64) -> bool {
        (self.start_millis..self.end_millis).contains(&millis)
    }
}

/// Bounds of a calendar day in `tz`.
///
/// Uses the earliest valid local midnight, so days that start inside a DST gap
/// still get bounds.
#[must_use]
pub fn day_bounds<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DayBounds {
    let next = date.checked_add_days(Days::new(1)).unwrap_or(date);
    DayBounds {
        start_millis: local_midnight_millis(date, tz),
        end_millis: local_midnight_millis(next, tz),
    }
}

/// Bounds covering `days` whole days ending with `last` inclusive.
#[must_use]
pub fn range_bounds<Tz: TimeZone>(last: NaiveDate, days: u32, tz: &Tz) -> DayBounds {
    let first = last
        .checked_sub_days(Days::new(u64::from(days.saturating_sub(1))))
        .unwrap_or(last);
    DayBounds {
        start_millis: day_bounds(first, tz).start_millis,
        end_millis: day_bounds(last, tz).end_millis,
    }
}

/// First valid local instant of `date`; a midnight inside a DST gap moves
/// forward to the end of the gap.
fn local_midnight_millis<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> i64 {
    let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    (0..=48)
        .map(|step| midnight + TimeDelta::minutes(30 * step))
        .find_map(|local| tz.from_local_datetime(&local).earliest())
        .map_or_else(
            || tz.from_utc_datetime(&midnight).timestamp_millis(),
            |dt| dt.timestamp_millis(),
        )
}

/// Calendar date of an epoch-millis timestamp in `tz`.
#[must_use]
pub fn local_date<Tz: TimeZone>(millis: i64, tz: &Tz) -> NaiveDate {
    DateTime::from_timestamp_millis(millis)
        .unwrap_or_default()
        .with_timezone(tz)
        .date_naive()
}

/// Feed entries bucketed by their local calendar date.
#[must_use]
pub fn group_by_date<Tz: TimeZone>(
    entries: Vec<DiaryEntry>,
    tz: &Tz,
) -> BTreeMap<NaiveDate, Vec<DiaryEntry>> {
    let mut grouped: BTreeMap<NaiveDate, Vec<DiaryEntry>> = BTreeMap::new();
    for entry in entries {
        grouped
            .entry(local_date(entry.timestamp(), tz))
            .or_default()
            .push(entry);
    }
    grouped
}

#[must_use]
pub fn daily_totals<Tz: TimeZone>(entries: &[DiaryEntry], tz: &Tz) -> BTreeMap<NaiveDate, Macros> {
    let mut out: BTreeMap<NaiveDate, Macros> = BTreeMap::new();
    for entry in entries {
        let slot = out.entry(local_date(entry.timestamp(), tz)).or_default();
        *slot = *slot + entry.macros();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FoodLog;
    use chrono::Utc;

    fn food(id: i64, timestamp: i64, calories: i64) -> FoodLogWithTemplate {
        FoodLogWithTemplate {
            log: FoodLog {
                id,
                template_id: 1,
                grams: 100.0,
                calories,
                protein: 10,
                carbs: 20,
                fat: 5,
                timestamp,
            },
            food_name: Some(format!("Food {id}")),
            food_brand: None,
            rates: None,
        }
    }

    fn recipe(id: i64, timestamp: i64, calories: i64) -> RecipeLog {
        RecipeLog {
            id,
            recipe_id: Some(1),
            name: format!("Recipe {id}"),
            instructions: None,
            ingredients_json: "[]".to_string(),
            calories,
            protein: 30,
            carbs: 40,
            fat: 12,
            timestamp,
        }
    }

    #[test]
    fn test_empty_day() {
        let feed = build_feed(Vec::new(), Vec::new());
        assert!(feed.is_empty());
        assert_eq!(totals(&feed), Macros::default());
        assert_eq!(totals_of(&[], &[]), Macros::default());
    }

    #[test]
    fn test_feed_sorted_descending() {
        let feed = build_feed(
            vec![food(1, 1_000, 100), food(2, 3_000, 200)],
            vec![recipe(1, 2_000, 500), recipe(2, 4_000, 300)],
        );
        let stamps: Vec<i64> = feed.iter().map(DiaryEntry::timestamp).collect();
        assert_eq!(stamps, vec![4_000, 3_000, 2_000, 1_000]);
        assert_eq!(feed[0].name(), "Recipe 2");
    }

    #[test]
    fn test_totals_independent_of_merge_order() {
        let foods = vec![food(1, 10, 120), food(2, 20, 80)];
        let recipes = vec![recipe(1, 15, 640)];

        let forward = totals(&build_feed(foods.clone(), recipes.clone()));
        let mut reversed_foods = foods.clone();
        reversed_foods.reverse();
        let reversed = totals(&build_feed(reversed_foods, recipes.clone()));

        assert_eq!(forward.calories, 840);
        assert_eq!(forward, reversed);
        assert_eq!(forward, totals_of(&foods, &recipes));
        assert_eq!(forward.protein, 10 + 10 + 30);
        assert_eq!(forward.fat, 5 + 5 + 12);
    }

    #[test]
    fn test_equal_timestamps_stable() {
        let first = build_feed(
            vec![food(7, 500, 1), food(3, 500, 1)],
            vec![recipe(2, 500, 1)],
        );
        let second = build_feed(
            vec![food(3, 500, 1), food(7, 500, 1)],
            vec![recipe(2, 500, 1)],
        );
        let ids = |feed: &[DiaryEntry]| feed.iter().map(DiaryEntry::id).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
        assert!(first[0].is_food());
        assert_eq!(first[0].source_id(), 3);
        assert!(!first[2].is_food());
    }

    #[test]
    fn test_ids_distinguish_kind() {
        let f = DiaryEntry::Food(food(1, 0, 0));
        let r = DiaryEntry::Recipe(recipe(1, 0, 0));
        assert_ne!(f.id(), r.id());
        assert_eq!(f.id(), DiaryEntry::Food(food(1, 99, 5)).id());
    }

    #[test]
    fn test_deleted_template_name_fallback() {
        let mut orphan = food(1, 0, 50);
        orphan.food_name = None;
        assert_eq!(DiaryEntry::Food(orphan).name(), "Deleted food");
    }

    #[test]
    fn test_day_bounds_utc() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let bounds = day_bounds(date, &Utc);
        assert_eq!(bounds.end_millis - bounds.start_millis, 86_400_000);
        assert!(bounds.contains(bounds.start_millis));
        assert!(!bounds.contains(bounds.end_millis));
        assert_eq!(local_date(bounds.start_millis, &Utc), date);
        assert_eq!(
            local_date(bounds.end_millis, &Utc),
            NaiveDate::from_ymd_opt(2024, 6, 16).unwrap()
        );
    }

    #[test]
    fn test_day_bounds_midnight_in_dst_gap() {
        // 2018-11-04 00:00 did not exist in Sao Paulo; the day began at 01:00 -02
        let tz = chrono_tz::America::Sao_Paulo;
        let gap_day = NaiveDate::from_ymd_opt(2018, 11, 4).unwrap();
        let bounds = day_bounds(gap_day, &tz);
        assert_eq!(local_date(bounds.start_millis, &tz), gap_day);
        assert_eq!(local_date(bounds.start_millis - 1, &tz), gap_day.pred_opt().unwrap());

        let previous = day_bounds(gap_day.pred_opt().unwrap(), &tz);
        assert_eq!(previous.end_millis, bounds.start_millis);
        assert_eq!(previous.end_millis - previous.start_millis, 24 * 3_600_000);
        assert_eq!(bounds.end_millis - bounds.start_millis, 23 * 3_600_000);
    }

    #[test]
    fn test_range_bounds() {
        let last = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let week = range_bounds(last, 7, &Utc);
        assert_eq!(week.end_millis - week.start_millis, 7 * 86_400_000);
        assert_eq!(range_bounds(last, 1, &Utc), day_bounds(last, &Utc));
    }

    #[test]
    fn test_group_by_date_and_daily_totals() {
        let day1 = day_bounds(NaiveDate::from_ymd_opt(2024, 6, 14).unwrap(), &Utc);
        let day2 = day_bounds(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(), &Utc);
        let feed = build_feed(
            vec![food(1, day1.start_millis + 10, 100), food(2, day2.start_millis + 10, 200)],
            vec![recipe(1, day2.start_millis + 20, 300)],
        );

        let totals = daily_totals(&feed, &Utc);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals.values().map(|m| m.calories).collect::<Vec<_>>(), vec![100, 500]);

        let grouped = group_by_date(feed, &Utc);
        assert_eq!(grouped.len(), 2);
        let last = grouped.values().last().unwrap();
        assert_eq!(last.len(), 2);
        assert_eq!(last[0].name(), "Recipe 1");
    }
}
