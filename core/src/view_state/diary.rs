use anyhow::Result;
use chrono::{Days, NaiveDate, TimeZone};
use serde::Serialize;

use super::Observer;
use crate::diary::{DiaryEntry, build_feed, day_bounds, group_by_date, range_bounds, totals};
use crate::events::{ChangeBus, StoreChange};
use crate::models::Macros;
use crate::repository::{FoodRepository, RecipeRepository};

const WATCHED: &[StoreChange] = &[
    StoreChange::FoodLogs,
    StoreChange::RecipeLogs,
    StoreChange::FoodTemplates,
];

#[derive(Debug, Clone, Serialize)]
pub struct DiaryState {
    pub date: NaiveDate,
    pub entries: Vec<DiaryEntry>,
    pub totals: Macros,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayDiary {
    pub date: NaiveDate,
    pub entries: Vec<DiaryEntry>,
    pub totals: Macros,
}

/// Most recent day first; days without entries are included with zero totals.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryState {
    pub days: Vec<DayDiary>,
    pub totals: Macros,
}

#[derive(Clone)]
pub struct DiaryViewModel {
    foods: FoodRepository,
    recipes: RecipeRepository,
    bus: ChangeBus,
}

impl DiaryViewModel {
    #[must_use]
    pub fn new(foods: FoodRepository, recipes: RecipeRepository, bus: ChangeBus) -> Self {
        Self {
            foods,
            recipes,
            bus,
        }
    }

    pub fn load<Tz: TimeZone>(&self, date: NaiveDate, tz: &Tz) -> Result<DiaryState> {
        let bounds = day_bounds(date, tz);
        let entries = build_feed(
            self.foods.logs_between(bounds)?,
            self.recipes.logs_between(bounds)?,
        );
        Ok(DiaryState {
            date,
            totals: totals(&entries),
            entries,
        })
    }

    pub fn load_history<Tz: TimeZone>(
        &self,
        last: NaiveDate,
        days: u32,
        tz: &Tz,
    ) -> Result<HistoryState> {
        let bounds = range_bounds(last, days, tz);
        let feed = build_feed(
            self.foods.logs_between(bounds)?,
            self.recipes.logs_between(bounds)?,
        );
        let all_totals = totals(&feed);
        let mut grouped = group_by_date(feed, tz);

        let days = (0..days.max(1))
            .filter_map(|back| last.checked_sub_days(Days::new(u64::from(back))))
            .map(|date| {
                let entries = grouped.remove(&date).unwrap_or_default();
                DayDiary {
                    date,
                    totals: totals(&entries),
                    entries,
                }
            })
            .collect();
        Ok(HistoryState {
            days,
            totals: all_totals,
        })
    }

    pub fn observe<Tz>(&self, date: NaiveDate, tz: Tz) -> Result<Observer<DiaryState>>
    where
        Tz: TimeZone + Send + 'static,
    {
        let vm = self.clone();
        Observer::new(self.bus.subscribe(WATCHED), move || vm.load(date, &tz))
    }
}
