use anyhow::Result;
use chrono::{Days, NaiveDate};
use serde::Serialize;

use super::Observer;
use crate::events::{ChangeBus, StoreChange};
use crate::models::WeightEntry;
use crate::repository::WeightRepository;

#[derive(Debug, Clone, Serialize)]
pub struct WeightState {
    /// Newest first.
    pub history: Vec<WeightEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest: Option<WeightEntry>,
    /// Latest minus oldest entry in the window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_kg: Option<f64>,
}

#[derive(Clone)]
pub struct WeightViewModel {
    weight: WeightRepository,
    bus: ChangeBus,
}

impl WeightViewModel {
    #[must_use]
    pub fn new(weight: WeightRepository, bus: ChangeBus) -> Self {
        Self { weight, bus }
    }

    /// Entries from the `days` calendar days ending with `today`, or everything when `days` is `None`.
    pub fn load(&self, today: NaiveDate, days: Option<u32>) -> Result<WeightState> {
        let since = days
            .and_then(|d| today.checked_sub_days(Days::new(u64::from(d.saturating_sub(1)))));
        let history = self.weight.history(since)?;
        let change_kg = match (history.first(), history.last()) {
            (Some(newest), Some(oldest)) if history.len() > 1 => {
                Some(newest.weight_kg - oldest.weight_kg)
            }
            _ => None,
        };
        Ok(WeightState {
            latest: history.first().cloned(),
            change_kg,
            history,
        })
    }

    pub fn observe(&self, today: NaiveDate, days: Option<u32>) -> Result<Observer<WeightState>> {
        let vm = self.clone();
        Observer::new(self.bus.subscribe(&[StoreChange::WeightEntries]), move || {
            vm.load(today, days)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewWeightEntry;
    use crate::service::StrideService;

    fn entry(day: u32, kg: f64) -> NewWeightEntry {
        NewWeightEntry {
            date: NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
            weight_kg: kg,
            notes: None,
        }
    }

    #[test]
    fn test_change_over_window() {
        let service = StrideService::new_in_memory().unwrap();
        let weight = service.weight();
        weight.log(&entry(1, 84.0)).unwrap();
        weight.log(&entry(10, 83.0)).unwrap();
        weight.log(&entry(15, 82.5)).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();

        let all = service.weight_view().load(today, None).unwrap();
        assert_eq!(all.history.len(), 3);
        assert!((all.change_kg.unwrap() + 1.5).abs() < 1e-9);

        let week = service.weight_view().load(today, Some(7)).unwrap();
        assert_eq!(week.history.len(), 2);
        assert!((week.latest.unwrap().weight_kg - 82.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_window_covers_exactly_days() {
        let service = StrideService::new_in_memory().unwrap();
        let weight = service.weight();
        weight.log(&entry(8, 84.0)).unwrap();
        weight.log(&entry(9, 83.5)).unwrap();
        weight.log(&entry(14, 83.0)).unwrap();
        weight.log(&entry(15, 82.5)).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();

        let week = service.weight_view().load(today, Some(7)).unwrap();
        let dates: Vec<String> = week.history.iter().map(|e| e.date.to_string()).collect();
        assert_eq!(dates, vec!["2024-06-15", "2024-06-14", "2024-06-09"]);
        assert!((week.change_kg.unwrap() + 1.0).abs() < 1e-9);

        let today_only = service.weight_view().load(today, Some(1)).unwrap();
        assert_eq!(today_only.history.len(), 1);
        assert!(today_only.change_kg.is_none());
    }

    #[test]
    fn test_single_entry_has_no_change() {
        let service = StrideService::new_in_memory().unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let mut observer = service.weight_view().observe(today, None).unwrap();
        assert!(observer.current().latest.is_none());

        service.weight().log(&entry(15, 80.0)).unwrap();
        assert!(observer.poll().unwrap());
        assert!(observer.current().change_kg.is_none());
    }
}
