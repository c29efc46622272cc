use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone};
use serde::Serialize;

use crate::diary::DiaryEntry;

#[derive(Debug, Serialize)]
struct DiaryRow<'a> {
    date: String,
    time: String,
    kind: &'static str,
    name: &'a str,
    grams: String,
    calories: i64,
    protein: i64,
    carbs: i64,
    fat: i64,
}

fn entry_grams(entry: &DiaryEntry) -> Option<f64> {
    match entry {
        DiaryEntry::Food(f) => Some(f.log.grams),
        DiaryEntry::Recipe(r) => r
            .ingredients()
            .ok()
            .map(|items| items.iter().map(|i| i.grams).sum()),
    }
}

/// Write diary entries as CSV with a header row. Returns the number of rows.
pub fn write_diary_csv<W: Write, Tz: TimeZone>(
    writer: W,
    entries: &[DiaryEntry],
    tz: &Tz,
) -> Result<usize>
where
    Tz::Offset: std::fmt::Display,
{
    let mut wtr = csv::Writer::from_writer(writer);
    for entry in entries {
        let local = DateTime::from_timestamp_millis(entry.timestamp())
            .context("Entry timestamp out of range")?
            .with_timezone(tz);
        let macros = entry.macros();
        wtr.serialize(DiaryRow {
            date: local.format("%Y-%m-%d").to_string(),
            time: local.format("%H:%M").to_string(),
            kind: if entry.is_food() { "food" } else { "recipe" },
            name: entry.name(),
            grams: entry_grams(entry).map_or_else(String::new, |g| format!("{g:.0}")),
            calories: macros.calories,
            protein: macros.protein,
            carbs: macros.carbs,
            fat: macros.fat,
        })?;
    }
    wtr.flush()?;
    Ok(entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diary::build_feed;
    use crate::models::{FoodLog, FoodLogWithTemplate, RecipeLog};
    use chrono::Utc;

    // 2024-06-15T08:30:00Z
    const MORNING: i64 = 1_718_440_200_000;

    fn feed() -> Vec<DiaryEntry> {
        let food = FoodLogWithTemplate {
            log: FoodLog {
                id: 1,
                template_id: 1,
                grams: 150.0,
                calories: 248,
                protein: 47,
                carbs: 0,
                fat: 5,
                timestamp: MORNING,
            },
            food_name: Some("Chicken, grilled".to_string()),
            food_brand: None,
            rates: None,
        };
        let recipe = RecipeLog {
            id: 1,
            recipe_id: Some(1),
            name: "Overnight Oats".to_string(),
            instructions: None,
            ingredients_json: r#"[{"name":"Oats","grams":50.0,"calories":195,"protein":8,"carbs":33,"fat":3},{"name":"Milk","grams":200.0,"calories":128,"protein":7,"carbs":10,"fat":4}]"#.to_string(),
            calories: 323,
            protein: 15,
            carbs: 43,
            fat: 7,
            timestamp: MORNING + 60_000,
        };
        build_feed(vec![food], vec![recipe])
    }

    #[test]
    fn test_write_diary_csv() {
        let mut out = Vec::new();
        let rows = write_diary_csv(&mut out, &feed(), &Utc).unwrap();
        assert_eq!(rows, 2);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "date,time,kind,name,grams,calories,protein,carbs,fat");
        assert_eq!(lines[1], "2024-06-15,08:31,recipe,Overnight Oats,250,323,15,43,7");
        // names with commas are quoted
        assert_eq!(lines[2], "2024-06-15,08:30,food,\"Chicken, grilled\",150,248,47,0,5");
    }

    #[test]
    fn test_empty_export_has_no_rows() {
        let mut out = Vec::new();
        assert_eq!(write_diary_csv(&mut out, &[], &Utc).unwrap(), 0);
        // the csv writer only emits headers alongside the first record
        assert!(out.is_empty());
    }
}
