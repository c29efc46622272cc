use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use stride_core::diary::DiaryEntry;
use stride_core::service::StrideService;

use super::helpers::{entry_label, format_macros, parse_date, print_json};

fn entry_line(entry: &DiaryEntry) -> String {
    let time = DateTime::from_timestamp_millis(entry.timestamp())
        .map(|dt| dt.with_timezone(&Local).format("%H:%M").to_string())
        .unwrap_or_default();
    let detail = match entry {
        DiaryEntry::Food(f) => {
            let brand = f
                .food_brand
                .as_ref()
                .map(|b| format!(" ({b})"))
                .unwrap_or_default();
            format!("{}{brand}, {:.0}g", entry.name(), f.log.grams)
        }
        DiaryEntry::Recipe(r) => format!("{} (recipe)", r.name),
    };
    format!(
        "  [{}] {time} {detail}: {}",
        entry_label(entry),
        format_macros(&entry.macros())
    )
}

pub(crate) fn cmd_diary(svc: &StrideService, date: Option<String>, json: bool) -> Result<()> {
    let date = parse_date(date)?;
    let state = svc.diary_view().load(date, &Local)?;

    if json {
        return print_json(&state);
    }

    if state.entries.is_empty() {
        eprintln!("No entries for {date}");
        process::exit(2);
    }

    println!("=== {date} ===\n");
    for entry in &state.entries {
        println!("{}", entry_line(entry));
    }
    println!("\n  TOTAL: {}", format_macros(&state.totals));

    let goals = svc.preferences().goals()?;
    let remaining = goals.remaining(&state.totals);
    println!("  REMAINING: {}", format_macros(&remaining));
    Ok(())
}

pub(crate) fn cmd_history(svc: &StrideService, days: u32, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct HistoryRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Entries")]
        entries: usize,
        #[tabled(rename = "Calories")]
        calories: i64,
        #[tabled(rename = "Protein")]
        protein: String,
        #[tabled(rename = "Carbs")]
        carbs: String,
        #[tabled(rename = "Fat")]
        fat: String,
        #[tabled(rename = "Goal")]
        goal: &'static str,
    }

    let today = Local::now().date_naive();
    let history = svc.diary_view().load_history(today, days, &Local)?;

    if json {
        return print_json(&history);
    }

    if history.days.iter().all(|d| d.entries.is_empty()) {
        eprintln!("No entries in the last {days} days");
        process::exit(2);
    }

    let goals = svc.preferences().goals()?;
    let rows: Vec<HistoryRow> = history
        .days
        .iter()
        .map(|d| HistoryRow {
            date: d.date.to_string(),
            entries: d.entries.len(),
            calories: d.totals.calories,
            protein: format!("{}g", d.totals.protein),
            carbs: format!("{}g", d.totals.carbs),
            fat: format!("{}g", d.totals.fat),
            goal: match (d.entries.is_empty(), goals.calories_met(d.totals.calories)) {
                (true, _) => "-",
                (false, true) => "met",
                (false, false) => "missed",
            },
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..6)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    println!("Total: {}", format_macros(&history.totals));
    Ok(())
}

pub(crate) fn cmd_export(
    svc: &StrideService,
    days: u32,
    last: Option<String>,
    out: Option<&Path>,
    json: bool,
) -> Result<()> {
    let last: NaiveDate = parse_date(last)?;
    let rows = match out {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            svc.export_diary_csv(BufWriter::new(file), last, days, &Local)?
        }
        None => svc.export_diary_csv(io::stdout().lock(), last, days, &Local)?,
    };

    // stdout already carries the CSV when no file was given
    match out {
        Some(path) if json => println!(
            "{}",
            serde_json::json!({ "rows": rows, "file": path.display().to_string() })
        ),
        Some(path) => println!("Exported {rows} entries to {}", path.display()),
        None => tracing::debug!(rows, "diary exported to stdout"),
    }
    Ok(())
}
