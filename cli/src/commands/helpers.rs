use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate, NaiveTime, TimeZone};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use stride_core::diary::DiaryEntry;
use stride_core::models::{FoodTemplate, Macros, convert_to_grams};

/// Parse an amount with optional unit into grams.
/// Accepts: "200", "200g", "500ml", "500 ml", "2 tbsp", "1.5 oz", etc.
pub(crate) fn parse_amount(s: &str) -> Result<f64> {
    let s = s.trim();

    // Plain grams: "500" or "500g"
    if let Ok(g) = parse_grams(s) {
        return Ok(g);
    }

    let (qty, unit) = if let Some(split) = split_number_unit(s) {
        split
    } else {
        let parts: Vec<&str> = s.splitn(2, char::is_whitespace).collect();
        if parts.len() != 2 {
            bail!("Invalid amount: '{s}'. Use '200g', '500ml', '2 tbsp', etc.");
        }
        let qty: f64 = parts[0]
            .parse()
            .with_context(|| format!("Invalid quantity: '{s}'"))?;
        (qty, parts[1].trim())
    };

    if qty <= 0.0 {
        bail!("Amount must be greater than 0");
    }
    match convert_to_grams(qty, unit) {
        Some((grams, is_approx)) => {
            if is_approx {
                eprintln!("Note: {qty} {unit} ≈ {grams:.0}g (approximate, assumes water density)");
            }
            Ok(grams)
        }
        None => bail!("Unknown unit '{unit}' in '{s}'. Supported: g, kg, lb, oz, tbsp, tsp, ml, l"),
    }
}

/// Split "500ml" or "2.5tbsp" into (500.0, "ml") or (2.5, "tbsp").
fn split_number_unit(s: &str) -> Option<(f64, &str)> {
    let idx = s.find(|c: char| c.is_alphabetic())?;
    if idx == 0 {
        return None;
    }
    let (num_part, unit_part) = s.split_at(idx);
    let qty: f64 = num_part.trim().parse().ok()?;
    Some((qty, unit_part))
}

pub(crate) fn parse_grams(s: &str) -> Result<f64> {
    let trimmed = s.trim_end_matches('g').trim();
    let value: f64 = trimmed
        .parse()
        .with_context(|| format!("Invalid amount: '{s}'. Use a number like '200' or '200g'"))?;
    if value <= 0.0 {
        bail!("Amount must be greater than 0");
    }
    Ok(value)
}

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            "tomorrow" => Ok(Local::now().date_naive() + chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

/// Epoch millis for a log entry. Without a time, today means now and any
/// other day means local noon.
pub(crate) fn entry_timestamp(date: Option<String>, time: Option<&str>) -> Result<i64> {
    let explicit_date = date.is_some();
    let date = parse_date(date)?;
    let time = match time {
        Some(t) => Some(
            NaiveTime::parse_from_str(t, "%H:%M")
                .with_context(|| format!("Invalid time '{t}'. Use HH:MM"))?,
        ),
        None => None,
    };
    let today = Local::now().date_naive();
    let local = match time {
        Some(t) => date.and_time(t),
        None if !explicit_date || date == today => return Ok(Local::now().timestamp_millis()),
        None => date.and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default()),
    };
    Local
        .from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.timestamp_millis())
        .with_context(|| format!("{local} does not exist in the local time zone"))
}

/// Which log a diary id points at: `12` is a food log, `r12` a recipe log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryRef {
    Food(i64),
    Recipe(i64),
}

pub(crate) fn parse_entry_ref(s: &str) -> Result<EntryRef> {
    let s = s.trim();
    let (recipe, digits) = match s.strip_prefix('r').or_else(|| s.strip_prefix('R')) {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let id: i64 = digits
        .parse()
        .with_context(|| format!("Invalid entry id '{s}'. Use 12 for a food or r12 for a recipe"))?;
    Ok(if recipe {
        EntryRef::Recipe(id)
    } else {
        EntryRef::Food(id)
    })
}

pub(crate) fn entry_label(entry: &DiaryEntry) -> String {
    match entry {
        DiaryEntry::Food(f) => f.log.id.to_string(),
        DiaryEntry::Recipe(r) => format!("r{}", r.id),
    }
}

pub(crate) fn format_macros(m: &Macros) -> String {
    format!(
        "{} kcal | P:{}g C:{}g F:{}g",
        m.calories, m.protein, m.carbs, m.fat
    )
}

pub(crate) fn prompt_choice(count: usize) -> Result<usize> {
    eprint!("\nSelect a food (1-{count}): ");
    io::stderr().flush()?;
    let stdin = io::stdin();
    let line = stdin.lock().lines().next().context("No input")??;
    let n: usize = line.trim().parse().context("Invalid number")?;
    if n < 1 || n > count {
        bail!("Selection out of range");
    }
    Ok(n - 1)
}

pub(crate) fn print_food_table(foods: &[&FoodTemplate]) {
    #[derive(Tabled)]
    struct FoodRow {
        #[tabled(rename = "#")]
        idx: usize,
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Brand")]
        brand: String,
        #[tabled(rename = "Cal/100g")]
        calories: String,
        #[tabled(rename = "P/100g")]
        protein: String,
        #[tabled(rename = "C/100g")]
        carbs: String,
        #[tabled(rename = "F/100g")]
        fat: String,
        #[tabled(rename = "Source")]
        source: String,
    }

    let rows: Vec<FoodRow> = foods
        .iter()
        .enumerate()
        .map(|(i, f)| FoodRow {
            idx: i + 1,
            id: f.id,
            name: truncate(&f.name, 35),
            brand: f
                .brand
                .as_deref()
                .map(|b| truncate(b, 20))
                .unwrap_or_default(),
            calories: format!("{:.0}", f.calories_per_100g),
            protein: format!("{:.1}", f.protein_per_100g),
            carbs: format!("{:.1}", f.carbs_per_100g),
            fat: format!("{:.1}", f.fat_per_100g),
            source: f.source.to_string(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(4..8)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

/// Report a missing record and exit with status 2.
pub(crate) fn exit_not_found(message: &str, json: bool) -> ! {
    if json {
        println!("{}", json_error(message));
    } else {
        eprintln!("{message}");
    }
    process::exit(2);
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
