use anyhow::{Result, bail};
use chrono::Local;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use stride_core::models::NewWeightEntry;
use stride_core::service::StrideService;

use super::helpers::{exit_not_found, parse_date, print_json};

const LBS_PER_KG: f64 = 2.20462;
const KG_PER_LB: f64 = 0.453_592;

fn to_kg(value: f64, unit: &str) -> Result<f64> {
    if value <= 0.0 {
        bail!("Weight must be greater than 0");
    }
    match unit.to_lowercase().as_str() {
        "kg" => Ok(value),
        "lbs" | "lb" => {
            let kg = value * KG_PER_LB;
            eprintln!("Converting {value:.1} lbs to {kg:.2} kg");
            Ok(kg)
        }
        _ => bail!("Invalid unit '{unit}'. Use 'kg' or 'lbs'"),
    }
}

pub(crate) fn cmd_weight_log(
    svc: &StrideService,
    value: f64,
    unit: &str,
    date: Option<String>,
    notes: Option<String>,
    json: bool,
) -> Result<()> {
    let entry = NewWeightEntry {
        date: parse_date(date)?,
        weight_kg: to_kg(value, unit)?,
        notes,
    };
    let saved = svc.weight().log(&entry)?;

    if json {
        print_json(&saved)?;
    } else {
        println!(
            "Logged {:.1} kg ({:.1} lbs) for {}",
            saved.weight_kg,
            saved.weight_kg * LBS_PER_KG,
            saved.date
        );
        if let Some(n) = &saved.notes {
            println!("  Notes: {n}");
        }
    }
    Ok(())
}

pub(crate) fn cmd_weight_show(svc: &StrideService, date: Option<String>, json: bool) -> Result<()> {
    let date = parse_date(date)?;
    let Some(e) = svc.weight().get(date)? else {
        exit_not_found(&format!("No weight entry for {date}"), json);
    };

    if json {
        print_json(&e)?;
    } else {
        println!(
            "{}: {:.1} kg ({:.1} lbs)",
            e.date,
            e.weight_kg,
            e.weight_kg * LBS_PER_KG
        );
        if let Some(n) = &e.notes {
            println!("  Notes: {n}");
        }
    }
    Ok(())
}

pub(crate) fn cmd_weight_history(svc: &StrideService, days: Option<u32>, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct WeightRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Weight (kg)")]
        kg: String,
        #[tabled(rename = "Weight (lbs)")]
        lbs: String,
        #[tabled(rename = "Notes")]
        notes: String,
    }

    let state = svc.weight_view().load(Local::now().date_naive(), days)?;

    if json {
        return print_json(&state);
    }
    if state.history.is_empty() {
        eprintln!("No weight entries found. Use `stride weight log` to record your weight.");
        return Ok(());
    }

    let rows: Vec<WeightRow> = state
        .history
        .iter()
        .map(|e| WeightRow {
            date: e.date.to_string(),
            kg: format!("{:.1}", e.weight_kg),
            lbs: format!("{:.1}", e.weight_kg * LBS_PER_KG),
            notes: e.notes.clone().unwrap_or_default(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..3)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    if let Some(change) = state.change_kg {
        println!("Change: {change:+.1} kg");
    }
    Ok(())
}

pub(crate) fn cmd_weight_delete(svc: &StrideService, date: Option<String>, json: bool) -> Result<()> {
    let date = parse_date(date)?;
    if !svc.weight().delete(date)? {
        exit_not_found(&format!("No weight entry for {date}"), json);
    }
    if json {
        println!("{}", serde_json::json!({ "deleted": date }));
    } else {
        println!("Deleted weight entry for {date}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_kg_units() {
        assert!((to_kg(80.0, "kg").unwrap() - 80.0).abs() < f64::EPSILON);
        assert!((to_kg(100.0, "LBS").unwrap() - 45.3592).abs() < 1e-6);
        assert!(to_kg(80.0, "stone").is_err());
        assert!(to_kg(0.0, "kg").is_err());
    }
}
