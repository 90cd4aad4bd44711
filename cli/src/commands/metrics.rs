use anyhow::{Result, bail};

use tally_core::models::MetricUpdate;
use tally_core::service::Tracker;

use super::helpers::{date_arg, opt_num, parse_mode, weight_to_kg};

const LBS_PER_KG: f64 = 2.20462;

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_metrics(
    tracker: &Tracker,
    date: Option<String>,
    steps: Option<i64>,
    weight: Option<f64>,
    unit: &str,
    burned: Option<f64>,
    active: Option<f64>,
    basal: Option<f64>,
    mode: Option<&str>,
    protein_target: Option<f64>,
    json: bool,
) -> Result<()> {
    let update = MetricUpdate {
        steps,
        weight_kg: weight.map(|w| weight_to_kg(w, unit)).transpose()?,
        calories_burned_total: burned,
        calories_burned_active: active,
        calories_burned_basal: basal,
        mode: parse_mode(mode)?,
        protein_target_g: protein_target,
    };
    if update.is_empty() {
        bail!(
            "Nothing to record. Provide at least one of --steps, --weight, --burned, --active, \
             --basal, --mode, or --protein-target"
        );
    }

    let date = date_arg(date)?;
    let record = tracker.upsert_metrics(&date, &update)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    println!("Recorded metrics for {date}");
    if let Some(s) = record.steps {
        println!("  Steps:          {s}");
    }
    if let Some(w) = record.weight_kg {
        println!("  Weight:         {w:.1} kg ({:.1} lbs)", w * LBS_PER_KG);
    }
    println!(
        "  Burned:         {} kcal (active {}, basal {})",
        opt_num(record.calories_burned_total, 0),
        opt_num(record.calories_burned_active, 0),
        opt_num(record.calories_burned_basal, 0)
    );
    println!("  Mode:           {}", record.mode.display_name());
    println!("  Target:         {:.0} kcal", record.daily_calorie_target);
    println!("  Protein target: {} g", opt_num(record.protein_target_g, 0));

    Ok(())
}

pub(crate) fn cmd_clear(tracker: &Tracker, date: Option<String>, json: bool) -> Result<()> {
    let date = date_arg(date)?;
    let cleared = tracker.clear_day(&date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&cleared)?);
    } else if cleared.record_deleted {
        println!(
            "Cleared {date}: removed the day record and {} entries",
            cleared.entries_deleted
        );
    } else {
        eprintln!("No record for {date}");
        std::process::exit(2);
    }

    Ok(())
}
