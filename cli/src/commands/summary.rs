use anyhow::Result;
use chrono::Local;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use tally_core::aggregation::WindowStats;
use tally_core::service::Tracker;
use tally_core::summary::format_kcal;

use super::entry::print_entries_table;
use super::helpers::{date_arg, json_error, no_neg_zero, opt_num};

fn print_window(label: &str, stats: &WindowStats) {
    let burn = no_neg_zero(stats.avg_burn);
    let eaten = no_neg_zero(stats.avg_eaten);
    let deficit = no_neg_zero(stats.avg_deficit);
    let weight = opt_num(stats.avg_weight, 1);
    let protein = opt_num(stats.avg_protein, 0);
    println!(
        "  {label}: burn {burn:.0} | eaten {eaten:.0} | balance {deficit:+.0} kcal/day | weight {weight} kg | protein {protein} g"
    );
}

pub(crate) fn cmd_summary(tracker: &Tracker, date: Option<String>, json: bool) -> Result<()> {
    let date = date_arg(date)?;
    let summary = tracker.get_daily_summary(&date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("=== {date} · {} ===\n", summary.mode_name);
    println!("  {}\n", summary.summary_text);

    if !summary.entries.is_empty() {
        print_entries_table(&summary.entries);
        println!();
    }

    let eaten = summary.calories_eaten;
    let target = summary.daily_calorie_target;
    let pct = summary.percentage_of_target;
    println!("  EATEN:     {} kcal ({pct:.0}% of target)", format_kcal(eaten));
    println!("  TARGET:    {} kcal", format_kcal(target));
    println!("  REMAINING: {} kcal", format_kcal(summary.remaining_to_target));
    match summary.calories_burned_total {
        Some(burn) => println!(
            "  BURNED:    {} kcal (balance {:+.0})",
            format_kcal(burn),
            no_neg_zero(summary.calorie_balance)
        ),
        None => println!("  BURNED:    -"),
    }
    let protein = summary.protein_total_g;
    match (summary.protein_target_g, summary.protein_percentage) {
        (Some(t), Some(p)) => println!("  PROTEIN:   {protein:.0} / {t:.0} g ({p:.0}%)"),
        _ => println!("  PROTEIN:   {protein:.0} g"),
    }
    println!();
    print_window("7d ", &summary.last_7_days);
    print_window("30d", &summary.last_30_days);

    Ok(())
}

pub(crate) fn cmd_history(tracker: &Tracker, days: u32, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct HistoryRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Mode")]
        mode: String,
        #[tabled(rename = "Steps")]
        steps: String,
        #[tabled(rename = "Weight")]
        weight: String,
        #[tabled(rename = "Burned")]
        burned: String,
        #[tabled(rename = "Eaten")]
        eaten: String,
        #[tabled(rename = "Target")]
        target: String,
        #[tabled(rename = "Protein")]
        protein: String,
    }

    let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
    let records = tracker.history(&today, days)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        eprintln!("No records in the last {days} days");
        process::exit(2);
    }

    let rows: Vec<HistoryRow> = records
        .iter()
        .map(|r| HistoryRow {
            date: r.date.format("%Y-%m-%d").to_string(),
            mode: r.mode.to_string(),
            steps: r.steps.map_or_else(|| "-".to_string(), |s| s.to_string()),
            weight: opt_num(r.weight_kg, 1),
            burned: opt_num(r.calories_burned_total, 0),
            eaten: format!("{:.0}", no_neg_zero(r.calories_eaten)),
            target: format!("{:.0}", r.daily_calorie_target),
            protein: match r.protein_target_g {
                Some(t) => format!("{:.0}/{t:.0}g", r.protein_total_g),
                None => format!("{:.0}g", r.protein_total_g),
            },
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}

pub(crate) fn cmd_recompute(tracker: &Tracker, date: Option<String>, json: bool) -> Result<()> {
    let date = date_arg(date)?;
    let Some(record) = tracker.recompute_totals(&date)? else {
        if json {
            println!("{}", json_error(&format!("No record for {date}")));
        } else {
            eprintln!("No record for {date}");
        }
        process::exit(2);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        println!(
            "Recomputed {date}: eaten {:.0} kcal, target {:.0} kcal, protein {:.0}/{} g",
            record.calories_eaten,
            record.daily_calorie_target,
            record.protein_total_g,
            opt_num(record.protein_target_g, 0)
        );
    }
    Ok(())
}

pub(crate) fn cmd_recalc(tracker: &Tracker, json: bool) -> Result<()> {
    let updated = tracker.recalculate_all_targets()?;
    if json {
        println!("{}", serde_json::json!({ "updated": updated }));
    } else {
        println!("Recalculated targets for {updated} days");
    }
    Ok(())
}
