use std::collections::HashSet;
use std::io::Read;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use serde::Serialize;

use crate::db::Database;
use crate::models::{MetricUpdate, NewFoodEntry, validate_metric_update};

/// Description given to the entry that carries an imported day's calories.
pub const IMPORTED_ENTRY_DESCRIPTION: &str = "Imported daily total";

/// One day parsed from a metrics CSV export.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsRow {
    pub date: NaiveDate,
    pub steps: Option<i64>,
    pub weight_kg: Option<f64>,
    pub total_burned_kcal: Option<f64>,
    pub active_kcal: Option<f64>,
    pub basal_kcal: Option<f64>,
    pub calories_eaten: Option<f64>,
}

impl MetricsRow {
    fn metric_update(&self) -> MetricUpdate {
        MetricUpdate {
            steps: self.steps,
            weight_kg: self.weight_kg,
            calories_burned_total: self.total_burned_kcal,
            calories_burned_active: self.active_kcal,
            calories_burned_basal: self.basal_kcal,
            ..MetricUpdate::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsImportSummary {
    pub rows_parsed: usize,
    pub rows_skipped: usize,
    pub days_created: usize,
    pub days_updated: usize,
    pub entries_created: usize,
    pub targets_recalculated: usize,
    pub dry_run: bool,
}

/// Parse a daily metrics CSV export.
///
/// Expected header:
/// `DATE,steps,weight_kg,total_burned_kcal,active_kcal,basal_kcal,calories_eaten`
///
/// Only `DATE` is required. Header names are case-insensitive and blank or
/// unparseable cells are treated as missing.
pub fn parse_metrics_csv<R: Read>(reader: R) -> Result<Vec<MetricsRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().context("Failed to read CSV headers")?.clone();
    let col =
        |name: &str| -> Option<usize> { headers.iter().position(|h| h.eq_ignore_ascii_case(name)) };

    let Some(idx_date) = col("DATE") else {
        bail!("Missing required column: DATE");
    };
    let idx_steps = col("steps");
    let idx_weight = col("weight_kg");
    let idx_total = col("total_burned_kcal");
    let idx_active = col("active_kcal");
    let idx_basal = col("basal_kcal");
    let idx_eaten = col("calories_eaten");

    let mut rows = Vec::new();
    for (line_num, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("Failed to parse CSV row {}", line_num + 2))?;

        let raw_date = record.get(idx_date).unwrap_or("").trim();
        if raw_date.is_empty() {
            continue;
        }
        let date = normalize_date(raw_date).with_context(|| format!("CSV row {}", line_num + 2))?;

        let number = |idx: Option<usize>| -> Option<f64> {
            idx.and_then(|i| record.get(i))
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite())
        };

        rows.push(MetricsRow {
            date,
            steps: number(idx_steps).map(|s| s as i64),
            weight_kg: number(idx_weight),
            total_burned_kcal: number(idx_total),
            active_kcal: number(idx_active),
            basal_kcal: number(idx_basal),
            calories_eaten: number(idx_eaten),
        });
    }

    Ok(rows)
}

/// Accepts `YYYY-MM-DD`, `M/D/YYYY`, and `D/M/YYYY`, in that order.
fn normalize_date(raw: &str) -> Result<NaiveDate> {
    let date_part = raw.split([' ', 'T']).next().unwrap_or(raw);
    for format in ["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(date_part, format) {
            return Ok(d);
        }
    }
    bail!("Cannot parse date: '{raw}'")
}

/// Import parsed rows, oldest first, in one transaction.
///
/// Rows before `since` are skipped. A row's `calories_eaten` replaces any
/// earlier imported total for that day with a single entry. Every target is
/// recalculated once at the end. When `dry_run` is true nothing is written.
pub fn import_metrics(
    db: &Database,
    rows: &[MetricsRow],
    since: Option<NaiveDate>,
    dry_run: bool,
) -> Result<MetricsImportSummary> {
    let mut selected: Vec<&MetricsRow> = rows
        .iter()
        .filter(|r| since.is_none_or(|s| r.date >= s))
        .collect();
    selected.sort_by_key(|r| r.date);

    let mut summary = MetricsImportSummary {
        rows_parsed: rows.len(),
        rows_skipped: rows.len() - selected.len(),
        dry_run,
        ..MetricsImportSummary::default()
    };

    let mut seen = HashSet::new();
    for row in &selected {
        validate_metric_update(&row.metric_update())
            .with_context(|| format!("Invalid metrics for {}", row.date))?;
        if seen.insert(row.date) {
            if db.get_record(row.date)?.is_some() {
                summary.days_updated += 1;
            } else {
                summary.days_created += 1;
            }
        }
        if row.calories_eaten.is_some_and(|c| c > 0.0) {
            summary.entries_created += 1;
        }
    }

    if dry_run {
        return Ok(summary);
    }

    let tx = db.conn.unchecked_transaction()?;
    let settings = db.get_or_create_settings()?;
    for row in &selected {
        db.upsert_metrics_in_tx(row.date, &row.metric_update(), &settings)?;
        if let Some(eaten) = row.calories_eaten {
            db.remove_imported_entries(row.date)?;
            if eaten > 0.0 {
                db.insert_imported_entry(&NewFoodEntry {
                    date: row.date,
                    description: Some(IMPORTED_ENTRY_DESCRIPTION.to_string()),
                    calories: eaten,
                    ..NewFoodEntry::default()
                })?;
            }
        }
    }
    summary.targets_recalculated = db.recalculate_all_targets_in_tx(&settings)?;
    tx.commit()?;

    tracing::info!(
        created = summary.days_created,
        updated = summary.days_updated,
        entries = summary.entries_created,
        "imported metrics csv"
    );
    Ok(summary)
}
