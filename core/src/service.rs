use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::csv_import::{self, MetricsImportSummary};
use crate::db::{DATE_FORMAT, Database};
use crate::models::{DailyRecord, FoodEntry, MetricUpdate, NewFoodEntry, UpdateFoodEntry};
use crate::recompute::ClearedDay;
use crate::settings::{Settings, SettingsUpdate};
use crate::summary::DailySummary;

/// String-dated entry point used by the CLI and the API server.
///
/// Dates are `YYYY-MM-DD`. Validation happens before anything is written.
pub struct Tracker {
    db: Database,
}

fn parse_date(date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), DATE_FORMAT)
        .with_context(|| format!("Invalid date '{date}'. Use YYYY-MM-DD"))
}

impl Tracker {
    pub fn new(db_path: &str) -> Result<Self> {
        let db = Database::open(Path::new(db_path))?;
        Ok(Self { db })
    }

    pub fn new_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self { db })
    }

    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    // --- Food entries ---

    pub fn log_food(&self, entry: NewFoodEntry) -> Result<FoodEntry> {
        self.db.add_food_entry(entry)
    }

    pub fn update_food(&self, id: i64, update: UpdateFoodEntry) -> Result<FoodEntry> {
        self.db.update_food_entry(id, update)
    }

    pub fn delete_food(&self, id: i64) -> Result<bool> {
        self.db.delete_food_entry(id)
    }

    pub fn get_food(&self, id: i64) -> Result<FoodEntry> {
        self.db.get_food_entry(id)
    }

    pub fn entries_for_date(&self, date: &str) -> Result<Vec<FoodEntry>> {
        self.db.entries_for_date(parse_date(date)?)
    }

    // --- Daily metrics ---

    pub fn upsert_metrics(&self, date: &str, update: &MetricUpdate) -> Result<DailyRecord> {
        self.db.upsert_metrics(parse_date(date)?, update)
    }

    pub fn get_record(&self, date: &str) -> Result<Option<DailyRecord>> {
        self.db.get_record(parse_date(date)?)
    }

    pub fn clear_day(&self, date: &str) -> Result<ClearedDay> {
        self.db.clear_day(parse_date(date)?)
    }

    // --- Engine ---

    pub fn get_daily_summary(&self, date: &str) -> Result<DailySummary> {
        self.db.daily_summary(parse_date(date)?)
    }

    pub fn recompute_totals(&self, date: &str) -> Result<Option<DailyRecord>> {
        self.db.recompute_totals(parse_date(date)?)
    }

    pub fn recalculate_all_targets(&self) -> Result<usize> {
        self.db.recalculate_all_targets()
    }

    /// Records for the last `days` days ending on `end`, newest first.
    pub fn history(&self, end: &str, days: u32) -> Result<Vec<DailyRecord>> {
        self.db.history(parse_date(end)?, days)
    }

    // --- Settings ---

    /// Stored settings, or defaults when none have been saved.
    pub fn settings(&self) -> Result<Settings> {
        self.db.settings_or_default()
    }

    pub fn update_settings(&self, update: &SettingsUpdate) -> Result<Settings> {
        self.db.update_settings(update)
    }

    // --- Import ---

    pub fn import_metrics_csv(
        &self,
        csv_data: &str,
        since: Option<&str>,
        dry_run: bool,
    ) -> Result<MetricsImportSummary> {
        let since = since.map(parse_date).transpose()?;
        let rows = csv_import::parse_metrics_csv(csv_data.as_bytes())?;
        csv_import::import_metrics(&self.db, &rows, since, dry_run)
    }
}
