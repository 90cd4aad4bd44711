//! Keeps stored totals and targets consistent after every mutation.
//!
//! Each public operation runs in a single transaction and calls the
//! non-transactional helpers below, so a failure part way through leaves the
//! database untouched.

use anyhow::{Result, bail};
use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::db::Database;
use crate::models::{
    DailyRecord, FoodEntry, MetricUpdate, NewFoodEntry, UpdateFoodEntry, normalize_food_entry_update,
    normalize_new_food_entry, validate_metric_update,
};
use crate::rolling::{RollingAverage, effective_window, rolling_burn_average, window_start};
use crate::settings::{Settings, SettingsUpdate};
use crate::target::{dynamic_target, protein_target_for, static_target};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClearedDay {
    pub date: NaiveDate,
    pub record_deleted: bool,
    pub entries_deleted: usize,
}

/// Decide the protein target after a mutation.
///
/// `replaced_weight` is the weight this mutation overwrote, if any. A stored
/// target that still equals the default for that old weight is treated as
/// auto-derived and follows the new weight; anything else is a manual override.
pub(crate) fn resolve_protein_target(
    current: Option<f64>,
    weight: Option<f64>,
    replaced_weight: Option<f64>,
    prior_weight: Option<f64>,
) -> Option<f64> {
    let unset = current.is_none_or(|t| t == 0.0);
    match weight {
        Some(w) if unset => Some(protein_target_for(w)),
        Some(w) => {
            let was_auto = replaced_weight.is_some_and(|old| {
                current.is_some_and(|t| (t - protein_target_for(old)).abs() < f64::EPSILON)
            });
            if was_auto {
                Some(protein_target_for(w))
            } else {
                current
            }
        }
        None if unset => prior_weight.map(protein_target_for).or(current),
        None => current,
    }
}

impl Database {
    /// Rolling burn average for the window ending on `date`.
    pub fn rolling_average(&self, date: NaiveDate, settings: &Settings) -> Result<RollingAverage> {
        let window = effective_window(settings.maintenance_window_days);
        let records = self.records_between(window_start(date, window), date)?;
        Ok(rolling_burn_average(&records, date, settings))
    }

    fn ensure_record(&self, date: NaiveDate, settings: &Settings) -> Result<DailyRecord> {
        if let Some(record) = self.get_record(date)? {
            return Ok(record);
        }
        let mode = settings.current_mode;
        tracing::debug!(%date, %mode, "creating daily record");
        self.insert_record(date, mode, static_target(settings, mode))
    }

    /// Re-sum entries, recompute the target, and settle the protein target for one date.
    fn recompute_date(
        &self,
        date: NaiveDate,
        settings: &Settings,
        replaced_weight: Option<f64>,
    ) -> Result<Option<DailyRecord>> {
        let Some(mut record) = self.get_record(date)? else {
            return Ok(None);
        };

        let (eaten, protein) = self.entry_totals(date)?;
        record.calories_eaten = eaten;
        record.protein_total_g = protein;

        let rolling = self.rolling_average(date, settings)?;
        record.daily_calorie_target = dynamic_target(settings, record.mode, rolling.average);

        let prior_weight = if record.weight_kg.is_none() {
            self.latest_weight_before(date)?
        } else {
            None
        };
        record.protein_target_g = resolve_protein_target(
            record.protein_target_g,
            record.weight_kg,
            replaced_weight,
            prior_weight,
        );

        tracing::debug!(
            %date,
            eaten,
            target = record.daily_calorie_target,
            baseline = rolling.average,
            fallback = rolling.fallback,
            "recomputed day"
        );
        self.save_record(&record).map(Some)
    }

    /// Recompute existing records whose rolling window includes `date`.
    fn propagate_forward(&self, date: NaiveDate, settings: &Settings) -> Result<usize> {
        let window = effective_window(settings.maintenance_window_days);
        let span = u64::try_from(window - 1).unwrap_or(0);
        let (Some(first), Some(last)) = (
            date.checked_add_days(Days::new(1)),
            date.checked_add_days(Days::new(span)),
        ) else {
            return Ok(0);
        };
        if last < first {
            return Ok(0);
        }
        let mut updated = 0;
        for record in self.records_between(first, last)? {
            if self.recompute_date(record.date, settings, None)?.is_some() {
                updated += 1;
            }
        }
        if updated > 0 {
            tracing::debug!(%date, updated, "propagated burn change");
        }
        Ok(updated)
    }

    pub(crate) fn recalculate_all_targets_in_tx(&self, settings: &Settings) -> Result<usize> {
        let mut updated = 0;
        for date in self.record_dates()? {
            if self.recompute_date(date, settings, None)?.is_some() {
                updated += 1;
            }
        }
        Ok(updated)
    }

    /// Apply a metric update without opening a transaction or propagating.
    ///
    /// Returns the saved record and whether the day's total burn changed.
    pub(crate) fn upsert_metrics_in_tx(
        &self,
        date: NaiveDate,
        update: &MetricUpdate,
        settings: &Settings,
    ) -> Result<(DailyRecord, bool)> {
        let existing = self.get_record(date)?;
        let mut record = match existing {
            Some(record) => record,
            None => {
                let mode = update.mode.unwrap_or(settings.current_mode);
                self.insert_record(date, mode, static_target(settings, mode))?
            }
        };

        let old_burn = record.calories_burned_total;
        let old_weight = record.weight_kg;

        if let Some(steps) = update.steps {
            record.steps = Some(steps);
        }
        if let Some(weight) = update.weight_kg {
            record.weight_kg = Some(weight);
        }
        if let Some(burn) = update.calories_burned_total {
            record.calories_burned_total = Some(burn);
        }
        if let Some(active) = update.calories_burned_active {
            record.calories_burned_active = Some(active);
        }
        if let Some(basal) = update.calories_burned_basal {
            record.calories_burned_basal = Some(basal);
        }
        if let Some(mode) = update.mode {
            record.mode = mode;
        }

        let replaced_weight = match update.protein_target_g {
            Some(target) => {
                record.protein_target_g = Some(target);
                None
            }
            None if update.weight_kg.is_some() && old_weight != record.weight_kg => {
                // A target inherited from an earlier day was derived from that day's weight.
                match old_weight {
                    Some(w) => Some(w),
                    None => self.latest_weight_before(date)?,
                }
            }
            None => None,
        };

        self.save_record(&record)?;
        let saved = self
            .recompute_date(date, settings, replaced_weight)?
            .unwrap_or(record);
        let burn_changed = old_burn != saved.calories_burned_total;
        Ok((saved, burn_changed))
    }

    // --- Public operations ---

    /// Recompute totals, target, and protein target for `date`.
    pub fn recompute_totals(&self, date: NaiveDate) -> Result<Option<DailyRecord>> {
        let tx = self.conn.unchecked_transaction()?;
        let settings = self.get_or_create_settings()?;
        let record = self.recompute_date(date, &settings, None)?;
        tx.commit()?;
        Ok(record)
    }

    /// Recompute every stored record. Returns how many were updated.
    pub fn recalculate_all_targets(&self) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let settings = self.get_or_create_settings()?;
        let updated = self.recalculate_all_targets_in_tx(&settings)?;
        tx.commit()?;
        tracing::info!(updated, "recalculated all targets");
        Ok(updated)
    }

    pub fn add_food_entry(&self, entry: NewFoodEntry) -> Result<FoodEntry> {
        let entry = normalize_new_food_entry(entry)?;
        let tx = self.conn.unchecked_transaction()?;
        let settings = self.get_or_create_settings()?;
        self.ensure_record(entry.date, &settings)?;
        let saved = self.insert_food_entry(&entry)?;
        self.recompute_date(entry.date, &settings, None)?;
        tx.commit()?;
        tracing::debug!(id = saved.id, date = %saved.date, calories = saved.calories, "logged food");
        Ok(saved)
    }

    /// Edit an entry. Moving it to another date recomputes both days.
    pub fn update_food_entry(&self, id: i64, update: UpdateFoodEntry) -> Result<FoodEntry> {
        let update = normalize_food_entry_update(update)?;
        if update.is_empty() {
            bail!("Nothing to update");
        }
        let tx = self.conn.unchecked_transaction()?;
        let settings = self.get_or_create_settings()?;
        let existing = self.get_food_entry(id)?;
        if let Some(new_date) = update.date {
            self.ensure_record(new_date, &settings)?;
        }
        self.apply_food_entry_update(id, &update)?;
        self.recompute_date(existing.date, &settings, None)?;
        if let Some(new_date) = update.date.filter(|d| *d != existing.date) {
            self.recompute_date(new_date, &settings, None)?;
        }
        let updated = self.get_food_entry(id)?;
        tx.commit()?;
        Ok(updated)
    }

    /// Delete an entry. Returns false when no entry has that id.
    pub fn delete_food_entry(&self, id: i64) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let Some(entry) = self.find_food_entry(id)? else {
            return Ok(false);
        };
        let settings = self.get_or_create_settings()?;
        self.remove_food_entry(id)?;
        self.recompute_date(entry.date, &settings, None)?;
        tx.commit()?;
        tracing::debug!(id, date = %entry.date, "deleted food entry");
        Ok(true)
    }

    /// Create or update the day's metrics, then recompute it and any later
    /// days whose window now sees a different burn.
    pub fn upsert_metrics(&self, date: NaiveDate, update: &MetricUpdate) -> Result<DailyRecord> {
        validate_metric_update(update)?;
        let tx = self.conn.unchecked_transaction()?;
        let settings = self.get_or_create_settings()?;
        let (record, burn_changed) = self.upsert_metrics_in_tx(date, update, &settings)?;
        if burn_changed {
            self.propagate_forward(date, &settings)?;
        }
        tx.commit()?;
        Ok(record)
    }

    /// Remove a day's record and entries.
    pub fn clear_day(&self, date: NaiveDate) -> Result<ClearedDay> {
        let tx = self.conn.unchecked_transaction()?;
        let entries_deleted = self.count_entries(date)?;
        let record_deleted = self.remove_record(date)?;
        if record_deleted {
            let settings = self.get_or_create_settings()?;
            self.propagate_forward(date, &settings)?;
        }
        tx.commit()?;
        tracing::info!(%date, record_deleted, entries_deleted, "cleared day");
        Ok(ClearedDay {
            date,
            record_deleted,
            entries_deleted,
        })
    }

    /// Validate and persist a settings change, then recompute every target.
    pub fn update_settings(&self, update: &SettingsUpdate) -> Result<Settings> {
        let tx = self.conn.unchecked_transaction()?;
        let current = self.get_or_create_settings()?;
        let next = current.apply(update)?;
        self.save_settings(&next)?;
        let updated = self.recalculate_all_targets_in_tx(&next)?;
        tx.commit()?;
        tracing::info!(mode = %next.current_mode, updated, "settings changed");
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WeightMode;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, n).unwrap()
    }

    fn food(date: NaiveDate, calories: f64, protein: Option<f64>) -> NewFoodEntry {
        NewFoodEntry {
            date,
            description: Some("Lunch".to_string()),
            calories,
            protein_g: protein,
            ..NewFoodEntry::default()
        }
    }

    fn burn(db: &Database, date: NaiveDate, kcal: f64) {
        db.upsert_metrics(
            date,
            &MetricUpdate {
                calories_burned_total: Some(kcal),
                ..MetricUpdate::default()
            },
        )
        .unwrap();
    }

    fn weight(db: &Database, date: NaiveDate, kg: f64) -> DailyRecord {
        db.upsert_metrics(
            date,
            &MetricUpdate {
                weight_kg: Some(kg),
                ..MetricUpdate::default()
            },
        )
        .unwrap()
    }

    fn set_mode(db: &Database, mode: WeightMode) {
        db.update_settings(&SettingsUpdate {
            current_mode: Some(mode),
            ..SettingsUpdate::default()
        })
        .unwrap();
    }

    #[test]
    fn test_resolve_protein_target_rules() {
        // Auto-fill from weight when unset
        assert_eq!(resolve_protein_target(None, Some(70.0), None, None), Some(140.0));
        assert_eq!(resolve_protein_target(Some(0.0), Some(70.0), None, None), Some(140.0));
        // Auto-derived target follows weight
        assert_eq!(
            resolve_protein_target(Some(140.0), Some(72.0), Some(70.0), None),
            Some(144.0)
        );
        // Manual override survives a weight change
        assert_eq!(
            resolve_protein_target(Some(160.0), Some(72.0), Some(70.0), None),
            Some(160.0)
        );
        // No weight: fall back to the most recent prior weight
        assert_eq!(resolve_protein_target(None, None, None, Some(80.0)), Some(160.0));
        assert_eq!(resolve_protein_target(None, None, None, None), None);
        assert_eq!(resolve_protein_target(Some(150.0), None, None, Some(80.0)), Some(150.0));
    }

    #[test]
    fn test_eaten_sum_after_each_mutation() {
        let db = Database::open_in_memory().unwrap();
        let a = db.add_food_entry(food(day(1), 400.0, Some(30.0))).unwrap();
        let b = db.add_food_entry(food(day(1), 650.0, Some(20.0))).unwrap();
        let record = db.get_record(day(1)).unwrap().unwrap();
        assert!((record.calories_eaten - 1050.0).abs() < 0.01);
        assert!((record.protein_total_g - 50.0).abs() < 0.01);

        db.update_food_entry(
            b.id,
            UpdateFoodEntry {
                calories: Some(600.0),
                ..UpdateFoodEntry::default()
            },
        )
        .unwrap();
        let record = db.get_record(day(1)).unwrap().unwrap();
        assert!((record.calories_eaten - 1000.0).abs() < 0.01);

        assert!(db.delete_food_entry(a.id).unwrap());
        let record = db.get_record(day(1)).unwrap().unwrap();
        assert!((record.calories_eaten - 600.0).abs() < 0.01);
        assert!((record.protein_total_g - 20.0).abs() < 0.01);
    }

    #[test]
    fn test_first_entry_creates_record_with_current_mode() {
        let db = Database::open_in_memory().unwrap();
        set_mode(&db, WeightMode::LossGentle);
        db.add_food_entry(food(day(3), 500.0, None)).unwrap();

        let record = db.get_record(day(3)).unwrap().unwrap();
        assert_eq!(record.mode, WeightMode::LossGentle);
        // Fallback baseline 3000 * 0.90
        assert!((record.daily_calorie_target - 2700.0).abs() < 0.01);
    }

    #[test]
    fn test_invalid_entry_rejected_before_write() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.add_food_entry(food(day(1), 0.0, None)).is_err());
        assert!(db.get_record(day(1)).unwrap().is_none());
    }

    #[test]
    fn test_target_uses_fallback_with_few_days() {
        let db = Database::open_in_memory().unwrap();
        for d in 1..=6 {
            burn(&db, day(d), 2000.0);
        }
        let record = db.get_record(day(6)).unwrap().unwrap();
        assert!((record.daily_calorie_target - 3000.0).abs() < 0.01);
    }

    #[test]
    fn test_maintenance_target_is_rolling_average() {
        let db = Database::open_in_memory().unwrap();
        for d in 1..=7 {
            burn(&db, day(d), 2200.0 + f64::from(d) * 10.0);
        }
        let record = db.get_record(day(7)).unwrap().unwrap();
        assert!((record.daily_calorie_target - 2240.0).abs() < 0.01);
    }

    #[test]
    fn test_standard_loss_target() {
        let db = Database::open_in_memory().unwrap();
        set_mode(&db, WeightMode::LossStandard);
        for d in 1..=7 {
            burn(&db, day(d), 2000.0);
        }
        let record = db.get_record(day(7)).unwrap().unwrap();
        assert!((record.daily_calorie_target - 1700.0).abs() < 0.01);
    }

    #[test]
    fn test_burn_change_propagates_forward() {
        let db = Database::open_in_memory().unwrap();
        for d in 1..=6 {
            burn(&db, day(d), 2000.0);
        }
        db.add_food_entry(food(day(10), 500.0, None)).unwrap();
        let before = db.get_record(day(10)).unwrap().unwrap();
        assert!((before.daily_calorie_target - 3000.0).abs() < 0.01);

        // Seventh day of data makes day 10's window leave the fallback
        burn(&db, day(7), 2000.0);
        let after = db.get_record(day(10)).unwrap().unwrap();
        assert!((after.daily_calorie_target - 2000.0).abs() < 0.01);
    }

    #[test]
    fn test_protein_auto_fill_from_weight() {
        let db = Database::open_in_memory().unwrap();
        let record = weight(&db, day(1), 70.0);
        assert_eq!(record.protein_target_g, Some(140.0));
    }

    #[test]
    fn test_protein_follows_weight_when_auto_derived() {
        let db = Database::open_in_memory().unwrap();
        weight(&db, day(1), 70.0);
        let record = weight(&db, day(1), 72.0);
        assert_eq!(record.protein_target_g, Some(144.0));
    }

    #[test]
    fn test_protein_manual_override_preserved() {
        let db = Database::open_in_memory().unwrap();
        weight(&db, day(1), 70.0);
        db.upsert_metrics(
            day(1),
            &MetricUpdate {
                protein_target_g: Some(160.0),
                ..MetricUpdate::default()
            },
        )
        .unwrap();
        let record = weight(&db, day(1), 72.0);
        assert_eq!(record.protein_target_g, Some(160.0));
    }

    #[test]
    fn test_explicit_target_wins_in_same_update() {
        let db = Database::open_in_memory().unwrap();
        weight(&db, day(1), 70.0);
        let record = db
            .upsert_metrics(
                day(1),
                &MetricUpdate {
                    weight_kg: Some(75.0),
                    protein_target_g: Some(140.0),
                    ..MetricUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(record.protein_target_g, Some(140.0));
    }

    #[test]
    fn test_protein_from_prior_weight() {
        let db = Database::open_in_memory().unwrap();
        weight(&db, day(1), 80.0);
        db.add_food_entry(food(day(2), 300.0, Some(10.0))).unwrap();
        let record = db.get_record(day(2)).unwrap().unwrap();
        assert_eq!(record.protein_target_g, Some(160.0));
    }

    #[test]
    fn test_inherited_protein_follows_first_weight_of_day() {
        let db = Database::open_in_memory().unwrap();
        weight(&db, day(1), 80.0);
        db.add_food_entry(food(day(2), 300.0, Some(10.0))).unwrap();
        let record = weight(&db, day(2), 70.0);
        assert_eq!(record.protein_target_g, Some(140.0));
    }

    #[test]
    fn test_manual_target_survives_first_weight_of_day() {
        let db = Database::open_in_memory().unwrap();
        weight(&db, day(1), 80.0);
        db.upsert_metrics(
            day(2),
            &MetricUpdate {
                protein_target_g: Some(150.0),
                ..MetricUpdate::default()
            },
        )
        .unwrap();
        let record = weight(&db, day(2), 70.0);
        assert_eq!(record.protein_target_g, Some(150.0));
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        for d in 1..=8 {
            burn(&db, day(d), 2100.0 + f64::from(d));
        }
        db.add_food_entry(food(day(8), 900.0, Some(40.0))).unwrap();
        let first = db.recompute_totals(day(8)).unwrap().unwrap();
        let second = db.recompute_totals(day(8)).unwrap().unwrap();
        assert!((first.calories_eaten - second.calories_eaten).abs() < f64::EPSILON);
        assert!((first.daily_calorie_target - second.daily_calorie_target).abs() < f64::EPSILON);
        assert_eq!(first.protein_target_g, second.protein_target_g);
        assert!(db.recompute_totals(day(20)).unwrap().is_none());
    }

    #[test]
    fn test_delete_last_entry_resets_totals() {
        let db = Database::open_in_memory().unwrap();
        let entry = db.add_food_entry(food(day(1), 800.0, Some(25.0))).unwrap();
        assert!(db.delete_food_entry(entry.id).unwrap());
        let record = db.get_record(day(1)).unwrap().unwrap();
        assert!(record.calories_eaten.abs() < f64::EPSILON);
        assert!(record.protein_total_g.abs() < f64::EPSILON);
        assert!((record.daily_calorie_target - 3000.0).abs() < 0.01);
        assert!(!db.delete_food_entry(entry.id).unwrap());
    }

    #[test]
    fn test_moving_entry_recomputes_both_days() {
        let db = Database::open_in_memory().unwrap();
        let entry = db.add_food_entry(food(day(1), 500.0, None)).unwrap();
        db.add_food_entry(food(day(1), 200.0, None)).unwrap();
        let moved = db
            .update_food_entry(
                entry.id,
                UpdateFoodEntry {
                    date: Some(day(2)),
                    ..UpdateFoodEntry::default()
                },
            )
            .unwrap();
        assert_eq!(moved.date, day(2));
        let d1 = db.get_record(day(1)).unwrap().unwrap();
        let d2 = db.get_record(day(2)).unwrap().unwrap();
        assert!((d1.calories_eaten - 200.0).abs() < 0.01);
        assert!((d2.calories_eaten - 500.0).abs() < 0.01);
    }

    #[test]
    fn test_empty_update_rejected() {
        let db = Database::open_in_memory().unwrap();
        let entry = db.add_food_entry(food(day(1), 500.0, None)).unwrap();
        assert!(
            db.update_food_entry(entry.id, UpdateFoodEntry::default())
                .is_err()
        );
        assert!(
            db.update_food_entry(
                999,
                UpdateFoodEntry {
                    calories: Some(10.0),
                    ..UpdateFoodEntry::default()
                }
            )
            .is_err()
        );
    }

    #[test]
    fn test_settings_change_recalculates_targets() {
        let db = Database::open_in_memory().unwrap();
        for d in 1..=7 {
            burn(&db, day(d), 2000.0);
        }
        let record = db.get_record(day(7)).unwrap().unwrap();
        assert_eq!(record.mode, WeightMode::Maintenance);
        assert!((record.daily_calorie_target - 2000.0).abs() < 0.01);

        db.upsert_metrics(
            day(7),
            &MetricUpdate {
                mode: Some(WeightMode::LossGentle),
                ..MetricUpdate::default()
            },
        )
        .unwrap();
        db.update_settings(&SettingsUpdate {
            loss_gentle_percent: Some(0.25),
            ..SettingsUpdate::default()
        })
        .unwrap();
        let record = db.get_record(day(7)).unwrap().unwrap();
        assert!((record.daily_calorie_target - 1500.0).abs() < 0.01);
    }

    #[test]
    fn test_invalid_settings_leave_state_unchanged() {
        let db = Database::open_in_memory().unwrap();
        assert!(
            db.update_settings(&SettingsUpdate {
                loss_standard_percent: Some(1.2),
                ..SettingsUpdate::default()
            })
            .is_err()
        );
        assert!(db.load_settings().unwrap().is_none());
    }

    #[test]
    fn test_recalculate_all_targets_counts_records() {
        let db = Database::open_in_memory().unwrap();
        burn(&db, day(1), 2000.0);
        burn(&db, day(2), 2000.0);
        db.add_food_entry(food(day(5), 100.0, None)).unwrap();
        assert_eq!(db.recalculate_all_targets().unwrap(), 3);
    }

    #[test]
    fn test_clear_day_removes_record_and_entries() {
        let db = Database::open_in_memory().unwrap();
        db.add_food_entry(food(day(1), 100.0, None)).unwrap();
        db.add_food_entry(food(day(1), 200.0, None)).unwrap();

        let cleared = db.clear_day(day(1)).unwrap();
        assert!(cleared.record_deleted);
        assert_eq!(cleared.entries_deleted, 2);
        assert!(db.get_record(day(1)).unwrap().is_none());
        assert!(db.entries_for_date(day(1)).unwrap().is_empty());

        let again = db.clear_day(day(1)).unwrap();
        assert!(!again.record_deleted);
        assert_eq!(again.entries_deleted, 0);
    }

    #[test]
    fn test_clear_day_propagates_to_later_days() {
        let db = Database::open_in_memory().unwrap();
        for d in 1..=7 {
            burn(&db, day(d), 2000.0);
        }
        let record = db.get_record(day(7)).unwrap().unwrap();
        assert!((record.daily_calorie_target - 2000.0).abs() < 0.01);

        db.clear_day(day(1)).unwrap();
        let record = db.get_record(day(7)).unwrap().unwrap();
        assert!((record.daily_calorie_target - 3000.0).abs() < 0.01);
    }

    #[test]
    fn test_metric_upsert_creates_settings() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.load_settings().unwrap().is_none());
        burn(&db, day(1), 2500.0);
        assert!(db.load_settings().unwrap().is_some());
    }

    #[test]
    fn test_invalid_metrics_rejected() {
        let db = Database::open_in_memory().unwrap();
        assert!(
            db.upsert_metrics(
                day(1),
                &MetricUpdate {
                    weight_kg: Some(-3.0),
                    ..MetricUpdate::default()
                }
            )
            .is_err()
        );
        assert!(db.get_record(day(1)).unwrap().is_none());
    }
}
