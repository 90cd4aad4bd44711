use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use crate::models::{DailyRecord, FoodEntry, NewFoodEntry, UpdateFoodEntry, WeightMode};
use crate::settings::Settings;

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct Database {
    pub(crate) conn: Connection,
}

pub(crate) fn date_str(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date_column(idx: usize, value: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_mode_column(idx: usize, value: &str) -> rusqlite::Result<WeightMode> {
    WeightMode::parse(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e.into())
    })
}

const RECORD_COLUMNS: &str = "id, date, steps, weight_kg, calories_burned_total,
    calories_burned_active, calories_burned_basal, calories_eaten, daily_calorie_target,
    mode, protein_total_g, protein_target_g, created_at, updated_at";

const ENTRY_COLUMNS: &str = "id, uuid, date, time, description, calories, protein_g, place,
    star_flag, vl_flag, planned_slot, context_comments, created_at, updated_at";

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS settings (
                    id INTEGER PRIMARY KEY CHECK (id = 1),
                    maintenance_calories REAL NOT NULL,
                    current_mode TEXT NOT NULL,
                    deficit_gentle REAL NOT NULL,
                    deficit_standard REAL NOT NULL,
                    deficit_aggressive REAL NOT NULL,
                    maintenance_window_days INTEGER NOT NULL,
                    loss_gentle_percent REAL NOT NULL,
                    loss_standard_percent REAL NOT NULL,
                    loss_aggressive_percent REAL NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS daily_records (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    date TEXT NOT NULL UNIQUE,
                    steps INTEGER,
                    weight_kg REAL,
                    calories_burned_total REAL,
                    calories_burned_active REAL,
                    calories_burned_basal REAL,
                    calories_eaten REAL NOT NULL DEFAULT 0,
                    daily_calorie_target REAL NOT NULL,
                    mode TEXT NOT NULL,
                    protein_total_g REAL NOT NULL DEFAULT 0,
                    protein_target_g REAL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS food_entries (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    date TEXT NOT NULL REFERENCES daily_records(date) ON DELETE CASCADE,
                    time TEXT,
                    description TEXT,
                    calories REAL NOT NULL CHECK (calories > 0),
                    protein_g REAL,
                    place TEXT,
                    star_flag TEXT,
                    vl_flag TEXT,
                    planned_slot TEXT,
                    context_comments TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_food_entries_date ON food_entries(date);

                PRAGMA user_version = 1;",
            )?;
        }

        if version < 2 {
            // Marks rows written by the CSV importer so a re-import only replaces its own totals.
            self.conn.execute_batch(
                "ALTER TABLE food_entries ADD COLUMN imported INTEGER NOT NULL DEFAULT 0;
                PRAGMA user_version = 2;",
            )?;
        }

        Ok(())
    }

    // --- Row mapping helpers ---

    fn settings_from_row(row: &rusqlite::Row) -> rusqlite::Result<Settings> {
        let mode: String = row.get(1)?;
        Ok(Settings {
            maintenance_calories: row.get(0)?,
            current_mode: parse_mode_column(1, &mode)?,
            deficit_gentle: row.get(2)?,
            deficit_standard: row.get(3)?,
            deficit_aggressive: row.get(4)?,
            maintenance_window_days: row.get(5)?,
            loss_gentle_percent: row.get(6)?,
            loss_standard_percent: row.get(7)?,
            loss_aggressive_percent: row.get(8)?,
        })
    }

    fn record_from_row(row: &rusqlite::Row) -> rusqlite::Result<DailyRecord> {
        let date: String = row.get(1)?;
        let mode: String = row.get(9)?;
        Ok(DailyRecord {
            id: row.get(0)?,
            date: parse_date_column(1, &date)?,
            steps: row.get(2)?,
            weight_kg: row.get(3)?,
            calories_burned_total: row.get(4)?,
            calories_burned_active: row.get(5)?,
            calories_burned_basal: row.get(6)?,
            calories_eaten: row.get(7)?,
            daily_calorie_target: row.get(8)?,
            mode: parse_mode_column(9, &mode)?,
            protein_total_g: row.get(10)?,
            protein_target_g: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }

    fn entry_from_row(row: &rusqlite::Row) -> rusqlite::Result<FoodEntry> {
        let date: String = row.get(2)?;
        Ok(FoodEntry {
            id: row.get(0)?,
            uuid: row.get(1)?,
            date: parse_date_column(2, &date)?,
            time: row.get(3)?,
            description: row.get(4)?,
            calories: row.get(5)?,
            protein_g: row.get(6)?,
            place: row.get(7)?,
            star_flag: row.get(8)?,
            vl_flag: row.get(9)?,
            planned_slot: row.get(10)?,
            context_comments: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }

    // --- Settings ---

    pub fn load_settings(&self) -> Result<Option<Settings>> {
        self.conn
            .query_row(
                "SELECT maintenance_calories, current_mode, deficit_gentle, deficit_standard,
                        deficit_aggressive, maintenance_window_days, loss_gentle_percent,
                        loss_standard_percent, loss_aggressive_percent
                 FROM settings WHERE id = 1",
                [],
                Self::settings_from_row,
            )
            .optional()
            .context("Failed to load settings")
    }

    /// Stored settings, or the defaults when none have been saved. Never writes.
    pub fn settings_or_default(&self) -> Result<Settings> {
        Ok(self.load_settings()?.unwrap_or_default())
    }

    /// Stored settings, inserting the defaults on first use.
    pub fn get_or_create_settings(&self) -> Result<Settings> {
        if let Some(settings) = self.load_settings()? {
            return Ok(settings);
        }
        let settings = Settings::default();
        self.save_settings(&settings)?;
        tracing::debug!("created default settings");
        Ok(settings)
    }

    pub(crate) fn save_settings(&self, settings: &Settings) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO settings (id, maintenance_calories, current_mode, deficit_gentle,
                deficit_standard, deficit_aggressive, maintenance_window_days,
                loss_gentle_percent, loss_standard_percent, loss_aggressive_percent,
                created_at, updated_at)
             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
             ON CONFLICT(id) DO UPDATE SET
                maintenance_calories = excluded.maintenance_calories,
                current_mode = excluded.current_mode,
                deficit_gentle = excluded.deficit_gentle,
                deficit_standard = excluded.deficit_standard,
                deficit_aggressive = excluded.deficit_aggressive,
                maintenance_window_days = excluded.maintenance_window_days,
                loss_gentle_percent = excluded.loss_gentle_percent,
                loss_standard_percent = excluded.loss_standard_percent,
                loss_aggressive_percent = excluded.loss_aggressive_percent,
                updated_at = excluded.updated_at",
            params![
                settings.maintenance_calories,
                settings.current_mode.as_str(),
                settings.deficit_gentle,
                settings.deficit_standard,
                settings.deficit_aggressive,
                settings.maintenance_window_days,
                settings.loss_gentle_percent,
                settings.loss_standard_percent,
                settings.loss_aggressive_percent,
                now,
            ],
        )?;
        Ok(())
    }

    // --- Daily records ---

    pub fn get_record(&self, date: NaiveDate) -> Result<Option<DailyRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM daily_records WHERE date = ?1"),
                params![date_str(date)],
                Self::record_from_row,
            )
            .optional()
            .context("Failed to load daily record")
    }

    /// Records with `start <= date <= end`, oldest first.
    pub fn records_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailyRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM daily_records
             WHERE date >= ?1 AND date <= ?2 ORDER BY date"
        ))?;
        let records = stmt
            .query_map(params![date_str(start), date_str(end)], Self::record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn record_dates(&self) -> Result<Vec<NaiveDate>> {
        let mut stmt = self
            .conn
            .prepare("SELECT date FROM daily_records ORDER BY date")?;
        let dates = stmt
            .query_map([], |row| {
                let s: String = row.get(0)?;
                parse_date_column(0, &s)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(dates)
    }

    /// Most recent non-null weight recorded strictly before `date`.
    pub fn latest_weight_before(&self, date: NaiveDate) -> Result<Option<f64>> {
        self.conn
            .query_row(
                "SELECT weight_kg FROM daily_records
                 WHERE date < ?1 AND weight_kg IS NOT NULL
                 ORDER BY date DESC LIMIT 1",
                params![date_str(date)],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to look up previous weight")
    }

    /// Insert a blank record for `date` with the given mode and target.
    pub(crate) fn insert_record(
        &self,
        date: NaiveDate,
        mode: WeightMode,
        target: f64,
    ) -> Result<DailyRecord> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO daily_records (date, calories_eaten, daily_calorie_target, mode,
                protein_total_g, created_at, updated_at)
             VALUES (?1, 0, ?2, ?3, 0, ?4, ?4)",
            params![date_str(date), target, mode.as_str(), now],
        )?;
        self.get_record(date)?
            .context("Daily record not found after insert")
    }

    /// Write every mutable field of `record` back, keyed by date.
    pub(crate) fn save_record(&self, record: &DailyRecord) -> Result<DailyRecord> {
        let now = Local::now().to_rfc3339();
        let rows = self.conn.execute(
            "UPDATE daily_records SET
                steps = ?1,
                weight_kg = ?2,
                calories_burned_total = ?3,
                calories_burned_active = ?4,
                calories_burned_basal = ?5,
                calories_eaten = ?6,
                daily_calorie_target = ?7,
                mode = ?8,
                protein_total_g = ?9,
                protein_target_g = ?10,
                updated_at = ?11
             WHERE date = ?12",
            params![
                record.steps,
                record.weight_kg,
                record.calories_burned_total,
                record.calories_burned_active,
                record.calories_burned_basal,
                record.calories_eaten,
                record.daily_calorie_target,
                record.mode.as_str(),
                record.protein_total_g,
                record.protein_target_g,
                now,
                date_str(record.date),
            ],
        )?;
        if rows == 0 {
            anyhow::bail!("Daily record for {} not found", date_str(record.date));
        }
        self.get_record(record.date)?
            .context("Daily record not found after update")
    }

    /// Delete the record for `date`; its food entries go with it.
    pub(crate) fn remove_record(&self, date: NaiveDate) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM daily_records WHERE date = ?1",
            params![date_str(date)],
        )?;
        Ok(rows > 0)
    }

    // --- Food entries ---

    pub(crate) fn insert_food_entry(&self, entry: &NewFoodEntry) -> Result<FoodEntry> {
        self.insert_entry_row(entry, false)
    }

    /// Insert an entry owned by the CSV importer.
    pub(crate) fn insert_imported_entry(&self, entry: &NewFoodEntry) -> Result<FoodEntry> {
        self.insert_entry_row(entry, true)
    }

    fn insert_entry_row(&self, entry: &NewFoodEntry, imported: bool) -> Result<FoodEntry> {
        let now = Local::now().to_rfc3339();
        let uuid = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO food_entries (uuid, date, time, description, calories, protein_g,
                place, star_flag, vl_flag, planned_slot, context_comments, created_at, updated_at,
                imported)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12, ?13)",
            params![
                uuid,
                date_str(entry.date),
                entry.time,
                entry.description,
                entry.calories,
                entry.protein_g,
                entry.place,
                entry.star_flag,
                entry.vl_flag,
                entry.planned_slot,
                entry.context_comments,
                now,
                imported,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_food_entry(id)
    }

    pub fn find_food_entry(&self, id: i64) -> Result<Option<FoodEntry>> {
        self.conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM food_entries WHERE id = ?1"),
                params![id],
                Self::entry_from_row,
            )
            .optional()
            .context("Failed to load food entry")
    }

    pub fn get_food_entry(&self, id: i64) -> Result<FoodEntry> {
        self.find_food_entry(id)?
            .with_context(|| format!("Food entry {id} not found"))
    }

    /// Entries for `date` ordered by time of day; untimed entries sort last.
    pub fn entries_for_date(&self, date: NaiveDate) -> Result<Vec<FoodEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM food_entries
             WHERE date = ?1
             ORDER BY time IS NULL, time, id"
        ))?;
        let entries = stmt
            .query_map(params![date_str(date)], Self::entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub(crate) fn apply_food_entry_update(&self, id: i64, update: &UpdateFoodEntry) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "UPDATE food_entries SET
                date = COALESCE(?1, date),
                time = COALESCE(?2, time),
                description = COALESCE(?3, description),
                calories = COALESCE(?4, calories),
                protein_g = COALESCE(?5, protein_g),
                place = COALESCE(?6, place),
                star_flag = COALESCE(?7, star_flag),
                vl_flag = COALESCE(?8, vl_flag),
                planned_slot = COALESCE(?9, planned_slot),
                context_comments = COALESCE(?10, context_comments),
                updated_at = ?11
             WHERE id = ?12",
            params![
                update.date.map(date_str),
                update.time,
                update.description,
                update.calories,
                update.protein_g,
                update.place,
                update.star_flag,
                update.vl_flag,
                update.planned_slot,
                update.context_comments,
                now,
                id,
            ],
        )?;
        Ok(())
    }

    pub(crate) fn remove_food_entry(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM food_entries WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    pub(crate) fn remove_imported_entries(&self, date: NaiveDate) -> Result<usize> {
        let rows = self.conn.execute(
            "DELETE FROM food_entries WHERE date = ?1 AND imported = 1",
            params![date_str(date)],
        )?;
        Ok(rows)
    }

    /// `(calories, protein)` summed over the date's entries, zero when there are none.
    pub fn entry_totals(&self, date: NaiveDate) -> Result<(f64, f64)> {
        let totals = self.conn.query_row(
            "SELECT COALESCE(SUM(calories), 0), COALESCE(SUM(protein_g), 0)
             FROM food_entries WHERE date = ?1",
            params![date_str(date)],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(totals)
    }

    pub fn count_entries(&self, date: NaiveDate) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM food_entries WHERE date = ?1",
            params![date_str(date)],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}
