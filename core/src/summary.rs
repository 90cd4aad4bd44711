use anyhow::Result;
use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::aggregation::{Aggregates, WindowStats, aggregates};
use crate::db::Database;
use crate::models::{DailyRecord, FoodEntry, WeightMode};
use crate::rolling::{RollingAverage, window_start};
use crate::settings::Settings;
use crate::target::{deficit_percent, static_target};

/// Everything shown for a single day.
#[derive(Debug, Clone, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub has_record: bool,
    pub calories_eaten: f64,
    pub calories_burned_total: Option<f64>,
    /// Eaten minus burned; a missing burn counts as zero.
    pub calorie_balance: f64,
    pub daily_calorie_target: f64,
    pub percentage_of_target: f64,
    pub remaining_to_target: f64,
    pub mode: WeightMode,
    pub mode_name: &'static str,
    pub steps: Option<i64>,
    pub weight_kg: Option<f64>,
    pub protein_total_g: f64,
    pub protein_target_g: Option<f64>,
    pub protein_percentage: Option<f64>,
    pub rolling_burn_avg: f64,
    pub rolling_days_with_data: usize,
    pub rolling_fallback: bool,
    pub deficit_percent: f64,
    pub maintenance_window_days: i64,
    pub last_7_days: WindowStats,
    pub last_30_days: WindowStats,
    pub entries: Vec<FoodEntry>,
    pub summary_text: String,
}

/// `2240.4` -> `"2,240"`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn format_kcal(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if rounded < 0 {
        out.insert(0, '-');
    }
    out
}

fn percent_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole * 100.0 } else { 0.0 }
}

fn narrative(
    rolling: &RollingAverage,
    settings: &Settings,
    mode: WeightMode,
    target: f64,
    eaten: f64,
    has_record: bool,
) -> String {
    let mut text = String::new();
    if !has_record {
        text.push_str("No data for today yet. ");
        text.push_str(&format!(
            "Your target is based on your maintenance setting of {} kcal. ",
            format_kcal(settings.maintenance_calories)
        ));
    } else if rolling.fallback {
        text.push_str(&format!(
            "Only {} of the last {} days have burn data (7 needed), so your maintenance \
             setting of {} kcal is used as the baseline. ",
            rolling.days_with_data,
            rolling.window_days,
            format_kcal(settings.maintenance_calories)
        ));
    } else {
        let avg = format_kcal(rolling.average);
        text.push_str(&format!(
            "Based on an average burn of {avg} kcal/day over the last {} days, your \
             maintenance is ~{avg} kcal. ",
            rolling.window_days
        ));
    }

    text.push_str(&format!("In {} mode, today's target is {} kcal", mode.display_name(), format_kcal(target)));
    if mode.is_loss() && has_record {
        text.push_str(&format!(" ({:.0}% deficit)", deficit_percent(settings, mode) * 100.0));
    }
    text.push_str(". ");

    if eaten > 0.0 {
        text.push_str(&format!(
            "You've eaten {} kcal ({:.0}% of target).",
            format_kcal(eaten),
            percent_of(eaten, target)
        ));
    } else {
        text.push_str("No calories logged yet.");
    }
    text
}

impl Database {
    /// Build the day summary. Reads only; settings are not materialized.
    pub fn daily_summary(&self, date: NaiveDate) -> Result<DailySummary> {
        let settings = self.settings_or_default()?;
        let record = self.get_record(date)?;
        let rolling = self.rolling_average(date, &settings)?;
        let entries = self.entries_for_date(date)?;

        let history = self.records_between(window_start(date, 30), date)?;
        let Aggregates {
            last_7_days,
            last_30_days,
        } = aggregates(&history, date);

        let (mode, target, eaten, protein, burn, weight, steps, protein_target) = match &record {
            Some(r) => (
                r.mode,
                r.daily_calorie_target,
                r.calories_eaten,
                r.protein_total_g,
                r.calories_burned_total,
                r.weight_kg,
                r.steps,
                r.protein_target_g,
            ),
            None => {
                let mode = settings.current_mode;
                (mode, static_target(&settings, mode), 0.0, 0.0, None, None, None, None)
            }
        };

        let summary_text = narrative(&rolling, &settings, mode, target, eaten, record.is_some());
        Ok(DailySummary {
            date,
            has_record: record.is_some(),
            calories_eaten: eaten,
            calories_burned_total: burn,
            calorie_balance: eaten - burn.unwrap_or(0.0),
            daily_calorie_target: target,
            percentage_of_target: percent_of(eaten, target),
            remaining_to_target: target - eaten,
            mode,
            mode_name: mode.display_name(),
            steps,
            weight_kg: weight,
            protein_total_g: protein,
            protein_target_g: protein_target,
            protein_percentage: protein_target
                .filter(|t| *t > 0.0)
                .map(|t| percent_of(protein, t)),
            rolling_burn_avg: rolling.average,
            rolling_days_with_data: rolling.days_with_data,
            rolling_fallback: rolling.fallback,
            deficit_percent: deficit_percent(&settings, mode),
            maintenance_window_days: rolling.window_days,
            last_7_days,
            last_30_days,
            entries,
            summary_text,
        })
    }

    /// Records for the `days` days ending on `end`, newest first.
    pub fn history(&self, end: NaiveDate, days: u32) -> Result<Vec<DailyRecord>> {
        let start = end
            .checked_sub_days(Days::new(u64::from(days.saturating_sub(1))))
            .unwrap_or(NaiveDate::MIN);
        let mut records = self.records_between(start, end)?;
        records.reverse();
        Ok(records)
    }
}
