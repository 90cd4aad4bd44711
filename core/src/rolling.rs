//! Trailing-window average of daily total burn.

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::models::DailyRecord;
use crate::settings::{MIN_WINDOW_DAYS, Settings};

/// Days of burn data required before the average replaces the maintenance setting.
pub const MIN_DAYS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RollingAverage {
    pub average: f64,
    pub days_with_data: usize,
    pub window_days: i64,
    /// True when too few days had burn data and `maintenance_calories` was used.
    pub fallback: bool,
}

/// Window length actually used for a configured value.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn effective_window(window_days: i64) -> i64 {
    if window_days < MIN_DAYS as i64 {
        MIN_WINDOW_DAYS.max(MIN_DAYS as i64)
    } else {
        window_days
    }
}

/// First date of the window that ends on `date` (inclusive).
#[must_use]
pub fn window_start(date: NaiveDate, window_days: i64) -> NaiveDate {
    let back = u64::try_from(window_days - 1).unwrap_or(0);
    date.checked_sub_days(Days::new(back)).unwrap_or(NaiveDate::MIN)
}

/// Mean `calories_burned_total` over `[date - (W-1), date]`.
///
/// Records outside the window and records without a total burn are ignored.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rolling_burn_average(
    records: &[DailyRecord],
    date: NaiveDate,
    settings: &Settings,
) -> RollingAverage {
    let window_days = effective_window(settings.maintenance_window_days);
    let start = window_start(date, window_days);

    let burns: Vec<f64> = records
        .iter()
        .filter(|r| r.date >= start && r.date <= date)
        .filter_map(|r| r.calories_burned_total)
        .collect();

    if burns.len() < MIN_DAYS {
        return RollingAverage {
            average: settings.maintenance_calories,
            days_with_data: burns.len(),
            window_days,
            fallback: true,
        };
    }

    RollingAverage {
        average: burns.iter().sum::<f64>() / burns.len() as f64,
        days_with_data: burns.len(),
        window_days,
        fallback: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WeightMode;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, n).unwrap()
    }

    fn record(date: NaiveDate, burn: Option<f64>) -> DailyRecord {
        DailyRecord {
            id: 0,
            date,
            steps: None,
            weight_kg: None,
            calories_burned_total: burn,
            calories_burned_active: None,
            calories_burned_basal: None,
            calories_eaten: 0.0,
            daily_calorie_target: 0.0,
            mode: WeightMode::Maintenance,
            protein_total_g: 0.0,
            protein_target_g: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_fallback_below_minimum_days() {
        let records: Vec<_> = (1..=6).map(|d| record(day(d), Some(2000.0))).collect();
        let avg = rolling_burn_average(&records, day(6), &Settings::default());
        assert!(avg.fallback);
        assert_eq!(avg.days_with_data, 6);
        assert!((avg.average - 3000.0).abs() < 0.01);
    }

    #[test]
    fn test_average_with_enough_days() {
        let records: Vec<_> = (1..=7)
            .map(|d| record(day(d), Some(2000.0 + f64::from(d) * 100.0)))
            .collect();
        let avg = rolling_burn_average(&records, day(7), &Settings::default());
        assert!(!avg.fallback);
        assert_eq!(avg.days_with_data, 7);
        assert!((avg.average - 2400.0).abs() < 0.01);
    }

    #[test]
    fn test_null_burn_excluded_from_count_and_sum() {
        let mut records: Vec<_> = (1..=7).map(|d| record(day(d), Some(2100.0))).collect();
        records.push(record(day(8), None));
        records.push(record(day(9), None));
        let avg = rolling_burn_average(&records, day(9), &Settings::default());
        assert_eq!(avg.days_with_data, 7);
        assert!((avg.average - 2100.0).abs() < 0.01);
    }

    #[test]
    fn test_records_outside_window_ignored() {
        let settings = Settings {
            maintenance_window_days: 14,
            ..Settings::default()
        };
        // 1..=7 fall outside a 14-day window ending on the 25th
        let mut records: Vec<_> = (1..=7).map(|d| record(day(d), Some(5000.0))).collect();
        records.extend((12..=25).map(|d| record(day(d), Some(2000.0))));
        records.push(record(day(26), Some(9000.0)));
        let avg = rolling_burn_average(&records, day(25), &settings);
        assert_eq!(avg.window_days, 14);
        assert_eq!(avg.days_with_data, 14);
        assert!((avg.average - 2000.0).abs() < 0.01);
    }

    #[test]
    fn test_short_window_clamped() {
        assert_eq!(effective_window(5), 14);
        assert_eq!(effective_window(10), 10);
        assert_eq!(effective_window(21), 21);
        assert_eq!(window_start(day(21), 21), day(1));
    }
}
