//! Read-only 7-day and 30-day rollups.

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::DailyRecord;
use crate::rolling::window_start;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowStats {
    pub days: i64,
    pub total_burn: f64,
    pub total_eaten: f64,
    /// Totals divided by the full window length, missing days count as zero.
    pub avg_burn: f64,
    pub avg_eaten: f64,
    /// Mean of eaten minus burn over days that have a burn value.
    pub avg_deficit: f64,
    pub avg_weight: Option<f64>,
    pub avg_protein: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregates {
    pub last_7_days: WindowStats,
    pub last_30_days: WindowStats,
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Stats for the `days`-long window ending at `end` (inclusive).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn window_stats(records: &[DailyRecord], end: NaiveDate, days: i64) -> WindowStats {
    let start = window_start(end, days);
    let in_window: Vec<&DailyRecord> = records
        .iter()
        .filter(|r| r.date >= start && r.date <= end)
        .collect();

    let total_burn: f64 = in_window
        .iter()
        .filter_map(|r| r.calories_burned_total)
        .sum();
    let total_eaten: f64 = in_window.iter().map(|r| r.calories_eaten).sum();

    let deficits: Vec<f64> = in_window.iter().filter_map(|r| r.calorie_balance()).collect();
    let weights: Vec<f64> = in_window.iter().filter_map(|r| r.weight_kg).collect();
    let proteins: Vec<f64> = in_window.iter().map(|r| r.protein_total_g).collect();

    let length = days.max(1) as f64;
    WindowStats {
        days,
        total_burn,
        total_eaten,
        avg_burn: total_burn / length,
        avg_eaten: total_eaten / length,
        avg_deficit: mean(&deficits).unwrap_or(0.0),
        avg_weight: mean(&weights),
        avg_protein: mean(&proteins),
    }
}

#[must_use]
pub fn aggregates(records: &[DailyRecord], end: NaiveDate) -> Aggregates {
    Aggregates {
        last_7_days: window_stats(records, end, 7),
        last_30_days: window_stats(records, end, 30),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WeightMode;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, n).unwrap()
    }

    fn record(date: NaiveDate, eaten: f64, burn: Option<f64>, weight: Option<f64>) -> DailyRecord {
        DailyRecord {
            id: 0,
            date,
            steps: None,
            weight_kg: weight,
            calories_burned_total: burn,
            calories_burned_active: None,
            calories_burned_basal: None,
            calories_eaten: eaten,
            daily_calorie_target: 0.0,
            mode: WeightMode::Maintenance,
            protein_total_g: eaten / 20.0,
            protein_target_g: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_deficit_only_over_days_with_burn() {
        let records = vec![
            record(day(8), 2000.0, Some(2500.0), None),
            record(day(9), 1800.0, None, None),
            record(day(10), 2200.0, Some(2400.0), None),
        ];
        let stats = window_stats(&records, day(10), 7);
        // (-500 + -200) / 2
        assert!((stats.avg_deficit + 350.0).abs() < 0.01);
    }

    #[test]
    fn test_week_with_two_missing_burns() {
        let records: Vec<DailyRecord> = (4..=10)
            .map(|d| {
                let burn = if d == 6 || d == 9 { None } else { Some(2500.0) };
                record(day(d), 2000.0, burn, None)
            })
            .collect();
        let stats = window_stats(&records, day(10), 7);
        // Five burn days, each eating 500 under the burn
        assert!((stats.avg_deficit + 500.0).abs() < 0.01);
        assert!((stats.avg_burn - 12500.0 / 7.0).abs() < 0.01);
        assert!((stats.total_eaten - 14000.0).abs() < 0.01);
    }

    #[test]
    fn test_burn_average_over_full_window() {
        let records = vec![
            record(day(9), 2000.0, Some(2800.0), None),
            record(day(10), 2000.0, Some(2800.0), None),
        ];
        let stats = window_stats(&records, day(10), 7);
        assert!((stats.total_burn - 5600.0).abs() < 0.01);
        assert!((stats.avg_burn - 800.0).abs() < 0.01);
        assert!((stats.avg_eaten - 4000.0 / 7.0).abs() < 0.01);
    }

    #[test]
    fn test_weight_average_skips_missing() {
        let records = vec![
            record(day(8), 0.0, None, Some(80.0)),
            record(day(9), 0.0, None, None),
            record(day(10), 0.0, None, Some(79.0)),
        ];
        let stats = window_stats(&records, day(10), 7);
        assert!((stats.avg_weight.unwrap() - 79.5).abs() < 0.01);
    }

    #[test]
    fn test_empty_window() {
        let stats = window_stats(&[], day(10), 30);
        assert!(stats.avg_burn.abs() < f64::EPSILON);
        assert!(stats.avg_deficit.abs() < f64::EPSILON);
        assert!(stats.avg_weight.is_none());
        assert!(stats.avg_protein.is_none());
    }

    #[test]
    fn test_thirty_day_window_reaches_further_back() {
        let records = vec![
            record(day(1), 2000.0, Some(2600.0), None),
            record(day(20), 2000.0, Some(2600.0), None),
        ];
        let agg = aggregates(&records, day(20));
        assert!((agg.last_7_days.total_eaten - 2000.0).abs() < 0.01);
        assert!((agg.last_30_days.total_eaten - 4000.0).abs() < 0.01);
        assert!((agg.last_30_days.avg_protein.unwrap() - 100.0).abs() < 0.01);
    }
}
