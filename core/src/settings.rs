use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::models::WeightMode;

/// Shortest rolling window the settings will accept.
pub const MIN_WINDOW_DAYS: i64 = 14;

/// Global tracker configuration, stored as a single row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub maintenance_calories: f64,
    pub current_mode: WeightMode,
    pub deficit_gentle: f64,
    pub deficit_standard: f64,
    pub deficit_aggressive: f64,
    pub maintenance_window_days: i64,
    pub loss_gentle_percent: f64,
    pub loss_standard_percent: f64,
    pub loss_aggressive_percent: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            maintenance_calories: 3000.0,
            current_mode: WeightMode::Maintenance,
            deficit_gentle: 250.0,
            deficit_standard: 500.0,
            deficit_aggressive: 750.0,
            maintenance_window_days: 21,
            loss_gentle_percent: 0.10,
            loss_standard_percent: 0.15,
            loss_aggressive_percent: 0.20,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsUpdate {
    pub maintenance_calories: Option<f64>,
    pub current_mode: Option<WeightMode>,
    pub deficit_gentle: Option<f64>,
    pub deficit_standard: Option<f64>,
    pub deficit_aggressive: Option<f64>,
    pub maintenance_window_days: Option<i64>,
    pub loss_gentle_percent: Option<f64>,
    pub loss_standard_percent: Option<f64>,
    pub loss_aggressive_percent: Option<f64>,
}

impl SettingsUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.maintenance_calories.is_none()
            && self.current_mode.is_none()
            && self.deficit_gentle.is_none()
            && self.deficit_standard.is_none()
            && self.deficit_aggressive.is_none()
            && self.maintenance_window_days.is_none()
            && self.loss_gentle_percent.is_none()
            && self.loss_standard_percent.is_none()
            && self.loss_aggressive_percent.is_none()
    }
}

fn check_percent(label: &str, value: f64) -> Result<f64> {
    if !(0.0..1.0).contains(&value) {
        bail!("{label} must be a fraction in [0, 1), got {value}");
    }
    Ok(value)
}

fn check_deficit(label: &str, value: f64) -> Result<f64> {
    if !value.is_finite() || value < 0.0 {
        bail!("{label} must not be negative");
    }
    Ok(value)
}

impl Settings {
    /// Apply a partial update, validating every provided value.
    ///
    /// The rolling window is clamped up to [`MIN_WINDOW_DAYS`] rather than rejected.
    pub fn apply(&self, update: &SettingsUpdate) -> Result<Settings> {
        let mut next = self.clone();
        if let Some(m) = update.maintenance_calories {
            if !m.is_finite() || m <= 0.0 {
                bail!("Maintenance calories must be greater than 0");
            }
            next.maintenance_calories = m;
        }
        if let Some(mode) = update.current_mode {
            next.current_mode = mode;
        }
        if let Some(v) = update.deficit_gentle {
            next.deficit_gentle = check_deficit("Gentle deficit", v)?;
        }
        if let Some(v) = update.deficit_standard {
            next.deficit_standard = check_deficit("Standard deficit", v)?;
        }
        if let Some(v) = update.deficit_aggressive {
            next.deficit_aggressive = check_deficit("Aggressive deficit", v)?;
        }
        if let Some(w) = update.maintenance_window_days {
            next.maintenance_window_days = w.max(MIN_WINDOW_DAYS);
        }
        if let Some(p) = update.loss_gentle_percent {
            next.loss_gentle_percent = check_percent("Gentle loss percent", p)?;
        }
        if let Some(p) = update.loss_standard_percent {
            next.loss_standard_percent = check_percent("Standard loss percent", p)?;
        }
        if let Some(p) = update.loss_aggressive_percent {
            next.loss_aggressive_percent = check_percent("Aggressive loss percent", p)?;
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert!((s.maintenance_calories - 3000.0).abs() < 0.01);
        assert_eq!(s.current_mode, WeightMode::Maintenance);
        assert_eq!(s.maintenance_window_days, 21);
        assert!((s.loss_standard_percent - 0.15).abs() < f64::EPSILON);
        assert!((s.deficit_aggressive - 750.0).abs() < 0.01);
    }

    #[test]
    fn test_window_clamped_to_minimum() {
        let update = SettingsUpdate {
            maintenance_window_days: Some(10),
            ..SettingsUpdate::default()
        };
        let s = Settings::default().apply(&update).unwrap();
        assert_eq!(s.maintenance_window_days, 14);

        let update = SettingsUpdate {
            maintenance_window_days: Some(28),
            ..SettingsUpdate::default()
        };
        let s = Settings::default().apply(&update).unwrap();
        assert_eq!(s.maintenance_window_days, 28);
    }

    #[test]
    fn test_percent_out_of_range_rejected() {
        for bad in [1.0, 1.5, -0.1] {
            let update = SettingsUpdate {
                loss_gentle_percent: Some(bad),
                ..SettingsUpdate::default()
            };
            assert!(Settings::default().apply(&update).is_err());
        }
    }

    #[test]
    fn test_non_positive_maintenance_rejected() {
        let update = SettingsUpdate {
            maintenance_calories: Some(0.0),
            ..SettingsUpdate::default()
        };
        assert!(Settings::default().apply(&update).is_err());
    }

    #[test]
    fn test_apply_leaves_unset_fields() {
        let update = SettingsUpdate {
            current_mode: Some(WeightMode::LossGentle),
            ..SettingsUpdate::default()
        };
        let s = Settings::default().apply(&update).unwrap();
        assert_eq!(s.current_mode, WeightMode::LossGentle);
        assert_eq!(
            Settings {
                current_mode: WeightMode::Maintenance,
                ..s
            },
            Settings::default()
        );
        assert!(SettingsUpdate::default().is_empty());
    }
}
