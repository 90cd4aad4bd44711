//! Daily calorie target computation.
//!
//! Two tiers exist. The dynamic tier scales the rolling burn average by the
//! mode's deficit percentage and floors at [`DYNAMIC_FLOOR`]. The static tier
//! subtracts a fixed kcal deficit from `maintenance_calories` and floors at
//! [`STATIC_FLOOR`]; it seeds new records and summaries for days with no record.

use crate::models::WeightMode;
use crate::settings::Settings;

pub const DYNAMIC_FLOOR: f64 = 1500.0;
pub const STATIC_FLOOR: f64 = 1200.0;

/// Fraction of the baseline removed for `mode` (0 for maintenance).
#[must_use]
pub fn deficit_percent(settings: &Settings, mode: WeightMode) -> f64 {
    match mode {
        WeightMode::Maintenance => 0.0,
        WeightMode::LossGentle => settings.loss_gentle_percent,
        WeightMode::LossStandard => settings.loss_standard_percent,
        WeightMode::LossAggressive => settings.loss_aggressive_percent,
    }
}

#[must_use]
pub fn fixed_deficit(settings: &Settings, mode: WeightMode) -> f64 {
    match mode {
        WeightMode::Maintenance => 0.0,
        WeightMode::LossGentle => settings.deficit_gentle,
        WeightMode::LossStandard => settings.deficit_standard,
        WeightMode::LossAggressive => settings.deficit_aggressive,
    }
}

#[must_use]
pub fn dynamic_target(settings: &Settings, mode: WeightMode, baseline: f64) -> f64 {
    let target = baseline * (1.0 - deficit_percent(settings, mode));
    target.max(DYNAMIC_FLOOR)
}

#[must_use]
pub fn static_target(settings: &Settings, mode: WeightMode) -> f64 {
    let target = settings.maintenance_calories - fixed_deficit(settings, mode);
    target.max(STATIC_FLOOR)
}

/// Default protein target: 2 g per kg of body weight, rounded.
#[must_use]
pub fn protein_target_for(weight_kg: f64) -> f64 {
    (weight_kg * 2.0).round()
}
