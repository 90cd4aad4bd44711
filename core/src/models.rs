use std::fmt;

use anyhow::{Result, bail};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Goal state that controls how far below the baseline burn a day's target sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeightMode {
    #[default]
    Maintenance,
    LossGentle,
    LossStandard,
    LossAggressive,
}

impl WeightMode {
    pub const ALL: [WeightMode; 4] = [
        WeightMode::Maintenance,
        WeightMode::LossGentle,
        WeightMode::LossStandard,
        WeightMode::LossAggressive,
    ];

    /// Stable storage code, also used on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Maintenance => "MAINTENANCE",
            Self::LossGentle => "LOSS_GENTLE",
            Self::LossStandard => "LOSS_STANDARD",
            Self::LossAggressive => "LOSS_AGGRESSIVE",
        }
    }

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Maintenance => "Maintenance",
            Self::LossGentle => "Gentle Weight Loss",
            Self::LossStandard => "Standard Weight Loss",
            Self::LossAggressive => "Aggressive Weight Loss",
        }
    }

    #[must_use]
    pub fn is_loss(self) -> bool {
        !matches!(self, Self::Maintenance)
    }

    /// Parse a mode from its storage code or a short alias (`gentle`, `loss-standard`, ...).
    pub fn parse(s: &str) -> Result<Self> {
        let normalized = s.trim().to_uppercase().replace('-', "_");
        match normalized.as_str() {
            "MAINTENANCE" | "MAINTAIN" => Ok(Self::Maintenance),
            "LOSS_GENTLE" | "GENTLE" => Ok(Self::LossGentle),
            "LOSS_STANDARD" | "STANDARD" => Ok(Self::LossStandard),
            "LOSS_AGGRESSIVE" | "AGGRESSIVE" => Ok(Self::LossAggressive),
            _ => bail!(
                "Invalid mode '{s}'. Must be one of: maintenance, gentle, standard, aggressive"
            ),
        }
    }
}

impl fmt::Display for WeightMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One calendar day of metrics plus the derived totals and target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyRecord {
    pub id: i64,
    pub date: NaiveDate,
    pub steps: Option<i64>,
    pub weight_kg: Option<f64>,
    pub calories_burned_total: Option<f64>,
    pub calories_burned_active: Option<f64>,
    pub calories_burned_basal: Option<f64>,
    pub calories_eaten: f64,
    pub daily_calorie_target: f64,
    pub mode: WeightMode,
    pub protein_total_g: f64,
    pub protein_target_g: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

impl DailyRecord {
    /// Eaten minus burned, when the day's burn is known.
    #[must_use]
    pub fn calorie_balance(&self) -> Option<f64> {
        self.calories_burned_total
            .map(|burn| self.calories_eaten - burn)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodEntry {
    pub id: i64,
    pub uuid: String,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub calories: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protein_g: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub star_flag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vl_flag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planned_slot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_comments: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewFoodEntry {
    pub date: NaiveDate,
    pub time: Option<String>,
    pub description: Option<String>,
    pub calories: f64,
    pub protein_g: Option<f64>,
    pub place: Option<String>,
    pub star_flag: Option<String>,
    pub vl_flag: Option<String>,
    pub planned_slot: Option<String>,
    pub context_comments: Option<String>,
}

/// Partial edit of a food entry; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateFoodEntry {
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub description: Option<String>,
    pub calories: Option<f64>,
    pub protein_g: Option<f64>,
    pub place: Option<String>,
    pub star_flag: Option<String>,
    pub vl_flag: Option<String>,
    pub planned_slot: Option<String>,
    pub context_comments: Option<String>,
}

impl UpdateFoodEntry {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.time.is_none()
            && self.description.is_none()
            && self.calories.is_none()
            && self.protein_g.is_none()
            && self.place.is_none()
            && self.star_flag.is_none()
            && self.vl_flag.is_none()
            && self.planned_slot.is_none()
            && self.context_comments.is_none()
    }
}

/// Metrics for one day; `None` fields keep whatever is stored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricUpdate {
    pub steps: Option<i64>,
    pub weight_kg: Option<f64>,
    pub calories_burned_total: Option<f64>,
    pub calories_burned_active: Option<f64>,
    pub calories_burned_basal: Option<f64>,
    pub mode: Option<WeightMode>,
    pub protein_target_g: Option<f64>,
}

impl MetricUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_none()
            && self.weight_kg.is_none()
            && self.calories_burned_total.is_none()
            && self.calories_burned_active.is_none()
            && self.calories_burned_basal.is_none()
            && self.mode.is_none()
            && self.protein_target_g.is_none()
    }
}

pub const MEAL_SLOTS: &[&str] = &["breakfast", "lunch", "dinner", "snack", "other"];

pub fn validate_meal_slot(slot: &str) -> Result<String> {
    let lower = slot.trim().to_lowercase();
    if MEAL_SLOTS.contains(&lower.as_str()) {
        Ok(lower)
    } else {
        bail!(
            "Invalid meal slot '{slot}'. Must be one of: {}",
            MEAL_SLOTS.join(", ")
        )
    }
}

/// `V` or `L`, stored upper-case. An empty string clears the flag.
pub fn validate_vl_flag(flag: &str) -> Result<String> {
    let upper = flag.trim().to_uppercase();
    match upper.as_str() {
        "" | "V" | "L" => Ok(upper),
        _ => bail!("Invalid V/L flag '{flag}'. Use 'V', 'L', or leave empty"),
    }
}

pub fn validate_star_flag(flag: &str) -> Result<String> {
    if flag.chars().count() > 1 {
        bail!("Star flag must be at most one character, got '{flag}'");
    }
    Ok(flag.to_string())
}

/// Times are stored as `HH:MM`; `H:MM` and `HH:MM:SS` are accepted and normalized.
pub fn validate_time(time: &str) -> Result<String> {
    let trimmed = time.trim();
    let parsed = NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|_| anyhow::anyhow!("Invalid time '{time}'. Use HH:MM"))?;
    Ok(parsed.format("%H:%M").to_string())
}

fn validate_calories(calories: f64) -> Result<()> {
    if !calories.is_finite() || calories <= 0.0 {
        bail!("Calories must be greater than 0");
    }
    Ok(())
}

fn validate_protein(protein_g: Option<f64>) -> Result<()> {
    if protein_g.is_some_and(|p| !p.is_finite() || p < 0.0) {
        bail!("Protein must not be negative");
    }
    Ok(())
}

fn normalize_opt(
    value: Option<String>,
    check: impl Fn(&str) -> Result<String>,
) -> Result<Option<String>> {
    value.map(|v| check(&v)).transpose()
}

/// Validate a new entry and normalize its slot, flag, and time fields.
pub fn normalize_new_food_entry(entry: NewFoodEntry) -> Result<NewFoodEntry> {
    validate_calories(entry.calories)?;
    validate_protein(entry.protein_g)?;
    Ok(NewFoodEntry {
        time: normalize_opt(entry.time, validate_time)?,
        star_flag: normalize_opt(entry.star_flag, validate_star_flag)?,
        vl_flag: normalize_opt(entry.vl_flag, validate_vl_flag)?,
        planned_slot: normalize_opt(entry.planned_slot, validate_meal_slot)?,
        ..entry
    })
}

pub fn normalize_food_entry_update(update: UpdateFoodEntry) -> Result<UpdateFoodEntry> {
    if let Some(calories) = update.calories {
        validate_calories(calories)?;
    }
    validate_protein(update.protein_g)?;
    Ok(UpdateFoodEntry {
        time: normalize_opt(update.time, validate_time)?,
        star_flag: normalize_opt(update.star_flag, validate_star_flag)?,
        vl_flag: normalize_opt(update.vl_flag, validate_vl_flag)?,
        planned_slot: normalize_opt(update.planned_slot, validate_meal_slot)?,
        ..update
    })
}

pub fn validate_metric_update(update: &MetricUpdate) -> Result<()> {
    if update.steps.is_some_and(|s| s < 0) {
        bail!("Steps must not be negative");
    }
    if update.weight_kg.is_some_and(|w| !w.is_finite() || w <= 0.0) {
        bail!("Weight must be greater than 0");
    }
    let burns = [
        ("Total burn", update.calories_burned_total),
        ("Active burn", update.calories_burned_active),
        ("Basal burn", update.calories_burned_basal),
    ];
    for (label, value) in burns {
        if value.is_some_and(|v| !v.is_finite() || v < 0.0) {
            bail!("{label} must not be negative");
        }
    }
    if update
        .protein_target_g
        .is_some_and(|p| !p.is_finite() || p < 0.0)
    {
        bail!("Protein target must not be negative");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(calories: f64) -> NewFoodEntry {
        NewFoodEntry {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            calories,
            ..NewFoodEntry::default()
        }
    }

    #[test]
    fn test_mode_parse_aliases() {
        assert_eq!(WeightMode::parse("maintenance").unwrap(), WeightMode::Maintenance);
        assert_eq!(WeightMode::parse("gentle").unwrap(), WeightMode::LossGentle);
        assert_eq!(WeightMode::parse("loss-standard").unwrap(), WeightMode::LossStandard);
        assert_eq!(WeightMode::parse("LOSS_AGGRESSIVE").unwrap(), WeightMode::LossAggressive);
        assert!(WeightMode::parse("bulk").is_err());
    }

    #[test]
    fn test_mode_storage_code_roundtrips() {
        for mode in WeightMode::ALL {
            assert_eq!(WeightMode::parse(mode.as_str()).unwrap(), mode);
        }
    }

    #[test]
    fn test_mode_serializes_as_code() {
        let json = serde_json::to_string(&WeightMode::LossGentle).unwrap();
        assert_eq!(json, "\"LOSS_GENTLE\"");
    }

    #[test]
    fn test_display_names() {
        assert_eq!(WeightMode::Maintenance.display_name(), "Maintenance");
        assert_eq!(WeightMode::LossStandard.display_name(), "Standard Weight Loss");
        assert!(!WeightMode::Maintenance.is_loss());
        assert!(WeightMode::LossGentle.is_loss());
    }

    #[test]
    fn test_calorie_balance() {
        let record = DailyRecord {
            id: 1,
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            steps: None,
            weight_kg: None,
            calories_burned_total: Some(2500.0),
            calories_burned_active: None,
            calories_burned_basal: None,
            calories_eaten: 2000.0,
            daily_calorie_target: 2500.0,
            mode: WeightMode::Maintenance,
            protein_total_g: 0.0,
            protein_target_g: None,
            created_at: String::new(),
            updated_at: String::new(),
        };
        assert!((record.calorie_balance().unwrap() + 500.0).abs() < 0.01);

        let no_burn = DailyRecord {
            calories_burned_total: None,
            ..record
        };
        assert!(no_burn.calorie_balance().is_none());
    }

    #[test]
    fn test_meal_slot_case_insensitive() {
        assert_eq!(validate_meal_slot("Breakfast").unwrap(), "breakfast");
        assert_eq!(validate_meal_slot("OTHER").unwrap(), "other");
        assert!(validate_meal_slot("brunch").is_err());
    }

    #[test]
    fn test_vl_flag() {
        assert_eq!(validate_vl_flag("v").unwrap(), "V");
        assert_eq!(validate_vl_flag("L").unwrap(), "L");
        assert_eq!(validate_vl_flag("").unwrap(), "");
        assert!(validate_vl_flag("X").is_err());
    }

    #[test]
    fn test_star_flag_single_char() {
        assert_eq!(validate_star_flag("*").unwrap(), "*");
        assert_eq!(validate_star_flag("").unwrap(), "");
        assert!(validate_star_flag("**").is_err());
    }

    #[test]
    fn test_time_normalized() {
        assert_eq!(validate_time("7:05").unwrap(), "07:05");
        assert_eq!(validate_time("13:30:00").unwrap(), "13:30");
        assert!(validate_time("25:00").is_err());
        assert!(validate_time("noon").is_err());
    }

    #[test]
    fn test_new_entry_rejects_non_positive_calories() {
        assert!(normalize_new_food_entry(entry(0.0)).is_err());
        assert!(normalize_new_food_entry(entry(-10.0)).is_err());
        assert!(normalize_new_food_entry(entry(f64::NAN)).is_err());
    }

    #[test]
    fn test_new_entry_rejects_negative_protein() {
        let e = NewFoodEntry {
            protein_g: Some(-1.0),
            ..entry(100.0)
        };
        assert!(normalize_new_food_entry(e).is_err());
    }

    #[test]
    fn test_new_entry_normalizes_fields() {
        let e = NewFoodEntry {
            time: Some("8:15".to_string()),
            vl_flag: Some("v".to_string()),
            planned_slot: Some("Lunch".to_string()),
            ..entry(450.0)
        };
        let normalized = normalize_new_food_entry(e).unwrap();
        assert_eq!(normalized.time.as_deref(), Some("08:15"));
        assert_eq!(normalized.vl_flag.as_deref(), Some("V"));
        assert_eq!(normalized.planned_slot.as_deref(), Some("lunch"));
    }

    #[test]
    fn test_update_validation() {
        let bad = UpdateFoodEntry {
            calories: Some(0.0),
            ..UpdateFoodEntry::default()
        };
        assert!(normalize_food_entry_update(bad).is_err());
        assert!(UpdateFoodEntry::default().is_empty());
    }

    #[test]
    fn test_metric_validation() {
        assert!(validate_metric_update(&MetricUpdate::default()).is_ok());
        let bad_weight = MetricUpdate {
            weight_kg: Some(0.0),
            ..MetricUpdate::default()
        };
        assert!(validate_metric_update(&bad_weight).is_err());
        let bad_steps = MetricUpdate {
            steps: Some(-5),
            ..MetricUpdate::default()
        };
        assert!(validate_metric_update(&bad_steps).is_err());
        let bad_burn = MetricUpdate {
            calories_burned_basal: Some(-1.0),
            ..MetricUpdate::default()
        };
        assert!(validate_metric_update(&bad_burn).is_err());
    }
}
