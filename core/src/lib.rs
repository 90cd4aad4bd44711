//! Daily energy-balance tracking: food entries, body metrics, and a calorie
//! target derived from the rolling average of recent burn.

pub mod aggregation;
pub mod csv_import;
pub mod db;
pub mod logging;
pub mod models;
pub mod recompute;
pub mod rolling;
pub mod service;
pub mod settings;
pub mod summary;
pub mod target;
