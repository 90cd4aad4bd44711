use anyhow::{Result, bail};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use tally_core::models::WeightMode;
use tally_core::service::Tracker;
use tally_core::settings::{MIN_WINDOW_DAYS, Settings, SettingsUpdate};
use tally_core::target::{deficit_percent, fixed_deficit, static_target};

fn print_settings(settings: &Settings) {
    #[derive(Tabled)]
    struct ModeRow {
        #[tabled(rename = "Mode")]
        mode: &'static str,
        #[tabled(rename = "Deficit %")]
        percent: String,
        #[tabled(rename = "Fixed deficit")]
        fixed: String,
        #[tabled(rename = "Static target")]
        target: String,
    }

    let current = settings.current_mode;
    println!("Maintenance calories: {:.0} kcal", settings.maintenance_calories);
    println!("Rolling window:       {} days", settings.maintenance_window_days);
    println!("Current mode:         {}\n", current.display_name());

    let rows: Vec<ModeRow> = WeightMode::ALL
        .iter()
        .map(|&mode| ModeRow {
            mode: mode.display_name(),
            percent: format!("{:.0}%", deficit_percent(settings, mode) * 100.0),
            fixed: format!("{:.0}", fixed_deficit(settings, mode)),
            target: format!("{:.0}", static_target(settings, mode)),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn cmd_settings_show(tracker: &Tracker, json: bool) -> Result<()> {
    let settings = tracker.settings()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
    } else {
        print_settings(&settings);
    }
    Ok(())
}

pub(crate) fn cmd_settings_set(tracker: &Tracker, update: &SettingsUpdate, json: bool) -> Result<()> {
    if update.is_empty() {
        bail!("Nothing to update. Run `tally settings set --help` for the available options");
    }
    if let Some(w) = update
        .maintenance_window_days
        .filter(|w| *w < MIN_WINDOW_DAYS)
    {
        eprintln!("Note: rolling window raised from {w} to the minimum of {MIN_WINDOW_DAYS} days");
    }

    let settings = tracker.update_settings(update)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
    } else {
        println!("Settings updated. All daily targets were recalculated.\n");
        print_settings(&settings);
    }
    Ok(())
}
