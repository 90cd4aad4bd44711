mod commands;
mod config;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use crate::commands::{
    EntryFields, cmd_clear, cmd_delete, cmd_edit, cmd_entries, cmd_history, cmd_import, cmd_log,
    cmd_metrics, cmd_recalc, cmd_recompute, cmd_settings_set, cmd_settings_show, cmd_summary,
};
use crate::config::Config;
use tally_core::models::WeightMode;
use tally_core::service::Tracker;
use tally_core::settings::SettingsUpdate;

#[derive(Parser)]
#[command(
    name = "tally",
    version,
    about = "Daily energy balance and calorie target tracker",
    long_about = "Log what you eat and what you burn. Tally derives each day's \
calorie target from a rolling average of your measured burn and the \
weight mode you choose."
)]
struct Cli {
    /// Path to the database file (overrides TALLY_DB)
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,
    /// Enable debug logging on stderr
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log a food entry
    Log {
        /// Calories in kcal
        calories: f64,
        #[command(flatten)]
        fields: EntryFields,
        /// Date to log for (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit an existing food entry
    Edit {
        /// Entry ID (shown in `tally entries`)
        entry_id: i64,
        /// New calories in kcal
        #[arg(short, long)]
        calories: Option<f64>,
        #[command(flatten)]
        fields: EntryFields,
        /// Move the entry to another date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a food entry
    Delete {
        /// Entry ID
        entry_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the food entries for a day
    Entries {
        /// Date (YYYY-MM-DD, default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record steps, weight, burn, or mode for a day
    Metrics {
        /// Date (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Step count
        #[arg(long)]
        steps: Option<i64>,
        /// Body weight
        #[arg(short, long)]
        weight: Option<f64>,
        /// Weight unit: kg or lbs
        #[arg(short, long, default_value = "kg")]
        unit: String,
        /// Total calories burned
        #[arg(short, long)]
        burned: Option<f64>,
        /// Active calories burned
        #[arg(long)]
        active: Option<f64>,
        /// Basal calories burned
        #[arg(long)]
        basal: Option<f64>,
        /// Weight mode for the day: maintenance, gentle, standard, aggressive
        #[arg(short, long)]
        mode: Option<String>,
        /// Protein target in grams (overrides the weight-based default)
        #[arg(long)]
        protein_target: Option<f64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the daily summary
    Summary {
        /// Date (YYYY-MM-DD, default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show recent daily records
    History {
        /// Number of days to show
        #[arg(short, long, default_value = "7")]
        days: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Recompute one day's totals and target from its entries
    Recompute {
        /// Date (YYYY-MM-DD, default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Recalculate the target of every stored day
    Recalc {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a day's record and all of its entries
    Clear {
        /// Date (YYYY-MM-DD)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or change target settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
    /// Import daily metrics from a CSV export
    Import {
        /// Path to the CSV file
        file: PathBuf,
        /// Skip rows before this date (YYYY-MM-DD)
        #[arg(long)]
        since: Option<String>,
        /// Show what would be imported without writing
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Disable API key authentication (for development/testing)
        #[arg(long)]
        no_auth: bool,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Show current settings and the per-mode targets
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change settings; every stored target is recalculated
    Set {
        /// Maintenance calories used when burn data is sparse
        #[arg(long)]
        maintenance: Option<f64>,
        /// Default weight mode for new days
        #[arg(long)]
        mode: Option<String>,
        /// Fixed kcal deficit for gentle loss
        #[arg(long)]
        deficit_gentle: Option<f64>,
        /// Fixed kcal deficit for standard loss
        #[arg(long)]
        deficit_standard: Option<f64>,
        /// Fixed kcal deficit for aggressive loss
        #[arg(long)]
        deficit_aggressive: Option<f64>,
        /// Rolling burn window in days (minimum 14)
        #[arg(long)]
        window: Option<i64>,
        /// Gentle loss deficit as a fraction (e.g. 0.10)
        #[arg(long)]
        gentle_percent: Option<f64>,
        /// Standard loss deficit as a fraction (e.g. 0.15)
        #[arg(long)]
        standard_percent: Option<f64>,
        /// Aggressive loss deficit as a fraction (e.g. 0.20)
        #[arg(long)]
        aggressive_percent: Option<f64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "debug"
    } else {
        tally_core::logging::DEFAULT_LEVEL
    };
    tally_core::logging::init_with_level(level);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

#[allow(clippy::too_many_lines)]
async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.db)?;
    let tracker = Tracker::new(&config.db_path.to_string_lossy())?;

    match cli.command {
        Commands::Log {
            calories,
            fields,
            date,
            json,
        } => cmd_log(&tracker, calories, fields, date, json),
        Commands::Edit {
            entry_id,
            calories,
            fields,
            date,
            json,
        } => cmd_edit(&tracker, entry_id, calories, fields, date, json),
        Commands::Delete { entry_id, json } => cmd_delete(&tracker, entry_id, json),
        Commands::Entries { date, json } => cmd_entries(&tracker, date, json),
        Commands::Metrics {
            date,
            steps,
            weight,
            unit,
            burned,
            active,
            basal,
            mode,
            protein_target,
            json,
        } => cmd_metrics(
            &tracker,
            date,
            steps,
            weight,
            &unit,
            burned,
            active,
            basal,
            mode.as_deref(),
            protein_target,
            json,
        ),
        Commands::Summary { date, json } => cmd_summary(&tracker, date, json),
        Commands::History { days, json } => cmd_history(&tracker, days, json),
        Commands::Recompute { date, json } => cmd_recompute(&tracker, date, json),
        Commands::Recalc { json } => cmd_recalc(&tracker, json),
        Commands::Clear { date, json } => cmd_clear(&tracker, date, json),
        Commands::Settings { command } => match command {
            SettingsCommands::Show { json } => cmd_settings_show(&tracker, json),
            SettingsCommands::Set {
                maintenance,
                mode,
                deficit_gentle,
                deficit_standard,
                deficit_aggressive,
                window,
                gentle_percent,
                standard_percent,
                aggressive_percent,
                json,
            } => {
                let update = SettingsUpdate {
                    maintenance_calories: maintenance,
                    current_mode: mode.as_deref().map(WeightMode::parse).transpose()?,
                    deficit_gentle,
                    deficit_standard,
                    deficit_aggressive,
                    maintenance_window_days: window,
                    loss_gentle_percent: gentle_percent,
                    loss_standard_percent: standard_percent,
                    loss_aggressive_percent: aggressive_percent,
                };
                cmd_settings_set(&tracker, &update, json)
            }
        },
        Commands::Import {
            file,
            since,
            dry_run,
            json,
        } => cmd_import(&tracker, &file, since, dry_run, json),
        Commands::Serve {
            port,
            bind,
            no_auth,
        } => {
            let api_key = if no_auth {
                None
            } else {
                let (key, new) = config.load_or_create_api_key()?;
                if new {
                    eprintln!("Generated new API key: {key}");
                }
                Some(key)
            };
            server::start_server(tracker, port, &bind, api_key).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn log_parses_entry_fields() {
        let cli = Cli::try_parse_from([
            "tally", "log", "450", "-d", "Oats", "-p", "18", "-s", "breakfast", "--date",
            "2024-06-15",
        ])
        .unwrap();
        let Commands::Log {
            calories,
            fields,
            date,
            json,
        } = cli.command
        else {
            panic!("expected log command");
        };
        assert!((calories - 450.0).abs() < f64::EPSILON);
        assert_eq!(fields.description.as_deref(), Some("Oats"));
        assert_eq!(fields.slot.as_deref(), Some("breakfast"));
        assert_eq!(date.as_deref(), Some("2024-06-15"));
        assert!(!json);
    }

    #[test]
    fn global_db_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["tally", "summary", "--db", "/tmp/t.db"]).unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/t.db")));
    }
}
