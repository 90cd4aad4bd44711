use anyhow::{Result, bail};
use clap::Args;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use tally_core::models::{FoodEntry, NewFoodEntry, UpdateFoodEntry};
use tally_core::service::Tracker;

use super::helpers::{date_arg, json_error, opt_num, parse_date, truncate};

/// Optional fields shared by `log` and `edit`.
#[derive(Args, Debug, Default)]
pub(crate) struct EntryFields {
    /// What was eaten
    #[arg(short, long)]
    pub description: Option<String>,
    /// Protein in grams
    #[arg(short, long)]
    pub protein: Option<f64>,
    /// Time eaten (HH:MM)
    #[arg(short, long)]
    pub time: Option<String>,
    /// Where it was eaten
    #[arg(long)]
    pub place: Option<String>,
    /// Meal slot: breakfast, lunch, dinner, snack, other
    #[arg(short, long)]
    pub slot: Option<String>,
    /// Single-character star marker
    #[arg(long)]
    pub star: Option<String>,
    /// V or L flag (empty to clear)
    #[arg(long)]
    pub vl: Option<String>,
    /// Free-form notes
    #[arg(long)]
    pub comments: Option<String>,
}

impl EntryFields {
    fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.protein.is_none()
            && self.time.is_none()
            && self.place.is_none()
            && self.slot.is_none()
            && self.star.is_none()
            && self.vl.is_none()
            && self.comments.is_none()
    }
}

fn describe(entry: &FoodEntry) -> String {
    let name = entry.description.as_deref().unwrap_or("(no description)");
    let protein = entry
        .protein_g
        .map(|p| format!(" | P:{p:.0}g"))
        .unwrap_or_default();
    format!("{name} — {:.0} kcal{protein}", entry.calories)
}

fn not_found(entry_id: i64, json: bool) -> ! {
    if json {
        println!("{}", json_error(&format!("Entry {entry_id} not found")));
    } else {
        eprintln!("Entry {entry_id} not found");
    }
    process::exit(2);
}

pub(crate) fn cmd_log(
    tracker: &Tracker,
    calories: f64,
    fields: EntryFields,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let entry = tracker.log_food(NewFoodEntry {
        date,
        time: fields.time,
        description: fields.description,
        calories,
        protein_g: fields.protein,
        place: fields.place,
        star_flag: fields.star,
        vl_flag: fields.vl,
        planned_slot: fields.slot,
        context_comments: fields.comments,
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        let id = entry.id;
        println!("Logged [{id}] {} on {}", describe(&entry), entry.date);
    }

    Ok(())
}

pub(crate) fn cmd_edit(
    tracker: &Tracker,
    entry_id: i64,
    calories: Option<f64>,
    fields: EntryFields,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    if calories.is_none() && date.is_none() && fields.is_empty() {
        bail!("Nothing to update. Provide at least one field to change");
    }
    if tracker.database().find_food_entry(entry_id)?.is_none() {
        not_found(entry_id, json);
    }

    let parsed_date = date.map(Some).map(parse_date).transpose()?;
    let entry = tracker.update_food(
        entry_id,
        UpdateFoodEntry {
            date: parsed_date,
            time: fields.time,
            description: fields.description,
            calories,
            protein_g: fields.protein,
            place: fields.place,
            star_flag: fields.star,
            vl_flag: fields.vl,
            planned_slot: fields.slot,
            context_comments: fields.comments,
        },
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        println!("Updated entry {entry_id}: {} on {}", describe(&entry), entry.date);
    }

    Ok(())
}

pub(crate) fn cmd_delete(tracker: &Tracker, entry_id: i64, json: bool) -> Result<()> {
    if !tracker.delete_food(entry_id)? {
        not_found(entry_id, json);
    }
    if json {
        println!("{}", serde_json::json!({ "deleted": entry_id }));
    } else {
        println!("Deleted entry {entry_id}");
    }
    Ok(())
}

pub(crate) fn print_entries_table(entries: &[FoodEntry]) {
    #[derive(Tabled)]
    struct EntryRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Time")]
        time: String,
        #[tabled(rename = "Slot")]
        slot: String,
        #[tabled(rename = "Description")]
        description: String,
        #[tabled(rename = "Kcal")]
        calories: String,
        #[tabled(rename = "Protein")]
        protein: String,
        #[tabled(rename = "Flags")]
        flags: String,
    }

    let rows: Vec<EntryRow> = entries
        .iter()
        .map(|e| EntryRow {
            id: e.id,
            time: e.time.clone().unwrap_or_default(),
            slot: e.planned_slot.clone().unwrap_or_default(),
            description: e
                .description
                .as_deref()
                .map(|d| truncate(d, 35))
                .unwrap_or_default(),
            calories: format!("{:.0}", e.calories),
            protein: opt_num(e.protein_g, 0),
            flags: format!(
                "{}{}",
                e.star_flag.as_deref().unwrap_or(""),
                e.vl_flag.as_deref().unwrap_or("")
            ),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(4..6)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn cmd_entries(tracker: &Tracker, date: Option<String>, json: bool) -> Result<()> {
    let date = date_arg(date)?;
    let entries = tracker.entries_for_date(&date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        eprintln!("No entries for {date}");
        process::exit(2);
    }

    println!("=== {date} ===\n");
    print_entries_table(&entries);
    let total: f64 = entries.iter().map(|e| e.calories).sum();
    let protein: f64 = entries.iter().filter_map(|e| e.protein_g).sum();
    println!("  TOTAL: {total:.0} kcal | P:{protein:.0}g");

    Ok(())
}
