mod entry;
mod helpers;
mod import;
mod metrics;
mod settings;
mod summary;

pub(crate) use entry::{EntryFields, cmd_delete, cmd_edit, cmd_entries, cmd_log};
pub(crate) use import::cmd_import;
pub(crate) use metrics::{cmd_clear, cmd_metrics};
pub(crate) use settings::{cmd_settings_set, cmd_settings_show};
pub(crate) use summary::{cmd_history, cmd_recalc, cmd_recompute, cmd_summary};
