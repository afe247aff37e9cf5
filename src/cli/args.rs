// src/cli/args.rs

use crate::constants::SETTINGS_FILENAME;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontEnd {
    /// The line-prompt front end (flags plus interactive fallbacks).
    Cli,
    /// The desktop front end. Not part of this build.
    Gui,
}

/// cubebench: discover cube catalogs, configure the load-test harness and run it.
///
/// The typical session discovers every catalog/cube pair the server exposes,
/// lets you pick a subset and an executor (interactively when the flags are
/// omitted), regenerates `working_dir/config/systems.properties` and launches
/// the harness, streaming its log when `--follow` is set.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Front end to start.
    #[arg(long = "mode", value_enum, default_value = "cli")]
    pub mode: FrontEnd,

    /// Path to the JSON settings file.
    #[arg(long, default_value = SETTINGS_FILENAME)]
    pub settings: PathBuf,

    /// Executor to run. Prompted interactively when omitted.
    #[arg(long)]
    pub executor: Option<String>,

    /// Comma-separated models to select ("Catalog :: Cube", or a substring
    /// of the rendered pair).
    #[arg(long, conflicts_with = "all_models")]
    pub models: Option<String>,

    /// Select every discovered catalog/cube pair.
    #[arg(long)]
    pub all_models: bool,

    /// Follow the run log in real time while the executor runs.
    #[arg(long)]
    pub follow: bool,

    /// JSON file mapping "Catalog :: Cube" to CSV fixture assignments;
    /// switches the generated properties into ingestion mode.
    #[arg(long)]
    pub csv_assignments: Option<PathBuf>,

    /// Write the cooperative stop sentinel and exit.
    #[arg(long, conflicts_with = "cancel_stop")]
    pub request_stop: bool,

    /// Remove the cooperative stop sentinel and exit.
    #[arg(long)]
    pub cancel_stop: bool,

    /// Never prompt; fail instead of asking. Requires --executor together
    /// with --models or --all-models.
    #[arg(long)]
    pub yes: bool,
}
