//! Command line interface.

pub mod command;

use std::{path::PathBuf, time::Duration};

use clap::{command, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use crate::table::Column;

/// GeoJSON property conventionally holding the D2R station (lantern) id.
const DEFAULT_ID_PROPERTY: &str = "LeuchtenNr";

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Contains the commands
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sample raster variables at station point locations
    Sample {
        /// Variable name(s) from the config file
        #[arg(short, long, required = true, num_args = 1..)]
        variable: Vec<String>,

        /// GeoJSON file with the station points
        #[arg(short, long)]
        points: PathBuf,

        /// Start date (YYYYMMDD), inclusive
        #[arg(long)]
        start: String,

        /// End date (YYYYMMDD), inclusive through its last second
        #[arg(long)]
        end: String,

        /// Variable configuration file
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,

        /// Feature property holding the station identifier
        #[arg(long, default_value = DEFAULT_ID_PROPERTY)]
        id_property: String,

        /// Output file; a `.parquet` extension selects parquet, anything
        /// else delimited text. Defaults to a dated csv in the working
        /// directory.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Columns to write
        #[arg(long, value_enum, value_delimiter = ',',
              default_values_t = crate::table::ALL_COLUMNS)]
        columns: Vec<Column>,
    },
    /// List the variables defined in the config file
    Variables {
        /// Variable configuration file
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,
    },
}

/// Creates a spinner.
pub fn create_spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner().with_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));

    bar
}

/// Creates a progress bar.
pub fn create_progress_bar(size: u64, message: String) -> ProgressBar {
    ProgressBar::new(size).with_message(message).with_style(
        ProgressStyle::with_template("[{eta_precise}] {bar:40.cyan/blue} {msg}")
            .unwrap()
            .progress_chars("##-"),
    )
}
