mod cli;
mod config;
mod points;
mod raster;
mod sampler;
mod selector;
mod stamp;
mod table;

use anyhow::{Error, Result};
use clap::Parser;
use cli::{command, Cli, Commands};

fn main() -> Result<(), Error> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Sample {
            variable,
            points,
            start,
            end,
            config,
            id_property,
            output,
            columns,
        } => match command::sample(
            variable,
            points,
            start,
            end,
            config,
            id_property,
            output.clone(),
            columns,
        ) {
            Ok(filename) => println!("File saved to `{}`", filename),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        Commands::Variables { config } => {
            if let Err(e) = command::variables(config) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
