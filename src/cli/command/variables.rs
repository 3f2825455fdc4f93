//! Lists the configured variable names.

use std::path::Path;

use anyhow::Result;

use crate::config::Config;

pub fn variables(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;

    for name in config.variable_names() {
        println!("{}", name);
    }

    Ok(())
}
