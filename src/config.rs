//! Variable configuration, loaded from a JSON file.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

/// Maps variable names to their raster directory and sampling parameters.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub variable: HashMap<String, VariableConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VariableConfig {
    /// Directory holding this variable's raster files.
    pub dirpath: PathBuf,
    /// Human-readable description of the filename convention. Not parsed.
    #[serde(default)]
    pub filename_mask: Option<String>,
    /// The raster's no-data sentinel, e.g. -9999.
    pub nan_value: f64,
    /// Expected EPSG code of the rasters. When absent, the point set's CRS
    /// is taken as the expectation.
    #[serde(default)]
    pub epsg: Option<u32>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Error reading config file `{}`", path.display()))?;
        let config: Config = serde_json::from_str(&text)
            .with_context(|| format!("Error parsing config file `{}`", path.display()))?;
        Ok(config)
    }

    /// Looks up a variable, listing the valid names on failure.
    pub fn variable(&self, name: &str) -> Result<&VariableConfig> {
        self.variable.get(name).ok_or_else(|| {
            anyhow!(
                "Variable `{}` not found in config file. Valid variables are: {}",
                name,
                self.variable_names().join(", ")
            )
        })
    }

    pub fn variable_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.variable.keys().cloned().collect();
        names.sort();
        names
    }
}

// -- Tests -------------------------------------------------------------------
