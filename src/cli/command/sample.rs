//! The sampling run: config, points, file selection, per-file sampling,
//! concatenation, and output.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;

use crate::{
    cli::{create_progress_bar, create_spinner},
    config::{Config, VariableConfig},
    points::{self, PointSet},
    sampler, selector,
    table::{Column, SampleTable},
};

use super::make_output_file_name;

/// Runs the full pipeline for one or more variables against one point set
/// and one date range, writing a single concatenated table. Returns the
/// output file name.
#[allow(clippy::too_many_arguments)]
pub fn sample(
    variables: &[String],
    points_path: &Path,
    start: &str,
    end: &str,
    config_path: &Path,
    id_property: &str,
    output: Option<PathBuf>,
    columns: &[Column],
) -> Result<String> {
    let start = parse_date(start).context("Invalid start date")?;
    let end = parse_date(end).context("Invalid end date")?;
    if start > end {
        return Err(anyhow!("start date {} is after end date {}", start, end));
    }

    let config = Config::load(config_path)?;
    // Fail fast on any unknown variable before touching the data.
    for name in variables {
        config.variable(name)?;
    }

    let bar = create_spinner(format!("Loading station points from `{}`...", points_path.display()));
    let point_set = points::load(points_path, id_property)?;
    bar.finish_with_message(format!("Loaded {} station points", point_set.points.len()));
    if point_set.dropped_null_geometry > 0 {
        eprintln!(
            "[WARNING] Dropped {} feature(s) with null geometry from `{}`",
            point_set.dropped_null_geometry,
            points_path.display()
        );
    }

    let mut table = SampleTable::new();
    for name in variables {
        run_variable(&config, name, &point_set, start, end, &mut table)?;
    }

    let missing_ids = table.missing_id_count();
    if missing_ids > 0 {
        eprintln!(
            "[WARNING] {} of {} rows have no station identifier and cannot be joined downstream",
            missing_ids,
            table.len()
        );
    }

    let output = output.unwrap_or_else(|| make_output_file_name(variables));
    if output.extension().and_then(|e| e.to_str()) == Some("parquet") {
        table.write_parquet(&output, columns)?;
    } else {
        table.write_csv(&output, columns)?;
    }

    println!("Sampling complete: {} rows.", table.len());
    Ok(output.to_string_lossy().to_string())
}

/// Selects and samples every raster file of one variable, appending rows in
/// file-chronological order.
fn run_variable(
    config: &Config,
    name: &str,
    point_set: &PointSet,
    start: NaiveDate,
    end: NaiveDate,
    table: &mut SampleTable,
) -> Result<()> {
    let variable = config.variable(name)?;
    let expected_epsg = expected_epsg(variable, point_set)?;

    println!(
        "Sampling variable `{}` from {} to {}...",
        name, start, end
    );
    let files = selector::select(&variable.dirpath, start, end)?;
    println!(
        "Raster files selected: {}. Earliest: {}. Latest: {}",
        files.len(),
        files[0].file_name(),
        files[files.len() - 1].file_name()
    );

    let bar = create_progress_bar(
        files.len() as u64,
        format!("Sampling {} points per file", point_set.points.len()),
    );
    for file in &files {
        let outcome = sampler::sample(file, point_set, name, variable.nan_value, expected_epsg)?;
        if outcome.no_data_hits > 0 {
            bar.println(format!(
                "[WARNING] {} sampled value(s) equal the no-data sentinel {} in `{}`. Rows kept.",
                outcome.no_data_hits,
                variable.nan_value,
                file.file_name()
            ));
        }
        table.append(outcome.rows);
        bar.inc(1);
    }
    bar.finish_with_message(format!("Variable `{}` done", name));

    Ok(())
}

/// The CRS every raster must match: the configured EPSG code when present
/// (cross-checked against the point set), otherwise the point set's own CRS.
fn expected_epsg(variable: &VariableConfig, point_set: &PointSet) -> Result<u32> {
    match variable.epsg {
        Some(code) if code != point_set.epsg => Err(anyhow!(
            "CRS mismatch: config expects EPSG:{} but the point set is EPSG:{}",
            code,
            point_set.epsg
        )),
        Some(code) => Ok(code),
        None => Ok(point_set.epsg),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y%m%d")
        .map_err(|_| anyhow!("expected YYYYMMDD, got `{}`", s))
}

// -- Tests -------------------------------------------------------------------
