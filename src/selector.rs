//! Selects raster files in a directory by their filename-encoded timestamp.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Result};
use chrono::NaiveDate;

use crate::stamp::{FileStamp, D2R_LAYOUT};

/// Raster file extension the selector looks for. The listing is flat; nothing
/// below `directory` is visited.
const RASTER_EXTENSION: &str = "tif";

/// A raster file plus the timestamp derived from its name.
#[derive(Debug, Clone)]
pub struct RasterFileRef {
    pub path: PathBuf,
    pub stamp: FileStamp,
}

impl RasterFileRef {
    /// File name only, without the directory. Kept short so output tables
    /// stay portable across machines.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Returns the raster files in `directory` whose encoded timestamp falls in
/// `[start, end]`, sorted ascending by that timestamp.
///
/// The end date is inclusive through its last second, so a same-day file at
/// a non-zero hour is still selected. Files whose names do not parse are
/// skipped with a warning. An empty selection is an error: there is nothing
/// to sort or sample.
pub fn select(directory: &Path, start: NaiveDate, end: NaiveDate) -> Result<Vec<RasterFileRef>> {
    if start > end {
        return Err(anyhow!("start date {} is after end date {}", start, end));
    }
    let window_start = start.and_hms_opt(0, 0, 0).unwrap();
    let window_end = end.and_hms_opt(23, 59, 59).unwrap();

    let mut selection = Vec::new();
    for entry in fs::read_dir(directory)
        .map_err(|e| anyhow!("cannot read raster directory `{}`: {}", directory.display(), e))?
    {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(RASTER_EXTENSION) {
            continue;
        }
        let stem = match path.file_stem().and_then(|s| s.to_str()) {
            Some(stem) => stem,
            None => continue,
        };
        match FileStamp::parse(stem, D2R_LAYOUT) {
            Ok(stamp) => {
                let at = stamp.datetime();
                if window_start <= at && at <= window_end {
                    selection.push(RasterFileRef { path, stamp });
                }
            }
            Err(e) => {
                eprintln!("[WARNING] Skipping raster file `{}`: {}", path.display(), e);
            }
        }
    }

    // Filename tiebreak keeps the order deterministic when two files share a
    // timestamp.
    selection.sort_by(|a, b| {
        (a.stamp.datetime(), a.file_name()).cmp(&(b.stamp.datetime(), b.file_name()))
    });

    if selection.is_empty() {
        return Err(anyhow!(
            "no raster files in `{}` match the period {} to {}",
            directory.display(),
            start,
            end
        ));
    }

    Ok(selection)
}

// -- Tests -------------------------------------------------------------------
