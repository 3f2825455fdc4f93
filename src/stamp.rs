//! Filename-encoded timestamps.
//!
//! D2R raster files carry their acquisition time in the file name as
//! underscore-delimited tokens, e.g. `UTCI_v1_dortmund_3m_2024_213_12.tif`.
//! Only the trailing three tokens (year, day-of-year, hour) are consumed;
//! everything before them is free-form.

use anyhow::{anyhow, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};

/// Which stem tokens hold the timestamp components, counted from the end of
/// the token list. Counting from the end keeps the layout valid regardless of
/// how many free-form tokens precede the timestamp.
#[derive(Debug, Clone, Copy)]
pub struct StampLayout {
    pub year_from_end: usize,
    pub doy_from_end: usize,
    pub hour_from_end: usize,
}

/// The D2R convention: `..._<year>_<doy>_<hour>.tif`.
pub const D2R_LAYOUT: StampLayout = StampLayout {
    year_from_end: 2,
    doy_from_end: 1,
    hour_from_end: 0,
};

/// A timestamp parsed from a raster file name.
///
/// The derived datetime is `January 1 of year + doy days + hour hours`, so
/// doy 213 in 2024 lands on August 1st. This matches the convention the D2R
/// raster producers encode, not the 1-based ordinal-day reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    pub year: i32,
    pub doy: u32,
    pub hour: u32,
    datetime: NaiveDateTime,
}

impl FileStamp {
    /// Parses a file stem like `UTCI_v1_dortmund_3m_2024_213_12`.
    ///
    /// Fails on too few tokens, non-numeric tokens, or out-of-range
    /// day-of-year/hour values. Callers are expected to treat the failure as
    /// a per-file skip, not a batch abort.
    pub fn parse(stem: &str, layout: StampLayout) -> Result<Self> {
        let tokens: Vec<&str> = stem.split('_').collect();
        let needed = layout
            .year_from_end
            .max(layout.doy_from_end)
            .max(layout.hour_from_end)
            + 1;
        if tokens.len() < needed {
            return Err(anyhow!(
                "expected at least {} underscore tokens in `{}`, found {}",
                needed,
                stem,
                tokens.len()
            ));
        }

        let token = |from_end: usize| tokens[tokens.len() - 1 - from_end];
        let year: i32 = token(layout.year_from_end)
            .parse()
            .map_err(|_| anyhow!("non-numeric year token `{}` in `{}`", token(layout.year_from_end), stem))?;
        let doy: u32 = token(layout.doy_from_end)
            .parse()
            .map_err(|_| anyhow!("non-numeric day-of-year token `{}` in `{}`", token(layout.doy_from_end), stem))?;
        let hour: u32 = token(layout.hour_from_end)
            .parse()
            .map_err(|_| anyhow!("non-numeric hour token `{}` in `{}`", token(layout.hour_from_end), stem))?;

        if !(1..=366).contains(&doy) {
            return Err(anyhow!("day-of-year {} out of range 1-366 in `{}`", doy, stem));
        }
        if hour > 23 {
            return Err(anyhow!("hour {} out of range 0-23 in `{}`", hour, stem));
        }
        let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| anyhow!("year {} out of range in `{}`", year, stem))?;
        let datetime = jan1.and_hms_opt(0, 0, 0).unwrap()
            + Duration::days(doy as i64)
            + Duration::hours(hour as i64);

        Ok(FileStamp { year, doy, hour, datetime })
    }

    pub fn datetime(&self) -> NaiveDateTime {
        self.datetime
    }

    /// ISO-8601 with an explicit UTC designator, e.g. `2024-08-01T12:00:00Z`.
    pub fn iso_utc(&self) -> String {
        format!("{}Z", self.datetime.format("%Y-%m-%dT%H:%M:%S"))
    }
}

// -- Tests -------------------------------------------------------------------
