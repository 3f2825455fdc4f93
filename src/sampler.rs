//! Samples one raster file at every station point.

use anyhow::{anyhow, Result};

use crate::{
    points::PointSet,
    raster::GeoTiff,
    selector::RasterFileRef,
    table::SampleRow,
};

/// Rows produced from one raster file, plus the number of rows whose value
/// equals the no-data sentinel. Sentinel rows are kept unmodified; the
/// caller decides what the sentinel means.
#[derive(Debug)]
pub struct SampleOutcome {
    pub rows: Vec<SampleRow>,
    pub no_data_hits: usize,
}

/// Reads the raster value at every station point, in point-set order.
///
/// The raster's CRS must match `expected_epsg`; a mismatch (or a raster with
/// no declared CRS) aborts the run rather than silently sampling at
/// misaligned coordinates. Points outside the raster extent sample the
/// no-data sentinel. The raster file is closed before this returns, on
/// success and on error.
pub fn sample(
    file: &RasterFileRef,
    points: &PointSet,
    variable: &str,
    nan_value: f64,
    expected_epsg: u32,
) -> Result<SampleOutcome> {
    let mut raster = GeoTiff::open(&file.path)?;

    match raster.epsg() {
        Some(code) if code == expected_epsg => {}
        Some(code) => {
            return Err(anyhow!(
                "CRS mismatch: expected EPSG:{} but raster `{}` declares EPSG:{}",
                expected_epsg,
                file.path.display(),
                code
            ))
        }
        None => {
            return Err(anyhow!(
                "raster `{}` declares no CRS; cannot verify it matches EPSG:{}",
                file.path.display(),
                expected_epsg
            ))
        }
    }

    let timestamp = file.stamp.iso_utc();
    let source_file = file.file_name();

    let mut rows = Vec::with_capacity(points.points.len());
    let mut no_data_hits = 0;
    for point in &points.points {
        let value = raster.sample(point.x, point.y)?.unwrap_or(nan_value);
        if value == nan_value {
            no_data_hits += 1;
        }
        rows.push(SampleRow {
            point_id: point.id.clone(),
            timestamp: timestamp.clone(),
            variable: variable.to_string(),
            value,
            source_file: source_file.clone(),
        });
    }

    Ok(SampleOutcome { rows, no_data_hits })
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {

    use std::path::Path;

    use tempfile::TempDir;

    use crate::{
        points::StationPoint,
        raster::write_geotiff_fixture,
        stamp::{FileStamp, D2R_LAYOUT},
    };

    use super::*;

    const NAN_VALUE: f64 = -9999.0;

    fn raster_fixture(dir: &Path, epsg: u16) -> RasterFileRef {
        // 4x4 grid at origin (10, 50); cell (row, col) holds row * 4 + col,
        // except cell (1, 1) which holds the sentinel.
        let mut values: Vec<f64> = (0..16).map(f64::from).collect();
        values[5] = NAN_VALUE;
        let path = dir.join("UTCI_v1_dortmund_3m_2024_213_12.tif");
        write_geotiff_fixture(&path, 4, 4, 10.0, 50.0, &values, epsg);

        let stamp = FileStamp::parse("UTCI_v1_dortmund_3m_2024_213_12", D2R_LAYOUT).unwrap();
        RasterFileRef { path, stamp }
    }

    fn point_set_fixture() -> PointSet {
        let points = vec![
            StationPoint { id: Some("L-001".to_string()), x: 10.5, y: 49.5 },
            StationPoint { id: Some("L-002".to_string()), x: 13.5, y: 46.5 },
            StationPoint { id: None, x: 11.5, y: 48.5 },
            StationPoint { id: Some("L-004".to_string()), x: 12.5, y: 47.5 },
        ];
        PointSet { points, epsg: 4326, dropped_null_geometry: 0 }
    }

    #[test]
    fn should_produce_one_row_per_point_in_order() {
        let tmp = TempDir::new().unwrap();
        let file = raster_fixture(tmp.path(), 4326);

        let outcome = sample(&file, &point_set_fixture(), "UTCI", NAN_VALUE, 4326).unwrap();

        assert_eq!(outcome.rows.len(), 4);
        let ids: Vec<Option<&str>> = outcome.rows.iter().map(|r| r.point_id.as_deref()).collect();
        assert_eq!(ids, vec![Some("L-001"), Some("L-002"), None, Some("L-004")]);
        assert_eq!(outcome.rows[0].value, 0.0);
        assert_eq!(outcome.rows[1].value, 15.0);
        assert_eq!(outcome.rows[3].value, 10.0);
        for row in &outcome.rows {
            assert_eq!(row.timestamp, "2024-08-01T12:00:00Z");
            assert_eq!(row.variable, "UTCI");
            assert_eq!(row.source_file, "UTCI_v1_dortmund_3m_2024_213_12.tif");
        }
    }

    #[test]
    fn should_keep_sentinel_rows_and_count_them() {
        let tmp = TempDir::new().unwrap();
        let file = raster_fixture(tmp.path(), 4326);

        let outcome = sample(&file, &point_set_fixture(), "UTCI", NAN_VALUE, 4326).unwrap();

        // point 3 sits in cell (1, 1), the sentinel cell
        assert_eq!(outcome.rows[2].value, NAN_VALUE);
        assert_eq!(outcome.no_data_hits, 1);
    }

    #[test]
    fn should_sample_sentinel_outside_extent() {
        let tmp = TempDir::new().unwrap();
        let file = raster_fixture(tmp.path(), 4326);
        let points = PointSet {
            points: vec![StationPoint { id: Some("L-900".to_string()), x: 0.0, y: 0.0 }],
            epsg: 4326,
            dropped_null_geometry: 0,
        };

        let outcome = sample(&file, &points, "UTCI", NAN_VALUE, 4326).unwrap();

        assert_eq!(outcome.rows[0].value, NAN_VALUE);
        assert_eq!(outcome.no_data_hits, 1);
    }

    #[test]
    fn should_abort_on_crs_mismatch() {
        let tmp = TempDir::new().unwrap();
        let file = raster_fixture(tmp.path(), 4326);

        let result = sample(&file, &point_set_fixture(), "UTCI", NAN_VALUE, 25832);

        let err = result.unwrap_err().to_string();
        assert!(err.contains("CRS mismatch"));
        assert!(err.contains("25832"));
        assert!(err.contains("4326"));
    }
}
