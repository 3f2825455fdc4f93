//! Station point sets, loaded from GeoJSON.

use std::{fs, path::Path};

use anyhow::{anyhow, Context, Result};
use geojson::{FeatureCollection, GeoJson, JsonObject, Value};

/// CRS assumed when the collection carries no `crs` member, per the GeoJSON
/// default (WGS 84).
const DEFAULT_EPSG: u32 = 4326;

/// One station location with its stable identifier. The identifier may be
/// missing; such rows are sampled anyway and counted at the end of a run.
#[derive(Debug, Clone)]
pub struct StationPoint {
    pub id: Option<String>,
    pub x: f64,
    pub y: f64,
}

/// An ordered set of station points sharing one CRS.
#[derive(Debug, Clone)]
pub struct PointSet {
    pub points: Vec<StationPoint>,
    pub epsg: u32,
    /// Features dropped because their geometry was null.
    pub dropped_null_geometry: usize,
}

/// Loads a GeoJSON FeatureCollection of points. `id_property` names the
/// feature property holding the station identifier.
///
/// Null-geometry features are dropped (counted, not fatal); non-point
/// geometries are fatal. A read or parse failure is fatal with context.
pub fn load(path: &Path, id_property: &str) -> Result<PointSet> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Error reading geometry file `{}`", path.display()))?;
    let geojson: GeoJson = text
        .parse()
        .with_context(|| format!("Error parsing geometry file `{}`", path.display()))?;
    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("`{}` is not a GeoJSON FeatureCollection", path.display())),
    };

    let epsg = collection_epsg(&collection).unwrap_or(DEFAULT_EPSG);

    let mut points = Vec::new();
    let mut dropped_null_geometry = 0;
    for (index, feature) in collection.features.iter().enumerate() {
        let geometry = match &feature.geometry {
            Some(geometry) => geometry,
            None => {
                dropped_null_geometry += 1;
                continue;
            }
        };
        match &geometry.value {
            Value::Point(coords) if coords.len() >= 2 => {
                points.push(StationPoint {
                    id: property_id(feature.properties.as_ref(), id_property),
                    x: coords[0],
                    y: coords[1],
                });
            }
            _ => {
                return Err(anyhow!(
                    "feature {} in `{}` is not a point geometry; only points are supported",
                    index,
                    path.display()
                ));
            }
        }
    }

    if points.is_empty() {
        return Err(anyhow!(
            "`{}` contains no features with point geometry",
            path.display()
        ));
    }

    Ok(PointSet { points, epsg, dropped_null_geometry })
}

fn property_id(properties: Option<&JsonObject>, key: &str) -> Option<String> {
    match properties?.get(key)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Reads the EPSG code from the collection's legacy `crs` member, e.g.
/// `urn:ogc:def:crs:EPSG::25832` or `EPSG:4326`. `CRS84` is WGS 84.
fn collection_epsg(collection: &FeatureCollection) -> Option<u32> {
    let name = collection
        .foreign_members
        .as_ref()?
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()?;
    parse_crs_name(name)
}

fn parse_crs_name(name: &str) -> Option<u32> {
    if name.contains("CRS84") {
        return Some(4326);
    }
    name.rsplit(|c| c == ':' || c == '/')
        .find_map(|token| token.parse::<u32>().ok())
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {

    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn write_geojson(text: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    const NETWORK: &str = r#"{
        "type": "FeatureCollection",
        "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::25832" } },
        "features": [
            { "type": "Feature", "properties": { "LeuchtenNr": "L-001" },
              "geometry": { "type": "Point", "coordinates": [391000.0, 5706000.0] } },
            { "type": "Feature", "properties": { "LeuchtenNr": 17 },
              "geometry": { "type": "Point", "coordinates": [391010.0, 5706010.0] } },
            { "type": "Feature", "properties": { "LeuchtenNr": "L-003" },
              "geometry": null },
            { "type": "Feature", "properties": {},
              "geometry": { "type": "Point", "coordinates": [391020.0, 5706020.0] } }
        ]
    }"#;

    #[test]
    fn should_load_points_and_drop_null_geometry() {
        let file = write_geojson(NETWORK);

        let set = load(file.path(), "LeuchtenNr").unwrap();

        assert_eq!(set.epsg, 25832);
        assert_eq!(set.points.len(), 3);
        assert_eq!(set.dropped_null_geometry, 1);
        assert_eq!(set.points[0].id.as_deref(), Some("L-001"));
        assert_eq!(set.points[0].x, 391000.0);
    }

    #[test]
    fn should_stringify_numeric_ids_and_keep_missing_ids_null() {
        let file = write_geojson(NETWORK);

        let set = load(file.path(), "LeuchtenNr").unwrap();

        assert_eq!(set.points[1].id.as_deref(), Some("17"));
        assert_eq!(set.points[2].id, None);
    }

    #[test]
    fn should_default_to_wgs84_without_crs_member() {
        let file = write_geojson(
            r#"{ "type": "FeatureCollection", "features": [
                { "type": "Feature", "properties": { "LeuchtenNr": "L-001" },
                  "geometry": { "type": "Point", "coordinates": [7.4, 51.5] } }
            ] }"#,
        );

        let set = load(file.path(), "LeuchtenNr").unwrap();

        assert_eq!(set.epsg, 4326);
    }

    #[test]
    fn should_reject_non_point_geometry() {
        let file = write_geojson(
            r#"{ "type": "FeatureCollection", "features": [
                { "type": "Feature", "properties": {},
                  "geometry": { "type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]] } }
            ] }"#,
        );

        assert!(load(file.path(), "LeuchtenNr").is_err());
    }

    #[test]
    fn should_parse_crs_name_variants() {
        assert_eq!(parse_crs_name("urn:ogc:def:crs:EPSG::25832"), Some(25832));
        assert_eq!(parse_crs_name("EPSG:4326"), Some(4326));
        assert_eq!(parse_crs_name("http://www.opengis.net/def/crs/EPSG/0/3857"), Some(3857));
        assert_eq!(parse_crs_name("urn:ogc:def:crs:OGC:1.3:CRS84"), Some(4326));
        assert_eq!(parse_crs_name("not-a-crs"), None);
    }
}
