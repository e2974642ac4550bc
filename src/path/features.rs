use crate::path::{PathError, RoutePath};
use crate::route::stitch;
use geo::{Coord, LineString};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Position};
use serde_json::Value;
use thiserror::Error;

/// The route as served to viewers: a collection with a single line feature.
pub fn feature_collection(path: &RoutePath, name: &str, source: &str) -> FeatureCollection {
    let mut properties = JsonObject::new();
    properties.insert("name".to_string(), Value::from(name));
    properties.insert("source".to_string(), Value::from(source));

    FeatureCollection {
        bbox: None,
        features: vec![Feature {
            bbox: None,
            geometry: Some(line_string(path.coords())),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        }],
        foreign_members: None,
    }
}

pub fn line_string(coords: &[Coord<f64>]) -> Geometry {
    Geometry::from(&LineString::from(coords.to_vec()))
}

/// Reads a path from any GeoJSON document. Line geometries are joined in document order; points, polygons and
/// other non-line geometries are skipped. Positions may carry an altitude, which is dropped.
pub fn path_from_geojson(value: Value) -> Result<RoutePath, GeoJsonError> {
    let lines = match GeoJson::from_json_value(value)? {
        GeoJson::FeatureCollection(collection) => {
            let mut lines = Vec::new();
            for geometry in collection.features.into_iter().filter_map(|feature| feature.geometry) {
                collect_lines(geometry.value, &mut lines)?;
            }
            lines
        }
        GeoJson::Feature(feature) => {
            let mut lines = Vec::new();
            if let Some(geometry) = feature.geometry {
                collect_lines(geometry.value, &mut lines)?;
            }
            lines
        }
        GeoJson::Geometry(geometry) => {
            let mut lines = Vec::new();
            collect_lines(geometry.value, &mut lines)?;
            lines
        }
    };

    if lines.is_empty() {
        return Err(GeoJsonError::NoLineGeometry);
    }

    Ok(RoutePath::new(stitch(lines))?)
}

fn collect_lines(value: geojson::Value, lines: &mut Vec<Vec<Coord<f64>>>) -> Result<(), GeoJsonError> {
    match value {
        geojson::Value::LineString(positions) => lines.push(positions_to_coords(positions)?),
        geojson::Value::MultiLineString(parts) => {
            for positions in parts {
                lines.push(positions_to_coords(positions)?);
            }
        }
        geojson::Value::GeometryCollection(geometries) => {
            for geometry in geometries {
                collect_lines(geometry.value, lines)?;
            }
        }
        _ => {}
    }
    Ok(())
}

pub fn coords_to_positions(coords: &[Coord<f64>]) -> Vec<[f64; 2]> {
    coords.iter().map(|c| [c.x, c.y]).collect()
}

fn positions_to_coords(positions: Vec<Position>) -> Result<Vec<Coord<f64>>, GeoJsonError> {
    positions
        .into_iter()
        .map(|position| match position[..] {
            [x, y, ..] => Ok(Coord { x, y }),
            _ => Err(GeoJsonError::ShortPosition(position.len())),
        })
        .collect()
}

#[derive(Error, Debug)]
pub enum GeoJsonError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),
    #[error("GeoJSON position has {0} values, expected at least 2")]
    ShortPosition(usize),
    #[error("GeoJSON document has no line geometry")]
    NoLineGeometry,
    #[error(transparent)]
    Path(#[from] PathError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn path() -> RoutePath {
        RoutePath::new(vec![Coord { x: -72.9464, y: 40.8849 }, Coord { x: -72.94235, y: 40.88387 }]).expect("valid path")
    }

    #[test]
    fn feature_collection_serializes_as_geojson() -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(feature_collection(&path(), "Santa Parade", "OSRM"))?;

        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["features"][0]["type"], "Feature");
        assert_eq!(value["features"][0]["properties"], json!({ "name": "Santa Parade", "source": "OSRM" }));
        assert_eq!(
            value["features"][0]["geometry"],
            json!({ "type": "LineString", "coordinates": [[-72.9464, 40.8849], [-72.94235, 40.88387]] })
        );
        Ok(())
    }

    #[test]
    fn path_from_geojson_reads_served_collections_back() -> Result<(), GeoJsonError> {
        let value = serde_json::to_value(feature_collection(&path(), "Santa Parade", "OSRM"))?;

        assert_eq!(path_from_geojson(value)?, path());
        Ok(())
    }

    #[test]
    fn path_from_geojson_joins_multi_line_strings_without_duplicate_seams() -> Result<(), GeoJsonError> {
        let value = json!({
            "type": "MultiLineString",
            "coordinates": [[[0.0, 0.0], [1.0, 0.0]], [[1.0, 0.0], [2.0, 0.0]]]
        });

        let result = path_from_geojson(value)?;

        assert_eq!(result.coords().len(), 3);
        Ok(())
    }

    #[test]
    fn path_from_geojson_accepts_bare_features() -> Result<(), GeoJsonError> {
        let value = json!({
            "type": "Feature",
            "properties": null,
            "geometry": { "type": "LineString", "coordinates": [[0.0, 0.0], [0.0, 1.0]] }
        });

        assert_eq!(path_from_geojson(value)?.coords().len(), 2);
        Ok(())
    }

    #[test]
    fn path_from_geojson_drops_altitudes() -> Result<(), GeoJsonError> {
        let value = json!({
            "type": "LineString",
            "coordinates": [[-72.9464, 40.8849, 12.5], [-72.94235, 40.88387, 14.0]]
        });

        assert_eq!(path_from_geojson(value)?, path());
        Ok(())
    }

    #[test]
    fn path_from_geojson_skips_point_markers_between_lines() -> Result<(), GeoJsonError> {
        let value = json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": { "name": "Start" }, "geometry": { "type": "Point", "coordinates": [0.0, 0.0] } },
                { "type": "Feature", "properties": null, "geometry": { "type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 0.0]] } },
                { "type": "Feature", "properties": { "name": "Judges" }, "geometry": { "type": "Point", "coordinates": [1.0, 0.0] } },
                { "type": "Feature", "properties": null, "geometry": { "type": "LineString", "coordinates": [[1.0, 0.0], [2.0, 0.0]] } }
            ]
        });

        let result = path_from_geojson(value)?;

        assert_eq!(result.coords(), &[Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 0.0 }, Coord { x: 2.0, y: 0.0 }]);
        Ok(())
    }

    #[test]
    fn path_from_geojson_rejects_documents_with_only_points() {
        let result = path_from_geojson(json!({ "type": "Point", "coordinates": [0.0, 0.0] }));

        assert!(matches!(result, Err(GeoJsonError::NoLineGeometry)));
    }

    #[test]
    fn path_from_geojson_rejects_single_point_lines() {
        let result = path_from_geojson(json!({ "type": "LineString", "coordinates": [[0.0, 0.0]] }));

        assert!(matches!(result, Err(GeoJsonError::Path(PathError::InsufficientPoints(1)))));
    }
}
