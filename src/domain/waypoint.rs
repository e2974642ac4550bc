use geo::Coord;
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Waypoint {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

impl Waypoint {
    pub fn coord(&self) -> Coord<f64> {
        Coord { x: self.lng, y: self.lat }
    }
}

/// A waypoint as written in the configuration file. Coordinates may be numbers or numeric strings.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawWaypoint {
    pub name: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl RawWaypoint {
    pub fn new(name: &str, lat: f64, lng: f64) -> Self {
        RawWaypoint {
            name: Some(name.to_string()),
            lat: Some(lat),
            lng: Some(lng),
        }
    }
}

impl From<&Value> for RawWaypoint {
    fn from(value: &Value) -> Self {
        let name = match value.get("name") {
            Some(Value::String(name)) if !name.is_empty() => Some(name.clone()),
            Some(Value::Null) | Some(Value::String(_)) | None => None,
            Some(other) => Some(other.to_string()),
        };

        RawWaypoint {
            name,
            lat: value.get("lat").and_then(coerce_number),
            lng: value.get("lng").and_then(coerce_number),
        }
    }
}

fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}
