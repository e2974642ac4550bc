use geo::Coord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The single most recent known position of the tracked vehicle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationFix {
    pub lat: f64,
    pub lng: f64,
    pub accuracy: Option<f64>,
    pub client_timestamp: i64,
    pub server_timestamp: i64,
}

impl LocationFix {
    pub fn coord(&self) -> Coord<f64> {
        Coord { x: self.lng, y: self.lat }
    }
}

/// A fix as submitted by the tracker, before validation.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct FixSubmission {
    #[serde(default)]
    pub lat: Option<Value>,
    #[serde(default)]
    pub lng: Option<Value>,
    #[serde(default)]
    pub accuracy: Option<Value>,
    #[serde(default, alias = "clientTimestamp")]
    pub ts: Option<Value>,
}

impl FixSubmission {
    pub fn new(lat: f64, lng: f64) -> Self {
        FixSubmission {
            lat: Some(Value::from(lat)),
            lng: Some(Value::from(lng)),
            accuracy: None,
            ts: None,
        }
    }

    pub fn into_fix(self, server_timestamp: i64) -> Result<LocationFix, InvalidFix> {
        let lat = finite_number(self.lat.as_ref()).ok_or(InvalidFix::MissingCoordinate("lat"))?;
        let lng = finite_number(self.lng.as_ref()).ok_or(InvalidFix::MissingCoordinate("lng"))?;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(InvalidFix::OutOfRange { lat, lng });
        }

        let client_timestamp = self.ts.as_ref().and_then(Value::as_i64).unwrap_or(server_timestamp);

        Ok(LocationFix {
            lat,
            lng,
            accuracy: finite_number(self.accuracy.as_ref()),
            client_timestamp,
            server_timestamp,
        })
    }
}

fn finite_number(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|n| n.is_finite())
}

#[derive(Error, Debug, PartialEq)]
pub enum InvalidFix {
    #[error("missing or non-numeric {0}")]
    MissingCoordinate(&'static str),
    #[error("coordinate out of range: {lat}, {lng}")]
    OutOfRange { lat: f64, lng: f64 },
}
