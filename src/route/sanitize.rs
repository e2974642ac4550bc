use crate::domain::{RawWaypoint, Waypoint};
use serde::Serialize;

// Regional sanity box for the parade area.
const LAT_RANGE: (f64, f64) = (40.0, 41.5);
const LNG_RANGE: (f64, f64) = (-74.0, -71.0);

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SanitationIssue {
    pub index: i64,
    pub name: String,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sanitized {
    pub waypoints: Vec<Waypoint>,
    pub issues: Vec<SanitationIssue>,
}

/// Drops waypoints without numeric coordinates or outside the sanity box, and collapses consecutive duplicates
/// (equal to 6 decimals). Issues are collected rather than raised; a global issue is added when fewer than two
/// waypoints remain.
pub fn sanitize_waypoints(raw: &[RawWaypoint]) -> Sanitized {
    let mut waypoints = Vec::with_capacity(raw.len());
    let mut issues = Vec::new();
    let mut last_key: Option<(i64, i64)> = None;

    for (index, waypoint) in raw.iter().enumerate() {
        let name = waypoint.name.clone().unwrap_or_else(|| format!("wp_{}", index));

        let (Some(lat), Some(lng)) = (waypoint.lat, waypoint.lng) else {
            issues.push(SanitationIssue {
                index: index as i64,
                name,
                reason: "Non-numeric lat/lng".to_string(),
            });
            continue;
        };

        if !(LAT_RANGE.0..=LAT_RANGE.1).contains(&lat) || !(LNG_RANGE.0..=LNG_RANGE.1).contains(&lng) {
            issues.push(SanitationIssue {
                index: index as i64,
                name,
                reason: "Lat/lng out of expected bounds".to_string(),
            });
            continue;
        }

        let key = (micro_degrees(lat), micro_degrees(lng));
        if last_key == Some(key) {
            continue;
        }
        last_key = Some(key);

        waypoints.push(Waypoint { name, lat, lng });
    }

    if waypoints.len() < 2 {
        issues.push(SanitationIssue {
            index: -1,
            name: "global".to_string(),
            reason: "Fewer than 2 valid waypoints after sanitation".to_string(),
        });
    }

    Sanitized { waypoints, issues }
}

fn micro_degrees(degrees: f64) -> i64 {
    (degrees * 1e6).round() as i64
}
