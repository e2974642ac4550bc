use crate::path::RoutePath;
use crate::path::route_path::haversine_km;
use geo::Coord;

/// Sub-paths shorter than this (one millimetre) are treated as empty and never emitted as geometry.
pub const MIN_SEGMENT_KM: f64 = 1e-6;

/// A path partitioned at some along-path distance. Derived on demand, never stored.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressSplit {
    pub distance_km: f64,
    pub total_km: f64,
    pub completed: Option<Vec<Coord<f64>>>,
    pub upcoming: Option<Vec<Coord<f64>>>,
}

impl ProgressSplit {
    pub fn completed_km(&self) -> f64 {
        self.distance_km
    }

    pub fn upcoming_km(&self) -> f64 {
        self.total_km - self.distance_km
    }

    pub fn fraction(&self) -> f64 {
        if self.total_km > 0.0 { self.distance_km / self.total_km } else { 0.0 }
    }
}

/// Splits `path` into a completed prefix and an upcoming suffix at `distance_km`. The distance saturates to
/// `[0, total]` first, so noisy projections never fail. Pure: the same input always gives the same split.
pub fn split(path: &RoutePath, distance_km: f64) -> ProgressSplit {
    let total_km = path.total_length_km();
    let distance_km = path.clamp(distance_km);

    let completed = (distance_km > MIN_SEGMENT_KM).then(|| path.slice(0.0, distance_km));
    let upcoming = (total_km - distance_km > MIN_SEGMENT_KM).then(|| path.slice(distance_km, total_km));

    ProgressSplit {
        distance_km,
        total_km,
        completed,
        upcoming,
    }
}

pub fn line_length_km(coords: &[Coord<f64>]) -> f64 {
    coords.windows(2).map(|pair| haversine_km(pair[0], pair[1])).sum()
}
