use crate::domain::Waypoint;
use geo::{Coord, Distance, Haversine, Point};
use thiserror::Error;

const METERS_PER_KM: f64 = 1_000.0;
// Mean earth radius as used by geo's haversine, in kilometers.
const EARTH_RADIUS_KM: f64 = 6_371.0088;

/// The fixed route: an ordered line of at least two coordinates (`x` = longitude, `y` = latitude) with precomputed
/// cumulative great-circle distances.
#[derive(Clone, Debug, PartialEq)]
pub struct RoutePath {
    coords: Vec<Coord<f64>>,
    cumulative_km: Vec<f64>,
}

/// The closest point on a path to some position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    /// Distance from the path start to `point`, along the path.
    pub distance_km: f64,
    /// Distance between the projected position and `point`.
    pub offset_km: f64,
    pub point: Coord<f64>,
    pub segment: usize,
}

impl RoutePath {
    pub fn new(coords: Vec<Coord<f64>>) -> Result<Self, PathError> {
        if coords.len() < 2 {
            return Err(PathError::InsufficientPoints(coords.len()));
        }
        if let Some(index) = coords.iter().position(|c| !c.x.is_finite() || !c.y.is_finite()) {
            return Err(PathError::NonFiniteCoordinate(index));
        }

        let mut cumulative_km = Vec::with_capacity(coords.len());
        let mut total = 0.0;
        cumulative_km.push(total);
        for pair in coords.windows(2) {
            total += haversine_km(pair[0], pair[1]);
            cumulative_km.push(total);
        }

        Ok(RoutePath { coords, cumulative_km })
    }

    pub fn from_waypoints(waypoints: &[Waypoint]) -> Result<Self, PathError> {
        RoutePath::new(waypoints.iter().map(Waypoint::coord).collect())
    }

    pub fn coords(&self) -> &[Coord<f64>] {
        &self.coords
    }

    pub fn cumulative_km(&self) -> &[f64] {
        &self.cumulative_km
    }

    pub fn total_length_km(&self) -> f64 {
        self.cumulative_km.last().copied().unwrap_or_default()
    }

    pub fn project_distance(&self, point: Coord<f64>) -> f64 {
        self.project(point).distance_km
    }

    /// Nearest point on the path to `point`. Every segment is measured in a local equirectangular plane centred on
    /// it; on ties the earliest segment wins so that revisited stretches resolve to the first pass.
    pub fn project(&self, point: Coord<f64>) -> Projection {
        let mut best = Projection {
            distance_km: 0.0,
            offset_km: f64::INFINITY,
            point: self.coords[0],
            segment: 0,
        };

        for (segment, pair) in self.coords.windows(2).enumerate() {
            let (a, b) = (pair[0], pair[1]);
            let (kx, ky) = plane_scale((a.y + b.y) / 2.0);

            let ab = ((b.x - a.x) * kx, (b.y - a.y) * ky);
            let ap = ((point.x - a.x) * kx, (point.y - a.y) * ky);
            let length_squared = ab.0 * ab.0 + ab.1 * ab.1;
            let t = if length_squared > 0.0 {
                ((ap.0 * ab.0 + ap.1 * ab.1) / length_squared).clamp(0.0, 1.0)
            } else {
                0.0
            };

            let offset_km = (ap.0 - t * ab.0).hypot(ap.1 - t * ab.1);
            if offset_km < best.offset_km {
                let segment_km = self.cumulative_km[segment + 1] - self.cumulative_km[segment];
                best = Projection {
                    distance_km: self.cumulative_km[segment] + t * segment_km,
                    offset_km,
                    point: interpolate(a, b, t),
                    segment,
                };
            }
        }

        best
    }

    /// Position at `distance_km` along the path, saturating at both ends.
    pub fn point_at(&self, distance_km: f64) -> Coord<f64> {
        let distance_km = self.clamp(distance_km);
        let index = self.cumulative_km.partition_point(|&c| c < distance_km);
        if index == 0 {
            return self.coords[0];
        }

        let segment = index - 1;
        let segment_km = self.cumulative_km[index] - self.cumulative_km[segment];
        let t = if segment_km > 0.0 {
            (distance_km - self.cumulative_km[segment]) / segment_km
        } else {
            0.0
        };
        interpolate(self.coords[segment], self.coords[index], t)
    }

    /// Coordinates of the sub-path between two along-path distances, both clamped to the path.
    pub fn slice(&self, start_km: f64, end_km: f64) -> Vec<Coord<f64>> {
        let start_km = self.clamp(start_km);
        let end_km = self.clamp(end_km).max(start_km);

        let first = self.cumulative_km.partition_point(|&c| c <= start_km);
        let last = self.cumulative_km.partition_point(|&c| c < end_km);

        let mut coords = Vec::with_capacity(last.saturating_sub(first) + 2);
        coords.push(self.point_at(start_km));
        if first < last {
            coords.extend_from_slice(&self.coords[first..last]);
        }
        coords.push(self.point_at(end_km));
        coords
    }

    pub fn clamp(&self, distance_km: f64) -> f64 {
        if distance_km.is_nan() {
            return 0.0;
        }
        distance_km.clamp(0.0, self.total_length_km())
    }
}

pub(crate) fn haversine_km(a: Coord<f64>, b: Coord<f64>) -> f64 {
    Haversine::distance(Point::from(a), Point::from(b)) / METERS_PER_KM
}

fn plane_scale(latitude: f64) -> (f64, f64) {
    let km_per_degree = EARTH_RADIUS_KM.to_radians();
    (km_per_degree * latitude.to_radians().cos(), km_per_degree)
}

fn interpolate(a: Coord<f64>, b: Coord<f64>, t: f64) -> Coord<f64> {
    Coord {
        x: a.x + (b.x - a.x) * t,
        y: a.y + (b.y - a.y) * t,
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum PathError {
    #[error("a path needs at least 2 points, got {0}")]
    InsufficientPoints(usize),
    #[error("coordinate {0} is not a finite number")]
    NonFiniteCoordinate(usize),
}
