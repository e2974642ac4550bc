mod features;
mod progress;
mod route_path;

pub use features::{GeoJsonError, coords_to_positions, feature_collection, line_string, path_from_geojson};
pub use progress::{MIN_SEGMENT_KM, ProgressSplit, line_length_km, split};
pub use route_path::{PathError, Projection, RoutePath};
