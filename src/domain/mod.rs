pub mod commands;
mod epoch;
pub mod events;
mod location_fix;
mod waypoint;

pub use epoch::Epoch;
pub use location_fix::{FixSubmission, InvalidFix, LocationFix};
pub use waypoint::{RawWaypoint, Waypoint};
