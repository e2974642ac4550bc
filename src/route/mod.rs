mod batches;
mod builder;
mod cache;
mod diagnostics;
mod loader;
mod retry;
mod sanitize;
mod upstream;

pub use batches::{overlapping_batches, stitch};
pub use builder::{BuiltRoute, RouteBuildError, RouteBuilder, UPSTREAM_SOURCE};
pub use cache::{CachedRoute, FILE_SOURCE, RouteCache, RouteSource};
pub use diagnostics::{BatchFailure, BuildDiagnostics};
pub use loader::{load_path_file, load_waypoints};
pub use retry::{RetryError, RetryPolicy, call_with_retry};
pub use sanitize::{SanitationIssue, Sanitized, sanitize_waypoints};
pub use upstream::{OsrmClient, RoutingService, UpstreamError};

#[cfg(test)]
pub(crate) use builder::tests::{FakeRoutingService, instant_policy, raw_waypoints};
