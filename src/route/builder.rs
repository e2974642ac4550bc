use crate::domain::RawWaypoint;
use crate::path::{GeoJsonError, PathError, RoutePath};
use crate::route::diagnostics::{BatchFailure, BuildDiagnostics};
use crate::route::{RetryPolicy, RoutingService, call_with_retry, overlapping_batches, sanitize_waypoints, stitch};
use chrono::Utc;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

pub const UPSTREAM_SOURCE: &str = "OSRM";

#[derive(Debug, Clone)]
pub struct BuiltRoute {
    pub path: RoutePath,
    pub diagnostics: BuildDiagnostics,
}

/// Builds a road-following path from waypoints by routing overlapping batches through the upstream service. Failed
/// batches are skipped, so the result may have gaps; only a build where every batch fails is an error.
pub struct RouteBuilder {
    service: Arc<dyn RoutingService>,
    policy: RetryPolicy,
    batch_size: usize,
}

impl RouteBuilder {
    pub fn new(service: Arc<dyn RoutingService>, policy: RetryPolicy, batch_size: usize) -> Self {
        RouteBuilder {
            service,
            policy,
            batch_size: batch_size.max(2),
        }
    }

    #[instrument(skip_all, fields(waypoints = raw.len()))]
    pub async fn build(&self, raw: &[RawWaypoint]) -> Result<BuiltRoute, RouteBuildError> {
        let start = Instant::now();
        let mut diagnostics = BuildDiagnostics::new(UPSTREAM_SOURCE, Utc::now().timestamp_millis());

        let sanitized = sanitize_waypoints(raw);
        if !sanitized.issues.is_empty() {
            warn!("⚠️ {} waypoint issue(s) found during sanitation", sanitized.issues.len());
        }
        diagnostics.sanitation = sanitized.issues;

        if sanitized.waypoints.len() < 2 {
            diagnostics.took_ms = start.elapsed().as_millis() as u64;
            return Err(RouteBuildError::InsufficientWaypoints {
                valid: sanitized.waypoints.len(),
                diagnostics: Box::new(diagnostics),
            });
        }

        let points = sanitized.waypoints.iter().map(|w| w.coord()).collect::<Vec<_>>();
        let batches = overlapping_batches(&points, self.batch_size);
        diagnostics.batches_attempted = batches.len();

        info!("🧭 Routing {} waypoints in {} batch(es)...", points.len(), batches.len());
        let mut lines = Vec::with_capacity(batches.len());
        for (index, batch) in batches.iter().enumerate() {
            if batch.len() < 2 {
                continue;
            }

            match call_with_retry(&self.policy, |_| self.service.route(batch)).await {
                Ok(line) => {
                    info!(batch = index, "🧭 Batch {}/{} routed, {} coordinates", index + 1, batches.len(), line.len());
                    diagnostics.batches_succeeded += 1;
                    lines.push(line);
                }
                Err(e) => {
                    warn!(batch = index, "⚠️ Batch {}/{} failed, skipping: {}", index + 1, batches.len(), e);
                    diagnostics.failures.push(BatchFailure {
                        batch_index: index,
                        message: e.to_string(),
                    });
                }
            }
        }

        diagnostics.took_ms = start.elapsed().as_millis() as u64;
        if lines.is_empty() {
            warn!("🧭 Routing {} waypoints... failed, every batch failed", points.len());
            return Err(RouteBuildError::AllBatchesFailed {
                diagnostics: Box::new(diagnostics),
            });
        }

        let path = RoutePath::new(stitch(lines))?;
        diagnostics.point_count = path.coords().len();
        info!(
            "🧭 Routing {} waypoints... OK, {}/{} batches, {:.2} km",
            points.len(),
            diagnostics.batches_succeeded,
            diagnostics.batches_attempted,
            path.total_length_km()
        );

        Ok(BuiltRoute { path, diagnostics })
    }
}

#[derive(Error, Debug)]
pub enum RouteBuildError {
    #[error("not enough valid waypoints after sanitation ({valid} left)")]
    InsufficientWaypoints { valid: usize, diagnostics: Box<BuildDiagnostics> },
    #[error("all routing batches failed")]
    AllBatchesFailed { diagnostics: Box<BuildDiagnostics> },
    #[error("could not read '{}': {source}", path.display())]
    Io { source: io::Error, path: PathBuf },
    #[error("invalid waypoints file '{}': {source}", path.display())]
    InvalidWaypoints { source: serde_json::Error, path: PathBuf },
    #[error("invalid path file '{}': {source}", path.display())]
    InvalidPathFile { source: GeoJsonError, path: PathBuf },
    #[error(transparent)]
    Path(#[from] PathError),
}

impl RouteBuildError {
    pub fn diagnostics(&self) -> Option<&BuildDiagnostics> {
        match self {
            RouteBuildError::InsufficientWaypoints { diagnostics, .. } | RouteBuildError::AllBatchesFailed { diagnostics } => Some(diagnostics),
            _ => None,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::route::UpstreamError;
    use async_trait::async_trait;
    use geo::Coord;
    use pretty_assertions::assert_eq;
    use reqwest::StatusCode;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Duration;
    use test_log::test;

    /// Routes every batch as a straight line through its points, except batches starting at a failing point.
    pub(crate) struct FakeRoutingService {
        failing_starts: HashSet<(i64, i64)>,
        pub(crate) calls: Mutex<Vec<usize>>,
    }

    impl FakeRoutingService {
        pub(crate) fn new() -> Self {
            FakeRoutingService {
                failing_starts: HashSet::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing_at(mut self, start: Coord<f64>) -> Self {
            self.failing_starts.insert(key(start));
            self
        }
    }

    fn key(coord: Coord<f64>) -> (i64, i64) {
        ((coord.x * 1e6).round() as i64, (coord.y * 1e6).round() as i64)
    }

    #[async_trait]
    impl RoutingService for FakeRoutingService {
        async fn route(&self, points: &[Coord<f64>]) -> Result<Vec<Coord<f64>>, UpstreamError> {
            self.calls.lock().expect("calls lock").push(points.len());
            if self.failing_starts.contains(&key(points[0])) {
                return Err(UpstreamError::Status(StatusCode::SERVICE_UNAVAILABLE));
            }
            Ok(points.to_vec())
        }
    }

    pub(crate) fn instant_policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::ZERO, Duration::ZERO, Duration::from_secs(1))
    }

    /// `count` waypoints heading east along Middle Country Road, 0.001° apart.
    pub(crate) fn raw_waypoints(count: usize) -> Vec<RawWaypoint> {
        (0..count).map(|i| RawWaypoint::new(&format!("wp {}", i), 40.8849, -72.99 + i as f64 * 0.001)).collect()
    }

    #[test(tokio::test)]
    async fn build_routes_every_batch_and_stitches_without_duplicate_seams() -> Result<(), RouteBuildError> {
        let service = Arc::new(FakeRoutingService::new());
        let builder = RouteBuilder::new(service.clone(), instant_policy(), 4);

        let built = builder.build(&raw_waypoints(10)).await?;

        assert_eq!(built.path.coords().len(), 10);
        assert_eq!(*service.calls.lock().expect("calls lock"), vec![4, 5, 3]);
        assert_eq!(built.diagnostics.batches_attempted, 3);
        assert_eq!(built.diagnostics.batches_succeeded, 3);
        assert_eq!(built.diagnostics.point_count, 10);
        assert!(built.diagnostics.failures.is_empty());
        Ok(())
    }

    #[test(tokio::test)]
    async fn build_skips_a_batch_that_exhausts_its_retries() -> Result<(), RouteBuildError> {
        let raw = raw_waypoints(10);
        // Second batch starts at the seam point, waypoint 3
        let seam = Coord { x: raw[3].lng.unwrap_or_default(), y: raw[3].lat.unwrap_or_default() };
        let service = Arc::new(FakeRoutingService::new().failing_at(seam));
        let builder = RouteBuilder::new(service.clone(), instant_policy(), 4);

        let built = builder.build(&raw).await?;

        assert_eq!(built.diagnostics.batches_attempted, 3);
        assert_eq!(built.diagnostics.batches_succeeded, 2);
        assert_eq!(
            built.diagnostics.failures,
            vec![BatchFailure {
                batch_index: 1,
                message: "HTTP 503 Service Unavailable".to_string()
            }]
        );
        // Batch 1 was attempted three times
        assert_eq!(*service.calls.lock().expect("calls lock"), vec![4, 5, 5, 5, 3]);
        // Waypoints 0..=3 and 7..=9 remain
        assert_eq!(built.path.coords().len(), 7);
        Ok(())
    }

    #[test(tokio::test)]
    async fn build_fails_when_every_batch_fails() {
        let raw = raw_waypoints(3);
        let start = Coord { x: raw[0].lng.unwrap_or_default(), y: raw[0].lat.unwrap_or_default() };
        let builder = RouteBuilder::new(Arc::new(FakeRoutingService::new().failing_at(start)), instant_policy(), 20);

        let result = builder.build(&raw).await;

        match result {
            Err(RouteBuildError::AllBatchesFailed { diagnostics }) => {
                assert_eq!(diagnostics.batches_attempted, 1);
                assert_eq!(diagnostics.failures.len(), 1);
            }
            other => panic!("expected AllBatchesFailed, got {:?}", other.map(|built| built.diagnostics)),
        }
    }

    #[test(tokio::test)]
    async fn build_fails_without_two_valid_waypoints() {
        let raw = vec![RawWaypoint::new("only", 40.8849, -72.9464), RawWaypoint::new("Paris", 48.8566, 2.3522)];
        let service = Arc::new(FakeRoutingService::new());
        let builder = RouteBuilder::new(service.clone(), instant_policy(), 20);

        let result = builder.build(&raw).await;

        assert!(matches!(result, Err(RouteBuildError::InsufficientWaypoints { valid: 1, .. })));
        assert!(service.calls.lock().expect("calls lock").is_empty());
    }
}
