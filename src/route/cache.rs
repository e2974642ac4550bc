use crate::app_config::AppConfig;
use crate::path::RoutePath;
use crate::route::diagnostics::BuildDiagnostics;
use crate::route::{BuiltRoute, OsrmClient, RetryPolicy, RouteBuildError, RouteBuilder, UpstreamError, load_path_file, load_waypoints};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{info, instrument, warn};

pub const FILE_SOURCE: &str = "file";

/// Where the path comes from. File-backed sources are re-read on every build.
pub enum RouteSource {
    WaypointFile { file: PathBuf, builder: RouteBuilder },
    #[cfg(test)]
    Waypoints { waypoints: Vec<crate::domain::RawWaypoint>, builder: RouteBuilder },
    PathFile { file: PathBuf },
}

impl RouteSource {
    pub fn from_config(config: &AppConfig) -> Result<Self, UpstreamError> {
        if let Some(file) = config.route().path_file() {
            return Ok(RouteSource::PathFile { file: file.clone() });
        }

        let upstream = config.upstream();
        let policy = RetryPolicy::new(upstream.max_attempts(), upstream.retry_ms(), upstream.retry_max_delay_ms(), upstream.timeout_ms()).with_jitter(true);
        let builder = RouteBuilder::new(Arc::new(OsrmClient::new(upstream)?), policy, config.route().batch_size());

        Ok(RouteSource::WaypointFile {
            file: config.route().waypoints_file().clone(),
            builder,
        })
    }

    async fn build(&self) -> Result<BuiltRoute, RouteBuildError> {
        match self {
            RouteSource::WaypointFile { file, builder } => builder.build(&load_waypoints(file).await?).await,
            #[cfg(test)]
            RouteSource::Waypoints { waypoints, builder } => builder.build(waypoints).await,
            RouteSource::PathFile { file } => {
                let start = Instant::now();
                let mut diagnostics = BuildDiagnostics::new(FILE_SOURCE, Utc::now().timestamp_millis());
                let path = load_path_file(file).await?;
                diagnostics.point_count = path.coords().len();
                diagnostics.took_ms = start.elapsed().as_millis() as u64;
                Ok(BuiltRoute { path, diagnostics })
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct CachedRoute {
    pub path: Arc<RoutePath>,
    pub built_at: i64,
    pub diagnostics: BuildDiagnostics,
}

/// Holds the most recently built path. Readers always see a complete path; builds are serialized and a failed
/// build leaves the previous path in place.
pub struct RouteCache {
    source: RouteSource,
    cached: RwLock<Option<CachedRoute>>,
    last_diagnostics: RwLock<Option<BuildDiagnostics>>,
    build_lock: Mutex<()>,
}

impl RouteCache {
    pub fn new(source: RouteSource) -> Self {
        RouteCache {
            source,
            cached: RwLock::new(None),
            last_diagnostics: RwLock::new(None),
            build_lock: Mutex::new(()),
        }
    }

    /// The cached path, building it first if nothing has been built yet.
    pub async fn current(&self) -> Result<CachedRoute, RouteBuildError> {
        if let Some(cached) = self.cached().await {
            return Ok(cached);
        }

        let _guard = self.build_lock.lock().await;
        // Another request may have finished a build while this one waited
        if let Some(cached) = self.cached().await {
            return Ok(cached);
        }
        self.rebuild().await
    }

    pub async fn cached(&self) -> Option<CachedRoute> {
        self.cached.read().await.clone()
    }

    pub async fn last_diagnostics(&self) -> Option<BuildDiagnostics> {
        self.last_diagnostics.read().await.clone()
    }

    /// Rebuilds the path regardless of the cache.
    #[instrument(skip(self))]
    pub async fn reload(&self) -> Result<CachedRoute, RouteBuildError> {
        let _guard = self.build_lock.lock().await;
        self.rebuild().await
    }

    async fn rebuild(&self) -> Result<CachedRoute, RouteBuildError> {
        info!("🗺️ Building route...");
        match self.source.build().await {
            Ok(built) => {
                let cached = CachedRoute {
                    path: Arc::new(built.path),
                    built_at: Utc::now().timestamp_millis(),
                    diagnostics: built.diagnostics,
                };
                *self.last_diagnostics.write().await = Some(cached.diagnostics.clone());
                *self.cached.write().await = Some(cached.clone());
                info!("🗺️ Building route... OK, {} points, {:.2} km", cached.path.coords().len(), cached.path.total_length_km());
                Ok(cached)
            }
            Err(e) => {
                if let Some(diagnostics) = e.diagnostics() {
                    *self.last_diagnostics.write().await = Some(diagnostics.clone());
                }
                warn!("🗺️ Building route... failed, {}", e);
                Err(e)
            }
        }
    }
}
