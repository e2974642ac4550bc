use config::{Config, ConfigError};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    core: Core,
    server: Server,
    auth: Auth,
    route: Route,
    upstream: Upstream,
    viewer: Viewer,
    simulator: Simulator,
}

impl AppConfig {
    pub fn load() -> Result<Self, AppConfigError> {
        let config: AppConfig = Config::builder()
            .add_source(config::File::with_name("config").required(true))
            .add_source(config::File::with_name("config_local").required(false))
            .add_source(config::Environment::with_prefix("SLEIGH").separator("__"))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppConfigError> {
        if self.auth.shared_secret.is_empty() {
            return Err(AppConfigError::Invalid("auth.shared_secret must not be empty".to_string()));
        }
        if self.route.batch_size < 2 {
            return Err(AppConfigError::Invalid(format!("route.batch_size must be at least 2, was {}", self.route.batch_size)));
        }
        if self.upstream.max_attempts == 0 {
            return Err(AppConfigError::Invalid("upstream.max_attempts must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn core(&self) -> &Core {
        &self.core
    }

    pub fn server(&self) -> &Server {
        &self.server
    }

    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn upstream(&self) -> &Upstream {
        &self.upstream
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    pub fn simulator(&self) -> &Simulator {
        &self.simulator
    }
}

#[derive(Error, Debug)]
pub enum AppConfigError {
    #[error("could not load configuration: {0}")]
    Load(#[from] ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct Core {
    store_buffer_size: usize,
    event_buffer_size: usize,
}

impl Core {
    pub fn store_buffer_size(&self) -> usize {
        self.store_buffer_size
    }

    pub fn event_buffer_size(&self) -> usize {
        self.event_buffer_size
    }
}

#[derive(Debug, Deserialize)]
pub struct Server {
    bind_address: String,
}

impl Server {
    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }
}

#[derive(Deserialize)]
pub struct Auth {
    shared_secret: String,
}

impl Auth {
    pub fn shared_secret(&self) -> &str {
        &self.shared_secret
    }
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auth").field("shared_secret", &"<redacted>").finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct Route {
    name: String,
    waypoints_file: PathBuf,
    path_file: Option<PathBuf>,
    batch_size: usize,
}

impl Route {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn waypoints_file(&self) -> &PathBuf {
        &self.waypoints_file
    }

    pub fn path_file(&self) -> Option<&PathBuf> {
        self.path_file.as_ref()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

#[derive(Debug, Deserialize)]
pub struct Upstream {
    url: String,
    profile: String,
    user_agent: String,
    max_attempts: usize,
    retry_ms: u64,
    retry_max_delay_ms: u64,
    timeout_ms: u64,
}

impl Upstream {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn retry_ms(&self) -> Duration {
        Duration::from_millis(self.retry_ms)
    }

    pub fn retry_max_delay_ms(&self) -> Duration {
        Duration::from_millis(self.retry_max_delay_ms)
    }

    pub fn timeout_ms(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Deserialize)]
pub struct Viewer {
    server_url: String,
    sync_interval_ms: u64,
    location_poll_interval_ms: u64,
    stale_connection_timeout_ms: u64,
    retry_ms: u64,
    retry_max_delay_ms: u64,
}

impl Viewer {
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn sync_interval_ms(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms)
    }

    pub fn location_poll_interval_ms(&self) -> Duration {
        Duration::from_millis(self.location_poll_interval_ms)
    }

    pub fn stale_connection_timeout_ms(&self) -> Duration {
        Duration::from_millis(self.stale_connection_timeout_ms)
    }

    pub fn retry_ms(&self) -> Duration {
        Duration::from_millis(self.retry_ms)
    }

    pub fn retry_max_delay_ms(&self) -> Duration {
        Duration::from_millis(self.retry_max_delay_ms)
    }
}

#[derive(Debug, Deserialize)]
pub struct Simulator {
    interval_ms: u64,
    accuracy_m: f64,
}

impl Simulator {
    pub fn interval_ms(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn accuracy_m(&self) -> f64 {
        self.accuracy_m
    }
}

#[cfg(test)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

#[cfg(test)]
impl AppConfigBuilder {
    pub fn new() -> Self {
        AppConfigBuilder {
            config: AppConfig {
                core: Core {
                    store_buffer_size: 8,
                    event_buffer_size: 16,
                },
                server: Server {
                    bind_address: "127.0.0.1:0".to_string(),
                },
                auth: Auth {
                    shared_secret: "secret".to_string(),
                },
                route: Route {
                    name: "Test Parade".to_string(),
                    waypoints_file: PathBuf::from(format!("{}/tests/resources/waypoints.json", env!("CARGO_MANIFEST_DIR"))),
                    path_file: None,
                    batch_size: 20,
                },
                upstream: Upstream {
                    url: "https://router.url".to_string(),
                    profile: "driving".to_string(),
                    user_agent: "sleigh-test".to_string(),
                    max_attempts: 2,
                    retry_ms: 0,
                    retry_max_delay_ms: 10,
                    timeout_ms: 1_000,
                },
                viewer: Viewer {
                    server_url: "http://localhost:3000".to_string(),
                    sync_interval_ms: 8_000,
                    location_poll_interval_ms: 10_000,
                    stale_connection_timeout_ms: 30_000,
                    retry_ms: 100,
                    retry_max_delay_ms: 200,
                },
                simulator: Simulator {
                    interval_ms: 0,
                    accuracy_m: 8.0,
                },
            },
        }
    }

    pub fn upstream_url(mut self, url: String) -> Self {
        self.config.upstream.url = url;
        self
    }

    pub fn server_url(mut self, url: String) -> Self {
        self.config.viewer.server_url = url;
        self
    }

    pub fn path_file(mut self, path_file: PathBuf) -> Self {
        self.config.route.path_file = Some(path_file);
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.route.batch_size = batch_size;
        self
    }

    pub fn event_buffer_size(mut self, event_buffer_size: usize) -> Self {
        self.config.core.event_buffer_size = event_buffer_size;
        self
    }

    pub fn viewer_retry(mut self, retry_ms: u64, retry_max_delay_ms: u64) -> Self {
        self.config.viewer.retry_ms = retry_ms;
        self.config.viewer.retry_max_delay_ms = retry_max_delay_ms;
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}
