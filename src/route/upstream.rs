use crate::app_config::Upstream;
use async_trait::async_trait;
use geo::Coord;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

/// Turns a sequence of points into a road-following line.
#[async_trait]
pub trait RoutingService: Send + Sync {
    async fn route(&self, points: &[Coord<f64>]) -> Result<Vec<Coord<f64>>, UpstreamError>;
}

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {0}")]
    Status(StatusCode),
    #[error("routing service returned no geometry")]
    NoGeometry,
}

/// Client for an OSRM-compatible `route` endpoint.
#[derive(Debug, Clone)]
pub struct OsrmClient {
    client: Client,
    url: String,
    profile: String,
}

impl OsrmClient {
    pub fn new(config: &Upstream) -> Result<Self, UpstreamError> {
        let client = Client::builder().user_agent(config.user_agent()).build()?;

        Ok(OsrmClient {
            client,
            url: config.url().trim_end_matches('/').to_string(),
            profile: config.profile().to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: Option<OsrmGeometry>,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}

#[async_trait]
impl RoutingService for OsrmClient {
    #[instrument(skip_all, fields(points = points.len()))]
    async fn route(&self, points: &[Coord<f64>]) -> Result<Vec<Coord<f64>>, UpstreamError> {
        let coordinates = points.iter().map(|c| format!("{},{}", c.x, c.y)).collect::<Vec<_>>().join(";");
        let url = format!("{}/route/v1/{}/{}", self.url, self.profile, coordinates);

        let response = self
            .client
            .get(&url)
            .query(&[("overview", "full"), ("geometries", "geojson"), ("steps", "false")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(UpstreamError::Status(response.status()));
        }

        let body = response.json::<OsrmResponse>().await?;
        let coords = body
            .routes
            .into_iter()
            .next()
            .and_then(|route| route.geometry)
            .map(|geometry| geometry.coordinates.into_iter().map(|[x, y]| Coord { x, y }).collect::<Vec<_>>())
            .filter(|coords| coords.len() >= 2)
            .ok_or(UpstreamError::NoGeometry)?;

        debug!("🧭 Routing service returned {} coordinates", coords.len());
        Ok(coords)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::AppConfigBuilder;
    use mockito::Matcher;
    use pretty_assertions::assert_eq;

    fn batch() -> Vec<Coord<f64>> {
        vec![Coord { x: -72.9464, y: 40.8849 }, Coord { x: -72.94235, y: 40.88387 }]
    }

    #[tokio::test]
    async fn route_returns_the_first_route_geometry() -> Result<(), UpstreamError> {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Regex(r"^/route/v1/driving/-72\.9464,40\.8849;-72\.94235,40\.88387".to_string()))
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("overview".to_string(), "full".to_string()),
                Matcher::UrlEncoded("geometries".to_string(), "geojson".to_string()),
            ]))
            .match_header("user-agent", "sleigh-test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(include_str!("../../tests/resources/osrm_route_response.json"))
            .create_async()
            .await;

        let config = AppConfigBuilder::new().upstream_url(server.url()).build();
        let client = OsrmClient::new(config.upstream())?;

        let coords = client.route(&batch()).await?;

        mock.assert_async().await;
        assert_eq!(coords.len(), 4);
        assert_eq!(coords[0], Coord { x: -72.946411, y: 40.884893 });
        Ok(())
    }

    #[tokio::test]
    async fn route_fails_on_error_status() -> Result<(), UpstreamError> {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Regex(r"^/route/v1/".to_string()))
            .with_status(429)
            .create_async()
            .await;

        let config = AppConfigBuilder::new().upstream_url(server.url()).build();
        let client = OsrmClient::new(config.upstream())?;

        let result = client.route(&batch()).await;

        assert!(matches!(result, Err(UpstreamError::Status(StatusCode::TOO_MANY_REQUESTS))));
        Ok(())
    }

    #[tokio::test]
    async fn route_fails_without_geometry() -> Result<(), UpstreamError> {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", Matcher::Regex(r"^/route/v1/".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{ "code": "NoRoute", "routes": [] }"#)
            .create_async()
            .await;

        let config = AppConfigBuilder::new().upstream_url(server.url()).build();
        let client = OsrmClient::new(config.upstream())?;

        let result = client.route(&batch()).await;

        assert!(matches!(result, Err(UpstreamError::NoGeometry)));
        Ok(())
    }
}
