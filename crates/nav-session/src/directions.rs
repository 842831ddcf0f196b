//! Directions service abstraction and its HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use nav_core::{NavError, Route, Waypoint};

/// Failures reported by a directions service.
#[derive(Debug, Error)]
pub enum DirectionsError {
    #[error("directions request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("directions service returned status {status}")]
    Status { status: u16 },

    #[error("directions service returned no route")]
    NoRoute,

    #[error("directions service returned an unusable route: {0}")]
    InvalidRoute(#[from] NavError),

    #[error("directions service unavailable: {0}")]
    Unavailable(String),
}

/// Computes routes through an ordered list of waypoints.
///
/// Implementations may return several candidate routes; the first one is
/// used. Calls can be abandoned at any await point.
#[async_trait]
pub trait DirectionsService: Send + Sync {
    async fn calculate(&self, waypoints: &[Waypoint]) -> Result<Vec<Route>, DirectionsError>;
}

#[derive(Debug, Serialize)]
struct DirectionsRequest<'a> {
    waypoints: &'a [Waypoint],
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    routes: Vec<Route>,
}

/// HTTP client for a JSON directions endpoint.
pub struct HttpDirectionsClient {
    client: Client,
    base_url: String,
}

impl HttpDirectionsClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, DirectionsError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl DirectionsService for HttpDirectionsClient {
    async fn calculate(&self, waypoints: &[Waypoint]) -> Result<Vec<Route>, DirectionsError> {
        let url = format!("{}/v1/directions", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&DirectionsRequest { waypoints })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DirectionsError::Status {
                status: status.as_u16(),
            });
        }

        let body: DirectionsResponse = response.json().await?;
        tracing::debug!(
            waypoints = waypoints.len(),
            routes = body.routes.len(),
            "directions response received"
        );
        Ok(body.routes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nav_core::Coordinate;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = HttpDirectionsClient::new("http://localhost:5000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000");
    }

    #[test]
    fn request_serializes_heading_only_when_present() {
        let waypoints = vec![
            Waypoint::new(Coordinate::new(33.0, -117.0)).with_heading(45.0, 90.0),
            Waypoint::new(Coordinate::new(33.1, -117.1)),
        ];
        let json = serde_json::to_value(DirectionsRequest {
            waypoints: &waypoints,
        })
        .unwrap();

        assert_eq!(json["waypoints"][0]["heading_deg"], 45.0);
        assert_eq!(json["waypoints"][0]["heading_accuracy_deg"], 90.0);
        assert!(json["waypoints"][1].get("heading_deg").is_none());
    }

    #[test]
    fn missing_routes_decode_as_empty() {
        let body: DirectionsResponse = serde_json::from_str("{}").unwrap();
        assert!(body.routes.is_empty());
    }
}
