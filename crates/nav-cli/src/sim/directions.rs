//! In-process directions service for offline simulation.

use std::time::Duration;

use async_trait::async_trait;

use nav_core::{Coordinate, Route, Waypoint};
use nav_session::{DirectionsError, DirectionsService};

use super::scenarios::route_through;

/// Answers every request with straight lines between the waypoints after a
/// fixed latency. Heading constraints are ignored.
#[derive(Debug, Clone)]
pub struct SimulatedDirections {
    speed_mps: f64,
    latency: Duration,
}

impl SimulatedDirections {
    pub fn new(speed_mps: f64, latency: Duration) -> Self {
        Self { speed_mps, latency }
    }
}

#[async_trait]
impl DirectionsService for SimulatedDirections {
    async fn calculate(&self, waypoints: &[Waypoint]) -> Result<Vec<Route>, DirectionsError> {
        tokio::time::sleep(self.latency).await;

        if waypoints.len() < 2 {
            return Err(DirectionsError::Unavailable(format!(
                "need at least two waypoints, got {}",
                waypoints.len()
            )));
        }

        let points: Vec<Coordinate> = waypoints.iter().map(|w| w.coordinate).collect();
        let route = route_through(&points, self.speed_mps);
        tracing::debug!(
            waypoints = points.len(),
            distance_m = route.distance_m(),
            "simulated route computed"
        );
        Ok(vec![route])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nav_core::spatial::destination_point;

    #[tokio::test(start_paused = true)]
    async fn test_simulated_route_follows_waypoints() {
        let service = SimulatedDirections::new(10.0, Duration::from_millis(500));
        let start = Coordinate::new(33.0, -117.0);
        let end = destination_point(start, 400.0, 45.0);

        let routes = service
            .calculate(&[Waypoint::new(start).with_heading(45.0, 90.0), Waypoint::new(end)])
            .await
            .unwrap();

        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].legs.len(), 1);
        assert!((routes[0].distance_m() - 400.0).abs() < 0.5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_waypoint_is_refused() {
        let service = SimulatedDirections::new(10.0, Duration::ZERO);
        let result = service
            .calculate(&[Waypoint::new(Coordinate::new(33.0, -117.0))])
            .await;

        assert!(matches!(result, Err(DirectionsError::Unavailable(_))));
    }
}
