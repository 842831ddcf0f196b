//! Navigation thresholds shared by progress tracking and rerouting.

use serde::{Deserialize, Serialize};

/// Configuration for progress and reroute thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationRules {
    /// Distance to maneuver at which the alert level becomes `low` (meters)
    pub low_alert_distance_m: f64,
    /// Distance to maneuver at which the alert level becomes `medium` (meters)
    pub medium_alert_distance_m: f64,
    /// Distance to maneuver at which the alert level becomes `high` (meters)
    pub high_alert_distance_m: f64,
    /// Distance to the final maneuver that counts as arrival (meters)
    pub arrival_distance_m: f64,
    /// Distance to maneuver at which the current step is complete (meters)
    pub maneuver_completion_m: f64,
    /// Maximum distance from the expected path before the vehicle is off-route (meters)
    pub off_route_tolerance_m: f64,
    /// Minimum distance between two off-route triggers that request a reroute (meters)
    pub reroute_min_distance_m: f64,
    /// Heading accuracy attached to the reroute origin (degrees)
    pub heading_tolerance_deg: f64,
}

impl Default for NavigationRules {
    fn default() -> Self {
        Self {
            low_alert_distance_m: 800.0,
            medium_alert_distance_m: 300.0,
            high_alert_distance_m: 70.0,
            arrival_distance_m: 25.0,
            maneuver_completion_m: 10.0,
            off_route_tolerance_m: 50.0,
            reroute_min_distance_m: 50.0,
            heading_tolerance_deg: 90.0,
        }
    }
}
