//! Core data models for routes, waypoints and location samples.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::NavError;
use crate::spatial::haversine_distance;

/// A WGS-84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance to `other` in meters.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        haversine_distance(self.lat, self.lon, other.lat, other.lon)
    }

    /// Finite and within the lat/lon ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

/// A point used to request a route, optionally constrained by heading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub coordinate: Coordinate,
    /// Direction of travel at this waypoint (degrees, 0 = North)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_deg: Option<f64>,
    /// Allowed deviation from `heading_deg` (degrees)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_accuracy_deg: Option<f64>,
}

impl Waypoint {
    pub fn new(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            heading_deg: None,
            heading_accuracy_deg: None,
        }
    }

    /// Constrain the route to leave this waypoint in the given direction.
    pub fn with_heading(mut self, heading_deg: f64, accuracy_deg: f64) -> Self {
        self.heading_deg = Some(heading_deg);
        self.heading_accuracy_deg = Some(accuracy_deg);
        self
    }
}

impl From<Coordinate> for Waypoint {
    fn from(coordinate: Coordinate) -> Self {
        Self::new(coordinate)
    }
}

/// Kind of maneuver performed at the start of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManeuverType {
    Depart,
    Arrive,
    Turn,
    Continue,
    Merge,
    OnRamp,
    OffRamp,
    Fork,
    EndOfRoad,
    Roundabout,
    NewName,
    Notification,
}

/// One maneuver instruction and the stretch of road that follows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    pub maneuver_type: ManeuverType,
    pub maneuver_location: Coordinate,
    #[serde(default)]
    pub instruction: String,
    pub distance_m: f64,
    pub expected_duration_s: f64,
    /// Polyline from the maneuver location to the next maneuver
    #[serde(default)]
    pub geometry: Vec<Coordinate>,
}

impl RouteStep {
    pub fn new(
        maneuver_type: ManeuverType,
        maneuver_location: Coordinate,
        distance_m: f64,
        expected_duration_s: f64,
    ) -> Self {
        Self {
            maneuver_type,
            maneuver_location,
            instruction: String::new(),
            distance_m,
            expected_duration_s,
            geometry: Vec::new(),
        }
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    pub fn with_geometry(mut self, geometry: Vec<Coordinate>) -> Self {
        self.geometry = geometry;
        self
    }
}

/// Ordered steps between two consecutive waypoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteLeg {
    pub steps: Vec<RouteStep>,
    pub distance_m: f64,
    pub expected_travel_time_s: f64,
    pub destination: Coordinate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_name: Option<String>,
    /// Leg boundary anchors recorded by consolidation. Empty until then.
    #[serde(default)]
    pub main_maneuver_locations: Vec<Coordinate>,
}

impl RouteLeg {
    /// Build a leg whose totals are the sums of its steps.
    pub fn from_steps(steps: Vec<RouteStep>, destination: Coordinate) -> Self {
        let distance_m = steps.iter().map(|s| s.distance_m).sum();
        let expected_travel_time_s = steps.iter().map(|s| s.expected_duration_s).sum();
        Self {
            steps,
            distance_m,
            expected_travel_time_s,
            destination,
            destination_name: None,
            main_maneuver_locations: Vec::new(),
        }
    }
}

/// A computed route: legs plus the waypoints used to request it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub legs: Vec<RouteLeg>,
    pub waypoints: Vec<Waypoint>,
}

impl Route {
    pub fn new(legs: Vec<RouteLeg>, waypoints: Vec<Waypoint>) -> Self {
        Self { legs, waypoints }
    }

    pub fn distance_m(&self) -> f64 {
        self.legs.iter().map(|leg| leg.distance_m).sum()
    }

    pub fn expected_travel_time_s(&self) -> f64 {
        self.legs.iter().map(|leg| leg.expected_travel_time_s).sum()
    }

    /// Anchors of the (single) consolidated leg, or empty before consolidation.
    pub fn main_maneuver_locations(&self) -> &[Coordinate] {
        self.legs
            .first()
            .map(|leg| leg.main_maneuver_locations.as_slice())
            .unwrap_or(&[])
    }

    /// Structural checks every navigable route must pass.
    pub fn validate(&self) -> Result<(), NavError> {
        if self.legs.is_empty() {
            return Err(NavError::EmptyRoute);
        }
        for (index, leg) in self.legs.iter().enumerate() {
            if leg.steps.is_empty() {
                return Err(NavError::EmptyLeg { leg: index });
            }
            for step in &leg.steps {
                if !step.maneuver_location.is_valid() {
                    return Err(NavError::InvalidCoordinate(step.maneuver_location));
                }
            }
        }
        Ok(())
    }
}

/// A single position fix from the location source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub coordinate: Coordinate,
    /// Course over ground in degrees; `None` when the source reports it as unknown
    #[serde(default)]
    pub course_deg: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl LocationSample {
    /// Build a sample from a raw course where any negative value means unknown.
    pub fn new(coordinate: Coordinate, course_deg: f64, timestamp: DateTime<Utc>) -> Self {
        let course_deg =
            (course_deg.is_finite() && course_deg >= 0.0).then_some(course_deg % 360.0);
        Self {
            coordinate,
            course_deg,
            timestamp,
        }
    }

    /// Course usable for heading-constrained routing.
    pub fn heading(&self) -> Option<f64> {
        self.course_deg
            .filter(|course| course.is_finite() && *course >= 0.0)
    }
}
