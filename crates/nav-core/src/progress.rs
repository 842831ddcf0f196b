//! Progress tracking along the active route.
//!
//! [`RouteProgress`] is an immutable snapshot: the tracker never mutates one
//! in place, it returns the next snapshot together with the events raised
//! while producing it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{NavError, NavResult};
use crate::models::{Coordinate, LocationSample, Route, RouteLeg, RouteStep};
use crate::rules::NavigationRules;
use crate::spatial::{project_onto_polyline, PolylineProjection};

/// Proximity-to-maneuver classification, ordered from calm to arrived.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    /// Maneuver is still far away
    #[default]
    None,
    Low,
    Medium,
    /// Maneuver is imminent; instructions should be delivered now
    High,
    /// Final destination reached
    Arrive,
}

impl AlertLevel {
    /// Level implied by the distance to the upcoming maneuver alone.
    pub fn for_distance(distance_m: f64, rules: &NavigationRules) -> Self {
        if distance_m <= rules.high_alert_distance_m {
            AlertLevel::High
        } else if distance_m <= rules.medium_alert_distance_m {
            AlertLevel::Medium
        } else if distance_m <= rules.low_alert_distance_m {
            AlertLevel::Low
        } else {
            AlertLevel::None
        }
    }
}

/// Snapshot of where the vehicle is on the active route.
#[derive(Debug, Clone)]
pub struct RouteProgress {
    route: Arc<Route>,
    leg_index: usize,
    step_index: usize,
    alert_level: AlertLevel,
    distance_to_maneuver_m: f64,
    distance_remaining_m: f64,
    duration_remaining_s: f64,
    off_route: bool,
    last_sample_at: Option<DateTime<Utc>>,
}

impl RouteProgress {
    /// Start at the first step of the first leg.
    pub fn new(route: Arc<Route>) -> NavResult<Self> {
        route.validate()?;
        let distance_to_maneuver_m = route.legs[0].steps[0].distance_m;
        let distance_remaining_m = route.distance_m();
        let duration_remaining_s = route.expected_travel_time_s();
        Ok(Self {
            route,
            leg_index: 0,
            step_index: 0,
            alert_level: AlertLevel::None,
            distance_to_maneuver_m,
            distance_remaining_m,
            duration_remaining_s,
            off_route: false,
            last_sample_at: None,
        })
    }

    pub fn route(&self) -> &Arc<Route> {
        &self.route
    }

    pub fn leg_index(&self) -> usize {
        self.leg_index
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn alert_level(&self) -> AlertLevel {
        self.alert_level
    }

    /// Distance left before the upcoming maneuver (meters).
    pub fn distance_to_maneuver_m(&self) -> f64 {
        self.distance_to_maneuver_m
    }

    pub fn distance_remaining_m(&self) -> f64 {
        self.distance_remaining_m
    }

    pub fn duration_remaining_s(&self) -> f64 {
        self.duration_remaining_s
    }

    /// Whether the last processed sample was off the expected path.
    pub fn is_off_route(&self) -> bool {
        self.off_route
    }

    pub fn is_arrived(&self) -> bool {
        self.alert_level == AlertLevel::Arrive
    }

    pub fn current_leg(&self) -> &RouteLeg {
        &self.route.legs[self.leg_index]
    }

    pub fn current_step(&self) -> &RouteStep {
        &self.current_leg().steps[self.step_index]
    }

    /// Step whose maneuver comes next, crossing into the following leg if needed.
    pub fn upcoming_step(&self) -> Option<&RouteStep> {
        self.next_position()
            .map(|(leg, step)| &self.route.legs[leg].steps[step])
    }

    fn next_position(&self) -> Option<(usize, usize)> {
        if self.step_index + 1 < self.current_leg().steps.len() {
            Some((self.leg_index, self.step_index + 1))
        } else if self.leg_index + 1 < self.route.legs.len() {
            Some((self.leg_index + 1, 0))
        } else {
            None
        }
    }

    fn is_final_position(&self, leg: usize, step: usize) -> bool {
        leg + 1 == self.route.legs.len() && step + 1 == self.route.legs[leg].steps.len()
    }

    /// Polyline for the current step. Without geometry the step runs
    /// straight from its maneuver to the upcoming one.
    fn step_path(&self, leg: usize, step: usize) -> Vec<Coordinate> {
        let route_step = &self.route.legs[leg].steps[step];
        if route_step.geometry.len() >= 2 {
            return route_step.geometry.clone();
        }
        let mut path = vec![route_step.maneuver_location];
        let next = if step + 1 < self.route.legs[leg].steps.len() {
            Some(&self.route.legs[leg].steps[step + 1])
        } else {
            self.route.legs.get(leg + 1).and_then(|l| l.steps.first())
        };
        if let Some(next) = next {
            path.push(next.maneuver_location);
        }
        path
    }

    fn project(&self, point: &Coordinate) -> PolylineProjection {
        let path = self.step_path(self.leg_index, self.step_index);
        // step_path always yields at least the maneuver location
        project_onto_polyline(point, &path).unwrap_or(PolylineProjection {
            distance_m: point.distance_to(&self.current_step().maneuver_location),
            along_m: 0.0,
            length_m: 0.0,
        })
    }

    /// Perpendicular distance to the current step, or to the upcoming step
    /// when that is closer (cutting a corner at the maneuver).
    fn distance_from_path_m(&self, point: &Coordinate, current: &PolylineProjection) -> f64 {
        let upcoming = self.next_position().and_then(|(leg, step)| {
            project_onto_polyline(point, &self.step_path(leg, step)).map(|p| p.distance_m)
        });
        match upcoming {
            Some(distance) => current.distance_m.min(distance),
            None => current.distance_m,
        }
    }

    fn advance(&mut self) -> bool {
        match self.next_position() {
            Some((leg, step)) => {
                self.leg_index = leg;
                self.step_index = step;
                true
            }
            None => false,
        }
    }

    fn recompute_remaining(&mut self, projection: &PolylineProjection) {
        let step = self.current_step();
        let fraction_left = if projection.length_m > 0.0 {
            (projection.remaining_m() / projection.length_m).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let mut distance = step.distance_m * fraction_left;
        let mut duration = step.expected_duration_s * fraction_left;

        let leg = self.current_leg();
        for later in &leg.steps[self.step_index + 1..] {
            distance += later.distance_m;
            duration += later.expected_duration_s;
        }
        for later in &self.route.legs[self.leg_index + 1..] {
            distance += later.distance_m;
            duration += later.expected_travel_time_s;
        }

        // A single-point step (the final arrive) is measured point to point.
        self.distance_to_maneuver_m = if projection.length_m > 0.0 {
            projection.remaining_m()
        } else {
            projection.distance_m
        };
        self.distance_remaining_m = distance;
        self.duration_remaining_s = duration;
    }

    fn mark_arrived(&mut self) {
        let last_leg = self.route.legs.len() - 1;
        self.leg_index = last_leg;
        self.step_index = self.route.legs[last_leg].steps.len() - 1;
        self.alert_level = AlertLevel::Arrive;
        self.distance_to_maneuver_m = 0.0;
        self.distance_remaining_m = 0.0;
        self.duration_remaining_s = 0.0;
    }
}

/// Change produced while processing one sample.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    AlertLevelChanged {
        previous: AlertLevel,
        current: AlertLevel,
        leg_index: usize,
        step_index: usize,
    },
    Arrived,
    ProgressChanged {
        distance_remaining_m: f64,
        duration_remaining_s: f64,
    },
}

/// The sample was farther from the expected path than tolerated.
#[derive(Debug, Clone, PartialEq)]
pub struct OffRouteSignal {
    pub sample: LocationSample,
    pub distance_from_route_m: f64,
}

/// Result of feeding one sample to the tracker.
#[derive(Debug, Clone)]
pub struct TrackerUpdate {
    pub progress: RouteProgress,
    pub events: Vec<ProgressEvent>,
    pub off_route: Option<OffRouteSignal>,
}

/// Derives step progress and alert levels from location samples.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    rules: NavigationRules,
}

impl ProgressTracker {
    pub fn new(rules: NavigationRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &NavigationRules {
        &self.rules
    }

    /// Process one sample against `progress` and return the next snapshot.
    ///
    /// Samples older than the last processed one are ignored and return the
    /// snapshot unchanged with no events.
    pub fn update(
        &self,
        progress: &RouteProgress,
        sample: &LocationSample,
    ) -> NavResult<TrackerUpdate> {
        if !sample.coordinate.is_valid() {
            return Err(NavError::InvalidCoordinate(sample.coordinate));
        }

        let mut next = progress.clone();
        if let Some(last) = progress.last_sample_at {
            if sample.timestamp < last {
                tracing::debug!(
                    timestamp = %sample.timestamp,
                    last = %last,
                    "ignoring out-of-order sample"
                );
                return Ok(TrackerUpdate {
                    progress: next,
                    events: Vec::new(),
                    off_route: None,
                });
            }
        }
        next.last_sample_at = Some(sample.timestamp);

        let mut events = Vec::new();
        let mut off_route = None;

        if next.is_arrived() {
            next.off_route = false;
        } else {
            let mut projection = next.project(&sample.coordinate);
            let distance_from_route_m = next.distance_from_path_m(&sample.coordinate, &projection);
            next.off_route = distance_from_route_m > self.rules.off_route_tolerance_m;

            if next.off_route {
                tracing::warn!(
                    distance_from_route_m,
                    location = %sample.coordinate,
                    "sample is off route"
                );
                off_route = Some(OffRouteSignal {
                    sample: sample.clone(),
                    distance_from_route_m,
                });
                next.recompute_remaining(&projection);
            } else {
                projection = self.advance_steps(&mut next, sample, projection, &mut events);
                if !next.is_arrived() {
                    next.recompute_remaining(&projection);
                    self.escalate(&mut next, &mut events);
                }
            }
        }

        events.push(ProgressEvent::ProgressChanged {
            distance_remaining_m: next.distance_remaining_m,
            duration_remaining_s: next.duration_remaining_s,
        });

        Ok(TrackerUpdate {
            progress: next,
            events,
            off_route,
        })
    }

    /// Move the cursor past every completed step, handling arrival at the
    /// final maneuver. Returns the projection onto the resulting step.
    fn advance_steps(
        &self,
        next: &mut RouteProgress,
        sample: &LocationSample,
        mut projection: PolylineProjection,
        events: &mut Vec<ProgressEvent>,
    ) -> PolylineProjection {
        loop {
            let remaining = projection.remaining_m();
            let final_ahead = match next.next_position() {
                Some((leg, step)) => next.is_final_position(leg, step),
                // Already on the final step: its maneuver is the destination.
                None => true,
            };
            let to_final = if next.next_position().is_none() {
                projection.distance_m
            } else {
                remaining
            };

            if final_ahead && to_final <= self.rules.arrival_distance_m {
                let previous = next.alert_level;
                next.mark_arrived();
                events.push(ProgressEvent::AlertLevelChanged {
                    previous,
                    current: AlertLevel::Arrive,
                    leg_index: next.leg_index,
                    step_index: next.step_index,
                });
                events.push(ProgressEvent::Arrived);
                tracing::info!(location = %sample.coordinate, "arrived at destination");
                return projection;
            }

            if remaining > self.rules.maneuver_completion_m || !next.advance() {
                return projection;
            }

            tracing::debug!(
                leg = next.leg_index,
                step = next.step_index,
                "advanced to next step"
            );
            if next.alert_level != AlertLevel::None {
                events.push(ProgressEvent::AlertLevelChanged {
                    previous: next.alert_level,
                    current: AlertLevel::None,
                    leg_index: next.leg_index,
                    step_index: next.step_index,
                });
                next.alert_level = AlertLevel::None;
            }
            projection = next.project(&sample.coordinate);
        }
    }

    /// Raise the alert level if the maneuver got closer; never lower it.
    fn escalate(&self, next: &mut RouteProgress, events: &mut Vec<ProgressEvent>) {
        let computed = AlertLevel::for_distance(next.distance_to_maneuver_m, &self.rules);
        if computed > next.alert_level {
            events.push(ProgressEvent::AlertLevelChanged {
                previous: next.alert_level,
                current: computed,
                leg_index: next.leg_index,
                step_index: next.step_index,
            });
            next.alert_level = computed;
        }
    }
}
