//! Reroute coordination.
//!
//! Decides when a recalculation is worth requesting, keeps at most one
//! request live, and swaps in the consolidated result. Every request carries
//! a sequence token; a completion is applied only while its token is still
//! the newest, so a slow response can never replace a newer route.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::task::JoinHandle;

use nav_core::{
    consolidate, Coordinate, NavError, NavResult, NavigationRules, OffRouteSignal, Route,
    RouteProgress, Waypoint,
};

use crate::directions::{DirectionsError, DirectionsService};
use crate::events::{EventBus, NavigationEvent};
use crate::store::ActiveRoute;

/// Sequence number identifying one recalculation request.
pub type RequestToken = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReroutePhase {
    Idle,
    /// A request is outstanding
    Requesting,
    /// A completion is being consolidated and installed
    Applying,
}

#[derive(Debug)]
struct CoordinatorState {
    phase: ReroutePhase,
    token: RequestToken,
    /// Location of the last off-route trigger that produced a request
    last_trigger: Option<Coordinate>,
    in_flight: Option<JoinHandle<()>>,
}

/// Issues and resolves route recalculations for one session.
///
/// Cheap to clone; clones share state. Must be used inside a Tokio runtime
/// because requests run on spawned tasks.
#[derive(Clone)]
pub struct RerouteCoordinator {
    state: Arc<Mutex<CoordinatorState>>,
    directions: Arc<dyn DirectionsService>,
    active: Arc<ActiveRoute>,
    events: EventBus,
    rules: Arc<NavigationRules>,
}

impl RerouteCoordinator {
    pub fn new(
        directions: Arc<dyn DirectionsService>,
        active: Arc<ActiveRoute>,
        events: EventBus,
        rules: NavigationRules,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(CoordinatorState {
                phase: ReroutePhase::Idle,
                token: 0,
                last_trigger: None,
                in_flight: None,
            })),
            directions,
            active,
            events,
            rules: Arc::new(rules),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn phase(&self) -> ReroutePhase {
        self.lock().phase
    }

    /// Token of the most recently issued request (0 before the first).
    pub fn current_token(&self) -> RequestToken {
        self.lock().token
    }

    /// React to an off-route sample.
    ///
    /// Suppressed while a request is outstanding, and when the sample is
    /// within the minimum distance of the previous trigger.
    pub fn on_off_route(&self, signal: &OffRouteSignal) -> Option<RequestToken> {
        let location = signal.sample.coordinate;
        let mut state = self.lock();

        if state.phase != ReroutePhase::Idle {
            tracing::debug!(
                token = state.token,
                "reroute already in flight; ignoring off-route trigger"
            );
            return None;
        }
        if let Some(last) = state.last_trigger {
            let moved_m = last.distance_to(&location);
            if moved_m < self.rules.reroute_min_distance_m {
                tracing::debug!(
                    moved_m,
                    "off-route trigger within hysteresis distance; suppressed"
                );
                return None;
            }
        }
        state.last_trigger = Some(location);

        let progress = self.active.snapshot();
        let waypoints = self.off_route_waypoints(&progress, signal);
        Some(self.issue(&mut state, waypoints, location))
    }

    /// Route from the current location back onto the remaining anchors.
    fn off_route_waypoints(
        &self,
        progress: &RouteProgress,
        signal: &OffRouteSignal,
    ) -> Vec<Waypoint> {
        let mut origin = Waypoint::new(signal.sample.coordinate);
        if let Some(heading) = signal.sample.heading() {
            origin = origin.with_heading(heading, self.rules.heading_tolerance_deg);
        }

        let route = progress.route();
        let anchors = route.main_maneuver_locations();
        let mut waypoints = vec![origin];
        if anchors.len() >= 2 {
            waypoints.extend(anchors[1..].iter().copied().map(Waypoint::new));
        } else {
            // Single-leg route: its only anchor is the destination itself.
            let destination = anchors
                .first()
                .copied()
                .unwrap_or_else(|| progress.current_leg().destination);
            waypoints.push(Waypoint::new(destination));
        }
        waypoints
    }

    /// Request a route through a caller-supplied coordinate chain.
    ///
    /// Always supersedes any outstanding request. `heading_deg`, when given,
    /// constrains the departure direction at the first coordinate.
    pub fn change_destination(
        &self,
        coordinates: Vec<Coordinate>,
        heading_deg: Option<f64>,
    ) -> NavResult<RequestToken> {
        if coordinates.len() < 2 {
            return Err(NavError::InsufficientWaypoints {
                got: coordinates.len(),
            });
        }
        if let Some(bad) = coordinates.iter().find(|c| !c.is_valid()) {
            return Err(NavError::InvalidCoordinate(*bad));
        }

        let origin = coordinates[0];
        let mut waypoints: Vec<Waypoint> = coordinates.into_iter().map(Waypoint::new).collect();
        if let Some(heading) = heading_deg.filter(|h| h.is_finite() && *h >= 0.0) {
            waypoints[0] = waypoints[0]
                .clone()
                .with_heading(heading, self.rules.heading_tolerance_deg);
        }

        let mut state = self.lock();
        Ok(self.issue(&mut state, waypoints, origin))
    }

    fn issue(
        &self,
        state: &mut CoordinatorState,
        waypoints: Vec<Waypoint>,
        origin: Coordinate,
    ) -> RequestToken {
        state.token += 1;
        let token = state.token;

        if let Some(previous) = state.in_flight.take() {
            // Best effort; the token check covers a response that still lands.
            previous.abort();
            tracing::debug!(superseded = token - 1, "cancelled outstanding reroute request");
        }
        state.phase = ReroutePhase::Requesting;

        tracing::info!(token, waypoints = waypoints.len(), %origin, "requesting reroute");
        self.events.publish(NavigationEvent::RerouteRequested {
            token,
            waypoints: waypoints.clone(),
        });

        let coordinator = self.clone();
        state.in_flight = Some(tokio::spawn(async move {
            let result = coordinator.directions.calculate(&waypoints).await;
            coordinator.complete(token, origin, result);
        }));
        token
    }

    /// Resolve request `token`. Returns `false` if it was stale and ignored.
    pub(crate) fn complete(
        &self,
        token: RequestToken,
        origin: Coordinate,
        result: Result<Vec<Route>, DirectionsError>,
    ) -> bool {
        let mut state = self.lock();
        if token != state.token {
            tracing::debug!(token, current = state.token, "discarding stale reroute response");
            return false;
        }
        state.in_flight = None;
        state.phase = ReroutePhase::Applying;

        match Self::prepare(result, origin) {
            Ok(progress) => {
                let snapshot = self.active.replace(progress);
                let route = snapshot.route().clone();
                tracing::info!(
                    token,
                    distance_m = route.distance_m(),
                    steps = route.legs[0].steps.len(),
                    "reroute applied"
                );
                self.events.publish(NavigationEvent::RerouteApplied {
                    token,
                    route,
                    progress: snapshot,
                });
            }
            Err(error) => {
                tracing::warn!(token, %error, "reroute failed; keeping current route");
                self.events.publish(NavigationEvent::RerouteFailed {
                    token,
                    error: Arc::new(error),
                });
            }
        }

        state.phase = ReroutePhase::Idle;
        true
    }

    fn prepare(
        result: Result<Vec<Route>, DirectionsError>,
        origin: Coordinate,
    ) -> Result<RouteProgress, DirectionsError> {
        let route = result?.into_iter().next().ok_or(DirectionsError::NoRoute)?;
        route.validate()?;
        let consolidated = Arc::new(consolidate(route, origin));
        Ok(RouteProgress::new(consolidated)?)
    }
}
