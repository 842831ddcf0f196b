//! One navigation session: tracker, reroute coordinator, store and events.

use std::sync::Arc;

use nav_core::{
    consolidate, Coordinate, LocationSample, NavResult, NavigationRules, ProgressEvent,
    ProgressTracker, Route, RouteProgress,
};

use crate::config::Config;
use crate::coordinator::{RequestToken, RerouteCoordinator, ReroutePhase};
use crate::directions::DirectionsService;
use crate::events::{EventBus, NavigationEvent, Subscription};
use crate::store::ActiveRoute;

/// Drives a single trip from its first sample to arrival.
///
/// Samples must be fed from one task, in arrival order. Reroutes run in the
/// background and are swapped in between samples.
pub struct NavigationSession {
    tracker: ProgressTracker,
    coordinator: RerouteCoordinator,
    active: Arc<ActiveRoute>,
    events: EventBus,
}

impl NavigationSession {
    /// Start navigating `route`, consolidated around `origin`.
    pub fn start(
        route: Route,
        origin: Coordinate,
        directions: Arc<dyn DirectionsService>,
        config: &Config,
    ) -> NavResult<Self> {
        route.validate()?;
        let consolidated = Arc::new(consolidate(route, origin));
        let progress = RouteProgress::new(consolidated)?;

        tracing::info!(
            distance_m = progress.distance_remaining_m(),
            duration_s = progress.duration_remaining_s(),
            anchors = progress.route().main_maneuver_locations().len(),
            "navigation session started"
        );

        let active = Arc::new(ActiveRoute::new(progress));
        let events = EventBus::new(config.event_capacity);
        let coordinator = RerouteCoordinator::new(
            directions,
            active.clone(),
            events.clone(),
            config.rules.clone(),
        );

        Ok(Self {
            tracker: ProgressTracker::new(config.rules.clone()),
            coordinator,
            active,
            events,
        })
    }

    /// Feed one location sample and publish whatever it changed.
    ///
    /// Reroute failures never surface here; only a malformed sample does.
    pub fn process_sample(&self, sample: LocationSample) -> NavResult<Arc<RouteProgress>> {
        let base = self.active.snapshot();
        let update = self.tracker.update(&base, &sample)?;

        if update.events.is_empty() {
            // Out-of-order sample: nothing changed.
            return Ok(base);
        }

        let Some(progress) = self.active.update_if_current(&base, update.progress) else {
            tracing::debug!("reroute applied while processing sample; dropping stale progress");
            return Ok(self.active.snapshot());
        };

        for event in update.events {
            self.events.publish(match event {
                ProgressEvent::AlertLevelChanged {
                    previous, current, ..
                } => NavigationEvent::AlertLevelChanged {
                    previous,
                    current,
                    progress: progress.clone(),
                },
                ProgressEvent::Arrived => NavigationEvent::Arrived {
                    progress: progress.clone(),
                },
                ProgressEvent::ProgressChanged { .. } => NavigationEvent::ProgressChanged {
                    progress: progress.clone(),
                },
            });
        }

        if let Some(signal) = update.off_route {
            self.events.publish(NavigationEvent::OffRoute {
                location: signal.sample.coordinate,
                distance_from_route_m: signal.distance_from_route_m,
            });
            self.coordinator.on_off_route(&signal);
        }

        Ok(progress)
    }

    /// Replace the trip with a route through `coordinates` (at least two).
    pub fn change_destination(
        &self,
        coordinates: Vec<Coordinate>,
        heading_deg: Option<f64>,
    ) -> NavResult<RequestToken> {
        self.coordinator.change_destination(coordinates, heading_deg)
    }

    pub fn current(&self) -> Arc<RouteProgress> {
        self.active.snapshot()
    }

    pub fn subscribe(&self) -> Subscription {
        self.events.subscribe()
    }

    pub fn reroute_phase(&self) -> ReroutePhase {
        self.coordinator.phase()
    }

    pub fn coordinator(&self) -> &RerouteCoordinator {
        &self.coordinator
    }

    pub fn rules(&self) -> &NavigationRules {
        self.tracker.rules()
    }
}
