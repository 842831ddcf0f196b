//! Event publication for UI, voice and telemetry consumers.
//!
//! Every subscriber gets its own receiver on a broadcast channel. Payloads
//! carry `Arc` snapshots, so consumers never touch the live route state.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use nav_core::{AlertLevel, Coordinate, Route, RouteProgress, Waypoint};

use crate::coordinator::RequestToken;
use crate::directions::DirectionsError;

/// Everything a navigation session announces.
#[derive(Debug, Clone)]
pub enum NavigationEvent {
    /// Emitted for every processed sample
    ProgressChanged { progress: Arc<RouteProgress> },
    AlertLevelChanged {
        previous: AlertLevel,
        current: AlertLevel,
        progress: Arc<RouteProgress>,
    },
    OffRoute {
        location: Coordinate,
        distance_from_route_m: f64,
    },
    RerouteRequested {
        token: RequestToken,
        waypoints: Vec<Waypoint>,
    },
    RerouteApplied {
        token: RequestToken,
        route: Arc<Route>,
        progress: Arc<RouteProgress>,
    },
    RerouteFailed {
        token: RequestToken,
        error: Arc<DirectionsError>,
    },
    Arrived { progress: Arc<RouteProgress> },
}

impl NavigationEvent {
    /// Short stable name, handy for logs and filters.
    pub fn kind(&self) -> &'static str {
        match self {
            NavigationEvent::ProgressChanged { .. } => "progress_changed",
            NavigationEvent::AlertLevelChanged { .. } => "alert_level_changed",
            NavigationEvent::OffRoute { .. } => "off_route",
            NavigationEvent::RerouteRequested { .. } => "reroute_requested",
            NavigationEvent::RerouteApplied { .. } => "reroute_applied",
            NavigationEvent::RerouteFailed { .. } => "reroute_failed",
            NavigationEvent::Arrived { .. } => "arrived",
        }
    }
}

/// Publisher side of the session's event stream.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<NavigationEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish to every current subscriber. Having none is not an error.
    pub fn publish(&self, event: NavigationEvent) {
        let kind = event.kind();
        if self.tx.send(event).is_err() {
            tracing::trace!(kind, "no subscribers for navigation event");
        }
    }

    /// Register a new subscriber. It only sees events published after this call.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// A registered listener. Dropping it unregisters as well.
#[derive(Debug)]
pub struct Subscription {
    rx: broadcast::Receiver<NavigationEvent>,
}

impl Subscription {
    /// Wait for the next event. Returns `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<NavigationEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(missed)) => {
                    // Drop missed updates; a newer snapshot will arrive soon.
                    tracing::debug!(missed, "subscriber lagged behind navigation events");
                    continue;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next buffered event without waiting.
    pub fn try_recv(&mut self) -> Option<NavigationEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Drain everything currently buffered.
    pub fn drain(&mut self) -> Vec<NavigationEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    pub fn unsubscribe(self) {}
}
