//! Navigation core: route consolidation and progress tracking.
//!
//! Everything here is synchronous and free of I/O. The async reroute
//! machinery lives in `nav-session`.

pub mod consolidate;
pub mod error;
pub mod models;
pub mod progress;
pub mod rules;
pub mod spatial;

pub use consolidate::consolidate;
pub use error::{NavError, NavResult};
pub use models::{
    Coordinate, LocationSample, ManeuverType, Route, RouteLeg, RouteStep, Waypoint,
};
pub use progress::{
    AlertLevel, OffRouteSignal, ProgressEvent, ProgressTracker, RouteProgress, TrackerUpdate,
};
pub use rules::NavigationRules;
pub use spatial::haversine_distance;
