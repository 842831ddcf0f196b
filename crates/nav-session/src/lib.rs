//! Navigation session runtime.
//!
//! Wraps the synchronous `nav-core` logic with the pieces that need a Tokio
//! runtime: background reroute requests, the event bus and directions clients.

pub mod config;
pub mod coordinator;
pub mod directions;
pub mod events;
pub mod session;
pub mod store;

pub use config::Config;
pub use coordinator::{RequestToken, RerouteCoordinator, ReroutePhase};
pub use directions::{DirectionsError, DirectionsService, HttpDirectionsClient};
pub use events::{EventBus, NavigationEvent, Subscription};
pub use session::NavigationSession;
pub use store::ActiveRoute;
