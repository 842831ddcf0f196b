//! Vehicle simulation: paths, demo routes and an in-process directions service.

mod directions;
mod paths;
mod scenarios;

pub use directions::SimulatedDirections;
pub use paths::{DetourPath, DrivePath, PolylinePath};
pub use scenarios::{demo_route, route_through};
