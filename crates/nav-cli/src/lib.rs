//! Navigation CLI - drive simulator for navigation sessions.
//!
//! Binaries:
//! - drive_sim: replays a vehicle along a multi-leg route through a live session

pub mod sim;
