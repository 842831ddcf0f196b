//! Pre-defined routes for driving simulations.

use nav_core::spatial::destination_point;
use nav_core::{Coordinate, ManeuverType, Route, RouteLeg, RouteStep, Waypoint};

/// Straight-line route through `points`, one leg per consecutive pair.
///
/// Each leg is a zero-length depart marker, a continue step carrying the
/// leg's geometry, and an arrive step. The geometry sits on the continue
/// step so it survives consolidation of interior legs.
pub fn route_through(points: &[Coordinate], speed_mps: f64) -> Route {
    let legs = points
        .windows(2)
        .enumerate()
        .map(|(index, pair)| {
            let (from, to) = (pair[0], pair[1]);
            let distance_m = from.distance_to(&to);
            let duration_s = if speed_mps > 0.0 {
                distance_m / speed_mps
            } else {
                0.0
            };

            let steps = vec![
                RouteStep::new(ManeuverType::Depart, from, 0.0, 0.0)
                    .with_instruction(format!("Depart waypoint {index}")),
                RouteStep::new(ManeuverType::Continue, from, distance_m, duration_s)
                    .with_instruction(format!("Continue {:.0} m", distance_m))
                    .with_geometry(vec![from, to]),
                RouteStep::new(ManeuverType::Arrive, to, 0.0, 0.0)
                    .with_instruction(format!("Arrive at waypoint {}", index + 1)),
            ];
            RouteLeg::from_steps(steps, to)
        })
        .collect();

    let waypoints = points.iter().copied().map(Waypoint::new).collect();
    Route::new(legs, waypoints)
}

/// Three legs from `origin`: 1000 m north, 500 m east, then 800 m north.
pub fn demo_route(origin: Coordinate, speed_mps: f64) -> Route {
    let first = destination_point(origin, 1_000.0, 0.0);
    let second = destination_point(first, 500.0, 90.0);
    let destination = destination_point(second, 800.0, 0.0);

    let mut route = route_through(&[origin, first, second, destination], speed_mps);
    if let Some(last) = route.legs.last_mut() {
        last.destination_name = Some("Destination".to_string());
    }
    route
}
