//! Route consolidation.
//!
//! Directions services return one leg per waypoint pair. Navigation runs on a
//! single leg, so multi-leg routes are merged here. Each original leg leaves
//! one anchor in `main_maneuver_locations`, which a later reroute uses to
//! rebuild the remaining waypoint chain without the pre-merge legs.

use crate::models::{Coordinate, ManeuverType, Route, RouteLeg, RouteStep};

/// Which synthetic boundary maneuvers a leg loses when merged.
#[derive(Debug, Clone, Copy)]
enum LegPosition {
    First,
    Interior,
    Last,
}

impl LegPosition {
    fn keeps(self, maneuver: ManeuverType) -> bool {
        match self {
            LegPosition::First => maneuver != ManeuverType::Arrive,
            LegPosition::Last => maneuver != ManeuverType::Depart,
            LegPosition::Interior => {
                !matches!(maneuver, ManeuverType::Arrive | ManeuverType::Depart)
            }
        }
    }
}

/// Merge `route` into a single leg.
///
/// `user_position` becomes the first anchor: the reroute origin, or the
/// departure point for a freshly requested route.
///
/// # Panics
/// If the route has no legs or any leg has no steps. Callers holding
/// untrusted routes should run [`Route::validate`] first.
pub fn consolidate(mut route: Route, user_position: Coordinate) -> Route {
    assert!(!route.legs.is_empty(), "cannot consolidate a route without legs");
    for (index, leg) in route.legs.iter().enumerate() {
        assert!(!leg.steps.is_empty(), "cannot consolidate: leg {index} has no steps");
    }

    if route.legs.len() == 1 {
        let leg = &mut route.legs[0];
        let anchor = leg.steps[leg.steps.len() - 1].maneuver_location;
        leg.main_maneuver_locations = vec![anchor];
        return route;
    }

    let leg_count = route.legs.len();
    let mut anchors = Vec::with_capacity(leg_count + 1);
    anchors.push(user_position);

    let mut steps: Vec<RouteStep> = Vec::new();
    let mut distance_m = 0.0;
    let mut expected_travel_time_s = 0.0;
    let destination = route.legs[leg_count - 1].destination;
    let destination_name = route.legs[leg_count - 1].destination_name.clone();

    for (index, leg) in route.legs.drain(..).enumerate() {
        let position = if index == 0 {
            LegPosition::First
        } else if index == leg_count - 1 {
            LegPosition::Last
        } else {
            LegPosition::Interior
        };

        distance_m += leg.distance_m;
        expected_travel_time_s += leg.expected_travel_time_s;

        let kept: Vec<RouteStep> = leg
            .steps
            .iter()
            .filter(|step| position.keeps(step.maneuver_type))
            .cloned()
            .collect();

        let anchor = match position {
            LegPosition::First => leg.steps[0].maneuver_location,
            LegPosition::Last => leg.steps[leg.steps.len() - 1].maneuver_location,
            // An interior leg made only of boundary maneuvers still needs an anchor.
            LegPosition::Interior => kept
                .first()
                .map(|step| step.maneuver_location)
                .unwrap_or(leg.destination),
        };
        anchors.push(anchor);
        steps.extend(kept);
    }

    let waypoints = if route.waypoints.len() > 2 {
        let last = route.waypoints.len() - 1;
        vec![route.waypoints[0].clone(), route.waypoints[last].clone()]
    } else {
        route.waypoints
    };

    tracing::debug!(
        legs = leg_count,
        steps = steps.len(),
        distance_m,
        "consolidated multi-leg route"
    );

    Route {
        legs: vec![RouteLeg {
            steps,
            distance_m,
            expected_travel_time_s,
            destination,
            destination_name,
            main_maneuver_locations: anchors,
        }],
        waypoints,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Waypoint;
    use crate::spatial::destination_point;

    /// Straight northbound leg of `distance_m` with depart, one turn and arrive.
    fn leg(start: Coordinate, distance_m: f64) -> RouteLeg {
        let turn = destination_point(start, distance_m / 2.0, 0.0);
        let end = destination_point(start, distance_m, 0.0);
        let half = distance_m / 2.0;
        RouteLeg {
            steps: vec![
                RouteStep::new(ManeuverType::Depart, start, half, half / 10.0),
                RouteStep::new(ManeuverType::Turn, turn, half, half / 10.0),
                RouteStep::new(ManeuverType::Arrive, end, 0.0, 0.0),
            ],
            distance_m,
            expected_travel_time_s: distance_m / 10.0,
            destination: end,
            destination_name: None,
            main_maneuver_locations: Vec::new(),
        }
    }

    fn multi_leg_route(distances: &[f64]) -> Route {
        let mut start = Coordinate::new(33.6846, -117.8265);
        let mut legs = Vec::new();
        let mut waypoints = vec![Waypoint::new(start)];
        for distance in distances {
            let next = leg(start, *distance);
            start = next.destination;
            waypoints.push(Waypoint::new(start));
            legs.push(next);
        }
        Route::new(legs, waypoints)
    }

    #[test]
    fn three_legs_merge_into_one_with_four_anchors() {
        let route = multi_leg_route(&[1_000.0, 500.0, 800.0]);
        let origin = route.waypoints[0].coordinate;

        let merged = consolidate(route, origin);

        assert_eq!(merged.legs.len(), 1);
        assert!((merged.distance_m() - 2_300.0).abs() < 1e-9);
        assert!((merged.expected_travel_time_s() - 230.0).abs() < 1e-9);
        assert_eq!(merged.main_maneuver_locations().len(), 4);
        assert_eq!(merged.waypoints.len(), 2);
    }

    #[test]
    fn anchors_follow_leg_boundaries() {
        let route = multi_leg_route(&[1_000.0, 500.0, 800.0]);
        let first_depart = route.legs[0].steps[0].maneuver_location;
        let interior_turn = route.legs[1].steps[1].maneuver_location;
        let final_arrive = route.legs[2].steps[2].maneuver_location;
        let user = Coordinate::new(33.0, -117.0);

        let merged = consolidate(route, user);

        assert_eq!(
            merged.main_maneuver_locations(),
            &[user, first_depart, interior_turn, final_arrive]
        );
    }

    #[test]
    fn boundary_maneuvers_are_removed() {
        let route = multi_leg_route(&[1_000.0, 500.0, 800.0, 300.0]);
        let merged = consolidate(route, Coordinate::new(33.0, -117.0));
        let steps = &merged.legs[0].steps;

        let last = steps.len() - 1;
        for (index, step) in steps.iter().enumerate() {
            if step.maneuver_type == ManeuverType::Arrive {
                assert_eq!(index, last, "arrive only allowed as final step");
            }
            if step.maneuver_type == ManeuverType::Depart {
                assert_eq!(index, 0, "depart only allowed as first step");
            }
        }
        // depart + 4 turns + arrive
        assert_eq!(steps.len(), 6);
    }

    #[test]
    fn single_leg_passes_through_with_one_anchor() {
        let route = multi_leg_route(&[1_000.0]);
        let arrive = route.legs[0].steps[2].maneuver_location;

        let merged = consolidate(route.clone(), Coordinate::new(0.0, 0.0));

        assert_eq!(merged.main_maneuver_locations(), &[arrive]);
        let mut stripped = merged.clone();
        stripped.legs[0].main_maneuver_locations.clear();
        assert_eq!(stripped, route);
    }

    #[test]
    fn merged_destination_comes_from_last_leg() {
        let mut route = multi_leg_route(&[400.0, 600.0]);
        route.legs[1].destination_name = Some("Depot".to_string());
        let expected = route.legs[1].destination;

        let merged = consolidate(route, Coordinate::new(33.0, -117.0));

        assert_eq!(merged.legs[0].destination, expected);
        assert_eq!(merged.legs[0].destination_name.as_deref(), Some("Depot"));
    }

    #[test]
    #[should_panic(expected = "without legs")]
    fn empty_route_fails_loudly() {
        consolidate(Route::new(Vec::new(), Vec::new()), Coordinate::new(0.0, 0.0));
    }

    #[test]
    #[should_panic(expected = "has no steps")]
    fn empty_leg_fails_loudly() {
        let mut route = multi_leg_route(&[400.0, 600.0]);
        route.legs[1].steps.clear();
        consolidate(route, Coordinate::new(0.0, 0.0));
    }
}
