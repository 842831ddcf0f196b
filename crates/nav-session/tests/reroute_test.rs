//! End-to-end session tests against a scripted directions service.
//!
//! Each `calculate` call is handed to the test as a `PendingCall`, which
//! decides when and with what the call completes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::{mpsc, oneshot};

use nav_core::spatial::destination_point;
use nav_core::{
    AlertLevel, Coordinate, LocationSample, ManeuverType, NavError, Route, RouteLeg, RouteStep,
    Waypoint,
};
use nav_session::{
    Config, DirectionsError, DirectionsService, NavigationEvent, NavigationSession,
    ReroutePhase, Subscription,
};

type Reply = Result<Vec<Route>, DirectionsError>;

struct PendingCall {
    waypoints: Vec<Waypoint>,
    respond: oneshot::Sender<Reply>,
}

struct ScriptedDirections {
    calls: mpsc::UnboundedSender<PendingCall>,
}

#[async_trait]
impl DirectionsService for ScriptedDirections {
    async fn calculate(&self, waypoints: &[Waypoint]) -> Reply {
        let (respond, reply) = oneshot::channel();
        self.calls
            .send(PendingCall {
                waypoints: waypoints.to_vec(),
                respond,
            })
            .map_err(|_| DirectionsError::Unavailable("test harness gone".into()))?;
        reply
            .await
            .unwrap_or_else(|_| Err(DirectionsError::Unavailable("no reply".into())))
    }
}

const START: Coordinate = Coordinate {
    lat: 33.6846,
    lon: -117.8265,
};

fn leg(start: Coordinate, distance_m: f64) -> RouteLeg {
    let end = destination_point(start, distance_m, 0.0);
    RouteLeg::from_steps(
        vec![
            RouteStep::new(ManeuverType::Depart, start, distance_m, distance_m / 10.0),
            RouteStep::new(ManeuverType::Arrive, end, 0.0, 0.0),
        ],
        end,
    )
}

/// Three legs heading due north: 1000 m, 500 m, 800 m.
fn three_leg_route() -> Route {
    let first = leg(START, 1_000.0);
    let second = leg(first.destination, 500.0);
    let third = leg(second.destination, 800.0);
    Route::new(vec![first, second, third], Vec::new())
}

fn single_leg_from(start: Coordinate, distance_m: f64) -> Route {
    Route::new(vec![leg(start, distance_m)], Vec::new())
}

fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
}

fn sample(coordinate: Coordinate, course: f64, seconds: i64) -> LocationSample {
    LocationSample::new(coordinate, course, at(seconds))
}

fn start_session() -> (NavigationSession, mpsc::UnboundedReceiver<PendingCall>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let directions = Arc::new(ScriptedDirections { calls: tx });
    let session =
        NavigationSession::start(three_leg_route(), START, directions, &Config::default()).unwrap();
    (session, rx)
}

async fn next_call(calls: &mut mpsc::UnboundedReceiver<PendingCall>) -> PendingCall {
    tokio::time::timeout(Duration::from_secs(2), calls.recv())
        .await
        .expect("timed out waiting for directions call")
        .expect("directions service dropped")
}

async fn wait_for(sub: &mut Subscription, kind: &str) -> NavigationEvent {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let event = sub.recv().await.expect("event bus closed");
            if event.kind() == kind {
                return event;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {kind}"))
}

#[tokio::test]
async fn off_route_sample_reroutes_from_current_location() {
    let (session, mut calls) = start_session();
    let mut sub = session.subscribe();
    let anchors = session.current().route().main_maneuver_locations().to_vec();
    assert_eq!(anchors.len(), 4);

    let here = destination_point(START, 150.0, 90.0);
    session.process_sample(sample(here, 90.0, 1)).unwrap();
    assert_eq!(session.reroute_phase(), ReroutePhase::Requesting);

    let call = next_call(&mut calls).await;
    assert_eq!(call.waypoints[0].coordinate, here);
    assert_eq!(call.waypoints[0].heading_deg, Some(90.0));
    let targets: Vec<Coordinate> = call.waypoints[1..].iter().map(|w| w.coordinate).collect();
    assert_eq!(targets, anchors[1..].to_vec());

    let replacement = single_leg_from(here, 2_400.0);
    call.respond.send(Ok(vec![replacement])).unwrap();

    let NavigationEvent::RerouteApplied { token, route, progress } =
        wait_for(&mut sub, "reroute_applied").await
    else {
        unreachable!();
    };
    assert_eq!(token, 1);
    assert_eq!(route.legs.len(), 1);
    assert!((route.distance_m() - 2_400.0).abs() < 1e-9);
    assert_eq!(progress.step_index(), 0);
    assert!(Arc::ptr_eq(session.current().route(), &route));
    assert_eq!(session.reroute_phase(), ReroutePhase::Idle);

    // Back on the new route; no further request.
    let on_route = destination_point(here, 40.0, 0.0);
    let progress = session.process_sample(sample(on_route, 0.0, 2)).unwrap();
    assert!(!progress.is_off_route());
    assert!(calls.try_recv().is_err());
}

#[tokio::test]
async fn nearby_off_route_samples_trigger_one_request() {
    let (session, mut calls) = start_session();

    let first = destination_point(START, 150.0, 90.0);
    session.process_sample(sample(first, -1.0, 1)).unwrap();
    let call = next_call(&mut calls).await;
    call.respond.send(Err(DirectionsError::NoRoute)).unwrap();

    // Let the failure land so the coordinator is idle again.
    for _ in 0..50 {
        if session.reroute_phase() == ReroutePhase::Idle {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(session.reroute_phase(), ReroutePhase::Idle);

    let ten_meters_on = destination_point(first, 10.0, 0.0);
    let progress = session.process_sample(sample(ten_meters_on, -1.0, 2)).unwrap();
    assert!(progress.is_off_route());
    tokio::task::yield_now().await;
    assert!(calls.try_recv().is_err());
    assert_eq!(session.reroute_phase(), ReroutePhase::Idle);

    let far_on = destination_point(first, 120.0, 0.0);
    session.process_sample(sample(far_on, -1.0, 3)).unwrap();
    let second = next_call(&mut calls).await;
    assert_eq!(second.waypoints[0].coordinate, far_on);
}

#[tokio::test]
async fn superseded_response_never_replaces_newer_route() {
    let (session, mut calls) = start_session();
    let mut sub = session.subscribe();
    let origin = destination_point(START, 50.0, 0.0);

    let r1 = session
        .change_destination(vec![origin, destination_point(origin, 700.0, 0.0)], None)
        .unwrap();
    let first = next_call(&mut calls).await;

    let r2 = session
        .change_destination(vec![origin, destination_point(origin, 1_900.0, 0.0)], None)
        .unwrap();
    let second = next_call(&mut calls).await;
    assert!(r2 > r1);

    second
        .respond
        .send(Ok(vec![single_leg_from(origin, 1_900.0)]))
        .unwrap();
    let NavigationEvent::RerouteApplied { token, .. } = wait_for(&mut sub, "reroute_applied").await
    else {
        unreachable!();
    };
    assert_eq!(token, r2);

    // The first request was cancelled; even if its reply gets through it is ignored.
    let _ = first.respond.send(Ok(vec![single_leg_from(origin, 700.0)]));
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    let current = session.current();
    assert!((current.route().distance_m() - 1_900.0).abs() < 1e-9);
    assert!(sub.drain().iter().all(|e| e.kind() != "reroute_applied"));
}

#[tokio::test]
async fn failed_reroute_keeps_navigating_on_old_route() {
    let (session, mut calls) = start_session();
    let mut sub = session.subscribe();
    let before = session.current();

    session
        .process_sample(sample(destination_point(START, 200.0, 270.0), 270.0, 1))
        .unwrap();
    let call = next_call(&mut calls).await;
    call.respond
        .send(Err(DirectionsError::Status { status: 503 }))
        .unwrap();

    let NavigationEvent::RerouteFailed { token, error } = wait_for(&mut sub, "reroute_failed").await
    else {
        unreachable!();
    };
    assert_eq!(token, 1);
    assert!(matches!(*error, DirectionsError::Status { status: 503 }));
    assert!(Arc::ptr_eq(session.current().route(), before.route()));

    let progress = session
        .process_sample(sample(destination_point(START, 300.0, 0.0), 0.0, 2))
        .unwrap();
    assert!(!progress.is_off_route());
    assert!(Arc::ptr_eq(progress.route(), before.route()));
}

#[tokio::test]
async fn destination_change_requires_two_coordinates() {
    let (session, mut calls) = start_session();

    let err = session.change_destination(vec![START], None).unwrap_err();
    assert_eq!(err, NavError::InsufficientWaypoints { got: 1 });
    assert_eq!(session.reroute_phase(), ReroutePhase::Idle);
    tokio::task::yield_now().await;
    assert!(calls.try_recv().is_err());
}

#[tokio::test]
async fn driving_the_route_ends_in_arrival() {
    let (session, _calls) = start_session();
    let mut sub = session.subscribe();

    let mut levels = Vec::new();
    for (i, along) in [0.0, 600.0, 1_200.0, 1_800.0, 2_000.0, 2_250.0, 2_290.0]
        .into_iter()
        .enumerate()
    {
        let position = destination_point(START, along, 0.0);
        let progress = session.process_sample(sample(position, 0.0, i as i64)).unwrap();
        assert!(!progress.is_off_route());
        levels.push(progress.alert_level());
    }

    assert_eq!(levels.last(), Some(&AlertLevel::Arrive));
    let events = sub.drain();
    assert_eq!(events.iter().filter(|e| e.kind() == "arrived").count(), 1);
    assert!(events.iter().any(|e| matches!(
        e,
        NavigationEvent::AlertLevelChanged {
            current: AlertLevel::High,
            ..
        }
    )));
    assert!(session.current().is_arrived());
}

#[tokio::test]
async fn out_of_order_sample_is_ignored() {
    let (session, _calls) = start_session();
    let mut sub = session.subscribe();

    session
        .process_sample(sample(destination_point(START, 500.0, 0.0), 0.0, 10))
        .unwrap();
    let before = session.current();
    sub.drain();

    let progress = session
        .process_sample(sample(destination_point(START, 100.0, 0.0), 0.0, 5))
        .unwrap();
    assert!(Arc::ptr_eq(&progress, &before));
    assert!(sub.drain().is_empty());
}

#[tokio::test]
async fn invalid_sample_is_rejected() {
    let (session, _calls) = start_session();
    let bad = Coordinate::new(f64::NAN, -117.0);

    let err = session.process_sample(sample(bad, 0.0, 1)).unwrap_err();
    assert!(matches!(err, NavError::InvalidCoordinate(_)));
}
