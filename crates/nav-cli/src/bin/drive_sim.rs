//! Drive simulator: replays a vehicle along a three-leg route through a live
//! navigation session, optionally detouring to force a reroute.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use rand::Rng;
use tokio::time;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nav_cli::sim::{demo_route, DetourPath, DrivePath, PolylinePath, SimulatedDirections};
use nav_core::spatial::destination_point;
use nav_core::{Coordinate, LocationSample};
use nav_session::{
    Config, DirectionsService, HttpDirectionsClient, NavigationEvent, NavigationSession,
};

/// Simulate a drive through a navigation session
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Directions service URL (default: NAV_DIRECTIONS_URL, else simulated in-process)
    #[arg(long)]
    url: Option<String>,

    /// Start latitude (default: UCI)
    #[arg(long, default_value_t = 33.6846)]
    lat: f64,

    /// Start longitude (default: UCI)
    #[arg(long, default_value_t = -117.8265)]
    lon: f64,

    /// Vehicle speed in m/s
    #[arg(long, default_value_t = 13.9)]
    speed: f64,

    /// Location samples per simulated second
    #[arg(long, default_value_t = 1.0)]
    rate: f64,

    /// Wall-clock milliseconds between samples
    #[arg(long, default_value_t = 50)]
    tick_ms: u64,

    /// GPS jitter radius in meters
    #[arg(long, default_value_t = 3.0)]
    jitter: f64,

    /// Simulated second at which the detour starts (negative disables it)
    #[arg(long, default_value_t = 40.0)]
    detour_at: f64,

    /// How far off the route the detour goes, in meters
    #[arg(long, default_value_t = 150.0)]
    detour_m: f64,

    /// Detour length in simulated seconds
    #[arg(long, default_value_t = 20.0)]
    detour_s: f64,

    /// Latency of the simulated directions service in milliseconds
    #[arg(long, default_value_t = 300)]
    latency_ms: u64,

    /// Give up after this many simulated seconds
    #[arg(long, default_value_t = 1_800.0)]
    max_s: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("drive_sim=info".parse()?)
                .add_directive("nav_session=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let mut config = Config::from_env();
    if args.url.is_some() {
        config.directions_url = args.url.clone();
    }

    let directions: Arc<dyn DirectionsService> = match &config.directions_url {
        Some(url) => {
            tracing::info!(%url, "using HTTP directions service");
            Arc::new(HttpDirectionsClient::new(url.as_str())?)
        }
        None => {
            tracing::info!(latency_ms = args.latency_ms, "using simulated directions service");
            Arc::new(SimulatedDirections::new(
                args.speed,
                Duration::from_millis(args.latency_ms),
            ))
        }
    };

    let origin = Coordinate::new(args.lat, args.lon);
    let session = NavigationSession::start(
        demo_route(origin, args.speed),
        origin,
        directions,
        &config,
    )?;

    let mut log_events = session.subscribe();
    let logger = tokio::spawn(async move {
        while let Some(event) = log_events.recv().await {
            log_event(&event);
        }
    });

    let mut reroutes = session.subscribe();
    let route_path = PolylinePath::from_route(session.current().route(), args.speed)
        .context("route has no geometry")?;
    let mut path: Box<dyn DrivePath> = if args.detour_at >= 0.0 {
        Box::new(DetourPath::new(
            route_path,
            args.detour_at,
            args.detour_s,
            args.detour_m,
        ))
    } else {
        Box::new(route_path)
    };

    let started_at = Utc::now();
    let dt = 1.0 / args.rate.max(0.01);
    let mut sim_t = 0.0;
    let mut path_t = 0.0;
    let mut rng = rand::rng();
    let mut interval = time::interval(Duration::from_millis(args.tick_ms.max(1)));
    let mut samples = 0u32;

    tracing::info!(
        distance_m = session.current().distance_remaining_m(),
        speed_mps = path.speed_mps(),
        drive_s = path.duration_s(),
        "starting drive"
    );

    loop {
        interval.tick().await;

        // Follow whatever route guidance the session switched to.
        for event in reroutes.drain() {
            if let NavigationEvent::RerouteApplied { route, .. } = event {
                if let Some(next) = PolylinePath::from_route(&route, args.speed) {
                    path = Box::new(next);
                    path_t = 0.0;
                }
            }
        }

        let mut position = path.position(path_t);
        if args.jitter > 0.0 {
            let offset = rng.random_range(0.0..args.jitter);
            let direction = rng.random_range(0.0..360.0);
            position = destination_point(position, offset, direction);
        }

        let timestamp = started_at + chrono::Duration::milliseconds((sim_t * 1_000.0) as i64);
        let sample = LocationSample::new(position, path.heading(path_t), timestamp);
        match session.process_sample(sample) {
            Ok(progress) => {
                samples += 1;
                if progress.is_arrived() {
                    break;
                }
            }
            Err(e) => tracing::warn!(error = %e, "rejected location sample"),
        }

        sim_t += dt;
        path_t += dt;
        if sim_t > args.max_s {
            tracing::warn!(sim_t, "giving up before arrival");
            break;
        }
    }

    let progress = session.current();
    tracing::info!(
        samples,
        speed_mps = path.speed_mps(),
        sim_s = sim_t,
        arrived = progress.is_arrived(),
        reroutes = session.coordinator().current_token(),
        "drive finished"
    );

    // Let the logger catch up before exiting.
    time::sleep(Duration::from_millis(100)).await;
    logger.abort();
    Ok(())
}

fn log_event(event: &NavigationEvent) {
    match event {
        NavigationEvent::ProgressChanged { progress } => tracing::debug!(
            remaining_m = progress.distance_remaining_m(),
            remaining_s = progress.duration_remaining_s(),
            to_maneuver_m = progress.distance_to_maneuver_m(),
            "progress"
        ),
        NavigationEvent::AlertLevelChanged {
            previous,
            current,
            progress,
        } => tracing::info!(
            ?previous,
            ?current,
            step = progress.step_index(),
            instruction = %progress.current_step().instruction,
            "alert level changed"
        ),
        NavigationEvent::OffRoute {
            location,
            distance_from_route_m,
        } => tracing::info!(%location, distance_from_route_m, "off route"),
        NavigationEvent::RerouteRequested { token, waypoints } => {
            tracing::info!(token, waypoints = waypoints.len(), "reroute requested")
        }
        NavigationEvent::RerouteApplied { token, route, .. } => tracing::info!(
            token,
            distance_m = route.distance_m(),
            duration_s = route.expected_travel_time_s(),
            "reroute applied"
        ),
        NavigationEvent::RerouteFailed { token, error } => {
            tracing::warn!(token, %error, "reroute failed")
        }
        NavigationEvent::Arrived { progress } => tracing::info!(
            destination = ?progress.current_leg().destination_name,
            "arrived"
        ),
    }
}
