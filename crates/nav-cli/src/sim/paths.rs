//! Vehicle path implementations.

use nav_core::spatial::{bearing, destination_point};
use nav_core::{Coordinate, Route};

/// Trait for simulated vehicle paths.
pub trait DrivePath: Send + Sync {
    /// Position at time t seconds from start.
    fn position(&self, t: f64) -> Coordinate;

    /// Get approximate heading at time t (degrees, 0 = North).
    fn heading(&self, t: f64) -> f64 {
        // Default: estimate heading from position delta
        let dt = 0.1;
        let here = self.position(t);
        let ahead = self.position(t + dt);
        if here.distance_to(&ahead) < 1e-3 {
            return 0.0;
        }
        bearing(here.lat, here.lon, ahead.lat, ahead.lon)
            .to_degrees()
            .rem_euclid(360.0)
    }

    /// Get speed in meters per second.
    fn speed_mps(&self) -> f64;

    /// Seconds until the end of the path.
    fn duration_s(&self) -> f64;
}

/// Constant-speed drive along a polyline.
#[derive(Debug, Clone)]
pub struct PolylinePath {
    points: Vec<Coordinate>,
    cumulative_m: Vec<f64>,
    speed_mps: f64,
}

impl PolylinePath {
    /// Returns `None` for an empty point list.
    pub fn new(points: Vec<Coordinate>, speed_mps: f64) -> Option<Self> {
        let mut deduped: Vec<Coordinate> = Vec::with_capacity(points.len());
        for point in points {
            if deduped.last().is_some_and(|last| last.distance_to(&point) < 0.01) {
                continue;
            }
            deduped.push(point);
        }
        if deduped.is_empty() {
            return None;
        }

        let mut cumulative_m = Vec::with_capacity(deduped.len());
        let mut total = 0.0;
        cumulative_m.push(total);
        for pair in deduped.windows(2) {
            total += pair[0].distance_to(&pair[1]);
            cumulative_m.push(total);
        }

        Some(Self {
            points: deduped,
            cumulative_m,
            speed_mps,
        })
    }

    /// Follow a route's step geometry, or its maneuver points where a step has none.
    pub fn from_route(route: &Route, speed_mps: f64) -> Option<Self> {
        let mut points = Vec::new();
        for step in route.legs.iter().flat_map(|leg| leg.steps.iter()) {
            if step.geometry.len() >= 2 {
                points.extend(step.geometry.iter().copied());
            } else {
                points.push(step.maneuver_location);
            }
        }
        Self::new(points, speed_mps)
    }

    pub fn length_m(&self) -> f64 {
        self.cumulative_m.last().copied().unwrap_or(0.0)
    }

    /// Index of the segment containing `along_m`.
    fn segment_at(&self, along_m: f64) -> usize {
        let last_segment = self.points.len().saturating_sub(2);
        self.cumulative_m
            .windows(2)
            .position(|span| along_m <= span[1])
            .unwrap_or(last_segment)
    }

    fn along_at(&self, t: f64) -> f64 {
        (t * self.speed_mps).clamp(0.0, self.length_m())
    }
}

impl DrivePath for PolylinePath {
    fn position(&self, t: f64) -> Coordinate {
        if self.points.len() == 1 {
            return self.points[0];
        }
        let along = self.along_at(t);
        let index = self.segment_at(along);
        let (from, to) = (self.points[index], self.points[index + 1]);
        let heading = bearing(from.lat, from.lon, to.lat, to.lon).to_degrees();
        destination_point(from, along - self.cumulative_m[index], heading)
    }

    fn heading(&self, t: f64) -> f64 {
        if self.points.len() == 1 {
            return 0.0;
        }
        let index = self.segment_at(self.along_at(t));
        let (from, to) = (self.points[index], self.points[index + 1]);
        bearing(from.lat, from.lon, to.lat, to.lon)
            .to_degrees()
            .rem_euclid(360.0)
    }

    fn speed_mps(&self) -> f64 {
        self.speed_mps
    }

    fn duration_s(&self) -> f64 {
        if self.speed_mps > 0.0 {
            self.length_m() / self.speed_mps
        } else {
            0.0
        }
    }
}

/// Pushes the vehicle sideways off another path for a while.
pub struct DetourPath<P> {
    inner: P,
    start_s: f64,
    end_s: f64,
    offset_m: f64,
}

impl<P: DrivePath> DetourPath<P> {
    /// Offset `offset_m` to the right of travel from `start_s` for `duration_s`.
    pub fn new(inner: P, start_s: f64, duration_s: f64, offset_m: f64) -> Self {
        Self {
            inner,
            start_s,
            end_s: start_s + duration_s,
            offset_m,
        }
    }

    pub fn is_detouring(&self, t: f64) -> bool {
        (self.start_s..self.end_s).contains(&t)
    }
}

impl<P: DrivePath> DrivePath for DetourPath<P> {
    fn position(&self, t: f64) -> Coordinate {
        let on_path = self.inner.position(t);
        if !self.is_detouring(t) {
            return on_path;
        }
        destination_point(on_path, self.offset_m, self.inner.heading(t) + 90.0)
    }

    fn heading(&self, t: f64) -> f64 {
        self.inner.heading(t)
    }

    fn speed_mps(&self) -> f64 {
        self.inner.speed_mps()
    }

    fn duration_s(&self) -> f64 {
        self.inner.duration_s()
    }
}
