//! Spatial math for path projection and distance calculations.

use crate::models::Coordinate;

/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Calculate distance between two points in meters (Haversine formula).
///
/// # Arguments
/// * `lat1`, `lon1` - First point coordinates in decimal degrees
/// * `lat2`, `lon2` - Second point coordinates in decimal degrees
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

// ==== ENU (East-North-Up) Coordinate Conversion ====

/// Meters per degree of latitude at a given latitude (WGS84 approximation).
fn meters_per_deg_lat(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_132.954 - 559.822 * (2.0 * lat_rad).cos() + 1.175 * (4.0 * lat_rad).cos()
        - 0.0023 * (6.0 * lat_rad).cos()
}

/// Meters per degree of longitude at a given latitude (WGS84 approximation).
fn meters_per_deg_lon(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_412.84 * lat_rad.cos() - 93.5 * (3.0 * lat_rad).cos() + 0.118 * (5.0 * lat_rad).cos()
}

fn lat_to_meters(deg: f64, ref_lat_deg: f64) -> f64 {
    deg * meters_per_deg_lat(ref_lat_deg)
}

fn lon_to_meters(deg: f64, ref_lat_deg: f64) -> f64 {
    deg * meters_per_deg_lon(ref_lat_deg)
}

/// Calculate bearing from point 1 to point 2 in radians.
/// Returns bearing in radians, 0 = north, π/2 = east.
pub fn bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let x = delta_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    x.atan2(y)
}

/// Offset a position by distance and bearing.
///
/// # Arguments
/// * `lat`, `lon` - Starting position in degrees
/// * `distance_m` - Distance in meters
/// * `bearing_rad` - Bearing in radians (0 = north, π/2 = east)
///
/// # Returns
/// (new_lat, new_lon) in degrees
pub fn offset_by_bearing(lat: f64, lon: f64, distance_m: f64, bearing_rad: f64) -> (f64, f64) {
    if distance_m.abs() <= f64::EPSILON {
        return (lat, lon);
    }

    let lat1 = lat.to_radians();
    let lon1 = lon.to_radians();
    let angular_distance = distance_m / EARTH_RADIUS_M;

    let sin_lat1 = lat1.sin();
    let cos_lat1 = lat1.cos();
    let sin_ad = angular_distance.sin();
    let cos_ad = angular_distance.cos();

    let sin_lat2 = sin_lat1 * cos_ad + cos_lat1 * sin_ad * bearing_rad.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();

    let y = bearing_rad.sin() * sin_ad * cos_lat1;
    let x = cos_ad - sin_lat1 * sin_lat2;
    let mut lon2 = lon1 + y.atan2(x);
    lon2 =
        (lon2 + std::f64::consts::PI).rem_euclid(2.0 * std::f64::consts::PI) - std::f64::consts::PI;

    (lat2.to_degrees(), lon2.to_degrees())
}

/// Same as [`offset_by_bearing`] but on [`Coordinate`]s with the bearing in degrees.
pub fn destination_point(origin: Coordinate, distance_m: f64, bearing_deg: f64) -> Coordinate {
    let (lat, lon) =
        offset_by_bearing(origin.lat, origin.lon, distance_m, bearing_deg.to_radians());
    Coordinate::new(lat, lon)
}

/// Closest point on a segment expressed in a local ENU frame.
///
/// Returns `(distance_m, t)` where `t` in [0, 1] is the fraction along the
/// segment of the closest point.
fn closest_on_segment(
    point_lat: f64,
    point_lon: f64,
    seg_start_lat: f64,
    seg_start_lon: f64,
    seg_end_lat: f64,
    seg_end_lon: f64,
) -> (f64, f64) {
    // Convert to local ENU (using segment start as origin)
    let ref_lat = seg_start_lat;

    let px = lon_to_meters(point_lon - seg_start_lon, ref_lat);
    let py = lat_to_meters(point_lat - seg_start_lat, ref_lat);

    let sx = lon_to_meters(seg_end_lon - seg_start_lon, ref_lat);
    let sy = lat_to_meters(seg_end_lat - seg_start_lat, ref_lat);

    let seg_len_sq = sx * sx + sy * sy;

    if seg_len_sq < 0.0001 {
        // Segment is essentially a point
        return ((px * px + py * py).sqrt(), 0.0);
    }

    // Project point onto segment line: t = ((P-A) · (B-A)) / |B-A|²
    let t = ((px * sx + py * sy) / seg_len_sq).clamp(0.0, 1.0);

    let dx = px - t * sx;
    let dy = py - t * sy;

    ((dx * dx + dy * dy).sqrt(), t)
}

/// Where a point falls relative to a polyline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolylineProjection {
    /// Perpendicular distance from the point to the closest segment
    pub distance_m: f64,
    /// Distance travelled along the polyline up to the closest point
    pub along_m: f64,
    /// Total polyline length
    pub length_m: f64,
}

impl PolylineProjection {
    /// Distance left between the closest point and the end of the polyline.
    pub fn remaining_m(&self) -> f64 {
        (self.length_m - self.along_m).max(0.0)
    }
}

/// Project `point` onto `path`, picking the closest segment.
///
/// A single-point path degenerates to the direct distance to that point.
/// Returns `None` for an empty path.
pub fn project_onto_polyline(
    point: &Coordinate,
    path: &[Coordinate],
) -> Option<PolylineProjection> {
    match path {
        [] => None,
        [only] => Some(PolylineProjection {
            distance_m: point.distance_to(only),
            along_m: 0.0,
            length_m: 0.0,
        }),
        _ => {
            let mut best: Option<(f64, f64)> = None;
            let mut walked = 0.0;
            for pair in path.windows(2) {
                let seg_len = pair[0].distance_to(&pair[1]);
                let (distance_m, t) = closest_on_segment(
                    point.lat,
                    point.lon,
                    pair[0].lat,
                    pair[0].lon,
                    pair[1].lat,
                    pair[1].lon,
                );
                if best.map_or(true, |(d, _)| distance_m < d) {
                    best = Some((distance_m, walked + t * seg_len));
                }
                walked += seg_len;
            }
            best.map(|(distance_m, along_m)| PolylineProjection {
                distance_m,
                along_m,
                length_m: walked,
            })
        }
    }
}
