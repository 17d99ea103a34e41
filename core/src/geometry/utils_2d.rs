//! 2D geometry utilities used by the distance and angle relations.

use super::EPSILON;
use std::f64::consts::PI;

// =============================================================================
// Point Operations
// =============================================================================

/// Check if two 2D points are approximately equal within EPSILON.
#[inline]
pub fn points_equal(p1: [f64; 2], p2: [f64; 2]) -> bool {
    (p1[0] - p2[0]).abs() < EPSILON && (p1[1] - p2[1]).abs() < EPSILON
}

/// Compute squared distance between two 2D points.
#[inline]
pub fn distance_squared(p1: [f64; 2], p2: [f64; 2]) -> f64 {
    let dx = p2[0] - p1[0];
    let dy = p2[1] - p1[1];
    dx * dx + dy * dy
}

/// Compute distance between two 2D points.
#[inline]
pub fn distance(p1: [f64; 2], p2: [f64; 2]) -> f64 {
    distance_squared(p1, p2).sqrt()
}

// =============================================================================
// Angles
// =============================================================================

/// Directed angle of the vector from `from` to `to`, in (-PI, PI].
#[inline]
pub fn direction_angle(from: [f64; 2], to: [f64; 2]) -> f64 {
    (to[1] - from[1]).atan2(to[0] - from[0])
}

/// Point at `radius` along `angle` from `origin`.
#[inline]
pub fn polar_offset(origin: [f64; 2], angle: f64, radius: f64) -> [f64; 2] {
    [origin[0] + radius * angle.cos(), origin[1] + radius * angle.sin()]
}

/// Wrap an angle into (-PI, PI].
pub fn wrap_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return angle;
    }
    let mut wrapped = angle.rem_euclid(2.0 * PI);
    if wrapped > PI {
        wrapped -= 2.0 * PI;
    }
    wrapped
}

/// Signed shortest rotation taking `from` to `to`.
#[inline]
pub fn angle_delta(from: f64, to: f64) -> f64 {
    wrap_angle(to - from)
}

/// Move `previous` onto the branch of `measured` closest to it, so a value that
/// crosses the +/-PI cut keeps changing continuously.
#[inline]
pub fn unwrap_angle(previous: f64, measured: f64) -> f64 {
    if !previous.is_finite() {
        return measured;
    }
    previous + angle_delta(previous, measured)
}
