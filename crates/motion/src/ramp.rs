//! Pure trapezoidal/triangular ramp math. No state; every function is a
//! closed-form distance↔velocity relation derived from constant-acceleration
//! kinematics.
//!
//! These closed forms are part of the external contract (spec-equivalent to
//! the original firmware's `motion_calculate_accel_marker` and
//! `motion_calculate_feed_from_distance`): any reimplementation must agree
//! with them exactly, since the planner's triangular-profile clipping and
//! feed-hold deceleration both depend on their exact shape.

#[cfg(not(feature = "std"))]
use libm::sqrt;
#[cfg(feature = "std")]
fn sqrt(x: f64) -> f64 {
    x.sqrt()
}

/// Distance needed to accelerate from `min_feed` to `target_velocity` at a
/// constant rate `accel`.
///
/// `distance = min_feed * t + 1/2 * accel * t^2`, where
/// `t = (target_velocity - min_feed) / accel`.
///
/// Negative or degenerate inputs (non-positive `accel`, or a target at or
/// below `min_feed`) clip to zero distance rather than producing NaN or a
/// negative marker.
pub fn accel_marker(accel: f64, min_feed: f64, target_velocity: f64) -> f64 {
    if accel <= 0.0 || target_velocity <= min_feed {
        return 0.0;
    }
    let t = (target_velocity - min_feed) / accel;
    min_feed * t + 0.5 * accel * t * t
}

/// Velocity reached after accelerating from rest through `distance` at a
/// constant rate `accel`: `v = sqrt(2 * accel * distance)`.
///
/// Used both to look up the in-ramp velocity at a given distance-into-move,
/// and (with `distance = move_length / 2`) to find the triangular-profile
/// peak velocity a move of a given length can reach before it must start
/// decelerating again.
///
/// `accel <= 0` or `distance <= 0` clip to `0.0`.
pub fn feed_from_distance(accel: f64, distance: f64) -> f64 {
    if accel <= 0.0 || distance <= 0.0 {
        return 0.0;
    }
    sqrt(2.0 * accel * distance)
}
