//! Small vector types used at the planner's external boundary and internally
//! for step counts.

/// A point in the external, user-unit coordinate space, plus a feedrate.
///
/// `f` is user units per **minute** on the external API (matching G-code
/// convention); the planner converts it to user units per second internally
/// the moment a move is pushed.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct Vector3F {
    pub x: f64,
    pub y: f64,
    pub f: f64,
}

impl Vector3F {
    pub const fn new(x: f64, y: f64, f: f64) -> Self {
        Self { x, y, f }
    }
}

/// An integer X/Y pair, used for step counts and per-axis step scales.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct Vector2I {
    pub x: i64,
    pub y: i64,
}

impl Vector2I {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// An X/Y pair of `f64`s, used for per-axis step scales, accelerations and
/// jerk values, and for instantaneous velocity.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct Vector2F {
    pub x: f64,
    pub y: f64,
}

impl Vector2F {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub const fn splat(v: f64) -> Self {
        Self { x: v, y: v }
    }
}
