//! # Motion Control Crate
//!
//! A deterministic, bounded-queue motion planner for two-axis (X/Y) CNC
//! plasma cutting: trapezoidal/triangular ramp math, a Bresenham stepper
//! core, and feed-hold/abort semantics, usable on both host and MCU
//! (`no_std`-friendly).
//!
//! The planner never touches GPIO or a clock directly — it calls into the
//! [`Clock`] and [`StepSink`] traits, which the host (the `runtime` crate)
//! implements against real hardware or a test double.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod collab;
pub mod errors;
pub mod geometry;
pub mod planner;
pub mod queue;
pub mod ramp;

pub use collab::{Clock, StepSink};
pub use errors::PlannerError;
pub use geometry::{Vector2F, Vector2I, Vector3F};
pub use planner::{Move, MotionPlanner, MoveType, PlannerConfig, FEED_VALUE_SCALE};
pub use queue::MoveQueue;
