#![cfg_attr(not(feature = "std"), no_std)]

//! # Signal Filtering
//!
//! Small, dependency-light filters for smoothing noisy analog readings before
//! they feed a control loop. Originally part of a broader thermal-management
//! crate; kept here for its `Filter` trait and `MovingAverageFilter`, which the
//! arc-voltage averager in `torch` builds on.

pub mod filter;

pub use filter::{Filter, LowPassFilter, MovingAverageFilter, RuntimeMovingAverage};
