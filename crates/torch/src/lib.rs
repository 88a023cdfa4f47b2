//! # Torch Height Control Crate
//!
//! Z-axis incremental stepper control, arc-voltage (ATHC) averaging, and the
//! probe/pierce/retract scripted-sequence interpreter that runs between
//! X/Y moves. `no_std`-friendly, same as [`motion`]; the host (the
//! `runtime` crate) supplies the clock and hardware collaborators.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod collab;
pub mod controller;
pub mod errors;
pub mod sync;

pub use collab::{ArcVoltageSource, Clock, ProbeInput, TorchOutput, ZStepSink};
pub use controller::{SyncOutcome, TorchConfig, TorchController};
pub use errors::TorchError;
pub use sync::{CallbackData, SyncConfig, SyncSequence, SyncStep};
