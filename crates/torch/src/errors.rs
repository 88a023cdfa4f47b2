//! Error types for the torch height control crate.

use thiserror::Error;

/// Errors that can occur while driving the torch controller or a scripted
/// sequence.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum TorchError {
    /// A sequence was requested while one was already running; `cancel()`
    /// it first.
    #[error("a scripted sequence is already running")]
    SequenceAlreadyRunning,
    /// The calibrated ADC span (`adc_at_one_hundred - adc_at_zero`) is zero
    /// or negative, so a voltage reading cannot be scaled.
    #[error("invalid ADC calibration: zero and full-scale readings must differ")]
    InvalidAdcCalibration,
}
