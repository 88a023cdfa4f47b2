//! Collaborator interfaces the torch controller calls into, mirroring
//! `motion::collab`'s split between planner logic and hardware access.

pub use motion::Clock;

/// Pulses the Z axis one step. Mirrors `motion::StepSink`, scoped to a
/// single axis since the torch controller never drives X/Y.
pub trait ZStepSink {
    fn step_z(&mut self, dir: i32);
}

/// Reads the raw ADC counts backing the arc-voltage average.
pub trait ArcVoltageSource {
    fn read_raw(&mut self) -> u16;
}

/// The digital probe input used by `probe_torch` (true once the torch
/// contacts the workpiece).
pub trait ProbeInput {
    fn is_triggered(&mut self) -> bool;
}

/// Drives the torch's pilot-arc relay/output.
pub trait TorchOutput {
    fn set_torch_on(&mut self, on: bool);
}
