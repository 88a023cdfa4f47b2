//! Host-side stand-ins for the collaborator interfaces spec.md §6 lists
//! (`GPIO`, `Clock`) — there is no real stepper driver or ADC to talk to when
//! replaying a move file on a workstation, so these simply record what the
//! planner/torch core would have driven, the way the teacher crate's removed
//! `MockAtomicGpioPort`/`MockTimer` stood in for real MCU registers under
//! test. `driver-drv8825`/`driver-endstop` remain the real hardware path for
//! an embedded target; this module is the host replay path.

use motion::{Clock, StepSink};
use torch::collab::{ArcVoltageSource, ProbeInput, TorchOutput, ZStepSink};

/// A free-running virtual clock advanced one millisecond per call to
/// [`VirtualClock::advance`]. Standing in for the original firmware's
/// `millis()`/`micros()`, but driven by the replay loop instead of real time
/// so a replay is deterministic and doesn't block on `sleep`.
#[derive(Debug, Default)]
pub struct VirtualClock {
    millis: u32,
    micros: u32,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the clock by one millisecond (1000 microseconds), matching
    /// the 1kHz tick cadence the spec requires `motion_tick`/`move_tick` to
    /// run at.
    pub fn advance_one_tick(&mut self) {
        self.millis = self.millis.wrapping_add(1);
        self.micros = self.micros.wrapping_add(1000);
    }
}

impl Clock for VirtualClock {
    fn millis(&self) -> u32 {
        self.millis
    }
    fn micros(&self) -> u32 {
        self.micros
    }
}

/// A clock backed by the wall clock, for the `run` subcommand's live 1kHz
/// loop (as opposed to [`VirtualClock`], which the `replay` subcommand uses
/// so a replay's timing is reproducible across runs).
pub struct WallClock {
    start: std::time::Instant,
}

impl WallClock {
    pub fn new() -> Self {
        Self { start: std::time::Instant::now() }
    }
}

impl Clock for WallClock {
    fn millis(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
    fn micros(&self) -> u32 {
        self.start.elapsed().as_micros() as u32
    }
}

/// Records every X/Y step pulse the planner emits, for the replay CLI to
/// print as a step trace.
#[derive(Debug, Default)]
pub struct TraceStepSink {
    pub x_steps: Vec<i32>,
    pub y_steps: Vec<i32>,
}

impl StepSink for TraceStepSink {
    fn step_x(&mut self, dir: i32) {
        self.x_steps.push(dir);
    }
    fn step_y(&mut self, dir: i32) {
        self.y_steps.push(dir);
    }
}

/// Records every Z step pulse the torch controller emits.
#[derive(Debug, Default)]
pub struct TraceZSink {
    pub z_steps: Vec<i32>,
}

impl ZStepSink for TraceZSink {
    fn step_z(&mut self, dir: i32) {
        self.z_steps.push(dir);
    }
}

/// Records pilot-arc on/off transitions.
#[derive(Debug, Default)]
pub struct TraceTorchOutput {
    pub transitions: Vec<bool>,
}

impl TorchOutput for TraceTorchOutput {
    fn set_torch_on(&mut self, on: bool) {
        self.transitions.push(on);
        tracing::info!(torch_on = on, "torch output changed");
    }
}

/// A probe input that triggers after a configured number of Z steps have
/// been commanded — the host-replay equivalent of a Z-probe limit switch
/// closing once the torch touches the workpiece. `None` never triggers
/// (useful for a replay that never reaches the workpiece, which should end
/// the probe move at its full commanded distance instead).
pub struct ScriptedProbe {
    trigger_after_steps: Option<u32>,
    steps_seen: u32,
}

impl ScriptedProbe {
    pub fn new(trigger_after_steps: Option<u32>) -> Self {
        Self {
            trigger_after_steps,
            steps_seen: 0,
        }
    }

    pub fn set_trigger_after(&mut self, steps: Option<u32>) {
        self.trigger_after_steps = steps;
        self.steps_seen = 0;
    }
}

impl ProbeInput for ScriptedProbe {
    fn is_triggered(&mut self) -> bool {
        self.steps_seen += 1;
        self.trigger_after_steps == Some(self.steps_seen)
    }
}

/// An arc-voltage source that always reports a fixed raw ADC reading, unless
/// the replay script overrides it (simulating a plate-voltage change mid-cut
/// to exercise ATHC).
pub struct ScriptedArcVoltage {
    raw: u16,
}

impl ScriptedArcVoltage {
    pub fn new(raw: u16) -> Self {
        Self { raw }
    }

    pub fn set_raw(&mut self, raw: u16) {
        self.raw = raw;
    }
}

impl ArcVoltageSource for ScriptedArcVoltage {
    fn read_raw(&mut self) -> u16 {
        self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_clock_advances_in_lockstep() {
        let mut clock = VirtualClock::new();
        for _ in 0..5 {
            clock.advance_one_tick();
        }
        assert_eq!(clock.millis(), 5);
        assert_eq!(clock.micros(), 5000);
    }

    #[test]
    fn scripted_probe_triggers_on_the_configured_step() {
        let mut probe = ScriptedProbe::new(Some(3));
        assert!(!probe.is_triggered());
        assert!(!probe.is_triggered());
        assert!(probe.is_triggered());
        assert!(!probe.is_triggered());
    }

    #[test]
    fn scripted_probe_never_triggers_when_unset() {
        let mut probe = ScriptedProbe::new(None);
        for _ in 0..100 {
            assert!(!probe.is_triggered());
        }
    }
}
