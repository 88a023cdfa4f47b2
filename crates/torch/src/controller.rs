//! Torch Controller: Z-axis incremental stepper, arc-voltage averaging
//! (ATHC), and the scripted-sequence interpreter that drives probe/pierce/
//! retract chains defined in [`crate::sync`].
//!
//! Like `motion::MotionPlanner`, this type owns no hardware or clock of its
//! own — [`TorchController::move_tick`] is called periodically by the host
//! (the `runtime` crate), passing in the collaborators it needs for that
//! tick. There is no Bresenham state here: the Z axis is a single stepper,
//! stepped at a constant cadence derived from the commanded feedrate.

use crate::collab::{ArcVoltageSource, Clock, ProbeInput, TorchOutput, ZStepSink};
use crate::sync::SyncSequence;
use thermal::{Filter, RuntimeMovingAverage};

/// Outcome of a [`TorchController::move_tick`] call, for the caller to
/// decide whether to release the motion planner's sync gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No sequence is active.
    Idle,
    /// A sequence is active and still running.
    Running,
    /// A sequence just completed on this tick; the caller should call
    /// `MotionPlanner::sync_finished()`.
    Finished,
}

/// ATHC and Z-axis configuration, mirroring the original firmware's
/// `THC_Data` fields (minus the ADC ring itself, which lives in
/// `arc_voltage_avg`).
#[derive(Debug, Clone, Copy)]
pub struct TorchConfig {
    /// Target arc voltage, on the 0-100 calibrated scale.
    pub set_voltage: f64,
    /// Deadband, in the same units as `set_voltage`: no Z nudge is issued
    /// while the measured voltage is within this band of the target.
    pub voltage_tolerance: f64,
    /// Z nudge feedrate, in units/sec, used while ATHC is correcting height.
    pub comp_velocity: f64,
    /// Whether the ATHC nudge loop is active at all.
    pub enabled: bool,
    /// Which analog input ATHC reads, for diagnostics; pin selection itself
    /// is the host's responsibility via `ArcVoltageSource`.
    pub thc_pin: i32,
    pub adc_at_zero: i32,
    pub adc_at_one_hundred: i32,
    /// Steps per user unit on the Z axis.
    pub step_scale: f64,
    pub invert_dir: bool,
}

impl Default for TorchConfig {
    fn default() -> Self {
        Self {
            set_voltage: 0.0,
            voltage_tolerance: 1.0,
            comp_velocity: 0.0,
            enabled: false,
            thc_pin: 0,
            adc_at_zero: 0,
            adc_at_one_hundred: 1023,
            step_scale: 518.0,
            invert_dir: false,
        }
    }
}

/// The torch controller: `ADC_CAP` bounds the arc-voltage averaging ring
/// (the original's `MAX_NUMBER_OF_READINGS = 20000`, sized down here to
/// whatever a concrete host actually needs — see `set_thc_filter`).
pub struct TorchController<const ADC_CAP: usize> {
    config: TorchConfig,
    arc_voltage_avg: RuntimeMovingAverage<f64, ADC_CAP>,
    torch_on: bool,
    current_position: i64,
    target_position: i64,
    step_dir: i32,
    steps_to_go: i64,
    /// True while the in-flight move is a probe move (completes early on a
    /// probe hit, not just on reaching its commanded distance).
    probing: bool,
    running: bool,
    feedrate_delay_us: u32,
    feedrate_timestamp_us: u32,
    wait_until_ms: Option<u32>,
    active_sequence: Option<SyncSequence>,
}

impl<const ADC_CAP: usize> TorchController<ADC_CAP> {
    pub fn new(config: TorchConfig) -> Self {
        let filter_window = ADC_CAP.min(20_000).max(1);
        Self {
            config,
            arc_voltage_avg: RuntimeMovingAverage::new(filter_window),
            torch_on: false,
            current_position: 0,
            target_position: 0,
            step_dir: 1,
            steps_to_go: 0,
            probing: false,
            running: false,
            feedrate_delay_us: u32::MAX,
            feedrate_timestamp_us: 0,
            wait_until_ms: None,
            active_sequence: None,
        }
    }

    /// Resets all controller state. Hardware setup (pin modes, ADC
    /// configuration) is the host's responsibility.
    pub fn init(&mut self) {
        self.torch_on = false;
        self.current_position = 0;
        self.target_position = 0;
        self.steps_to_go = 0;
        self.probing = false;
        self.running = false;
        self.feedrate_delay_us = u32::MAX;
        self.feedrate_timestamp_us = 0;
        self.wait_until_ms = None;
        self.active_sequence = None;
    }

    pub fn get_torch_state(&self) -> bool {
        self.torch_on
    }

    pub fn is_in_motion(&self) -> bool {
        self.running
    }

    pub fn is_running_sequence(&self) -> bool {
        self.active_sequence.is_some()
    }

    pub fn current_position(&self) -> i64 {
        self.current_position
    }

    /// Engages the pilot arc.
    pub fn fire_torch(&mut self, output: &mut impl TorchOutput) {
        self.torch_on = true;
        output.set_torch_on(true);
        tracing::info!("torch fired");
    }

    /// Extinguishes the pilot arc.
    pub fn extinguish_torch(&mut self, output: &mut impl TorchOutput) {
        self.torch_on = false;
        output.set_torch_on(false);
        tracing::info!("torch extinguished");
    }

    /// The current measured, calibration-scaled arc voltage (0-100 scale).
    pub fn get_arc_voltage(&self) -> f64 {
        map_range(
            self.arc_voltage_avg.output(),
            self.config.adc_at_zero as f64,
            self.config.adc_at_one_hundred as f64,
            0.0,
            100.0,
        )
    }

    pub fn get_set_voltage(&self) -> f64 {
        self.config.set_voltage
    }

    pub fn set_arc_voltage(&mut self, volts: f64) {
        self.config.set_voltage = volts;
    }

    pub fn set_thc_pin(&mut self, pin: i32) {
        self.config.thc_pin = pin;
    }

    /// Sets the ATHC averaging window, clamped to `ADC_CAP`.
    pub fn set_thc_filter(&mut self, num_readings: usize) {
        self.arc_voltage_avg.set_window(num_readings);
    }

    pub fn set_thc_velocity(&mut self, vel: f64) {
        self.config.comp_velocity = vel;
    }

    pub fn set_thc_adc_calibration(&mut self, zero: i32, one_hundred: i32) -> Result<(), crate::errors::TorchError> {
        if zero == one_hundred {
            return Err(crate::errors::TorchError::InvalidAdcCalibration);
        }
        self.config.adc_at_zero = zero;
        self.config.adc_at_one_hundred = one_hundred;
        Ok(())
    }

    /// Only axis `2` (Z) is honored, matching the original's `set_axis_scale`
    /// contract of ignoring any other axis index so the call can share a
    /// signature with the X/Y planner's own scale setter.
    pub fn set_axis_scale(&mut self, axis: i32, value: f64) {
        if axis == 2 {
            self.config.step_scale = value;
        }
    }

    pub fn invert_joint_dir(&mut self, axis: i32, value: i32) {
        if axis == 2 {
            self.config.invert_dir = value != 0;
        }
    }

    /// Cancels any in-flight move or scripted sequence immediately.
    pub fn cancel(&mut self) {
        self.active_sequence = None;
        self.running = false;
        self.probing = false;
        self.wait_until_ms = None;
    }

    /// Starts a direct, non-blocking incremental Z move (outside of any
    /// scripted sequence).
    pub fn move_z_incremental(&mut self, distance: f64, feedrate: f64) {
        self.start_step_move(distance, feedrate, false);
    }

    /// Schedules a callback-free wait: the next `move_tick` call at or past
    /// `timestamp_ms` advances whatever sequence is active.
    pub fn wait_until(&mut self, timestamp_ms: u32) {
        self.wait_until_ms = Some(timestamp_ms);
    }

    /// Starts a scripted sequence (see [`crate::sync::SyncSequence`]).
    /// Returns an error if one is already running.
    pub fn start_sequence<C: Clock, T: TorchOutput>(
        &mut self,
        sequence: SyncSequence,
        clock: &C,
        torch_out: &mut T,
    ) -> Result<(), crate::errors::TorchError> {
        if self.active_sequence.is_some() {
            return Err(crate::errors::TorchError::SequenceAlreadyRunning);
        }
        self.active_sequence = Some(sequence);
        self.dispatch_current_step(clock, torch_out);
        Ok(())
    }

    /// ATHC sample-and-correct pass. Always samples the arc voltage into the
    /// running average; issues a one-step Z nudge towards the target
    /// voltage when enabled, the machine is moving faster than
    /// `comp_velocity`, the torch is lit, no scripted sequence owns the Z
    /// axis, and the measured voltage sits outside tolerance.
    ///
    /// `xy_velocity` is the planner's current X/Y speed, in the same
    /// units/sec scale as `comp_velocity` — the host coordinator samples it
    /// from the motion planner each tick and passes it in here.
    ///
    /// The closed-loop gains (how aggressively to correct) are out of scope
    /// here; this only implements the nudge *trigger*, one step at a time.
    pub fn tick<S: ArcVoltageSource>(&mut self, xy_velocity: f64, source: &mut S) {
        let raw = source.read_raw();
        self.arc_voltage_avg.add_sample(raw as f64);

        if !self.config.enabled
            || !self.torch_on
            || self.active_sequence.is_some()
            || self.running
            || xy_velocity <= self.config.comp_velocity
        {
            return;
        }

        let error = self.get_arc_voltage() - self.config.set_voltage;
        if error.abs() <= self.config.voltage_tolerance {
            return;
        }

        let one_step = 1.0 / self.config.step_scale;
        let distance = if error > 0.0 { one_step } else { -one_step };
        self.start_step_move(distance, self.config.comp_velocity, false);
    }

    /// The periodic Z-axis tick: advances an in-flight move or a waiting
    /// timer, and interprets the active scripted sequence.
    pub fn move_tick<C: Clock, Z: ZStepSink, P: ProbeInput, T: TorchOutput>(
        &mut self,
        clock: &C,
        z: &mut Z,
        probe: &mut P,
        torch_out: &mut T,
    ) -> SyncOutcome {
        if self.running {
            if clock.micros().wrapping_sub(self.feedrate_timestamp_us) > self.feedrate_delay_us {
                self.step_once(z);
                self.feedrate_timestamp_us = clock.micros();
            }
            if self.probing && probe.is_triggered() {
                self.running = false;
                self.steps_to_go = 0;
            }
            if !self.running {
                if let Some(seq) = &mut self.active_sequence {
                    seq.advance();
                }
                self.dispatch_current_step(clock, torch_out);
            }
        } else if let Some(until) = self.wait_until_ms {
            if (clock.millis().wrapping_sub(until) as i32) >= 0 {
                self.wait_until_ms = None;
                if let Some(seq) = &mut self.active_sequence {
                    seq.advance();
                }
                self.dispatch_current_step(clock, torch_out);
            }
        }

        match &self.active_sequence {
            Some(seq) if seq.is_finished() => {
                self.active_sequence = None;
                SyncOutcome::Finished
            }
            Some(_) => SyncOutcome::Running,
            None => SyncOutcome::Idle,
        }
    }

    pub fn dump_move(&self) {
        tracing::debug!(
            current_position = self.current_position,
            target_position = self.target_position,
            steps_to_go = self.steps_to_go,
            running = self.running,
            "torch move state"
        );
    }

    // --- internal ---

    fn start_step_move(&mut self, distance: f64, feedrate: f64, probing: bool) {
        let target_steps = (distance * self.config.step_scale).round() as i64;
        self.step_dir = if target_steps >= 0 { 1 } else { -1 };
        self.steps_to_go = target_steps.abs();
        self.target_position = self.current_position + target_steps;
        self.probing = probing;
        self.running = self.steps_to_go > 0;
        self.feedrate_delay_us = cycle_frequency_from_feedrate(feedrate.abs(), self.config.step_scale);
    }

    fn step_once<Z: ZStepSink>(&mut self, z: &mut Z) {
        if self.steps_to_go <= 0 {
            self.running = false;
            return;
        }
        let dir = if self.config.invert_dir { -self.step_dir } else { self.step_dir };
        z.step_z(dir);
        self.current_position += self.step_dir as i64;
        self.steps_to_go -= 1;
        if self.steps_to_go == 0 {
            self.running = false;
        }
    }

    /// Dispatches steps that complete instantly (`Fire`/`TorchOff`) in a
    /// loop, stopping at the first step that needs ticking (a move or a
    /// dwell) or at `Finish`.
    fn dispatch_current_step<C: Clock, T: TorchOutput>(&mut self, clock: &C, torch_out: &mut T) {
        use crate::sync::SyncStep;
        loop {
            let current = match &self.active_sequence {
                Some(seq) => seq.current(),
                None => return,
            };
            match current {
                Some(SyncStep::Probe { distance, feed }) => {
                    self.start_step_move(distance, feed, true);
                    return;
                }
                Some(SyncStep::MoveZ { distance, feed }) => {
                    self.start_step_move(distance, feed, false);
                    return;
                }
                Some(SyncStep::Fire) => {
                    self.torch_on = true;
                    torch_out.set_torch_on(true);
                    tracing::info!("(light_torch_and_pierce_delay)");
                }
                Some(SyncStep::TorchOff) => {
                    self.torch_on = false;
                    torch_out.set_torch_on(false);
                    tracing::info!("(torch_off_and_retract)");
                }
                Some(SyncStep::DwellMs(ms)) => {
                    self.wait_until_ms = Some(clock.millis().wrapping_add(ms));
                    return;
                }
                Some(SyncStep::Finish) | None => return,
            }
            if let Some(seq) = &mut self.active_sequence {
                seq.advance();
            }
        }
    }
}

fn cycle_frequency_from_feedrate(feedrate: f64, step_scale: f64) -> u32 {
    let steps_per_sec = feedrate * step_scale;
    if steps_per_sec <= 0.0 {
        return u32::MAX;
    }
    (1_000_000.0 / steps_per_sec).max(1.0) as u32
}

fn map_range(x: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    if (in_max - in_min).abs() < 1e-9 {
        return out_min;
    }
    (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}
