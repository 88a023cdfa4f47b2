//! Coordinates the motion planner and torch controller into a single
//! per-tick step, owning the Motion Sync hand-off between them: when the
//! planner reports a cut move has started or finished, the engine starts the
//! matching scripted sequence on the torch controller and gates/ungates the
//! planner's `motion_tick` around it.
//!
//! Lock order is always planner-then-torch, matching spec.md §5's
//! description of the original's `noInterrupts()/interrupts()` bracket
//! around the shared move queue — here expressed as two `parking_lot`
//! mutexes taken in a fixed order instead of a global interrupt mask.

use std::collections::VecDeque;

use parking_lot::Mutex;

use motion::{Clock, MotionPlanner, MoveType, StepSink, Vector3F};
use torch::collab::{ArcVoltageSource, ProbeInput, TorchOutput, ZStepSink};
use torch::controller::{SyncOutcome, TorchController};
use torch::sync::{CallbackData, SyncSequence};

use crate::config::RuntimeConfig;
use crate::errors::RuntimeError;

/// Owns a [`MotionPlanner`] and a [`TorchController`] and runs them as one
/// coordinated unit. `MOVE_CAP` bounds the move queue; `ADC_CAP` bounds the
/// ATHC averaging window, same as the two crates' own const generics.
pub struct Engine<const MOVE_CAP: usize, const ADC_CAP: usize> {
    planner: Mutex<MotionPlanner<MOVE_CAP>>,
    torch: Mutex<TorchController<ADC_CAP>>,
    sync_config: torch::sync::SyncConfig,
    /// Pierce/cut geometry for each LINE move not yet loaded as current,
    /// pushed 1:1 alongside `push_line`. `Move` itself carries no pierce
    /// metadata (by design — it is pure Bresenham/ramp state), so this is
    /// the side channel that reunites a cut move with its geometry once the
    /// planner reports it has become current.
    cut_queue: Mutex<VecDeque<CallbackData>>,
    /// Geometry of whichever cut move is currently loaded (or just finished,
    /// until its end-of-cut sequence has been dispatched).
    active_cut_data: Mutex<Option<CallbackData>>,
    /// Set when an end-of-cut and a pierce need to run back to back because
    /// two LINE moves are adjacent with no intervening RAPID — the planner's
    /// sync gate stays held across both sequences rather than being released
    /// in between, matching the pierce contract of firing once per cut move.
    chained_pierce: Mutex<Option<CallbackData>>,
}

impl<const MOVE_CAP: usize, const ADC_CAP: usize> Engine<MOVE_CAP, ADC_CAP> {
    pub fn new(config: &RuntimeConfig) -> Self {
        let mut torch = TorchController::new(config.torch);
        torch.set_thc_filter(config.thc_num_readings);
        Self {
            planner: Mutex::new(MotionPlanner::new(config.planner)),
            torch: Mutex::new(torch),
            sync_config: config.sync,
            cut_queue: Mutex::new(VecDeque::new()),
            active_cut_data: Mutex::new(None),
            chained_pierce: Mutex::new(None),
        }
    }

    pub fn push_rapid(&self, target: Vector3F) -> Result<(), RuntimeError> {
        if !self.planner.lock().push_target(target, MoveType::Rapid) {
            return Err(RuntimeError::QueueFull);
        }
        Ok(())
    }

    pub fn push_line(&self, target: Vector3F, data: CallbackData) -> Result<(), RuntimeError> {
        if !self.planner.lock().push_target(target, MoveType::Line) {
            return Err(RuntimeError::QueueFull);
        }
        self.cut_queue.lock().push_back(data);
        Ok(())
    }

    pub fn feedhold(&self) {
        self.planner.lock().feedhold();
    }

    pub fn run(&self) {
        self.planner.lock().run();
    }

    pub fn soft_abort(&self) {
        self.planner.lock().soft_abort();
    }

    pub fn abort(&self) {
        self.planner.lock().abort();
        self.torch.lock().cancel();
        self.cut_queue.lock().clear();
        *self.active_cut_data.lock() = None;
        *self.chained_pierce.lock() = None;
    }

    pub fn current_position(&self) -> Vector3F {
        self.planner.lock().get_current_position()
    }

    pub fn torch_state(&self) -> bool {
        self.torch.lock().get_torch_state()
    }

    pub fn is_idle(&self) -> bool {
        let planner = self.planner.lock();
        let torch = self.torch.lock();
        !planner.is_in_motion() && planner.queue_len() == 0 && !torch.is_running_sequence() && !torch.is_in_motion()
    }

    /// Whether a cut-start/cut-end event currently has X/Y motion gated
    /// while a scripted Z sequence runs.
    pub fn is_awaiting_sync(&self) -> bool {
        self.planner.lock().is_awaiting_sync()
    }

    /// Runs one coordinated tick: advances X/Y motion, handles any
    /// cut-start/cut-end event the planner just raised, and advances the
    /// torch controller's ATHC sampling and any in-flight scripted sequence.
    pub fn tick<C, S, Z, P, T, A>(
        &self,
        clock: &C,
        step_sink: &mut S,
        z_sink: &mut Z,
        probe: &mut P,
        torch_out: &mut T,
        arc_source: &mut A,
    ) -> Result<(), RuntimeError>
    where
        C: Clock,
        S: StepSink,
        Z: ZStepSink,
        P: ProbeInput,
        T: TorchOutput,
        A: ArcVoltageSource,
    {
        let mut planner = self.planner.lock();
        planner.motion_tick(clock, step_sink);
        let cut_end = planner.take_pending_cut_end();
        let cut_start = planner.take_pending_cut_start();

        if cut_end || cut_start {
            let end_data = if cut_end { self.active_cut_data.lock().take() } else { None };
            let start_data = if cut_start { self.cut_queue.lock().pop_front() } else { None };
            if cut_start {
                *self.active_cut_data.lock() = start_data;
            }

            planner.begin_sync();
            let mut torch = self.torch.lock();
            match (cut_end, cut_start) {
                (true, true) => {
                    *self.chained_pierce.lock() = start_data;
                    torch.start_sequence(
                        SyncSequence::end_of_cut(end_data.unwrap_or_default(), self.sync_config),
                        clock,
                        torch_out,
                    )?;
                }
                (true, false) => {
                    torch.start_sequence(
                        SyncSequence::end_of_cut(end_data.unwrap_or_default(), self.sync_config),
                        clock,
                        torch_out,
                    )?;
                }
                (false, true) => {
                    torch.start_sequence(
                        SyncSequence::pierce(start_data.unwrap_or_default(), self.sync_config),
                        clock,
                        torch_out,
                    )?;
                }
                (false, false) => unreachable!("guarded by the outer if"),
            }
        }
        let xy_speed = planner.current_speed();
        drop(planner);

        let mut torch = self.torch.lock();
        torch.tick(xy_speed, arc_source);
        let outcome = torch.move_tick(clock, z_sink, probe, torch_out);
        if outcome == SyncOutcome::Finished {
            if let Some(pierce_data) = self.chained_pierce.lock().take() {
                torch.start_sequence(SyncSequence::pierce(pierce_data, self.sync_config), clock, torch_out)?;
            } else {
                drop(torch);
                self.planner.lock().sync_finished();
            }
        }

        Ok(())
    }
}
