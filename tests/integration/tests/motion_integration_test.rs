//! End-to-end coverage of the motion planner and torch controller working
//! together the way the `runtime` crate's `Engine` wires them: a rapid move
//! into a cut, the cut-start event gating the planner while a pierce
//! sequence runs on the Z axis, then the cut-end event gating it again for
//! the retract sequence before the next move resumes.

use std::cell::Cell;

use motion::{Clock as MotionClock, MotionPlanner, MoveType, PlannerConfig, StepSink, Vector3F};
use torch::collab::{ArcVoltageSource, ProbeInput, TorchOutput, ZStepSink};
use torch::controller::{SyncOutcome, TorchConfig, TorchController};
use torch::sync::{CallbackData, SyncConfig, SyncSequence};

struct SharedClock {
    millis: Cell<u32>,
    micros: Cell<u32>,
}

impl SharedClock {
    fn new() -> Self {
        Self { millis: Cell::new(0), micros: Cell::new(0) }
    }
    fn advance(&self, ms: u32) {
        self.millis.set(self.millis.get().wrapping_add(ms));
        self.micros.set(self.micros.get().wrapping_add(ms * 1000));
    }
}

impl MotionClock for SharedClock {
    fn millis(&self) -> u32 {
        self.millis.get()
    }
    fn micros(&self) -> u32 {
        self.micros.get()
    }
}

#[derive(Default)]
struct RecordingXySink {
    x: Vec<i32>,
    y: Vec<i32>,
}
impl StepSink for RecordingXySink {
    fn step_x(&mut self, dir: i32) {
        self.x.push(dir);
    }
    fn step_y(&mut self, dir: i32) {
        self.y.push(dir);
    }
}

#[derive(Default)]
struct RecordingZSink {
    z: Vec<i32>,
}
impl ZStepSink for RecordingZSink {
    fn step_z(&mut self, dir: i32) {
        self.z.push(dir);
    }
}

struct NeverProbe;
impl ProbeInput for NeverProbe {
    fn is_triggered(&mut self) -> bool {
        false
    }
}

struct ZeroAdc;
impl ArcVoltageSource for ZeroAdc {
    fn read_raw(&mut self) -> u16 {
        0
    }
}

#[derive(Default)]
struct RecordingTorchOutput {
    states: Vec<bool>,
}
impl TorchOutput for RecordingTorchOutput {
    fn set_torch_on(&mut self, on: bool) {
        self.states.push(on);
    }
}

#[test]
fn a_rapid_into_a_cut_gates_xy_motion_for_the_full_pierce_sequence() {
    let mut planner: MotionPlanner<8> = MotionPlanner::new(PlannerConfig::default());
    let mut torch: TorchController<64> = TorchController::new(TorchConfig::default());

    planner.push_target(Vector3F::new(1.0, 0.0, 600.0), MoveType::Rapid);
    planner.push_target(Vector3F::new(3.0, 0.0, 120.0), MoveType::Line);

    let clock = SharedClock::new();
    let mut xy = RecordingXySink::default();
    let mut z = RecordingZSink::default();
    let mut probe = NeverProbe;
    let mut adc = ZeroAdc;
    let mut torch_out = RecordingTorchOutput::default();

    let pierce_data = CallbackData {
        pierce_height: 0.1,
        pierce_delay_secs: 0.01,
        clearance_height: 1.0,
        cut_height: 0.02,
    };
    let sync_config = SyncConfig::default();

    let mut sequence_started = false;
    let mut xy_steps_while_gated = 0usize;

    for _ in 0..2_000_000 {
        clock.advance(1);
        planner.motion_tick(&clock, &mut xy);

        if planner.take_pending_cut_start() {
            assert!(!sequence_started, "cut-start should only fire once for this move");
            sequence_started = true;
            planner.begin_sync();
            torch
                .start_sequence(SyncSequence::pierce(pierce_data, sync_config), &clock, &mut torch_out)
                .expect("no sequence should be running yet");
        }

        if planner.is_awaiting_sync() {
            xy_steps_while_gated += xy.x.len() + xy.y.len();
            torch.tick(planner.current_speed(), &mut adc);
            let outcome = torch.move_tick(&clock, &mut z, &mut probe, &mut torch_out);
            if outcome == SyncOutcome::Finished {
                planner.sync_finished();
            }
        }

        if !planner.is_in_motion() && planner.queue_len() == 0 && !torch.is_running_sequence() {
            break;
        }
    }

    assert!(sequence_started, "the LINE move should have triggered a pierce sequence");
    assert!(torch_out.states.contains(&true), "the pierce sequence should have fired the torch");
    assert!(!z.z.is_empty(), "the pierce sequence should have moved the Z axis");
    assert_eq!(xy_steps_while_gated, 0, "X/Y must not move while the Z sequence owns the machine");
    assert!(!planner.is_awaiting_sync());
    assert!(!torch.is_running_sequence());
}

#[test]
fn end_of_cut_retracts_and_extinguishes_before_the_next_move_is_released() {
    let mut planner: MotionPlanner<8> = MotionPlanner::new(PlannerConfig::default());
    let mut torch: TorchController<64> = TorchController::new(TorchConfig::default());

    planner.push_target(Vector3F::new(1.0, 0.0, 120.0), MoveType::Line);
    planner.push_target(Vector3F::new(2.0, 0.0, 600.0), MoveType::Rapid);

    let clock = SharedClock::new();
    let mut xy = RecordingXySink::default();
    let mut z = RecordingZSink::default();
    let mut probe = NeverProbe;
    let mut adc = ZeroAdc;
    let mut torch_out = RecordingTorchOutput::default();
    let sync_config = SyncConfig::default();

    let mut cut_end_fired = false;

    for _ in 0..2_000_000 {
        clock.advance(1);
        planner.motion_tick(&clock, &mut xy);

        if planner.take_pending_cut_start() {
            planner.begin_sync();
            torch
                .start_sequence(SyncSequence::pierce(CallbackData::default(), sync_config), &clock, &mut torch_out)
                .unwrap();
        }
        if planner.take_pending_cut_end() {
            cut_end_fired = true;
            planner.begin_sync();
            torch
                .start_sequence(SyncSequence::end_of_cut(CallbackData::default(), sync_config), &clock, &mut torch_out)
                .unwrap();
        }

        if planner.is_awaiting_sync() {
            torch.tick(planner.current_speed(), &mut adc);
            let outcome = torch.move_tick(&clock, &mut z, &mut probe, &mut torch_out);
            if outcome == SyncOutcome::Finished {
                planner.sync_finished();
            }
        }

        if !planner.is_in_motion() && planner.queue_len() == 0 && !torch.is_running_sequence() {
            break;
        }
    }

    assert!(cut_end_fired, "finishing the LINE move should have triggered the end-of-cut sequence");
    assert_eq!(torch_out.states.last(), Some(&false), "end-of-cut must leave the torch extinguished");
    assert!(!planner.is_awaiting_sync());
    assert_eq!(planner.queue_len(), 0);
}
