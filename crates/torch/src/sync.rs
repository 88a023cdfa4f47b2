//! Motion Sync: the scripted Z/torch sequences that run between X/Y moves —
//! probe-and-pierce at the start of a cut, torch-off-and-retract at the end.
//!
//! The original firmware wired these up as a chain of free functions passed
//! to `TorchControl::move_z_incremental`/`wait_until` as raw function
//! pointers, one case/callback slot at a time (`MotionSyncCallbacks.cpp`).
//! Here each chain is data: a fixed array of [`SyncStep`]s that
//! [`crate::controller::TorchController::move_tick`] interprets one step at
//! a time. This removes the single-callback-slot limitation the original
//! had (no two sequences could ever be "in flight" in different stages) and
//! makes cancellation trivial — clearing the step list is enough, there is
//! no function pointer to un-register.

/// Maximum steps in any scripted sequence this crate knows how to build.
/// The longest is [`SyncSequence::pierce`] at 6 steps.
pub const MAX_SEQUENCE_STEPS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncStep {
    /// Move towards the workpiece until the probe triggers or `distance` is
    /// exhausted, whichever comes first.
    Probe { distance: f64, feed: f64 },
    /// An ordinary incremental Z move that always runs to completion.
    MoveZ { distance: f64, feed: f64 },
    /// Engage the pilot arc.
    Fire,
    /// Extinguish the pilot arc.
    TorchOff,
    /// Wait `millis` milliseconds before advancing.
    DwellMs(u32),
    /// The sequence is complete; the owning planner should be released.
    Finish,
}

/// Parameters carried into a sequence from the command that triggered it —
/// the per-cut geometry the original firmware kept in a single global
/// `CallbackData callback`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CallbackData {
    pub pierce_height: f64,
    pub pierce_delay_secs: f64,
    pub clearance_height: f64,
    /// Height above the plate to settle at once piercing completes and the
    /// cut itself begins. Added to fix the original's
    /// `pierceHeight - pierceHeight` (always-zero) `move_to_cut_height`
    /// bug: the intended move is `pierce_height - cut_height`.
    pub cut_height: f64,
}

/// Z-axis feed rates and mechanical takeup, mirroring the original's
/// `MotionSyncConfig` global.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncConfig {
    pub z_rapid_feed: f64,
    pub z_probe_feed: f64,
    pub floating_head_takeup: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            z_rapid_feed: 2.0,
            z_probe_feed: 1.5,
            floating_head_takeup: 0.2,
        }
    }
}

/// A fixed-capacity, owned sequence of [`SyncStep`]s plus a cursor.
#[derive(Debug, Clone, Copy)]
pub struct SyncSequence {
    steps: [SyncStep; MAX_SEQUENCE_STEPS],
    len: usize,
    cursor: usize,
}

impl SyncSequence {
    fn from_steps(steps: &[SyncStep]) -> Self {
        let mut buf = [SyncStep::Finish; MAX_SEQUENCE_STEPS];
        for (slot, step) in buf.iter_mut().zip(steps.iter()) {
            *slot = *step;
        }
        Self {
            steps: buf,
            len: steps.len(),
            cursor: 0,
        }
    }

    /// `probe_torch → retract_torch → light_torch_and_pierce_delay →
    /// move_to_cut_height → resume_motion`: the full pierce-and-cut chain.
    pub fn pierce(data: CallbackData, config: SyncConfig) -> Self {
        Self::from_steps(&[
            SyncStep::Probe { distance: -10.0, feed: config.z_probe_feed },
            SyncStep::MoveZ {
                distance: config.floating_head_takeup + data.pierce_height,
                feed: config.z_rapid_feed,
            },
            SyncStep::Fire,
            SyncStep::DwellMs((data.pierce_delay_secs * 1000.0) as u32),
            SyncStep::MoveZ {
                distance: data.pierce_height - data.cut_height,
                feed: config.z_rapid_feed,
            },
            SyncStep::Finish,
        ])
    }

    /// `probe_torch_and_finish → retract_torch_and_finish → resume_motion`:
    /// probe-only, used when a standalone "find workpiece height" command
    /// is the entire operation and no pierce/cut follows.
    pub fn probe_only(data: CallbackData, config: SyncConfig) -> Self {
        Self::from_steps(&[
            SyncStep::Probe { distance: -10.0, feed: config.z_probe_feed },
            SyncStep::MoveZ {
                distance: config.floating_head_takeup + data.pierce_height,
                feed: config.z_rapid_feed,
            },
            SyncStep::Finish,
        ])
    }

    /// `torch_off_and_retract → post_delay → resume_motion`: run at the end
    /// of a cut to lift the torch clear and let the arc fully extinguish
    /// before the next X/Y move starts.
    pub fn end_of_cut(data: CallbackData, config: SyncConfig) -> Self {
        Self::from_steps(&[
            SyncStep::TorchOff,
            SyncStep::MoveZ { distance: data.clearance_height, feed: config.z_rapid_feed },
            SyncStep::DwellMs(1000),
            SyncStep::Finish,
        ])
    }

    pub fn current(&self) -> Option<SyncStep> {
        self.steps.get(self.cursor).copied()
    }

    pub fn advance(&mut self) {
        if self.cursor < self.len {
            self.cursor += 1;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.len || matches!(self.current(), Some(SyncStep::Finish) | None)
    }
}
