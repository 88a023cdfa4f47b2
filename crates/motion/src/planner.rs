//! # Motion Planner
//!
//! Owns the move queue, the current move, the Bresenham stepping state, and
//! the trapezoidal ramp state, and is driven entirely by periodic calls to
//! [`MotionPlanner::motion_tick`] — there is no internal thread or timer
//! here, by design: the caller (the `runtime` crate, standing in for the
//! original firmware's 1kHz interval timer) owns the clock and whatever
//! mutual exclusion makes concurrent `push_target`/`motion_tick` calls safe.
//!
//! `motion_tick` runs two sub-loops gated by their own timestamps, in this
//! order: the **ramp sampler** (recomputes the commanded feedrate from the
//! move's ramp markers, at `feed_ramp_update_interval_ms` cadence) and the
//! **step emitter** (advances the Bresenham state by one step event, at the
//! per-move `feedrate_delay_us` cadence). Both run off a single external
//! tick; there are no separate hardware timers backing them.

use crate::collab::{Clock, StepSink};
use crate::geometry::{Vector2F, Vector2I, Vector3F};
use crate::queue::MoveQueue;
use crate::ramp;

/// Fixed-point scale `target_f_scaled` is stored at internally. Feedrates
/// are converted to user-units/sec and multiplied by this scale the moment
/// a move is pushed, matching the original firmware's `FEED_VALUE_SCALE`
/// fixed-point convention.
pub const FEED_VALUE_SCALE: f64 = 1000.0;

/// How many adjacent-pair junctions the continuous-motion pass walks each
/// time a new current move is loaded. Bounds the pass to O(1) work per tick
/// transition rather than rescanning an unbounded queue (the "up to some
/// depth" left open at the spec level).
const CONTINUOUS_MOTION_DEPTH: usize = 8;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum MoveType {
    #[default]
    Rapid,
    Line,
}

/// A planned move: a target position, a peak feedrate, and the ramp markers
/// computed for it at push time (and refined once by the continuous-motion
/// pass once it becomes second-from-current, or first-from-current on load).
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Move {
    /// Absolute target position, in steps.
    pub target: Vector2I,
    /// Peak commanded feedrate, in user-units/sec, scaled by [`FEED_VALUE_SCALE`].
    pub target_f_scaled: i64,
    pub move_type: MoveType,
    /// Distance (user units) from the move's start over which the ramp
    /// accelerates from `min_feed_rate` (or `entry_velocity`) to peak.
    pub accel_marker: f64,
    /// Distance (user units) to the move's end over which the ramp
    /// decelerates from peak to `min_feed_rate` (or to `exit_velocity`).
    pub deccel_marker: f64,
    pub entry_velocity: f64,
    pub exit_velocity: f64,
    /// Distance-into-move at which a feed-hold deceleration ramp began;
    /// zero when no hold has occurred on this move.
    pub feedhold_marker: f64,
}

impl Move {
    /// The peak commanded feedrate in user-units/sec.
    pub fn target_feed_units_per_sec(&self) -> f64 {
        self.target_f_scaled as f64 / FEED_VALUE_SCALE
    }
}

/// Per-axis configuration the planner needs: step scale, jerk (minimum
/// commanded velocity), acceleration, plus the two timing constants from the
/// external configuration surface.
#[derive(Debug, Copy, Clone)]
pub struct PlannerConfig {
    /// Steps per user unit, X and Y.
    pub step_scale: Vector2F,
    /// Minimum entry/exit velocity per axis (user-units/sec).
    pub feed_jerk: Vector2F,
    /// Acceleration per axis (user-units/sec²).
    pub feed_accel: Vector2F,
    /// The minimum useful commanded velocity; motion below this clamps to a
    /// stop. Distinct from per-axis jerk, though scenarios commonly set it
    /// equal to the dominant axis's jerk.
    pub min_feed_rate: f64,
    /// Milliseconds between ramp-sampler passes.
    pub feed_ramp_update_interval_ms: u32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            step_scale: Vector2F::splat(518.0),
            feed_jerk: Vector2F::splat(0.05),
            feed_accel: Vector2F::new(7.0, 6.0),
            min_feed_rate: 0.05,
            feed_ramp_update_interval_ms: 20,
        }
    }
}

#[derive(Debug, Copy, Clone, Default)]
struct BresenhamState {
    dx: i64,
    dy: i64,
    sx: i32,
    sy: i32,
    err: i64,
    x_stg: i64,
    y_stg: i64,
}

/// The motion planner: move queue, current move, Bresenham stepping state,
/// and feed-hold/abort/sync flags. Kept as plain fields of one struct
/// (rather than a process-wide singleton) so a host can own several
/// independently, e.g. under test.
pub struct MotionPlanner<const CAP: usize> {
    config: PlannerConfig,
    queue: MoveQueue<CAP>,
    current_move: Move,
    current_position: Vector2I,
    target_position: Vector2I,
    bresenham: BresenhamState,
    current_velocity: Vector2F,
    running: bool,
    pending_feedhold: bool,
    feedhold_active: bool,
    pending_soft_abort: bool,
    /// Set by the caller while a Motion Sync sequence owns the Z axis; while
    /// true, `motion_tick` is a no-op (X/Y motion is gated).
    awaiting_sync: bool,
    /// Latched the tick a LINE move just finished (the dominant staging
    /// counter reached zero and the next move was loaded). Consumed by the
    /// host coordinator (the `runtime` crate) to trigger the
    /// torch-off-and-retract sequence before the next move is allowed to run.
    pending_cut_end: bool,
    /// Latched the tick a LINE move just became current. Consumed by the
    /// host coordinator to trigger the probe/pierce sequence; per the
    /// pierce-sequence contract this fires at the start of *every* cut move,
    /// not just the first segment of a contour.
    pending_cut_start: bool,
    feedrate_delay_us: u32,
    feed_sample_timestamp_ms: u32,
    feedrate_timestamp_us: u32,
}

impl<const CAP: usize> MotionPlanner<CAP> {
    pub fn new(config: PlannerConfig) -> Self {
        let min_feed = config.min_feed_rate;
        Self {
            config,
            queue: MoveQueue::new(),
            current_move: Move::default(),
            current_position: Vector2I::default(),
            target_position: Vector2I::default(),
            bresenham: BresenhamState::default(),
            current_velocity: Vector2F::default(),
            running: true,
            pending_feedhold: false,
            feedhold_active: false,
            pending_soft_abort: false,
            awaiting_sync: false,
            pending_cut_end: false,
            pending_cut_start: false,
            feedrate_delay_us: (1.0 / min_feed.max(1e-6) * 1_000_000.0) as u32,
            feed_sample_timestamp_ms: 0,
            feedrate_timestamp_us: 0,
        }
    }

    /// Resets all planner state (queue, position, flags). Matches the
    /// original `MotionPlanner::init()`'s state reset; installing the
    /// periodic tick itself is the caller's responsibility (see `runtime`),
    /// since this crate has no timer of its own.
    pub fn init(&mut self) {
        self.queue.clear();
        self.current_move = Move::default();
        self.current_position = Vector2I::default();
        self.target_position = Vector2I::default();
        self.bresenham = BresenhamState::default();
        self.current_velocity = Vector2F::default();
        self.running = true;
        self.pending_feedhold = false;
        self.feedhold_active = false;
        self.pending_soft_abort = false;
        self.awaiting_sync = false;
        self.pending_cut_end = false;
        self.pending_cut_start = false;
        self.feed_sample_timestamp_ms = 0;
        self.feedrate_timestamp_us = 0;
    }

    pub fn is_in_motion(&self) -> bool {
        self.running
    }

    pub fn is_awaiting_sync(&self) -> bool {
        self.awaiting_sync
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn queue_full(&self) -> bool {
        self.queue.full()
    }

    /// Converts a user-unit target into steps, derives the triangular/
    /// trapezoidal ramp markers, and enqueues the move. Returns `false` (and
    /// leaves all state unchanged) if the queue is full; the caller retries.
    pub fn push_target(&mut self, target: Vector3F, move_type: MoveType) -> bool {
        if self.queue.full() {
            return false;
        }

        let last = self.get_last_moves_target();
        let target_steps = Vector2I::new(
            (target.x * self.config.step_scale.x).round() as i64,
            (target.y * self.config.step_scale.y).round() as i64,
        );
        let target_feed_per_sec = target.f / 60.0;

        let dx = target.x - last.x;
        let dy = target.y - last.y;
        let (dominant_accel, dominant_dist) = if dy.abs() > dx.abs() {
            (self.config.feed_accel.y, dy.abs())
        } else {
            (self.config.feed_accel.x, dx.abs())
        };

        let mut peak_feedrate = ramp::feed_from_distance(dominant_accel, dominant_dist / 2.0);
        if peak_feedrate > target_feed_per_sec {
            peak_feedrate = target_feed_per_sec;
        }
        let marker = ramp::accel_marker(dominant_accel, self.config.min_feed_rate, peak_feedrate);

        let mv = Move {
            target: target_steps,
            target_f_scaled: (target_feed_per_sec * FEED_VALUE_SCALE).round() as i64,
            move_type,
            accel_marker: marker,
            deccel_marker: marker,
            entry_velocity: self.config.min_feed_rate,
            exit_velocity: self.config.min_feed_rate,
            feedhold_marker: 0.0,
        };

        let queue_was_empty = self.queue.is_empty();

        if !self.queue.push(mv) {
            return false;
        }

        if !self.running {
            self.set_feedrate(self.config.min_feed_rate);
        }
        if !self.feedhold_active {
            self.running = true;
        }
        // Only replan the junction pass when this push just gave the
        // current move a successor for the first time — appending to a
        // queue that already has one doesn't change current_move's own
        // adjacent pair and would otherwise re-touch it on every enqueue.
        if queue_was_empty {
            self.plan_continuous_motion();
        }
        true
    }

    /// The last-enqueued move's target, in user units (`f` in units/min); if
    /// the queue is empty, the current move's target. Used by the upstream
    /// command layer to accumulate incremental-mode moves against the most
    /// recently *planned* position, not the currently *executed* one.
    pub fn get_last_moves_target(&self) -> Vector3F {
        let m = self.queue.last().copied().unwrap_or(self.current_move);
        Vector3F {
            x: m.target.x as f64 / self.config.step_scale.x,
            y: m.target.y as f64 / self.config.step_scale.y,
            f: (m.target_f_scaled as f64 / FEED_VALUE_SCALE) * 60.0,
        }
    }

    /// The currently executed position, in user units; `f` is the magnitude
    /// of the current velocity, in units/min.
    pub fn get_current_position(&self) -> Vector3F {
        Vector3F {
            x: self.current_position.x as f64 / self.config.step_scale.x,
            y: self.current_position.y as f64 / self.config.step_scale.y,
            f: self.current_speed() * 60.0,
        }
    }

    /// The current X/Y speed, in user-units/sec (`current_velocity`'s native
    /// scale, unlike [`MotionPlanner::get_current_position`]'s `f` which is
    /// units/min). Used by the host coordinator to gate ATHC's "machine is
    /// moving faster than `comp_velocity`" trigger condition.
    pub fn current_speed(&self) -> f64 {
        (self.current_velocity.x.powi(2) + self.current_velocity.y.powi(2)).sqrt()
    }

    /// Requests a feed-hold. A no-op unless motion is currently running.
    pub fn feedhold(&mut self) {
        if self.running {
            self.pending_feedhold = true;
        }
    }

    /// Clears any feed-hold, restores the original deceleration marker, and
    /// resumes motion.
    pub fn run(&mut self) {
        self.current_move.deccel_marker = self.current_move.accel_marker;
        self.running = true;
        self.feedhold_active = false;
    }

    /// Requests a feed-hold that, once the dominant axis drops below
    /// `min_feed_rate`, clears the queue instead of resuming.
    pub fn soft_abort(&mut self) {
        self.pending_soft_abort = true;
        self.feedhold();
    }

    /// Immediately clears the queue and Bresenham state and resumes ticking.
    pub fn abort(&mut self) {
        self.queue.clear();
        self.bresenham = BresenhamState::default();
        self.running = true;
        self.pending_feedhold = false;
        self.feedhold_active = false;
        self.pending_soft_abort = false;
        // An abort drops whatever move was in flight, cut or not; any
        // sync chain that move would have started is no longer relevant,
        // and any gate it had already raised must release with it, or
        // motion_tick would stay wedged off forever.
        self.pending_cut_end = false;
        self.pending_cut_start = false;
        self.awaiting_sync = false;
    }

    /// The move type of whatever is currently loaded (or `Rapid`, the
    /// default, before anything has ever been pushed).
    pub fn current_move_type(&self) -> MoveType {
        self.current_move.move_type
    }

    /// Consumes the "a cut move just finished" event. `true` at most once
    /// per completed LINE move; the host coordinator should start the
    /// end-of-cut sequence and call [`MotionPlanner::begin_sync`] when this
    /// returns `true`.
    pub fn take_pending_cut_end(&mut self) -> bool {
        core::mem::take(&mut self.pending_cut_end)
    }

    /// Consumes the "a cut move just became current" event. `true` at most
    /// once per LINE move loaded, including adjacent LINE moves with no
    /// intervening rapid — the pierce sequence runs at the start of every
    /// cut move, per its contract.
    pub fn take_pending_cut_start(&mut self) -> bool {
        core::mem::take(&mut self.pending_cut_start)
    }

    /// Suspends `motion_tick` while an out-of-band Z/torch sequence owns the
    /// machine (called by the Motion Sync coordinator before starting a
    /// pierce/probe chain).
    pub fn begin_sync(&mut self) {
        self.awaiting_sync = true;
    }

    /// Resumes ticking after a Motion Sync sequence completes.
    pub fn sync_finished(&mut self) {
        self.awaiting_sync = false;
    }

    /// The periodic tick. Must complete within one tick period; there are no
    /// suspension points. No-op while idle or while an out-of-band sync
    /// sequence is in progress.
    pub fn motion_tick<C: Clock, S: StepSink>(&mut self, clock: &C, sink: &mut S) {
        if !self.running || self.awaiting_sync {
            return;
        }

        if clock.millis().wrapping_sub(self.feed_sample_timestamp_ms) > self.config.feed_ramp_update_interval_ms {
            self.ramp_sample();
            self.feed_sample_timestamp_ms = clock.millis();
        }

        if clock.micros().wrapping_sub(self.feedrate_timestamp_us) > self.feedrate_delay_us {
            self.step_emit(sink);
            self.feedrate_timestamp_us = clock.micros();
        }
    }

    // --- internal ---

    /// `(total_steps, steps_to_go, scale, accel, jerk)` for the dominant axis
    /// of the move currently executing.
    fn dominant(&self) -> (i64, i64, f64, f64, f64) {
        if self.bresenham.dy > self.bresenham.dx {
            (
                self.bresenham.dy,
                self.bresenham.y_stg,
                self.config.step_scale.y,
                self.config.feed_accel.y,
                self.config.feed_jerk.y,
            )
        } else {
            (
                self.bresenham.dx,
                self.bresenham.x_stg,
                self.config.step_scale.x,
                self.config.feed_accel.x,
                self.config.feed_jerk.x,
            )
        }
    }

    fn ramp_sample(&mut self) {
        let (total_steps, stg, scale, accel, _jerk) = self.dominant();
        if stg <= 0 {
            return;
        }

        let distance_left = stg as f64 / scale;
        let distance_in = (total_steps as f64 / scale) - distance_left;
        let target_feed = self.current_move.target_feed_units_per_sec();

        match self.current_move.move_type {
            MoveType::Rapid => {
                if self.pending_feedhold {
                    self.pending_feedhold = false;
                    self.feedhold_active = true;
                    self.current_move.feedhold_marker = distance_left;
                }

                if !self.feedhold_active {
                    let mut new_feed = None;
                    if distance_in - self.current_move.feedhold_marker < self.current_move.accel_marker {
                        new_feed = Some(ramp::feed_from_distance(accel, distance_in - self.current_move.feedhold_marker));
                    }
                    if distance_left < self.current_move.deccel_marker {
                        new_feed = Some(ramp::feed_from_distance(accel, distance_left));
                    }
                    if let Some(feed) = new_feed {
                        if feed > self.config.min_feed_rate && feed < target_feed {
                            self.set_feedrate(feed);
                        }
                    }
                } else {
                    let remaining = self.current_move.deccel_marker - (self.current_move.feedhold_marker - distance_left);
                    let new_feed = ramp::feed_from_distance(accel, remaining);
                    if new_feed > self.config.min_feed_rate {
                        self.set_feedrate(new_feed);
                    } else {
                        self.running = false;
                        self.current_move.feedhold_marker = distance_in;
                        if self.pending_soft_abort {
                            self.pending_soft_abort = false;
                            self.abort();
                        }
                    }
                }
            }
            MoveType::Line => {
                if self.pending_feedhold {
                    // A LINE move under feed-hold stops immediately rather
                    // than riding the ramp down: a torch cut has no business
                    // coasting to a gentle stop mid-kerf.
                    self.pending_feedhold = false;
                    self.feedhold_active = true;
                    self.running = false;
                    if self.pending_soft_abort {
                        self.pending_soft_abort = false;
                        self.abort();
                    }
                } else {
                    self.set_feedrate(target_feed);
                }
            }
        }
    }

    fn step_emit<S: StepSink>(&mut self, sink: &mut S) {
        let (_total_steps, stg, ..) = self.dominant();
        if stg > 0 {
            self.bresenham_step(sink);
            return;
        }

        if let Some(next) = self.queue.pull() {
            let prev_type = self.current_move.move_type;
            self.current_move = next;
            if prev_type == MoveType::Line {
                self.pending_cut_end = true;
            }
            if self.current_move.move_type == MoveType::Line {
                self.pending_cut_start = true;
            }
            self.load_bresenham_from_current_move();
            self.plan_continuous_motion();
        } else {
            self.current_velocity = Vector2F::default();
            self.running = false;
        }
    }

    fn bresenham_step<S: StepSink>(&mut self, sink: &mut S) {
        if self.bresenham.err > -self.bresenham.dx {
            self.bresenham.err -= self.bresenham.dy;
            self.current_position.x += self.bresenham.sx as i64;
            self.bresenham.x_stg -= 1;
            sink.step_x(self.bresenham.sx);
        }
        if self.bresenham.err < self.bresenham.dy {
            self.bresenham.err += self.bresenham.dx;
            self.current_position.y += self.bresenham.sy as i64;
            self.bresenham.y_stg -= 1;
            sink.step_y(self.bresenham.sy);
        }
    }

    fn load_bresenham_from_current_move(&mut self) {
        self.target_position = self.current_move.target;
        let dx = (self.target_position.x - self.current_position.x).abs();
        let dy = (self.target_position.y - self.current_position.y).abs();
        let sx = if self.current_position.x < self.target_position.x { 1 } else { -1 };
        let sy = if self.current_position.y < self.target_position.y { 1 } else { -1 };
        let err = if dx > dy { dx } else { -dy } / 2;
        self.bresenham = BresenhamState {
            dx,
            dy,
            sx,
            sy,
            err,
            x_stg: dx,
            y_stg: dy,
        };
    }

    fn set_feedrate(&mut self, mut feed: f64) {
        if self.bresenham.dx == 0 && self.bresenham.dy == 0 {
            return;
        }
        let x_dist = self.bresenham.dx as f64 / self.config.step_scale.x;
        let y_dist = self.bresenham.dy as f64 / self.config.step_scale.y;
        if feed == 0.0 {
            // A zero feedrate substitutes the dominant axis's jerk floor
            // rather than stalling the ramp at zero velocity.
            feed = if x_dist > y_dist { self.config.feed_jerk.x } else { self.config.feed_jerk.y };
        }
        if feed <= 0.0 {
            return;
        }
        let cartesian_distance = (x_dist * x_dist + y_dist * y_dist).sqrt();
        let duration_sec = cartesian_distance / feed;
        let cycles = self.bresenham.dx.max(self.bresenham.dy) as f64;
        self.feedrate_delay_us = ((duration_sec * 1_000_000.0) / cycles).max(1.0) as u32;
        self.current_velocity.x = x_dist / duration_sec;
        self.current_velocity.y = y_dist / duration_sec;
    }

    /// The adjacent-pair junction pass: walks `current_move` and up to
    /// [`CONTINUOUS_MOTION_DEPTH`] queued moves, setting each junction's
    /// exit/entry velocity from the heading change between the two segments
    /// meeting there, and recomputing the affected ramp markers.
    ///
    /// Runs once each time a new current move is loaded, or a move is
    /// pushed onto a non-empty queue.
    fn plan_continuous_motion(&mut self) {
        let depth = self.queue.len().min(CONTINUOUS_MOTION_DEPTH);
        if depth == 0 {
            return;
        }

        let mut prev_target = self.current_move.target;
        let mut prev_heading = heading_degrees(self.current_position, prev_target);

        for i in 0..depth {
            let this_target = self.queue.peek(i).expect("i < depth <= queue.len()").target;
            let this_heading = heading_degrees(prev_target, this_target);
            let angle_of_change = angle_of_change_degrees(prev_heading, this_heading);

            let delta_x = this_target.x - prev_target.x;
            let delta_y = this_target.y - prev_target.y;
            let (dom_accel, dom_jerk) = if delta_y.abs() > delta_x.abs() {
                (self.config.feed_accel.y, self.config.feed_jerk.y)
            } else {
                (self.config.feed_accel.x, self.config.feed_jerk.x)
            };

            let last_peak = if i == 0 {
                self.current_move.target_feed_units_per_sec()
            } else {
                self.queue.peek(i - 1).expect("i > 0").target_feed_units_per_sec()
            };

            let exit_v = map_angle_to_velocity(angle_of_change, last_peak, dom_jerk).max(dom_jerk);
            let marker = ramp::accel_marker(dom_accel, self.config.min_feed_rate, (last_peak - exit_v).max(0.0));

            if i == 0 {
                self.current_move.exit_velocity = exit_v;
                self.current_move.deccel_marker = marker;
            } else if let Some(m) = self.queue.peek_mut(i - 1) {
                m.exit_velocity = exit_v;
                m.deccel_marker = marker;
            }
            if let Some(m) = self.queue.peek_mut(i) {
                m.entry_velocity = exit_v;
                m.accel_marker = marker;
            }

            prev_target = this_target;
            prev_heading = this_heading;
        }
    }
}

fn heading_degrees(from: Vector2I, to: Vector2I) -> f64 {
    let dx = (to.x - from.x) as f64;
    let dy = (to.y - from.y) as f64;
    if dx == 0.0 && dy == 0.0 {
        return 0.0;
    }
    let mut deg = dy.atan2(dx) * 180.0 / core::f64::consts::PI;
    if deg < 0.0 {
        deg += 360.0;
    }
    deg
}

/// `min(180, |a - b|)`. Not a wraparound-aware circular distance — a 350°
/// heading following a 10° one is treated as a 340° change clipped to 180°,
/// same as any other sharp turn, rather than recognized as a near-collinear
/// 20° change. Matches the angle-of-change definition used throughout this
/// module.
fn angle_of_change_degrees(a: f64, b: f64) -> f64 {
    (a - b).abs().min(180.0)
}

/// Linearly maps `angle_of_change ∈ [0, 180]` to a velocity in `[jerk, peak]`
/// (0° of change → full speed, 180° → jerk).
fn map_angle_to_velocity(angle_of_change: f64, peak: f64, jerk: f64) -> f64 {
    if peak <= jerk {
        return jerk.max(peak);
    }
    let t = (angle_of_change / 180.0).clamp(0.0, 1.0);
    (peak + t * (jerk - peak)).max(jerk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct RecordingClock {
        millis: Cell<u32>,
        micros: Cell<u32>,
    }

    impl RecordingClock {
        fn new() -> Self {
            Self {
                millis: Cell::new(0),
                micros: Cell::new(0),
            }
        }

        fn advance(&self, ms: u32) {
            self.millis.set(self.millis.get().wrapping_add(ms));
            self.micros.set(self.micros.get().wrapping_add(ms * 1000));
        }
    }

    impl Clock for RecordingClock {
        fn millis(&self) -> u32 {
            self.millis.get()
        }
        fn micros(&self) -> u32 {
            self.micros.get()
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        x_steps: Vec<i32>,
        y_steps: Vec<i32>,
    }

    impl StepSink for RecordingSink {
        fn step_x(&mut self, dir: i32) {
            self.x_steps.push(dir);
        }
        fn step_y(&mut self, dir: i32) {
            self.y_steps.push(dir);
        }
    }

    fn test_config() -> PlannerConfig {
        PlannerConfig::default()
    }

    fn drain_move(planner: &mut MotionPlanner<8>, clock: &RecordingClock, sink: &mut RecordingSink, max_ticks: usize) {
        for _ in 0..max_ticks {
            clock.advance(1);
            planner.motion_tick(clock, sink);
            if !planner.is_in_motion() && planner.queue_len() == 0 {
                break;
            }
        }
    }

    #[test]
    fn short_move_ends_exactly_at_target_steps() {
        let mut planner: MotionPlanner<8> = MotionPlanner::new(test_config());
        assert!(planner.push_target(Vector3F::new(1.0, 0.0, 60.0), MoveType::Rapid));

        let clock = RecordingClock::new();
        let mut sink = RecordingSink::default();
        drain_move(&mut planner, &clock, &mut sink, 300_000);

        assert_eq!(sink.x_steps.len(), 518);
        assert!(sink.y_steps.is_empty());
        let signed: i64 = sink.x_steps.iter().map(|&d| d as i64).sum();
        assert_eq!(signed, 518);
    }

    #[test]
    fn diagonal_move_hits_the_exact_step_target_on_both_axes() {
        let mut planner: MotionPlanner<8> = MotionPlanner::new(test_config());
        assert!(planner.push_target(Vector3F::new(0.2, 0.1, 120.0), MoveType::Rapid));

        let clock = RecordingClock::new();
        let mut sink = RecordingSink::default();
        drain_move(&mut planner, &clock, &mut sink, 500_000);

        let expected_x = (0.2_f64 * 518.0).round() as i64;
        let expected_y = (0.1_f64 * 518.0).round() as i64;
        let final_x: i64 = sink.x_steps.iter().map(|&d| d as i64).sum();
        let final_y: i64 = sink.y_steps.iter().map(|&d| d as i64).sum();
        assert_eq!(final_x, expected_x);
        assert_eq!(final_y, expected_y);
    }

    #[test]
    fn triangular_cap_matches_half_length_formula() {
        let expected_peak = ramp::feed_from_distance(7.0, 5.0);
        assert!((expected_peak - 8.3666).abs() < 1e-3);
    }

    #[test]
    fn queue_rejects_pushes_past_capacity() {
        let mut planner: MotionPlanner<4> = MotionPlanner::new(test_config());
        for i in 1..=4 {
            assert!(planner.push_target(Vector3F::new(i as f64, 0.0, 60.0), MoveType::Rapid));
        }
        assert!(planner.queue_full());
        assert!(!planner.push_target(Vector3F::new(5.0, 0.0, 60.0), MoveType::Rapid));
        assert!(planner.queue_full());
    }

    #[test]
    fn feedhold_then_run_completes_the_remaining_distance() {
        let mut planner: MotionPlanner<8> = MotionPlanner::new(test_config());
        planner.push_target(Vector3F::new(5.0, 0.0, 600.0), MoveType::Rapid);

        let clock = RecordingClock::new();
        let mut sink = RecordingSink::default();

        for _ in 0..2000 {
            clock.advance(1);
            planner.motion_tick(&clock, &mut sink);
        }
        planner.feedhold();
        for _ in 0..300_000 {
            clock.advance(1);
            planner.motion_tick(&clock, &mut sink);
            if !planner.is_in_motion() {
                break;
            }
        }
        assert!(!planner.is_in_motion());
        let stopped_steps = sink.x_steps.len();
        assert!(stopped_steps < 518 * 5);

        planner.run();
        drain_move(&mut planner, &clock, &mut sink, 500_000);
        assert_eq!(sink.x_steps.len(), 518 * 5);
    }

    #[test]
    fn soft_abort_clears_the_queue_once_decel_completes() {
        let mut planner: MotionPlanner<8> = MotionPlanner::new(test_config());
        planner.push_target(Vector3F::new(5.0, 0.0, 600.0), MoveType::Rapid);
        planner.push_target(Vector3F::new(10.0, 0.0, 600.0), MoveType::Rapid);

        let clock = RecordingClock::new();
        let mut sink = RecordingSink::default();
        for _ in 0..2000 {
            clock.advance(1);
            planner.motion_tick(&clock, &mut sink);
        }
        planner.soft_abort();
        for _ in 0..500_000 {
            clock.advance(1);
            planner.motion_tick(&clock, &mut sink);
            if !planner.is_in_motion() {
                break;
            }
        }
        assert!(!planner.is_in_motion());
        assert_eq!(planner.queue_len(), 0);
    }

    #[test]
    fn line_move_stops_immediately_on_feedhold_unlike_a_rapid() {
        let mut planner: MotionPlanner<8> = MotionPlanner::new(test_config());
        planner.push_target(Vector3F::new(5.0, 0.0, 600.0), MoveType::Line);

        let clock = RecordingClock::new();
        let mut sink = RecordingSink::default();
        for _ in 0..2000 {
            clock.advance(1);
            planner.motion_tick(&clock, &mut sink);
        }
        planner.feedhold();
        // A single ramp-sample pass should be enough to drop `running`,
        // since a LINE hold does not ride a deceleration ramp down.
        for _ in 0..25 {
            clock.advance(1);
            planner.motion_tick(&clock, &mut sink);
        }
        assert!(!planner.is_in_motion());
    }

    #[test]
    fn collinear_moves_keep_full_peak_velocity_at_the_junction() {
        let angle = angle_of_change_degrees(
            heading_degrees(Vector2I::new(0, 0), Vector2I::new(518, 0)),
            heading_degrees(Vector2I::new(518, 0), Vector2I::new(1036, 0)),
        );
        assert_eq!(angle, 0.0);
        assert_eq!(map_angle_to_velocity(angle, 5.0, 0.05), 5.0);
    }

    #[test]
    fn a_180_degree_reversal_forces_the_junction_down_to_jerk() {
        let from = Vector2I::new(0, 0);
        let mid = Vector2I::new(518, 0);
        let back = Vector2I::new(0, 0);
        let angle = angle_of_change_degrees(heading_degrees(from, mid), heading_degrees(mid, back));
        assert_eq!(angle, 180.0);
        assert_eq!(map_angle_to_velocity(angle, 5.0, 0.05), 0.05);
    }

    #[test]
    fn zero_length_move_is_a_no_op() {
        let mut planner: MotionPlanner<8> = MotionPlanner::new(test_config());
        assert!(planner.push_target(Vector3F::new(0.0, 0.0, 0.0), MoveType::Rapid));
        let clock = RecordingClock::new();
        let mut sink = RecordingSink::default();
        drain_move(&mut planner, &clock, &mut sink, 10_000);
        assert!(sink.x_steps.is_empty());
        assert!(sink.y_steps.is_empty());
        assert_eq!(planner.get_current_position(), Vector3F::default());
    }

    #[test]
    fn cut_transition_events_fire_once_per_edge() {
        let mut planner: MotionPlanner<8> = MotionPlanner::new(test_config());
        planner.push_target(Vector3F::new(1.0, 0.0, 60.0), MoveType::Rapid);
        planner.push_target(Vector3F::new(2.0, 0.0, 60.0), MoveType::Line);
        planner.push_target(Vector3F::new(3.0, 0.0, 60.0), MoveType::Rapid);

        let clock = RecordingClock::new();
        let mut sink = RecordingSink::default();

        // First move (rapid) loads as current_move at construction time via
        // the initial pull; no cut-start/cut-end yet.
        drain_move(&mut planner, &clock, &mut sink, 1);
        assert!(!planner.take_pending_cut_start());
        assert!(!planner.take_pending_cut_end());

        // Drain the rapid move: loading the LINE move behind it fires cut-start.
        for _ in 0..500_000 {
            clock.advance(1);
            planner.motion_tick(&clock, &mut sink);
            if planner.current_move_type() == MoveType::Line {
                break;
            }
        }
        assert_eq!(planner.current_move_type(), MoveType::Line);
        assert!(planner.take_pending_cut_start());
        assert!(!planner.take_pending_cut_end());

        // Drain the LINE move: loading the trailing rapid fires cut-end.
        for _ in 0..500_000 {
            clock.advance(1);
            planner.motion_tick(&clock, &mut sink);
            if planner.current_move_type() == MoveType::Rapid && planner.queue_len() == 0 {
                break;
            }
        }
        assert_eq!(planner.current_move_type(), MoveType::Rapid);
        assert_eq!(planner.queue_len(), 0);
        assert!(planner.take_pending_cut_end());
        assert!(!planner.take_pending_cut_start());
    }

    #[test]
    fn get_last_moves_target_reflects_the_queue_tail_not_current_position() {
        let mut planner: MotionPlanner<8> = MotionPlanner::new(test_config());
        planner.push_target(Vector3F::new(1.0, 0.0, 60.0), MoveType::Rapid);
        planner.push_target(Vector3F::new(2.0, 0.0, 60.0), MoveType::Rapid);
        let last = planner.get_last_moves_target();
        assert!((last.x - 2.0).abs() < 1e-9);
    }

    #[test]
    fn abort_clears_an_in_progress_sync_gate() {
        let mut planner: MotionPlanner<8> = MotionPlanner::new(test_config());
        planner.push_target(Vector3F::new(1.0, 0.0, 60.0), MoveType::Rapid);
        planner.begin_sync();
        assert!(planner.is_awaiting_sync());

        planner.abort();

        assert!(!planner.is_awaiting_sync(), "abort must release any sync gate it leaves behind");
        assert!(planner.is_in_motion());

        // Motion actually resumes after the abort, rather than staying wedged
        // off forever by the stale gate.
        assert!(planner.push_target(Vector3F::new(2.0, 0.0, 60.0), MoveType::Rapid));
        let clock = RecordingClock::new();
        let mut sink = RecordingSink::default();
        drain_move(&mut planner, &clock, &mut sink, 300_000);
        assert!(!sink.x_steps.is_empty(), "motion must resume after abort clears a stale sync gate");
    }

    #[test]
    fn pushing_onto_a_nonempty_queue_does_not_disturb_the_current_moves_ramp() {
        // A higher min_feed_rate than the default keeps this test's initial
        // step-emitter cadence fast, so it doesn't need tens of thousands of
        // ticks just to load the first move.
        let mut config = test_config();
        config.min_feed_rate = 5.0;
        let mut planner: MotionPlanner<8> = MotionPlanner::new(config);
        planner.push_target(Vector3F::new(10.0, 0.0, 600.0), MoveType::Rapid);
        planner.push_target(Vector3F::new(20.0, 0.0, 600.0), MoveType::Rapid);

        let clock = RecordingClock::new();
        let mut sink = RecordingSink::default();
        for _ in 0..1_000 {
            clock.advance(1);
            planner.motion_tick(&clock, &mut sink);
        }
        assert!(!sink.x_steps.is_empty(), "the first move should already be executing and mid-ramp");

        let marker_before = planner.current_move.deccel_marker;
        let exit_velocity_before = planner.current_move.exit_velocity;

        // The queue already holds a second move; pushing a third must not
        // re-run the junction pass against the in-flight current move.
        planner.push_target(Vector3F::new(30.0, 0.0, 600.0), MoveType::Rapid);

        assert_eq!(planner.current_move.deccel_marker, marker_before);
        assert_eq!(planner.current_move.exit_velocity, exit_velocity_before);
    }
}
