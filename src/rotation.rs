// src/rotation.rs
//
// Platter rotation: motor ramp, tempo-derived speed and scratch momentum.

use crate::dot::wrap_degrees;

/// One full rotation spans 8 beats (2 bars of 4/4).
pub const BEATS_PER_ROTATION: f64 = 8.0;

/// Motor spin-up rate (speed multiplier per second); full speed in ~0.33 s.
pub const RAMP_UP_RATE: f64 = 3.0;

/// Motor spin-down rate; comes to rest in ~2.5 s.
pub const RAMP_DOWN_RATE: f64 = 0.4;

/// Friction applied to thrown scratch momentum, per second.
pub const SCRATCH_FRICTION: f64 = 0.4;

/// Scratch momentum below this (deg/s) snaps to zero.
pub const SCRATCH_REST_VELOCITY: f64 = 0.1;

/// Largest rotation reported for a single block. Keeps every block
/// within one wrap of the platter.
const MAX_BLOCK_DELTA: f64 = 359.999;

/// Rotation state of the platter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationState {
    /// Current angle in degrees, `[0, 360)`.
    pub rotation: f64,

    /// Motor ramp, `[0, 1]`.
    pub speed_multiplier: f64,

    /// Angular velocity from manual manipulation (deg/s).
    pub scratch_velocity: f64,

    pub being_scratched: bool,

    pub motor_running: bool,
}

impl Default for RotationState {
    fn default() -> Self {
        Self {
            rotation: 0.0,
            speed_multiplier: 1.0,
            scratch_velocity: 0.0,
            being_scratched: false,
            motor_running: true,
        }
    }
}

/// Rotation covered by one block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationStep {
    /// Angle at block start, `[0, 360)`.
    pub previous: f64,

    /// Signed rotation over the block, `|delta| < 360`.
    pub delta: f64,

    /// Angle at block end, `[0, 360)`.
    pub current: f64,
}

impl RotationStep {
    /// Build a step from two angles alone, taking the shorter way round:
    /// `delta` is wrapped into `(-180, 180]`.
    pub fn between(previous: f64, current: f64) -> Self {
        let mut delta = current - previous;
        if delta > 180.0 {
            delta -= 360.0;
        } else if delta <= -180.0 {
            delta += 360.0;
        }
        Self {
            previous,
            delta,
            current,
        }
    }

    /// True if the step crossed the 0/360 boundary in either direction.
    #[inline]
    pub fn wrapped(&self) -> bool {
        let end = self.previous + self.delta;
        !(0.0..360.0).contains(&end)
    }
}

/// Tempo-derived block inputs for the clock.
#[derive(Debug, Clone, Copy)]
pub struct ClockInput {
    pub frames: usize,
    pub sample_rate: f64,
    pub bpm: f64,
    /// User speed multiplier.
    pub speed: f64,
    pub reverse: bool,
    pub should_play: bool,
}

/// Owns the platter angle and advances it once per block.
///
/// Scratch motion applied between blocks is accumulated and folded into
/// the next block's step, so dots crossed by hand are detected like any
/// other rotation.
#[derive(Debug, Clone, Default)]
pub struct RotationClock {
    state: RotationState,

    /// Angle at the end of the last block.
    block_start: f64,

    /// Hand-applied rotation since the last block.
    pending_delta: f64,
}

impl RotationClock {
    pub fn new(state: RotationState) -> Self {
        let rotation = wrap_degrees(state.rotation);
        Self {
            state: RotationState { rotation, ..state },
            block_start: rotation,
            pending_delta: 0.0,
        }
    }

    #[inline]
    pub fn state(&self) -> &RotationState {
        &self.state
    }

    /// Rotations per second for the given tempo and speed settings.
    #[inline]
    pub fn rotations_per_second(bpm: f64, speed: f64, reverse: bool, multiplier: f64) -> f64 {
        let sign = if reverse { -1.0 } else { 1.0 };
        (bpm / 60.0 / BEATS_PER_ROTATION) * sign * speed * multiplier
    }

    /// Advance the platter by one block.
    pub fn advance(&mut self, input: &ClockInput) -> RotationStep {
        let block_seconds = input.frames as f64 / input.sample_rate;

        self.ramp_motor(block_seconds);
        self.apply_friction(block_seconds);

        let mut motion = 0.0;
        if !self.state.being_scratched {
            if self.state.scratch_velocity != 0.0 {
                // Thrown platter: momentum replaces the motor.
                motion = self.state.scratch_velocity * block_seconds;
            } else if input.should_play || self.is_decelerating() {
                let rps = Self::rotations_per_second(
                    input.bpm,
                    input.speed,
                    input.reverse,
                    self.state.speed_multiplier,
                );
                motion = rps * 360.0 * block_seconds;
            }
        }

        let delta = (self.pending_delta + motion).clamp(-MAX_BLOCK_DELTA, MAX_BLOCK_DELTA);
        let previous = self.block_start;
        let current = wrap_degrees(previous + delta);

        self.state.rotation = current;
        self.block_start = current;
        self.pending_delta = 0.0;

        RotationStep {
            previous,
            delta,
            current,
        }
    }

    #[inline]
    fn is_decelerating(&self) -> bool {
        !self.state.motor_running && self.state.speed_multiplier > 0.0
    }

    fn ramp_motor(&mut self, block_seconds: f64) {
        let multiplier = &mut self.state.speed_multiplier;
        if self.state.motor_running {
            *multiplier = (*multiplier + RAMP_UP_RATE * block_seconds).min(1.0);
        } else {
            *multiplier = (*multiplier - RAMP_DOWN_RATE * block_seconds).max(0.0);
        }
    }

    fn apply_friction(&mut self, block_seconds: f64) {
        if self.state.being_scratched || self.state.scratch_velocity == 0.0 {
            return;
        }
        let v = self.state.scratch_velocity;
        let reduction = v.abs() * SCRATCH_FRICTION * block_seconds;
        let v = if v > 0.0 {
            (v - reduction).max(0.0)
        } else {
            (v + reduction).min(0.0)
        };
        self.state.scratch_velocity = if v.abs() < SCRATCH_REST_VELOCITY { 0.0 } else { v };
    }

    // -------------------------------
    // MARK: Manual manipulation
    // -------------------------------

    pub fn set_motor_running(&mut self, running: bool) {
        self.state.motor_running = running;
    }

    /// Hand on the platter: stop all motion immediately.
    pub fn brake(&mut self) {
        self.state.scratch_velocity = 0.0;
        self.state.speed_multiplier = 0.0;
    }

    pub fn begin_scratch(&mut self) {
        self.state.being_scratched = true;
        self.state.scratch_velocity = 0.0;
    }

    /// Rotate directly by hand. The velocity is kept for the throw.
    pub fn scratch(&mut self, delta_degrees: f64, velocity: f64) {
        self.state.rotation = wrap_degrees(self.state.rotation + delta_degrees);
        self.pending_delta += delta_degrees;
        self.state.scratch_velocity = velocity;
    }

    /// Let go of the platter; remaining velocity becomes momentum.
    pub fn release_scratch(&mut self) {
        self.state.being_scratched = false;
        if self.state.scratch_velocity.abs() < SCRATCH_REST_VELOCITY {
            self.state.scratch_velocity = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn input(frames: usize, should_play: bool) -> ClockInput {
        ClockInput {
            frames,
            sample_rate: 48_000.0,
            bpm: 120.0,
            speed: 1.0,
            reverse: false,
            should_play,
        }
    }

    #[test]
    fn test_one_rotation_per_eight_beats() {
        // 120 BPM -> 8 beats = 4 s -> 90 deg/s
        let mut clock = RotationClock::default();
        let step = clock.advance(&input(48_000, true));
        assert_abs_diff_eq!(step.delta, 90.0, epsilon = 1e-9);
        assert_abs_diff_eq!(step.current, 90.0, epsilon = 1e-9);
    }

    #[test]
    fn test_reverse_wraps_below_zero() {
        let mut clock = RotationClock::default();
        let step = clock.advance(&ClockInput {
            reverse: true,
            ..input(4_800, true)
        });
        assert_abs_diff_eq!(step.delta, -9.0, epsilon = 1e-9);
        assert_abs_diff_eq!(step.current, 351.0, epsilon = 1e-9);
        assert!(step.wrapped());
    }

    #[test]
    fn test_rotation_stays_in_range() {
        let mut clock = RotationClock::default();
        for i in 0..5_000 {
            let step = clock.advance(&ClockInput {
                speed: 4.0,
                reverse: i % 700 < 350,
                ..input(512, true)
            });
            assert!((0.0..360.0).contains(&step.current));
            assert!((0.0..360.0).contains(&clock.state().rotation));
        }
    }

    #[test]
    fn test_stopped_transport_does_not_turn() {
        let mut clock = RotationClock::default();
        let step = clock.advance(&input(512, false));
        assert_eq!(step.delta, 0.0);
    }

    #[test]
    fn test_motor_ramps_down_and_keeps_turning() {
        let mut clock = RotationClock::default();
        clock.set_motor_running(false);

        // Playback stopped, but the platter coasts to rest.
        let step = clock.advance(&input(4_800, false));
        assert!(step.delta > 0.0);
        assert_abs_diff_eq!(clock.state().speed_multiplier, 0.96, epsilon = 1e-9);

        // 2.5 s later it is at rest
        for _ in 0..25 {
            clock.advance(&input(4_800, false));
        }
        assert_eq!(clock.state().speed_multiplier, 0.0);
        let step = clock.advance(&input(4_800, true));
        assert_eq!(step.delta, 0.0);
    }

    #[test]
    fn test_motor_ramps_up_to_full_speed() {
        let mut clock = RotationClock::new(RotationState {
            speed_multiplier: 0.0,
            ..RotationState::default()
        });
        clock.advance(&input(4_800, true));
        assert_abs_diff_eq!(clock.state().speed_multiplier, 0.3, epsilon = 1e-9);
        for _ in 0..10 {
            clock.advance(&input(4_800, true));
        }
        assert_eq!(clock.state().speed_multiplier, 1.0);
    }

    #[test]
    fn test_thrown_platter_decays_to_rest() {
        let mut clock = RotationClock::default();
        clock.set_motor_running(false);
        clock.brake();
        clock.begin_scratch();
        clock.scratch(10.0, 360.0);
        clock.release_scratch();

        let step = clock.advance(&input(4_800, false));
        // pending hand motion plus momentum after one block of friction
        let v = 360.0 - 360.0 * SCRATCH_FRICTION * 0.1;
        assert_abs_diff_eq!(step.delta, 10.0 + v * 0.1, epsilon = 1e-9);

        for _ in 0..2_000 {
            clock.advance(&input(4_800, false));
        }
        assert_eq!(clock.state().scratch_velocity, 0.0);
        assert_eq!(clock.advance(&input(4_800, false)).delta, 0.0);
    }

    #[test]
    fn test_scratch_bypasses_motor() {
        let mut clock = RotationClock::default();
        clock.begin_scratch();
        clock.scratch(-5.0, -100.0);
        clock.scratch(-5.0, -100.0);

        let step = clock.advance(&input(512, true));
        assert_abs_diff_eq!(step.delta, -10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(step.current, 350.0, epsilon = 1e-9);

        // Held still: no motor motion.
        let step = clock.advance(&input(512, true));
        assert_eq!(step.delta, 0.0);
    }

    #[test]
    fn test_step_between_takes_short_way() {
        let step = RotationStep::between(350.0, 10.0);
        assert_abs_diff_eq!(step.delta, 20.0, epsilon = 1e-9);
        assert!(step.wrapped());

        let step = RotationStep::between(10.0, 350.0);
        assert_abs_diff_eq!(step.delta, -20.0, epsilon = 1e-9);
        assert!(step.wrapped());

        let step = RotationStep::between(0.0, 180.0);
        assert_abs_diff_eq!(step.delta, 180.0, epsilon = 1e-9);
        assert!(!step.wrapped());
    }
}
