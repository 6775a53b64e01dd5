// src/scratch.rs
//
// Pointer drags on the platter edge -> angular motion.
//
// Runs on the interaction thread. The resulting motion is sent to the
// engine as a scratch command; friction after release is applied by the
// rotation clock.

/// Fastest hand-driven rotation (deg/s), two turns per second.
pub const MAX_SCRATCH_VELOCITY: f64 = 720.0;

/// Pointer positions closer to the centre than this (pixels) carry no
/// usable tangent.
const MIN_RADIUS: f64 = 1.0;

const MIN_TANGENT_LENGTH: f64 = 0.01;

pub type Point = (f64, f64);

/// What a press on the platter edge does, given the platter's motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabOutcome {
    /// The platter was moving: stop it dead, no scratch yet.
    Brake,
    /// Platter at rest with the motor off: start scratching.
    Scratch,
    /// Motor on but not yet turning: nothing to do.
    Ignored,
}

/// Decide what a grab does from the engine's current motion.
pub fn grab_outcome(motor_running: bool, speed_multiplier: f64, scratch_velocity: f64) -> GrabOutcome {
    let motor_motion = motor_running && speed_multiplier > 0.01;
    let momentum = scratch_velocity.abs() > 0.1;

    if motor_motion || momentum {
        GrabOutcome::Brake
    } else if !motor_running {
        GrabOutcome::Scratch
    } else {
        GrabOutcome::Ignored
    }
}

/// Angular velocity (deg/s) of a pointer moving at `pointer_velocity`
/// (pixels/s) at `offset` from the platter centre.
///
/// Only the component along the tangent counts, so straight-line drags
/// across the platter still turn it. Positive screen-space
/// counter-clockwise motion maps to negative rotation. Clamped to
/// `±MAX_SCRATCH_VELOCITY`; `None` when the pointer is on the centre.
pub fn tangential_velocity(offset: Point, pointer_velocity: Point) -> Option<f64> {
    let (dx, dy) = offset;
    let radius = dx.hypot(dy);
    if radius <= MIN_RADIUS {
        return None;
    }

    let (tx, ty) = (-dy, dx);
    let tangent_length = tx.hypot(ty);
    if tangent_length <= MIN_TANGENT_LENGTH {
        return None;
    }
    let (tx, ty) = (tx / tangent_length, ty / tangent_length);

    let tangential_speed = pointer_velocity.0 * tx + pointer_velocity.1 * ty;
    let degrees_per_second = (tangential_speed / radius).to_degrees();

    Some((-degrees_per_second).clamp(-MAX_SCRATCH_VELOCITY, MAX_SCRATCH_VELOCITY))
}

/// Rotation produced by one drag sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScratchMotion {
    pub delta_degrees: f64,
    pub velocity: f64,
}

#[derive(Debug, Clone, Copy)]
struct Contact {
    position: Point,
    time: f64,
}

/// Tracks one scratch gesture.
#[derive(Debug, Clone, Default)]
pub struct ScratchController {
    center: Point,
    contact: Option<Contact>,
}

impl ScratchController {
    pub fn new(center: Point) -> Self {
        Self {
            center,
            contact: None,
        }
    }

    pub fn set_center(&mut self, center: Point) {
        self.center = center;
    }

    /// Start a gesture. `time` is in seconds on any monotonic clock.
    pub fn begin(&mut self, position: Point, time: f64) {
        self.contact = Some(Contact { position, time });
    }

    /// Feed a drag sample. Returns the rotation to apply, if any.
    pub fn drag(&mut self, position: Point, time: f64) -> Option<ScratchMotion> {
        let contact = self.contact?;
        let dt = time - contact.time;
        if dt <= 0.0 {
            return None;
        }

        let pointer_velocity = (
            (position.0 - contact.position.0) / dt,
            (position.1 - contact.position.1) / dt,
        );
        let offset = (position.0 - self.center.0, position.1 - self.center.1);

        self.contact = Some(Contact { position, time });

        let velocity = tangential_velocity(offset, pointer_velocity)?;

        Some(ScratchMotion {
            delta_degrees: velocity * dt,
            velocity,
        })
    }

    /// End the gesture. Returns false if no gesture was active.
    pub fn release(&mut self) -> bool {
        self.contact.take().is_some()
    }
}
