// src/crossing.rs
//
// Which dots did the platter pass over during a block, and where.

use crate::dot::DotSet;
use crate::rotation::RotationStep;

/// Widening applied to each end of a segment (degrees).
pub const CROSSING_TOLERANCE: f64 = 0.5;

/// Rotation below this (degrees) cannot cross anything.
pub const MIN_MOTION: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// A stretch of a block's rotation that stays inside one sweep.
///
/// A block that crosses 0/360 is split into two segments; the second one
/// starts a new sweep. Segments are expressed in unwrapped degrees within
/// `[0, 360]`, so a forward segment has `from <= to` and a backward one
/// `from >= to`. The direction comes from the block's rotation, which
/// keeps a zero-length segment at the seam pointing the right way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub from: f64,
    pub to: f64,

    /// Rotation already covered in this block before the segment starts.
    pub travelled: f64,

    /// Sweep flags must be reset before scanning this segment.
    pub starts_sweep: bool,

    direction: Direction,

    // Ends lying on the 0/360 boundary are not widened, so the tolerance
    // never reaches into the neighbouring sweep.
    from_boundary: bool,
    to_boundary: bool,
}

impl Segment {
    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Inclusive angle range scanned for this segment, tolerance applied.
    fn window(&self, tolerance: f64) -> (f64, f64) {
        let widen = |boundary: bool| if boundary { 0.0 } else { tolerance };
        match self.direction() {
            Direction::Forward => (
                self.from - widen(self.from_boundary),
                self.to + widen(self.to_boundary),
            ),
            Direction::Backward => (
                self.to - widen(self.to_boundary),
                self.from + widen(self.from_boundary),
            ),
        }
    }

    /// Distance travelled from the segment start to `angle`, within the segment.
    fn distance_to(&self, angle: f64) -> f64 {
        let length = (self.to - self.from).abs();
        let distance = match self.direction() {
            Direction::Forward => angle - self.from,
            Direction::Backward => self.from - angle,
        };
        distance.clamp(0.0, length)
    }
}

/// The one or two segments of a block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segments {
    first: Option<Segment>,
    second: Option<Segment>,
}

impl Segments {
    /// Split a block's rotation at the 0/360 boundary.
    pub fn of(step: &RotationStep) -> Self {
        let previous = step.previous;
        let delta = step.delta;

        if delta.abs() < MIN_MOTION {
            return Self {
                first: None,
                second: None,
            };
        }

        let end = previous + delta;
        let direction = if delta > 0.0 {
            Direction::Forward
        } else {
            Direction::Backward
        };
        let plain = |from: f64, to: f64| Segment {
            from,
            to,
            travelled: 0.0,
            starts_sweep: false,
            direction,
            from_boundary: false,
            to_boundary: false,
        };

        if (0.0..360.0).contains(&end) {
            return Self {
                first: Some(plain(previous, end)),
                second: None,
            };
        }

        let (boundary_out, boundary_in, rest) = if delta > 0.0 {
            (360.0, 0.0, end - 360.0)
        } else {
            (0.0, 360.0, end + 360.0)
        };

        Self {
            first: Some(Segment {
                to_boundary: true,
                ..plain(previous, boundary_out)
            }),
            second: Some(Segment {
                travelled: (boundary_out - previous).abs(),
                starts_sweep: true,
                from_boundary: true,
                ..plain(boundary_in, rest)
            }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Segment> {
        [self.first, self.second].into_iter().flatten()
    }
}

/// A dot passed during a block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossing {
    pub dot_index: usize,

    /// Sample offset within the block, `< block_frames`.
    pub offset: usize,

    /// Platter angle at the crossing (the dot's angle).
    pub angle: f64,

    pub direction: Direction,
}

/// Finds dots crossed within a segment.
#[derive(Debug, Clone, Copy)]
pub struct CrossingDetector {
    tolerance: f64,
}

impl Default for CrossingDetector {
    fn default() -> Self {
        Self::new(CROSSING_TOLERANCE)
    }
}

impl CrossingDetector {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance: tolerance.max(0.0),
        }
    }

    /// Append crossings of active, not-yet-fired dots within `segment`,
    /// ordered by offset.
    ///
    /// `total` is the block's full signed rotation; offsets are the
    /// fraction of it covered when the dot is reached.
    pub fn detect(
        &self,
        segment: &Segment,
        total: f64,
        dots: &DotSet,
        frames: usize,
        out: &mut Vec<Crossing>,
    ) {
        let total = total.abs();
        if total < MIN_MOTION || frames == 0 {
            return;
        }

        let start = out.len();
        let (lo, hi) = segment.window(self.tolerance);
        let direction = segment.direction();

        for (index, dot) in dots.iter().enumerate() {
            if !dot.active || dot.fired_this_sweep() {
                continue;
            }

            let angle = dot.angle as f64;
            if angle < lo || angle > hi {
                continue;
            }

            let travelled = segment.travelled + segment.distance_to(angle);
            let fraction = (travelled / total).clamp(0.0, 1.0);
            let offset = ((fraction * frames as f64) as usize).min(frames - 1);

            out.push(Crossing {
                dot_index: index,
                offset,
                angle,
                direction,
            });
        }

        out[start..].sort_unstable_by_key(|c| (c.offset, c.dot_index));
    }

    /// Crossings for a whole step, ignoring sweep resets.
    ///
    /// Used for inspection; the engine scans segment by segment so it can
    /// reset sweep flags at the boundary.
    pub fn detect_step(
        &self,
        step: &RotationStep,
        dots: &DotSet,
        frames: usize,
        out: &mut Vec<Crossing>,
    ) {
        for segment in Segments::of(step).iter() {
            self.detect(&segment, step.delta, dots, frames, out);
        }
    }
}
