// src/trigger.rs
//
// Probability gate, velocity variation and swing for crossed dots.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::crossing::Crossing;
use crate::parameter::Params;

/// Subdivisions per rotation: 8 beats of 16th notes.
pub const SUBDIVISIONS_PER_ROTATION: u32 = 32;

/// Block timing needed to place a trigger.
#[derive(Debug, Clone, Copy)]
pub struct BlockTiming {
    pub frames: usize,
    /// Length of a 16th note at the block's tempo.
    pub sixteenth_samples: f64,
}

/// A crossing that passed the probability gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    /// Sample offset after swing, `< frames`.
    pub offset: usize,
    pub note: u8,
    pub velocity: u8,
    /// Fired-trigger count at this trigger, for display.
    pub beat_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Fire(Trigger),
    /// Probability miss. The crossing is still consumed for this sweep.
    Skip { beat_count: u32 },
}

/// Decides whether and how a crossing fires.
///
/// Owns the random source so the audio thread never touches a shared RNG.
#[derive(Debug, Clone)]
pub struct TriggerPipeline<R: Rng = StdRng> {
    rng: R,
    beat_count: u32,
}

impl TriggerPipeline<StdRng> {
    /// Seeded pipeline for reproducible output; unseeded draws from the OS.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::with_rng(rng)
    }
}

impl<R: Rng> TriggerPipeline<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng, beat_count: 0 }
    }

    #[inline]
    pub fn beat_count(&self) -> u32 {
        self.beat_count
    }

    /// Evaluate a crossing. `note` is the dot's resolved MIDI note.
    pub fn evaluate(
        &mut self,
        crossing: &Crossing,
        note: u8,
        params: &Params,
        timing: &BlockTiming,
    ) -> TriggerOutcome {
        let roll = self.rng.random::<f32>() * 100.0;
        let probability = params.probability();
        if probability <= 0.0 || roll > probability {
            return TriggerOutcome::Skip {
                beat_count: self.beat_count,
            };
        }

        self.beat_count = self.beat_count.wrapping_add(1);

        let velocity = self.velocity(params);
        let offset = swing_offset(crossing.offset, crossing.angle, params.swing(), timing);

        TriggerOutcome::Fire(Trigger {
            offset,
            note,
            velocity,
            beat_count: self.beat_count,
        })
    }

    fn velocity(&mut self, params: &Params) -> u8 {
        let base = params.velocity();
        let variation = params.velocity_variation();
        if variation <= 0.0 {
            return base;
        }
        let draw = self.rng.random_range(-1.0f32..=1.0);
        let scaled = base as f32 * (1.0 + draw * (variation / 100.0) * 0.5);
        (scaled as i32).clamp(1, 127) as u8
    }
}

/// 16th-note subdivision (0..32) of the rotation at `angle`.
#[inline]
pub fn subdivision(angle: f64) -> u32 {
    let progress = angle.rem_euclid(360.0) / 360.0;
    (progress * SUBDIVISIONS_PER_ROTATION as f64) as u32 % SUBDIVISIONS_PER_ROTATION
}

/// Fraction of a 16th note odd subdivisions are delayed by.
///
/// 50% swing is straight, 100% delays by a full 16th.
#[inline]
pub fn swing_delay_ratio(swing: f32) -> f64 {
    ((swing as f64 / 100.0 - 0.5) * 2.0).clamp(0.0, 1.0)
}

/// Apply swing to a trigger offset. The result stays inside the block.
pub fn swing_offset(offset: usize, angle: f64, swing: f32, timing: &BlockTiming) -> usize {
    if swing <= 0.0 || timing.frames == 0 || subdivision(angle) % 2 == 0 {
        return offset;
    }
    let delay = (timing.sixteenth_samples * swing_delay_ratio(swing)) as usize;
    (offset + delay).min(timing.frames - 1)
}
