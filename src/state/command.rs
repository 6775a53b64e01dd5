// src/state/command.rs
//
// Commands sent from UI to engine.

use super::{ParamId, PersistedState};
use crate::dot::Dot;
use crate::scale::ScaleType;

/// A command sent from the UI thread to the audio engine.
///
/// Commands are drained at the start of each block, before any rotation
/// is computed, so an edit never lands in the middle of a crossing scan.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // ═══════════════════════════════════════════════════════════════
    // Dot editing
    // ═══════════════════════════════════════════════════════════════
    /// Append a dot; it gets the next index.
    AddDot { dot: Dot },

    /// Remove a dot. Later dots shift down by one.
    RemoveDot { index: usize },

    /// Move a dot while dragging.
    MoveDot { index: usize, angle: f32, ring: i32 },

    SetDotActive { index: usize, active: bool },

    ClearDots,

    // ═══════════════════════════════════════════════════════════════
    // Parameters
    // ═══════════════════════════════════════════════════════════════
    /// Set a continuous parameter (clamped by the engine).
    SetParam { param: ParamId, value: f32 },

    SetScale { scale: ScaleType },

    /// Root pitch class, 0 (C) ..= 11 (B).
    SetRootNote { root: i32 },

    /// Octaves, -2 ..= +2.
    SetOctaveShift { shift: i32 },

    SetReverse { reverse: bool },

    SetMotorRunning { running: bool },

    /// Standalone play state.
    SetPlaying { playing: bool },

    // ═══════════════════════════════════════════════════════════════
    // Platter
    // ═══════════════════════════════════════════════════════════════
    /// Hand on a moving platter: stop it dead.
    Brake,

    BeginScratch,

    /// Hand motion since the last scratch command.
    Scratch { delta_degrees: f64, velocity: f64 },

    /// Let go; remaining velocity carries on as momentum.
    ReleaseScratch,

    // ═══════════════════════════════════════════════════════════════
    // Misc
    // ═══════════════════════════════════════════════════════════════
    /// Audition a ring's note at the start of the next block.
    PreviewNote { ring: i32 },

    /// Replace dots and parameters with a saved state.
    Restore { state: Box<PersistedState> },
}
