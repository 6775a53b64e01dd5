// src/state/session.rs
//
// Session state.
//
// The Session is the UI's copy of everything the user can edit. It is
// kept in step with the engine by applying the same commands to both.

use super::{Command, PersistedState};
use crate::dot::{Color, Dot, MAX_DOTS};
use crate::parameter::Params;
use crate::scale::ScaleEngine;

/// Dots a fresh session starts with: a simple four-on-the-floor pattern.
pub const STARTER_PATTERN: [(f32, i32); 4] = [(0.0, 0), (90.0, 2), (180.0, 4), (270.0, 2)];

/// Complete editable session state.
#[derive(Debug, Clone)]
pub struct Session {
    /// The dot sequence, index-aligned with the engine's. Holds at most
    /// `MAX_DOTS`, the same limit the engine applies.
    pub dots: Vec<Dot>,

    pub params: Params,

    pub scale: ScaleEngine,
}

impl Session {
    /// A session holding the starter pattern.
    pub fn new() -> Self {
        let dots = STARTER_PATTERN
            .iter()
            .map(|&(angle, ring)| Dot::new(angle, ring, Color::ORANGE))
            .collect();
        Self {
            dots,
            ..Self::empty()
        }
    }

    /// A session with no dots.
    pub fn empty() -> Self {
        Self {
            dots: Vec::new(),
            params: Params::default(),
            scale: ScaleEngine::default(),
        }
    }

    /// Apply a command to the mirror. Engine-only commands are ignored.
    pub fn apply(&mut self, cmd: &Command) {
        match cmd {
            Command::AddDot { dot } => {
                if self.dots.len() < MAX_DOTS {
                    self.dots.push(dot.clone());
                }
            }
            Command::RemoveDot { index } => {
                if *index < self.dots.len() {
                    self.dots.remove(*index);
                }
            }
            Command::MoveDot { index, angle, ring } => {
                if let Some(dot) = self.dots.get_mut(*index) {
                    dot.set_angle(*angle);
                    dot.ring = *ring;
                }
            }
            Command::SetDotActive { index, active } => {
                if let Some(dot) = self.dots.get_mut(*index) {
                    dot.active = *active;
                }
            }
            Command::ClearDots => self.dots.clear(),
            Command::SetParam { param, value } => self.params.set(*param, *value),
            Command::SetScale { scale } => self.scale.set_scale(*scale),
            Command::SetRootNote { root } => self.scale.set_root(*root),
            Command::SetOctaveShift { shift } => self.scale.set_octave_shift(*shift),
            Command::SetReverse { reverse } => self.params.reverse = *reverse,
            Command::SetMotorRunning { running } => self.params.motor_running = *running,
            Command::SetPlaying { playing } => self.params.playing = *playing,
            Command::Restore { state } => self.apply_persisted(state),

            Command::Brake
            | Command::BeginScratch
            | Command::Scratch { .. }
            | Command::ReleaseScratch
            | Command::PreviewNote { .. } => {}
        }
    }

    /// Load a saved state. Out-of-range values are clamped; the octave
    /// shift and transport flags are not part of saved state and are kept.
    pub fn apply_persisted(&mut self, state: &PersistedState) {
        state.apply_settings(&mut self.params, &mut self.scale);

        self.dots.clear();
        self.dots.extend(state.dots.iter().take(MAX_DOTS).cloned());
    }

    /// Snapshot for saving.
    pub fn to_persisted(&self) -> PersistedState {
        PersistedState {
            speed: self.params.speed(),
            scale: self.scale.scale(),
            root: self.scale.root() as i32,
            dots: self.dots.clone(),
            velocity: self.params.velocity() as i32,
            gate_time_ms: self.params.gate_time_ms(),
            reverse: self.params.reverse,
            probability: self.params.probability(),
            velocity_variation: self.params.velocity_variation(),
            swing: self.params.swing(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only engine state for UI display.
///
/// Published by the engine after every block.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngineReadback {
    /// Platter angle in degrees, `[0, 360)`.
    pub rotation: f64,

    /// Motor ramp, `[0, 1]`.
    pub speed_multiplier: f64,

    /// Scratch momentum (deg/s).
    pub scratch_velocity: f64,

    /// Samples processed since the engine started.
    pub sample_position: u64,

    pub sample_rate: f64,

    pub motor_running: bool,

    pub being_scratched: bool,

    /// Fired triggers so far.
    pub beat_count: u32,

    /// Note-offs dropped because their time had passed.
    pub dropped_note_offs: u64,
}

impl EngineReadback {
    /// Engine clock in milliseconds, the time base of trigger feedback.
    pub fn now_ms(&self) -> f64 {
        if self.sample_rate > 0.0 {
            self.sample_position as f64 * 1000.0 / self.sample_rate
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::ScaleType;
    use crate::state::ParamId;

    #[test]
    fn test_new_session_has_starter_pattern() {
        let session = Session::new();
        let layout: Vec<_> = session.dots.iter().map(|d| (d.angle, d.ring)).collect();
        assert_eq!(layout, STARTER_PATTERN.to_vec());
        assert!(session.dots.iter().all(|d| d.active && d.color == Color::ORANGE));
        assert_eq!(session.scale.scale(), ScaleType::Pentatonic);
    }

    #[test]
    fn test_apply_dot_edits() {
        let mut session = Session::empty();
        session.apply(&Command::AddDot {
            dot: Dot::new(10.0, 1, Color::ORANGE),
        });
        session.apply(&Command::AddDot {
            dot: Dot::new(20.0, 2, Color::ORANGE),
        });
        session.apply(&Command::MoveDot {
            index: 1,
            angle: 370.0,
            ring: 3,
        });
        session.apply(&Command::SetDotActive {
            index: 0,
            active: false,
        });
        assert_eq!(session.dots[1].angle, 10.0);
        assert_eq!(session.dots[1].ring, 3);
        assert!(!session.dots[0].active);

        session.apply(&Command::RemoveDot { index: 0 });
        session.apply(&Command::RemoveDot { index: 7 });
        assert_eq!(session.dots.len(), 1);

        session.apply(&Command::ClearDots);
        assert!(session.dots.is_empty());
    }

    #[test]
    fn test_persisted_snapshot_round_trip() {
        let mut session = Session::new();
        session.apply(&Command::SetParam {
            param: ParamId::Swing,
            value: 70.0,
        });
        session.apply(&Command::SetScale {
            scale: ScaleType::Blues,
        });
        session.apply(&Command::SetRootNote { root: 5 });

        let mut restored = Session::empty();
        restored.apply_persisted(&session.to_persisted());
        assert_eq!(restored.dots, session.dots);
        assert_eq!(restored.params.swing(), 70.0);
        assert_eq!(restored.scale.scale(), ScaleType::Blues);
        assert_eq!(restored.scale.root(), 5);
    }

    #[test]
    fn test_restore_clamps() {
        let mut session = Session::empty();
        session.apply_persisted(&PersistedState {
            velocity: 400,
            swing: -5.0,
            root: 40,
            ..PersistedState::default()
        });
        assert_eq!(session.params.velocity(), 127);
        assert_eq!(session.params.swing(), 0.0);
        assert_eq!(session.scale.root(), 11);
    }

    #[test]
    fn test_dot_limit_matches_engine() {
        let mut session = Session::empty();
        for i in 0..MAX_DOTS + 5 {
            session.apply(&Command::AddDot {
                dot: Dot::new(i as f32, 0, Color::ORANGE),
            });
        }
        assert_eq!(session.dots.len(), MAX_DOTS);

        let state = PersistedState {
            dots: vec![Dot::new(5.0, 1, Color::ORANGE); MAX_DOTS * 2],
            ..PersistedState::default()
        };
        session.apply_persisted(&state);
        assert_eq!(session.dots.len(), MAX_DOTS);
    }
}
