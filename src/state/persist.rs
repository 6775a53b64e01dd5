// src/state/persist.rs
//
// Binary save/load of a session.
//
// Layout (little-endian, no version tag):
//
//   speed f32, scale i32, root i32, dot count i32,
//   per dot { angle f32, ring i32, color i32 (ARGB), active u8 },
//   velocity i32, gate_time_ms f32, reverse u8,
//   probability f32, velocity_variation f32, swing f32
//
// Everything after the dots was added later and is optional: blobs that end
// early load the missing fields as defaults. Dots past `MAX_DOTS` are read
// over and discarded.

use thiserror::Error;

use crate::dot::{Color, Dot, MAX_DOTS};
use crate::parameter::Params;
use crate::scale::{ScaleEngine, ScaleType};
use crate::state::ParamId;

/// Bytes per serialized dot.
const DOT_SIZE: usize = 4 + 4 + 4 + 1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("state blob truncated while reading {field}")]
    Truncated { field: &'static str },

    #[error("invalid dot count {count} ({remaining} bytes left)")]
    InvalidDotCount { count: i32, remaining: usize },
}

/// A saved session, as stored by the host.
///
/// Values are stored as read; clamping happens when the state is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedState {
    pub speed: f32,
    pub scale: ScaleType,
    pub root: i32,
    pub dots: Vec<Dot>,

    pub velocity: i32,
    pub gate_time_ms: f32,
    pub reverse: bool,
    pub probability: f32,
    pub velocity_variation: f32,
    pub swing: f32,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            speed: ParamId::Speed.info().default,
            scale: ScaleType::default(),
            root: 0,
            dots: Vec::new(),
            velocity: ParamId::Velocity.info().default as i32,
            gate_time_ms: ParamId::GateTime.info().default,
            reverse: false,
            probability: ParamId::Probability.info().default,
            velocity_variation: ParamId::VelocityVariation.info().default,
            swing: ParamId::Swing.info().default,
        }
    }
}

impl PersistedState {
    /// Load the saved parameters and key into live state, clamping through
    /// the setters. Octave shift and transport flags are not saved and keep
    /// their current values.
    pub fn apply_settings(&self, params: &mut Params, scale: &mut ScaleEngine) {
        params.set(ParamId::Speed, self.speed);
        params.set(ParamId::Velocity, self.velocity as f32);
        params.set(ParamId::GateTime, self.gate_time_ms);
        params.set(ParamId::Probability, self.probability);
        params.set(ParamId::VelocityVariation, self.velocity_variation);
        params.set(ParamId::Swing, self.swing);
        params.reverse = self.reverse;

        scale.set_scale(self.scale);
        scale.set_root(self.root);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16 + self.dots.len() * DOT_SIZE + 21);

        out.extend_from_slice(&self.speed.to_le_bytes());
        out.extend_from_slice(&self.scale.index().to_le_bytes());
        out.extend_from_slice(&self.root.to_le_bytes());
        out.extend_from_slice(&(self.dots.len() as i32).to_le_bytes());

        for dot in &self.dots {
            out.extend_from_slice(&dot.angle.to_le_bytes());
            out.extend_from_slice(&dot.ring.to_le_bytes());
            out.extend_from_slice(&(dot.color.argb() as i32).to_le_bytes());
            out.push(dot.active as u8);
        }

        out.extend_from_slice(&self.velocity.to_le_bytes());
        out.extend_from_slice(&self.gate_time_ms.to_le_bytes());
        out.push(self.reverse as u8);
        out.extend_from_slice(&self.probability.to_le_bytes());
        out.extend_from_slice(&self.velocity_variation.to_le_bytes());
        out.extend_from_slice(&self.swing.to_le_bytes());

        out
    }

    /// Strict decode. The leading fields and dots must be complete; the
    /// trailing parameter block may end at any field.
    pub fn try_from_bytes(bytes: &[u8]) -> Result<Self, StateError> {
        let mut state = Self::default();
        decode_into(bytes, &mut state)?;
        Ok(state)
    }

    /// Lenient decode: never fails. Whatever could be read is kept and
    /// every other field keeps its default.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut state = Self::default();
        if let Err(err) = decode_into(bytes, &mut state) {
            log::warn!("restoring partial state: {err}");
        }
        state
    }
}

fn decode_into(bytes: &[u8], state: &mut PersistedState) -> Result<(), StateError> {
    let mut reader = Reader::new(bytes);

    state.speed = reader.f32("speed")?;
    state.scale = ScaleType::from_index(reader.i32("scale")?);
    state.root = reader.i32("root")?;

    let count = reader.i32("dot count")?;
    let remaining = reader.remaining();
    if count < 0 || count as usize > remaining / DOT_SIZE {
        return Err(StateError::InvalidDotCount { count, remaining });
    }

    state.dots.reserve((count as usize).min(MAX_DOTS));
    for _ in 0..count {
        let angle = reader.f32("dot angle")?;
        let ring = reader.i32("dot ring")?;
        let color = Color(reader.i32("dot color")? as u32);
        let active = reader.bool("dot active")?;

        if state.dots.len() < MAX_DOTS {
            let mut dot = Dot::new(angle, ring, color);
            dot.active = active;
            state.dots.push(dot);
        }
    }
    if count as usize > MAX_DOTS {
        log::warn!("state holds {count} dots, keeping the first {MAX_DOTS}");
    }

    // Optional trailing block.
    let Ok(velocity) = reader.i32("velocity") else {
        return Ok(());
    };
    state.velocity = velocity;
    let Ok(gate) = reader.f32("gate time") else {
        return Ok(());
    };
    state.gate_time_ms = gate;
    let Ok(reverse) = reader.bool("reverse") else {
        return Ok(());
    };
    state.reverse = reverse;
    let Ok(probability) = reader.f32("probability") else {
        return Ok(());
    };
    state.probability = probability;
    let Ok(variation) = reader.f32("velocity variation") else {
        return Ok(());
    };
    state.velocity_variation = variation;
    let Ok(swing) = reader.f32("swing") else {
        return Ok(());
    };
    state.swing = swing;

    Ok(())
}

struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    fn remaining(&self) -> usize {
        self.bytes.len()
    }

    fn take<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], StateError> {
        let (head, rest) = self
            .bytes
            .split_first_chunk::<N>()
            .ok_or(StateError::Truncated { field })?;
        self.bytes = rest;
        Ok(*head)
    }

    fn f32(&mut self, field: &'static str) -> Result<f32, StateError> {
        self.take::<4>(field).map(f32::from_le_bytes)
    }

    fn i32(&mut self, field: &'static str) -> Result<i32, StateError> {
        self.take::<4>(field).map(i32::from_le_bytes)
    }

    fn bool(&mut self, field: &'static str) -> Result<bool, StateError> {
        self.take::<1>(field).map(|[b]| b != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> PersistedState {
        let mut muted = Dot::new(90.0, 2, Color(0xff00_ff00));
        muted.active = false;
        PersistedState {
            speed: 2.0,
            scale: ScaleType::Dorian,
            root: 7,
            dots: vec![Dot::new(0.0, 0, Color::ORANGE), muted],
            velocity: 80,
            gate_time_ms: 250.0,
            reverse: true,
            probability: 75.0,
            velocity_variation: 20.0,
            swing: 66.0,
        }
    }

    /// Blob as written before the parameter block existed.
    fn legacy_blob() -> Vec<u8> {
        let mut blob = Vec::new();
        blob.extend_from_slice(&1.5f32.to_le_bytes());
        blob.extend_from_slice(&ScaleType::Major.index().to_le_bytes());
        blob.extend_from_slice(&3i32.to_le_bytes());
        blob.extend_from_slice(&1i32.to_le_bytes());
        blob.extend_from_slice(&45.0f32.to_le_bytes());
        blob.extend_from_slice(&4i32.to_le_bytes());
        blob.extend_from_slice(&(0xffff_6b35u32 as i32).to_le_bytes());
        blob.push(1);
        blob
    }

    #[test]
    fn test_extra_dots_are_dropped_on_load() {
        let state = PersistedState {
            dots: (0..MAX_DOTS + 10)
                .map(|i| Dot::new(i as f32, 0, Color::ORANGE))
                .collect(),
            ..sample_state()
        };
        let loaded = PersistedState::try_from_bytes(&state.to_bytes()).unwrap();
        assert_eq!(loaded.dots.len(), MAX_DOTS);
        assert_eq!(loaded.dots[..], state.dots[..MAX_DOTS]);
        // The parameter block after the skipped dots still loads.
        assert_eq!(loaded.swing, 66.0);
    }

    #[test]
    fn test_save_and_load() {
        let state = sample_state();
        let bytes = state.to_bytes();
        assert_eq!(bytes.len(), 16 + 2 * DOT_SIZE + 21);
        assert_eq!(PersistedState::try_from_bytes(&bytes), Ok(state));
    }

    #[test]
    fn test_legacy_blob_uses_parameter_defaults() {
        let state = PersistedState::try_from_bytes(&legacy_blob()).unwrap();
        assert_eq!(state.speed, 1.5);
        assert_eq!(state.scale, ScaleType::Major);
        assert_eq!(state.root, 3);
        assert_eq!(state.dots.len(), 1);
        assert_eq!(state.dots[0].ring, 4);
        assert_eq!(state.dots[0].color, Color::ORANGE);

        assert_eq!(state.velocity, 100);
        assert_eq!(state.gate_time_ms, 100.0);
        assert_eq!(state.probability, 100.0);
        assert_eq!(state.velocity_variation, 0.0);
        assert_eq!(state.swing, 0.0);
        assert!(!state.reverse);
    }

    #[test]
    fn test_partial_trailing_block() {
        let mut blob = legacy_blob();
        blob.extend_from_slice(&64i32.to_le_bytes());
        blob.extend_from_slice(&300.0f32.to_le_bytes());
        // half a reverse flag is impossible; stop after gate
        let state = PersistedState::try_from_bytes(&blob).unwrap();
        assert_eq!(state.velocity, 64);
        assert_eq!(state.gate_time_ms, 300.0);
        assert_eq!(state.probability, 100.0);
    }

    #[test]
    fn test_truncated_head_is_an_error() {
        let blob = 1.0f32.to_le_bytes();
        assert_eq!(
            PersistedState::try_from_bytes(&blob),
            Err(StateError::Truncated { field: "scale" })
        );
        // Lenient path keeps what it read.
        let state = PersistedState::from_bytes(&blob);
        assert_eq!(state.speed, 1.0);
        assert_eq!(state.scale, ScaleType::Pentatonic);
    }

    #[test]
    fn test_bogus_dot_count() {
        let mut blob = Vec::new();
        blob.extend_from_slice(&1.0f32.to_le_bytes());
        blob.extend_from_slice(&0i32.to_le_bytes());
        blob.extend_from_slice(&0i32.to_le_bytes());
        blob.extend_from_slice(&1_000_000i32.to_le_bytes());

        assert!(matches!(
            PersistedState::try_from_bytes(&blob),
            Err(StateError::InvalidDotCount { count: 1_000_000, .. })
        ));
        assert!(PersistedState::from_bytes(&blob).dots.is_empty());
    }

    #[test]
    fn test_unknown_scale_falls_back() {
        let mut bytes = sample_state().to_bytes();
        bytes[4..8].copy_from_slice(&99i32.to_le_bytes());
        let state = PersistedState::from_bytes(&bytes);
        assert_eq!(state.scale, ScaleType::Pentatonic);
    }

    #[test]
    fn test_empty_blob_is_default() {
        assert_eq!(PersistedState::from_bytes(&[]), PersistedState::default());
    }
}
