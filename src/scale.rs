// src/scale.rs
//
// Scale tables and ring -> MIDI note mapping.

/// MIDI note used when a ring has no note in the current scale.
pub const FALLBACK_NOTE: u8 = 60;

/// Octave the scale is built in (`root + BASE_OCTAVE * 12`).
const BASE_OCTAVE: i32 = 4;

const MAX_RINGS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleType {
    Major,
    Minor,
    HarmonicMinor,
    MelodicMinor,
    #[default]
    Pentatonic,
    PentatonicMinor,
    Blues,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Locrian,
    Chromatic,
}

impl ScaleType {
    /// All scales, in persisted index order.
    pub const ALL: [ScaleType; 13] = [
        Self::Major,
        Self::Minor,
        Self::HarmonicMinor,
        Self::MelodicMinor,
        Self::Pentatonic,
        Self::PentatonicMinor,
        Self::Blues,
        Self::Dorian,
        Self::Phrygian,
        Self::Lydian,
        Self::Mixolydian,
        Self::Locrian,
        Self::Chromatic,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Major => "Major",
            Self::Minor => "Minor",
            Self::HarmonicMinor => "Harmonic Minor",
            Self::MelodicMinor => "Melodic Minor",
            Self::Pentatonic => "Pentatonic",
            Self::PentatonicMinor => "Pentatonic Minor",
            Self::Blues => "Blues",
            Self::Dorian => "Dorian",
            Self::Phrygian => "Phrygian",
            Self::Lydian => "Lydian",
            Self::Mixolydian => "Mixolydian",
            Self::Locrian => "Locrian",
            Self::Chromatic => "Chromatic",
        }
    }

    /// Semitone intervals from the root, ascending, terminated by the octave (12).
    pub fn intervals(self) -> &'static [u8] {
        match self {
            Self::Major => &[0, 2, 4, 5, 7, 9, 11, 12],
            Self::Minor => &[0, 2, 3, 5, 7, 8, 10, 12],
            Self::HarmonicMinor => &[0, 2, 3, 5, 7, 8, 11, 12],
            Self::MelodicMinor => &[0, 2, 3, 5, 7, 9, 11, 12],
            Self::Pentatonic => &[0, 2, 4, 7, 9, 12],
            Self::PentatonicMinor => &[0, 3, 5, 7, 10, 12],
            Self::Blues => &[0, 3, 5, 6, 7, 10, 12],
            Self::Dorian => &[0, 2, 3, 5, 7, 9, 10, 12],
            Self::Phrygian => &[0, 1, 3, 5, 7, 8, 10, 12],
            Self::Lydian => &[0, 2, 4, 6, 7, 9, 11, 12],
            Self::Mixolydian => &[0, 2, 4, 5, 7, 9, 10, 12],
            Self::Locrian => &[0, 1, 3, 5, 6, 8, 10, 12],
            Self::Chromatic => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12],
        }
    }

    /// Index used by the persisted state blob.
    pub fn index(self) -> i32 {
        Self::ALL.iter().position(|&s| s == self).unwrap_or(0) as i32
    }

    /// Unknown indices map to the default scale.
    pub fn from_index(index: i32) -> Self {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .unwrap_or_default()
    }
}

/// Resolves ring indices to MIDI notes for the active scale, key and octave.
///
/// The note table is rebuilt only when the scale or root changes, so
/// `ring_to_note` is a bounds check and a lookup.
#[derive(Debug, Clone)]
pub struct ScaleEngine {
    scale: ScaleType,
    root: u8,
    octave_shift: i8,
    notes: [u8; MAX_RINGS],
    len: usize,
}

impl Default for ScaleEngine {
    fn default() -> Self {
        Self::new(ScaleType::default(), 0, 0)
    }
}

impl ScaleEngine {
    pub fn new(scale: ScaleType, root: u8, octave_shift: i8) -> Self {
        let mut engine = Self {
            scale,
            root: root.min(11),
            octave_shift: octave_shift.clamp(-2, 2),
            notes: [0; MAX_RINGS],
            len: 0,
        };
        engine.rebuild();
        engine
    }

    fn rebuild(&mut self) {
        let base = self.root as i32 + BASE_OCTAVE * 12;
        self.len = 0;
        for &interval in self.scale.intervals() {
            if interval == 12 {
                continue;
            }
            self.notes[self.len] = (base + interval as i32) as u8;
            self.len += 1;
        }
    }

    pub fn set_scale(&mut self, scale: ScaleType) {
        self.scale = scale;
        self.rebuild();
    }

    /// Root note as pitch class, clamped to 0 (C) ..= 11 (B).
    pub fn set_root(&mut self, root: i32) {
        self.root = root.clamp(0, 11) as u8;
        self.rebuild();
    }

    /// Octave shift clamped to -2 ..= +2.
    pub fn set_octave_shift(&mut self, shift: i32) {
        self.octave_shift = shift.clamp(-2, 2) as i8;
    }

    pub fn scale(&self) -> ScaleType {
        self.scale
    }

    pub fn root(&self) -> u8 {
        self.root
    }

    pub fn octave_shift(&self) -> i8 {
        self.octave_shift
    }

    /// Number of rings (one per scale degree).
    pub fn num_rings(&self) -> usize {
        self.len
    }

    /// The unshifted notes of the current scale, one per ring.
    pub fn notes(&self) -> &[u8] {
        &self.notes[..self.len]
    }

    /// MIDI note for a ring, or [`FALLBACK_NOTE`] if the ring is out of range.
    #[inline]
    pub fn ring_to_note(&self, ring: i32) -> u8 {
        match usize::try_from(ring).ok().filter(|&r| r < self.len) {
            Some(r) => {
                let note = self.notes[r] as i32 + self.octave_shift as i32 * 12;
                note.clamp(0, 127) as u8
            }
            None => FALLBACK_NOTE,
        }
    }
}
