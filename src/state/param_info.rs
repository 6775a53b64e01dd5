// src/state/param_info.rs
//
// Parameter metadata for UI display and validation.

use std::fmt;

/// Identifies one of the engine's continuous parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamId {
    /// Rotation speed multiplier (1.0 = one rotation per 8 beats).
    Speed,
    /// Standalone tempo, used when the host provides none.
    Tempo,
    GateTime,
    Velocity,
    Probability,
    VelocityVariation,
    Swing,
}

impl ParamId {
    pub const ALL: [ParamId; 7] = [
        Self::Speed,
        Self::Tempo,
        Self::GateTime,
        Self::Velocity,
        Self::Probability,
        Self::VelocityVariation,
        Self::Swing,
    ];

    /// Static metadata for this parameter.
    pub fn info(self) -> &'static ParamInfo {
        &PARAMS[self as usize]
    }
}

/// Unit type for parameter display.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ParamUnit {
    #[default]
    None,
    /// Percentage (0-100)
    Percent,
    /// Milliseconds
    Ms,
    /// Beats per minute
    Bpm,
    /// Playback rate multiplier
    Multiplier,
}

impl fmt::Display for ParamUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamUnit::None => Ok(()),
            ParamUnit::Percent => write!(f, "%"),
            ParamUnit::Ms => write!(f, "ms"),
            ParamUnit::Bpm => write!(f, "BPM"),
            ParamUnit::Multiplier => write!(f, "x"),
        }
    }
}

/// Metadata describing a parameter.
///
/// Used by the UI to:
/// - Display appropriate controls (knobs, sliders, etc.)
/// - Validate input ranges
/// - Format values for display
#[derive(Debug, Clone)]
pub struct ParamInfo {
    pub id: ParamId,

    /// Human-readable name
    pub name: &'static str,

    /// Short name for compact displays
    pub short_name: &'static str,

    pub min: f32,

    pub max: f32,

    pub default: f32,

    pub unit: ParamUnit,

    /// Step size for discrete parameters (0 = continuous)
    pub step: f32,
}

// Indexed by `ParamId as usize`.
static PARAMS: [ParamInfo; 7] = [
    ParamInfo {
        id: ParamId::Speed,
        name: "Speed",
        short_name: "DIV",
        min: 0.0,
        max: 4.0,
        default: 1.0,
        unit: ParamUnit::Multiplier,
        step: 0.0,
    },
    ParamInfo {
        id: ParamId::Tempo,
        name: "Tempo",
        short_name: "TMPO",
        min: 60.0,
        max: 200.0,
        default: 120.0,
        unit: ParamUnit::Bpm,
        step: 1.0,
    },
    ParamInfo {
        id: ParamId::GateTime,
        name: "Gate",
        short_name: "GATE",
        min: 10.0,
        max: 2000.0,
        default: 100.0,
        unit: ParamUnit::Ms,
        step: 0.0,
    },
    ParamInfo {
        id: ParamId::Velocity,
        name: "Velocity",
        short_name: "VEL",
        min: 1.0,
        max: 127.0,
        default: 100.0,
        unit: ParamUnit::None,
        step: 1.0,
    },
    ParamInfo {
        id: ParamId::Probability,
        name: "Probability",
        short_name: "PROB",
        min: 0.0,
        max: 100.0,
        default: 100.0,
        unit: ParamUnit::Percent,
        step: 0.0,
    },
    ParamInfo {
        id: ParamId::VelocityVariation,
        name: "Velocity Variation",
        short_name: "VAR",
        min: 0.0,
        max: 100.0,
        default: 0.0,
        unit: ParamUnit::Percent,
        step: 0.0,
    },
    ParamInfo {
        id: ParamId::Swing,
        name: "Swing",
        short_name: "SWNG",
        min: 0.0,
        max: 100.0,
        default: 0.0,
        unit: ParamUnit::Percent,
        step: 0.0,
    },
];

impl ParamInfo {
    /// Clamp a value to the valid range, snapping discrete parameters to their step.
    ///
    /// NaN inputs resolve to the default.
    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.default;
        }
        let value = if self.step > 0.0 {
            (value / self.step).round() * self.step
        } else {
            value
        };
        value.clamp(self.min, self.max)
    }

    /// Normalize a value to 0..1 range.
    #[inline]
    pub fn normalize(&self, value: f32) -> f32 {
        (self.clamp(value) - self.min) / (self.max - self.min)
    }

    /// Denormalize a 0..1 value to the parameter range.
    #[inline]
    pub fn denormalize(&self, normalized: f32) -> f32 {
        self.clamp(self.min + normalized * (self.max - self.min))
    }

    /// Format a value for display.
    pub fn format(&self, value: f32) -> String {
        let precision = if self.step > 0.0 { 0 } else { 2 };
        if self.unit == ParamUnit::None {
            format!("{:.prec$}", value, prec = precision)
        } else {
            format!("{:.prec$} {}", value, self.unit, prec = precision)
        }
    }
}
