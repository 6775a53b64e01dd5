use crate::state::ParamId;

/// Speed presets offered by the speed selector.
pub const SPEED_PRESETS: [f32; 5] = [0.25, 0.5, 1.0, 2.0, 4.0];

/// Return the preset following `speed`, wrapping after the last one.
pub fn next_speed_preset(speed: f32) -> f32 {
    let next = SPEED_PRESETS
        .iter()
        .position(|&preset| preset > speed + 1e-6)
        .unwrap_or(0);
    SPEED_PRESETS[next]
}

/// Engine parameters.
///
/// Every mutation goes through a checked setter that clamps to the
/// parameter's range, so readers never see an out-of-domain value.
/// The engine reads these once per block.
#[derive(Debug, Clone, PartialEq)]
pub struct Params {
    speed: f32,
    tempo: f32,
    gate_time_ms: f32,
    velocity: u8,
    probability: f32,
    velocity_variation: f32,
    swing: f32,

    pub reverse: bool,
    pub motor_running: bool,

    /// Standalone play state; host play state is OR-ed in per block.
    pub playing: bool,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            speed: ParamId::Speed.info().default,
            tempo: ParamId::Tempo.info().default,
            gate_time_ms: ParamId::GateTime.info().default,
            velocity: ParamId::Velocity.info().default as u8,
            probability: ParamId::Probability.info().default,
            velocity_variation: ParamId::VelocityVariation.info().default,
            swing: ParamId::Swing.info().default,
            reverse: false,
            motor_running: true,
            playing: false,
        }
    }
}

impl Params {
    /// Set a parameter, clamping to its valid range.
    pub fn set(&mut self, param: ParamId, value: f32) {
        let value = param.info().clamp(value);
        match param {
            ParamId::Speed => self.speed = value,
            ParamId::Tempo => self.tempo = value,
            ParamId::GateTime => self.gate_time_ms = value,
            ParamId::Velocity => self.velocity = value as u8,
            ParamId::Probability => self.probability = value,
            ParamId::VelocityVariation => self.velocity_variation = value,
            ParamId::Swing => self.swing = value,
        }
    }

    pub fn get(&self, param: ParamId) -> f32 {
        match param {
            ParamId::Speed => self.speed,
            ParamId::Tempo => self.tempo,
            ParamId::GateTime => self.gate_time_ms,
            ParamId::Velocity => self.velocity as f32,
            ParamId::Probability => self.probability,
            ParamId::VelocityVariation => self.velocity_variation,
            ParamId::Swing => self.swing,
        }
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Standalone tempo in BPM.
    #[inline]
    pub fn tempo(&self) -> f32 {
        self.tempo
    }

    #[inline]
    pub fn gate_time_ms(&self) -> f32 {
        self.gate_time_ms
    }

    #[inline]
    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    #[inline]
    pub fn probability(&self) -> f32 {
        self.probability
    }

    #[inline]
    pub fn velocity_variation(&self) -> f32 {
        self.velocity_variation
    }

    #[inline]
    pub fn swing(&self) -> f32 {
        self.swing
    }
}
