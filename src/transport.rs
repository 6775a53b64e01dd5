//
// ===============================
// MARK: Host transport (block-local input)
// ===============================
//

/// Host-provided timing for one audio block.
///
/// This struct:
/// - is real-time safe
/// - is copyable
/// - is read-only for the duration of a block
#[derive(Debug, Copy, Clone)]
pub struct Transport {
    /// Sample rate (Hz)
    pub sample_rate: f64,

    /// Host tempo, if the host provides one.
    pub bpm: Option<f64>,

    /// Host play state.
    pub playing: bool,
}

impl Default for Transport {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            bpm: None,
            playing: false,
        }
    }
}

impl Transport {
    /// Transport for running without a host: tempo and play state come
    /// from the engine's standalone parameters.
    pub fn standalone(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            bpm: None,
            playing: false,
        }
    }

    pub fn with_host(sample_rate: f64, bpm: f64, playing: bool) -> Self {
        Self {
            sample_rate,
            bpm: Some(bpm),
            playing,
        }
    }

    /// Host tempo if present and sane, otherwise the standalone tempo.
    #[inline]
    pub fn resolve_bpm(&self, standalone_bpm: f64) -> f64 {
        match self.bpm {
            Some(bpm) if bpm.is_finite() && bpm > 0.0 => bpm,
            _ => standalone_bpm,
        }
    }

    /// Host play state forces playback on; otherwise the standalone flag decides.
    #[inline]
    pub fn resolve_playing(&self, standalone_playing: bool) -> bool {
        self.playing || standalone_playing
    }

    // -------------------------------
    // MARK: Sample-domain conversions
    // -------------------------------

    #[inline]
    pub fn ms_to_samples(&self, ms: f64) -> u64 {
        (self.sample_rate * ms / 1000.0).max(0.0) as u64
    }

    #[inline]
    pub fn samples_to_ms(&self, samples: u64) -> f64 {
        samples as f64 * 1000.0 / self.sample_rate
    }

    /// Duration of a 16th note in samples at `bpm`.
    #[inline]
    pub fn sixteenth_samples(&self, bpm: f64) -> f64 {
        let seconds_per_beat = 60.0 / bpm;
        seconds_per_beat / 4.0 * self.sample_rate
    }
}
