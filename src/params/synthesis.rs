//! Sample-rate, table geometry and note-rendering parameters.

use crate::error::{Error, Result};

/// Synthesis parameters shared by table generation and note rendering
#[derive(Debug, Clone)]
pub struct SynthParams {
    /// Output sample rate (Hz)
    pub sample_rate_hz: u32,

    /// Frequency of one table period when played back sample by sample (Hz)
    /// 20 Hz at 44.1 kHz = 2205 samples per table
    pub table_base_hz: f64,

    /// Linear fade-in length (samples)
    pub fade_in_samples: usize,

    /// Linear fade-out length (samples)
    pub fade_out_samples: usize,

    /// Anti-alias cutoff scale (Hz)
    /// Formula: fc = cutoff_scale_hz * table_base_hz / note_frequency_hz
    pub cutoff_scale_hz: f64,

    /// Butterworth low-pass order used for anti-aliasing
    pub filter_order: usize,
}

impl Default for SynthParams {
    fn default() -> Self {
        Self {
            sample_rate_hz: audio_constants::SAMPLE_RATE_HZ,
            table_base_hz: 20.0,
            fade_in_samples: 100,
            fade_out_samples: 10_000,
            cutoff_scale_hz: 20_000.0,
            filter_order: 5,
        }
    }
}

impl SynthParams {
    /// Samples per wavetable (N)
    pub fn table_size(&self) -> usize {
        (self.sample_rate_hz as f64 / self.table_base_hz) as usize
    }

    /// Nyquist frequency (Hz)
    pub fn nyquist_hz(&self) -> f64 {
        self.sample_rate_hz as f64 / 2.0
    }

    /// Total samples for a note of `duration_secs` (truncated)
    pub fn samples_for(&self, duration_secs: f64) -> usize {
        (duration_secs * self.sample_rate_hz as f64) as usize
    }

    /// Validate configuration (positive rate, table of at least a few samples, etc.)
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate_hz == 0 {
            return Err(Error::InvalidConfig("Sample rate must be > 0".to_string()));
        }
        if !(self.table_base_hz > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "Table base frequency must be > 0, got {}",
                self.table_base_hz
            )));
        }
        if self.table_size() < 4 {
            return Err(Error::InvalidConfig(format!(
                "Table size must be at least 4 samples, got {}",
                self.table_size()
            )));
        }
        if self.filter_order == 0 {
            return Err(Error::InvalidConfig("Filter order must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Audio constants (compile-time)
pub mod audio_constants {
    /// Output sample rate (Hz)
    pub const SAMPLE_RATE_HZ: u32 = 44_100;

    /// MIDI note number of the tuning reference (A4)
    pub const A4_MIDI: f64 = 69.0;

    /// Tuning reference frequency (Hz)
    pub const A4_HZ: f64 = 440.0;
}
