//! Covariance conditioning and path sampling parameters.

use crate::error::{Error, Result};

/// Wavetable generation configuration
///
/// Replaces the process-wide continuity switch: the flag travels with each
/// generation request instead of being read from shared state.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Condition non-periodic kernels on zero at both table ends (seamless loop)
    pub enforce_continuity: bool,

    /// Sample over sin-warped positions instead of the raw angle
    pub waveshaping: bool,

    /// Number of wavetables drawn per kernel
    pub n_wavetables: usize,

    /// First jitter as a fraction of the mean covariance diagonal
    pub base_jitter_scale: f64,

    /// Jitter escalations (x10 each) before giving up
    pub max_jitter_attempts: usize,

    /// Divisor applied after standardizing a draw (dimensionless)
    pub headroom: f64,

    /// Weighted loudness every accepted table is scaled to
    pub target_loudness: f64,

    /// Playback frequency the loudness is evaluated at (Hz)
    /// 263 Hz ≈ middle C
    pub loudness_reference_hz: f64,

    /// Draws with a peak at or above this are rejected
    pub peak_ceiling: f64,

    /// Rejection loop retry ceiling
    pub max_draw_attempts: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            enforce_continuity: true,
            waveshaping: false,
            n_wavetables: 17,
            base_jitter_scale: 1e-6,
            max_jitter_attempts: 10,
            headroom: 10.0,
            target_loudness: 300.0,
            loudness_reference_hz: 263.0,
            peak_ceiling: 0.9,
            max_draw_attempts: 1000,
        }
    }
}

impl GenerationConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.n_wavetables == 0 {
            return Err(Error::InvalidConfig(
                "At least one wavetable must be generated".to_string(),
            ));
        }
        if !(self.base_jitter_scale > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "Base jitter scale must be > 0, got {}",
                self.base_jitter_scale
            )));
        }
        if !(self.headroom > 0.0) || !(self.target_loudness > 0.0) {
            return Err(Error::InvalidConfig(
                "Headroom and target loudness must be > 0".to_string(),
            ));
        }
        if !(self.loudness_reference_hz > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "Loudness reference must be > 0 Hz, got {}",
                self.loudness_reference_hz
            )));
        }
        if !(self.peak_ceiling > 0.0 && self.peak_ceiling <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "Peak ceiling must be in (0, 1], got {}",
                self.peak_ceiling
            )));
        }
        if self.max_draw_attempts == 0 {
            return Err(Error::InvalidConfig(
                "Draw retry ceiling must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
