//! Perceptually weighted loudness of a waveform.
//!
//! The magnitude spectrum of one table cycle is weighted with the dB(B)
//! curve and summed over positive frequencies. A frequency multiplier maps
//! the table's own bin frequencies onto the pitch the table is meant to be
//! heard at, so tables can be levelled independently of the note played.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// dB(B) weighting curve at `frequency` Hz (closed form, no learned parameters).
pub fn perceptual_weight(frequency: f64) -> f64 {
    let f2 = frequency * frequency;
    let num = 12200.0f64.powi(2) * frequency.powi(3);
    let den = (f2 + 20.6f64.powi(2)) * (f2 + 12200.0f64.powi(2)) * (f2 + 158.5f64.powi(2)).sqrt();
    num / den
}

/// Frequency of FFT bin `k` for an `n`-point transform at `sample_rate` Hz,
/// negative for the upper half of the spectrum.
pub fn bin_frequency(k: usize, n: usize, sample_rate: f64) -> f64 {
    let signed = if k < n.div_ceil(2) {
        k as f64
    } else {
        k as f64 - n as f64
    };
    signed * sample_rate / n as f64
}

/// Loudness estimator, caching FFT plans across calls
pub struct LoudnessModel {
    sample_rate: f64,
    planner: FftPlanner<f64>,
    plan: Option<(usize, Arc<dyn Fft<f64>>)>,
    buffer: Vec<Complex<f64>>,
}

impl LoudnessModel {
    pub fn new(sample_rate_hz: u32) -> Self {
        Self {
            sample_rate: sample_rate_hz as f64,
            planner: FftPlanner::new(),
            plan: None,
            buffer: Vec::new(),
        }
    }

    fn fft_for(&mut self, n: usize) -> Arc<dyn Fft<f64>> {
        if let Some((size, fft)) = &self.plan {
            if *size == n {
                return Arc::clone(fft);
            }
        }
        let fft = self.planner.plan_fft_forward(n);
        self.plan = Some((n, Arc::clone(&fft)));
        fft
    }

    /// Magnitude spectrum |X_k| of `samples`
    pub fn magnitudes(&mut self, samples: &[f64]) -> Vec<f64> {
        let fft = self.fft_for(samples.len());
        self.buffer.clear();
        self.buffer
            .extend(samples.iter().map(|&s| Complex::new(s, 0.0)));
        fft.process(&mut self.buffer);
        self.buffer.iter().map(|c| c.norm()).collect()
    }

    /// Weighted loudness of `samples` heard at `frequency_multiplier` times
    /// their sample-rate-relative frequencies.
    pub fn weighted_loudness(&mut self, samples: &[f64], frequency_multiplier: f64) -> f64 {
        let n = samples.len();
        if n == 0 {
            return 0.0;
        }
        let magnitudes = self.magnitudes(samples);
        magnitudes
            .iter()
            .enumerate()
            .map(|(k, &mag)| (bin_frequency(k, n, self.sample_rate), mag))
            .filter(|&(freq, _)| freq > 0.0)
            .map(|(freq, mag)| perceptual_weight(freq * frequency_multiplier) * mag)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::TAU;

    #[test]
    fn test_weight_curve_shape() {
        assert_eq!(perceptual_weight(0.0), 0.0);
        // Close to unity around 1 kHz, rolling off at both ends
        let w1k = perceptual_weight(1000.0);
        assert!(w1k > 0.9 && w1k < 1.1, "w(1k) = {w1k}");
        assert!(perceptual_weight(50.0) < w1k);
        assert!(perceptual_weight(18_000.0) < w1k);
    }

    #[test]
    fn test_bin_frequencies_follow_fftfreq() {
        // n = 4 at 4 Hz: [0, 1, -2, -1]
        let freqs: Vec<f64> = (0..4).map(|k| bin_frequency(k, 4, 4.0)).collect();
        assert_eq!(freqs, vec![0.0, 1.0, -2.0, -1.0]);
        // n = 5: [0, 1, 2, -2, -1]
        let freqs: Vec<f64> = (0..5).map(|k| bin_frequency(k, 5, 5.0)).collect();
        assert_eq!(freqs, vec![0.0, 1.0, 2.0, -2.0, -1.0]);
    }

    #[test]
    fn test_single_sinusoid() {
        let n = 2205;
        let sample_rate = 44_100;
        let cycles = 3;
        let samples: Vec<f64> = (0..n)
            .map(|i| (TAU * cycles as f64 * i as f64 / n as f64).sin())
            .collect();

        let mut model = LoudnessModel::new(sample_rate);
        let loudness = model.weighted_loudness(&samples, 13.15);

        // All energy in bin 3 (60 Hz), magnitude n/2
        let expected = perceptual_weight(60.0 * 13.15) * n as f64 / 2.0;
        assert_relative_eq!(loudness, expected, max_relative = 1e-6);
    }

    #[test]
    fn test_loudness_is_linear_in_amplitude() {
        let samples: Vec<f64> = (0..512).map(|i| ((i * 7) % 13) as f64 - 6.0).collect();
        let doubled: Vec<f64> = samples.iter().map(|s| s * 2.0).collect();
        let mut model = LoudnessModel::new(44_100);
        let a = model.weighted_loudness(&samples, 1.0);
        let b = model.weighted_loudness(&doubled, 1.0);
        assert_relative_eq!(b, 2.0 * a, max_relative = 1e-9);
    }

    #[test]
    fn test_dc_is_ignored() {
        let mut model = LoudnessModel::new(44_100);
        assert_relative_eq!(model.weighted_loudness(&[0.5; 64], 1.0), 0.0, epsilon = 1e-9);
        assert_eq!(model.weighted_loudness(&[], 1.0), 0.0);
    }
}
