//! Butterworth low-pass design and zero-phase (forward-backward) filtering.
//!
//! Design follows the classic analog-prototype route: Butterworth poles on
//! the unit circle, frequency prewarping, low-pass scaling, bilinear
//! transform, then expansion into transfer-function coefficients.
//! Filtering runs a Direct Form II Transposed IIR forward and backward over
//! an odd-extended signal, starting both passes from the steady-state
//! initial conditions, so the result has no group delay and no edge step.

use std::f64::consts::PI;

use rustfft::num_complex::Complex;

/// IIR filter in transfer-function form, normalized so `a[0] == 1`
#[derive(Debug, Clone)]
pub struct IirFilter {
    b: Vec<f64>,
    a: Vec<f64>,
}

impl IirFilter {
    /// Digital Butterworth low-pass of `order` with `cutoff` normalized to
    /// Nyquist (0 < cutoff < 1).
    pub fn butterworth_lowpass(order: usize, cutoff: f64) -> Self {
        debug_assert!(order > 0 && cutoff > 0.0 && cutoff < 1.0);
        let n = order as f64;

        // Analog prototype poles, left half-plane
        let prototype = (0..order).map(|k| {
            let m = -(order as f64) + 1.0 + 2.0 * k as f64;
            -Complex::from_polar(1.0, PI * m / (2.0 * n))
        });

        // Prewarp for the bilinear transform (sample rate 2 = Nyquist units)
        let fs = 2.0;
        let warped = 2.0 * fs * (PI * cutoff / fs).tan();
        let analog: Vec<Complex<f64>> = prototype.map(|p| p * warped).collect();
        let analog_gain = warped.powi(order as i32);

        // Bilinear transform: zeros at infinity map to z = -1
        let fs2 = Complex::new(2.0 * fs, 0.0);
        let digital: Vec<Complex<f64>> = analog.iter().map(|&p| (fs2 + p) / (fs2 - p)).collect();
        let denom: Complex<f64> = analog.iter().map(|&p| fs2 - p).product();
        let gain = analog_gain * (Complex::new(1.0, 0.0) / denom).re;

        let b = binomial_row(order).into_iter().map(|c| c * gain).collect();
        let a = poly(&digital).into_iter().map(|c| c.re).collect();
        Self { b, a }
    }

    pub fn b(&self) -> &[f64] {
        &self.b
    }

    pub fn a(&self) -> &[f64] {
        &self.a
    }

    fn order(&self) -> usize {
        self.a.len().max(self.b.len()) - 1
    }

    /// Steady-state state vector for a unit step input
    pub fn steady_state(&self) -> Vec<f64> {
        let n = self.order();
        let (b, a) = (&self.b, &self.a);
        let mut zi = vec![0.0; n];
        if n == 0 {
            return zi;
        }
        let b_sum: f64 = (1..=n).map(|k| b[k] - a[k] * b[0]).sum();
        zi[0] = b_sum / a.iter().sum::<f64>();
        let mut asum = 1.0;
        let mut csum = 0.0;
        for k in 1..n {
            asum += a[k];
            csum += b[k] - a[k] * b[0];
            zi[k] = asum * zi[0] - csum;
        }
        zi
    }

    /// Run the filter over `x` from state `z` (Direct Form II Transposed)
    pub fn run(&self, x: &[f64], mut z: Vec<f64>) -> Vec<f64> {
        let n = self.order();
        let (b, a) = (&self.b, &self.a);
        x.iter()
            .map(|&input| {
                let y = b[0] * input + z.first().copied().unwrap_or(0.0);
                for i in 0..n {
                    let next = if i + 1 < n { z[i + 1] } else { 0.0 };
                    z[i] = b[i + 1] * input + next - a[i + 1] * y;
                }
                y
            })
            .collect()
    }

    /// Zero-phase filtering: forward pass, backward pass, odd-extended edges
    pub fn filtfilt(&self, x: &[f64]) -> Vec<f64> {
        if x.len() < 2 {
            return x.to_vec();
        }
        let padlen = (3 * (self.order() + 1)).min(x.len() - 1);
        let ext = odd_extend(x, padlen);
        let zi = self.steady_state();

        let scaled = |x0: f64| zi.iter().map(|z| z * x0).collect::<Vec<f64>>();
        let mut forward = self.run(&ext, scaled(ext[0]));
        forward.reverse();
        let mut backward = self.run(&forward, scaled(forward[0]));
        backward.reverse();

        backward[padlen..backward.len() - padlen].to_vec()
    }
}

/// Odd extension by `padlen` samples at both ends (point-symmetric about the
/// end samples)
fn odd_extend(x: &[f64], padlen: usize) -> Vec<f64> {
    let len = x.len();
    let (first, last) = (x[0], x[len - 1]);
    let mut ext = Vec::with_capacity(len + 2 * padlen);
    ext.extend((1..=padlen).rev().map(|i| 2.0 * first - x[i]));
    ext.extend_from_slice(x);
    ext.extend((1..=padlen).map(|i| 2.0 * last - x[len - 1 - i]));
    ext
}

/// Coefficients of (1 + z⁻¹)^n
fn binomial_row(n: usize) -> Vec<f64> {
    let mut row = vec![1.0];
    for _ in 0..n {
        let mut next = vec![1.0; row.len() + 1];
        for i in 1..row.len() {
            next[i] = row[i - 1] + row[i];
        }
        row = next;
    }
    row
}

/// Polynomial coefficients (highest power first) with the given roots
fn poly(roots: &[Complex<f64>]) -> Vec<Complex<f64>> {
    let mut coeffs = vec![Complex::new(1.0, 0.0)];
    for &r in roots {
        let mut next = vec![Complex::new(0.0, 0.0); coeffs.len() + 1];
        for (i, &c) in coeffs.iter().enumerate() {
            next[i] += c;
            next[i + 1] -= c * r;
        }
        coeffs = next;
    }
    coeffs
}
