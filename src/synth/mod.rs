//! Wavetable generation and note rendering.
//!
//! A [`WavetableSynth`] owns a bank of GP-sampled wavetables and renders
//! notes from them: the next table in round-robin order is anti-alias
//! filtered for the note's pitch, played back through a truncating phase
//! accumulator, and shaped with linear fades.

mod filter;
mod wavetable;

use std::fs;
use std::path::Path;

use log::info;
use rand::Rng;

pub use filter::IirFilter;
pub use wavetable::{Wavetable, WavetableBank};

use crate::audio::{write_wav, AudioSink};
use crate::covariance::CovarianceBuilder;
use crate::error::{Error, Result};
use crate::kernel::Kernel;
use crate::params::{audio_constants, GenerationConfig, SynthParams};
use crate::sampler::PathSampler;

/// Frequency (Hz) of a MIDI pitch, 12-tone equal temperament, A4 = 440 Hz.
/// Fractional pitches are allowed.
pub fn pitch_frequency(midi: f64) -> f64 {
    audio_constants::A4_HZ * 2f64.powf((midi - audio_constants::A4_MIDI) / 12.0)
}

/// A note to render: MIDI pitch and duration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    pub pitch: f64,
    pub duration_secs: f64,
}

impl NoteEvent {
    pub fn new(pitch: f64, duration_secs: f64) -> Self {
        Self {
            pitch,
            duration_secs,
        }
    }

    /// Check the note is playable at `params` and return its frequency (Hz).
    ///
    /// The pitch must be finite with a frequency in (0, Nyquist); the duration
    /// finite and non-negative.
    pub fn validate(&self, params: &SynthParams) -> Result<f64> {
        let frequency = pitch_frequency(self.pitch);
        if !self.pitch.is_finite() || !(frequency > 0.0 && frequency < params.nyquist_hz()) {
            return Err(Error::InvalidParameter {
                name: "pitch",
                value: self.pitch,
            });
        }
        if !(self.duration_secs.is_finite() && self.duration_secs >= 0.0) {
            return Err(Error::InvalidParameter {
                name: "duration",
                value: self.duration_secs,
            });
        }
        Ok(frequency)
    }
}

/// Draw `config.n_wavetables` tables for `kernel`, sharing one factorization
pub fn make_wavetables<R: Rng + ?Sized>(
    kernel: &Kernel,
    config: &GenerationConfig,
    params: &SynthParams,
    rng: &mut R,
) -> Result<Vec<Wavetable>> {
    config.validate()?;
    params.validate()?;

    let factor = CovarianceBuilder::new(kernel, config, params).factor()?;
    let mut sampler = PathSampler::new(config, params);
    let tables = (0..config.n_wavetables)
        .map(|_| sampler.draw(&factor, rng))
        .collect::<Result<Vec<_>>>()?;

    info!(
        "Generated {} wavetable(s) of {} samples for {} (jitter {:e})",
        tables.len(),
        tables.first().map_or(0, Wavetable::len),
        factor.kernel(),
        factor.jitter()
    );
    Ok(tables)
}

/// Low-pass `table` for playback at `frequency` Hz.
///
/// The table is tiled three times so the zero-phase filter sees a full
/// cycle of context on both sides, and the middle cycle is kept. A cutoff
/// at or above Nyquist leaves the table untouched.
fn antialias(params: &SynthParams, table: &Wavetable, frequency: f64) -> Vec<f64> {
    let cutoff = params.cutoff_scale_hz * params.table_base_hz / frequency;
    let normalized = cutoff / params.nyquist_hz();
    if !(normalized < 1.0) {
        return table.samples().to_vec();
    }

    let n = table.len();
    let tiled = table.samples().repeat(3);
    let filter = IirFilter::butterworth_lowpass(params.filter_order, normalized);
    let filtered = filter.filtfilt(&tiled);
    filtered[n..2 * n].to_vec()
}

/// Wavetable synthesizer with a round-robin bank
pub struct WavetableSynth {
    bank: WavetableBank,
    params: SynthParams,
}

impl WavetableSynth {
    pub fn new(bank: WavetableBank, params: SynthParams) -> Self {
        Self { bank, params }
    }

    /// Generate a bank from `kernel` and wrap it in a synth
    pub fn from_kernel<R: Rng + ?Sized>(
        kernel: &Kernel,
        config: &GenerationConfig,
        params: SynthParams,
        rng: &mut R,
    ) -> Result<Self> {
        let tables = make_wavetables(kernel, config, &params, rng)?;
        Ok(Self::new(WavetableBank::new(tables)?, params))
    }

    pub fn bank(&self) -> &WavetableBank {
        &self.bank
    }

    pub fn params(&self) -> &SynthParams {
        &self.params
    }

    /// Render a note from the next table in the bank.
    ///
    /// Unplayable notes are rejected before the bank cursor moves.
    pub fn note(&mut self, pitch: f64, duration_secs: f64) -> Result<Vec<f32>> {
        let frequency = NoteEvent::new(pitch, duration_secs).validate(&self.params)?;
        let table = antialias(&self.params, self.bank.next_table(), frequency);

        let len = table.len();
        let step = frequency / self.params.sample_rate_hz as f64 * len as f64;
        let total = self.params.samples_for(duration_secs);
        let fade_in = self.params.fade_in_samples;
        let fade_out = self.params.fade_out_samples;

        let mut pointer = 0.0f64;
        let mut pcm = Vec::with_capacity(total);
        for i in 0..total {
            // rem_euclid may round up to exactly len
            let mut sample = table[(pointer as usize).min(len - 1)];
            if i < fade_in {
                sample *= i as f64 / fade_in as f64;
            }
            if total - i < fade_out {
                sample *= (total - i) as f64 / fade_out as f64;
            }
            pcm.push(sample as f32);

            pointer = (pointer + step).rem_euclid(len as f64);
        }
        Ok(pcm)
    }

    /// Render a [`NoteEvent`]
    pub fn render(&mut self, event: &NoteEvent) -> Result<Vec<f32>> {
        self.note(event.pitch, event.duration_secs)
    }

    /// Render a note and hand it to `sink`
    pub fn play(&mut self, event: &NoteEvent, sink: &mut dyn AudioSink) -> Result<()> {
        let pcm = self.render(event)?;
        sink.write(&pcm)
    }

    /// Save each wavetable as `{prefix}{index:02}.wav` in `dir`
    pub fn save_wavetables(&self, dir: impl AsRef<Path>, prefix: &str) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        for (i, table) in self.bank.tables().iter().enumerate() {
            let path = dir.join(format!("{prefix}{i:02}.wav"));
            write_wav(&path, &table.to_pcm(), self.params.sample_rate_hz)?;
        }
        info!("Saved {} wavetable(s) to {}", self.bank.len(), dir.display());
        Ok(())
    }
}
