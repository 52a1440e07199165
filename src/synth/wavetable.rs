//! Wavetables and the round-robin bank a synth plays from.

use crate::error::{Error, Result};

/// One loop-ready waveform cycle, samples in [-1, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct Wavetable {
    samples: Vec<f64>,
}

impl Wavetable {
    pub fn new(samples: Vec<f64>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn peak(&self) -> f64 {
        crate::sampler::peak(&self.samples)
    }

    /// Samples as f32, for audio sinks
    pub fn to_pcm(&self) -> Vec<f32> {
        self.samples.iter().map(|&s| s as f32).collect()
    }
}

/// Ordered wavetables with a round-robin read cursor
#[derive(Debug, Clone)]
pub struct WavetableBank {
    tables: Vec<Wavetable>,
    cursor: usize,
}

impl WavetableBank {
    pub fn new(tables: Vec<Wavetable>) -> Result<Self> {
        if tables.is_empty() || tables.iter().any(Wavetable::is_empty) {
            return Err(Error::EmptyBank);
        }
        Ok(Self { tables, cursor: 0 })
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Index the next call to [`Self::next_table`] reads
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn tables(&self) -> &[Wavetable] {
        &self.tables
    }

    /// Table at the cursor; the cursor moves on by one (mod bank size)
    pub fn next_table(&mut self) -> &Wavetable {
        let index = self.cursor;
        self.cursor = (self.cursor + 1) % self.tables.len();
        &self.tables[index]
    }
}
