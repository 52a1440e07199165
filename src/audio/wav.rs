//! WAV file persistence (mono, 16-bit PCM).

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use super::AudioSink;
use crate::error::{Error, Result};

/// Float sample to 16-bit PCM, truncating toward zero
fn to_i16(sample: f32) -> i16 {
    (sample * i16::MAX as f32) as i16
}

/// Sink appending mono 16-bit samples to a WAV file
pub struct WavFileSink {
    path: PathBuf,
    writer: Option<hound::WavWriter<BufWriter<File>>>,
}

impl WavFileSink {
    /// Create (or truncate) the WAV file at `path`
    pub fn create(path: impl AsRef<Path>, sample_rate_hz: u32) -> Result<Self> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: sample_rate_hz,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let path = path.as_ref().to_path_buf();
        let writer = hound::WavWriter::create(&path, spec)?;
        Ok(Self {
            path,
            writer: Some(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AudioSink for WavFileSink {
    fn write(&mut self, samples: &[f32]) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| Error::Audio(format!("{} is closed", self.path.display())))?;
        for &sample in samples {
            writer.write_sample(to_i16(sample))?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()?;
        }
        Ok(())
    }
}

/// Write `samples` to a new WAV file in one go
pub fn write_wav(path: impl AsRef<Path>, samples: &[f32], sample_rate_hz: u32) -> Result<()> {
    let mut sink = WavFileSink::create(path, sample_rate_hz)?;
    sink.write(samples)?;
    sink.close()
}
