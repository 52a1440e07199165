//! gpsynth library - Gaussian-process wavetable synthesis
//!
//! Wavetables are single-cycle waveforms drawn as sample paths of a GP prior
//! over one period, conditioned so the loop closes, then levelled to a common
//! perceptual loudness and played back band-limited per note.

pub mod audio;
pub mod covariance;
pub mod error;
pub mod kernel;
pub mod loudness;
pub mod params;
pub mod sampler;
pub mod synth;

pub use error::{Error, Result};
pub use kernel::{kernel_for_name, Kernel};
pub use synth::{make_wavetables, pitch_frequency, NoteEvent, WavetableSynth};
