//! Error types for gpsynth.

use thiserror::Error;

/// Result type alias for gpsynth operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while generating wavetables or rendering notes.
///
/// Every error is local to one kernel / parameter / draw unit.
#[derive(Debug, Error)]
pub enum Error {
    /// Kernel or note parameter out of range (non-finite, non-positive, above Nyquist).
    #[error("invalid parameter {name} = {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    /// Kernel name lookup miss.
    #[error("unknown kernel '{0}'")]
    UnknownKernel(String),

    /// Jittered Cholesky did not reach a positive-definite matrix.
    #[error("Cholesky factorization failed for {kernel} after {attempts} attempts (last jitter {jitter:e})")]
    Factorization {
        kernel: String,
        attempts: usize,
        jitter: f64,
    },

    /// Rejection sampling hit its retry ceiling.
    #[error("no acceptable path for {kernel} after {attempts} draws")]
    SamplingExhausted { kernel: String, attempts: usize },

    /// Invalid configuration parameter.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A synth was asked to play with no wavetables.
    #[error("wavetable bank is empty")]
    EmptyBank,

    /// Audio device error (live output).
    #[error("Audio error: {0}")]
    Audio(String),

    /// WAV encoding error.
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// I/O error (file operations).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
