//! Audio sinks for rendered PCM.
//!
//! Notes leave the synth as mono f32 buffers in [-1, 1] at 44.1 kHz; a sink
//! either plays them on the default output device or persists them as WAV.

mod system;
mod wav;

use crate::error::Result;

// Re-export public types
pub use system::LiveAudioSink;
pub use wav::{write_wav, WavFileSink};

/// Consumer of mono PCM buffers
pub trait AudioSink {
    /// Queue or persist `samples` (mono, [-1, 1])
    fn write(&mut self, samples: &[f32]) -> Result<()>;

    /// Flush and release the sink; further writes fail
    fn close(&mut self) -> Result<()>;
}
