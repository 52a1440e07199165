//! Parameter definitions with physical units and documented semantics.
//!
//! All magic numbers of the generation pipeline are extracted here with:
//! - Physical units (Hz, samples, etc.)
//! - Documented ranges and meanings
//! - Validation where a bad value would surface late

mod generation;
mod render;
mod synthesis;

// Re-export all types
pub use generation::GenerationConfig;
pub use render::OutputConfig;
pub use synthesis::{audio_constants, SynthParams};
