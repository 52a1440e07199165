//! Command-line argument parsing.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::info;

use gpsynth::error::Result;
use gpsynth::kernel::{kernel_for_name, Kernel};
use gpsynth::params::{GenerationConfig, OutputConfig, SynthParams};
use gpsynth::NoteEvent;

/// How a second kernel joins the first
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Combine {
    Plus,
    Times,
}

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "gpsynth")]
#[command(about = "Gaussian-process wavetable synthesizer", long_about = None)]
pub struct Args {
    /// Kernel family (RBF, Matern52, StdPeriodic, ...)
    #[arg(long, value_name = "NAME", default_value = "RBF")]
    pub kernel: String,

    /// Kernel lengthscale
    #[arg(long, value_name = "L", default_value = "1.0")]
    pub lengthscale: f64,

    /// Optional second kernel family
    #[arg(long, value_name = "NAME")]
    pub kernel2: Option<String>,

    /// Lengthscale of the second kernel
    #[arg(long, value_name = "L", default_value = "1.0")]
    pub lengthscale2: f64,

    /// How the second kernel is combined with the first
    #[arg(long, value_enum, default_value = "plus")]
    pub combine: Combine,

    /// Wavetables in the round-robin bank
    #[arg(long, value_name = "COUNT", default_value = "17")]
    pub wavetables: usize,

    /// Sample over sin-warped positions instead of the raw period
    #[arg(long)]
    pub waveshaping: bool,

    /// Do not pin the loop seam of non-periodic kernels
    #[arg(long)]
    pub no_continuity: bool,

    /// RNG seed
    #[arg(long, default_value = "0")]
    pub seed: u64,

    /// MIDI pitches to render, comma separated
    #[arg(long, value_delimiter = ',', default_value = "60")]
    pub notes: Vec<f64>,

    /// Note duration in seconds
    #[arg(long, value_name = "SECONDS", default_value = "1.0")]
    pub duration: f64,

    /// Output directory for the notes and the wavetables
    #[arg(long, value_name = "DIR", default_value = "output")]
    pub output: PathBuf,

    /// Also play the notes on the default output device
    #[arg(long)]
    pub play: bool,
}

impl Args {
    /// Build the (possibly composite) kernel
    pub fn build_kernel(&self) -> Result<Kernel> {
        let first = kernel_for_name(&self.kernel, self.lengthscale)?;
        let Some(name) = &self.kernel2 else {
            return Ok(first);
        };
        let second = kernel_for_name(name, self.lengthscale2)?;
        let kernel = match self.combine {
            Combine::Plus => first + second,
            Combine::Times => first * second,
        };
        info!("Kernel: {}", kernel);
        Ok(kernel)
    }

    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            enforce_continuity: !self.no_continuity,
            waveshaping: self.waveshaping,
            n_wavetables: self.wavetables,
            ..GenerationConfig::default()
        }
    }

    pub fn output_config(&self) -> OutputConfig {
        OutputConfig::new(&self.output)
    }

    /// Notes to render, in order; unplayable pitches or durations are rejected
    /// before any wavetable is generated
    pub fn note_events(&self, params: &SynthParams) -> Result<Vec<NoteEvent>> {
        self.notes
            .iter()
            .map(|&pitch| {
                let event = NoteEvent::new(pitch, self.duration);
                event.validate(params)?;
                Ok(event)
            })
            .collect()
    }

    /// File prefix for saved wavetables, e.g. `RBF_l1_0_n`
    pub fn wavetable_prefix(&self) -> String {
        let mut prefix = String::new();
        if self.waveshaping {
            prefix.push_str("waveshaping_");
        }
        prefix.push_str(&format!("{}_l{}", self.kernel, self.lengthscale));
        if let Some(name) = &self.kernel2 {
            let op = match self.combine {
                Combine::Plus => "plus",
                Combine::Times => "times",
            };
            prefix.push_str(&format!("_{}_{}_l{}", op, name, self.lengthscale2));
        }
        prefix.replace('.', "_") + "_n"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpsynth::Error;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("gpsynth").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        let config = args.generation_config();
        assert!(config.enforce_continuity);
        assert!(!config.waveshaping);
        assert_eq!(config.n_wavetables, 17);
        assert_eq!(args.notes, vec![60.0]);
        assert_eq!(args.wavetable_prefix(), "RBF_l1_n");
    }

    #[test]
    fn test_composite_kernel() {
        let args = parse(&["--kernel", "RBF", "--kernel2", "StdPeriodic", "--combine", "times"]);
        let kernel = args.build_kernel().unwrap();
        assert!(matches!(kernel, Kernel::Product(_, _)));
        assert_eq!(args.wavetable_prefix(), "RBF_l1_times_StdPeriodic_l1_n");
    }

    #[test]
    fn test_note_list_and_flags() {
        let args = parse(&[
            "--notes", "48,60.5,72", "--duration", "0.25", "--waveshaping", "--no-continuity",
        ]);
        let events = args.note_events(&SynthParams::default()).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[1], NoteEvent::new(60.5, 0.25));
        assert!(!args.generation_config().enforce_continuity);
        assert!(args.wavetable_prefix().starts_with("waveshaping_RBF"));
    }

    #[test]
    fn test_unplayable_notes_rejected() {
        let params = SynthParams::default();
        let args = parse(&["--notes", "60,1000"]);
        assert!(matches!(
            args.note_events(&params),
            Err(Error::InvalidParameter { name: "pitch", .. })
        ));
        let args = parse(&["--notes", "inf"]);
        assert!(args.note_events(&params).is_err());
        let args = parse(&["--duration=-0.5"]);
        assert!(matches!(
            args.note_events(&params),
            Err(Error::InvalidParameter { name: "duration", .. })
        ));
    }

    #[test]
    fn test_unknown_kernel_rejected() {
        let args = parse(&["--kernel", "Banana"]);
        assert!(matches!(args.build_kernel(), Err(Error::UnknownKernel(_))));
    }
}
