//! Output file layout.

use std::path::PathBuf;

/// Output configuration for rendered notes and saved wavetables
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Output directory for the mix and the wavetable files
    pub output_dir: PathBuf,

    /// File name of the rendered notes
    pub mix_file: String,

    /// Subdirectory for individual wavetables
    pub wavetable_subdir: String,
}

impl OutputConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            mix_file: "notes.wav".to_string(),
            wavetable_subdir: "samples".to_string(),
        }
    }

    /// Rendered notes path
    pub fn mix_path(&self) -> PathBuf {
        self.output_dir.join(&self.mix_file)
    }

    /// Wavetable directory path
    pub fn wavetable_dir(&self) -> PathBuf {
        self.output_dir.join(&self.wavetable_subdir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_nest_under_output_dir() {
        let config = OutputConfig::new("results");
        assert_eq!(config.mix_path(), PathBuf::from("results/notes.wav"));
        assert_eq!(config.wavetable_dir(), PathBuf::from("results/samples"));
    }
}
