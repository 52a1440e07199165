//! gpsynth - Gaussian-process wavetable synthesizer
//!
//! Draws a bank of wavetables from a GP kernel, renders the requested notes
//! to a WAV file and optionally plays them live.

mod cli;

use std::process::ExitCode;

use clap::Parser;
use log::{error, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use cli::Args;
use gpsynth::audio::{AudioSink, LiveAudioSink, WavFileSink};
use gpsynth::params::SynthParams;
use gpsynth::{Result, WavetableSynth};

fn run(args: &Args) -> Result<()> {
    let kernel = args.build_kernel()?;
    let config = args.generation_config();
    let output = args.output_config();
    let params = SynthParams::default();
    let events = args.note_events(&params)?;

    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut synth = WavetableSynth::from_kernel(&kernel, &config, params, &mut rng)?;
    synth.save_wavetables(output.wavetable_dir(), &args.wavetable_prefix())?;

    let sample_rate = synth.params().sample_rate_hz;
    let mut sinks: Vec<Box<dyn AudioSink>> = vec![Box::new(WavFileSink::create(
        output.mix_path(),
        sample_rate,
    )?)];
    if args.play {
        sinks.push(Box::new(LiveAudioSink::new(sample_rate)?));
    }

    for event in &events {
        let pcm = synth.render(event)?;
        for sink in sinks.iter_mut() {
            sink.write(&pcm)?;
        }
    }
    for sink in sinks.iter_mut() {
        sink.close()?;
    }

    info!(
        "Rendered {} note(s) to {}",
        events.len(),
        output.mix_path().display()
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
