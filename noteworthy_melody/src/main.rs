// Noteworthy melody generator: CLI entry point.
//
// Loads the model and vocabulary, extends a seed fragment with temperature
// sampling, and writes the result as MIDI (or LilyPond). Settings come from
// an optional JSON config file; flags override it.
//
// Usage:
//   cargo run -p noteworthy_melody -- [--config FILE] [--seed "67 _ _ _"]
//     [--preset N] [--steps N] [--temperature T] [--rng-seed N]
//     [--format midi|ly] [--output FILE]
//
// Logging goes through env_logger at `info` by default; set RUST_LOG=debug
// (or trace, for every sampled step) for more.

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{debug, info};
use noteworthy_melody::config::{GeneratorConfig, SEED_PRESETS};
use noteworthy_melody::export::save_melody_with;
use noteworthy_melody::sampler::MelodyGenerator;
use noteworthy_melody::token::split_tokens;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "generate", version, about = "Generate a melody from a seed fragment")]
struct Args {
    /// JSON generator config; missing fields use built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dense model JSON.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Vocabulary mapping JSON.
    #[arg(long)]
    mapping: Option<PathBuf>,

    /// Seed fragment, space-separated timeline tokens.
    #[arg(long, conflicts_with = "preset")]
    seed: Option<String>,

    /// Use built-in seed N (0-based).
    #[arg(long)]
    preset: Option<usize>,

    /// Maximum number of sampling steps.
    #[arg(long)]
    steps: Option<usize>,

    /// Context window length.
    #[arg(long)]
    context_length: Option<usize>,

    /// Sampling temperature (> 0).
    #[arg(long)]
    temperature: Option<f64>,

    /// Fixed RNG seed for reproducible output.
    #[arg(long)]
    rng_seed: Option<u64>,

    /// Quarter notes per timeline step.
    #[arg(long)]
    step_duration: Option<f64>,

    /// Output format: midi or ly.
    #[arg(long)]
    format: Option<String>,

    /// Output file.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Tempo in BPM.
    #[arg(long)]
    tempo: Option<u16>,
}

impl Args {
    /// Fold command-line overrides into the loaded config.
    fn apply(self, config: &mut GeneratorConfig) -> Result<()> {
        if let Some(model) = self.model {
            config.artifacts.model = model;
        }
        if let Some(mapping) = self.mapping {
            config.artifacts.mapping = mapping;
        }
        if let Some(seed) = self.seed {
            config.sampling.seed = seed;
        }
        if let Some(n) = self.preset {
            let Some(preset) = SEED_PRESETS.get(n) else {
                bail!("preset {n} does not exist (have {})", SEED_PRESETS.len());
            };
            config.sampling.seed = preset.to_string();
        }
        if let Some(steps) = self.steps {
            config.sampling.num_steps = steps;
        }
        if let Some(len) = self.context_length {
            config.sampling.sequence_length = len;
        }
        if let Some(t) = self.temperature {
            config.sampling.temperature = t;
        }
        if let Some(s) = self.rng_seed {
            config.sampling.rng_seed = Some(s);
        }
        if let Some(step) = self.step_duration {
            config.output.step_duration = step;
        }
        if let Some(format) = self.format {
            config.output.format = format;
        }
        if let Some(output) = self.output {
            config.output.path = output;
        }
        if let Some(tempo) = self.tempo {
            config.output.tempo_bpm = tempo;
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => GeneratorConfig::load(path)?,
        None => GeneratorConfig::default(),
    };
    args.apply(&mut config)?;
    config.validate()?;
    let format = config.export_format()?;
    debug!("Effective config: {config:?}");

    info!(
        "Loading model {} and mapping {}...",
        config.artifacts.model.display(),
        config.artifacts.mapping.display()
    );
    let generator = MelodyGenerator::load(&config.artifacts.model, &config.artifacts.mapping)
        .context("Failed to load generator artifacts")?;

    let mut rng = match config.sampling.rng_seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_os_rng(),
    };

    let seed = split_tokens(&config.sampling.seed);
    info!(
        "Generating up to {} steps from seed \"{}\" (temperature {})...",
        config.sampling.num_steps, config.sampling.seed, config.sampling.temperature
    );
    let melody = generator
        .generate(&seed, &config.generation_params(), &mut rng)
        .context("Melody generation failed")?;
    info!("Melody: {}", melody.join(" "));

    let path = &config.output.path;
    save_melody_with(
        &melody,
        config.output.step_duration,
        format,
        &config.midi_options(),
        path,
    )
    .with_context(|| format!("Failed to save melody to {}", path.display()))?;

    let seconds = melody.len() as f64 * config.output.step_duration * 60.0
        / f64::from(config.output.tempo_bpm.max(1));
    info!(
        "Done! {} steps, about {:.0}s. Written as {} to {}",
        melody.len(),
        seconds,
        format.extension(),
        path.display()
    );
    Ok(())
}
