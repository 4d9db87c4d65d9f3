// Data-driven generator configuration.
//
// Everything the `generate` binary needs to know lives in `GeneratorConfig`,
// loaded from JSON at startup. Every field has a default, so a config file
// only has to name what it changes (or can be omitted entirely). Command-line
// flags override whatever the file says.
//
// Defaults follow the settings the model was trained and tuned with: a
// 64-step context, sixteenth-note steps, 500 sampling steps at temperature
// 0.2, written as MIDI to `mel.midi`.
//
// The seed presets are short fragments in timeline notation that the model
// continues well; the CLI exposes them via `--preset`.

use crate::error::{MelodyError, Result};
use crate::export::{DEFAULT_STEP_DURATION, ExportFormat};
use crate::midi::MidiOptions;
use crate::sampler::{DEFAULT_SEQUENCE_LENGTH, GenerationParams};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Built-in seeds, in timeline notation.
pub const SEED_PRESETS: [&str; 3] = [
    "55 _ _ _ 60 _ _ _ 55 _ _ _ 55 _",
    "67 _ _ _ _ _ 65 _ 64 _ 62 _ 60 _ _ _",
    "67 _ _ _",
];

/// Where the trained artifacts live.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactPaths {
    /// Dense model JSON.
    pub model: PathBuf,
    /// Token -> code mapping JSON.
    pub mapping: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        ArtifactPaths {
            model: PathBuf::from("data/model.json"),
            mapping: PathBuf::from("data/mapping.json"),
        }
    }
}

/// Sampling parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Seed fragment in timeline notation.
    pub seed: String,
    /// Maximum number of generated steps.
    pub num_steps: usize,
    /// Context window length; must match the model's training window.
    pub sequence_length: usize,
    /// Sampling temperature (> 0). Lower is more predictable.
    pub temperature: f64,
    /// Fixed RNG seed for reproducible output. `None` draws from the OS.
    pub rng_seed: Option<u64>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        SamplingConfig {
            seed: SEED_PRESETS[1].to_string(),
            num_steps: 500,
            sequence_length: DEFAULT_SEQUENCE_LENGTH,
            temperature: 0.2,
            rng_seed: None,
        }
    }
}

/// Output file and playback settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// "midi" or "ly".
    pub format: String,
    pub path: PathBuf,
    /// Length of one timeline step in quarter notes.
    pub step_duration: f64,
    pub tempo_bpm: u16,
    /// General MIDI program number.
    pub program: u8,
    pub velocity: u8,
    /// Track name (MIDI) / title (LilyPond).
    pub title: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        let midi = MidiOptions::default();
        OutputConfig {
            format: "midi".to_string(),
            path: PathBuf::from("mel.midi"),
            step_duration: DEFAULT_STEP_DURATION,
            tempo_bpm: midi.tempo_bpm,
            program: midi.program,
            velocity: midi.velocity,
            title: midi.track_name,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub artifacts: ArtifactPaths,
    pub sampling: SamplingConfig,
    pub output: OutputConfig,
}

impl GeneratorConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| MelodyError::Config(format!("{}: {e}", path.display())))?;
        let config: GeneratorConfig = serde_json::from_str(&data)
            .map_err(|e| MelodyError::Config(format!("{}: {e}", path.display())))?;
        Ok(config)
    }

    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            num_steps: self.sampling.num_steps,
            context_length: self.sampling.sequence_length,
            temperature: self.sampling.temperature,
        }
    }

    pub fn midi_options(&self) -> MidiOptions {
        MidiOptions {
            tempo_bpm: self.output.tempo_bpm,
            program: self.output.program,
            velocity: self.output.velocity,
            track_name: self.output.title.clone(),
        }
    }

    pub fn export_format(&self) -> Result<ExportFormat> {
        self.output.format.parse()
    }

    /// Check everything that can be checked without loading artifacts.
    pub fn validate(&self) -> Result<()> {
        self.generation_params().validate()?;
        self.export_format()?;
        let step = self.output.step_duration;
        if !step.is_finite() || step <= 0.0 {
            return Err(MelodyError::InvalidParameter(format!(
                "step duration must be a finite value > 0, got {step}"
            )));
        }
        Ok(())
    }
}
