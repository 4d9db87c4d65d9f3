// Melody export: timeline tokens -> decoded events -> serialized bytes.
//
// This is the `save_melody` side of the collaborator interface. The format is
// chosen by name ("midi" by default, "ly" for LilyPond); `render_melody`
// returns the bytes for callers that stream a download instead of writing a
// file.

use crate::decoder::decode;
use crate::error::{MelodyError, Result};
use crate::lilypond::melody_to_lilypond;
use crate::midi::{MidiOptions, midi_bytes, write_midi};
use std::path::Path;
use std::str::FromStr;

/// Default timeline step: one sixteenth note.
pub const DEFAULT_STEP_DURATION: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Midi,
    LilyPond,
}

impl ExportFormat {
    /// Conventional file extension for the format.
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Midi => "mid",
            ExportFormat::LilyPond => "ly",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = MelodyError;

    fn from_str(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "midi" | "mid" => Ok(ExportFormat::Midi),
            "ly" | "lilypond" => Ok(ExportFormat::LilyPond),
            _ => Err(MelodyError::UnsupportedFormat(name.to_string())),
        }
    }
}

/// Decode a timeline and serialize it in `format`.
pub fn render_melody<S: AsRef<str>>(
    melody: &[S],
    step_duration: f64,
    format: ExportFormat,
    options: &MidiOptions,
) -> Result<Vec<u8>> {
    let events = decode(melody, step_duration)?;
    match format {
        ExportFormat::Midi => midi_bytes(&events, options),
        ExportFormat::LilyPond => {
            Ok(melody_to_lilypond(&events, &options.track_name, options.tempo_bpm).into_bytes())
        }
    }
}

/// Decode a timeline and write it to `file_name` with explicit options.
pub fn save_melody_with<S: AsRef<str>>(
    melody: &[S],
    step_duration: f64,
    format: ExportFormat,
    options: &MidiOptions,
    file_name: &Path,
) -> Result<()> {
    let events = decode(melody, step_duration)?;
    match format {
        ExportFormat::Midi => write_midi(&events, options, file_name)?,
        ExportFormat::LilyPond => {
            let text = melody_to_lilypond(&events, &options.track_name, options.tempo_bpm);
            std::fs::write(file_name, text)?;
        }
    }
    log::info!(
        "Saved {}-step melody ({} events) as {:?} to {}",
        melody.len(),
        events.len(),
        format,
        file_name.display()
    );
    Ok(())
}

/// Collaborator entry point: format given by name, default playback options.
pub fn save_melody<S: AsRef<str>>(
    melody: &[S],
    step_duration: f64,
    format: &str,
    file_name: impl AsRef<Path>,
) -> Result<()> {
    let format: ExportFormat = format.parse()?;
    save_melody_with(melody, step_duration, format, &MidiOptions::default(), file_name.as_ref())
}
