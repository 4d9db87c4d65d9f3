// Error type shared by every stage of the melody pipeline.
//
// One enum covers artifact loading (vocabulary, model, config), parameter
// validation, sampling, timeline decoding, and serialization. Nothing in the
// pipeline retries: a failed generation or decode is reported to the caller
// as-is and no partial melody is returned.

use std::fmt;
use std::io;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MelodyError>;

#[derive(Debug)]
pub enum MelodyError {
    /// A seed or sampled token has no entry in the vocabulary mapping.
    UnknownToken(String),
    /// A generation or decoding parameter is out of range (temperature <= 0,
    /// zero context length, non-positive step duration, empty distribution).
    InvalidParameter(String),
    /// A timeline token is neither a rest, a sustain, an end marker, nor an
    /// integer MIDI pitch.
    InvalidToken(String),
    /// The model artifact is missing or malformed.
    ModelLoad(String),
    /// The vocabulary artifact is missing or malformed.
    MappingLoad(String),
    /// The model rejected its input (window shape mismatch).
    Inference(String),
    /// The requested output format name is not recognised.
    UnsupportedFormat(String),
    /// The generator config file is missing or malformed.
    Config(String),
    /// Writing the output failed.
    Io(io::Error),
}

impl fmt::Display for MelodyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MelodyError::UnknownToken(token) => {
                write!(f, "token {token:?} is not in the vocabulary mapping")
            }
            MelodyError::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
            MelodyError::InvalidToken(token) => {
                write!(f, "token {token:?} is not a rest, sustain, end marker or MIDI pitch")
            }
            MelodyError::ModelLoad(msg) => write!(f, "failed to load model: {msg}"),
            MelodyError::MappingLoad(msg) => write!(f, "failed to load vocabulary mapping: {msg}"),
            MelodyError::Inference(msg) => write!(f, "model inference failed: {msg}"),
            MelodyError::UnsupportedFormat(name) => {
                write!(f, "unsupported output format {name:?} (expected \"midi\" or \"ly\")")
            }
            MelodyError::Config(msg) => write!(f, "invalid generator config: {msg}"),
            MelodyError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for MelodyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MelodyError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for MelodyError {
    fn from(e: io::Error) -> Self {
        MelodyError::Io(e)
    }
}
