// Noteworthy melody generator
//
// Extends a short seed fragment into a full melody with a pretrained
// next-symbol model, then decodes the result into notes and rests and writes
// it out as MIDI. Melodies are handled in timeline notation: one token per
// sixteenth-note step, where a MIDI number starts a note, "r" starts a rest,
// "_" holds the previous event and "/" ends the melody.
//
// Architecture:
// - token.rs: Timeline symbols (pitch / rest / sustain / end) and parsing
// - vocabulary.rs: Token <-> code mapping with an explicit inverse table
// - model.rs: `SequenceModel` trait, one-hot windows, the JSON `DenseModel`
// - sampler.rs: Temperature sampling + `MelodyGenerator` autoregressive loop
// - decoder.rs: Run-length decoding of a timeline into `MusicalEvent`s
// - midi.rs: Standard MIDI File output from events
// - lilypond.rs: LilyPond sheet music output from events
// - export.rs: Format selection, `render_melody` / `save_melody`
// - config.rs: JSON generator configuration and seed presets
// - error.rs: `MelodyError`
//
// Generation is reproducible given an RNG seed.

pub mod config;
pub mod decoder;
pub mod error;
pub mod export;
pub mod lilypond;
pub mod midi;
pub mod model;
pub mod sampler;
pub mod token;
pub mod vocabulary;

pub use error::{MelodyError, Result};
