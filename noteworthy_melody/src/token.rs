// Timeline symbols.
//
// A melody timeline is a sequence of string tokens, one per time step:
// a MIDI pitch number ("60") starts a note, "r" starts a rest, "_" holds the
// previous event for another step, and "/" marks the end of the melody (it is
// also the padding symbol that fills the sampler's initial context).
//
// `Symbol` is the parsed form. The decoder parses each token exactly once and
// then runs its run-length state machine over symbols only.

use crate::error::{MelodyError, Result};
use std::fmt;

pub const REST_TOKEN: &str = "r";
pub const SUSTAIN_TOKEN: &str = "_";
pub const END_TOKEN: &str = "/";

/// Highest valid MIDI note number.
pub const MAX_MIDI_PITCH: u8 = 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// Start a new note at this MIDI pitch.
    Pitch(u8),
    /// Start a stretch of silence.
    Rest,
    /// Continue the previous note or rest for one more step.
    Sustain,
    /// End of melody.
    End,
}

impl Symbol {
    /// Parse a single timeline token.
    ///
    /// Numeric tokens must name a MIDI pitch in 0..=127; anything else that is
    /// not one of the three marker tokens is an `InvalidToken` error.
    pub fn parse(token: &str) -> Result<Symbol> {
        match token {
            REST_TOKEN => Ok(Symbol::Rest),
            SUSTAIN_TOKEN => Ok(Symbol::Sustain),
            END_TOKEN => Ok(Symbol::End),
            _ => {
                let value: i64 = token
                    .parse()
                    .map_err(|_| MelodyError::InvalidToken(token.to_string()))?;
                u8::try_from(value)
                    .ok()
                    .filter(|&p| p <= MAX_MIDI_PITCH)
                    .map(Symbol::Pitch)
                    .ok_or_else(|| MelodyError::InvalidToken(token.to_string()))
            }
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Pitch(p) => write!(f, "{p}"),
            Symbol::Rest => f.write_str(REST_TOKEN),
            Symbol::Sustain => f.write_str(SUSTAIN_TOKEN),
            Symbol::End => f.write_str(END_TOKEN),
        }
    }
}

/// Split a space-separated seed string into owned tokens.
pub fn split_tokens(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}
