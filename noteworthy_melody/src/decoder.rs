// Timeline -> musical events.
//
// A timeline has one token per fixed time step. Decoding run-length collapses
// each pitch/rest token together with the sustain tokens that follow it into a
// single event lasting `step_duration * (1 + sustains)` quarter notes:
//
//   60 _ _ _ r _ 62   (step 0.25)  ->  C4 1.0, rest 0.5, D4 0.25
//
// The scan keeps one pending event and a run-length counter. A new pitch or
// rest flushes the pending event; the end of the timeline (or an end marker)
// flushes the last one, so the final event is never dropped. A sustain in the
// final position is a boundary, not an extension: it flushes the pending event
// without adding a step. Sustains before the first pitch or rest have nothing
// to extend and are skipped.
//
// Tokens are parsed into `Symbol`s up front; `decode_symbols` is the pure
// state machine and never fails.

use crate::error::{MelodyError, Result};
use crate::token::Symbol;

/// One decoded note or rest. Durations are in quarter notes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MusicalEvent {
    Note { pitch: u8, duration: f64 },
    Rest { duration: f64 },
}

impl MusicalEvent {
    pub fn duration(&self) -> f64 {
        match *self {
            MusicalEvent::Note { duration, .. } | MusicalEvent::Rest { duration } => duration,
        }
    }

    pub fn is_rest(&self) -> bool {
        matches!(self, MusicalEvent::Rest { .. })
    }
}

/// Decode string tokens into events.
///
/// Fails with `InvalidToken` if any token is not a rest, sustain, end marker
/// or MIDI pitch, and with `InvalidParameter` for a non-positive step.
pub fn decode<S: AsRef<str>>(timeline: &[S], step_duration: f64) -> Result<Vec<MusicalEvent>> {
    if !step_duration.is_finite() || step_duration <= 0.0 {
        return Err(MelodyError::InvalidParameter(format!(
            "step duration must be a finite value > 0, got {step_duration}"
        )));
    }
    let symbols = timeline
        .iter()
        .map(|t| Symbol::parse(t.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    let events = decode_symbols(&symbols, step_duration);
    log::debug!("Decoded {} timeline steps into {} events", symbols.len(), events.len());
    Ok(events)
}

/// Run-length state machine over parsed symbols.
pub fn decode_symbols(symbols: &[Symbol], step_duration: f64) -> Vec<MusicalEvent> {
    let mut events = Vec::new();
    let mut pending: Option<Symbol> = None;
    let mut run_length: usize = 1;

    let mut flush = |pending: Option<Symbol>, run_length: usize| {
        let duration = step_duration * run_length as f64;
        match pending {
            Some(Symbol::Pitch(pitch)) => events.push(MusicalEvent::Note { pitch, duration }),
            Some(Symbol::Rest) => events.push(MusicalEvent::Rest { duration }),
            _ => {}
        }
    };

    let last = symbols.len().saturating_sub(1);
    for (index, &symbol) in symbols.iter().enumerate() {
        match symbol {
            Symbol::Sustain => {
                if pending.is_some() && index != last {
                    run_length += 1;
                }
            }
            Symbol::End => break,
            Symbol::Pitch(_) | Symbol::Rest => {
                flush(pending.take(), run_length);
                pending = Some(symbol);
                run_length = 1;
            }
        }
    }
    flush(pending, run_length);

    events
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(pitch: u8, duration: f64) -> MusicalEvent {
        MusicalEvent::Note { pitch, duration }
    }

    fn rest(duration: f64) -> MusicalEvent {
        MusicalEvent::Rest { duration }
    }

    #[test]
    fn collapses_sustains_into_durations() {
        let events = decode(&["60", "_", "_", "_", "r", "_", "62"], 0.25).unwrap();
        assert_eq!(events, vec![note(60, 1.0), rest(0.5), note(62, 0.25)]);
    }

    #[test]
    fn single_token_emits_one_event() {
        assert_eq!(decode(&["60"], 0.25).unwrap(), vec![note(60, 0.25)]);
        assert_eq!(decode(&["r"], 0.5).unwrap(), vec![rest(0.5)]);
    }

    #[test]
    fn final_sustain_does_not_extend_last_event() {
        assert_eq!(decode(&["60", "_"], 0.25).unwrap(), vec![note(60, 0.25)]);
        assert_eq!(decode(&["r", "_", "_"], 0.5).unwrap(), vec![rest(1.0)]);
        let events = decode(&["67", "_", "_", "_", "_", "_", "65", "_"], 0.25).unwrap();
        assert_eq!(events, vec![note(67, 1.5), note(65, 0.25)]);
    }

    #[test]
    fn leading_sustains_are_skipped() {
        let events = decode(&["_", "_", "64", "_", "_"], 0.25).unwrap();
        assert_eq!(events, vec![note(64, 0.5)]);
    }

    #[test]
    fn repeated_pitches_are_separate_notes() {
        let events = decode(&["60", "60", "_", "62"], 1.0).unwrap();
        assert_eq!(events, vec![note(60, 1.0), note(60, 2.0), note(62, 1.0)]);
    }

    #[test]
    fn end_marker_stops_decoding() {
        let events = decode(&["60", "_", "/", "62", "_"], 0.25).unwrap();
        assert_eq!(events, vec![note(60, 0.5)]);
    }

    #[test]
    fn empty_timeline_has_no_events() {
        let empty: [&str; 0] = [];
        assert!(decode(&empty, 0.25).unwrap().is_empty());
        assert!(decode(&["_", "_"], 0.25).unwrap().is_empty());
    }

    #[test]
    fn invalid_tokens_abort_decoding() {
        let result = decode(&["60", "_", "C4", "_"], 0.25);
        assert!(matches!(result, Err(MelodyError::InvalidToken(t)) if t == "C4"));
        assert!(matches!(decode(&["200"], 0.25), Err(MelodyError::InvalidToken(_))));
    }

    #[test]
    fn step_duration_must_be_positive() {
        for step in [0.0, -0.25, f64::NAN] {
            assert!(matches!(decode(&["60"], step), Err(MelodyError::InvalidParameter(_))));
        }
    }

    #[test]
    fn every_step_but_a_final_sustain_is_counted() {
        let timeline = ["55", "_", "_", "_", "60", "_", "_", "_", "55", "_", "_", "_", "55", "_"];
        let events = decode(&timeline, 0.25).unwrap();
        assert_eq!(events.len(), 4);
        let total: f64 = events.iter().map(MusicalEvent::duration).sum();
        assert_eq!(total, (timeline.len() - 1) as f64 * 0.25);
        assert!(events.iter().all(|e| !e.is_rest()));
    }
}
