// LilyPond sheet music output from decoded melodies.
//
// Converts a list of `MusicalEvent`s into a LilyPond (.ly) text file that can
// be engraved into PDF/SVG. The melody goes on a single treble staff in 4/4.
//
// Durations are quantised to sixteenth notes (the usual timeline step) and
// decomposed into power-of-two note values with optional dots. Notes that
// cross a barline are split into tied segments; rests are split the same way
// without ties.
//
// Uses absolute pitches (not \relative) for simplicity and correctness.

use crate::decoder::MusicalEvent;
use std::fmt::Write;

/// Pitch class names in LilyPond notation (indexed by pitch class 0-11).
const LY_PITCH_NAMES: [&str; 12] = [
    "c", "cis", "d", "ees", "e", "f", "fis", "g", "aes", "a", "bes", "b",
];

/// Sixteenth notes per 4/4 bar.
const BAR_LENGTH: usize = 16;

/// Sixteenth notes per quarter note.
const SIXTEENTHS_PER_QUARTER: f64 = 4.0;

/// A valid LilyPond duration: note value (in sixteenths) and its text.
const DURATION_TABLE: [(usize, &str); 8] = [
    (16, "1"),  // whole
    (12, "2."), // dotted half
    (8, "2"),   // half
    (6, "4."),  // dotted quarter
    (4, "4"),   // quarter
    (3, "8."),  // dotted eighth
    (2, "8"),   // eighth
    (1, "16"),  // sixteenth
];

/// Convert a MIDI pitch number to a LilyPond absolute pitch string.
///
/// LilyPond's `c` with no octave marks = MIDI 48 (C3).
pub fn midi_to_ly_note(midi_pitch: u8) -> String {
    let pc = (midi_pitch % 12) as usize;
    let octave = (midi_pitch / 12) as i8 - 4;
    let mut result = LY_PITCH_NAMES[pc].to_string();
    let mark = if octave > 0 { '\'' } else { ',' };
    for _ in 0..octave.unsigned_abs() {
        result.push(mark);
    }
    result
}

/// Decompose a duration (in sixteenths) into LilyPond durations, largest first.
pub fn decompose_duration(mut sixteenths: usize) -> Vec<&'static str> {
    let mut parts = Vec::new();
    for &(value, name) in &DURATION_TABLE {
        while sixteenths >= value {
            parts.push(name);
            sixteenths -= value;
        }
    }
    parts
}

/// Split a duration at 4/4 barlines, returning the per-bar fragments.
pub fn split_at_barlines(start: usize, duration: usize) -> Vec<usize> {
    let mut fragments = Vec::new();
    let mut remaining = duration;
    let mut pos = start;
    while remaining > 0 {
        let bar_end = (pos / BAR_LENGTH + 1) * BAR_LENGTH;
        let frag = remaining.min(bar_end - pos);
        fragments.push(frag);
        remaining -= frag;
        pos += frag;
    }
    fragments
}

/// Quarter notes to the nearest whole sixteenth (at least one).
fn to_sixteenths(quarters: f64) -> usize {
    ((quarters * SIXTEENTHS_PER_QUARTER).round() as usize).max(1)
}

/// Render the melody as a LilyPond music expression (no surrounding blocks).
pub fn render_music(events: &[MusicalEvent]) -> String {
    let mut out = String::new();
    let mut position = 0;

    for event in events {
        let length = to_sixteenths(event.duration());
        let (name, tie) = match *event {
            MusicalEvent::Note { pitch, .. } => (midi_to_ly_note(pitch), "~"),
            MusicalEvent::Rest { .. } => ("r".to_string(), ""),
        };
        let fragments = split_at_barlines(position, length);
        let pieces: Vec<&str> = fragments.iter().flat_map(|&f| decompose_duration(f)).collect();
        for (i, dur) in pieces.iter().enumerate() {
            if !out.is_empty() {
                out.push(' ');
            }
            let _ = write!(out, "{name}{dur}");
            if i + 1 < pieces.len() {
                out.push_str(tie);
            }
        }
        position += length;
    }
    out
}

/// Render a complete .ly document.
pub fn melody_to_lilypond(events: &[MusicalEvent], title: &str, tempo_bpm: u16) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\\version \"2.24.0\"");
    let _ = writeln!(out);
    let _ = writeln!(out, "\\header {{");
    let _ = writeln!(out, "  title = \"{}\"", title.replace('"', "'"));
    let _ = writeln!(out, "  tagline = ##f");
    let _ = writeln!(out, "}}");
    let _ = writeln!(out);
    let _ = writeln!(out, "\\score {{");
    let _ = writeln!(out, "  \\new Staff {{");
    let _ = writeln!(out, "    \\clef treble");
    let _ = writeln!(out, "    \\time 4/4");
    let _ = writeln!(out, "    \\tempo 4 = {tempo_bpm}");
    let _ = writeln!(out, "    {}", render_music(events));
    let _ = writeln!(out, "    \\bar \"|.\"");
    let _ = writeln!(out, "  }}");
    let _ = writeln!(out, "  \\layout {{ }}");
    let _ = writeln!(out, "}}");
    out
}
