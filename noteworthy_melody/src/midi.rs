// MIDI output from decoded melodies.
//
// Converts a list of `MusicalEvent`s into a Standard MIDI File (SMF) for
// playback or download. Output is SMF Format 1: track 0 carries the tempo,
// track 1 carries the melody on channel 0. Note durations in quarter notes
// map to ticks at `TICKS_PER_QUARTER`; rests emit nothing and simply push the
// next event's delta further out.
//
// Uses the `midly` crate for MIDI writing.

use crate::decoder::MusicalEvent;
use crate::error::{MelodyError, Result};
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};
use std::path::Path;

/// Ticks per quarter note in MIDI output.
pub const TICKS_PER_QUARTER: u16 = 480;

/// Playback settings baked into the MIDI file.
#[derive(Debug, Clone)]
pub struct MidiOptions {
    /// Tempo in quarter notes per minute.
    pub tempo_bpm: u16,
    /// General MIDI program (0 = acoustic grand piano).
    pub program: u8,
    /// Note-on velocity.
    pub velocity: u8,
    /// Name written to the melody track.
    pub track_name: String,
}

impl Default for MidiOptions {
    fn default() -> Self {
        MidiOptions {
            tempo_bpm: 120,
            program: 0,
            velocity: 80,
            track_name: "Melody".to_string(),
        }
    }
}

/// Convert events to MIDI and write to a file.
pub fn write_midi(events: &[MusicalEvent], options: &MidiOptions, path: &Path) -> Result<()> {
    let buf = midi_bytes(events, options)?;
    std::fs::write(path, &buf)?;
    log::info!("Wrote {} bytes of MIDI to {}", buf.len(), path.display());
    Ok(())
}

/// Convert events to an in-memory SMF byte stream.
pub fn midi_bytes(events: &[MusicalEvent], options: &MidiOptions) -> Result<Vec<u8>> {
    let smf = events_to_smf(events, options)?;
    let mut buf = Vec::new();
    smf.write_std(&mut buf)?;
    Ok(buf)
}

/// Quarter-note duration to whole ticks, as a MIDI delta time.
fn duration_to_ticks(quarters: f64) -> Result<u32> {
    let ticks = (quarters * TICKS_PER_QUARTER as f64).round().max(0.0);
    to_delta(ticks)
}

/// Fail on tick counts a variable-length delta cannot hold.
fn to_delta(ticks: f64) -> Result<u32> {
    let max = u28::max_value().as_int();
    if !ticks.is_finite() || ticks > f64::from(max) {
        return Err(MelodyError::InvalidParameter(format!(
            "{ticks} ticks exceeds the MIDI delta-time limit of {max}"
        )));
    }
    Ok(ticks as u32)
}

/// Build the in-memory SMF for a melody.
fn events_to_smf<'a>(events: &[MusicalEvent], options: &'a MidiOptions) -> Result<Smf<'a>> {
    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    ));

    // Track 0: tempo track
    let mut tempo_track: Track<'a> = Vec::new();
    let tempo_microseconds = 60_000_000 / u32::from(options.tempo_bpm.max(1));
    tempo_track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(tempo_microseconds))),
    });
    tempo_track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    smf.tracks.push(tempo_track);

    // Track 1: the melody
    let channel = u4::new(0);
    let mut track: Track<'a> = Vec::new();
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(options.track_name.as_bytes())),
    });
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Midi {
            channel,
            message: MidiMessage::ProgramChange {
                program: u7::new(options.program.min(127)),
            },
        },
    });

    // Ticks elapsed since the last emitted event.
    let mut pending_delta: u32 = 0;
    for event in events {
        let ticks = duration_to_ticks(event.duration())?;
        match *event {
            MusicalEvent::Rest { .. } => {
                pending_delta = to_delta(f64::from(pending_delta) + f64::from(ticks))?;
            }
            MusicalEvent::Note { pitch, .. } => {
                let key = u7::new(pitch.min(127));
                track.push(TrackEvent {
                    delta: u28::new(pending_delta),
                    kind: TrackEventKind::Midi {
                        channel,
                        message: MidiMessage::NoteOn {
                            key,
                            vel: u7::new(options.velocity.min(127)),
                        },
                    },
                });
                track.push(TrackEvent {
                    delta: u28::new(ticks),
                    kind: TrackEventKind::Midi {
                        channel,
                        message: MidiMessage::NoteOff { key, vel: u7::new(0) },
                    },
                });
                pending_delta = 0;
            }
        }
    }

    // A trailing rest still occupies time before the end of the track.
    track.push(TrackEvent {
        delta: u28::new(pending_delta),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    smf.tracks.push(track);

    Ok(smf)
}
