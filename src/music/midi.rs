//! Standard MIDI File encoding on top of `midly`.
//!
//! Scores are rendered at a fixed resolution of 480 ticks per quarter note.
//! Single scores become format 0 files; multitrack renders are format 1 with
//! one track per score, a track name meta event on each, and tempo metas
//! carried by the first track only.

use std::path::Path;

use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind};

use super::error::MusicError;
use super::mml::{Score, ScoreEvent};

/// Ticks per quarter note in generated files.
pub const TICKS_PER_BEAT: u16 = 480;

/// Note-on velocity for generated notes.
pub const VELOCITY: u8 = 64;

/// Converts a duration in beats to MIDI ticks.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // durations are small and non-negative
fn beats_to_ticks(beats: f64) -> u32 {
    (beats * f64::from(TICKS_PER_BEAT)) as u32
}

/// Renders one score into a track, without an end-of-track marker.
///
/// Rests accumulate into the delta of the following event. Tempo events are
/// only emitted when `with_tempo` is set (format 1 files carry tempo on the
/// first track only).
fn render_track(score: &Score, channel: u8, with_tempo: bool) -> Track<'static> {
    let mut track = Track::new();
    let mut pending_delta: u32 = 0;

    for event in &score.events {
        match *event {
            ScoreEvent::Note { key, beats } => {
                let ticks = beats_to_ticks(beats);
                track.push(TrackEvent {
                    delta: pending_delta.into(),
                    kind: TrackEventKind::Midi {
                        channel: channel.into(),
                        message: MidiMessage::NoteOn {
                            key: key.into(),
                            vel: VELOCITY.into(),
                        },
                    },
                });
                track.push(TrackEvent {
                    delta: ticks.into(),
                    kind: TrackEventKind::Midi {
                        channel: channel.into(),
                        message: MidiMessage::NoteOff {
                            key: key.into(),
                            vel: VELOCITY.into(),
                        },
                    },
                });
                pending_delta = 0;
            }

            ScoreEvent::Rest { beats } => {
                pending_delta += beats_to_ticks(beats);
            }

            ScoreEvent::Tempo { bpm } if with_tempo => {
                track.push(TrackEvent {
                    delta: pending_delta.into(),
                    // Clamped to the 24-bit tempo field (reached below 4 BPM).
                    kind: TrackEventKind::Meta(MetaMessage::Tempo(
                        (60_000_000 / bpm).min(0x00FF_FFFF).into(),
                    )),
                });
                pending_delta = 0;
            }

            ScoreEvent::Tempo { .. } => {}
        }
    }

    track
}

fn end_of_track() -> TrackEvent<'static> {
    TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    }
}

fn write_smf(smf: &Smf<'_>) -> Result<Vec<u8>, MusicError> {
    let mut bytes = Vec::new();
    smf.write_std(&mut bytes)
        .map_err(|e| MusicError::InvalidMidi(e.to_string()))?;
    Ok(bytes)
}

/// Encodes a single score as a format 0 Standard MIDI File.
///
/// # Errors
///
/// Returns [`MusicError::InvalidMidi`] if encoding fails.
pub fn events_to_midi_bytes(score: &Score) -> Result<Vec<u8>, MusicError> {
    let mut smf = Smf::new(Header::new(
        Format::SingleTrack,
        Timing::Metrical(TICKS_PER_BEAT.into()),
    ));

    let mut track = render_track(score, 0, true);
    track.push(end_of_track());
    smf.tracks.push(track);

    write_smf(&smf)
}

/// Encodes multiple scores as a format 1 Standard MIDI File.
///
/// Each score becomes one track on channel `index % 16` with a "Track N"
/// name meta event. Tempo metas come from the first score only.
///
/// # Errors
///
/// Returns [`MusicError::InvalidMidi`] if encoding fails.
pub fn multitrack_to_midi_bytes(scores: &[Score]) -> Result<Vec<u8>, MusicError> {
    let names: Vec<String> = (1..=scores.len()).map(|n| format!("Track {n}")).collect();

    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(TICKS_PER_BEAT.into()),
    ));

    for (index, score) in scores.iter().enumerate() {
        #[allow(clippy::cast_possible_truncation)] // index % 16 fits in u8
        let channel = (index % 16) as u8;

        let mut track = Track::new();
        track.push(TrackEvent {
            delta: 0.into(),
            kind: TrackEventKind::Meta(MetaMessage::TrackName(names[index].as_bytes())),
        });
        track.extend(render_track(score, channel, index == 0));
        track.push(end_of_track());
        smf.tracks.push(track);
    }

    write_smf(&smf)
}

/// Writes MIDI bytes to a file.
///
/// # Errors
///
/// Returns [`MusicError::Save`] if the write fails.
pub fn save_bytes(midi_bytes: &[u8], filepath: &Path) -> Result<(), MusicError> {
    std::fs::write(filepath, midi_bytes).map_err(|e| MusicError::Save {
        path: filepath.to_path_buf(),
        source: e,
    })
}
