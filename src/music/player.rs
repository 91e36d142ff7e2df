//! MIDI output device enumeration and playback on top of `midir`.
//!
//! Playback is deliberately blocking: the sequence is merged to absolute
//! ticks, messages are sent to the open port and the thread sleeps between
//! them. The caller owns the decision to run this on a loop that tolerates
//! blocking (the dispatch core does, per the single-request-at-a-time model).

use std::path::Path;
use std::thread;
use std::time::Duration;

use midir::{MidiOutput, MidiOutputConnection};
use midly::live::LiveEvent;
use midly::{MetaMessage, Smf, Timing, TrackEventKind};

use super::error::MusicError;

/// Client name announced to the MIDI backend.
const CLIENT_NAME: &str = "mml-mcp-server";

/// Microseconds per quarter note before any tempo meta event (120 BPM).
const DEFAULT_TEMPO_MICROS: u32 = 500_000;

/// Returns the names of all available MIDI output devices, in port order.
///
/// An empty list is not an error; it simply means no device is connected.
///
/// # Errors
///
/// Returns [`MusicError::Device`] if the MIDI backend cannot be initialised.
pub fn list_output_devices() -> Result<Vec<String>, MusicError> {
    let output = MidiOutput::new(CLIENT_NAME).map_err(|e| MusicError::Device(e.to_string()))?;
    let names = output
        .ports()
        .iter()
        .filter_map(|port| output.port_name(port).ok())
        .collect();
    Ok(names)
}

/// A connection to one MIDI output device.
pub struct MidiPlayer {
    connection: MidiOutputConnection,
    device: String,
}

impl MidiPlayer {
    /// Opens a connection to a MIDI output device.
    ///
    /// With a name, the first port whose name contains it (case-insensitive)
    /// is used; without one, the first available port.
    ///
    /// # Errors
    ///
    /// Returns [`MusicError::NoDevices`] if no output port exists,
    /// [`MusicError::DeviceNotFound`] if a requested name matches nothing,
    /// or [`MusicError::Device`] if the backend fails.
    pub fn connect(device_name: Option<&str>) -> Result<Self, MusicError> {
        let output = MidiOutput::new(CLIENT_NAME).map_err(|e| MusicError::Device(e.to_string()))?;

        let ports = output.ports();
        if ports.is_empty() {
            return Err(MusicError::NoDevices);
        }

        let named: Vec<(usize, String)> = ports
            .iter()
            .enumerate()
            .filter_map(|(i, port)| output.port_name(port).ok().map(|name| (i, name)))
            .collect();

        let (index, device) = match device_name {
            Some(wanted) => {
                let lowered = wanted.to_lowercase();
                named
                    .into_iter()
                    .find(|(_, name)| name.to_lowercase().contains(&lowered))
                    .ok_or_else(|| MusicError::DeviceNotFound(wanted.to_string()))?
            }
            None => named
                .into_iter()
                .next()
                .ok_or(MusicError::NoDevices)?,
        };

        let connection = output
            .connect(&ports[index], CLIENT_NAME)
            .map_err(|e| MusicError::Device(e.to_string()))?;

        Ok(Self { connection, device })
    }

    /// Returns the name of the connected device.
    #[must_use]
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Plays a MIDI byte payload, blocking until the sequence ends.
    ///
    /// # Errors
    ///
    /// Returns [`MusicError::InvalidMidi`] if the payload is not a valid
    /// Standard MIDI File, or [`MusicError::Device`] if sending fails.
    pub fn play_bytes(&mut self, midi_bytes: &[u8]) -> Result<(), MusicError> {
        let smf = Smf::parse(midi_bytes).map_err(|e| MusicError::InvalidMidi(e.to_string()))?;
        self.play_smf(&smf)
    }

    /// Loads and plays a MIDI file, blocking until the sequence ends.
    ///
    /// # Errors
    ///
    /// Returns [`MusicError::Load`] if the file cannot be read, plus the
    /// errors of [`Self::play_bytes`].
    pub fn play_file(&mut self, filepath: &Path) -> Result<(), MusicError> {
        let bytes = std::fs::read(filepath).map_err(|e| MusicError::Load {
            path: filepath.to_path_buf(),
            source: e,
        })?;
        self.play_bytes(&bytes)
    }

    /// Plays a parsed file: merge all tracks, walk them in tick order.
    fn play_smf(&mut self, smf: &Smf<'_>) -> Result<(), MusicError> {
        let ticks_per_beat = match smf.header.timing {
            Timing::Metrical(ticks) => u32::from(ticks.as_int()),
            Timing::Timecode(..) => {
                return Err(MusicError::InvalidMidi(
                    "SMPTE timing is not supported".to_string(),
                ))
            }
        };

        let mut tempo_micros = DEFAULT_TEMPO_MICROS;
        let mut last_tick: u32 = 0;
        let mut buffer: Vec<u8> = Vec::with_capacity(4);

        for (tick, kind) in merge_tracks(smf) {
            let delta = tick - last_tick;
            last_tick = tick;
            if delta > 0 {
                thread::sleep(tick_duration(delta, tempo_micros, ticks_per_beat));
            }

            match kind {
                TrackEventKind::Midi { channel, message } => {
                    buffer.clear();
                    LiveEvent::Midi { channel, message }
                        .write_std(&mut buffer)
                        .map_err(|e| MusicError::Device(e.to_string()))?;
                    self.connection
                        .send(&buffer)
                        .map_err(|e| MusicError::Device(e.to_string()))?;
                }
                TrackEventKind::Meta(MetaMessage::Tempo(tempo)) => {
                    tempo_micros = tempo.as_int();
                }
                _ => {}
            }
        }

        self.all_notes_off();
        Ok(())
    }

    /// Sends All Notes Off (CC 123) and All Sound Off (CC 120) on every
    /// channel so nothing keeps ringing after playback ends.
    pub fn all_notes_off(&mut self) {
        for channel in 0..16u8 {
            let _ = self.connection.send(&[0xB0 | channel, 123, 0]);
            let _ = self.connection.send(&[0xB0 | channel, 120, 0]);
        }
    }
}

/// Flattens all tracks into one `(absolute_tick, event)` list in tick order.
///
/// The sort is stable, so events at the same tick keep their within-track
/// order (note-off before the following note-on).
fn merge_tracks<'a>(smf: &Smf<'a>) -> Vec<(u32, TrackEventKind<'a>)> {
    let mut events = Vec::new();
    for track in &smf.tracks {
        let mut tick: u32 = 0;
        for event in track {
            tick = tick.saturating_add(event.delta.as_int());
            events.push((tick, event.kind));
        }
    }
    events.sort_by_key(|&(tick, _)| tick);
    events
}

/// Converts a tick delta to wall-clock time at the given tempo.
fn tick_duration(delta_ticks: u32, tempo_micros: u32, ticks_per_beat: u32) -> Duration {
    let micros =
        u64::from(delta_ticks) * u64::from(tempo_micros) / u64::from(ticks_per_beat.max(1));
    Duration::from_micros(micros)
}
