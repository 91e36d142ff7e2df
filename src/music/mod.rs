//! Music adapters: MML parsing, MIDI encoding and device playback.
//!
//! The dispatch core consumes these as black boxes behind narrow function
//! contracts; nothing in `mcp` knows what a note is.
//!
//! - [`mml`] — MML text → ordered event sequence, plus syntax validation
//! - [`midi`] — event sequence → Standard MIDI File bytes (via `midly`)
//! - [`player`] — device enumeration and playback (via `midir`)

pub mod error;
pub mod midi;
pub mod mml;
pub mod player;

pub use error::MusicError;
pub use midi::{events_to_midi_bytes, multitrack_to_midi_bytes, save_bytes};
pub use mml::{mml_to_events, validate_mml, Score, ScoreEvent};
pub use player::{list_output_devices, MidiPlayer};
