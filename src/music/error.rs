//! Error types for the music adapters.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from MML parsing, MIDI encoding and device I/O.
#[derive(Error, Debug)]
pub enum MusicError {
    /// The MML text contains a syntax error.
    ///
    /// `position` is the character index into the normalised text (upper-cased,
    /// whitespace stripped), matching what the scanner actually consumed.
    #[error("MML syntax error at position {position}: {message}")]
    Syntax {
        /// Character index of the offending token.
        position: usize,
        /// What was wrong.
        message: String,
    },

    /// The MIDI byte payload could not be encoded or decoded.
    #[error("invalid MIDI data: {0}")]
    InvalidMidi(String),

    /// The MIDI output backend reported an error.
    #[error("MIDI device error: {0}")]
    Device(String),

    /// No MIDI output ports exist on this machine.
    #[error("no MIDI output devices available")]
    NoDevices,

    /// The requested MIDI device does not match any available port.
    #[error("MIDI device not found: {0}")]
    DeviceNotFound(String),

    /// Writing a MIDI file failed.
    #[error("failed to write MIDI file: {path}")]
    Save {
        /// Destination path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Reading a MIDI file failed.
    #[error("failed to read MIDI file: {path}")]
    Load {
        /// Source path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl MusicError {
    /// Creates a syntax error for the given position.
    #[must_use]
    pub fn syntax(position: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            position,
            message: message.into(),
        }
    }
}
