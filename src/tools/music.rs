//! Domain tools: MML conversion, validation, device listing and playback.
//!
//! These handlers orchestrate the adapters in [`crate::music`] and translate
//! adapter failures into envelope error text. `play_mml` and
//! `play_mml_multitrack` compose two adapter stages and prefix failures with
//! the stage name so the caller can tell which half failed.

use std::path::Path;

use serde_json::{json, Value};

use crate::error::ToolError;
use crate::mcp::protocol::ToolCallResult;
use crate::mcp::registry::{RegistryError, ToolDescriptor, ToolHandler, ToolRegistry};
use crate::music::{self, MidiPlayer, Score};

use super::{optional_str, preview, required_str, required_str_list};

/// How much of the caller's MML to repeat back in result text.
const MML_PREVIEW_CHARS: usize = 100;

/// How much of each track's MML to repeat back in multitrack results.
const TRACK_PREVIEW_CHARS: usize = 50;

/// Picks the device to play on: explicit parameter, then configured default.
fn resolve_device<'a>(arguments: &'a Value, default_device: Option<&'a str>) -> Option<&'a str> {
    optional_str(arguments, "device_name").or(default_device)
}

/// Parses every track of a multitrack request, naming the failing track.
fn parse_tracks(track_mml_list: &[String]) -> Result<Vec<Score>, ToolError> {
    track_mml_list
        .iter()
        .enumerate()
        .map(|(index, mml)| {
            music::mml_to_events(mml).map_err(|e| {
                ToolError::InvalidParams(format!("track {}: {e}", index + 1))
            })
        })
        .collect()
}

/// Formats the per-track summary lines for multitrack results.
fn track_summary(track_mml_list: &[String]) -> String {
    track_mml_list
        .iter()
        .enumerate()
        .map(|(index, mml)| format!("Track {}: {}", index + 1, preview(mml, TRACK_PREVIEW_CHARS)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Converts MML text to a MIDI file on disk.
struct MmlToMidiTool;

impl ToolHandler for MmlToMidiTool {
    fn invoke(&self, arguments: &Value) -> Result<ToolCallResult, ToolError> {
        let mml_text = required_str(arguments, "mml_text")?;
        let output_path = required_str(arguments, "output_path")?;

        let score = music::mml_to_events(mml_text)?;
        let midi_bytes = music::events_to_midi_bytes(&score)?;
        music::save_bytes(&midi_bytes, Path::new(output_path))?;

        Ok(ToolCallResult::text(format!(
            "Converted MML to MIDI file.\n\
             Input MML: {}\n\
             Output file: {}\n\
             File size: {} bytes",
            preview(mml_text, MML_PREVIEW_CHARS),
            output_path,
            midi_bytes.len(),
        )))
    }
}

/// Plays a MIDI file on an output device.
struct PlayMidiTool {
    default_device: Option<String>,
}

impl ToolHandler for PlayMidiTool {
    fn invoke(&self, arguments: &Value) -> Result<ToolCallResult, ToolError> {
        let midi_path = required_str(arguments, "midi_path")?;
        let device = resolve_device(arguments, self.default_device.as_deref());

        let mut player = MidiPlayer::connect(device)?;
        player.play_file(Path::new(midi_path))?;

        Ok(ToolCallResult::text(format!(
            "Finished playing MIDI file.\n\
             File: {}\n\
             Device: {}",
            midi_path,
            player.device(),
        )))
    }
}

/// Converts MML text and plays it directly.
struct PlayMmlTool {
    default_device: Option<String>,
}

impl ToolHandler for PlayMmlTool {
    fn invoke(&self, arguments: &Value) -> Result<ToolCallResult, ToolError> {
        let mml_text = required_str(arguments, "mml_text")?;
        let device = resolve_device(arguments, self.default_device.as_deref());

        let midi_bytes = music::mml_to_events(mml_text)
            .and_then(|score| music::events_to_midi_bytes(&score))
            .map_err(|e| ToolError::stage("conversion", e))?;

        let mut player =
            MidiPlayer::connect(device).map_err(|e| ToolError::stage("playback", e))?;
        player
            .play_bytes(&midi_bytes)
            .map_err(|e| ToolError::stage("playback", e))?;

        Ok(ToolCallResult::text(format!(
            "Finished playing MML.\n\
             MML: {}\n\
             Device: {}",
            preview(mml_text, MML_PREVIEW_CHARS),
            player.device(),
        )))
    }
}

/// Checks MML syntax and reports the diagnostic.
struct ValidateMmlTool;

impl ToolHandler for ValidateMmlTool {
    fn invoke(&self, arguments: &Value) -> Result<ToolCallResult, ToolError> {
        let mml_text = required_str(arguments, "mml_text")?;

        let (valid, diagnostic) = music::validate_mml(mml_text);

        let text = format!(
            "MML validation result:\n\
             MML: {}\n\
             Valid: {}\n\
             Detail: {}",
            preview(mml_text, MML_PREVIEW_CHARS),
            valid,
            diagnostic,
        );

        // The envelope flag mirrors validity so the caller can branch on it.
        Ok(if valid {
            ToolCallResult::text(text)
        } else {
            ToolCallResult::error(text)
        })
    }
}

/// Lists available MIDI output devices.
struct ListMidiDevicesTool;

impl ToolHandler for ListMidiDevicesTool {
    fn invoke(&self, _arguments: &Value) -> Result<ToolCallResult, ToolError> {
        let devices = music::list_output_devices()?;

        // Zero devices is an answer, not an error.
        let text = if devices.is_empty() {
            "No MIDI output devices available.".to_string()
        } else {
            let lines: Vec<String> = devices.iter().map(|name| format!("- {name}")).collect();
            format!("Available MIDI output devices:\n{}", lines.join("\n"))
        };

        Ok(ToolCallResult::text(text))
    }
}

/// Converts a list of MML tracks to a multitrack MIDI file on disk.
struct MmlMultitrackToMidiTool;

impl ToolHandler for MmlMultitrackToMidiTool {
    fn invoke(&self, arguments: &Value) -> Result<ToolCallResult, ToolError> {
        let track_mml_list = required_str_list(arguments, "track_mml_list")?;
        let output_path = required_str(arguments, "output_path")?;

        let scores = parse_tracks(&track_mml_list)?;
        let midi_bytes = music::multitrack_to_midi_bytes(&scores)?;
        music::save_bytes(&midi_bytes, Path::new(output_path))?;

        Ok(ToolCallResult::text(format!(
            "Converted multitrack MML to MIDI file.\n\
             Tracks: {}\n\
             {}\n\
             Output file: {}\n\
             File size: {} bytes",
            track_mml_list.len(),
            track_summary(&track_mml_list),
            output_path,
            midi_bytes.len(),
        )))
    }
}

/// Converts a list of MML tracks and plays them together.
struct PlayMmlMultitrackTool {
    default_device: Option<String>,
}

impl ToolHandler for PlayMmlMultitrackTool {
    fn invoke(&self, arguments: &Value) -> Result<ToolCallResult, ToolError> {
        let track_mml_list = required_str_list(arguments, "track_mml_list")?;
        let device = resolve_device(arguments, self.default_device.as_deref());

        let midi_bytes = parse_tracks(&track_mml_list)
            .and_then(|scores| {
                music::multitrack_to_midi_bytes(&scores).map_err(ToolError::Adapter)
            })
            .map_err(|e| match e {
                ToolError::InvalidParams(msg) => {
                    ToolError::InvalidParams(format!("conversion: {msg}"))
                }
                ToolError::Adapter(source) => ToolError::stage("conversion", source),
                other => other,
            })?;

        let mut player =
            MidiPlayer::connect(device).map_err(|e| ToolError::stage("playback", e))?;
        player
            .play_bytes(&midi_bytes)
            .map_err(|e| ToolError::stage("playback", e))?;

        Ok(ToolCallResult::text(format!(
            "Finished playing multitrack MML.\n\
             Tracks: {}\n\
             {}\n\
             Device: {}",
            track_mml_list.len(),
            track_summary(&track_mml_list),
            player.device(),
        )))
    }
}

/// Registers the music tools.
///
/// `default_device` comes from configuration and is used by the playback
/// tools when a request does not name a device.
///
/// # Errors
///
/// Returns [`RegistryError`] if a tool name collides with one already
/// registered.
#[allow(clippy::too_many_lines)] // one registration block per tool
pub fn register_music_tools(
    registry: &mut ToolRegistry,
    default_device: Option<String>,
) -> Result<(), RegistryError> {
    registry.register(ToolDescriptor::new(
        "mml_to_midi",
        "Converts MML text to a MIDI file and saves it",
        json!({
            "type": "object",
            "properties": {
                "mml_text": {
                    "type": "string",
                    "description": "MML text to convert (e.g. 'T120O4L4CDEFGAB')"
                },
                "output_path": {
                    "type": "string",
                    "description": "Path of the MIDI file to write (e.g. 'output.mid')"
                }
            },
            "required": ["mml_text", "output_path"]
        }),
        Box::new(MmlToMidiTool),
    ))?;

    registry.register(ToolDescriptor::new(
        "play_midi",
        "Plays a MIDI file on a MIDI output device",
        json!({
            "type": "object",
            "properties": {
                "midi_path": {
                    "type": "string",
                    "description": "Path of the MIDI file to play"
                },
                "device_name": {
                    "type": "string",
                    "description": "MIDI device name (substring match; first device if omitted)"
                }
            },
            "required": ["midi_path"]
        }),
        Box::new(PlayMidiTool {
            default_device: default_device.clone(),
        }),
    ))?;

    registry.register(ToolDescriptor::new(
        "play_mml",
        "Converts MML text and plays it directly",
        json!({
            "type": "object",
            "properties": {
                "mml_text": {
                    "type": "string",
                    "description": "MML text to play (e.g. 'CDEFGAB')"
                },
                "device_name": {
                    "type": "string",
                    "description": "MIDI device name (substring match; first device if omitted)"
                }
            },
            "required": ["mml_text"]
        }),
        Box::new(PlayMmlTool {
            default_device: default_device.clone(),
        }),
    ))?;

    registry.register(ToolDescriptor::new(
        "validate_mml",
        "Validates MML syntax",
        json!({
            "type": "object",
            "properties": {
                "mml_text": {
                    "type": "string",
                    "description": "MML text to validate"
                }
            },
            "required": ["mml_text"]
        }),
        Box::new(ValidateMmlTool),
    ))?;

    registry.register(ToolDescriptor::new(
        "list_midi_devices",
        "Lists available MIDI output devices",
        json!({
            "type": "object",
            "properties": {},
            "required": []
        }),
        Box::new(ListMidiDevicesTool),
    ))?;

    registry.register(ToolDescriptor::new(
        "mml_multitrack_to_midi",
        "Converts a list of MML tracks to a multitrack MIDI file and saves it",
        json!({
            "type": "object",
            "properties": {
                "track_mml_list": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "One MML string per track (e.g. ['CDEFGAB', 'EGBEGB'])"
                },
                "output_path": {
                    "type": "string",
                    "description": "Path of the MIDI file to write (e.g. 'multitrack.mid')"
                }
            },
            "required": ["track_mml_list", "output_path"]
        }),
        Box::new(MmlMultitrackToMidiTool),
    ))?;

    registry.register(ToolDescriptor::new(
        "play_mml_multitrack",
        "Converts a list of MML tracks and plays them together",
        json!({
            "type": "object",
            "properties": {
                "track_mml_list": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "One MML string per track (e.g. ['CDEFGAB', 'EGBEGB'])"
                },
                "device_name": {
                    "type": "string",
                    "description": "MIDI device name (substring match; first device if omitted)"
                }
            },
            "required": ["track_mml_list"]
        }),
        Box::new(PlayMmlMultitrackTool { default_device }),
    ))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mml_to_midi_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scale.mid");

        let result = MmlToMidiTool
            .invoke(&json!({
                "mml_text": "CDEFGAB",
                "output_path": path.to_str().unwrap(),
            }))
            .unwrap();

        assert!(!result.is_error);
        assert!(result.first_text().unwrap().contains("scale.mid"));

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], b"MThd");
    }

    #[test]
    fn mml_to_midi_requires_params() {
        assert!(MmlToMidiTool.invoke(&json!({})).is_err());
        assert!(MmlToMidiTool
            .invoke(&json!({"mml_text": "CDE"}))
            .is_err());
        assert!(MmlToMidiTool
            .invoke(&json!({"output_path": "x.mid"}))
            .is_err());
    }

    #[test]
    fn mml_to_midi_propagates_syntax_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.mid");

        let err = MmlToMidiTool
            .invoke(&json!({
                "mml_text": "CDZ",
                "output_path": path.to_str().unwrap(),
            }))
            .unwrap_err();

        assert!(err.to_string().contains('Z'));
        assert!(!path.exists());
    }

    #[test]
    fn validate_mml_valid() {
        let result = ValidateMmlTool
            .invoke(&json!({"mml_text": "O4L4CDEFGAB"}))
            .unwrap();
        assert!(!result.is_error);
        assert!(result.first_text().unwrap().contains("Valid: true"));
    }

    #[test]
    fn validate_mml_invalid_names_token() {
        let result = ValidateMmlTool
            .invoke(&json!({"mml_text": "O4L4CZ"}))
            .unwrap();
        assert!(result.is_error);
        let text = result.first_text().unwrap();
        assert!(text.contains("Valid: false"));
        assert!(text.contains('Z'));
    }

    #[test]
    fn validate_mml_is_idempotent() {
        let args = json!({"mml_text": "O4L4CZ"});
        let first = ValidateMmlTool.invoke(&args).unwrap();
        let second = ValidateMmlTool.invoke(&args).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn play_mml_conversion_failure_names_stage() {
        // Conversion fails before any device is touched, so this is
        // deterministic on machines without MIDI hardware.
        let err = PlayMmlTool {
            default_device: None,
        }
        .invoke(&json!({"mml_text": "CZ"}))
        .unwrap_err();

        assert!(err.to_string().starts_with("conversion:"));
    }

    #[test]
    fn play_tools_require_params() {
        assert!(PlayMidiTool {
            default_device: None
        }
        .invoke(&json!({}))
        .is_err());
        assert!(PlayMmlTool {
            default_device: None
        }
        .invoke(&json!({}))
        .is_err());
        assert!(PlayMmlMultitrackTool {
            default_device: None
        }
        .invoke(&json!({}))
        .is_err());
    }

    #[test]
    fn multitrack_to_midi_writes_format_1_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("multi.mid");

        let result = MmlMultitrackToMidiTool
            .invoke(&json!({
                "track_mml_list": ["CDEFGAB", "EGBEGB"],
                "output_path": path.to_str().unwrap(),
            }))
            .unwrap();

        assert!(!result.is_error);
        assert!(result.first_text().unwrap().contains("Tracks: 2"));

        let bytes = std::fs::read(&path).unwrap();
        let smf = midly::Smf::parse(&bytes).unwrap();
        assert_eq!(smf.header.format, midly::Format::Parallel);
        assert_eq!(smf.tracks.len(), 2);
    }

    #[test]
    fn multitrack_names_failing_track() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("multi.mid");

        let err = MmlMultitrackToMidiTool
            .invoke(&json!({
                "track_mml_list": ["CDE", "CDZ"],
                "output_path": path.to_str().unwrap(),
            }))
            .unwrap_err();

        assert!(err.to_string().contains("track 2"));
    }

    #[test]
    fn multitrack_rejects_non_array() {
        assert!(MmlMultitrackToMidiTool
            .invoke(&json!({"track_mml_list": "CDE", "output_path": "x.mid"}))
            .is_err());
    }

    #[test]
    fn registration_order_and_names() {
        let mut registry = ToolRegistry::new();
        register_music_tools(&mut registry, None).unwrap();

        let names: Vec<String> = registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            vec![
                "mml_to_midi",
                "play_midi",
                "play_mml",
                "validate_mml",
                "list_midi_devices",
                "mml_multitrack_to_midi",
                "play_mml_multitrack",
            ]
        );
    }
}
