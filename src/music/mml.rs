//! MML (Music Macro Language) scanner.
//!
//! Converts MML text into a flat sequence of note, rest and tempo events.
//! The dialect is the classic single-voice subset:
//!
//! - `C D E F G A B` — notes, optionally followed by `#`/`+` (sharp) or
//!   `-` (flat), a length number (`4` = quarter note), and dots
//! - `R` — rest, with the same length/dot syntax
//! - `On` — set octave (0-9, single digit)
//! - `Ln` — set default length
//! - `Tn` — set tempo in BPM (emits a tempo event)
//! - `>` / `<` — octave up/down, clamped to 0-8
//!
//! Input is case-insensitive and whitespace is ignored. Any other character
//! is a syntax error that names the character and its position.

use super::error::MusicError;

/// Octave used when the MML text does not set one.
pub const DEFAULT_OCTAVE: u8 = 4;

/// Note length denominator used when the MML text does not set one (quarter).
pub const DEFAULT_LENGTH: u32 = 4;

/// Tempo in beats per minute used when the MML text does not set one.
pub const DEFAULT_TEMPO: u32 = 120;

/// Highest octave reachable via `>`.
const MAX_OCTAVE: u8 = 8;

/// One event in a parsed score.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreEvent {
    /// A note with a MIDI key number and a duration in quarter-note beats.
    Note {
        /// MIDI key number (C4 = 60).
        key: u8,
        /// Duration in quarter-note beats.
        beats: f64,
    },
    /// Silence for the given duration in quarter-note beats.
    Rest {
        /// Duration in quarter-note beats.
        beats: f64,
    },
    /// A tempo change.
    Tempo {
        /// Beats per minute.
        bpm: u32,
    },
}

/// A parsed MML sequence.
///
/// The event order is the note order of the source text; an initial
/// [`ScoreEvent::Tempo`] at the default tempo is always present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Score {
    /// Events in source order.
    pub events: Vec<ScoreEvent>,
}

impl Score {
    /// Returns the notes of this score as `(key, beats)` pairs, in order.
    #[must_use]
    pub fn notes(&self) -> Vec<(u8, f64)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                ScoreEvent::Note { key, beats } => Some((*key, *beats)),
                _ => None,
            })
            .collect()
    }
}

/// Semitone offset of each natural note letter within an octave.
const fn semitone(letter: char) -> i16 {
    match letter {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        _ => 11, // 'B'; callers only pass note letters
    }
}

/// Parses MML text into a [`Score`].
///
/// # Errors
///
/// Returns [`MusicError::Syntax`] naming the offending character and its
/// position in the normalised text if the input is malformed.
pub fn mml_to_events(mml_text: &str) -> Result<Score, MusicError> {
    let text: Vec<char> = mml_text
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let mut events = vec![ScoreEvent::Tempo {
        bpm: DEFAULT_TEMPO,
    }];
    let mut octave = DEFAULT_OCTAVE;
    let mut length = DEFAULT_LENGTH;

    let mut i = 0;
    while i < text.len() {
        match text[i] {
            letter @ ('C' | 'D' | 'E' | 'F' | 'G' | 'A' | 'B') => {
                i += 1;
                let accidental = match text.get(i) {
                    Some('#' | '+') => {
                        i += 1;
                        1
                    }
                    Some('-') => {
                        i += 1;
                        -1
                    }
                    _ => 0,
                };
                let beats = scan_duration(&text, &mut i, length)?;
                let key = midi_key(letter, accidental, octave);
                events.push(ScoreEvent::Note { key, beats });
            }

            'R' => {
                i += 1;
                let beats = scan_duration(&text, &mut i, length)?;
                events.push(ScoreEvent::Rest { beats });
            }

            'O' => {
                i += 1;
                let Some(digit) = text.get(i).and_then(|c| c.to_digit(10)) else {
                    return Err(MusicError::syntax(i, "octave command requires a digit"));
                };
                #[allow(clippy::cast_possible_truncation)] // single decimal digit
                {
                    octave = digit as u8;
                }
                i += 1;
            }

            'L' => {
                i += 1;
                let value = scan_number(&text, &mut i)?
                    .ok_or_else(|| MusicError::syntax(i, "length command requires a number"))?;
                if value == 0 {
                    return Err(MusicError::syntax(i, "note length must be positive"));
                }
                length = value;
            }

            'T' => {
                i += 1;
                let bpm = scan_number(&text, &mut i)?
                    .ok_or_else(|| MusicError::syntax(i, "tempo command requires a number"))?;
                if bpm == 0 {
                    return Err(MusicError::syntax(i, "tempo must be positive"));
                }
                events.push(ScoreEvent::Tempo { bpm });
            }

            '>' => {
                octave = (octave + 1).min(MAX_OCTAVE);
                i += 1;
            }

            '<' => {
                octave = octave.saturating_sub(1);
                i += 1;
            }

            other => {
                return Err(MusicError::syntax(
                    i,
                    format!("unknown MML command '{other}'"),
                ));
            }
        }
    }

    Ok(Score { events })
}

/// Scans a length number plus trailing dots, returning the duration in beats.
///
/// A length of `n` is a 1/n note, so `4` is one beat; each dot multiplies the
/// duration by 1.5.
fn scan_duration(text: &[char], i: &mut usize, default_length: u32) -> Result<f64, MusicError> {
    let length = match scan_number(text, i)? {
        Some(0) => return Err(MusicError::syntax(*i, "note length must be positive")),
        Some(n) => n,
        None => default_length,
    };

    let mut beats = 4.0 / f64::from(length);
    while text.get(*i) == Some(&'.') {
        beats *= 1.5;
        *i += 1;
    }
    Ok(beats)
}

/// Scans a run of decimal digits, advancing `i` past them.
///
/// Returns `Ok(None)` if no digit is present; a run that overflows `u32` is
/// a syntax error rather than a silent fallback.
fn scan_number(text: &[char], i: &mut usize) -> Result<Option<u32>, MusicError> {
    let start = *i;
    while text.get(*i).is_some_and(char::is_ascii_digit) {
        *i += 1;
    }
    if *i == start {
        return Ok(None);
    }
    let digits: String = text[start..*i].iter().collect();
    digits
        .parse()
        .map(Some)
        .map_err(|_| MusicError::syntax(start, format!("number too large: {digits}")))
}

/// Computes the MIDI key number for a note letter, accidental and octave.
///
/// Follows the convention where C4 is key 60. The result is clamped to the
/// valid 0-127 key range.
fn midi_key(letter: char, accidental: i16, octave: u8) -> u8 {
    let value = (i16::from(octave) + 1) * 12 + semitone(letter) + accidental;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // clamped to key range
    {
        value.clamp(0, 127) as u8
    }
}

/// Checks MML syntax without producing a score.
///
/// Returns `(true, diagnostic)` on success and `(false, diagnostic)` with the
/// syntax error text on failure. Calling this twice on the same text yields
/// the same pair both times.
#[must_use]
pub fn validate_mml(mml_text: &str) -> (bool, String) {
    match mml_to_events(mml_text) {
        Ok(_) => (true, "MML syntax is valid".to_string()),
        Err(e) => (false, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notes(mml: &str) -> Vec<(u8, f64)> {
        mml_to_events(mml).unwrap().notes()
    }

    #[test]
    fn simple_scale_has_seven_notes() {
        let notes = notes("CDEFGAB");
        assert_eq!(notes.len(), 7);
        // C4 D4 E4 F4 G4 A4 B4
        let keys: Vec<u8> = notes.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![60, 62, 64, 65, 67, 69, 71]);
    }

    #[test]
    fn octave_command_sets_octave() {
        let notes = notes("O5C");
        assert_eq!(notes[0].0, 72);
    }

    #[test]
    fn note_lengths() {
        let notes = notes("C4D8E2");
        assert!((notes[0].1 - 1.0).abs() < f64::EPSILON);
        assert!((notes[1].1 - 0.5).abs() < f64::EPSILON);
        assert!((notes[2].1 - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn default_length_command() {
        let notes = notes("L8CDEFG");
        for (_, beats) in notes {
            assert!((beats - 0.5).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn dotted_notes() {
        let notes = notes("C4.D8.");
        assert!((notes[0].1 - 1.5).abs() < f64::EPSILON);
        assert!((notes[1].1 - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn double_dot_compounds() {
        let notes = notes("C4..");
        assert!((notes[0].1 - 2.25).abs() < f64::EPSILON);
    }

    #[test]
    fn rests_are_kept() {
        let score = mml_to_events("CR4DR8E").unwrap();
        let rests: Vec<f64> = score
            .events
            .iter()
            .filter_map(|e| match e {
                ScoreEvent::Rest { beats } => Some(*beats),
                _ => None,
            })
            .collect();
        assert_eq!(score.notes().len(), 3);
        assert_eq!(rests.len(), 2);
        assert!((rests[0] - 1.0).abs() < f64::EPSILON);
        assert!((rests[1] - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn sharps_and_flats() {
        let keys: Vec<u8> = notes("C#D-E").iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![61, 61, 64]);
    }

    #[test]
    fn plus_is_sharp() {
        assert_eq!(notes("C+")[0].0, 61);
    }

    #[test]
    fn tempo_command_emits_event() {
        let score = mml_to_events("T90C").unwrap();
        let tempos: Vec<u32> = score
            .events
            .iter()
            .filter_map(|e| match e {
                ScoreEvent::Tempo { bpm } => Some(*bpm),
                _ => None,
            })
            .collect();
        // Implicit default tempo plus the explicit T90.
        assert_eq!(tempos, vec![DEFAULT_TEMPO, 90]);
    }

    #[test]
    fn octave_shift_commands() {
        let keys: Vec<u8> = notes("C>C<C").iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![60, 72, 60]);
    }

    #[test]
    fn octave_shift_clamps() {
        // Eight '>' from octave 4 clamps at 8; eight '<' clamps at 0.
        let keys: Vec<u8> = notes(">>>>>>>>C<<<<<<<<<C").iter().map(|(k, _)| *k).collect();
        assert_eq!(keys[0], 9 * 12);
        assert_eq!(keys[1], 12);
    }

    #[test]
    fn whitespace_is_ignored() {
        assert_eq!(notes("C D E F G"), notes("CDEFG"));
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(notes("cdefg"), notes("CDEFG"));
    }

    #[test]
    fn empty_input_is_valid() {
        let score = mml_to_events("").unwrap();
        assert!(score.notes().is_empty());
        // The implicit tempo event is still present.
        assert_eq!(score.events.len(), 1);
    }

    #[test]
    fn unknown_command_is_error() {
        let err = mml_to_events("CDEFGABX").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains('X'));
        assert!(msg.contains("position 7"));
    }

    #[test]
    fn octave_without_digit_is_error() {
        assert!(mml_to_events("O").is_err());
        assert!(mml_to_events("OC").is_err());
    }

    #[test]
    fn length_without_number_is_error() {
        assert!(mml_to_events("L").is_err());
    }

    #[test]
    fn tempo_without_number_is_error() {
        assert!(mml_to_events("T").is_err());
    }

    #[test]
    fn zero_length_is_error() {
        assert!(mml_to_events("C0").is_err());
        assert!(mml_to_events("L0").is_err());
    }

    #[test]
    fn zero_tempo_is_error() {
        assert!(mml_to_events("T0").is_err());
    }

    #[test]
    fn oversized_number_is_error() {
        // One past u32::MAX in each numeric position.
        for mml in ["C4294967296", "L4294967296", "T4294967296", "R4294967296"] {
            let err = mml_to_events(mml).unwrap_err();
            assert!(err.to_string().contains("number too large"), "case: {mml}");
        }
    }

    #[test]
    fn validate_valid_mml() {
        let (valid, message) = validate_mml("O4L4CDEFGAB");
        assert!(valid);
        assert!(message.contains("valid"));
    }

    #[test]
    fn validate_invalid_mml_names_token() {
        let (valid, message) = validate_mml("O4L4CZ");
        assert!(!valid);
        assert!(message.contains('Z'));
    }

    #[test]
    fn validate_is_idempotent() {
        let first = validate_mml("O4L4CZ");
        let second = validate_mml("O4L4CZ");
        assert_eq!(first, second);
    }
}
