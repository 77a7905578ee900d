//! Pitch names and frequency conversion.
//!
//! Pitches are spelled the way the on-screen keyboards label them: a note
//! letter, an optional accidental (`b` or `#`), and an octave digit, e.g.
//! `"C4"`, `"Db3"`, `"F#5"`.

/// Chromatic scale with flat spellings, the order keyboards lay keys out in.
pub const FLAT_NAMES: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

/// Converts a MIDI note number to frequency in Hz (A4 = 440).
pub fn midi_to_hz(midi: f32) -> f32 {
    440.0 * (2.0_f32).powf((midi - 69.0) / 12.0)
}

/// Parses a pitch name like `"C4"` or `"Eb3"` into a MIDI note number.
/// Returns `None` for malformed names or octaves outside 0..=9.
pub fn pitch_to_midi(pitch: &str) -> Option<u8> {
    let mut chars = pitch.chars();
    let letter = chars.next()?;
    let mut semitone: i16 = match letter.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let rest = chars.as_str();
    let octave_str = match rest.chars().next() {
        Some('b') => {
            semitone -= 1;
            &rest[1..]
        }
        Some('#') => {
            semitone += 1;
            &rest[1..]
        }
        _ => rest,
    };
    let octave: i16 = octave_str.parse().ok()?;
    if !(0..=9).contains(&octave) {
        return None;
    }
    // The accidental may carry the pitch across an octave boundary
    // (Cb4 is B3, B#3 is C4), so the borrow folds into the octave.
    let midi = (octave + 1) * 12 + semitone;
    u8::try_from(midi).ok()
}

/// Frequency of a named pitch, or `None` if the name does not parse.
pub fn pitch_to_hz(pitch: &str) -> Option<f32> {
    pitch_to_midi(pitch).map(|midi| midi_to_hz(midi as f32))
}

/// Name of a MIDI note using flat spellings, e.g. 61 -> `"Db4"`.
pub fn midi_to_pitch(note: u8) -> String {
    let name = FLAT_NAMES[(note % 12) as usize];
    let octave = (note / 12) as i16 - 1;
    format!("{name}{octave}")
}

/// True if the pitch is a flat/sharp key (drawn as a narrow dark key).
pub fn is_accidental(pitch: &str) -> bool {
    pitch.contains('b') || pitch.contains('#')
}
